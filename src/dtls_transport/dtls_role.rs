use std::fmt;

use sdp::util::ConnectionRole;
use serde::{Deserialize, Serialize};

/// DtlsRole indicates the role of the DTLS transport.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DTLSRole {
    #[default]
    Unspecified = 0,

    /// DTLSRoleAuto defines the DTLS role is determined based on
    /// the resolved ICE role: the ICE controlled role acts as the DTLS
    /// client and the ICE controlling role acts as the DTLS server.
    #[serde(rename = "auto")]
    Auto = 1,

    /// DTLSRoleClient defines the DTLS client role.
    #[serde(rename = "client")]
    Client = 2,

    /// DTLSRoleServer defines the DTLS server role.
    #[serde(rename = "server")]
    Server = 3,
}

impl fmt::Display for DTLSRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            DTLSRole::Auto => write!(f, "auto"),
            DTLSRole::Client => write!(f, "client"),
            DTLSRole::Server => write!(f, "server"),
            _ => write!(f, "{}", crate::UNSPECIFIED_STR),
        }
    }
}

/// The role announced by a remote `a=setup` value. `actpass` leaves the
/// choice to us, which is reported as Auto.
impl From<ConnectionRole> for DTLSRole {
    fn from(role: ConnectionRole) -> Self {
        match role {
            ConnectionRole::Active => DTLSRole::Client,
            ConnectionRole::Passive => DTLSRole::Server,
            ConnectionRole::Actpass => DTLSRole::Auto,
            _ => DTLSRole::Unspecified,
        }
    }
}

impl DTLSRole {
    pub(crate) fn to_connection_role(self) -> ConnectionRole {
        match self {
            DTLSRole::Client => ConnectionRole::Active,
            DTLSRole::Server => ConnectionRole::Passive,
            DTLSRole::Auto => ConnectionRole::Actpass,
            _ => ConnectionRole::Unspecified,
        }
    }

    /// answer_setup is the `a=setup` value a local answer carries: active
    /// when the local transport is the DTLS client, passive otherwise.
    pub(crate) fn answer_setup(self) -> ConnectionRole {
        if self == DTLSRole::Client {
            ConnectionRole::Active
        } else {
            ConnectionRole::Passive
        }
    }
}
