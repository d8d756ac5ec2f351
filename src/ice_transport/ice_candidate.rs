use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ice_transport::ice_candidate_type::RTCIceCandidateType;
use crate::ice_transport::ice_protocol::RTCIceProtocol;

/// ICECandidate represents a local candidate of a server side transport.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCIceCandidate {
    pub foundation: String,
    pub priority: u32,
    pub address: String,
    pub protocol: RTCIceProtocol,
    pub port: u16,
    #[serde(rename = "type")]
    pub typ: RTCIceCandidateType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp_type: Option<String>,
}

impl RTCIceCandidate {
    /// marshal renders the value of an `a=candidate` attribute. The component
    /// is always 1 since RTCP is multiplexed on the RTP flow.
    pub fn marshal(&self) -> String {
        let mut val = format!(
            "{} 1 {} {} {} {} typ {}",
            self.foundation, self.protocol, self.priority, self.address, self.port, self.typ,
        );

        if let Some(tcp_type) = &self.tcp_type {
            val += format!(" tcptype {tcp_type}").as_str();
        }

        val
    }
}

impl fmt::Display for RTCIceCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}:{} {}",
            self.protocol, self.address, self.port, self.typ,
        )
    }
}
