use std::io::Cursor;

use sdp::description::session::SessionDescription;
use serde::{Deserialize, Serialize};

use super::sdp_type::RTCSdpType;
use crate::error::{Error, Result};

/// SessionDescription is used to expose local and remote session descriptions.
///
/// A description is validated when it is built: the type must be offer or
/// answer and the text must parse. It never changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawSessionDescription")]
pub struct RTCSessionDescription {
    #[serde(rename = "type")]
    sdp_type: RTCSdpType,

    sdp: String,

    #[serde(skip)]
    parsed: SessionDescription,
}

#[derive(Deserialize)]
struct RawSessionDescription {
    #[serde(rename = "type")]
    sdp_type: String,
    sdp: String,
}

impl TryFrom<RawSessionDescription> for RTCSessionDescription {
    type Error = Error;

    fn try_from(raw: RawSessionDescription) -> Result<Self> {
        let sdp_type = RTCSdpType::from(raw.sdp_type.as_str());
        if sdp_type == RTCSdpType::Unspecified {
            return Err(Error::ErrSessionDescriptionInvalidType(raw.sdp_type));
        }
        RTCSessionDescription::new(sdp_type, raw.sdp)
    }
}

impl RTCSessionDescription {
    /// new builds a description, failing on an unspecified type or on SDP
    /// text that does not parse.
    pub fn new(sdp_type: RTCSdpType, sdp: String) -> Result<Self> {
        if sdp_type == RTCSdpType::Unspecified {
            return Err(Error::ErrSessionDescriptionInvalidType(
                sdp_type.to_string(),
            ));
        }

        let parsed = Self::unmarshal(&sdp)?;
        Ok(RTCSessionDescription {
            sdp_type,
            sdp,
            parsed,
        })
    }

    /// Given SDP representing an answer, wrap it in an RTCSessionDescription
    /// that can be given to an RTCPeerConnection.
    pub fn answer(sdp: String) -> Result<Self> {
        Self::new(RTCSdpType::Answer, sdp)
    }

    /// Given SDP representing an offer, wrap it in an RTCSessionDescription
    /// that can be given to an RTCPeerConnection.
    pub fn offer(sdp: String) -> Result<Self> {
        Self::new(RTCSdpType::Offer, sdp)
    }

    pub(crate) fn from_parsed(sdp_type: RTCSdpType, parsed: SessionDescription) -> Result<Self> {
        Self::new(sdp_type, parsed.marshal())
    }

    pub fn sdp_type(&self) -> RTCSdpType {
        self.sdp_type
    }

    pub fn sdp(&self) -> &str {
        self.sdp.as_str()
    }

    pub fn parsed(&self) -> &SessionDescription {
        &self.parsed
    }

    fn unmarshal(sdp: &str) -> Result<SessionDescription> {
        let mut reader = Cursor::new(sdp.as_bytes());
        let parsed = SessionDescription::unmarshal(&mut reader)?;
        Ok(parsed)
    }
}
