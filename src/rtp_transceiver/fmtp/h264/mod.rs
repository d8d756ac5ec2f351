
use super::*;

pub(crate) const MIME_TYPE_H264: &str = "video/h264";

pub(crate) const PACKETIZATION_MODE: &str = "packetizationMode";

/// packetization_mode returns the packetization mode, which is 0 when absent.
pub(crate) fn packetization_mode(parameters: &RTCRtpFmtpParameters) -> Option<u32> {
    match parameters.get(PACKETIZATION_MODE) {
        Some(v) => v.as_u32(),
        None => Some(0),
    }
}

#[derive(Debug, PartialEq)]
pub(crate) struct H264Fmtp {
    pub(crate) parameters: RTCRtpFmtpParameters,
}

impl Fmtp for H264Fmtp {
    fn mime_type(&self) -> &str {
        MIME_TYPE_H264
    }

    /// Match returns true if h and b are compatible fmtp descriptions
    /// Based on RFC6184 Section 8.2.2:
    ///   The parameters identifying a media format configuration for H.264
    ///   are profile-level-id and packetization-mode.  These media format
    ///   configuration parameters (except for the level part of profile-
    ///   level-id) MUST be used symmetrically; that is, the answerer MUST
    ///   either maintain all configuration parameters or remove the media
    ///   format (payload type) completely if one or more of the parameter
    ///   values are not supported.
    ///
    /// Only packetization-mode is enforced here, with an implicit 0 on
    /// either side that omits it.
    fn match_fmtp(&self, f: &dyn Fmtp) -> bool {
        if let Some(c) = f.as_any().downcast_ref::<H264Fmtp>() {
            match (
                packetization_mode(&self.parameters),
                packetization_mode(&c.parameters),
            ) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            }
        } else {
            false
        }
    }

    fn parameter(&self, key: &str) -> Option<&RTCRtpFmtpValue> {
        self.parameters.get(key)
    }

    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }
}
