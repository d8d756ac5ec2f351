use serde::{Deserialize, Serialize};

use crate::peer_connection::policy::sdp_semantics::RTCSdpSemantics;
use crate::rtp_transceiver::rtp_codec::{RTCRtpCapabilities, RTPCodecType};

/// RTCTransportOptions is handed as is to the peer when its transport is
/// created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RTCTransportOptions {
    pub udp: bool,
    pub tcp: bool,
    pub prefer_udp: bool,
    pub prefer_tcp: bool,
}

impl Default for RTCTransportOptions {
    fn default() -> Self {
        RTCTransportOptions {
            udp: true,
            tcp: true,
            prefer_udp: false,
            prefer_tcp: false,
        }
    }
}

/// RTCBandwidth caps the bitrate announced per media kind, in kbps.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RTCBandwidth {
    pub audio: Option<u64>,
    pub video: Option<u64>,
}

impl RTCBandwidth {
    pub fn for_kind(&self, kind: RTPCodecType) -> Option<u64> {
        match kind {
            RTPCodecType::Audio => self.audio,
            RTPCodecType::Video => self.video,
            RTPCodecType::Unspecified => None,
        }
    }
}

/// Defines a set of parameters to configure how the signaling of an
/// [`RTCPeerConnection`] is carried out. These may be set up once and
/// reused across multiple connections, and are treated as readonly.
///
/// [`RTCPeerConnection`]: crate::peer_connection::RTCPeerConnection
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RTCConfiguration {
    /// Selects the SDP dialect, once, for the lifetime of the connection.
    pub sdp_semantics: RTCSdpSemantics,

    pub transport_options: RTCTransportOptions,

    pub bandwidth: RTCBandwidth,

    /// Number of audio streams the remote side is asked to send when this
    /// side makes the first offer.
    pub audio_receive_slots: usize,

    /// Number of video streams the remote side is asked to send when this
    /// side makes the first offer.
    pub video_receive_slots: usize,

    /// Capabilities of the remote endpoint to assume when this side makes
    /// the first offer. Defaults to the media engine's.
    pub capabilities: Option<RTCRtpCapabilities>,
}
