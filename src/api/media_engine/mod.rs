
use std::collections::HashSet;

use sdp::description::media::MediaDescription;
use sdp::description::session::ATTR_KEY_MSID;

use crate::error::{Error, Result};
use crate::peer_connection::sdp::{
    codecs_from_media_description, get_media_kind, pair_rtx_codecs,
    remote_streams_from_media, rtcp_parameters_from_media_description,
    rtp_extensions_from_media_description, RemoteStream,
};
use crate::rtp_transceiver::fmtp;
use crate::rtp_transceiver::fmtp::h264::PACKETIZATION_MODE;
use crate::rtp_transceiver::rtp_codec::*;
use crate::rtp_transceiver::PayloadType;

/// MIME_TYPE_H264 H264 MIME type.
/// Note: Matching should be case insensitive.
pub const MIME_TYPE_H264: &str = "video/H264";
/// MIME_TYPE_OPUS Opus MIME type
/// Note: Matching should be case insensitive.
pub const MIME_TYPE_OPUS: &str = "audio/opus";
/// MIME_TYPE_VP8 VP8 MIME type
/// Note: Matching should be case insensitive.
pub const MIME_TYPE_VP8: &str = "video/VP8";
/// MIME_TYPE_VP9 VP9 MIME type
/// Note: Matching should be case insensitive.
pub const MIME_TYPE_VP9: &str = "video/VP9";
/// MIME_TYPE_G722 G722 MIME type
/// Note: Matching should be case insensitive.
pub const MIME_TYPE_G722: &str = "audio/G722";
/// MIME_TYPE_PCMU PCMU MIME type
/// Note: Matching should be case insensitive.
pub const MIME_TYPE_PCMU: &str = "audio/PCMU";
/// MIME_TYPE_PCMA PCMA MIME type
/// Note: Matching should be case insensitive.
pub const MIME_TYPE_PCMA: &str = "audio/PCMA";
/// MIME_TYPE_RTX RTX MIME type
pub const MIME_TYPE_RTX: &str = "video/rtx";

pub const SDES_MID_URI: &str = "urn:ietf:params:rtp-hdrext:sdes:mid";
pub const AUDIO_LEVEL_URI: &str = "urn:ietf:params:rtp-hdrext:ssrc-audio-level";
pub const TOFFSET_URI: &str = "urn:ietf:params:rtp-hdrext:toffset";
pub const ABS_SEND_TIME_URI: &str = "http://www.webrtc.org/experiments/rtp-hdrext/abs-send-time";
pub const VIDEO_ORIENTATION_URI: &str = "urn:3gpp:video-orientation";
pub const TRANSPORT_CC_URI: &str =
    "http://www.ietf.org/id/draft-holmer-rmcat-transport-wide-cc-extensions-01";

fn feedback(typ: &str, parameter: &str) -> RTCPFeedback {
    RTCPFeedback {
        typ: typ.to_owned(),
        parameter: parameter.to_owned(),
    }
}

/// A MediaEngine holds the codecs and header extensions the SFU is able to
/// route. It is the local reference every remote media section is
/// negotiated against.
#[derive(Default, Debug, Clone)]
pub struct MediaEngine {
    capabilities: RTCRtpCapabilities,
}

impl MediaEngine {
    /// register_default_codecs registers the default codecs supported by the SFU.
    pub fn register_default_codecs(&mut self) -> Result<()> {
        // Default Audio Codecs
        for (mime_type, payload_type, clock_rate, channels, parameters) in [
            (
                MIME_TYPE_OPUS,
                111,
                48000,
                Some(2),
                fmtp::fmtp_parameters_from_sdp("minptime=10;useinbandfec=1")?,
            ),
            (MIME_TYPE_G722, 9, 8000, None, RTCRtpFmtpParameters::default()),
            (MIME_TYPE_PCMU, 0, 8000, None, RTCRtpFmtpParameters::default()),
            (MIME_TYPE_PCMA, 8, 8000, None, RTCRtpFmtpParameters::default()),
        ] {
            self.register_codec(RTCRtpCodecCapability {
                kind: RTPCodecType::Audio,
                mime_type: mime_type.to_owned(),
                preferred_payload_type: payload_type,
                clock_rate,
                channels,
                rtcp_feedback: vec![feedback("transport-cc", "")],
                parameters,
            })?;
        }

        let video_rtcp_feedback = vec![
            feedback("goog-remb", ""),
            feedback("transport-cc", ""),
            feedback("ccm", "fir"),
            feedback("nack", ""),
            feedback("nack", "pli"),
        ];
        for (mime_type, payload_type, rtx_payload_type, sdp_fmtp_line) in [
            (MIME_TYPE_VP8, 96, 97, ""),
            (MIME_TYPE_VP9, 98, 99, "profile-id=0"),
            (
                MIME_TYPE_H264,
                102,
                121,
                "level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=42e01f",
            ),
            (
                MIME_TYPE_H264,
                127,
                120,
                "level-asymmetry-allowed=1;packetization-mode=0;profile-level-id=42e01f",
            ),
        ] {
            self.register_codec(RTCRtpCodecCapability {
                kind: RTPCodecType::Video,
                mime_type: mime_type.to_owned(),
                preferred_payload_type: payload_type,
                clock_rate: 90000,
                channels: None,
                rtcp_feedback: video_rtcp_feedback.clone(),
                parameters: fmtp::fmtp_parameters_from_sdp(sdp_fmtp_line)?,
            })?;
            self.register_codec(RTCRtpCodecCapability {
                kind: RTPCodecType::Video,
                mime_type: MIME_TYPE_RTX.to_owned(),
                preferred_payload_type: rtx_payload_type,
                clock_rate: 90000,
                channels: None,
                rtcp_feedback: vec![],
                parameters: [("apt", payload_type)].into_iter().collect(),
            })?;
        }

        Ok(())
    }

    /// register_default_header_extensions registers the header extensions
    /// the SFU understands, with the ids browsers usually pick.
    pub fn register_default_header_extensions(&mut self) {
        for (uri, preferred_id, kind) in [
            (SDES_MID_URI, 1, RTCRtpHeaderExtensionKind::Both),
            (AUDIO_LEVEL_URI, 10, RTCRtpHeaderExtensionKind::Audio),
            (TOFFSET_URI, 2, RTCRtpHeaderExtensionKind::Video),
            (ABS_SEND_TIME_URI, 3, RTCRtpHeaderExtensionKind::Video),
            (VIDEO_ORIENTATION_URI, 4, RTCRtpHeaderExtensionKind::Video),
            (TRANSPORT_CC_URI, 5, RTCRtpHeaderExtensionKind::Both),
        ] {
            self.register_header_extension(RTCRtpHeaderExtensionCapability {
                kind,
                uri: uri.to_owned(),
                preferred_id,
            });
        }
    }

    /// register_codec adds codec to the MediaEngine. Registering the same
    /// codec twice is a no-op; reusing a payload type for another codec of
    /// the same kind is an error.
    pub fn register_codec(&mut self, codec: RTCRtpCodecCapability) -> Result<()> {
        if codec.kind == RTPCodecType::Unspecified {
            return Err(Error::ErrUnknownType);
        }

        for c in self.capabilities.codecs_for_kind(codec.kind) {
            if c.preferred_payload_type != codec.preferred_payload_type {
                continue;
            }
            if c.matches(&codec.mime_type, codec.clock_rate) {
                return Ok(());
            }
            return Err(Error::ErrCodecPayloadTypeInUse(codec.preferred_payload_type));
        }

        self.capabilities.codecs.push(codec);
        Ok(())
    }

    /// register_feedback adds feedback mechanism to already registered codecs.
    pub fn register_feedback(&mut self, feedback: RTCPFeedback, typ: RTPCodecType) {
        for c in self.capabilities.codecs.iter_mut() {
            if c.kind == typ && !c.is_feature_codec() && !c.rtcp_feedback.contains(&feedback) {
                c.rtcp_feedback.push(feedback.clone());
            }
        }
    }

    /// register_header_extension adds a header extension to the MediaEngine.
    pub fn register_header_extension(&mut self, extension: RTCRtpHeaderExtensionCapability) {
        self.capabilities.merge_header_extension(extension);
    }

    pub fn capabilities(&self) -> &RTCRtpCapabilities {
        &self.capabilities
    }

    /// capabilities_for_kind keeps only what applies to one media kind.
    pub fn capabilities_for_kind(&self, kind: RTPCodecType) -> RTCRtpCapabilities {
        RTCRtpCapabilities {
            codecs: self.capabilities.codecs_for_kind(kind).cloned().collect(),
            header_extensions: self
                .capabilities
                .header_extensions_for_kind(kind)
                .cloned()
                .collect(),
            fec_mechanisms: self.capabilities.fec_mechanisms.clone(),
        }
    }
}

/// NegotiatedMedia is the outcome of negotiating one remote media section.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct NegotiatedMedia {
    pub kind: RTPCodecType,
    pub codecs: Vec<RTCRtpCodecParameters>,
    pub encodings: Vec<RTCRtpEncodingParameters>,
    pub header_extensions: Vec<RTCRtpHeaderExtensionParameters>,
    pub rtcp: RTCRtcpParameters,
    pub msid: Option<String>,
}

impl NegotiatedMedia {
    /// media_codec is the codec encodings refer to: the first one that is
    /// not a feature codec.
    pub fn media_codec(&self) -> Option<&RTCRtpCodecParameters> {
        self.codecs.iter().find(|c| !c.is_feature_codec())
    }

    /// is_empty reports that no media codec survived, so the section must
    /// be closed.
    pub fn is_empty(&self) -> bool {
        self.media_codec().is_none()
    }

    pub fn rtp_parameters(&self, mid: &str) -> RTCRtpParameters {
        RTCRtpParameters {
            mid: mid.to_owned(),
            codecs: self.codecs.clone(),
            header_extensions: self.header_extensions.clone(),
            encodings: self.encodings.clone(),
            rtcp: self.rtcp.clone(),
            user_parameters: RTCRtpUserParameters {
                msid: self.msid.clone(),
            },
        }
    }

    /// stream_parameters narrows the parameters down to one remote track.
    pub(crate) fn stream_parameters(&self, mid: &str, stream: &RemoteStream) -> RTCRtpParameters {
        let payload_type = self.media_codec().map(|c| c.payload_type);
        let mut parameters = self.rtp_parameters(mid);

        parameters.encodings = stream
            .encodings
            .iter()
            .cloned()
            .map(|mut e| {
                e.codec_payload_type = payload_type;
                e
            })
            .collect();
        if let Some(cname) = &stream.cname {
            parameters.rtcp.cname = cname.clone();
        }
        parameters.user_parameters.msid = stream.msid.clone();

        parameters
    }
}

/// negotiate matches the codecs and header extensions of a remote media
/// section against the local capabilities. A section with no compatible
/// codec is not an error: the result is simply empty.
pub fn negotiate(
    remote_media: &MediaDescription,
    local: &RTCRtpCapabilities,
) -> Result<NegotiatedMedia> {
    let kind = get_media_kind(remote_media);
    if kind == RTPCodecType::Unspecified {
        return Ok(NegotiatedMedia {
            kind,
            ..Default::default()
        });
    }

    let remote_codecs = pair_rtx_codecs(codecs_from_media_description(remote_media)?)?;

    let mut codecs = vec![];
    for remote in remote_codecs {
        let Some(local_codec) = local.codecs_for_kind(kind).find(|l| codec_match(&remote, l)) else {
            log::debug!(
                "remote codec {} (pt {}) not supported",
                remote.mime_type,
                remote.payload_type
            );
            continue;
        };

        let mut codec = remote;
        codec
            .rtcp_feedback
            .retain(|fb| local_codec.rtcp_feedback.contains(fb));
        if is_h264(&codec.mime_type) && !codec.parameters.contains_key(PACKETIZATION_MODE) {
            codec.parameters.insert(PACKETIZATION_MODE, 0u32);
        }
        if codec.rtx.is_some() && !has_local_rtx(local, kind, local_codec.preferred_payload_type) {
            codec.rtx = None;
        }

        codecs.push(codec);
    }

    let local_uris: HashSet<&str> = local
        .header_extensions_for_kind(kind)
        .map(|e| e.uri.as_str())
        .collect();
    let mut header_extensions: Vec<RTCRtpHeaderExtensionParameters> = vec![];
    for ext in rtp_extensions_from_media_description(remote_media)? {
        if local_uris.contains(ext.uri.as_str())
            && !header_extensions.iter().any(|e| e.uri == ext.uri)
        {
            header_extensions.push(ext);
        }
    }

    let mut negotiated = NegotiatedMedia {
        kind,
        codecs,
        encodings: vec![],
        header_extensions,
        rtcp: rtcp_parameters_from_media_description(remote_media),
        msid: remote_media
            .attribute(ATTR_KEY_MSID)
            .flatten()
            .map(|s| s.to_owned()),
    };

    if let Some(payload_type) = negotiated.media_codec().map(|c| c.payload_type) {
        let streams = remote_streams_from_media(remote_media)?;
        if negotiated.msid.is_none() {
            negotiated.msid = streams.iter().find_map(|s| s.msid.clone());
        }
        negotiated.encodings = streams
            .into_iter()
            .flat_map(|s| s.encodings)
            .map(|mut e| {
                e.codec_payload_type = Some(payload_type);
                e
            })
            .collect();
    }

    Ok(negotiated)
}

fn is_h264(mime_type: &str) -> bool {
    mime_type.eq_ignore_ascii_case(MIME_TYPE_H264)
}

/// codec_match compares mime type and clock rate, then the codec specific
/// fmtp rules. Channel counts must agree when both sides give one.
fn codec_match(remote: &RTCRtpCodecParameters, local: &RTCRtpCodecCapability) -> bool {
    if !local.matches(&remote.mime_type, remote.clock_rate) {
        return false;
    }

    if let (Some(a), Some(b)) = (remote.channels, local.channels) {
        if a != b {
            return false;
        }
    }

    let remote_fmtp = fmtp::parse(&remote.mime_type, &remote.parameters);
    let local_fmtp = fmtp::parse(&local.mime_type, &local.parameters);
    remote_fmtp.match_fmtp(&*local_fmtp)
}

fn has_local_rtx(local: &RTCRtpCapabilities, kind: RTPCodecType, apt: PayloadType) -> bool {
    local.codecs_for_kind(kind).any(|c| {
        c.name().eq_ignore_ascii_case("rtx")
            && c.parameters.get("apt").and_then(|v| v.as_u32()) == Some(u32::from(apt))
    })
}
