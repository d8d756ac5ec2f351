use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use unicase::UniCase;

use super::{PayloadType, SSRC};

/// Codec names that never carry media on their own. They are negotiated
/// alongside a media codec but never selected for an encoding.
pub(crate) const FEATURE_CODEC_NAMES: [&str; 6] =
    ["rtx", "ulpfec", "flexfec", "red", "cn", "telephone-event"];

pub(crate) fn is_feature_codec_name(name: &str) -> bool {
    FEATURE_CODEC_NAMES
        .iter()
        .any(|f| UniCase::new(*f) == UniCase::new(name))
}

/// RTPCodecType determines the type of a codec
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RTPCodecType {
    #[default]
    #[serde(rename = "unspecified")]
    Unspecified = 0,

    /// RTPCodecTypeAudio indicates this is an audio codec
    #[serde(rename = "audio")]
    Audio = 1,

    /// RTPCodecTypeVideo indicates this is a video codec
    #[serde(rename = "video")]
    Video = 2,
}

impl From<&str> for RTPCodecType {
    fn from(raw: &str) -> Self {
        match raw {
            "audio" => RTPCodecType::Audio,
            "video" => RTPCodecType::Video,
            _ => RTPCodecType::Unspecified,
        }
    }
}

impl From<u8> for RTPCodecType {
    fn from(v: u8) -> Self {
        match v {
            1 => RTPCodecType::Audio,
            2 => RTPCodecType::Video,
            _ => RTPCodecType::Unspecified,
        }
    }
}

impl fmt::Display for RTPCodecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTPCodecType::Audio => "audio",
            RTPCodecType::Video => "video",
            RTPCodecType::Unspecified => crate::UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}

/// A single fmtp value. Numeric values are kept as numbers so that
/// `packetization-mode=1` and `packetizationMode: 1` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RTCRtpFmtpValue {
    Number(u32),
    String(String),
}

impl RTCRtpFmtpValue {
    /// parse keeps the raw text unless it is a plain unsigned integer.
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<u32>() {
            Ok(n) => RTCRtpFmtpValue::Number(n),
            Err(_) => RTCRtpFmtpValue::String(raw.to_owned()),
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            RTCRtpFmtpValue::Number(n) => Some(*n),
            RTCRtpFmtpValue::String(s) => s.parse().ok(),
        }
    }
}

impl fmt::Display for RTCRtpFmtpValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RTCRtpFmtpValue::Number(n) => write!(f, "{n}"),
            RTCRtpFmtpValue::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<u32> for RTCRtpFmtpValue {
    fn from(n: u32) -> Self {
        RTCRtpFmtpValue::Number(n)
    }
}

impl From<u8> for RTCRtpFmtpValue {
    fn from(n: u8) -> Self {
        RTCRtpFmtpValue::Number(u32::from(n))
    }
}

impl From<&str> for RTCRtpFmtpValue {
    fn from(s: &str) -> Self {
        RTCRtpFmtpValue::String(s.to_owned())
    }
}

impl From<String> for RTCRtpFmtpValue {
    fn from(s: String) -> Self {
        RTCRtpFmtpValue::String(s)
    }
}

/// Codec specific parameters, keyed by their internal (camelCase) name.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCRtpFmtpParameters(BTreeMap<String, RTCRtpFmtpValue>);

impl RTCRtpFmtpParameters {
    pub fn insert<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<RTCRtpFmtpValue>,
    {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&RTCRtpFmtpValue> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<RTCRtpFmtpValue> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> std::collections::btree_map::Iter<'_, String, RTCRtpFmtpValue> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<K, V> FromIterator<(K, V)> for RTCRtpFmtpParameters
where
    K: Into<String>,
    V: Into<RTCRtpFmtpValue>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        RTCRtpFmtpParameters(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// RTCPFeedback signals the connection to use additional RTCP packet types.
/// <https://draft.ortc.org/#dom-rtcrtcpfeedback>
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCPFeedback {
    /// Type is the type of feedback.
    /// see: <https://draft.ortc.org/#dom-rtcrtcpfeedback>
    /// valid: ack, ccm, nack, goog-remb, transport-cc
    #[serde(rename = "type")]
    pub typ: String,

    /// The parameter value depends on the type.
    /// For example, type="nack" parameter="pli" will send Picture Loss Indicator packets.
    #[serde(default)]
    pub parameter: String,
}

/// RTCRtpCodecCapability describes one codec a party is able to handle.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCRtpCodecCapability {
    pub kind: RTPCodecType,
    pub mime_type: String,
    pub preferred_payload_type: PayloadType,
    pub clock_rate: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<u8>,
    #[serde(default)]
    pub rtcp_feedback: Vec<RTCPFeedback>,
    #[serde(default)]
    pub parameters: RTCRtpFmtpParameters,
}

impl RTCRtpCodecCapability {
    /// name returns the encoding name, the part of the mime type after the slash.
    pub fn name(&self) -> &str {
        mime_subtype(&self.mime_type)
    }

    pub fn is_feature_codec(&self) -> bool {
        is_feature_codec_name(self.name())
    }

    /// matches compares mime type (case-insensitive) and clock rate.
    pub(crate) fn matches(&self, mime_type: &str, clock_rate: u32) -> bool {
        UniCase::new(self.mime_type.as_str()) == UniCase::new(mime_type)
            && self.clock_rate == clock_rate
    }
}

/// RTCRtpHeaderExtensionKind tells which media kinds a header extension applies to.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RTCRtpHeaderExtensionKind {
    #[serde(rename = "audio")]
    Audio,
    #[serde(rename = "video")]
    Video,
    #[default]
    #[serde(rename = "")]
    Both,
}

impl RTCRtpHeaderExtensionKind {
    pub fn applies_to(&self, kind: RTPCodecType) -> bool {
        match self {
            RTCRtpHeaderExtensionKind::Audio => kind == RTPCodecType::Audio,
            RTCRtpHeaderExtensionKind::Video => kind == RTPCodecType::Video,
            RTCRtpHeaderExtensionKind::Both => kind != RTPCodecType::Unspecified,
        }
    }
}

impl From<RTPCodecType> for RTCRtpHeaderExtensionKind {
    fn from(kind: RTPCodecType) -> Self {
        match kind {
            RTPCodecType::Audio => RTCRtpHeaderExtensionKind::Audio,
            RTPCodecType::Video => RTCRtpHeaderExtensionKind::Video,
            RTPCodecType::Unspecified => RTCRtpHeaderExtensionKind::Both,
        }
    }
}

/// RTCRtpHeaderExtensionCapability is used to define a RFC5285 RTP header extension supported by the codec.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCRtpHeaderExtensionCapability {
    #[serde(default)]
    pub kind: RTCRtpHeaderExtensionKind,
    pub uri: String,
    pub preferred_id: u16,
}

/// RTCRtpHeaderExtensionParameters represents a negotiated RFC5285 RTP header extension.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCRtpHeaderExtensionParameters {
    pub uri: String,
    pub id: u16,
}

/// RTCRtpCodecRtx carries the retransmission payload type paired with a media codec.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCRtpCodecRtx {
    pub payload_type: PayloadType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtx_time: Option<u32>,
}

/// RTCRtpCodecParameters is one negotiated codec of a media section.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCRtpCodecParameters {
    pub mime_type: String,
    pub payload_type: PayloadType,
    pub clock_rate: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<u8>,
    #[serde(default)]
    pub rtcp_feedback: Vec<RTCPFeedback>,
    #[serde(default)]
    pub parameters: RTCRtpFmtpParameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtx: Option<RTCRtpCodecRtx>,
}

impl RTCRtpCodecParameters {
    pub fn name(&self) -> &str {
        mime_subtype(&self.mime_type)
    }

    pub fn is_feature_codec(&self) -> bool {
        is_feature_codec_name(self.name())
    }
}

impl From<&RTCRtpCodecCapability> for RTCRtpCodecParameters {
    fn from(c: &RTCRtpCodecCapability) -> Self {
        RTCRtpCodecParameters {
            mime_type: c.mime_type.clone(),
            payload_type: c.preferred_payload_type,
            clock_rate: c.clock_rate,
            channels: c.channels,
            rtcp_feedback: c.rtcp_feedback.clone(),
            parameters: c.parameters.clone(),
            rtx: None,
        }
    }
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCRtpRtxParameters {
    pub ssrc: SSRC,
}

/// RTCRtpEncodingParameters describes one RTP stream of a sender or receiver.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCRtpEncodingParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssrc: Option<SSRC>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codec_payload_type: Option<PayloadType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtx: Option<RTCRtpRtxParameters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scalability_mode: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCRtcpParameters {
    #[serde(default)]
    pub cname: String,
    #[serde(default)]
    pub mux: bool,
    #[serde(default)]
    pub reduced_size: bool,
}

/// Application level values attached to RTP parameters.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCRtpUserParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msid: Option<String>,
}

/// RTCRtpParameters is the full negotiated description of one RTP stream set.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCRtpParameters {
    #[serde(default)]
    pub mid: String,
    pub codecs: Vec<RTCRtpCodecParameters>,
    #[serde(default)]
    pub header_extensions: Vec<RTCRtpHeaderExtensionParameters>,
    #[serde(default)]
    pub encodings: Vec<RTCRtpEncodingParameters>,
    #[serde(default)]
    pub rtcp: RTCRtcpParameters,
    #[serde(default)]
    pub user_parameters: RTCRtpUserParameters,
}

/// RTCRtpCapabilities is the codec and header extension universe of one party.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCRtpCapabilities {
    pub codecs: Vec<RTCRtpCodecCapability>,
    #[serde(default)]
    pub header_extensions: Vec<RTCRtpHeaderExtensionCapability>,
    #[serde(default)]
    pub fec_mechanisms: Vec<String>,
}

impl RTCRtpCapabilities {
    pub fn codecs_for_kind(
        &self,
        kind: RTPCodecType,
    ) -> impl Iterator<Item = &RTCRtpCodecCapability> + '_ {
        self.codecs.iter().filter(move |c| c.kind == kind)
    }

    pub fn header_extensions_for_kind(
        &self,
        kind: RTPCodecType,
    ) -> impl Iterator<Item = &RTCRtpHeaderExtensionCapability> + '_ {
        self.header_extensions
            .iter()
            .filter(move |e| e.kind.applies_to(kind))
    }

    /// merge_header_extension keeps at most one entry per (kind, uri). An id
    /// already registered for the same uri under the other kind widens that
    /// entry to both kinds.
    pub fn merge_header_extension(&mut self, ext: RTCRtpHeaderExtensionCapability) {
        for saved in &mut self.header_extensions {
            if saved.uri != ext.uri {
                continue;
            }
            if saved.kind == ext.kind || saved.kind == RTCRtpHeaderExtensionKind::Both {
                return;
            }
            if saved.preferred_id == ext.preferred_id {
                saved.kind = RTCRtpHeaderExtensionKind::Both;
                return;
            }
        }

        self.header_extensions.push(ext);
    }
}

fn mime_subtype(mime_type: &str) -> &str {
    match mime_type.split_once('/') {
        Some((_, name)) => name,
        None => mime_type,
    }
}
