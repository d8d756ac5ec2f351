#[cfg(test)]
mod sdp_test;

pub(crate) mod plan_b;
pub mod sdp_type;
pub(crate) mod sdp_strategy;
pub mod session_description;
pub(crate) mod track_ssrc_index;
pub(crate) mod unified_plan;

use std::collections::{HashMap, HashSet};
use std::io::BufReader;

use sdp::description::common::{Address, Bandwidth, ConnectionInformation};
use sdp::description::media::{MediaDescription, RangedPort};
use sdp::description::session::*;
use sdp::extmap::ExtMap;
use sdp::util::ConnectionRole;
use url::Url;

use crate::dtls_transport::dtls_fingerprint::RTCDtlsFingerprint;
use crate::dtls_transport::dtls_parameters::DTLSParameters;
use crate::dtls_transport::dtls_role::DTLSRole;
use crate::error::{Error, Result};
use crate::ice_transport::ice_candidate::RTCIceCandidate;
use crate::ice_transport::ice_parameters::RTCIceParameters;
use crate::rtp_transceiver::fmtp;
use crate::rtp_transceiver::rtp_codec::*;
use crate::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use crate::rtp_transceiver::{PayloadType, SSRC};

pub(crate) const MEDIA_SECTION_APPLICATION: &str = "application";

pub(crate) const ATTR_KEY_RTPMAP: &str = "rtpmap";
pub(crate) const ATTR_KEY_FMTP: &str = "fmtp";
pub(crate) const ATTR_KEY_RTCP_FB: &str = "rtcp-fb";
pub(crate) const ATTR_KEY_FINGERPRINT: &str = "fingerprint";
pub(crate) const ATTR_KEY_ICE_OPTIONS: &str = "ice-options";

pub(crate) const SEMANTIC_TOKEN_SIMULCAST: &str = "SIM";

/// Payload type announced by `m=` lines that carry no usable codec.
pub(crate) const DUMMY_PAYLOAD_TYPE: &str = "0";

const RTX_CODEC_NAME: &str = "rtx";
const APT_PARAMETER: &str = "apt";
const RTX_TIME_PARAMETER: &str = "rtxTime";

pub(crate) fn get_mid_value(media: &MediaDescription) -> Option<&str> {
    media.attribute(ATTR_KEY_MID).flatten()
}

pub(crate) fn get_peer_direction(media: &MediaDescription) -> RTCRtpTransceiverDirection {
    for a in &media.attributes {
        let direction = RTCRtpTransceiverDirection::from(a.key.as_str());
        if direction != RTCRtpTransceiverDirection::Unspecified {
            return direction;
        }
    }
    RTCRtpTransceiverDirection::Unspecified
}

/// get_media_kind returns the codec type of an `m=` line; anything but audio
/// and video is Unspecified.
pub(crate) fn get_media_kind(media: &MediaDescription) -> RTPCodecType {
    RTPCodecType::from(media.media_name.media.to_lowercase().as_str())
}

fn attributes<'a>(media: &'a MediaDescription, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    media
        .attributes
        .iter()
        .filter(move |a| a.key == key)
        .filter_map(|a| a.value.as_deref())
}

/// Codecs that may be listed in `m=` without an rtpmap (RFC 3551).
fn static_codec(payload_type: PayloadType) -> Option<(&'static str, u32)> {
    match payload_type {
        0 => Some(("PCMU", 8000)),
        8 => Some(("PCMA", 8000)),
        9 => Some(("G722", 8000)),
        _ => None,
    }
}

/// parse_rtpmap reads `<pt> <name>/<clock>[/<channels>]`.
fn parse_rtpmap(value: &str) -> Result<(PayloadType, String, u32, Option<u8>)> {
    let malformed = || Error::ErrInvalidSdp(format!("malformed rtpmap: {value}"));

    let (pt, encoding) = value
        .trim()
        .split_once(char::is_whitespace)
        .ok_or_else(malformed)?;
    let pt = pt.parse::<PayloadType>().map_err(|_| malformed())?;

    let mut split = encoding.trim().split('/');
    let name = split.next().filter(|n| !n.is_empty()).ok_or_else(malformed)?;
    let clock_rate = split
        .next()
        .ok_or_else(malformed)?
        .parse::<u32>()
        .map_err(|_| malformed())?;
    let channels = match split.next() {
        Some(c) => Some(c.parse::<u8>().map_err(|_| malformed())?),
        None => None,
    };

    Ok((pt, name.to_owned(), clock_rate, channels))
}

/// codecs_from_media_description lists the codecs of an `m=` line in format
/// order, with their fmtp parameters and rtcp feedback folded in. RTX
/// entries are returned as plain codecs; pairing them is left to the caller.
pub(crate) fn codecs_from_media_description(
    m: &MediaDescription,
) -> Result<Vec<RTCRtpCodecParameters>> {
    let kind = m.media_name.media.to_lowercase();

    let mut rtpmaps = HashMap::new();
    for value in attributes(m, ATTR_KEY_RTPMAP) {
        let (pt, name, clock_rate, channels) = parse_rtpmap(value)?;
        rtpmaps.insert(pt, (name, clock_rate, channels));
    }

    let mut out: Vec<RTCRtpCodecParameters> = vec![];
    for format in &m.media_name.formats {
        let payload_type = format
            .parse::<PayloadType>()
            .map_err(|_| Error::ErrInvalidSdp(format!("malformed payload type: {format}")))?;
        if out.iter().any(|c| c.payload_type == payload_type) {
            continue;
        }

        let (name, clock_rate, channels) = match rtpmaps.remove(&payload_type) {
            Some(rtpmap) => rtpmap,
            None => match static_codec(payload_type) {
                Some((name, clock_rate)) => (name.to_owned(), clock_rate, None),
                None => {
                    log::debug!("payload type {payload_type} has no rtpmap, skipped");
                    continue;
                }
            },
        };

        out.push(RTCRtpCodecParameters {
            mime_type: format!("{kind}/{name}"),
            payload_type,
            clock_rate,
            channels: channels.filter(|c| *c > 1),
            ..Default::default()
        });
    }

    for value in attributes(m, ATTR_KEY_FMTP) {
        let (payload_type, config) = fmtp::parse_fmtp_attribute(value)?;
        let parameters = fmtp::fmtp_parameters_from_sdp(config)?;
        if let Some(codec) = out.iter_mut().find(|c| c.payload_type == payload_type) {
            codec.parameters = parameters;
        }
    }

    for value in attributes(m, ATTR_KEY_RTCP_FB) {
        let mut split = value.split_whitespace();
        let (target, typ) = match (split.next(), split.next()) {
            (Some(target), Some(typ)) => (target, typ),
            _ => {
                log::warn!("ignoring malformed rtcp-fb: {value}");
                continue;
            }
        };
        let feedback = RTCPFeedback {
            typ: typ.to_owned(),
            parameter: split.collect::<Vec<&str>>().join(" "),
        };

        if target == "*" {
            for codec in out.iter_mut() {
                codec.rtcp_feedback.push(feedback.clone());
            }
        } else if let Ok(payload_type) = target.parse::<PayloadType>() {
            if let Some(codec) = out.iter_mut().find(|c| c.payload_type == payload_type) {
                codec.rtcp_feedback.push(feedback);
            }
        }
    }

    Ok(out)
}

/// rtp_extensions_from_media_description lists the `a=extmap` lines of a
/// section, in order.
pub(crate) fn rtp_extensions_from_media_description(
    m: &MediaDescription,
) -> Result<Vec<RTCRtpHeaderExtensionParameters>> {
    let mut out = vec![];

    for a in &m.attributes {
        if a.key == ATTR_KEY_EXT_MAP {
            let a_str = a.to_string();
            let mut reader = BufReader::new(a_str.as_bytes());
            let e = ExtMap::unmarshal(&mut reader)?;

            if let Some(uri) = e.uri {
                out.push(RTCRtpHeaderExtensionParameters {
                    uri: uri.to_string(),
                    id: e.value as u16,
                });
            }
        }
    }

    Ok(out)
}

pub(crate) fn rtcp_parameters_from_media_description(m: &MediaDescription) -> RTCRtcpParameters {
    let cname = ssrc_infos(m)
        .into_iter()
        .find_map(|info| info.cname)
        .unwrap_or_default();

    RTCRtcpParameters {
        cname,
        mux: m.attribute(ATTR_KEY_RTCPMUX).is_some(),
        reduced_size: m.attribute(ATTR_KEY_RTCPRSIZE).is_some(),
    }
}

/// pair_rtx_codecs moves every RTX entry onto the codec its `apt` names and
/// returns the remaining codecs. An RTX codec naming no present codec is
/// dropped; one without `apt` fails the whole section.
pub(crate) fn pair_rtx_codecs(
    codecs: Vec<RTCRtpCodecParameters>,
) -> Result<Vec<RTCRtpCodecParameters>> {
    let (rtx, mut media): (Vec<_>, Vec<_>) = codecs
        .into_iter()
        .partition(|c| c.name().eq_ignore_ascii_case(RTX_CODEC_NAME));

    for r in rtx {
        let apt = r
            .parameters
            .get(APT_PARAMETER)
            .and_then(|v| v.as_u32())
            .ok_or(Error::ErrRtxCodecWithoutApt)?;

        match media.iter_mut().find(|c| u32::from(c.payload_type) == apt) {
            Some(codec) => {
                codec.rtx = Some(RTCRtpCodecRtx {
                    payload_type: r.payload_type,
                    rtx_time: r.parameters.get(RTX_TIME_PARAMETER).and_then(|v| v.as_u32()),
                });
            }
            None => log::debug!("rtx payload type {} has no codec {apt}", r.payload_type),
        }
    }

    Ok(media)
}

/// desc_to_capabilities extracts every codec and header extension a remote
/// description advertises. Codecs are keyed by kind and payload type across
/// sections.
pub(crate) fn desc_to_capabilities(parsed: &SessionDescription) -> Result<RTCRtpCapabilities> {
    let mut capabilities = RTCRtpCapabilities::default();

    for media in &parsed.media_descriptions {
        let kind = get_media_kind(media);
        if kind == RTPCodecType::Unspecified {
            continue;
        }

        for codec in codecs_from_media_description(media)? {
            let name = codec.name().to_lowercase();
            if matches!(name.as_str(), "ulpfec" | "flexfec" | "red") {
                continue;
            }

            let capability = RTCRtpCodecCapability {
                kind,
                mime_type: codec.mime_type,
                preferred_payload_type: codec.payload_type,
                clock_rate: codec.clock_rate,
                channels: codec.channels,
                rtcp_feedback: codec.rtcp_feedback,
                parameters: codec.parameters,
            };
            match capabilities
                .codecs
                .iter_mut()
                .find(|c| {
                    c.kind == capability.kind
                        && c.preferred_payload_type == capability.preferred_payload_type
                })
            {
                Some(saved) => *saved = capability,
                None => capabilities.codecs.push(capability),
            }
        }

        for ext in rtp_extensions_from_media_description(media)? {
            capabilities.merge_header_extension(RTCRtpHeaderExtensionCapability {
                kind: kind.into(),
                uri: ext.uri,
                preferred_id: ext.id,
            });
        }
    }

    Ok(capabilities)
}

/// extract_remote_dtls_parameters reads the remote role and fingerprint from
/// the first section carrying `a=setup`. Some browsers only put the
/// fingerprint at session level.
pub(crate) fn extract_remote_dtls_parameters(parsed: &SessionDescription) -> Result<DTLSParameters> {
    let media = parsed
        .media_descriptions
        .iter()
        .find(|m| m.attribute(ATTR_KEY_CONNECTION_SETUP).is_some())
        .ok_or(Error::ErrNoRemoteDtlsParameters)?;

    let setup = media
        .attribute(ATTR_KEY_CONNECTION_SETUP)
        .flatten()
        .unwrap_or_default();
    let fingerprint = media
        .attribute(ATTR_KEY_FINGERPRINT)
        .flatten()
        .or_else(|| parsed.attribute(ATTR_KEY_FINGERPRINT).map(|s| s.as_str()))
        .and_then(RTCDtlsFingerprint::parse)
        .ok_or(Error::ErrNoRemoteDtlsParameters)?;

    Ok(DTLSParameters {
        role: DTLSRole::from(ConnectionRole::from(setup)),
        fingerprints: vec![fingerprint],
    })
}

/// SsrcInfo is what the `a=ssrc` lines of a section tell about one SSRC.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub(crate) struct SsrcInfo {
    pub(crate) ssrc: SSRC,
    pub(crate) cname: Option<String>,
    pub(crate) msid: Option<String>,
    pub(crate) label: Option<String>,
}

/// ssrc_infos collects the `a=ssrc` lines of a section per SSRC, in the
/// order SSRCs first appear.
pub(crate) fn ssrc_infos(m: &MediaDescription) -> Vec<SsrcInfo> {
    let mut infos: Vec<SsrcInfo> = vec![];

    for value in attributes(m, ATTR_KEY_SSRC) {
        let (ssrc, attr) = match value.split_once(' ') {
            Some((ssrc, attr)) => (ssrc, attr.trim()),
            None => (value, ""),
        };
        let ssrc = match ssrc.parse::<SSRC>() {
            Ok(ssrc) => ssrc,
            Err(_) => {
                log::warn!("ignoring malformed ssrc line: {value}");
                continue;
            }
        };

        let idx = match infos.iter().position(|i| i.ssrc == ssrc) {
            Some(idx) => idx,
            None => {
                infos.push(SsrcInfo {
                    ssrc,
                    ..Default::default()
                });
                infos.len() - 1
            }
        };

        let (key, value) = attr.split_once(':').unwrap_or((attr, ""));
        let value = Some(value.trim().to_owned());
        match key {
            "cname" => infos[idx].cname = value,
            "msid" => infos[idx].msid = value,
            "label" => infos[idx].label = value,
            _ => {}
        }
    }

    infos
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SsrcGroup {
    pub(crate) semantics: String,
    pub(crate) ssrcs: Vec<SSRC>,
}

pub(crate) fn ssrc_groups(m: &MediaDescription) -> Result<Vec<SsrcGroup>> {
    let mut groups = vec![];

    for value in attributes(m, ATTR_KEY_SSRCGROUP) {
        let mut split = value.split_whitespace();
        let semantics = split.next().unwrap_or_default().to_owned();
        let ssrcs = split
            .map(|s| {
                s.parse::<SSRC>()
                    .map_err(|_| Error::ErrInvalidSdp(format!("malformed ssrc-group: {value}")))
            })
            .collect::<Result<Vec<SSRC>>>()?;
        groups.push(SsrcGroup { semantics, ssrcs });
    }

    Ok(groups)
}

/// RemoteStream is one track a remote section sends: all its encodings and
/// the identity the remote gave it.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub(crate) struct RemoteStream {
    pub(crate) track_id: String,
    pub(crate) encodings: Vec<RTCRtpEncodingParameters>,
    pub(crate) cname: Option<String>,
    pub(crate) msid: Option<String>,
}

impl RemoteStream {
    pub(crate) fn ssrcs(&self) -> Vec<SSRC> {
        let mut ssrcs = vec![];
        for e in &self.encodings {
            ssrcs.extend(e.ssrc);
            ssrcs.extend(e.rtx.as_ref().map(|r| r.ssrc));
        }
        ssrcs
    }
}

/// remote_streams_from_media groups the SSRCs of a section into tracks.
/// SIM groups form one track with several encodings, FID groups attach an
/// RTX SSRC to its media SSRC, and any other SSRC is a track on its own.
pub(crate) fn remote_streams_from_media(m: &MediaDescription) -> Result<Vec<RemoteStream>> {
    let infos = ssrc_infos(m);
    let groups = ssrc_groups(m)?;
    let media_msid = m.attribute(ATTR_KEY_MSID).flatten();

    let mut rtx_of = HashMap::new();
    for g in groups.iter().filter(|g| g.semantics == SEMANTIC_TOKEN_FLOW_IDENTIFICATION) {
        if let [media, rtx] = g.ssrcs[..] {
            rtx_of.insert(media, rtx);
        }
    }
    let rtx_ssrcs: HashSet<SSRC> = rtx_of.values().copied().collect();

    let mut used = HashSet::new();
    let mut tracks: Vec<Vec<SSRC>> = vec![];
    for g in groups.iter().filter(|g| g.semantics == SEMANTIC_TOKEN_SIMULCAST) {
        if g.ssrcs.iter().any(|s| used.contains(s)) {
            continue;
        }
        used.extend(g.ssrcs.iter().copied());
        tracks.push(g.ssrcs.clone());
    }
    for media in groups
        .iter()
        .filter(|g| g.semantics == SEMANTIC_TOKEN_FLOW_IDENTIFICATION)
        .filter_map(|g| g.ssrcs.first().copied())
    {
        if used.insert(media) {
            tracks.push(vec![media]);
        }
    }
    for info in &infos {
        if !rtx_ssrcs.contains(&info.ssrc) && used.insert(info.ssrc) {
            tracks.push(vec![info.ssrc]);
        }
    }

    let mut streams = vec![];
    for ssrcs in tracks {
        let first = ssrcs[0];
        let info = infos.iter().find(|i| i.ssrc == first);

        let msid = info
            .and_then(|i| i.msid.clone())
            .or_else(|| media_msid.map(|s| s.to_owned()));
        let track_id = info
            .and_then(|i| i.label.clone())
            .or_else(|| msid_track_id(info.and_then(|i| i.msid.as_deref())))
            .or_else(|| msid_track_id(media_msid))
            .unwrap_or_else(|| first.to_string());

        streams.push(RemoteStream {
            track_id,
            encodings: ssrcs
                .iter()
                .map(|ssrc| RTCRtpEncodingParameters {
                    ssrc: Some(*ssrc),
                    rtx: rtx_of.get(ssrc).map(|rtx| RTCRtpRtxParameters { ssrc: *rtx }),
                    ..Default::default()
                })
                .collect(),
            cname: info.and_then(|i| i.cname.clone()),
            msid,
        });
    }

    Ok(streams)
}

/// An msid is `<stream id> <track id>`.
fn msid_track_id(msid: Option<&str>) -> Option<String> {
    msid.and_then(|m| m.split_whitespace().nth(1))
        .map(|t| t.to_owned())
}

/// FakePortGenerator hands out the port numbers written in `m=` lines. The
/// value has no meaning under ICE and BUNDLE but must not be 0, which
/// rejects the section.
#[derive(Debug, Clone)]
pub(crate) struct FakePortGenerator {
    min: u16,
    max: u16,
    next: u16,
}

impl FakePortGenerator {
    pub(crate) fn new(min: u16, max: u16) -> Self {
        let min = min.max(1);
        let max = max.max(min);
        FakePortGenerator {
            min,
            max,
            next: min,
        }
    }

    pub(crate) fn next_port(&mut self) -> u16 {
        let port = self.next;
        self.next = if port >= self.max { self.min } else { port + 1 };
        port
    }
}

/// new_session_description builds the session level part of a local
/// description.
pub(crate) fn new_session_description(
    origin: &Origin,
    bundle_mids: &[String],
    fingerprint: &RTCDtlsFingerprint,
) -> SessionDescription {
    let mut d = SessionDescription {
        version: 0,
        origin: origin.clone(),
        session_name: "-".to_owned(),
        time_descriptions: vec![TimeDescription {
            timing: Timing {
                start_time: 0,
                stop_time: 0,
            },
            repeat_times: vec![],
        }],
        ..Default::default()
    };

    if !bundle_mids.is_empty() {
        d = d.with_value_attribute(
            ATTR_KEY_GROUP.to_owned(),
            format!("BUNDLE {}", bundle_mids.join(" ")),
        );
    }

    // RFC 5245 S15.3
    d.with_property_attribute(ATTR_KEY_ICELITE.to_owned())
        .with_fingerprint(
            fingerprint.algorithm.clone(),
            fingerprint.value.to_uppercase(),
        )
        .with_value_attribute(
            ATTR_KEY_MSID_SEMANTIC.to_owned(),
            format!("{SEMANTIC_TOKEN_WEBRTC_MEDIA_STREAMS} *"),
        )
}

/// bundle_mids lists the mids of the open sections among `medias`, in order.
pub(crate) fn bundle_mids(medias: &[MediaDescription]) -> Vec<String> {
    medias
        .iter()
        .filter(|m| m.media_name.port.value != 0)
        .filter_map(get_mid_value)
        .map(str::to_owned)
        .collect()
}

/// closed_media_section renders a rejected section: port 0 and a dummy
/// format so the `m=` line keeps its place.
pub(crate) fn closed_media_section(media: &str, mid: &str) -> MediaDescription {
    let mut m = MediaDescription::new_jsep_media_description(media.to_owned(), vec![]);
    m.media_name.port = RangedPort {
        value: 0,
        range: None,
    };
    if media == MEDIA_SECTION_APPLICATION {
        m.media_name.protos = vec!["UDP".to_owned(), "DTLS".to_owned(), "SCTP".to_owned()];
        m.media_name.formats = vec!["webrtc-datachannel".to_owned()];
    } else {
        m.media_name.formats = vec![DUMMY_PAYLOAD_TYPE.to_owned()];
    }

    m.with_value_attribute(ATTR_KEY_MID.to_owned(), mid.to_owned())
        .with_property_attribute(ATTR_KEY_INACTIVE.to_owned())
}

pub(crate) struct MediaSectionParams<'a> {
    pub(crate) media: &'a str,
    pub(crate) mid: &'a str,
    pub(crate) port: u16,
    pub(crate) direction: RTCRtpTransceiverDirection,
    pub(crate) setup: ConnectionRole,
    pub(crate) bandwidth: Option<u64>,
    pub(crate) codecs: &'a [RTCRtpCodecParameters],
    pub(crate) header_extensions: &'a [RTCRtpHeaderExtensionParameters],
    pub(crate) ice_parameters: &'a RTCIceParameters,
    pub(crate) candidates: &'a [RTCIceCandidate],
}

/// media_section renders an open section with its transport, codec and
/// header extension attributes. SSRC lines are added by the caller.
pub(crate) fn media_section(params: &MediaSectionParams<'_>) -> Result<MediaDescription> {
    let mut m = MediaDescription::new_jsep_media_description(params.media.to_owned(), vec![]);
    m.media_name.port = RangedPort {
        value: params.port as isize,
        range: None,
    };
    m.connection_information = Some(ConnectionInformation {
        network_type: "IN".to_owned(),
        address_type: "IP4".to_owned(),
        address: Some(Address {
            address: "127.0.0.1".to_owned(),
            ttl: None,
            range: None,
        }),
    });
    if let Some(bandwidth) = params.bandwidth {
        m.bandwidth.push(Bandwidth {
            experimental: false,
            bandwidth_type: "AS".to_owned(),
            bandwidth,
        });
    }

    m = m
        .with_value_attribute(ATTR_KEY_MID.to_owned(), params.mid.to_owned())
        .with_property_attribute(params.direction.to_string())
        .with_value_attribute(
            ATTR_KEY_CONNECTION_SETUP.to_owned(),
            params.setup.to_string(),
        )
        .with_ice_credentials(
            params.ice_parameters.username_fragment.clone(),
            params.ice_parameters.password.clone(),
        )
        .with_value_attribute(ATTR_KEY_ICE_OPTIONS.to_owned(), "renomination".to_owned());

    for c in params.candidates {
        m = m.with_value_attribute(ATTR_KEY_CANDIDATE.to_owned(), c.marshal());
    }
    m = m
        .with_property_attribute(ATTR_KEY_END_OF_CANDIDATES.to_owned())
        .with_property_attribute(ATTR_KEY_RTCPMUX.to_owned())
        .with_property_attribute(ATTR_KEY_RTCPRSIZE.to_owned());

    for ext in params.header_extensions {
        m = m.with_extmap(ExtMap {
            value: ext.id as isize,
            uri: Some(Url::parse(&ext.uri)?),
            ..Default::default()
        });
    }

    for codec in params.codecs {
        m = add_codec(m, codec);
    }

    Ok(m)
}

fn add_codec(mut m: MediaDescription, codec: &RTCRtpCodecParameters) -> MediaDescription {
    let pt = codec.payload_type;
    m.media_name.formats.push(pt.to_string());

    let mut rtpmap = format!("{pt} {}/{}", codec.name(), codec.clock_rate);
    if let Some(channels) = codec.channels.filter(|c| *c > 1) {
        rtpmap += format!("/{channels}").as_str();
    }
    m = m.with_value_attribute(ATTR_KEY_RTPMAP.to_owned(), rtpmap);

    for fb in &codec.rtcp_feedback {
        let value = if fb.parameter.is_empty() {
            format!("{pt} {}", fb.typ)
        } else {
            format!("{pt} {} {}", fb.typ, fb.parameter)
        };
        m = m.with_value_attribute(ATTR_KEY_RTCP_FB.to_owned(), value);
    }

    if !codec.parameters.is_empty() {
        m = m.with_value_attribute(
            ATTR_KEY_FMTP.to_owned(),
            format!("{pt} {}", fmtp::fmtp_parameters_to_sdp(&codec.parameters)),
        );
    }

    if let Some(rtx) = &codec.rtx {
        let rtx_pt = rtx.payload_type;
        m.media_name.formats.push(rtx_pt.to_string());
        m = m.with_value_attribute(
            ATTR_KEY_RTPMAP.to_owned(),
            format!("{rtx_pt} {RTX_CODEC_NAME}/{}", codec.clock_rate),
        );

        let mut config = format!("{APT_PARAMETER}={pt}");
        if let Some(rtx_time) = rtx.rtx_time {
            config += format!(";{}={rtx_time}", fmtp::param_to_sdp(RTX_TIME_PARAMETER)).as_str();
        }
        m = m.with_value_attribute(ATTR_KEY_FMTP.to_owned(), format!("{rtx_pt} {config}"));
    }

    m
}

/// add_sender_ssrcs writes the SSRC lines of one sender. With
/// `msid_on_ssrc` the msid goes on every `a=ssrc` line, as Plan B expects;
/// otherwise it is written once as a media level `a=msid`.
pub(crate) fn add_sender_ssrcs(
    mut m: MediaDescription,
    parameters: &RTCRtpParameters,
    msid: &str,
    msid_on_ssrc: bool,
) -> MediaDescription {
    let cname = &parameters.rtcp.cname;

    if !msid_on_ssrc {
        m = m.with_value_attribute(ATTR_KEY_MSID.to_owned(), msid.to_owned());
    }

    for e in &parameters.encodings {
        if let (Some(ssrc), Some(rtx)) = (e.ssrc, &e.rtx) {
            m = m.with_value_attribute(
                ATTR_KEY_SSRCGROUP.to_owned(),
                format!("{SEMANTIC_TOKEN_FLOW_IDENTIFICATION} {ssrc} {}", rtx.ssrc),
            );
        }
    }

    for e in &parameters.encodings {
        let ssrcs = e.ssrc.into_iter().chain(e.rtx.as_ref().map(|r| r.ssrc));
        for ssrc in ssrcs {
            m = m.with_value_attribute(ATTR_KEY_SSRC.to_owned(), format!("{ssrc} cname:{cname}"));
            if msid_on_ssrc {
                m = m.with_value_attribute(ATTR_KEY_SSRC.to_owned(), format!("{ssrc} msid:{msid}"));
            }
        }
    }

    m
}

/// capability_codecs turns the codecs of one kind into section codecs,
/// payload types as preferred.
pub(crate) fn capability_codecs(
    capabilities: &RTCRtpCapabilities,
    kind: RTPCodecType,
) -> Vec<RTCRtpCodecParameters> {
    capabilities
        .codecs_for_kind(kind)
        .map(RTCRtpCodecParameters::from)
        .collect()
}

pub(crate) fn capability_header_extensions(
    capabilities: &RTCRtpCapabilities,
    kind: RTPCodecType,
) -> Vec<RTCRtpHeaderExtensionParameters> {
    capabilities
        .header_extensions_for_kind(kind)
        .map(|e| RTCRtpHeaderExtensionParameters {
            uri: e.uri.clone(),
            id: e.preferred_id,
        })
        .collect()
}
