pub(crate) mod generic;
pub(crate) mod h264;

use std::any::Any;
use std::fmt;

use unicase::UniCase;

use crate::error::{Error, Result};
use crate::rtp_transceiver::rtp_codec::{RTCRtpFmtpParameters, RTCRtpFmtpValue};
use crate::rtp_transceiver::PayloadType;
use generic::GenericFmtp;
use h264::H264Fmtp;

/// Fmtp interface for implementing custom
/// Fmtp parsers based on mime_type
pub(crate) trait Fmtp: fmt::Debug {
    /// mime_type returns the mime_type associated with
    /// the fmtp
    fn mime_type(&self) -> &str;

    /// match_fmtp compares two fmtp descriptions for
    /// compatibility based on the mime_type
    fn match_fmtp(&self, f: &dyn Fmtp) -> bool;

    /// parameter returns a value for the associated key
    /// if contained in the parsed fmtp string
    fn parameter(&self, key: &str) -> Option<&RTCRtpFmtpValue>;

    fn as_any(&self) -> &(dyn Any + Send + Sync);
}

/// parse builds the codec specific matcher for already normalized parameters.
pub(crate) fn parse(mime_type: &str, parameters: &RTCRtpFmtpParameters) -> Box<dyn Fmtp> {
    if UniCase::new(mime_type) == UniCase::new(h264::MIME_TYPE_H264) {
        Box::new(H264Fmtp {
            parameters: parameters.clone(),
        })
    } else {
        Box::new(GenericFmtp {
            mime_type: mime_type.to_lowercase(),
            parameters: parameters.clone(),
        })
    }
}

/// parse_fmtp_attribute splits the value of an `a=fmtp` line into its payload
/// type and its parameter list.
pub(crate) fn parse_fmtp_attribute(value: &str) -> Result<(PayloadType, &str)> {
    let (pt, config) = value
        .trim()
        .split_once(char::is_whitespace)
        .ok_or_else(|| Error::ErrInvalidSdp(format!("malformed fmtp line: {value}")))?;

    let pt = pt
        .parse::<PayloadType>()
        .map_err(|_| Error::ErrInvalidSdp(format!("malformed fmtp payload type: {value}")))?;

    Ok((pt, config.trim()))
}

/// parse_fmtp parses a `key=value;key=value` list as it appears in SDP. Keys
/// are lowercased; a key without value maps to an empty string.
pub(crate) fn parse_fmtp(line: &str) -> Result<Vec<(String, String)>> {
    let mut params = vec![];
    for p in line.split(';') {
        let p = p.trim();
        if p.is_empty() {
            continue;
        }

        let (key, value) = match p.split_once('=') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => (p, ""),
        };
        if key.is_empty() {
            return Err(Error::ErrInvalidSdp(format!("malformed fmtp parameter: {p}")));
        }

        params.push((key.to_lowercase(), value.to_owned()));
    }

    Ok(params)
}

/// fmtp_parameters_from_sdp parses an SDP parameter list into internal parameters.
pub(crate) fn fmtp_parameters_from_sdp(line: &str) -> Result<RTCRtpFmtpParameters> {
    Ok(parse_fmtp(line)?
        .into_iter()
        .map(|(k, v)| (param_from_sdp(&k), RTCRtpFmtpValue::parse(&v)))
        .collect())
}

/// fmtp_parameters_to_sdp renders internal parameters as an SDP parameter list.
pub(crate) fn fmtp_parameters_to_sdp(parameters: &RTCRtpFmtpParameters) -> String {
    parameters
        .iter()
        .map(|(k, v)| format!("{}={}", param_to_sdp(k), v))
        .collect::<Vec<String>>()
        .join(";")
}

/// param_from_sdp maps an SDP fmtp key to its internal name:
/// `packetization-mode` becomes `packetizationMode`. A `-` not followed by a
/// lowercase letter is kept, so that param_to_sdp gives the key back.
pub fn param_from_sdp(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut chars = key.chars().peekable();
    while let Some(c) = chars.next() {
        match chars.peek() {
            Some(next) if c == '-' && next.is_ascii_lowercase() => {
                out.push(next.to_ascii_uppercase());
                chars.next();
            }
            _ => out.push(c),
        }
    }
    out
}

/// param_to_sdp maps an internal parameter name back to its SDP key:
/// `packetizationMode` becomes `packetization-mode`.
pub fn param_to_sdp(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
