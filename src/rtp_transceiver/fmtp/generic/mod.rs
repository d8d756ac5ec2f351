use super::*;

/// GenericFmtp matches any codec on its mime type alone.
#[derive(Debug, PartialEq)]
pub(crate) struct GenericFmtp {
    pub(crate) mime_type: String,
    pub(crate) parameters: RTCRtpFmtpParameters,
}

impl Fmtp for GenericFmtp {
    fn mime_type(&self) -> &str {
        self.mime_type.as_str()
    }

    /// Match returns true if g and b are compatible fmtp descriptions
    /// The generic implementation is used for MimeTypes that carry no
    /// parameter that must be used symmetrically.
    fn match_fmtp(&self, f: &dyn Fmtp) -> bool {
        if let Some(c) = f.as_any().downcast_ref::<GenericFmtp>() {
            UniCase::new(self.mime_type.as_str()) == UniCase::new(c.mime_type())
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

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_generic_fmtp_compare() {
        let a = parse(
            "audio/opus",
            &fmtp_parameters_from_sdp("minptime=10;useinbandfec=1").unwrap(),
        );
        let b = parse(
            "AUDIO/OPUS",
            &fmtp_parameters_from_sdp("minptime=20").unwrap(),
        );
        let c = parse("audio/PCMU", &RTCRtpFmtpParameters::default());

        assert!(a.match_fmtp(&*b));
        assert!(b.match_fmtp(&*a));
        assert!(!a.match_fmtp(&*c));
        assert_eq!(a.parameter("minptime"), Some(&RTCRtpFmtpValue::Number(10)));
    }
}
