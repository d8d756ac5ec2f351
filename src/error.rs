use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// ErrInvalidState indicates an operation was attempted from a signaling
    /// state that forbids it, or while another operation is still in flight.
    #[error("InvalidStateError: {0}")]
    ErrInvalidState(String),

    /// ErrConnectionClosed indicates an operation executed after connection
    /// has already been closed.
    #[error("connection closed")]
    ErrConnectionClosed,

    /// ErrSessionDescriptionInvalidType indicates a session description was
    /// built with a type other than offer or answer.
    #[error("invalid RTCSessionDescription.type [type:{0}]")]
    ErrSessionDescriptionInvalidType(String),

    /// ErrInvalidSdp indicates the SDP text parsed but carries a value the
    /// negotiation cannot interpret.
    #[error("invalid sdp: {0}")]
    ErrInvalidSdp(String),

    /// ErrRtxCodecWithoutApt indicates a remote media section declares an RTX
    /// codec with no associated payload type.
    #[error("rtx codec has no apt fmtp")]
    ErrRtxCodecWithoutApt,

    /// ErrRenegotiationNotImplemented indicates the remote side tried to
    /// renegotiate an already established session.
    #[error("renegotiation not yet implemented")]
    ErrRenegotiationNotImplemented,

    #[error("no DTLS remote parameters found")]
    ErrNoRemoteDtlsParameters,
    #[error("no DTLS sha-256 fingerprint in local parameters")]
    ErrNoLocalFingerprint,
    #[error("peer has no transport")]
    ErrNoTransport,
    #[error("peer not created yet")]
    ErrNoPeer,

    #[error("unknown codec type")]
    ErrUnknownType,
    #[error("payload type {0} already registered")]
    ErrCodecPayloadTypeInUse(u8),

    #[error("RtpSender already set, cannot set another RtpSender")]
    ErrRtpSenderAlreadySet,
    #[error("RtpReceiver already set, cannot set another RtpReceiver")]
    ErrRtpReceiverAlreadySet,
    #[error("transceiver is stopped")]
    ErrTransceiverStopped,

    #[error("SdpError: invalid sdp: {0}")]
    ErrSdpError(#[from] sdp::Error),
    #[error("url: {0}")]
    ErrUrl(#[from] url::ParseError),

    #[error("Other errors: {0}")]
    ErrOthers(String),
}

impl Error {
    /// is_invalid_state reports whether the error is of the InvalidStateError class.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Error::ErrInvalidState(_))
    }

    /// is_type_error reports whether the error comes from validating a
    /// session description at construction time.
    pub fn is_type_error(&self) -> bool {
        matches!(
            self,
            Error::ErrSessionDescriptionInvalidType(_) | Error::ErrSdpError(_)
        )
    }
}

/// flatten_errs joins the errors collected while tearing several objects
/// down into one.
pub(crate) fn flatten_errs(errs: Vec<Error>) -> Result<()> {
    if errs.is_empty() {
        Ok(())
    } else {
        let errs_strs: Vec<String> = errs.into_iter().map(|e| e.to_string()).collect();
        Err(Error::ErrOthers(errs_strs.join("\n")))
    }
}
