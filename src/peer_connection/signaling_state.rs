use std::fmt;

use crate::error::{Error, Result};
use crate::peer_connection::sdp::sdp_type::RTCSdpType;

/// SignalingOp is an operation checked against the signaling state.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum SignalingOp {
    CreateOffer,
    CreateAnswer,
    SetLocal(RTCSdpType),
    SetRemote(RTCSdpType),
}

impl fmt::Display for SignalingOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            SignalingOp::CreateOffer => write!(f, "createOffer"),
            SignalingOp::CreateAnswer => write!(f, "createAnswer"),
            SignalingOp::SetLocal(t) => write!(f, "setLocalDescription({t})"),
            SignalingOp::SetRemote(t) => write!(f, "setRemoteDescription({t})"),
        }
    }
}

/// SignalingState indicates the signaling state of the offer/answer process.
///
/// ## Specifications
///
/// * [MDN]
/// * [W3C]
///
/// [MDN]: https://developer.mozilla.org/en-US/docs/Web/API/RTCPeerConnection/signalingState
/// [W3C]: https://w3c.github.io/webrtc-pc/#dom-peerconnection-signaling-state
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RTCSignalingState {
    #[default]
    Unspecified = 0,

    /// SignalingStateStable indicates there is no offer/answer exchange in
    /// progress. This is also the initial state, in which case the local and
    /// remote descriptions are nil.
    Stable,

    /// SignalingStateHaveLocalOffer indicates that a local description, of
    /// type "offer", has been successfully applied.
    HaveLocalOffer,

    /// SignalingStateHaveRemoteOffer indicates that a remote description, of
    /// type "offer", has been successfully applied.
    HaveRemoteOffer,
}

const SIGNALING_STATE_STABLE_STR: &str = "stable";
const SIGNALING_STATE_HAVE_LOCAL_OFFER_STR: &str = "have-local-offer";
const SIGNALING_STATE_HAVE_REMOTE_OFFER_STR: &str = "have-remote-offer";

impl From<&str> for RTCSignalingState {
    fn from(raw: &str) -> Self {
        match raw {
            SIGNALING_STATE_STABLE_STR => RTCSignalingState::Stable,
            SIGNALING_STATE_HAVE_LOCAL_OFFER_STR => RTCSignalingState::HaveLocalOffer,
            SIGNALING_STATE_HAVE_REMOTE_OFFER_STR => RTCSignalingState::HaveRemoteOffer,
            _ => RTCSignalingState::Unspecified,
        }
    }
}

impl fmt::Display for RTCSignalingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RTCSignalingState::Stable => write!(f, "{SIGNALING_STATE_STABLE_STR}"),
            RTCSignalingState::HaveLocalOffer => {
                write!(f, "{SIGNALING_STATE_HAVE_LOCAL_OFFER_STR}")
            }
            RTCSignalingState::HaveRemoteOffer => {
                write!(f, "{SIGNALING_STATE_HAVE_REMOTE_OFFER_STR}")
            }
            _ => write!(f, "{}", crate::UNSPECIFIED_STR),
        }
    }
}

impl From<u8> for RTCSignalingState {
    fn from(v: u8) -> Self {
        match v {
            1 => RTCSignalingState::Stable,
            2 => RTCSignalingState::HaveLocalOffer,
            3 => RTCSignalingState::HaveRemoteOffer,
            _ => RTCSignalingState::Unspecified,
        }
    }
}

/// check_next_signaling_state returns the state reached by running `op`
/// from `cur`, or an InvalidStateError when the op is not allowed there.
/// createOffer and createAnswer leave the state unchanged.
pub(crate) fn check_next_signaling_state(
    cur: RTCSignalingState,
    op: SignalingOp,
) -> Result<RTCSignalingState> {
    use RTCSignalingState::*;

    let next = match (cur, op) {
        (Stable, SignalingOp::CreateOffer) => Some(Stable),
        (HaveRemoteOffer, SignalingOp::CreateAnswer) => Some(HaveRemoteOffer),
        // stable->SetLocal(offer)->have-local-offer
        (Stable, SignalingOp::SetLocal(RTCSdpType::Offer)) => Some(HaveLocalOffer),
        // have-remote-offer->SetLocal(answer)->stable
        (HaveRemoteOffer, SignalingOp::SetLocal(RTCSdpType::Answer)) => Some(Stable),
        // stable->SetRemote(offer)->have-remote-offer
        (Stable, SignalingOp::SetRemote(RTCSdpType::Offer)) => Some(HaveRemoteOffer),
        // have-local-offer->SetRemote(answer)->stable
        (HaveLocalOffer, SignalingOp::SetRemote(RTCSdpType::Answer)) => Some(Stable),
        _ => None,
    };

    next.ok_or_else(|| Error::ErrInvalidState(format!("cannot {op} in signaling state {cur}")))
}
