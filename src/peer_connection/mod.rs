
/// [`RTCSessionDescription`] - wrapper for SDP text and negotiations stage ([`RTCSdpType`]: offer - answer).
pub mod sdp;

pub mod configuration;
pub(crate) mod negotiation;
mod peer_connection_internal;
pub mod policy;
pub mod signaling_state;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use ::sdp::description::session::{Origin, SessionDescription};
use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use peer_connection_internal::*;
use portable_atomic::{AtomicBool, AtomicU8, Ordering};
use tokio::sync::Mutex;

use crate::api::media_engine::MediaEngine;
use crate::api::API;
use crate::dtls_transport::dtls_role::DTLSRole;
use crate::error::{Error, Result};
use crate::peer::{Peer, Room, Transport};
use crate::peer_connection::configuration::RTCConfiguration;
use crate::peer_connection::policy::sdp_semantics::RTCSdpSemantics;
use crate::peer_connection::sdp::sdp_type::RTCSdpType;
use crate::peer_connection::sdp::session_description::RTCSessionDescription;
use crate::peer_connection::signaling_state::{
    check_next_signaling_state, RTCSignalingState, SignalingOp,
};

pub type OnSignalingStateChangeHdlrFn = Box<
    dyn (FnMut(RTCSignalingState) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>)
        + Send
        + Sync,
>;

pub type OnNegotiationNeededHdlrFn =
    Box<dyn (FnMut() -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>) + Send + Sync>;

pub type OnCloseHdlrFn =
    Box<dyn (FnMut() -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>) + Send + Sync>;

/// RTCPeerConnection is the SFU side of one remote endpoint's offer/answer
/// exchange. It turns SDP into RTP parameters for the endpoint's peer in
/// the room, and tells the application when a new offer is needed.
pub struct RTCPeerConnection {
    pub(crate) internal: Arc<PeerConnectionInternal>,
}

impl std::fmt::Debug for RTCPeerConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RTCPeerConnection")
            .field("peer_name", &self.internal.peer_name)
            .field("sdp_semantics", &self.internal.configuration.sdp_semantics)
            .field("signaling_state", &self.signaling_state())
            .finish()
    }
}

impl std::fmt::Display for RTCPeerConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(RTCPeerConnection {})", self.internal.peer_name)
    }
}

impl RTCPeerConnection {
    /// creates a connection negotiating with the media engine of `api`. The
    /// configured semantics select the SDP dialect for its whole lifetime.
    pub(crate) async fn new(
        api: &API,
        configuration: RTCConfiguration,
        room: Arc<dyn Room>,
        peer_name: &str,
    ) -> Result<Self> {
        let internal = PeerConnectionInternal::new(api, configuration, room, peer_name)?;
        Ok(RTCPeerConnection { internal })
    }

    /// on_signaling_state_change sets an event handler which is invoked when the
    /// peer connection's signaling state changes
    pub fn on_signaling_state_change(&self, f: OnSignalingStateChangeHdlrFn) {
        self.internal
            .on_signaling_state_change_handler
            .store(Some(Arc::new(Mutex::new(f))))
    }

    /// on_negotiation_needed sets an event handler which is invoked when
    /// a change has occurred which requires session negotiation
    pub fn on_negotiation_needed(&self, f: OnNegotiationNeededHdlrFn) {
        self.internal
            .on_negotiation_needed_handler
            .store(Some(Arc::new(Mutex::new(f))));
    }

    /// on_close sets an event handler which is invoked once, when the
    /// connection or its peer is closed.
    pub fn on_close(&self, f: OnCloseHdlrFn) {
        self.internal
            .on_close_handler
            .store(Some(Arc::new(Mutex::new(f))));
    }

    /// run_operation runs one signaling operation under the busy flag. Once
    /// the flag is released in stable state, changes recorded meanwhile get
    /// their negotiationneeded event.
    async fn run_operation<T, F>(&self, op: SignalingOp, f: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let guard = self.internal.start_operation(op)?;
        let result = f.await;
        drop(guard);

        if let Err(err) = &result {
            log::error!("{op} failed: {err}");
        }
        if self.signaling_state() == RTCSignalingState::Stable && !self.is_closed() {
            negotiation::check_deferred(&self.internal);
        }
        result
    }

    /// create_offer starts a negotiation round. The first call joins the
    /// room; later ones pick up the senders the peer gained or lost since.
    pub async fn create_offer(&self) -> Result<RTCSessionDescription> {
        self.run_operation(SignalingOp::CreateOffer, self.internal.create_offer())
            .await
    }

    /// create_answer answers the remote offer that was applied last.
    pub async fn create_answer(&self) -> Result<RTCSessionDescription> {
        self.run_operation(SignalingOp::CreateAnswer, self.internal.create_answer())
            .await
    }

    /// set_local_description applies an offer from create_offer or an answer
    /// from create_answer.
    pub async fn set_local_description(&self, desc: RTCSessionDescription) -> Result<()> {
        let op = SignalingOp::SetLocal(desc.sdp_type());
        self.run_operation(op, self.internal.set_local_description(desc))
            .await
    }

    /// set_remote_description applies the remote endpoint's offer or answer.
    /// A remote offer is only accepted before any peer was created:
    /// renegotiation is always initiated locally.
    pub async fn set_remote_description(&self, desc: RTCSessionDescription) -> Result<()> {
        let op = SignalingOp::SetRemote(desc.sdp_type());
        self.run_operation(op, self.internal.set_remote_description(desc))
            .await
    }

    pub async fn local_description(&self) -> Option<RTCSessionDescription> {
        self.internal.local_description.lock().await.clone()
    }

    pub async fn remote_description(&self) -> Option<RTCSessionDescription> {
        self.internal.remote_description.lock().await.clone()
    }

    /// peer returns the room peer of this connection, once created.
    pub async fn peer(&self) -> Option<Arc<dyn Peer>> {
        self.internal.session.lock().await.peer.clone()
    }

    /// signaling_state attribute returns the signaling state of the
    /// PeerConnection instance.
    pub fn signaling_state(&self) -> RTCSignalingState {
        self.internal.signaling_state()
    }

    pub fn sdp_semantics(&self) -> RTCSdpSemantics {
        self.internal.configuration.sdp_semantics
    }

    pub fn get_configuration(&self) -> &RTCConfiguration {
        &self.internal.configuration
    }

    pub fn is_closed(&self) -> bool {
        self.internal.is_closed.load(Ordering::SeqCst)
    }

    /// close stops every section and closes the peer. Pending
    /// negotiationneeded events are dropped.
    pub async fn close(&self) -> Result<()> {
        self.internal.close().await
    }
}
