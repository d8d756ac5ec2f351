//! Interfaces of the SFU objects a connection drives: the room it joins,
//! the peer representing the remote endpoint inside that room, and the
//! server side transport carrying the peer's media.

#[cfg(test)]
pub(crate) mod mock;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::dtls_transport::dtls_parameters::DTLSParameters;
use crate::error::Result;
use crate::ice_transport::ice_candidate::RTCIceCandidate;
use crate::ice_transport::ice_parameters::RTCIceParameters;
use crate::peer_connection::configuration::RTCTransportOptions;
use crate::rtp_transceiver::rtp_codec::{RTCRtpCapabilities, RTPCodecType};
use crate::rtp_transceiver::rtp_receiver::RtpReceiver;
use crate::rtp_transceiver::rtp_sender::RtpSender;

/// PeerEvent is what a peer reports to the connection that created it.
#[derive(Clone)]
pub enum PeerEvent {
    /// Another peer of the room started producing media that this peer
    /// should receive.
    NewRtpSender(Arc<dyn RtpSender>),
    /// The peer was closed, either locally or by the room.
    Close,
}

#[async_trait]
pub trait Room: Send + Sync + 'static {
    /// create_peer joins a new peer with the given name.
    async fn create_peer(&self, name: &str) -> Result<Arc<dyn Peer>>;
}

#[async_trait]
pub trait Peer: Send + Sync + 'static {
    fn name(&self) -> String;

    fn closed(&self) -> bool;

    /// capabilities returns the effective capabilities once they were set.
    fn capabilities(&self) -> Option<RTCRtpCapabilities>;

    /// set_capabilities announces what the remote endpoint supports and
    /// returns the subset the room can actually use.
    async fn set_capabilities(
        &self,
        capabilities: RTCRtpCapabilities,
    ) -> Result<RTCRtpCapabilities>;

    async fn create_transport(&self, options: &RTCTransportOptions) -> Result<Arc<dyn Transport>>;

    fn transports(&self) -> Vec<Arc<dyn Transport>>;

    /// rtp_senders returns every sender currently attached to this peer.
    fn rtp_senders(&self) -> Vec<Arc<dyn RtpSender>>;

    fn new_rtp_receiver(
        &self,
        kind: RTPCodecType,
        transport: Arc<dyn Transport>,
    ) -> Result<Arc<dyn RtpReceiver>>;

    async fn close(&self) -> Result<()>;

    fn subscribe(&self) -> broadcast::Receiver<PeerEvent>;
}

/// Transport is the ICE+DTLS transport the SFU opened for a peer.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    fn id(&self) -> String;

    fn dtls_local_parameters(&self) -> DTLSParameters;

    fn ice_local_parameters(&self) -> RTCIceParameters;

    fn ice_local_candidates(&self) -> Vec<RTCIceCandidate>;

    async fn set_remote_dtls_parameters(&self, parameters: DTLSParameters) -> Result<()>;
}
