use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::Result;
use crate::peer::Transport;
use crate::rtp_transceiver::rtp_codec::{RTCRtpParameters, RTPCodecType};

/// RTCRtpSenderEvent is what a sender reports to whoever watches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RTCRtpSenderEvent {
    /// The sender was closed and will not send media anymore.
    Close,
    /// The sender's RTP parameters changed.
    ParametersChange,
    /// The sender was paused (false) or resumed (true).
    ActiveChange(bool),
}

/// RtpSender is a media sender living in the SFU worker. It forwards media
/// of some other peer to the remote endpoint of this connection.
#[async_trait]
pub trait RtpSender: Send + Sync + 'static {
    /// id is stable for the lifetime of the sender.
    fn id(&self) -> String;

    fn kind(&self) -> RTPCodecType;

    fn closed(&self) -> bool;

    /// active is false while the sender is paused.
    fn active(&self) -> bool;

    /// has_transport reports whether set_transport already succeeded.
    fn has_transport(&self) -> bool;

    fn rtp_parameters(&self) -> RTCRtpParameters;

    async fn set_transport(&self, transport: Arc<dyn Transport>) -> Result<()>;

    async fn close(&self) -> Result<()>;

    fn subscribe(&self) -> broadcast::Receiver<RTCRtpSenderEvent>;
}
