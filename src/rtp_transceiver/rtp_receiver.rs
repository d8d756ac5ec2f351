use async_trait::async_trait;

use crate::error::Result;
use crate::rtp_transceiver::rtp_codec::{RTCRtpParameters, RTPCodecType};

/// RtpReceiver is a media receiver living in the SFU worker. It is created
/// through [`crate::peer::Peer::new_rtp_receiver`] and starts receiving once
/// the negotiated parameters are handed to [`RtpReceiver::receive`].
#[async_trait]
pub trait RtpReceiver: Send + Sync + 'static {
    fn id(&self) -> String;

    fn kind(&self) -> RTPCodecType;

    fn closed(&self) -> bool;

    /// rtp_parameters returns the parameters given to receive, if any.
    fn rtp_parameters(&self) -> Option<RTCRtpParameters>;

    async fn receive(&self, parameters: RTCRtpParameters) -> Result<()>;

    async fn close(&self) -> Result<()>;
}
