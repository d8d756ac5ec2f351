#[cfg(test)]
mod rtp_transceiver_test;

pub(crate) mod fmtp;
pub mod rtp_codec;
pub mod rtp_receiver;
pub mod rtp_sender;
pub mod rtp_transceiver_direction;

use std::fmt;
use std::sync::Arc;

use smol_str::SmolStr;

use crate::error::{flatten_errs, Error, Result};
use crate::peer::Transport;
use rtp_codec::{RTCRtpCapabilities, RTCRtpParameters, RTPCodecType};
use rtp_receiver::RtpReceiver;
use rtp_sender::RtpSender;
use rtp_transceiver_direction::RTCRtpTransceiverDirection;

/// SSRC represents a synchronization source
/// A synchronization source is a randomly chosen
/// value meant to be globally unique within a particular
/// RTP session. Used to identify a single stream of media.
/// <https://tools.ietf.org/html/rfc3550#section-3>
#[allow(clippy::upper_case_acronyms)]
pub type SSRC = u32;

/// PayloadType identifies the format of the RTP payload and determines
/// its interpretation by the application. Each codec in a RTP Session
/// will have a different PayloadType
/// <https://tools.ietf.org/html/rfc3550#section-3>
pub type PayloadType = u8;

/// RTCRtpTransceiver is one negotiated media section: a stable mid paired
/// with at most one sender and one receiver.
pub struct RTCRtpTransceiver {
    mid: SmolStr,
    kind: RTPCodecType,
    media: String,

    /// direction follows attach/detach transitions; the effective
    /// direction also looks at the sender and receiver themselves.
    direction: RTCRtpTransceiverDirection,

    sender: Option<Arc<dyn RtpSender>>,
    receiver: Option<Arc<dyn RtpReceiver>>,

    capabilities: Option<RTCRtpCapabilities>,
    transport: Option<Arc<dyn Transport>>,

    /// parameters agreed with the remote side for this section, once known.
    negotiated: Option<RTCRtpParameters>,

    stopped: bool,
    rejected: bool,
}

impl fmt::Debug for RTCRtpTransceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RTCRtpTransceiver")
            .field("mid", &self.mid)
            .field("kind", &self.kind)
            .field("media", &self.media)
            .field("direction", &self.direction())
            .field("sender", &self.sender.as_ref().map(|s| s.id()))
            .field("receiver", &self.receiver.as_ref().map(|r| r.id()))
            .field("stopped", &self.stopped)
            .field("rejected", &self.rejected)
            .finish()
    }
}

impl RTCRtpTransceiver {
    fn new(mid: &str, kind: RTPCodecType, media: String) -> Self {
        RTCRtpTransceiver {
            mid: SmolStr::new(mid),
            kind,
            media,
            direction: RTCRtpTransceiverDirection::Inactive,
            sender: None,
            receiver: None,
            capabilities: None,
            transport: None,
            negotiated: None,
            stopped: false,
            rejected: false,
        }
    }

    /// new_with_sender creates a transceiver carrying a local sender.
    pub fn new_with_sender(
        mid: &str,
        sender: Arc<dyn RtpSender>,
        capabilities: Option<RTCRtpCapabilities>,
        transport: Option<Arc<dyn Transport>>,
    ) -> Self {
        let kind = sender.kind();
        let mut t = RTCRtpTransceiver::new(mid, kind, kind.to_string());
        t.sender = Some(sender);
        t.direction = RTCRtpTransceiverDirection::Sendonly;
        t.capabilities = capabilities;
        t.transport = transport;
        t
    }

    /// new_recv_slot creates a transceiver that asks the remote side to send
    /// one stream of the given kind. The receiver is attached once the
    /// remote answer tells what will be sent.
    pub fn new_recv_slot(
        mid: &str,
        kind: RTPCodecType,
        capabilities: Option<RTCRtpCapabilities>,
        transport: Option<Arc<dyn Transport>>,
    ) -> Self {
        let mut t = RTCRtpTransceiver::new(mid, kind, kind.to_string());
        t.direction = RTCRtpTransceiverDirection::Recvonly;
        t.capabilities = capabilities;
        t.transport = transport;
        t
    }

    /// new_section creates a transceiver for a media section with neither
    /// sender nor receiver, as used for the fixed Plan B sections.
    pub fn new_section(mid: &str, kind: RTPCodecType) -> Self {
        RTCRtpTransceiver::new(mid, kind, kind.to_string())
    }

    /// new_placeholder creates a rejected section keeping the position of a
    /// remote `m=` line that cannot be negotiated.
    pub fn new_placeholder(mid: &str, media: &str) -> Self {
        let mut t = RTCRtpTransceiver::new(mid, RTPCodecType::from(media), media.to_owned());
        t.rejected = true;
        t
    }

    pub fn mid(&self) -> &str {
        self.mid.as_str()
    }

    pub fn kind(&self) -> RTPCodecType {
        self.kind
    }

    /// media returns the SDP media token of the section, `audio`, `video`
    /// or whatever a placeholder was created for.
    pub fn media(&self) -> &str {
        self.media.as_str()
    }

    pub fn sender(&self) -> Option<&Arc<dyn RtpSender>> {
        self.sender.as_ref()
    }

    pub fn receiver(&self) -> Option<&Arc<dyn RtpReceiver>> {
        self.receiver.as_ref()
    }

    pub fn capabilities(&self) -> Option<&RTCRtpCapabilities> {
        self.capabilities.as_ref()
    }

    pub fn set_capabilities(&mut self, capabilities: Option<RTCRtpCapabilities>) {
        self.capabilities = capabilities;
    }

    pub fn transport(&self) -> Option<&Arc<dyn Transport>> {
        self.transport.as_ref()
    }

    pub fn set_transport(&mut self, transport: Option<Arc<dyn Transport>>) {
        self.transport = transport;
    }

    pub fn negotiated(&self) -> Option<&RTCRtpParameters> {
        self.negotiated.as_ref()
    }

    pub fn set_negotiated(&mut self, parameters: RTCRtpParameters) {
        self.negotiated = Some(parameters);
    }

    pub fn stopped(&self) -> bool {
        self.stopped
    }

    pub fn rejected(&self) -> bool {
        self.rejected
    }

    /// is_closed reports whether the section is rendered with port 0.
    pub fn is_closed(&self) -> bool {
        if self.stopped || self.rejected {
            return true;
        }

        let sender_closed = self.sender.as_ref().map(|s| s.closed());
        let receiver_closed = self.receiver.as_ref().map(|r| r.closed());
        match (sender_closed, receiver_closed) {
            (Some(s), Some(r)) => s && r,
            (Some(s), None) => s && !self.direction.has_recv(),
            (None, Some(r)) => r,
            (None, None) => false,
        }
    }

    /// direction is the effective direction: roles whose sender or receiver
    /// is gone, closed or paused do not count.
    pub fn direction(&self) -> RTCRtpTransceiverDirection {
        if self.stopped || self.rejected {
            return RTCRtpTransceiverDirection::Inactive;
        }

        let send = match &self.sender {
            Some(s) => !s.closed() && s.active(),
            None => false,
        };
        let recv = match &self.receiver {
            Some(r) => !r.closed(),
            None => self.direction.has_recv(),
        };

        RTCRtpTransceiverDirection::from_send_recv(send, recv)
    }

    /// attach_sender fills the send role. A transceiver carries a sender or
    /// a receiver, never both.
    pub fn attach_sender(&mut self, sender: Arc<dyn RtpSender>) -> Result<()> {
        if self.stopped {
            return Err(Error::ErrTransceiverStopped);
        }
        if self.sender.is_some() {
            return Err(Error::ErrRtpSenderAlreadySet);
        }
        if self.receiver.is_some() {
            return Err(Error::ErrRtpReceiverAlreadySet);
        }

        self.sender = Some(sender);
        self.direction = self.direction.with_send();
        Ok(())
    }

    pub fn detach_sender(&mut self) -> Result<Option<Arc<dyn RtpSender>>> {
        if self.stopped {
            return Err(Error::ErrTransceiverStopped);
        }

        let sender = self.sender.take();
        if sender.is_some() {
            self.direction = self.direction.without_send();
        }
        Ok(sender)
    }

    /// attach_receiver fills the receive role.
    pub fn attach_receiver(&mut self, receiver: Arc<dyn RtpReceiver>) -> Result<()> {
        if self.stopped {
            return Err(Error::ErrTransceiverStopped);
        }
        if self.receiver.is_some() {
            return Err(Error::ErrRtpReceiverAlreadySet);
        }
        if self.sender.is_some() {
            return Err(Error::ErrRtpSenderAlreadySet);
        }

        self.receiver = Some(receiver);
        self.direction = self.direction.with_recv();
        Ok(())
    }

    pub fn detach_receiver(&mut self) -> Result<Option<Arc<dyn RtpReceiver>>> {
        if self.stopped {
            return Err(Error::ErrTransceiverStopped);
        }

        let receiver = self.receiver.take();
        if receiver.is_some() {
            self.direction = self.direction.without_recv();
        }
        Ok(receiver)
    }

    /// stop irreversibly stops the RTPTransceiver. Sender and receiver are
    /// both closed even when one of them fails to; the section stays in
    /// place as a closed `m=` line.
    pub async fn stop(&mut self) -> Result<()> {
        if self.stopped {
            return Ok(());
        }

        self.stopped = true;
        self.direction = RTCRtpTransceiverDirection::Inactive;

        let mut errs = vec![];
        if let Some(sender) = &self.sender {
            if !sender.closed() {
                if let Err(err) = sender.close().await {
                    errs.push(err);
                }
            }
        }
        if let Some(receiver) = &self.receiver {
            if !receiver.closed() {
                if let Err(err) = receiver.close().await {
                    errs.push(err);
                }
            }
        }

        flatten_errs(errs)
    }
}

/// TransceiverRegistry keeps transceivers in `m=` line order. Entries are
/// only ever appended.
#[derive(Debug, Default)]
pub struct TransceiverRegistry {
    transceivers: Vec<RTCRtpTransceiver>,
    mid_counter: usize,
}

impl TransceiverRegistry {
    pub fn new() -> Self {
        TransceiverRegistry::default()
    }

    pub fn len(&self) -> usize {
        self.transceivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transceivers.is_empty()
    }

    /// next_mid returns the next numeric mid not used by any section.
    pub fn next_mid(&mut self) -> String {
        loop {
            let mid = self.mid_counter.to_string();
            self.mid_counter += 1;
            if self.find_by_mid(&mid).is_none() {
                return mid;
            }
        }
    }

    /// push appends a transceiver. Mids are unique within the registry.
    pub fn push(&mut self, t: RTCRtpTransceiver) -> Result<&mut RTCRtpTransceiver> {
        if self.find_by_mid(t.mid()).is_some() {
            return Err(Error::ErrInvalidSdp(format!("duplicated mid {}", t.mid())));
        }

        self.transceivers.push(t);
        let last = self.transceivers.len() - 1;
        Ok(&mut self.transceivers[last])
    }

    pub fn find_by_mid(&self, mid: &str) -> Option<&RTCRtpTransceiver> {
        self.transceivers.iter().find(|t| t.mid() == mid)
    }

    pub fn find_by_mid_mut(&mut self, mid: &str) -> Option<&mut RTCRtpTransceiver> {
        self.transceivers.iter_mut().find(|t| t.mid() == mid)
    }

    pub fn find_by_sender_id(&self, sender_id: &str) -> Option<&RTCRtpTransceiver> {
        self.transceivers
            .iter()
            .find(|t| t.sender().map(|s| s.id() == sender_id).unwrap_or(false))
    }

    /// has_sender reports whether a sender is already bound to some section,
    /// stopped ones included.
    pub fn has_sender(&self, sender_id: &str) -> bool {
        self.find_by_sender_id(sender_id).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RTCRtpTransceiver> {
        self.transceivers.iter()
    }

    /// stop_closed stops every transceiver whose sender went away on its
    /// own, so the section is rendered as closed from now on.
    pub async fn stop_closed(&mut self) -> Result<()> {
        let mut errs = vec![];
        for t in self.transceivers.iter_mut() {
            if !t.stopped() && t.is_closed() && !t.rejected() {
                log::debug!("stopping transceiver mid={}", t.mid());
                if let Err(err) = t.stop().await {
                    errs.push(err);
                }
            }
        }
        flatten_errs(errs)
    }

    /// stop_all stops every transceiver, going on past failures.
    pub async fn stop_all(&mut self) -> Result<()> {
        let mut errs = vec![];
        for t in self.transceivers.iter_mut() {
            if let Err(err) = t.stop().await {
                errs.push(err);
            }
        }
        flatten_errs(errs)
    }
}
