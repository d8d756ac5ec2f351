//! In-memory collaborators recording what a connection asked of them.

use std::sync::{Arc, Mutex as SyncMutex};

use async_trait::async_trait;
use portable_atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::broadcast;

use super::*;
use crate::dtls_transport::dtls_fingerprint::RTCDtlsFingerprint;
use crate::dtls_transport::dtls_role::DTLSRole;
use crate::error::Error;
use crate::ice_transport::ice_candidate_type::RTCIceCandidateType;
use crate::ice_transport::ice_protocol::RTCIceProtocol;
use crate::rtp_transceiver::rtp_codec::*;
use crate::rtp_transceiver::rtp_sender::RTCRtpSenderEvent;
use crate::rtp_transceiver::{PayloadType, SSRC};

pub(crate) const MOCK_FINGERPRINT: &str =
    "82:5a:68:3d:36:c3:0a:de:af:e7:32:43:d2:88:83:57:30:b2:88:10:c0:4e:98:a5:e1:fe:9b:6b:8c:79:77:9a";

pub(crate) struct MockTransport {
    id: String,
    dtls_role: SyncMutex<DTLSRole>,
    remote_dtls: SyncMutex<Vec<DTLSParameters>>,
    pub(crate) fail_remote_dtls: AtomicBool,
}

impl MockTransport {
    pub(crate) fn new(id: &str) -> Self {
        MockTransport {
            id: id.to_owned(),
            dtls_role: SyncMutex::new(DTLSRole::Auto),
            remote_dtls: SyncMutex::new(vec![]),
            fail_remote_dtls: AtomicBool::new(false),
        }
    }

    /// remote_dtls returns every set_remote_dtls_parameters call, in order.
    pub(crate) fn remote_dtls(&self) -> Vec<DTLSParameters> {
        self.remote_dtls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn dtls_local_parameters(&self) -> DTLSParameters {
        DTLSParameters {
            role: *self.dtls_role.lock().unwrap(),
            fingerprints: vec![RTCDtlsFingerprint {
                algorithm: "sha-256".to_owned(),
                value: MOCK_FINGERPRINT.to_owned(),
            }],
        }
    }

    fn ice_local_parameters(&self) -> RTCIceParameters {
        RTCIceParameters {
            username_fragment: "mockufrag".to_owned(),
            password: "mockpassword".to_owned(),
            ice_lite: true,
        }
    }

    fn ice_local_candidates(&self) -> Vec<RTCIceCandidate> {
        vec![RTCIceCandidate {
            foundation: "udpcandidate".to_owned(),
            priority: 1076302079,
            address: "10.0.0.1".to_owned(),
            protocol: RTCIceProtocol::Udp,
            port: 40000,
            typ: RTCIceCandidateType::Host,
            tcp_type: None,
        }]
    }

    async fn set_remote_dtls_parameters(&self, parameters: DTLSParameters) -> Result<()> {
        if self.fail_remote_dtls.load(Ordering::SeqCst) {
            return Err(Error::ErrOthers("dtls setup failed".to_owned()));
        }

        // The transport takes the complementary role.
        let local_role = match parameters.role {
            DTLSRole::Server => DTLSRole::Client,
            DTLSRole::Client => DTLSRole::Server,
            r => r,
        };
        *self.dtls_role.lock().unwrap() = local_role;
        self.remote_dtls.lock().unwrap().push(parameters);
        Ok(())
    }
}

pub(crate) struct MockRtpSender {
    id: String,
    kind: RTPCodecType,
    parameters: SyncMutex<RTCRtpParameters>,
    closed: AtomicBool,
    active: AtomicBool,
    transport: SyncMutex<Option<Arc<dyn Transport>>>,
    events: broadcast::Sender<RTCRtpSenderEvent>,
    pub(crate) fail_close: AtomicBool,
    pub(crate) fail_set_transport: AtomicBool,
}

impl MockRtpSender {
    pub(crate) fn new(id: &str, kind: RTPCodecType, parameters: RTCRtpParameters) -> Self {
        let (events, _) = broadcast::channel(16);
        MockRtpSender {
            id: id.to_owned(),
            kind,
            parameters: SyncMutex::new(parameters),
            closed: AtomicBool::new(false),
            active: AtomicBool::new(true),
            transport: SyncMutex::new(None),
            events,
            fail_close: AtomicBool::new(false),
            fail_set_transport: AtomicBool::new(false),
        }
    }

    pub(crate) fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
        let _ = self.events.send(RTCRtpSenderEvent::ActiveChange(active));
    }

    pub(crate) fn set_parameters(&self, parameters: RTCRtpParameters) {
        *self.parameters.lock().unwrap() = parameters;
        let _ = self.events.send(RTCRtpSenderEvent::ParametersChange);
    }

    pub(crate) fn close_now(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.events.send(RTCRtpSenderEvent::Close);
        }
    }
}

#[async_trait]
impl RtpSender for MockRtpSender {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn kind(&self) -> RTPCodecType {
        self.kind
    }

    fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn has_transport(&self) -> bool {
        self.transport.lock().unwrap().is_some()
    }

    fn rtp_parameters(&self) -> RTCRtpParameters {
        self.parameters.lock().unwrap().clone()
    }

    async fn set_transport(&self, transport: Arc<dyn Transport>) -> Result<()> {
        if self.fail_set_transport.load(Ordering::SeqCst) {
            return Err(Error::ErrOthers(format!("sender {} refused transport", self.id)));
        }
        *self.transport.lock().unwrap() = Some(transport);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(Error::ErrOthers(format!("sender {} failed to close", self.id)));
        }
        self.close_now();
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<RTCRtpSenderEvent> {
        self.events.subscribe()
    }
}

pub(crate) struct MockRtpReceiver {
    id: String,
    kind: RTPCodecType,
    closed: AtomicBool,
    parameters: SyncMutex<Option<RTCRtpParameters>>,
}

impl MockRtpReceiver {
    pub(crate) fn close_now(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl RtpReceiver for MockRtpReceiver {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn kind(&self) -> RTPCodecType {
        self.kind
    }

    fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn rtp_parameters(&self) -> Option<RTCRtpParameters> {
        self.parameters.lock().unwrap().clone()
    }

    async fn receive(&self, parameters: RTCRtpParameters) -> Result<()> {
        *self.parameters.lock().unwrap() = Some(parameters);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.close_now();
        Ok(())
    }
}

pub(crate) struct MockPeer {
    name: String,
    closed: AtomicBool,
    capabilities: SyncMutex<Option<RTCRtpCapabilities>>,
    transports: SyncMutex<Vec<Arc<MockTransport>>>,
    senders: SyncMutex<Vec<Arc<MockRtpSender>>>,
    receivers: SyncMutex<Vec<Arc<MockRtpReceiver>>>,
    receiver_seq: AtomicUsize,
    events: broadcast::Sender<PeerEvent>,
}

impl MockPeer {
    pub(crate) fn new(name: &str, senders: Vec<Arc<MockRtpSender>>) -> Self {
        let (events, _) = broadcast::channel(16);
        MockPeer {
            name: name.to_owned(),
            closed: AtomicBool::new(false),
            capabilities: SyncMutex::new(None),
            transports: SyncMutex::new(vec![]),
            senders: SyncMutex::new(senders),
            receivers: SyncMutex::new(vec![]),
            receiver_seq: AtomicUsize::new(0),
            events,
        }
    }

    /// add_sender attaches a sender and announces it like the room does.
    pub(crate) fn add_sender(&self, sender: Arc<MockRtpSender>) {
        self.senders.lock().unwrap().push(Arc::clone(&sender));
        let _ = self.events.send(PeerEvent::NewRtpSender(sender));
    }

    pub(crate) fn transport(&self) -> Option<Arc<MockTransport>> {
        self.transports.lock().unwrap().first().cloned()
    }

    pub(crate) fn receivers(&self) -> Vec<Arc<MockRtpReceiver>> {
        self.receivers.lock().unwrap().clone()
    }

    pub(crate) fn close_now(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.events.send(PeerEvent::Close);
        }
    }
}

#[async_trait]
impl Peer for MockPeer {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn capabilities(&self) -> Option<RTCRtpCapabilities> {
        self.capabilities.lock().unwrap().clone()
    }

    async fn set_capabilities(
        &self,
        capabilities: RTCRtpCapabilities,
    ) -> Result<RTCRtpCapabilities> {
        *self.capabilities.lock().unwrap() = Some(capabilities.clone());
        Ok(capabilities)
    }

    async fn create_transport(&self, _options: &RTCTransportOptions) -> Result<Arc<dyn Transport>> {
        let mut transports = self.transports.lock().unwrap();
        let transport = Arc::new(MockTransport::new(&format!(
            "{}-transport-{}",
            self.name,
            transports.len()
        )));
        transports.push(Arc::clone(&transport));
        Ok(transport)
    }

    fn transports(&self) -> Vec<Arc<dyn Transport>> {
        self.transports
            .lock()
            .unwrap()
            .iter()
            .map(|t| Arc::clone(t) as Arc<dyn Transport>)
            .collect()
    }

    fn rtp_senders(&self) -> Vec<Arc<dyn RtpSender>> {
        self.senders
            .lock()
            .unwrap()
            .iter()
            .map(|s| Arc::clone(s) as Arc<dyn RtpSender>)
            .collect()
    }

    fn new_rtp_receiver(
        &self,
        kind: RTPCodecType,
        _transport: Arc<dyn Transport>,
    ) -> Result<Arc<dyn RtpReceiver>> {
        let seq = self.receiver_seq.fetch_add(1, Ordering::SeqCst);
        let receiver = Arc::new(MockRtpReceiver {
            id: format!("{}-receiver-{seq}", self.name),
            kind,
            closed: AtomicBool::new(false),
            parameters: SyncMutex::new(None),
        });
        self.receivers.lock().unwrap().push(Arc::clone(&receiver));
        Ok(receiver)
    }

    async fn close(&self) -> Result<()> {
        self.close_now();
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<PeerEvent> {
        self.events.subscribe()
    }
}

#[derive(Default)]
pub(crate) struct MockRoom {
    senders: Vec<Arc<MockRtpSender>>,
    peers: SyncMutex<Vec<Arc<MockPeer>>>,
}

impl MockRoom {
    /// with_senders makes every new peer start with the given senders.
    pub(crate) fn with_senders(senders: Vec<Arc<MockRtpSender>>) -> Self {
        MockRoom {
            senders,
            ..Default::default()
        }
    }

    pub(crate) fn peer(&self) -> Option<Arc<MockPeer>> {
        self.peers.lock().unwrap().last().cloned()
    }

    pub(crate) fn peer_count(&self) -> usize {
        self.peers.lock().unwrap().len()
    }
}

#[async_trait]
impl Room for MockRoom {
    async fn create_peer(&self, name: &str) -> Result<Arc<dyn Peer>> {
        let peer = Arc::new(MockPeer::new(name, self.senders.clone()));
        self.peers.lock().unwrap().push(Arc::clone(&peer));
        Ok(peer)
    }
}

pub(crate) fn opus_codec(payload_type: PayloadType) -> RTCRtpCodecParameters {
    RTCRtpCodecParameters {
        mime_type: "audio/opus".to_owned(),
        payload_type,
        clock_rate: 48000,
        channels: Some(2),
        parameters: [("useinbandfec", 1u32)].into_iter().collect(),
        ..Default::default()
    }
}

pub(crate) fn vp8_codec(payload_type: PayloadType, rtx: Option<PayloadType>) -> RTCRtpCodecParameters {
    RTCRtpCodecParameters {
        mime_type: "video/VP8".to_owned(),
        payload_type,
        clock_rate: 90000,
        rtcp_feedback: vec![
            RTCPFeedback {
                typ: "nack".to_owned(),
                parameter: String::new(),
            },
            RTCPFeedback {
                typ: "nack".to_owned(),
                parameter: "pli".to_owned(),
            },
        ],
        rtx: rtx.map(|payload_type| RTCRtpCodecRtx {
            payload_type,
            rtx_time: None,
        }),
        ..Default::default()
    }
}

/// sender_parameters builds the parameters of a sender forwarding one stream.
pub(crate) fn sender_parameters(
    kind: RTPCodecType,
    ssrc: SSRC,
    rtx_ssrc: Option<SSRC>,
    msid: Option<&str>,
) -> RTCRtpParameters {
    let codec = match kind {
        RTPCodecType::Audio => opus_codec(100),
        _ => vp8_codec(101, rtx_ssrc.map(|_| 102)),
    };

    RTCRtpParameters {
        mid: String::new(),
        encodings: vec![RTCRtpEncodingParameters {
            ssrc: Some(ssrc),
            codec_payload_type: Some(codec.payload_type),
            rtx: rtx_ssrc.map(|ssrc| RTCRtpRtxParameters { ssrc }),
            ..Default::default()
        }],
        codecs: vec![codec],
        header_extensions: vec![RTCRtpHeaderExtensionParameters {
            uri: "urn:ietf:params:rtp-hdrext:sdes:mid".to_owned(),
            id: 1,
        }],
        rtcp: RTCRtcpParameters {
            cname: "sfu-cname".to_owned(),
            mux: true,
            reduced_size: true,
        },
        user_parameters: RTCRtpUserParameters {
            msid: msid.map(|m| m.to_owned()),
        },
    }
}

pub(crate) fn new_sender(
    id: &str,
    kind: RTPCodecType,
    ssrc: SSRC,
    rtx_ssrc: Option<SSRC>,
) -> Arc<MockRtpSender> {
    Arc::new(MockRtpSender::new(
        id,
        kind,
        sender_parameters(kind, ssrc, rtx_ssrc, Some(&format!("stream-{id} track-{id}"))),
    ))
}
