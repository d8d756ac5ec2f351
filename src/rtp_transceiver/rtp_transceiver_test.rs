use portable_atomic::Ordering;

use super::*;
use crate::peer::mock::{new_sender, MockPeer, MockTransport};
use crate::peer::Peer;

fn new_receiver(peer: &MockPeer, kind: RTPCodecType) -> Arc<dyn RtpReceiver> {
    let transport: Arc<dyn Transport> = Arc::new(MockTransport::new("t"));
    peer.new_rtp_receiver(kind, transport).unwrap()
}

#[test]
fn test_rtp_transceiver_sender_direction() {
    let sender = new_sender("s1", RTPCodecType::Video, 1111, Some(2222));
    let t = RTCRtpTransceiver::new_with_sender("0", sender.clone(), None, None);

    assert_eq!(t.mid(), "0");
    assert_eq!(t.kind(), RTPCodecType::Video);
    assert_eq!(t.media(), "video");
    assert_eq!(t.direction(), RTCRtpTransceiverDirection::Sendonly);
    assert!(!t.is_closed());

    // A paused sender keeps the section open but stops sending.
    sender.set_active(false);
    assert_eq!(t.direction(), RTCRtpTransceiverDirection::Inactive);
    assert!(!t.is_closed());

    sender.set_active(true);
    assert_eq!(t.direction(), RTCRtpTransceiverDirection::Sendonly);

    sender.close_now();
    assert_eq!(t.direction(), RTCRtpTransceiverDirection::Inactive);
    assert!(t.is_closed());
}

#[test]
fn test_rtp_transceiver_recv_slot() {
    let peer = MockPeer::new("p", vec![]);
    let mut t = RTCRtpTransceiver::new_recv_slot("1", RTPCodecType::Audio, None, None);
    assert_eq!(t.direction(), RTCRtpTransceiverDirection::Recvonly);

    t.attach_receiver(new_receiver(&peer, RTPCodecType::Audio))
        .unwrap();
    assert_eq!(t.direction(), RTCRtpTransceiverDirection::Recvonly);

    let err = t
        .attach_receiver(new_receiver(&peer, RTPCodecType::Audio))
        .unwrap_err();
    assert!(matches!(err, Error::ErrRtpReceiverAlreadySet));

    peer.receivers()[0].close_now();
    assert_eq!(t.direction(), RTCRtpTransceiverDirection::Inactive);
    assert!(t.is_closed());
}

#[test]
fn test_rtp_transceiver_role_transitions() {
    let peer = MockPeer::new("p", vec![]);
    let mut t = RTCRtpTransceiver::new_section("audio-tracks", RTPCodecType::Audio);
    assert_eq!(t.direction(), RTCRtpTransceiverDirection::Inactive);

    t.attach_receiver(new_receiver(&peer, RTPCodecType::Audio))
        .unwrap();
    assert_eq!(t.direction(), RTCRtpTransceiverDirection::Recvonly);

    // A transceiver never carries both roles.
    let err = t
        .attach_sender(new_sender("s1", RTPCodecType::Audio, 1, None))
        .unwrap_err();
    assert!(matches!(err, Error::ErrRtpReceiverAlreadySet));
    assert!(t.sender().is_none());
    assert_eq!(t.direction(), RTCRtpTransceiverDirection::Recvonly);

    assert!(t.detach_receiver().unwrap().is_some());
    assert_eq!(t.direction(), RTCRtpTransceiverDirection::Inactive);

    t.attach_sender(new_sender("s1", RTPCodecType::Audio, 1, None))
        .unwrap();
    assert_eq!(t.direction(), RTCRtpTransceiverDirection::Sendonly);

    let err = t
        .attach_sender(new_sender("s2", RTPCodecType::Audio, 2, None))
        .unwrap_err();
    assert!(matches!(err, Error::ErrRtpSenderAlreadySet));

    let err = t
        .attach_receiver(new_receiver(&peer, RTPCodecType::Audio))
        .unwrap_err();
    assert!(matches!(err, Error::ErrRtpSenderAlreadySet));
    assert!(t.receiver().is_none());
    assert_eq!(t.direction(), RTCRtpTransceiverDirection::Sendonly);

    assert!(t.detach_sender().unwrap().is_some());
    assert_eq!(t.direction(), RTCRtpTransceiverDirection::Inactive);

    // Detaching an empty role is a no-op.
    assert!(t.detach_sender().unwrap().is_none());
    assert_eq!(t.direction(), RTCRtpTransceiverDirection::Inactive);
}

#[test]
fn test_rtp_transceiver_cross_role_attach() {
    let peer = MockPeer::new("p", vec![]);
    let sender = new_sender("s1", RTPCodecType::Video, 1111, None);
    let mut t = RTCRtpTransceiver::new_with_sender("0", sender, None, None);

    let err = t
        .attach_receiver(new_receiver(&peer, RTPCodecType::Video))
        .unwrap_err();
    assert!(matches!(err, Error::ErrRtpSenderAlreadySet));
    assert_eq!(t.direction(), RTCRtpTransceiverDirection::Sendonly);
}

#[tokio::test]
async fn test_rtp_transceiver_stop() {
    let peer = MockPeer::new("p", vec![]);
    let sender = new_sender("s1", RTPCodecType::Video, 1111, None);
    let mut t = RTCRtpTransceiver::new_with_sender("0", sender.clone(), None, None);
    assert_eq!(t.direction(), RTCRtpTransceiverDirection::Sendonly);

    t.stop().await.unwrap();
    assert!(t.stopped());
    assert!(t.is_closed());
    assert!(sender.closed());
    assert_eq!(t.direction(), RTCRtpTransceiverDirection::Inactive);

    // Stopped is absorbing.
    t.stop().await.unwrap();
    assert!(matches!(
        t.attach_sender(new_sender("s2", RTPCodecType::Video, 2, None)),
        Err(Error::ErrTransceiverStopped)
    ));
    assert!(matches!(
        t.detach_receiver(),
        Err(Error::ErrTransceiverStopped)
    ));

    let mut t = RTCRtpTransceiver::new_recv_slot("1", RTPCodecType::Video, None, None);
    t.attach_receiver(new_receiver(&peer, RTPCodecType::Video))
        .unwrap();
    t.stop().await.unwrap();
    assert!(peer.receivers()[0].closed());
}

#[tokio::test]
async fn test_transceiver_registry_stop_all_goes_past_failures() {
    let peer = MockPeer::new("p", vec![]);
    let s0 = new_sender("s0", RTPCodecType::Audio, 1, None);
    s0.fail_close.store(true, Ordering::SeqCst);
    let s2 = new_sender("s2", RTPCodecType::Video, 2, None);

    let mut registry = TransceiverRegistry::new();
    registry
        .push(RTCRtpTransceiver::new_with_sender("0", s0.clone(), None, None))
        .unwrap();
    let mut slot = RTCRtpTransceiver::new_recv_slot("1", RTPCodecType::Video, None, None);
    slot.attach_receiver(new_receiver(&peer, RTPCodecType::Video))
        .unwrap();
    registry.push(slot).unwrap();
    registry
        .push(RTCRtpTransceiver::new_with_sender("2", s2.clone(), None, None))
        .unwrap();

    let err = registry.stop_all().await.unwrap_err();
    assert!(err.to_string().contains("s0"), "{err}");

    // The failing sender does not keep the rest from closing.
    assert!(!s0.closed());
    assert!(peer.receivers()[0].closed());
    assert!(s2.closed());
    assert!(registry.iter().all(|t| t.stopped()));
}

#[test]
fn test_rtp_transceiver_placeholder() {
    let t = RTCRtpTransceiver::new_placeholder("data", "application");
    assert_eq!(t.media(), "application");
    assert_eq!(t.kind(), RTPCodecType::Unspecified);
    assert!(t.rejected());
    assert!(t.is_closed());
    assert_eq!(t.direction(), RTCRtpTransceiverDirection::Inactive);
}

#[test]
fn test_transceiver_registry_next_mid() {
    let mut registry = TransceiverRegistry::new();
    registry
        .push(RTCRtpTransceiver::new_recv_slot(
            "1",
            RTPCodecType::Audio,
            None,
            None,
        ))
        .unwrap();

    assert_eq!(registry.next_mid(), "0");
    // "1" is taken by the slot above.
    assert_eq!(registry.next_mid(), "2");
    assert_eq!(registry.next_mid(), "3");
}

#[test]
fn test_transceiver_registry_push_duplicated_mid() {
    let mut registry = TransceiverRegistry::new();
    registry
        .push(RTCRtpTransceiver::new_section("0", RTPCodecType::Audio))
        .unwrap();
    assert!(registry
        .push(RTCRtpTransceiver::new_section("0", RTPCodecType::Video))
        .is_err());
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn test_transceiver_registry_lookup_and_stop_closed() {
    let s1 = new_sender("s1", RTPCodecType::Audio, 1, None);
    let s2 = new_sender("s2", RTPCodecType::Video, 2, Some(3));

    let mut registry = TransceiverRegistry::new();
    for sender in [s1.clone(), s2.clone()] {
        let mid = registry.next_mid();
        registry
            .push(RTCRtpTransceiver::new_with_sender(&mid, sender, None, None))
            .unwrap();
    }
    registry
        .push(RTCRtpTransceiver::new_placeholder("2", "application"))
        .unwrap();

    assert!(registry.iter().take(2).all(|t| !t.is_closed()));
    assert_eq!(registry.find_by_sender_id("s2").map(|t| t.mid()), Some("1"));
    assert!(registry.has_sender("s1"));
    assert!(!registry.has_sender("s3"));

    s1.close_now();
    registry.stop_closed().await.unwrap();
    assert!(registry.find_by_mid("0").unwrap().stopped());
    assert!(!registry.find_by_mid("1").unwrap().stopped());

    // Positions never move.
    let mids: Vec<&str> = registry.iter().map(|t| t.mid()).collect();
    assert_eq!(mids, vec!["0", "1", "2"]);
}
