use std::io::Cursor;

use regex::Regex;
use sdp::description::session::SessionDescription;

use super::*;

fn must_parse(raw: &str) -> SessionDescription {
    let mut reader = Cursor::new(raw.as_bytes());
    SessionDescription::unmarshal(&mut reader).unwrap()
}

fn session(media: &str) -> String {
    format!(
        "v=0\r\n\
o=- 4596489990601351948 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
{media}"
    )
}

const CHROME_PLAN_B_VIDEO: &str = "m=video 9 UDP/TLS/RTP/SAVPF 96 97\r\n\
c=IN IP4 0.0.0.0\r\n\
a=mid:video\r\n\
a=sendrecv\r\n\
a=rtpmap:96 VP8/90000\r\n\
a=rtpmap:97 rtx/90000\r\n\
a=fmtp:97 apt=96\r\n\
a=ssrc-group:SIM 10 20\r\n\
a=ssrc-group:FID 10 11\r\n\
a=ssrc-group:FID 20 21\r\n\
a=ssrc-group:FID 30 31\r\n\
a=ssrc:10 cname:chrome\r\n\
a=ssrc:10 msid:stream-a track-a\r\n\
a=ssrc:11 cname:chrome\r\n\
a=ssrc:20 cname:chrome\r\n\
a=ssrc:21 cname:chrome\r\n\
a=ssrc:30 cname:chrome\r\n\
a=ssrc:30 msid:stream-b track-b\r\n\
a=ssrc:31 cname:chrome\r\n\
a=ssrc:40 cname:chrome\r\n\
a=ssrc:40 label:screen\r\n\
a=ssrc:50 cname:chrome\r\n";

#[test]
fn test_codecs_from_media_description() {
    let parsed = must_parse(&session(
        "m=audio 9 UDP/TLS/RTP/SAVPF 111 0 103\r\n\
c=IN IP4 0.0.0.0\r\n\
a=rtpmap:111 opus/48000/2\r\n\
a=rtpmap:103 ISAC/16000/1\r\n\
a=fmtp:111 minptime=10;useinbandfec=1\r\n\
a=rtcp-fb:* transport-cc\r\n\
a=rtcp-fb:111 nack\r\n",
    ));

    let codecs = codecs_from_media_description(&parsed.media_descriptions[0]).unwrap();
    assert_eq!(codecs.len(), 3);

    assert_eq!(codecs[0].mime_type, "audio/opus");
    assert_eq!(codecs[0].channels, Some(2));
    assert_eq!(
        codecs[0].parameters.get("useinbandfec"),
        Some(&RTCRtpFmtpValue::Number(1))
    );
    assert_eq!(codecs[0].rtcp_feedback.len(), 2);

    // Static payload type without rtpmap.
    assert_eq!(codecs[1].mime_type, "audio/PCMU");
    assert_eq!(codecs[1].clock_rate, 8000);
    assert_eq!(codecs[1].rtcp_feedback.len(), 1);

    // A single channel is not recorded.
    assert_eq!(codecs[2].name(), "ISAC");
    assert_eq!(codecs[2].channels, None);
}

#[test]
fn test_codecs_from_media_description_malformed() {
    let tests = vec![
        (
            "BadRtpmap",
            "m=audio 9 UDP/TLS/RTP/SAVPF 111\r\na=rtpmap:111 opus\r\n",
        ),
        (
            "BadFmtp",
            "m=audio 9 UDP/TLS/RTP/SAVPF 111\r\na=rtpmap:111 opus/48000/2\r\na=fmtp:111\r\n",
        ),
        (
            "BadFormat",
            "m=audio 9 UDP/TLS/RTP/SAVPF abc\r\n",
        ),
    ];

    for (name, media) in tests {
        let parsed = must_parse(&session(media));
        let err = codecs_from_media_description(&parsed.media_descriptions[0]).unwrap_err();
        assert!(matches!(err, Error::ErrInvalidSdp(_)), "{name}: {err}");
    }
}

#[test]
fn test_pair_rtx_codecs() {
    let codec = |pt: PayloadType, name: &str, fmtp: &str| RTCRtpCodecParameters {
        mime_type: format!("video/{name}"),
        payload_type: pt,
        clock_rate: 90000,
        parameters: fmtp::fmtp_parameters_from_sdp(fmtp).unwrap(),
        ..Default::default()
    };

    let paired = pair_rtx_codecs(vec![
        codec(96, "VP8", ""),
        codec(97, "rtx", "apt=96;rtx-time=3000"),
        codec(98, "VP9", ""),
        // Orphan, dropped.
        codec(99, "rtx", "apt=120"),
    ])
    .unwrap();

    assert_eq!(paired.len(), 2);
    assert_eq!(
        paired[0].rtx,
        Some(RTCRtpCodecRtx {
            payload_type: 97,
            rtx_time: Some(3000),
        })
    );
    assert_eq!(paired[1].rtx, None);

    let err = pair_rtx_codecs(vec![codec(96, "VP8", ""), codec(97, "rtx", "")]).unwrap_err();
    assert!(matches!(err, Error::ErrRtxCodecWithoutApt));
}

#[test]
fn test_extract_remote_dtls_parameters() {
    let fingerprint = "sha-256 0F:74:31:25:CB:A2:13:EC:28:6F:6D:2C:61:FF:5D:C2:BC:B9:DB:3D:98:14:8D:1A:BB:EA:33:0C:A4:60:A8:8E";

    let tests = vec![
        (
            "MediaLevel",
            session(&format!(
                "m=audio 9 UDP/TLS/RTP/SAVPF 0\r\na=fingerprint:{fingerprint}\r\na=setup:active\r\n"
            )),
            DTLSRole::Client,
        ),
        (
            "SessionLevelFingerprint",
            format!(
                "v=0\r\n\
o=- 4596489990601351948 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
a=fingerprint:{fingerprint}\r\n\
m=audio 9 UDP/TLS/RTP/SAVPF 0\r\n\
a=mid:0\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96\r\n\
a=setup:passive\r\n"
            ),
            DTLSRole::Server,
        ),
    ];

    for (name, raw, role) in tests {
        let parameters = extract_remote_dtls_parameters(&must_parse(&raw)).unwrap();
        assert_eq!(parameters.role, role, "{name}");
        assert_eq!(parameters.fingerprints[0].algorithm, "sha-256", "{name}");
        assert!(parameters.fingerprints[0].value.starts_with("0F:74"), "{name}");
    }

    let err = extract_remote_dtls_parameters(&must_parse(&session(&format!(
        "m=audio 9 UDP/TLS/RTP/SAVPF 0\r\na=fingerprint:{fingerprint}\r\n"
    ))))
    .unwrap_err();
    assert!(matches!(err, Error::ErrNoRemoteDtlsParameters));
}

#[test]
fn test_remote_streams_from_media() {
    let parsed = must_parse(&session(CHROME_PLAN_B_VIDEO));
    let streams = remote_streams_from_media(&parsed.media_descriptions[0]).unwrap();

    let tests = vec![
        ("track-a", vec![10, 11, 20, 21]),
        ("track-b", vec![30, 31]),
        ("screen", vec![40]),
        ("50", vec![50]),
    ];
    assert_eq!(streams.len(), tests.len());
    for (stream, (track_id, ssrcs)) in streams.iter().zip(tests) {
        assert_eq!(stream.track_id, track_id);
        assert_eq!(stream.ssrcs(), ssrcs, "{track_id}");
        assert_eq!(stream.cname.as_deref(), Some("chrome"));
    }

    // The simulcast track has one encoding per layer.
    assert_eq!(streams[0].encodings.len(), 2);
    assert_eq!(streams[0].msid.as_deref(), Some("stream-a track-a"));
}

#[test]
fn test_remote_streams_media_msid() {
    let parsed = must_parse(&session(
        "m=audio 9 UDP/TLS/RTP/SAVPF 111\r\n\
a=msid:{stream-ff} {track-ff}\r\n\
a=sendonly\r\n\
a=rtpmap:111 opus/48000/2\r\n\
a=ssrc:777 cname:{firefox}\r\n",
    ));

    let streams = remote_streams_from_media(&parsed.media_descriptions[0]).unwrap();
    assert_eq!(streams.len(), 1);
    assert_eq!(streams[0].track_id, "{track-ff}");
    assert_eq!(streams[0].msid.as_deref(), Some("{stream-ff} {track-ff}"));

    let rtcp = rtcp_parameters_from_media_description(&parsed.media_descriptions[0]);
    assert_eq!(rtcp.cname, "{firefox}");
    assert!(!rtcp.mux);
    assert_eq!(
        get_peer_direction(&parsed.media_descriptions[0]),
        RTCRtpTransceiverDirection::Sendonly
    );
}

#[test]
fn test_fake_port_generator() {
    let mut ports = FakePortGenerator::new(10000, 10002);
    let got: Vec<u16> = (0..5).map(|_| ports.next_port()).collect();
    assert_eq!(got, vec![10000, 10001, 10002, 10000, 10001]);

    // Zero is never handed out.
    let mut ports = FakePortGenerator::new(0, 0);
    assert_eq!(ports.next_port(), 1);
    assert_eq!(ports.next_port(), 1);
}

#[test]
fn test_render_sections() {
    let origin = Origin {
        username: "-".to_owned(),
        session_id: 1234,
        session_version: 1,
        network_type: "IN".to_owned(),
        address_type: "IP4".to_owned(),
        unicast_address: "0.0.0.0".to_owned(),
    };
    let fingerprint = RTCDtlsFingerprint {
        algorithm: "sha-256".to_owned(),
        value: "ab:cd".to_owned(),
    };
    let mut d = new_session_description(&origin, &["0".to_owned()], &fingerprint);

    let codecs = vec![RTCRtpCodecParameters {
        mime_type: "video/VP8".to_owned(),
        payload_type: 96,
        clock_rate: 90000,
        rtcp_feedback: vec![RTCPFeedback {
            typ: "nack".to_owned(),
            parameter: "pli".to_owned(),
        }],
        rtx: Some(RTCRtpCodecRtx {
            payload_type: 97,
            rtx_time: Some(200),
        }),
        ..Default::default()
    }];
    let header_extensions = vec![RTCRtpHeaderExtensionParameters {
        uri: "urn:ietf:params:rtp-hdrext:sdes:mid".to_owned(),
        id: 1,
    }];
    let ice_parameters = RTCIceParameters {
        username_fragment: "ufrag".to_owned(),
        password: "pwd".to_owned(),
        ice_lite: true,
    };

    let m = media_section(&MediaSectionParams {
        media: "video",
        mid: "0",
        port: 10000,
        direction: RTCRtpTransceiverDirection::Sendonly,
        setup: ConnectionRole::Actpass,
        bandwidth: Some(500),
        codecs: &codecs,
        header_extensions: &header_extensions,
        ice_parameters: &ice_parameters,
        candidates: &[],
    })
    .unwrap();

    let parameters = RTCRtpParameters {
        codecs: codecs.clone(),
        encodings: vec![RTCRtpEncodingParameters {
            ssrc: Some(1001),
            rtx: Some(RTCRtpRtxParameters { ssrc: 1002 }),
            ..Default::default()
        }],
        rtcp: RTCRtcpParameters {
            cname: "sfu".to_owned(),
            ..Default::default()
        },
        ..Default::default()
    };
    d.media_descriptions
        .push(add_sender_ssrcs(m, &parameters, "stream track", false));
    d.media_descriptions.push(closed_media_section("audio", "1"));
    d.media_descriptions
        .push(closed_media_section(MEDIA_SECTION_APPLICATION, "2"));

    let sdp = d.marshal();
    let expected = vec![
        "a=group:BUNDLE 0",
        "a=ice-lite",
        "a=fingerprint:sha-256 AB:CD",
        "a=msid-semantic:WMS *",
        "m=video 10000 UDP/TLS/RTP/SAVPF 96 97",
        "c=IN IP4 127.0.0.1",
        "b=AS:500",
        "a=mid:0",
        "a=sendonly",
        "a=setup:actpass",
        "a=ice-ufrag:ufrag",
        "a=ice-pwd:pwd",
        "a=end-of-candidates",
        "a=rtcp-mux",
        "a=rtcp-rsize",
        "a=extmap:1 urn:ietf:params:rtp-hdrext:sdes:mid",
        "a=rtpmap:96 VP8/90000",
        "a=rtcp-fb:96 nack pli",
        "a=rtpmap:97 rtx/90000",
        "a=fmtp:97 apt=96;rtx-time=200",
        "a=msid:stream track",
        "a=ssrc-group:FID 1001 1002",
        "a=ssrc:1001 cname:sfu",
        "a=ssrc:1002 cname:sfu",
        "m=audio 0 UDP/TLS/RTP/SAVPF 0",
        "m=application 0 UDP/DTLS/SCTP webrtc-datachannel",
        "a=inactive",
    ];
    for line in expected {
        assert!(
            sdp.contains(&format!("{line}\r\n")),
            "missing {line:?} in\n{sdp}"
        );
    }

    // The rendered text parses back into the same sections.
    let back = must_parse(&sdp);
    assert_eq!(back.media_descriptions.len(), 3);
    assert_eq!(
        codecs_from_media_description(&back.media_descriptions[0]).unwrap()[0].rtcp_feedback,
        codecs[0].rtcp_feedback
    );
    assert!(Regex::new(r"(?m)^a=mid:2\r$").unwrap().is_match(&sdp));
}

#[test]
fn test_desc_to_capabilities() {
    let parsed = must_parse(&session(
        "m=audio 9 UDP/TLS/RTP/SAVPF 111 63\r\n\
a=mid:0\r\n\
a=extmap:4 urn:ietf:params:rtp-hdrext:sdes:mid\r\n\
a=rtpmap:111 opus/48000/2\r\n\
a=rtpmap:63 red/48000/2\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96 97 116\r\n\
a=mid:1\r\n\
a=extmap:4 urn:ietf:params:rtp-hdrext:sdes:mid\r\n\
a=rtpmap:96 VP8/90000\r\n\
a=rtpmap:97 rtx/90000\r\n\
a=fmtp:97 apt=96\r\n\
a=rtpmap:116 ulpfec/90000\r\n\
m=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\n\
a=mid:2\r\n",
    ));

    let caps = desc_to_capabilities(&parsed).unwrap();
    let codecs: Vec<(RTPCodecType, &str, PayloadType)> = caps
        .codecs
        .iter()
        .map(|c| (c.kind, c.mime_type.as_str(), c.preferred_payload_type))
        .collect();
    assert_eq!(
        codecs,
        vec![
            (RTPCodecType::Audio, "audio/opus", 111),
            (RTPCodecType::Video, "video/VP8", 96),
            (RTPCodecType::Video, "video/rtx", 97),
        ]
    );

    // Same uri and id in both kinds is recorded once.
    assert_eq!(caps.header_extensions.len(), 1);
    assert_eq!(
        caps.header_extensions[0].kind,
        RTCRtpHeaderExtensionKind::Both
    );
}

#[test]
fn test_desc_to_capabilities_same_payload_type_in_both_kinds() {
    let parsed = must_parse(&session(
        "m=audio 9 UDP/TLS/RTP/SAVPF 96\r\n\
a=mid:0\r\n\
a=rtpmap:96 opus/48000/2\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96\r\n\
a=mid:1\r\n\
a=rtpmap:96 VP8/90000\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96\r\n\
a=mid:2\r\n\
a=rtpmap:96 VP8/90000\r\n\
a=rtcp-fb:96 nack\r\n",
    ));

    let caps = desc_to_capabilities(&parsed).unwrap();
    let codecs: Vec<(RTPCodecType, &str, PayloadType)> = caps
        .codecs
        .iter()
        .map(|c| (c.kind, c.mime_type.as_str(), c.preferred_payload_type))
        .collect();
    assert_eq!(
        codecs,
        vec![
            (RTPCodecType::Audio, "audio/opus", 96),
            (RTPCodecType::Video, "video/VP8", 96),
        ]
    );
    // A later section of the same kind wins.
    assert_eq!(caps.codecs[1].rtcp_feedback.len(), 1);
}

#[test]
fn test_capabilities_render_back_to_same_codecs() {
    let parsed = must_parse(&session(
        "m=audio 9 UDP/TLS/RTP/SAVPF 111 0\r\n\
a=mid:0\r\n\
a=extmap:1 urn:ietf:params:rtp-hdrext:sdes:mid\r\n\
a=rtpmap:111 opus/48000/2\r\n\
a=fmtp:111 minptime=10;useinbandfec=1\r\n\
a=rtcp-fb:111 transport-cc\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96 97 102\r\n\
a=mid:1\r\n\
a=extmap:3 http://www.webrtc.org/experiments/rtp-hdrext/abs-send-time\r\n\
a=rtpmap:96 VP8/90000\r\n\
a=rtcp-fb:96 nack\r\n\
a=rtcp-fb:96 nack pli\r\n\
a=rtpmap:97 rtx/90000\r\n\
a=fmtp:97 apt=96\r\n\
a=rtpmap:102 H264/90000\r\n\
a=fmtp:102 level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=42e01f\r\n",
    ));
    let caps = desc_to_capabilities(&parsed).unwrap();

    let origin = Origin {
        username: "-".to_owned(),
        session_id: 1,
        session_version: 1,
        network_type: "IN".to_owned(),
        address_type: "IP4".to_owned(),
        unicast_address: "0.0.0.0".to_owned(),
    };
    let fingerprint = RTCDtlsFingerprint {
        algorithm: "sha-256".to_owned(),
        value: "ab:cd".to_owned(),
    };
    let ice_parameters = RTCIceParameters {
        username_fragment: "ufrag".to_owned(),
        password: "pwd".to_owned(),
        ice_lite: true,
    };
    let mut d = new_session_description(&origin, &[], &fingerprint);
    for (mid, kind) in [("0", RTPCodecType::Audio), ("1", RTPCodecType::Video)] {
        let codecs = capability_codecs(&caps, kind);
        let header_extensions = capability_header_extensions(&caps, kind);
        d.media_descriptions.push(
            media_section(&MediaSectionParams {
                media: &kind.to_string(),
                mid,
                port: 10000,
                direction: RTCRtpTransceiverDirection::Recvonly,
                setup: ConnectionRole::Actpass,
                bandwidth: None,
                codecs: &codecs,
                header_extensions: &header_extensions,
                ice_parameters: &ice_parameters,
                candidates: &[],
            })
            .unwrap(),
        );
    }

    let back = desc_to_capabilities(&must_parse(&d.marshal())).unwrap();
    assert_eq!(back.codecs, caps.codecs);
    assert_eq!(back.header_extensions, caps.header_extensions);
}
