#[cfg(test)]
mod tests {
    use crate::error::NodeError;
    use crate::membership::types::{Peer, PeerStatus};
    use crate::protocol::message::{Message, Payload};
    use crate::protocol::{decode, encode};

    fn sample_network() -> Vec<Peer> {
        vec![
            Peer {
                id: 0,
                address: "127.0.0.1".to_string(),
                status: PeerStatus::Coordinator,
                is_down: false,
                last_updated: 1_700_000_000,
            },
            Peer {
                id: 2,
                address: "127.0.0.2".to_string(),
                status: PeerStatus::Node,
                is_down: true,
                last_updated: 1_700_000_123,
            },
        ]
    }

    fn roundtrip(msg: Message) -> Message {
        let text = encode(&msg).expect("encode failed");
        decode(&text).expect("decode failed")
    }

    // ============================================================
    // ROUND-TRIP TESTS
    // ============================================================

    #[test]
    fn test_roundtrip_write_request_with_network() {
        let msg = Message::new(
            "127.0.0.1",
            "127.0.0.2",
            0,
            Payload::WriteRequest {
                key: "A".to_string(),
                value: "hello".to_string(),
            },
        )
        .with_network(sample_network());

        assert_eq!(roundtrip(msg.clone()), msg);
    }

    #[test]
    fn test_roundtrip_without_network() {
        let msg = Message::new(
            "127.0.0.5",
            "127.0.0.1",
            -1,
            Payload::ClientReadRequest {
                key: "some-key".to_string(),
            },
        );

        let text = encode(&msg).unwrap();
        assert!(text.contains("NODE-COUNT:-1"));
        assert_eq!(decode(&text).unwrap(), msg);
    }

    #[test]
    fn test_roundtrip_every_serializable_type() {
        let payloads = vec![
            Payload::ClientReadRequest { key: "k".into() },
            Payload::ClientReadResponse {
                key: "k".into(),
                value: "v".into(),
                timestamp: 42,
            },
            Payload::ClientWriteRequest {
                key: "k".into(),
                value: "v".into(),
            },
            Payload::ClientWriteResponse {
                key: "k".into(),
                value: "v".into(),
            },
            Payload::ClientDeleteRequest { key: "k".into() },
            Payload::KeyRequest { key: "k".into() },
            Payload::KeyAcknowledgement {
                key: "k".into(),
                timestamp: 7,
            },
            Payload::KeyQuery { key: "k".into() },
            Payload::ValueResponse {
                key: "k".into(),
                value: "v".into(),
                timestamp: 99,
            },
            Payload::WriteRequest {
                key: "k".into(),
                value: "v".into(),
            },
            Payload::WriteAcknowledgement { key: "k".into() },
            Payload::DeleteRequest { key: "k".into() },
            Payload::DeleteAcknowledgement { key: "k".into() },
            Payload::Ping,
            Payload::JoinRequest,
            Payload::JoinResponse { new_id: 3 },
            Payload::JoinIntroduction {
                new_id: 3,
                hop_count: 2,
            },
            Payload::FailureIndication {
                reason: "Key does not exist".into(),
            },
        ];

        for payload in payloads {
            let msg = Message::new("10.0.0.1", "10.0.0.2", 1, payload);
            assert_eq!(roundtrip(msg.clone()), msg, "payload {:?}", msg.payload);
        }
    }

    #[test]
    fn test_empty_key_acknowledgement_signals_absence() {
        let msg = Message::new(
            "127.0.0.2",
            "127.0.0.1",
            2,
            Payload::KeyAcknowledgement {
                key: String::new(),
                timestamp: 0,
            },
        );

        let decoded = roundtrip(msg);
        match decoded.payload {
            Payload::KeyAcknowledgement { key, timestamp } => {
                assert!(key.is_empty());
                assert_eq!(timestamp, 0);
            }
            other => panic!("wrong payload: {:?}", other),
        }
    }

    // ============================================================
    // HEADER AND FIELD ENCODING
    // ============================================================

    #[test]
    fn test_header_line_order() {
        let msg = Message::new("1.2.3.4", "5.6.7.8", 4, Payload::Ping);
        let text = encode(&msg).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "SOURCE:1.2.3.4");
        assert_eq!(lines[1], "DESTINATION:5.6.7.8");
        assert_eq!(lines[2], "TYPE:PING");
        assert_eq!(lines[3], "SOURCE-ID:4");
        assert_eq!(lines[4], "NODE-COUNT:-1");
    }

    #[test]
    fn test_peer_block_layout() {
        let msg = Message::new("127.0.0.1", "127.0.0.2", 0, Payload::JoinResponse { new_id: 2 })
            .with_network(sample_network());
        let text = encode(&msg).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[4], "NODE-COUNT:2");
        assert_eq!(lines[5], "ID:0");
        assert_eq!(lines[6], "STATUS:COORDINATOR");
        assert_eq!(lines[7], "ADDRESS:127.0.0.1");
        assert_eq!(lines[8], "IS-DOWN:0");
        assert_eq!(lines[9], "LAST-UPDATED:1700000000");
        assert_eq!(lines[10], "ID:2");
        assert_eq!(lines[13], "IS-DOWN:1");
        assert_eq!(lines[15], "NEW-ID:2");
    }

    #[test]
    fn test_decode_trims_whitespace() {
        let text = "SOURCE: 127.0.0.1 \nDESTINATION: 127.0.0.2\nTYPE: PING\nSOURCE-ID: 3\nNODE-COUNT: -1\n";
        let msg = decode(text).unwrap();
        assert_eq!(msg.source, "127.0.0.1");
        assert_eq!(msg.source_id, 3);
        assert_eq!(msg.payload, Payload::Ping);
    }

    #[test]
    fn test_value_may_contain_colon() {
        let msg = Message::new(
            "127.0.0.1",
            "127.0.0.2",
            1,
            Payload::WriteRequest {
                key: "url".to_string(),
                value: "http://example.com:8080/path".to_string(),
            },
        );
        assert_eq!(roundtrip(msg.clone()), msg);
    }

    // ============================================================
    // REJECTION TESTS
    // ============================================================

    #[test]
    fn test_missing_type_header_is_malformed() {
        let text = "SOURCE:127.0.0.1\nDESTINATION:127.0.0.2\nSOURCE-ID:1\nNODE-COUNT:-1\n";
        let err = decode(text).unwrap_err();
        assert!(matches!(err, NodeError::MalformedMessage(_)), "{:?}", err);
    }

    #[test]
    fn test_unknown_type_is_malformed() {
        let text =
            "SOURCE:127.0.0.1\nDESTINATION:127.0.0.2\nTYPE:BOGUS\nSOURCE-ID:1\nNODE-COUNT:-1\n";
        let err = decode(text).unwrap_err();
        assert!(matches!(err, NodeError::MalformedMessage(_)));
    }

    #[test]
    fn test_non_integer_source_id_is_malformed() {
        let text =
            "SOURCE:127.0.0.1\nDESTINATION:127.0.0.2\nTYPE:PING\nSOURCE-ID:abc\nNODE-COUNT:-1\n";
        assert!(decode(text).is_err());
    }

    #[test]
    fn test_truncated_peer_block_is_malformed() {
        let text = "SOURCE:127.0.0.1\nDESTINATION:127.0.0.2\nTYPE:PING\nSOURCE-ID:0\nNODE-COUNT:1\nID:2\nSTATUS:NODE\n";
        assert!(decode(text).is_err());
    }

    #[test]
    fn test_missing_payload_field_is_malformed() {
        let text = "SOURCE:127.0.0.1\nDESTINATION:127.0.0.2\nTYPE:WRITE-REQUEST\nSOURCE-ID:0\nNODE-COUNT:-1\nKEY:k\n";
        assert!(decode(text).is_err());
    }

    #[test]
    fn test_bad_is_down_flag_is_malformed() {
        let text = "SOURCE:127.0.0.1\nDESTINATION:127.0.0.2\nTYPE:PING\nSOURCE-ID:0\nNODE-COUNT:1\nID:2\nSTATUS:NODE\nADDRESS:127.0.0.2\nIS-DOWN:yes\nLAST-UPDATED:5\n";
        assert!(decode(text).is_err());
    }

    #[test]
    fn test_empty_sentinel_never_serializes() {
        let msg = Message::new("127.0.0.1", "127.0.0.2", 0, Payload::Empty);
        assert!(encode(&msg).is_err());
    }
}
