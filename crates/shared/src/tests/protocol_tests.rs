use super::*;

#[test]
fn poll_frame_carries_reply_address_and_no_payload_data() {
    let (poll, reply_to) = Envelope::poll();
    assert_eq!(poll.kind(), MessageKind::Poll);
    assert_eq!(poll.reply_to(), Some(reply_to));

    let frame = poll.encode().expect("encode");
    let json: serde_json::Value = serde_json::from_str(&frame).expect("json");
    assert_eq!(json["type"], "poll");
    assert_eq!(json["payload"]["reply_to"], reply_to.0.to_string());
}

#[test]
fn status_update_decodes_from_wire_shape() {
    let frame = r#"{"type":"status_update","payload":{"text":"43"}}"#;
    let decoded = Envelope::decode(frame).expect("decode");
    assert_eq!(
        decoded,
        Envelope::StatusUpdate {
            text: "43".to_string()
        }
    );
    assert_eq!(decoded.reply_to(), None);
}

#[test]
fn unknown_kinds_decode_as_unknown() {
    let bare = Envelope::decode(r#"{"type":"ping"}"#).expect("bare");
    assert_eq!(bare.kind(), MessageKind::Unknown);

    let with_payload =
        Envelope::decode(r#"{"type":"reset_counter","payload":{"to":0}}"#).expect("payload");
    assert_eq!(with_payload, Envelope::Unknown);

    let untyped = Envelope::decode(r#"{"what":2}"#).expect("untyped");
    assert_eq!(untyped, Envelope::Unknown);
}

#[test]
fn known_kind_with_broken_payload_is_a_decode_error() {
    let err = Envelope::decode(r#"{"type":"reply","payload":{"count":"many"}}"#)
        .expect_err("bad payload");
    assert!(matches!(err, ChannelError::Decode(_)));

    assert!(Envelope::decode("not json").is_err());
}
