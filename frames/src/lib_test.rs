use super::*;
use serde_json::json;

#[test]
fn request_sets_fields() {
    let frame = Frame::request("room:join", Data::new());
    assert_eq!(frame.syscall, "room:join");
    assert_eq!(frame.status, Status::Request);
    assert!(frame.parent_id.is_none());
    assert!(frame.board_id.is_none());
    assert!(frame.ts > 0);
}

#[test]
fn reply_inherits_context() {
    let board_id = Uuid::new_v4();
    let req = Frame::request("cell:write", Data::new()).with_board_id(board_id);
    let item = req.item(Data::new());

    assert_eq!(item.parent_id, Some(req.id));
    assert_eq!(item.board_id, Some(board_id));
    assert_eq!(item.syscall, "cell:write");
    assert_eq!(item.status, Status::Item);
}

#[test]
fn done_is_terminal() {
    assert!(Status::Done.is_terminal());
    assert!(Status::Error.is_terminal());
    assert!(Status::Cancel.is_terminal());
    assert!(!Status::Request.is_terminal());
    assert!(!Status::Item.is_terminal());
}

#[test]
fn done_with_carries_payload() {
    let req = Frame::request("cell:read", Data::new());
    let mut data = Data::new();
    data.insert(FRAME_SCENE.into(), json!("{\"objects\":[],\"version\":\"1.0\"}"));
    data.insert(FRAME_SEQ.into(), json!(3));
    let done = req.done_with(data);

    assert_eq!(done.status, Status::Done);
    assert_eq!(done.data.get(FRAME_SEQ).and_then(serde_json::Value::as_i64), Some(3));
}

#[test]
fn prefix_and_op_extraction() {
    let frame = Frame::request("presence:update", Data::new());
    assert_eq!(frame.prefix(), "presence");
    assert_eq!(frame.op(), "update");

    let frame = Frame::request("noseparator", Data::new());
    assert_eq!(frame.prefix(), "noseparator");
    assert_eq!(frame.op(), "");
}

#[test]
fn json_round_trip() {
    let board_id = Uuid::new_v4();
    let original = Frame::request("room:join", Data::new())
        .with_board_id(board_id)
        .with_from("test-user")
        .with_data("key", "value");

    let text = serde_json::to_string(&original).expect("serialize");
    let restored: Frame = serde_json::from_str(&text).expect("deserialize");

    assert_eq!(restored.id, original.id);
    assert_eq!(restored.board_id, Some(board_id));
    assert_eq!(restored.syscall, "room:join");
    assert_eq!(restored.from.as_deref(), Some("test-user"));
    assert_eq!(restored.data.get("key").and_then(|v| v.as_str()), Some("value"));
}

#[test]
fn error_from_typed() {
    #[derive(Debug, thiserror::Error)]
    #[error("board not found")]
    struct NotFound;

    impl ErrorCode for NotFound {
        fn error_code(&self) -> &'static str {
            "E_BOARD_NOT_FOUND"
        }
    }

    let req = Frame::request("room:join", Data::new());
    let err = req.error_from(&NotFound);

    assert_eq!(err.status, Status::Error);
    assert_eq!(err.data.get(FRAME_CODE).and_then(|v| v.as_str()), Some("E_BOARD_NOT_FOUND"));
    assert_eq!(err.data.get(FRAME_MESSAGE).and_then(|v| v.as_str()), Some("board not found"));
    assert_eq!(
        err.data
            .get(FRAME_RETRYABLE)
            .and_then(serde_json::Value::as_bool),
        Some(false)
    );
}

#[test]
fn cancel_references_target() {
    let req = Frame::request("cell:write", Data::new());
    let cancel = Frame::cancel(req.id);

    assert_eq!(cancel.parent_id, Some(req.id));
    assert_eq!(cancel.status, Status::Cancel);
    assert!(cancel.status.is_terminal());
}

#[test]
fn binary_round_trip_preserves_all_fields() {
    let board_id = Uuid::new_v4();
    let original = Frame::request("cell:write", Data::new())
        .with_board_id(board_id)
        .with_from("someone")
        .with_data(FRAME_SCENE, "{\"objects\":[],\"version\":\"1.0\"}")
        .with_data("nested", json!({"a": [1.0, 2.0], "b": {"c": true}}));

    let bytes = encode_frame(&original);
    let restored = decode_frame(&bytes).expect("decode");

    assert_eq!(restored, original);
}

#[test]
fn binary_round_trip_null_and_empty() {
    let mut data = Data::new();
    data.insert("cursor".into(), serde_json::Value::Null);
    let original = Frame::request("presence:update", data);

    let restored = decode_frame(&encode_frame(&original)).expect("decode");
    assert_eq!(restored.data.get("cursor"), Some(&serde_json::Value::Null));

    let empty = Frame::request("room:part", Data::new());
    let restored = decode_frame(&encode_frame(&empty)).expect("decode");
    assert!(restored.data.is_empty());
}

#[test]
fn decode_rejects_garbage() {
    assert!(matches!(decode_frame(&[0xff, 0xff, 0xff]), Err(CodecError::Decode(_))));
}

#[test]
fn decode_rejects_bad_uuid() {
    let frame = Frame::request("room:join", Data::new());
    let mut wire = frame_to_wire(&frame);
    wire.id = "not-a-uuid".into();

    let mut bytes = Vec::new();
    prost::Message::encode(&wire, &mut bytes).expect("encode");
    assert!(matches!(decode_frame(&bytes), Err(CodecError::InvalidUuid(_))));
}
