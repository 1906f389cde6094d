//! Integration tests for the JSON wire format

use arena_relay::protocol::{
    decode_client_message, deserialize, serialize, ClientMessage, PlayerState, ProtocolError,
    ServerMessage, MAX_MESSAGE_SIZE,
};
use serde_json::json;

#[test]
fn test_init_variants_decode() {
    let host = decode_client_message(r#"{"type":"init"}"#, MAX_MESSAGE_SIZE).unwrap();
    assert_eq!(host, ClientMessage::host());

    let join = decode_client_message(r#"{"type":"init","join":"abc"}"#, MAX_MESSAGE_SIZE).unwrap();
    assert_eq!(join, ClientMessage::join("abc"));

    let watch =
        decode_client_message(r#"{"type":"init","watch":"xyz"}"#, MAX_MESSAGE_SIZE).unwrap();
    assert_eq!(watch, ClientMessage::watch("xyz"));
}

#[test]
fn test_null_token_counts_as_present() {
    let join = decode_client_message(r#"{"type":"init","join":null}"#, MAX_MESSAGE_SIZE).unwrap();
    assert_eq!(join, ClientMessage::join(""));

    let watch =
        decode_client_message(r#"{"type":"init","watch":null}"#, MAX_MESSAGE_SIZE).unwrap();
    assert_eq!(watch, ClientMessage::watch(""));

    assert!(decode_client_message(r#"{"type":"init","join":5}"#, MAX_MESSAGE_SIZE).is_err());
}

#[test]
fn test_init_with_player_decodes() {
    let text = r#"{"type":"init","join":"abc","player":{"color":"lightgreen","health":100}}"#;
    match decode_client_message(text, MAX_MESSAGE_SIZE).unwrap() {
        ClientMessage::Init {
            join,
            watch,
            player: Some(player),
        } => {
            assert_eq!(join.as_deref(), Some("abc"));
            assert!(watch.is_none());
            assert_eq!(player.color, "lightgreen");
            assert_eq!(player.health, 100.0);
        }
        other => panic!("Expected Init with player, got {:?}", other),
    }
}

#[test]
fn test_play_decodes_camel_case_controller() {
    let text = r#"{"type":"play","player":{"x":1.5,"y":2,"color":"yellow","health":90,"bulletController":{"bullets":[1,2]}}}"#;
    let msg = decode_client_message(text, MAX_MESSAGE_SIZE).unwrap();
    assert_eq!(
        msg,
        ClientMessage::Play {
            player: PlayerState {
                x: 1.5,
                y: 2.0,
                color: "yellow".to_string(),
                health: 90.0,
                bullet_controller: json!({ "bullets": [1, 2] }),
            }
        }
    );
}

#[test]
fn test_empty_player_uses_defaults() {
    let msg = decode_client_message(r#"{"type":"play","player":{}}"#, MAX_MESSAGE_SIZE).unwrap();
    assert_eq!(
        msg,
        ClientMessage::Play {
            player: PlayerState::default()
        }
    );
}

#[test]
fn test_missing_or_unknown_type_is_malformed() {
    for text in [r#"{"join":"abc"}"#, r#"{"type":"chat"}"#, "[]", "not json"] {
        let result = decode_client_message(text, MAX_MESSAGE_SIZE);
        assert!(
            matches!(result, Err(ProtocolError::MalformedMessage(_))),
            "{} should be malformed",
            text
        );
    }
}

#[test]
fn test_size_limit_is_enforced() {
    let text = r#"{"type":"init"}"#;
    let result = decode_client_message(text, 4);
    match result {
        Err(ProtocolError::MessageTooLarge { size, max }) => {
            assert_eq!(size, text.len());
            assert_eq!(max, 4);
        }
        other => panic!("Expected MessageTooLarge, got {:?}", other),
    }
}

#[test]
fn test_unexpected_message_names_both_types() {
    let err = ProtocolError::unexpected("init", &ClientMessage::Play {
        player: PlayerState::default(),
    });
    assert_eq!(
        err.to_string(),
        "Unexpected message: expected init, got play"
    );
}

#[test]
fn test_server_messages_wire_shape() {
    let init = ServerMessage::Init {
        join: "J".to_string(),
        watch: "W".to_string(),
    };
    assert_eq!(
        serde_json::to_value(&init).unwrap(),
        json!({ "type": "init", "join": "J", "watch": "W" })
    );

    let play = ServerMessage::Play {
        player: PlayerState {
            x: 1.0,
            y: 2.0,
            color: "yellow".to_string(),
            health: 50.0,
            bullet_controller: json!(null),
        },
    };
    assert_eq!(
        serde_json::to_value(&play).unwrap(),
        json!({
            "type": "play",
            "player": {
                "x": 1.0,
                "y": 2.0,
                "color": "yellow",
                "health": 50.0,
                "bulletController": null
            }
        })
    );

    let error = ServerMessage::Error {
        message: "Game not found.".to_string(),
    };
    assert_eq!(
        serialize(&error).unwrap(),
        r#"{"type":"error","message":"Game not found."}"#
    );

    let lost = ServerMessage::Lost {
        player: "yellow".to_string(),
    };
    assert_eq!(
        serde_json::to_value(&lost).unwrap(),
        json!({ "type": "lost", "player": "yellow" })
    );
}

#[test]
fn test_host_init_omits_absent_fields() {
    assert_eq!(
        serialize(&ClientMessage::host()).unwrap(),
        r#"{"type":"init"}"#
    );
}

#[test]
fn test_server_message_parses_back() {
    let text = r#"{"type":"error","message":"Out of bounds"}"#;
    let msg: ServerMessage = deserialize(text).unwrap();
    assert_eq!(
        msg,
        ServerMessage::Error {
            message: "Out of bounds".to_string()
        }
    );
}
