//! JSON shape of the messages clients receive

use std::sync::Arc;

use serde_json::Value;

use red_tetris::adapter::{parse_message, ClientMessage, ServerMessage};
use red_tetris::core::{Game, GameSnapshot, PlayerInfo};
use red_tetris::types::{Difficulty, GameMode, PlayerAction};

fn state_json(snapshot: GameSnapshot) -> Value {
    let msg = ServerMessage::GameStateUpdate {
        state: Arc::new(snapshot),
    };
    let v = serde_json::to_value(&msg).unwrap();
    assert_eq!(v["type"], "gameStateUpdate");
    v["state"].clone()
}

#[test]
fn game_state_fields() {
    let mut game = Game::with_seed(
        PlayerInfo::new("p1", "Ana"),
        GameMode::Multiplayer,
        Difficulty::Fast,
        4,
    );
    game.add_player(PlayerInfo::new("p2", "Bo")).unwrap();
    game.add_spectator(PlayerInfo::new("s1", "Sam"));

    let lobby = state_json(game.snapshot());
    assert_eq!(lobby["status"], "lobby");
    assert_eq!(lobby["gameMode"], "multiplayer");
    assert_eq!(lobby["winner"], Value::Null);
    assert_eq!(lobby["level"], 8);
    assert_eq!(lobby["linesToNextLevel"], 5);
    assert_eq!(lobby["linesPerLevel"], 5);
    assert_eq!(lobby["lastResult"], Value::Null);
    assert_eq!(lobby["spectators"][0]["name"], "Sam");
    assert_eq!(lobby["players"][0]["activePiece"], Value::Null);

    game.start_game();
    let state = state_json(game.handle_player_action("p1", PlayerAction::MoveLeft));
    assert_eq!(state["status"], "playing");
    assert_eq!(state["events"], serde_json::json!(["move"]));

    let player = &state["players"][0];
    for key in [
        "id", "name", "isHost", "hasLost", "score", "board", "activePiece", "spectrum",
        "nextPieces",
    ] {
        assert!(player.get(key).is_some(), "missing {key}");
    }
    assert_eq!(player["spectrum"].as_array().unwrap().len(), 10);

    let active = &player["activePiece"];
    let kind = active["type"].as_str().unwrap();
    assert!(["I", "O", "T", "S", "Z", "J", "L"].contains(&kind));
    assert!(active["color"].as_str().unwrap().starts_with("rgb("));
    assert!(active["position"]["x"].is_i64());
    assert!(active["position"]["y"].is_i64());
    let size = active["shape"].as_array().unwrap().len();
    assert!((2..=4).contains(&size));

    let next = &player["nextPieces"][0];
    assert!(next["type"].is_string());
    assert!(next["shape"].is_array());
    assert!(next["color"].is_string());
}

#[test]
fn client_messages_round_trip_through_the_parser() {
    let msg = ClientMessage::JoinGame {
        room_name: "arena".to_string(),
        player_name: "Ana".to_string(),
        is_spectator: true,
        difficulty: None,
    };
    let line = serde_json::to_string(&msg).unwrap();
    assert!(line.contains(r#""type":"joinGame""#));
    assert!(line.contains(r#""isSpectator":true"#));
    assert_eq!(parse_message(&line).unwrap(), msg);

    let line = serde_json::to_string(&ClientMessage::PlayerAction {
        action: PlayerAction::SoftDrop,
    })
    .unwrap();
    assert_eq!(line, r#"{"type":"playerAction","action":"softDrop"}"#);
}
