//! Message envelopes exchanged over the persistent WebSocket connection.
//!
//! Every frame is a JSON object with a mandatory `type` discriminator.
//! Inbound messages nest their fields under `payload`; outbound game and
//! tournament broadcasts nest under `data`, while the remaining outbound
//! messages carry flat camelCase fields.

use serde::{Deserialize, Serialize};

use crate::game::GameConfig;

/// Identity of an authenticated user, issued by the external auth service.
pub type UserId = u32;

/// The two playable roles in a room.
///
/// The host's local simulation is authoritative for ball physics and
/// scoring; the guest renders a replica of relayed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Guest,
}

/// Online/offline status carried by `user-status` broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Offline,
}

/// Inbound envelope: `{ "type": ..., "payload": { ... } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum ClientMessage {
    Auth {
        token: String,
    },
    Chat {
        text: String,
    },
    Dm {
        #[serde(rename = "toUserId")]
        to_user_id: UserId,
        text: String,
    },
    Game(GameAction),
    /// Tournament announcements are relayed opaquely.
    Tournament(serde_json::Value),
    InvitePong {
        #[serde(rename = "toUserId")]
        to_user_id: UserId,
    },
}

/// Game actions, discriminated by `action`.
///
/// All physics-bearing actions (`ballUpdate`, `movePaddle`) are
/// latest-wins state: a newer update overwrites older state without any
/// ordering reconciliation, which tolerates reordering across the two
/// peers' independent streams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum GameAction {
    #[serde(rename_all = "camelCase")]
    Join {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<UserId>,
    },
    /// Host only. `start_at` is a wall-clock millisecond target so both
    /// clients begin their countdown toward the same instant.
    #[serde(rename_all = "camelCase")]
    StartGame { settings: GameConfig, start_at: u64 },
    Pause,
    ResetGame,
    EndGame {
        winner: Role,
    },
    BallUpdate {
        x: f32,
        y: f32,
        dx: f32,
        dy: f32,
    },
    BallReset {
        x: f32,
        y: f32,
        dx: f32,
        dy: f32,
    },
    /// Sent only when the paddle actually moved since the last emission.
    /// The receiver treats `y` as a target and eases toward it.
    MovePaddle {
        y: f32,
    },
    ScoreUpdate {
        host: u32,
        guest: u32,
    },
    /// Outbound-only room notification emitted by the coordinator.
    #[serde(rename_all = "camelCase")]
    PlayerJoined { user_id: UserId, role: Role },
}

/// Outbound envelope, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Sent immediately when a connection opens.
    #[serde(rename_all = "camelCase")]
    Connection { client_id: u64 },
    /// Reply to a successful `auth`, including the outcome of the
    /// implicit room join. `role` is absent when the room was full.
    #[serde(rename_all = "camelCase")]
    AuthSuccess {
        user_id: UserId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        role: Option<Role>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        opponent_id: Option<UserId>,
    },
    Error {
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    Chat {
        sender_id: UserId,
        text: String,
        timestamp: u64,
    },
    #[serde(rename_all = "camelCase")]
    UserStatus {
        user_id: UserId,
        status: PresenceStatus,
    },
    #[serde(rename_all = "camelCase")]
    Dm {
        sender_id: UserId,
        text: String,
        timestamp: u64,
    },
    PongInvite {
        from: UserId,
    },
    Game {
        data: GameAction,
    },
    Tournament {
        data: serde_json::Value,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn roundtrip_client(msg: &ClientMessage) -> ClientMessage {
        let encoded = serde_json::to_string(msg).unwrap();
        serde_json::from_str(&encoded).unwrap()
    }

    fn roundtrip_server(msg: &ServerMessage) -> ServerMessage {
        let encoded = serde_json::to_string(msg).unwrap();
        serde_json::from_str(&encoded).unwrap()
    }

    #[test]
    fn auth_envelope_shape() {
        let msg = ClientMessage::Auth {
            token: "tok".into(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"type": "auth", "payload": {"token": "tok"}}));
    }

    #[test]
    fn game_action_nested_under_payload() {
        let msg = ClientMessage::Game(GameAction::MovePaddle { y: 120.5 });
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"type": "game", "payload": {"action": "movePaddle", "y": 120.5}})
        );
    }

    #[test]
    fn invite_pong_uses_kebab_case_tag() {
        let msg = ClientMessage::InvitePong { to_user_id: 7 };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"type": "invite-pong", "payload": {"toUserId": 7}})
        );
    }

    #[test]
    fn start_game_carries_settings_and_start_at() {
        let msg = ClientMessage::Game(GameAction::StartGame {
            settings: GameConfig::default(),
            start_at: 1_000_000,
        });
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["payload"]["action"], "startGame");
        assert_eq!(value["payload"]["startAt"], 1_000_000);
        assert!(value["payload"]["settings"]["winScore"].is_number());
        assert_eq!(roundtrip_client(&msg), msg);
    }

    #[test]
    fn outbound_game_nested_under_data() {
        let msg = ServerMessage::Game {
            data: GameAction::BallUpdate {
                x: 1.0,
                y: 2.0,
                dx: -3.0,
                dy: 4.0,
            },
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "game");
        assert_eq!(value["data"]["action"], "ballUpdate");
        assert_eq!(value["data"]["dx"], -3.0);
    }

    #[test]
    fn auth_success_omits_missing_role() {
        let msg = ServerMessage::AuthSuccess {
            user_id: 3,
            role: None,
            opponent_id: None,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"type": "auth-success", "userId": 3}));
    }

    #[test]
    fn user_status_shape() {
        let msg = ServerMessage::UserStatus {
            user_id: 9,
            status: PresenceStatus::Online,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"type": "user-status", "userId": 9, "status": "online"})
        );
    }

    #[test]
    fn unknown_type_fails_closed() {
        let result: Result<ClientMessage, _> =
            serde_json::from_str(r#"{"type": "teleport", "payload": {}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_action_fails_closed() {
        let result: Result<ClientMessage, _> =
            serde_json::from_str(r#"{"type": "game", "payload": {"action": "cheat"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn all_outbound_shapes_roundtrip() {
        let messages = vec![
            ServerMessage::Connection { client_id: 42 },
            ServerMessage::AuthSuccess {
                user_id: 1,
                role: Some(Role::Host),
                opponent_id: Some(2),
            },
            ServerMessage::Error {
                message: "room full".into(),
            },
            ServerMessage::Chat {
                sender_id: 4,
                text: "gg".into(),
                timestamp: 456,
            },
            ServerMessage::UserStatus {
                user_id: 5,
                status: PresenceStatus::Offline,
            },
            ServerMessage::Dm {
                sender_id: 1,
                text: "hello".into(),
                timestamp: 123,
            },
            ServerMessage::PongInvite { from: 2 },
            ServerMessage::Game {
                data: GameAction::EndGame { winner: Role::Guest },
            },
            ServerMessage::Tournament {
                data: json!({"round": 2}),
            },
        ];

        for msg in &messages {
            assert_eq!(&roundtrip_server(msg), msg);
        }
    }

    #[test]
    fn all_game_actions_roundtrip() {
        let actions = vec![
            GameAction::Join { user_id: Some(1) },
            GameAction::StartGame {
                settings: GameConfig::default(),
                start_at: 99,
            },
            GameAction::Pause,
            GameAction::ResetGame,
            GameAction::EndGame { winner: Role::Host },
            GameAction::BallUpdate {
                x: 0.5,
                y: 1.5,
                dx: 2.5,
                dy: -3.5,
            },
            GameAction::BallReset {
                x: 400.0,
                y: 300.0,
                dx: 200.0,
                dy: -120.0,
            },
            GameAction::MovePaddle { y: 250.0 },
            GameAction::ScoreUpdate { host: 2, guest: 1 },
            GameAction::PlayerJoined {
                user_id: 4,
                role: Role::Guest,
            },
        ];

        for action in actions {
            let msg = ClientMessage::Game(action);
            assert_eq!(roundtrip_client(&msg), msg);
        }
    }
}
