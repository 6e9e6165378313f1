//! Game action relay
//!
//! The server never simulates Pong. `join` goes through the room
//! coordinator; every other action is re-broadcast verbatim to the room's
//! other members, leaving authority entirely with the host client.

use crate::connection::ConnectionId;
use crate::room::RoomError;
use crate::session::SessionManager;
use log::{debug, info};
use shared::{GameAction, ServerMessage, UserId};

/// Handles one inbound game action from an authenticated connection.
pub fn handle_game_action(
    session: &mut SessionManager,
    conn_id: ConnectionId,
    user_id: UserId,
    action: GameAction,
) {
    match action {
        GameAction::Join { .. } => join_room(session, conn_id, user_id),
        other => {
            if !session.room.is_member(conn_id) {
                session.send_to(
                    conn_id,
                    &ServerMessage::Error {
                        message: "not in the game room".into(),
                    },
                );
                return;
            }
            debug!("Relaying {} from connection {}", action_name(&other), conn_id);
            session.relay_to_room(conn_id, &ServerMessage::Game { data: other });
        }
    }
}

/// Assigns a role via the room coordinator and announces the result: the
/// joiner gets its role and current opponent, the rest of the room gets a
/// `playerJoined` notification (this is how an earlier-joined host learns
/// its opponent id late).
pub fn join_room(session: &mut SessionManager, conn_id: ConnectionId, user_id: UserId) {
    match session.room.join(user_id, conn_id) {
        Ok(outcome) => {
            info!(
                "User {} joined as {:?} (opponent: {:?})",
                user_id, outcome.role, outcome.opponent
            );
            session.send_to(
                conn_id,
                &ServerMessage::AuthSuccess {
                    user_id,
                    role: Some(outcome.role),
                    opponent_id: outcome.opponent,
                },
            );
            session.relay_to_room(
                conn_id,
                &ServerMessage::Game {
                    data: GameAction::PlayerJoined {
                        user_id,
                        role: outcome.role,
                    },
                },
            );
        }
        Err(RoomError::Full) => {
            info!("User {} rejected: room full", user_id);
            session.send_to(
                conn_id,
                &ServerMessage::Error {
                    message: "room is full".into(),
                },
            );
        }
    }
}

fn action_name(action: &GameAction) -> &'static str {
    match action {
        GameAction::Join { .. } => "join",
        GameAction::StartGame { .. } => "startGame",
        GameAction::Pause => "pause",
        GameAction::ResetGame => "resetGame",
        GameAction::EndGame { .. } => "endGame",
        GameAction::BallUpdate { .. } => "ballUpdate",
        GameAction::BallReset { .. } => "ballReset",
        GameAction::MovePaddle { .. } => "movePaddle",
        GameAction::ScoreUpdate { .. } => "scoreUpdate",
        GameAction::PlayerJoined { .. } => "playerJoined",
    }
}
