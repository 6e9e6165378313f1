//! Inbound message routing
//!
//! Single entry point for every frame received from a connection. The
//! router fails closed: malformed JSON, unknown `type` or unknown `action`
//! values produce an `error` reply to the offending connection and nothing
//! else. Handlers run to completion on the coordinator task; the only
//! suspension points are collaborator calls, which touch no session state
//! before resolving.

use crate::auth::{AuthError, BlockChecker, TokenVerifier};
use crate::connection::ConnectionId;
use crate::relay;
use crate::session::SessionManager;
use log::{info, warn};
use shared::time::now_ms;
use shared::{ClientMessage, PresenceStatus, ServerMessage, UserId};
use std::sync::Arc;

pub struct MessageRouter {
    session: SessionManager,
    verifier: Arc<dyn TokenVerifier>,
    blocks: Arc<dyn BlockChecker>,
}

impl MessageRouter {
    pub fn new(
        session: SessionManager,
        verifier: Arc<dyn TokenVerifier>,
        blocks: Arc<dyn BlockChecker>,
    ) -> Self {
        Self {
            session,
            verifier,
            blocks,
        }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionManager {
        &mut self.session
    }

    /// Dispatches one raw frame from a connection.
    pub async fn handle(&mut self, conn_id: ConnectionId, raw: &str) {
        let message = match serde_json::from_str::<ClientMessage>(raw) {
            Ok(message) => message,
            Err(e) => {
                warn!("Connection {} sent an unroutable frame: {}", conn_id, e);
                self.session.send_to(
                    conn_id,
                    &ServerMessage::Error {
                        message: "invalid message".into(),
                    },
                );
                return;
            }
        };

        match message {
            ClientMessage::Auth { token } => self.handle_auth(conn_id, &token).await,
            ClientMessage::Chat { text } => {
                if let Some(user_id) = self.require_user(conn_id) {
                    self.handle_chat(user_id, text);
                }
            }
            ClientMessage::Dm { to_user_id, text } => {
                if let Some(user_id) = self.require_user(conn_id) {
                    self.handle_dm(conn_id, user_id, to_user_id, text).await;
                }
            }
            ClientMessage::Game(action) => {
                if let Some(user_id) = self.require_user(conn_id) {
                    relay::handle_game_action(&mut self.session, conn_id, user_id, action);
                }
            }
            ClientMessage::Tournament(data) => {
                if self.require_user(conn_id).is_some() {
                    self.session
                        .broadcast_authenticated(&ServerMessage::Tournament { data });
                }
            }
            ClientMessage::InvitePong { to_user_id } => {
                if let Some(user_id) = self.require_user(conn_id) {
                    // Offline recipients are silently dropped, same as dm.
                    self.session
                        .send_to_user(to_user_id, &ServerMessage::PongInvite { from: user_id });
                }
            }
        }
    }

    /// Identity bound to the connection, or an error reply when there is
    /// none. Everything except `auth` requires one.
    fn require_user(&self, conn_id: ConnectionId) -> Option<UserId> {
        let user = self.authenticated_user(conn_id);
        if user.is_none() {
            self.session.send_to(
                conn_id,
                &ServerMessage::Error {
                    message: "not authenticated".into(),
                },
            );
        }
        user
    }

    /// Token verification, identity binding, presence broadcast and the
    /// implicit room join. Invalid tokens get an error reply followed by a
    /// forced close.
    async fn handle_auth(&mut self, conn_id: ConnectionId, token: &str) {
        match self.verifier.verify(token).await {
            Ok(identity) => {
                info!(
                    "Connection {} authenticated as user {} ({})",
                    conn_id, identity.user_id, identity.username
                );
                self.session.connections.bind_user(conn_id, identity.user_id);
                if self.session.presence.set_online(identity.user_id) {
                    self.session.broadcast(&ServerMessage::UserStatus {
                        user_id: identity.user_id,
                        status: PresenceStatus::Online,
                    });
                }
                // Implicit room join keeps the auth round trip count at
                // one; the reply carries the role assignment.
                relay::join_room(&mut self.session, conn_id, identity.user_id);
            }
            Err(e) => {
                warn!("Connection {} failed authentication: {}", conn_id, e);
                self.session.send_to(
                    conn_id,
                    &ServerMessage::Error {
                        message: match e {
                            AuthError::MissingToken => "missing token".into(),
                            AuthError::InvalidToken => "invalid token".into(),
                        },
                    },
                );
                if let Some(conn) = self.session.connections.get(conn_id) {
                    conn.close();
                }
                let outcome = self.session.close_connection(conn_id);
                self.session.broadcast_disconnect(&outcome);
            }
        }
    }

    fn handle_chat(&mut self, sender_id: UserId, text: String) {
        self.session.broadcast_authenticated(&ServerMessage::Chat {
            sender_id,
            text,
            timestamp: now_ms(),
        });
    }

    /// Direct message with block enforcement: a block in either direction
    /// yields an error notice to the sender only. Delivery to an offline
    /// recipient is silently dropped; nothing is queued.
    async fn handle_dm(
        &mut self,
        conn_id: ConnectionId,
        from: UserId,
        to: UserId,
        text: String,
    ) {
        if self.blocks.is_blocked(from, to).await {
            self.session.send_to(
                conn_id,
                &ServerMessage::Error {
                    message: "message could not be delivered".into(),
                },
            );
            return;
        }

        let message = ServerMessage::Dm {
            sender_id: from,
            text,
            timestamp: now_ms(),
        };
        if self.session.send_to_user(to, &message) {
            // Echo so the sender sees their own message in order.
            self.session.send_to(conn_id, &message);
        }
    }

    fn authenticated_user(&self, conn_id: ConnectionId) -> Option<UserId> {
        self.session.connections.get(conn_id).and_then(|c| c.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{StaticBlockList, StaticTokenVerifier};
    use tokio::sync::mpsc::{self, UnboundedReceiver};
    use tokio_tungstenite::tungstenite::Message;

    fn router() -> MessageRouter {
        let mut verifier = StaticTokenVerifier::new();
        verifier.insert("tok-1", 1, "alice");
        verifier.insert("tok-2", 2, "bob");
        verifier.insert("tok-3", 3, "carol");
        let mut blocks = StaticBlockList::new();
        blocks.block(2, 3);

        MessageRouter::new(
            SessionManager::new(),
            Arc::new(verifier),
            Arc::new(blocks),
        )
    }

    fn open(router: &mut MessageRouter) -> (ConnectionId, UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (router.session_mut().open_connection(tx), rx)
    }

    fn texts(rx: &mut UnboundedReceiver<Message>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            if let Message::Text(text) = msg {
                out.push(text.to_string());
            }
        }
        out
    }

    async fn auth(router: &mut MessageRouter, conn: ConnectionId, token: &str) {
        router
            .handle(conn, &format!(r#"{{"type":"auth","payload":{{"token":"{}"}}}}"#, token))
            .await;
    }

    #[tokio::test]
    async fn malformed_json_gets_error_reply() {
        let mut r = router();
        let (conn, mut rx) = open(&mut r);
        texts(&mut rx);

        r.handle(conn, "{not json").await;
        let frames = texts(&mut rx);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].contains("\"type\":\"error\""));
        // Connection stays open.
        assert!(r.session().connections.get(conn).is_some());
    }

    #[tokio::test]
    async fn unknown_type_gets_error_reply() {
        let mut r = router();
        let (conn, mut rx) = open(&mut r);
        texts(&mut rx);

        r.handle(conn, r#"{"type":"teleport","payload":{}}"#).await;
        let frames = texts(&mut rx);
        assert!(frames[0].contains("\"type\":\"error\""));
        assert!(r.session().connections.get(conn).is_some());
    }

    #[tokio::test]
    async fn unknown_game_action_gets_error_reply() {
        let mut r = router();
        let (conn, mut rx) = open(&mut r);
        auth(&mut r, conn, "tok-1").await;
        texts(&mut rx);

        r.handle(conn, r#"{"type":"game","payload":{"action":"cheat"}}"#)
            .await;
        let frames = texts(&mut rx);
        assert!(frames[0].contains("\"type\":\"error\""));
    }

    #[tokio::test]
    async fn successful_auth_binds_and_joins() {
        let mut r = router();
        let (conn, mut rx) = open(&mut r);
        texts(&mut rx);

        auth(&mut r, conn, "tok-1").await;
        let frames = texts(&mut rx);
        // Presence broadcast plus the auth-success/join reply.
        assert!(frames.iter().any(|f| f.contains("\"type\":\"user-status\"")
            && f.contains("\"status\":\"online\"")));
        let success = frames
            .iter()
            .find(|f| f.contains("\"type\":\"auth-success\""))
            .unwrap();
        assert!(success.contains("\"userId\":1"));
        assert!(success.contains("\"role\":\"host\""));
        assert!(r.session().presence.is_online(1));
    }

    #[tokio::test]
    async fn failed_auth_replies_then_closes() {
        let mut r = router();
        let (conn, mut rx) = open(&mut r);
        texts(&mut rx);

        auth(&mut r, conn, "bogus").await;
        let frames = texts(&mut rx);
        assert!(frames[0].contains("invalid token"));
        assert!(r.session().connections.get(conn).is_none());
    }

    #[tokio::test]
    async fn unauthenticated_chat_is_rejected() {
        let mut r = router();
        let (conn, mut rx) = open(&mut r);
        texts(&mut rx);

        r.handle(conn, r#"{"type":"chat","payload":{"text":"hi"}}"#)
            .await;
        let frames = texts(&mut rx);
        assert!(frames[0].contains("not authenticated"));
    }

    #[tokio::test]
    async fn chat_broadcasts_to_authenticated_connections() {
        let mut r = router();
        let (a, mut a_rx) = open(&mut r);
        let (b, mut b_rx) = open(&mut r);
        let (idle, mut idle_rx) = open(&mut r);
        auth(&mut r, a, "tok-1").await;
        auth(&mut r, b, "tok-2").await;
        texts(&mut a_rx);
        texts(&mut b_rx);
        texts(&mut idle_rx);

        r.handle(a, r#"{"type":"chat","payload":{"text":"hello"}}"#)
            .await;

        let to_a = texts(&mut a_rx);
        let to_b = texts(&mut b_rx);
        assert!(to_a[0].contains("\"type\":\"chat\"") && to_a[0].contains("hello"));
        assert!(to_b[0].contains("\"senderId\":1"));
        // Unauthenticated connections receive nothing.
        assert!(texts(&mut idle_rx).is_empty());
        let _ = idle;
    }

    #[tokio::test]
    async fn dm_delivers_and_echoes() {
        let mut r = router();
        let (a, mut a_rx) = open(&mut r);
        let (b, mut b_rx) = open(&mut r);
        auth(&mut r, a, "tok-1").await;
        auth(&mut r, b, "tok-2").await;
        texts(&mut a_rx);
        texts(&mut b_rx);

        r.handle(a, r#"{"type":"dm","payload":{"toUserId":2,"text":"psst"}}"#)
            .await;

        let to_b = texts(&mut b_rx);
        assert_eq!(to_b.len(), 1);
        assert!(to_b[0].contains("\"type\":\"dm\"") && to_b[0].contains("psst"));
        let to_a = texts(&mut a_rx);
        assert_eq!(to_a.len(), 1, "sender should see an echo");
        assert!(to_a[0].contains("psst"));
    }

    #[tokio::test]
    async fn dm_to_blocked_user_errors_sender_only() {
        let mut r = router();
        let (b, mut b_rx) = open(&mut r);
        let (c, mut c_rx) = open(&mut r);
        auth(&mut r, b, "tok-2").await;
        auth(&mut r, c, "tok-3").await;
        texts(&mut b_rx);
        texts(&mut c_rx);

        // Users 2 and 3 have a block between them.
        r.handle(b, r#"{"type":"dm","payload":{"toUserId":3,"text":"hi"}}"#)
            .await;

        let to_b = texts(&mut b_rx);
        assert_eq!(to_b.len(), 1);
        assert!(to_b[0].contains("\"type\":\"error\""));
        assert!(texts(&mut c_rx).is_empty());
    }

    #[tokio::test]
    async fn dm_to_offline_user_is_silently_dropped() {
        let mut r = router();
        let (a, mut a_rx) = open(&mut r);
        auth(&mut r, a, "tok-1").await;
        texts(&mut a_rx);

        r.handle(a, r#"{"type":"dm","payload":{"toUserId":99,"text":"void"}}"#)
            .await;
        assert!(texts(&mut a_rx).is_empty());
    }

    #[tokio::test]
    async fn invite_pong_reaches_target_user() {
        let mut r = router();
        let (a, mut a_rx) = open(&mut r);
        let (b, mut b_rx) = open(&mut r);
        auth(&mut r, a, "tok-1").await;
        auth(&mut r, b, "tok-2").await;
        texts(&mut a_rx);
        texts(&mut b_rx);

        r.handle(a, r#"{"type":"invite-pong","payload":{"toUserId":2}}"#)
            .await;

        let to_b = texts(&mut b_rx);
        assert_eq!(to_b.len(), 1);
        assert!(to_b[0].contains("\"type\":\"pong-invite\""));
        assert!(to_b[0].contains("\"from\":1"));
    }

    #[tokio::test]
    async fn tournament_is_broadcast_verbatim() {
        let mut r = router();
        let (a, mut a_rx) = open(&mut r);
        let (b, mut b_rx) = open(&mut r);
        auth(&mut r, a, "tok-1").await;
        auth(&mut r, b, "tok-2").await;
        texts(&mut a_rx);
        texts(&mut b_rx);

        r.handle(a, r#"{"type":"tournament","payload":{"round":2,"bracket":"upper"}}"#)
            .await;

        let to_b = texts(&mut b_rx);
        assert!(to_b[0].contains("\"type\":\"tournament\""));
        assert!(to_b[0].contains("\"bracket\":\"upper\""));
    }
}
