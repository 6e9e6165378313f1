//! Live transport connection tracking
//!
//! Every accepted WebSocket gets an ephemeral, opaque connection id and an
//! outbound sender the coordinator uses to push frames. A connection may
//! later be bound to an authenticated user; the binding dies with the
//! connection, never the other way around.

use log::warn;
use shared::{ServerMessage, UserId};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// Opaque identifier assigned when a transport connection opens.
pub type ConnectionId = u64;

/// A live transport connection and its session bindings.
#[derive(Debug)]
pub struct Connection {
    pub id: ConnectionId,
    /// Bound after a successful `auth`, never before.
    pub user_id: Option<UserId>,
    /// Cleared by each heartbeat probe, set again by any inbound frame.
    /// A connection still false at the next probe is terminated.
    pub alive: bool,
    sender: mpsc::UnboundedSender<Message>,
}

impl Connection {
    fn new(id: ConnectionId, sender: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            id,
            user_id: None,
            alive: true,
            sender,
        }
    }

    /// Queues an outbound envelope. Failures mean the writer task is gone;
    /// the heartbeat sweep will collect the corpse, so they are only logged.
    pub fn send(&self, message: &ServerMessage) {
        match serde_json::to_string(message) {
            Ok(text) => {
                if self.sender.send(Message::Text(text.into())).is_err() {
                    warn!("Connection {} writer is gone, dropping message", self.id);
                }
            }
            Err(e) => warn!("Failed to encode outbound message: {}", e),
        }
    }

    /// Queues a WebSocket ping probe.
    pub fn ping(&self) {
        if self.sender.send(Message::Ping(Vec::new().into())).is_err() {
            warn!("Connection {} writer is gone, dropping ping", self.id);
        }
    }

    /// Queues a close frame; the writer task shuts the socket down after
    /// flushing it.
    pub fn close(&self) {
        let _ = self.sender.send(Message::Close(None));
    }
}

/// Owns every live connection, keyed by connection id.
///
/// Ids are generated here and never reused within a process lifetime.
#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
    next_id: ConnectionId,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
            next_id: 1,
        }
    }

    /// Registers a freshly opened connection and returns its id.
    pub fn register(&mut self, sender: mpsc::UnboundedSender<Message>) -> ConnectionId {
        let id = self.next_id;
        self.next_id += 1;
        self.connections.insert(id, Connection::new(id, sender));
        id
    }

    /// Removes a connection. Unknown ids are a no-op.
    pub fn unregister(&mut self, id: ConnectionId) -> Option<Connection> {
        self.connections.remove(&id)
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut Connection> {
        self.connections.get_mut(&id)
    }

    /// Binds an authenticated user to a connection.
    pub fn bind_user(&mut self, id: ConnectionId, user_id: UserId) -> bool {
        match self.connections.get_mut(&id) {
            Some(conn) => {
                conn.user_id = Some(user_id);
                true
            }
            None => false,
        }
    }

    /// First live connection bound to the given user, if any.
    pub fn find_by_user(&self, user_id: UserId) -> Option<&Connection> {
        self.connections
            .values()
            .find(|conn| conn.user_id == Some(user_id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Connection> {
        self.connections.values_mut()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_one() -> (ConnectionRegistry, ConnectionId) {
        let mut registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = registry.register(tx);
        (registry, id)
    }

    #[test]
    fn register_assigns_increasing_ids() {
        let mut registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let first = registry.register(tx.clone());
        let second = registry.register(tx);
        assert!(second > first);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn unregister_unknown_is_noop() {
        let mut registry = ConnectionRegistry::new();
        assert!(registry.unregister(999).is_none());
    }

    #[test]
    fn new_connection_is_unbound_and_alive() {
        let (registry, id) = registry_with_one();
        let conn = registry.get(id).unwrap();
        assert_eq!(conn.user_id, None);
        assert!(conn.alive);
    }

    #[test]
    fn bind_user_then_find() {
        let (mut registry, id) = registry_with_one();
        assert!(registry.bind_user(id, 42));
        assert_eq!(registry.find_by_user(42).unwrap().id, id);
        assert!(registry.find_by_user(7).is_none());
    }

    #[test]
    fn bind_user_unknown_connection() {
        let mut registry = ConnectionRegistry::new();
        assert!(!registry.bind_user(1, 42));
    }

    #[test]
    fn send_serializes_text_frame() {
        let mut registry = ConnectionRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = registry.register(tx);

        registry
            .get(id)
            .unwrap()
            .send(&ServerMessage::Connection { client_id: id });

        match rx.try_recv().unwrap() {
            Message::Text(text) => {
                assert!(text.contains("\"type\":\"connection\""));
                assert!(text.contains("\"clientId\":1"));
            }
            other => panic!("Unexpected frame: {:?}", other),
        }
    }
}
