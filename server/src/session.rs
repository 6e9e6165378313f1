//! Process-wide session state: connections, presence, room
//!
//! `SessionManager` replaces what the original service kept in ambient
//! globals. It is constructed once in `main` (or per test), handed to the
//! message router, and only ever mutated from the coordinator task, so no
//! internal locking is needed.

use crate::connection::{ConnectionId, ConnectionRegistry};
use crate::presence::PresenceTable;
use crate::room::RoomCoordinator;
use log::{debug, info};
use shared::{PresenceStatus, Role, ServerMessage, UserId};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// Everything a user's disconnect changed, for the caller to announce.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DisconnectOutcome {
    pub user_id: Option<UserId>,
    /// Role freed in the room, if the user held one.
    pub vacated_role: Option<Role>,
    /// True when this was the user's last connection and their presence
    /// flipped to offline.
    pub went_offline: bool,
}

/// Owns the registry, presence table and room coordinator.
pub struct SessionManager {
    pub connections: ConnectionRegistry,
    pub presence: PresenceTable,
    pub room: RoomCoordinator,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            connections: ConnectionRegistry::new(),
            presence: PresenceTable::new(),
            room: RoomCoordinator::new(),
        }
    }

    /// Registers a new transport connection and greets it with its
    /// ephemeral client id.
    pub fn open_connection(&mut self, sender: mpsc::UnboundedSender<Message>) -> ConnectionId {
        let id = self.connections.register(sender);
        info!("Connection {} opened", id);
        self.send_to(id, &ServerMessage::Connection { client_id: id });
        id
    }

    /// Runs the full cleanup path shared by explicit closes, transport
    /// errors and heartbeat timeouts: the connection is unregistered, its
    /// room role vacated and presence updated. Broadcasting the fallout is
    /// left to the caller. Unknown ids are a no-op.
    pub fn close_connection(&mut self, id: ConnectionId) -> DisconnectOutcome {
        let Some(conn) = self.connections.unregister(id) else {
            return DisconnectOutcome::default();
        };
        info!("Connection {} closed", id);

        let vacated_role = self.room.leave(id, conn.user_id);
        let went_offline = match conn.user_id {
            // Presence only flips when no other connection of the same
            // user survives.
            Some(user) if self.connections.find_by_user(user).is_none() => {
                self.presence.set_offline(user)
            }
            _ => false,
        };

        DisconnectOutcome {
            user_id: conn.user_id,
            vacated_role,
            went_offline,
        }
    }

    /// Announces a disconnect to the remaining peers.
    pub fn broadcast_disconnect(&self, outcome: &DisconnectOutcome) {
        if let Some(user) = outcome.user_id {
            if outcome.went_offline {
                self.broadcast(&ServerMessage::UserStatus {
                    user_id: user,
                    status: PresenceStatus::Offline,
                });
            }
        }
    }

    pub fn send_to(&self, id: ConnectionId, message: &ServerMessage) {
        if let Some(conn) = self.connections.get(id) {
            conn.send(message);
        }
    }

    /// Delivers to the user's connection if they are online. Returns
    /// whether a connection was found.
    pub fn send_to_user(&self, user_id: UserId, message: &ServerMessage) -> bool {
        match self.connections.find_by_user(user_id) {
            Some(conn) => {
                conn.send(message);
                true
            }
            None => false,
        }
    }

    /// Sends to every live connection, authenticated or not.
    pub fn broadcast(&self, message: &ServerMessage) {
        for conn in self.connections.iter() {
            conn.send(message);
        }
    }

    /// Sends to every authenticated connection.
    pub fn broadcast_authenticated(&self, message: &ServerMessage) {
        for conn in self.connections.iter().filter(|c| c.user_id.is_some()) {
            conn.send(message);
        }
    }

    /// Re-broadcasts to the room's other members, never the sender.
    pub fn relay_to_room(&self, from: ConnectionId, message: &ServerMessage) {
        for member in self.room.members() {
            if member != from {
                self.send_to(member, message);
            }
        }
    }

    /// Heartbeat sweep: terminates every connection that failed to
    /// acknowledge the previous probe, then probes the survivors.
    /// Returns the outcomes of the terminated connections so the caller
    /// can broadcast presence fallout.
    pub fn sweep_heartbeats(&mut self) -> Vec<DisconnectOutcome> {
        let dead: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|conn| !conn.alive)
            .map(|conn| conn.id)
            .collect();

        let mut outcomes = Vec::with_capacity(dead.len());
        for id in dead {
            info!("Connection {} failed heartbeat, terminating", id);
            if let Some(conn) = self.connections.get(id) {
                conn.close();
            }
            outcomes.push(self.close_connection(id));
        }

        for conn in self.connections.iter_mut() {
            conn.alive = false;
            conn.ping();
        }
        debug!("Heartbeat probe sent to {} connections", self.connections.len());

        outcomes
    }

    /// Marks a connection as having answered since the last probe.
    pub fn mark_alive(&mut self, id: ConnectionId) {
        if let Some(conn) = self.connections.get_mut(id) {
            conn.alive = true;
        }
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
