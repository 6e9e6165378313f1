//! Room coordination for the single shared game room
//!
//! The process hosts exactly one room with two playable roles. The room is
//! created lazily by the first join and destroyed once its member set
//! empties, modelling one empty room waiting for the next two players.
//!
//! Invariant: at most one host and one guest at any time, and a user never
//! holds both roles.

use crate::connection::ConnectionId;
use shared::{Role, UserId};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoomError {
    /// Both roles are taken by other users. Non-fatal: the caller surfaces
    /// this as a notice and the connection stays open, un-roled.
    #[error("room already has a host and a guest")]
    Full,
}

/// Result of a successful join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinOutcome {
    pub role: Role,
    /// The other role's occupant at join time; None while waiting.
    pub opponent: Option<UserId>,
}

#[derive(Debug)]
struct Room {
    host: Option<UserId>,
    guest: Option<UserId>,
    members: HashSet<ConnectionId>,
}

/// Assigns users to the host/guest roles and tracks room membership.
#[derive(Debug, Default)]
pub struct RoomCoordinator {
    room: Option<Room>,
}

impl RoomCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins a user into the room, creating it on first use.
    ///
    /// A user who already holds a role keeps it and merely re-attaches the
    /// new connection (reconnect case). Otherwise the first vacant role is
    /// assigned, host before guest.
    pub fn join(
        &mut self,
        user_id: UserId,
        connection_id: ConnectionId,
    ) -> Result<JoinOutcome, RoomError> {
        let room = self.room.get_or_insert_with(|| Room {
            host: None,
            guest: None,
            members: HashSet::new(),
        });

        let outcome = if room.host == Some(user_id) {
            JoinOutcome {
                role: Role::Host,
                opponent: room.guest,
            }
        } else if room.guest == Some(user_id) {
            JoinOutcome {
                role: Role::Guest,
                opponent: room.host,
            }
        } else if room.host.is_none() {
            room.host = Some(user_id);
            JoinOutcome {
                role: Role::Host,
                opponent: room.guest,
            }
        } else if room.guest.is_none() {
            room.guest = Some(user_id);
            JoinOutcome {
                role: Role::Guest,
                opponent: room.host,
            }
        } else {
            return Err(RoomError::Full);
        };

        room.members.insert(connection_id);
        Ok(outcome)
    }

    /// Removes a connection from the room. When the connection's bound
    /// user held a role, that role is vacated (never transferred). The
    /// room itself is destroyed once its member set empties.
    ///
    /// Returns the vacated role, if any.
    pub fn leave(&mut self, connection_id: ConnectionId, user_id: Option<UserId>) -> Option<Role> {
        let room = self.room.as_mut()?;

        if !room.members.remove(&connection_id) {
            return None;
        }

        let vacated = match user_id {
            Some(user) if room.host == Some(user) => {
                room.host = None;
                Some(Role::Host)
            }
            Some(user) if room.guest == Some(user) => {
                room.guest = None;
                Some(Role::Guest)
            }
            _ => None,
        };

        if room.members.is_empty() {
            self.room = None;
        }

        vacated
    }

    pub fn host(&self) -> Option<UserId> {
        self.room.as_ref().and_then(|room| room.host)
    }

    pub fn guest(&self) -> Option<UserId> {
        self.room.as_ref().and_then(|room| room.guest)
    }

    /// Role currently held by a user, if any.
    pub fn role_of(&self, user_id: UserId) -> Option<Role> {
        if self.host() == Some(user_id) {
            Some(Role::Host)
        } else if self.guest() == Some(user_id) {
            Some(Role::Guest)
        } else {
            None
        }
    }

    pub fn is_member(&self, connection_id: ConnectionId) -> bool {
        self.room
            .as_ref()
            .is_some_and(|room| room.members.contains(&connection_id))
    }

    pub fn members(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.room
            .iter()
            .flat_map(|room| room.members.iter().copied())
    }

    pub fn exists(&self) -> bool {
        self.room.is_some()
    }
}
