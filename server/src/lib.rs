//! # Session Server Library
//!
//! Server side of the real-time multiplayer Pong service: it coordinates
//! who is connected, who is online, who holds which of the two playable
//! roles, and it relays the host's authoritative simulation events to the
//! other peer. It deliberately runs no game physics of its own — the host
//! client simulates, the server forwards.
//!
//! ## Architecture
//!
//! ### Single coordinator task
//! All session state (connections, presence, the room) lives in one
//! [`session::SessionManager`] owned by the coordinator loop in
//! [`network`]. Transport tasks only push events into a channel; the loop
//! processes each event to completion before the next, so no two messages
//! are ever handled concurrently and shared state needs no locking. The
//! only suspension points inside a handler are the outbound calls to the
//! account services, which read no session state before resolving.
//!
//! ### Fail-closed routing
//! Every inbound frame passes through [`router::MessageRouter::handle`].
//! Malformed JSON, unknown `type` discriminators and unknown game
//! `action` values are answered with an `error` envelope and never crash
//! the process. Authentication failures additionally close the offending
//! connection.
//!
//! ### Liveness
//! A periodic heartbeat probes every connection; one that stays silent
//! for a full interval is terminated through the same cleanup path as an
//! explicit close: its room role is vacated, presence flips offline, and
//! peers are notified.
//!
//! ## Module Organization
//!
//! - [`connection`] — registry of live transport connections
//! - [`presence`] — user online/offline table behind `user-status`
//! - [`room`] — host/guest role assignment for the single shared room
//! - [`session`] — process-wide state owner and outbound fan-out
//! - [`auth`] — seams to the external account services
//! - [`router`] — typed dispatch of inbound envelopes
//! - [`relay`] — stateless re-broadcast of game actions
//! - [`network`] — WebSocket transport and the coordinator loop

pub mod auth;
pub mod connection;
pub mod network;
pub mod presence;
pub mod relay;
pub mod room;
pub mod router;
pub mod session;
