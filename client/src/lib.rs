//! # Game Client Library
//!
//! Client side of the multiplayer Pong session: it owns the actual game
//! simulation. Which parts of it are authoritative depends on the role
//! the server assigned on join:
//!
//! ## Host-Authoritative Simulation
//! The host advances ball physics, detects goals, keeps the score and
//! decides the winner. Each physics step emits relay events (`ballUpdate`,
//! `ballReset`, `scoreUpdate`, `endGame`) that the server forwards to the
//! guest verbatim.
//!
//! ## Guest-Side Reconciliation
//! The guest never predicts ball physics. Relayed ball and score state
//! overwrites its replica wholesale, latest update wins, which tolerates
//! reordering and loss across the two peers' independent streams. The
//! opponent's paddle is the one exception: `movePaddle` positions are
//! targets the replica eases toward instead of snapping, masking latency
//! jitter.
//!
//! ## Shared Clock Targets
//! `startGame` carries a wall-clock `startAt` so both peers arm `Playing`
//! at the same instant regardless of relay latency; the re-serve
//! countdown after each point is purely local and needs no
//! synchronization at all.
//!
//! ## Module Organization
//!
//! - [`game`] — the phase state machine and Pong simulation
//! - [`input`] — delta-based `movePaddle` reporting
//! - [`network`] — WebSocket session, envelope dispatch, tick loop
//!
//! Rendering and input polling belong to the embedding UI; this crate
//! only exposes the state fields a renderer needs (`PongGame`'s paddles,
//! ball, score and phase) and a [`network::SessionEvent`] feed for
//! chat, presence and invite notifications.

pub mod game;
pub mod input;
pub mod network;
