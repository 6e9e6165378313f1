pub mod game;
pub mod protocol;
pub mod time;

pub use game::{Ball, GameConfig, Paddle, Score};
pub use protocol::{ClientMessage, GameAction, PresenceStatus, Role, ServerMessage, UserId};
