//! Court geometry, match settings and the ball/paddle primitives shared by
//! both peers. The host runs these rules authoritatively; the guest only
//! uses the types to mirror relayed state.

use rand::Rng;
use serde::{Deserialize, Serialize};

pub const COURT_WIDTH: f32 = 800.0;
pub const COURT_HEIGHT: f32 = 600.0;
pub const PADDLE_WIDTH: f32 = 12.0;
pub const PADDLE_HEIGHT: f32 = 100.0;
/// Gap between a side wall and the back of its paddle.
pub const PADDLE_MARGIN: f32 = 24.0;
pub const BALL_SIZE: f32 = 12.0;
/// Horizontal window around a paddle's leading edge inside which a
/// facing ball is considered in contact.
pub const PADDLE_EDGE_TOLERANCE: f32 = BALL_SIZE;

/// Serve direction is a random angle within this many degrees of the
/// horizontal, so a serve never starts as a near-vertical rally.
pub const SERVE_MAX_ANGLE_DEG: f32 = 60.0;

/// How often the server probes connection liveness. A connection that has
/// not acknowledged within one interval is terminated.
pub const HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// Number of steps in the local re-serve countdown after a point.
pub const SERVE_COUNTDOWN_STEPS: u32 = 3;
/// Duration of each countdown step in milliseconds.
pub const SERVE_COUNTDOWN_STEP_MS: u64 = 1000;
/// Lead the host puts on `startAt` so the relayed `startGame` reaches the
/// guest before the shared countdown target passes.
pub const START_COUNTDOWN_MS: u64 = 3000;

/// Leading edge of the host (left) paddle.
pub fn host_paddle_edge() -> f32 {
    PADDLE_MARGIN + PADDLE_WIDTH
}

/// Leading edge of the guest (right) paddle.
pub fn guest_paddle_edge() -> f32 {
    COURT_WIDTH - PADDLE_MARGIN - PADDLE_WIDTH
}

/// Match settings chosen by the host and shipped inside `startGame`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    pub ball_speed: f32,
    pub paddle_speed: f32,
    pub win_score: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            ball_speed: 320.0,
            paddle_speed: 300.0,
            win_score: 3,
        }
    }
}

/// Ball state. `x`/`y` is the center; `dx`/`dy` is velocity in units/sec.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
    pub size: f32,
}

impl Ball {
    /// A freshly served ball: centered, random direction left/right,
    /// random angle within [-SERVE_MAX_ANGLE_DEG, +SERVE_MAX_ANGLE_DEG]
    /// of the horizontal, speed taken from the settings.
    pub fn serve<R: Rng>(config: &GameConfig, rng: &mut R) -> Self {
        let max_angle = SERVE_MAX_ANGLE_DEG.to_radians();
        let angle = rng.gen_range(-max_angle..=max_angle);
        let direction: f32 = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };

        Self {
            x: COURT_WIDTH / 2.0,
            y: COURT_HEIGHT / 2.0,
            dx: config.ball_speed * angle.cos() * direction,
            dy: config.ball_speed * angle.sin(),
            size: BALL_SIZE,
        }
    }

    pub fn advance(&mut self, dt: f32) {
        self.x += self.dx * dt;
        self.y += self.dy * dt;
    }

    /// Reflects off the top/bottom walls, flipping the vertical sign while
    /// preserving magnitude.
    pub fn reflect_walls(&mut self) {
        let half = self.size / 2.0;
        if self.y - half <= 0.0 {
            self.y = half;
            self.dy = -self.dy;
        } else if self.y + half >= COURT_HEIGHT {
            self.y = COURT_HEIGHT - half;
            self.dy = -self.dy;
        }
    }

    /// Axis-aligned contact check against a paddle's leading edge: the
    /// ball center must be within the paddle's vertical span and within a
    /// small horizontal tolerance of the edge.
    pub fn touches_paddle(&self, paddle: &Paddle, edge_x: f32) -> bool {
        self.y >= paddle.y
            && self.y <= paddle.y + PADDLE_HEIGHT
            && (self.x - edge_x).abs() <= PADDLE_EDGE_TOLERANCE
    }

    /// Flips the horizontal sign, preserving magnitude.
    pub fn reflect_off_paddle(&mut self) {
        self.dx = -self.dx;
    }
}

/// Vertical paddle state. Horizontal position is fixed per role.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Paddle {
    pub y: f32,
    pub velocity: f32,
}

impl Paddle {
    pub fn centered() -> Self {
        Self {
            y: (COURT_HEIGHT - PADDLE_HEIGHT) / 2.0,
            velocity: 0.0,
        }
    }

    pub fn step(&mut self, dt: f32) {
        self.y = (self.y + self.velocity * dt).clamp(0.0, COURT_HEIGHT - PADDLE_HEIGHT);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Score {
    pub host: u32,
    pub guest: u32,
}
