use log::{debug, info};
use rand::Rng;
use shared::game::{
    guest_paddle_edge, host_paddle_edge, BALL_SIZE, COURT_HEIGHT, COURT_WIDTH,
    SERVE_COUNTDOWN_STEPS, SERVE_COUNTDOWN_STEP_MS, START_COUNTDOWN_MS,
};
use shared::{Ball, GameAction, GameConfig, Paddle, Role, Score, UserId};

/// Per-frame easing factor applied to the remote paddle replica. The
/// replica moves toward the last relayed target instead of snapping,
/// masking latency jitter.
const PADDLE_EASING: f32 = 0.25;

/// Total duration of the local re-serve countdown.
const SERVE_COUNTDOWN_MS: u64 = SERVE_COUNTDOWN_STEPS as u64 * SERVE_COUNTDOWN_STEP_MS;

/// Session lifecycle as seen by one peer.
///
/// Both peers walk the same machine; authority differs. The host drives
/// transitions out of `Playing` (goals, game over); the guest follows the
/// relayed events. Countdown targets are wall-clock so both peers arm
/// `Playing` at the same instant regardless of relay latency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GamePhase {
    /// Not joined to the room.
    Idle,
    /// Joined as host with no opponent yet.
    WaitingForOpponent,
    /// Both roles present (or joined as guest); waiting for the host to
    /// start.
    Lobby,
    /// `startGame` seen; counting down to the shared wall-clock target.
    Countdown { start_at_ms: u64 },
    Playing,
    /// Either side requested a pause. Purely a rendering/ticking stop;
    /// state ownership is unchanged.
    Paused,
    /// A point was just scored; ball frozen until the local re-serve
    /// countdown elapses.
    PointScored { resume_at_ms: u64 },
    GameOver { winner: Role },
}

/// One peer's view of the match.
///
/// The host's copy is authoritative for ball physics and scoring; the
/// guest's copy is a replica updated only by relayed actions, latest
/// update wins.
pub struct PongGame {
    pub role: Role,
    pub opponent: Option<UserId>,
    pub config: GameConfig,
    pub host_paddle: Paddle,
    pub guest_paddle: Paddle,
    pub ball: Ball,
    pub score: Score,
    phase: GamePhase,
    paused: bool,
    /// Latest relayed position of the opponent's paddle.
    remote_target: Option<f32>,
    /// Actions produced by the simulation, drained by the network layer.
    outbox: Vec<GameAction>,
}

impl PongGame {
    /// A freshly assigned role, straight out of the join reply.
    pub fn new(role: Role, opponent: Option<UserId>) -> Self {
        let phase = match (role, opponent) {
            (Role::Host, None) => GamePhase::WaitingForOpponent,
            _ => GamePhase::Lobby,
        };

        Self {
            role,
            opponent,
            config: GameConfig::default(),
            host_paddle: Paddle::centered(),
            guest_paddle: Paddle::centered(),
            ball: Ball {
                x: COURT_WIDTH / 2.0,
                y: COURT_HEIGHT / 2.0,
                dx: 0.0,
                dy: 0.0,
                size: BALL_SIZE,
            },
            score: Score::default(),
            phase,
            paused: false,
            remote_target: None,
            outbox: Vec::new(),
        }
    }

    pub fn phase(&self) -> GamePhase {
        if self.paused && self.in_match() {
            GamePhase::Paused
        } else {
            self.phase
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    fn in_match(&self) -> bool {
        matches!(
            self.phase,
            GamePhase::Countdown { .. } | GamePhase::Playing | GamePhase::PointScored { .. }
        )
    }

    /// Actions queued for the relay since the last drain.
    pub fn drain_outbox(&mut self) -> Vec<GameAction> {
        std::mem::take(&mut self.outbox)
    }

    /// The paddle this peer controls.
    pub fn local_paddle(&self) -> &Paddle {
        match self.role {
            Role::Host => &self.host_paddle,
            Role::Guest => &self.guest_paddle,
        }
    }

    /// Sets the controlled paddle's velocity (from whatever input source
    /// the embedding UI polls).
    pub fn set_paddle_velocity(&mut self, velocity: f32) {
        let paddle = match self.role {
            Role::Host => &mut self.host_paddle,
            Role::Guest => &mut self.guest_paddle,
        };
        paddle.velocity = velocity.clamp(-self.config.paddle_speed, self.config.paddle_speed);
    }

    /// Host only: picks the settings, schedules the shared start instant
    /// and serves the first ball. Emits `startGame` followed by
    /// `ballReset` so the guest's replica starts identically.
    pub fn start_game<R: Rng>(&mut self, config: GameConfig, now_ms: u64, rng: &mut R) -> bool {
        if self.role != Role::Host || !matches!(self.phase, GamePhase::Lobby | GamePhase::GameOver { .. })
        {
            return false;
        }

        let start_at = now_ms + START_COUNTDOWN_MS;
        self.config = config;
        self.score = Score::default();
        self.ball = Ball::serve(&config, rng);
        self.phase = GamePhase::Countdown {
            start_at_ms: start_at,
        };
        self.paused = false;

        info!("Starting game, countdown to {}", start_at);
        self.outbox.push(GameAction::StartGame {
            settings: config,
            start_at,
        });
        self.outbox.push(GameAction::BallReset {
            x: self.ball.x,
            y: self.ball.y,
            dx: self.ball.dx,
            dy: self.ball.dy,
        });
        true
    }

    /// Either side may request a pause; the flag flips locally right away
    /// and the request is relayed for the peer to mirror.
    pub fn request_pause(&mut self) {
        if !self.in_match() {
            return;
        }
        self.paused = !self.paused;
        self.outbox.push(GameAction::Pause);
    }

    /// Host only: back to the lobby without re-authenticating.
    pub fn reset_game(&mut self) -> bool {
        if self.role != Role::Host {
            return false;
        }
        self.phase = GamePhase::Lobby;
        self.score = Score::default();
        self.paused = false;
        self.outbox.push(GameAction::ResetGame);
        true
    }

    /// Advances local time. The host runs ball physics and scoring here;
    /// the guest only moves paddles (its own, and the eased replica of
    /// the opponent's).
    pub fn tick<R: Rng>(&mut self, now_ms: u64, dt: f32, rng: &mut R) {
        if self.paused {
            return;
        }

        match self.phase {
            GamePhase::Countdown { start_at_ms } if now_ms >= start_at_ms => {
                info!("Countdown elapsed, playing");
                self.phase = GamePhase::Playing;
            }
            GamePhase::PointScored { resume_at_ms } if now_ms >= resume_at_ms => {
                self.phase = GamePhase::Playing;
            }
            _ => {}
        }

        if !self.in_match() {
            return;
        }

        self.step_paddles(dt);

        if self.phase == GamePhase::Playing && self.role == Role::Host {
            self.step_ball(now_ms, dt, rng);
        }
    }

    fn step_paddles(&mut self, dt: f32) {
        let (local, remote) = match self.role {
            Role::Host => (&mut self.host_paddle, &mut self.guest_paddle),
            Role::Guest => (&mut self.guest_paddle, &mut self.host_paddle),
        };
        local.step(dt);

        if let Some(target) = self.remote_target {
            remote.y += (target - remote.y) * PADDLE_EASING;
        }
    }

    /// Authoritative ball step: advance, reflect, score.
    fn step_ball<R: Rng>(&mut self, now_ms: u64, dt: f32, rng: &mut R) {
        self.ball.advance(dt);
        self.ball.reflect_walls();

        if self.ball.dx < 0.0 && self.ball.touches_paddle(&self.host_paddle, host_paddle_edge()) {
            self.ball.reflect_off_paddle();
        } else if self.ball.dx > 0.0
            && self
                .ball
                .touches_paddle(&self.guest_paddle, guest_paddle_edge())
        {
            self.ball.reflect_off_paddle();
        }

        if self.ball.x < 0.0 {
            self.point_scored(Role::Guest, now_ms, rng);
        } else if self.ball.x > COURT_WIDTH {
            self.point_scored(Role::Host, now_ms, rng);
        } else {
            self.outbox.push(GameAction::BallUpdate {
                x: self.ball.x,
                y: self.ball.y,
                dx: self.ball.dx,
                dy: self.ball.dy,
            });
        }
    }

    /// Host bookkeeping after a goal: bump the score, relay it, then
    /// either finish the match or re-serve behind the local countdown.
    fn point_scored<R: Rng>(&mut self, scorer: Role, now_ms: u64, rng: &mut R) {
        match scorer {
            Role::Host => self.score.host += 1,
            Role::Guest => self.score.guest += 1,
        }
        info!("Point for {:?} ({}:{})", scorer, self.score.host, self.score.guest);
        self.outbox.push(GameAction::ScoreUpdate {
            host: self.score.host,
            guest: self.score.guest,
        });

        if self.score.host >= self.config.win_score || self.score.guest >= self.config.win_score {
            let winner = if self.score.host > self.score.guest {
                Role::Host
            } else {
                Role::Guest
            };
            self.phase = GamePhase::GameOver { winner };
            self.outbox.push(GameAction::EndGame { winner });
            return;
        }

        self.ball = Ball::serve(&self.config, rng);
        self.phase = GamePhase::PointScored {
            resume_at_ms: now_ms + SERVE_COUNTDOWN_MS,
        };
        self.outbox.push(GameAction::BallReset {
            x: self.ball.x,
            y: self.ball.y,
            dx: self.ball.dx,
            dy: self.ball.dy,
        });
    }

    /// Applies a relayed action from the peer. Ball and score state is
    /// latest-wins: whatever arrives last simply overwrites the replica.
    pub fn apply_action(&mut self, action: GameAction, now_ms: u64) {
        match action {
            GameAction::PlayerJoined { user_id, role } => {
                debug!("Opponent {} joined as {:?}", user_id, role);
                if role != self.role {
                    self.opponent = Some(user_id);
                    if self.phase == GamePhase::WaitingForOpponent {
                        self.phase = GamePhase::Lobby;
                    }
                }
            }
            GameAction::StartGame { settings, start_at } => {
                self.config = settings;
                self.score = Score::default();
                self.paused = false;
                self.phase = GamePhase::Countdown {
                    start_at_ms: start_at,
                };
            }
            GameAction::Pause => {
                if self.in_match() {
                    self.paused = !self.paused;
                }
            }
            GameAction::ResetGame => {
                self.phase = GamePhase::Lobby;
                self.score = Score::default();
                self.paused = false;
            }
            GameAction::EndGame { winner } => {
                self.phase = GamePhase::GameOver { winner };
            }
            GameAction::BallUpdate { x, y, dx, dy } => {
                // The guest never predicts ball physics; it mirrors the
                // relayed state wholesale. Nothing moves after game over.
                if self.role == Role::Guest && !matches!(self.phase, GamePhase::GameOver { .. }) {
                    self.ball.x = x;
                    self.ball.y = y;
                    self.ball.dx = dx;
                    self.ball.dy = dy;
                }
            }
            GameAction::BallReset { x, y, dx, dy } => {
                if self.role == Role::Guest {
                    self.ball.x = x;
                    self.ball.y = y;
                    self.ball.dx = dx;
                    self.ball.dy = dy;
                    // Mirror the host's re-serve freeze with a purely
                    // local countdown; no further synchronization needed.
                    if self.phase == GamePhase::Playing {
                        self.phase = GamePhase::PointScored {
                            resume_at_ms: now_ms + SERVE_COUNTDOWN_MS,
                        };
                    }
                }
            }
            GameAction::MovePaddle { y } => {
                self.remote_target = Some(y);
            }
            GameAction::ScoreUpdate { host, guest } => {
                if self.role == Role::Guest {
                    self.score = Score { host, guest };
                }
            }
            GameAction::Join { .. } => {}
        }
    }
}
