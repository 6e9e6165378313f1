use crate::game::PongGame;
use crate::input::PaddleReporter;
use futures_util::{SinkExt, StreamExt};
use log::{error, info, warn};
use shared::time::now_ms;
use shared::{ClientMessage, GameConfig, PresenceStatus, Role, ServerMessage, UserId};
use std::time::Duration;
use tokio::time::interval;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Session happenings surfaced to the embedding UI layer, which is free
/// to render them however it likes.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Connected {
        client_id: u64,
    },
    Authenticated {
        user_id: UserId,
        role: Option<Role>,
        opponent: Option<UserId>,
    },
    PresenceChanged {
        user_id: UserId,
        online: bool,
    },
    ChatReceived {
        sender_id: UserId,
        text: String,
    },
    DmReceived {
        sender_id: UserId,
        text: String,
    },
    InviteReceived {
        from: UserId,
    },
    TournamentUpdate(serde_json::Value),
    ServerError {
        message: String,
    },
}

/// Client session: connection bookkeeping, the local simulation and the
/// outbound message plumbing.
///
/// Message handling and ticking are plain synchronous methods so they can
/// be driven by tests without a socket; [`Client::run`] wires them to a
/// real WebSocket.
pub struct Client {
    url: String,
    token: String,
    client_id: Option<u64>,
    user_id: Option<UserId>,
    game: Option<PongGame>,
    reporter: PaddleReporter,
    events: Vec<SessionEvent>,
    /// Standalone mode: start the match as soon as the lobby fills.
    auto_start: Option<GameConfig>,
    /// Standalone mode: steer the paddle toward the ball.
    auto_play: bool,
}

impl Client {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            client_id: None,
            user_id: None,
            game: None,
            reporter: PaddleReporter::new(),
            events: Vec::new(),
            auto_start: None,
            auto_play: false,
        }
    }

    /// Starts the game automatically once an opponent is present (host
    /// only; standalone/demo mode).
    pub fn set_auto_start(&mut self, config: GameConfig) {
        self.auto_start = Some(config);
    }

    /// Tracks the ball with the local paddle (standalone/demo mode).
    pub fn set_auto_play(&mut self, enabled: bool) {
        self.auto_play = enabled;
    }

    pub fn client_id(&self) -> Option<u64> {
        self.client_id
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn game(&self) -> Option<&PongGame> {
        self.game.as_ref()
    }

    pub fn game_mut(&mut self) -> Option<&mut PongGame> {
        self.game.as_mut()
    }

    /// Events accumulated since the last drain.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Host convenience: queue a `startGame` with the given settings.
    pub fn start_game(&mut self, config: GameConfig) -> bool {
        match &mut self.game {
            Some(game) => game.start_game(config, now_ms(), &mut rand::thread_rng()),
            None => false,
        }
    }

    /// Applies one decoded server message to the session state.
    pub fn handle_server_message(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::Connection { client_id } => {
                info!("Connected with client id {}", client_id);
                self.client_id = Some(client_id);
                self.events.push(SessionEvent::Connected { client_id });
            }
            ServerMessage::AuthSuccess {
                user_id,
                role,
                opponent_id,
            } => {
                info!(
                    "Authenticated as user {} with role {:?} (opponent: {:?})",
                    user_id, role, opponent_id
                );
                self.user_id = Some(user_id);
                if let Some(role) = role {
                    self.game = Some(PongGame::new(role, opponent_id));
                    self.reporter.reset();
                }
                self.events.push(SessionEvent::Authenticated {
                    user_id,
                    role,
                    opponent: opponent_id,
                });
            }
            ServerMessage::Error { message } => {
                warn!("Server error: {}", message);
                self.events.push(SessionEvent::ServerError { message });
            }
            ServerMessage::Chat {
                sender_id, text, ..
            } => {
                self.events.push(SessionEvent::ChatReceived { sender_id, text });
            }
            ServerMessage::UserStatus { user_id, status } => {
                self.events.push(SessionEvent::PresenceChanged {
                    user_id,
                    online: status == PresenceStatus::Online,
                });
            }
            ServerMessage::Dm {
                sender_id, text, ..
            } => {
                self.events.push(SessionEvent::DmReceived { sender_id, text });
            }
            ServerMessage::PongInvite { from } => {
                self.events.push(SessionEvent::InviteReceived { from });
            }
            ServerMessage::Game { data } => {
                if let Some(game) = &mut self.game {
                    game.apply_action(data, now_ms());
                }
            }
            ServerMessage::Tournament { data } => {
                self.events.push(SessionEvent::TournamentUpdate(data));
            }
        }
    }

    /// Advances the simulation one frame and returns the messages to put
    /// on the wire: the simulation's own relay events plus a `movePaddle`
    /// when the controlled paddle actually moved.
    pub fn tick(&mut self, now_ms: u64, dt: f32) -> Vec<ClientMessage> {
        let mut outbound = Vec::new();

        if let Some(game) = &mut self.game {
            if self.auto_start.is_some()
                && game.role == Role::Host
                && game.phase() == crate::game::GamePhase::Lobby
                && game.opponent.is_some()
            {
                let config = self.auto_start.take().unwrap_or_default();
                game.start_game(config, now_ms, &mut rand::thread_rng());
            }

            if self.auto_play {
                let center = game.local_paddle().y + shared::game::PADDLE_HEIGHT / 2.0;
                let gap = game.ball.y - center;
                let velocity = if gap.abs() < 6.0 {
                    0.0
                } else {
                    gap.signum() * game.config.paddle_speed
                };
                game.set_paddle_velocity(velocity);
            }

            game.tick(now_ms, dt, &mut rand::thread_rng());

            if let Some(action) = self.reporter.report(game.local_paddle().y) {
                outbound.push(ClientMessage::Game(action));
            }
            for action in game.drain_outbox() {
                outbound.push(ClientMessage::Game(action));
            }
        }

        outbound
    }

    /// Connects, authenticates and pumps the session until the server
    /// goes away.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Connecting to {}", self.url);
        let (ws, _) = connect_async(self.url.as_str()).await?;
        let (mut sink, mut source) = ws.split();

        let auth = ClientMessage::Auth {
            token: self.token.clone(),
        };
        sink.send(Message::Text(serde_json::to_string(&auth)?.into()))
            .await?;

        let mut tick_interval = interval(Duration::from_millis(16));

        loop {
            tokio::select! {
                frame = source.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ServerMessage>(&text) {
                            Ok(message) => self.handle_server_message(message),
                            Err(e) => warn!("Unintelligible server frame: {}", e),
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        sink.send(Message::Pong(payload)).await?;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Server closed the connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("Transport error: {}", e);
                        break;
                    }
                },

                _ = tick_interval.tick() => {
                    for message in self.tick(now_ms(), 1.0 / 60.0) {
                        let text = serde_json::to_string(&message)?;
                        sink.send(Message::Text(text.into())).await?;
                    }
                    for event in self.drain_events() {
                        info!("Session event: {:?}", event);
                    }
                }
            }
        }

        Ok(())
    }
}
