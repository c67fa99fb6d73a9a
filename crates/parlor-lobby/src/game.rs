//! The game actor: an isolated task owning one active session.
//!
//! A game never touches coordinator state. It receives commands through
//! its channel, broadcasts to its clients' send queues, and reports
//! lifecycle transitions on the shared event channel the coordinator
//! drains.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parlor_protocol::{ClientId, GameId, ServerMessage};
use tokio::sync::mpsc;

use crate::client::Client;

/// Command channel size for game actors.
const GAME_CHANNEL_SIZE: usize = 64;

/// Seconds counted down on every client before play begins.
const START_COUNTDOWN_SECS: u32 = 3;

/// Commands sent to a game actor through its channel.
enum GameCommand {
    Start,
    End,
    PlayerAction { client_id: ClientId, action: String },
    ClientDisconnect { client_id: ClientId },
}

/// Lifecycle event kinds a game reports upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GameEventKind {
    Started,
    Ended,
}

/// A lifecycle event from a game to the coordinator.
#[derive(Debug, Clone)]
pub(crate) struct GameEvent {
    pub(crate) game_id: GameId,
    pub(crate) kind: GameEventKind,
}

/// Handle to a running game actor. Cheap to clone; held by the owning
/// party, the coordinator's game index, and each participating client.
#[derive(Clone)]
pub struct GameHandle {
    id: GameId,
    commands: mpsc::Sender<GameCommand>,
}

impl GameHandle {
    pub fn id(&self) -> &GameId {
        &self.id
    }

    /// Tells the game to announce its start.
    pub(crate) fn start(&self) {
        self.send(GameCommand::Start);
    }

    /// Ends the game explicitly. No inbound frame maps here today; the
    /// hook exists for a rules engine or operator surface.
    pub fn end(&self) {
        self.send(GameCommand::End);
    }

    /// Routes a player action into the game.
    pub fn player_action(&self, client_id: ClientId, action: String) {
        self.send(GameCommand::PlayerAction { client_id, action });
    }

    /// Tells the game a client has been permanently removed.
    pub(crate) fn client_disconnect(&self, client_id: ClientId) {
        self.send(GameCommand::ClientDisconnect { client_id });
    }

    /// Non-blocking enqueue. A full or closed channel drops the command;
    /// the game must never be able to stall its callers.
    fn send(&self, cmd: GameCommand) {
        match self.commands.try_send(cmd) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(game_id = %self.id, "game command buffer full, dropping");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(game_id = %self.id, "game already ended, ignoring command");
            }
        }
    }
}

/// The game actor state. Runs inside its own task.
pub(crate) struct Game {
    id: GameId,
    clients: HashMap<ClientId, Arc<Client>>,
    events: mpsc::Sender<GameEvent>,
    min_party_size: usize,
    commands: mpsc::Receiver<GameCommand>,
}

impl Game {
    /// Spawns a game actor over the given clients and returns its handle.
    pub(crate) fn spawn(
        clients: HashMap<ClientId, Arc<Client>>,
        events: mpsc::Sender<GameEvent>,
        min_party_size: usize,
    ) -> GameHandle {
        let id = GameId::generate();
        let (tx, rx) = mpsc::channel(GAME_CHANNEL_SIZE);

        let game = Game {
            id: id.clone(),
            clients,
            events,
            min_party_size,
            commands: rx,
        };
        tokio::spawn(game.run());

        GameHandle { id, commands: tx }
    }

    /// Processes commands until the game ends.
    async fn run(mut self) {
        tracing::info!(game_id = %self.id, players = self.clients.len(), "game actor started");

        while let Some(cmd) = self.commands.recv().await {
            match cmd {
                GameCommand::Start => {
                    self.broadcast(ServerMessage::GameStarted {
                        countdown_seconds: START_COUNTDOWN_SECS,
                        timestamp: unix_millis(),
                    });
                    self.emit(GameEventKind::Started).await;
                }

                GameCommand::End => {
                    self.finish("manualEnd").await;
                    break;
                }

                GameCommand::PlayerAction { client_id, action } => {
                    // Rules engine is external; actions are logged and
                    // acknowledged by routing only.
                    tracing::info!(
                        game_id = %self.id,
                        %client_id,
                        action,
                        "player action"
                    );
                }

                GameCommand::ClientDisconnect { client_id } => {
                    self.clients.remove(&client_id);
                    if self.clients.len() < self.min_party_size {
                        self.finish("notEnoughPlayers").await;
                        break;
                    }
                }
            }
        }

        tracing::info!(game_id = %self.id, "game actor stopped");
    }

    /// Broadcasts `gameOver` and reports the end upstream.
    async fn finish(&self, reason: &str) {
        self.broadcast(ServerMessage::GameOver {
            winner_id: String::new(),
            reason: reason.to_string(),
        });
        self.emit(GameEventKind::Ended).await;
    }

    async fn emit(&self, kind: GameEventKind) {
        let event = GameEvent {
            game_id: self.id.clone(),
            kind,
        };
        if self.events.send(event).await.is_err() {
            tracing::debug!(game_id = %self.id, "coordinator gone, dropping game event");
        }
    }

    fn broadcast(&self, msg: ServerMessage) {
        for client in self.clients.values() {
            client.send_message(msg.clone());
        }
    }
}

/// Wall-clock Unix time in milliseconds, for `gameStarted` timestamps.
fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

// =========================================================================
// Tests
// =========================================================================
