//! The coordinator: single-writer owner of all lobby state.
//!
//! `PartyManager` runs as one task multiplexing four inputs — the command
//! channel fed by client endpoints, the internal public queue, the game
//! event channel, and the cleanup tick. Every mutation of the party /
//! member / game / abandonment indices happens inside this loop, so none
//! of them needs a lock.
//!
//! Outbound traffic is enqueued on client send queues and never blocks:
//! within one command, state is mutated first and messages are enqueued
//! after, so receivers only ever observe committed state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parlor_protocol::{
    ClientId, ErrorCode, GameId, PartyId, PartyLeftReason, SecretKey,
    ServerMessage,
};
use tokio::sync::{mpsc, oneshot};

use crate::client::{Client, ClientSeat};
use crate::config::LobbyConfig;
use crate::error::LobbyError;
use crate::game::{Game, GameEvent, GameEventKind};
use crate::party::Party;

/// Buffer size for the coordinator's channels (commands, public queue,
/// game events).
const CHANNEL_SIZE: usize = 64;

/// Commands processed by the coordinator loop.
enum Command {
    /// A `join` frame: public queue, specific party, or reconnect attempt.
    AddClient {
        seat: ClientSeat,
        party_id: Option<PartyId>,
        reconnect_client_id: Option<ClientId>,
        secret: Option<SecretKey>,
    },
    /// A `leave` frame.
    RemoveClient { client: Arc<Client> },
    /// A `startGame` frame.
    StartGame { client: Arc<Client> },
    /// Transport loss reported by a read pump.
    DisconnectClient { client: Arc<Client> },
    /// Read-only introspection for tests and tooling.
    Snapshot {
        reply: oneshot::Sender<LobbySnapshot>,
    },
}

/// A disconnected client whose seat is held pending reconnection.
struct AbandonedClient {
    client: Arc<Client>,
    abandoned_at: Instant,
}

/// Cloneable front door to the coordinator task.
///
/// Lifecycle commands are fire-and-forget and never block: if the command
/// buffer is full the command is dropped with a warning, which keeps a
/// burst of connections from stalling any read pump.
#[derive(Clone)]
pub struct PartyManagerHandle {
    commands: mpsc::Sender<Command>,
}

impl PartyManagerHandle {
    /// Routes a `join` request. `seat` is the connection's swappable
    /// client reference, needed for the reconnect graft.
    pub fn add_client(
        &self,
        seat: ClientSeat,
        party_id: Option<PartyId>,
        reconnect_client_id: Option<ClientId>,
        secret: Option<SecretKey>,
    ) {
        self.send(Command::AddClient {
            seat,
            party_id,
            reconnect_client_id,
            secret,
        });
    }

    /// Routes a `leave` request.
    pub fn remove_client(&self, client: Arc<Client>) {
        self.send(Command::RemoveClient { client });
    }

    /// Routes a `startGame` request.
    pub fn start_game(&self, client: Arc<Client>) {
        self.send(Command::StartGame { client });
    }

    /// Reports a lost transport; starts the abandonment grace window.
    pub fn disconnect_client(&self, client: Arc<Client>) {
        self.send(Command::DisconnectClient { client });
    }

    /// Returns a read-only copy of the coordinator's indices.
    pub async fn snapshot(&self) -> Result<LobbySnapshot, LobbyError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Snapshot { reply: tx })
            .await
            .map_err(|_| LobbyError::Unavailable)?;
        rx.await.map_err(|_| LobbyError::Unavailable)
    }

    fn send(&self, cmd: Command) {
        match self.commands.try_send(cmd) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("coordinator command buffer full, dropping command");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("coordinator gone, dropping command");
            }
        }
    }
}

/// The coordinator task state.
///
/// Owns every party, the member and game indices, the abandonment table,
/// and the public-party pointer. Nothing outside the task touches these.
///
/// Reconnection is authorized by the session secret; note that a reconnect
/// attempt with a *wrong* secret also discards the abandoned entry, making
/// the original session unrecoverable. That closes any brute-force window
/// at the cost of letting a buggy client burn its own seat.
pub struct PartyManager {
    config: LobbyConfig,

    parties: HashMap<PartyId, Party>,
    /// Reverse index: which party each client is seated in.
    members: HashMap<ClientId, PartyId>,
    /// Which party owns each running game. The live
    /// [`GameHandle`](crate::GameHandle) is held by that party and by each
    /// participating client.
    games: HashMap<GameId, PartyId>,
    abandoned: HashMap<ClientId, AbandonedClient>,
    /// The open public party currently accepting queued clients.
    /// Cleared eagerly whenever the pointed-to party stops being joinable.
    public_party: Option<PartyId>,

    commands: mpsc::Receiver<Command>,
    queue_tx: mpsc::Sender<Arc<Client>>,
    queue_rx: mpsc::Receiver<Arc<Client>>,
    events_tx: mpsc::Sender<GameEvent>,
    events_rx: mpsc::Receiver<GameEvent>,
}

impl PartyManager {
    /// Spawns the coordinator task and returns a handle to it.
    pub fn spawn(config: LobbyConfig) -> PartyManagerHandle {
        let (commands_tx, commands_rx) = mpsc::channel(CHANNEL_SIZE);
        let (queue_tx, queue_rx) = mpsc::channel(CHANNEL_SIZE);
        let (events_tx, events_rx) = mpsc::channel(CHANNEL_SIZE);

        let manager = PartyManager {
            config,
            parties: HashMap::new(),
            members: HashMap::new(),
            games: HashMap::new(),
            abandoned: HashMap::new(),
            public_party: None,
            commands: commands_rx,
            queue_tx,
            queue_rx,
            events_tx,
            events_rx,
        };
        tokio::spawn(manager.run());

        PartyManagerHandle {
            commands: commands_tx,
        }
    }

    /// The single-writer loop.
    async fn run(mut self) {
        tracing::info!("party manager started");

        let mut cleanup = tokio::time::interval_at(
            tokio::time::Instant::now() + self.config.cleanup_interval,
            self.config.cleanup_interval,
        );

        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    // All handles dropped; nothing can reach us anymore.
                    None => break,
                },
                Some(client) = self.queue_rx.recv() => {
                    self.handle_queue_join(client);
                }
                Some(event) = self.events_rx.recv() => {
                    self.handle_game_event(event);
                }
                _ = cleanup.tick() => self.sweep_abandoned(),
            }
        }

        tracing::info!("party manager stopped");
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::AddClient {
                seat,
                party_id,
                reconnect_client_id,
                secret,
            } => self.handle_add_client(seat, party_id, reconnect_client_id, secret),
            Command::RemoveClient { client } => {
                self.handle_remove_client(&client);
            }
            Command::StartGame { client } => self.handle_start_game(&client),
            Command::DisconnectClient { client } => {
                self.handle_disconnect(client);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    // -- AddClient ---------------------------------------------------------

    fn handle_add_client(
        &mut self,
        seat: ClientSeat,
        party_id: Option<PartyId>,
        reconnect_client_id: Option<ClientId>,
        secret: Option<SecretKey>,
    ) {
        // Reconnect path: the id names an abandoned session.
        if let Some(reconnect_id) = &reconnect_client_id {
            if self.abandoned.contains_key(reconnect_id) {
                self.handle_reconnect(&seat, reconnect_id.clone(), secret);
                return;
            }
            // Unknown or already-swept id: proceed as a normal join under
            // the fresh identity.
        }

        let client = seat.current();

        // Guard against double placement. The error is reported but the
        // join still proceeds; clients treat the error as advisory.
        if self.members.contains_key(&client.id) {
            client.send_error(
                ErrorCode::AlreadyInParty,
                "Already in a party.",
                Some("join"),
            );
        }

        match party_id {
            // No target party: enter the public queue.
            None => match self.queue_tx.try_send(client.clone()) {
                Ok(()) => client.send_message(ServerMessage::QueueJoined {}),
                Err(_) => client.send_error(
                    ErrorCode::QueueFull,
                    "Queue is full.",
                    Some("join"),
                ),
            },
            Some(party_id) => self.join_party(client, party_id),
        }
    }

    fn handle_reconnect(
        &mut self,
        seat: &ClientSeat,
        reconnect_id: ClientId,
        secret: Option<SecretKey>,
    ) {
        let entry = self
            .abandoned
            .remove(&reconnect_id)
            .expect("caller checked presence");
        let fresh = seat.current();

        let in_window =
            entry.abandoned_at.elapsed() < self.config.abandonment_timeout;
        let secret_ok = secret.as_ref() == Some(&entry.client.secret);
        if !in_window || !secret_ok {
            // The entry stays removed either way: a bad guess burns the
            // session rather than leaving a brute-force window open.
            fresh.send_error(
                ErrorCode::SessionExpired,
                "Reconnection window expired.",
                Some("join"),
            );
            return;
        }

        // Graft: the connection now speaks for the reclaimed identity,
        // and frames addressed to it reach the new transport.
        let reclaimed = entry.client;
        reclaimed.adopt_outbox(&fresh);
        seat.replace(reclaimed.clone());
        tracing::info!(client_id = %reclaimed.id, "client reconnected");

        let Some(party_id) = self.members.get(&reclaimed.id).cloned() else {
            reclaimed.send_error(
                ErrorCode::SessionExpired,
                "Session no longer active.",
                Some("join"),
            );
            return;
        };
        let Some(party) = self.parties.get_mut(&party_id) else {
            self.members.remove(&reclaimed.id);
            reclaimed.send_error(
                ErrorCode::PartyNotFound,
                "Party not found.",
                Some("join"),
            );
            return;
        };

        party.mark_connected(&reclaimed.id);
        reclaimed.set_game(party.game.clone());
        reclaimed.send_message(ServerMessage::PartyJoined {
            party_id: party_id.clone(),
        });
        party.broadcast_member_update();
    }

    fn join_party(&mut self, client: Arc<Client>, party_id: PartyId) {
        let Some(party) = self.parties.get_mut(&party_id) else {
            client.send_error(
                ErrorCode::PartyNotFound,
                "Party not found.",
                Some("join"),
            );
            return;
        };
        if party.game.is_some() {
            client.send_error(
                ErrorCode::GameInProgress,
                "Party's game is already in progress.",
                Some("join"),
            );
            return;
        }
        if party.is_full() {
            client.send_error(
                ErrorCode::PartyFull,
                "Party is full.",
                Some("join"),
            );
            return;
        }

        party.add(client.clone());
        self.members.insert(client.id.clone(), party_id.clone());
        client.send_message(ServerMessage::PartyJoined {
            party_id: party_id.clone(),
        });
        party.broadcast_member_update();
        tracing::info!(client_id = %client.id, %party_id, "client joined party");

        if party.is_full() && self.public_party.as_ref() == Some(&party_id) {
            self.public_party = None;
        }
    }

    // -- Public queue ------------------------------------------------------

    /// Seats a queued client in the open public party, rolling over to a
    /// fresh party when the current one is gone, full, or in a game.
    fn handle_queue_join(&mut self, client: Arc<Client>) {
        let reusable = self
            .public_party
            .as_ref()
            .and_then(|id| self.parties.get(id))
            .map(|p| !p.is_full() && p.game.is_none())
            .unwrap_or(false);

        if !reusable {
            let party_id = PartyId::generate();
            self.parties.insert(
                party_id.clone(),
                Party::new(party_id.clone(), self.config.max_party_size),
            );
            self.public_party = Some(party_id.clone());
            tracing::info!(%party_id, "public party created");
        }

        let party_id = self
            .public_party
            .clone()
            .expect("public party ensured above");
        let party = self
            .parties
            .get_mut(&party_id)
            .expect("public party is registered");

        party.add(client.clone());
        self.members.insert(client.id.clone(), party_id.clone());
        client.send_message(ServerMessage::PartyJoined {
            party_id: party_id.clone(),
        });
        party.broadcast_member_update();
        tracing::info!(client_id = %client.id, %party_id, "client joined from queue");

        if party.is_full() {
            self.public_party = None;
        }
    }

    // -- RemoveClient ------------------------------------------------------

    fn handle_remove_client(&mut self, client: &Client) {
        let Some(party_id) = self.members.remove(&client.id) else {
            client.send_error(
                ErrorCode::NotInSession,
                "Not in any party.",
                Some("leave"),
            );
            return;
        };
        let Some(party) = self.parties.get_mut(&party_id) else {
            client.send_error(
                ErrorCode::PartyNotFound,
                "Party not found.",
                Some("leave"),
            );
            return;
        };

        party.remove(&client.id);
        client.send_message(ServerMessage::PartyLeft {
            reason: PartyLeftReason::SelfInitiated,
        });
        tracing::info!(client_id = %client.id, %party_id, "client left party");

        if party.is_empty() {
            self.parties.remove(&party_id);
            if self.public_party.as_ref() == Some(&party_id) {
                self.public_party = None;
            }
            tracing::info!(%party_id, "party disbanded");
            return;
        }

        party.broadcast_member_update();
    }

    // -- StartGame ---------------------------------------------------------

    fn handle_start_game(&mut self, client: &Arc<Client>) {
        let Some(party_id) = self.members.get(&client.id).cloned() else {
            client.send_error(
                ErrorCode::NotInSession,
                "No session found.",
                Some("startGame"),
            );
            return;
        };
        let Some(party) = self.parties.get_mut(&party_id) else {
            self.members.remove(&client.id);
            client.send_error(
                ErrorCode::PartyNotFound,
                "Party not found.",
                Some("startGame"),
            );
            return;
        };

        if party.host_id.as_ref() != Some(&client.id) {
            client.send_error(
                ErrorCode::NotPartyHost,
                "Only the host can start the game.",
                Some("startGame"),
            );
            return;
        }
        if party.game.is_some() {
            client.send_error(
                ErrorCode::GameInProgress,
                "Game already in progress.",
                Some("startGame"),
            );
            return;
        }
        if party.members.len() < self.config.min_party_size {
            client.send_error(
                ErrorCode::NotEnoughMembers,
                "Not enough members to start a game.",
                Some("startGame"),
            );
            return;
        }

        let players: HashMap<ClientId, Arc<Client>> = party
            .members
            .values()
            .map(|m| (m.client.id.clone(), m.client.clone()))
            .collect();
        let handle = Game::spawn(
            players,
            self.events_tx.clone(),
            self.config.min_party_size,
        );

        for member in party.members.values() {
            member.client.set_game(Some(handle.clone()));
        }
        party.game = Some(handle.clone());
        self.games.insert(handle.id().clone(), party_id.clone());
        if self.public_party.as_ref() == Some(&party_id) {
            self.public_party = None;
        }

        tracing::info!(game_id = %handle.id(), %party_id, "game starting");
        handle.start();
    }

    // -- DisconnectClient --------------------------------------------------

    /// Marks the member disconnected and holds the seat for the grace
    /// window. The member stays in the party and in the reverse index.
    fn handle_disconnect(&mut self, client: Arc<Client>) {
        if let Some(party_id) = self.members.get(&client.id) {
            if let Some(party) = self.parties.get_mut(party_id) {
                party.mark_disconnected(&client.id);
                party.broadcast_member_update();
            }
        }
        client.set_game(None);

        tracing::info!(
            client_id = %client.id,
            grace = ?self.config.abandonment_timeout,
            "client disconnected, holding seat"
        );
        self.abandoned.insert(
            client.id.clone(),
            AbandonedClient {
                client,
                abandoned_at: Instant::now(),
            },
        );
    }

    // -- Cleanup -----------------------------------------------------------

    /// Permanently removes abandoned clients whose grace window elapsed.
    /// Keys are snapshotted first; the table must not be mutated while
    /// iterating it.
    fn sweep_abandoned(&mut self) {
        let now = Instant::now();
        let expired: Vec<ClientId> = self
            .abandoned
            .iter()
            .filter(|(_, entry)| {
                now.duration_since(entry.abandoned_at)
                    > self.config.abandonment_timeout
            })
            .map(|(id, _)| id.clone())
            .collect();

        for client_id in expired {
            self.abandoned.remove(&client_id);

            // The victim's game reference was cleared at disconnect; the
            // party still knows about a running game.
            if let Some(party_id) = self.members.get(&client_id) {
                if let Some(game) = self
                    .parties
                    .get(party_id)
                    .and_then(|p| p.game.as_ref())
                {
                    game.client_disconnect(client_id.clone());
                }
            }

            self.excise_member(&client_id);
            tracing::info!(%client_id, "client permanently removed after abandonment");
        }
    }

    /// Removes a member without emitting frames to them (their transport
    /// is gone). Cascades to party disbandment.
    fn excise_member(&mut self, client_id: &ClientId) {
        let Some(party_id) = self.members.remove(client_id) else {
            return;
        };
        let Some(party) = self.parties.get_mut(&party_id) else {
            return;
        };

        party.remove(client_id);
        if party.is_empty() {
            self.parties.remove(&party_id);
            if self.public_party.as_ref() == Some(&party_id) {
                self.public_party = None;
            }
            tracing::info!(%party_id, "party disbanded");
            return;
        }
        party.broadcast_member_update();
    }

    // -- Game events -------------------------------------------------------

    fn handle_game_event(&mut self, event: GameEvent) {
        match event.kind {
            GameEventKind::Started => {
                tracing::info!(game_id = %event.game_id, "game started");
            }
            GameEventKind::Ended => {
                let Some(party_id) = self.games.remove(&event.game_id) else {
                    return;
                };
                if let Some(party) = self.parties.get_mut(&party_id) {
                    party.game = None;
                    for member in party.members.values() {
                        member.client.set_game(None);
                    }
                }
                tracing::info!(game_id = %event.game_id, "game ended");
            }
        }
    }

    // -- Introspection -----------------------------------------------------

    fn snapshot(&self) -> LobbySnapshot {
        LobbySnapshot {
            parties: self
                .parties
                .values()
                .map(|party| PartySnapshot {
                    id: party.id.clone(),
                    host_id: party.host_id.clone(),
                    members: party
                        .members
                        .values()
                        .map(|m| (m.client.id.clone(), m.is_connected))
                        .collect(),
                    in_game: party.game.is_some(),
                })
                .collect(),
            members: self.members.clone(),
            abandoned: self.abandoned.keys().cloned().collect(),
            public_party: self.public_party.clone(),
            games: self.games.keys().cloned().collect(),
        }
    }
}

/// Read-only copy of one party's state.
#[derive(Debug, Clone)]
pub struct PartySnapshot {
    pub id: PartyId,
    pub host_id: Option<ClientId>,
    /// `(client id, is_connected)` per seat.
    pub members: Vec<(ClientId, bool)>,
    pub in_game: bool,
}

/// Read-only copy of the coordinator's indices.
#[derive(Debug, Clone, Default)]
pub struct LobbySnapshot {
    pub parties: Vec<PartySnapshot>,
    pub members: HashMap<ClientId, PartyId>,
    pub abandoned: Vec<ClientId>,
    pub public_party: Option<PartyId>,
    pub games: Vec<GameId>,
}

impl LobbySnapshot {
    /// The party a client is seated in, if any.
    pub fn party_of(&self, client_id: &ClientId) -> Option<&PartySnapshot> {
        let party_id = self.members.get(client_id)?;
        self.parties.iter().find(|p| &p.id == party_id)
    }
}
