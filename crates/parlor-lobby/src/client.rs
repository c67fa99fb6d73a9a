//! The per-session client record and the connection seat.

use std::sync::{Arc, Mutex, RwLock};

use parlor_protocol::{
    ClientId, ErrorCode, SecretKey, ServerMessage,
};
use tokio::sync::mpsc;

use crate::game::GameHandle;

/// Capacity of a client's outbound queue. The coordinator produces small
/// bursts; a slow client loses stale frames rather than stalling anyone.
pub const SEND_QUEUE_SIZE: usize = 6;

/// Mutable link between a client identity and its live connection.
///
/// Rewritten by the coordinator during a reconnect graft; read by the
/// client's own pumps and by games broadcasting to it.
struct Link {
    outbox: mpsc::Sender<ServerMessage>,
    game: Option<GameHandle>,
}

/// One client session.
///
/// `id` and `secret` are immutable after construction. The link (outbound
/// queue + current game) is guarded by a per-client mutex because the
/// coordinator may replace it while the client's pumps and a game task are
/// reading it.
pub struct Client {
    pub id: ClientId,
    pub secret: SecretKey,
    link: Mutex<Link>,
}

impl Client {
    /// Creates a session around an outbound queue created with
    /// [`SEND_QUEUE_SIZE`].
    pub fn new(
        id: ClientId,
        secret: SecretKey,
        outbox: mpsc::Sender<ServerMessage>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            secret,
            link: Mutex::new(Link { outbox, game: None }),
        })
    }

    /// Enqueues a message without blocking.
    ///
    /// If the queue is full or the write pump is gone the message is
    /// dropped — realtime lobby updates are superseded by fresher ones,
    /// and a wedged client must never stall the coordinator.
    pub fn send_message(&self, msg: ServerMessage) {
        let link = self.link.lock().expect("client link poisoned");
        match link.outbox.try_send(msg) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(client_id = %self.id, "send queue full, dropping message");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(client_id = %self.id, "send queue closed, dropping message");
            }
        }
    }

    /// Enqueues an `error` frame.
    pub fn send_error(
        &self,
        code: ErrorCode,
        message: &str,
        request_type: Option<&str>,
    ) {
        self.send_message(ServerMessage::Error {
            code,
            message: message.to_string(),
            request_type: request_type.map(str::to_string),
        });
    }

    /// The game this client is currently in, if any.
    pub fn game(&self) -> Option<GameHandle> {
        self.link.lock().expect("client link poisoned").game.clone()
    }

    pub(crate) fn set_game(&self, game: Option<GameHandle>) {
        self.link.lock().expect("client link poisoned").game = game;
    }

    /// Grafts another session's outbound queue onto this client, so frames
    /// addressed to this identity reach the other session's connection.
    /// Used only by the coordinator during reconnect.
    pub(crate) fn adopt_outbox(&self, donor: &Client) {
        let outbox = donor
            .link
            .lock()
            .expect("client link poisoned")
            .outbox
            .clone();
        self.link.lock().expect("client link poisoned").outbox = outbox;
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Secret deliberately omitted.
        f.debug_struct("Client").field("id", &self.id).finish()
    }
}

/// The swappable client reference a connection's pumps read.
///
/// A connection starts out speaking for a fresh ephemeral client. When the
/// coordinator accepts a reconnect it repoints the seat at the reclaimed
/// [`Client`], and every later frame from the connection acts as that
/// identity. Only the coordinator writes; only the owning read pump reads.
#[derive(Clone)]
pub struct ClientSeat(Arc<RwLock<Arc<Client>>>);

impl ClientSeat {
    pub fn new(client: Arc<Client>) -> Self {
        Self(Arc::new(RwLock::new(client)))
    }

    /// The client this connection currently speaks for.
    pub fn current(&self) -> Arc<Client> {
        self.0.read().expect("seat poisoned").clone()
    }

    pub(crate) fn replace(&self, client: Arc<Client>) {
        *self.0.write().expect("seat poisoned") = client;
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn make_client(
        capacity: usize,
    ) -> (Arc<Client>, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        let client =
            Client::new(ClientId::generate(), SecretKey::generate(), tx);
        (client, rx)
    }

    #[tokio::test]
    async fn test_send_message_enqueues() {
        let (client, mut rx) = make_client(SEND_QUEUE_SIZE);
        client.send_message(ServerMessage::QueueJoined {});
        assert_eq!(rx.recv().await, Some(ServerMessage::QueueJoined {}));
    }

    #[tokio::test]
    async fn test_send_message_drops_when_full() {
        let (client, mut rx) = make_client(1);
        client.send_message(ServerMessage::QueueJoined {});
        client.send_message(ServerMessage::MemberUpdate { members: vec![] });

        assert_eq!(rx.recv().await, Some(ServerMessage::QueueJoined {}));
        assert!(rx.try_recv().is_err(), "second message should be dropped");
    }

    #[tokio::test]
    async fn test_send_error_shape() {
        let (client, mut rx) = make_client(SEND_QUEUE_SIZE);
        client.send_error(ErrorCode::NotInGame, "Not in a game.", Some("playerAction"));

        match rx.recv().await {
            Some(ServerMessage::Error {
                code,
                request_type,
                ..
            }) => {
                assert_eq!(code, ErrorCode::NotInGame);
                assert_eq!(request_type.as_deref(), Some("playerAction"));
            }
            other => panic!("expected error frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_adopt_outbox_redirects_sends() {
        let (old, mut old_rx) = make_client(SEND_QUEUE_SIZE);
        let (fresh, mut fresh_rx) = make_client(SEND_QUEUE_SIZE);

        old.adopt_outbox(&fresh);
        old.send_message(ServerMessage::QueueJoined {});

        assert_eq!(fresh_rx.recv().await, Some(ServerMessage::QueueJoined {}));
        assert!(old_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_seat_replace_swaps_identity() {
        let (a, _rx_a) = make_client(SEND_QUEUE_SIZE);
        let (b, _rx_b) = make_client(SEND_QUEUE_SIZE);

        let seat = ClientSeat::new(a.clone());
        assert_eq!(seat.current().id, a.id);

        seat.replace(b.clone());
        assert_eq!(seat.current().id, b.id);
    }
}
