//! The per-connection client endpoint: read pump, write pump, dispatch.
//!
//! Each accepted connection runs one endpoint. The read pump is the sole
//! reader of the socket and translates frames into coordinator commands;
//! the write pump is the sole writer, draining the client's bounded send
//! queue and keeping the connection alive with pings. Neither pump ever
//! blocks the coordinator: enqueueing outbound frames drops on full, and
//! commands travel over a non-blocking channel.

use std::time::Duration;

use parlor_lobby::{Client, ClientSeat, PartyManagerHandle, SEND_QUEUE_SIZE};
use parlor_protocol::{
    decode_client, encode_server, ClientId, ClientMessage, ErrorCode,
    SecretKey, ServerMessage,
};
use parlor_transport::{FrameSink, FrameSource, WsConnection};
use tokio::sync::mpsc;

/// Time allowed for a single write to complete.
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Keep-alive ping period. Must be shorter than the read-side idle limit
/// on the peer, so healthy-but-quiet connections stay up.
const PING_PERIOD: Duration = Duration::from_secs(54);

/// Runs one connection from accept to close.
///
/// Issues a fresh identity + secret, starts the pumps, greets the client
/// with `connectSuccess`, and reports `DisconnectClient` when the read
/// pump exits for any reason.
pub(crate) async fn serve(conn: WsConnection, manager: PartyManagerHandle) {
    let conn_id = conn.id();
    let (outbox_tx, outbox_rx) = mpsc::channel(SEND_QUEUE_SIZE);

    let client =
        Client::new(ClientId::generate(), SecretKey::generate(), outbox_tx);
    let seat = ClientSeat::new(client.clone());
    tracing::debug!(%conn_id, client_id = %client.id, "session created");

    let (sink, source) = conn.split();
    let writer = tokio::spawn(write_pump(sink, outbox_rx));

    client.send_message(ServerMessage::ConnectSuccess {
        client_id: client.id.clone(),
        secret_key: client.secret.clone(),
    });

    read_pump(source, &seat, &manager).await;

    // Whatever identity the connection ended up speaking for is the one
    // that lost its transport.
    manager.disconnect_client(seat.current());
    writer.abort();
    tracing::debug!(%conn_id, "connection closed");
}

/// Sole reader. Decodes frames and dispatches until the transport dies
/// or goes idle.
async fn read_pump(
    mut source: FrameSource,
    seat: &ClientSeat,
    manager: &PartyManagerHandle,
) {
    loop {
        let frame = match source.recv().await {
            Ok(Some(text)) => text,
            Ok(None) => break, // clean close
            Err(e) => {
                tracing::debug!(error = %e, "connection closed");
                break;
            }
        };

        let msg = match decode_client(&frame) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(error = %e, "rejecting malformed frame");
                seat.current().send_error(
                    ErrorCode::InvalidRequest,
                    "Malformed client payload.",
                    e.request_tag(),
                );
                continue;
            }
        };

        dispatch(msg, seat, manager);
    }
}

/// Translates one decoded frame into a command.
fn dispatch(
    msg: ClientMessage,
    seat: &ClientSeat,
    manager: &PartyManagerHandle,
) {
    let client = seat.current();
    match msg {
        ClientMessage::Join {
            party_id,
            client_id,
            secret,
        } => manager.add_client(seat.clone(), party_id, client_id, secret),

        ClientMessage::Leave => manager.remove_client(client),

        ClientMessage::StartGame => manager.start_game(client),

        ClientMessage::PlayerAction { action } => match client.game() {
            Some(game) => game.player_action(client.id.clone(), action),
            None => client.send_error(
                ErrorCode::NotInGame,
                "Not in a game.",
                Some("playerAction"),
            ),
        },
    }
}

/// Sole writer. Drains the send queue and emits keep-alive pings; exits
/// on any write failure or when every sender is gone.
async fn write_pump(
    mut sink: FrameSink,
    mut outbox: mpsc::Receiver<ServerMessage>,
) {
    let mut ping = tokio::time::interval_at(
        tokio::time::Instant::now() + PING_PERIOD,
        PING_PERIOD,
    );

    loop {
        tokio::select! {
            msg = outbox.recv() => {
                let Some(msg) = msg else {
                    let _ = sink.close().await;
                    break;
                };
                let text = match encode_server(&msg) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to encode outbound frame");
                        continue;
                    }
                };
                let write =
                    tokio::time::timeout(WRITE_TIMEOUT, sink.send_text(text));
                match write.await {
                    Ok(Ok(())) => {}
                    _ => break,
                }
            }
            _ = ping.tick() => {
                let write = tokio::time::timeout(WRITE_TIMEOUT, sink.ping());
                match write.await {
                    Ok(Ok(())) => {}
                    _ => break,
                }
            }
        }
    }
}
