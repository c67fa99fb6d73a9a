//! Server builder and accept loop.

use parlor_lobby::{LobbyConfig, PartyManager, PartyManagerHandle};
use parlor_transport::WsListener;

use crate::endpoint;
use crate::ServerError;

/// The single path that upgrades to the lobby's message channel.
const WS_PATH: &str = "/ws";

/// Builder for configuring and starting a Parlor server.
pub struct ServerBuilder {
    bind_addr: String,
    lobby_config: LobbyConfig,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            lobby_config: LobbyConfig::default(),
        }
    }

    /// Sets the address to bind the listener to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Overrides the lobby configuration (timeouts, party sizes).
    pub fn lobby_config(mut self, config: LobbyConfig) -> Self {
        self.lobby_config = config;
        self
    }

    /// Binds the listener and spawns the coordinator.
    pub async fn build(self) -> Result<Server, ServerError> {
        let listener = WsListener::bind(&self.bind_addr, WS_PATH).await?;
        let manager = PartyManager::spawn(self.lobby_config);
        Ok(Server { listener, manager })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Parlor server.
pub struct Server {
    listener: WsListener,
    manager: PartyManagerHandle,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// The address the listener is bound to (useful with port 0 in tests).
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// A handle to the coordinator, for introspection and tooling.
    pub fn manager(&self) -> PartyManagerHandle {
        self.manager.clone()
    }

    /// Runs the accept loop until the process exits.
    ///
    /// Each accepted connection gets its own endpoint task; a failed
    /// handshake only costs that connection.
    pub async fn run(mut self) -> Result<(), ServerError> {
        tracing::info!("parlor server running");

        loop {
            match self.listener.accept().await {
                Ok(conn) => {
                    let manager = self.manager.clone();
                    tokio::spawn(endpoint::serve(conn, manager));
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
