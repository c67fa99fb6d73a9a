//! Parlor server binary.
//!
//! ```not_rust
//! cargo run --bin parlor -- --addr 0.0.0.0:8080
//! ```

use clap::Parser;
use tracing_subscriber::EnvFilter;

use parlor::{ServerBuilder, ServerError};

#[derive(Parser, Debug)]
#[command(name = "parlor")]
#[command(about = "Realtime lobby server for a multiplayer card game", long_about = None)]
struct Args {
    /// Address to bind the WebSocket listener to.
    #[arg(long, default_value = "0.0.0.0:8080")]
    addr: String,
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let server = ServerBuilder::new().bind(&args.addr).build().await?;
    server.run().await
}
