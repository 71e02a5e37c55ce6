//! Focus session client.
//!
//! Connects to a focusbell server, sends each typed line as a command and
//! renders session events as they arrive.
//! Automatically reconnects on disconnection (max 5 attempts with 5 second interval).
//! Duplicate user connections and bad tokens are rejected by the server.
//!
//! Run with:
//! ```not_rust
//! FOCUSBELL_TOKEN=secret cargo run --bin focusbell-client -- -u alice --scope-id guild-1 --channel-id general
//! ```

use clap::Parser;

use focusbell_client::{ConnectOptions, run_client};
use focusbell_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "focusbell-client")]
#[command(about = "Focus session client with live timer events", long_about = None)]
struct Args {
    /// User ID (must be unique per server)
    #[arg(short = 'u', long)]
    user_id: String,

    /// Scope (guild) the sessions belong to
    #[arg(long, default_value = "default")]
    scope_id: String,

    /// Voice channel to join for notifications
    #[arg(long, default_value = "general")]
    channel_id: String,

    /// Shared secret configured on the server
    #[arg(long, env = "FOCUSBELL_TOKEN", hide_env_values = true)]
    token: String,

    /// WebSocket server URL
    #[arg(long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger("focusbell_client", env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    let options = ConnectOptions {
        url: args.url,
        user_id: args.user_id,
        scope_id: args.scope_id,
        channel_id: args.channel_id,
        token: args.token,
    };

    // Run the client
    if let Err(e) = run_client(options).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
