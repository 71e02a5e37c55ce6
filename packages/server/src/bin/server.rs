//! Focus session server.
//!
//! Runs per-user work/break timers and plays notification sounds into the
//! voice channel joined for a scope. Clients send commands over WebSocket.
//!
//! Run with:
//! ```not_rust
//! FOCUSBELL_TOKEN=secret cargo run --bin focusbell-server
//! cargo run --bin focusbell-server -- --host 0.0.0.0 --port 3000 --token secret
//! ```

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use clap::Parser;
use focusbell_server::{
    domain::VoiceGateway,
    infrastructure::{
        message_pusher::WebSocketMessagePusher,
        repository::{InMemoryPresetRepository, InMemorySessionRepository, InMemoryStatsRepository},
        voice::{DirectorySoundSource, LoopbackVoiceGateway},
    },
    ui::Server,
    usecase::{
        ConnectionRegistry, Notifier, NotifierConfig, SessionOrchestrator, SessionReactor,
        SweepConfig, TimerEngine,
    },
};
use focusbell_shared::{logger::setup_logger, time::SystemClock};
use tokio::sync::Mutex;

#[derive(Parser, Debug)]
#[command(name = "focusbell-server")]
#[command(about = "Focus session server with audio notifications", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Shared secret clients must present when connecting
    #[arg(long, env = "FOCUSBELL_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Directory holding start.mp3, work_end.mp3, break_end.mp3 and complete.mp3
    #[arg(short = 's', long, default_value = "sounds")]
    sounds_dir: PathBuf,

    /// Disable voice notifications entirely
    #[arg(long)]
    no_voice: bool,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger("focusbell_server", env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    let Some(token) = args.token.filter(|token| !token.is_empty()) else {
        tracing::error!("FOCUSBELL_TOKEN is not set (pass --token or set the environment variable)");
        std::process::exit(1);
    };

    // Initialize dependencies in order:
    // 1. Repositories
    // 2. MessagePusher
    // 3. Notifier
    // 4. Timer engine and its event reactor
    // 5. Orchestrator
    // 6. Server

    // 1. Create Repositories (in-memory database)
    let session_repository = Arc::new(InMemorySessionRepository::new());
    let stats_repository = Arc::new(InMemoryStatsRepository::new());
    let preset_repository = Arc::new(InMemoryPresetRepository::new());

    // 2. Create MessagePusher (WebSocket implementation)
    let message_pusher_clients = Arc::new(Mutex::new(HashMap::new()));
    let message_pusher = Arc::new(WebSocketMessagePusher::new(message_pusher_clients));

    // 3. Create Notifier (voice gateway and sound files)
    let gateway: Option<Arc<dyn VoiceGateway>> = if args.no_voice {
        tracing::info!("Voice notifications disabled");
        None
    } else {
        Some(Arc::new(LoopbackVoiceGateway::default()))
    };
    if !args.sounds_dir.is_dir() {
        tracing::warn!(
            "Sound directory {} not found, notifications will be silent",
            args.sounds_dir.display()
        );
    }
    let notifier = Arc::new(Notifier::new(
        gateway,
        ConnectionRegistry::new(),
        Arc::new(DirectorySoundSource::new(args.sounds_dir)),
        NotifierConfig::default(),
    ));

    // 4. Create Timer engine
    let reactor = Arc::new(SessionReactor::new(
        stats_repository.clone(),
        message_pusher.clone(),
        notifier.clone(),
    ));
    let engine = TimerEngine::spawn(session_repository, reactor, Arc::new(SystemClock));

    // 5. Create Orchestrator and start the periodic sweeps
    let orchestrator = Arc::new(SessionOrchestrator::new(
        engine,
        notifier,
        stats_repository,
        preset_repository,
    ));
    orchestrator.start_maintenance(SweepConfig::default());

    // 6. Create and run the server
    let server = Server::new(orchestrator, message_pusher, token);
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
