//! WebSocket connection handlers.
//!
//! Each text frame is one command line. The reply goes back on the same
//! connection; session events arrive through the MessagePusher channel.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    domain::{ChannelId, MessagePushError, PusherChannel, ScopeId, UserId, ValueObjectError},
    infrastructure::dto::websocket::{CommandHelpDto, ServerMessage},
    ui::state::AppState,
    usecase::{COMMANDS, Command, CommandContext, CommandError, CommandOutcome},
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub user_id: String,
    pub scope_id: String,
    pub channel_id: String,
    pub token: String,
}

impl ConnectQuery {
    fn into_context(self) -> Result<CommandContext, ValueObjectError> {
        Ok(CommandContext {
            user_id: UserId::try_from(self.user_id)?,
            scope_id: ScopeId::try_from(self.scope_id)?,
            channel_id: ChannelId::try_from(self.channel_id)?,
        })
    }
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    if query.token != state.token {
        tracing::warn!("Rejected connection of '{}': bad token", query.user_id);
        return Err(StatusCode::UNAUTHORIZED);
    }

    // Convert query strings -> Domain Models
    let context = match query.into_context() {
        Ok(context) => context,
        Err(e) => {
            tracing::warn!("Invalid connection parameters: {}", e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    // Create a channel for this client to receive messages
    let (tx, rx) = mpsc::unbounded_channel();

    match state
        .message_pusher
        .register_client(context.user_id.clone(), tx.clone())
        .await
    {
        Ok(()) => {
            tracing::info!(
                "Client '{}' connected (scope '{}')",
                context.user_id,
                context.scope_id
            );
            Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, context, tx, rx)))
        }
        Err(MessagePushError::AlreadyRegistered(_)) => {
            tracing::warn!(
                "User '{}' is already connected. Rejecting connection.",
                context.user_id
            );
            Err(StatusCode::CONFLICT)
        }
        Err(e) => {
            tracing::error!("Failed to register client '{}': {}", context.user_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Spawns a task that forwards queued messages to the WebSocket sender.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    context: CommandContext,
    reply_tx: PusherChannel,
    rx: mpsc::UnboundedReceiver<String>,
) {
    let (sender, mut receiver) = socket.split();
    let user_id = context.user_id.clone();
    let own_channel = reply_tx.clone();
    let state_clone = state.clone();

    // Spawn a task to receive commands from this client
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("WebSocket error for '{}': {}", context.user_id, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    tracing::debug!("Received from '{}': {}", context.user_id, text.as_str());
                    let Some(reply) = dispatch(&state_clone, &context, text.as_str()).await else {
                        continue;
                    };
                    if reply_tx.send(reply.to_json()).is_err() {
                        break;
                    }
                }
                Message::Close(_) => {
                    tracing::info!("Client '{}' requested close", context.user_id);
                    break;
                }
                _ => {}
            }
        }
    });

    // Spawn a task to forward replies and session events to this client
    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    state
        .message_pusher
        .unregister_client(&user_id, &own_channel)
        .await;
    tracing::info!("Client '{}' disconnected", user_id);
}

/// Run one command line and build the reply. Unknown commands get none.
async fn dispatch(state: &AppState, context: &CommandContext, line: &str) -> Option<ServerMessage> {
    let result = match Command::parse(line) {
        Ok(command) => state.orchestrator.execute(context, command).await,
        Err(CommandError::UnknownCommand(name)) => {
            tracing::debug!("Ignoring unknown command '{}' from '{}'", name, context.user_id);
            return None;
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(outcome) => Some(outcome_message(&outcome)),
        Err(e) => {
            tracing::warn!("Command '{}' from '{}' failed: {}", line.trim(), context.user_id, e);
            Some(ServerMessage::error(e.code(), e.to_string()))
        }
    }
}

fn outcome_message(outcome: &CommandOutcome) -> ServerMessage {
    match outcome {
        CommandOutcome::Started(snapshot) => ServerMessage::SessionStarted {
            session: snapshot.into(),
        },
        CommandOutcome::Snapshot(snapshot) => ServerMessage::SessionSnapshot {
            session: snapshot.into(),
        },
        CommandOutcome::Stopped { user_id } => ServerMessage::SessionStopped {
            user_id: user_id.to_string(),
        },
        CommandOutcome::Stats { user_id, stats } => ServerMessage::Stats {
            user_id: user_id.to_string(),
            work_units: stats.work_units,
            completed_sessions: stats.completed_sessions,
            focus_minutes: stats.focus_minutes,
        },
        CommandOutcome::AudioJoined {
            scope_id,
            channel_id,
        } => ServerMessage::AudioJoined {
            scope_id: scope_id.to_string(),
            channel_id: channel_id.to_string(),
        },
        CommandOutcome::AudioLeft { scope_id, stopped } => ServerMessage::AudioLeft {
            scope_id: scope_id.to_string(),
            stopped_sessions: stopped.iter().map(ToString::to_string).collect(),
        },
        CommandOutcome::Presets(presets) => ServerMessage::Presets {
            presets: presets.iter().map(Into::into).collect(),
        },
        CommandOutcome::Help { voice_enabled } => ServerMessage::Help {
            commands: COMMANDS
                .iter()
                .map(|(usage, description)| CommandHelpDto {
                    usage: usage.to_string(),
                    description: description.to_string(),
                })
                .collect(),
            voice_enabled: *voice_enabled,
        },
    }
}
