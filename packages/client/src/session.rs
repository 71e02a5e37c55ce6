//! WebSocket client session management.

use futures_util::{SinkExt, StreamExt};
use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, protocol::Message},
};

use focusbell_server::infrastructure::dto::websocket::ServerMessage;

use super::{error::ClientError, formatter::MessageFormatter, ui::redisplay_prompt};

/// Where and as whom to connect
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// WebSocket endpoint, e.g. `ws://127.0.0.1:8080/ws`
    pub url: String,
    pub user_id: String,
    pub scope_id: String,
    pub channel_id: String,
    pub token: String,
}

impl ConnectOptions {
    /// Endpoint URL with the identity query parameters
    pub fn connect_url(&self) -> String {
        format!(
            "{}?user_id={}&scope_id={}&channel_id={}&token={}",
            self.url, self.user_id, self.scope_id, self.channel_id, self.token
        )
    }
}

/// Run one WebSocket client session until the user exits or the connection drops
pub async fn run_client_session(options: &ConnectOptions) -> Result<(), ClientError> {
    let (ws_stream, _response) = match connect_async(options.connect_url()).await {
        Ok(result) => result,
        Err(tungstenite::Error::Http(response)) => {
            return Err(match response.status().as_u16() {
                401 => ClientError::Unauthorized,
                409 => ClientError::DuplicateUser(options.user_id.clone()),
                status => ClientError::ConnectionError(format!("HTTP {}", status)),
            });
        }
        Err(e) => return Err(ClientError::ConnectionError(e.to_string())),
    };

    tracing::info!("Connected to focus session server!");
    println!(
        "\nYou are '{}'. Type a command (try 'help') and press Enter. Press Ctrl+C to exit.\n",
        options.user_id
    );

    let (mut write, mut read) = ws_stream.split();

    // Spawn a task to handle incoming messages
    let user_id_for_read = options.user_id.clone();
    let mut read_task = tokio::spawn(async move {
        let mut connection_error = false;

        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    let formatted = match serde_json::from_str::<ServerMessage>(text.as_str()) {
                        Ok(message) => MessageFormatter::format(&message),
                        // If parsing fails, display as raw text
                        Err(_) => MessageFormatter::format_raw_message(text.as_str()),
                    };
                    print!("{}", formatted);
                    redisplay_prompt(&user_id_for_read);
                }
                Ok(Message::Close(_)) => {
                    tracing::info!("Server closed the connection");
                    connection_error = true;
                    break;
                }
                Err(e) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    connection_error = true;
                    break;
                }
                _ => {}
            }
        }

        connection_error
    });

    // Create channel for rustyline input
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();

    // Spawn a blocking thread for rustyline (synchronous readline)
    let prompt = format!("{}> ", options.user_id);
    let _readline_handle = std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            // Channel closed, exit thread
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl+D
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    // Spawn a task to send typed commands as text frames
    let mut write_task = tokio::spawn(async move {
        let mut write_error = false;

        while let Some(line) = input_rx.recv().await {
            if let Err(e) = write.send(Message::Text(line.into())).await {
                tracing::warn!("Failed to send command: {}", e);
                write_error = true;
                break;
            }
        }

        write_error
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        read_result = &mut read_task => {
            write_task.abort();
            if read_result.unwrap_or(false) {
                return Err(ClientError::ConnectionError("Connection lost".to_string()));
            }
        }
        write_result = &mut write_task => {
            read_task.abort();
            if write_result.unwrap_or(false) {
                return Err(ClientError::ConnectionError("Connection lost".to_string()));
            }
        }
    }

    Ok(())
}
