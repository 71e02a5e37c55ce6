//! Integration tests for the focus session server running in-process.

use std::{collections::HashMap, path::PathBuf, sync::Arc, time::Duration};

use async_trait::async_trait;
use focusbell_server::{
    domain::{Sound, SoundClip, SoundSource, VoiceGateway},
    infrastructure::{
        dto::{
            http::{SessionListDto, VoiceConnectionDto},
            websocket::ServerMessage,
        },
        message_pusher::WebSocketMessagePusher,
        repository::{InMemoryPresetRepository, InMemorySessionRepository, InMemoryStatsRepository},
        voice::{LoopbackConfig, LoopbackVoiceGateway, PlaybackBehavior},
    },
    ui::Server,
    usecase::{
        ConnectionRegistry, Notifier, NotifierConfig, SessionOrchestrator, SessionReactor,
        TimerEngine,
    },
};
use focusbell_shared::time::SystemClock;
use futures_util::{SinkExt, StreamExt};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::{Mutex, oneshot},
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

const TOKEN: &str = "test-token";

type TestSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct AllSounds;

#[async_trait]
impl SoundSource for AllSounds {
    async fn resolve(&self, sound: Sound) -> Option<SoundClip> {
        Some(SoundClip {
            sound,
            path: PathBuf::from(sound.file_name()),
            volume: 0.4,
        })
    }
}

/// Helper struct to manage an in-process server
struct TestServer {
    port: u16,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    /// Start a test server on a free port
    async fn start() -> Self {
        let message_pusher = Arc::new(WebSocketMessagePusher::new(Arc::new(Mutex::new(
            HashMap::new(),
        ))));
        let stats = Arc::new(InMemoryStatsRepository::new());
        let gateway: Arc<dyn VoiceGateway> = Arc::new(LoopbackVoiceGateway::new(LoopbackConfig {
            ready_after: Some(Duration::from_millis(20)),
            refuse_join: false,
            playback: PlaybackBehavior::Finish(Duration::from_millis(50)),
        }));
        let notifier = Arc::new(Notifier::new(
            Some(gateway),
            ConnectionRegistry::new(),
            Arc::new(AllSounds),
            NotifierConfig::default(),
        ));
        let reactor = Arc::new(SessionReactor::new(
            stats.clone(),
            message_pusher.clone(),
            notifier.clone(),
        ));
        let engine = TimerEngine::spawn(
            Arc::new(InMemorySessionRepository::new()),
            reactor,
            Arc::new(SystemClock),
        );
        let orchestrator = Arc::new(SessionOrchestrator::new(
            engine,
            notifier,
            stats,
            Arc::new(InMemoryPresetRepository::new()),
        ));
        let server = Server::new(orchestrator, message_pusher, TOKEN.to_string());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let port = listener.local_addr().unwrap().port();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = server.serve(listener, shutdown).await {
                panic!("server failed: {e}");
            }
        });

        TestServer {
            port,
            shutdown: Some(shutdown_tx),
        }
    }

    fn http_url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    fn ws_url(&self, user_id: &str, token: &str) -> String {
        format!(
            "ws://127.0.0.1:{}/ws?user_id={}&scope_id=guild-1&channel_id=general&token={}",
            self.port, user_id, token
        )
    }

    async fn connect(&self, user_id: &str) -> TestSocket {
        let (socket, _) = connect_async(self.ws_url(user_id, TOKEN))
            .await
            .expect("Failed to connect");
        socket
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

/// Send a command and wait for the next server message
async fn send_command(socket: &mut TestSocket, command: &str) -> ServerMessage {
    socket
        .send(Message::Text(command.to_string().into()))
        .await
        .expect("Failed to send command");
    next_message(socket).await
}

async fn next_message(socket: &mut TestSocket) -> ServerMessage {
    let deadline = Duration::from_secs(5);
    loop {
        let frame = tokio::time::timeout(deadline, socket.next())
            .await
            .expect("Timed out waiting for a server message")
            .expect("Connection closed")
            .expect("WebSocket error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).expect("Invalid server message");
        }
    }
}

#[tokio::test]
async fn test_health_endpoint() {
    // テスト項目: ヘルスチェックが ok を返す
    // given (前提条件):
    let server = TestServer::start().await;

    // when (操作):
    let body: serde_json::Value = reqwest::get(server.http_url("/api/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(body, serde_json::json!({"status": "ok"}));
}

#[tokio::test]
async fn test_bad_token_is_rejected() {
    // テスト項目: トークンが違う接続は 401 で拒否される
    // given (前提条件):
    let server = TestServer::start().await;

    // when (操作):
    let result = connect_async(server.ws_url("alice", "wrong")).await;

    // then (期待する結果):
    match result {
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), 401);
        }
        Err(e) => panic!("expected an HTTP 401 rejection, got {e}"),
        Ok(_) => panic!("expected an HTTP 401 rejection, but the connection succeeded"),
    }
}

#[tokio::test]
async fn test_duplicate_user_is_rejected() {
    // テスト項目: 同じユーザーの 2 つ目の接続は 409 で拒否される
    // given (前提条件):
    let server = TestServer::start().await;
    let _first = server.connect("alice").await;

    // when (操作):
    let result = connect_async(server.ws_url("alice", TOKEN)).await;

    // then (期待する結果):
    match result {
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), 409);
        }
        Err(e) => panic!("expected an HTTP 409 rejection, got {e}"),
        Ok(_) => panic!("expected an HTTP 409 rejection, but the connection succeeded"),
    }
}

#[tokio::test]
async fn test_session_lifecycle_over_websocket() {
    // テスト項目: 開始・一時停止・再開・停止がそれぞれ応答を返し、
    //            HTTP のセッション一覧に反映される
    // given (前提条件):
    let server = TestServer::start().await;
    let mut socket = server.connect("alice").await;

    // when (操作):
    let started = send_command(&mut socket, "start-session 25 5 4").await;
    let sessions: SessionListDto = reqwest::get(server.http_url("/api/sessions"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let paused = send_command(&mut socket, "pause").await;
    let paused_again = send_command(&mut socket, "pause").await;
    let resumed = send_command(&mut socket, "resume").await;
    let stopped = send_command(&mut socket, "stop").await;
    let status = send_command(&mut socket, "status").await;

    // then (期待する結果):
    let ServerMessage::SessionStarted { session } = started else {
        panic!("expected session-started, got {started:?}");
    };
    assert_eq!(session.phase, "work");
    assert_eq!(session.cycle, 1);
    assert_eq!(session.total_cycles, 4);
    assert_eq!(session.next_phase, "break");
    assert_eq!(sessions.count, 1);
    assert_eq!(sessions.sessions[0].user_id, "alice");
    assert!(matches!(paused, ServerMessage::SessionSnapshot { ref session } if session.paused));
    assert!(matches!(paused_again, ServerMessage::Error { ref code, .. } if code == "not-running"));
    assert!(matches!(resumed, ServerMessage::SessionSnapshot { ref session } if !session.paused));
    assert_eq!(
        stopped,
        ServerMessage::SessionStopped {
            user_id: "alice".to_string()
        }
    );
    assert!(matches!(status, ServerMessage::Error { ref code, .. } if code == "no-session"));
}

#[tokio::test]
async fn test_unknown_command_gets_no_reply() {
    // テスト項目: 未知のコマンドには応答せず、次のコマンドは通常通り処理される
    // given (前提条件):
    let server = TestServer::start().await;
    let mut socket = server.connect("alice").await;

    // when (操作):
    socket
        .send(Message::Text("dance".to_string().into()))
        .await
        .unwrap();
    let stats = send_command(&mut socket, "stats").await;

    // then (期待する結果):
    assert_eq!(
        stats,
        ServerMessage::Stats {
            user_id: "alice".to_string(),
            work_units: 0,
            completed_sessions: 0,
            focus_minutes: 0,
        }
    );
}

#[tokio::test]
async fn test_audio_join_and_leave_over_websocket() {
    // テスト項目: join-audio 後に通知付き開始ができ、leave-audio でそのセッションが止まる
    // given (前提条件):
    let server = TestServer::start().await;
    let mut socket = server.connect("alice").await;

    // when (操作):
    let not_joined = send_command(&mut socket, "notified-start").await;
    let joined = send_command(&mut socket, "join-audio voice-1").await;
    let voice: Vec<VoiceConnectionDto> = reqwest::get(server.http_url("/api/voice"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let started = send_command(&mut socket, "notified-start 25 5 1").await;
    let left = send_command(&mut socket, "leave-audio").await;

    // then (期待する結果):
    assert!(matches!(not_joined, ServerMessage::Error { ref code, .. } if code == "not-joined"));
    assert_eq!(
        joined,
        ServerMessage::AudioJoined {
            scope_id: "guild-1".to_string(),
            channel_id: "voice-1".to_string(),
        }
    );
    assert_eq!(
        voice,
        vec![VoiceConnectionDto {
            scope_id: "guild-1".to_string(),
            status: "ready".to_string(),
        }]
    );
    assert!(
        matches!(started, ServerMessage::SessionStarted { ref session } if session.notifications_enabled)
    );
    assert_eq!(
        left,
        ServerMessage::AudioLeft {
            scope_id: "guild-1".to_string(),
            stopped_sessions: vec!["alice".to_string()],
        }
    );
}
