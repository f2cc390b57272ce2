//! Streaming transport against an in-process WebSocket collector.
mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use common::{CountingSampler, RecordingStatus};
use hostpulse_agent::{
    error::ErrorKind,
    session::{Session, WsConnector},
    ConnectionState, Credentials, Sample, Supervisor,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(5);

#[derive(Clone, Copy)]
enum Reply {
    Text(&'static str),
    Silent,
    HangUpAfterFirstSample,
}

#[derive(Clone)]
struct CollectorState {
    reply: Reply,
    hello: mpsc::UnboundedSender<String>,
    samples: mpsc::UnboundedSender<String>,
}

struct Collector {
    url: String,
    hello: mpsc::UnboundedReceiver<String>,
    samples: mpsc::UnboundedReceiver<String>,
}

async fn spawn_collector(reply: Reply) -> Collector {
    let (hello, hello_rx) = mpsc::unbounded_channel();
    let (samples, samples_rx) = mpsc::unbounded_channel();
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .with_state(CollectorState {
            reply,
            hello,
            samples,
        });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Collector {
        url: format!("ws://{addr}/ws"),
        hello: hello_rx,
        samples: samples_rx,
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<CollectorState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: CollectorState) {
    let Some(Ok(Message::Text(hello))) = socket.recv().await else {
        return;
    };
    let _ = state.hello.send(hello);

    let hang_up = match state.reply {
        Reply::Text(body) => {
            let _ = socket.send(Message::Text(body.to_string())).await;
            false
        }
        Reply::HangUpAfterFirstSample => {
            let _ = socket.send(Message::Text(r#"{"status":"ok"}"#.into())).await;
            true
        }
        Reply::Silent => {
            // Hold the connection open without answering.
            tokio::time::sleep(WAIT).await;
            return;
        }
    };

    while let Some(Ok(msg)) = socket.recv().await {
        if let Message::Text(text) = msg {
            let _ = state.samples.send(text);
            if hang_up {
                return;
            }
        }
    }
}

fn creds(url: &str) -> Credentials {
    Credentials {
        endpoint: url.to_string(),
        secret: "s3cret".into(),
    }
}

async fn run_once(
    connector: &WsConnector,
    url: &str,
) -> (Result<(), hostpulse_agent::TerminalError>, CountingSampler, RecordingStatus) {
    let mut sampler = CountingSampler::default();
    let status = RecordingStatus::default();
    let res = tokio::time::timeout(
        WAIT,
        Session::new(connector, &mut sampler, &status, Duration::from_millis(50))
            .run(&creds(url), &CancellationToken::new()),
    )
    .await
    .expect("session ended on its own");
    (res, sampler, status)
}

#[tokio::test]
async fn accepted_handshake_streams_samples_in_order() {
    let mut collector = spawn_collector(Reply::Text(r#"{"status":"ok"}"#)).await;
    let status = Arc::new(RecordingStatus::default());
    let supervisor = Supervisor::new(
        Arc::new(creds(&collector.url)),
        Box::new(WsConnector::new(Duration::from_secs(2))),
        Box::new(CountingSampler::default()),
        status.clone(),
    )
    .with_timing(Duration::from_millis(50), Duration::from_millis(50));
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(supervisor.supervise(shutdown.clone()));

    let hello = tokio::time::timeout(WAIT, collector.hello.recv()).await.unwrap().unwrap();
    let hello: serde_json::Value = serde_json::from_str(&hello).unwrap();
    assert_eq!(hello, serde_json::json!({ "secret": "s3cret" }));

    let mut cpus = Vec::new();
    for _ in 0..3 {
        let raw = tokio::time::timeout(WAIT, collector.samples.recv()).await.unwrap().unwrap();
        let sample: Sample = serde_json::from_str(&raw).unwrap();
        // GPU absent: still a full record, sentinel on the wire.
        let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(v["gpu"], serde_json::json!(-1.0));
        assert_eq!(v["ramTotalMb"], serde_json::json!(8192));
        cpus.push(sample.cpu);
    }
    shutdown.cancel();
    task.await.unwrap();

    assert_eq!(cpus, vec![1.0, 2.0, 3.0]);
    assert_eq!(
        &status.states()[..3],
        &[
            ConnectionState::Connecting,
            ConnectionState::Authenticating,
            ConnectionState::Connected
        ]
    );
}

#[tokio::test]
async fn rejected_handshake_sends_nothing() {
    let mut collector = spawn_collector(Reply::Text(r#"{"status":"fail"}"#)).await;
    let (res, sampler, status) = run_once(&WsConnector::new(Duration::from_secs(2)), &collector.url).await;

    let err = res.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthFailure);
    assert!(err.to_string().contains("fail"));
    assert_eq!(sampler.count(), 0);
    assert!(!status.states().contains(&ConnectionState::Connected));
    assert!(collector.samples.try_recv().is_err());
}

#[tokio::test]
async fn malformed_handshake_reply_is_a_protocol_error() {
    let collector = spawn_collector(Reply::Text("definitely not json")).await;
    let (res, sampler, _) = run_once(&WsConnector::new(Duration::from_secs(2)), &collector.url).await;

    assert_eq!(res.unwrap_err().kind(), ErrorKind::AuthProtocolError);
    assert_eq!(sampler.count(), 0);
}

#[tokio::test]
async fn silent_collector_times_out_the_handshake() {
    let collector = spawn_collector(Reply::Silent).await;
    let (res, sampler, _) =
        run_once(&WsConnector::new(Duration::from_millis(200)), &collector.url).await;

    assert_eq!(res.unwrap_err().kind(), ErrorKind::AuthProtocolError);
    assert_eq!(sampler.count(), 0);
}

#[tokio::test]
async fn unreachable_or_invalid_endpoint_is_a_dial_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let connector = WsConnector::new(Duration::from_secs(2));
    let (res, sampler, status) = run_once(&connector, &format!("ws://127.0.0.1:{port}/ws")).await;
    assert_eq!(res.unwrap_err().kind(), ErrorKind::DialFailure);
    assert_eq!(sampler.count(), 0);
    assert!(status.states().is_empty());

    let (res, _, _) = run_once(&connector, "not a url").await;
    assert_eq!(res.unwrap_err().kind(), ErrorKind::DialFailure);
}

#[tokio::test]
async fn stalled_upgrade_is_a_dial_failure() {
    // Accepts the TCP connection but never answers the HTTP upgrade.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let holder = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((sock, _)) = listener.accept().await {
            held.push(sock);
        }
    });

    let connector = WsConnector::new(Duration::from_secs(2))
        .with_connect_timeout(Duration::from_millis(200));
    let (res, sampler, status) = run_once(&connector, &format!("ws://{addr}/ws")).await;

    assert_eq!(res.unwrap_err().kind(), ErrorKind::DialFailure);
    assert_eq!(sampler.count(), 0);
    assert!(status.states().is_empty());
    holder.abort();
}

#[tokio::test]
async fn collector_hanging_up_ends_the_session_with_a_send_failure() {
    let mut collector = spawn_collector(Reply::HangUpAfterFirstSample).await;
    let (res, sampler, _) = run_once(&WsConnector::new(Duration::from_secs(2)), &collector.url).await;

    assert_eq!(res.unwrap_err().kind(), ErrorKind::SendFailure);
    assert!(sampler.count() >= 2);
    assert!(collector.samples.try_recv().is_ok());
}
