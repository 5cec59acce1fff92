//! In-process mock gateway for integration tests
//!
//! Serves the kernels REST surface and the channels WebSocket on an
//! ephemeral port, recording what clients send.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use kg_client::GatewayConfig;

/// How the channels endpoint behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WsMode {
    /// Send one malformed frame, then answer every request with
    /// `status: busy`, a reply, and `status: idle`
    Echo,
    /// Record the first frame, then send a close frame
    CloseAfterFirst,
    /// Refuse the upgrade with 404
    Reject,
    /// Accept the upgrade and drop the socket without a close frame
    DropImmediately,
}

pub struct MockOptions {
    pub create_status: StatusCode,
    pub create_body: String,
    pub ws_mode: WsMode,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            create_status: StatusCode::CREATED,
            create_body: json!({"id": "abc123", "name": "python3"}).to_string(),
            ws_mode: WsMode::Echo,
        }
    }
}

/// Everything the mock has observed
pub struct GatewayState {
    options: MockOptions,
    pub rest_requests: AtomicUsize,
    pub creates: AtomicUsize,
    pub deletes: AtomicUsize,
    pub close_frames: AtomicUsize,
    pub frames: Mutex<Vec<Value>>,
    pub auth_headers: Mutex<Vec<String>>,
    pub ws_kernel_ids: Mutex<Vec<String>>,
}

impl GatewayState {
    fn record_rest(&self, headers: &HeaderMap) {
        self.rest_requests.fetch_add(1, Ordering::SeqCst);
        self.record_auth(headers);
    }

    fn record_auth(&self, headers: &HeaderMap) {
        if let Some(value) = headers.get("authorization") {
            self.auth_headers
                .lock()
                .unwrap()
                .push(value.to_str().unwrap_or_default().to_string());
        }
    }

    fn record_frame(&self, text: &str) -> Option<Value> {
        let value: Value = serde_json::from_str(text).ok()?;
        self.frames.lock().unwrap().push(value.clone());
        Some(value)
    }
}

pub struct MockGateway {
    pub addr: SocketAddr,
    pub state: Arc<GatewayState>,
    server_handle: JoinHandle<()>,
}

impl MockGateway {
    pub async fn start() -> Self {
        Self::start_with(MockOptions::default()).await
    }

    pub async fn start_with(options: MockOptions) -> Self {
        let state = Arc::new(GatewayState {
            options,
            rest_requests: AtomicUsize::new(0),
            creates: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            close_frames: AtomicUsize::new(0),
            frames: Mutex::new(Vec::new()),
            auth_headers: Mutex::new(Vec::new()),
            ws_kernel_ids: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/api/kernels", get(list_kernels).post(create_kernel))
            .route("/api/kernels/:id", get(get_kernel).delete(delete_kernel))
            .route("/api/kernels/:id/interrupt", post(interrupt_kernel))
            .route("/api/kernels/:id/restart", post(restart_kernel))
            .route("/api/kernels/:id/channels", get(channels))
            .route("/test/empty", get(|| async { StatusCode::OK }))
            .route("/test/raw", get(|| async { "raw body bytes" }))
            .route("/test/malformed", get(|| async { "{not json" }))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock gateway");
        let addr = listener.local_addr().expect("Mock gateway has no address");

        let server_handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            server_handle,
        }
    }

    pub fn api_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn config(&self) -> GatewayConfig {
        GatewayConfig::new(self.api_url(), self.ws_url())
    }

    pub fn creates(&self) -> usize {
        self.state.creates.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.state.deletes.load(Ordering::SeqCst)
    }

    pub fn rest_requests(&self) -> usize {
        self.state.rest_requests.load(Ordering::SeqCst)
    }

    /// Close frames received from clients
    pub fn close_frames(&self) -> usize {
        self.state.close_frames.load(Ordering::SeqCst)
    }

    pub fn frames(&self) -> Vec<Value> {
        self.state.frames.lock().unwrap().clone()
    }

    pub fn auth_headers(&self) -> Vec<String> {
        self.state.auth_headers.lock().unwrap().clone()
    }

    pub fn ws_kernel_ids(&self) -> Vec<String> {
        self.state.ws_kernel_ids.lock().unwrap().clone()
    }

    /// Wait until at least `count` frames have been recorded
    pub async fn wait_for_frames(&self, count: usize) -> Vec<Value> {
        for _ in 0..200 {
            let frames = self.frames();
            if frames.len() >= count {
                return frames;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "Mock gateway saw {} frames, expected {}",
            self.frames().len(),
            count
        );
    }
}

impl Drop for MockGateway {
    fn drop(&mut self) {
        self.server_handle.abort();
    }
}

fn kernel_json(id: &str) -> Value {
    json!({
        "id": id,
        "name": "python3",
        "last_activity": "2024-01-01T00:00:00Z",
        "execution_state": "idle",
        "connections": 1
    })
}

async fn create_kernel(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record_rest(&headers);
    state.creates.fetch_add(1, Ordering::SeqCst);
    assert_eq!(body, json!({"name": "python3"}));

    (
        state.options.create_status,
        [("content-type", "application/json")],
        state.options.create_body.clone(),
    )
        .into_response()
}

async fn list_kernels(State(state): State<Arc<GatewayState>>, headers: HeaderMap) -> Json<Value> {
    state.record_rest(&headers);
    Json(json!([kernel_json("abc123"), kernel_json("def456")]))
}

async fn get_kernel(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.record_rest(&headers);
    if id == "missing" {
        return (StatusCode::NOT_FOUND, "Kernel does not exist: missing").into_response();
    }
    Json(kernel_json(&id)).into_response()
}

async fn delete_kernel(
    State(state): State<Arc<GatewayState>>,
    Path(_id): Path<String>,
    headers: HeaderMap,
) -> StatusCode {
    state.record_rest(&headers);
    state.deletes.fetch_add(1, Ordering::SeqCst);
    StatusCode::NO_CONTENT
}

async fn interrupt_kernel(
    State(state): State<Arc<GatewayState>>,
    Path(_id): Path<String>,
    headers: HeaderMap,
) -> StatusCode {
    state.record_rest(&headers);
    StatusCode::NO_CONTENT
}

async fn restart_kernel(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Json<Value> {
    state.record_rest(&headers);
    Json(kernel_json(&id))
}

async fn channels(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    state.record_auth(&headers);
    state.ws_kernel_ids.lock().unwrap().push(id);

    if state.options.ws_mode == WsMode::Reject {
        return (StatusCode::NOT_FOUND, "No such kernel").into_response();
    }
    ws.on_upgrade(move |socket| serve_socket(socket, state))
}

async fn serve_socket(mut socket: WebSocket, state: Arc<GatewayState>) {
    match state.options.ws_mode {
        WsMode::Reject | WsMode::DropImmediately => {}
        WsMode::CloseAfterFirst => {
            if let Some(Ok(Message::Text(text))) = socket.recv().await {
                state.record_frame(&text);
            }
            let _ = socket.send(Message::Close(None)).await;
        }
        WsMode::Echo => {
            if socket
                .send(Message::Text("{\"header\": 42}".into()))
                .await
                .is_err()
            {
                return;
            }
            while let Some(Ok(message)) = socket.recv().await {
                let text = match message {
                    Message::Text(text) => text,
                    Message::Close(_) => {
                        state.close_frames.fetch_add(1, Ordering::SeqCst);
                        continue;
                    }
                    _ => continue,
                };
                let Some(request) = state.record_frame(&text) else {
                    continue;
                };
                for frame in answer(&request) {
                    if socket.send(Message::Text(frame)).await.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

/// Frames a kernel would send in response to `request`
fn answer(request: &Value) -> Vec<String> {
    let parent = &request["header"];
    let msg_type = parent["msg_type"].as_str().unwrap_or_default();
    let channel = request["channel"].as_str().unwrap_or("shell");

    let reply_content = match msg_type {
        "kernel_info_request" => json!({
            "status": "ok",
            "protocol_version": "5.3",
            "implementation": "ipython",
            "implementation_version": "8.20.0",
            "language_info": {"name": "python", "version": "3.11.7", "file_extension": ".py"},
            "banner": "Python 3.11.7"
        }),
        "execute_request" => json!({"status": "ok", "execution_count": 1, "user_expressions": {}}),
        _ => json!({"status": "ok"}),
    };
    let reply_type = match msg_type.strip_suffix("_request") {
        Some(stem) => format!("{}_reply", stem),
        None => format!("{}_reply", msg_type),
    };

    let mut frames = vec![kernel_frame(
        "status",
        "iopub",
        parent,
        json!({"execution_state": "busy"}),
    )];
    if msg_type == "execute_request" {
        frames.push(kernel_frame(
            "stream",
            "iopub",
            parent,
            json!({"name": "stdout", "text": "1\n"}),
        ));
    }
    frames.push(kernel_frame(&reply_type, channel, parent, reply_content));
    frames.push(kernel_frame(
        "status",
        "iopub",
        parent,
        json!({"execution_state": "idle"}),
    ));
    frames
}

fn kernel_frame(msg_type: &str, channel: &str, parent: &Value, content: Value) -> String {
    json!({
        "header": {
            "username": "kernel",
            "version": "5.3",
            "session": "kernel-session",
            "msg_id": uuid::Uuid::new_v4().to_string(),
            "msg_type": msg_type
        },
        "parent_header": parent,
        "channel": channel,
        "content": content,
        "metadata": {},
        "buffers": []
    })
    .to_string()
}
