//! In-process stub of the CheckMed service
//!
//! Serves `POST /api/<endpoint>/` on an ephemeral port, records every multipart
//! field it receives and answers with a per-endpoint canned reply.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use checkmed_common::config::{PacingPolicy, Settings};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RecordedField {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl RecordedField {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).to_string()
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub endpoint: String,
    pub fields: Vec<RecordedField>,
}

impl RecordedRequest {
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn field(&self, name: &str) -> Option<&RecordedField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Clone, Default)]
struct StubState {
    replies: Arc<Mutex<HashMap<String, (u16, String)>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

pub struct StubService {
    addr: std::net::SocketAddr,
    state: StubState,
    server: tokio::task::JoinHandle<()>,
}

impl StubService {
    pub async fn start() -> Self {
        let state = StubState::default();
        let app = Router::new()
            .route("/api/:endpoint/", post(handle))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            state,
            server,
        }
    }

    /// Answer `endpoint` (e.g. "verify") with `status` and `body` from now on
    pub fn reply(&self, endpoint: &str, status: u16, body: &str) {
        self.state
            .replies
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), (status, body.to_string()));
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Settings pointing at this stub
    pub fn settings(&self, cache_dir: &std::path::Path, pacing: PacingPolicy) -> Settings {
        Settings {
            service_url: self.base_url(),
            cache_dir: cache_dir.to_path_buf(),
            request_timeout: Duration::from_secs(5),
            cache_ttl: Duration::from_secs(3600),
            location_timeout: Duration::from_millis(200),
            pacing,
            log_level: "debug".to_string(),
        }
    }
}

impl Drop for StubService {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn handle(
    State(state): State<StubState>,
    Path(endpoint): Path<String>,
    mut multipart: Multipart,
) -> (StatusCode, String) {
    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.unwrap().to_vec();
        fields.push(RecordedField {
            name,
            file_name,
            content_type,
            data,
        });
    }

    state.requests.lock().unwrap().push(RecordedRequest {
        endpoint: endpoint.clone(),
        fields,
    });

    let (status, body) = state
        .replies
        .lock()
        .unwrap()
        .get(&endpoint)
        .cloned()
        .unwrap_or((200, "\"ok\"".to_string()));
    (StatusCode::from_u16(status).unwrap(), body)
}

/// Minimal bytes that sniff as JPEG
pub fn jpeg_bytes() -> Vec<u8> {
    vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00]
}

/// Minimal bytes that sniff as PNG
pub fn png_bytes() -> Vec<u8> {
    vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D]
}
