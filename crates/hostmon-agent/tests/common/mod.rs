#![allow(dead_code)]

use axum::body::to_bytes;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use hostmon_common::types::Snapshot;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub path: String,
    pub content_type: Option<String>,
    pub body: String,
}

/// Records every request it receives and answers with a settable status.
#[derive(Clone)]
pub struct CaptureServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    status: Arc<AtomicU16>,
}

impl CaptureServer {
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind capture server");
        let addr = listener.local_addr().expect("capture server addr");
        let server = Self {
            base_url: format!("http://{addr}"),
            requests: Arc::new(Mutex::new(Vec::new())),
            status: Arc::new(AtomicU16::new(204)),
        };

        let app = Router::new().fallback(capture).with_state(server.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        server
    }

    pub fn respond_with(&self, status: StatusCode) {
        self.status.store(status.as_u16(), Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, prefix: &str) -> Vec<CapturedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path.starts_with(prefix))
            .collect()
    }

    /// Polls until at least `count` requests under `prefix` arrived.
    pub async fn wait_for(&self, prefix: &str, count: usize, within: Duration) -> Vec<CapturedRequest> {
        let deadline = tokio::time::Instant::now() + within;
        loop {
            let seen = self.requests_to(prefix);
            if seen.len() >= count || tokio::time::Instant::now() >= deadline {
                return seen;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

async fn capture(State(server): State<CaptureServer>, req: Request) -> StatusCode {
    let path = req.uri().path().to_string();
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = to_bytes(req.into_body(), usize::MAX).await.unwrap_or_default();
    server.requests.lock().unwrap().push(CapturedRequest {
        path,
        content_type,
        body: String::from_utf8_lossy(&body).into_owned(),
    });
    StatusCode::from_u16(server.status.load(Ordering::SeqCst)).unwrap_or(StatusCode::OK)
}

pub fn snapshot(secs: u32, cpu: f64, interfaces: &[(&str, f64)]) -> Snapshot {
    let mut s = Snapshot::sentinel(Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, secs).unwrap());
    s.cpu_usage = cpu;
    s.memory_used_percent = 42.5;
    s.disk_read_bps = 100.0;
    s.disk_write_bps = 200.0;
    for (name, bps) in interfaces {
        s.net_in_bps_by_interface.insert(name.to_string(), *bps);
        s.net_out_bps_by_interface.insert(name.to_string(), *bps);
    }
    s
}
