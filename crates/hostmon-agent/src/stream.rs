//! Local live stream of snapshots, one JSON line per sampler tick.
//!
//! Serves a single client at a time over a Unix socket (named pipe on
//! Windows). A client only sees ticks that happen while it is connected.

use crate::context::{AgentContext, LiveSnapshot};
use crate::error::AgentError;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Delay before retrying after the endpoint could not be opened.
const ENDPOINT_RETRY: Duration = Duration::from_secs(5);

/// Delay before accepting again after a failed accept.
const ACCEPT_RETRY: Duration = Duration::from_millis(500);

/// A client that takes longer than this to absorb one line is dropped.
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a client session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client went away; wait for the next one.
    Disconnected,
    Cancelled,
    /// The sampler is gone; nothing more will be published.
    SourceClosed,
}

/// Writes each newly published snapshot to `writer` until the client
/// disconnects, the publisher closes, or shutdown is signalled.
pub async fn serve_client<W>(
    mut writer: W,
    live: &mut watch::Receiver<LiveSnapshot>,
    shutdown: &CancellationToken,
) -> SessionEnd
where
    W: AsyncWrite + Unpin,
{
    // Only ticks after connect are sent.
    let _ = live.borrow_and_update();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return SessionEnd::Cancelled,
            changed = live.changed() => {
                if changed.is_err() {
                    return SessionEnd::SourceClosed;
                }
                let latest = live.borrow_and_update().clone();
                let Some(snapshot) = latest else {
                    continue;
                };
                let mut line = match snapshot.to_json_line() {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::warn!(error = %e, "Snapshot not serializable, not streamed");
                        continue;
                    }
                };
                line.push('\n');

                let written = async {
                    writer.write_all(line.as_bytes()).await?;
                    writer.flush().await
                };
                tokio::select! {
                    _ = shutdown.cancelled() => return SessionEnd::Cancelled,
                    result = tokio::time::timeout(WRITE_TIMEOUT, written) => match result {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            tracing::warn!(error = %e, "Stream client disconnected");
                            return SessionEnd::Disconnected;
                        }
                        Err(_) => {
                            tracing::warn!(
                                timeout_secs = WRITE_TIMEOUT.as_secs(),
                                "Stream client stopped reading, dropping session"
                            );
                            return SessionEnd::Disconnected;
                        }
                    },
                }
            }
        }
    }
}

pub struct StreamServer {
    endpoint: String,
    live: watch::Receiver<LiveSnapshot>,
    shutdown: CancellationToken,
}

impl StreamServer {
    pub fn new(ctx: &AgentContext) -> Self {
        Self {
            endpoint: ctx.config.stream_endpoint.clone(),
            live: ctx.live.subscribe(),
            shutdown: ctx.shutdown.clone(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Accepts clients one after another until shutdown. Endpoint failures
    /// are logged and retried.
    pub async fn run(mut self) {
        tracing::info!(endpoint = %self.endpoint, "Live stream server started");
        loop {
            match self.listen().await {
                Ok(()) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Live stream endpoint failed, retrying");
                    if wait_or_cancelled(&self.shutdown, ENDPOINT_RETRY).await {
                        break;
                    }
                }
            }
        }
        tracing::info!("Live stream server stopped");
    }

    /// Handles one session's end; `true` means stop serving.
    fn session_ended(&self, end: SessionEnd) -> bool {
        match end {
            SessionEnd::Disconnected => {
                tracing::info!("Waiting for next stream client");
                false
            }
            SessionEnd::Cancelled => true,
            SessionEnd::SourceClosed => {
                tracing::warn!("Snapshot publisher closed, stopping live stream");
                true
            }
        }
    }

    fn endpoint_error(&self, source: std::io::Error) -> AgentError {
        AgentError::StreamEndpoint {
            endpoint: self.endpoint.clone(),
            source,
        }
    }

    #[cfg(unix)]
    async fn listen(&mut self) -> Result<(), AgentError> {
        use std::path::Path;
        use tokio::net::UnixListener;

        let path = Path::new(&self.endpoint);
        // Stale socket from a previous run.
        if path.exists() {
            std::fs::remove_file(path).map_err(|e| self.endpoint_error(e))?;
        }
        let listener = UnixListener::bind(path).map_err(|e| self.endpoint_error(e))?;

        loop {
            let accepted = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = listener.accept() => accepted,
            };
            let stream = match accepted {
                Ok((stream, _)) => stream,
                Err(e) => {
                    tracing::warn!(error = %e, "Stream accept failed");
                    if wait_or_cancelled(&self.shutdown, ACCEPT_RETRY).await {
                        break;
                    }
                    continue;
                }
            };

            tracing::info!("Stream client connected");
            let end = serve_client(stream, &mut self.live, &self.shutdown).await;
            if self.session_ended(end) {
                break;
            }
        }

        let _ = std::fs::remove_file(path);
        Ok(())
    }

    #[cfg(windows)]
    async fn listen(&mut self) -> Result<(), AgentError> {
        use tokio::net::windows::named_pipe::ServerOptions;

        let mut first_instance = true;
        loop {
            let pipe = ServerOptions::new()
                .first_pipe_instance(first_instance)
                .create(&self.endpoint)
                .map_err(|e| self.endpoint_error(e))?;
            first_instance = false;

            tokio::select! {
                _ = self.shutdown.cancelled() => return Ok(()),
                connected = pipe.connect() => {
                    if let Err(e) = connected {
                        tracing::warn!(error = %e, "Stream client connect failed");
                        if wait_or_cancelled(&self.shutdown, ACCEPT_RETRY).await {
                            return Ok(());
                        }
                        continue;
                    }
                }
            }

            tracing::info!("Stream client connected");
            let end = serve_client(pipe, &mut self.live, &self.shutdown).await;
            if self.session_ended(end) {
                return Ok(());
            }
        }
    }
}

/// Sleeps for `delay`; `true` if shutdown fired first.
async fn wait_or_cancelled(shutdown: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => true,
        _ = tokio::time::sleep(delay) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hostmon_common::types::Snapshot;
    use std::sync::Arc;
    use tokio::io::{AsyncBufReadExt, BufReader};

    fn snapshot(cpu: f64) -> LiveSnapshot {
        let mut s = Snapshot::sentinel(Utc::now());
        s.cpu_usage = cpu;
        Some(Arc::new(s))
    }

    #[tokio::test]
    async fn streams_one_line_per_published_snapshot() {
        let (tx, mut rx) = watch::channel(snapshot(0.0));
        let shutdown = CancellationToken::new();
        let (server_end, client_end) = tokio::io::duplex(4096);

        let session = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { serve_client(server_end, &mut rx, &shutdown).await })
        };
        // Let the session subscribe before anything is published.
        tokio::task::yield_now().await;

        let mut lines = BufReader::new(client_end).lines();
        tx.send_replace(snapshot(1.5));
        let first: Snapshot = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(first.cpu_usage, 1.5);

        tx.send_replace(snapshot(2.5));
        let second: Snapshot = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(second.cpu_usage, 2.5);

        shutdown.cancel();
        assert_eq!(session.await.unwrap(), SessionEnd::Cancelled);
    }

    #[tokio::test]
    async fn sentinel_snapshots_are_streamed() {
        let (tx, mut rx) = watch::channel(None);
        let shutdown = CancellationToken::new();
        let (server_end, client_end) = tokio::io::duplex(4096);
        let session = tokio::spawn(async move { serve_client(server_end, &mut rx, &shutdown).await });
        tokio::task::yield_now().await;

        tx.send_replace(Some(Arc::new(Snapshot::sentinel(Utc::now()))));
        let mut lines = BufReader::new(client_end).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        let streamed: Snapshot = serde_json::from_str(&line).unwrap();
        assert!(streamed.is_sentinel());

        drop(tx);
        assert_eq!(session.await.unwrap(), SessionEnd::SourceClosed);
    }

    #[tokio::test]
    async fn client_disconnect_ends_session() {
        let (tx, mut rx) = watch::channel(None);
        let shutdown = CancellationToken::new();
        let (server_end, client_end) = tokio::io::duplex(64);
        drop(client_end);

        let session = tokio::spawn(async move { serve_client(server_end, &mut rx, &shutdown).await });
        tokio::task::yield_now().await;
        tx.send_replace(snapshot(3.0));
        assert_eq!(session.await.unwrap(), SessionEnd::Disconnected);
        // The publisher keeps working after the client is gone.
        tx.send_replace(snapshot(4.0));
    }

    #[tokio::test]
    async fn shutdown_interrupts_a_write_to_a_client_that_never_reads() {
        let (tx, mut rx) = watch::channel(None);
        let shutdown = CancellationToken::new();
        // Smaller than one snapshot line, so the write cannot complete.
        let (server_end, _client_end) = tokio::io::duplex(64);

        let session = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { serve_client(server_end, &mut rx, &shutdown).await })
        };
        tokio::task::yield_now().await;
        tx.send_replace(Some(Arc::new(Snapshot::sentinel(Utc::now()))));
        tokio::time::sleep(Duration::from_millis(100)).await;

        shutdown.cancel();
        let end = tokio::time::timeout(Duration::from_secs(3), session)
            .await
            .expect("session ignored shutdown while writing")
            .unwrap();
        assert_eq!(end, SessionEnd::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_client_is_dropped_after_write_timeout() {
        let (tx, mut rx) = watch::channel(None);
        let shutdown = CancellationToken::new();
        let (server_end, _client_end) = tokio::io::duplex(64);

        let session = tokio::spawn(async move { serve_client(server_end, &mut rx, &shutdown).await });
        tokio::task::yield_now().await;
        tx.send_replace(snapshot(9.0));

        let end = tokio::time::timeout(WRITE_TIMEOUT * 2, session)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(end, SessionEnd::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_wait_sleeps_unless_cancelled() {
        let shutdown = CancellationToken::new();
        let started = tokio::time::Instant::now();
        assert!(!wait_or_cancelled(&shutdown, ACCEPT_RETRY).await);
        assert!(started.elapsed() >= ACCEPT_RETRY);

        shutdown.cancel();
        let started = tokio::time::Instant::now();
        assert!(wait_or_cancelled(&shutdown, ENDPOINT_RETRY).await);
        assert!(started.elapsed() < ENDPOINT_RETRY);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn server_accepts_a_new_client_after_disconnect() {
        use crate::config::AppConfig;
        use tokio::net::UnixStream;

        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("live.sock");
        let config = AppConfig {
            stream_endpoint: socket.to_string_lossy().into_owned(),
            ..AppConfig::default()
        };
        let ctx = AgentContext::new(config, "test-host".into()).unwrap();
        let server = tokio::spawn(StreamServer::new(&ctx).run());

        async fn connect(socket: &std::path::Path) -> UnixStream {
            for _ in 0..100 {
                if let Ok(stream) = UnixStream::connect(socket).await {
                    return stream;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            panic!("stream socket never came up");
        }

        // Publish until the connected client has a line, since the
        // server may not have accepted yet when the first one goes out.
        async fn read_one(
            stream: UnixStream,
            ctx: &AgentContext,
            cpu: f64,
        ) -> (Snapshot, tokio::io::Lines<BufReader<UnixStream>>) {
            let mut lines = BufReader::new(stream).lines();
            loop {
                ctx.live.send_replace(snapshot(cpu));
                let next = tokio::time::timeout(Duration::from_millis(100), lines.next_line()).await;
                if let Ok(line) = next {
                    let line = line.unwrap().unwrap();
                    return (serde_json::from_str(&line).unwrap(), lines);
                }
            }
        }

        let (first, lines) = read_one(connect(&socket).await, &ctx, 10.0).await;
        assert_eq!(first.cpu_usage, 10.0);
        drop(lines);

        // Let the server observe the broken pipe on its next write.
        for _ in 0..3 {
            ctx.live.send_replace(snapshot(11.0));
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        let (second, _lines) = read_one(connect(&socket).await, &ctx, 20.0).await;
        assert_eq!(second.cpu_usage, 20.0);

        ctx.shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        assert!(!socket.exists());
    }
}
