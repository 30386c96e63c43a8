use crate::buffer::SnapshotBuffer;
use crate::config::AppConfig;
use crate::error::{AgentError, Result};
use crate::sinks::gauges::GaugeCache;
use crate::sinks::HostLabels;
use hostmon_common::types::Snapshot;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Latest snapshot published by the sampler for the live stream.
pub type LiveSnapshot = Option<Arc<Snapshot>>;

/// Shared state handed to every loop, built once at startup.
pub struct AgentContext {
    pub config: Arc<AppConfig>,
    pub host: String,
    pub http: reqwest::Client,
    pub buffer: Arc<SnapshotBuffer>,
    pub gauges: Arc<GaugeCache>,
    pub live: watch::Sender<LiveSnapshot>,
    pub shutdown: CancellationToken,
}

impl AgentContext {
    pub fn new(config: AppConfig, host: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .map_err(|source| AgentError::SinkTransport {
                sink: "http-client",
                source,
            })?;
        let (live, _) = watch::channel(None);
        Ok(Self {
            buffer: Arc::new(SnapshotBuffer::new(config.buffer_capacity)),
            gauges: Arc::new(GaugeCache::new()?),
            config: Arc::new(config),
            host,
            http,
            live,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn host_labels(&self) -> HostLabels {
        HostLabels {
            client: self.config.client.clone(),
            region: self.config.region.clone(),
            environment: self.config.environment.clone(),
            host: self.host.clone(),
        }
    }
}
