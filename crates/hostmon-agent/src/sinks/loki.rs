use super::{truncate_body, LogSink};
use crate::context::AgentContext;
use crate::error::{AgentError, Result};
use async_trait::async_trait;
use hostmon_common::types::Snapshot;
use serde::Serialize;
use serde_json::{json, Value};

/// Stream labels attached to every pushed line.
#[derive(Debug, Clone, Serialize)]
pub struct StreamLabels {
    pub job: String,
    pub host: String,
    pub client: String,
    pub region: String,
    pub env: String,
    pub component: String,
    pub log_type: String,
}

/// [`LogSink`] that posts each snapshot to a Loki push endpoint.
///
/// Without a configured URL every push is a no-op.
pub struct LokiSink {
    client: reqwest::Client,
    url: Option<String>,
    labels: StreamLabels,
}

impl LokiSink {
    pub fn new(ctx: &AgentContext) -> Self {
        let config = &ctx.config;
        Self {
            client: ctx.http.clone(),
            url: config.loki_url.clone(),
            labels: StreamLabels {
                job: config.job.clone(),
                host: ctx.host.clone(),
                client: config.client.clone(),
                region: config.region.clone(),
                env: config.environment.clone(),
                component: config.component.clone(),
                log_type: config.log_type.clone(),
            },
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.url.is_some()
    }

    fn payload(&self, snapshot: &Snapshot, line: &str) -> Value {
        let ts = snapshot
            .timestamp
            .timestamp_nanos_opt()
            .unwrap_or_default()
            .to_string();
        json!({
            "streams": [{
                "stream": self.labels,
                "values": [[ts, line]],
            }]
        })
    }
}

#[async_trait]
impl LogSink for LokiSink {
    async fn push(&self, snapshot: &Snapshot, line: &str) -> Result<()> {
        let Some(url) = &self.url else {
            return Ok(());
        };

        let resp = self
            .client
            .post(url.as_str())
            .json(&self.payload(snapshot, line))
            .send()
            .await
            .map_err(|source| AgentError::SinkTransport {
                sink: "loki",
                source,
            })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = match resp.text().await {
            Ok(text) => truncate_body(&text),
            Err(e) => format!("[Failed to read response body: {e}]"),
        };
        Err(AgentError::SinkStatus {
            sink: "loki",
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use chrono::{TimeZone, Utc};

    fn sink(loki_url: Option<&str>) -> LokiSink {
        let config = AppConfig {
            client: "acme".into(),
            region: "eu".into(),
            environment: "staging".into(),
            component: "agent".into(),
            log_type: "metrics".into(),
            loki_url: loki_url.map(str::to_string),
            ..AppConfig::default()
        };
        let ctx = AgentContext::new(config, "web-01".into()).unwrap();
        LokiSink::new(&ctx)
    }

    #[test]
    fn payload_matches_push_api_shape() {
        let sink = sink(Some("http://loki/push"));
        let snapshot = Snapshot::sentinel(Utc.timestamp_opt(1_700_000_000, 5).unwrap());
        let payload = sink.payload(&snapshot, "{\"cpuUsage\":-1.0}");

        let stream = &payload["streams"][0];
        assert_eq!(stream["stream"]["job"], "host_metrics");
        assert_eq!(stream["stream"]["host"], "web-01");
        assert_eq!(stream["stream"]["client"], "acme");
        assert_eq!(stream["stream"]["region"], "eu");
        assert_eq!(stream["stream"]["env"], "staging");
        assert_eq!(stream["stream"]["component"], "agent");
        assert_eq!(stream["stream"]["log_type"], "metrics");
        assert_eq!(stream["values"][0][0], "1700000000000000005");
        assert_eq!(stream["values"][0][1], "{\"cpuUsage\":-1.0}");
    }

    #[tokio::test]
    async fn unset_url_is_a_no_op() {
        let sink = sink(None);
        assert!(!sink.is_enabled());
        let snapshot = Snapshot::sentinel(Utc::now());
        assert!(sink.push(&snapshot, "{}").await.is_ok());
    }
}
