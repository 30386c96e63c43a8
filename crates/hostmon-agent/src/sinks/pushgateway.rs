use super::gauges::GaugeCache;
use super::{truncate_body, HostLabels, MetricsSink};
use crate::context::AgentContext;
use crate::error::{AgentError, Result};
use async_trait::async_trait;
use hostmon_common::types::Snapshot;
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;

/// [`MetricsSink`] pushing the whole gauge cache to a Prometheus push gateway.
///
/// Gauges are maintained even when no gateway is configured; only the push
/// is skipped.
pub struct PushGatewaySink {
    client: reqwest::Client,
    url: Option<String>,
    gauges: Arc<GaugeCache>,
    labels: HostLabels,
}

impl PushGatewaySink {
    pub fn new(ctx: &AgentContext) -> Self {
        let url = ctx
            .config
            .push_gateway_url_base
            .as_deref()
            .map(|base| push_url(base, &ctx.config.job, &ctx.host));
        Self {
            client: ctx.http.clone(),
            url,
            gauges: ctx.gauges.clone(),
            labels: ctx.host_labels(),
        }
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

/// `{base}/job/{job}/instance/{instance}`.
///
/// # Examples
///
/// ```
/// use hostmon_agent::sinks::pushgateway::push_url;
///
/// assert_eq!(
///     push_url("http://pgw:9091/metrics/", "host_metrics", "web-01"),
///     "http://pgw:9091/metrics/job/host_metrics/instance/web-01"
/// );
/// ```
pub fn push_url(base: &str, job: &str, instance: &str) -> String {
    format!("{}/job/{job}/instance/{instance}", base.trim_end_matches('/'))
}

#[async_trait]
impl MetricsSink for PushGatewaySink {
    fn record(&self, snapshot: &Snapshot) {
        self.gauges.update(&self.labels, snapshot);
    }

    async fn push(&self) -> Result<()> {
        let Some(url) = &self.url else {
            return Ok(());
        };

        let body = self.gauges.encode()?;
        let resp = self
            .client
            .post(url.as_str())
            .header(reqwest::header::CONTENT_TYPE, TextEncoder::new().format_type())
            .body(body)
            .send()
            .await
            .map_err(|source| AgentError::SinkTransport {
                sink: "pushgateway",
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
            sink: "pushgateway",
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use chrono::Utc;

    #[tokio::test]
    async fn unset_base_records_gauges_but_skips_push() {
        let ctx = AgentContext::new(AppConfig::default(), "web-01".into()).unwrap();
        let sink = PushGatewaySink::new(&ctx);
        assert!(sink.url().is_none());

        sink.record(&Snapshot::sentinel(Utc::now()));
        assert_eq!(ctx.gauges.len(), 4);
        assert!(sink.push().await.is_ok());
    }

    #[test]
    fn url_is_built_from_job_and_host() {
        let config = AppConfig {
            push_gateway_url_base: Some("http://pgw:9091".into()),
            job: "edge".into(),
            ..AppConfig::default()
        };
        let ctx = AgentContext::new(config, "db-7".into()).unwrap();
        let sink = PushGatewaySink::new(&ctx);
        assert_eq!(sink.url(), Some("http://pgw:9091/job/edge/instance/db-7"));
    }
}
