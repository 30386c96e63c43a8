use crate::config::AppConfig;
use crate::context::AgentContext;
use crate::error::Result;
use crate::flush::FlushScheduler;
use crate::sampler::Sampler;
use crate::sinks::loki::LokiSink;
use crate::sinks::pushgateway::PushGatewaySink;
use crate::sinks::{LogSink, MetricsSink};
use crate::stream::StreamServer;
use hostmon_collector::MetricSource;
use std::future::Future;
use std::sync::Arc;

/// The sampler, flush scheduler and live stream server wired to one context.
pub struct Agent {
    ctx: Arc<AgentContext>,
    sampler: Sampler,
    scheduler: FlushScheduler,
    stream: StreamServer,
}

impl Agent {
    pub fn new(config: AppConfig, host: String, source: Box<dyn MetricSource>) -> Result<Self> {
        let ctx = Arc::new(AgentContext::new(config, host)?);
        let log_sink: Arc<dyn LogSink> = Arc::new(LokiSink::new(&ctx));
        let metrics_sink: Arc<dyn MetricsSink> = Arc::new(PushGatewaySink::new(&ctx));
        Ok(Self {
            sampler: Sampler::new(source),
            scheduler: FlushScheduler::new(&ctx, log_sink, metrics_sink),
            stream: StreamServer::new(&ctx),
            ctx,
        })
    }

    pub fn context(&self) -> Arc<AgentContext> {
        self.ctx.clone()
    }

    /// Runs every loop until `shutdown` resolves, then cancels them and
    /// waits for each to finish its current unit of work.
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let Self {
            ctx,
            sampler,
            scheduler,
            stream,
        } = self;

        tracing::info!(
            host = %ctx.host,
            loki = ctx.config.loki_url.is_some(),
            pushgateway = ctx.config.push_gateway_url_base.is_some(),
            stream = %stream.endpoint(),
            "Agent running"
        );

        let sampler_task = tokio::spawn(sampler.run(ctx.clone()));
        let flush_task = tokio::spawn(scheduler.run());
        let stream_task = tokio::spawn(stream.run());

        shutdown.await;
        tracing::info!("Shutting down gracefully");
        ctx.shutdown.cancel();

        for (name, task) in [
            ("sampler", sampler_task),
            ("flush", flush_task),
            ("stream", stream_task),
        ] {
            if let Err(e) = task.await {
                tracing::error!(task = name, error = %e, "Task ended abnormally");
            }
        }
        tracing::info!(pending = ctx.buffer.len(), "Agent stopped");
    }
}
