use anyhow::Result;
use hostmon_agent::agent::Agent;
use hostmon_agent::config::AppConfig;
use hostmon_collector::cpu::CpuSource;
use hostmon_collector::system::SysinfoSource;
use std::path::PathBuf;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("hostmon=info".parse()?))
        .init();

    let explicit = std::env::args().nth(1).map(PathBuf::from);
    let config = AppConfig::load(explicit.as_deref());
    tracing::info!(
        client = %config.client,
        region = %config.region,
        environment = %config.environment,
        hyper_v = config.hyper_v,
        "hostmon-agent starting"
    );

    let source = SysinfoSource::new(CpuSource::from_hyper_v(config.hyper_v));
    let agent = Agent::new(config, hostmon_collector::host_name(), Box::new(source))?;
    agent.run(shutdown_signal()).await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
