//! Prints the agent's live snapshot stream, one JSON line per tick.

use anyhow::{Context, Result};
use hostmon_agent::config::DEFAULT_STREAM_ENDPOINT;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  hostmon-tail [endpoint]    Print live snapshots (default {DEFAULT_STREAM_ENDPOINT})");
}

#[tokio::main]
async fn main() -> Result<()> {
    let endpoint = match std::env::args().nth(1).as_deref() {
        Some("-h" | "--help") => {
            print_usage();
            return Ok(());
        }
        Some(endpoint) => endpoint.to_string(),
        None => DEFAULT_STREAM_ENDPOINT.to_string(),
    };

    #[cfg(unix)]
    let stream = tokio::net::UnixStream::connect(&endpoint)
        .await
        .with_context(|| format!("connect to {endpoint}"))?;
    #[cfg(windows)]
    let stream = tokio::net::windows::named_pipe::ClientOptions::new()
        .open(&endpoint)
        .with_context(|| format!("open pipe {endpoint}"))?;

    tail(stream).await
}

#[allow(clippy::print_stdout)]
async fn tail<R: AsyncRead + Unpin>(reader: R) -> Result<()> {
    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await.context("read stream")? {
        println!("{line}");
    }
    Ok(())
}
