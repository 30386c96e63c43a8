use std::path::PathBuf;

/// Errors raised inside the agent's loops.
///
/// None of these escape a loop: each unit of work logs its own failures
/// and carries on.
///
/// # Examples
///
/// ```rust
/// use hostmon_agent::error::AgentError;
///
/// let err = AgentError::SinkStatus {
///     sink: "loki",
///     status: 503,
///     body: "overloaded".to_string(),
/// };
/// assert!(err.to_string().contains("503"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The config file is missing or unreadable.
    #[error("Agent: cannot load config {}: {reason}", path.display())]
    ConfigLoad { path: PathBuf, reason: String },

    /// A host counter read failed.
    #[error("Agent: counter read failed: {0}")]
    SourceRead(String),

    /// Writing the staging log failed.
    #[error("Agent: staging log write failed: {0}")]
    FlushWrite(#[from] std::io::Error),

    /// Snapshot or payload serialization failed.
    #[error("Agent: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An HTTP request to a sink failed in transport.
    #[error("Agent: {sink} request failed: {source}")]
    SinkTransport {
        sink: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// A sink answered with a non-success status.
    #[error("Agent: {sink} returned status={status}, body={body}")]
    SinkStatus {
        sink: &'static str,
        status: u16,
        body: String,
    },

    /// Gauge registration or exposition encoding failed.
    #[error("Agent: metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// The live stream endpoint could not be opened.
    #[error("Agent: stream endpoint {endpoint}: {source}")]
    StreamEndpoint {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience `Result` alias for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;
