//! Host telemetry agent.
//!
//! A [`sampler::Sampler`] reads host counters on a fixed cadence. Each
//! snapshot goes two ways: into the [`buffer::SnapshotBuffer`], which the
//! [`flush::FlushScheduler`] periodically drains to a staging log, Loki and
//! a Prometheus push gateway; and out over the [`stream`] server to a local
//! viewer.

pub mod agent;
pub mod buffer;
pub mod config;
pub mod context;
pub mod error;
pub mod flush;
pub mod sampler;
pub mod sinks;
pub mod stream;
