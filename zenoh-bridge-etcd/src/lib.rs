//! Zenoh bridge for etcd cluster telemetry.
//!
//! Polls one etcd member over its HTTP API, tags every value with the
//! member's role in the cluster and publishes the records to Zenoh.
//!
//! # Key Expressions
//!
//! ```text
//! zensight/etcd/<cluster>/<member>/<metric path>
//! zensight/etcd/@/status
//! ```
//!
//! e.g. `zensight/etcd/prod/10.0.0.1:2379/etcd/self/sendappendreq/cnt`.

pub mod config;
pub mod dimensions;
pub mod error;
pub mod exposition;
pub mod filter;
pub mod http;
pub mod poller;
pub mod session;
pub mod sink;
pub mod status;
pub mod tables;
pub mod telemetry;
pub mod topology;

pub use config::{EtcdBridgeConfig, EtcdConfig, LogFormat, LoggingConfig, TlsConfig, ZenohConfig};
pub use error::{ConfigError, FetchError, SessionError, SinkError};
pub use http::{Fetcher, HttpFetcher};
pub use poller::{CycleReport, EtcdPoller, PollSettings, PollState};
pub use session::connect;
pub use sink::{MemorySink, MetricSink, ZenohSink};
pub use status::{BridgeState, BridgeStatus, PolledMember};
pub use telemetry::{Format, MetricKind, MetricRecord};
pub use topology::Role;

/// Initialize tracing with the given configuration.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), ConfigError> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .try_init()
            .map_err(|e| ConfigError::Tracing(e.to_string())),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .try_init()
            .map_err(|e| ConfigError::Tracing(e.to_string())),
    }
}
