use zenoh::Session;

use crate::config::ZenohConfig;
use crate::error::SessionError;

/// Build the Zenoh configuration for the bridge session.
pub fn zenoh_config(config: &ZenohConfig) -> Result<zenoh::Config, SessionError> {
    let mut zenoh_config = zenoh::Config::default();

    let mode = match config.mode.as_str() {
        "client" | "peer" | "router" => format!("\"{}\"", config.mode),
        other => return Err(SessionError::InvalidMode(other.to_string())),
    };
    zenoh_config
        .insert_json5("mode", &mode)
        .map_err(|e| SessionError::Config(format!("mode: {}", e)))?;

    if !config.connect.is_empty() {
        let endpoints = serde_json::to_string(&config.connect)
            .map_err(|e| SessionError::Config(e.to_string()))?;
        zenoh_config
            .insert_json5("connect/endpoints", &endpoints)
            .map_err(|e| SessionError::Config(format!("connect endpoints: {}", e)))?;
    }

    if !config.listen.is_empty() {
        let endpoints = serde_json::to_string(&config.listen)
            .map_err(|e| SessionError::Config(e.to_string()))?;
        zenoh_config
            .insert_json5("listen/endpoints", &endpoints)
            .map_err(|e| SessionError::Config(format!("listen endpoints: {}", e)))?;
    }

    Ok(zenoh_config)
}

/// Connect to Zenoh using the provided configuration.
pub async fn connect(config: &ZenohConfig) -> Result<Session, SessionError> {
    let zenoh_config = zenoh_config(config)?;

    tracing::info!(
        mode = %config.mode,
        connect = ?config.connect,
        listen = ?config.listen,
        "Connecting to Zenoh"
    );

    let session = zenoh::open(zenoh_config)
        .await
        .map_err(|e| SessionError::Open(e.to_string()))?;

    tracing::info!(zid = %session.zid(), "Connected to Zenoh");

    Ok(session)
}
