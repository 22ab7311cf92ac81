//! Error types for the keeper service

use hedge_core::HedgeError;
use hedge_simulation::SimulationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeeperError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Engine error: {0}")]
    Engine(#[from] HedgeError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] SimulationError),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result type using keeper errors
pub type KeeperResult<T> = std::result::Result<T, KeeperError>;

impl From<std::io::Error> for KeeperError {
    fn from(err: std::io::Error) -> Self {
        KeeperError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for KeeperError {
    fn from(err: serde_json::Error) -> Self {
        KeeperError::SerializationError(err.to_string())
    }
}

impl From<toml::de::Error> for KeeperError {
    fn from(err: toml::de::Error) -> Self {
        KeeperError::SerializationError(err.to_string())
    }
}

impl From<toml::ser::Error> for KeeperError {
    fn from(err: toml::ser::Error) -> Self {
        KeeperError::SerializationError(err.to_string())
    }
}
