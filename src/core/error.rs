//! Error types for layergraph
//!
//! Defines the core error types used throughout the runtime. Construction
//! errors (duplicate ports, bad triggers) are raised synchronously; runtime
//! failures in user code are caught at the host boundary and surfaced here
//! too, via the `Other` variant.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LayerError {
    #[error("port '{0}' already exists")]
    DuplicatePort(String),

    #[error("port '{0}' does not exist")]
    UnknownPort(String),

    #[error("port '{0}' is frozen: subscribe() must happen before start_all()")]
    PortFrozen(String),

    #[error("invalid trigger configuration: {0}")]
    InvalidTrigger(String),

    #[error("input key '{0}' is already in use on this layer")]
    InputKeyCollision(String),

    #[error("layer '{0}' panicked: {1}")]
    LayerPanicked(String, String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type that uses [`LayerError`].
pub type Result<T> = std::result::Result<T, LayerError>;
