//! Error types for the MIDI I/O subsystem.

use thiserror::Error;
use unimidi_core::{Api, MessageError, PortDirection};

use crate::backend::BackendError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Backend query failed: {0}")]
    BackendQuery(String),

    #[error("Port enumeration failed: {0}")]
    Enumeration(#[source] BackendError),

    #[error("Malformed MIDI message: {0}")]
    MalformedMessage(#[from] MessageError),

    #[error("No MIDI backend available: {0}")]
    NoBackendAvailable(String),

    #[error("Transmit failed: {0}")]
    Transmit(#[source] BackendError),

    #[error("Handle is closed")]
    HandleClosed,

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Configuration is locked once backends are loaded")]
    ConfigurationLocked,

    #[error("{direction} port '{name}' on {api} is already open")]
    PortBusy {
        api: Api,
        direction: PortDirection,
        name: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
