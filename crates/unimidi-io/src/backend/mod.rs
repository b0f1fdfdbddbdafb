//! Backend abstraction over OS MIDI subsystems.
//!
//! A [`Backend`] is a factory for short-lived clients. An input or output
//! client takes a snapshot of the ports visible at creation time, answers
//! name queries against that snapshot, and is consumed by `connect`.
//! Dropping a client without connecting releases its native resources.
//!
//! Native backends (via midir) are compiled in with the `midi-io` feature.
//! [`LoopbackBackend`] is an in-process bus that is always available and
//! [`DummyBackend`] fills in when nothing else is compiled.

mod dummy;
mod loopback;
#[cfg(feature = "midi-io")]
mod native;
mod sink;

pub use dummy::DummyBackend;
pub use loopback::LoopbackBackend;
#[cfg(feature = "midi-io")]
pub use native::MidirBackend;
pub use sink::{InputSink, TimedMessage};

use std::path::PathBuf;
use thiserror::Error;
use unimidi_core::Api;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Port {0} not found")]
    PortNotFound(usize),

    #[error("Port {index} is now '{found}', expected '{expected}'")]
    PortChanged {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("Virtual ports are not supported by this backend")]
    VirtualPortsUnsupported,

    #[error("Connection lost: {0}")]
    Disconnected(String),

    #[error("{0}")]
    Native(String),
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

#[cfg(feature = "midi-io")]
impl From<midir::InitError> for BackendError {
    fn from(e: midir::InitError) -> Self {
        BackendError::Unavailable(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::PortInfoError> for BackendError {
    fn from(e: midir::PortInfoError) -> Self {
        BackendError::Native(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::ConnectError<midir::MidiInput>> for BackendError {
    fn from(e: midir::ConnectError<midir::MidiInput>) -> Self {
        BackendError::Native(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::ConnectError<midir::MidiOutput>> for BackendError {
    fn from(e: midir::ConnectError<midir::MidiOutput>) -> Self {
        BackendError::Native(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::SendError> for BackendError {
    fn from(e: midir::SendError) -> Self {
        BackendError::Native(e.to_string())
    }
}

pub trait Backend: Send + Sync {
    fn api(&self) -> Api;

    fn supports_virtual_ports(&self) -> bool;

    /// Called once when a [`MidiSystem`](crate::MidiSystem) loads its
    /// backends. An error excludes the backend from that system.
    fn load(&self, search_paths: &[PathBuf]) -> BackendResult<()> {
        let _ = search_paths;
        Ok(())
    }

    fn input_client(&self, client_name: &str) -> BackendResult<Box<dyn InputClient>>;

    fn output_client(&self, client_name: &str) -> BackendResult<Box<dyn OutputClient>>;
}

/// Port queries against a client's snapshot.
pub trait PortQuery {
    fn port_count(&self) -> BackendResult<usize>;

    fn port_name(&self, index: usize) -> BackendResult<String>;
}

pub trait InputClient: PortQuery {
    fn connect(
        self: Box<Self>,
        index: usize,
        sink: InputSink,
    ) -> BackendResult<Box<dyn InputConnection>>;

    fn create_virtual(
        self: Box<Self>,
        name: &str,
        sink: InputSink,
    ) -> BackendResult<Box<dyn InputConnection>> {
        let _ = (name, sink);
        Err(BackendError::VirtualPortsUnsupported)
    }
}

pub trait OutputClient: PortQuery {
    fn connect(self: Box<Self>, index: usize) -> BackendResult<Box<dyn OutputConnection>>;

    fn create_virtual(self: Box<Self>, name: &str) -> BackendResult<Box<dyn OutputConnection>> {
        let _ = name;
        Err(BackendError::VirtualPortsUnsupported)
    }
}

/// A live input connection. Dropping it stops delivery to the sink.
pub trait InputConnection: Send {
    fn close(self: Box<Self>) {}
}

/// A live output connection. Dropping it closes the port.
pub trait OutputConnection: Send {
    fn send(&mut self, bytes: &[u8]) -> BackendResult<()>;

    fn close(self: Box<Self>) {}
}
