//! Input handles: a connection plus the queue its sink feeds.

use crossbeam_channel::{select, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;
use unimidi_core::{Api, MidiMessage, PortDescriptor};

use super::lease::Lease;
use super::Endpoint;
use crate::backend::{InputConnection, InputSink, TimedMessage};
use crate::config::IgnoreTypes;
use crate::error::{Error, Result};

/// An open MIDI input.
///
/// All methods take `&self`, so a handle can be shared between a thread
/// blocked in [`receive`](Self::receive) and one that calls
/// [`close`](Self::close); closing wakes the blocked receiver.
pub struct InputHandle {
    api: Api,
    endpoint: Endpoint,
    receiver: Receiver<TimedMessage>,
    sink: InputSink,
    closed: AtomicBool,
    open: Mutex<Option<OpenInput>>,
    closed_signal: Receiver<()>,
}

struct OpenInput {
    connection: Box<dyn InputConnection>,
    _lease: Lease,
    // Dropped on close, which disconnects `closed_signal`.
    _close_tx: Sender<()>,
}

impl InputHandle {
    pub(crate) fn new(
        api: Api,
        endpoint: Endpoint,
        connection: Box<dyn InputConnection>,
        lease: Lease,
        sink: InputSink,
        receiver: Receiver<TimedMessage>,
    ) -> Self {
        let (close_tx, closed_signal) = crossbeam_channel::bounded(0);
        debug!("Opened {} input {}", api, endpoint);
        Self {
            api,
            endpoint,
            receiver,
            sink,
            closed: AtomicBool::new(false),
            open: Mutex::new(Some(OpenInput {
                connection,
                _lease: lease,
                _close_tx: close_tx,
            })),
            closed_signal,
        }
    }

    pub fn api(&self) -> Result<Api> {
        self.ensure_open()?;
        Ok(self.api)
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn port_name(&self) -> &str {
        self.endpoint.name()
    }

    /// The enumerated port, or `None` for a virtual one.
    pub fn descriptor(&self) -> Option<&PortDescriptor> {
        match &self.endpoint {
            Endpoint::Port(port) => Some(port),
            Endpoint::Virtual(_) => None,
        }
    }

    pub fn is_virtual(&self) -> bool {
        self.endpoint.is_virtual()
    }

    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    /// Next message, without its timestamp.
    ///
    /// `None` or a zero timeout polls without blocking. Otherwise waits up to
    /// `timeout` and returns `Ok(None)` if nothing arrived.
    pub fn receive(&self, timeout: Option<Duration>) -> Result<Option<MidiMessage>> {
        Ok(self.receive_timed(timeout)?.map(|timed| timed.message))
    }

    pub fn receive_timed(&self, timeout: Option<Duration>) -> Result<Option<TimedMessage>> {
        self.ensure_open()?;
        match timeout.filter(|t| !t.is_zero()) {
            None => match self.receiver.try_recv() {
                Ok(timed) => Ok(Some(timed)),
                Err(TryRecvError::Empty) => Ok(None),
                Err(TryRecvError::Disconnected) => Err(Error::HandleClosed),
            },
            Some(timeout) => select! {
                recv(self.receiver) -> timed => timed.map(Some).map_err(|_| Error::HandleClosed),
                recv(self.closed_signal) -> _ => Err(Error::HandleClosed),
                default(timeout) => Ok(None),
            },
        }
    }

    /// Messages already queued, without blocking.
    pub fn drain(&self) -> Result<Vec<TimedMessage>> {
        self.ensure_open()?;
        Ok(self.receiver.try_iter().collect())
    }

    pub fn ignore_types(&self) -> IgnoreTypes {
        self.sink.ignore_types()
    }

    /// Applies to messages arriving from now on. Already queued ones stay.
    pub fn set_ignore_types(&self, ignore: IgnoreTypes) -> Result<()> {
        self.ensure_open()?;
        self.sink.set_ignore_types(ignore);
        Ok(())
    }

    /// Messages lost because the queue was full.
    pub fn dropped_count(&self) -> u64 {
        self.sink.dropped_count()
    }

    /// Byte sequences from the driver that failed validation.
    pub fn malformed_count(&self) -> u64 {
        self.sink.malformed_count()
    }

    /// Releases the port. Safe to call more than once.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(open) = self.open.lock().take() {
            open.connection.close();
            debug!("Closed {} input {}", self.api, self.endpoint);
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(Error::HandleClosed)
        } else {
            Ok(())
        }
    }
}

impl Drop for InputHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for InputHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputHandle")
            .field("api", &self.api)
            .field("endpoint", &self.endpoint)
            .field("open", &self.is_open())
            .finish()
    }
}
