//! Output handles.

use tracing::debug;
use unimidi_core::{Api, Codec, MessageError, MidiMessage, PortDescriptor};

use super::lease::Lease;
use super::Endpoint;
use crate::backend::OutputConnection;
use crate::error::{Error, Result};

/// An open MIDI output.
pub struct OutputHandle {
    api: Api,
    endpoint: Endpoint,
    codec: Codec,
    open: Option<OpenOutput>,
}

struct OpenOutput {
    connection: Box<dyn OutputConnection>,
    _lease: Lease,
}

impl OutputHandle {
    pub(crate) fn new(
        api: Api,
        endpoint: Endpoint,
        codec: Codec,
        connection: Box<dyn OutputConnection>,
        lease: Lease,
    ) -> Self {
        debug!("Opened {} output {}", api, endpoint);
        Self {
            api,
            endpoint,
            codec,
            open: Some(OpenOutput {
                connection,
                _lease: lease,
            }),
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
        self.open.is_some()
    }

    /// Sends one message. A transmit failure leaves the handle open.
    ///
    /// SysEx longer than the configured limit is refused before it reaches
    /// the backend.
    pub fn send(&mut self, message: &MidiMessage) -> Result<()> {
        let open = self.open.as_mut().ok_or(Error::HandleClosed)?;
        if message.is_sysex() && message.len() > self.codec.max_sysex_len {
            return Err(MessageError::SysExTooLong {
                len: message.len(),
                max: self.codec.max_sysex_len,
            }
            .into());
        }
        open.connection.send(message.as_bytes()).map_err(|e| {
            debug!("Send on {} failed: {}", self.endpoint, e);
            Error::Transmit(e)
        })
    }

    /// Validates `bytes` as one complete message, then sends it.
    pub fn send_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.ensure_open()?;
        let message = self.codec.encode(bytes)?;
        self.send(&message)
    }

    /// Releases the port. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(open) = self.open.take() {
            open.connection.close();
            debug!("Closed {} output {}", self.api, self.endpoint);
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open.is_some() {
            Ok(())
        } else {
            Err(Error::HandleClosed)
        }
    }
}

impl Drop for OutputHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for OutputHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputHandle")
            .field("api", &self.api)
            .field("endpoint", &self.endpoint)
            .field("open", &self.is_open())
            .finish()
    }
}
