//! Placeholder backend for builds without any OS backend.

use unimidi_core::Api;

use super::{
    Backend, BackendError, BackendResult, InputClient, InputConnection, InputSink, OutputClient,
    OutputConnection, PortQuery,
};

/// Reports no ports and refuses every connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct DummyBackend;

impl Backend for DummyBackend {
    fn api(&self) -> Api {
        Api::Dummy
    }

    fn supports_virtual_ports(&self) -> bool {
        false
    }

    fn input_client(&self, _client_name: &str) -> BackendResult<Box<dyn InputClient>> {
        Ok(Box::new(NoPorts))
    }

    fn output_client(&self, _client_name: &str) -> BackendResult<Box<dyn OutputClient>> {
        Ok(Box::new(NoPorts))
    }
}

struct NoPorts;

impl PortQuery for NoPorts {
    fn port_count(&self) -> BackendResult<usize> {
        Ok(0)
    }

    fn port_name(&self, index: usize) -> BackendResult<String> {
        Err(BackendError::PortNotFound(index))
    }
}

impl InputClient for NoPorts {
    fn connect(
        self: Box<Self>,
        index: usize,
        _sink: InputSink,
    ) -> BackendResult<Box<dyn InputConnection>> {
        Err(BackendError::PortNotFound(index))
    }
}

impl OutputClient for NoPorts {
    fn connect(self: Box<Self>, index: usize) -> BackendResult<Box<dyn OutputConnection>> {
        Err(BackendError::PortNotFound(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dummy_has_no_ports() {
        let backend = DummyBackend;
        assert_eq!(backend.api(), Api::Dummy);
        assert!(!backend.supports_virtual_ports());

        let client = backend.output_client("test").unwrap();
        assert_eq!(client.port_count().unwrap(), 0);
        assert_eq!(client.port_name(0), Err(BackendError::PortNotFound(0)));
        assert!(client.connect(0).is_err());
    }
}
