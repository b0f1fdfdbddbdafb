//! Port enumeration.
//!
//! Each listing uses a throwaway client that is released before returning,
//! on success and on error alike.

use std::sync::Arc;
use tracing::debug;
use unimidi_core::{PortDescriptor, PortDirection};

use crate::backend::{Backend, BackendError, BackendResult, PortQuery};
use crate::error::{Error, Result};

/// Reads every port name from one client snapshot.
pub(crate) fn snapshot<Q: PortQuery + ?Sized>(
    query: &Q,
    direction: PortDirection,
) -> BackendResult<Vec<PortDescriptor>> {
    let count = query.port_count()?;
    (0..count)
        .map(|index| Ok(PortDescriptor::new(query.port_name(index)?, index, direction)))
        .collect()
}

/// Ports of one backend.
pub(crate) fn list_ports(
    backend: &dyn Backend,
    direction: PortDirection,
    client_name: &str,
) -> Result<Vec<PortDescriptor>> {
    let ports = match direction {
        PortDirection::Readable => {
            let client = backend.input_client(client_name).map_err(Error::Enumeration)?;
            snapshot(&*client, direction)
        }
        PortDirection::Writable => {
            let client = backend.output_client(client_name).map_err(Error::Enumeration)?;
            snapshot(&*client, direction)
        }
    }
    .map_err(Error::Enumeration)?;
    debug!("{} {} ports: {}", backend.api(), direction, ports.len());
    Ok(ports)
}

/// Ports of the default backend: the first loaded one that can create a
/// client.
pub(crate) fn list_default_ports(
    backends: &[Arc<dyn Backend>],
    direction: PortDirection,
    client_name: &str,
) -> Result<Vec<PortDescriptor>> {
    let mut last_error = None;
    for backend in backends {
        match list_ports(&**backend, direction, client_name) {
            Ok(ports) => return Ok(ports),
            // Client creation failed; the next backend becomes the default.
            Err(Error::Enumeration(e @ BackendError::Unavailable(_))) => {
                debug!("{} unavailable for enumeration: {}", backend.api(), e);
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(Error::Enumeration(last_error.unwrap_or_else(|| {
        BackendError::Unavailable("no MIDI backend loaded".to_string())
    })))
}
