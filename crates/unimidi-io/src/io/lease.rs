//! Exclusive claims on endpoints.
//!
//! A port may be opened by at most one handle per system at a time. Each
//! open handle holds a [`Lease`]; dropping it frees the endpoint.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use unimidi_core::{Api, PortDirection};

use super::Endpoint;
use crate::error::{Error, Result};

/// Identity of an open endpoint. Enumerated ports are told apart by index,
/// since identical devices often share a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct EndpointKey {
    pub api: Api,
    pub direction: PortDirection,
    pub index: Option<usize>,
    pub name: String,
}

impl EndpointKey {
    pub fn new(api: Api, direction: PortDirection, endpoint: &Endpoint) -> Self {
        let index = match endpoint {
            Endpoint::Port(port) => Some(port.index),
            Endpoint::Virtual(_) => None,
        };
        Self {
            api,
            direction,
            index,
            name: endpoint.name().to_string(),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub(crate) struct LeaseTable {
    held: Arc<DashMap<EndpointKey, ()>>,
}

impl LeaseTable {
    pub fn acquire(&self, key: EndpointKey) -> Result<Lease> {
        match self.held.entry(key.clone()) {
            Entry::Occupied(_) => Err(Error::PortBusy {
                api: key.api,
                direction: key.direction,
                name: key.name,
            }),
            Entry::Vacant(slot) => {
                slot.insert(());
                Ok(Lease {
                    table: self.held.clone(),
                    key,
                })
            }
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.held.len()
    }
}

#[derive(Debug)]
pub(crate) struct Lease {
    table: Arc<DashMap<EndpointKey, ()>>,
    key: EndpointKey,
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.table.remove(&self.key);
    }
}
