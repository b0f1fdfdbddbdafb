//! In-process MIDI bus.
//!
//! Every port on the bus is a cable: bytes sent to it by an output handle
//! arrive at every input handle connected to it. Virtual ports are one-sided,
//! like their OS counterparts: a virtual output shows up as a readable port,
//! a virtual input as a writable one.
//!
//! Useful for tests, for routing between parts of one application, and for
//! simulating backend conditions (server down, device unplugged) that are
//! hard to produce with real drivers.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;
use unimidi_core::{Api, PortDirection};

use super::{
    Backend, BackendError, BackendResult, InputClient, InputConnection, InputSink, OutputClient,
    OutputConnection, PortQuery,
};

/// Cloning shares the bus.
#[derive(Clone)]
pub struct LoopbackBackend {
    api: Api,
    virtual_ports: bool,
    bus: Arc<Bus>,
}

struct Bus {
    ports: Mutex<Vec<BusPort>>,
    online: AtomicBool,
    next_id: AtomicU64,
    live_clients: AtomicUsize,
    epoch: Instant,
}

struct BusPort {
    id: u64,
    name: String,
    readable: bool,
    writable: bool,
    listeners: Vec<(u64, InputSink)>,
}

impl Bus {
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn check_online(&self) -> BackendResult<()> {
        if self.online.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(BackendError::Unavailable("loopback bus is offline".to_string()))
        }
    }

    fn add_port(&self, name: String, readable: bool, writable: bool) -> u64 {
        let id = self.next_id();
        self.ports.lock().push(BusPort {
            id,
            name,
            readable,
            writable,
            listeners: Vec::new(),
        });
        id
    }

    fn remove_port_id(&self, id: u64) {
        self.ports.lock().retain(|p| p.id != id);
    }
}

impl LoopbackBackend {
    /// An empty bus reporting itself as `api`.
    pub fn new(api: Api) -> Self {
        Self {
            api,
            virtual_ports: true,
            bus: Arc::new(Bus {
                ports: Mutex::new(Vec::new()),
                online: AtomicBool::new(true),
                next_id: AtomicU64::new(1),
                live_clients: AtomicUsize::new(0),
                epoch: Instant::now(),
            }),
        }
    }

    pub fn with_ports<I, S>(api: Api, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let backend = Self::new(api);
        for name in names {
            backend.add_port(name);
        }
        backend
    }

    pub fn without_virtual_ports(mut self) -> Self {
        self.virtual_ports = false;
        self
    }

    /// Plugs in a cable port, visible for both reading and writing.
    pub fn add_port(&self, name: impl Into<String>) {
        let name = name.into();
        debug!("Loopback {}: plugged '{}'", self.api, name);
        self.bus.add_port(name, true, true);
    }

    /// Unplugs every port called `name`. Returns whether any existed.
    pub fn remove_port(&self, name: &str) -> bool {
        let mut ports = self.bus.ports.lock();
        let before = ports.len();
        ports.retain(|p| p.name != name);
        debug!("Loopback {}: unplugged '{}'", self.api, name);
        ports.len() != before
    }

    /// Takes the bus offline. New clients fail and sends are refused,
    /// the way a stopped JACK server behaves.
    pub fn set_online(&self, online: bool) {
        self.bus.online.store(online, Ordering::Release);
    }

    /// Clients created but not yet connected or dropped.
    pub fn open_clients(&self) -> usize {
        self.bus.live_clients.load(Ordering::Acquire)
    }

    pub fn port_names(&self, direction: PortDirection) -> Vec<String> {
        self.bus
            .ports
            .lock()
            .iter()
            .filter(|p| visible(p, direction))
            .map(|p| p.name.clone())
            .collect()
    }

    fn snapshot(&self, direction: PortDirection) -> BackendResult<Snapshot> {
        self.bus.check_online()?;
        let ports = self
            .bus
            .ports
            .lock()
            .iter()
            .filter(|p| visible(p, direction))
            .map(|p| (p.id, p.name.clone()))
            .collect();
        self.bus.live_clients.fetch_add(1, Ordering::AcqRel);
        Ok(Snapshot {
            bus: self.bus.clone(),
            ports,
        })
    }
}

fn visible(port: &BusPort, direction: PortDirection) -> bool {
    match direction {
        PortDirection::Readable => port.readable,
        PortDirection::Writable => port.writable,
    }
}

impl Backend for LoopbackBackend {
    fn api(&self) -> Api {
        self.api
    }

    fn supports_virtual_ports(&self) -> bool {
        self.virtual_ports
    }

    fn input_client(&self, _client_name: &str) -> BackendResult<Box<dyn InputClient>> {
        Ok(Box::new(LoopbackInputClient(
            self.snapshot(PortDirection::Readable)?,
            self.virtual_ports,
        )))
    }

    fn output_client(&self, _client_name: &str) -> BackendResult<Box<dyn OutputClient>> {
        Ok(Box::new(LoopbackOutputClient(
            self.snapshot(PortDirection::Writable)?,
            self.virtual_ports,
        )))
    }
}

/// Ports visible when a client was created.
struct Snapshot {
    bus: Arc<Bus>,
    ports: Vec<(u64, String)>,
}

impl Snapshot {
    fn port_id(&self, index: usize) -> BackendResult<u64> {
        let &(id, _) = self.ports.get(index).ok_or(BackendError::PortNotFound(index))?;
        if self.bus.ports.lock().iter().any(|p| p.id == id) {
            Ok(id)
        } else {
            Err(BackendError::Disconnected(format!("port {index} was unplugged")))
        }
    }
}

impl PortQuery for Snapshot {
    fn port_count(&self) -> BackendResult<usize> {
        Ok(self.ports.len())
    }

    fn port_name(&self, index: usize) -> BackendResult<String> {
        self.ports
            .get(index)
            .map(|(_, name)| name.clone())
            .ok_or(BackendError::PortNotFound(index))
    }
}

impl Drop for Snapshot {
    fn drop(&mut self) {
        self.bus.live_clients.fetch_sub(1, Ordering::AcqRel);
    }
}

struct LoopbackInputClient(Snapshot, bool);

impl PortQuery for LoopbackInputClient {
    fn port_count(&self) -> BackendResult<usize> {
        self.0.port_count()
    }

    fn port_name(&self, index: usize) -> BackendResult<String> {
        self.0.port_name(index)
    }
}

impl InputClient for LoopbackInputClient {
    fn connect(
        self: Box<Self>,
        index: usize,
        sink: InputSink,
    ) -> BackendResult<Box<dyn InputConnection>> {
        let port = self.0.port_id(index)?;
        let bus = self.0.bus.clone();
        let id = bus.next_id();
        if let Some(p) = bus.ports.lock().iter_mut().find(|p| p.id == port) {
            p.listeners.push((id, sink));
        }
        Ok(Box::new(LoopbackInput {
            bus,
            id,
            owned_port: None,
        }))
    }

    fn create_virtual(
        self: Box<Self>,
        name: &str,
        sink: InputSink,
    ) -> BackendResult<Box<dyn InputConnection>> {
        if !self.1 {
            return Err(BackendError::VirtualPortsUnsupported);
        }
        let bus = self.0.bus.clone();
        let port = bus.add_port(name.to_string(), false, true);
        let id = bus.next_id();
        if let Some(p) = bus.ports.lock().iter_mut().find(|p| p.id == port) {
            p.listeners.push((id, sink));
        }
        Ok(Box::new(LoopbackInput {
            bus,
            id,
            owned_port: Some(port),
        }))
    }
}

struct LoopbackInput {
    bus: Arc<Bus>,
    id: u64,
    owned_port: Option<u64>,
}

impl InputConnection for LoopbackInput {}

impl Drop for LoopbackInput {
    fn drop(&mut self) {
        {
            let mut ports = self.bus.ports.lock();
            for port in ports.iter_mut() {
                port.listeners.retain(|(id, _)| *id != self.id);
            }
        }
        if let Some(port) = self.owned_port {
            self.bus.remove_port_id(port);
        }
    }
}

struct LoopbackOutputClient(Snapshot, bool);

impl PortQuery for LoopbackOutputClient {
    fn port_count(&self) -> BackendResult<usize> {
        self.0.port_count()
    }

    fn port_name(&self, index: usize) -> BackendResult<String> {
        self.0.port_name(index)
    }
}

impl OutputClient for LoopbackOutputClient {
    fn connect(self: Box<Self>, index: usize) -> BackendResult<Box<dyn OutputConnection>> {
        let port = self.0.port_id(index)?;
        Ok(Box::new(LoopbackOutput {
            bus: self.0.bus.clone(),
            port,
            owned: false,
        }))
    }

    fn create_virtual(self: Box<Self>, name: &str) -> BackendResult<Box<dyn OutputConnection>> {
        if !self.1 {
            return Err(BackendError::VirtualPortsUnsupported);
        }
        let bus = self.0.bus.clone();
        let port = bus.add_port(name.to_string(), true, false);
        Ok(Box::new(LoopbackOutput {
            bus,
            port,
            owned: true,
        }))
    }
}

struct LoopbackOutput {
    bus: Arc<Bus>,
    port: u64,
    owned: bool,
}

impl OutputConnection for LoopbackOutput {
    fn send(&mut self, bytes: &[u8]) -> BackendResult<()> {
        if !self.bus.online.load(Ordering::Acquire) {
            return Err(BackendError::Disconnected("loopback bus is offline".to_string()));
        }
        let sinks: Vec<InputSink> = {
            let ports = self.bus.ports.lock();
            let port = ports
                .iter()
                .find(|p| p.id == self.port)
                .ok_or_else(|| BackendError::Disconnected("port was unplugged".to_string()))?;
            port.listeners.iter().map(|(_, sink)| sink.clone()).collect()
        };
        let stamp = self.bus.epoch.elapsed().as_micros() as u64;
        for sink in sinks {
            sink.deliver(Some(stamp), bytes);
        }
        Ok(())
    }
}

impl Drop for LoopbackOutput {
    fn drop(&mut self) {
        if self.owned {
            self.bus.remove_port_id(self.port);
        }
    }
}
