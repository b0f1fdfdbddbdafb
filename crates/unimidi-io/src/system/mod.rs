//! The entry point: backend selection, enumeration and opening ports.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use unimidi_io::{MidiSystem, PortDirection, PortSelector};
//!
//! let midi = MidiSystem::global();
//! for port in midi.list_ports(PortDirection::Writable)? {
//!     println!("{port}");
//! }
//!
//! let mut out = midi.open_output(PortSelector::Default, None, None)?;
//! out.send_bytes(&[0x90, 0x3C, 0x7F])?;
//!
//! let input = midi.open_input(PortSelector::Virtual("Monitor".into()), None, None)?;
//! if let Some(msg) = input.receive(Some(Duration::from_millis(500)))? {
//!     println!("{msg:?}");
//! }
//! # Ok::<(), unimidi_io::Error>(())
//! ```

mod builder;

pub use builder::MidiSystemBuilder;

use arc_swap::ArcSwapOption;
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use unimidi_core::{Api, Codec, PortDescriptor, PortDirection};

use crate::backend::{Backend, BackendError, InputSink, PortQuery};
use crate::catalog;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::io::lease::{EndpointKey, LeaseTable};
use crate::io::{Endpoint, InputHandle, OutputHandle, PortSelector};
use crate::registry::BackendRegistry;

static GLOBAL: Lazy<MidiSystem> = Lazy::new(MidiSystem::new);

/// Owns backend selection and configuration for a set of handles.
///
/// Configuration can change until the first operation that needs a backend
/// (or an explicit [`load`](Self::load)); after that it is fixed and setters
/// return [`Error::ConfigurationLocked`]. Clone is cheap (Arc internally).
#[derive(Clone)]
pub struct MidiSystem {
    inner: Arc<MidiSystemInner>,
}

pub(crate) struct MidiSystemInner {
    registry: BackendRegistry,
    config: RwLock<Config>,
    /// Serializes loading against configuration changes.
    load_lock: Mutex<()>,
    loaded: ArcSwapOption<Vec<Arc<dyn Backend>>>,
    leases: LeaseTable,
}

enum Attempt {
    /// This backend could not do it; try the next one.
    Backend(BackendError),
    Fatal(Error),
}

impl From<BackendError> for Attempt {
    fn from(e: BackendError) -> Self {
        Attempt::Backend(e)
    }
}

impl Default for MidiSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MidiSystem {
    /// A system over the backends compiled into this build.
    pub fn new() -> Self {
        Self::from_parts(BackendRegistry::platform(), Config::default())
    }

    pub fn builder() -> MidiSystemBuilder {
        MidiSystemBuilder::default()
    }

    /// The process-wide system used when no explicit one is passed around.
    pub fn global() -> &'static MidiSystem {
        &GLOBAL
    }

    pub(crate) fn from_parts(registry: BackendRegistry, config: Config) -> Self {
        Self {
            inner: Arc::new(MidiSystemInner {
                registry,
                config: RwLock::new(config),
                load_lock: Mutex::new(()),
                loaded: ArcSwapOption::empty(),
                leases: LeaseTable::default(),
            }),
        }
    }

    // ==================== Configuration ====================

    pub fn config(&self) -> Config {
        self.inner.config.read().clone()
    }

    pub fn codec(&self) -> Codec {
        self.inner.config.read().codec()
    }

    /// Edits the configuration. Fails once backends are loaded.
    pub fn configure(&self, edit: impl FnOnce(&mut Config)) -> Result<()> {
        let _guard = self.inner.load_lock.lock();
        if self.is_loaded() {
            return Err(Error::ConfigurationLocked);
        }
        edit(&mut self.inner.config.write());
        Ok(())
    }

    pub fn set_preferred_apis(&self, apis: Vec<Api>) -> Result<()> {
        self.configure(|config| config.preferred_apis = apis)
    }

    pub fn set_allow_virtual_ports(&self, allow: bool) -> Result<()> {
        self.configure(|config| config.allow_virtual_ports = allow)
    }

    pub fn set_backend_search_paths(&self, paths: Vec<PathBuf>) -> Result<()> {
        self.configure(|config| config.backend_search_paths = paths)
    }

    pub fn disallow_api(&self, api: Api) -> Result<()> {
        self.configure(|config| {
            if !config.disallowed_apis.contains(&api) {
                config.disallowed_apis.push(api);
            }
        })
    }

    // ==================== Backends ====================

    /// Loads backends now instead of on first use.
    pub fn load(&self) {
        self.backends();
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.loaded.load().is_some()
    }

    /// Every backend built in, whether or not it loaded.
    pub fn compiled_apis(&self) -> Result<Vec<Api>> {
        self.inner.registry.compiled_apis()
    }

    /// Backends that passed configuration and loading, in the order they
    /// are tried.
    pub fn available_apis(&self) -> Vec<Api> {
        self.backends().iter().map(|b| b.api()).collect()
    }

    /// False when the only backend is the dummy one.
    pub fn is_platform_supported(&self) -> bool {
        self.inner.registry.is_platform_supported()
    }

    pub fn supports_virtual_ports(&self) -> bool {
        self.inner.config.read().allow_virtual_ports && self.inner.registry.supports_virtual_ports()
    }

    fn backends(&self) -> Arc<Vec<Arc<dyn Backend>>> {
        if let Some(backends) = self.inner.loaded.load_full() {
            return backends;
        }
        let _guard = self.inner.load_lock.lock();
        if let Some(backends) = self.inner.loaded.load_full() {
            return backends;
        }
        let config = self.inner.config.read().clone();
        let backends = Arc::new(self.inner.registry.load(&config));
        info!(
            "Loaded MIDI backends: {:?}",
            backends.iter().map(|b| b.api()).collect::<Vec<_>>()
        );
        self.inner.loaded.store(Some(backends.clone()));
        backends
    }

    fn loaded_backend(&self, api: Api) -> Result<Arc<dyn Backend>> {
        self.backends()
            .iter()
            .find(|b| b.api() == api)
            .cloned()
            .ok_or_else(|| Error::NoBackendAvailable(format!("{api} is not loaded")))
    }

    // ==================== Enumeration ====================

    /// Ports of the default backend.
    pub fn list_ports(&self, direction: PortDirection) -> Result<Vec<PortDescriptor>> {
        let client_name = self.inner.config.read().client_name.clone();
        catalog::list_default_ports(&self.backends(), direction, &client_name)
    }

    pub fn list_ports_for(&self, direction: PortDirection, api: Api) -> Result<Vec<PortDescriptor>> {
        let backend = self.loaded_backend(api)?;
        let client_name = self.inner.config.read().client_name.clone();
        catalog::list_ports(&*backend, direction, &client_name)
    }

    pub fn input_ports(&self) -> Result<Vec<PortDescriptor>> {
        self.list_ports(PortDirection::Readable)
    }

    pub fn output_ports(&self) -> Result<Vec<PortDescriptor>> {
        self.list_ports(PortDirection::Writable)
    }

    // ==================== Opening ====================

    /// Opens an input.
    ///
    /// With `api` unset every loaded backend is tried in order and the first
    /// that opens the port wins. `client_name` defaults to the configured one.
    pub fn open_input(
        &self,
        selector: PortSelector,
        api: Option<Api>,
        client_name: Option<&str>,
    ) -> Result<InputHandle> {
        check_direction(&selector, PortDirection::Readable)?;
        let config = self.config();
        let client_name = client_name.unwrap_or(&config.client_name);
        let candidates = self.candidates(api, &selector)?;

        let mut failures = Vec::new();
        for backend in &candidates {
            match self.try_open_input(&**backend, &selector, client_name, &config) {
                Ok(handle) => return Ok(handle),
                Err(Attempt::Fatal(e)) => return Err(e),
                Err(Attempt::Backend(e)) => {
                    debug!("{} could not open input: {}", backend.api(), e);
                    failures.push(format!("{}: {}", backend.api(), e));
                }
            }
        }
        Err(Error::NoBackendAvailable(failures.join("; ")))
    }

    /// Opens an output. Backend selection works as in
    /// [`open_input`](Self::open_input).
    pub fn open_output(
        &self,
        selector: PortSelector,
        api: Option<Api>,
        client_name: Option<&str>,
    ) -> Result<OutputHandle> {
        check_direction(&selector, PortDirection::Writable)?;
        let config = self.config();
        let client_name = client_name.unwrap_or(&config.client_name);
        let candidates = self.candidates(api, &selector)?;

        let mut failures = Vec::new();
        for backend in &candidates {
            match self.try_open_output(&**backend, &selector, client_name, &config) {
                Ok(handle) => return Ok(handle),
                Err(Attempt::Fatal(e)) => return Err(e),
                Err(Attempt::Backend(e)) => {
                    debug!("{} could not open output: {}", backend.api(), e);
                    failures.push(format!("{}: {}", backend.api(), e));
                }
            }
        }
        Err(Error::NoBackendAvailable(failures.join("; ")))
    }

    fn candidates(&self, api: Option<Api>, selector: &PortSelector) -> Result<Vec<Arc<dyn Backend>>> {
        let mut candidates = match api.filter(|api| api.is_specified()) {
            Some(api) => vec![self.loaded_backend(api)?],
            None => self.backends().to_vec(),
        };
        if candidates.is_empty() {
            return Err(Error::NoBackendAvailable("no MIDI backend loaded".to_string()));
        }

        if let PortSelector::Virtual(_) = selector {
            if !self.inner.config.read().allow_virtual_ports {
                return Err(Error::UnsupportedOperation(
                    "virtual ports are disabled by configuration".to_string(),
                ));
            }
            candidates.retain(|b| b.supports_virtual_ports());
            if candidates.is_empty() {
                return Err(Error::UnsupportedOperation(
                    "no loaded backend supports virtual ports".to_string(),
                ));
            }
        }
        Ok(candidates)
    }

    fn try_open_input(
        &self,
        backend: &dyn Backend,
        selector: &PortSelector,
        client_name: &str,
        config: &Config,
    ) -> std::result::Result<InputHandle, Attempt> {
        let api = backend.api();
        let client = backend.input_client(client_name)?;
        let endpoint = resolve(&*client, selector, PortDirection::Readable)?;
        let lease = self
            .inner
            .leases
            .acquire(EndpointKey::new(api, PortDirection::Readable, &endpoint))
            .map_err(Attempt::Fatal)?;

        let (sink, receiver) = InputSink::new(
            format!("{api} {endpoint}"),
            config.codec(),
            config.ignore,
            config.input_queue_size,
        );
        let connection = match &endpoint {
            Endpoint::Port(port) => client.connect(port.index, sink.clone())?,
            Endpoint::Virtual(name) => client.create_virtual(name, sink.clone())?,
        };
        Ok(InputHandle::new(api, endpoint, connection, lease, sink, receiver))
    }

    fn try_open_output(
        &self,
        backend: &dyn Backend,
        selector: &PortSelector,
        client_name: &str,
        config: &Config,
    ) -> std::result::Result<OutputHandle, Attempt> {
        let api = backend.api();
        let client = backend.output_client(client_name)?;
        let endpoint = resolve(&*client, selector, PortDirection::Writable)?;
        let lease = self
            .inner
            .leases
            .acquire(EndpointKey::new(api, PortDirection::Writable, &endpoint))
            .map_err(Attempt::Fatal)?;

        let connection = match &endpoint {
            Endpoint::Port(port) => client.connect(port.index)?,
            Endpoint::Virtual(name) => client.create_virtual(name)?,
        };
        Ok(OutputHandle::new(api, endpoint, config.codec(), connection, lease))
    }
}

fn check_direction(selector: &PortSelector, direction: PortDirection) -> Result<()> {
    match selector {
        PortSelector::Port(port) if port.direction != direction => Err(Error::UnsupportedOperation(
            format!("{} is not a {} port", port, direction),
        )),
        _ => Ok(()),
    }
}

/// Turns a selector into a concrete endpoint against the client's snapshot.
fn resolve<Q: PortQuery + ?Sized>(
    client: &Q,
    selector: &PortSelector,
    direction: PortDirection,
) -> std::result::Result<Endpoint, BackendError> {
    match selector {
        PortSelector::Default => {
            if client.port_count()? == 0 {
                return Err(BackendError::PortNotFound(0));
            }
            let name = client.port_name(0)?;
            Ok(Endpoint::Port(PortDescriptor::new(name, 0, direction)))
        }
        PortSelector::Port(port) => {
            let found = client.port_name(port.index)?;
            if found != port.name {
                return Err(BackendError::PortChanged {
                    index: port.index,
                    expected: port.name.clone(),
                    found,
                });
            }
            Ok(Endpoint::Port(port.clone()))
        }
        PortSelector::Virtual(name) => Ok(Endpoint::Virtual(name.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LoopbackBackend;
    use crate::config::IgnoreTypes;
    use std::time::Duration;
    use unimidi_core::MidiMessage;

    fn system(bus: &LoopbackBackend) -> MidiSystem {
        MidiSystem::builder()
            .backend(bus.clone())
            .ignore_types(IgnoreTypes::NONE)
            .build()
            .unwrap()
    }

    #[test]
    fn test_lazy_load_on_first_use() {
        let bus = LoopbackBackend::with_ports(Api::Alsa, ["Cable"]);
        let midi = system(&bus);
        assert!(!midi.is_loaded());
        midi.list_ports(PortDirection::Readable).unwrap();
        assert!(midi.is_loaded());
    }

    #[test]
    fn test_config_locked_after_load() {
        let bus = LoopbackBackend::new(Api::Alsa);
        let midi = system(&bus);
        midi.set_allow_virtual_ports(true).unwrap();
        midi.load();
        assert!(matches!(
            midi.set_allow_virtual_ports(false),
            Err(Error::ConfigurationLocked)
        ));
        assert!(midi.supports_virtual_ports());
        assert!(midi.config().allow_virtual_ports);
    }

    #[test]
    fn test_virtual_disabled_by_config() {
        let bus = LoopbackBackend::new(Api::Alsa);
        let midi = system(&bus);
        midi.set_allow_virtual_ports(false).unwrap();
        assert!(!midi.supports_virtual_ports());
        assert!(matches!(
            midi.open_output(PortSelector::Virtual("Out".into()), None, None),
            Err(Error::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_stale_descriptor_is_refused() {
        let bus = LoopbackBackend::with_ports(Api::Alsa, ["First", "Second"]);
        let midi = system(&bus);
        let ports = midi.output_ports().unwrap();
        let second = ports[1].clone();

        bus.remove_port("First");
        let err = midi
            .open_output(second.into(), Some(Api::Alsa), None)
            .unwrap_err();
        assert!(matches!(err, Error::NoBackendAvailable(_)));
        assert_eq!(bus.open_clients(), 0);
    }

    #[test]
    fn test_direction_mismatch_is_unsupported() {
        let bus = LoopbackBackend::with_ports(Api::Alsa, ["Cable"]);
        let midi = system(&bus);
        let input_port = midi.input_ports().unwrap().remove(0);
        assert!(matches!(
            midi.open_output(input_port.into(), None, None),
            Err(Error::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_second_open_is_busy() {
        let bus = LoopbackBackend::with_ports(Api::Alsa, ["Synth"]);
        let midi = system(&bus);
        let first = midi.open_output(PortSelector::Default, None, None).unwrap();
        assert!(matches!(
            midi.open_output(PortSelector::Default, None, None),
            Err(Error::PortBusy { .. })
        ));
        drop(first);
        assert!(midi.open_output(PortSelector::Default, None, None).is_ok());
    }

    #[test]
    fn test_send_bytes_validates_before_sending() {
        let bus = LoopbackBackend::with_ports(Api::Alsa, ["Cable"]);
        let midi = system(&bus);
        let input = midi.open_input(PortSelector::Default, None, None).unwrap();
        let mut output = midi.open_output(PortSelector::Default, None, None).unwrap();

        assert!(matches!(
            output.send_bytes(&[0x90, 0x3C]),
            Err(Error::MalformedMessage(_))
        ));
        output.send(&MidiMessage::control_change(0, 7, 100)).unwrap();

        let msg = input.receive(Some(Duration::from_millis(100))).unwrap();
        assert_eq!(msg, Some(MidiMessage::control_change(0, 7, 100)));
        assert_eq!(input.receive(None).unwrap(), None);
    }

    #[test]
    fn test_explicit_api_must_be_loaded() {
        let bus = LoopbackBackend::with_ports(Api::Alsa, ["Cable"]);
        let midi = system(&bus);
        assert!(matches!(
            midi.open_output(PortSelector::Default, Some(Api::Jack), None),
            Err(Error::NoBackendAvailable(_))
        ));
        assert!(matches!(
            midi.list_ports_for(PortDirection::Readable, Api::Jack),
            Err(Error::NoBackendAvailable(_))
        ));
    }
}
