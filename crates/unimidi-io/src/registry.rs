//! Which backends exist, and which get loaded.

use std::sync::Arc;
use tracing::{debug, warn};
use unimidi_core::Api;

use crate::backend::{Backend, DummyBackend};
use crate::config::Config;
use crate::error::{Error, Result};

/// Backends known to a [`MidiSystem`](crate::MidiSystem), in priority order.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: Vec<Arc<dyn Backend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The backends compiled into this build. Falls back to
    /// [`DummyBackend`] when there are none.
    pub fn platform() -> Self {
        let mut registry = Self::new();
        #[cfg(feature = "midi-io")]
        if let Some(native) = crate::backend::MidirBackend::native() {
            registry.register(native);
        }
        if registry.is_empty() {
            registry.register(DummyBackend);
        }
        registry
    }

    pub fn with(mut self, backend: impl Backend + 'static) -> Self {
        self.register(backend);
        self
    }

    /// Appends `backend`, or replaces one already registered for its API.
    pub fn register(&mut self, backend: impl Backend + 'static) {
        self.register_shared(Arc::new(backend));
    }

    pub fn register_shared(&mut self, backend: Arc<dyn Backend>) {
        let api = backend.api();
        match self.backends.iter_mut().find(|b| b.api() == api) {
            Some(existing) => {
                debug!("Replacing registered {} backend", api);
                *existing = backend;
            }
            None => self.backends.push(backend),
        }
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn get(&self, api: Api) -> Option<&Arc<dyn Backend>> {
        self.backends.iter().find(|b| b.api() == api)
    }

    /// APIs of every registered backend, in priority order.
    ///
    /// Fails if a backend reports [`Api::Unspecified`], which no real
    /// subsystem can be.
    pub fn compiled_apis(&self) -> Result<Vec<Api>> {
        self.backends
            .iter()
            .map(|b| match b.api() {
                Api::Unspecified => Err(Error::BackendQuery(
                    "backend reports an unspecified API".to_string(),
                )),
                api => Ok(api),
            })
            .collect()
    }

    /// True if any backend other than [`DummyBackend`] is registered.
    pub fn is_platform_supported(&self) -> bool {
        self.backends
            .iter()
            .any(|b| !matches!(b.api(), Api::Dummy | Api::Unspecified))
    }

    pub fn supports_virtual_ports(&self) -> bool {
        self.backends.iter().any(|b| b.supports_virtual_ports())
    }

    /// Orders backends by preference, drops disallowed ones, and runs each
    /// load hook. Backends whose hook fails are left out.
    pub(crate) fn load(&self, config: &Config) -> Vec<Arc<dyn Backend>> {
        let mut ordered: Vec<Arc<dyn Backend>> = Vec::with_capacity(self.backends.len());
        let preferred = config.preferred_apis.iter().filter_map(|&api| self.get(api));
        for backend in preferred.chain(self.backends.iter()) {
            if !ordered.iter().any(|b| b.api() == backend.api()) {
                ordered.push(backend.clone());
            }
        }

        ordered.retain(|backend| {
            let api = backend.api();
            if !api.is_specified() {
                warn!("Skipping backend that reports an unspecified API");
                return false;
            }
            if config.is_disallowed(api) {
                debug!("{} disallowed by configuration", api);
                return false;
            }
            match backend.load(&config.backend_search_paths) {
                Ok(()) => true,
                Err(e) => {
                    warn!("{} failed to load: {}", api, e);
                    false
                }
            }
        });
        ordered
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.backends.iter().map(|b| b.api()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{
        BackendError, BackendResult, InputClient, LoopbackBackend, OutputClient,
    };
    use std::path::PathBuf;

    struct Unnamed;

    impl Backend for Unnamed {
        fn api(&self) -> Api {
            Api::Unspecified
        }
        fn supports_virtual_ports(&self) -> bool {
            false
        }
        fn input_client(&self, _: &str) -> BackendResult<Box<dyn InputClient>> {
            Err(BackendError::Unavailable("unnamed".into()))
        }
        fn output_client(&self, _: &str) -> BackendResult<Box<dyn OutputClient>> {
            Err(BackendError::Unavailable("unnamed".into()))
        }
    }

    /// Needs a search path containing "lib" to load.
    struct NeedsLibrary(LoopbackBackend);

    impl Backend for NeedsLibrary {
        fn api(&self) -> Api {
            self.0.api()
        }
        fn supports_virtual_ports(&self) -> bool {
            false
        }
        fn load(&self, search_paths: &[PathBuf]) -> BackendResult<()> {
            if search_paths.iter().any(|p| p.ends_with("lib")) {
                Ok(())
            } else {
                Err(BackendError::Unavailable("library not found".into()))
            }
        }
        fn input_client(&self, name: &str) -> BackendResult<Box<dyn InputClient>> {
            self.0.input_client(name)
        }
        fn output_client(&self, name: &str) -> BackendResult<Box<dyn OutputClient>> {
            self.0.output_client(name)
        }
    }

    fn apis(backends: &[Arc<dyn Backend>]) -> Vec<Api> {
        backends.iter().map(|b| b.api()).collect()
    }

    #[test]
    fn test_platform_registry_is_never_empty() {
        let registry = BackendRegistry::platform();
        assert!(!registry.is_empty());
        assert!(registry.compiled_apis().is_ok());
    }

    #[test]
    fn test_dummy_only_is_unsupported_platform() {
        let registry = BackendRegistry::new().with(DummyBackend);
        assert!(!registry.is_platform_supported());
        assert!(BackendRegistry::new()
            .with(LoopbackBackend::new(Api::Alsa))
            .is_platform_supported());
    }

    #[test]
    fn test_compiled_apis_rejects_unspecified() {
        let registry = BackendRegistry::new().with(Unnamed);
        assert!(matches!(
            registry.compiled_apis(),
            Err(Error::BackendQuery(_))
        ));
        assert!(registry.load(&Config::default()).is_empty());
    }

    #[test]
    fn test_register_replaces_same_api() {
        let registry = BackendRegistry::new()
            .with(LoopbackBackend::new(Api::Alsa))
            .with(LoopbackBackend::new(Api::Jack))
            .with(LoopbackBackend::new(Api::Alsa).without_virtual_ports());
        assert_eq!(registry.compiled_apis().unwrap(), vec![Api::Alsa, Api::Jack]);
        assert!(!registry.get(Api::Alsa).unwrap().supports_virtual_ports());
    }

    #[test]
    fn test_load_orders_by_preference() {
        let registry = BackendRegistry::new()
            .with(LoopbackBackend::new(Api::Alsa))
            .with(LoopbackBackend::new(Api::Jack));
        let config = Config {
            preferred_apis: vec![Api::Jack, Api::CoreMidi],
            ..Config::default()
        };
        assert_eq!(apis(&registry.load(&config)), vec![Api::Jack, Api::Alsa]);
    }

    #[test]
    fn test_load_skips_disallowed() {
        let registry = BackendRegistry::new()
            .with(LoopbackBackend::new(Api::Jack))
            .with(LoopbackBackend::new(Api::Alsa));
        let config = Config {
            disallowed_apis: vec![Api::Jack],
            ..Config::default()
        };
        assert_eq!(apis(&registry.load(&config)), vec![Api::Alsa]);
    }

    #[test]
    fn test_load_hook_receives_search_paths() {
        let registry =
            BackendRegistry::new().with(NeedsLibrary(LoopbackBackend::new(Api::Jack)));
        assert!(registry.load(&Config::default()).is_empty());

        let config = Config {
            backend_search_paths: vec![PathBuf::from("/opt/jack/lib")],
            ..Config::default()
        };
        assert_eq!(apis(&registry.load(&config)), vec![Api::Jack]);
    }
}
