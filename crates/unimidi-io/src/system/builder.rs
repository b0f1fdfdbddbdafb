//! MidiSystem builder for configuring backends and defaults.

use std::path::PathBuf;
use unimidi_core::{Api, Strictness};

use crate::backend::Backend;
use crate::config::{Config, IgnoreTypes};
use crate::error::Result;
use crate::registry::BackendRegistry;

use super::MidiSystem;

#[derive(Debug, Default)]
pub struct MidiSystemBuilder {
    pub(super) registry: Option<BackendRegistry>,
    pub(super) config: Config,
}

impl MidiSystemBuilder {
    /// Adds a backend. Once any backend is added the platform backends are
    /// no longer registered implicitly.
    pub fn backend(mut self, backend: impl Backend + 'static) -> Self {
        self.registry
            .get_or_insert_with(BackendRegistry::new)
            .register(backend);
        self
    }

    pub fn registry(mut self, registry: BackendRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn preferred_apis(mut self, apis: impl IntoIterator<Item = Api>) -> Self {
        self.config.preferred_apis = apis.into_iter().collect();
        self
    }

    pub fn disallow_api(mut self, api: Api) -> Self {
        if !self.config.disallowed_apis.contains(&api) {
            self.config.disallowed_apis.push(api);
        }
        self
    }

    pub fn allow_virtual_ports(mut self, allow: bool) -> Self {
        self.config.allow_virtual_ports = allow;
        self
    }

    pub fn backend_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.backend_search_paths.push(path.into());
        self
    }

    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.config.client_name = name.into();
        self
    }

    pub fn strictness(mut self, strictness: Strictness) -> Self {
        self.config.strictness = strictness;
        self
    }

    pub fn max_sysex_len(mut self, len: usize) -> Self {
        self.config.max_sysex_len = len;
        self
    }

    pub fn input_queue_size(mut self, size: usize) -> Self {
        self.config.input_queue_size = size;
        self
    }

    pub fn ignore_types(mut self, ignore: IgnoreTypes) -> Self {
        self.config.ignore = ignore;
        self
    }

    /// Fails if a registered backend cannot report its API.
    pub fn build(self) -> Result<MidiSystem> {
        let registry = self.registry.unwrap_or_else(BackendRegistry::platform);
        registry.compiled_apis()?;
        Ok(MidiSystem::from_parts(registry, self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DummyBackend, LoopbackBackend};
    use crate::Error;

    #[test]
    fn test_default_build() {
        let midi = MidiSystemBuilder::default().build().unwrap();
        assert!(!midi.is_loaded());
        assert!(!midi.compiled_apis().unwrap().is_empty());
        assert_eq!(midi.config(), Config::default());
    }

    #[test]
    fn test_build_with_backends() {
        let midi = MidiSystem::builder()
            .backend(LoopbackBackend::new(Api::Alsa))
            .backend(LoopbackBackend::new(Api::Jack))
            .preferred_apis([Api::Jack])
            .client_name("builder-test")
            .build()
            .unwrap();
        assert_eq!(midi.compiled_apis().unwrap(), vec![Api::Alsa, Api::Jack]);
        assert_eq!(midi.available_apis(), vec![Api::Jack, Api::Alsa]);
        assert_eq!(midi.config().client_name, "builder-test");
    }

    #[test]
    fn test_disallowed_api_is_not_available() {
        let midi = MidiSystem::builder()
            .backend(LoopbackBackend::new(Api::Jack))
            .backend(LoopbackBackend::new(Api::Alsa))
            .disallow_api(Api::Jack)
            .build()
            .unwrap();
        assert_eq!(midi.available_apis(), vec![Api::Alsa]);
        assert!(midi.compiled_apis().unwrap().contains(&Api::Jack));
    }

    #[test]
    fn test_dummy_only_system() {
        let midi = MidiSystem::builder().backend(DummyBackend).build().unwrap();
        assert!(!midi.is_platform_supported());
        assert!(!midi.supports_virtual_ports());
        assert!(midi.output_ports().unwrap().is_empty());
        assert!(matches!(
            midi.open_output(crate::PortSelector::Default, None, None),
            Err(Error::NoBackendAvailable(_))
        ));
    }
}
