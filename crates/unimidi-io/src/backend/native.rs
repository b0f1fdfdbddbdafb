//! OS MIDI backend via midir.
//!
//! midir picks one subsystem per target at compile time: CoreMIDI on Apple
//! platforms, ALSA on Linux, WinMM on Windows, or JACK / WinRT when the
//! matching feature is enabled.

use midir::{
    Ignore, MidiInput, MidiInputConnection, MidiInputPort, MidiOutput, MidiOutputConnection,
    MidiOutputPort,
};
use tracing::debug;
use unimidi_core::Api;

use super::{
    Backend, BackendError, BackendResult, InputClient, InputConnection, InputSink, OutputClient,
    OutputConnection, PortQuery,
};

#[cfg(all(feature = "jack", not(target_os = "windows")))]
const NATIVE_API: Option<Api> = Some(Api::Jack);

#[cfg(all(any(target_os = "macos", target_os = "ios"), not(feature = "jack")))]
const NATIVE_API: Option<Api> = Some(Api::CoreMidi);

#[cfg(all(target_os = "linux", not(feature = "jack")))]
const NATIVE_API: Option<Api> = Some(Api::Alsa);

#[cfg(all(target_os = "windows", feature = "winrt"))]
const NATIVE_API: Option<Api> = Some(Api::WindowsUwp);

#[cfg(all(target_os = "windows", not(feature = "winrt")))]
const NATIVE_API: Option<Api> = Some(Api::WindowsMm);

#[cfg(not(any(
    target_os = "linux",
    target_os = "macos",
    target_os = "ios",
    target_os = "windows",
    all(feature = "jack", not(target_os = "windows"))
)))]
const NATIVE_API: Option<Api> = None;

#[derive(Debug, Clone, Copy)]
pub struct MidirBackend {
    api: Api,
}

impl MidirBackend {
    /// The backend midir was compiled for, or `None` on targets without one.
    pub fn native() -> Option<Self> {
        NATIVE_API.map(|api| Self { api })
    }
}

impl Backend for MidirBackend {
    fn api(&self) -> Api {
        self.api
    }

    fn supports_virtual_ports(&self) -> bool {
        cfg!(unix)
    }

    fn input_client(&self, client_name: &str) -> BackendResult<Box<dyn InputClient>> {
        let mut input = MidiInput::new(client_name)?;
        // Filtering happens in the sink so it can change while connected.
        input.ignore(Ignore::None);
        let ports = input.ports();
        debug!("{} input client '{}': {} ports", self.api, client_name, ports.len());
        Ok(Box::new(MidirInputClient {
            input,
            ports,
            port_name: format!("{client_name} Input"),
        }))
    }

    fn output_client(&self, client_name: &str) -> BackendResult<Box<dyn OutputClient>> {
        let output = MidiOutput::new(client_name)?;
        let ports = output.ports();
        debug!("{} output client '{}': {} ports", self.api, client_name, ports.len());
        Ok(Box::new(MidirOutputClient {
            output,
            ports,
            port_name: format!("{client_name} Output"),
        }))
    }
}

struct MidirInputClient {
    input: MidiInput,
    ports: Vec<MidiInputPort>,
    port_name: String,
}

impl PortQuery for MidirInputClient {
    fn port_count(&self) -> BackendResult<usize> {
        Ok(self.ports.len())
    }

    fn port_name(&self, index: usize) -> BackendResult<String> {
        let port = self.ports.get(index).ok_or(BackendError::PortNotFound(index))?;
        Ok(self.input.port_name(port)?)
    }
}

impl InputClient for MidirInputClient {
    fn connect(
        self: Box<Self>,
        index: usize,
        sink: InputSink,
    ) -> BackendResult<Box<dyn InputConnection>> {
        let this = *self;
        let port = this
            .ports
            .get(index)
            .cloned()
            .ok_or(BackendError::PortNotFound(index))?;
        let conn = this.input.connect(
            &port,
            &this.port_name,
            move |stamp, bytes, _| sink.deliver(Some(stamp), bytes),
            (),
        )?;
        Ok(Box::new(MidirInputConnection(Some(conn))))
    }

    #[cfg(unix)]
    fn create_virtual(
        self: Box<Self>,
        name: &str,
        sink: InputSink,
    ) -> BackendResult<Box<dyn InputConnection>> {
        use midir::os::unix::VirtualInput;

        let conn = self.input.create_virtual(
            name,
            move |stamp, bytes, _| sink.deliver(Some(stamp), bytes),
            (),
        )?;
        Ok(Box::new(MidirInputConnection(Some(conn))))
    }
}

struct MidirInputConnection(Option<MidiInputConnection<()>>);

impl InputConnection for MidirInputConnection {
    fn close(mut self: Box<Self>) {
        if let Some(conn) = self.0.take() {
            let _ = conn.close();
        }
    }
}

struct MidirOutputClient {
    output: MidiOutput,
    ports: Vec<MidiOutputPort>,
    port_name: String,
}

impl PortQuery for MidirOutputClient {
    fn port_count(&self) -> BackendResult<usize> {
        Ok(self.ports.len())
    }

    fn port_name(&self, index: usize) -> BackendResult<String> {
        let port = self.ports.get(index).ok_or(BackendError::PortNotFound(index))?;
        Ok(self.output.port_name(port)?)
    }
}

impl OutputClient for MidirOutputClient {
    fn connect(self: Box<Self>, index: usize) -> BackendResult<Box<dyn OutputConnection>> {
        let this = *self;
        let port = this
            .ports
            .get(index)
            .cloned()
            .ok_or(BackendError::PortNotFound(index))?;
        let conn = this.output.connect(&port, &this.port_name)?;
        Ok(Box::new(MidirOutputConnection(Some(conn))))
    }

    #[cfg(unix)]
    fn create_virtual(self: Box<Self>, name: &str) -> BackendResult<Box<dyn OutputConnection>> {
        use midir::os::unix::VirtualOutput;

        let conn = self.output.create_virtual(name)?;
        Ok(Box::new(MidirOutputConnection(Some(conn))))
    }
}

struct MidirOutputConnection(Option<MidiOutputConnection>);

impl OutputConnection for MidirOutputConnection {
    fn send(&mut self, bytes: &[u8]) -> BackendResult<()> {
        let conn = self
            .0
            .as_mut()
            .ok_or_else(|| BackendError::Disconnected("connection closed".to_string()))?;
        conn.send(bytes)?;
        Ok(())
    }

    fn close(mut self: Box<Self>) {
        if let Some(conn) = self.0.take() {
            let _ = conn.close();
        }
    }
}
