//! Round-trips a few messages through a virtual port.
//!
//! Opens a virtual output, connects an input to it, sends and reads back.
//! Needs a backend with virtual port support (ALSA, CoreMIDI or JACK).

use std::thread;
use std::time::Duration;
use unimidi_io::{IgnoreTypes, MidiMessage, MidiSystem, PortDirection, PortSelector};

const PORT_NAME: &str = "unimidi loopback";

fn main() -> unimidi_io::Result<()> {
    tracing_subscriber::fmt::init();

    let midi = MidiSystem::builder()
        .ignore_types(IgnoreTypes::NONE)
        .build()?;
    if !midi.supports_virtual_ports() {
        eprintln!("ERROR: no loaded backend supports virtual ports.");
        std::process::exit(1);
    }

    let mut output = midi.open_output(PortSelector::Virtual(PORT_NAME.into()), None, None)?;
    thread::sleep(Duration::from_millis(100));

    let ports = midi.list_ports(PortDirection::Readable)?;
    let Some(port) = ports.iter().find(|p| p.name.contains(PORT_NAME)) else {
        eprintln!("ERROR: virtual port not visible to enumeration.");
        std::process::exit(1);
    };
    println!("Found virtual port: {}", port);
    let input = midi.open_input(port.into(), None, None)?;

    let messages = [
        MidiMessage::note_on(0, 60, 100),
        MidiMessage::control_change(0, 74, 64),
        MidiMessage::pitch_bend(0, 4096),
        MidiMessage::note_off(0, 60, 0),
    ];
    for msg in &messages {
        output.send(msg)?;
    }

    let mut passed = 0;
    for expected in &messages {
        match input.receive_timed(Some(Duration::from_millis(500)))? {
            Some(timed) if &timed.message == expected => {
                println!("  OK   {:?} (+{:?})", timed.message, timed.delta);
                passed += 1;
            }
            Some(timed) => println!("  FAIL got {:?}, expected {:?}", timed.message, expected),
            None => println!("  FAIL timed out waiting for {:?}", expected),
        }
    }

    println!("\n{}/{} messages round-tripped", passed, messages.len());
    Ok(())
}
