use unimidi_io::{MidiSystem, PortDirection};

fn main() {
    tracing_subscriber::fmt::init();

    let midi = MidiSystem::global();
    println!("Compiled backends: {:?}", midi.compiled_apis().unwrap_or_default());
    println!("Loaded backends:   {:?}", midi.available_apis());

    for (title, direction) in [
        ("MIDI Input Ports", PortDirection::Readable),
        ("MIDI Output Ports", PortDirection::Writable),
    ] {
        println!("\n=== {} ===", title);
        match midi.list_ports(direction) {
            Ok(ports) if ports.is_empty() => println!("  (none found)"),
            Ok(ports) => {
                for port in &ports {
                    println!("  [{}] {}", port.index, port.name);
                }
            }
            Err(e) => println!("  error: {}", e),
        }
    }
}
