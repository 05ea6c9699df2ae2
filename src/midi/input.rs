//! MIDI clock input — connects to a MIDI device and feeds the clock port.

use std::io;

use midir::{MidiInput as MidirInput, MidiInputConnection};

use super::{ClockPortEvent, ClockPortSender};

/// Parse one raw MIDI message into a clock port event.
///
/// Recognized: Timing Clock (0xF8), Start (0xFA), Continue (0xFB), Stop
/// (0xFC), and Control Change (0xBn). Everything else returns `None`.
pub fn parse_clock_message(msg: &[u8]) -> Option<ClockPortEvent> {
    let status = *msg.first()?;
    match status {
        0xF8 => Some(ClockPortEvent::Tick),
        0xFA => Some(ClockPortEvent::Start),
        0xFB => Some(ClockPortEvent::Continue),
        0xFC => Some(ClockPortEvent::Stop),
        _ if status & 0xF0 == 0xB0 && msg.len() >= 3 => Some(ClockPortEvent::ControlChange {
            channel: (status & 0x0F) + 1,
            cc: msg[1],
            value: msg[2],
        }),
        _ => None,
    }
}

/// Active MIDI clock input connection.
pub struct ClockInput {
    _connection: MidiInputConnection<()>,
    port_name: String,
}

impl ClockInput {
    /// Start listening on a MIDI input port. Finds a port whose name contains
    /// `device_name` (or the first available port) and forwards parsed clock
    /// events through the sender.
    pub fn start(device_name: Option<&str>, sender: ClockPortSender) -> io::Result<Self> {
        let midi_in = MidirInput::new("snapshift")
            .map_err(|e| io::Error::other(format!("MIDI init: {e}")))?;

        let ports = midi_in.ports();
        if ports.is_empty() {
            return Err(io::Error::other("no MIDI input ports available"));
        }

        let (port, port_name) = if let Some(name_filter) = device_name {
            ports
                .iter()
                .find_map(|p| {
                    let name = midi_in.port_name(p).unwrap_or_default();
                    if name.contains(name_filter) {
                        Some((p.clone(), name))
                    } else {
                        None
                    }
                })
                .ok_or_else(|| {
                    io::Error::other(format!("MIDI device matching '{name_filter}' not found"))
                })?
        } else {
            let p = ports[0].clone();
            let name = midi_in
                .port_name(&p)
                .unwrap_or_else(|_| "unknown".to_string());
            (p, name)
        };

        let connection = midi_in
            .connect(
                &port,
                "snapshift-clock-in",
                move |_timestamp, msg, _| {
                    if let Some(event) = parse_clock_message(msg) {
                        let _ = sender.send(event);
                    }
                },
                (),
            )
            .map_err(|e| io::Error::other(format!("MIDI connect: {e}")))?;

        Ok(Self {
            _connection: connection,
            port_name,
        })
    }

    /// The connected port name.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// List all available MIDI input device names.
    pub fn list_devices() -> Vec<String> {
        let Ok(midi_in) = MidirInput::new("snapshift-list") else {
            return Vec::new();
        };
        midi_in
            .ports()
            .iter()
            .filter_map(|p| midi_in.port_name(p).ok())
            .collect()
    }
}
