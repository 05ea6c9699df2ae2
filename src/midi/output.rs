//! MIDI device output — sends wire messages and transport bytes to a device.

use std::io;

use midir::{MidiOutput as MidirOutput, MidiOutputConnection};

use crate::message::WireMessage;

/// Active MIDI output connection to the downstream device.
pub struct DeviceOutput {
    connection: MidiOutputConnection,
    port_name: String,
}

impl DeviceOutput {
    /// Connect to a MIDI output port whose name contains `device_name`, or
    /// the first available port.
    pub fn connect(device_name: Option<&str>) -> io::Result<Self> {
        let midi_out = MidirOutput::new("snapshift")
            .map_err(|e| io::Error::other(format!("MIDI init: {e}")))?;

        let ports = midi_out.ports();
        if ports.is_empty() {
            return Err(io::Error::other("no MIDI output ports available"));
        }

        let (port, port_name) = if let Some(name_filter) = device_name {
            ports
                .iter()
                .find_map(|p| {
                    let name = midi_out.port_name(p).unwrap_or_default();
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
            let name = midi_out
                .port_name(&p)
                .unwrap_or_else(|_| "unknown".to_string());
            (p, name)
        };

        let connection = midi_out
            .connect(&port, "snapshift-out")
            .map_err(|e| io::Error::other(format!("MIDI connect: {e}")))?;

        Ok(Self {
            connection,
            port_name,
        })
    }

    /// Send one wire message (NRPN sends its three CC messages in order).
    pub fn send(&mut self, message: &WireMessage) -> io::Result<()> {
        for bytes in message.to_bytes() {
            self.send_raw(&bytes)?;
        }
        Ok(())
    }

    /// Send raw MIDI bytes (transport realtime messages).
    pub fn send_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.connection
            .send(bytes)
            .map_err(|e| io::Error::other(format!("MIDI send: {e}")))
    }

    /// The connected port name.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// List all available MIDI output device names.
    pub fn list_devices() -> Vec<String> {
        let Ok(midi_out) = MidirOutput::new("snapshift-list") else {
            return Vec::new();
        };
        midi_out
            .ports()
            .iter()
            .filter_map(|p| midi_out.port_name(p).ok())
            .collect()
    }
}
