//! MIDI transport bridges — midir-backed edges between the core and real
//! devices.
//!
//! The core itself only speaks [`ClockPortEvent`]s and [`WireMessage`]s;
//! these bridges translate to and from raw MIDI bytes at the device
//! boundary. The clock port is a plain std mpsc channel: midir delivers
//! bytes on its own thread, [`input::parse_clock_message`] turns them into
//! events, and the coordinator drains the receiver inside its pump.
//!
//! [`WireMessage`]: crate::message::WireMessage

pub mod input;
pub mod output;

pub use input::{parse_clock_message, ClockInput};
pub use output::DeviceOutput;

use std::sync::mpsc;

/// An event from the external clock source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockPortEvent {
    /// One 24-PPQN timing pulse.
    Tick,
    Start,
    Stop,
    Continue,
    /// A Control Change seen on the clock input. Channel is 1–16.
    ControlChange { channel: u8, cc: u8, value: u8 },
}

/// Sender half of the clock port — clone this into transport threads.
pub type ClockPortSender = mpsc::Sender<ClockPortEvent>;

/// Receiver half of the clock port — drained by the coordinator.
pub type ClockPortReceiver = mpsc::Receiver<ClockPortEvent>;
