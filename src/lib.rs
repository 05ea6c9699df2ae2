//! Snapshift — a real-time snapshot and transition engine for MIDI grooveboxes.

pub mod clock;
pub mod coordinator;
pub mod message;
pub mod midi;
pub mod params;
pub mod snapshot;
pub mod transition;
