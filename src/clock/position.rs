//! Musical position arithmetic at 24 PPQN.
//!
//! Time advances in integer MIDI clock ticks: `PPQN` ticks make a beat,
//! `beats_per_bar` beats make a bar. All boundary math is integer-based;
//! conversion to milliseconds happens only at the scheduling edge.

use serde::{Deserialize, Serialize};

/// Pulses per quarter note, fixed at 24 per MIDI Timing Clock convention.
pub const PPQN: u32 = 24;

/// Default time signature: 4 beats per bar.
pub const DEFAULT_BEATS_PER_BAR: u32 = 4;

/// A (bar, beat, tick) position. `beat < beats_per_bar`, `tick < PPQN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockPosition {
    pub bar: u64,
    pub beat: u32,
    pub tick: u32,
}

/// What rolled over when a position advanced by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickAdvance {
    pub new_beat: bool,
    pub new_bar: bool,
}

impl ClockPosition {
    /// Bar 0, beat 0, tick 0.
    pub const ZERO: ClockPosition = ClockPosition {
        bar: 0,
        beat: 0,
        tick: 0,
    };

    /// Advance by one tick, rolling beat and bar as needed.
    pub fn advance_tick(&mut self, beats_per_bar: u32) -> TickAdvance {
        self.tick += 1;
        if self.tick < PPQN {
            return TickAdvance {
                new_beat: false,
                new_bar: false,
            };
        }
        self.tick = 0;
        self.beat += 1;
        if self.beat < beats_per_bar.max(1) {
            return TickAdvance {
                new_beat: true,
                new_bar: false,
            };
        }
        self.beat = 0;
        self.bar += 1;
        TickAdvance {
            new_beat: true,
            new_bar: true,
        }
    }

    /// Ticks elapsed since the start of the current beat's bar.
    pub fn ticks_into_bar(&self) -> u64 {
        self.beat as u64 * PPQN as u64 + self.tick as u64
    }

    /// Whether the position sits exactly on a bar boundary.
    pub fn on_bar_boundary(&self) -> bool {
        self.beat == 0 && self.tick == 0
    }
}

/// Ticks in one bar of the given time signature.
pub fn ticks_per_bar(beats_per_bar: u32) -> u64 {
    beats_per_bar.max(1) as u64 * PPQN as u64
}

/// Milliseconds between two ticks at the given tempo.
pub fn ms_per_tick(bpm: f64) -> f64 {
    60_000.0 / (bpm * PPQN as f64)
}

/// Quantization grid for scheduled transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Quantize {
    /// Fire immediately.
    None,
    /// Next beat.
    Beat,
    /// Next bar.
    #[default]
    Bar,
    /// Next even bar.
    TwoBars,
    /// Next multiple-of-four bar.
    FourBars,
}

impl Quantize {
    /// Cycle length in bars for the bar-aligned grids.
    pub fn bars(&self) -> Option<u32> {
        match self {
            Quantize::None | Quantize::Beat => None,
            Quantize::Bar => Some(1),
            Quantize::TwoBars => Some(2),
            Quantize::FourBars => Some(4),
        }
    }
}
