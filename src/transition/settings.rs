//! Per-trigger transition configuration.

use serde::{Deserialize, Serialize};

use crate::clock::{ClockSource, Quantize, MAX_BPM, MIN_BPM};

/// Longest accepted fade for a Jump, in milliseconds.
pub const MAX_FADE_MS: u64 = 10_000;
/// Longest accepted Drop cycle, in bars.
pub const MAX_CYCLE_BARS: u32 = 32;

/// How a snapshot is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionMode {
    /// Quantized, smoothly interpolated move.
    Jump,
    /// Bar-aligned instantaneous application.
    Drop,
}

/// Immutable settings passed with each trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionSettings {
    pub mode: TransitionMode,
    /// Jump fade duration in milliseconds.
    pub fade_ms: u64,
    /// Jump quantization grid.
    pub quantize: Quantize,
    /// Drop cycle length in bars, 1–32.
    pub cycle_bars: u32,
    /// Re-schedule a Drop every cycle until cancelled.
    pub repeat: bool,
    pub clock_source: ClockSource,
    /// Tempo applied to the clock on trigger.
    pub bpm: f64,
}

impl TransitionSettings {
    /// Jump settings with the given fade and quantization; other fields at
    /// their defaults.
    pub fn jump(fade_ms: u64, quantize: Quantize) -> Self {
        Self {
            mode: TransitionMode::Jump,
            fade_ms: fade_ms.min(MAX_FADE_MS),
            quantize,
            ..Self::default()
        }
    }

    /// Drop settings with the given cycle length and repeat flag.
    pub fn drop(cycle_bars: u32, repeat: bool) -> Self {
        Self {
            mode: TransitionMode::Drop,
            cycle_bars: cycle_bars.clamp(1, MAX_CYCLE_BARS),
            repeat,
            ..Self::default()
        }
    }

    pub fn with_bpm(mut self, bpm: f64) -> Self {
        self.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
        self
    }

    pub fn with_source(mut self, source: ClockSource) -> Self {
        self.clock_source = source;
        self
    }
}

impl Default for TransitionSettings {
    fn default() -> Self {
        Self {
            mode: TransitionMode::Jump,
            fade_ms: 500,
            quantize: Quantize::Bar,
            cycle_bars: 4,
            repeat: false,
            clock_source: ClockSource::Internal,
            bpm: 120.0,
        }
    }
}
