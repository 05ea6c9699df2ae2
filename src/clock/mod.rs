//! Musical clock — authoritative bar/beat/tick time for the engine.
//!
//! The clock either generates 24-PPQN ticks internally at a configurable
//! tempo or slaves to an external tick source. It never sleeps or owns a
//! timer thread: internal ticks are produced by [`MusicalClock::poll`], a
//! deadline-driven pump the host calls with the current `Instant`. This keeps
//! the whole scheduling core testable with synthetic time.

pub mod position;

pub use position::{ms_per_tick, ticks_per_bar, ClockPosition, Quantize, DEFAULT_BEATS_PER_BAR, PPQN};

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Lowest accepted tempo for the internal generator.
pub const MIN_BPM: f64 = 20.0;
/// Highest accepted tempo for the internal generator.
pub const MAX_BPM: f64 = 300.0;

/// Where ticks come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClockSource {
    #[default]
    Internal,
    External,
}

/// A clock event delivered to listeners.
///
/// On a tick that crosses a boundary, the `Bar` event (if any) precedes the
/// `Beat` event, which precedes the `Tick` event; all three carry the new
/// position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    Bar { bar: u64 },
    Beat { bar: u64, beat: u32 },
    Tick { bar: u64, beat: u32, tick: u32 },
}

/// Which event kinds a listener receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFilter {
    Bar,
    Beat,
    Tick,
    All,
}

impl EventFilter {
    fn matches(&self, event: &ClockEvent) -> bool {
        match (self, event) {
            (EventFilter::All, _) => true,
            (EventFilter::Bar, ClockEvent::Bar { .. }) => true,
            (EventFilter::Beat, ClockEvent::Beat { .. }) => true,
            (EventFilter::Tick, ClockEvent::Tick { .. }) => true,
            _ => false,
        }
    }
}

/// Listener callback. Registered per event kind or for all.
pub type ClockCallback = Box<dyn FnMut(&ClockEvent)>;

/// Snapshot of the clock's state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockState {
    pub running: bool,
    pub source: ClockSource,
    pub bpm: f64,
    pub beats_per_bar: u32,
    pub ppqn: u32,
    pub position: ClockPosition,
    pub last_tick_time: Option<Instant>,
}

/// The musical clock.
pub struct MusicalClock {
    running: bool,
    source: ClockSource,
    bpm: f64,
    beats_per_bar: u32,
    position: ClockPosition,
    last_tick_time: Option<Instant>,
    /// Next internal-generator deadline; `None` unless running internally.
    next_tick_at: Option<Instant>,
    listeners: Vec<(EventFilter, ClockCallback)>,
}

impl MusicalClock {
    /// Create a stopped clock at bar 0, internal source.
    pub fn new(bpm: f64) -> Self {
        Self {
            running: false,
            source: ClockSource::Internal,
            bpm: bpm.clamp(MIN_BPM, MAX_BPM),
            beats_per_bar: DEFAULT_BEATS_PER_BAR,
            position: ClockPosition::ZERO,
            last_tick_time: None,
            next_tick_at: None,
            listeners: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------

    /// Start the clock. A no-op when already running.
    pub fn start(&mut self, now: Instant) {
        if self.running {
            return;
        }
        self.running = true;
        if self.source == ClockSource::Internal {
            self.next_tick_at = Some(now + self.tick_interval());
        }
    }

    /// Stop the clock. A no-op when already stopped.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.next_tick_at = None;
    }

    /// Return to bar 0, beat 0 and clear the tick accumulator. Independent of
    /// the running state.
    pub fn reset(&mut self) {
        self.position = ClockPosition::ZERO;
    }

    /// Clamp and set the tempo. Takes effect from the next generated tick;
    /// position is never reset.
    pub fn set_bpm(&mut self, bpm: f64) {
        self.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
    }

    /// Switch the tick source. When running, the generator is transparently
    /// re-armed (or disarmed) under the new source; position is preserved.
    pub fn set_source(&mut self, source: ClockSource, now: Instant) {
        if self.source == source {
            return;
        }
        self.source = source;
        if self.running {
            self.next_tick_at = match source {
                ClockSource::Internal => Some(now + self.tick_interval()),
                ClockSource::External => None,
            };
        }
    }

    /// Set the time signature numerator (minimum 1).
    pub fn set_beats_per_bar(&mut self, beats_per_bar: u32) {
        self.beats_per_bar = beats_per_bar.max(1);
    }

    /// Snapshot the current state.
    pub fn state(&self) -> ClockState {
        ClockState {
            running: self.running,
            source: self.source,
            bpm: self.bpm,
            beats_per_bar: self.beats_per_bar,
            ppqn: PPQN,
            position: self.position,
            last_tick_time: self.last_tick_time,
        }
    }

    pub fn position(&self) -> ClockPosition {
        self.position
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn source(&self) -> ClockSource {
        self.source
    }

    /// Register a listener for the given event kinds.
    pub fn subscribe(&mut self, filter: EventFilter, callback: ClockCallback) {
        self.listeners.push((filter, callback));
    }

    // ------------------------------------------------------------------
    // Internal generator
    // ------------------------------------------------------------------

    /// Produce every internally generated tick due at or before `now`.
    ///
    /// Returns the emitted events in order (listeners are also notified).
    /// Does nothing unless running with the internal source. The interval is
    /// recomputed from the current BPM on every step, so tempo changes
    /// re-pace the generator without accumulating drift.
    pub fn poll(&mut self, now: Instant) -> Vec<ClockEvent> {
        let mut out = Vec::new();
        if !self.running || self.source != ClockSource::Internal {
            return out;
        }
        let Some(mut next) = self.next_tick_at else {
            return out;
        };
        while next <= now {
            self.advance_tick(next, &mut out);
            next += self.tick_interval();
        }
        self.next_tick_at = Some(next);
        out
    }

    fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(ms_per_tick(self.bpm) / 1000.0)
    }

    // ------------------------------------------------------------------
    // External source
    // ------------------------------------------------------------------

    /// Accept one external tick. Ignored unless running with the external
    /// source.
    pub fn ingest_tick(&mut self, now: Instant) -> Vec<ClockEvent> {
        let mut out = Vec::new();
        if self.source != ClockSource::External || !self.running {
            return out;
        }
        self.advance_tick(now, &mut out);
        out
    }

    /// Accept an external Start: reset position and run. Ignored for the
    /// internal source.
    pub fn ingest_start(&mut self) {
        if self.source != ClockSource::External {
            return;
        }
        self.reset();
        self.running = true;
    }

    /// Accept an external Stop. Ignored for the internal source; absorbed
    /// when already stopped.
    pub fn ingest_stop(&mut self) {
        if self.source != ClockSource::External {
            return;
        }
        self.running = false;
    }

    /// Accept an external Continue: resume without resetting position.
    pub fn ingest_continue(&mut self) {
        if self.source != ClockSource::External {
            return;
        }
        self.running = true;
    }

    fn advance_tick(&mut self, at: Instant, out: &mut Vec<ClockEvent>) {
        let advance = self.position.advance_tick(self.beats_per_bar);
        self.last_tick_time = Some(at);

        let pos = self.position;
        let first = out.len();
        if advance.new_bar {
            out.push(ClockEvent::Bar { bar: pos.bar });
        }
        if advance.new_beat {
            out.push(ClockEvent::Beat {
                bar: pos.bar,
                beat: pos.beat,
            });
        }
        out.push(ClockEvent::Tick {
            bar: pos.bar,
            beat: pos.beat,
            tick: pos.tick,
        });

        for i in first..out.len() {
            let event = out[i];
            for (filter, callback) in &mut self.listeners {
                if filter.matches(&event) {
                    callback(&event);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Quantization queries
    // ------------------------------------------------------------------

    /// Milliseconds until the next boundary of the given grid, at the
    /// configured tempo. Exactly 0 on a boundary.
    pub fn time_until_next_quantization(&self, quantize: Quantize) -> f64 {
        let remaining_ticks = match quantize {
            Quantize::None => 0,
            Quantize::Beat => {
                if self.position.tick == 0 {
                    0
                } else {
                    (PPQN - self.position.tick) as u64
                }
            }
            Quantize::Bar | Quantize::TwoBars | Quantize::FourBars => {
                let cycle_bars = quantize.bars().unwrap_or(1) as u64;
                let bar_ticks = ticks_per_bar(self.beats_per_bar);
                let into_cycle =
                    (self.position.bar % cycle_bars) * bar_ticks + self.position.ticks_into_bar();
                if into_cycle == 0 {
                    0
                } else {
                    cycle_bars * bar_ticks - into_cycle
                }
            }
        };
        remaining_ticks as f64 * ms_per_tick(self.bpm)
    }

    /// Milliseconds until the first tick of `target_bar`; 0 if the target is
    /// at or behind the current bar.
    pub fn time_until_bar(&self, target_bar: u64) -> f64 {
        if target_bar <= self.position.bar {
            return 0.0;
        }
        let bar_ticks = ticks_per_bar(self.beats_per_bar);
        let remaining =
            (target_bar - self.position.bar) * bar_ticks - self.position.ticks_into_bar();
        remaining as f64 * ms_per_tick(self.bpm)
    }

    /// The smallest multiple of `cycle_len` strictly greater than the current
    /// bar.
    pub fn next_cycle_bar(&self, cycle_len: u32) -> u64 {
        let k = cycle_len.max(1) as u64;
        (self.position.bar / k + 1) * k
    }
}
