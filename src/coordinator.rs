//! Coordinator — owns the clock, store, and engine, and glues them to the
//! outside world.
//!
//! The coordinator is the single-threaded host context the core runs in. Its
//! [`Coordinator::pump`] drains the clock input port, routes transport events
//! into the clock, applies the tempo-CC mapping, generates internal ticks,
//! and services the transition engine's deadlines. It also mirrors
//! internal-clock transport as raw MIDI realtime bytes (Start/Stop/Timing
//! Clock) so the downstream device stays in sync.

use std::collections::VecDeque;
use std::time::{Instant, SystemTime};

use crate::clock::{ClockEvent, ClockPosition, ClockSource, MusicalClock};
use crate::message::{MIDI_CLOCK, MIDI_CONTINUE, MIDI_START, MIDI_STOP};
use crate::midi::{ClockPortEvent, ClockPortReceiver};
use crate::params::convert::{midi_to_bpm, BPM_RANGE_MAX, BPM_RANGE_MIN};
use crate::snapshot::{SnapshotId, SnapshotStore};
use crate::transition::{TransitionEngine, TransitionMode, TransitionSettings};

/// The CC number carrying tempo updates on the clock input.
pub const TEMPO_CC: u8 = 80;
/// The channel tempo updates are accepted on.
pub const TEMPO_CC_CHANNEL: u8 = 1;

/// One coalesced warning.
#[derive(Debug, Clone)]
pub struct RunLogEntry {
    pub message: String,
    /// Consecutive occurrences folded into this entry.
    pub count: u64,
    pub first_seen: SystemTime,
    pub last_seen: SystemTime,
}

/// Coalescing ring of recent coordinator warnings.
///
/// A misbehaving controller repeats the same malformed message at MIDI rate,
/// so identical consecutive warnings collapse into one entry with a count.
/// The ring then holds distinct recent problems rather than one problem many
/// times over.
#[derive(Debug, Clone)]
pub struct RunLog {
    entries: VecDeque<RunLogEntry>,
    capacity: usize,
    total: u64,
}

impl RunLog {
    /// Create a run log keeping at most `capacity` distinct entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
            total: 0,
        }
    }

    /// Record a warning. A message identical to the newest entry's folds into
    /// it; otherwise a new entry is appended, evicting the oldest past
    /// capacity.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        let now = SystemTime::now();
        self.total += 1;
        if let Some(newest) = self.entries.back_mut() {
            if newest.message == message {
                newest.count += 1;
                newest.last_seen = now;
                return;
            }
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(RunLogEntry {
            message,
            count: 1,
            first_seen: now,
            last_seen: now,
        });
    }

    /// Entries oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &RunLogEntry> {
        self.entries.iter()
    }

    /// The newest entry.
    pub fn last(&self) -> Option<&RunLogEntry> {
        self.entries.back()
    }

    /// Every warning recorded, counting coalesced repeats and entries the
    /// ring has since evicted.
    pub fn total_warnings(&self) -> u64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new(32)
    }
}

type TransportCallback = Box<dyn FnMut(&[u8])>;

/// Owner of the three core subsystems plus their external edges.
pub struct Coordinator {
    clock: MusicalClock,
    store: SnapshotStore,
    engine: TransitionEngine,
    port_rx: ClockPortReceiver,
    log: RunLog,
    transport_out: Option<TransportCallback>,
}

impl Coordinator {
    pub fn new(store: SnapshotStore, port_rx: ClockPortReceiver) -> Self {
        Self {
            clock: MusicalClock::new(120.0),
            store,
            engine: TransitionEngine::new(),
            port_rx,
            log: RunLog::default(),
            transport_out: None,
        }
    }

    pub fn clock(&self) -> &MusicalClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut MusicalClock {
        &mut self.clock
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SnapshotStore {
        &mut self.store
    }

    pub fn engine(&self) -> &TransitionEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut TransitionEngine {
        &mut self.engine
    }

    pub fn log(&self) -> &RunLog {
        &self.log
    }

    /// Install the raw-byte callback for outbound MIDI realtime messages.
    pub fn set_transport_out(&mut self, callback: TransportCallback) {
        self.transport_out = Some(callback);
    }

    /// Start the clock. For the internal source this mirrors MIDI Start
    /// downstream, or Continue when resuming mid-position.
    pub fn start(&mut self, now: Instant) {
        let was_running = self.clock.is_running();
        self.clock.start(now);
        if !was_running && self.clock.source() == ClockSource::Internal {
            let byte = if self.clock.position() == ClockPosition::ZERO {
                MIDI_START
            } else {
                MIDI_CONTINUE
            };
            self.send_transport(&[byte]);
        }
    }

    /// Stop the clock; mirrors MIDI Stop downstream for the internal source.
    pub fn stop(&mut self) {
        let was_running = self.clock.is_running();
        self.clock.stop();
        if was_running && self.clock.source() == ClockSource::Internal {
            self.send_transport(&[MIDI_STOP]);
        }
    }

    /// Trigger a snapshot with the given settings. The settings' clock source
    /// and tempo are applied to the clock first. Returns `false` for unknown
    /// ids.
    pub fn trigger(
        &mut self,
        id: &SnapshotId,
        settings: TransitionSettings,
        now: Instant,
    ) -> bool {
        self.clock.set_source(settings.clock_source, now);
        self.clock.set_bpm(settings.bpm);
        match settings.mode {
            TransitionMode::Jump => {
                self.engine
                    .execute_jump(id, settings, now, &self.clock, &mut self.store)
            }
            TransitionMode::Drop => {
                self.engine
                    .execute_drop(id, settings, now, &self.clock, &mut self.store)
            }
        }
    }

    /// Trigger the first snapshot at (bank, slot).
    pub fn trigger_position(
        &mut self,
        bank: u8,
        slot: u8,
        settings: TransitionSettings,
        now: Instant,
    ) -> bool {
        let Some(id) = self.store.find_by_position(bank, slot).map(|s| s.id.clone()) else {
            return false;
        };
        self.trigger(&id, settings, now)
    }

    /// One scheduler turn: drain the clock port, generate due internal ticks
    /// (mirroring them as Timing Clock bytes), and service the engine's
    /// deadlines.
    pub fn pump(&mut self, now: Instant) {
        while let Ok(event) = self.port_rx.try_recv() {
            match event {
                ClockPortEvent::Tick => {
                    self.clock.ingest_tick(now);
                }
                ClockPortEvent::Start => self.clock.ingest_start(),
                ClockPortEvent::Stop => self.clock.ingest_stop(),
                ClockPortEvent::Continue => self.clock.ingest_continue(),
                ClockPortEvent::ControlChange { channel, cc, value } => {
                    self.handle_control_change(channel, cc, value)
                }
            }
        }

        let events = self.clock.poll(now);
        for event in &events {
            if matches!(event, ClockEvent::Tick { .. }) {
                self.send_transport(&[MIDI_CLOCK]);
            }
        }

        self.engine.poll(now, &self.clock, &mut self.store);
    }

    /// Interpret a CC from the clock input. Only CC80 on channel 1 is
    /// meaningful (tempo); everything else is ignored.
    fn handle_control_change(&mut self, channel: u8, cc: u8, value: u8) {
        if channel != TEMPO_CC_CHANNEL || cc != TEMPO_CC {
            return;
        }
        if value > 127 {
            self.log
                .warn(format!("tempo CC value {value} out of MIDI range, ignored"));
            return;
        }
        let bpm = midi_to_bpm(value);
        if !(BPM_RANGE_MIN..=BPM_RANGE_MAX).contains(&bpm) {
            self.log
                .warn(format!("tempo CC mapped to {bpm:.1} BPM, outside range, ignored"));
            return;
        }
        self.clock.set_bpm(bpm);
    }

    fn send_transport(&mut self, bytes: &[u8]) {
        if let Some(callback) = self.transport_out.as_mut() {
            callback(bytes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Quantize;
    use crate::message::WireMessage;
    use crate::midi::ClockPortSender;
    use crate::params::{ids, ParameterRegistry};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::mpsc;
    use std::time::Duration;

    fn rig() -> (Coordinator, ClockPortSender) {
        let (tx, rx) = mpsc::channel();
        let store = SnapshotStore::new(ParameterRegistry::new());
        (Coordinator::new(store, rx), tx)
    }

    #[test]
    fn run_log_coalesces_repeats() {
        let mut log = RunLog::new(8);
        log.warn("same");
        log.warn("same");
        log.warn("same");
        assert_eq!(log.len(), 1);
        let entry = log.last().unwrap();
        assert_eq!(entry.count, 3);
        assert!(entry.first_seen <= entry.last_seen);
        assert_eq!(log.total_warnings(), 3);
    }

    #[test]
    fn run_log_distinct_messages_append() {
        let mut log = RunLog::new(8);
        log.warn("a");
        log.warn("b");
        log.warn("a");
        // Only consecutive repeats fold.
        assert_eq!(log.len(), 3);
        assert_eq!(log.total_warnings(), 3);
    }

    #[test]
    fn run_log_evicts_oldest_past_capacity() {
        let mut log = RunLog::new(2);
        log.warn("a");
        log.warn("b");
        log.warn("c");
        let messages: Vec<&str> = log.entries().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["b", "c"]);
        // Evicted entries still count toward the total.
        assert_eq!(log.total_warnings(), 3);
    }

    #[test]
    fn run_log_capacity_is_at_least_one() {
        let mut log = RunLog::new(0);
        log.warn("a");
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn tempo_cc_sets_clock_bpm() {
        let (mut coordinator, tx) = rig();
        let now = Instant::now();

        // CC80/ch1 value 127 maps to 240 BPM.
        tx.send(ClockPortEvent::ControlChange {
            channel: 1,
            cc: 80,
            value: 127,
        })
        .unwrap();
        coordinator.pump(now);
        assert!((coordinator.clock().bpm() - 240.0).abs() < 1e-9);
        assert!(coordinator.log().is_empty());
    }

    #[test]
    fn other_ccs_are_ignored() {
        let (mut coordinator, tx) = rig();
        let now = Instant::now();
        let bpm = coordinator.clock().bpm();

        tx.send(ClockPortEvent::ControlChange {
            channel: 1,
            cc: 81,
            value: 127,
        })
        .unwrap();
        tx.send(ClockPortEvent::ControlChange {
            channel: 2,
            cc: 80,
            value: 127,
        })
        .unwrap();
        coordinator.pump(now);
        assert!((coordinator.clock().bpm() - bpm).abs() < f64::EPSILON);
    }

    #[test]
    fn malformed_tempo_cc_is_logged_and_ignored() {
        let (mut coordinator, tx) = rig();
        let now = Instant::now();
        let bpm = coordinator.clock().bpm();

        // A misbehaving sender repeats the same malformed value; the log
        // keeps one coalesced entry.
        for _ in 0..3 {
            tx.send(ClockPortEvent::ControlChange {
                channel: 1,
                cc: 80,
                value: 200,
            })
            .unwrap();
        }
        coordinator.pump(now);
        assert!((coordinator.clock().bpm() - bpm).abs() < f64::EPSILON);
        assert_eq!(coordinator.log().len(), 1);
        assert_eq!(coordinator.log().last().unwrap().count, 3);
    }

    #[test]
    fn external_transport_events_drive_the_clock() {
        let (mut coordinator, tx) = rig();
        let now = Instant::now();
        coordinator
            .clock_mut()
            .set_source(ClockSource::External, now);

        tx.send(ClockPortEvent::Start).unwrap();
        for _ in 0..96 {
            tx.send(ClockPortEvent::Tick).unwrap();
        }
        coordinator.pump(now);
        assert!(coordinator.clock().is_running());
        assert_eq!(coordinator.clock().position().bar, 1);

        tx.send(ClockPortEvent::Stop).unwrap();
        coordinator.pump(now);
        assert!(!coordinator.clock().is_running());
    }

    #[test]
    fn internal_clock_mirrors_transport_bytes() {
        let (mut coordinator, _tx) = rig();
        let t0 = Instant::now();

        let bytes: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        {
            let bytes = Rc::clone(&bytes);
            coordinator.set_transport_out(Box::new(move |b| {
                bytes.borrow_mut().extend_from_slice(b)
            }));
        }

        coordinator.start(t0);
        coordinator.pump(t0 + Duration::from_millis(50));
        coordinator.stop();

        let bytes = bytes.borrow();
        assert_eq!(bytes.first(), Some(&MIDI_START));
        assert_eq!(bytes.last(), Some(&MIDI_STOP));
        // 50 ms at 120 BPM ≈ 2 ticks.
        let ticks = bytes.iter().filter(|&&b| b == MIDI_CLOCK).count();
        assert!((1..=3).contains(&ticks), "got {ticks} ticks");
    }

    #[test]
    fn restart_mid_position_sends_continue() {
        let (mut coordinator, _tx) = rig();
        let t0 = Instant::now();

        let bytes: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        {
            let bytes = Rc::clone(&bytes);
            coordinator.set_transport_out(Box::new(move |b| {
                bytes.borrow_mut().extend_from_slice(b)
            }));
        }

        coordinator.start(t0);
        // Advance one beat, stop mid-song, start again.
        coordinator.pump(t0 + Duration::from_millis(505));
        coordinator.stop();
        coordinator.start(t0 + Duration::from_millis(600));

        let bytes = bytes.borrow();
        assert_eq!(bytes.first(), Some(&MIDI_START));
        assert_eq!(bytes.last(), Some(&MIDI_CONTINUE));
    }

    #[test]
    fn trigger_by_position_runs_a_drop() {
        let (mut coordinator, _tx) = rig();
        let t0 = Instant::now();

        let sink: Rc<RefCell<Vec<WireMessage>>> = Rc::new(RefCell::new(Vec::new()));
        {
            let sink = Rc::clone(&sink);
            coordinator
                .engine_mut()
                .on_message(Box::new(move |m| sink.borrow_mut().push(m.clone())));
        }

        let id = coordinator.store_mut().create_empty(2, 5, Some("hit"));
        coordinator
            .store_mut()
            .set_parameter(&id, ids::track_volume(1), 100, true);

        coordinator.start(t0);
        let settings = TransitionSettings::drop(1, false);
        assert!(coordinator.trigger_position(2, 5, settings, t0));
        assert!(coordinator.engine().scheduled().is_some());

        coordinator.pump(t0 + Duration::from_millis(2005));
        assert_eq!(
            *sink.borrow(),
            vec![WireMessage::Cc {
                channel: 1,
                cc: 7,
                value: 100
            }]
        );
    }

    #[test]
    fn trigger_unknown_position_returns_false() {
        let (mut coordinator, _tx) = rig();
        let settings = TransitionSettings::jump(100, Quantize::None);
        assert!(!coordinator.trigger_position(7, 15, settings, Instant::now()));
    }

    #[test]
    fn trigger_applies_clock_settings() {
        let (mut coordinator, _tx) = rig();
        let t0 = Instant::now();

        let id = coordinator.store_mut().create_empty(0, 0, None);
        let settings = TransitionSettings::jump(0, Quantize::None).with_bpm(150.0);
        assert!(coordinator.trigger(&id, settings, t0));
        assert!((coordinator.clock().bpm() - 150.0).abs() < f64::EPSILON);
    }
}
