//! Transition engine — schedules Jump/Drop triggers and runs interpolation.
//!
//! The engine turns a trigger plus [`TransitionSettings`] into the right
//! sequence of sink messages at the right moments. It owns no timer threads:
//! scheduled deadlines and interpolation frames are absolute `Instant`s
//! serviced by [`TransitionEngine::poll`], which the host pumps alongside the
//! clock. The engine reads quantization deadlines from the clock, resolves
//! targets through the store, and writes every emitted value back into the
//! store's current-value shadow.

pub mod ease;
pub mod settings;

pub use ease::ease_out_cubic;
pub use settings::{TransitionMode, TransitionSettings, MAX_CYCLE_BARS, MAX_FADE_MS};

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::clock::{MusicalClock, Quantize};
use crate::message::WireMessage;
use crate::params::ParamId;
use crate::snapshot::{Snapshot, SnapshotId, SnapshotStore};

/// Interpolation frame pacing (~60 Hz).
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// A transition accepted but not yet fired.
#[derive(Debug, Clone)]
pub struct ScheduledTransition {
    pub snapshot_id: SnapshotId,
    pub mode: TransitionMode,
    /// Absolute wall-clock deadline. Fires even if the clock stops first.
    pub fire_at: Instant,
    /// Target bar index, for Drops.
    pub target_bar: Option<u64>,
    pub scheduled_at: Instant,
    pub settings: TransitionSettings,
}

/// State of an in-flight Jump fade.
pub struct InterpolationState {
    snapshot: Snapshot,
    starts: HashMap<ParamId, u8>,
    targets: HashMap<ParamId, u8>,
    /// Emission order: the snapshot's enabled parameters, in list order.
    order: Vec<ParamId>,
    started_at: Instant,
    duration_ms: u64,
    next_frame_at: Instant,
}

impl InterpolationState {
    /// The snapshot being moved toward, as resolved at interpolation start.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Shadow value a parameter started from.
    pub fn start_value(&self, param: &ParamId) -> Option<u8> {
        self.starts.get(param).copied()
    }

    /// Value a parameter is moving toward.
    pub fn target_value(&self, param: &ParamId) -> Option<u8> {
        self.targets.get(param).copied()
    }

    /// Linear progress in `[0, 1]` at the given instant.
    pub fn progress_at(&self, now: Instant) -> f64 {
        if self.duration_ms == 0 {
            return 1.0;
        }
        let elapsed_ms = now.saturating_duration_since(self.started_at).as_secs_f64() * 1000.0;
        (elapsed_ms / self.duration_ms as f64).clamp(0.0, 1.0)
    }
}

/// Progress notification passed to the update callback once per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolationProgress {
    pub snapshot_id: SnapshotId,
    pub progress: f64,
}

type MessageCallback = Box<dyn FnMut(&WireMessage)>;
type ProgressCallback = Box<dyn FnMut(&InterpolationProgress)>;
type CompleteCallback = Box<dyn FnMut(&Snapshot)>;

/// The transition scheduler and interpolator.
#[derive(Default)]
pub struct TransitionEngine {
    scheduled: Option<ScheduledTransition>,
    interp: Option<InterpolationState>,
    on_message: Option<MessageCallback>,
    on_progress: Option<ProgressCallback>,
    on_complete: Option<CompleteCallback>,
}

impl TransitionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the message sink. Messages are delivered synchronously.
    pub fn on_message(&mut self, callback: MessageCallback) {
        self.on_message = Some(callback);
    }

    /// Install the per-frame progress callback.
    pub fn on_interpolation_update(&mut self, callback: ProgressCallback) {
        self.on_progress = Some(callback);
    }

    /// Install the completion callback, fired once when a Jump reaches full
    /// progress or a Drop fires.
    pub fn on_complete(&mut self, callback: CompleteCallback) {
        self.on_complete = Some(callback);
    }

    /// Trigger a Jump. Cancels any active transition first. Returns `false`
    /// (a no-op) for unknown snapshot ids.
    pub fn execute_jump(
        &mut self,
        id: &SnapshotId,
        settings: TransitionSettings,
        now: Instant,
        clock: &MusicalClock,
        store: &mut SnapshotStore,
    ) -> bool {
        self.cancel();
        if store.get(id).is_none() {
            return false;
        }
        let delay_ms = match settings.quantize {
            Quantize::None => 0.0,
            q => clock.time_until_next_quantization(q),
        };
        if delay_ms <= 0.0 {
            self.begin_jump(now, id.clone(), &settings, store);
        } else {
            self.scheduled = Some(ScheduledTransition {
                snapshot_id: id.clone(),
                mode: TransitionMode::Jump,
                fire_at: now + Duration::from_secs_f64(delay_ms / 1000.0),
                target_bar: None,
                scheduled_at: now,
                settings,
            });
        }
        true
    }

    /// Trigger a Drop at the next cycle boundary. Cancels any active
    /// transition first. Returns `false` for unknown snapshot ids.
    pub fn execute_drop(
        &mut self,
        id: &SnapshotId,
        settings: TransitionSettings,
        now: Instant,
        clock: &MusicalClock,
        store: &mut SnapshotStore,
    ) -> bool {
        self.cancel();
        if store.get(id).is_none() {
            return false;
        }
        self.schedule_drop(id.clone(), settings, now, clock);
        true
    }

    /// Cancel any scheduled transition and any in-flight interpolation. On
    /// return no further callbacks or messages from them will fire; the
    /// shadow keeps whatever values were last emitted. Idempotent.
    pub fn cancel(&mut self) {
        self.scheduled = None;
        self.interp = None;
    }

    pub fn scheduled(&self) -> Option<&ScheduledTransition> {
        self.scheduled.as_ref()
    }

    pub fn interpolation(&self) -> Option<&InterpolationState> {
        self.interp.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.scheduled.is_some() || self.interp.is_some()
    }

    /// Service due deadlines: fire a scheduled transition whose instant has
    /// passed, then run every interpolation frame due at or before `now`.
    pub fn poll(&mut self, now: Instant, clock: &MusicalClock, store: &mut SnapshotStore) {
        let due = self.scheduled.as_ref().is_some_and(|s| s.fire_at <= now);
        if due {
            if let Some(s) = self.scheduled.take() {
                match s.mode {
                    TransitionMode::Jump => {
                        self.begin_jump(s.fire_at, s.snapshot_id.clone(), &s.settings, store)
                    }
                    TransitionMode::Drop => self.fire_drop(now, s, clock, store),
                }
            }
        }

        loop {
            let Some(interp) = self.interp.as_ref() else {
                break;
            };
            let frame_at = interp.next_frame_at;
            if frame_at > now {
                break;
            }
            self.step_frame(frame_at, store);
        }
    }

    /// Resolve targets, snapshot the shadow into start values, and begin the
    /// fade (or apply immediately for a zero duration).
    fn begin_jump(
        &mut self,
        start_at: Instant,
        id: SnapshotId,
        settings: &TransitionSettings,
        store: &mut SnapshotStore,
    ) {
        // The snapshot may have been deleted between scheduling and firing.
        let Some(snapshot) = store.get(&id).cloned() else {
            return;
        };

        let mut order = Vec::new();
        let mut starts = HashMap::new();
        let mut targets = HashMap::new();
        for p in snapshot.params.iter().filter(|p| p.enabled) {
            // Unregistered ids cannot be encoded; skip them silently.
            let Some(start) = store.get_current(&p.param) else {
                continue;
            };
            order.push(p.param.clone());
            starts.insert(p.param.clone(), start);
            targets.insert(p.param.clone(), p.value);
        }

        if settings.fade_ms == 0 {
            for param in &order {
                let target = targets[param];
                self.emit(store, param, target);
            }
            if let Some(callback) = self.on_complete.as_mut() {
                callback(&snapshot);
            }
            return;
        }

        self.interp = Some(InterpolationState {
            snapshot,
            starts,
            targets,
            order,
            started_at: start_at,
            duration_ms: settings.fade_ms,
            next_frame_at: start_at + FRAME_INTERVAL,
        });
    }

    /// Emit one interpolation frame timed at `frame_at`.
    fn step_frame(&mut self, frame_at: Instant, store: &mut SnapshotStore) {
        let Some(interp) = self.interp.as_ref() else {
            return;
        };
        let progress = interp.progress_at(frame_at);
        let eased = ease_out_cubic(progress);
        let snapshot_id = interp.snapshot.id.clone();
        let frame: Vec<(ParamId, u8, u8)> = interp
            .order
            .iter()
            .map(|p| (p.clone(), interp.starts[p], interp.targets[p]))
            .collect();

        for (param, start, target) in &frame {
            let value =
                (*start as f64 + (*target as f64 - *start as f64) * eased).round() as u8;
            self.emit(store, param, value);
        }

        if let Some(callback) = self.on_progress.as_mut() {
            callback(&InterpolationProgress {
                snapshot_id,
                progress,
            });
        }

        if progress >= 1.0 {
            if let Some(finished) = self.interp.take() {
                if let Some(callback) = self.on_complete.as_mut() {
                    callback(finished.snapshot());
                }
            }
        } else if let Some(interp) = self.interp.as_mut() {
            interp.next_frame_at += FRAME_INTERVAL;
        }
    }

    fn schedule_drop(
        &mut self,
        id: SnapshotId,
        settings: TransitionSettings,
        now: Instant,
        clock: &MusicalClock,
    ) {
        let target_bar = clock.next_cycle_bar(settings.cycle_bars);
        let delay_ms = clock.time_until_bar(target_bar);
        self.scheduled = Some(ScheduledTransition {
            snapshot_id: id,
            mode: TransitionMode::Drop,
            fire_at: now + Duration::from_secs_f64(delay_ms / 1000.0),
            target_bar: Some(target_bar),
            scheduled_at: now,
            settings,
        });
    }

    /// Push a Drop's full message sequence, update the shadow, complete, and
    /// re-schedule when repeating.
    fn fire_drop(
        &mut self,
        now: Instant,
        scheduled: ScheduledTransition,
        clock: &MusicalClock,
        store: &mut SnapshotStore,
    ) {
        let Some(snapshot) = store.get(&scheduled.snapshot_id).cloned() else {
            return;
        };
        let messages = store
            .outbound_messages(&scheduled.snapshot_id)
            .unwrap_or_default();
        for message in &messages {
            if let Some(callback) = self.on_message.as_mut() {
                callback(message);
            }
        }
        for p in snapshot.params.iter().filter(|p| p.enabled) {
            store.set_current(&p.param, p.value);
        }
        if let Some(callback) = self.on_complete.as_mut() {
            callback(&snapshot);
        }
        if scheduled.settings.repeat {
            self.schedule_drop(scheduled.snapshot_id, scheduled.settings, now, clock);
        }
    }

    fn emit(&mut self, store: &mut SnapshotStore, param: &ParamId, value: u8) {
        let message = store.registry().encode(param, value);
        if let Some(message) = message {
            if let Some(callback) = self.on_message.as_mut() {
                callback(&message);
            }
        }
        store.set_current(param, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ClockSource;
    use crate::params::{ids, ParameterRegistry};
    use std::cell::RefCell;
    use std::rc::Rc;

    type Sink = Rc<RefCell<Vec<WireMessage>>>;

    /// Engine wired to a collecting sink and a completion counter.
    fn rig() -> (TransitionEngine, Sink, Rc<RefCell<u32>>) {
        let mut engine = TransitionEngine::new();
        let sink: Sink = Rc::new(RefCell::new(Vec::new()));
        let completions = Rc::new(RefCell::new(0u32));
        {
            let sink = Rc::clone(&sink);
            engine.on_message(Box::new(move |m| sink.borrow_mut().push(m.clone())));
        }
        {
            let completions = Rc::clone(&completions);
            engine.on_complete(Box::new(move |_| *completions.borrow_mut() += 1));
        }
        (engine, sink, completions)
    }

    /// Clock slaved to synthetic external ticks so tests control position.
    fn external_clock(now: Instant) -> MusicalClock {
        let mut clock = MusicalClock::new(120.0);
        clock.set_source(ClockSource::External, now);
        clock.ingest_start();
        clock
    }

    fn store() -> SnapshotStore {
        SnapshotStore::new(ParameterRegistry::new())
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn jump_unquantized_runs_to_target() {
        let t0 = Instant::now();
        let clock = MusicalClock::new(120.0);
        let mut store = store();
        let (mut engine, sink, completions) = rig();

        let id = store.create_empty(0, 0, None);
        store.set_parameter(&id, ids::track_pan(3), 0, true);
        assert_eq!(store.get_current(&ids::track_pan(3)), Some(64));

        assert!(engine.execute_jump(
            &id,
            TransitionSettings::jump(1000, Quantize::None),
            t0,
            &clock,
            &mut store
        ));
        assert!(engine.interpolation().is_some());

        // Pump in 100 ms hops past the fade end.
        for step in 1..=11 {
            engine.poll(t0 + ms(step * 100), &clock, &mut store);
        }

        let messages = sink.borrow();
        assert!(
            messages.len() >= 55,
            "expected ~62 frames, got {}",
            messages.len()
        );
        // Values only descend toward the target.
        let values: Vec<u8> = messages
            .iter()
            .map(|m| match m {
                WireMessage::Cc { value, .. } => *value,
                other => panic!("unexpected message {other:?}"),
            })
            .collect();
        assert!(values.windows(2).all(|w| w[1] <= w[0]));
        assert_eq!(*values.last().unwrap(), 0);

        assert_eq!(store.get_current(&ids::track_pan(3)), Some(0));
        assert_eq!(*completions.borrow(), 1);
        assert!(!engine.is_active());
    }

    #[test]
    fn jump_zero_duration_emits_once_and_completes() {
        let t0 = Instant::now();
        let clock = MusicalClock::new(120.0);
        let mut store = store();
        let (mut engine, sink, completions) = rig();

        let id = store.create_empty(0, 0, None);
        store.set_parameter(&id, ids::track_volume(1), 10, true);

        engine.execute_jump(
            &id,
            TransitionSettings::jump(0, Quantize::None),
            t0,
            &clock,
            &mut store,
        );

        assert_eq!(sink.borrow().len(), 1);
        assert_eq!(
            sink.borrow()[0],
            WireMessage::Cc {
                channel: 1,
                cc: 7,
                value: 10
            }
        );
        assert_eq!(store.get_current(&ids::track_volume(1)), Some(10));
        assert_eq!(*completions.borrow(), 1);
        assert!(!engine.is_active());
    }

    #[test]
    fn jump_missing_snapshot_is_noop() {
        let t0 = Instant::now();
        let clock = MusicalClock::new(120.0);
        let mut store = store();
        let (mut engine, sink, _) = rig();

        let ok = engine.execute_jump(
            &SnapshotId::generate(),
            TransitionSettings::jump(100, Quantize::None),
            t0,
            &clock,
            &mut store,
        );
        assert!(!ok);
        assert!(!engine.is_active());
        assert!(sink.borrow().is_empty());
    }

    #[test]
    fn jump_quantized_to_bar_schedules_then_fires() {
        let t0 = Instant::now();
        let mut clock = external_clock(t0);
        let mut store = store();
        let (mut engine, sink, _) = rig();

        // Position (bar 0, beat 2): one second to the bar line at 120 BPM.
        for _ in 0..48 {
            clock.ingest_tick(t0);
        }

        let id = store.create_empty(0, 0, None);
        store.set_parameter(&id, ids::groove(), 100, true);
        engine.execute_jump(
            &id,
            TransitionSettings::jump(500, Quantize::Bar),
            t0,
            &clock,
            &mut store,
        );

        let scheduled = engine.scheduled().unwrap();
        let delay = scheduled.fire_at - t0;
        assert!((delay.as_millis() as i64 - 1000).abs() <= 1, "delay {delay:?}");

        // Nothing before the boundary.
        engine.poll(t0 + ms(990), &clock, &mut store);
        assert!(sink.borrow().is_empty());
        assert!(engine.scheduled().is_some());

        // Fires at the boundary, interpolation replaces the schedule.
        engine.poll(t0 + ms(1020), &clock, &mut store);
        assert!(engine.scheduled().is_none());
        assert!(engine.interpolation().is_some());
        assert!(!sink.borrow().is_empty());
    }

    #[test]
    fn jump_skips_disabled_and_unknown_params() {
        let t0 = Instant::now();
        let clock = MusicalClock::new(120.0);
        let mut store = store();
        let (mut engine, sink, _) = rig();

        let id = store.create_empty(0, 0, None);
        store.set_parameter(&id, ids::track_volume(1), 0, true);
        store.set_parameter(&id, ids::track_volume(2), 0, false);
        store.set_parameter(&id, ParamId::new("bogus"), 0, true);

        engine.execute_jump(
            &id,
            TransitionSettings::jump(0, Quantize::None),
            t0,
            &clock,
            &mut store,
        );

        assert_eq!(sink.borrow().len(), 1);
        assert_eq!(store.get_current(&ids::track_volume(2)), Some(100));
    }

    #[test]
    fn jump_does_not_emit_one_shots() {
        let t0 = Instant::now();
        let clock = MusicalClock::new(120.0);
        let mut store = store();
        let (mut engine, sink, _) = rig();

        let id = store.create_empty(0, 0, None);
        store.set_parameter(&id, ids::track_volume(1), 0, true);
        store.update(
            &id,
            crate::snapshot::SnapshotPatch {
                one_shots: Some(vec![WireMessage::ProgramChange {
                    channel: 1,
                    program: 9,
                }]),
                ..Default::default()
            },
        );

        engine.execute_jump(
            &id,
            TransitionSettings::jump(100, Quantize::None),
            t0,
            &clock,
            &mut store,
        );
        engine.poll(t0 + ms(200), &clock, &mut store);

        assert!(sink
            .borrow()
            .iter()
            .all(|m| !matches!(m, WireMessage::ProgramChange { .. })));
    }

    #[test]
    fn cancel_mid_jump_stops_everything() {
        let t0 = Instant::now();
        let clock = MusicalClock::new(120.0);
        let mut store = store();
        let (mut engine, sink, completions) = rig();

        let id = store.create_empty(0, 0, None);
        store.set_parameter(&id, ids::track_pan(3), 0, true);

        engine.execute_jump(
            &id,
            TransitionSettings::jump(1000, Quantize::None),
            t0,
            &clock,
            &mut store,
        );
        engine.poll(t0 + ms(500), &clock, &mut store);
        let emitted = sink.borrow().len();
        assert!(emitted > 0);

        engine.cancel();
        assert!(!engine.is_active());

        engine.poll(t0 + ms(2000), &clock, &mut store);
        assert_eq!(sink.borrow().len(), emitted);
        assert_eq!(*completions.borrow(), 0);

        // Shadow holds the last intermediate value, not start or target.
        let shadow = store.get_current(&ids::track_pan(3)).unwrap();
        assert!(shadow != 64 && shadow != 0, "shadow {shadow}");
    }

    #[test]
    fn cancel_is_idempotent() {
        let (mut engine, _, _) = rig();
        engine.cancel();
        engine.cancel();
        assert!(!engine.is_active());
    }

    #[test]
    fn drop_schedules_to_cycle_boundary_and_fires() {
        let t0 = Instant::now();
        let clock = {
            let mut c = MusicalClock::new(120.0);
            c.start(t0);
            c
        };
        let mut store = store();
        let (mut engine, sink, completions) = rig();

        let id = store.create_empty(0, 0, None);
        store.set_parameter(&id, ids::track_volume(1), 100, true);

        assert!(engine.execute_drop(
            &id,
            TransitionSettings::drop(1, false),
            t0,
            &clock,
            &mut store
        ));
        let scheduled = engine.scheduled().unwrap();
        assert_eq!(scheduled.target_bar, Some(1));
        let delay = scheduled.fire_at - t0;
        assert!(
            (delay.as_millis() as i64 - 2000).abs() <= 1,
            "delay {delay:?}"
        );

        engine.poll(t0 + ms(1999), &clock, &mut store);
        assert!(sink.borrow().is_empty());

        engine.poll(t0 + ms(2001), &clock, &mut store);
        assert_eq!(
            *sink.borrow(),
            vec![WireMessage::Cc {
                channel: 1,
                cc: 7,
                value: 100
            }]
        );
        assert_eq!(store.get_current(&ids::track_volume(1)), Some(100));
        assert_eq!(*completions.borrow(), 1);
        assert!(!engine.is_active());
    }

    #[test]
    fn drop_emits_one_shots_after_params() {
        let t0 = Instant::now();
        let clock = external_clock(t0);
        let mut store = store();
        let (mut engine, sink, _) = rig();

        let id = store.create_empty(0, 0, None);
        store.set_parameter(&id, ids::track_volume(1), 90, true);
        store.update(
            &id,
            crate::snapshot::SnapshotPatch {
                one_shots: Some(vec![WireMessage::ProgramChange {
                    channel: 1,
                    program: 4,
                }]),
                ..Default::default()
            },
        );

        engine.execute_drop(&id, TransitionSettings::drop(1, false), t0, &clock, &mut store);
        let fire_at = engine.scheduled().unwrap().fire_at;
        engine.poll(fire_at + ms(1), &clock, &mut store);

        assert_eq!(
            *sink.borrow(),
            vec![
                WireMessage::Cc {
                    channel: 1,
                    cc: 7,
                    value: 90
                },
                WireMessage::ProgramChange {
                    channel: 1,
                    program: 4
                },
            ]
        );
    }

    #[test]
    fn retrigger_overrides_previous_drop() {
        let t0 = Instant::now();
        let clock = external_clock(t0);
        let mut store = store();
        let (mut engine, sink, completions) = rig();

        let a = store.create_empty(0, 0, Some("a"));
        store.set_parameter(&a, ids::track_volume(1), 11, true);
        let b = store.create_empty(0, 1, Some("b"));
        store.set_parameter(&b, ids::track_volume(1), 99, true);

        engine.execute_drop(&a, TransitionSettings::drop(4, false), t0, &clock, &mut store);
        engine.execute_drop(&b, TransitionSettings::drop(4, false), t0, &clock, &mut store);

        let fire_at = engine.scheduled().unwrap().fire_at;
        engine.poll(fire_at + ms(1), &clock, &mut store);

        // Only B's message arrives, only one completion fires.
        assert_eq!(
            *sink.borrow(),
            vec![WireMessage::Cc {
                channel: 1,
                cc: 7,
                value: 99
            }]
        );
        assert_eq!(*completions.borrow(), 1);
    }

    #[test]
    fn repeating_drop_reschedules_next_cycle() {
        let t0 = Instant::now();
        let clock = external_clock(t0);
        let mut store = store();
        let (mut engine, _, completions) = rig();

        let id = store.create_empty(0, 0, None);
        store.set_parameter(&id, ids::groove(), 70, true);

        engine.execute_drop(&id, TransitionSettings::drop(1, true), t0, &clock, &mut store);
        let first_fire = engine.scheduled().unwrap().fire_at;
        engine.poll(first_fire + ms(1), &clock, &mut store);

        assert_eq!(*completions.borrow(), 1);
        let rescheduled = engine.scheduled().expect("repeat must re-schedule");
        assert_eq!(rescheduled.mode, TransitionMode::Drop);
        assert!(rescheduled.fire_at > first_fire);
        assert!(rescheduled.settings.repeat);
    }

    #[test]
    fn drop_on_deleted_snapshot_fires_nothing() {
        let t0 = Instant::now();
        let clock = external_clock(t0);
        let mut store = store();
        let (mut engine, sink, completions) = rig();

        let id = store.create_empty(0, 0, None);
        store.set_parameter(&id, ids::groove(), 70, true);
        engine.execute_drop(&id, TransitionSettings::drop(1, false), t0, &clock, &mut store);
        store.delete(&id);

        let fire_at = engine.scheduled().unwrap().fire_at;
        engine.poll(fire_at + ms(1), &clock, &mut store);
        assert!(sink.borrow().is_empty());
        assert_eq!(*completions.borrow(), 0);
        assert!(!engine.is_active());
    }

    #[test]
    fn progress_callback_reports_monotonic_progress() {
        let t0 = Instant::now();
        let clock = MusicalClock::new(120.0);
        let mut store = store();
        let (mut engine, _, _) = rig();

        let progress_log = Rc::new(RefCell::new(Vec::new()));
        {
            let log = Rc::clone(&progress_log);
            engine.on_interpolation_update(Box::new(move |p| log.borrow_mut().push(p.progress)));
        }

        let id = store.create_empty(0, 0, None);
        store.set_parameter(&id, ids::track_volume(1), 0, true);
        engine.execute_jump(
            &id,
            TransitionSettings::jump(200, Quantize::None),
            t0,
            &clock,
            &mut store,
        );
        for step in 1..=5 {
            engine.poll(t0 + ms(step * 50), &clock, &mut store);
        }

        let log = progress_log.borrow();
        assert!(!log.is_empty());
        assert!(log.windows(2).all(|w| w[1] >= w[0]));
        assert!((log.last().unwrap() - 1.0).abs() < f64::EPSILON);
    }
}
