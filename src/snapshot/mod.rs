//! Snapshot store — owns the snapshot grid and the current-value shadow.
//!
//! The store is the single owner of two pieces of state: the snapshot set
//! (a flat list addressed by id and by (bank, slot) position) and the
//! current-value shadow, the engine's best guess at the downstream device's
//! parameter state. The shadow is the source of truth for interpolation
//! start points and is only written through [`SnapshotStore::set_current`].

pub mod persistence;
pub mod types;

pub use types::{Snapshot, SnapshotId, SnapshotParam, SnapshotPatch, BANKS, SLOTS_PER_BANK};

use std::collections::HashMap;

use crate::message::WireMessage;
use crate::params::{ParamId, ParameterRegistry};

/// Owner of the snapshot set and the current-value shadow.
pub struct SnapshotStore {
    registry: ParameterRegistry,
    snapshots: Vec<Snapshot>,
    current: HashMap<ParamId, u8>,
}

impl SnapshotStore {
    /// Create an empty store. The shadow starts at the registry defaults.
    pub fn new(registry: ParameterRegistry) -> Self {
        let current = registry
            .iter()
            .map(|d| (d.id.clone(), d.default))
            .collect();
        Self {
            registry,
            snapshots: Vec::new(),
            current,
        }
    }

    /// The parameter catalogue this store encodes against.
    pub fn registry(&self) -> &ParameterRegistry {
        &self.registry
    }

    // ------------------------------------------------------------------
    // Snapshot set
    // ------------------------------------------------------------------

    /// Create a snapshot with no parameters at (bank, slot).
    pub fn create_empty(&mut self, bank: u8, slot: u8, name: Option<&str>) -> SnapshotId {
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| format!("Snapshot {bank}-{slot}"));
        let snapshot = Snapshot::new(bank, slot, name);
        let id = snapshot.id.clone();
        self.snapshots.push(snapshot);
        id
    }

    /// Capture the full current-value shadow into a new snapshot, every
    /// parameter enabled, in catalogue order.
    pub fn capture(&mut self, bank: u8, slot: u8, name: Option<&str>) -> SnapshotId {
        let id = self.create_empty(bank, slot, name);
        let params: Vec<SnapshotParam> = self
            .registry
            .iter()
            .map(|def| {
                let value = self.current.get(&def.id).copied().unwrap_or(def.default);
                SnapshotParam::new(def.id.clone(), value)
            })
            .collect();
        if let Some(s) = self.snapshots.iter_mut().find(|s| s.id == id) {
            s.params = params;
        }
        id
    }

    pub fn get(&self, id: &SnapshotId) -> Option<&Snapshot> {
        self.snapshots.iter().find(|s| &s.id == id)
    }

    /// First snapshot at (bank, slot), in insertion order. The store does not
    /// enforce position uniqueness.
    pub fn find_by_position(&self, bank: u8, slot: u8) -> Option<&Snapshot> {
        self.snapshots
            .iter()
            .find(|s| s.bank == bank && s.slot == slot)
    }

    pub fn list_all(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn list_by_bank(&self, bank: u8) -> Vec<&Snapshot> {
        self.snapshots.iter().filter(|s| s.bank == bank).collect()
    }

    /// Merge allowed field updates into a snapshot and bump its modified
    /// time. Returns `false` for unknown ids.
    pub fn update(&mut self, id: &SnapshotId, patch: SnapshotPatch) -> bool {
        let Some(s) = self.snapshots.iter_mut().find(|s| &s.id == id) else {
            return false;
        };
        if let Some(name) = patch.name {
            s.name = name;
        }
        if let Some(mut params) = patch.params {
            for p in &mut params {
                p.value = p.value.min(127);
            }
            s.params = params;
        }
        if let Some(one_shots) = patch.one_shots {
            s.one_shots = one_shots;
        }
        if let Some(color) = patch.color {
            s.color = color;
        }
        s.touch();
        true
    }

    /// Upsert one parameter value in a snapshot. Returns `false` for unknown
    /// snapshot ids.
    pub fn set_parameter(
        &mut self,
        id: &SnapshotId,
        param: ParamId,
        value: u8,
        enabled: bool,
    ) -> bool {
        let Some(s) = self.snapshots.iter_mut().find(|s| &s.id == id) else {
            return false;
        };
        s.set_param(param, value, enabled);
        s.touch();
        true
    }

    /// Remove one parameter from a snapshot.
    pub fn remove_parameter(&mut self, id: &SnapshotId, param: &ParamId) -> bool {
        let Some(s) = self.snapshots.iter_mut().find(|s| &s.id == id) else {
            return false;
        };
        let removed = s.remove_param(param);
        if removed {
            s.touch();
        }
        removed
    }

    /// Flip a parameter's enabled flag.
    pub fn toggle_parameter_enabled(&mut self, id: &SnapshotId, param: &ParamId) -> bool {
        let Some(s) = self.snapshots.iter_mut().find(|s| &s.id == id) else {
            return false;
        };
        let Some(p) = s.params.iter_mut().find(|p| &p.param == param) else {
            return false;
        };
        p.enabled = !p.enabled;
        s.touch();
        true
    }

    pub fn delete(&mut self, id: &SnapshotId) -> bool {
        let before = self.snapshots.len();
        self.snapshots.retain(|s| &s.id != id);
        self.snapshots.len() != before
    }

    /// Duplicate a snapshot into another cell with a fresh id, a "(copy)"
    /// name suffix, and fresh timestamps.
    pub fn copy(&mut self, src: &SnapshotId, dst_bank: u8, dst_slot: u8) -> Option<SnapshotId> {
        let src = self.get(src)?.clone();
        let mut dst = Snapshot::new(dst_bank, dst_slot, format!("{} (copy)", src.name));
        dst.params = src.params;
        dst.one_shots = src.one_shots;
        dst.color = src.color;
        let id = dst.id.clone();
        self.snapshots.push(dst);
        Some(id)
    }

    /// Unoccupied slot indices in a bank, ascending.
    pub fn empty_positions(&self, bank: u8, slots_per_bank: u8) -> Vec<u8> {
        (0..slots_per_bank)
            .filter(|&slot| self.find_by_position(bank, slot).is_none())
            .collect()
    }

    /// First unoccupied (bank, slot) scanning lexicographically from
    /// `start_bank`.
    pub fn next_available(
        &self,
        start_bank: u8,
        slots_per_bank: u8,
        total_banks: u8,
    ) -> Option<(u8, u8)> {
        for bank in start_bank..total_banks {
            for slot in 0..slots_per_bank {
                if self.find_by_position(bank, slot).is_none() {
                    return Some((bank, slot));
                }
            }
        }
        None
    }

    // ------------------------------------------------------------------
    // Current-value shadow
    // ------------------------------------------------------------------

    /// Last emitted value for a parameter, or its registry default if never
    /// emitted. Unknown ids return `None`.
    pub fn get_current(&self, param: &ParamId) -> Option<u8> {
        self.current.get(param).copied()
    }

    /// Record an emitted value in the shadow, clamped to 0–127. Returns
    /// `false` for ids not in the catalogue.
    pub fn set_current(&mut self, param: &ParamId, value: u8) -> bool {
        if self.registry.get(param).is_none() {
            return false;
        }
        self.current.insert(param.clone(), value.min(127));
        true
    }

    /// Reset the shadow to the registry defaults.
    pub fn reset_current(&mut self) {
        self.current = self
            .registry
            .iter()
            .map(|d| (d.id.clone(), d.default))
            .collect();
    }

    // ------------------------------------------------------------------
    // Transition material
    // ------------------------------------------------------------------

    /// Target values for a snapshot's enabled parameters.
    pub fn interpolation_targets(&self, id: &SnapshotId) -> Option<HashMap<ParamId, u8>> {
        let s = self.get(id)?;
        Some(
            s.params
                .iter()
                .filter(|p| p.enabled)
                .map(|p| (p.param.clone(), p.value))
                .collect(),
        )
    }

    /// The ordered outbound message sequence for a snapshot: every enabled
    /// parameter encoded through the registry (unknown ids skipped), then the
    /// one-shot messages in order.
    pub fn outbound_messages(&self, id: &SnapshotId) -> Option<Vec<WireMessage>> {
        let s = self.get(id)?;
        let mut out: Vec<WireMessage> = s
            .params
            .iter()
            .filter(|p| p.enabled)
            .filter_map(|p| self.registry.encode(&p.param, p.value))
            .collect();
        out.extend(s.one_shots.iter().cloned());
        Some(out)
    }

    // ------------------------------------------------------------------
    // Bulk exchange with persistence collaborators
    // ------------------------------------------------------------------

    /// Replace the whole snapshot set.
    pub fn load(&mut self, snapshots: Vec<Snapshot>) {
        self.snapshots = snapshots;
    }

    /// Clone out the whole snapshot set.
    pub fn export(&self) -> Vec<Snapshot> {
        self.snapshots.clone()
    }
}
