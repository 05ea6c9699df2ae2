//! Snapshot persistence — YAML load/save for the snapshot set.
//!
//! The durable-storage collaborator at the store's `load`/`export` boundary.
//! Loading is also a boundary of entry for domain values: a hand-edited or
//! stale file can carry out-of-grid positions, out-of-range values, duplicate
//! parameter entries, or two snapshots claiming one cell. The loader repairs
//! what it can and reports what it found instead of handing the store a set
//! the engine could never have produced.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use super::types::{Snapshot, BANKS, SLOTS_PER_BANK};

/// Default path for the snapshot set.
pub fn default_store_path() -> PathBuf {
    let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(".snapshift");
    path.push("snapshots.yaml");
    path
}

/// A sanitized snapshot set read from disk, plus what was repaired on entry.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub snapshots: Vec<Snapshot>,
    /// Snapshots whose position, values, or duplicated parameter entries had
    /// to be repaired.
    pub repaired: usize,
    /// Grid cells claimed by more than one snapshot. Position lookups resolve
    /// to the first occupant; the others stay addressable by id.
    pub collisions: Vec<(u8, u8)>,
}

impl LoadReport {
    /// Just the snapshots, for callers that don't inspect the repairs.
    pub fn into_snapshots(self) -> Vec<Snapshot> {
        self.snapshots
    }
}

/// Load a snapshot set from a YAML file, sanitizing each record on the way
/// in. A missing file yields an empty report.
pub fn load_snapshots(path: &Path) -> Result<LoadReport, io::Error> {
    if !path.exists() {
        return Ok(LoadReport::default());
    }
    let content = std::fs::read_to_string(path)?;
    let raw: Vec<Snapshot> = serde_yaml::from_str(&content)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(sanitize(raw))
}

/// Save a snapshot set to a YAML file, creating parent directories as
/// needed. Snapshots are written in grid order so the file stays stable
/// under in-memory reshuffles.
pub fn save_snapshots(path: &Path, snapshots: &[Snapshot]) -> Result<(), io::Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut ordered: Vec<&Snapshot> = snapshots.iter().collect();
    ordered.sort_by_key(|s| (s.bank, s.slot));
    let yaml = serde_yaml::to_string(&ordered).map_err(io::Error::other)?;
    std::fs::write(path, yaml)
}

/// Clamp positions and values into their domains, drop duplicated parameter
/// ids (first occurrence wins), and flag grid cells with multiple occupants.
fn sanitize(raw: Vec<Snapshot>) -> LoadReport {
    let mut report = LoadReport::default();

    for mut snapshot in raw {
        let mut touched = false;

        let bank = snapshot.bank.min(BANKS - 1);
        let slot = snapshot.slot.min(SLOTS_PER_BANK - 1);
        if (bank, slot) != (snapshot.bank, snapshot.slot) {
            snapshot.bank = bank;
            snapshot.slot = slot;
            touched = true;
        }

        let mut seen_params = HashSet::new();
        let params_before = snapshot.params.len();
        snapshot.params.retain(|p| seen_params.insert(p.param.clone()));
        if snapshot.params.len() != params_before {
            touched = true;
        }
        for p in &mut snapshot.params {
            if p.value > 127 {
                p.value = 127;
                touched = true;
            }
        }

        if touched {
            report.repaired += 1;
        }
        report.snapshots.push(snapshot);
    }

    let mut occupied = HashSet::new();
    let mut flagged = HashSet::new();
    for snapshot in &report.snapshots {
        let cell = (snapshot.bank, snapshot.slot);
        if !occupied.insert(cell) && flagged.insert(cell) {
            report.collisions.push(cell);
        }
    }

    report
}
