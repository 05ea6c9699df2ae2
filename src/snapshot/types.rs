//! Snapshot records — named parameter-value sets addressed by (bank, slot).

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::WireMessage;
use crate::params::ParamId;

/// Number of banks in the grid.
pub const BANKS: u8 = 8;
/// Number of slots per bank.
pub const SLOTS_PER_BANK: u8 = 16;

/// Opaque stable snapshot identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotId(String);

impl SnapshotId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One captured parameter value inside a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotParam {
    pub param: ParamId,
    /// Wire value, clamped to 0–127.
    pub value: u8,
    /// Disabled parameters are kept but never emitted or interpolated.
    pub enabled: bool,
}

impl SnapshotParam {
    pub fn new(param: ParamId, value: u8) -> Self {
        Self {
            param,
            value: value.min(127),
            enabled: true,
        }
    }
}

/// A named parameter-value set living in one grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    pub name: String,
    /// Bank 0–7.
    pub bank: u8,
    /// Slot 0–15.
    pub slot: u8,
    pub params: Vec<SnapshotParam>,
    /// Pre-formed messages sent once on Drop, never interpolated toward.
    #[serde(default)]
    pub one_shots: Vec<WireMessage>,
    #[serde(default)]
    pub color: Option<String>,
    pub created_at: SystemTime,
    pub modified_at: SystemTime,
}

impl Snapshot {
    /// Create an empty snapshot at (bank, slot). Out-of-grid positions clamp.
    pub fn new(bank: u8, slot: u8, name: impl Into<String>) -> Self {
        let now = SystemTime::now();
        Self {
            id: SnapshotId::generate(),
            name: name.into(),
            bank: bank.min(BANKS - 1),
            slot: slot.min(SLOTS_PER_BANK - 1),
            params: Vec::new(),
            one_shots: Vec::new(),
            color: None,
            created_at: now,
            modified_at: now,
        }
    }

    /// Find a parameter entry by id.
    pub fn param(&self, id: &ParamId) -> Option<&SnapshotParam> {
        self.params.iter().find(|p| &p.param == id)
    }

    /// Upsert a parameter value. Keeps parameter ids unique within the
    /// snapshot; values clamp to 0–127.
    pub fn set_param(&mut self, id: ParamId, value: u8, enabled: bool) {
        let value = value.min(127);
        if let Some(p) = self.params.iter_mut().find(|p| p.param == id) {
            p.value = value;
            p.enabled = enabled;
        } else {
            self.params.push(SnapshotParam {
                param: id,
                value,
                enabled,
            });
        }
    }

    /// Remove a parameter entry. Returns `false` if absent.
    pub fn remove_param(&mut self, id: &ParamId) -> bool {
        let before = self.params.len();
        self.params.retain(|p| &p.param != id);
        self.params.len() != before
    }

    /// Bump the modification timestamp.
    pub fn touch(&mut self) {
        self.modified_at = SystemTime::now();
    }
}

/// Field updates merged into a snapshot by [`SnapshotStore::update`].
///
/// [`SnapshotStore::update`]: crate::snapshot::SnapshotStore::update
#[derive(Debug, Clone, Default)]
pub struct SnapshotPatch {
    pub name: Option<String>,
    pub params: Option<Vec<SnapshotParam>>,
    pub one_shots: Option<Vec<WireMessage>>,
    pub color: Option<Option<String>>,
}
