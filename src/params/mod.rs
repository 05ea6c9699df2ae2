//! Parameter registry — the immutable catalogue of addressable groovebox parameters.
//!
//! Each [`ParameterDef`] describes one parameter the downstream device exposes:
//! a stable textual id, its wire encoding (channel plus CC/PC/Note/NRPN), a
//! default value, and a category. The registry is built once at startup and
//! never mutated; everything downstream (snapshot store, transition engine)
//! resolves ids through it.

pub mod convert;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::message::WireMessage;

/// Stable textual identifier for a parameter (e.g. `tempo`, `track_7_pan`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamId(pub String);

impl ParamId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Parameter category tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Scene,
    Tempo,
    Track,
    Groove,
    Transport,
}

/// How a parameter value is addressed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireEncoding {
    /// Control Change with the given controller number.
    Cc { cc: u8 },
    /// Program Change; the parameter value becomes the program number.
    ProgramChange,
    /// Note trigger. `velocity` is the default used for one-shot triggers.
    Note { note: u8, velocity: u8 },
    /// NRPN pair; the raw-byte form is the CC99/CC98/CC6 triplet.
    Nrpn { msb: u8, lsb: u8 },
}

/// One catalogue entry.
#[derive(Debug, Clone)]
pub struct ParameterDef {
    pub id: ParamId,
    pub name: String,
    /// MIDI channel 1–16.
    pub channel: u8,
    pub encoding: WireEncoding,
    /// Default wire value 0–127; also the initial current-value shadow entry.
    pub default: u8,
    pub category: Category,
}

/// The number of device tracks covered by the generated CC family.
pub const TRACK_COUNT: u8 = 16;

/// Well-known parameter ids.
pub mod ids {
    use super::ParamId;

    /// Delayed scene change trigger (CC82, channel 1).
    pub fn delayed_scene() -> ParamId {
        ParamId("delayed_scene".to_string())
    }

    /// Previous scene trigger (CC83, channel 1).
    pub fn prev_scene() -> ParamId {
        ParamId("prev_scene".to_string())
    }

    /// Next scene trigger (CC84, channel 1).
    pub fn next_scene() -> ParamId {
        ParamId("next_scene".to_string())
    }

    /// Direct scene select (CC85, channel 1).
    pub fn scene_direct() -> ParamId {
        ParamId("scene_direct".to_string())
    }

    /// Global tempo (CC80, channel 1, default 64 ≈ centre of the 40–240 range).
    pub fn tempo() -> ParamId {
        ParamId("tempo".to_string())
    }

    /// Global groove amount (CC81, channel 1, default 64).
    pub fn groove() -> ParamId {
        ParamId("groove".to_string())
    }

    /// Track volume (CC7 on the track's channel, default 100). Tracks are 1-based.
    pub fn track_volume(track: u8) -> ParamId {
        ParamId(format!("track_{track}_volume"))
    }

    /// Track mute (CC9 on the track's channel, default 0).
    pub fn track_mute(track: u8) -> ParamId {
        ParamId(format!("track_{track}_mute"))
    }

    /// Track pan (CC10 on the track's channel, default 64 = centre).
    pub fn track_pan(track: u8) -> ParamId {
        ParamId(format!("track_{track}_pan"))
    }
}

/// Immutable parameter catalogue with id / wire / category lookup.
#[derive(Debug, Clone)]
pub struct ParameterRegistry {
    defs: Vec<ParameterDef>,
    by_id: HashMap<ParamId, usize>,
}

impl ParameterRegistry {
    /// Build the full catalogue: fixed global parameters plus the generated
    /// 16-track volume/mute/pan family.
    pub fn new() -> Self {
        let mut defs = Vec::new();

        let fixed = [
            ("delayed_scene", "Delayed Scene", 82u8, 0u8, Category::Scene),
            ("prev_scene", "Previous Scene", 83, 0, Category::Scene),
            ("next_scene", "Next Scene", 84, 0, Category::Scene),
            ("scene_direct", "Scene Direct", 85, 0, Category::Scene),
            ("tempo", "Tempo", 80, 64, Category::Tempo),
            ("groove", "Groove", 81, 64, Category::Groove),
        ];
        for (id, name, cc, default, category) in fixed {
            defs.push(ParameterDef {
                id: ParamId::new(id),
                name: name.to_string(),
                channel: 1,
                encoding: WireEncoding::Cc { cc },
                default,
                category,
            });
        }

        defs.extend(track_family());

        Self::from_defs(defs)
    }

    /// Build a registry from an explicit catalogue. Later duplicates of an id
    /// shadow earlier ones in lookups.
    pub fn from_defs(defs: Vec<ParameterDef>) -> Self {
        let by_id = defs
            .iter()
            .enumerate()
            .map(|(i, d)| (d.id.clone(), i))
            .collect();
        Self { defs, by_id }
    }

    /// Look up a parameter by id.
    pub fn get(&self, id: &ParamId) -> Option<&ParameterDef> {
        self.by_id.get(id).map(|&i| &self.defs[i])
    }

    /// Look up a CC-encoded parameter by (channel, controller number).
    pub fn by_channel_cc(&self, channel: u8, cc: u8) -> Option<&ParameterDef> {
        self.defs.iter().find(|d| {
            d.channel == channel && matches!(d.encoding, WireEncoding::Cc { cc: c } if c == cc)
        })
    }

    /// All parameters in the given category, in catalogue order.
    pub fn by_category(&self, category: Category) -> Vec<&ParameterDef> {
        self.defs.iter().filter(|d| d.category == category).collect()
    }

    /// Iterate the catalogue in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &ParameterDef> {
        self.defs.iter()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Encode a (parameter, value) pair into a wire message.
    ///
    /// Values are clamped to 0–127. Unknown ids return `None`.
    pub fn encode(&self, id: &ParamId, value: u8) -> Option<WireMessage> {
        let def = self.get(id)?;
        let value = value.min(127);
        Some(match def.encoding {
            WireEncoding::Cc { cc } => WireMessage::Cc {
                channel: def.channel,
                cc,
                value,
            },
            WireEncoding::ProgramChange => WireMessage::ProgramChange {
                channel: def.channel,
                program: value,
            },
            WireEncoding::Note { note, .. } => WireMessage::Note {
                channel: def.channel,
                note,
                velocity: value,
                on: value > 0,
            },
            WireEncoding::Nrpn { msb, lsb } => WireMessage::Nrpn {
                channel: def.channel,
                msb,
                lsb,
                value,
            },
        })
    }
}

impl Default for ParameterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate the per-track CC family: volume CC7, mute CC9, pan CC10 on
/// channels 1–16.
pub fn track_family() -> Vec<ParameterDef> {
    let mut defs = Vec::with_capacity(TRACK_COUNT as usize * 3);
    for track in 1..=TRACK_COUNT {
        defs.push(ParameterDef {
            id: ids::track_volume(track),
            name: format!("Track {track} Volume"),
            channel: track,
            encoding: WireEncoding::Cc { cc: 7 },
            default: 100,
            category: Category::Track,
        });
        defs.push(ParameterDef {
            id: ids::track_mute(track),
            name: format!("Track {track} Mute"),
            channel: track,
            encoding: WireEncoding::Cc { cc: 9 },
            default: 0,
            category: Category::Track,
        });
        defs.push(ParameterDef {
            id: ids::track_pan(track),
            name: format!("Track {track} Pan"),
            channel: track,
            encoding: WireEncoding::Cc { cc: 10 },
            default: 64,
            category: Category::Track,
        });
    }
    defs
}
