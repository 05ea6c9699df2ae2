//! Wire messages — the abstract outbound messages accepted by the sink.
//!
//! A [`WireMessage`] is one parameter-addressed MIDI message with the channel
//! kept in its human 1–16 form. Raw-byte encoding happens only at the
//! transport boundary ([`WireMessage::to_bytes`]); an NRPN message expands
//! there into its CC99/CC98/CC6 triplet.

use serde::{Deserialize, Serialize};

/// MIDI realtime Start.
pub const MIDI_START: u8 = 0xFA;
/// MIDI realtime Continue.
pub const MIDI_CONTINUE: u8 = 0xFB;
/// MIDI realtime Stop.
pub const MIDI_STOP: u8 = 0xFC;
/// MIDI realtime Timing Clock (24 PPQN).
pub const MIDI_CLOCK: u8 = 0xF8;

/// One outbound parameter message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireMessage {
    /// Control Change.
    Cc { channel: u8, cc: u8, value: u8 },
    /// Program Change.
    ProgramChange { channel: u8, program: u8 },
    /// Note On (`on == true`) or Note Off.
    Note {
        channel: u8,
        note: u8,
        velocity: u8,
        on: bool,
    },
    /// Non-Registered Parameter Number write.
    Nrpn {
        channel: u8,
        msb: u8,
        lsb: u8,
        value: u8,
    },
}

impl WireMessage {
    /// The MIDI channel (1–16) this message targets.
    pub fn channel(&self) -> u8 {
        match *self {
            WireMessage::Cc { channel, .. }
            | WireMessage::ProgramChange { channel, .. }
            | WireMessage::Note { channel, .. }
            | WireMessage::Nrpn { channel, .. } => channel,
        }
    }

    /// Encode into raw MIDI messages, one byte vector per message to send.
    ///
    /// NRPN expands into three CC messages (CC99 = MSB, CC98 = LSB, CC6 =
    /// value) in that order. Channels outside 1–16 are clamped.
    pub fn to_bytes(&self) -> Vec<Vec<u8>> {
        match *self {
            WireMessage::Cc { channel, cc, value } => {
                vec![vec![0xB0 | channel_nibble(channel), cc.min(127), value.min(127)]]
            }
            WireMessage::ProgramChange { channel, program } => {
                vec![vec![0xC0 | channel_nibble(channel), program.min(127)]]
            }
            WireMessage::Note {
                channel,
                note,
                velocity,
                on,
            } => {
                let status = if on { 0x90 } else { 0x80 };
                vec![vec![
                    status | channel_nibble(channel),
                    note.min(127),
                    velocity.min(127),
                ]]
            }
            WireMessage::Nrpn {
                channel,
                msb,
                lsb,
                value,
            } => {
                let status = 0xB0 | channel_nibble(channel);
                vec![
                    vec![status, 99, msb.min(127)],
                    vec![status, 98, lsb.min(127)],
                    vec![status, 6, value.min(127)],
                ]
            }
        }
    }
}

fn channel_nibble(channel: u8) -> u8 {
    channel.clamp(1, 16) - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cc_bytes() {
        let msg = WireMessage::Cc {
            channel: 1,
            cc: 7,
            value: 100,
        };
        assert_eq!(msg.to_bytes(), vec![vec![0xB0, 7, 100]]);
    }

    #[test]
    fn cc_channel_nibble() {
        let msg = WireMessage::Cc {
            channel: 16,
            cc: 10,
            value: 64,
        };
        assert_eq!(msg.to_bytes(), vec![vec![0xBF, 10, 64]]);
    }

    #[test]
    fn program_change_bytes() {
        let msg = WireMessage::ProgramChange {
            channel: 2,
            program: 5,
        };
        assert_eq!(msg.to_bytes(), vec![vec![0xC1, 5]]);
    }

    #[test]
    fn note_on_and_off_bytes() {
        let on = WireMessage::Note {
            channel: 10,
            note: 36,
            velocity: 110,
            on: true,
        };
        assert_eq!(on.to_bytes(), vec![vec![0x99, 36, 110]]);

        let off = WireMessage::Note {
            channel: 10,
            note: 36,
            velocity: 0,
            on: false,
        };
        assert_eq!(off.to_bytes(), vec![vec![0x89, 36, 0]]);
    }

    #[test]
    fn nrpn_expands_to_cc_triplet_in_order() {
        let msg = WireMessage::Nrpn {
            channel: 1,
            msb: 1,
            lsb: 52,
            value: 99,
        };
        assert_eq!(
            msg.to_bytes(),
            vec![vec![0xB0, 99, 1], vec![0xB0, 98, 52], vec![0xB0, 6, 99]]
        );
    }

    #[test]
    fn out_of_range_channel_clamps() {
        let msg = WireMessage::Cc {
            channel: 0,
            cc: 7,
            value: 1,
        };
        assert_eq!(msg.to_bytes()[0][0], 0xB0);

        let msg = WireMessage::Cc {
            channel: 99,
            cc: 7,
            value: 1,
        };
        assert_eq!(msg.to_bytes()[0][0], 0xBF);
    }

    #[test]
    fn channel_accessor() {
        let msg = WireMessage::Nrpn {
            channel: 9,
            msb: 0,
            lsb: 0,
            value: 0,
        };
        assert_eq!(msg.channel(), 9);
    }

    #[test]
    fn serialize_round_trip() {
        let msg = WireMessage::Note {
            channel: 10,
            note: 36,
            velocity: 100,
            on: true,
        };
        let yaml = serde_yaml::to_string(&msg).unwrap();
        let parsed: WireMessage = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, msg);
    }
}
