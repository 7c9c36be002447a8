/// Highest controller number that can drive a parameter. 120..=127 are
/// channel mode messages.
pub const MAX_CC: u8 = 119;
/// Channel mode controller that releases every held note.
pub const ALL_NOTES_OFF: u8 = 123;
/// Largest 7-bit data value.
pub const MAX_VALUE: u8 = 127;

/// A decoded MIDI channel message. Transport and decoding happen elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8, velocity: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    PitchBend { channel: u8, value: i16 },
    ProgramChange { channel: u8, program: u8 },
}

impl MidiEvent {
    pub fn channel(&self) -> u8 {
        match *self {
            MidiEvent::NoteOn { channel, .. }
            | MidiEvent::NoteOff { channel, .. }
            | MidiEvent::ControlChange { channel, .. }
            | MidiEvent::PitchBend { channel, .. }
            | MidiEvent::ProgramChange { channel, .. } => channel,
        }
    }

    /// Decode a raw three-byte (or two-byte) channel message.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let (&status, data) = bytes.split_first()?;
        let channel = status & 0x0f;
        let first = *data.first()? & 0x7f;
        let second = data.get(1).map(|b| b & 0x7f);

        match status & 0xf0 {
            0x80 => Some(MidiEvent::NoteOff {
                channel,
                key: first,
                velocity: second?,
            }),
            0x90 => Some(MidiEvent::NoteOn {
                channel,
                key: first,
                velocity: second?,
            }),
            0xb0 => Some(MidiEvent::ControlChange {
                channel,
                controller: first,
                value: second?,
            }),
            0xc0 => Some(MidiEvent::ProgramChange {
                channel,
                program: first,
            }),
            0xe0 => {
                let raw = ((second? as i16) << 7) | first as i16;
                Some(MidiEvent::PitchBend {
                    channel,
                    value: raw - 8192,
                })
            }
            _ => None,
        }
    }
}
