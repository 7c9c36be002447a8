use crate::{io::midi::MidiEvent, render::RenderMessage};

/// Translate note messages for the renderer's note bookkeeping. Control and
/// program changes go through the CC mapper instead.
pub fn midi_to_render(midi: MidiEvent) -> Option<RenderMessage> {
    match midi {
        MidiEvent::NoteOn {
            channel,
            key,
            velocity,
        } => Some(RenderMessage::NoteOn {
            channel,
            key,
            velocity,
        }),
        MidiEvent::NoteOff { channel, key, .. } => Some(RenderMessage::NoteOff { channel, key }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_notes_convert() {
        assert_eq!(
            midi_to_render(MidiEvent::NoteOff { channel: 2, key: 40, velocity: 64 }),
            Some(RenderMessage::NoteOff { channel: 2, key: 40 })
        );
        assert_eq!(
            midi_to_render(MidiEvent::ControlChange { channel: 0, controller: 1, value: 2 }),
            None
        );
    }
}
