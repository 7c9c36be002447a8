// Purpose - external interfaces: MIDI events in, audio devices out

pub mod converter;
pub mod device;
pub mod midi;

pub use device::{AudioBackend, AudioDevice, CpalBackend, OutputStream};
pub use midi::MidiEvent;
