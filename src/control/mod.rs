//! The control surface: tunable parameters, MIDI CC bindings and the state
//! an external project file would persist.

pub mod mapping;
pub mod parameter;
pub mod state;

pub use mapping::{CcMapper, ControlAction};
pub use parameter::{Parameter, ParameterBank, ParameterTarget};
pub use state::ProjectState;
