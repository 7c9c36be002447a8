#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::control::{CcMapper, ParameterBank, ParameterTarget};

/// Everything a project file needs to bring the control surface back:
/// parameter values and MIDI bindings, both keyed by parameter label.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectState {
    pub parameters: Vec<(String, f32)>,
    pub midi: Vec<(String, u8)>,
}

impl ProjectState {
    pub fn capture(parameters: &ParameterBank, mapper: &CcMapper) -> Self {
        Self {
            parameters: parameters.snapshot(),
            midi: mapper.snapshot(),
        }
    }

    /// Load into `parameters` and `mapper`, skipping bad entries. Returns the
    /// parameters whose values changed so the caller can push them out.
    pub fn apply(&self, parameters: &mut ParameterBank, mapper: &mut CcMapper) -> Vec<ParameterTarget> {
        let changed = parameters.restore(&self.parameters);
        mapper.restore(&self.midi, parameters);
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_and_apply() {
        let mut bank = ParameterBank::standard(0.2);
        let mut mapper = CcMapper::new();
        bank.set(ParameterTarget::Scale, 0.5);
        mapper.bind(30, ParameterTarget::Quality);
        let state = ProjectState::capture(&bank, &mapper);

        let mut fresh_bank = ParameterBank::standard(0.2);
        let mut fresh_mapper = CcMapper::new();
        let changed = state.apply(&mut fresh_bank, &mut fresh_mapper);

        assert_eq!(changed.len(), bank.len());
        assert_eq!(fresh_bank, bank);
        assert_eq!(fresh_mapper, mapper);
    }
}
