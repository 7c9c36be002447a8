use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::{
    control::{ParameterBank, ParameterTarget},
    io::midi::{MidiEvent, ALL_NOTES_OFF, MAX_CC},
};

/// What the pipeline should do in response to a MIDI control message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlAction {
    /// A bound controller moved.
    SetParameter { target: ParameterTarget, value: f32 },
    /// The armed target was bound to `cc`.
    Bound { cc: u8, target: ParameterTarget },
    StopMidiNotes,
    /// Program change, already clamped to the available sources.
    SelectSource(usize),
}

/*
CC Mapper
=========

  Unarmed ──arm(t)──→ Armed(t) ──CC c──→ Unarmed   (c ↔ t bound)
     ↑                  │
     └────disarm────────┘      arm(u) while Armed(t) → Armed(u)

Bindings are one-to-one: binding c to t removes any other CC bound to t and
whatever c was bound to before.
*/

/// MIDI learn and controller routing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CcMapper {
    armed: Option<ParameterTarget>,
    bindings: BTreeMap<u8, ParameterTarget>,
}

impl CcMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the next controller to bind to `target`. Returns the
    /// previously armed target, which is no longer armed.
    pub fn arm(&mut self, target: ParameterTarget) -> Option<ParameterTarget> {
        self.armed.replace(target)
    }

    pub fn disarm(&mut self) -> Option<ParameterTarget> {
        self.armed.take()
    }

    pub fn armed(&self) -> Option<ParameterTarget> {
        self.armed
    }

    /// Bind `cc` to `target`, dropping any binding either side already had.
    /// Reserved controllers are refused.
    pub fn bind(&mut self, cc: u8, target: ParameterTarget) -> bool {
        if cc > MAX_CC {
            return false;
        }
        self.bindings.retain(|_, bound| *bound != target);
        self.bindings.insert(cc, target);
        true
    }

    pub fn unbind(&mut self, cc: u8) -> Option<ParameterTarget> {
        self.bindings.remove(&cc)
    }

    pub fn target_for(&self, cc: u8) -> Option<ParameterTarget> {
        self.bindings.get(&cc).copied()
    }

    pub fn cc_for(&self, target: ParameterTarget) -> Option<u8> {
        self.bindings
            .iter()
            .find_map(|(&cc, &bound)| (bound == target).then_some(cc))
    }

    /// Current bindings in controller order.
    pub fn bindings(&self) -> impl Iterator<Item = (u8, ParameterTarget)> + '_ {
        self.bindings.iter().map(|(&cc, &target)| (cc, target))
    }

    /// Forget every binding and disarm.
    pub fn reset(&mut self) {
        self.bindings.clear();
        self.armed = None;
    }

    /// Route one event. Note and pitch messages are not handled here.
    pub fn handle(
        &mut self,
        event: MidiEvent,
        parameters: &ParameterBank,
        source_count: usize,
    ) -> Option<ControlAction> {
        match event {
            MidiEvent::ControlChange {
                controller, value, ..
            } => self.control_change(controller, value, parameters),
            MidiEvent::ProgramChange { program, .. } => {
                let last = source_count.checked_sub(1)?;
                Some(ControlAction::SelectSource((program as usize).min(last)))
            }
            _ => None,
        }
    }

    fn control_change(
        &mut self,
        cc: u8,
        value: u8,
        parameters: &ParameterBank,
    ) -> Option<ControlAction> {
        if cc == ALL_NOTES_OFF {
            return Some(ControlAction::StopMidiNotes);
        }
        if cc > MAX_CC {
            return None;
        }

        if let Some(target) = self.armed.take() {
            self.bind(cc, target);
            debug!(cc, target = target.label(), "controller bound");
            return Some(ControlAction::Bound { cc, target });
        }

        let target = self.target_for(cc)?;
        let parameter = parameters.get(target)?;
        Some(ControlAction::SetParameter {
            target,
            value: parameter.from_cc(value),
        })
    }

    /// Ordered `(label, cc)` pairs for persistence.
    pub fn snapshot(&self) -> Vec<(String, u8)> {
        self.bindings()
            .map(|(cc, target)| (target.label().to_owned(), cc))
            .collect()
    }

    /// Rebuild bindings from persisted pairs. Unknown labels and reserved
    /// controller numbers are skipped individually. Returns how many were
    /// bound.
    pub fn restore(&mut self, entries: &[(String, u8)], parameters: &ParameterBank) -> usize {
        self.reset();
        let mut bound = 0;
        for (label, cc) in entries {
            let Some(parameter) = parameters.by_label(label) else {
                warn!(%label, "unknown parameter in saved MIDI map, skipped");
                continue;
            };
            if self.bind(*cc, parameter.target) {
                bound += 1;
            } else {
                warn!(%label, cc, "reserved controller in saved MIDI map, skipped");
            }
        }
        bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::EffectId;

    const SCALE: ParameterTarget = ParameterTarget::Scale;
    const WOBBLE: ParameterTarget = ParameterTarget::Effect(EffectId::Wobble);

    fn cc(controller: u8, value: u8) -> MidiEvent {
        MidiEvent::ControlChange {
            channel: 0,
            controller,
            value,
        }
    }

    fn learn(mapper: &mut CcMapper, bank: &ParameterBank, controller: u8, target: ParameterTarget) {
        mapper.arm(target);
        assert_eq!(
            mapper.handle(cc(controller, 0), bank, 1),
            Some(ControlAction::Bound { cc: controller, target })
        );
    }

    #[test]
    fn test_unbound_cc_is_ignored() {
        let bank = ParameterBank::standard(0.2);
        let mut mapper = CcMapper::new();
        assert_eq!(mapper.handle(cc(7, 100), &bank, 1), None);
    }

    #[test]
    fn test_learn_then_drive() {
        let bank = ParameterBank::standard(0.2);
        let mut mapper = CcMapper::new();
        learn(&mut mapper, &bank, 21, SCALE);
        assert_eq!(mapper.armed(), None);

        assert_eq!(
            mapper.handle(cc(21, 127), &bank, 1),
            Some(ControlAction::SetParameter { target: SCALE, value: 2.0 })
        );
    }

    #[test]
    fn test_rebinding_target_drops_old_cc() {
        let bank = ParameterBank::standard(0.2);
        let mut mapper = CcMapper::new();
        learn(&mut mapper, &bank, 1, SCALE);
        learn(&mut mapper, &bank, 2, SCALE);

        assert_eq!(mapper.target_for(1), None);
        assert_eq!(mapper.cc_for(SCALE), Some(2));
        assert_eq!(mapper.handle(cc(1, 64), &bank, 1), None);
    }

    #[test]
    fn test_rebinding_cc_drops_old_target() {
        let bank = ParameterBank::standard(0.2);
        let mut mapper = CcMapper::new();
        learn(&mut mapper, &bank, 1, SCALE);
        learn(&mut mapper, &bank, 1, WOBBLE);

        assert_eq!(mapper.target_for(1), Some(WOBBLE));
        assert_eq!(mapper.cc_for(SCALE), None);
        assert_eq!(mapper.bindings().count(), 1);
    }

    #[test]
    fn test_arming_replaces_previous() {
        let mut mapper = CcMapper::new();
        assert_eq!(mapper.arm(SCALE), None);
        assert_eq!(mapper.arm(WOBBLE), Some(SCALE));
        assert_eq!(mapper.armed(), Some(WOBBLE));
        assert_eq!(mapper.disarm(), Some(WOBBLE));
        assert_eq!(mapper.armed(), None);
    }

    #[test]
    fn test_reserved_controllers() {
        let bank = ParameterBank::standard(0.2);
        let mut mapper = CcMapper::new();
        mapper.arm(SCALE);

        assert_eq!(
            mapper.handle(cc(ALL_NOTES_OFF, 0), &bank, 1),
            Some(ControlAction::StopMidiNotes)
        );
        assert_eq!(mapper.handle(cc(120, 0), &bank, 1), None);
        // Still waiting for a usable controller
        assert_eq!(mapper.armed(), Some(SCALE));
        assert!(!mapper.bind(121, SCALE));
    }

    #[test]
    fn test_program_change_clamps() {
        let bank = ParameterBank::standard(0.2);
        let mut mapper = CcMapper::new();
        let program = |program| MidiEvent::ProgramChange { channel: 0, program };

        assert_eq!(
            mapper.handle(program(1), &bank, 3),
            Some(ControlAction::SelectSource(1))
        );
        assert_eq!(
            mapper.handle(program(40), &bank, 3),
            Some(ControlAction::SelectSource(2))
        );
        assert_eq!(mapper.handle(program(0), &bank, 0), None);
    }

    #[test]
    fn test_snapshot_restore() {
        let bank = ParameterBank::standard(0.2);
        let mut mapper = CcMapper::new();
        mapper.bind(21, SCALE);
        mapper.bind(22, WOBBLE);
        let saved = mapper.snapshot();
        assert_eq!(saved, vec![("scale".to_owned(), 21), ("wobble".to_owned(), 22)]);

        let mut restored = CcMapper::new();
        let mut entries = saved.clone();
        entries.push(("gone".to_owned(), 30));
        entries.push(("quality".to_owned(), 125));
        assert_eq!(restored.restore(&entries, &bank), 2);
        assert_eq!(restored.snapshot(), saved);
    }
}
