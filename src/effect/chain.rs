use std::sync::Arc;

use crate::{
    analysis::FrequencyCell,
    effect::{
        BitCrushEffect, DistortEffect, Effect, EffectId, RotateEffect, VectorCancellingEffect,
        WobbleEffect,
    },
    geometry::Vector2,
};

/*
Effect Chain
============

An ordered list of effects folded left to right: the output of slot i is the
input of slot i+1.

  in ──→ [VectorCancelling] ──→ [BitCrush] ──→ ... ──→ [Wobble] ──→ out

Disabled slots are skipped entirely, including their phase, so switching an
effect back on resumes where it left off.

Lifecycle
---------

  commit()    once per frame: staged frequencies become visible
  restart()   explicit user action / source switch: phases back to zero,
              control values and frequency bindings untouched
*/

/// One entry of the chain.
pub struct EffectSlot {
    pub id: EffectId,
    pub effect: Box<dyn Effect>,
    pub enabled: bool,
}

#[derive(Default)]
pub struct EffectChain {
    slots: Vec<EffectSlot>,
}

impl EffectChain {
    /// An empty chain passes every point through unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in effect in [`EffectId::ALL`] order, all disabled.
    ///
    /// Returns the wobble effect's frequency input alongside the chain so it
    /// can be subscribed to the analyser.
    pub fn standard(sample_rate: f32, wobble_volume: f32) -> (Self, Arc<FrequencyCell>) {
        let wobble_input = Arc::new(FrequencyCell::default());

        let mut chain = Self::new();
        for id in EffectId::ALL {
            let effect: Box<dyn Effect> = match id {
                EffectId::Wobble => Box::new(WobbleEffect::with_input(
                    sample_rate,
                    wobble_volume,
                    Arc::clone(&wobble_input),
                )),
                EffectId::Rotate => Box::new(RotateEffect::new(sample_rate)),
                EffectId::VectorCancelling => Box::new(VectorCancellingEffect::new()),
                EffectId::BitCrush => Box::new(BitCrushEffect::new()),
                EffectId::HorizontalDistort => Box::new(DistortEffect::horizontal()),
                EffectId::VerticalDistort => Box::new(DistortEffect::vertical()),
            };
            chain.push(id, effect, false);
        }
        (chain, wobble_input)
    }

    pub fn push(&mut self, id: EffectId, effect: Box<dyn Effect>, enabled: bool) {
        self.slots.push(EffectSlot {
            id,
            effect,
            enabled,
        });
    }

    /// Builder form of [`push`](Self::push) for an enabled effect.
    pub fn with<E: Effect + 'static>(mut self, id: EffectId, effect: E) -> Self {
        self.push(id, Box::new(effect), true);
        self
    }

    #[inline]
    pub fn apply(&mut self, sample_index: u64, input: Vector2) -> Vector2 {
        self.slots
            .iter_mut()
            .filter(|slot| slot.enabled)
            .fold(input, |point, slot| slot.effect.apply(sample_index, point))
    }

    /// Promote staged frequencies. Call once per frame.
    pub fn commit(&mut self) {
        for slot in &mut self.slots {
            if let Some(reactive) = slot.effect.as_frequency_reactive() {
                reactive.commit();
            }
        }
    }

    /// Rewind every phase accumulator; control values are kept.
    pub fn restart(&mut self) {
        for slot in &mut self.slots {
            if let Some(phase) = slot.effect.as_phase() {
                phase.reset_phase();
            }
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        for slot in &mut self.slots {
            slot.effect.set_sample_rate(sample_rate);
        }
    }

    /// Returns false if no settable effect has this id.
    pub fn set_value(&mut self, id: EffectId, value: f32) -> bool {
        match self.slot_mut(id).and_then(|slot| slot.effect.as_settable()) {
            Some(settable) => {
                settable.set_value(value);
                true
            }
            None => false,
        }
    }

    pub fn value(&mut self, id: EffectId) -> Option<f32> {
        self.slot_mut(id)
            .and_then(|slot| slot.effect.as_settable())
            .map(|settable| settable.value())
    }

    pub fn phase(&mut self, id: EffectId) -> Option<f32> {
        self.slot_mut(id)
            .and_then(|slot| slot.effect.as_phase())
            .map(|phase| phase.phase())
    }

    pub fn set_enabled(&mut self, id: EffectId, enabled: bool) -> bool {
        match self.slot_mut(id) {
            Some(slot) => {
                slot.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn is_enabled(&self, id: EffectId) -> bool {
        self.slots.iter().any(|slot| slot.id == id && slot.enabled)
    }

    pub fn ids(&self) -> impl Iterator<Item = EffectId> + '_ {
        self.slots.iter().map(|slot| slot.id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot_mut(&mut self, id: EffectId) -> Option<&mut EffectSlot> {
        self.slots.iter_mut().find(|slot| slot.id == id)
    }
}
