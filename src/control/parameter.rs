#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use tracing::warn;

use crate::{effect::EffectId, io::midi::MAX_VALUE};

/// What a parameter drives.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParameterTarget {
    Quality,
    RotationSpeed,
    TranslationSpeed,
    Scale,
    TranslationX,
    TranslationY,
    FocalLength,
    ObjectRotateSpeed,
    Effect(EffectId),
}

impl ParameterTarget {
    pub fn label(self) -> &'static str {
        match self {
            ParameterTarget::Quality => "quality",
            ParameterTarget::RotationSpeed => "rotationSpeed",
            ParameterTarget::TranslationSpeed => "translationSpeed",
            ParameterTarget::Scale => "scale",
            ParameterTarget::TranslationX => "translationX",
            ParameterTarget::TranslationY => "translationY",
            ParameterTarget::FocalLength => "focalLength",
            ParameterTarget::ObjectRotateSpeed => "objectRotateSpeed",
            ParameterTarget::Effect(id) => id.label(),
        }
    }
}

/// A numeric control with a range and optional step.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub target: ParameterTarget,
    pub min: f32,
    pub max: f32,
    /// Values snap to `min + k * step` when set.
    pub step: Option<f32>,
    value: f32,
}

impl Parameter {
    pub fn new(target: ParameterTarget, min: f32, max: f32, default: f32) -> Self {
        let mut parameter = Self {
            target,
            min,
            max,
            step: None,
            value: min,
        };
        parameter.set(default);
        parameter
    }

    pub fn with_step(mut self, step: f32) -> Self {
        self.step = (step > 0.0).then_some(step);
        let value = self.value;
        self.set(value);
        self
    }

    pub fn label(&self) -> &'static str {
        self.target.label()
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Clamp and snap `value`, store it and return what was stored.
    /// Non-finite input leaves the parameter unchanged.
    pub fn set(&mut self, value: f32) -> f32 {
        if value.is_finite() {
            self.value = self.constrain(value);
        }
        self.value
    }

    /// The value a raw 7-bit controller position maps to.
    pub fn from_cc(&self, cc_value: u8) -> f32 {
        let t = cc_value.min(MAX_VALUE) as f32 / MAX_VALUE as f32;
        self.constrain(self.min + t * (self.max - self.min))
    }

    /// Position of the current value within the range, `[0, 1]`.
    pub fn normalised(&self) -> f32 {
        let span = self.max - self.min;
        if span <= 0.0 {
            0.0
        } else {
            (self.value - self.min) / span
        }
    }

    /// Move by `fraction` of the range (or by whole steps for stepped
    /// parameters).
    pub fn nudge(&mut self, fraction: f32) -> f32 {
        let delta = match self.step {
            Some(step) => step * fraction.signum(),
            None => fraction * (self.max - self.min),
        };
        self.set(self.value + delta)
    }

    fn constrain(&self, value: f32) -> f32 {
        let value = value.clamp(self.min, self.max);
        match self.step {
            Some(step) => {
                let snapped = self.min + ((value - self.min) / step).round() * step;
                snapped.clamp(self.min, self.max)
            }
            None => value,
        }
    }
}

/// Ordered set of every tunable parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBank {
    parameters: Vec<Parameter>,
}

impl ParameterBank {
    pub fn new(parameters: Vec<Parameter>) -> Self {
        Self { parameters }
    }

    /// The renderer, object and effect controls with their default values.
    pub fn standard(wobble_volume: f32) -> Self {
        use ParameterTarget::*;

        let mut parameters = vec![
            Parameter::new(Quality, 0.05, 2.0, 1.0),
            Parameter::new(RotationSpeed, -2.0, 2.0, 0.0),
            Parameter::new(TranslationSpeed, 0.0, 10.0, 0.0),
            Parameter::new(Scale, 0.0, 2.0, 1.0),
            Parameter::new(TranslationX, -1.0, 1.0, 0.0),
            Parameter::new(TranslationY, -1.0, 1.0, 0.0),
            Parameter::new(FocalLength, 0.1, 4.0, 1.0),
            Parameter::new(ObjectRotateSpeed, -4.0, 4.0, 0.0),
        ];
        for id in EffectId::ALL {
            let parameter = match id {
                EffectId::Wobble => Parameter::new(Effect(id), 0.0, 1.0, wobble_volume),
                EffectId::Rotate => Parameter::new(Effect(id), 0.0, 1.0, 0.5),
                // Inversion period is a whole number of samples
                EffectId::VectorCancelling => {
                    Parameter::new(Effect(id), 0.0, 1.0, 0.0).with_step(1.0 / 18.0)
                }
                _ => Parameter::new(Effect(id), 0.0, 1.0, 0.0),
            };
            parameters.push(parameter);
        }
        Self { parameters }
    }

    pub fn get(&self, target: ParameterTarget) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.target == target)
    }

    pub fn by_label(&self, label: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.label() == label)
    }

    /// Set a parameter, returning the stored (clamped, snapped) value.
    pub fn set(&mut self, target: ParameterTarget, value: f32) -> Option<f32> {
        self.parameters
            .iter_mut()
            .find(|p| p.target == target)
            .map(|p| p.set(value))
    }

    pub fn value(&self, target: ParameterTarget) -> Option<f32> {
        self.get(target).map(Parameter::value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter()
    }

    pub fn labels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.parameters.iter().map(Parameter::label)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn at(&self, index: usize) -> Option<&Parameter> {
        self.parameters.get(index)
    }

    /// Ordered `(label, value)` pairs for persistence.
    pub fn snapshot(&self) -> Vec<(String, f32)> {
        self.parameters
            .iter()
            .map(|p| (p.label().to_owned(), p.value()))
            .collect()
    }

    /// Apply persisted `(label, value)` pairs. Unknown labels and non-finite
    /// values are skipped one by one. Returns the targets that changed.
    pub fn restore(&mut self, entries: &[(String, f32)]) -> Vec<ParameterTarget> {
        let mut applied = Vec::with_capacity(entries.len());
        for (label, value) in entries {
            let Some(parameter) = self.parameters.iter_mut().find(|p| p.label() == label.as_str()) else {
                warn!(%label, "unknown parameter in saved state, skipped");
                continue;
            };
            if !value.is_finite() {
                warn!(%label, "non-finite saved value, skipped");
                continue;
            }
            parameter.set(*value);
            applied.push(parameter.target);
        }
        applied
    }
}
