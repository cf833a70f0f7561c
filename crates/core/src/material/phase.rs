use serde::{Deserialize, Serialize};

use super::PropertySet;

/// Thermodynamic state of matter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Solid,
    Liquid,
    Gas,
    /// Only reachable through ionisation, which temperature alone never
    /// selects.
    Plasma,
}

impl Phase {
    /// Phase selected by temperature against the material's thresholds.
    pub fn for_temperature(temperature: f32, melting_point: f32, boiling_point: f32) -> Self {
        if temperature < melting_point {
            Phase::Solid
        } else if temperature < boiling_point {
            Phase::Liquid
        } else {
            Phase::Gas
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Phase::Solid => 0,
            Phase::Liquid => 1,
            Phase::Gas => 2,
            Phase::Plasma => 3,
        }
    }

    /// Multipliers this phase applies relative to the liquid baseline.
    ///
    /// Factors replace each other rather than compound: the live set is
    /// always `base * factors(current)`, so solid to gas lands on the gas
    /// factors alone and returning to liquid drops the solid multipliers.
    pub fn factors(self) -> PhaseFactors {
        match self {
            Phase::Solid => PhaseFactors {
                viscosity: 1000.0,
                density: 1.0,
                transparency: 0.5,
            },
            Phase::Liquid | Phase::Plasma => PhaseFactors::IDENTITY,
            Phase::Gas => PhaseFactors {
                viscosity: 0.1,
                density: 0.001,
                transparency: 1.5,
            },
        }
    }

    /// Normalised position of `temperature` inside this phase's band. The gas
    /// band is taken to span from the boiling point to twice that value.
    pub fn band_progress(self, temperature: f32, melting_point: f32, boiling_point: f32) -> f32 {
        let (low, high) = match self {
            Phase::Solid => (0.0, melting_point),
            Phase::Liquid => (melting_point, boiling_point),
            Phase::Gas | Phase::Plasma => (boiling_point, boiling_point * 2.0),
        };
        let span = high - low;
        if span <= f32::EPSILON {
            return 0.0;
        }
        ((temperature - low) / span).clamp(0.0, 1.0)
    }
}

/// Scale factors applied on top of a material's baseline properties.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseFactors {
    pub viscosity: f32,
    pub density: f32,
    pub transparency: f32,
}

impl PhaseFactors {
    pub const IDENTITY: Self = Self {
        viscosity: 1.0,
        density: 1.0,
        transparency: 1.0,
    };

    pub fn apply_to(&self, properties: &mut PropertySet) {
        properties.physical.viscosity *= self.viscosity;
        properties.physical.density *= self.density;
        properties.optical.transparency =
            (properties.optical.transparency * self.transparency).clamp(0.0, 1.0);
    }
}

/// Tracks the current phase and reports crossings exactly once.
#[derive(Debug, Clone)]
pub struct PhaseMachine {
    phase: Phase,
    factors: PhaseFactors,
    changes: u64,
}

impl PhaseMachine {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            factors: phase.factors(),
            changes: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn factors(&self) -> PhaseFactors {
        self.factors
    }

    /// Number of phase changes observed since construction.
    pub fn change_count(&self) -> u64 {
        self.changes
    }

    /// Re-evaluates the phase. Returns the previous phase when a threshold
    /// was crossed; staying inside a band returns `None` and leaves the
    /// factors untouched.
    pub fn evaluate(&mut self, temperature: f32, properties: &PropertySet) -> Option<Phase> {
        let next = Phase::for_temperature(
            temperature,
            properties.thermal.melting_point,
            properties.thermal.boiling_point,
        );
        if next == self.phase {
            return None;
        }

        let previous = self.phase;
        self.phase = next;
        self.factors = next.factors();
        self.changes += 1;
        Some(previous)
    }

    /// Forces a phase without counting it as a crossing.
    pub fn reset(&mut self, phase: Phase) {
        self.phase = phase;
        self.factors = phase.factors();
    }
}
