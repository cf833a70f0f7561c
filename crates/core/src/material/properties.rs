use serde::{Deserialize, Serialize};

use super::Easing;
use crate::audio::AudioInfluenceSnapshot;

/// Bulk mechanical behaviour of a material.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PhysicalProperties {
    /// kg/m³
    pub density: f32,
    /// Pa·s
    pub viscosity: f32,
    /// N/m
    pub surface_tension: f32,
    pub bulk_modulus: f32,
    pub thermal_conductivity: f32,
    pub thermal_expansion: f32,
    pub compressibility: f32,
}

impl Default for PhysicalProperties {
    fn default() -> Self {
        Self {
            density: 1000.0,
            viscosity: 0.001,
            surface_tension: 0.072,
            bulk_modulus: 2.2e9,
            thermal_conductivity: 0.6,
            thermal_expansion: 2.1e-4,
            compressibility: 4.6e-10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OpticalProperties {
    pub base_color: [f32; 4],
    pub emission: [f32; 3],
    pub refraction_index: f32,
    pub absorption: [f32; 3],
    pub scattering: f32,
    pub transparency: f32,
    pub metallic: f32,
    pub roughness: f32,
    pub specular: f32,
}

impl Default for OpticalProperties {
    fn default() -> Self {
        Self {
            base_color: [0.2, 0.5, 0.9, 0.8],
            emission: [0.0; 3],
            refraction_index: 1.33,
            absorption: [0.45, 0.06, 0.01],
            scattering: 0.1,
            transparency: 0.8,
            metallic: 0.0,
            roughness: 0.05,
            specular: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ElectricalProperties {
    pub conductivity: f32,
    pub dielectric_constant: f32,
    pub magnetic_permeability: f32,
    pub polarizability: f32,
}

impl Default for ElectricalProperties {
    fn default() -> Self {
        Self {
            conductivity: 5.5e-6,
            dielectric_constant: 80.0,
            magnetic_permeability: 1.0,
            polarizability: 1.45,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ThermalProperties {
    /// J/(kg·K)
    pub specific_heat: f32,
    /// Kelvin.
    pub melting_point: f32,
    /// Kelvin.
    pub boiling_point: f32,
    pub vaporization: f32,
    pub sublimation: f32,
}

impl Default for ThermalProperties {
    fn default() -> Self {
        Self {
            specific_heat: 4186.0,
            melting_point: 273.15,
            boiling_point: 373.15,
            vaporization: 2.26e6,
            sublimation: 2.83e6,
        }
    }
}

/// Full attribute bundle describing a material. A plain value type: every
/// snapshot and transition endpoint is an independent copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertySet {
    pub physical: PhysicalProperties,
    pub optical: OpticalProperties,
    pub electrical: ElectricalProperties,
    pub thermal: ThermalProperties,
}

/// Options forwarded to an external [`PropertyInterpolator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterpolationOptions {
    pub blend_mode: BlendMode,
    pub easing: Easing,
    pub audio_influence: AudioInfluenceSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlendMode {
    Mix,
}

/// Optional collaborator that replaces the built-in field-wise blending.
pub trait PropertyInterpolator {
    fn interpolate(
        &self,
        from: &PropertySet,
        to: &PropertySet,
        t: f32,
        options: &InterpolationOptions,
    ) -> PropertySet;
}

macro_rules! lerp_fields {
    ($from:expr, $to:expr, $t:expr, { $($scalar:ident),* $(,)? }, [ $($array:ident),* $(,)? ]) => {{
        let mut out = $from;
        $( out.$scalar = lerp($from.$scalar, $to.$scalar, $t); )*
        $( out.$array = lerp_array(&$from.$array, &$to.$array, $t); )*
        out
    }};
}

impl PropertySet {
    /// Field-wise blend between two sets: scalars and fixed-length arrays
    /// are interpolated linearly. The endpoints are reproduced exactly.
    pub fn interpolate(from: &Self, to: &Self, t: f32) -> Self {
        if t.is_nan() || t <= 0.0 {
            return *from;
        }
        if t >= 1.0 {
            return *to;
        }

        Self {
            physical: lerp_fields!(from.physical, to.physical, t, {
                density,
                viscosity,
                surface_tension,
                bulk_modulus,
                thermal_conductivity,
                thermal_expansion,
                compressibility,
            }, []),
            optical: lerp_fields!(from.optical, to.optical, t, {
                refraction_index,
                scattering,
                transparency,
                metallic,
                roughness,
                specular,
            }, [base_color, emission, absorption]),
            electrical: lerp_fields!(from.electrical, to.electrical, t, {
                conductivity,
                dielectric_constant,
                magnetic_permeability,
                polarizability,
            }, []),
            thermal: lerp_fields!(from.thermal, to.thermal, t, {
                specific_heat,
                melting_point,
                boiling_point,
                vaporization,
                sublimation,
            }, []),
        }
    }

    /// Rough perceptual/physical cost of rendering this material, in `[0, 1]`.
    pub fn complexity(&self) -> f32 {
        let optical = &self.optical;
        let emission = optical.emission.iter().map(|c| c.abs()).sum::<f32>() / 3.0;
        let refraction = ((optical.refraction_index - 1.0).abs() / 1.5).min(1.0);
        let score = optical.transparency.clamp(0.0, 1.0) * 0.25
            + optical.metallic.clamp(0.0, 1.0) * 0.2
            + optical.scattering.clamp(0.0, 1.0) * 0.15
            + refraction * 0.15
            + emission.min(1.0) * 0.15
            + (1.0 - optical.roughness.clamp(0.0, 1.0)) * 0.1;
        score.clamp(0.0, 1.0)
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

fn lerp_array<const N: usize>(a: &[f32; N], b: &[f32; N], t: f32) -> [f32; N] {
    std::array::from_fn(|i| lerp(a[i], b[i], t))
}
