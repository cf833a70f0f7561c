use xxhash_rust::xxh3::xxh3_64;

use super::{MaterialState, PropertySet};
use crate::render::UniformValue;

/// Read-only inputs every uniform accessor draws from.
#[derive(Debug, Clone, Copy)]
pub struct UniformContext<'a> {
    pub state: &'a MaterialState,
    pub properties: &'a PropertySet,
    pub audio_reactivity_scale: f32,
}

/// Every uniform the material engine exports to shaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialUniform {
    MaterialId,
    MaterialType,
    Phase,
    Temperature,
    Pressure,
    Ionization,
    Density,
    Viscosity,
    SurfaceTension,
    BulkModulus,
    ThermalConductivity,
    ThermalExpansion,
    Compressibility,
    BaseColor,
    Emission,
    RefractionIndex,
    Absorption,
    Scattering,
    Transparency,
    Metallic,
    Roughness,
    Specular,
    Conductivity,
    DielectricConstant,
    MagneticPermeability,
    Polarizability,
    SpecificHeat,
    MeltingPoint,
    BoilingPoint,
    Vaporization,
    Sublimation,
    PhaseTransitionProgress,
    AudioReactivity,
    MaterialComplexity,
}

impl MaterialUniform {
    pub const ALL: [MaterialUniform; 34] = [
        MaterialUniform::MaterialId,
        MaterialUniform::MaterialType,
        MaterialUniform::Phase,
        MaterialUniform::Temperature,
        MaterialUniform::Pressure,
        MaterialUniform::Ionization,
        MaterialUniform::Density,
        MaterialUniform::Viscosity,
        MaterialUniform::SurfaceTension,
        MaterialUniform::BulkModulus,
        MaterialUniform::ThermalConductivity,
        MaterialUniform::ThermalExpansion,
        MaterialUniform::Compressibility,
        MaterialUniform::BaseColor,
        MaterialUniform::Emission,
        MaterialUniform::RefractionIndex,
        MaterialUniform::Absorption,
        MaterialUniform::Scattering,
        MaterialUniform::Transparency,
        MaterialUniform::Metallic,
        MaterialUniform::Roughness,
        MaterialUniform::Specular,
        MaterialUniform::Conductivity,
        MaterialUniform::DielectricConstant,
        MaterialUniform::MagneticPermeability,
        MaterialUniform::Polarizability,
        MaterialUniform::SpecificHeat,
        MaterialUniform::MeltingPoint,
        MaterialUniform::BoilingPoint,
        MaterialUniform::Vaporization,
        MaterialUniform::Sublimation,
        MaterialUniform::PhaseTransitionProgress,
        MaterialUniform::AudioReactivity,
        MaterialUniform::MaterialComplexity,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MaterialUniform::MaterialId => "u_materialId",
            MaterialUniform::MaterialType => "u_materialType",
            MaterialUniform::Phase => "u_materialPhase",
            MaterialUniform::Temperature => "u_temperature",
            MaterialUniform::Pressure => "u_pressure",
            MaterialUniform::Ionization => "u_ionization",
            MaterialUniform::Density => "u_density",
            MaterialUniform::Viscosity => "u_viscosity",
            MaterialUniform::SurfaceTension => "u_surfaceTension",
            MaterialUniform::BulkModulus => "u_bulkModulus",
            MaterialUniform::ThermalConductivity => "u_thermalConductivity",
            MaterialUniform::ThermalExpansion => "u_thermalExpansion",
            MaterialUniform::Compressibility => "u_compressibility",
            MaterialUniform::BaseColor => "u_baseColor",
            MaterialUniform::Emission => "u_emission",
            MaterialUniform::RefractionIndex => "u_refractionIndex",
            MaterialUniform::Absorption => "u_absorption",
            MaterialUniform::Scattering => "u_scattering",
            MaterialUniform::Transparency => "u_transparency",
            MaterialUniform::Metallic => "u_metallic",
            MaterialUniform::Roughness => "u_roughness",
            MaterialUniform::Specular => "u_specular",
            MaterialUniform::Conductivity => "u_conductivity",
            MaterialUniform::DielectricConstant => "u_dielectricConstant",
            MaterialUniform::MagneticPermeability => "u_magneticPermeability",
            MaterialUniform::Polarizability => "u_polarizability",
            MaterialUniform::SpecificHeat => "u_specificHeat",
            MaterialUniform::MeltingPoint => "u_meltingPoint",
            MaterialUniform::BoilingPoint => "u_boilingPoint",
            MaterialUniform::Vaporization => "u_vaporization",
            MaterialUniform::Sublimation => "u_sublimation",
            MaterialUniform::PhaseTransitionProgress => "u_phaseTransitionProgress",
            MaterialUniform::AudioReactivity => "u_audioReactivity",
            MaterialUniform::MaterialComplexity => "u_materialComplexity",
        }
    }

    pub fn value(self, ctx: &UniformContext<'_>) -> UniformValue {
        let state = ctx.state;
        let physical = &ctx.properties.physical;
        let optical = &ctx.properties.optical;
        let electrical = &ctx.properties.electrical;
        let thermal = &ctx.properties.thermal;

        match self {
            MaterialUniform::MaterialId => {
                UniformValue::Float(material_id_hash(state.material_id.as_deref()))
            }
            MaterialUniform::MaterialType => UniformValue::Int(state.material_type.code()),
            MaterialUniform::Phase => UniformValue::Int(state.phase.code()),
            MaterialUniform::Temperature => UniformValue::Float(state.temperature),
            MaterialUniform::Pressure => UniformValue::Float(state.pressure),
            MaterialUniform::Ionization => UniformValue::Float(state.ionization),
            MaterialUniform::Density => UniformValue::Float(physical.density),
            MaterialUniform::Viscosity => UniformValue::Float(physical.viscosity),
            MaterialUniform::SurfaceTension => UniformValue::Float(physical.surface_tension),
            MaterialUniform::BulkModulus => UniformValue::Float(physical.bulk_modulus),
            MaterialUniform::ThermalConductivity => {
                UniformValue::Float(physical.thermal_conductivity)
            }
            MaterialUniform::ThermalExpansion => UniformValue::Float(physical.thermal_expansion),
            MaterialUniform::Compressibility => UniformValue::Float(physical.compressibility),
            MaterialUniform::BaseColor => UniformValue::Vec4(optical.base_color),
            MaterialUniform::Emission => UniformValue::Vec3(optical.emission),
            MaterialUniform::RefractionIndex => UniformValue::Float(optical.refraction_index),
            MaterialUniform::Absorption => UniformValue::Vec3(optical.absorption),
            MaterialUniform::Scattering => UniformValue::Float(optical.scattering),
            MaterialUniform::Transparency => UniformValue::Float(optical.transparency),
            MaterialUniform::Metallic => UniformValue::Float(optical.metallic),
            MaterialUniform::Roughness => UniformValue::Float(optical.roughness),
            MaterialUniform::Specular => UniformValue::Float(optical.specular),
            MaterialUniform::Conductivity => UniformValue::Float(electrical.conductivity),
            MaterialUniform::DielectricConstant => {
                UniformValue::Float(electrical.dielectric_constant)
            }
            MaterialUniform::MagneticPermeability => {
                UniformValue::Float(electrical.magnetic_permeability)
            }
            MaterialUniform::Polarizability => UniformValue::Float(electrical.polarizability),
            MaterialUniform::SpecificHeat => UniformValue::Float(thermal.specific_heat),
            MaterialUniform::MeltingPoint => UniformValue::Float(thermal.melting_point),
            MaterialUniform::BoilingPoint => UniformValue::Float(thermal.boiling_point),
            MaterialUniform::Vaporization => UniformValue::Float(thermal.vaporization),
            MaterialUniform::Sublimation => UniformValue::Float(thermal.sublimation),
            MaterialUniform::PhaseTransitionProgress => UniformValue::Float(state.phase.band_progress(
                state.temperature,
                thermal.melting_point,
                thermal.boiling_point,
            )),
            MaterialUniform::AudioReactivity => UniformValue::Float(ctx.audio_reactivity_scale),
            MaterialUniform::MaterialComplexity => {
                let mut score = ctx.properties.complexity();
                if state.is_transitioning {
                    score += 0.1;
                }
                UniformValue::Float(score.clamp(0.0, 1.0))
            }
        }
    }
}

/// Stable `[0, 1)` identifier for shaders; `0.0` when no material is set.
pub fn material_id_hash(id: Option<&str>) -> f32 {
    match id {
        Some(id) => (xxh3_64(id.as_bytes()) % 1_000_000) as f32 / 1_000_000.0,
        None => 0.0,
    }
}
