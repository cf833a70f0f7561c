use std::{cell::RefCell, rc::Rc};

use glam::{Mat4, Vec3};
use serde::Serialize;

use crate::{
    audio::{AudioFeatures, AudioInfluenceSnapshot},
    material::{MaterialPropertyEngine, Phase, PropertySet},
    Result,
};

/// Metaball scalar-field simulation.
pub trait MetaballSystem {
    fn update(&mut self, delta_time: f32, audio: &AudioInfluenceSnapshot) -> Result<()>;

    /// Flat `[x, y, z, x, y, z, ...]` array, three floats per metaball.
    fn metaball_positions(&self) -> Vec<f32>;

    /// Hook for material-specific metaball behaviour.
    fn apply_material(&mut self, _material: &MaterialBroadcast) -> Result<()> {
        Ok(())
    }

    fn set_quality_level(&mut self, _level: f32) {}
}

/// Grid-based fluid solver.
pub trait FluidSimulation {
    fn update(&mut self, delta_time: f32, audio: &AudioInfluenceSnapshot) -> Result<()>;

    /// Adds to the existing velocity; never overwrites it.
    fn add_impulse(&mut self, position: Vec3, force: Vec3, radius: f32);

    fn set_viscosity(&mut self, viscosity: f32);

    fn set_density(&mut self, density: f32);

    fn velocity_field(&self) -> Vec<Vec3>;

    /// Velocity at an arbitrary point; the interpolation scheme is the
    /// solver's own.
    fn sample_velocity(&self, position: Vec3) -> Vec3;

    fn set_quality_level(&mut self, _level: f32) {}
}

/// Particle positions and velocities as exposed to the renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParticleData {
    pub positions: Vec<Vec3>,
    pub velocities: Vec<Vec3>,
}

impl ParticleData {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Particle emitter and integrator.
pub trait ParticleSystem {
    fn update(&mut self, delta_time: f32, audio: &AudioInfluenceSnapshot) -> Result<()>;

    fn particle_data(&self) -> ParticleData;

    /// One force per particle, in `particle_data` order, applied on the next
    /// update.
    fn apply_external_forces(&mut self, forces: &[Vec3]) -> Result<()>;

    fn render(&mut self, mvp: &Mat4) -> Result<()>;

    fn set_quality_level(&mut self, _level: f32) {}
}

/// Material values pushed from the material-physics stage into the other
/// subsystems.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MaterialBroadcast {
    pub viscosity: f32,
    pub density: f32,
    pub surface_tension: f32,
    pub phase: Phase,
}

/// Material-physics stage: owns material properties and exposes them to
/// the coupled simulations.
pub trait MaterialPhysics {
    /// Receives the raw features; the stage keeps its own smoothing.
    fn update(&mut self, delta_time: f32, audio: &AudioFeatures) -> Result<()>;

    fn broadcast(&self) -> MaterialBroadcast;

    fn properties(&self) -> PropertySet;
}

impl MaterialPhysics for MaterialPropertyEngine {
    fn update(&mut self, delta_time: f32, audio: &AudioFeatures) -> Result<()> {
        MaterialPropertyEngine::update(self, delta_time, audio);
        Ok(())
    }

    fn broadcast(&self) -> MaterialBroadcast {
        let properties = self.material_properties();
        MaterialBroadcast {
            viscosity: properties.physical.viscosity,
            density: properties.physical.density,
            surface_tension: properties.physical.surface_tension,
            phase: self.state().phase,
        }
    }

    fn properties(&self) -> PropertySet {
        self.material_properties()
    }
}

/// Lets the host keep a handle on a stage it also hands to the coordinator.
impl<T: MaterialPhysics> MaterialPhysics for Rc<RefCell<T>> {
    fn update(&mut self, delta_time: f32, audio: &AudioFeatures) -> Result<()> {
        self.borrow_mut().update(delta_time, audio)
    }

    fn broadcast(&self) -> MaterialBroadcast {
        self.borrow().broadcast()
    }

    fn properties(&self) -> PropertySet {
        self.borrow().properties()
    }
}

/// Optional telemetry sink. Never consulted for control flow.
pub trait PerformanceMonitor {
    fn record_cpu_time(&self, name: &str, ms: f64);

    fn register_system(&self, name: &str);

    fn unregister_system(&self, name: &str);
}
