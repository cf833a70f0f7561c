#![allow(dead_code)]

use std::{cell::RefCell, rc::Rc};

use blob_visualiser_core::{
    AudioInfluenceSnapshot, BlobVizError, FluidSimulation, MaterialBroadcast, MetaballSystem,
    ParticleData, ParticleSystem, PerformanceMonitor, RenderEngine, Result,
};
use glam::{Mat4, Vec3};

pub type CallLog = Rc<RefCell<Vec<String>>>;

pub fn call_log() -> CallLog {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn count(log: &CallLog, entry: &str) -> usize {
    log.borrow().iter().filter(|e| e.as_str() == entry).count()
}

#[derive(Default)]
pub struct RenderRecorder {
    pub quality_levels: RefCell<Vec<f32>>,
}

pub struct TestRender {
    pub recorder: Rc<RenderRecorder>,
}

impl RenderEngine for TestRender {
    fn mvp_matrix(&self) -> Mat4 {
        Mat4::IDENTITY
    }

    fn set_quality_level(&mut self, level: f32) {
        self.recorder.quality_levels.borrow_mut().push(level);
    }
}

pub struct TestMetaballs {
    pub log: CallLog,
    pub positions: Vec<f32>,
    pub materials: Rc<RefCell<Vec<MaterialBroadcast>>>,
}

impl MetaballSystem for TestMetaballs {
    fn update(&mut self, _delta_time: f32, _audio: &AudioInfluenceSnapshot) -> Result<()> {
        self.log.borrow_mut().push("metaballs".into());
        Ok(())
    }

    fn metaball_positions(&self) -> Vec<f32> {
        self.positions.clone()
    }

    fn apply_material(&mut self, material: &MaterialBroadcast) -> Result<()> {
        self.materials.borrow_mut().push(*material);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FluidRecorder {
    pub impulses: RefCell<Vec<(Vec3, Vec3, f32)>>,
    pub viscosity: RefCell<Vec<f32>>,
    pub density: RefCell<Vec<f32>>,
}

pub struct TestFluid {
    pub log: CallLog,
    pub recorder: Rc<FluidRecorder>,
    pub fail: bool,
    pub velocity: Vec3,
}

impl FluidSimulation for TestFluid {
    fn update(&mut self, _delta_time: f32, _audio: &AudioInfluenceSnapshot) -> Result<()> {
        self.log.borrow_mut().push("fluid".into());
        if self.fail {
            return Err(BlobVizError::msg("pressure solve diverged"));
        }
        Ok(())
    }

    fn add_impulse(&mut self, position: Vec3, force: Vec3, radius: f32) {
        self.recorder
            .impulses
            .borrow_mut()
            .push((position, force, radius));
    }

    fn set_viscosity(&mut self, viscosity: f32) {
        self.recorder.viscosity.borrow_mut().push(viscosity);
    }

    fn set_density(&mut self, density: f32) {
        self.recorder.density.borrow_mut().push(density);
    }

    fn velocity_field(&self) -> Vec<Vec3> {
        vec![self.velocity; 4]
    }

    fn sample_velocity(&self, _position: Vec3) -> Vec3 {
        self.velocity
    }
}

#[derive(Debug, Default)]
pub struct ParticleRecorder {
    pub forces: RefCell<Vec<Vec<Vec3>>>,
    pub renders: RefCell<Vec<Mat4>>,
}

pub struct TestParticles {
    pub log: CallLog,
    pub recorder: Rc<ParticleRecorder>,
    pub positions: Vec<Vec3>,
}

impl ParticleSystem for TestParticles {
    fn update(&mut self, _delta_time: f32, _audio: &AudioInfluenceSnapshot) -> Result<()> {
        self.log.borrow_mut().push("particles".into());
        Ok(())
    }

    fn particle_data(&self) -> ParticleData {
        ParticleData {
            positions: self.positions.clone(),
            velocities: vec![Vec3::ZERO; self.positions.len()],
        }
    }

    fn apply_external_forces(&mut self, forces: &[Vec3]) -> Result<()> {
        self.recorder.forces.borrow_mut().push(forces.to_vec());
        Ok(())
    }

    fn render(&mut self, mvp: &Mat4) -> Result<()> {
        self.recorder.renders.borrow_mut().push(*mvp);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct TestMonitor {
    pub registered: RefCell<Vec<String>>,
    pub unregistered: RefCell<Vec<String>>,
    pub samples: RefCell<Vec<(String, f64)>>,
}

impl PerformanceMonitor for TestMonitor {
    fn record_cpu_time(&self, name: &str, ms: f64) {
        self.samples.borrow_mut().push((name.to_string(), ms));
    }

    fn register_system(&self, name: &str) {
        self.registered.borrow_mut().push(name.to_string());
    }

    fn unregister_system(&self, name: &str) {
        self.unregistered.borrow_mut().push(name.to_string());
    }
}
