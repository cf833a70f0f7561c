//! Lightweight stand-ins for the real solvers so the coordinator can be
//! driven from the command line without a GPU.

use std::{cell::RefCell, collections::BTreeMap, f32::consts::TAU};

use blob_visualiser_core::{
    AudioFeatures, AudioInfluenceSnapshot, FluidSimulation, MaterialBroadcast, MetaballSystem,
    ParticleData, ParticleSystem, PerformanceMonitor, RenderEngine, Result,
};
use glam::{Mat4, Vec3};

const GRID: usize = 8;
const GRID_EXTENT: f32 = 2.0;

/// Metaballs orbiting the origin; louder audio pushes them outwards.
pub struct OrbitingMetaballs {
    count: usize,
    time: f32,
    radius: f32,
    speed: f32,
    positions: Vec<f32>,
}

impl OrbitingMetaballs {
    pub fn new(count: usize) -> Self {
        let mut metaballs = Self {
            count,
            time: 0.0,
            radius: 1.0,
            speed: 1.0,
            positions: vec![0.0; count * 3],
        };
        metaballs.layout();
        metaballs
    }

    fn layout(&mut self) {
        for index in 0..self.count {
            let angle = self.time * self.speed + index as f32 * TAU / self.count.max(1) as f32;
            let lift = (self.time * 0.7 + index as f32).sin() * 0.25;
            let slot = &mut self.positions[index * 3..index * 3 + 3];
            slot[0] = angle.cos() * self.radius;
            slot[1] = lift;
            slot[2] = angle.sin() * self.radius;
        }
    }
}

impl MetaballSystem for OrbitingMetaballs {
    fn update(&mut self, delta_time: f32, audio: &AudioInfluenceSnapshot) -> Result<()> {
        self.time += delta_time;
        self.radius = 1.0 + audio.smoothed_bass * 0.5;
        self.layout();
        Ok(())
    }

    fn metaball_positions(&self) -> Vec<f32> {
        self.positions.clone()
    }

    fn apply_material(&mut self, material: &MaterialBroadcast) -> Result<()> {
        // thick materials orbit slowly
        self.speed = 1.0 / (1.0 + material.viscosity.max(0.0).ln_1p());
        Ok(())
    }
}

/// Coarse velocity grid over `[-2, 2]^3` with viscous decay.
pub struct GridFluid {
    velocities: Vec<Vec3>,
    viscosity: f32,
    density: f32,
    quality: f32,
}

impl GridFluid {
    pub fn new() -> Self {
        Self {
            velocities: vec![Vec3::ZERO; GRID * GRID * GRID],
            viscosity: 0.001,
            density: 1000.0,
            quality: 1.0,
        }
    }

    fn cell_centre(index: usize) -> Vec3 {
        let x = index % GRID;
        let y = (index / GRID) % GRID;
        let z = index / (GRID * GRID);
        let step = 2.0 * GRID_EXTENT / GRID as f32;
        Vec3::new(x as f32, y as f32, z as f32) * step - Vec3::splat(GRID_EXTENT - step * 0.5)
    }

    fn cell_at(position: Vec3) -> usize {
        let step = 2.0 * GRID_EXTENT / GRID as f32;
        let coord = |value: f32| {
            (((value + GRID_EXTENT) / step).floor().max(0.0) as usize).min(GRID - 1)
        };
        coord(position.x) + coord(position.y) * GRID + coord(position.z) * GRID * GRID
    }
}

impl FluidSimulation for GridFluid {
    fn update(&mut self, delta_time: f32, _audio: &AudioInfluenceSnapshot) -> Result<()> {
        let damping = (-(1.0 + self.viscosity.ln_1p()) * delta_time * (2.0 - self.quality)).exp();
        for velocity in &mut self.velocities {
            *velocity *= damping;
        }
        Ok(())
    }

    fn add_impulse(&mut self, position: Vec3, force: Vec3, radius: f32) {
        if radius <= 0.0 {
            return;
        }
        // heavier fluids resist the push
        let inertia = (self.density / 1000.0).max(1e-3);
        for (index, velocity) in self.velocities.iter_mut().enumerate() {
            let distance = Self::cell_centre(index).distance(position);
            if distance < radius {
                *velocity += force * (1.0 - distance / radius) / inertia;
            }
        }
    }

    fn set_viscosity(&mut self, viscosity: f32) {
        self.viscosity = viscosity.max(0.0);
    }

    fn set_density(&mut self, density: f32) {
        self.density = density.max(0.0);
    }

    fn velocity_field(&self) -> Vec<Vec3> {
        self.velocities.clone()
    }

    fn sample_velocity(&self, position: Vec3) -> Vec3 {
        self.velocities[Self::cell_at(position)]
    }

    fn set_quality_level(&mut self, level: f32) {
        self.quality = level.clamp(0.0, 1.0);
    }
}

/// Explicit Euler particles seeded on a ring.
pub struct EulerParticles {
    data: ParticleData,
    pending: Vec<Vec3>,
    drawn: usize,
}

impl EulerParticles {
    pub fn new(count: usize) -> Self {
        let positions = (0..count)
            .map(|i| {
                let angle = i as f32 * TAU / count.max(1) as f32;
                Vec3::new(angle.cos() * 1.5, 0.0, angle.sin() * 1.5)
            })
            .collect();
        Self {
            data: ParticleData {
                positions,
                velocities: vec![Vec3::ZERO; count],
            },
            pending: Vec::new(),
            drawn: 0,
        }
    }
}

impl ParticleSystem for EulerParticles {
    fn update(&mut self, delta_time: f32, audio: &AudioInfluenceSnapshot) -> Result<()> {
        let kick = if audio.beat { audio.beat_strength } else { 0.0 };
        let forces = std::mem::take(&mut self.pending);
        for (index, (position, velocity)) in self
            .data
            .positions
            .iter_mut()
            .zip(self.data.velocities.iter_mut())
            .enumerate()
        {
            let external = forces.get(index).copied().unwrap_or(Vec3::ZERO);
            *velocity += (external + Vec3::Y * kick) * delta_time;
            *velocity *= 0.98;
            *position += *velocity * delta_time;
            *position = position.clamp(Vec3::splat(-GRID_EXTENT), Vec3::splat(GRID_EXTENT));
        }
        Ok(())
    }

    fn particle_data(&self) -> ParticleData {
        self.data.clone()
    }

    fn apply_external_forces(&mut self, forces: &[Vec3]) -> Result<()> {
        self.pending = forces.to_vec();
        Ok(())
    }

    fn render(&mut self, mvp: &Mat4) -> Result<()> {
        self.drawn = self
            .data
            .positions
            .iter()
            .map(|position| mvp.project_point3(*position))
            .filter(|ndc| ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0)
            .count();
        tracing::trace!(visible = self.drawn, "particles drawn");
        Ok(())
    }
}

/// Fixed camera looking at the blob.
pub struct StaticCamera {
    view_projection: Mat4,
    quality: f32,
}

impl StaticCamera {
    pub fn new(aspect: f32) -> Self {
        let projection = Mat4::perspective_rh(45f32.to_radians(), aspect, 0.1, 100.0);
        let view = Mat4::look_at_rh(Vec3::new(0.0, 1.5, 6.0), Vec3::ZERO, Vec3::Y);
        Self {
            view_projection: projection * view,
            quality: 1.0,
        }
    }
}

impl RenderEngine for StaticCamera {
    fn mvp_matrix(&self) -> Mat4 {
        self.view_projection
    }

    fn set_quality_level(&mut self, level: f32) {
        self.quality = level;
        tracing::debug!(level, "render quality changed");
    }
}

/// Accumulates per-system CPU time for the end-of-run summary.
#[derive(Debug, Default)]
pub struct TimingMonitor {
    totals: RefCell<BTreeMap<String, (u64, f64)>>,
}

impl TimingMonitor {
    pub fn report(&self) {
        for (name, (samples, total)) in self.totals.borrow().iter() {
            let average = if *samples == 0 {
                0.0
            } else {
                total / *samples as f64
            };
            tracing::info!(system = %name, samples, average_ms = average, "cpu time");
        }
    }
}

impl PerformanceMonitor for TimingMonitor {
    fn record_cpu_time(&self, name: &str, ms: f64) {
        let mut totals = self.totals.borrow_mut();
        let entry = totals.entry(name.to_string()).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += ms;
    }

    fn register_system(&self, name: &str) {
        tracing::debug!(system = name, "monitor registered");
        self.totals
            .borrow_mut()
            .entry(name.to_string())
            .or_insert((0, 0.0));
    }

    fn unregister_system(&self, name: &str) {
        tracing::debug!(system = name, "monitor unregistered");
    }
}

/// Deterministic beat-and-sweep signal at a fixed tempo.
pub struct SyntheticAudio {
    bpm: f32,
    last_beat: Option<u64>,
}

impl SyntheticAudio {
    pub fn new(bpm: f32) -> Self {
        Self {
            bpm: bpm.max(1.0),
            last_beat: None,
        }
    }

    /// Features for the frame at `seconds`. A beat fires on the first frame
    /// of every beat interval.
    pub fn sample(&mut self, seconds: f32) -> AudioFeatures {
        let beats = seconds * self.bpm / 60.0;
        let index = beats.floor() as u64;
        let beat = self.last_beat != Some(index);
        self.last_beat = Some(index);

        let phase = beats.fract();
        let bass = (1.0 - phase).powi(2);
        let mid = 0.5 + 0.5 * (seconds * 0.8).sin();
        let treble = 0.5 + 0.5 * (seconds * 3.1).sin();
        AudioFeatures {
            energy: (bass + mid + treble) / 3.0,
            bass,
            mid,
            treble,
            beat,
            beat_strength: if beat { 0.8 } else { 0.0 },
        }
    }
}
