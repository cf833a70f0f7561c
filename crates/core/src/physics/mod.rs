//! Physics coordinator: runs the metaball, fluid, particle and
//! material-physics stages once per frame in a fixed order, couples them,
//! and governs frame skipping and quality.

mod governor;
mod systems;

use std::rc::Rc;

use glam::Vec3;
use serde::Serialize;
use tracing::{debug, info, warn};

pub use governor::{QualityChange, QualityState, FRAME_HISTORY};
pub use systems::{
    FluidSimulation, MaterialBroadcast, MaterialPhysics, MetaballSystem, ParticleData,
    ParticleSystem, PerformanceMonitor,
};

use crate::{
    assets::MaterialManager,
    audio::{AudioFeatures, AudioInfluenceBuilder, AudioInfluenceSnapshot},
    config::{PhysicsConfig, PhysicsConfigPatch},
    events::{EventBus, ListenerId, PhysicsEvent},
    mapping::{BandResponse, InfluenceMap},
    material::PropertySet,
    render::RenderEngine,
    timeline::Clock,
    BlobVizError, Result,
};

const MONITOR_NAME: &str = "physics-coordinator";
const IMPULSE_STRENGTH: f32 = 0.5;
const IMPULSE_RADIUS: f32 = 2.0;

/// Subsystem stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PhysicsStage {
    Metaballs,
    Fluid,
    Particles,
    MaterialPhysics,
}

impl PhysicsStage {
    pub const ORDER: [PhysicsStage; 4] = [
        PhysicsStage::Metaballs,
        PhysicsStage::Fluid,
        PhysicsStage::Particles,
        PhysicsStage::MaterialPhysics,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PhysicsStage::Metaballs => "metaballs",
            PhysicsStage::Fluid => "fluid",
            PhysicsStage::Particles => "particles",
            PhysicsStage::MaterialPhysics => "material-physics",
        }
    }
}

/// Collaborators handed to [`PhysicsCoordinator::initialize`]. The render
/// engine and material manager are required, everything else is optional.
#[derive(Default)]
pub struct PhysicsIntegrations {
    pub render_engine: Option<Box<dyn RenderEngine>>,
    pub material_manager: Option<Rc<dyn MaterialManager>>,
    pub metaballs: Option<Box<dyn MetaballSystem>>,
    pub fluid: Option<Box<dyn FluidSimulation>>,
    pub particles: Option<Box<dyn ParticleSystem>>,
    pub material_physics: Option<Box<dyn MaterialPhysics>>,
    pub performance_monitor: Option<Rc<dyn PerformanceMonitor>>,
}

struct Systems {
    render_engine: Box<dyn RenderEngine>,
    material_manager: Rc<dyn MaterialManager>,
    metaballs: Option<Box<dyn MetaballSystem>>,
    fluid: Option<Box<dyn FluidSimulation>>,
    particles: Option<Box<dyn ParticleSystem>>,
    material_physics: Option<Box<dyn MaterialPhysics>>,
    monitor: Option<Rc<dyn PerformanceMonitor>>,
}

/// Read-only view of the coupled simulation for the renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicsState {
    pub metaballs: Vec<Vec3>,
    pub fluid_velocities: Vec<Vec3>,
    pub particles: ParticleData,
    pub material_properties: Option<PropertySet>,
    pub audio_influence: AudioInfluenceSnapshot,
    pub quality_level: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorStats {
    pub frames_updated: u64,
    pub frames_skipped: u64,
    pub stage_failures: u64,
    pub last_update_ms: f64,
    pub average_update_ms: f64,
}

pub struct PhysicsCoordinator {
    config: PhysicsConfig,
    clock: Box<dyn Clock>,
    systems: Option<Systems>,
    audio: AudioInfluenceBuilder,
    response: BandResponse,
    influences: InfluenceMap,
    metaball_positions: Vec<Vec3>,
    material_id: Option<String>,
    quality: QualityState,
    stats: CoordinatorStats,
    last_performance_event_ms: Option<f64>,
    events: EventBus<PhysicsEvent>,
}

impl PhysicsCoordinator {
    pub fn new(config: PhysicsConfig, clock: Box<dyn Clock>) -> Self {
        Self {
            audio: AudioInfluenceBuilder::new(config.smoothing_factor),
            response: BandResponse::from_config(&config),
            quality: QualityState::new(
                config.min_quality,
                config.max_quality,
                config.max_skip_frames,
            ),
            config,
            clock,
            systems: None,
            influences: InfluenceMap::new(),
            metaball_positions: Vec::new(),
            material_id: None,
            stats: CoordinatorStats::default(),
            last_performance_event_ms: None,
            events: EventBus::new(),
        }
    }

    /// Wires the collaborators. Fails without touching state when a
    /// required one is missing.
    pub fn initialize(&mut self, integrations: PhysicsIntegrations) -> Result<()> {
        let PhysicsIntegrations {
            render_engine,
            material_manager,
            metaballs,
            fluid,
            particles,
            material_physics,
            performance_monitor,
        } = integrations;

        let render_engine =
            render_engine.ok_or(BlobVizError::MissingCollaborator("render engine"))?;
        let material_manager =
            material_manager.ok_or(BlobVizError::MissingCollaborator("material manager"))?;

        if self.systems.is_some() {
            self.dispose();
        }

        if let Some(monitor) = &performance_monitor {
            monitor.register_system(MONITOR_NAME);
        }

        info!(
            metaballs = metaballs.is_some(),
            fluid = fluid.is_some(),
            particles = particles.is_some(),
            material_physics = material_physics.is_some(),
            "physics coordinator initialised"
        );

        self.systems = Some(Systems {
            render_engine,
            material_manager,
            metaballs,
            fluid,
            particles,
            material_physics,
            monitor: performance_monitor,
        });
        self.material_id = None;
        self.quality.reset();
        self.stats = CoordinatorStats::default();
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.systems.is_some()
    }

    /// Releases every collaborator and returns to the uninitialised state.
    pub fn dispose(&mut self) {
        if let Some(systems) = self.systems.take() {
            if let Some(monitor) = &systems.monitor {
                monitor.unregister_system(MONITOR_NAME);
            }
            info!("physics coordinator disposed");
        }
        self.metaball_positions.clear();
        self.influences.clear();
        self.material_id = None;
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&PhysicsEvent) + 'static) -> ListenerId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn set_configuration(&mut self, patch: &PhysicsConfigPatch) {
        let previous_count = self.config.metaball_count;
        patch.apply(&mut self.config);

        self.response = BandResponse::from_config(&self.config);
        self.audio.set_smoothing(self.config.smoothing_factor);
        let level_before = self.quality.quality_level();
        self.quality.configure(
            self.config.min_quality,
            self.config.max_quality,
            self.config.max_skip_frames,
        );
        if self.config.metaball_count != previous_count {
            self.influences.clear();
        }

        let level = self.quality.quality_level();
        if (level - level_before).abs() > f32::EPSILON {
            self.propagate_quality(QualityChange {
                previous: level_before,
                current: level,
            });
        }
        debug!(config = ?self.config, "physics configuration updated");
    }

    /// Runs one frame. Does nothing before `initialize`, and drops the
    /// whole frame when the frame governor asks for a skip.
    pub fn update(&mut self, delta_time: f32, audio: &AudioFeatures) {
        if self.systems.is_none() {
            return;
        }

        let started = self.clock.now_ms();
        if self.quality.should_skip_frame(
            started,
            self.config.target_frame_time_ms,
            self.config.adaptive_quality,
        ) {
            self.stats.frames_skipped += 1;
            debug!(
                skipped = self.quality.skip_frame_count(),
                "frame skipped to recover budget"
            );
            return;
        }

        let snapshot = self.audio.build(audio);
        self.check_material_change();
        self.influences
            .apply_from_snapshot(self.config.metaball_count, &self.response, &snapshot);

        for stage in PhysicsStage::ORDER {
            let stage_started = self.clock.now_ms();
            let result = match stage {
                PhysicsStage::Metaballs => self.update_metaballs(delta_time, &snapshot),
                PhysicsStage::Fluid => self.update_fluid(delta_time, &snapshot),
                PhysicsStage::Particles => self.update_particles(delta_time, &snapshot),
                PhysicsStage::MaterialPhysics => self.update_material_physics(delta_time, audio),
            };
            self.finish_stage(stage, stage_started, result);
        }

        let finished = self.clock.now_ms();
        let duration = finished - started;
        self.quality.record_update(finished, duration);
        self.stats.frames_updated += 1;
        self.stats.last_update_ms = duration;
        self.stats.average_update_ms = self.quality.average_frame_time();

        if let Some(monitor) = self.systems.as_ref().and_then(|s| s.monitor.as_ref()) {
            monitor.record_cpu_time(MONITOR_NAME, duration);
        }

        self.events.emit(&PhysicsEvent::PhysicsUpdated {
            delta_time,
            audio: snapshot,
        });
        self.maybe_emit_performance(finished);
    }

    /// Callback for an external performance monitor reporting the average
    /// frame time in milliseconds.
    pub fn report_frame_time(&mut self, average_frame_time_ms: f64) {
        if !self.config.adaptive_quality {
            return;
        }
        let now = self.clock.now_ms();
        if let Some(change) = self.quality.adjust_quality(
            average_frame_time_ms,
            self.config.target_frame_time_ms,
            now,
        ) {
            info!(
                from = change.previous,
                to = change.current,
                average_frame_time_ms,
                "quality level adjusted"
            );
            self.propagate_quality(change);
        }
    }

    fn propagate_quality(&mut self, change: QualityChange) {
        if let Some(systems) = self.systems.as_mut() {
            systems.render_engine.set_quality_level(change.current);
            if let Some(metaballs) = systems.metaballs.as_mut() {
                metaballs.set_quality_level(change.current);
            }
            if let Some(fluid) = systems.fluid.as_mut() {
                fluid.set_quality_level(change.current);
            }
            if let Some(particles) = systems.particles.as_mut() {
                particles.set_quality_level(change.current);
            }
        }
        self.events.emit(&PhysicsEvent::QualityChanged {
            previous: change.previous,
            current: change.current,
        });
    }

    fn check_material_change(&mut self) {
        let Some(systems) = self.systems.as_mut() else {
            return;
        };
        let current = systems.material_manager.current_material();
        if current == self.material_id {
            return;
        }

        let previous = std::mem::replace(&mut self.material_id, current.clone());
        if let Some(id) = current.as_deref() {
            match systems.material_manager.material(id) {
                Some(definition) => {
                    if let Some(fluid) = systems.fluid.as_mut() {
                        fluid.set_viscosity(definition.properties.physical.viscosity);
                        fluid.set_density(definition.properties.physical.density);
                    }
                }
                None => {
                    warn!(material = id, "active material is not registered");
                    self.stats.stage_failures += 1;
                    self.events.emit(&PhysicsEvent::Error {
                        context: "materialChanged",
                        stage: None,
                        message: BlobVizError::MaterialNotFound(id.to_string()).to_string(),
                    });
                    return;
                }
            }
        }

        info!(?previous, ?current, "material changed");
        self.events
            .emit(&PhysicsEvent::MaterialChanged { previous, current });
    }

    fn update_metaballs(&mut self, delta_time: f32, audio: &AudioInfluenceSnapshot) -> Result<()> {
        let Some(metaballs) = self.systems.as_mut().and_then(|s| s.metaballs.as_mut()) else {
            return Ok(());
        };
        metaballs.update(delta_time, audio)?;

        self.metaball_positions.clear();
        self.metaball_positions.extend(
            metaballs
                .metaball_positions()
                .chunks_exact(3)
                .map(|xyz| Vec3::new(xyz[0], xyz[1], xyz[2])),
        );
        Ok(())
    }

    fn update_fluid(&mut self, delta_time: f32, audio: &AudioInfluenceSnapshot) -> Result<()> {
        let Some(fluid) = self.systems.as_mut().and_then(|s| s.fluid.as_mut()) else {
            return Ok(());
        };

        if self.config.metaball_fluid_coupling {
            for (index, position) in self.metaball_positions.iter().enumerate() {
                let scale = self.influences.scale(index).unwrap_or(1.0);
                let force = radial_direction(*position) * (scale * IMPULSE_STRENGTH);
                fluid.add_impulse(*position, force, scale * IMPULSE_RADIUS);
            }
        }

        fluid.update(delta_time, audio)
    }

    fn update_particles(&mut self, delta_time: f32, audio: &AudioInfluenceSnapshot) -> Result<()> {
        let Some(systems) = self.systems.as_mut() else {
            return Ok(());
        };
        let Some(particles) = systems.particles.as_mut() else {
            return Ok(());
        };

        if self.config.fluid_particle_coupling {
            if let Some(fluid) = systems.fluid.as_ref() {
                let forces: Vec<Vec3> = particles
                    .particle_data()
                    .positions
                    .iter()
                    .map(|position| fluid.sample_velocity(*position))
                    .collect();
                particles.apply_external_forces(&forces)?;
            }
        }

        particles.update(delta_time, audio)
    }

    fn update_material_physics(&mut self, delta_time: f32, audio: &AudioFeatures) -> Result<()> {
        let Some(systems) = self.systems.as_mut() else {
            return Ok(());
        };
        let Some(material) = systems.material_physics.as_mut() else {
            return Ok(());
        };
        material.update(delta_time, audio)?;

        if self.config.material_coupling {
            let broadcast = material.broadcast();
            if let Some(fluid) = systems.fluid.as_mut() {
                fluid.set_viscosity(broadcast.viscosity);
                fluid.set_density(broadcast.density);
            }
            if let Some(metaballs) = systems.metaballs.as_mut() {
                metaballs.apply_material(&broadcast)?;
            }
        }
        Ok(())
    }

    fn finish_stage(&mut self, stage: PhysicsStage, started: f64, result: Result<()>) {
        let elapsed = self.clock.now_ms() - started;
        if let Some(monitor) = self.systems.as_ref().and_then(|s| s.monitor.as_ref()) {
            monitor.record_cpu_time(stage.name(), elapsed);
        }

        if let Err(source) = result {
            let err = BlobVizError::Subsystem {
                context: stage.name(),
                message: source.to_string(),
            };
            self.stats.stage_failures += 1;
            warn!(error = %err, "physics stage failed");
            self.events.emit(&PhysicsEvent::Error {
                context: "update",
                stage: Some(stage),
                message: err.to_string(),
            });
        }
    }

    fn maybe_emit_performance(&mut self, now: f64) {
        let due = match self.last_performance_event_ms {
            Some(last) => now - last >= self.config.performance_event_interval_ms,
            None => true,
        };
        if !due {
            return;
        }

        self.last_performance_event_ms = Some(now);
        self.events.emit(&PhysicsEvent::PerformanceChanged {
            average_update_ms: self.quality.average_frame_time(),
            quality_level: self.quality.quality_level(),
        });
    }

    /// Draws the particle layer with the render engine's current matrix.
    pub fn render_particles(&mut self) -> Result<()> {
        let systems = self.systems.as_mut().ok_or(BlobVizError::NotInitialized)?;
        let mvp = systems.render_engine.mvp_matrix();
        match systems.particles.as_mut() {
            Some(particles) => particles.render(&mvp),
            None => Ok(()),
        }
    }

    pub fn get_physics_state(&self) -> PhysicsState {
        let systems = self.systems.as_ref();
        PhysicsState {
            metaballs: self.metaball_positions.clone(),
            fluid_velocities: systems
                .and_then(|s| s.fluid.as_ref())
                .map(|fluid| fluid.velocity_field())
                .unwrap_or_default(),
            particles: systems
                .and_then(|s| s.particles.as_ref())
                .map(|particles| particles.particle_data())
                .unwrap_or_default(),
            material_properties: self.get_material_properties(),
            audio_influence: *self.audio.latest(),
            quality_level: self.quality.quality_level(),
        }
    }

    pub fn get_material_properties(&self) -> Option<PropertySet> {
        self.systems
            .as_ref()
            .and_then(|s| s.material_physics.as_ref())
            .map(|material| material.properties())
    }

    pub fn influences(&self) -> &InfluenceMap {
        &self.influences
    }

    pub fn quality_level(&self) -> f32 {
        self.quality.quality_level()
    }

    pub fn quality_state(&self) -> &QualityState {
        &self.quality
    }

    pub fn stats(&self) -> CoordinatorStats {
        self.stats
    }
}

/// Unit vector pointing away from the blob centre, or straight up for a
/// metaball sitting on it.
fn radial_direction(position: Vec3) -> Vec3 {
    position.try_normalize().unwrap_or(Vec3::Y)
}

impl std::fmt::Debug for PhysicsCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicsCoordinator")
            .field("initialized", &self.systems.is_some())
            .field("material_id", &self.material_id)
            .field("quality", &self.quality.quality_level())
            .field("stats", &self.stats)
            .field("events", &self.events)
            .finish()
    }
}
