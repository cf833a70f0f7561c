//! Material property engine: owns the live property set, blends between
//! materials, tracks the thermodynamic phase and layers audio-reactive
//! modulation on top.

mod easing;
mod phase;
mod properties;
mod transition;
mod uniforms;

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use easing::Easing;
pub use phase::{Phase, PhaseFactors, PhaseMachine};
pub use properties::{
    BlendMode, ElectricalProperties, InterpolationOptions, OpticalProperties,
    PhysicalProperties, PropertyInterpolator, PropertySet, ThermalProperties,
};
pub use transition::{Advanced, Transition, TransitionRequest, TransitionSet};
pub use uniforms::{material_id_hash, MaterialUniform, UniformContext};

use crate::{
    assets::MaterialManager,
    audio::{AudioFeatures, AudioInfluenceBuilder, AudioInfluenceSnapshot},
    config::{MaterialConfig, MaterialConfigPatch},
    events::{EventBus, ListenerId, MaterialEvent},
    render::{UniformBlock, UniformSink, UniformValue},
    timeline::Clock,
    BlobVizError, Result,
};

/// Where a material definition came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MaterialType {
    Builtin,
    User,
    Runtime,
}

impl MaterialType {
    pub fn code(self) -> i32 {
        match self {
            MaterialType::Builtin => 0,
            MaterialType::User => 1,
            MaterialType::Runtime => 2,
        }
    }
}

/// Thermodynamic and bookkeeping state of the active material.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialState {
    pub material_id: Option<String>,
    pub material_type: MaterialType,
    pub phase: Phase,
    /// Kelvin.
    pub temperature: f32,
    /// Pascal.
    pub pressure: f32,
    pub ionization: f32,
    pub is_transitioning: bool,
}

impl Default for MaterialState {
    fn default() -> Self {
        Self {
            material_id: None,
            material_type: MaterialType::Builtin,
            phase: Phase::Liquid,
            temperature: 293.15,
            pressure: 101_325.0,
            ionization: 0.0,
            is_transitioning: false,
        }
    }
}

/// Per-call options for [`MaterialPropertyEngine::set_material`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetMaterialOptions {
    pub immediate: bool,
    /// Seconds; falls back to the configured default.
    pub duration: Option<f32>,
    pub easing: Option<Easing>,
}

impl SetMaterialOptions {
    pub fn immediate() -> Self {
        Self {
            immediate: true,
            ..Self::default()
        }
    }

    pub fn over(duration_secs: f32) -> Self {
        Self {
            duration: Some(duration_secs),
            ..Self::default()
        }
    }
}

pub struct MaterialPropertyEngine {
    config: MaterialConfig,
    clock: Box<dyn Clock>,
    manager: Rc<dyn MaterialManager>,
    interpolator: Option<Box<dyn PropertyInterpolator>>,
    state: MaterialState,
    /// Material baseline: the active definition, or the blend of in-flight
    /// transitions. Phase factors and audio modulation are never baked in.
    base: PropertySet,
    live: PropertySet,
    phase: PhaseMachine,
    transitions: TransitionSet,
    audio: AudioInfluenceBuilder,
    events: EventBus<MaterialEvent>,
}

impl MaterialPropertyEngine {
    pub fn new(
        config: MaterialConfig,
        manager: Rc<dyn MaterialManager>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let state = MaterialState {
            temperature: config.initial_temperature,
            pressure: config.initial_pressure,
            ..MaterialState::default()
        };
        let base = PropertySet::default();
        let phase = PhaseMachine::new(Phase::for_temperature(
            state.temperature,
            base.thermal.melting_point,
            base.thermal.boiling_point,
        ));
        let mut engine = Self {
            transitions: TransitionSet::new(config.max_concurrent_transitions),
            audio: AudioInfluenceBuilder::new(config.smoothing_factor),
            config,
            clock,
            manager,
            interpolator: None,
            state: MaterialState {
                phase: phase.phase(),
                ..state
            },
            base,
            live: base,
            phase,
            events: EventBus::new(),
        };
        engine.refresh_live();
        engine
    }

    pub fn with_interpolator(mut self, interpolator: Box<dyn PropertyInterpolator>) -> Self {
        self.interpolator = Some(interpolator);
        self
    }

    pub fn config(&self) -> &MaterialConfig {
        &self.config
    }

    pub fn set_configuration(&mut self, patch: &MaterialConfigPatch) {
        patch.apply(&mut self.config);
        self.transitions
            .set_limit(self.config.max_concurrent_transitions);
        self.audio.set_smoothing(self.config.smoothing_factor);
        self.refresh_live();
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&MaterialEvent) + 'static) -> ListenerId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Switches to `material_id`, either at once or through a transition.
    ///
    /// Unknown ids and requests past the transition cap fail without
    /// touching any state.
    pub fn set_material(&mut self, material_id: &str, options: SetMaterialOptions) -> Result<()> {
        let definition = self
            .manager
            .material(material_id)
            .ok_or_else(|| BlobVizError::MaterialNotFound(material_id.to_string()))?;

        if options.immediate || !self.config.enable_transitions {
            let dropped = self.transitions.clear();
            if dropped > 0 {
                debug!(dropped, "immediate material change cancelled transitions");
            }

            let previous = self.state.material_id.replace(definition.id.clone());
            self.state.material_type = definition.material_type;
            self.state.is_transitioning = false;
            self.base = definition.properties;
            self.evaluate_phase();
            self.refresh_live();

            info!(material = %definition.id, "material applied");
            self.events.emit(&MaterialEvent::MaterialChanged {
                previous,
                current: definition.id,
            });
            return Ok(());
        }

        if self.transitions.is_full() {
            warn!(
                material = material_id,
                active = self.transitions.len(),
                limit = self.transitions.limit(),
                "transition rejected"
            );
            return Err(BlobVizError::TransitionLimit {
                active: self.transitions.len(),
                limit: self.transitions.limit(),
            });
        }

        let duration_secs = options
            .duration
            .unwrap_or(self.config.default_transition_secs)
            .max(0.0);
        let request = TransitionRequest {
            from_material_id: self.state.material_id.clone(),
            to_material_id: definition.id.clone(),
            from_properties: self.base,
            to_properties: definition.properties,
            duration_ms: f64::from(duration_secs) * 1000.0,
            easing: options.easing.unwrap_or(self.config.default_easing),
        };
        let now = self.clock.now_ms();
        let transition = self.transitions.start(request, now)?;
        let event = MaterialEvent::TransitionStarted {
            id: transition.id,
            from: transition.from_material_id.clone(),
            to: transition.to_material_id.clone(),
        };
        self.state.is_transitioning = true;

        info!(
            material = material_id,
            duration_secs,
            active = self.transitions.len(),
            "transition started"
        );
        self.events.emit(&event);
        Ok(())
    }

    /// Advances transitions, re-evaluates the phase and re-applies audio
    /// modulation, in that order.
    pub fn update(&mut self, delta_time: f32, audio: &AudioFeatures) {
        let snapshot = self.audio.build(audio);
        let now = self.clock.now_ms();

        if !self.transitions.is_empty() {
            self.advance_transitions(now, &snapshot);
        }

        self.evaluate_phase();
        self.live = self.base;
        self.phase.factors().apply_to(&mut self.live);

        if self.config.enable_audio_reactivity {
            self.apply_audio_reactivity(&snapshot);
        }

        debug!(
            delta_time,
            phase = ?self.state.phase,
            temperature = self.state.temperature,
            transitions = self.transitions.len(),
            "material engine updated"
        );
    }

    fn advance_transitions(&mut self, now: f64, snapshot: &AudioInfluenceSnapshot) {
        let interpolator = self.interpolator.as_deref();
        let base = &mut self.base;
        let Advanced {
            finished,
            superseded,
        } = self.transitions.advance(now, |transition| {
            *base = blend(interpolator, transition, snapshot);
        });

        for transition in &superseded {
            debug!(material = %transition.to_material_id, id = transition.id, "transition superseded");
        }

        for transition in finished {
            let previous = self
                .state
                .material_id
                .replace(transition.to_material_id.clone());
            if let Some(definition) = self.manager.material(&transition.to_material_id) {
                self.state.material_type = definition.material_type;
            }

            info!(material = %transition.to_material_id, id = transition.id, "transition complete");
            self.events.emit(&MaterialEvent::TransitionCompleted {
                id: transition.id,
                to: transition.to_material_id.clone(),
            });
            self.events.emit(&MaterialEvent::MaterialChanged {
                previous,
                current: transition.to_material_id,
            });
        }

        self.state.is_transitioning = !self.transitions.is_empty();
    }

    fn evaluate_phase(&mut self) {
        if !self.config.enable_phase_transitions {
            return;
        }

        if let Some(previous) = self.phase.evaluate(self.state.temperature, &self.base) {
            let current = self.phase.phase();
            self.state.phase = current;
            info!(
                from = ?previous,
                to = ?current,
                temperature = self.state.temperature,
                "phase changed"
            );
            self.events.emit(&MaterialEvent::PhaseChanged {
                from: previous,
                to: current,
                temperature: self.state.temperature,
            });
        }
    }

    fn apply_audio_reactivity(&mut self, audio: &AudioInfluenceSnapshot) {
        modulate(&self.config, &mut self.live, audio);
        if audio.beat {
            let kick = audio.beat_strength * self.config.beat_influence * self.config.audio_intensity;
            self.state.temperature += kick * 10.0;
        }
    }

    /// Rebuilds the live set from the baseline without advancing anything.
    fn refresh_live(&mut self) {
        self.live = self.base;
        self.phase.factors().apply_to(&mut self.live);
        if self.config.enable_audio_reactivity {
            modulate(&self.config, &mut self.live, self.audio.latest());
        }
    }

    /// Drops every in-flight transition, keeping the current blend.
    pub fn cancel_transitions(&mut self) -> usize {
        let dropped = self.transitions.clear();
        self.state.is_transitioning = false;
        dropped
    }

    pub fn set_temperature(&mut self, kelvin: f32) {
        self.state.temperature = kelvin.max(0.0);
    }

    pub fn set_pressure(&mut self, pascal: f32) {
        self.state.pressure = pascal.max(0.0);
    }

    pub fn set_ionization(&mut self, ionization: f32) {
        self.state.ionization = ionization.clamp(0.0, 1.0);
    }

    pub fn state(&self) -> &MaterialState {
        &self.state
    }

    /// Live properties: baseline, phase factors and audio modulation.
    pub fn material_properties(&self) -> PropertySet {
        self.live
    }

    pub fn base_properties(&self) -> PropertySet {
        self.base
    }

    pub fn active_transition_count(&self) -> usize {
        self.transitions.len()
    }

    pub fn active_transitions(&self) -> &[Transition] {
        self.transitions.active()
    }

    pub fn phase_change_count(&self) -> u64 {
        self.phase.change_count()
    }

    pub fn audio_snapshot(&self) -> &AudioInfluenceSnapshot {
        self.audio.latest()
    }

    pub fn audio_reactivity_scale(&self) -> f32 {
        if self.config.enable_audio_reactivity {
            self.config.audio_intensity * (1.0 + self.audio.latest().smoothed_energy)
        } else {
            0.0
        }
    }

    pub fn uniform(&self, uniform: MaterialUniform) -> UniformValue {
        uniform.value(&self.uniform_context())
    }

    pub fn get_shader_uniforms(&self) -> UniformBlock {
        let mut block = UniformBlock::new();
        self.update_shader_uniforms(&mut block);
        block
    }

    pub fn update_shader_uniforms(&self, program: &mut dyn UniformSink) {
        let ctx = self.uniform_context();
        for uniform in MaterialUniform::ALL {
            program.set_uniform(uniform.name(), uniform.value(&ctx));
        }
    }

    fn uniform_context(&self) -> UniformContext<'_> {
        UniformContext {
            state: &self.state,
            properties: &self.live,
            audio_reactivity_scale: self.audio_reactivity_scale(),
        }
    }
}

/// Audio-driven offsets layered onto the live properties. Beat heating is
/// handled by the caller since it mutates the material state.
fn modulate(config: &MaterialConfig, live: &mut PropertySet, audio: &AudioInfluenceSnapshot) {
    let intensity = config.audio_intensity;
    let physical = &mut live.physical;
    physical.viscosity *= 1.0 + audio.smoothed_energy * config.energy_influence * intensity * 0.5;
    physical.surface_tension *= 1.0 + audio.smoothed_bass * config.bass_influence * intensity * 0.3;

    let emission = &mut live.optical.emission;
    emission[0] += audio.smoothed_mid * config.mid_influence * intensity * 0.2;
    emission[1] += audio.smoothed_treble * config.treble_influence * intensity * 0.2;
    emission[2] += (audio.mid + audio.treble) * intensity * 0.1;

    if audio.beat {
        let kick = audio.beat_strength * config.beat_influence * intensity;
        for channel in emission.iter_mut() {
            *channel += kick * 0.5;
        }
    }
}

fn blend(
    interpolator: Option<&dyn PropertyInterpolator>,
    transition: &Transition,
    audio: &AudioInfluenceSnapshot,
) -> PropertySet {
    match interpolator {
        Some(interpolator) => interpolator.interpolate(
            &transition.from_properties,
            &transition.to_properties,
            transition.progress,
            &InterpolationOptions {
                blend_mode: BlendMode::Mix,
                easing: transition.easing,
                audio_influence: *audio,
            },
        ),
        None => PropertySet::interpolate(
            &transition.from_properties,
            &transition.to_properties,
            transition.progress,
        ),
    }
}

impl std::fmt::Debug for MaterialPropertyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterialPropertyEngine")
            .field("state", &self.state)
            .field("transitions", &self.transitions.len())
            .field("phase_changes", &self.phase.change_count())
            .field("interpolator", &self.interpolator.is_some())
            .field("events", &self.events)
            .finish()
    }
}
