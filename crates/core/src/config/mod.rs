use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{audio::DEFAULT_SMOOTHING, material::Easing, Result};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub physics: PhysicsConfig,
    pub material: MaterialConfig,
}

impl AppConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut config: Self = serde_json::from_str(json)?;
        config.physics.sanitize();
        config.material.sanitize();
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Settings owned by the physics coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PhysicsConfig {
    pub metaball_count: usize,
    pub audio_reactivity: f32,
    pub bass_response: f32,
    pub mid_response: f32,
    pub treble_response: f32,
    pub smoothing_factor: f32,
    pub metaball_fluid_coupling: bool,
    pub fluid_particle_coupling: bool,
    pub material_coupling: bool,
    pub adaptive_quality: bool,
    pub target_frame_time_ms: f64,
    pub max_skip_frames: u32,
    /// Lowest quality level the coordinator will fall back to.
    pub min_quality: f32,
    pub max_quality: f32,
    pub performance_event_interval_ms: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            metaball_count: 8,
            audio_reactivity: 1.0,
            bass_response: 1.0,
            mid_response: 0.7,
            treble_response: 0.5,
            smoothing_factor: DEFAULT_SMOOTHING,
            metaball_fluid_coupling: true,
            fluid_particle_coupling: true,
            material_coupling: true,
            adaptive_quality: true,
            target_frame_time_ms: 1000.0 / 60.0,
            max_skip_frames: 2,
            min_quality: 0.5,
            max_quality: 1.0,
            performance_event_interval_ms: 1000.0,
        }
    }
}

impl PhysicsConfig {
    /// Non-finite values fall back to their defaults before clamping.
    fn sanitize(&mut self) {
        let defaults = Self::default();
        self.audio_reactivity = finite_or(self.audio_reactivity, defaults.audio_reactivity).max(0.0);
        self.bass_response = finite_or(self.bass_response, defaults.bass_response);
        self.mid_response = finite_or(self.mid_response, defaults.mid_response);
        self.treble_response = finite_or(self.treble_response, defaults.treble_response);
        self.smoothing_factor =
            finite_or(self.smoothing_factor, defaults.smoothing_factor).clamp(0.0, 1.0);
        self.target_frame_time_ms =
            finite_or(self.target_frame_time_ms, defaults.target_frame_time_ms).max(1.0);
        self.min_quality = finite_or(self.min_quality, defaults.min_quality).clamp(0.0, 1.0);
        self.max_quality =
            finite_or(self.max_quality, defaults.max_quality).clamp(self.min_quality, 1.0);
        self.performance_event_interval_ms = finite_or(
            self.performance_event_interval_ms,
            defaults.performance_event_interval_ms,
        )
        .max(0.0);
    }
}

/// Partial update for [`PhysicsConfig`]; only the present fields apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PhysicsConfigPatch {
    pub metaball_count: Option<usize>,
    pub audio_reactivity: Option<f32>,
    pub bass_response: Option<f32>,
    pub mid_response: Option<f32>,
    pub treble_response: Option<f32>,
    pub smoothing_factor: Option<f32>,
    pub metaball_fluid_coupling: Option<bool>,
    pub fluid_particle_coupling: Option<bool>,
    pub material_coupling: Option<bool>,
    pub adaptive_quality: Option<bool>,
    pub target_frame_time_ms: Option<f64>,
    pub max_skip_frames: Option<u32>,
    pub min_quality: Option<f32>,
    pub max_quality: Option<f32>,
    pub performance_event_interval_ms: Option<f64>,
}

impl PhysicsConfigPatch {
    pub fn apply(&self, config: &mut PhysicsConfig) {
        patch(&mut config.metaball_count, self.metaball_count);
        patch(&mut config.audio_reactivity, self.audio_reactivity);
        patch(&mut config.bass_response, self.bass_response);
        patch(&mut config.mid_response, self.mid_response);
        patch(&mut config.treble_response, self.treble_response);
        patch(&mut config.smoothing_factor, self.smoothing_factor);
        patch(&mut config.metaball_fluid_coupling, self.metaball_fluid_coupling);
        patch(&mut config.fluid_particle_coupling, self.fluid_particle_coupling);
        patch(&mut config.material_coupling, self.material_coupling);
        patch(&mut config.adaptive_quality, self.adaptive_quality);
        patch(&mut config.target_frame_time_ms, self.target_frame_time_ms);
        patch(&mut config.max_skip_frames, self.max_skip_frames);
        patch(&mut config.min_quality, self.min_quality);
        patch(&mut config.max_quality, self.max_quality);
        patch(
            &mut config.performance_event_interval_ms,
            self.performance_event_interval_ms,
        );
        config.sanitize();
    }
}

/// Settings owned by the material property engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MaterialConfig {
    pub enable_transitions: bool,
    pub default_transition_secs: f32,
    pub default_easing: Easing,
    pub max_concurrent_transitions: usize,
    pub enable_phase_transitions: bool,
    pub enable_audio_reactivity: bool,
    pub audio_intensity: f32,
    pub energy_influence: f32,
    pub bass_influence: f32,
    pub mid_influence: f32,
    pub treble_influence: f32,
    pub beat_influence: f32,
    pub smoothing_factor: f32,
    /// Kelvin.
    pub initial_temperature: f32,
    /// Pascal.
    pub initial_pressure: f32,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        Self {
            enable_transitions: true,
            default_transition_secs: 1.0,
            default_easing: Easing::Smoothstep,
            max_concurrent_transitions: 4,
            enable_phase_transitions: true,
            enable_audio_reactivity: true,
            audio_intensity: 1.0,
            energy_influence: 1.0,
            bass_influence: 1.0,
            mid_influence: 1.0,
            treble_influence: 1.0,
            beat_influence: 1.0,
            smoothing_factor: DEFAULT_SMOOTHING,
            initial_temperature: 293.15,
            initial_pressure: 101_325.0,
        }
    }
}

impl MaterialConfig {
    fn sanitize(&mut self) {
        let defaults = Self::default();
        self.default_transition_secs =
            finite_or(self.default_transition_secs, defaults.default_transition_secs).max(0.0);
        self.max_concurrent_transitions = self.max_concurrent_transitions.max(1);
        self.audio_intensity = finite_or(self.audio_intensity, defaults.audio_intensity).max(0.0);
        self.energy_influence = finite_or(self.energy_influence, defaults.energy_influence);
        self.bass_influence = finite_or(self.bass_influence, defaults.bass_influence);
        self.mid_influence = finite_or(self.mid_influence, defaults.mid_influence);
        self.treble_influence = finite_or(self.treble_influence, defaults.treble_influence);
        self.beat_influence = finite_or(self.beat_influence, defaults.beat_influence);
        self.smoothing_factor =
            finite_or(self.smoothing_factor, defaults.smoothing_factor).clamp(0.0, 1.0);
        self.initial_temperature =
            finite_or(self.initial_temperature, defaults.initial_temperature).max(0.0);
        self.initial_pressure = finite_or(self.initial_pressure, defaults.initial_pressure).max(0.0);
    }
}

/// Partial update for [`MaterialConfig`]; only the present fields apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MaterialConfigPatch {
    pub enable_transitions: Option<bool>,
    pub default_transition_secs: Option<f32>,
    pub default_easing: Option<Easing>,
    pub max_concurrent_transitions: Option<usize>,
    pub enable_phase_transitions: Option<bool>,
    pub enable_audio_reactivity: Option<bool>,
    pub audio_intensity: Option<f32>,
    pub energy_influence: Option<f32>,
    pub bass_influence: Option<f32>,
    pub mid_influence: Option<f32>,
    pub treble_influence: Option<f32>,
    pub beat_influence: Option<f32>,
    pub smoothing_factor: Option<f32>,
}

impl MaterialConfigPatch {
    pub fn apply(&self, config: &mut MaterialConfig) {
        patch(&mut config.enable_transitions, self.enable_transitions);
        patch(&mut config.default_transition_secs, self.default_transition_secs);
        patch(&mut config.default_easing, self.default_easing);
        patch(
            &mut config.max_concurrent_transitions,
            self.max_concurrent_transitions,
        );
        patch(&mut config.enable_phase_transitions, self.enable_phase_transitions);
        patch(&mut config.enable_audio_reactivity, self.enable_audio_reactivity);
        patch(&mut config.audio_intensity, self.audio_intensity);
        patch(&mut config.energy_influence, self.energy_influence);
        patch(&mut config.bass_influence, self.bass_influence);
        patch(&mut config.mid_influence, self.mid_influence);
        patch(&mut config.treble_influence, self.treble_influence);
        patch(&mut config.beat_influence, self.beat_influence);
        patch(&mut config.smoothing_factor, self.smoothing_factor);
        config.sanitize();
    }
}

fn finite_or<T: Into<f64> + Copy>(value: T, default: T) -> T {
    if value.into().is_finite() {
        value
    } else {
        default
    }
}

fn patch<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}
