//! Core library for the audio-reactive blob visualiser.
//!
//! Two engines live here. The [`PhysicsCoordinator`] drives the metaball,
//! fluid, particle and material-physics subsystems once per frame, couples
//! them and keeps the frame inside its time budget. The
//! [`MaterialPropertyEngine`] owns the material the blob is made of: it
//! blends between materials, tracks the thermodynamic phase and layers
//! audio-reactive modulation on top. The solvers themselves are external
//! collaborators reached through the traits in [`physics`].

pub mod assets;
pub mod audio;
pub mod config;
pub mod error;
pub mod events;
pub mod mapping;
pub mod material;
pub mod physics;
pub mod render;
pub mod timeline;

pub use assets::{builtin_materials, MaterialDefinition, MaterialLibrary, MaterialManager};
pub use audio::{AudioFeatures, AudioInfluenceBuilder, AudioInfluenceSnapshot};
pub use config::{AppConfig, MaterialConfig, MaterialConfigPatch, PhysicsConfig, PhysicsConfigPatch};
pub use error::{BlobVizError, Result};
pub use events::{EventBus, ListenerId, MaterialEvent, PhysicsEvent};
pub use mapping::{BandResponse, FrequencyBand, InfluenceMap, MetaballInfluence};
pub use material::{
    Easing, MaterialPropertyEngine, MaterialState, MaterialType, MaterialUniform, Phase,
    PropertyInterpolator, PropertySet, SetMaterialOptions,
};
pub use physics::{
    FluidSimulation, MaterialBroadcast, MaterialPhysics, MetaballSystem, ParticleData,
    ParticleSystem, PerformanceMonitor, PhysicsCoordinator, PhysicsIntegrations, PhysicsStage,
    PhysicsState,
};
pub use render::{RenderEngine, UniformBlock, UniformSink, UniformValue};
pub use timeline::{Clock, ManualClock, MonotonicClock};
