mod demo;

use std::{cell::RefCell, path::PathBuf, rc::Rc};

use blob_visualiser_core::{
    AppConfig, AudioFeatures, ManualClock, MaterialLibrary, MaterialPropertyEngine,
    PhysicsCoordinator, PhysicsEvent, PhysicsIntegrations, SetMaterialOptions,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::demo::{
    EulerParticles, GridFluid, OrbitingMetaballs, StaticCamera, SyntheticAudio, TimingMonitor,
};

fn main() -> blob_visualiser_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            frames,
            fps,
            material,
            config,
            output,
        } => run_simulate(frames, fps, material.as_deref(), config.as_ref(), output.as_ref()),
        Commands::Materials => run_materials(),
        Commands::Uniforms {
            material,
            temperature,
        } => run_uniforms(&material, temperature),
    }
}

fn run_simulate(
    frames: u32,
    fps: f32,
    material: Option<&str>,
    config: Option<&PathBuf>,
    output: Option<&PathBuf>,
) -> blob_visualiser_core::Result<()> {
    let config = match config {
        Some(path) => AppConfig::from_path(path)?,
        None => AppConfig::default(),
    };
    let fps = fps.max(1.0);
    let frame_ms = 1000.0 / f64::from(fps);
    tracing::info!(frames, fps, material, "starting offline simulation");

    let clock = ManualClock::new();
    let library = Rc::new(MaterialLibrary::with_builtins());
    let engine = Rc::new(RefCell::new(MaterialPropertyEngine::new(
        config.material.clone(),
        library.clone(),
        Box::new(clock.clone()),
    )));
    if let Some(id) = material {
        engine
            .borrow_mut()
            .set_material(id, SetMaterialOptions::immediate())?;
        library.set_current(id)?;
    }

    let monitor = Rc::new(TimingMonitor::default());
    let mut coordinator = PhysicsCoordinator::new(config.physics.clone(), Box::new(clock.clone()));
    coordinator.subscribe(|event| match event {
        PhysicsEvent::Error {
            context,
            stage,
            message,
        } => tracing::warn!(context, ?stage, %message, "physics error"),
        PhysicsEvent::QualityChanged { previous, current } => {
            tracing::info!(previous, current, "quality changed")
        }
        PhysicsEvent::PerformanceChanged {
            average_update_ms,
            quality_level,
        } => tracing::debug!(average_update_ms, quality_level, "performance"),
        _ => {}
    });
    coordinator.initialize(PhysicsIntegrations {
        render_engine: Some(Box::new(StaticCamera::new(16.0 / 9.0))),
        material_manager: Some(library.clone()),
        metaballs: Some(Box::new(OrbitingMetaballs::new(
            config.physics.metaball_count,
        ))),
        fluid: Some(Box::new(GridFluid::new())),
        particles: Some(Box::new(EulerParticles::new(256))),
        material_physics: Some(Box::new(engine.clone())),
        performance_monitor: Some(monitor.clone()),
    })?;

    let mut audio = SyntheticAudio::new(120.0);
    let delta_time = 1.0 / fps;
    for frame in 0..frames {
        let features = audio.sample(frame as f32 * delta_time);
        coordinator.update(delta_time, &features);
        coordinator.render_particles()?;

        if frame > 0 && frame % fps.round().max(1.0) as u32 == 0 {
            coordinator.report_frame_time(coordinator.stats().average_update_ms);
        }
        clock.advance_ms(frame_ms);
    }

    let stats = coordinator.stats();
    let state = coordinator.get_physics_state();
    {
        let engine = engine.borrow();
        tracing::info!(
            frames_updated = stats.frames_updated,
            frames_skipped = stats.frames_skipped,
            stage_failures = stats.stage_failures,
            quality = state.quality_level,
            material = ?engine.state().material_id,
            phase = ?engine.state().phase,
            temperature = engine.state().temperature,
            "simulation finished"
        );
    }
    monitor.report();

    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&state)?)?;
        tracing::info!(?path, "physics state written");
    }

    coordinator.dispose();
    Ok(())
}

fn run_materials() -> blob_visualiser_core::Result<()> {
    let library = MaterialLibrary::with_builtins();
    for (id, (name, kind)) in library.summaries() {
        println!("{id:<12} {name:<14} {kind:?}");
    }
    Ok(())
}

fn run_uniforms(material: &str, temperature: Option<f32>) -> blob_visualiser_core::Result<()> {
    let library = Rc::new(MaterialLibrary::with_builtins());
    let mut engine = MaterialPropertyEngine::new(
        Default::default(),
        library,
        Box::new(ManualClock::new()),
    );
    if let Some(kelvin) = temperature {
        engine.set_temperature(kelvin);
    }
    engine.set_material(material, SetMaterialOptions::immediate())?;
    engine.update(0.0, &AudioFeatures::silence());

    println!("{}", serde_json::to_string_pretty(&engine.get_shader_uniforms())?);
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Audio-reactive blob visualiser", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the physics and material engines offline against demo systems.
    Simulate {
        /// Number of frames to simulate.
        #[arg(short, long, default_value_t = 600)]
        frames: u32,
        /// Simulated frame rate.
        #[arg(long, default_value_t = 60.0)]
        fps: f32,
        /// Material to start from.
        #[arg(short, long)]
        material: Option<String>,
        /// JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Where to write the final physics state as JSON.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the built-in materials.
    Materials,
    /// Print the shader uniform table for a material.
    Uniforms {
        /// Material id, see `materials`.
        #[arg(short, long, default_value = "water")]
        material: String,
        /// Temperature in Kelvin.
        #[arg(short, long)]
        temperature: Option<f32>,
    },
}
