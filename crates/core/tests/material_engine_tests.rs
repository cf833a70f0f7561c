use std::{cell::RefCell, rc::Rc};

use blob_visualiser_core::{
    material::{BlendMode, InterpolationOptions},
    AudioFeatures, BlobVizError, Easing, MaterialConfig, MaterialConfigPatch, MaterialEvent,
    MaterialLibrary, MaterialManager, MaterialPropertyEngine, MaterialUniform, Phase,
    ManualClock, PropertyInterpolator, PropertySet, SetMaterialOptions, UniformValue,
};

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() <= 1e-5 * b.abs().max(1.0)
}

fn quiet_config() -> MaterialConfig {
    MaterialConfig {
        enable_audio_reactivity: false,
        default_easing: Easing::Linear,
        ..MaterialConfig::default()
    }
}

fn engine_with(config: MaterialConfig) -> (MaterialPropertyEngine, ManualClock, Rc<MaterialLibrary>) {
    let clock = ManualClock::new();
    let library = Rc::new(MaterialLibrary::with_builtins());
    let engine = MaterialPropertyEngine::new(config, library.clone(), Box::new(clock.clone()));
    (engine, clock, library)
}

fn record_events(engine: &mut MaterialPropertyEngine) -> Rc<RefCell<Vec<MaterialEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    engine.subscribe(move |event| sink.borrow_mut().push(event.clone()));
    events
}

fn definition(library: &MaterialLibrary, id: &str) -> PropertySet {
    library
        .material(id)
        .map(|definition| definition.properties)
        .unwrap_or_else(|| panic!("missing preset {id}"))
}

#[test]
fn unknown_material_is_rejected_without_side_effects() {
    let (mut engine, _clock, _library) = engine_with(quiet_config());
    engine
        .set_material("water", SetMaterialOptions::immediate())
        .unwrap();
    let state_before = engine.state().clone();
    let properties_before = engine.material_properties();

    let err = engine
        .set_material("unobtainium", SetMaterialOptions::default())
        .unwrap_err();

    assert!(matches!(err, BlobVizError::MaterialNotFound(ref id) if id == "unobtainium"));
    assert!(err.is_rejected_request());
    assert_eq!(engine.state(), &state_before);
    assert_eq!(engine.material_properties(), properties_before);
    assert_eq!(engine.active_transition_count(), 0);
}

#[test]
fn immediate_change_replaces_properties_and_notifies() {
    let (mut engine, _clock, library) = engine_with(quiet_config());
    let events = record_events(&mut engine);

    engine
        .set_material("oil", SetMaterialOptions::immediate())
        .unwrap();

    assert_eq!(engine.state().material_id.as_deref(), Some("oil"));
    assert!(!engine.state().is_transitioning);
    assert_eq!(engine.base_properties(), definition(&library, "oil"));
    assert_eq!(engine.material_properties(), definition(&library, "oil"));
    assert_eq!(
        *events.borrow(),
        vec![MaterialEvent::MaterialChanged {
            previous: None,
            current: "oil".into(),
        }]
    );
}

#[test]
fn transition_blends_then_commits_target() {
    let (mut engine, clock, library) = engine_with(quiet_config());
    engine
        .set_material("water", SetMaterialOptions::immediate())
        .unwrap();
    let events = record_events(&mut engine);

    engine
        .set_material("honey", SetMaterialOptions::over(1.0))
        .unwrap();
    assert!(engine.state().is_transitioning);
    assert_eq!(engine.active_transition_count(), 1);
    assert_eq!(engine.state().material_id.as_deref(), Some("water"));

    clock.advance_ms(500.0);
    engine.update(0.5, &AudioFeatures::silence());
    let halfway = engine.base_properties().physical.viscosity;
    assert!(approx(halfway, 0.001 * 0.5 + 10.0 * 0.5), "got {halfway}");
    assert_eq!(engine.state().material_id.as_deref(), Some("water"));

    clock.advance_ms(500.0);
    engine.update(0.5, &AudioFeatures::silence());

    assert_eq!(engine.active_transition_count(), 0);
    assert!(!engine.state().is_transitioning);
    assert_eq!(engine.state().material_id.as_deref(), Some("honey"));
    assert_eq!(engine.base_properties(), definition(&library, "honey"));

    let events = events.borrow();
    assert!(matches!(
        events[0],
        MaterialEvent::TransitionStarted { ref to, .. } if to == "honey"
    ));
    assert!(events.contains(&MaterialEvent::MaterialChanged {
        previous: Some("water".into()),
        current: "honey".into(),
    }));
    assert!(events
        .iter()
        .any(|event| matches!(event, MaterialEvent::TransitionCompleted { to, .. } if to == "honey")));
}

#[test]
fn fifth_concurrent_transition_is_rejected() {
    let (mut engine, _clock, _library) = engine_with(quiet_config());
    for id in ["water", "oil", "honey", "mercury"] {
        engine.set_material(id, SetMaterialOptions::over(5.0)).unwrap();
    }
    assert_eq!(engine.active_transition_count(), 4);

    let err = engine
        .set_material("metal_gold", SetMaterialOptions::over(2.0))
        .unwrap_err();

    assert!(matches!(
        err,
        BlobVizError::TransitionLimit { active: 4, limit: 4 }
    ));
    assert_eq!(engine.active_transition_count(), 4);
    assert!(engine
        .active_transitions()
        .iter()
        .all(|transition| transition.to_material_id != "metal_gold"));
}

#[test]
fn immediate_change_cancels_running_transitions() {
    let (mut engine, _clock, _library) = engine_with(quiet_config());
    engine.set_material("honey", SetMaterialOptions::over(3.0)).unwrap();
    engine.set_material("oil", SetMaterialOptions::over(3.0)).unwrap();

    engine
        .set_material("lava", SetMaterialOptions::immediate())
        .unwrap();

    assert_eq!(engine.active_transition_count(), 0);
    assert_eq!(engine.state().material_id.as_deref(), Some("lava"));
}

#[test]
fn disabled_transitions_apply_immediately() {
    let (mut engine, _clock, library) = engine_with(MaterialConfig {
        enable_transitions: false,
        ..quiet_config()
    });

    engine
        .set_material("mercury", SetMaterialOptions::over(2.0))
        .unwrap();

    assert_eq!(engine.active_transition_count(), 0);
    assert_eq!(engine.base_properties(), definition(&library, "mercury"));
}

#[test]
fn cancel_keeps_current_blend() {
    let (mut engine, clock, _library) = engine_with(quiet_config());
    engine
        .set_material("water", SetMaterialOptions::immediate())
        .unwrap();
    engine.set_material("honey", SetMaterialOptions::over(1.0)).unwrap();
    clock.advance_ms(250.0);
    engine.update(0.25, &AudioFeatures::silence());
    let blended = engine.base_properties();

    assert_eq!(engine.cancel_transitions(), 1);
    clock.advance_ms(1000.0);
    engine.update(1.0, &AudioFeatures::silence());

    assert_eq!(engine.base_properties(), blended);
    assert_eq!(engine.state().material_id.as_deref(), Some("water"));
}

#[test]
fn cooling_below_melting_point_applies_solid_factors_once() {
    let (mut engine, _clock, library) = engine_with(quiet_config());
    let ice = definition(&library, "ice");
    let events = record_events(&mut engine);

    engine.set_temperature(250.0);
    engine
        .set_material("ice", SetMaterialOptions::immediate())
        .unwrap();
    for _ in 0..5 {
        engine.update(1.0 / 60.0, &AudioFeatures::silence());
    }

    assert_eq!(engine.state().phase, Phase::Solid);
    assert_eq!(engine.phase_change_count(), 1);
    let live = engine.material_properties();
    assert!(approx(live.physical.viscosity, ice.physical.viscosity * 1000.0));
    assert!(approx(live.optical.transparency, ice.optical.transparency * 0.5));

    engine.set_temperature(300.0);
    for _ in 0..5 {
        engine.update(1.0 / 60.0, &AudioFeatures::silence());
    }

    assert_eq!(engine.state().phase, Phase::Liquid);
    assert_eq!(engine.phase_change_count(), 2);
    assert_eq!(engine.material_properties(), ice);

    let phase_events: Vec<_> = events
        .borrow()
        .iter()
        .filter_map(|event| match event {
            MaterialEvent::PhaseChanged { from, to, .. } => Some((*from, *to)),
            _ => None,
        })
        .collect();
    assert_eq!(
        phase_events,
        vec![(Phase::Liquid, Phase::Solid), (Phase::Solid, Phase::Liquid)]
    );
}

#[test]
fn boiling_thins_the_material() {
    let (mut engine, _clock, library) = engine_with(quiet_config());
    let water = definition(&library, "water");
    engine
        .set_material("water", SetMaterialOptions::immediate())
        .unwrap();

    engine.set_temperature(400.0);
    engine.update(1.0 / 60.0, &AudioFeatures::silence());

    let live = engine.material_properties();
    assert_eq!(engine.state().phase, Phase::Gas);
    assert!(approx(live.physical.viscosity, water.physical.viscosity * 0.1));
    assert!(approx(live.physical.density, water.physical.density * 0.001));
    assert!(live.optical.transparency <= 1.0);
}

#[test]
fn disabled_phase_transitions_keep_the_phase() {
    let (mut engine, _clock, _library) = engine_with(MaterialConfig {
        enable_phase_transitions: false,
        ..quiet_config()
    });
    engine
        .set_material("water", SetMaterialOptions::immediate())
        .unwrap();
    engine.set_temperature(100.0);
    engine.update(1.0 / 60.0, &AudioFeatures::silence());

    assert_eq!(engine.state().phase, Phase::Liquid);
    assert_eq!(engine.phase_change_count(), 0);
}

#[test]
fn audio_modulates_live_properties_and_beats_heat() {
    let (mut engine, _clock, library) = engine_with(MaterialConfig::default());
    let water = definition(&library, "water");
    engine
        .set_material("water", SetMaterialOptions::immediate())
        .unwrap();
    let start_temperature = engine.state().temperature;

    let loud = AudioFeatures {
        energy: 1.0,
        bass: 1.0,
        mid: 0.5,
        treble: 0.5,
        beat: true,
        beat_strength: 0.8,
    };
    engine.update(1.0 / 60.0, &loud);

    let live = engine.material_properties();
    assert!(approx(live.physical.viscosity, water.physical.viscosity * 1.05));
    assert!(approx(
        live.physical.surface_tension,
        water.physical.surface_tension * 1.03
    ));
    assert!(approx(live.optical.emission[0], 0.05 * 0.2 + 0.4));
    assert!(approx(live.optical.emission[1], 0.05 * 0.2 + 0.4));
    assert!(approx(live.optical.emission[2], 0.1 + 0.4));
    assert!(approx(engine.state().temperature, start_temperature + 8.0));
    assert_eq!(engine.base_properties(), water);
}

#[test]
fn audio_modulation_does_not_compound() {
    let (mut engine, _clock, library) = engine_with(MaterialConfig::default());
    let water = definition(&library, "water");
    engine
        .set_material("water", SetMaterialOptions::immediate())
        .unwrap();
    let steady = AudioFeatures {
        energy: 1.0,
        ..AudioFeatures::silence()
    };

    engine.update(1.0 / 60.0, &steady);
    engine.update(1.0 / 60.0, &steady);

    // smoothed energy: 0.1 then 0.19
    let expected = water.physical.viscosity * (1.0 + 0.19 * 0.5);
    assert!(approx(engine.material_properties().physical.viscosity, expected));
}

#[test]
fn uniform_table_is_complete_and_read_only() {
    let (mut engine, _clock, _library) = engine_with(MaterialConfig::default());
    engine
        .set_material("metal_gold", SetMaterialOptions::immediate())
        .unwrap();
    engine.update(1.0 / 60.0, &AudioFeatures::silence());
    let state_before = engine.state().clone();
    let properties_before = engine.material_properties();

    let uniforms = engine.get_shader_uniforms();
    let again = engine.get_shader_uniforms();

    assert_eq!(uniforms.len(), MaterialUniform::ALL.len());
    assert_eq!(uniforms.len(), 34);
    assert_eq!(uniforms, again);
    assert_eq!(engine.state(), &state_before);
    assert_eq!(engine.material_properties(), properties_before);

    // gold is solid at room temperature
    assert_eq!(engine.state().phase, Phase::Solid);
    assert_eq!(uniforms.get("u_materialPhase"), Some(&UniformValue::Int(0)));
    assert_eq!(uniforms.get("u_materialType"), Some(&UniformValue::Int(0)));
    assert_eq!(uniforms.get("u_metallic"), Some(&UniformValue::Float(1.0)));
    let id = uniforms
        .get("u_materialId")
        .and_then(UniformValue::as_float)
        .unwrap();
    assert!((0.0..1.0).contains(&id));
}

#[test]
fn audio_reactivity_uniform_is_zero_when_disabled() {
    let (mut engine, _clock, _library) = engine_with(quiet_config());
    engine.update(
        1.0 / 60.0,
        &AudioFeatures {
            energy: 1.0,
            ..AudioFeatures::silence()
        },
    );

    assert_eq!(
        engine.uniform(MaterialUniform::AudioReactivity),
        UniformValue::Float(0.0)
    );
}

struct MidpointInterpolator {
    calls: Rc<RefCell<Vec<(f32, BlendMode)>>>,
}

impl PropertyInterpolator for MidpointInterpolator {
    fn interpolate(
        &self,
        from: &PropertySet,
        to: &PropertySet,
        t: f32,
        options: &InterpolationOptions,
    ) -> PropertySet {
        self.calls.borrow_mut().push((t, options.blend_mode));
        PropertySet::interpolate(from, to, 0.5)
    }
}

#[test]
fn external_interpolator_drives_the_blend() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let (engine, clock, library) = engine_with(quiet_config());
    let mut engine = engine.with_interpolator(Box::new(MidpointInterpolator {
        calls: calls.clone(),
    }));
    engine
        .set_material("water", SetMaterialOptions::immediate())
        .unwrap();
    engine.set_material("oil", SetMaterialOptions::over(1.0)).unwrap();

    clock.advance_ms(100.0);
    engine.update(0.1, &AudioFeatures::silence());

    let expected = PropertySet::interpolate(
        &definition(&library, "water"),
        &definition(&library, "oil"),
        0.5,
    );
    assert_eq!(engine.base_properties(), expected);
    let calls = calls.borrow();
    assert_eq!(calls.len(), 1);
    assert!(approx(calls[0].0, 0.1));
    assert_eq!(calls[0].1, BlendMode::Mix);
}

#[test]
fn configuration_patch_lowers_the_cap_for_new_requests() {
    let (mut engine, _clock, _library) = engine_with(quiet_config());
    engine.set_configuration(&MaterialConfigPatch {
        max_concurrent_transitions: Some(1),
        ..MaterialConfigPatch::default()
    });

    engine.set_material("oil", SetMaterialOptions::over(1.0)).unwrap();
    assert!(engine
        .set_material("honey", SetMaterialOptions::over(1.0))
        .is_err());
    assert_eq!(engine.config().max_concurrent_transitions, 1);
}

#[test]
fn newer_transition_commit_supersedes_older_one() {
    let (mut engine, clock, library) = engine_with(quiet_config());
    engine
        .set_material("water", SetMaterialOptions::immediate())
        .unwrap();
    let events = record_events(&mut engine);

    engine.set_material("glass", SetMaterialOptions::over(5.0)).unwrap();
    clock.advance_ms(100.0);
    engine.update(0.1, &AudioFeatures::silence());
    engine.set_material("honey", SetMaterialOptions::over(1.0)).unwrap();

    clock.advance_ms(1000.0);
    engine.update(1.0, &AudioFeatures::silence());
    assert_eq!(engine.state().material_id.as_deref(), Some("honey"));
    assert_eq!(engine.base_properties(), definition(&library, "honey"));
    assert_eq!(engine.active_transition_count(), 0);
    assert!(!engine.state().is_transitioning);

    clock.advance_ms(250.0);
    engine.update(0.25, &AudioFeatures::silence());
    assert_eq!(engine.state().material_id.as_deref(), Some("honey"));
    assert_eq!(engine.base_properties(), definition(&library, "honey"));

    assert!(!events
        .borrow()
        .iter()
        .any(|event| matches!(event, MaterialEvent::MaterialChanged { current, .. } if current == "glass")));
}

#[test]
fn phase_factors_replace_rather_than_compound() {
    let (mut engine, _clock, library) = engine_with(quiet_config());
    let ice = definition(&library, "ice");
    engine.set_temperature(250.0);
    engine
        .set_material("ice", SetMaterialOptions::immediate())
        .unwrap();
    engine.update(1.0 / 60.0, &AudioFeatures::silence());
    assert_eq!(engine.state().phase, Phase::Solid);

    engine.set_temperature(500.0);
    engine.update(1.0 / 60.0, &AudioFeatures::silence());
    assert_eq!(engine.state().phase, Phase::Gas);
    let gas = engine.material_properties().physical.viscosity;
    assert!(approx(gas, ice.physical.viscosity * 0.1), "got {gas}");

    engine.set_temperature(300.0);
    engine.update(1.0 / 60.0, &AudioFeatures::silence());
    assert_eq!(engine.state().phase, Phase::Liquid);
    assert_eq!(engine.material_properties(), ice);
}
