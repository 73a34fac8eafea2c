//! Deterministic replay through `render_recording`.

use ipre::prelude::*;

fn busy_settings() -> Settings {
    let mut settings = Settings::default();
    settings.generation.mode = AnimationMode::TileGrid;
    settings.generation.grid_size = 8;
    settings.collisions.enabled = true;
    settings.healing.enabled = true;
    settings.forces.turbulence.enabled = true;
    settings
}

/// Record a live session driven with uneven frame times.
fn record_session() -> AnimationRecording {
    let image = SourceImage::noise(96, 64, 42);
    let mut engine = Engine::new(120, 80).with_settings(busy_settings()).with_image(image, Some("noise"));
    let frame_times = [7.0, 33.0, 16.0, 51.0, 12.0];
    let tick = |engine: &mut Engine, n: usize| {
        for i in 0..n {
            engine.tick(frame_times[i % frame_times.len()]);
        }
    };

    engine.begin_input_recording();
    tick(&mut engine, 5);
    engine.enqueue_pulse(ForcePulse::new(PulseKind::Jitter(ChaosParams::default())).with_strength(15.0));
    tick(&mut engine, 9);
    let swirl = engine.enqueue_pulse(ForcePulse::new(PulseKind::Swirl(RadialParams::default())).continuous());
    engine.enqueue_pulse(ForcePulse::new(PulseKind::Randomize(RandomizeParams::default())).with_duration(1500.0));
    tick(&mut engine, 20);
    engine.cancel_continuous(swirl);
    tick(&mut engine, 15);
    engine.end_input_recording().expect("recording was started")
}

fn export(recording: &AnimationRecording, fps: f32) -> Vec<ComposedFrame> {
    let mut frames = Vec::new();
    let outcome = render_recording(
        recording,
        &ExportOptions::new(fps, 90, 60),
        &mut RasterSurfaceFactory::default(),
        |frame| {
            frames.push(frame);
            Ok(())
        },
        &AbortSignal::new(),
    )
    .expect("export succeeds");
    assert_eq!(outcome, RenderOutcome::Completed { frames: frames.len() as u64 });
    frames
}

#[test]
fn test_recording_logs_pulses_and_cancellation_in_order() {
    let recording = record_session();
    assert_eq!(recording.pulse_count(), 3);
    assert_eq!(recording.events.len(), 4);
    assert!(recording.events.windows(2).all(|w| w[0].timestamp_ms <= w[1].timestamp_ms));
    assert!(recording.total_duration_ms >= recording.events[3].timestamp_ms);
}

#[test]
fn test_two_replays_are_identical() {
    let recording = record_session();
    let first = export(&recording, 30.0);
    let second = export(&recording, 30.0);

    assert_eq!(first.len(), second.len());
    assert!(!first.is_empty());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.index, b.index);
        assert_eq!(a.timestamp_ms, b.timestamp_ms);
        assert!(a.image == b.image, "frame {} differs", a.index);
    }
}

#[test]
fn test_replay_actually_animates() {
    let recording = record_session();
    let frames = export(&recording, 24.0);
    let first = &frames[0].image;
    assert!(frames.iter().any(|f| &f.image != first));
}

#[test]
fn test_persisted_recording_replays_identically_once_image_is_attached() {
    let recording = record_session();
    let json = recording.to_json().expect("recording serializes");
    let restored = AnimationRecording::from_json(&json)
        .expect("recording parses")
        .with_source(SourceImage::noise(96, 64, 42));

    let original = export(&recording, 20.0);
    let reloaded = export(&restored, 20.0);
    assert_eq!(original.len(), reloaded.len());
    assert!(original.iter().zip(&reloaded).all(|(a, b)| a.image == b.image));
}

#[test]
fn test_export_length_follows_duration_and_rate() {
    let recording = record_session();
    let options = ExportOptions::new(25.0, 40, 40).with_duration(2000.0);
    let mut count = 0;
    let outcome = render_recording(
        &recording,
        &options,
        &mut RasterSurfaceFactory::default(),
        |_| {
            count += 1;
            Ok(())
        },
        &AbortSignal::new(),
    )
    .expect("export succeeds");
    assert_eq!(outcome, RenderOutcome::Completed { frames: 50 });
    assert_eq!(count, 50);
}

#[test]
fn test_oversized_export_surface_is_unavailable() {
    let recording = record_session();
    let options = ExportOptions::new(30.0, 4096, 4096);
    let outcome = render_recording(
        &recording,
        &options,
        &mut RasterSurfaceFactory::with_max_dimension(1024),
        |_| Ok(()),
        &AbortSignal::new(),
    );
    assert!(matches!(
        outcome,
        Err(RenderError::SurfaceUnavailable(SurfaceError::TooLarge { max: 1024, .. }))
    ));
}

#[test]
fn test_state_samples_export_without_simulating() {
    let mut engine = Engine::new(64, 64);
    engine.start_state_recording(30.0);
    engine.enqueue_pulse(ForcePulse::burst(Vec2::splat(0.5), 1.0));
    for _ in 0..60 {
        engine.tick(1000.0 / 60.0);
    }
    engine.stop_state_recording();
    let samples = engine.take_recorded_frames();
    assert!(samples.len() >= 29);

    let mut frames = 0;
    let outcome = render_sampled_frames(
        &samples,
        engine.canvas(),
        ipre::image::Rgba(engine.settings().render.background),
        &ExportOptions::new(60.0, 32, 32),
        &mut RasterSurfaceFactory::default(),
        |_| {
            frames += 1;
            Ok(())
        },
        &AbortSignal::new(),
    )
    .expect("preview export succeeds");
    assert_eq!(outcome, RenderOutcome::Completed { frames });
}

#[test]
fn test_cancel_inside_a_frame_takes_effect_at_its_timestamp() {
    let mut settings = Settings::default();
    settings.generation.mode = AnimationMode::TileGrid;
    settings.generation.grid_size = 8;
    let mut live = Engine::new(80, 80).with_settings(settings);

    live.begin_input_recording();
    let push = live.enqueue_pulse(ForcePulse::push(0.0).with_strength(30.0).continuous());
    live.tick(50.0);
    live.cancel_continuous(push);
    live.tick(50.0);
    let recording = live.end_input_recording().expect("recording was started");

    // one output frame spans both the push and its cancellation
    let mut session =
        ReplaySession::new(&recording, &ExportOptions::new(10.0, 40, 40), &mut RasterSurfaceFactory::default())
            .expect("session starts");
    session.next_frame().expect("initial frame");
    session.next_frame().expect("frame at 100 ms");

    let replayed = session.engine();
    assert!((replayed.time_ms() - live.time_ms()).abs() < 1e-3);
    assert!(live.store().max_displacement() > 0.0);
    for (a, b) in live.particles().iter().zip(replayed.particles()) {
        assert!(a.position.distance(b.position) < 1e-3, "{} vs {}", a.position, b.position);
        assert!(a.velocity.distance(b.velocity) < 1e-3);
    }
}
