//! # Live Loop
//!
//! Drives the engine from a [`FrameClock`] the way an interactive host
//! would: real frame times, a scripted sequence of pulses, adaptive
//! performance on, and both recorders running.
//!
//! At the end the state samples are exported as a preview and the input
//! recording is saved as JSON next to it.
//!
//! Run with: `cargo run --example live_loop`

use ipre::prelude::*;
use std::time::Duration;

const FRAMES: u64 = 240;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = Settings::default();
    settings.generation.particle_density = 3000;
    settings.healing.enabled = true;
    settings.forces.turbulence.enabled = true;

    let mut engine = Engine::new(480, 360)
        .with_settings(settings)
        .with_image(SourceImage::gradient(320, 240, [20, 40, 120, 255], [250, 200, 80, 255]), Some("gradient"));
    let mut clock = FrameClock::new();
    let mut swirl = None;

    engine.start_state_recording(30.0);
    engine.begin_input_recording();

    while clock.frame() < FRAMES {
        std::thread::sleep(Duration::from_millis(16));
        let dt = clock.update();

        match clock.frame() {
            20 => {
                engine.enqueue_pulse(ForcePulse::push(0.0).with_strength(25.0).with_duration(600.0));
            }
            80 => {
                swirl = Some(engine.enqueue_pulse(ForcePulse::new(PulseKind::Swirl(RadialParams::default())).continuous()));
            }
            140 => {
                if let Some(id) = swirl.take() {
                    engine.cancel_continuous(id);
                }
            }
            180 => {
                let json = r#"{"kind":"burst","origin":[0.25,0.75],"radius":0.6,"strength":35.0}"#;
                if engine.enqueue_pulse_json(json).is_none() {
                    println!("burst json rejected");
                }
            }
            _ => {}
        }

        engine.tick(dt);
        engine.observe_frame_time(clock.raw_delta_ms());
        if clock.frame() % 60 == 0 {
            println!(
                "frame {:>3}  fps {:>5.1}  visible {:>4.0}%  pulses {}",
                clock.frame(),
                clock.fps(),
                engine.visible_fraction() * 100.0,
                engine.pulses().len()
            );
        }
    }

    engine.stop_state_recording();
    let samples = engine.take_recorded_frames();
    let Some(recording) = engine.end_input_recording() else {
        return Err("input recording was not running".into());
    };

    std::fs::write("live_loop.json", recording.to_json()?)?;
    println!("saved {} events over {:.0} ms", recording.events.len(), recording.total_duration_ms);

    let mut written = 0;
    let outcome = render_sampled_frames(
        &samples,
        engine.canvas(),
        image::Rgba(engine.settings().render.background),
        &ExportOptions::new(30.0, 240, 180),
        &mut RasterSurfaceFactory::default(),
        |frame| {
            if frame.index == 0 {
                frame.image.save("live_loop_first.png")?;
            }
            written += 1;
            Ok(())
        },
        &AbortSignal::new(),
    )?;
    println!("preview: {outcome:?} ({written} frames from {} samples)", samples.len());
    Ok(())
}
