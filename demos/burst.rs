//! # Burst
//!
//! Splits an image into a tile grid, hits it with one radial burst and
//! writes the replayed animation as PNG frames.
//!
//! Run with: `cargo run --example burst [image] [out_dir]`
//!
//! Without an image a checkerboard is used. Frames land in `burst_frames/`
//! by default.

use ipre::prelude::*;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let image_path = args.next();
    let out_dir = PathBuf::from(args.next().unwrap_or_else(|| "burst_frames".into()));

    let (source, label) = match &image_path {
        Some(path) => (SourceImage::new(image::open(path)?.to_rgba8()), path.as_str()),
        None => (SourceImage::checkerboard(256, 32, [235, 120, 40, 255], [30, 60, 190, 255]), "checkerboard"),
    };

    let mut settings = Settings::default();
    settings.generation.mode = AnimationMode::TileGrid;
    settings.generation.grid_size = 16;
    settings.collisions.enabled = true;

    let mut engine = Engine::new(640, 480).with_settings(settings).with_image(source, Some(label));
    println!("=== IPRE Burst ===");
    println!("Source: {label}");
    println!("Particles: {}", engine.particles().len());

    engine.begin_input_recording();
    engine.enqueue_pulse(
        ForcePulse::burst(Vec2::splat(0.5), 0.8)
            .with_strength(40.0)
            .with_duration(900.0)
            .with_easing(Easing::EaseOut, 0.1, 0.4),
    );
    for _ in 0..180 {
        engine.tick(1000.0 / 60.0);
    }
    let Some(recording) = engine.end_input_recording() else {
        return Err("input recording was not running".into());
    };

    std::fs::create_dir_all(&out_dir)?;
    let options = ExportOptions::new(30.0, 640, 480);
    let outcome = render_recording(
        &recording,
        &options,
        &mut RasterSurfaceFactory::default(),
        |frame| {
            let path = out_dir.join(format!("frame_{:04}.png", frame.index));
            frame.image.save(path)?;
            Ok(())
        },
        &AbortSignal::new(),
    )?;

    println!("{outcome:?} -> {}", out_dir.display());
    Ok(())
}
