use std::error::Error;
use std::time::Instant;

use tracing_subscriber::EnvFilter;

use tinsel::error::ConfigError;
use tinsel::render_io::write_png;
use tinsel::scenes::{build_preset, PRESETS};
use tinsel::{create_renderer, RenderConfig, RenderOptions, RenderSession};

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let config = match RenderConfig::from_args(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            eprintln!("Usage: tinsel [scene] [-spp=N] [-width=N] [-height=N] [-maxdepth=N] [-exposure=X]");
            eprintln!("              [-seed=N] [-clamp=X] [-backend=cpu|gpu] [-mode=pathtrace|normals|complexity]");
            eprintln!("              [-filter=gaussian|box] [-accel=bvh|linear] [-out=FILE]");
            eprintln!("scenes: {}", PRESETS.join(", "));
            return Err(e.into());
        }
    };

    let preset = build_preset(&config.scene).ok_or_else(|| ConfigError::UnknownScene(config.scene.clone()))?;
    let renderer = create_renderer(config.backend, preset.scene.snapshot(), config.bvh)?;
    let mut session = RenderSession::new(renderer, preset.camera, config.width, config.height)?;

    let start = Instant::now();
    let frame_options = RenderOptions { samples_per_pixel: config.samples_per_frame.max(1), ..config.options };
    loop {
        let remaining = config.max_samples.saturating_sub(session.sample_count());
        let options = RenderOptions {
            samples_per_pixel: frame_options.samples_per_pixel.min(remaining.max(1)),
            ..frame_options
        };
        session.render(&options)?;

        let samples = session.sample_count();
        let elapsed = start.elapsed().as_secs_f64();
        tracing::info!(samples, max = config.max_samples, elapsed_s = elapsed, "frame done");
        if samples >= config.max_samples || options.mode.overwrites() {
            break;
        }
    }

    write_png(&config.output, session.width(), session.height(), &session.resolve(), config.exposure)?;
    Ok(())
}
