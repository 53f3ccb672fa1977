//! Ripples - offline renderer for the perpetually excited wave field.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p ringkernel-ripples --bin ripples -- --config ripples.toml
//! RIPPLES_SIMULATION__WAVE_SPEED=0.3 cargo run -p ringkernel-ripples --bin ripples
//! ```

use clap::Parser;
use ringkernel_ripples::{FramePipeline, RipplesConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "ripples")]
#[command(author, version, about = "Render a perpetually excited 2D wave field to PNG frames")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Frames to simulate
    #[arg(short, long)]
    frames: Option<u64>,

    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Save every Nth frame
    #[arg(long)]
    every: Option<u64>,

    /// Field width in cells
    #[arg(long)]
    width: Option<u32>,

    /// Field height in cells
    #[arg(long)]
    height: Option<u32>,

    /// Scheduler RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Simulate without writing any files
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ringkernel_ripples=info".parse().unwrap()),
        )
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> ringkernel_ripples::Result<()> {
    let mut config = match &cli.config {
        Some(path) => RipplesConfig::load(path)?,
        None => RipplesConfig::from_env()?,
    };

    if let Some(frames) = cli.frames {
        config.output.frames = frames;
    }
    if let Some(dir) = cli.output {
        config.output.directory = dir;
    }
    if let Some(every) = cli.every {
        config.output.every = every;
    }
    if let Some(width) = cli.width {
        config.output.width = width;
    }
    if let Some(height) = cli.height {
        config.output.height = height;
    }
    if cli.seed.is_some() {
        config.disturbances.seed = cli.seed;
    }
    config.validate()?;

    let output = &config.output;
    if !cli.dry_run {
        std::fs::create_dir_all(&output.directory)?;
    }

    let mut pipeline = FramePipeline::new(config.pipeline_settings(), config.disturbances.seed);
    pipeline.resize(output.width, output.height);
    if pipeline.field().is_empty() {
        return Err(ringkernel_ripples::RipplesError::allocation(format!(
            "cannot render a {}x{} field",
            output.width, output.height
        )));
    }

    tracing::info!(
        "Rendering {} frames at {}x{} into {}",
        output.frames,
        output.width,
        output.height,
        output.directory.display()
    );

    let frame_time = 1.0 / output.fps;
    let start = Instant::now();
    let mut saved = 0u64;

    for _ in 0..output.frames {
        pipeline.advance(frame_time);
        let Some(frame) = pipeline.render_frame() else {
            continue;
        };
        if cli.dry_run || frame.index % output.every != 0 {
            continue;
        }
        let path = output.directory.join(format!("frame_{:06}.png", frame.index));
        frame.save_png(&path)?;
        saved += 1;
    }

    let stats = pipeline.stats();
    tracing::info!(
        "Done in {:.2}s: {} frames, {} disturbances, {} divergence resets, {} saved",
        start.elapsed().as_secs_f64(),
        stats.frames,
        stats.disturbances,
        stats.divergence_resets,
        saved
    );
    tracing::info!(
        "Final energy {:.4}, peak amplitude {:.4}",
        pipeline.field().total_energy(),
        pipeline.field().max_amplitude()
    );

    Ok(())
}
