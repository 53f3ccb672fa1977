//! Performance benchmark for Ripples.
//!
//! Run with: cargo run -p ringkernel-ripples --bin benchmark --release

use ringkernel_ripples::render::Compositor;
use ringkernel_ripples::simulation::{Disturbance, Stepper, WaveField};
use ringkernel_ripples::{
    BloomParams, BloomStrategy, FramePipeline, LaplacianSource, PipelineSettings, SimulationParams,
};
use std::time::Instant;

fn main() {
    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║              RingKernel Ripples Performance Evaluation           ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();

    // =========================================================================
    // Part 1: Stepper throughput
    // =========================================================================
    println!("═══════════════════════════════════════════════════════════════════");
    println!("PART 1: Wave Step Throughput (500 steps)");
    println!("═══════════════════════════════════════════════════════════════════");
    println!();

    println!(
        "{:<12} {:<12} {:>12} {:>12} {:>15}",
        "Grid Size", "Laplacian", "Total (ms)", "Steps/sec", "Cells*Steps/sec"
    );
    println!("{}", "-".repeat(67));

    let params = SimulationParams::default();
    for &size in &[64u32, 128, 256, 512, 1024] {
        for source in [LaplacianSource::Stencil, LaplacianSource::Convolution] {
            let Ok(mut field) = WaveField::new(size, size) else {
                println!("{:<12} {:<12} {:>12}", format!("{}x{}", size, size), source, "ALLOC");
                continue;
            };
            Disturbance::new(size as f32 / 2.0, size as f32 / 2.0, 6.0, 1.0).apply(&mut field);
            let mut stepper = Stepper::new(source);

            let steps = 500u32;
            let start = Instant::now();
            for _ in 0..steps {
                stepper.step(&mut field, params.laplacian_multiplier(), params.damper);
                field.rotate();
            }
            let elapsed = start.elapsed();

            let cells = size as f64 * size as f64;
            println!(
                "{:<12} {:<12} {:>12.1} {:>12.0} {:>15.0}",
                format!("{}x{}", size, size),
                source,
                elapsed.as_secs_f64() * 1000.0,
                steps as f64 / elapsed.as_secs_f64(),
                cells * steps as f64 / elapsed.as_secs_f64()
            );
        }
    }
    println!();

    // =========================================================================
    // Part 2: Compositing cost
    // =========================================================================
    println!("═══════════════════════════════════════════════════════════════════");
    println!("PART 2: Compositing Cost per Bloom Strategy (100 frames)");
    println!("═══════════════════════════════════════════════════════════════════");
    println!();

    println!("{:<12} {:<20} {:>12} {:>12}", "Grid Size", "Bloom", "ms/frame", "Max FPS");
    println!("{}", "-".repeat(59));

    for &size in &[128usize, 256, 512, 1024] {
        let heights: Vec<f32> = (0..size * size)
            .map(|i| ((i % size) as f32 * 0.1).sin() * ((i / size) as f32 * 0.07).cos())
            .collect();

        for strategy in [BloomStrategy::CrossSample, BloomStrategy::BlurredHighlights] {
            let mut compositor = Compositor::new(BloomParams {
                strategy,
                ..BloomParams::default()
            });

            let frames = 100u32;
            let start = Instant::now();
            for _ in 0..frames {
                compositor.composite(&heights, size, size);
            }
            let per_frame = start.elapsed().as_secs_f64() / frames as f64;

            println!(
                "{:<12} {:<20} {:>12.3} {:>12.1}",
                format!("{}x{}", size, size),
                strategy,
                per_frame * 1000.0,
                1.0 / per_frame
            );
        }
    }
    println!();

    // =========================================================================
    // Part 3: Full frames
    // =========================================================================
    println!("═══════════════════════════════════════════════════════════════════");
    println!("PART 3: Full Pipeline Frames (300 frames)");
    println!("═══════════════════════════════════════════════════════════════════");
    println!();

    println!(
        "{:<12} {:>12} {:>12} {:>14} {:>10}",
        "Grid Size", "ms/frame", "Est. FPS", "Disturbances", "Status"
    );
    println!("{}", "-".repeat(64));

    for &size in &[128u32, 256, 512, 1024] {
        let mut pipeline = FramePipeline::new(PipelineSettings::default(), Some(7));
        pipeline.resize(size, size);

        let frames = 300u32;
        let start = Instant::now();
        for _ in 0..frames {
            pipeline.advance(1.0 / 60.0);
            pipeline.render_frame();
        }
        let per_frame = start.elapsed().as_secs_f64() / frames as f64;
        let fps = 1.0 / per_frame;

        let status = if fps >= 60.0 {
            "Excellent"
        } else if fps >= 30.0 {
            "Good"
        } else if fps >= 10.0 {
            "Acceptable"
        } else {
            "Too slow"
        };

        println!(
            "{:<12} {:>12.3} {:>12.1} {:>14} {:>10}",
            format!("{}x{}", size, size),
            per_frame * 1000.0,
            fps,
            pipeline.stats().disturbances,
            status
        );
    }
    println!();

    // =========================================================================
    // Part 4: Memory
    // =========================================================================
    println!("═══════════════════════════════════════════════════════════════════");
    println!("PART 4: Memory Usage Estimates");
    println!("═══════════════════════════════════════════════════════════════════");
    println!();

    // Three f32 generations, an f32 Laplacian scratch, two f32 bloom
    // buffers and RGBA8 output.
    let bytes_per_cell = 3 * 4 + 4 + 2 * 4 + 4;

    println!("{:<12} {:>12} {:>15}", "Grid Size", "Cells", "Est. Memory");
    println!("{}", "-".repeat(42));

    for &size in &[128u64, 256, 512, 1024, 2048] {
        let cells = size * size;
        let mem_bytes = cells * bytes_per_cell;
        let mem_str = if mem_bytes < 1024 * 1024 {
            format!("{:.1} KB", mem_bytes as f64 / 1024.0)
        } else {
            format!("{:.1} MB", mem_bytes as f64 / (1024.0 * 1024.0))
        };
        println!("{:<12} {:>12} {:>15}", format!("{}x{}", size, size), cells, mem_str);
    }
    println!();
}
