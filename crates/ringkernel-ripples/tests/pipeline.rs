//! Integration tests for the frame pipeline.

use ringkernel_ripples::prelude::*;

/// Settings whose scheduler never fires.
fn quiet() -> PipelineSettings {
    PipelineSettings {
        ranges: DisturbanceRanges::fixed(u32::MAX, 0),
        ..PipelineSettings::default()
    }
}

fn run(pipeline: &mut FramePipeline, frames: usize) {
    for _ in 0..frames {
        pipeline.advance(1.0 / 60.0);
        pipeline.render_frame();
    }
}

#[test]
fn test_zero_input_stays_black() {
    let mut pipeline = FramePipeline::new(quiet(), Some(1));
    pipeline.resize(32, 24);

    run(&mut pipeline, 99);
    let frame = pipeline.render_frame().expect("Frame should be presented");

    assert_eq!(frame.index, 99);
    for px in frame.pixels.chunks_exact(4) {
        assert_eq!(px, &[0, 0, 0, 255]);
    }
    assert_eq!(pipeline.field().total_energy(), 0.0);
}

#[test]
fn test_resize_from_empty() {
    let mut pipeline = FramePipeline::new(PipelineSettings::default(), Some(2));

    pipeline.resize(0, 0);
    assert!(pipeline.render_frame().is_none());

    pipeline.resize(20, 10);
    let frame = pipeline.render_frame().expect("Frame should be presented");
    assert_eq!((frame.width, frame.height), (20, 10));
    assert_eq!(frame.pixels.len(), 20 * 10 * 4);
}

#[test]
fn test_resize_discards_energy() {
    let mut pipeline = FramePipeline::new(quiet(), None);
    pipeline.resize(16, 16);
    pipeline.inject(Disturbance::new(8.0, 8.0, 4.0, 1.0));
    run(&mut pipeline, 5);
    assert!(pipeline.field().total_energy() > 0.0);

    pipeline.resize(24, 24);
    assert_eq!(pipeline.field().total_energy(), 0.0);
    assert!(pipeline.field().prev().iter().all(|&h| h == 0.0));
}

#[test]
fn test_fixed_schedule_through_pipeline() {
    let settings = PipelineSettings {
        ranges: DisturbanceRanges::fixed(10, 2),
        ..PipelineSettings::default()
    };
    let mut pipeline = FramePipeline::new(settings, Some(3));
    pipeline.resize(32, 32);

    run(&mut pipeline, 100);

    let stats = pipeline.stats();
    assert_eq!(stats.frames, 100);
    assert_eq!(stats.steps, 100);
    assert_eq!(stats.disturbances, 20);
}

#[test]
fn test_energy_decays_without_input() {
    let settings = PipelineSettings {
        params: SimulationParams::default().with_damper(0.98),
        ..quiet()
    };
    let mut pipeline = FramePipeline::new(settings, None);
    pipeline.resize(48, 48);
    pipeline.inject(Disturbance::new(24.0, 24.0, 6.0, 1.0));
    let initial = pipeline.field().total_energy();
    assert!(initial > 0.0);

    run(&mut pipeline, 500);

    assert!(pipeline.field().total_energy() < initial * 0.01);
    assert_eq!(pipeline.stats().divergence_resets, 0);
}

#[test]
fn test_wall_blocks_propagation() {
    let mut pipeline = FramePipeline::new(quiet(), None);
    pipeline.resize(32, 16);
    for y in 0..16 {
        pipeline.set_obstacle(16, y, true);
    }
    assert!(pipeline.is_blocked(16, 3));
    assert!(!pipeline.is_blocked(15, 3));
    pipeline.inject(Disturbance::new(8.0, 8.0, 3.0, 1.0));

    run(&mut pipeline, 200);

    let field = pipeline.field();
    assert!(field.total_energy() > 0.0);
    for y in 0..16 {
        for x in 16..32 {
            assert_eq!(field.value(x, y), Some(0.0), "({x}, {y}) should stay still");
        }
    }

    pipeline.clear_obstacles();
    assert!(!pipeline.is_blocked(16, 3));
    run(&mut pipeline, 100);
    assert!(pipeline.field().value(24, 8).unwrap().abs() > 0.0);
}

#[test]
fn test_degenerate_cell_size_does_not_spread() {
    let settings = PipelineSettings {
        params: SimulationParams::new(1.0, 0.0, 1.0),
        ..quiet()
    };
    let mut pipeline = FramePipeline::new(settings, None);
    pipeline.resize(32, 32);
    pipeline.inject(Disturbance::new(16.0, 16.0, 3.0, 1.0));

    run(&mut pipeline, 50);

    let field = pipeline.field();
    assert!(field.curr().iter().all(|h| h.is_finite()));
    for y in 0..32 {
        for x in 0..32 {
            let dx = x as f32 - 16.0;
            let dy = y as f32 - 16.0;
            if dx * dx + dy * dy > 9.0 {
                assert_eq!(field.value(x, y), Some(0.0));
            }
        }
    }
}

#[test]
fn test_seeded_runs_are_identical() {
    let render = || {
        let mut pipeline = FramePipeline::new(PipelineSettings::default(), Some(42));
        pipeline.resize(40, 30);
        run(&mut pipeline, 120);
        let frame = pipeline.render_frame().expect("Frame should be presented");
        frame.pixels.to_vec()
    };

    assert_eq!(render(), render());
}

#[test]
fn test_laplacian_variants_agree() {
    let field_after = |laplacian| {
        let settings = PipelineSettings {
            laplacian,
            ..PipelineSettings::default()
        };
        let mut pipeline = FramePipeline::new(settings, Some(5));
        pipeline.resize(24, 24);
        run(&mut pipeline, 150);
        pipeline.field().curr().to_vec()
    };

    let stencil = field_after(LaplacianSource::Stencil);
    let convolution = field_after(LaplacianSource::Convolution);
    for (a, b) in stencil.iter().zip(&convolution) {
        assert!((a - b).abs() < 1e-4, "{a} vs {b}");
    }
}

#[test]
fn test_config_drives_pipeline() {
    let config = RipplesConfig::load_from_str(
        r#"
        [disturbances]
        cooldown = { min = 4, max = 4 }
        density = { min = 1, max = 1 }

        [render]
        strategy = "blurred_highlights"
        "#,
    )
    .unwrap();
    config.validate().unwrap();

    let mut pipeline = FramePipeline::new(config.pipeline_settings(), Some(8));
    pipeline.resize(16, 16);
    run(&mut pipeline, 40);

    assert_eq!(pipeline.stats().disturbances, 10);
    assert_eq!(pipeline.descriptor().bloom, BloomStrategy::BlurredHighlights);
}

#[test]
fn test_strong_disturbance_survives() {
    let config = RipplesConfig::load_from_str(
        r#"
        [disturbances]
        strength = { min = 100, max = 100 }
        "#,
    )
    .unwrap();
    config.validate().unwrap();

    let mut pipeline = FramePipeline::new(config.pipeline_settings(), Some(4));
    pipeline.resize(64, 64);
    pipeline.inject(Disturbance::new(32.0, 32.0, 6.0, 100.0));
    let before = pipeline.field().total_energy();

    pipeline.render_frame().expect("Frame should be presented");

    assert_eq!(pipeline.stats().divergence_resets, 0);
    assert!(pipeline.field().total_energy() > before * 0.5);
}

#[test]
fn test_save_png() {
    let dir = std::env::temp_dir().join(format!("ripples-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("frame.png");

    let mut pipeline = FramePipeline::new(PipelineSettings::default(), Some(9));
    pipeline.resize(12, 8);
    pipeline.inject(Disturbance::new(6.0, 4.0, 3.0, 1.0));
    let frame = pipeline.render_frame().unwrap();
    frame.save_png(&path).unwrap();

    let img = image::open(&path).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (12, 8));
    assert_eq!(img.as_raw().as_slice(), frame.pixels);

    std::fs::remove_dir_all(&dir).unwrap();
}
