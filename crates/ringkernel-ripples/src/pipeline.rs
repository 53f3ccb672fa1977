//! Per-frame orchestration of the simulation and compositing stages.
//!
//! ## Frame layout
//!
//! ```text
//! Inject ──> Step ──> Composite ──> Rotate
//!  curr      prev,curr   curr        prev <- curr
//!  (rw)      -> next     (+bloom)    curr <- next
//! ```
//!
//! Stages run strictly in order and each finishes before the next starts.
//! Both the base color and the bloom read `curr` after injection and before
//! rotation, so they show the same generation; the step only writes `next`.

use crate::render::{BloomParams, BloomStrategy, Compositor, RenderFrame, MAX_BLOOM_RADIUS};
use crate::simulation::{
    Disturbance, DisturbanceRanges, DisturbanceScheduler, LaplacianSource, SimulationParams,
    Stepper, WaveField,
};

/// One stage of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Scheduler tick; may add pulses to `curr`.
    Inject,
    /// Laplacian + leapfrog update into `next`, then the divergence check.
    Step,
    /// Highlight extraction, blur, color map and tone map of `curr`.
    Composite,
    /// `prev <- curr`, `curr <- next`.
    Rotate,
}

/// A generation buffer a stage binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
    Prev,
    Curr,
    Next,
}

impl Stage {
    /// Buffers read by the stage.
    pub fn reads(self) -> &'static [Generation] {
        match self {
            Stage::Inject => &[Generation::Curr],
            Stage::Step => &[Generation::Prev, Generation::Curr],
            Stage::Composite => &[Generation::Curr],
            Stage::Rotate => &[],
        }
    }

    /// Buffers written by the stage.
    pub fn writes(self) -> &'static [Generation] {
        match self {
            Stage::Inject => &[Generation::Curr],
            Stage::Step => &[Generation::Next],
            Stage::Composite => &[],
            Stage::Rotate => &[Generation::Prev, Generation::Curr, Generation::Next],
        }
    }
}

/// Canonical stage order.
pub const STAGES: [Stage; 4] = [Stage::Inject, Stage::Step, Stage::Composite, Stage::Rotate];

/// The selectable variants of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineDescriptor {
    pub laplacian: LaplacianSource,
    pub bloom: BloomStrategy,
    pub stages: &'static [Stage],
}

/// Everything the host pushes through `configure`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    pub params: SimulationParams,
    pub ranges: DisturbanceRanges,
    pub laplacian: LaplacianSource,
    pub bloom: BloomParams,
    /// Clamp the Laplacian multiplier to the 2D stability limit.
    pub clamp_courant: bool,
    /// Per-step peak growth factor that counts towards divergence.
    pub divergence_growth: f32,
}

/// Default per-step peak growth treated as runaway.
pub const DEFAULT_DIVERGENCE_GROWTH: f32 = 1.5;

/// Consecutive runaway steps before the field is reset.
///
/// A stable kick grows its peak by at most 2x, then 1.5x, then less, so
/// only unstable parameters sustain this streak.
pub const DIVERGENCE_STREAK: u32 = 8;

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            params: SimulationParams::default(),
            ranges: DisturbanceRanges::default(),
            laplacian: LaplacianSource::default(),
            bloom: BloomParams::default(),
            clamp_courant: true,
            divergence_growth: DEFAULT_DIVERGENCE_GROWTH,
        }
    }
}

/// Running counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Frames run (presented or not).
    pub frames: u64,
    /// Simulation steps taken.
    pub steps: u64,
    /// Disturbances injected by the scheduler.
    pub disturbances: u64,
    /// Times the field was reset after diverging.
    pub divergence_resets: u64,
}

/// Owns the field and runs one frame per `render_frame` call.
///
/// The host serializes calls; nothing here is shared across threads.
pub struct FramePipeline {
    field: WaveField,
    stepper: Stepper,
    scheduler: DisturbanceScheduler,
    compositor: Compositor,
    settings: PipelineSettings,
    /// Laplacian multiplier after the stability policy.
    multiplier: f32,
    damper: f32,
    elapsed: f64,
    paused: bool,
    frame_index: u64,
    stats: PipelineStats,
    /// Peak of the previous step's output.
    last_peak: f32,
    /// Consecutive steps whose peak grew by `divergence_growth` or more.
    growth_streak: u32,
}

impl FramePipeline {
    /// Create a pipeline with an empty field. Call [`resize`](Self::resize)
    /// before rendering.
    pub fn new(settings: PipelineSettings, seed: Option<u64>) -> Self {
        let mut pipeline = Self {
            field: WaveField::default(),
            stepper: Stepper::new(settings.laplacian),
            scheduler: DisturbanceScheduler::new(settings.ranges, seed),
            compositor: Compositor::new(settings.bloom),
            settings,
            multiplier: 0.0,
            damper: 1.0,
            elapsed: 0.0,
            paused: false,
            frame_index: 0,
            stats: PipelineStats::default(),
            last_peak: 0.0,
            growth_streak: 0,
        };
        pipeline.configure(settings);
        pipeline
    }

    /// Reallocate the field for a new surface size, discarding all energy.
    ///
    /// Allocation failure leaves an empty field; frames are then skipped.
    pub fn resize(&mut self, width: u32, height: u32) {
        match self.field.resize(width, height) {
            Ok(()) => tracing::debug!("Resized wave field to {}x{}", width, height),
            Err(e) => tracing::error!("Failed to resize wave field to {}x{}: {}", width, height, e),
        }
        self.frame_index = 0;
        self.clear_growth();
    }

    /// Apply new settings; they take effect on the next frame.
    pub fn configure(&mut self, settings: PipelineSettings) {
        let settings = sanitize(settings);

        self.stepper.set_source(settings.laplacian);
        self.compositor.set_bloom_params(settings.bloom);
        if settings.ranges != *self.scheduler.ranges() {
            self.scheduler.set_ranges(settings.ranges);
        }

        let params = settings.params;
        self.multiplier = params.effective_multiplier(settings.clamp_courant);
        self.damper = params.effective_damper();

        if !params.is_stable() {
            if settings.clamp_courant {
                tracing::warn!(
                    "Courant number {:.3} exceeds the 2D limit; clamping multiplier to {}",
                    params.courant_number(),
                    self.multiplier
                );
            } else {
                tracing::warn!(
                    "Courant number {:.3} exceeds the 2D limit; field may diverge",
                    params.courant_number()
                );
            }
        }

        tracing::debug!(
            multiplier = self.multiplier,
            damper = self.damper,
            laplacian = %settings.laplacian,
            bloom = %settings.bloom.strategy,
            "Configured pipeline"
        );
        self.settings = settings;
    }

    /// Accumulate host frame time. Ignored while paused.
    pub fn advance(&mut self, delta_seconds: f64) {
        if self.paused || !delta_seconds.is_finite() || delta_seconds <= 0.0 {
            return;
        }
        self.elapsed += delta_seconds;
    }

    /// Run one full frame and return the composited image.
    ///
    /// Returns `None` (no visual update) when paused, when the field is
    /// empty, or when the pixel buffer is unavailable. In the last case the
    /// simulation still advances.
    pub fn render_frame(&mut self) -> Option<RenderFrame<'_>> {
        if self.paused || self.field.is_empty() {
            return None;
        }

        let width = self.field.width() as usize;
        let height = self.field.height() as usize;
        let mut presented = true;

        for stage in STAGES {
            match stage {
                Stage::Inject => {
                    let injected = self.scheduler.tick_and_apply(&mut self.field);
                    self.stats.disturbances += injected as u64;
                }
                Stage::Step => {
                    self.stepper.step(&mut self.field, self.multiplier, self.damper);
                    self.stats.steps += 1;
                    self.guard_divergence();
                }
                Stage::Composite => {
                    presented = self
                        .compositor
                        .composite(self.field.curr(), width, height)
                        .is_some();
                }
                Stage::Rotate => self.field.rotate(),
            }
        }

        let index = self.frame_index;
        self.frame_index += 1;
        self.stats.frames += 1;

        if !presented {
            return None;
        }

        Some(RenderFrame {
            width: width as u32,
            height: height as u32,
            elapsed: self.elapsed,
            index,
            pixels: self.compositor.pixels(),
        })
    }

    /// Zero the field if the freshly stepped generation is non-finite or
    /// has grown geometrically for [`DIVERGENCE_STREAK`] steps.
    ///
    /// Amplitude alone never triggers a reset; disturbances are unclamped.
    fn guard_divergence(&mut self) {
        let peak = WaveField::peak(self.field.next());
        if peak.is_finite() {
            if peak > 0.0 && peak >= self.last_peak * self.settings.divergence_growth {
                self.growth_streak += 1;
            } else {
                self.growth_streak = 0;
            }
            self.last_peak = peak;
            if self.growth_streak < DIVERGENCE_STREAK {
                return;
            }
        }
        tracing::warn!(
            "Wave field diverged (peak {}); resetting after {} steps",
            peak,
            self.stats.steps
        );
        self.field.reset();
        self.clear_growth();
        self.stats.divergence_resets += 1;
    }

    fn clear_growth(&mut self) {
        self.last_peak = 0.0;
        self.growth_streak = 0;
    }

    /// Stop dispatching frames.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume dispatching frames.
    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Apply a disturbance to the current generation right away.
    ///
    /// Returns the number of cells touched.
    pub fn inject(&mut self, disturbance: Disturbance) -> usize {
        disturbance.apply(&mut self.field)
    }

    /// Block or unblock a cell.
    pub fn set_obstacle(&mut self, x: u32, y: u32, blocked: bool) {
        self.field.set_obstacle(x, y, blocked);
    }

    /// True for blocked cells. Out-of-range coordinates read as unblocked.
    pub fn is_blocked(&self, x: u32, y: u32) -> bool {
        x < self.field.width() && y < self.field.height() && !self.field.is_active(x, y)
    }

    /// Remove all obstacles.
    pub fn clear_obstacles(&mut self) {
        self.field.clear_obstacles();
    }

    /// Zero the field, keeping its size and obstacles.
    pub fn reset(&mut self) {
        self.field.reset();
        self.clear_growth();
    }

    pub fn field(&self) -> &WaveField {
        &self.field
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Accumulated host time in seconds.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Laplacian multiplier in effect after the stability policy.
    pub fn effective_multiplier(&self) -> f32 {
        self.multiplier
    }

    pub fn descriptor(&self) -> PipelineDescriptor {
        PipelineDescriptor {
            laplacian: self.stepper.source(),
            bloom: self.compositor.bloom_params().strategy,
            stages: &STAGES,
        }
    }
}

/// Replace values the core cannot work with.
fn sanitize(mut settings: PipelineSettings) -> PipelineSettings {
    let defaults = DisturbanceRanges::default();
    let ranges = &mut settings.ranges;
    if !ranges.radius.is_finite() || ranges.radius.min.min(ranges.radius.max) <= 0.0 {
        tracing::warn!("Invalid disturbance radius {:?}; using defaults", ranges.radius);
        ranges.radius = defaults.radius;
    }
    if !ranges.strength.is_finite() {
        tracing::warn!("Invalid disturbance strength {:?}; using defaults", ranges.strength);
        ranges.strength = defaults.strength;
    }
    settings.ranges = settings.ranges.ordered();

    if settings.bloom.radius > MAX_BLOOM_RADIUS {
        tracing::warn!(
            "Bloom radius {} exceeds {}; clamping",
            settings.bloom.radius,
            MAX_BLOOM_RADIUS
        );
        settings.bloom.radius = MAX_BLOOM_RADIUS;
    }

    if !settings.divergence_growth.is_finite() || settings.divergence_growth <= 1.0 {
        settings.divergence_growth = DEFAULT_DIVERGENCE_GROWTH;
    }
    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_settings() -> PipelineSettings {
        PipelineSettings {
            ranges: DisturbanceRanges::fixed(u32::MAX, 0),
            ..PipelineSettings::default()
        }
    }

    #[test]
    fn test_stage_bindings() {
        // Compositing never reads the generation being stepped into.
        assert!(Stage::Step.writes().iter().all(|g| !Stage::Composite.reads().contains(g)));
        assert_eq!(STAGES.first(), Some(&Stage::Inject));
        assert_eq!(STAGES.last(), Some(&Stage::Rotate));
    }

    #[test]
    fn test_render_before_resize_is_skipped() {
        let mut pipeline = FramePipeline::new(PipelineSettings::default(), Some(1));
        assert!(pipeline.render_frame().is_none());
        assert_eq!(pipeline.stats().frames, 0);
    }

    #[test]
    fn test_frame_dimensions_and_time() {
        let mut pipeline = FramePipeline::new(PipelineSettings::default(), Some(1));
        pipeline.resize(16, 8);
        pipeline.advance(0.25);
        pipeline.advance(f64::NAN);
        pipeline.advance(-1.0);

        let frame = pipeline.render_frame().unwrap();
        assert_eq!((frame.width, frame.height), (16, 8));
        assert_eq!(frame.pixels.len(), 16 * 8 * 4);
        assert_eq!(frame.elapsed, 0.25);
        assert_eq!(frame.index, 0);
    }

    #[test]
    fn test_pause_produces_no_update() {
        let mut pipeline = FramePipeline::new(quiet_settings(), Some(1));
        pipeline.resize(8, 8);
        pipeline.inject(Disturbance::new(4.0, 4.0, 2.0, 1.0));
        let before = pipeline.field().curr().to_vec();

        pipeline.pause();
        pipeline.advance(1.0);
        assert!(pipeline.render_frame().is_none());
        assert_eq!(pipeline.field().curr(), &before[..]);
        assert_eq!(pipeline.elapsed(), 0.0);

        pipeline.resume();
        assert!(pipeline.render_frame().is_some());
        assert_ne!(pipeline.field().curr(), &before[..]);
    }

    #[test]
    fn test_unstable_params_clamped() {
        let settings = PipelineSettings {
            params: SimulationParams::new(2.0, 1.0, 1.0),
            ..quiet_settings()
        };
        let pipeline = FramePipeline::new(settings, None);
        assert_eq!(pipeline.effective_multiplier(), crate::simulation::MAX_STABLE_MULTIPLIER);
    }

    #[test]
    fn test_divergence_resets_field() {
        let settings = PipelineSettings {
            params: SimulationParams::new(3.0, 1.0, 1.0).with_damper(1.0),
            clamp_courant: false,
            ..quiet_settings()
        };
        let mut pipeline = FramePipeline::new(settings, None);
        pipeline.resize(16, 16);
        pipeline.inject(Disturbance::new(8.0, 8.0, 3.0, 1.0));

        for _ in 0..200 {
            pipeline.render_frame();
        }

        assert_eq!(pipeline.stats().divergence_resets, 1);
        assert_eq!(pipeline.field().max_amplitude(), 0.0);
        assert!(pipeline.field().curr().iter().all(|h| h.is_finite()));
    }

    #[test]
    fn test_strong_disturbance_is_not_divergence() {
        let mut pipeline = FramePipeline::new(quiet_settings(), None);
        pipeline.resize(64, 64);
        pipeline.inject(Disturbance::new(32.0, 32.0, 6.0, 100.0));
        let before = pipeline.field().total_energy();

        for _ in 0..300 {
            pipeline.render_frame();
        }

        assert_eq!(pipeline.stats().divergence_resets, 0);
        let after = pipeline.field().total_energy();
        assert!(after > 0.0 && after < before * 100.0, "before={before}, after={after}");
    }

    #[test]
    fn test_non_finite_field_is_reset() {
        let mut pipeline = FramePipeline::new(quiet_settings(), None);
        pipeline.resize(8, 8);
        pipeline.inject(Disturbance::new(4.0, 4.0, 2.0, f32::MAX));

        pipeline.render_frame();

        assert_eq!(pipeline.stats().divergence_resets, 1);
        assert_eq!(pipeline.field().total_energy(), 0.0);
    }

    #[test]
    fn test_configure_switches_variants() {
        let mut pipeline = FramePipeline::new(quiet_settings(), None);
        let mut settings = quiet_settings();
        settings.laplacian = LaplacianSource::Convolution;
        settings.bloom.strategy = BloomStrategy::BlurredHighlights;

        pipeline.configure(settings);

        let descriptor = pipeline.descriptor();
        assert_eq!(descriptor.laplacian, LaplacianSource::Convolution);
        assert_eq!(descriptor.bloom, BloomStrategy::BlurredHighlights);
        assert_eq!(descriptor.stages, &STAGES);
    }

    #[test]
    fn test_sanitize_invalid_ranges() {
        let mut settings = quiet_settings();
        settings.ranges.radius = crate::simulation::Bounds::new(f32::NAN, 2.0);
        settings.ranges.density = crate::simulation::Bounds::new(5, 1);
        settings.divergence_growth = 0.5;
        settings.bloom.radius = u32::MAX;

        let pipeline = FramePipeline::new(settings, Some(3));

        let applied = pipeline.settings();
        assert_eq!(applied.ranges.radius, DisturbanceRanges::default().radius);
        assert_eq!(applied.ranges.density, crate::simulation::Bounds::new(1, 5));
        assert_eq!(applied.divergence_growth, DEFAULT_DIVERGENCE_GROWTH);
        assert_eq!(applied.bloom.radius, MAX_BLOOM_RADIUS);
    }
}
