//! Random disturbance injection that keeps the field perpetually excited.
//!
//! Timing is counted in simulation frames, not wall-clock seconds, so the
//! injection rate scales with the frame rate.

use super::field::WaveField;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Upper bound on disturbances synthesized per firing.
///
/// The scheduler's scratch buffer is allocated once at this capacity.
pub const MAX_BATCH: usize = 64;

/// Closed range `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds<T> {
    pub min: T,
    pub max: T,
}

impl<T: PartialOrd + Copy> Bounds<T> {
    /// Create a range.
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    /// A degenerate range holding a single value.
    pub fn fixed(value: T) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// True when `min <= max`.
    pub fn is_ordered(&self) -> bool {
        self.min <= self.max
    }

    /// The same range with `min` and `max` swapped if needed.
    pub fn ordered(self) -> Self {
        if self.is_ordered() {
            self
        } else {
            Self {
                min: self.max,
                max: self.min,
            }
        }
    }
}

impl Bounds<u32> {
    /// Draw uniformly from `[min, max]`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        let b = self.ordered();
        rng.gen_range(b.min..=b.max)
    }
}

impl Bounds<f32> {
    /// Draw uniformly from `[min, max]`.
    ///
    /// Interpolates in f64 so ranges wider than `f32::MAX` still sample.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        let b = self.ordered();
        if b.min == b.max {
            return b.min;
        }
        let (min, max) = (b.min as f64, b.max as f64);
        let t: f64 = rng.gen();
        ((min + (max - min) * t) as f32).max(b.min).min(b.max)
    }

    /// True when both ends are finite.
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }
}

/// One localized raised-cosine energy injection.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Disturbance {
    /// Column of the center, in grid units.
    pub x: f32,
    /// Row of the center, in grid units.
    pub y: f32,
    /// Support radius (> 0).
    pub radius: f32,
    /// Signed peak height added at the center.
    pub strength: f32,
}

impl Disturbance {
    pub fn new(x: f32, y: f32, radius: f32, strength: f32) -> Self {
        Self {
            x,
            y,
            radius,
            strength,
        }
    }

    /// Height added at distance `dist` from the center.
    ///
    /// Equals `strength` at the center and falls smoothly to zero at `radius`.
    #[inline]
    pub fn pulse(&self, dist: f32) -> f32 {
        if dist > self.radius {
            return 0.0;
        }
        self.strength * 0.5 * ((dist / self.radius * std::f32::consts::PI).cos() + 1.0)
    }

    /// Add the pulse to the current generation of `field`.
    ///
    /// Blocked cells are skipped. Returns the number of cells touched.
    pub fn apply(&self, field: &mut WaveField) -> usize {
        if field.is_empty() || self.radius <= 0.0 || !self.radius.is_finite() {
            return 0;
        }
        if !self.x.is_finite() || !self.y.is_finite() || !self.strength.is_finite() {
            return 0;
        }

        let width = field.width() as i64;
        let height = field.height() as i64;
        let x0 = ((self.x - self.radius).floor() as i64).max(0);
        let x1 = ((self.x + self.radius).ceil() as i64).min(width - 1);
        let y0 = ((self.y - self.radius).floor() as i64).max(0);
        let y1 = ((self.y + self.radius).ceil() as i64).min(height - 1);

        let mut touched = 0;
        for gy in y0..=y1 {
            for gx in x0..=x1 {
                let dx = gx as f32 - self.x;
                let dy = gy as f32 - self.y;
                let dist = (dx * dx + dy * dy).sqrt();
                if dist > self.radius || !field.is_active(gx as u32, gy as u32) {
                    continue;
                }
                let idx = (gy * width + gx) as usize;
                field.curr_mut()[idx] += self.pulse(dist);
                touched += 1;
            }
        }
        touched
    }
}

/// Externally configured sampling ranges for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisturbanceRanges {
    /// Frames to wait between firings.
    pub cooldown: Bounds<u32>,
    /// Disturbances per firing.
    pub density: Bounds<u32>,
    /// Pulse radius in grid units.
    pub radius: Bounds<f32>,
    /// Signed pulse strength.
    pub strength: Bounds<f32>,
}

fn default_cooldown() -> Bounds<u32> {
    Bounds::new(20, 60)
}

fn default_density() -> Bounds<u32> {
    Bounds::new(1, 3)
}

fn default_radius() -> Bounds<f32> {
    Bounds::new(3.0, 8.0)
}

fn default_strength() -> Bounds<f32> {
    Bounds::new(-1.0, 1.0)
}

impl Default for DisturbanceRanges {
    fn default() -> Self {
        Self {
            cooldown: default_cooldown(),
            density: default_density(),
            radius: default_radius(),
            strength: default_strength(),
        }
    }
}

impl DisturbanceRanges {
    /// Fixed cooldown and density; useful for deterministic schedules.
    pub fn fixed(cooldown: u32, density: u32) -> Self {
        Self {
            cooldown: Bounds::fixed(cooldown),
            density: Bounds::fixed(density),
            ..Self::default()
        }
    }

    /// All ranges with `min <= max`.
    pub fn ordered(self) -> Self {
        Self {
            cooldown: self.cooldown.ordered(),
            density: self.density.ordered(),
            radius: self.radius.ordered(),
            strength: self.strength.ordered(),
        }
    }
}

/// Decides once per frame whether and where to inject disturbances.
pub struct DisturbanceScheduler {
    ranges: DisturbanceRanges,
    frame_counter: u32,
    cooldown: u32,
    density: u32,
    rng: StdRng,
    /// Reused every firing; never grows past `MAX_BATCH`.
    scratch: Vec<Disturbance>,
}

impl DisturbanceScheduler {
    /// Create a scheduler. A seed makes the schedule reproducible.
    pub fn new(ranges: DisturbanceRanges, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut scheduler = Self {
            ranges: ranges.ordered(),
            frame_counter: 0,
            cooldown: 0,
            density: 0,
            rng,
            scratch: Vec::with_capacity(MAX_BATCH),
        };
        scheduler.resample();
        scheduler
    }

    /// Replace the ranges and redraw the pending cooldown and density.
    ///
    /// The frame counter is kept, so a shorter cooldown may fire at once.
    pub fn set_ranges(&mut self, ranges: DisturbanceRanges) {
        self.ranges = ranges.ordered();
        self.resample();
    }

    pub fn ranges(&self) -> &DisturbanceRanges {
        &self.ranges
    }

    /// Frames counted since the last firing.
    pub fn frame_counter(&self) -> u32 {
        self.frame_counter
    }

    /// Frames to wait before the next firing.
    pub fn cooldown(&self) -> u32 {
        self.cooldown
    }

    /// Disturbances in the next firing.
    pub fn density(&self) -> u32 {
        self.density
    }

    fn resample(&mut self) {
        self.cooldown = self.ranges.cooldown.sample(&mut self.rng);
        let density = self.ranges.density.sample(&mut self.rng);
        if density as usize > MAX_BATCH {
            tracing::debug!("Clamping disturbance density {} to {}", density, MAX_BATCH);
        }
        self.density = density.min(MAX_BATCH as u32);
    }

    /// Advance one frame and return the disturbances to inject, if any.
    ///
    /// The returned slice borrows the scratch buffer and is overwritten by
    /// the next firing.
    pub fn tick(&mut self, width: u32, height: u32) -> &[Disturbance] {
        self.scratch.clear();

        self.frame_counter = self.frame_counter.saturating_add(1);
        if self.frame_counter < self.cooldown {
            return &self.scratch;
        }
        self.frame_counter = 0;

        if width > 0 && height > 0 {
            for _ in 0..self.density {
                let x = self.rng.gen_range(0..width) as f32;
                let y = self.rng.gen_range(0..height) as f32;
                let radius = self.ranges.radius.sample(&mut self.rng);
                let strength = self.ranges.strength.sample(&mut self.rng);
                self.scratch.push(Disturbance::new(x, y, radius, strength));
            }
        }

        self.resample();
        &self.scratch
    }

    /// Advance one frame and apply any firing directly to `field`.
    ///
    /// Returns the number of disturbances applied.
    pub fn tick_and_apply(&mut self, field: &mut WaveField) -> usize {
        let batch = self.tick(field.width(), field.height()).len();
        for disturbance in &self.scratch {
            disturbance.apply(field);
        }
        if batch > 0 {
            tracing::debug!(count = batch, next_cooldown = self.cooldown, "Injected disturbances");
        }
        batch
    }
}
