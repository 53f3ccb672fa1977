//! Wave simulation parameters and stability calculations.

/// Largest Laplacian multiplier that keeps the 5-point leapfrog scheme stable.
///
/// The 2D Courant limit is `c * dt / dx <= 1/sqrt(2)`, so the squared
/// multiplier must stay at or below one half.
pub const MAX_STABLE_MULTIPLIER: f32 = 0.5;

/// Parameters for the damped 2D wave equation.
///
/// Unlike an acoustic model these are not tied to physical units; the
/// stepper only ever sees the derived Laplacian multiplier and the damper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
    /// Wave speed `c`.
    pub wave_speed: f32,

    /// Spatial step `dx`.
    pub cell_size: f32,

    /// Time step `dt`.
    pub time_step: f32,

    /// Multiplicative energy loss per step, in `(0, 1]`.
    pub damper: f32,
}

const DEFAULT_WAVE_SPEED: f32 = 0.5;
const DEFAULT_CELL_SIZE: f32 = 1.0;
const DEFAULT_TIME_STEP: f32 = 1.0;
const DEFAULT_DAMPER: f32 = 0.995;

impl Default for SimulationParams {
    fn default() -> Self {
        Self::new(DEFAULT_WAVE_SPEED, DEFAULT_CELL_SIZE, DEFAULT_TIME_STEP)
    }
}

impl SimulationParams {
    /// Create new parameters with the default damper.
    pub fn new(wave_speed: f32, cell_size: f32, time_step: f32) -> Self {
        Self {
            wave_speed,
            cell_size,
            time_step,
            damper: DEFAULT_DAMPER,
        }
    }

    /// Set the damper, clamped to `(0, 1]`.
    pub fn with_damper(mut self, damper: f32) -> Self {
        self.damper = damper.clamp(f32::MIN_POSITIVE, 1.0);
        self
    }

    /// Compute the Courant number (c * dt / dx).
    ///
    /// A non-positive spatial step disables propagation and reports zero.
    pub fn courant_number(&self) -> f32 {
        if self.cell_size > 0.0 {
            self.wave_speed * self.time_step / self.cell_size
        } else {
            0.0
        }
    }

    /// `(dt * c / dx)^2`, or zero for a degenerate spatial step.
    pub fn laplacian_multiplier(&self) -> f32 {
        let courant = self.courant_number();
        let m = courant * courant;
        if m.is_finite() {
            m
        } else {
            0.0
        }
    }

    /// Check if the parameters satisfy the 2D CFL stability condition.
    pub fn is_stable(&self) -> bool {
        self.courant_number().abs() <= std::f32::consts::FRAC_1_SQRT_2
    }

    /// Multiplier actually fed to the stepper.
    ///
    /// With `clamp` set the value never exceeds [`MAX_STABLE_MULTIPLIER`].
    pub fn effective_multiplier(&self, clamp: bool) -> f32 {
        let m = self.laplacian_multiplier();
        if clamp {
            m.min(MAX_STABLE_MULTIPLIER)
        } else {
            m
        }
    }

    /// Damper clamped into `(0, 1]`; non-finite values fall back to 1.
    pub fn effective_damper(&self) -> f32 {
        if self.damper.is_finite() {
            self.damper.clamp(f32::MIN_POSITIVE, 1.0)
        } else {
            1.0
        }
    }
}
