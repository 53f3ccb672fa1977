//! Simulation core for the perpetually excited 2D wave field.

mod disturbance;
mod field;
mod params;
mod stepper;

pub use disturbance::{Bounds, Disturbance, DisturbanceRanges, DisturbanceScheduler, MAX_BATCH};
pub use field::{StepBuffers, WaveField, ACTIVE, BLOCKED};
pub use params::{SimulationParams, MAX_STABLE_MULTIPLIER};
pub use stepper::{convolve3x3, LaplacianSource, Stepper, LAPLACIAN_KERNEL, PARALLEL_THRESHOLD};

pub(crate) use stepper::for_each_row;
