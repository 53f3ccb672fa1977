//! # RingKernel Ripples
//!
//! A perpetually excited 2D wave field rendered as glowing ripples.
//!
//! Every frame the pipeline injects randomly scheduled raised-cosine
//! disturbances, advances a damped leapfrog wave equation on a three-generation
//! height field, and composites the current generation through a signed color
//! map, a bloom pass and a filmic tone map.
//!
//! ## Features
//!
//! - 5-point stencil or 3x3 convolution Laplacian
//! - Cross-sample or blurred-highlight bloom
//! - Obstacles, manual injection, pause and resume
//! - Courant clamping and divergence recovery
//! - TOML + environment configuration
//! - PNG frame export
//!
//! ## Run
//!
//! ```bash
//! cargo run -p ringkernel-ripples --bin ripples -- --frames 600
//! ```
//!
//! ## Embedding
//!
//! ```ignore
//! use ringkernel_ripples::{FramePipeline, PipelineSettings};
//!
//! let mut pipeline = FramePipeline::new(PipelineSettings::default(), None);
//! pipeline.resize(512, 512);
//! pipeline.advance(1.0 / 60.0);
//! if let Some(frame) = pipeline.render_frame() {
//!     present(frame.pixels);
//! }
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod simulation;

pub use config::{ConfigBuilder, RipplesConfig};
pub use error::{Result, RipplesError};
pub use pipeline::{FramePipeline, PipelineSettings, PipelineStats};
pub use render::{BloomParams, BloomStrategy, RenderFrame};
pub use simulation::{Disturbance, DisturbanceRanges, LaplacianSource, SimulationParams, WaveField};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{ConfigBuilder, RipplesConfig};
    pub use crate::error::{Result, RipplesError};
    pub use crate::pipeline::{FramePipeline, PipelineSettings, PipelineStats, Stage};
    pub use crate::render::{BloomParams, BloomStrategy, RenderFrame};
    pub use crate::simulation::{
        Disturbance, DisturbanceRanges, LaplacianSource, SimulationParams, WaveField,
    };
}
