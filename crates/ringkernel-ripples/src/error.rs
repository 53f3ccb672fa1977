//! Error types for the ripples crate.

use thiserror::Error;

/// Result type for ripples operations.
pub type Result<T> = std::result::Result<T, RipplesError>;

/// Errors that can occur while configuring or exporting the wave field.
///
/// The frame surface of [`crate::FramePipeline`] never returns these; a
/// degraded frame is reported as "no visual update" instead.
#[derive(Error, Debug)]
pub enum RipplesError {
    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Grid buffers could not be allocated.
    #[error("Allocation failed: {0}")]
    Allocation(String),

    /// Configuration source could not be read or deserialized.
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    /// Image encoding error.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RipplesError {
    /// Create an invalid configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an allocation error.
    pub fn allocation(msg: impl Into<String>) -> Self {
        Self::Allocation(msg.into())
    }
}
