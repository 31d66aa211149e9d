use std::path::PathBuf;
use thiserror::Error;

/// Failures while building the template catalog at startup. These are fatal, except
/// `Features`, which the catalog builders downgrade to a skipped template.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Template source {path:?} is not readable: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to decode template image {path:?}: {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Feature extraction failed for template '{name}': {source}")]
    Features {
        name: String,
        source: FeatureMatchError,
    },
}

/// Failures inside feature extraction or descriptor matching.
///
/// A cycle that hits one of these is abandoned; the loop carries on with the next one.
#[derive(Debug, Error)]
pub enum FeatureMatchError {
    #[error("Image of {width}x{height} pixels cannot be processed")]
    DegenerateImage { width: u32, height: u32 },

    #[error("Descriptor has {found} components, expected {expected}")]
    DescriptorLength { expected: usize, found: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown argument: {0}")]
    UnknownArgument(String),

    #[error("Invalid value '{value}' for {flag}")]
    InvalidValue { flag: String, value: String },

    #[error("sleep_min ({min}) must not exceed sleep_max ({max})")]
    SleepRange { min: f64, max: f64 },
}

#[derive(Debug, Error)]
pub enum AutoClickError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Match(#[from] FeatureMatchError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Screen capture failed: {0}")]
    Capture(String),

    #[error("OS Failure: {0}")]
    OSFailure(String),

    #[error("Out of bounds at positions x,y: {x}, {y}")]
    OutOfBounds { x: f32, y: f32 },
}

impl AutoClickError {
    /// Errors that only cost the current cycle.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AutoClickError::Match(_) | AutoClickError::Capture(_))
    }
}
