//! Keypoint extraction for templates and screenshots.

pub mod keypoint;
pub mod scale_space;
pub mod sift;

use image::GrayImage;

use crate::errors::FeatureMatchError;

pub use keypoint::{Descriptor, Keypoint, DESCRIPTOR_LEN};
pub use sift::Sift;

/// Computes scale and rotation invariant keypoints for a grayscale image.
///
/// Implementations must be pure: the same image always yields the same keypoints in the same
/// order. An image without detectable features yields an empty vector, not an error.
pub trait FeatureExtractor: Sync {
    fn extract(&self, image: &GrayImage) -> Result<Vec<Keypoint>, FeatureMatchError>;
}
