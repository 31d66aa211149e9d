use crate::errors::FeatureMatchError;

/// Number of components in a SIFT descriptor: 4x4 spatial cells times 8 orientation bins
pub const DESCRIPTOR_LEN: usize = 128;

/// Fixed-length local appearance vector. Components live in 0.0..=255.0,
/// so distances between two descriptors are comparable to the per-template thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor(pub [f32; DESCRIPTOR_LEN]);

impl Descriptor {
    pub fn zeros() -> Self {
        Self([0.0; DESCRIPTOR_LEN])
    }

    /// Builds a descriptor from raw values, refusing anything that is not exactly 128 long
    pub fn from_slice(values: &[f32]) -> Result<Self, FeatureMatchError> {
        let array: [f32; DESCRIPTOR_LEN] =
            values
                .try_into()
                .map_err(|_| FeatureMatchError::DescriptorLength {
                    expected: DESCRIPTOR_LEN,
                    found: values.len(),
                })?;
        Ok(Self(array))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn squared_distance(&self, other: &Descriptor) -> f32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }

    /// Euclidean distance
    pub fn distance(&self, other: &Descriptor) -> f32 {
        self.squared_distance(other).sqrt()
    }
}

/// Salient image location with its descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct Keypoint {
    /// x in pixel coordinates of the image it was extracted from
    pub x: f32,
    /// y in pixel coordinates of the image it was extracted from
    pub y: f32,
    /// diameter of the described neighbourhood
    pub size: f32,
    /// dominant orientation in degrees, 0.0..360.0
    pub angle: f32,
    /// absolute DoG contrast at the refined extremum
    pub response: f32,
    pub descriptor: Descriptor,
}

impl Keypoint {
    /// Keypoint with only a position and descriptor, mostly useful for hand-built sets
    pub fn new(x: f32, y: f32, descriptor: Descriptor) -> Self {
        Self {
            x,
            y,
            size: 0.0,
            angle: 0.0,
            response: 0.0,
            descriptor,
        }
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_euclidean() {
        let a = Descriptor::zeros();
        let mut values = [0.0; DESCRIPTOR_LEN];
        values[0] = 3.0;
        values[127] = 4.0;
        let b = Descriptor(values);
        assert_eq!(a.distance(&b), 5.0);
        assert_eq!(b.squared_distance(&a), 25.0);
    }

    #[test]
    fn from_slice_checks_length() {
        assert!(Descriptor::from_slice(&[1.0; DESCRIPTOR_LEN]).is_ok());
        match Descriptor::from_slice(&[1.0; 64]) {
            Err(FeatureMatchError::DescriptorLength { expected, found }) => {
                assert_eq!(expected, 128);
                assert_eq!(found, 64);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }
}
