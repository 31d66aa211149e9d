//! Gaussian and difference-of-Gaussians pyramids.

use image::imageops;
use image::Luma;

use crate::imgtools::{self, GrayF32};

/// Gaussian pyramid of `n_layers + 3` images per octave and the matching
/// `n_layers + 2` difference-of-Gaussians images.
pub struct ScaleSpace {
    pub gaussians: Vec<Vec<GrayF32>>,
    pub dogs: Vec<Vec<GrayF32>>,
    pub n_layers: usize,
}

impl ScaleSpace {
    /// Builds the pyramid from a base image that is already blurred to `sigma`.
    /// Octave `o + 1` starts from layer `n_layers` of octave `o`, downsampled by two.
    pub fn build(base: GrayF32, n_octaves: usize, n_layers: usize, sigma: f32) -> Self {
        let sigmas = layer_sigmas(n_layers, sigma);
        let mut gaussians: Vec<Vec<GrayF32>> = Vec::with_capacity(n_octaves);

        let mut octave_base = base;
        for octave in 0..n_octaves {
            let mut layers = Vec::with_capacity(n_layers + 3);
            layers.push(octave_base);
            for layer_sigma in sigmas.iter().skip(1) {
                let blurred = match layers.last() {
                    Some(prev) => imageops::blur(prev, *layer_sigma),
                    None => break,
                };
                layers.push(blurred);
            }
            octave_base = if octave + 1 < n_octaves {
                imgtools::downsample_half(&layers[n_layers])
            } else {
                GrayF32::new(1, 1)
            };
            gaussians.push(layers);
        }

        let dogs = gaussians
            .iter()
            .map(|layers| {
                layers
                    .windows(2)
                    .map(|pair| difference(&pair[1], &pair[0]))
                    .collect()
            })
            .collect();

        Self {
            gaussians,
            dogs,
            n_layers,
        }
    }

    pub fn n_octaves(&self) -> usize {
        self.gaussians.len()
    }
}

/// Incremental blur to apply to each layer so that layer `i` ends up at
/// `sigma * 2^(i / n_layers)`. Entry 0 is the base sigma itself.
pub fn layer_sigmas(n_layers: usize, sigma: f32) -> Vec<f32> {
    let k = 2f32.powf(1.0 / n_layers as f32);
    let mut sigmas = Vec::with_capacity(n_layers + 3);
    sigmas.push(sigma);
    for i in 1..(n_layers + 3) {
        let sig_prev = k.powi(i as i32 - 1) * sigma;
        let sig_total = sig_prev * k;
        sigmas.push((sig_total * sig_total - sig_prev * sig_prev).sqrt());
    }
    sigmas
}

fn difference(a: &GrayF32, b: &GrayF32) -> GrayF32 {
    GrayF32::from_fn(a.width(), a.height(), |x, y| {
        Luma([a.get_pixel(x, y)[0] - b.get_pixel(x, y)[0]])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pyramid_shape() {
        let base = GrayF32::from_pixel(64, 48, Luma([0.5]));
        let space = ScaleSpace::build(base, 3, 3, 1.6);
        assert_eq!(space.n_octaves(), 3);
        for octave in 0..3 {
            assert_eq!(space.gaussians[octave].len(), 6);
            assert_eq!(space.dogs[octave].len(), 5);
        }
        assert_eq!(space.gaussians[1][0].dimensions(), (32, 24));
        assert_eq!(space.gaussians[2][0].dimensions(), (16, 12));
    }

    #[test]
    fn flat_image_has_flat_dog() {
        let base = GrayF32::from_pixel(32, 32, Luma([0.25]));
        let space = ScaleSpace::build(base, 2, 3, 1.6);
        for dog in space.dogs.iter().flatten() {
            assert!(dog.pixels().all(|p| p[0].abs() < 1e-5));
        }
    }

    #[test]
    fn sigmas_compose_to_octave_doubling() {
        let sigmas = layer_sigmas(3, 1.6);
        assert_eq!(sigmas.len(), 6);
        // variance adds up under successive gaussian blurs
        let total: f32 = sigmas.iter().take(4).map(|s| s * s).sum();
        assert!((total.sqrt() - 3.2).abs() < 1e-3);
    }
}
