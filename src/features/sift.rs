//! Scale-invariant feature transform.
//!
//! Keypoints are extrema of the difference-of-Gaussians pyramid, refined to
//! sub-pixel accuracy, filtered by contrast and edge response, and described
//! by 4x4 histograms of 8 gradient orientations relative to the dominant one.
//! Intensities are handled in 0.0..=1.0; descriptors are scaled into
//! 0.0..=255.0 whole numbers.

use std::f32::consts::PI;

use image::GrayImage;
use rayon::prelude::*;

use super::keypoint::{Descriptor, Keypoint, DESCRIPTOR_LEN};
use super::scale_space::ScaleSpace;
use super::FeatureExtractor;
use crate::errors::FeatureMatchError;
use crate::imgtools::{self, GrayF32};

// orientation histogram
const ORI_HIST_BINS: usize = 36;
const ORI_SIG_FCTR: f32 = 1.5;
const ORI_RADIUS: f32 = 3.0 * ORI_SIG_FCTR;
const ORI_PEAK_RATIO: f32 = 0.8;

// descriptor layout
const DESCR_WIDTH: usize = 4;
const DESCR_HIST_BINS: usize = 8;
const DESCR_SCL_FCTR: f32 = 3.0;
const DESCR_MAG_THR: f32 = 0.2;
const DESCR_INT_FCTR: f32 = 512.0;

const MAX_INTERP_STEPS: usize = 5;

#[derive(Debug, Clone)]
pub struct Sift {
    pub n_layers: usize,
    pub sigma: f32,
    pub contrast_threshold: f32,
    pub edge_threshold: f32,
    /// blur the input image is assumed to already carry
    pub assumed_blur: f32,
    /// pixels skipped along each octave edge during extremum search
    pub border: usize,
}

impl Default for Sift {
    fn default() -> Self {
        Self {
            n_layers: 3,
            sigma: 1.6,
            contrast_threshold: 0.04,
            edge_threshold: 10.0,
            assumed_blur: 0.5,
            border: 5,
        }
    }
}

/// Extremum located in the pyramid, before orientation assignment
struct Extremum {
    octave: usize,
    layer: usize,
    /// integer sample position in octave coordinates
    col: i32,
    row: i32,
    /// refined position in octave coordinates
    x: f32,
    y: f32,
    /// sigma of the keypoint relative to its octave
    octave_scale: f32,
    response: f32,
}

impl Sift {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of octaves for an image, counted from the doubled base
    pub fn octave_count(width: u32, height: u32) -> usize {
        let min_dim = width.min(height);
        if min_dim < 2 {
            return 0;
        }
        (min_dim as f32).log2().round().max(1.0) as usize
    }

    /// Detects keypoints and computes their descriptors
    pub fn detect_and_compute(&self, image: &GrayImage) -> Result<Vec<Keypoint>, FeatureMatchError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(FeatureMatchError::DegenerateImage { width, height });
        }
        let n_octaves = Self::octave_count(width, height);
        if n_octaves == 0 {
            return Ok(Vec::new());
        }

        let space = ScaleSpace::build(self.base_image(image), n_octaves, self.n_layers, self.sigma);

        let levels: Vec<(usize, usize)> = (0..space.n_octaves())
            .flat_map(|octave| (1..=self.n_layers).map(move |layer| (octave, layer)))
            .collect();

        // each (octave, layer) is independent; collect keeps the sequential order
        let keypoints: Vec<Keypoint> = levels
            .par_iter()
            .map(|&(octave, layer)| {
                self.find_extrema(&space, octave, layer)
                    .into_iter()
                    .flat_map(|ext| self.describe(&space, &ext))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect();

        log::trace!(
            "extracted {} keypoints from {}x{} image over {} octaves",
            keypoints.len(),
            width,
            height,
            n_octaves
        );
        Ok(keypoints)
    }

    /// Doubles the input and blurs it up to `sigma`
    fn base_image(&self, image: &GrayImage) -> GrayF32 {
        let mut normalized = imgtools::to_f32(image);
        normalized.pixels_mut().for_each(|p| p[0] /= 255.0);
        let doubled = imgtools::upsample_double(&normalized);
        let prior = 2.0 * self.assumed_blur;
        let sig_diff = (self.sigma * self.sigma - prior * prior).max(0.01).sqrt();
        image::imageops::blur(&doubled, sig_diff)
    }

    fn find_extrema(&self, space: &ScaleSpace, octave: usize, layer: usize) -> Vec<Extremum> {
        let dogs = &space.dogs[octave];
        let (prev, cur, next) = (&dogs[layer - 1], &dogs[layer], &dogs[layer + 1]);
        let (w, h) = (cur.width() as i32, cur.height() as i32);
        let border = self.border as i32;
        let threshold = 0.5 * self.contrast_threshold / self.n_layers as f32;

        let mut found = Vec::new();
        for row in border..(h - border) {
            for col in border..(w - border) {
                let val = at(cur, col, row);
                if val.abs() <= threshold {
                    continue;
                }
                if !is_extremum(val, prev, cur, next, col, row) {
                    continue;
                }
                if let Some(ext) = self.refine(space, octave, layer, col, row) {
                    found.push(ext);
                }
            }
        }
        found
    }

    /// Fits a 3D quadratic around the sample and walks towards the true extremum.
    /// Rejects low contrast points and points lying on edges.
    fn refine(
        &self,
        space: &ScaleSpace,
        octave: usize,
        mut layer: usize,
        mut col: i32,
        mut row: i32,
    ) -> Option<Extremum> {
        let dogs = &space.dogs[octave];
        let (w, h) = (dogs[0].width() as i32, dogs[0].height() as i32);
        let border = self.border as i32;

        let mut offset = [0.0f32; 3];
        let mut converged = false;
        for _ in 0..MAX_INTERP_STEPS {
            let (grad, hess) = derivatives(dogs, layer, col, row);
            offset = solve3(hess, grad).map(|x| -x);

            if offset.iter().all(|v| v.abs() < 0.5) {
                converged = true;
                break;
            }
            if offset.iter().any(|v| v.abs() > (i32::MAX / 3) as f32) {
                return None;
            }

            col += offset[0].round() as i32;
            row += offset[1].round() as i32;
            let next_layer = layer as i32 + offset[2].round() as i32;
            if next_layer < 1
                || next_layer > self.n_layers as i32
                || col < border
                || col >= w - border
                || row < border
                || row >= h - border
            {
                return None;
            }
            layer = next_layer as usize;
        }
        if !converged {
            return None;
        }

        let (grad, hess) = derivatives(dogs, layer, col, row);
        let t = grad[0] * offset[0] + grad[1] * offset[1] + grad[2] * offset[2];
        let contrast = at(&dogs[layer], col, row) + t * 0.5;
        if contrast.abs() * (self.n_layers as f32) < self.contrast_threshold {
            return None;
        }

        let (dxx, dyy, dxy) = (hess[0][0], hess[1][1], hess[0][1]);
        let trace = dxx + dyy;
        let det = dxx * dyy - dxy * dxy;
        let edge = self.edge_threshold;
        if det <= 0.0 || trace * trace * edge >= (edge + 1.0) * (edge + 1.0) * det {
            return None;
        }

        Some(Extremum {
            octave,
            layer,
            col,
            row,
            x: col as f32 + offset[0],
            y: row as f32 + offset[1],
            octave_scale: self.sigma
                * 2f32.powf((layer as f32 + offset[2]) / self.n_layers as f32),
            response: contrast.abs(),
        })
    }

    /// One keypoint per dominant orientation of the extremum
    fn describe(&self, space: &ScaleSpace, ext: &Extremum) -> Vec<Keypoint> {
        let img = &space.gaussians[ext.octave][ext.layer];
        let hist = orientation_histogram(img, ext.col, ext.row, ext.octave_scale);
        let peak = hist.iter().cloned().fold(0.0f32, f32::max);
        let mag_thr = peak * ORI_PEAK_RATIO;

        // octave 0 is the doubled image
        let to_input = 2f32.powi(ext.octave as i32) * 0.5;
        let n = ORI_HIST_BINS;
        let mut keypoints = Vec::new();
        for j in 0..n {
            let l = (j + n - 1) % n;
            let r = (j + 1) % n;
            if !(hist[j] > hist[l] && hist[j] > hist[r] && hist[j] >= mag_thr) {
                continue;
            }
            let mut bin = j as f32 + 0.5 * (hist[l] - hist[r]) / (hist[l] - 2.0 * hist[j] + hist[r]);
            if bin < 0.0 {
                bin += n as f32;
            } else if bin >= n as f32 {
                bin -= n as f32;
            }
            let mut angle = 360.0 - (360.0 / n as f32) * bin;
            if (angle - 360.0).abs() < f32::EPSILON {
                angle = 0.0;
            }

            let mut descr_ori = 360.0 - angle;
            if (descr_ori - 360.0).abs() < f32::EPSILON {
                descr_ori = 0.0;
            }
            let descriptor = descriptor_at(img, ext.x, ext.y, descr_ori, ext.octave_scale);

            keypoints.push(Keypoint {
                x: ext.x * to_input,
                y: ext.y * to_input,
                size: ext.octave_scale * 2.0 * to_input,
                angle,
                response: ext.response,
                descriptor,
            });
        }
        keypoints
    }
}

impl FeatureExtractor for Sift {
    fn extract(&self, image: &GrayImage) -> Result<Vec<Keypoint>, FeatureMatchError> {
        self.detect_and_compute(image)
    }
}

#[inline]
fn at(img: &GrayF32, x: i32, y: i32) -> f32 {
    img.get_pixel(x as u32, y as u32)[0]
}

fn is_extremum(val: f32, prev: &GrayF32, cur: &GrayF32, next: &GrayF32, col: i32, row: i32) -> bool {
    for img in [prev, cur, next] {
        for dy in -1..=1 {
            for dx in -1..=1 {
                let other = at(img, col + dx, row + dy);
                if val > 0.0 && other > val {
                    return false;
                }
                if val < 0.0 && other < val {
                    return false;
                }
            }
        }
    }
    true
}

/// Gradient (dx, dy, ds) and Hessian of the DoG stack by central differences
fn derivatives(dogs: &[GrayF32], layer: usize, c: i32, r: i32) -> ([f32; 3], [[f32; 3]; 3]) {
    let (prev, cur, next) = (&dogs[layer - 1], &dogs[layer], &dogs[layer + 1]);
    let v2 = at(cur, c, r) * 2.0;

    let dx = (at(cur, c + 1, r) - at(cur, c - 1, r)) * 0.5;
    let dy = (at(cur, c, r + 1) - at(cur, c, r - 1)) * 0.5;
    let ds = (at(next, c, r) - at(prev, c, r)) * 0.5;

    let dxx = at(cur, c + 1, r) + at(cur, c - 1, r) - v2;
    let dyy = at(cur, c, r + 1) + at(cur, c, r - 1) - v2;
    let dss = at(next, c, r) + at(prev, c, r) - v2;
    let dxy = (at(cur, c + 1, r + 1) - at(cur, c - 1, r + 1) - at(cur, c + 1, r - 1)
        + at(cur, c - 1, r - 1))
        * 0.25;
    let dxs = (at(next, c + 1, r) - at(next, c - 1, r) - at(prev, c + 1, r)
        + at(prev, c - 1, r))
        * 0.25;
    let dys = (at(next, c, r + 1) - at(next, c, r - 1) - at(prev, c, r + 1)
        + at(prev, c, r - 1))
        * 0.25;

    (
        [dx, dy, ds],
        [[dxx, dxy, dxs], [dxy, dyy, dys], [dxs, dys, dss]],
    )
}

/// Solves `a * x = b` by Gaussian elimination with partial pivoting.
/// A singular system yields a zero step.
fn solve3(a: [[f32; 3]; 3], b: [f32; 3]) -> [f32; 3] {
    let mut m = [[0.0f64; 4]; 3];
    for i in 0..3 {
        for j in 0..3 {
            m[i][j] = a[i][j] as f64;
        }
        m[i][3] = b[i] as f64;
    }
    for col in 0..3 {
        let pivot = (col..3)
            .max_by(|&i, &j| m[i][col].abs().total_cmp(&m[j][col].abs()))
            .unwrap_or(col);
        if m[pivot][col].abs() < 1e-12 {
            return [0.0; 3];
        }
        m.swap(col, pivot);
        for row in (col + 1)..3 {
            let factor = m[row][col] / m[col][col];
            for k in col..4 {
                m[row][k] -= factor * m[col][k];
            }
        }
    }
    let mut x = [0.0f64; 3];
    for i in (0..3).rev() {
        let mut sum = m[i][3];
        for k in (i + 1)..3 {
            sum -= m[i][k] * x[k];
        }
        x[i] = sum / m[i][i];
    }
    [x[0] as f32, x[1] as f32, x[2] as f32]
}

/// Smoothed 36-bin histogram of gradient orientations around (col, row)
fn orientation_histogram(img: &GrayF32, col: i32, row: i32, octave_scale: f32) -> [f32; ORI_HIST_BINS] {
    let (w, h) = (img.width() as i32, img.height() as i32);
    let radius = (ORI_RADIUS * octave_scale).round() as i32;
    let sigma = ORI_SIG_FCTR * octave_scale;
    let exp_scale = -1.0 / (2.0 * sigma * sigma);
    let n = ORI_HIST_BINS;

    let mut raw = [0.0f32; ORI_HIST_BINS];
    for i in -radius..=radius {
        let y = row + i;
        if y <= 0 || y >= h - 1 {
            continue;
        }
        for j in -radius..=radius {
            let x = col + j;
            if x <= 0 || x >= w - 1 {
                continue;
            }
            let dx = at(img, x + 1, y) - at(img, x - 1, y);
            let dy = at(img, x, y - 1) - at(img, x, y + 1);
            let weight = (((i * i + j * j) as f32) * exp_scale).exp();
            let mag = (dx * dx + dy * dy).sqrt();
            let ori = dy.atan2(dx).to_degrees().rem_euclid(360.0);

            let mut bin = ((n as f32 / 360.0) * ori).round() as i32;
            if bin >= n as i32 {
                bin -= n as i32;
            }
            if bin < 0 {
                bin += n as i32;
            }
            raw[bin as usize] += weight * mag;
        }
    }

    let mut hist = [0.0f32; ORI_HIST_BINS];
    for i in 0..n {
        let m2 = raw[(i + n - 2) % n];
        let m1 = raw[(i + n - 1) % n];
        let p1 = raw[(i + 1) % n];
        let p2 = raw[(i + 2) % n];
        hist[i] = (m2 + p2) * (1.0 / 16.0) + (m1 + p1) * (4.0 / 16.0) + raw[i] * (6.0 / 16.0);
    }
    hist
}

/// 4x4x8 gradient histogram around (x, y), rotated by `ori` degrees,
/// trilinearly interpolated, clipped and scaled into whole numbers 0..=255
fn descriptor_at(img: &GrayF32, x: f32, y: f32, ori: f32, scale: f32) -> Descriptor {
    let d = DESCR_WIDTH;
    let n = DESCR_HIST_BINS;
    let (w, h) = (img.width() as i32, img.height() as i32);
    let (pt_x, pt_y) = (x.round() as i32, y.round() as i32);

    let bins_per_rad = n as f32 / 360.0;
    let exp_scale = -1.0 / (d as f32 * d as f32 * 0.5);
    let hist_width = DESCR_SCL_FCTR * scale;
    let max_radius = ((w * w + h * h) as f32).sqrt();
    let radius = (hist_width * std::f32::consts::SQRT_2 * (d as f32 + 1.0) * 0.5)
        .round()
        .min(max_radius) as i32;
    let cos_t = (ori * PI / 180.0).cos() / hist_width;
    let sin_t = (ori * PI / 180.0).sin() / hist_width;

    let stride_o = n + 2;
    let stride_c = (d + 2) * stride_o;
    let mut hist = vec![0.0f32; (d + 2) * (d + 2) * (n + 2)];

    for i in -radius..=radius {
        for j in -radius..=radius {
            let c_rot = j as f32 * cos_t - i as f32 * sin_t;
            let r_rot = j as f32 * sin_t + i as f32 * cos_t;
            let rbin = r_rot + d as f32 / 2.0 - 0.5;
            let cbin = c_rot + d as f32 / 2.0 - 0.5;
            let r = pt_y + i;
            let c = pt_x + j;

            if !(rbin > -1.0 && rbin < d as f32 && cbin > -1.0 && cbin < d as f32) {
                continue;
            }
            if r <= 0 || r >= h - 1 || c <= 0 || c >= w - 1 {
                continue;
            }

            let dx = at(img, c + 1, r) - at(img, c - 1, r);
            let dy = at(img, c, r - 1) - at(img, c, r + 1);
            let weight = ((c_rot * c_rot + r_rot * r_rot) * exp_scale).exp();
            let mag = (dx * dx + dy * dy).sqrt() * weight;
            let grad_ori = dy.atan2(dx).to_degrees().rem_euclid(360.0);
            let obin = (grad_ori - ori) * bins_per_rad;

            let r0 = rbin.floor();
            let c0 = cbin.floor();
            let o0 = obin.floor();
            let (rf, cf, of) = (rbin - r0, cbin - c0, obin - o0);
            let mut o0 = o0 as i32;
            if o0 < 0 {
                o0 += n as i32;
            }
            if o0 >= n as i32 {
                o0 -= n as i32;
            }

            let v_r1 = mag * rf;
            let v_r0 = mag - v_r1;
            let v_rc11 = v_r1 * cf;
            let v_rc10 = v_r1 - v_rc11;
            let v_rc01 = v_r0 * cf;
            let v_rc00 = v_r0 - v_rc01;
            let v_rco111 = v_rc11 * of;
            let v_rco110 = v_rc11 - v_rco111;
            let v_rco101 = v_rc10 * of;
            let v_rco100 = v_rc10 - v_rco101;
            let v_rco011 = v_rc01 * of;
            let v_rco010 = v_rc01 - v_rco011;
            let v_rco001 = v_rc00 * of;
            let v_rco000 = v_rc00 - v_rco001;

            let idx = ((r0 as i32 + 1) as usize * (d + 2) + (c0 as i32 + 1) as usize) * stride_o
                + o0 as usize;
            hist[idx] += v_rco000;
            hist[idx + 1] += v_rco001;
            hist[idx + stride_o] += v_rco010;
            hist[idx + stride_o + 1] += v_rco011;
            hist[idx + stride_c] += v_rco100;
            hist[idx + stride_c + 1] += v_rco101;
            hist[idx + stride_c + stride_o] += v_rco110;
            hist[idx + stride_c + stride_o + 1] += v_rco111;
        }
    }

    // fold the circular orientation overflow and drop the spatial padding
    let mut values = [0.0f32; DESCRIPTOR_LEN];
    for i in 0..d {
        for j in 0..d {
            let idx = ((i + 1) * (d + 2) + (j + 1)) * stride_o;
            hist[idx] += hist[idx + n];
            hist[idx + 1] += hist[idx + n + 1];
            for k in 0..n {
                values[(i * d + j) * n + k] = hist[idx + k];
            }
        }
    }

    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    let clip = norm * DESCR_MAG_THR;
    for v in values.iter_mut() {
        *v = v.min(clip);
    }
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    let factor = DESCR_INT_FCTR / norm.max(f32::EPSILON);
    for v in values.iter_mut() {
        *v = (*v * factor).round().clamp(0.0, 255.0);
    }
    Descriptor(values)
}
