#![allow(dead_code)]

use std::path::PathBuf;

use image::{imageops, GrayImage, Luma};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const SCENE_WIDTH: u32 = 192;
pub const SCENE_HEIGHT: u32 = 160;

/// area of the scene holding the "play" button, (x, y, width, height)
pub const PLAY: (u32, u32, u32, u32) = (32, 32, 64, 64);
/// area of the scene holding the "close" button
pub const CLOSE: (u32, u32, u32, u32) = (112, 64, 64, 64);

/// Mid-gray desktop with faint seeded noise and two distinct widgets
pub fn scene(seed: u64) -> GrayImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut img = GrayImage::from_fn(SCENE_WIDTH, SCENE_HEIGHT, |_, _| {
        Luma([rng.random_range(118u8..=126)])
    });

    // play: dark disc with a bright bar beside it
    draw_filled_circle_mut(&mut img, (56, 60), 13, Luma([25]));
    draw_filled_rect_mut(&mut img, Rect::at(74, 44).of_size(10, 34), Luma([235]));
    draw_filled_rect_mut(&mut img, Rect::at(44, 80).of_size(30, 6), Luma([60]));

    // close: bright square with two dark dots and a dark frame piece
    draw_filled_rect_mut(&mut img, Rect::at(122, 74).of_size(28, 28), Luma([240]));
    draw_filled_circle_mut(&mut img, (130, 82), 4, Luma([10]));
    draw_filled_circle_mut(&mut img, (142, 94), 5, Luma([10]));
    draw_filled_rect_mut(&mut img, Rect::at(156, 70).of_size(6, 44), Luma([40]));

    img
}

pub fn crop(image: &GrayImage, (x, y, width, height): (u32, u32, u32, u32)) -> GrayImage {
    imageops::crop_imm(image, x, y, width, height).to_image()
}

/// `area` grown by `margin` pixels on every side
pub fn contains(area: (u32, u32, u32, u32), margin: f32, point: (f32, f32)) -> bool {
    let (x, y, width, height) = area;
    let (px, py) = point;
    px >= x as f32 - margin
        && py >= y as f32 - margin
        && px <= (x + width) as f32 + margin
        && py <= (y + height) as f32 + margin
}

/// Fresh directory under the system temp dir, removed on drop
pub struct TempDir(pub PathBuf);

impl TempDir {
    pub fn new(label: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "siftclick-{}-{}",
            label,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&path);
        std::fs::create_dir_all(&path).unwrap();
        Self(path)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}
