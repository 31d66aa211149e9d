use core_graphics::display::CGDisplay;
use image::imageops::{resize, FilterType::Nearest};
use image::GrayImage;

use crate::errors::AutoClickError;
use crate::imgtools;

#[derive(Debug)]
pub struct Screen {
    pub screen_width: i32,
    pub screen_height: i32,
    display: CGDisplay,
}

impl Screen {
    pub fn new() -> Result<Self, AutoClickError> {
        let display = CGDisplay::main();
        let screen_width = display.pixels_wide() as i32;
        let screen_height = display.pixels_high() as i32;
        Ok(Self {
            screen_width,
            screen_height,
            display,
        })
    }

    /// returns logical screen dimensions of the main display
    pub fn dimension(&self) -> (i32, i32) {
        (self.screen_width, self.screen_height)
    }

    /// Captures the main display in grayscale at logical resolution, so pixel positions
    /// line up with pointer coordinates on retina screens
    pub fn grab_screen_image_grayscale(&mut self) -> Result<GrayImage, AutoClickError> {
        let image = self.display.image().ok_or_else(|| {
            AutoClickError::Capture("Failed to capture screen image".to_string())
        })?;
        let width = image.width();
        let height = image.height();
        let stride = image.bytes_per_row();
        let data = image.data();
        let bytes = data.bytes();

        // rows may be padded past width * 4 bytes
        let mut bitmap: Vec<u8> = Vec::with_capacity(width * height * 4);
        for row in bytes.chunks_exact(stride).take(height) {
            bitmap.extend_from_slice(&row[..width * 4]);
        }
        let physical = imgtools::bgra_to_grayscale(width as u32, height as u32, &bitmap)
            .ok_or_else(|| {
                AutoClickError::Capture("Could not convert image to grayscale".to_string())
            })?;
        if physical.width() == self.screen_width as u32
            && physical.height() == self.screen_height as u32
        {
            return Ok(physical);
        }
        Ok(resize(
            &physical,
            self.screen_width as u32,
            self.screen_height as u32,
            Nearest,
        ))
    }
}
