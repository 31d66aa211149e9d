//! Binds the platform screen and mouse to the automation traits.

use image::GrayImage;

use crate::automation::{PointerController, ScreenCapturer};
use crate::core::mouse::Mouse;
use crate::core::screen::Screen;
use crate::errors::AutoClickError;

impl ScreenCapturer for Screen {
    fn capture(&mut self) -> Result<GrayImage, AutoClickError> {
        self.grab_screen_image_grayscale()
    }
}

/// Pointer that refuses clicks outside the captured screen area
#[derive(Debug)]
pub struct DesktopPointer {
    mouse: Mouse,
    screen_width: i32,
    screen_height: i32,
}

impl DesktopPointer {
    pub fn new(mouse: Mouse, (screen_width, screen_height): (i32, i32)) -> Self {
        Self {
            mouse,
            screen_width,
            screen_height,
        }
    }
}

impl PointerController for DesktopPointer {
    fn position(&mut self) -> Result<(i32, i32), AutoClickError> {
        self.mouse.get_mouse_position()
    }

    fn click(&mut self, x: i32, y: i32) -> Result<(), AutoClickError> {
        if x < 0 || y < 0 || x >= self.screen_width || y >= self.screen_height {
            return Err(AutoClickError::OutOfBounds {
                x: x as f32,
                y: y as f32,
            });
        }
        self.mouse.move_mouse_to_pos(x, y)?;
        self.mouse.mouse_click()
    }

    fn move_to(&mut self, x: i32, y: i32) -> Result<(), AutoClickError> {
        self.mouse.move_mouse_to_pos(x, y)
    }
}

/// Opens the platform screen and pointer
pub fn open() -> Result<(Screen, DesktopPointer), AutoClickError> {
    let screen = Screen::new()?;
    let pointer = DesktopPointer::new(Mouse::new()?, screen.dimension());
    log::debug!(
        "Screen size {}x{}",
        screen.screen_width,
        screen.screen_height
    );
    Ok((screen, pointer))
}
