use std::os::raw::c_ulong;
use std::ptr;

use image::GrayImage;
use x11::xlib::*;

use crate::errors::AutoClickError;
use crate::imgtools;

const ALLPLANES: c_ulong = !0;

#[derive(Debug)]
pub struct Screen {
    pub screen_width: i32,
    pub screen_height: i32,
    display: *mut _XDisplay,
    root_window: c_ulong,
}

impl Screen {
    pub fn new() -> Result<Self, AutoClickError> {
        unsafe {
            // open the default display (usually ":0")
            let display: *mut _XDisplay = XOpenDisplay(ptr::null());
            if display.is_null() {
                return Err(AutoClickError::OSFailure(
                    "Unable to open X display. Check that x11 is running and not wayland"
                        .to_string(),
                ));
            }
            let screen = XDefaultScreen(display);
            let root_window = XRootWindow(display, screen);
            Ok(Self {
                screen_width: XDisplayWidth(display, screen),
                screen_height: XDisplayHeight(display, screen),
                display,
                root_window,
            })
        }
    }

    /// returns screen dimensions. All monitors included
    pub fn dimension(&self) -> (i32, i32) {
        (self.screen_width, self.screen_height)
    }

    /// Grabs the whole root window and converts it to grayscale
    pub fn grab_screen_image_grayscale(&mut self) -> Result<GrayImage, AutoClickError> {
        let (width, height, bitmap) = self.capture_screen()?;
        imgtools::bgra_to_grayscale(width, height, &bitmap).ok_or_else(|| {
            AutoClickError::Capture("could not convert image to grayscale".to_string())
        })
    }

    /// reads the root window into a tightly packed B, G, R, X buffer
    fn capture_screen(&mut self) -> Result<(u32, u32, Vec<u8>), AutoClickError> {
        unsafe {
            let ximage = XGetImage(
                self.display,
                self.root_window,
                0,
                0,
                self.screen_width as u32,
                self.screen_height as u32,
                ALLPLANES,
                ZPixmap,
            );
            if ximage.is_null() {
                return Err(AutoClickError::Capture(
                    "Unable to get X image. Check that you're running on x11 and not wayland"
                        .to_string(),
                ));
            }
            let width = (*ximage).width as usize;
            let height = (*ximage).height as usize;
            let stride = (*ximage).bytes_per_line as usize;
            if (*ximage).bits_per_pixel != 32 {
                let bpp = (*ximage).bits_per_pixel;
                XDestroyImage(ximage);
                return Err(AutoClickError::Capture(format!(
                    "unsupported X image depth of {bpp} bits per pixel"
                )));
            }

            let data = std::slice::from_raw_parts((*ximage).data as *const u8, stride * height);
            let mut bitmap: Vec<u8> = Vec::with_capacity(width * height * 4);
            for row in data.chunks_exact(stride) {
                bitmap.extend_from_slice(&row[..width * 4]);
            }
            XDestroyImage(ximage);
            Ok((width as u32, height as u32, bitmap))
        }
    }
}

impl Drop for Screen {
    fn drop(&mut self) {
        unsafe {
            XCloseDisplay(self.display);
        }
    }
}
