use std::mem::size_of;
use std::ptr::null_mut;

use image::GrayImage;
use winapi::shared::minwindef::{DWORD, HGLOBAL, LPVOID, UINT};
use winapi::shared::windef::{HBITMAP__, HDC__};
use winapi::um::wingdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDIBits,
    SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, RGBQUAD, SRCCOPY,
};
use winapi::um::winuser::{GetDC, GetSystemMetrics, ReleaseDC, SM_CXSCREEN, SM_CYSCREEN};

use crate::errors::AutoClickError;
use crate::imgtools;

#[derive(Debug)]
pub struct Screen {
    pub screen_width: i32,
    pub screen_height: i32,
    h_screen_dc: *mut HDC__,
    h_memory_dc: *mut HDC__,
    h_bitmap: *mut HBITMAP__,
}

impl Screen {
    pub fn new() -> Result<Self, AutoClickError> {
        unsafe {
            let screen_width = GetSystemMetrics(SM_CXSCREEN);
            let screen_height = GetSystemMetrics(SM_CYSCREEN);
            // device context of the whole screen
            let h_screen_dc = GetDC(null_mut());
            if h_screen_dc.is_null() {
                return Err(AutoClickError::OSFailure(
                    "Failed to get screen device context".to_string(),
                ));
            }
            // in-memory copy that BitBlt writes the screen into
            let h_memory_dc = CreateCompatibleDC(h_screen_dc);
            let h_bitmap = CreateCompatibleBitmap(h_screen_dc, screen_width, screen_height);
            if h_memory_dc.is_null() || h_bitmap.is_null() {
                // release whichever handle was created
                if !h_bitmap.is_null() {
                    DeleteObject(h_bitmap as HGLOBAL);
                }
                if !h_memory_dc.is_null() {
                    DeleteDC(h_memory_dc);
                }
                ReleaseDC(null_mut(), h_screen_dc);
                return Err(AutoClickError::OSFailure(
                    "Failed to create compatible bitmap".to_string(),
                ));
            }
            Ok(Self {
                screen_width,
                screen_height,
                h_screen_dc,
                h_memory_dc,
                h_bitmap,
            })
        }
    }

    pub fn dimension(&self) -> (i32, i32) {
        (self.screen_width, self.screen_height)
    }

    /// captures the primary screen and converts it to grayscale
    pub fn grab_screen_image_grayscale(&mut self) -> Result<GrayImage, AutoClickError> {
        let bitmap = self.capture_screen()?;
        imgtools::bgra_to_grayscale(self.screen_width as u32, self.screen_height as u32, &bitmap)
            .ok_or_else(|| {
                AutoClickError::Capture("could not convert image to grayscale".to_string())
            })
    }

    fn capture_screen(&mut self) -> Result<Vec<u8>, AutoClickError> {
        unsafe {
            SelectObject(self.h_memory_dc, self.h_bitmap as HGLOBAL);
            let copied = BitBlt(
                self.h_memory_dc,
                0,
                0,
                self.screen_width,
                self.screen_height,
                self.h_screen_dc,
                0,
                0,
                SRCCOPY,
            );
            if copied == 0 {
                return Err(AutoClickError::Capture("BitBlt failed".to_string()));
            }
            let mut bitmap_info = BITMAPINFO {
                bmiHeader: BITMAPINFOHEADER {
                    biSize: size_of::<BITMAPINFOHEADER>() as DWORD,
                    biWidth: self.screen_width,
                    biHeight: -self.screen_height, // negative for a top-down DIB
                    biPlanes: 1,
                    biBitCount: 32,
                    biCompression: BI_RGB,
                    biSizeImage: 0,
                    biXPelsPerMeter: 0,
                    biYPelsPerMeter: 0,
                    biClrUsed: 0,
                    biClrImportant: 0,
                },
                bmiColors: [RGBQUAD {
                    rgbBlue: 0,
                    rgbGreen: 0,
                    rgbRed: 0,
                    rgbReserved: 0,
                }; 1],
            };

            let mut bitmap_data: Vec<u8> =
                vec![0u8; (self.screen_width * self.screen_height * 4) as usize];
            let lines = GetDIBits(
                self.h_memory_dc,
                self.h_bitmap,
                0,
                self.screen_height as UINT,
                bitmap_data.as_mut_ptr() as LPVOID,
                &mut bitmap_info,
                DIB_RGB_COLORS,
            );
            if lines == 0 {
                return Err(AutoClickError::Capture("GetDIBits failed".to_string()));
            }
            Ok(bitmap_data)
        }
    }
}

impl Drop for Screen {
    fn drop(&mut self) {
        unsafe {
            DeleteObject(self.h_bitmap as HGLOBAL);
            DeleteDC(self.h_memory_dc);
            ReleaseDC(null_mut(), self.h_screen_dc);
        }
    }
}
