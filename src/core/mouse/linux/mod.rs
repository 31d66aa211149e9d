use std::os::raw::c_ulong;
use std::ptr;

use x11::xlib::*;
use x11::xtest::*;

use crate::errors::AutoClickError;

const LEFT_BUTTON: u32 = 1;

#[derive(Debug)]
pub struct Mouse {
    display: *mut _XDisplay,
    root_window: c_ulong,
}

impl Mouse {
    pub fn new() -> Result<Self, AutoClickError> {
        unsafe {
            let display: *mut _XDisplay = XOpenDisplay(ptr::null());
            if display.is_null() {
                return Err(AutoClickError::OSFailure(
                    "Unable to open X display for pointer control".to_string(),
                ));
            }
            let mut event_base = 0;
            let mut error_base = 0;
            let mut major = 0;
            let mut minor = 0;
            if XTestQueryExtension(
                display,
                &mut event_base,
                &mut error_base,
                &mut major,
                &mut minor,
            ) == 0
            {
                XCloseDisplay(display);
                return Err(AutoClickError::OSFailure(
                    "XTest extension not available".to_string(),
                ));
            }
            let root_window = XRootWindow(display, XDefaultScreen(display));
            Ok(Self {
                display,
                root_window,
            })
        }
    }

    /// moves mouse to x, y pixel coordinate on screen
    pub fn move_mouse_to_pos(&self, x: i32, y: i32) -> Result<(), AutoClickError> {
        unsafe {
            XWarpPointer(self.display, 0, self.root_window, 0, 0, 0, 0, x, y);
            XFlush(self.display);
        }
        Ok(())
    }

    /// returns x, y pixel coordinate of mouse position
    pub fn get_mouse_position(&self) -> Result<(i32, i32), AutoClickError> {
        unsafe {
            let mut root_return = 0;
            let mut child_return = 0;
            let mut root_x = 0;
            let mut root_y = 0;
            let mut win_x = 0;
            let mut win_y = 0;
            let mut mask_return = 0;

            let status = XQueryPointer(
                self.display,
                self.root_window,
                &mut root_return,
                &mut child_return,
                &mut root_x,
                &mut root_y,
                &mut win_x,
                &mut win_y,
                &mut mask_return,
            );
            if status == 0 {
                return Err(AutoClickError::OSFailure(
                    "Unable to query pointer position".to_string(),
                ));
            }
            Ok((root_x, root_y))
        }
    }

    /// left click at the current pointer position
    pub fn mouse_click(&self) -> Result<(), AutoClickError> {
        unsafe {
            let pressed = XTestFakeButtonEvent(self.display, LEFT_BUTTON, 1, CurrentTime);
            XFlush(self.display);
            let released = XTestFakeButtonEvent(self.display, LEFT_BUTTON, 0, CurrentTime);
            XFlush(self.display);
            if pressed == 0 || released == 0 {
                return Err(AutoClickError::OSFailure(
                    "XTest refused the button event".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl Drop for Mouse {
    fn drop(&mut self) {
        unsafe {
            XCloseDisplay(self.display);
        }
    }
}
