use std::mem::{size_of, zeroed};

use winapi::shared::windef::POINT;
use winapi::um::winuser::{
    GetCursorPos, SendInput, SetCursorPos, INPUT, INPUT_MOUSE, MOUSEEVENTF_LEFTDOWN,
    MOUSEEVENTF_LEFTUP,
};

use crate::errors::AutoClickError;

#[derive(Debug, Default)]
pub struct Mouse {}

impl Mouse {
    pub fn new() -> Result<Self, AutoClickError> {
        Ok(Mouse {})
    }

    /// moves mouse to x, y pixel coordinate on screen
    pub fn move_mouse_to_pos(&self, x: i32, y: i32) -> Result<(), AutoClickError> {
        if unsafe { SetCursorPos(x, y) } == 0 {
            return Err(AutoClickError::OSFailure(format!(
                "SetCursorPos failed for x={x} y={y}"
            )));
        }
        Ok(())
    }

    /// returns x, y pixel coordinate of mouse position
    pub fn get_mouse_position(&self) -> Result<(i32, i32), AutoClickError> {
        let mut point = POINT { x: 0, y: 0 };
        if unsafe { GetCursorPos(&mut point) } == 0 {
            return Err(AutoClickError::OSFailure(
                "Unable to query pointer position".to_string(),
            ));
        }
        Ok((point.x, point.y))
    }

    /// left click at the current pointer position
    pub fn mouse_click(&self) -> Result<(), AutoClickError> {
        unsafe {
            let mut inputs: [INPUT; 2] = [zeroed(), zeroed()];
            inputs[0].type_ = INPUT_MOUSE;
            inputs[0].u.mi_mut().dwFlags = MOUSEEVENTF_LEFTDOWN;
            inputs[1].type_ = INPUT_MOUSE;
            inputs[1].u.mi_mut().dwFlags = MOUSEEVENTF_LEFTUP;
            let sent = SendInput(2, inputs.as_mut_ptr(), size_of::<INPUT>() as i32);
            if sent != 2 {
                return Err(AutoClickError::OSFailure(
                    "SendInput was blocked".to_string(),
                ));
            }
        }
        Ok(())
    }
}
