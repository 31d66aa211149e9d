use std::thread::sleep;
use std::time::Duration;

use core_graphics::event::{CGEvent, CGEventTapLocation, CGEventType, CGMouseButton};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
use core_graphics::geometry::CGPoint;

use crate::errors::AutoClickError;

#[derive(Debug, Default)]
pub struct Mouse {}

impl Mouse {
    pub fn new() -> Result<Self, AutoClickError> {
        Ok(Self {})
    }

    fn source() -> Result<CGEventSource, AutoClickError> {
        CGEventSource::new(CGEventSourceStateID::HIDSystemState).map_err(|_| {
            AutoClickError::OSFailure("Failed to create CGEventSource".to_string())
        })
    }

    fn post(event_type: CGEventType, x: i32, y: i32) -> Result<(), AutoClickError> {
        let event = CGEvent::new_mouse_event(
            Self::source()?,
            event_type,
            CGPoint::new(x as f64, y as f64),
            CGMouseButton::Left,
        )
        .map_err(|_| AutoClickError::OSFailure("Failed to create mouse event".to_string()))?;
        event.post(CGEventTapLocation::HID);
        Ok(())
    }

    /// moves mouse to x, y pixel coordinate on screen
    pub fn move_mouse_to_pos(&self, x: i32, y: i32) -> Result<(), AutoClickError> {
        Self::post(CGEventType::MouseMoved, x, y)?;
        sleep(Duration::from_millis(20));
        Ok(())
    }

    /// Gets the current mouse position.
    pub fn get_mouse_position(&self) -> Result<(i32, i32), AutoClickError> {
        let event = CGEvent::new(Self::source()?)
            .map_err(|_| AutoClickError::OSFailure("Failed to create CGEvent".to_string()))?;
        let point = event.location();
        Ok((point.x as i32, point.y as i32))
    }

    /// left click at the current pointer position
    pub fn mouse_click(&self) -> Result<(), AutoClickError> {
        let (x, y) = self.get_mouse_position()?;
        Self::post(CGEventType::LeftMouseDown, x, y)?;
        Self::post(CGEventType::LeftMouseUp, x, y)
    }
}
