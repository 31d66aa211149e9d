//! Platform screen capture and pointer control.

pub mod mouse;
pub mod screen;
