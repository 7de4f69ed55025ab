//! Line-based user interface: command parsing and plain-text views.

pub mod input;
pub mod render;
