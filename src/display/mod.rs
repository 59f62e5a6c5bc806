//! Display state shared by the read and write paths.

mod board;
mod render;

pub use board::{Color, DisplayBoard, Element, ElementId, Frame, Snapshot};
pub use render::{Layout, Line, Slot};
