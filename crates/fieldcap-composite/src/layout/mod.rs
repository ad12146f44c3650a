//! Layout calculation modules for composites
//!
//! This module handles all the geometric calculations for a composite:
//! - Table sizing (font size, column widths, row height)
//! - Placement (canvas size, rotated photo box, table anchor, cell rects)
//! - Text fitting (single-line truncation with an ellipsis)

mod placement;
mod table;
mod text;
mod types;

pub use placement::*;
pub use table::*;
pub use text::*;
pub use types::*;
