//! Layout data types for composites
//!
//! These types are the derived, read-only geometry handed from the layout
//! engine to the renderer. Coordinates are canvas pixels with the origin in
//! the top-left corner and y growing downwards.

use crate::types::{CanvasSize, Color, Rotation};

/// A rectangular area in canvas pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// X position (left edge)
    pub x: f32,
    /// Y position (top edge)
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge x coordinate
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge y coordinate
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }
}

/// Table geometry and styling computed from the canvas, entries and style
///
/// Recomputed whenever the template or the field values change; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout {
    /// Canvas the layout was computed for
    pub canvas: CanvasSize,
    /// Number of rows (one per template field)
    pub row_count: usize,
    pub font_size: f32,
    /// Uniform height of every row
    pub row_height: f32,
    pub col1_width: f32,
    pub col2_width: f32,
    pub table_width: f32,
    /// Always `row_count * row_height`
    pub table_height: f32,
    pub cell_padding_x: f32,
    pub cell_padding_y: f32,
    pub border_width: f32,
    pub background_color: Color,
    pub border_color: Color,
    pub text_color: Color,
}

/// Box the source photo is stretched into before rotation
///
/// For quarter turns the box is transposed relative to the canvas and
/// centered, so that after rotating about its center it covers the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePlacement {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
    pub rotation: Rotation,
}

impl ImagePlacement {
    pub fn rect(&self) -> Rect {
        Rect::new(self.left, self.top, self.width, self.height)
    }
}
