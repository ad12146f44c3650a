//! Shared constants for composite layout and rendering
//!
//! This module centralizes the magic numbers of the table heuristics so the
//! layout engine and the renderer agree on them.

// =============================================================================
// Font Sizing
// =============================================================================

/// Smallest font size the table will use (pixels)
pub const MIN_FONT_SIZE: f32 = 10.0;

/// Average glyph width as a fraction of the font size.
/// Text width is estimated, not measured.
pub const GLYPH_WIDTH_RATIO: f32 = 0.6;

// =============================================================================
// Column Sizing
// =============================================================================

/// Column 1 nominal share of `canvas_width * col1_ratio`
pub const COL1_NOMINAL_FACTOR: f32 = 2.0 / 3.0;

/// Column 1 minimum width, in multiples of the font size
pub const COL1_MIN_CHARS: f32 = 6.0;

/// Column 2 minimum width, in multiples of the font size
pub const COL2_MIN_CHARS: f32 = 9.0;

/// Slack applied to the minimum column widths
pub const MIN_WIDTH_SLACK: f32 = 1.1;

/// Extra pixels added to text-driven column widths
pub const TEXT_WIDTH_SLACK: f32 = 12.0;

/// Table never grows past this fraction of the canvas width
pub const MAX_TABLE_WIDTH_RATIO: f32 = 0.95;

// =============================================================================
// Rows
// =============================================================================

/// Row height in multiples of the font size
pub const ROW_HEIGHT_FACTOR: f32 = 2.0;

/// Width of the row and column divider lines (pixels)
pub const DIVIDER_WIDTH: u32 = 1;

/// Appended when a cell's text is truncated
pub const ELLIPSIS: &str = "…";

// =============================================================================
// Canvas
// =============================================================================

/// Share of the viewport width the canvas occupies
pub const DEFAULT_VIEWPORT_FRACTION: f32 = 0.7;

// =============================================================================
// Encoding
// =============================================================================

/// JPEG quality of a captured composite
pub const CAPTURE_JPEG_QUALITY: u8 = 90;

/// Bounds of the thumbnail sent alongside each upload
pub const THUMBNAIL_MAX_WIDTH: u32 = 200;
pub const THUMBNAIL_MAX_HEIGHT: u32 = 150;
pub const THUMBNAIL_JPEG_QUALITY: u8 = 80;

/// Downscaled upload used by the single-image flow
pub const UPLOAD_MAX_WIDTH: u32 = 1024;
pub const UPLOAD_JPEG_QUALITY: u8 = 70;
