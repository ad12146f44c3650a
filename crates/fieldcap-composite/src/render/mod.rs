//! Raster rendering of composites
//!
//! Draws the (rotated) source photo and the data table onto an RGBA canvas,
//! and encodes the flattened result.

mod encode;
mod font;
mod photo;
mod scene;
mod table;

pub use encode::*;
pub use font::load_font;
pub use photo::draw_photo;
pub use scene::Scene;
pub use table::draw_table;

use ab_glyph::FontArc;
use image::{DynamicImage, RgbaImage};

use crate::layout::image_placement;

/// Render a complete composite: photo first, table overlay on top.
///
/// Without a font the table is drawn with its grid but no text.
pub fn render_composite(scene: &Scene, source: &DynamicImage, font: Option<&FontArc>) -> RgbaImage {
    let canvas = scene.layout.canvas;
    let mut target = RgbaImage::from_pixel(canvas.width, canvas.height, image::Rgba([0, 0, 0, 255]));

    draw_photo(&mut target, source, &image_placement(canvas, scene.rotation));
    draw_table(&mut target, &scene.layout, &scene.rows, font);

    log::debug!(
        "Rendered composite {}x{} ({} rows, rotation {})",
        canvas.width,
        canvas.height,
        scene.rows.len(),
        scene.rotation.degrees()
    );

    target
}

/// Flatten a rendered frame into JPEG bytes
pub fn flatten(frame: &RgbaImage, quality: u8) -> crate::Result<Vec<u8>> {
    encode_jpeg(&DynamicImage::ImageRgba8(frame.clone()), quality)
}
