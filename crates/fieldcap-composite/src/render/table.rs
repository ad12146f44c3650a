use ab_glyph::{FontArc, PxScale};
use image::RgbaImage;
use imageproc::drawing::{Blend, draw_filled_rect_mut, draw_text_mut, text_size};

use crate::constants::DIVIDER_WIDTH;
use crate::layout::{Rect, TableLayout, cell_bounds, fit_text, has_divider_below, table_bounds};
use crate::types::Color;

/// Draw the data table anchored to the bottom-left corner of the canvas.
///
/// Each row shows the field name in column 1 and the value in column 2, with
/// a divider between the columns and between rows (none after the last row).
/// Text is clipped to one line and truncated with an ellipsis.
pub fn draw_table(
    target: &mut RgbaImage,
    layout: &TableLayout,
    rows: &[(String, String)],
    font: Option<&FontArc>,
) {
    if layout.row_count == 0 {
        return;
    }

    let bounds = table_bounds(layout);
    let divider = DIVIDER_WIDTH as f32;

    // Grid shapes are alpha-blended over the photo
    let mut canvas = Blend(std::mem::take(target));
    fill_rect(&mut canvas, bounds, layout.background_color);
    for row in 0..layout.row_count {
        let (name_cell, _) = cell_bounds(layout, row);

        // Column divider on the right edge of the name cell
        fill_rect(
            &mut canvas,
            Rect::new(name_cell.right() - divider, name_cell.y, divider, name_cell.height),
            layout.border_color,
        );

        if has_divider_below(layout, row) {
            fill_rect(
                &mut canvas,
                Rect::new(bounds.x, name_cell.bottom() - divider, bounds.width, divider),
                layout.border_color,
            );
        }
    }
    draw_border(&mut canvas, bounds, layout.border_width, layout.border_color);
    *target = canvas.0;

    if let Some(font) = font {
        for (row, (field, value)) in rows.iter().enumerate().take(layout.row_count) {
            let (name_cell, value_cell) = cell_bounds(layout, row);
            draw_cell_text(target, layout, name_cell, field, font);
            draw_cell_text(target, layout, value_cell, value, font);
        }
    }
}

fn draw_cell_text(
    target: &mut RgbaImage,
    layout: &TableLayout,
    cell: Rect,
    text: &str,
    font: &FontArc,
) {
    if text.is_empty() {
        return;
    }

    let scale = PxScale::from(layout.font_size);
    let available = cell.width - 2.0 * layout.cell_padding_x;
    let fitted = fit_text(text, available, |t| text_size(scale, font, t).0 as f32);
    if fitted.is_empty() {
        return;
    }

    let (_, text_height) = text_size(scale, font, &fitted);
    let x = cell.x + layout.cell_padding_x;
    // Vertically centered within the row
    let y = cell.y + (cell.height - text_height as f32) / 2.0;

    draw_text_mut(
        target,
        layout.text_color.to_rgba(),
        x.round() as i32,
        y.round() as i32,
        scale,
        font,
        &fitted,
    );
}

/// Outer border drawn inside the table bounds
fn draw_border(canvas: &mut Blend<RgbaImage>, bounds: Rect, width: f32, color: Color) {
    if width <= 0.0 {
        return;
    }
    let w = width.min(bounds.width / 2.0).min(bounds.height / 2.0);
    fill_rect(canvas, Rect::new(bounds.x, bounds.y, bounds.width, w), color);
    fill_rect(
        canvas,
        Rect::new(bounds.x, bounds.bottom() - w, bounds.width, w),
        color,
    );
    fill_rect(canvas, Rect::new(bounds.x, bounds.y, w, bounds.height), color);
    fill_rect(
        canvas,
        Rect::new(bounds.right() - w, bounds.y, w, bounds.height),
        color,
    );
}

/// Fill a layout rectangle snapped to whole pixels; empty rectangles are skipped
fn fill_rect(canvas: &mut Blend<RgbaImage>, rect: Rect, color: Color) {
    let x0 = rect.x.round() as i32;
    let y0 = rect.y.round() as i32;
    let width = (rect.right().round() as i32 - x0).max(0) as u32;
    let height = (rect.bottom().round() as i32 - y0).max(0) as u32;
    if width == 0 || height == 0 {
        return;
    }
    draw_filled_rect_mut(
        canvas,
        imageproc::rect::Rect::at(x0, y0).of_size(width, height),
        color.to_rgba(),
    );
}
