//! Placement of the photo and the table on the canvas

use crate::options::CompositeConfig;
use crate::types::{CanvasSize, Rotation};

use super::{ImagePlacement, Rect, TableLayout};

/// Canvas size for a viewport: a fixed share of the viewport width, with the
/// height following the configured template aspect ratio.
pub fn canvas_dims(viewport_width: f32, config: &CompositeConfig) -> CanvasSize {
    let width = (viewport_width * config.viewport_fraction).floor().max(1.0);
    let height = (width * config.height / config.width).floor().max(1.0);
    CanvasSize::new(width as u32, height as u32)
}

/// Box the photo is stretched into before the rotation is applied.
///
/// Quarter turns swap the effective width and height and center the box, so
/// the rotated photo exactly covers the canvas.
pub fn image_placement(canvas: CanvasSize, rotation: Rotation) -> ImagePlacement {
    let canvas_width = canvas.width as f32;
    let canvas_height = canvas.height as f32;

    let (width, height) = if rotation.is_quarter_turn() {
        (canvas_height, canvas_width)
    } else {
        (canvas_width, canvas_height)
    };

    ImagePlacement {
        left: (canvas_width - width) / 2.0,
        top: (canvas_height - height) / 2.0,
        width,
        height,
        rotation,
    }
}

/// Table bounds, anchored to the bottom-left corner of the canvas
pub fn table_bounds(layout: &TableLayout) -> Rect {
    Rect::new(
        0.0,
        layout.canvas.height as f32 - layout.table_height,
        layout.table_width,
        layout.table_height,
    )
}

/// Bounds of one row of the table
pub fn row_bounds(layout: &TableLayout, row: usize) -> Rect {
    let table = table_bounds(layout);
    Rect::new(
        table.x,
        table.y + row as f32 * layout.row_height,
        table.width,
        layout.row_height,
    )
}

/// Field-name and value cell bounds of one row
pub fn cell_bounds(layout: &TableLayout, row: usize) -> (Rect, Rect) {
    let row_rect = row_bounds(layout, row);
    let name = Rect::new(row_rect.x, row_rect.y, layout.col1_width, row_rect.height);
    let value = Rect::new(
        row_rect.x + layout.col1_width,
        row_rect.y,
        layout.col2_width,
        row_rect.height,
    );
    (name, value)
}

/// Whether a divider line is drawn below the given row.
///
/// Every row except the last gets one, so the rendered height stays exactly
/// `row_count * row_height`.
pub fn has_divider_below(layout: &TableLayout, row: usize) -> bool {
    row + 1 < layout.row_count
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::compute_table_layout;
    use crate::options::TableStyle;

    #[test]
    fn test_canvas_dims_follow_aspect() {
        let config = CompositeConfig::default();
        let canvas = canvas_dims(1080.0, &config);
        assert_eq!(canvas.width, 756);
        // 756 * 1440 / 1080
        assert_eq!(canvas.height, 1008);
    }

    #[test]
    fn test_image_placement_unrotated() {
        let canvas = CanvasSize::new(300, 400);
        for rotation in [Rotation::None, Rotation::Clockwise180] {
            let placement = image_placement(canvas, rotation);
            assert_eq!(placement.left, 0.0);
            assert_eq!(placement.top, 0.0);
            assert_eq!(placement.width, 300.0);
            assert_eq!(placement.height, 400.0);
        }
    }

    #[test]
    fn test_image_placement_quarter_turns() {
        let canvas = CanvasSize::new(300, 400);
        for rotation in [Rotation::Clockwise90, Rotation::Clockwise270] {
            let placement = image_placement(canvas, rotation);
            assert_eq!(placement.width, 400.0);
            assert_eq!(placement.height, 300.0);
            assert_eq!(placement.left, (300.0 - 400.0) / 2.0);
            assert_eq!(placement.top, (400.0 - 300.0) / 2.0);
            // Centered on the canvas
            assert_eq!(placement.rect().center_x(), 150.0);
            assert_eq!(placement.rect().center_y(), 200.0);
        }
    }

    #[test]
    fn test_table_anchored_bottom_left() {
        let fields = ["날짜", "위치", "공종"];
        let layout = compute_table_layout(
            CanvasSize::new(756, 1008),
            &fields,
            |_| None,
            &TableStyle::default(),
        );
        let bounds = table_bounds(&layout);
        assert_eq!(bounds.x, 0.0);
        assert_eq!(bounds.bottom(), 1008.0);

        let (name, value) = cell_bounds(&layout, 2);
        assert_eq!(name.bottom(), 1008.0);
        assert_eq!(value.x, layout.col1_width);

        assert!(has_divider_below(&layout, 0));
        assert!(has_divider_below(&layout, 1));
        assert!(!has_divider_below(&layout, 2));
    }
}
