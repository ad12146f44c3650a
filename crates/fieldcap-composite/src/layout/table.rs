//! Table sizing
//!
//! Maps canvas size, ordered field names, their current values and the table
//! style to a [`TableLayout`]. Pure and cheap; safe to call on every keystroke.

use crate::constants::*;
use crate::options::TableStyle;
use crate::types::CanvasSize;

use super::TableLayout;

// =============================================================================
// Font and Text Metrics
// =============================================================================

/// Font size scaled from the style's reference canvas, never below 10px.
pub fn scaled_font_size(canvas_width: f32, style: &TableStyle) -> f32 {
    (canvas_width * style.font_px / style.reference_canvas_width)
        .floor()
        .max(MIN_FONT_SIZE)
}

/// Estimated pixel width of `text` at `font_size`.
///
/// Uses a fixed average glyph width instead of real glyph metrics.
pub fn estimate_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size * GLYPH_WIDTH_RATIO
}

// =============================================================================
// Table Layout
// =============================================================================

/// Compute the table geometry for a composite.
///
/// # Arguments
/// * `canvas` - Canvas size in pixels
/// * `entries` - Field names in row order
/// * `value_of` - Current value of a field (`None` is treated as empty)
/// * `style` - Table style configuration
pub fn compute_table_layout<'v, S, F>(
    canvas: CanvasSize,
    entries: &[S],
    value_of: F,
    style: &TableStyle,
) -> TableLayout
where
    S: AsRef<str>,
    F: Fn(&str) -> Option<&'v str>,
{
    let canvas_width = canvas.width as f32;
    let font_size = scaled_font_size(canvas_width, style);

    let min_col1 = font_size * COL1_MIN_CHARS * MIN_WIDTH_SLACK;
    let min_col2 = font_size * COL2_MIN_CHARS * MIN_WIDTH_SLACK;
    let nominal_col1 = canvas_width * style.col1_ratio * COL1_NOMINAL_FACTOR;

    let (name_text_max, value_text_max) =
        entries
            .iter()
            .fold((0.0f32, 0.0f32), |(names, values), entry| {
                let field = entry.as_ref();
                let value = value_of(field).unwrap_or("");
                (
                    names.max(estimate_text_width(field, font_size)),
                    values.max(estimate_text_width(value, font_size)),
                )
            });

    let text_slack = style.cell_padding_x * 2.0 + TEXT_WIDTH_SLACK;
    let mut col1_width = nominal_col1.max(min_col1).max(name_text_max + text_slack);
    let mut col2_width = min_col2.max(value_text_max + text_slack);

    let min_table_width = canvas_width * style.min_table_width_ratio;
    let max_table_width = canvas_width * MAX_TABLE_WIDTH_RATIO;
    let mut table_width = min_table_width.max(col1_width + col2_width);

    if table_width > max_table_width {
        // Column 2 is the elastic column; column 1 drops its text-driven growth
        col1_width = nominal_col1.max(min_col1);
        table_width = max_table_width;
        col2_width = table_width - col1_width;
    }

    let row_count = entries.len();
    let row_height = font_size * ROW_HEIGHT_FACTOR;

    TableLayout {
        canvas,
        row_count,
        font_size,
        row_height,
        col1_width,
        col2_width,
        table_width,
        table_height: row_count as f32 * row_height,
        cell_padding_x: style.cell_padding_x,
        cell_padding_y: style.cell_padding_y,
        border_width: style.border_width,
        background_color: style.background_color,
        border_color: style.border_color,
        text_color: style.text_color,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-3,
            "expected {expected}, got {actual}"
        );
    }

    fn layout_for(width: u32, fields: &[&str], values: &HashMap<String, String>) -> TableLayout {
        compute_table_layout(
            CanvasSize::new(width, width * 4 / 3),
            fields,
            |f| values.get(f).map(String::as_str),
            &TableStyle::default(),
        )
    }

    #[test]
    fn test_font_size_scales_with_canvas() {
        let style = TableStyle::default();
        // 756 * 16 / 1080 = 11.2
        assert_eq!(scaled_font_size(756.0, &style), 11.0);
        assert_eq!(scaled_font_size(1080.0, &style), 16.0);
    }

    #[test]
    fn test_font_size_floor() {
        let style = TableStyle::default();
        assert_eq!(scaled_font_size(1.0, &style), 10.0);
        assert_eq!(scaled_font_size(300.0, &style), 10.0);
    }

    #[test]
    fn test_text_width_counts_chars_not_bytes() {
        assert_close(estimate_text_width("날짜", 10.0), 12.0);
        assert_close(estimate_text_width("ab", 10.0), 12.0);
        assert_eq!(estimate_text_width("", 10.0), 0.0);
    }

    #[test]
    fn test_short_entries_use_minimum_table_width() {
        let mut values = HashMap::new();
        values.insert("날짜".to_string(), "2026-10-19".to_string());
        let layout = layout_for(756, &["날짜", "위치"], &values);

        assert_eq!(layout.font_size, 11.0);
        // nominal 756 * 0.3 * 2/3 beats both the minimum and the text width
        assert_close(layout.col1_width, 151.2);
        // 11 * 9 * 1.1 beats 10 chars * 6.6 + 24
        assert_close(layout.col2_width, 108.9);
        // min table width 756 * 0.5 dominates the column sum
        assert_close(layout.table_width, 378.0);
        assert_eq!(layout.row_height, 22.0);
        assert_eq!(layout.table_height, 44.0);
    }

    #[test]
    fn test_long_value_grows_column_two() {
        let mut values = HashMap::new();
        values.insert("위치".to_string(), "x".repeat(40));
        let layout = layout_for(756, &["위치"], &values);

        // 40 * 11 * 0.6 + 2 * 6 + 12
        assert_close(layout.col2_width, 288.0);
        assert_close(layout.table_width, 151.2 + 288.0);
    }

    #[test]
    fn test_overflow_clamps_to_cap() {
        let mut values = HashMap::new();
        values.insert("비고".to_string(), "y".repeat(200));
        let long_field = "f".repeat(60);
        values.insert(long_field.clone(), "short".to_string());
        let layout = layout_for(756, &["비고", long_field.as_str()], &values);

        assert_close(layout.table_width, 756.0 * 0.95);
        // Text-driven growth of column 1 is dropped under pressure
        assert_close(layout.col1_width, 151.2);
        assert_eq!(layout.col1_width + layout.col2_width, layout.table_width);
    }

    #[test]
    fn test_empty_entries() {
        let values = HashMap::new();
        let layout = layout_for(756, &[], &values);

        assert_eq!(layout.row_count, 0);
        assert_eq!(layout.table_height, 0.0);
        assert_close(layout.col1_width, 151.2);
        assert_close(layout.col2_width, 108.9);
    }

    #[test]
    fn test_row_height_ignores_content() {
        let mut values = HashMap::new();
        values.insert("a".to_string(), "z".repeat(500));
        let long = layout_for(756, &["a", "b", "c"], &values);
        let short = layout_for(756, &["a", "b", "c"], &HashMap::new());

        assert_eq!(long.row_height, short.row_height);
        assert_eq!(long.table_height, 3.0 * long.row_height);
    }

    #[test]
    fn test_missing_value_is_empty() {
        let values = HashMap::new();
        let layout = layout_for(1080, &["공사일"], &values);
        assert_close(layout.col2_width, 16.0 * 9.0 * 1.1);
    }
}
