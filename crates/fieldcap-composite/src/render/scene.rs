use std::path::PathBuf;

use crate::layout::{TableLayout, compute_table_layout};
use crate::options::TableStyle;
use crate::types::{CanvasSize, Rotation};

/// Everything the renderer needs to draw one composite
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    /// Source photo on disk
    pub source: PathBuf,
    pub rotation: Rotation,
    pub layout: TableLayout,
    /// (field name, trimmed value) in row order
    pub rows: Vec<(String, String)>,
}

impl Scene {
    /// Build a scene, computing the table layout from the entries and values
    pub fn new<'v, S, F>(
        source: impl Into<PathBuf>,
        rotation: Rotation,
        canvas: CanvasSize,
        entries: &[S],
        value_of: F,
        style: &TableStyle,
    ) -> Self
    where
        S: AsRef<str>,
        F: Fn(&str) -> Option<&'v str>,
    {
        let layout = compute_table_layout(canvas, entries, &value_of, style);
        let rows = entries
            .iter()
            .map(|entry| {
                let field = entry.as_ref();
                let value = value_of(field).unwrap_or("").trim();
                (field.to_string(), value.to_string())
            })
            .collect();

        Self {
            source: source.into(),
            rotation,
            layout,
            rows,
        }
    }
}
