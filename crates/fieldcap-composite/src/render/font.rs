use ab_glyph::FontArc;
use std::path::Path;

use crate::types::{CompositeError, Result};

/// Load a TTF/OTF font for table text
pub async fn load_font(path: impl AsRef<Path>) -> Result<FontArc> {
    let bytes = tokio::fs::read(path.as_ref()).await?;
    FontArc::try_from_vec(bytes).map_err(|e| CompositeError::Font(e.to_string()))
}
