use crate::constants::*;
use crate::types::*;
use std::path::PathBuf;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Styling of the data table overlay
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TableStyle {
    /// Base font size at `reference_canvas_width`
    pub font_px: f32,
    /// Canvas width `font_px` was authored against
    pub reference_canvas_width: f32,
    /// Fraction of the canvas width nominally reserved for column 1
    pub col1_ratio: f32,
    /// Fraction of the canvas width the table never shrinks below
    pub min_table_width_ratio: f32,
    pub cell_padding_x: f32,
    pub cell_padding_y: f32,
    pub border_width: f32,
    pub background_color: Color,
    pub border_color: Color,
    pub text_color: Color,
}

impl Default for TableStyle {
    fn default() -> Self {
        Self {
            font_px: 16.0,
            reference_canvas_width: 1080.0,
            col1_ratio: 0.3,
            min_table_width_ratio: 0.5,
            cell_padding_x: 6.0,
            cell_padding_y: 2.0,
            border_width: 1.0,
            background_color: Color::rgba(255, 255, 255, 0xd9),
            border_color: Color::BLACK,
            text_color: Color::BLACK,
        }
    }
}

/// Composite canvas configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CompositeConfig {
    /// Template width; together with `height` it fixes the canvas aspect ratio
    pub width: f32,
    pub height: f32,
    /// Share of the viewport width used by the canvas
    pub viewport_fraction: f32,
    /// Font used for table text (TTF/OTF). Tables render without text when unset.
    pub font_path: Option<PathBuf>,
    pub table: TableStyle,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            width: 1080.0,
            height: 1440.0,
            viewport_fraction: DEFAULT_VIEWPORT_FRACTION,
            font_path: None,
            table: TableStyle::default(),
        }
    }
}

impl CompositeConfig {
    /// Load configuration from a JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let config: Self = serde_json::from_slice(&bytes)
            .map_err(|e| CompositeError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CompositeError::Config(format!("Failed to serialize config: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(CompositeError::Config(
                "Template width and height must be positive".to_string(),
            ));
        }

        let ratios = [
            ("viewport_fraction", self.viewport_fraction),
            ("col1_ratio", self.table.col1_ratio),
            ("min_table_width_ratio", self.table.min_table_width_ratio),
        ];
        for (name, value) in ratios {
            if !(value > 0.0 && value <= 1.0) {
                return Err(CompositeError::Config(format!(
                    "{name} must be in (0, 1], got {value}"
                )));
            }
        }

        if self.table.font_px <= 0.0 || self.table.reference_canvas_width <= 0.0 {
            return Err(CompositeError::Config(
                "font_px and reference_canvas_width must be positive".to_string(),
            ));
        }

        if self.table.cell_padding_x < 0.0
            || self.table.cell_padding_y < 0.0
            || self.table.border_width < 0.0
        {
            return Err(CompositeError::Config(
                "Paddings and border width cannot be negative".to_string(),
            ));
        }

        Ok(())
    }
}

/// JPEG encoding settings for captures, uploads and thumbnails
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EncodeOptions {
    pub capture_quality: u8,
    /// Downscale uploads to this width before sending (aspect ratio kept)
    pub upload_max_width: Option<u32>,
    pub upload_quality: u8,
    pub thumbnail_max_width: u32,
    pub thumbnail_max_height: u32,
    pub thumbnail_quality: u8,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            capture_quality: CAPTURE_JPEG_QUALITY,
            upload_max_width: None,
            upload_quality: UPLOAD_JPEG_QUALITY,
            thumbnail_max_width: THUMBNAIL_MAX_WIDTH,
            thumbnail_max_height: THUMBNAIL_MAX_HEIGHT,
            thumbnail_quality: THUMBNAIL_JPEG_QUALITY,
        }
    }
}

impl EncodeOptions {
    /// Settings of the single-image flow, which downsizes before sending
    pub fn single_image() -> Self {
        Self {
            upload_max_width: Some(UPLOAD_MAX_WIDTH),
            ..Self::default()
        }
    }
}
