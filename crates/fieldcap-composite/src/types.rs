use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompositeError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
    #[error("Invalid font: {0}")]
    Font(String),
    #[error("Rendering surface is not mounted")]
    NotMounted,
    #[error("Nothing has been committed to the surface")]
    NothingCommitted,
    #[error("Render failed: {0}")]
    Render(String),
}

pub type Result<T> = std::result::Result<T, CompositeError>;

/// Clockwise rotation applied to the source photo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Rotation {
    #[default]
    None,
    Clockwise90,
    Clockwise180,
    Clockwise270,
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::None => 0,
            Rotation::Clockwise90 => 90,
            Rotation::Clockwise180 => 180,
            Rotation::Clockwise270 => 270,
        }
    }

    /// Normalizes any multiple of 90 (negative values included) to a rotation.
    /// Returns `None` for angles that are not quarter turns.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        if degrees % 90 != 0 {
            return None;
        }
        match degrees.rem_euclid(360) {
            0 => Some(Rotation::None),
            90 => Some(Rotation::Clockwise90),
            180 => Some(Rotation::Clockwise180),
            _ => Some(Rotation::Clockwise270),
        }
    }

    /// The next rotation step (+90 degrees, wrapping at 360)
    pub fn rotated_cw(self) -> Self {
        match self {
            Rotation::None => Rotation::Clockwise90,
            Rotation::Clockwise90 => Rotation::Clockwise180,
            Rotation::Clockwise180 => Rotation::Clockwise270,
            Rotation::Clockwise270 => Rotation::None,
        }
    }

    /// True for 90 and 270, where the image bounding box is transposed
    pub fn is_quarter_turn(self) -> bool {
        matches!(self, Rotation::Clockwise90 | Rotation::Clockwise270)
    }
}

/// Canvas size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// An RGBA color parsed from CSS-style hex notation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`
    pub fn parse_hex(input: &str) -> Result<Self> {
        let hex = input
            .trim()
            .strip_prefix('#')
            .ok_or_else(|| CompositeError::Config(format!("Color must start with '#': {input}")))?;

        let invalid = || CompositeError::Config(format!("Invalid color: {input}"));
        let byte = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());

        // Slicing below relies on one byte per digit
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        match hex.len() {
            3 => {
                let mut channels = [0u8; 3];
                for (i, c) in hex.chars().enumerate() {
                    let v = c.to_digit(16).ok_or_else(invalid)? as u8;
                    channels[i] = v * 17;
                }
                Ok(Color::rgb(channels[0], channels[1], channels[2]))
            }
            6 => Ok(Color::rgb(
                byte(&hex[0..2])?,
                byte(&hex[2..4])?,
                byte(&hex[4..6])?,
            )),
            8 => Ok(Color::rgba(
                byte(&hex[0..2])?,
                byte(&hex[2..4])?,
                byte(&hex[4..6])?,
                byte(&hex[6..8])?,
            )),
            _ => Err(invalid()),
        }
    }

    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    pub fn to_rgba(self) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, self.a])
    }
}

impl std::str::FromStr for Color {
    type Err = CompositeError;

    fn from_str(s: &str) -> Result<Self> {
        Color::parse_hex(s)
    }
}

#[cfg(feature = "serde")]
mod serde_impls {
    use super::*;
    use serde::{Deserialize, Serialize};

    impl Serialize for Color {
        fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
        where
            S: serde::Serializer,
        {
            serializer.serialize_str(&self.to_hex())
        }
    }

    impl<'de> Deserialize<'de> for Color {
        fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            let s = String::deserialize(deserializer)?;
            Color::parse_hex(&s).map_err(serde::de::Error::custom)
        }
    }

    // Rotations travel as plain degree numbers
    impl Serialize for Rotation {
        fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
        where
            S: serde::Serializer,
        {
            serializer.serialize_u16(self.degrees())
        }
    }

    impl<'de> Deserialize<'de> for Rotation {
        fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            let degrees = i32::deserialize(deserializer)?;
            Rotation::from_degrees(degrees)
                .ok_or_else(|| serde::de::Error::custom("Rotation must be a multiple of 90"))
        }
    }
}
