/// Color utilities for photo backgrounds and outlines
///
/// This module handles:
/// - Parsing user color strings (hex like "#3b82f6", or any CSS color)
/// - Compositing a possibly transparent pixel over an opaque fill
/// - Converting to the PDF color model

use std::fmt;
use std::str::FromStr;

use image::{Rgb, Rgba};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TransformError;

/// An opaque sRGB color
///
/// Colors with an alpha component are flattened over white when parsed, so a
/// `Color` can always be used as a fill without introducing transparency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a color string
    ///
    /// Accepts `#rgb`, `#rrggbb`, `#rrggbbaa` and CSS color names or
    /// functions. Semi-transparent colors are flattened over white.
    pub fn parse(input: &str) -> Result<Self, TransformError> {
        let parsed = csscolorparser::parse(input.trim())
            .map_err(|_| TransformError::InvalidColor(input.to_string()))?;
        let [r, g, b, a] = parsed.to_rgba8();
        Ok(Color::WHITE.composite(Rgba([r, g, b, a])))
    }

    /// Lower-case `#rrggbb`
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn to_pixel(&self) -> Rgb<u8> {
        Rgb([self.r, self.g, self.b])
    }

    /// Source-over composite of `pixel` onto this color
    ///
    /// Fully opaque pixels pass through unchanged; fully transparent ones
    /// yield this color.
    pub fn composite(&self, pixel: Rgba<u8>) -> Color {
        let [r, g, b, a] = pixel.0;
        let a = a as u32;
        let blend = |src: u8, dst: u8| -> u8 {
            ((src as u32 * a + dst as u32 * (255 - a) + 127) / 255) as u8
        };
        Color {
            r: blend(r, self.r),
            g: blend(g, self.g),
            b: blend(b, self.b),
        }
    }

    /// Composite straight into an output pixel
    pub fn composite_pixel(&self, pixel: Rgba<u8>) -> Rgb<u8> {
        self.composite(pixel).to_pixel()
    }

    /// Components scaled to 0.0..=1.0, as the PDF writer expects
    pub fn to_unit_rgb(&self) -> (f32, f32, f32) {
        (
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        )
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::parse(s)
    }
}

// Stored and exchanged as hex strings
impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Color::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!(Color::parse("#ffffff").unwrap(), Color::WHITE);
        assert_eq!(Color::parse("#000").unwrap(), Color::BLACK);
        assert_eq!(Color::parse("#3b82f6").unwrap(), Color::rgb(0x3b, 0x82, 0xf6));
        assert_eq!(Color::parse("  #EF4444 ").unwrap(), Color::rgb(0xef, 0x44, 0x44));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            Color::parse("not-a-color"),
            Err(TransformError::InvalidColor(_))
        ));
    }

    #[test]
    fn test_translucent_color_is_flattened() {
        let color = Color::parse("#00000000").unwrap();
        assert_eq!(color, Color::WHITE);
    }

    #[test]
    fn test_hex_round_trip() {
        let color = Color::rgb(0x22, 0xc5, 0x5e);
        assert_eq!(color.to_hex(), "#22c55e");
        assert_eq!(Color::parse(&color.to_hex()).unwrap(), color);
    }

    #[test]
    fn test_composite_extremes() {
        let bg = Color::rgb(10, 20, 30);
        assert_eq!(bg.composite(Rgba([200, 100, 50, 255])), Color::rgb(200, 100, 50));
        assert_eq!(bg.composite(Rgba([200, 100, 50, 0])), bg);
    }

    #[test]
    fn test_composite_half_alpha() {
        let mixed = Color::WHITE.composite(Rgba([0, 0, 0, 128]));
        assert_eq!(mixed, Color::rgb(127, 127, 127));
    }

    #[test]
    fn test_serde_as_hex_string() {
        let json = serde_json::to_string(&Color::rgb(255, 0, 0)).unwrap();
        assert_eq!(json, "\"#ff0000\"");
        let back: Color = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Color::rgb(255, 0, 0));
    }
}
