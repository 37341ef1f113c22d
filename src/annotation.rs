use std::fmt;
use std::str::FromStr;

use serde::{de::Visitor, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::measure::TextMeasure;

pub type TextId = u64;

/// Line height as a multiple of the font size.
pub const LINE_HEIGHT_FACTOR: f32 = 1.2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const WHITE: Self = Self([255, 255, 255, 255]);
    pub const BLACK: Self = Self([0, 0, 0, 255]);
    pub const SELECTION: Self = Self([0x34, 0x98, 0xdb, 255]);
    pub const EDITING: Self = Self([0xff, 0x99, 0x00, 255]);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }

    pub fn with_alpha(self, alpha: u8) -> Self {
        let [r, g, b, _] = self.0;
        Self([r, g, b, alpha])
    }

    pub fn alpha(self) -> u8 {
        self.0[3]
    }

    pub fn to_hex(self) -> String {
        let [r, g, b, a] = self.0;
        if a == 255 {
            format!("#{r:02x}{g:02x}{b:02x}")
        } else {
            format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid color '{0}', expected #rrggbb or #rrggbbaa")]
pub struct ParseColorError(String);

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let hex = value.trim().trim_start_matches('#');
        if !matches!(hex.len(), 6 | 8) || !hex.is_ascii() {
            return Err(ParseColorError(value.to_owned()));
        }
        let channel = |index: usize| {
            u8::from_str_radix(&hex[index * 2..index * 2 + 2], 16)
                .map_err(|_| ParseColorError(value.to_owned()))
        };
        let alpha = if hex.len() == 8 { channel(3)? } else { 255 };
        Ok(Self([channel(0)?, channel(1)?, channel(2)?, alpha]))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ColorVisitor;

        impl<'de> Visitor<'de> for ColorVisitor {
            type Value = Color;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a hex color such as #ffffff or #00000080")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                value.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(ColorVisitor)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextSize(u16);

impl TextSize {
    pub const MIN: u16 = 8;
    pub const MAX: u16 = 400;
    pub const DEFAULT: Self = Self(80);

    pub fn from_px(px: u16) -> Self {
        Self(px.clamp(Self::MIN, Self::MAX))
    }

    pub fn as_u16(self) -> u16 {
        self.0
    }

    pub fn px(self) -> f32 {
        self.0 as f32
    }
}

impl Default for TextSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Serialize for TextSize {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u16(self.0)
    }
}

impl<'de> Deserialize<'de> for TextSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TextSizeVisitor;

        impl<'de> Visitor<'de> for TextSizeVisitor {
            type Value = TextSize;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("font size in pixels, 8..400")
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(TextSize::from_px(value.min(TextSize::MAX as u64) as u16))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let clamped = value.clamp(TextSize::MIN as i64, TextSize::MAX as i64) as u16;
                Ok(TextSize::from_px(clamped))
            }

            fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if !value.is_finite() {
                    return Err(E::custom("font size must be a finite number"));
                }
                let clamped = value
                    .round()
                    .clamp(TextSize::MIN as f64, TextSize::MAX as f64) as u16;
                Ok(TextSize::from_px(clamped))
            }

            // Form inputs hand over numbers as strings ("80px" included).
            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let digits = value.trim().trim_end_matches("px");
                let parsed = digits.parse::<u64>().map_err(|_| {
                    E::custom(format!("invalid font size '{value}', expected a number"))
                })?;
                self.visit_u64(parsed)
            }
        }

        deserializer.deserialize_any(TextSizeVisitor)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontFamily {
    #[default]
    SansSerif,
    Serif,
    Monospace,
}

impl FontFamily {
    pub fn all() -> &'static [FontFamily] {
        &[FontFamily::SansSerif, FontFamily::Serif, FontFamily::Monospace]
    }
}

/// Everything that decides how a label looks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    pub size: TextSize,
    pub family: FontFamily,
    pub bold: bool,
    pub italic: bool,
    pub color: Color,
    /// Plate drawn behind the text at half opacity.
    pub background: Option<Color>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            size: TextSize::DEFAULT,
            family: FontFamily::SansSerif,
            bold: false,
            italic: false,
            color: Color::WHITE,
            background: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn delta(self, other: Point) -> Point {
        Point::new(other.x - self.x, other.y - self.y)
    }

    pub fn offset(self, delta: Point) -> Point {
        Point::new(self.x + delta.x, self.y + delta.y)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self {
            x: origin.x,
            y: origin.y,
            width: size.width,
            height: size.height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    // Edges count as inside.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    pub fn expand(&self, amount: f32) -> Self {
        Self {
            x: self.x - amount,
            y: self.y - amount,
            width: self.width + amount * 2.0,
            height: self.height + amount * 2.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TextObject {
    pub id: TextId,
    pub text: String,
    pub position: Point,
    pub style: TextStyle,
}

impl TextObject {
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n')
    }

    pub fn size(&self, measure: &dyn TextMeasure) -> Size {
        measure.measure(&self.text, &self.style)
    }

    pub fn bounds(&self, measure: &dyn TextMeasure) -> Bounds {
        Bounds::from_origin_size(self.position, self.size(measure))
    }

    pub fn contains(&self, point: Point, measure: &dyn TextMeasure) -> bool {
        self.bounds(measure).contains(point)
    }

    pub fn move_to(&mut self, position: Point) {
        self.position = position;
    }
}

pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::{is_blank, Bounds, Color, Point, Size, TextSize, TextStyle};

    #[test]
    fn color_parses_and_prints_hex() {
        let color: Color = "#3498db".parse().expect("rgb hex");
        assert_eq!(color, Color::SELECTION);
        assert_eq!(color.to_hex(), "#3498db");

        let translucent: Color = "ff990080".parse().expect("rgba hex without hash");
        assert_eq!(translucent, Color::EDITING.with_alpha(0x80));
        assert_eq!(translucent.to_hex(), "#ff990080");

        assert!("#12345".parse::<Color>().is_err());
        assert!("#gggggg".parse::<Color>().is_err());
    }

    #[test]
    fn color_serializes_as_string() {
        let json = serde_json::to_string(&Color::rgb(0, 0, 255)).expect("serialize color");
        assert_eq!(json, "\"#0000ff\"");
        let back: Color = serde_json::from_str(&json).expect("deserialize color");
        assert_eq!(back, Color::rgb(0, 0, 255));
        assert!(serde_json::from_str::<Color>("\"blue\"").is_err());
    }

    #[test]
    fn text_size_deserializes_numbers_and_form_strings() {
        let numeric: TextSize = serde_json::from_str("24").expect("numeric text size");
        assert_eq!(numeric.as_u16(), 24);

        let from_form: TextSize = serde_json::from_str("\"36px\"").expect("string text size");
        assert_eq!(from_form.as_u16(), 36);

        let clamped: TextSize = serde_json::from_str("1000").expect("clamped text size");
        assert_eq!(clamped.as_u16(), TextSize::MAX);

        let tiny: TextSize = serde_json::from_str("2.4").expect("float text size");
        assert_eq!(tiny.as_u16(), TextSize::MIN);
    }

    #[test]
    fn partial_style_fills_defaults() {
        let style: TextStyle =
            serde_json::from_str(r##"{"bold": true, "background": "#000000"}"##)
                .expect("partial style");
        assert!(style.bold);
        assert_eq!(style.size, TextSize::DEFAULT);
        assert_eq!(style.color, Color::WHITE);
        assert_eq!(style.background, Some(Color::BLACK));
    }

    #[test]
    fn bounds_contains_edges() {
        let bounds = Bounds::from_origin_size(
            Point::new(10.0, 10.0),
            Size {
                width: 20.0,
                height: 5.0,
            },
        );
        assert!(bounds.contains(Point::new(10.0, 10.0)));
        assert!(bounds.contains(Point::new(30.0, 15.0)));
        assert!(!bounds.contains(Point::new(30.5, 15.0)));
        assert_eq!(bounds.expand(2.0).width, 24.0);
    }

    #[test]
    fn blank_text_detection() {
        assert!(is_blank(""));
        assert!(is_blank(" \n\t"));
        assert!(!is_blank(" a "));
    }
}
