#![forbid(unsafe_code)]

//! Category colours.
//!
//! Hosts report a hue in degrees; items are tinted with the same muted
//! colour the canvas draws the block in (fixed saturation and value).

use std::fmt;

/// Saturation applied to every category hue.
pub const SATURATION: f64 = 0.45;
/// Value (brightness) applied to every category hue.
pub const VALUE: f64 = 0.65;

/// 24-bit colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Colour for a category hue in degrees. Hues wrap at 360.
    #[must_use]
    pub fn from_hue(hue: u16) -> Self {
        let hue = f64::from(hue % 360);
        let brightness = VALUE * 255.0;
        let sector = (hue / 60.0).floor();
        let fraction = hue / 60.0 - sector;
        let p = brightness * (1.0 - SATURATION);
        let q = brightness * (1.0 - SATURATION * fraction);
        let t = brightness * (1.0 - SATURATION * (1.0 - fraction));
        let (r, g, b) = match sector as u8 {
            0 => (brightness, t, p),
            1 => (q, brightness, p),
            2 => (p, brightness, t),
            3 => (p, q, brightness),
            4 => (t, p, brightness),
            _ => (brightness, p, q),
        };
        Self::new(channel(r), channel(g), channel(b))
    }

    /// `#rrggbb`.
    #[must_use]
    pub fn to_hex(self) -> String {
        self.to_string()
    }
}

#[inline]
fn channel(value: f64) -> u8 {
    value.floor().clamp(0.0, 255.0) as u8
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}
