//! Colors and the perceptual ramp.
//!
//! [`ramp`] blends two sRGB colors through CIE L\*u\*v\* (D65 white point) so
//! the steps look evenly spaced to the eye, then snaps each step back to a
//! 24-bit [`Rgb`]. Lightness uses the 0..=1 scale, so `L = 1.0` is white.

use std::{fmt, str::FromStr};

use thiserror::Error;

/// D65 reference white in XYZ.
const D65: [f64; 3] = [0.950_47, 1.000_00, 1.088_83];

/// Color parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    /// Not a `#rrggbb` hex string.
    #[error("invalid hex color: {0:?}")]
    InvalidHex(String),
}

/// A 24-bit sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Create a color from its channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` (the leading `#` is optional).
    pub fn from_hex(hex: &str) -> Result<Self, ColorError> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(ColorError::InvalidHex(hex.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map_err(|_| ColorError::InvalidHex(hex.to_string()))
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    /// Convert to L\*u\*v\*.
    pub fn to_luv(self) -> Luv {
        let [r, g, b] = [self.r, self.g, self.b].map(|c| linearize(f64::from(c) / 255.0));

        let x = 0.412_390_799_265_959_5 * r + 0.357_584_339_383_878 * g + 0.180_480_788_401_834_3 * b;
        let y = 0.212_639_005_871_510_4 * r + 0.715_168_678_767_756 * g + 0.072_192_315_360_733_7 * b;
        let z = 0.019_330_818_715_591_85 * r + 0.119_194_779_794_626 * g + 0.950_532_152_249_660_6 * b;

        xyz_to_luv(x, y, z)
    }
}

impl FromStr for Rgb {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// A color in CIE L\*u\*v\*.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Luv {
    /// Lightness, 0..=1.
    pub l: f64,
    /// Green-red chroma axis.
    pub u: f64,
    /// Blue-yellow chroma axis.
    pub v: f64,
}

impl Luv {
    /// Linear blend; `t = 0` is `self`, `t = 1` is `other`.
    pub fn blend(self, other: Self, t: f64) -> Self {
        Self {
            l: self.l + t * (other.l - self.l),
            u: self.u + t * (other.u - self.u),
            v: self.v + t * (other.v - self.v),
        }
    }

    /// Euclidean distance.
    pub fn distance(self, other: Self) -> f64 {
        ((self.l - other.l).powi(2) + (self.u - other.u).powi(2) + (self.v - other.v).powi(2))
            .sqrt()
    }

    /// Convert to the nearest 24-bit sRGB color (out-of-gamut channels are
    /// clamped).
    pub fn to_rgb(self) -> Rgb {
        let (x, y, z) = luv_to_xyz(self);

        let r = 3.240_969_941_904_521 * x - 1.537_383_177_570_093_5 * y - 0.498_610_760_293_003_3 * z;
        let g = -0.969_243_636_280_879_8 * x + 1.875_967_501_507_720_7 * y + 0.041_555_057_407_175_6 * z;
        let b = 0.055_630_079_696_993_6 * x - 0.203_976_958_888_976_57 * y + 1.056_971_514_242_878_6 * z;

        Rgb::new(quantize(r), quantize(g), quantize(b))
    }
}

/// Ramp of `steps` colors from `start` toward `end`.
///
/// Step `i` blends at `i / steps`, so the first color is `start` and the last
/// stops one step short of `end`. `steps == 0` yields an empty ramp.
pub fn ramp(start: Rgb, end: Rgb, steps: usize) -> Vec<Rgb> {
    let (from, to) = (start.to_luv(), end.to_luv());
    (0..steps).map(|i| from.blend(to, i as f64 / steps as f64).to_rgb()).collect()
}

fn linearize(c: f64) -> f64 {
    if c <= 0.040_45 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) }
}

fn delinearize(c: f64) -> f64 {
    if c <= 0.003_130_8 { 12.92 * c } else { 1.055 * c.powf(1.0 / 2.4) - 0.055 }
}

fn quantize(linear: f64) -> u8 {
    (delinearize(linear).clamp(0.0, 1.0) * 255.0).round() as u8
}

fn uv_prime(x: f64, y: f64, z: f64) -> (f64, f64) {
    let denom = x + 15.0 * y + 3.0 * z;
    if denom == 0.0 { (0.0, 0.0) } else { (4.0 * x / denom, 9.0 * y / denom) }
}

fn xyz_to_luv(x: f64, y: f64, z: f64) -> Luv {
    let yr = y / D65[1];
    let l = if yr <= (6.0_f64 / 29.0).powi(3) {
        yr * (29.0_f64 / 3.0).powi(3) / 100.0
    } else {
        1.16 * yr.cbrt() - 0.16
    };

    let (u_prime, v_prime) = uv_prime(x, y, z);
    let (un, vn) = uv_prime(D65[0], D65[1], D65[2]);

    Luv { l, u: 13.0 * l * (u_prime - un), v: 13.0 * l * (v_prime - vn) }
}

fn luv_to_xyz(luv: Luv) -> (f64, f64, f64) {
    if luv.l <= 0.0 {
        return (0.0, 0.0, 0.0);
    }

    let y = if luv.l <= 0.08 {
        D65[1] * luv.l * 100.0 * (3.0_f64 / 29.0).powi(3)
    } else {
        D65[1] * ((luv.l + 0.16) / 1.16).powi(3)
    };

    let (un, vn) = uv_prime(D65[0], D65[1], D65[2]);
    let u_prime = luv.u / (13.0 * luv.l) + un;
    let v_prime = luv.v / (13.0 * luv.l) + vn;
    if v_prime == 0.0 {
        return (0.0, y, 0.0);
    }

    let x = y * 9.0 * u_prime / (4.0 * v_prime);
    let z = y * (12.0 - 3.0 * u_prime - 20.0 * v_prime) / (4.0 * v_prime);
    (x, y, z)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PURPLE: Rgb = Rgb::new(0xb1, 0x4f, 0xff);
    const MINT: Rgb = Rgb::new(0x00, 0xff, 0xa3);

    #[test]
    fn parses_hex() {
        assert_eq!(Rgb::from_hex("#B14FFF"), Ok(PURPLE));
        assert_eq!("00ffa3".parse(), Ok(MINT));
        assert!(Rgb::from_hex("#B14FF").is_err());
        assert!(Rgb::from_hex("#GGGGGG").is_err());
        assert!(Rgb::from_hex("#ééé").is_err());
    }

    #[test]
    fn displays_hex() {
        assert_eq!(PURPLE.to_string(), "#b14fff");
    }

    #[test]
    fn luv_round_trip_is_exact_for_24_bit_colors() {
        for color in [PURPLE, MINT, Rgb::new(0, 0, 0), Rgb::new(255, 255, 255), Rgb::new(1, 2, 3)]
        {
            assert_eq!(color.to_luv().to_rgb(), color);
        }
    }

    #[test]
    fn white_has_full_lightness() {
        let white = Rgb::new(255, 255, 255).to_luv();
        assert!((white.l - 1.0).abs() < 1e-6);

        // The rounded D65 constants sit slightly off the matrix white point,
        // leaving a residual chroma around 1e-4
        assert!(white.u.abs() < 1e-3);
        assert!(white.v.abs() < 1e-3);
    }

    #[test]
    fn ramp_has_requested_length() {
        assert!(ramp(PURPLE, MINT, 0).is_empty());
        assert_eq!(ramp(PURPLE, MINT, 1), vec![PURPLE]);
        assert_eq!(ramp(PURPLE, MINT, 70).len(), 70);
    }

    #[test]
    fn ramp_moves_toward_end() {
        let colors = ramp(PURPLE, MINT, 10);
        let (start, end) = (PURPLE.to_luv(), MINT.to_luv());
        let first = colors[0].to_luv();
        let last = colors[9].to_luv();

        assert!(first.distance(start) < first.distance(end));
        assert!(last.distance(end) < last.distance(start));
    }

    #[test]
    fn ramp_is_deterministic() {
        assert_eq!(ramp(PURPLE, MINT, 33), ramp(PURPLE, MINT, 33));
    }
}
