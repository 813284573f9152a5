//! RGB colors and their conversion into the CIE 1931 space used by Hue lamps.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// An RGB color with red, green, and blue components (0-255 each).
#[derive(Default, Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub(crate) red: u8,
    pub(crate) green: u8,
    pub(crate) blue: u8,
}

impl Rgb {
    pub fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    pub fn red(&self) -> u8 {
        self.red
    }

    pub fn green(&self) -> u8 {
        self.green
    }

    pub fn blue(&self) -> u8 {
        self.blue
    }
}

impl FromStr for Rgb {
    type Err = String;

    /// Parse from comma-separated string (e.g., "255,128,0").
    fn from_str(s: &str) -> Result<Self, String> {
        let parts = s
            .split(',')
            .map(|c| c.trim().parse::<u8>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.to_string())?;
        match parts[..] {
            [r, g, b] => Ok(Self::new(r, g, b)),
            _ => Err("Expected format: r,g,b".into()),
        }
    }
}

/// Converts an RGB triple into a CIE 1931 `[x, y]` chromaticity point.
///
/// Any `Fn(Rgb) -> [f64; 2]` is a converter, so hosts can plug in a
/// gamut-aware implementation per lamp model.
pub trait ColorConverter: Send + Sync {
    fn to_xy(&self, color: Rgb) -> [f64; 2];
}

impl<F> ColorConverter for F
where
    F: Fn(Rgb) -> [f64; 2] + Send + Sync,
{
    fn to_xy(&self, color: Rgb) -> [f64; 2] {
        self(color)
    }
}

/// Wide gamut sRGB to xy conversion with gamma correction.
///
/// ```
/// use hue_items_rs::{ColorConverter, Rgb, WideGamut};
///
/// let [x, y] = WideGamut.to_xy(Rgb::new(255, 255, 255));
/// assert!((x - 0.3227).abs() < 1e-3);
/// assert!((y - 0.329).abs() < 1e-3);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct WideGamut;

impl WideGamut {
    fn linear(channel: u8) -> f64 {
        let v = f64::from(channel) / 255.0;
        if v > 0.04045 {
            ((v + 0.055) / 1.055).powf(2.4)
        } else {
            v / 12.92
        }
    }

    fn round4(v: f64) -> f64 {
        (v * 10_000.0).round() / 10_000.0
    }
}

impl ColorConverter for WideGamut {
    fn to_xy(&self, color: Rgb) -> [f64; 2] {
        let r = Self::linear(color.red);
        let g = Self::linear(color.green);
        let b = Self::linear(color.blue);

        let x = r * 0.664_511 + g * 0.154_324 + b * 0.162_028;
        let y = r * 0.283_881 + g * 0.668_433 + b * 0.047_685;
        let z = r * 0.000_088 + g * 0.072_310 + b * 0.986_039;

        let sum = x + y + z;
        if sum == 0.0 {
            return [0.0, 0.0];
        }
        [Self::round4(x / sum), Self::round4(y / sum)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(Rgb::from_str("255, 128,0").unwrap(), Rgb::new(255, 128, 0));
        assert!(Rgb::from_str("1,2").is_err());
        assert!(Rgb::from_str("1,2,300").is_err());
    }

    #[test]
    fn test_black_is_origin() {
        assert_eq!(WideGamut.to_xy(Rgb::default()), [0.0, 0.0]);
    }

    #[test]
    fn test_red_is_reddish() {
        let [x, y] = WideGamut.to_xy(Rgb::new(255, 0, 0));
        assert!(x > 0.65 && y < 0.3);
    }

    #[test]
    fn test_closure_converter() {
        let fixed = |_: Rgb| [0.1, 0.2];
        assert_eq!(fixed.to_xy(Rgb::new(1, 2, 3)), [0.1, 0.2]);
    }
}
