// Shared types module - Colour value and loop exit reasons used across modules

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

use crate::math8::{qadd8, scale8};

// Render loop exit reason - used to determine if we should quit or rebuild
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExitReason {
    UserQuit,      // User pressed 'q' or Ctrl+C - should exit app
    BoardChanged,  // Board changed in config - layout must be rebuilt
}

// Gradient interpolation mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InterpolationMode {
    Linear,
    Basis,
    CatmullRom,
}

impl InterpolationMode {
    pub fn from_string(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "basis" => InterpolationMode::Basis,
            "catmullrom" | "catmull_rom" | "catmull-rom" => InterpolationMode::CatmullRom,
            _ => InterpolationMode::Linear,
        }
    }
}

/// One pixel of the LED buffer.
///
/// Every write into a frame either replaces a pixel or adds into it with
/// per-channel saturation, so `+=` clamps at 255 instead of wrapping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const RED: Rgb = Rgb::new(255, 0, 0);
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);
    pub const BLUE: Rgb = Rgb::new(0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    pub fn from_hex(hex: &str) -> Result<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if !hex.is_ascii() || hex.len() != 6 {
            anyhow::bail!("Invalid hex color: {}", hex);
        }
        Ok(Rgb {
            r: u8::from_str_radix(&hex[0..2], 16)?,
            g: u8::from_str_radix(&hex[2..4], 16)?,
            b: u8::from_str_radix(&hex[4..6], 16)?,
        })
    }

    pub fn to_hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    pub fn saturating_add(self, other: Rgb) -> Rgb {
        Rgb {
            r: qadd8(self.r, other.r),
            g: qadd8(self.g, other.g),
            b: qadd8(self.b, other.b),
        }
    }

    /// Scale every channel by `amount / 256`.
    pub fn scale(self, amount: u8) -> Rgb {
        Rgb {
            r: scale8(self.r, amount),
            g: scale8(self.g, amount),
            b: scale8(self.b, amount),
        }
    }

    /// Dim towards black: 0 leaves the colour untouched, 255 is (nearly) black.
    pub fn fade_to_black_by(self, amount: u8) -> Rgb {
        self.scale(255 - amount)
    }

    pub fn is_black(&self) -> bool {
        self.r == 0 && self.g == 0 && self.b == 0
    }
}

impl AddAssign for Rgb {
    fn add_assign(&mut self, other: Rgb) {
        *self = self.saturating_add(other);
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Rgb { r, g, b }
    }
}

/// Fade a whole frame towards black, used for trailing clock hands.
pub fn fade_all_to_black_by(leds: &mut [Rgb], amount: u8) {
    for led in leds.iter_mut() {
        *led = led.fade_to_black_by(amount);
    }
}
