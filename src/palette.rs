// Palette Module - Phase (0-255) to colour lookup tables built from colorgrad gradients
use anyhow::{Context, Result};
use colorgrad::Color;

use crate::types::{InterpolationMode, Rgb};

/// Built-in palettes defined by hex colour stops. Each is made cyclic by
/// repeating the first stop at the end, so phase 255 blends back into 0.
const PRESET_STOPS: &[(&str, &str)] = &[
    ("Party", "5500AB,84007C,B5004B,E5001B,E81700,B84700,AB7700,ABAB00,AB5500,DD2200,F2000E,C2003E,8F0071,5F00A1,2F00D0,0007F9"),
    ("Ocean", "191970,00008B,191970,000080,00008B,0000CD,2E8B57,008080,5F9EA0,0000FF,008B8B,6495ED,7FFFD4,2E8B57,00FFFF,87CEFA"),
    ("Forest", "006400,006400,556B2F,006400,008000,228B22,6B8E23,008000,2E8B57,66CDAA,32CD32,9ACD32,90EE90,7CFC00,66CDAA,228B22"),
    ("Lava", "000000,800000,000000,800000,8B0000,800000,8B0000,8B0000,8B0000,FF0000,FFA500,FFFFFF,FFA500,FF0000,8B0000,000000"),
    ("Cloud", "0000FF,00008B,00008B,00008B,00008B,00008B,00008B,00008B,0000FF,00008B,87CEEB,87CEEB,ADD8E6,FFFFFF,ADD8E6,87CEEB"),
    ("Heat", "000000,330000,660000,990000,CC0000,FF0000,FF3300,FF6600,FF9900,FFCC00,FFFF00,FFFF33,FFFF66,FFFF99,FFFFCC,FFFFFF"),
];

/// Palettes taken straight from colorgrad's presets.
const COLORGRAD_PRESETS: &[&str] = &["Rainbow", "Sinebow", "Turbo", "Viridis", "Plasma", "Inferno"];

pub fn palette_names() -> Vec<&'static str> {
    COLORGRAD_PRESETS
        .iter()
        .copied()
        .chain(PRESET_STOPS.iter().map(|(name, _)| *name))
        .collect()
}

fn colorgrad_preset(name: &str) -> Option<colorgrad::Gradient> {
    match name {
        "Rainbow" => Some(colorgrad::rainbow()),
        "Sinebow" => Some(colorgrad::sinebow()),
        "Turbo" => Some(colorgrad::turbo()),
        "Viridis" => Some(colorgrad::viridis()),
        "Plasma" => Some(colorgrad::plasma()),
        "Inferno" => Some(colorgrad::inferno()),
        _ => None,
    }
}

/// Parse a comma-separated list of hex colours, skipping empty entries.
pub fn parse_hex_list(color_str: &str) -> Result<Vec<Rgb>> {
    color_str
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(Rgb::from_hex)
        .collect()
}

// Build a cyclic gradient through all colours (first colour repeated at the end)
fn cyclic_gradient(colors: &[Rgb], interpolation: InterpolationMode) -> Result<colorgrad::Gradient> {
    let mut stops: Vec<Color> = colors
        .iter()
        .map(|c| Color::from_rgba8(c.r, c.g, c.b, 255))
        .collect();
    if let Some(first) = colors.first() {
        stops.push(Color::from_rgba8(first.r, first.g, first.b, 255));
    }

    let cg_interpolation = match interpolation {
        InterpolationMode::Basis => colorgrad::Interpolation::Basis,
        InterpolationMode::CatmullRom => colorgrad::Interpolation::CatmullRom,
        InterpolationMode::Linear => colorgrad::Interpolation::Linear,
    };

    let gradient = colorgrad::CustomGradient::new()
        .colors(&stops)
        .interpolation(cg_interpolation)
        .build()?;
    Ok(gradient)
}

/// 256-entry phase -> colour table.
#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
    name: String,
    table: Vec<Rgb>,
}

impl Palette {
    fn sample(name: &str, gradient: &colorgrad::Gradient) -> Self {
        let (start, end) = gradient.domain();
        let table = (0..256)
            .map(|i| {
                let t = start + (end - start) * (i as f64 / 256.0);
                let [r, g, b, _] = gradient.at(t).to_rgba8();
                Rgb::new(r, g, b)
            })
            .collect();
        Palette { name: name.to_string(), table }
    }

    pub fn solid(color: Rgb) -> Self {
        Palette {
            name: color.to_hex(),
            table: vec![color; 256],
        }
    }

    pub fn from_colors(name: &str, colors: &[Rgb], interpolation: InterpolationMode) -> Result<Self> {
        match colors {
            [] => anyhow::bail!("Palette '{}' has no colours", name),
            [only] => Ok(Palette { name: name.to_string(), table: vec![*only; 256] }),
            _ => Ok(Self::sample(name, &cyclic_gradient(colors, interpolation)?)),
        }
    }

    /// Resolve a palette spec which can be:
    /// 1. A built-in palette name (case-insensitive, e.g. "ocean")
    /// 2. Comma-separated hex colours (e.g. "FF0000,00FF00,0000FF")
    pub fn resolve(spec: &str, interpolation: InterpolationMode) -> Result<Self> {
        let trimmed = spec.trim();

        for name in COLORGRAD_PRESETS {
            if name.eq_ignore_ascii_case(trimmed) {
                if let Some(gradient) = colorgrad_preset(name) {
                    return Ok(Self::sample(name, &gradient));
                }
            }
        }

        for (name, stops) in PRESET_STOPS {
            if name.eq_ignore_ascii_case(trimmed) {
                let colors = parse_hex_list(stops)?;
                return Self::from_colors(name, &colors, interpolation);
            }
        }

        let colors = parse_hex_list(trimmed)
            .with_context(|| format!("'{}' is neither a palette name nor a hex colour list", trimmed))?;
        Self::from_colors(trimmed, &colors, interpolation)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Palette lookup by phase.
    pub fn color_at(&self, phase: u8) -> Rgb {
        self.table[phase as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_presets_case_insensitive() {
        for name in palette_names() {
            let palette = Palette::resolve(&name.to_lowercase(), InterpolationMode::Linear).unwrap();
            assert_eq!(palette.name(), name);
        }
    }

    #[test]
    fn test_hex_palette_starts_on_first_colour() {
        let palette = Palette::resolve("FF0000, 0000FF", InterpolationMode::Linear).unwrap();
        assert_eq!(palette.color_at(0), Rgb::RED);
        // halfway through a two-stop cyclic gradient is the second stop
        let mid = palette.color_at(128);
        assert!(mid.b > 240 && mid.r < 15, "{:?}", mid);
        // and it wraps back towards red
        assert!(palette.color_at(255).r > 240);
    }

    #[test]
    fn test_single_colour_is_solid() {
        let palette = Palette::resolve("00FF00", InterpolationMode::Basis).unwrap();
        assert!((0..=255).all(|p| palette.color_at(p) == Rgb::GREEN));
        assert_eq!(Palette::solid(Rgb::BLUE).color_at(7), Rgb::BLUE);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(Palette::resolve("not-a-palette", InterpolationMode::Linear).is_err());
        assert!(Palette::resolve("", InterpolationMode::Linear).is_err());
        assert!(Palette::resolve("aé€", InterpolationMode::Linear).is_err());
        assert!(Palette::resolve("FF0000,ééé", InterpolationMode::Linear).is_err());
    }
}
