// Vogel Module - Offline generator for spiral board tables
//
// The nth pixel along the spiral sits at r = sqrt(n), theta = n * golden angle.
// Physical wiring on the real boards snakes along the spiral arms
// (parastichies), alternating direction per arm.

use anyhow::Result;
use std::f64::consts::TAU;

use crate::boards::{BoardAsset, TopologyKind};

/// 2 * pi * (1 - 1/phi), about 137.5 degrees.
pub const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

/// How physical indices are assigned to spiral ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wiring {
    /// Physical index == radial rank.
    Radial,
    /// Serpentine along `arms` spiral arms. Arm `a` holds the ranks congruent
    /// to `a * stride mod arms`; even arms run outward when `outward_first`.
    Parastichy {
        arms: usize,
        stride: usize,
        outward_first: bool,
    },
}

impl Wiring {
    /// Wiring used by the shipped boards of this size.
    pub fn default_for(pixel_count: usize) -> Self {
        if pixel_count > 256 {
            Wiring::Parastichy { arms: 34, stride: 13, outward_first: false }
        } else {
            Wiring::Parastichy { arms: 13, stride: 5, outward_first: true }
        }
    }

    /// Parse "radial", "auto", or "ARMS:STRIDE[:in|out]".
    pub fn parse(s: &str, pixel_count: usize) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "radial" => Some(Wiring::Radial),
            "auto" | "" => Some(Self::default_for(pixel_count)),
            spec => {
                let mut parts = spec.split(':');
                let arms = parts.next()?.parse().ok()?;
                let stride = parts.next()?.parse().ok()?;
                let outward_first = match parts.next() {
                    None | Some("out") => true,
                    Some("in") => false,
                    Some(_) => return None,
                };
                Some(Wiring::Parastichy { arms, stride, outward_first })
            }
        }
    }

    /// Physical index -> radial rank.
    pub fn radial_order(&self, pixel_count: usize) -> Result<Vec<u16>> {
        match *self {
            Wiring::Radial => Ok((0..pixel_count as u16).collect()),
            Wiring::Parastichy { arms, stride, outward_first } => {
                if arms == 0 || gcd(arms, stride) != 1 {
                    anyhow::bail!(
                        "Wiring {}:{} does not visit every arm (arms and stride must be coprime)",
                        arms,
                        stride
                    );
                }
                let mut order = Vec::with_capacity(pixel_count);
                for arm in 0..arms {
                    let residue = (arm * stride) % arms;
                    let mut ranks: Vec<u16> = (residue..pixel_count)
                        .step_by(arms)
                        .map(|r| r as u16)
                        .collect();
                    if (arm % 2 == 0) != outward_first {
                        ranks.reverse();
                    }
                    order.extend(ranks);
                }
                Ok(order)
            }
        }
    }
}

fn gcd(a: usize, b: usize) -> usize {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// Angle of spiral rank `n` in unit-256.
pub fn spiral_angle(rank: usize) -> u8 {
    let turns = (rank as f64 * GOLDEN_ANGLE).rem_euclid(TAU) / TAU;
    ((turns * 256.0).round() as u32 % 256) as u8
}

/// Spiral positions by rank, centred on the origin.
pub fn spiral_points(pixel_count: usize) -> Vec<(f64, f64)> {
    (0..pixel_count)
        .map(|n| {
            let r = (n as f64).sqrt();
            let theta = n as f64 * GOLDEN_ANGLE;
            (r * theta.cos(), r * theta.sin())
        })
        .collect()
}

/// Shift points so the bounding box starts at zero, scale the larger axis to
/// fill `[0, 256)`, and truncate to bytes.
pub fn normalize_points(points: &[(f64, f64)]) -> (Vec<u8>, Vec<u8>) {
    let min_x = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let min_y = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let max_extent = points
        .iter()
        .map(|p| (p.0 - min_x).max(p.1 - min_y))
        .fold(0.0, f64::max);
    let scale = if max_extent > 0.0 { 256.0 / max_extent } else { 0.0 };

    // subtract 0.5 to avoid bias towards the high end
    let to_byte = |v: f64| (v * scale - 0.5).clamp(0.0, 255.0) as u8;
    let xs = points.iter().map(|p| to_byte(p.0 - min_x)).collect();
    let ys = points.iter().map(|p| to_byte(p.1 - min_y)).collect();
    (xs, ys)
}

/// Generate a complete spiral board asset.
pub fn generate(name: &str, pixel_count: usize, wiring: Wiring) -> Result<BoardAsset> {
    if pixel_count == 0 {
        anyhow::bail!("Cannot generate a board with zero pixels");
    }
    if pixel_count > u16::MAX as usize {
        anyhow::bail!("Board of {} pixels is too large", pixel_count);
    }

    let radial_order = wiring.radial_order(pixel_count)?;
    let mut radial_order_inverse = vec![0u16; pixel_count];
    for (physical, &rank) in radial_order.iter().enumerate() {
        radial_order_inverse[rank as usize] = physical as u16;
    }

    let (rank_x, rank_y) = normalize_points(&spiral_points(pixel_count));
    let by_physical = |table: &[u8]| -> Vec<u8> {
        radial_order.iter().map(|&rank| table[rank as usize]).collect()
    };

    Ok(BoardAsset {
        name: name.to_string(),
        topology: TopologyKind::Spiral,
        angles: radial_order.iter().map(|&rank| spiral_angle(rank as usize)).collect(),
        coords_x: Some(by_physical(&rank_x)),
        coords_y: Some(by_physical(&rank_y)),
        radial_order: Some(radial_order.clone()),
        radial_order_inverse: Some(radial_order_inverse),
        segment_distance: None,
    })
}
