// Region Module - Select pixels by angular wedge and radial band
//
// Angles live in a circular unit-256 space, so 255 and 0 are neighbours.
// The distance between two angles is the smaller of the two wrapping
// subtractions; taking max(a, b) - min(a, b) instead breaks at the seam.

use crate::layout::PixelLayout;
use crate::math8::{map8, qadd8, qsub8, sub8};
use crate::types::Rgb;

/// Circular distance between two unit-256 angles, always `<= 128`.
pub fn angle_distance(a: u8, b: u8) -> u8 {
    sub8(a, b).min(sub8(b, a))
}

/// An angular wedge intersected with an inclusive radius-proxy band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub angle: u8,
    pub angle_tolerance: u8,
    pub radius_start: u8,
    pub radius_end: u8,
}

impl Region {
    pub fn band(angle: u8, angle_tolerance: u8, radius_start: u8, radius_end: u8) -> Self {
        Region { angle, angle_tolerance, radius_start, radius_end }
    }

    /// Band of `radius +/- radius_tolerance`, clamped to `0..=255`.
    pub fn centered(angle: u8, angle_tolerance: u8, radius: u8, radius_tolerance: u8) -> Self {
        Region {
            angle,
            angle_tolerance,
            radius_start: qsub8(radius, radius_tolerance),
            radius_end: qadd8(radius, radius_tolerance),
        }
    }

    /// Angular distance of a matching pixel from the target, or None.
    pub fn distance(&self, pixel_angle: u8, radius_proxy: u8) -> Option<u8> {
        if radius_proxy < self.radius_start || radius_proxy > self.radius_end {
            return None;
        }
        let d = angle_distance(pixel_angle, self.angle);
        (d <= self.angle_tolerance).then_some(d)
    }

    /// Visit every matching physical index with its angular distance.
    /// Boards without a radius proxy have nothing to match.
    fn for_each_match(&self, layout: &PixelLayout, mut visit: impl FnMut(usize, u8)) {
        let Some(radii) = layout.radius_proxies() else {
            return;
        };
        for (i, (&a, &r)) in layout.angles().iter().zip(radii.iter()).enumerate() {
            if let Some(d) = self.distance(a, r) {
                visit(i, d);
            }
        }
    }

    pub fn select(&self, layout: &PixelLayout) -> Vec<usize> {
        let mut matched = Vec::new();
        self.for_each_match(layout, |i, _| matched.push(i));
        matched
    }
}

/// Fade amount for a pixel `d` units from the target: 0 at the target,
/// 255 at the tolerance edge.
pub fn antialias_fade(d: u8, angle_tolerance: u8) -> u8 {
    map8(d, 0, angle_tolerance, 0, 255)
}

/// Replace the colour of pixels within `radius +/- radius_tolerance` and
/// `angle +/- angle_tolerance`.
pub fn set_pixel_ar(
    layout: &PixelLayout,
    leds: &mut [Rgb],
    angle: u8,
    angle_tolerance: u8,
    radius: u8,
    radius_tolerance: u8,
    color: Rgb,
) {
    Region::centered(angle, angle_tolerance, radius, radius_tolerance).for_each_match(
        layout,
        |i, _| {
            if let Some(led) = leds.get_mut(i) {
                *led = color;
            }
        },
    );
}

/// Add `color` (saturating) to pixels inside the wedge and radius band.
pub fn and_pixel_ar(
    layout: &PixelLayout,
    leds: &mut [Rgb],
    angle: u8,
    angle_tolerance: u8,
    radius_start: u8,
    radius_end: u8,
    color: Rgb,
) {
    Region::band(angle, angle_tolerance, radius_start, radius_end).for_each_match(
        layout,
        |i, _| {
            if let Some(led) = leds.get_mut(i) {
                *led += color;
            }
        },
    );
}

/// Like `and_pixel_ar`, but the added colour fades linearly from full at the
/// target angle to black at the tolerance edge.
pub fn antialias_pixel_ar(
    layout: &PixelLayout,
    leds: &mut [Rgb],
    angle: u8,
    angle_tolerance: u8,
    radius_start: u8,
    radius_end: u8,
    color: Rgb,
) {
    Region::band(angle, angle_tolerance, radius_start, radius_end).for_each_match(
        layout,
        |i, d| {
            if let Some(led) = leds.get_mut(i) {
                *led += color.fade_to_black_by(antialias_fade(d, angle_tolerance));
            }
        },
    );
}
