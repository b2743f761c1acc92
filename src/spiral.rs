// Spiral Module - Dotted radial lines drawn by walking the spiral's radial order

use crate::layout::PixelLayout;
use crate::math8::sub8;
use crate::types::Rgb;

/// Pick the pixel a spiral line at `angle` starts from.
///
/// Candidates are the outermost pixels for this stride (no rank further out
/// by `step`) that can still take at least one step inward. Among them the
/// one whose angle is at, or the fewest units clockwise-before, the target
/// wins; ties keep the lowest physical index. Falls back to physical 0 when
/// no pixel qualifies.
pub fn spiral_line_start(layout: &PixelLayout, angle: u8, step: usize) -> Option<usize> {
    let order = layout.radial_order()?;
    let n = layout.pixel_count();

    let mut best: Option<(usize, u8)> = None;
    for (i, (&rank, &a)) in order.ranks().iter().zip(layout.angles().iter()).enumerate() {
        let rank = rank as usize;
        if rank < step || rank + step < n {
            continue;
        }
        let forward = sub8(angle, a);
        match best {
            Some((_, smallest)) if smallest <= forward => {}
            _ => best = Some((i, forward)),
        }
    }
    Some(best.map(|(i, _)| i).unwrap_or(0))
}

/// Draw a dotted line from the spiral's edge to its centre, approximating
/// the ray at `angle`, with dots `step` ranks apart. Colour is added with
/// saturation so hands drawn over each other blend.
///
/// Does nothing on boards without a radial order or when `step` is zero.
pub fn draw_spiral_line(layout: &PixelLayout, leds: &mut [Rgb], angle: u8, step: usize, color: Rgb) {
    if step == 0 {
        return;
    }
    let Some(order) = layout.radial_order() else {
        return;
    };
    let Some(start) = spiral_line_start(layout, angle, step) else {
        return;
    };

    if let Some(led) = leds.get_mut(start) {
        *led += color;
    }

    let Ok(mut rank) = order.rank(start) else {
        return;
    };
    while rank >= step {
        rank -= step;
        if let Ok(physical) = order.physical(rank) {
            if let Some(led) = leds.get_mut(physical) {
                *led += color;
            }
        }
    }
}
