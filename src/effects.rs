// Effects Module - Palette sweeps and clocks built on the layout, region and spiral primitives
use crate::clock::ClockHands;
use crate::layout::PixelLayout;
use crate::palette::Palette;
use crate::region::antialias_pixel_ar;
use crate::spiral::draw_spiral_line;
use crate::types::{fade_all_to_black_by, Rgb};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    AnglePalette = 0,
    RadiusPalette = 1,
    XPalette = 2,
    YPalette = 3,
    XyPalette = 4,
    AngleGradientPalette = 5,
    RadiusGradientPalette = 6,
    XGradientPalette = 7,
    YGradientPalette = 8,
    XyGradientPalette = 9,
    AnalogClock = 10,
    SpiralClock13 = 11,
    SpiralClock21 = 12,
    SpiralClock34 = 13,
    SpiralClock55 = 14,
    SpiralClock89 = 15,
    SpiralClock21And34 = 16,
    SpiralClock13_21And34 = 17,
    SpiralClock34_21And13 = 18,
}

const EFFECT_COUNT: usize = 19;

/// What a board must provide for an effect to draw anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Angles,
    Coordinates,
    RadiusProxy,
    RadialOrder,
}

impl Effect {
    pub fn from_index(index: usize) -> Self {
        match index % EFFECT_COUNT {
            0 => Effect::AnglePalette,
            1 => Effect::RadiusPalette,
            2 => Effect::XPalette,
            3 => Effect::YPalette,
            4 => Effect::XyPalette,
            5 => Effect::AngleGradientPalette,
            6 => Effect::RadiusGradientPalette,
            7 => Effect::XGradientPalette,
            8 => Effect::YGradientPalette,
            9 => Effect::XyGradientPalette,
            10 => Effect::AnalogClock,
            11 => Effect::SpiralClock13,
            12 => Effect::SpiralClock21,
            13 => Effect::SpiralClock34,
            14 => Effect::SpiralClock55,
            15 => Effect::SpiralClock89,
            16 => Effect::SpiralClock21And34,
            17 => Effect::SpiralClock13_21And34,
            _ => Effect::SpiralClock34_21And13,
        }
    }

    pub fn all() -> Vec<Effect> {
        (0..EFFECT_COUNT).map(Self::from_index).collect()
    }

    pub fn from_string(s: &str) -> Option<Self> {
        let key: String = s
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        Self::all().into_iter().find(|e| {
            let name: String = e.name().chars().filter(|c| c.is_ascii_alphanumeric()).collect();
            name == key
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Effect::AnglePalette => "angle_palette",
            Effect::RadiusPalette => "radius_palette",
            Effect::XPalette => "x_palette",
            Effect::YPalette => "y_palette",
            Effect::XyPalette => "xy_palette",
            Effect::AngleGradientPalette => "angle_gradient_palette",
            Effect::RadiusGradientPalette => "radius_gradient_palette",
            Effect::XGradientPalette => "x_gradient_palette",
            Effect::YGradientPalette => "y_gradient_palette",
            Effect::XyGradientPalette => "xy_gradient_palette",
            Effect::AnalogClock => "analog_clock",
            Effect::SpiralClock13 => "spiral_clock_13",
            Effect::SpiralClock21 => "spiral_clock_21",
            Effect::SpiralClock34 => "spiral_clock_34",
            Effect::SpiralClock55 => "spiral_clock_55",
            Effect::SpiralClock89 => "spiral_clock_89",
            Effect::SpiralClock21And34 => "spiral_clock_21_and_34",
            Effect::SpiralClock13_21And34 => "spiral_clock_13_21_and_34",
            Effect::SpiralClock34_21And13 => "spiral_clock_34_21_and_13",
        }
    }

    pub fn next(&self) -> Self {
        Self::from_index(*self as usize + 1)
    }

    pub fn requirement(&self) -> Requirement {
        match self {
            Effect::AnglePalette | Effect::AngleGradientPalette => Requirement::Angles,
            Effect::XPalette
            | Effect::YPalette
            | Effect::XyPalette
            | Effect::XGradientPalette
            | Effect::YGradientPalette
            | Effect::XyGradientPalette => Requirement::Coordinates,
            Effect::RadiusPalette | Effect::RadiusGradientPalette | Effect::AnalogClock => {
                Requirement::RadiusProxy
            }
            _ => Requirement::RadialOrder,
        }
    }

    pub fn is_supported(&self, layout: &PixelLayout) -> bool {
        match self.requirement() {
            Requirement::Angles => true,
            Requirement::Coordinates => layout.coordinates().is_some(),
            Requirement::RadiusProxy => layout.radius_proxies().is_some(),
            Requirement::RadialOrder => layout.is_spiral(),
        }
    }

    /// Next effect after this one that the board can draw.
    pub fn next_supported(&self, layout: &PixelLayout) -> Self {
        let mut effect = self.next();
        for _ in 0..EFFECT_COUNT {
            if effect.is_supported(layout) {
                return effect;
            }
            effect = effect.next();
        }
        Effect::AnglePalette
    }

    /// Spiral strides as (hour, minute, second) passes.
    fn spiral_strides(&self) -> &'static [(usize, usize, usize)] {
        match self {
            Effect::SpiralClock13 => &[(13, 13, 13)],
            Effect::SpiralClock21 => &[(21, 21, 21)],
            Effect::SpiralClock34 => &[(34, 34, 34)],
            Effect::SpiralClock55 => &[(55, 55, 55)],
            Effect::SpiralClock89 => &[(89, 89, 89)],
            Effect::SpiralClock21And34 => &[(21, 21, 21), (34, 34, 34)],
            Effect::SpiralClock13_21And34 => &[(34, 21, 13)],
            Effect::SpiralClock34_21And13 => &[(13, 21, 34)],
            _ => &[],
        }
    }
}

/// Per-frame inputs shared by every effect.
pub struct FrameContext<'a> {
    /// Animation phase, advanced every frame by the renderer.
    pub phase: u8,
    pub palette: &'a Palette,
    pub gradient_palette: &'a Palette,
    pub hands: &'a ClockHands,
    /// How much of the previous frame the clocks fade away.
    pub clock_fade: u8,
}

// Hue spread per coordinate unit; one full palette cycle across the board.
const HUES: u8 = 1;

// Clock hand geometry in radius-proxy units (designed for 256 pixels)
const HOUR_RADIUS: u8 = 96;
const MINUTE_RADIUS: u8 = 192;
const SECOND_RADIUS: u8 = 255;
const HOUR_HAND_WIDTH: u8 = 8;
const MINUTE_HAND_WIDTH: u8 = 7;
const SECOND_HAND_WIDTH: u8 = 6;

/// Paint `leds` with `palette`, offsetting the animation phase by a
/// per-pixel value.
fn palette_sweep(leds: &mut [Rgb], palette: &Palette, phase: u8, values: impl Iterator<Item = u8>) {
    for (led, value) in leds.iter_mut().zip(values) {
        *led = palette.color_at(phase.wrapping_sub(value.wrapping_mul(HUES)));
    }
}

fn draw_palette_effect(effect: Effect, layout: &PixelLayout, leds: &mut [Rgb], ctx: &FrameContext) {
    use Effect::*;
    let palette = match effect {
        AnglePalette | RadiusPalette | XPalette | YPalette | XyPalette => ctx.palette,
        _ => ctx.gradient_palette,
    };

    match effect {
        AnglePalette | AngleGradientPalette => {
            palette_sweep(leds, palette, ctx.phase, layout.angles().iter().copied())
        }
        RadiusPalette | RadiusGradientPalette => {
            if let Some(radii) = layout.radius_proxies() {
                palette_sweep(leds, palette, ctx.phase, radii.iter().copied());
            }
        }
        XPalette | XGradientPalette => {
            if let Some(coords) = layout.coordinates() {
                palette_sweep(leds, palette, ctx.phase, coords.x.iter().copied());
            }
        }
        YPalette | YGradientPalette => {
            if let Some(coords) = layout.coordinates() {
                palette_sweep(leds, palette, ctx.phase, coords.y.iter().copied());
            }
        }
        XyPalette | XyGradientPalette => {
            if let Some(coords) = layout.coordinates() {
                let sums = coords.x.iter().zip(coords.y.iter()).map(|(&x, &y)| x.wrapping_add(y));
                palette_sweep(leds, palette, ctx.phase, sums);
            }
        }
        _ => {}
    }
}

/// Pixel nearest the centre: rank 0 on spirals, else the smallest radius proxy.
fn centre_pixel(layout: &PixelLayout) -> Option<usize> {
    if let Ok(centre) = layout.physical_index(0) {
        return Some(centre);
    }
    let radii = layout.radius_proxies()?;
    radii
        .iter()
        .enumerate()
        .min_by_key(|(i, &r)| (r, *i))
        .map(|(i, _)| i)
}

fn draw_analog_clock(layout: &PixelLayout, leds: &mut [Rgb], ctx: &FrameContext) {
    let hands = ctx.hands;
    fade_all_to_black_by(leds, ctx.clock_fade);
    antialias_pixel_ar(layout, leds, hands.second, SECOND_HAND_WIDTH, 0, SECOND_RADIUS, Rgb::BLUE);
    antialias_pixel_ar(layout, leds, hands.minute, MINUTE_HAND_WIDTH, 0, MINUTE_RADIUS, Rgb::GREEN);
    antialias_pixel_ar(layout, leds, hands.hour, HOUR_HAND_WIDTH, 0, HOUR_RADIUS, Rgb::RED);
    if let Some(centre) = centre_pixel(layout) {
        if let Some(led) = leds.get_mut(centre) {
            *led = Rgb::RED;
        }
    }
}

fn draw_spiral_clock(effect: Effect, layout: &PixelLayout, leds: &mut [Rgb], ctx: &FrameContext) {
    let hands = ctx.hands;
    fade_all_to_black_by(leds, ctx.clock_fade);
    for &(step_h, step_m, step_s) in effect.spiral_strides() {
        draw_spiral_line(layout, leds, hands.second, step_s, Rgb::new(0, 0, 2));
        draw_spiral_line(layout, leds, hands.minute, step_m, Rgb::new(0, 2, 0));
        draw_spiral_line(layout, leds, hands.hour, step_h, Rgb::new(2, 0, 0));
    }
}

/// Render one pass of `effect` into `leds`.
pub fn render(effect: Effect, layout: &PixelLayout, leds: &mut [Rgb], ctx: &FrameContext) {
    match effect {
        Effect::AnalogClock => draw_analog_clock(layout, leds, ctx),
        e if !e.spiral_strides().is_empty() => draw_spiral_clock(e, layout, leds, ctx),
        e => draw_palette_effect(e, layout, leds, ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{hand_angles, FixedClock};
    use crate::boards::Board;
    use crate::region::angle_distance;
    use crate::types::InterpolationMode;
    use std::time::Instant;

    fn hands_at(hour: u8, minute: u8, second: u8) -> ClockHands {
        let mut hands = ClockHands::default();
        hands.tick(Instant::now(), &FixedClock { hour, minute, second });
        hands
    }

    fn rainbow() -> Palette {
        Palette::resolve("Rainbow", InterpolationMode::Linear).unwrap()
    }

    #[test]
    fn test_effect_names_round_trip() {
        for effect in Effect::all() {
            assert_eq!(Effect::from_string(effect.name()), Some(effect));
        }
        assert_eq!(Effect::from_string("Spiral-Clock-21"), Some(Effect::SpiralClock21));
        assert_eq!(Effect::from_string("nope"), None);
        assert_eq!(Effect::SpiralClock34_21And13.next(), Effect::AnglePalette);
    }

    #[test]
    fn test_support_matrix() {
        let kraken = Board::Kraken64.layout().unwrap();
        assert!(Effect::AnalogClock.is_supported(&kraken));
        assert!(Effect::XyPalette.is_supported(&kraken));
        assert!(!Effect::SpiralClock13.is_supported(&kraken));
        assert_eq!(Effect::XyGradientPalette.next_supported(&kraken), Effect::AnalogClock);
        assert_eq!(Effect::AnalogClock.next_supported(&kraken), Effect::AnglePalette);

        let bare = PixelLayout::unmapped("bare", vec![0; 4], None).unwrap();
        assert!(Effect::AnglePalette.is_supported(&bare));
        assert!(!Effect::RadiusPalette.is_supported(&bare));
        assert_eq!(Effect::AnglePalette.next_supported(&bare), Effect::AngleGradientPalette);
    }

    #[test]
    fn test_angle_palette_follows_phase_minus_angle() {
        let layout = Board::Fibonacci64.layout().unwrap();
        let palette = rainbow();
        let hands = ClockHands::default();
        let ctx = FrameContext {
            phase: 40,
            palette: &palette,
            gradient_palette: &palette,
            hands: &hands,
            clock_fade: 0,
        };
        let mut leds = vec![Rgb::BLACK; 64];
        render(Effect::AnglePalette, &layout, &mut leds, &ctx);
        for (i, led) in leds.iter().enumerate() {
            let a = layout.angle(i).unwrap();
            assert_eq!(*led, palette.color_at(40u8.wrapping_sub(a)));
        }
    }

    #[test]
    fn test_gradient_variant_uses_gradient_palette() {
        let layout = Board::Fibonacci128.layout().unwrap();
        let main = Palette::solid(Rgb::RED);
        let gradient = Palette::solid(Rgb::BLUE);
        let hands = ClockHands::default();
        let ctx = FrameContext {
            phase: 0,
            palette: &main,
            gradient_palette: &gradient,
            hands: &hands,
            clock_fade: 0,
        };
        let mut leds = vec![Rgb::BLACK; 128];
        render(Effect::XyGradientPalette, &layout, &mut leds, &ctx);
        assert!(leds.iter().all(|c| *c == Rgb::BLUE));
        render(Effect::RadiusPalette, &layout, &mut leds, &ctx);
        assert!(leds.iter().all(|c| *c == Rgb::RED));
    }

    #[test]
    fn test_analog_clock_hands() {
        let layout = Board::Fibonacci256.layout().unwrap();
        let palette = rainbow();
        let hands = hands_at(3, 0, 30);
        let ctx = FrameContext {
            phase: 0,
            palette: &palette,
            gradient_palette: &palette,
            hands: &hands,
            clock_fade: 255,
        };
        let mut leds = vec![Rgb::WHITE; 256];
        render(Effect::AnalogClock, &layout, &mut leds, &ctx);

        let (hour, _, second) = hand_angles(3, 0, 30);
        for (i, led) in leds.iter().enumerate() {
            let a = layout.angle(i).unwrap();
            let r = layout.radius_proxy(i).unwrap();
            if i == layout.physical_index(0).unwrap() {
                assert_eq!(*led, Rgb::RED);
                continue;
            }
            // only the hands survive a full background fade
            if led.r > 0 {
                assert!(angle_distance(a, hour) < HOUR_HAND_WIDTH && r <= HOUR_RADIUS);
            }
            if led.b > 0 {
                assert!(angle_distance(a, second) < SECOND_HAND_WIDTH);
            }
        }
        assert!(leds.iter().any(|c| c.b > 0));
        assert!(leds.iter().filter(|c| c.r > 0).count() > 1);
    }

    #[test]
    fn test_spiral_clock_draws_three_hands() {
        let layout = Board::Fibonacci256.layout().unwrap();
        let palette = rainbow();
        let hands = hands_at(6, 20, 45);
        let ctx = FrameContext {
            phase: 0,
            palette: &palette,
            gradient_palette: &palette,
            hands: &hands,
            clock_fade: 255,
        };
        let mut leds = vec![Rgb::BLACK; 256];
        render(Effect::SpiralClock21, &layout, &mut leds, &ctx);
        let reds = leds.iter().filter(|c| c.r > 0).count();
        let greens = leds.iter().filter(|c| c.g > 0).count();
        let blues = leds.iter().filter(|c| c.b > 0).count();
        for count in [reds, greens, blues] {
            assert!(count == 12 || count == 13, "hand has {} dots", count);
        }
        assert!(leds.iter().all(|c| c.r <= 2 && c.g <= 2 && c.b <= 2));
    }

    #[test]
    fn test_spiral_clock_on_segment_board_only_fades() {
        let layout = Board::Kraken64.layout().unwrap();
        let palette = rainbow();
        let hands = hands_at(1, 2, 3);
        let ctx = FrameContext {
            phase: 0,
            palette: &palette,
            gradient_palette: &palette,
            hands: &hands,
            clock_fade: 255,
        };
        let mut leds = vec![Rgb::WHITE; 64];
        render(Effect::SpiralClock13, &layout, &mut leds, &ctx);
        assert!(leds.iter().all(|c| c.is_black()));
    }
}
