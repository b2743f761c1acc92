// Renderer Module - Owns the layout, pixel buffer and effect state; produces one frame per call
use anyhow::{Context, Result};
use std::time::Instant;

use crate::clock::{ClockHands, TimeSource};
use crate::config::Config;
use crate::effects::{self, Effect, FrameContext};
use crate::layout::PixelLayout;
use crate::math8::beat8;
use crate::palette::Palette;
use crate::types::{InterpolationMode, Rgb};

/// Look up an effect by name and make sure the board can draw it.
pub fn resolve_effect(name: &str, layout: &PixelLayout) -> Result<Effect> {
    let Some(effect) = Effect::from_string(name) else {
        let known: Vec<&str> = Effect::all().iter().map(|e| e.name()).collect();
        anyhow::bail!("Unknown effect '{}' (known: {})", name, known.join(", "));
    };
    if !effect.is_supported(layout) {
        anyhow::bail!(
            "Effect '{}' needs {:?} which board '{}' ({}) does not provide",
            effect.name(),
            effect.requirement(),
            layout.name(),
            layout.topology().name()
        );
    }
    Ok(effect)
}

fn brightness_scale(brightness: f64) -> u8 {
    (brightness.clamp(0.0, 1.0) * 255.0).round() as u8
}

pub struct Renderer {
    layout: PixelLayout,
    leds: Vec<Rgb>,
    effect: Effect,
    palette: Palette,
    gradient_palette: Palette,
    hands: ClockHands,
    clock: Box<dyn TimeSource>,
    speed: u8,
    brightness: u8,
    clock_fade: u8,
    start: Instant,
    frame_count: u64,
}

impl Renderer {
    pub fn new(layout: PixelLayout, config: &Config, clock: Box<dyn TimeSource>) -> Result<Self> {
        let interpolation = InterpolationMode::from_string(&config.interpolation);
        let effect = resolve_effect(&config.effect, &layout)?;
        let palette = Palette::resolve(&config.palette, interpolation)
            .with_context(|| format!("Invalid palette '{}'", config.palette))?;
        let gradient_palette = Palette::resolve(&config.gradient_palette, interpolation)
            .with_context(|| format!("Invalid gradient palette '{}'", config.gradient_palette))?;

        Ok(Renderer {
            leds: vec![Rgb::BLACK; layout.pixel_count()],
            layout,
            effect,
            palette,
            gradient_palette,
            hands: ClockHands::default(),
            clock,
            speed: config.speed,
            brightness: brightness_scale(config.brightness),
            clock_fade: config.clock_fade,
            start: Instant::now(),
            frame_count: 0,
        })
    }

    /// Pick up live-reloadable settings. Everything is validated before
    /// anything is changed, so a bad edit leaves the renderer as it was.
    pub fn apply_config(&mut self, config: &Config) -> Result<()> {
        let interpolation = InterpolationMode::from_string(&config.interpolation);
        let effect = resolve_effect(&config.effect, &self.layout)?;
        let palette = Palette::resolve(&config.palette, interpolation)
            .with_context(|| format!("Invalid palette '{}'", config.palette))?;
        let gradient_palette = Palette::resolve(&config.gradient_palette, interpolation)
            .with_context(|| format!("Invalid gradient palette '{}'", config.gradient_palette))?;

        if effect != self.effect {
            tracing::info!(from = self.effect.name(), to = effect.name(), "effect changed");
            self.set_effect(effect);
        }
        self.palette = palette;
        self.gradient_palette = gradient_palette;
        self.speed = config.speed;
        self.brightness = brightness_scale(config.brightness);
        self.clock_fade = config.clock_fade;
        Ok(())
    }

    pub fn set_time_source(&mut self, clock: Box<dyn TimeSource>) {
        self.clock = clock;
        self.hands = ClockHands::default();
    }

    pub fn layout(&self) -> &PixelLayout {
        &self.layout
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn set_effect(&mut self, effect: Effect) {
        self.effect = effect;
        // trails from the previous effect would linger under the clocks
        self.leds.fill(Rgb::BLACK);
    }

    /// Cycle to the next effect this board supports.
    pub fn next_effect(&mut self) -> Effect {
        let next = self.effect.next_supported(&self.layout);
        self.set_effect(next);
        next
    }

    /// Run one effect pass and return the frame with brightness applied.
    /// The working buffer keeps full brightness so trails fade the same
    /// at any output level.
    pub fn render_frame(&mut self, now: Instant) -> Vec<Rgb> {
        self.hands.tick(now, self.clock.as_ref());
        let elapsed_ms = now.saturating_duration_since(self.start).as_millis() as u64;

        let ctx = FrameContext {
            phase: beat8(self.speed, elapsed_ms),
            palette: &self.palette,
            gradient_palette: &self.gradient_palette,
            hands: &self.hands,
            clock_fade: self.clock_fade,
        };
        effects::render(self.effect, &self.layout, &mut self.leds, &ctx);
        self.frame_count += 1;

        self.leds.iter().map(|c| c.scale(self.brightness)).collect()
    }
}

/// Frame as a JSON array of "RRGGBB" strings in physical order.
pub fn frame_to_json(frame: &[Rgb]) -> Result<String> {
    let hex: Vec<String> = frame.iter().map(Rgb::to_hex).collect();
    Ok(serde_json::to_string(&hex)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::boards::Board;
    use std::time::Duration;

    fn renderer(board: Board, effect: Effect) -> Renderer {
        let config = Config {
            effect: effect.name().to_string(),
            ..Config::default()
        };
        let clock = FixedClock { hour: 10, minute: 10, second: 30 };
        Renderer::new(board.layout().unwrap(), &config, Box::new(clock)).unwrap()
    }

    #[test]
    fn test_frame_matches_board_size() {
        for board in Board::all() {
            let mut r = renderer(*board, Effect::AnglePalette);
            let frame = r.render_frame(Instant::now());
            assert_eq!(frame.len(), board.layout().unwrap().pixel_count());
        }
    }

    #[test]
    fn test_brightness_applies_to_output_only() {
        let mut r = renderer(Board::Fibonacci64, Effect::AnalogClock);
        let config = Config {
            effect: Effect::AnalogClock.name().to_string(),
            brightness: 0.0,
            ..Config::default()
        };
        r.apply_config(&config).unwrap();
        let frame = r.render_frame(Instant::now());
        assert!(frame.iter().all(|c| c.is_black()));
        assert!(r.leds.iter().any(|c| !c.is_black()));
    }

    #[test]
    fn test_phase_advances_with_time() {
        let mut r = renderer(Board::Fibonacci128, Effect::AnglePalette);
        let start = r.start;
        let a = r.render_frame(start);
        let b = r.render_frame(start + Duration::from_millis(500));
        assert_ne!(a, b);
        assert_eq!(r.frame_count(), 2);
    }

    #[test]
    fn test_unsupported_effect_is_rejected() {
        let config = Config {
            effect: Effect::SpiralClock21.name().to_string(),
            ..Config::default()
        };
        let layout = Board::Kraken64.layout().unwrap();
        let clock = FixedClock { hour: 0, minute: 0, second: 0 };
        assert!(Renderer::new(layout, &config, Box::new(clock)).is_err());
        assert!(resolve_effect("no_such_effect", &Board::Fibonacci32.layout().unwrap()).is_err());
    }

    #[test]
    fn test_bad_reload_keeps_previous_state() {
        let mut r = renderer(Board::Fibonacci256, Effect::AnglePalette);
        let config = Config {
            effect: Effect::AnalogClock.name().to_string(),
            palette: "definitely not a palette".to_string(),
            ..Config::default()
        };
        assert!(r.apply_config(&config).is_err());
        assert_eq!(r.effect(), Effect::AnglePalette);
        assert_eq!(r.palette().name(), "Rainbow");
    }

    #[test]
    fn test_next_effect_skips_unsupported() {
        let mut r = renderer(Board::Kraken64, Effect::AnalogClock);
        assert_eq!(r.next_effect(), Effect::AnglePalette);
    }

    #[test]
    fn test_frame_to_json() {
        let json = frame_to_json(&[Rgb::RED, Rgb::new(0, 16, 255)]).unwrap();
        assert_eq!(json, r#"["FF0000","0010FF"]"#);
    }
}
