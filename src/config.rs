// Config Module - Configuration management and command-line argument parsing
use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::effects::Effect;
use crate::boards::Board;

// Global storage for custom config path
static CUSTOM_CONFIG_PATH: OnceLock<Option<String>> = OnceLock::new();

const APP_DIR: &str = "spiralwled";
const DEFAULT_CONFIG_NAME: &str = "spiralwled.conf";

/// Quoted and escaped TOML string literal.
fn toml_string(s: &str) -> String {
    toml::Value::String(s.to_string()).to_string()
}

#[derive(Parser, Debug, Default)]
#[command(
    author,
    version,
    about = "Spatial effects for LED boards wired along a Fibonacci spiral",
    long_about = "Renders palette sweeps and clocks onto LED boards whose wiring order does not\n\
                  match their layout (Fibonacci spirals, Kraken64). Frames are previewed in the\n\
                  terminal or rendered headless; board tables ship as JSON assets and can be\n\
                  regenerated from the Vogel spiral."
)]
pub struct Args {
    /// Built-in board (fibonacci512, fibonacci256, fibonacci128, fibonacci64, fibonacci32, kraken64)
    #[arg(short, long)]
    pub board: Option<String>,

    /// Load the board tables from a JSON asset instead of a built-in board
    #[arg(long)]
    pub board_file: Option<String>,

    /// Effect to render (see --list)
    #[arg(short, long)]
    pub effect: Option<String>,

    /// Palette name or comma-separated hex colours
    #[arg(short, long)]
    pub palette: Option<String>,

    /// Palette used by the *_gradient_palette effects
    #[arg(long)]
    pub gradient_palette: Option<String>,

    /// Animation speed in beats per minute
    #[arg(short, long)]
    pub speed: Option<u8>,

    /// Target framerate
    #[arg(long)]
    pub fps: Option<f64>,

    /// Output brightness (0.0 to 1.0)
    #[arg(long)]
    pub brightness: Option<f64>,

    /// How much of the previous frame the clock effects fade per frame (0-255)
    #[arg(long)]
    pub clock_fade: Option<u8>,

    /// Clock time zone: "local", "utc", or an offset such as "+02:00"
    #[arg(long)]
    pub utc_offset: Option<String>,

    /// Config file path or name (e.g., --cfg /full/path or --cfg myconf for ~/.config/spiralwled/myconf.conf)
    #[arg(long)]
    pub cfg: Option<String>,

    /// Render without the terminal preview
    #[arg(long)]
    pub headless: bool,

    /// Stop after this many frames (headless only)
    #[arg(long)]
    pub frames: Option<u64>,

    /// Render one frame and print it as a JSON array of hex colours
    #[arg(long)]
    pub dump_frame: bool,

    /// List boards, effects and palettes
    #[arg(long)]
    pub list: bool,

    /// Print a generated Vogel spiral board asset with this many pixels
    #[arg(long, value_name = "N")]
    pub generate_vogel: Option<usize>,

    /// Wiring for --generate-vogel: "auto", "radial", or ARMS:STRIDE[:in|out]
    #[arg(long)]
    pub wiring: Option<String>,

    /// Quiet mode
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    #[serde(skip)]
    pub config_path: Option<PathBuf>, // Stores the config file path (not serialized)

    pub board: String,
    pub board_file: String, // Empty = use the built-in board
    pub effect: String,
    pub palette: String,
    pub gradient_palette: String,
    pub interpolation: String,
    pub speed: u8,
    pub fps: f64,
    pub brightness: f64,
    pub clock_fade: u8,
    pub utc_offset: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            config_path: None,
            board: Board::Fibonacci256.name().to_string(),
            board_file: String::new(),
            effect: Effect::AnglePalette.name().to_string(),
            palette: "Rainbow".to_string(),
            gradient_palette: "Ocean".to_string(),
            interpolation: "linear".to_string(),
            speed: 30,
            fps: 60.0,
            brightness: 1.0,
            clock_fade: 32,
            utc_offset: "local".to_string(),
        }
    }
}

impl Config {
    pub fn merge_with_args(&mut self, args: &Args) -> bool {
        // Track if any args were actually provided
        let mut args_provided = false;

        if let Some(ref board) = args.board {
            self.board = board.clone();
            // An explicit built-in board wins over a board file from the config
            if args.board_file.is_none() {
                self.board_file.clear();
            }
            args_provided = true;
        }

        if let Some(ref board_file) = args.board_file {
            self.board_file = board_file.clone();
            args_provided = true;
        }

        if let Some(ref effect) = args.effect {
            self.effect = effect.clone();
            args_provided = true;
        }

        if let Some(ref palette) = args.palette {
            self.palette = palette.clone();
            args_provided = true;
        }

        if let Some(ref gradient_palette) = args.gradient_palette {
            self.gradient_palette = gradient_palette.clone();
            args_provided = true;
        }

        if let Some(speed) = args.speed {
            self.speed = speed;
            args_provided = true;
        }

        if let Some(fps) = args.fps {
            self.fps = fps;
            args_provided = true;
        }

        if let Some(brightness) = args.brightness {
            self.brightness = brightness;
            args_provided = true;
        }

        if let Some(clock_fade) = args.clock_fade {
            self.clock_fade = clock_fade;
            args_provided = true;
        }

        if let Some(ref utc_offset) = args.utc_offset {
            self.utc_offset = utc_offset.clone();
            args_provided = true;
        }

        args_provided
    }

    /// Set the global config path (called once at startup)
    pub fn set_config_path(cfg: Option<String>) {
        let _ = CUSTOM_CONFIG_PATH.set(cfg);
    }

    /// Get the global config path (if set)
    fn get_config_path_arg() -> Option<&'static str> {
        CUSTOM_CONFIG_PATH.get().and_then(|opt| opt.as_deref())
    }

    pub fn config_path(cfg_arg: Option<&str>) -> Result<PathBuf> {
        // Priority: explicit arg > global > default
        let cfg = cfg_arg.or_else(|| Self::get_config_path_arg());

        if let Some(cfg) = cfg {
            let path = PathBuf::from(cfg);
            if path.is_absolute() || cfg.contains('/') || cfg.contains('\\') {
                return Ok(path);
            }

            // Otherwise treat as config name in config directory
            let filename = if cfg.ends_with(".conf") {
                cfg.to_string()
            } else {
                format!("{}.conf", cfg)
            };
            Ok(Self::config_dir()?.join(filename))
        } else {
            Ok(Self::config_dir()?.join(DEFAULT_CONFIG_NAME))
        }
    }

    fn config_dir() -> Result<PathBuf> {
        let home = std::env::var("HOME").context("HOME is not set")?;
        let config_dir = PathBuf::from(home).join(".config").join(APP_DIR);
        std::fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create {}", config_dir.display()))?;
        Ok(config_dir)
    }

    pub fn load_with_path(cfg_arg: Option<&str>) -> Result<Self> {
        let path = Self::config_path(cfg_arg)?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let mut parsed: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        parsed.config_path = Some(path.to_path_buf());
        parsed.sanitize();
        Ok(parsed)
    }

    pub fn load() -> Result<Self> {
        Self::load_with_path(None)
    }

    /// Sanitize config values to handle common formatting issues
    pub fn sanitize(&mut self) {
        self.board = self.board.trim().to_lowercase();
        self.board_file = self.board_file.trim().to_string();
        self.effect = self.effect.trim().to_lowercase();
        self.palette = Self::sanitize_color_string(&self.palette);
        self.gradient_palette = Self::sanitize_color_string(&self.gradient_palette);
        self.interpolation = self.interpolation.trim().to_lowercase();
        self.utc_offset = self.utc_offset.trim().to_string();

        // Clamp numeric values to reasonable ranges
        self.fps = if self.fps.is_finite() { self.fps.clamp(1.0, 500.0) } else { 60.0 };
        self.brightness = if self.brightness.is_finite() {
            self.brightness.clamp(0.0, 1.0)
        } else {
            1.0
        };
    }

    /// Sanitize a palette string (preset name or comma-separated hex colours)
    fn sanitize_color_string(color: &str) -> String {
        let trimmed = color.trim().to_uppercase();

        if trimmed.is_empty() {
            return trimmed;
        }

        // Preset names contain letters beyond hex
        let has_non_hex = trimmed
            .chars()
            .any(|c| !c.is_ascii_hexdigit() && c != ',' && !c.is_whitespace());
        if has_non_hex {
            return color.trim().to_string();
        }

        trimmed
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn save(&self) -> Result<()> {
        let path = match &self.config_path {
            Some(path) => path.clone(),
            None => Self::config_path(None)?,
        };

        let mut sanitized = self.clone();
        sanitized.sanitize();

        // Build TOML with comments manually for better documentation
        let contents = format!(
            r#"# spiralwled Configuration File
# Edit this file while the program is running to change settings in real-time

# Built-in board
# Options: "fibonacci512", "fibonacci256", "fibonacci128", "fibonacci64", "fibonacci32", "kraken64"
board = {}

# JSON board asset to load instead of the built-in board (empty = use 'board')
board_file = {}

# Effect to render (run with --list for every option)
effect = {}

# Palette for the *_palette effects and the preview
# Preset name ("Rainbow", "Ocean", "Heat", ...) or hex gradient: "FF0000,00FF00,0000FF"
palette = {}

# Palette for the *_gradient_palette effects
gradient_palette = {}

# Colour interpolation for hex gradients
# Options: "linear", "basis", "catmullrom"
interpolation = {}

# Animation speed in beats per minute (0-255)
speed = {}

# Target frames per second
fps = {:?}

# Output brightness (0.0 to 1.0)
brightness = {:?}

# Background fade applied by the clock effects every frame (0 = trails forever, 255 = clear)
clock_fade = {}

# Clock time zone: "local", "utc", or an offset such as "+02:00"
utc_offset = {}
"#,
            toml_string(&sanitized.board),
            toml_string(&sanitized.board_file),
            toml_string(&sanitized.effect),
            toml_string(&sanitized.palette),
            toml_string(&sanitized.gradient_palette),
            toml_string(&sanitized.interpolation),
            sanitized.speed,
            sanitized.fps,
            sanitized.brightness,
            sanitized.clock_fade,
            toml_string(&sanitized.utc_offset),
        );

        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        Ok(())
    }
}
