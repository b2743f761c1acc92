// spiralwled - spatial effects for LED boards wired along a Fibonacci spiral
use anyhow::{Context, Result};
use clap::Parser;
use notify::{Event as NotifyEvent, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};
use time::UtcOffset;
use tracing_subscriber::EnvFilter;

mod boards;
mod clock;
mod config;
mod effects;
mod layout;
mod math8;
mod palette;
mod preview;
mod region;
mod renderer;
mod spiral;
mod types;
mod vogel;

use clock::{parse_utc_offset, WallClock};
use config::{Args, Config};
use effects::Effect;
use boards::{load_layout, Board};
use vogel::Wiring;
use preview::{Preview, PreviewAction, PreviewStatus};
use renderer::{frame_to_json, resolve_effect, Renderer};
use types::ExitReason;

// How often headless mode logs frame statistics
const STATS_INTERVAL: Duration = Duration::from_secs(5);

fn init_logging(args: &Args) {
    let default_level = if args.quiet {
        "error"
    } else if args.headless || args.dump_frame || args.list || args.generate_vogel.is_some() {
        "info"
    } else {
        // the preview owns the terminal; only problems get through
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn spawn_config_watcher(config_path: PathBuf, config_change_tx: mpsc::Sender<()>) {
    std::thread::spawn(move || {
        let (tx, rx) = mpsc::channel();
        let mut watcher = match RecommendedWatcher::new(tx, notify::Config::default()) {
            Ok(w) => w,
            Err(e) => {
                tracing::warn!("config watcher unavailable: {}", e);
                return;
            }
        };

        if let Err(e) = watcher.watch(&config_path, RecursiveMode::NonRecursive) {
            tracing::warn!(path = %config_path.display(), "cannot watch config: {}", e);
            return;
        }

        loop {
            match rx.recv() {
                Ok(Ok(NotifyEvent { kind, .. })) => {
                    if matches!(kind, notify::EventKind::Modify(_))
                        && config_change_tx.send(()).is_err()
                    {
                        break;
                    }
                }
                Err(_) => break,
                _ => {}
            }
        }
    });
}

/// Live settings shared by both frame loops.
struct Session<'a> {
    config: Config,
    config_path: &'a Path,
    config_change_rx: &'a mpsc::Receiver<()>,
    local_offset: UtcOffset,
}

impl Session<'_> {
    /// Like `parse_utc_offset`, but "local" reuses the offset read at startup.
    fn resolve_offset(&self, s: &str) -> Result<UtcOffset> {
        if s.trim().eq_ignore_ascii_case("local") {
            Ok(self.local_offset)
        } else {
            parse_utc_offset(s)
        }
    }

    /// Load the board named by `config` and build a renderer for it. With
    /// `fallback_effect`, an effect the board cannot draw is swapped for
    /// `angle_palette` instead of failing.
    fn build_renderer(&self, config: &mut Config, fallback_effect: bool) -> Result<Renderer> {
        let layout = load_layout(&config.board, board_file(config))?;

        if let Err(e) = resolve_effect(&config.effect, &layout) {
            if !fallback_effect {
                return Err(e);
            }
            tracing::warn!("{:#}; falling back to {}", e, Effect::AnglePalette.name());
            config.effect = Effect::AnglePalette.name().to_string();
        }

        let clock_offset = self.resolve_offset(&config.utc_offset)?;
        let renderer = Renderer::new(layout, config, Box::new(WallClock::new(clock_offset)))?;
        tracing::info!(
            board = renderer.layout().name(),
            pixels = renderer.layout().pixel_count(),
            topology = renderer.layout().topology().name(),
            "board loaded"
        );
        Ok(renderer)
    }

    /// Apply pending config edits. On a board change the new renderer
    /// replaces `renderer` and the frame loop is told to restart; edits that
    /// fail to load leave everything as it was.
    fn check_reload(&mut self, renderer: &mut Renderer) -> Option<ExitReason> {
        let mut changed = false;
        while self.config_change_rx.try_recv().is_ok() {
            changed = true;
        }
        if !changed {
            return None;
        }

        let new_config = match Config::load_from(self.config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("ignoring config change: {:#}", e);
                return None;
            }
        };
        if new_config == self.config {
            return None;
        }

        if new_config.board != self.config.board || new_config.board_file != self.config.board_file {
            let mut new_config = new_config;
            return match self.build_renderer(&mut new_config, true) {
                Ok(new_renderer) => {
                    tracing::info!(board = %new_config.board, "board changed, layout rebuilt");
                    *renderer = new_renderer;
                    self.config = new_config;
                    Some(ExitReason::BoardChanged)
                }
                Err(e) => {
                    tracing::warn!("ignoring board change: {:#}", e);
                    None
                }
            };
        }

        if let Err(e) = renderer.apply_config(&new_config) {
            tracing::warn!("ignoring config change: {:#}", e);
            return None;
        }
        if new_config.utc_offset != self.config.utc_offset {
            match self.resolve_offset(&new_config.utc_offset) {
                Ok(offset) => renderer.set_time_source(Box::new(WallClock::new(offset))),
                Err(e) => tracing::warn!("keeping previous clock offset: {:#}", e),
            }
        }
        tracing::info!("config reloaded");
        self.config = new_config;
        None
    }

    fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.config.fps)
    }
}

fn run_headless(
    renderer: &mut Renderer,
    session: &mut Session,
    shutdown: &AtomicBool,
    max_frames: Option<u64>,
) -> Result<ExitReason> {
    let mut frames_since_stats = 0u64;
    let mut last_stats = Instant::now();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            return Ok(ExitReason::UserQuit);
        }
        let frame_start = Instant::now();
        if let Some(reason) = session.check_reload(renderer) {
            return Ok(reason);
        }

        let frame = renderer.render_frame(frame_start);
        frames_since_stats += 1;

        let elapsed = last_stats.elapsed();
        if elapsed >= STATS_INTERVAL {
            let lit = frame.iter().filter(|c| !c.is_black()).count();
            tracing::info!(
                effect = renderer.effect().name(),
                frames = renderer.frame_count(),
                fps = format_args!("{:.1}", frames_since_stats as f64 / elapsed.as_secs_f64()),
                lit,
                "frame stats"
            );
            frames_since_stats = 0;
            last_stats = Instant::now();
        }

        if max_frames.is_some_and(|max| renderer.frame_count() >= max) {
            tracing::info!(frames = renderer.frame_count(), "frame limit reached");
            return Ok(ExitReason::UserQuit);
        }

        let remaining = session.frame_interval().saturating_sub(frame_start.elapsed());
        std::thread::sleep(remaining);
    }
}

fn run_preview(renderer: &mut Renderer, session: &mut Session) -> Result<ExitReason> {
    let mut preview = Preview::enter(renderer.layout())?;

    let mut last_frame_count = renderer.frame_count();
    let mut actual_fps = 0.0f64;
    let mut last_fps_update = Instant::now();

    loop {
        let frame_start = Instant::now();
        if let Some(reason) = session.check_reload(renderer) {
            return Ok(reason);
        }

        let frame = renderer.render_frame(frame_start);

        let elapsed = last_fps_update.elapsed();
        if elapsed.as_secs() >= 1 {
            let frame_delta = renderer.frame_count().saturating_sub(last_frame_count);
            actual_fps = frame_delta as f64 / elapsed.as_secs_f64();
            last_frame_count = renderer.frame_count();
            last_fps_update = Instant::now();
        }

        let offset = session
            .resolve_offset(&session.config.utc_offset)
            .unwrap_or(UtcOffset::UTC);
        let status = PreviewStatus {
            actual_fps,
            target_fps: session.config.fps,
            speed: session.config.speed,
            brightness: session.config.brightness,
            clock: WallClock::new(offset).now(),
        };
        preview.draw(renderer, &frame, &status)?;

        let timeout = session.frame_interval().saturating_sub(frame_start.elapsed());
        match preview.poll_action(timeout)? {
            Some(PreviewAction::Quit) => return Ok(ExitReason::UserQuit),
            Some(PreviewAction::NextEffect) => {
                let effect = renderer.next_effect();
                session.config.effect = effect.name().to_string();
                if let Err(e) = session.config.save() {
                    tracing::warn!("could not persist effect: {:#}", e);
                }
            }
            Some(PreviewAction::ToggleInfo) => preview.toggle_info(),
            None => {}
        }
    }
}

fn print_lists() -> Result<()> {
    println!("Boards:");
    for board in Board::all() {
        let layout = board.layout()?;
        println!(
            "  {:<14} {:>4} pixels  {}",
            board.name(),
            layout.pixel_count(),
            layout.topology().name()
        );
    }
    println!("\nEffects:");
    for effect in Effect::all() {
        println!("  {}", effect.name());
    }
    println!("\nPalettes:");
    println!("  {}", palette::palette_names().join(", "));
    println!("  or a comma-separated hex gradient such as \"FF0000,00FF00,0000FF\"");
    Ok(())
}

fn generate_vogel(pixel_count: usize, wiring: Option<&str>) -> Result<()> {
    let wiring_str = wiring.unwrap_or("auto");
    let wiring = Wiring::parse(wiring_str, pixel_count)
        .with_context(|| format!("Invalid wiring '{}'", wiring_str))?;
    let asset = vogel::generate(&format!("vogel{}", pixel_count), pixel_count, wiring)?;
    println!("{}", asset.to_json()?);
    Ok(())
}

fn board_file(config: &Config) -> Option<&Path> {
    if config.board_file.is_empty() {
        None
    } else {
        Some(Path::new(&config.board_file))
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    // Set global config path immediately (before any config loads)
    Config::set_config_path(args.cfg.clone());

    if args.list {
        return print_lists();
    }
    if let Some(pixel_count) = args.generate_vogel {
        return generate_vogel(pixel_count, args.wiring.as_deref());
    }

    let cfg_arg = args.cfg.as_deref();
    let config_path = Config::config_path(cfg_arg)?;
    let config_file_exists = config_path.exists();

    let mut config = if config_file_exists {
        Config::load_with_path(cfg_arg)
            .with_context(|| format!("Please fix or delete {} to regenerate defaults", config_path.display()))?
    } else {
        Config {
            config_path: Some(config_path.clone()),
            ..Config::default()
        }
    };
    let args_provided = config.merge_with_args(&args);
    config.sanitize();

    // The local offset can only be read safely while single-threaded
    let local_offset = parse_utc_offset("local")?;

    if args.dump_frame {
        let clock_offset = parse_utc_offset(&config.utc_offset)?;
        let layout = load_layout(&config.board, board_file(&config))?;
        let mut renderer = Renderer::new(layout, &config, Box::new(WallClock::new(clock_offset)))?;
        let frame = renderer.render_frame(Instant::now());
        println!("{}", frame_to_json(&frame)?);
        return Ok(());
    }

    // Persist on first run and whenever the command line changed something
    if !config_file_exists || args_provided {
        config.save()?;
    }
    tracing::info!(path = %config_path.display(), "using config");

    let shutdown = Arc::new(AtomicBool::new(false));
    if args.headless {
        let flag = shutdown.clone();
        ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
            .context("Failed to install Ctrl+C handler")?;
    }

    let (config_change_tx, config_change_rx) = mpsc::channel();
    spawn_config_watcher(config_path.clone(), config_change_tx);

    let mut session = Session {
        config,
        config_path: &config_path,
        config_change_rx: &config_change_rx,
        local_offset,
    };
    let mut startup_config = session.config.clone();
    let mut renderer = session.build_renderer(&mut startup_config, false)?;

    // Board changes swap in a new renderer; the frame loop is re-entered so
    // the preview picks up the new layout
    loop {
        let exit = if args.headless {
            run_headless(&mut renderer, &mut session, &shutdown, args.frames)?
        } else {
            run_preview(&mut renderer, &mut session)?
        };

        match exit {
            ExitReason::UserQuit => break,
            ExitReason::BoardChanged => continue,
        }
    }

    tracing::info!("exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("spiralwled-main-{}-{}.conf", name, std::process::id()))
    }

    fn start_config(path: &Path) -> Config {
        Config {
            config_path: Some(path.to_path_buf()),
            effect: Effect::SpiralClock21.name().to_string(),
            utc_offset: "utc".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn test_bad_board_edits_keep_current_board() {
        let path = temp_path("bad-board");
        let config = start_config(&path);
        config.save().unwrap();

        let (tx, rx) = mpsc::channel();
        let mut session = Session {
            config: config.clone(),
            config_path: &path,
            config_change_rx: &rx,
            local_offset: UtcOffset::UTC,
        };
        let mut renderer = session.build_renderer(&mut config.clone(), false).unwrap();

        let edits = [
            Config { board: "fib999".to_string(), ..config.clone() },
            Config { board_file: "/nonexistent/board.json".to_string(), ..config.clone() },
            Config {
                board: "kraken64".to_string(),
                palette: "not a palette".to_string(),
                ..config.clone()
            },
            Config {
                board: "kraken64".to_string(),
                utc_offset: "+99".to_string(),
                ..config.clone()
            },
        ];
        for edit in edits {
            edit.save().unwrap();
            tx.send(()).unwrap();
            assert_eq!(session.check_reload(&mut renderer), None, "board {}", edit.board);
            assert_eq!(renderer.layout().name(), "fibonacci256");
            assert_eq!(renderer.effect(), Effect::SpiralClock21);
            assert_eq!(session.config, config);
        }
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_board_edit_swaps_renderer() {
        let path = temp_path("board-swap");
        let config = start_config(&path);
        config.save().unwrap();

        let (tx, rx) = mpsc::channel();
        let mut session = Session {
            config: config.clone(),
            config_path: &path,
            config_change_rx: &rx,
            local_offset: UtcOffset::UTC,
        };
        let mut renderer = session.build_renderer(&mut config.clone(), false).unwrap();

        Config { board: "kraken64".to_string(), ..config.clone() }.save().unwrap();
        tx.send(()).unwrap();
        assert_eq!(session.check_reload(&mut renderer), Some(ExitReason::BoardChanged));
        let _ = std::fs::remove_file(&path);

        assert_eq!(renderer.layout().name(), "kraken64");
        // spiral clocks need a radial order, which kraken64 lacks
        assert_eq!(renderer.effect(), Effect::AnglePalette);
        assert_eq!(session.config.board, "kraken64");
        assert_eq!(session.config.effect, Effect::AnglePalette.name());
    }

    #[test]
    fn test_startup_rejects_unsupported_effect() {
        let path = temp_path("startup");
        let (_tx, rx) = mpsc::channel();
        let session = Session {
            config: Config::default(),
            config_path: &path,
            config_change_rx: &rx,
            local_offset: UtcOffset::UTC,
        };
        let mut config = Config {
            board: "kraken64".to_string(),
            ..start_config(&path)
        };
        assert!(session.build_renderer(&mut config, false).is_err());
        assert!(session.build_renderer(&mut config, true).is_ok());
        assert_eq!(config.effect, Effect::AnglePalette.name());
    }
}
