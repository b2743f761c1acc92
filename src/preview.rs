// Preview Module - Terminal preview of the board using a ratatui canvas
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::widgets::canvas::{Canvas, Points};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Terminal;
use std::f64::consts::{FRAC_PI_2, TAU};
use std::io::{self, Stdout};
use std::time::Duration;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::layout::PixelLayout;
use crate::renderer::Renderer;
use crate::types::Rgb;

// Unlit pixels are drawn dim so the board outline stays visible
const UNLIT: Color = Color::Rgb(28, 28, 28);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewAction {
    Quit,
    NextEffect,
    ToggleInfo,
}

/// Numbers shown around the canvas that the renderer does not track.
pub struct PreviewStatus {
    pub actual_fps: f64,
    pub target_fps: f64,
    pub speed: u8,
    pub brightness: f64,
    pub clock: OffsetDateTime,
}

/// Canvas position of a pixel in a 0..=255 square, y pointing up.
///
/// Boards with a Cartesian map use it directly; others are placed in polar
/// form from angle and radius proxy, with angle 0 at the top and angles
/// growing counter-clockwise.
pub fn pixel_position(layout: &PixelLayout, i: usize) -> Option<(f64, f64)> {
    if let (Ok(x), Ok(y)) = (layout.coord_x(i), layout.coord_y(i)) {
        return Some((x as f64, 255.0 - y as f64));
    }
    let angle = layout.angle(i).ok()?;
    let radius = layout.radius_proxy(i).unwrap_or(255) as f64 / 2.0;
    let theta = FRAC_PI_2 + angle as f64 / 256.0 * TAU;
    Some((127.5 + radius * theta.cos(), 127.5 + radius * theta.sin()))
}

fn format_clock(now: OffsetDateTime) -> String {
    now.format(format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_default()
}

fn pixel_color(c: &Rgb) -> Color {
    if c.is_black() {
        UNLIT
    } else {
        Color::Rgb(c.r, c.g, c.b)
    }
}

pub struct Preview {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    positions: Vec<(f64, f64)>,
    show_info: bool,
}

impl Preview {
    /// Switch the terminal into raw alternate-screen mode.
    pub fn enter(layout: &PixelLayout) -> Result<Self> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut stdout = io::stdout();
        stdout.execute(EnterAlternateScreen)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        terminal.clear()?;
        terminal.hide_cursor()?;

        let mut preview = Preview {
            terminal,
            positions: Vec::new(),
            show_info: false,
        };
        preview.set_layout(layout);
        Ok(preview)
    }

    pub fn set_layout(&mut self, layout: &PixelLayout) {
        self.positions = (0..layout.pixel_count())
            .map(|i| pixel_position(layout, i).unwrap_or((127.5, 127.5)))
            .collect();
    }

    pub fn toggle_info(&mut self) {
        self.show_info = !self.show_info;
    }

    pub fn draw(&mut self, renderer: &Renderer, frame: &[Rgb], status: &PreviewStatus) -> Result<()> {
        let layout = renderer.layout();
        let positions = &self.positions;
        let show_info = self.show_info;

        self.terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(3), // Header
                    Constraint::Min(10),   // Board
                    Constraint::Length(3), // Footer
                ])
                .split(f.size());

            let header_text = format!(
                "spiralwled - {} ({} pixels, {})",
                layout.name(),
                layout.pixel_count(),
                layout.topology().name()
            );
            let header = Paragraph::new(header_text)
                .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL));
            f.render_widget(header, chunks[0]);

            let body = if show_info {
                Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([Constraint::Min(20), Constraint::Length(34)])
                    .split(chunks[1])
            } else {
                Layout::default()
                    .constraints([Constraint::Min(20)])
                    .split(chunks[1])
            };

            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(renderer.effect().name()),
                )
                .marker(Marker::HalfBlock)
                .x_bounds([0.0, 255.0])
                .y_bounds([0.0, 255.0])
                .paint(|ctx| {
                    for (pos, color) in positions.iter().zip(frame.iter()) {
                        ctx.draw(&Points {
                            coords: &[*pos],
                            color: pixel_color(color),
                        });
                    }
                });
            f.render_widget(canvas, body[0]);

            if show_info {
                let scale = layout.radius_scale();
                let lit = frame.iter().filter(|c| !c.is_black()).count();
                let info_text = format!(
                    "Effect: {}\n\
Palette: {}\n\
Speed: {} bpm\n\
Brightness: {:.0}%\n\
FPS: {:.1} / {:.0}\n\
Frames: {}\n\
\n\
Topology: {}\n\
Radius scale: {}/{}\n\
Lit pixels: {}",
                    renderer.effect().name(),
                    renderer.palette().name(),
                    status.speed,
                    status.brightness * 100.0,
                    status.actual_fps,
                    status.target_fps,
                    renderer.frame_count(),
                    layout.topology().name(),
                    scale.multiplier,
                    scale.divisor,
                    lit,
                );
                let info = Paragraph::new(info_text)
                    .style(Style::default().fg(Color::White))
                    .block(Block::default().borders(Borders::ALL).title("Info"));
                f.render_widget(info, body[1]);
            }

            let footer_text = format!(
                "Press 'q' to quit | 'n' next effect | 'i' info | {}",
                format_clock(status.clock)
            );
            let footer = Paragraph::new(footer_text)
                .style(Style::default().fg(Color::Gray))
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL));
            f.render_widget(footer, chunks[2]);
        })?;
        Ok(())
    }

    /// Wait up to `timeout` for a key press.
    pub fn poll_action(&mut self, timeout: Duration) -> Result<Option<PreviewAction>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        let Event::Key(key) = event::read()? else {
            return Ok(None);
        };
        if key.kind != KeyEventKind::Press {
            return Ok(None);
        }
        let action = match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(PreviewAction::Quit),
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(PreviewAction::Quit),
            KeyCode::Char('n') | KeyCode::Char('N') => Some(PreviewAction::NextEffect),
            KeyCode::Char('i') | KeyCode::Char('I') => Some(PreviewAction::ToggleInfo),
            _ => None,
        };
        Ok(action)
    }
}

impl Drop for Preview {
    fn drop(&mut self) {
        let _ = self.terminal.show_cursor();
        let _ = disable_raw_mode();
        let _ = self.terminal.backend_mut().execute(LeaveAlternateScreen);
    }
}
