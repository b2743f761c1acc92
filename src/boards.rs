// Boards Module - Built-in board assets and JSON layout loading
//
// The per-board tables are generated offline (see vogel.rs) and shipped as
// JSON under boards/. They are embedded at compile time and validated when a
// layout is built, so a broken table fails at startup rather than rendering
// garbage.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::layout::{Coordinates, LayoutError, PixelLayout, RadialOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopologyKind {
    Spiral,
    Segment,
    Unmapped,
}

/// On-disk form of a board layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardAsset {
    pub name: String,
    pub topology: TopologyKind,
    pub angles: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coords_x: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coords_y: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radial_order: Option<Vec<u16>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radial_order_inverse: Option<Vec<u16>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_distance: Option<Vec<u8>>,
}

impl BoardAsset {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse board layout JSON")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read board file {}", path.display()))?;
        Self::from_json(&contents)
            .with_context(|| format!("Invalid board file {}", path.display()))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate the tables and build the runtime layout.
    pub fn into_layout(self) -> Result<PixelLayout, LayoutError> {
        let coords = match (self.coords_x, self.coords_y) {
            (Some(x), Some(y)) => Some(Coordinates { x, y }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(LayoutError::MissingTable {
                    table: "coords_y",
                    topology: "coordinate map",
                })
            }
            (None, Some(_)) => {
                return Err(LayoutError::MissingTable {
                    table: "coords_x",
                    topology: "coordinate map",
                })
            }
        };

        match self.topology {
            TopologyKind::Spiral => {
                let to_rank = self.radial_order.ok_or(LayoutError::MissingTable {
                    table: "radial_order",
                    topology: "spiral",
                })?;
                let order = match self.radial_order_inverse {
                    Some(to_physical) => RadialOrder::new(to_rank, to_physical)?,
                    None => RadialOrder::from_ranks(to_rank)?,
                };
                PixelLayout::spiral(&self.name, self.angles, coords, order)
            }
            TopologyKind::Segment => {
                let distance = self.segment_distance.ok_or(LayoutError::MissingTable {
                    table: "segment_distance",
                    topology: "segment",
                })?;
                PixelLayout::segment(&self.name, self.angles, coords, distance)
            }
            TopologyKind::Unmapped => PixelLayout::unmapped(&self.name, self.angles, coords),
        }
    }
}

/// Boards whose tables ship with the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Board {
    Fibonacci512,
    Fibonacci256,
    Fibonacci128,
    Fibonacci64,
    Fibonacci32,
    Kraken64,
}

impl Board {
    pub fn all() -> &'static [Board] {
        &[
            Board::Fibonacci512,
            Board::Fibonacci256,
            Board::Fibonacci128,
            Board::Fibonacci64,
            Board::Fibonacci32,
            Board::Kraken64,
        ]
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "fibonacci512" | "fib512" => Some(Board::Fibonacci512),
            "fibonacci256" | "fib256" => Some(Board::Fibonacci256),
            "fibonacci128" | "fib128" => Some(Board::Fibonacci128),
            "fibonacci64" | "fib64" | "fibonacci64_full" | "fibonacci64_mini" | "fib64_mini" => {
                Some(Board::Fibonacci64)
            }
            "fibonacci32" | "fib32" => Some(Board::Fibonacci32),
            "kraken64" | "kraken" => Some(Board::Kraken64),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Board::Fibonacci512 => "fibonacci512",
            Board::Fibonacci256 => "fibonacci256",
            Board::Fibonacci128 => "fibonacci128",
            Board::Fibonacci64 => "fibonacci64",
            Board::Fibonacci32 => "fibonacci32",
            Board::Kraken64 => "kraken64",
        }
    }

    fn asset_json(&self) -> &'static str {
        match self {
            Board::Fibonacci512 => include_str!("../boards/fibonacci512.json"),
            Board::Fibonacci256 => include_str!("../boards/fibonacci256.json"),
            Board::Fibonacci128 => include_str!("../boards/fibonacci128.json"),
            Board::Fibonacci64 => include_str!("../boards/fibonacci64.json"),
            Board::Fibonacci32 => include_str!("../boards/fibonacci32.json"),
            Board::Kraken64 => include_str!("../boards/kraken64.json"),
        }
    }

    pub fn asset(&self) -> Result<BoardAsset> {
        BoardAsset::from_json(self.asset_json())
            .with_context(|| format!("Built-in board '{}' is corrupt", self.name()))
    }

    pub fn layout(&self) -> Result<PixelLayout> {
        let layout = self
            .asset()?
            .into_layout()
            .with_context(|| format!("Built-in board '{}' failed validation", self.name()))?;
        Ok(layout)
    }
}

/// Resolve the layout for a run: an explicit board file wins over a board name.
pub fn load_layout(board: &str, board_file: Option<&Path>) -> Result<PixelLayout> {
    if let Some(path) = board_file {
        let layout = BoardAsset::from_file(path)?
            .into_layout()
            .with_context(|| format!("Board file {} failed validation", path.display()))?;
        return Ok(layout);
    }

    let Some(board) = Board::from_string(board) else {
        let known: Vec<&str> = Board::all().iter().map(|b| b.name()).collect();
        anyhow::bail!("Unknown board '{}' (known: {})", board, known.join(", "));
    };
    board.layout()
}
