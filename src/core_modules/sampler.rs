// THEORY:
// The `sampler` module estimates the background key color of a single cell.
// Sprite sheets built for color-keyed workflows paint each frame's backdrop
// in a solid color, but the subject usually touches the frame border, so a
// single probe pixel is unreliable. Sampling a whole border band and taking
// the most frequent color ignores the subject's intrusions.
//
// Key architectural principles:
// 1.  **Strategy Seam**: Estimation sits behind the `BackgroundSampler`
//     trait. The classifier consumes a `Color` and never learns where it
//     came from, so alternative estimators slot in without touching it.
// 2.  **Deterministic Ties**: Frequency ties are broken by first appearance
//     in the cell's fixed border traversal. Same sheet in, same colors out,
//     on every run.
// 3.  **Evidence Over Geometry**: The default band width of one pixel is a
//     tuning default, not a constant of nature. Noisy upscaled sheets want
//     wider bands; the width is part of the strategy data.

use crate::core_modules::cell::Cell;
use crate::core_modules::color::Color;
use crate::error::{SpriteError, SpriteResult};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;

const DEFAULT_EDGE_WIDTH: u32 = 1;

/// Estimates the background color of one cell.
///
/// Implementations must be pure with respect to the cell: the same pixel
/// data always yields the same estimate.
pub trait BackgroundSampler: Send + Sync {
    fn sample(&self, cell: &Cell) -> SpriteResult<Color>;
}

/// The built-in estimation strategies, selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SamplerStrategy {
    /// Most frequent color over the outermost `edge_width` pixel bands.
    BorderFrequency {
        #[serde(default = "default_edge_width")]
        edge_width: u32,
    },
    /// Most frequent of the four corner pixels. Cheap, and adequate for
    /// clean sheets where the subject never reaches a corner.
    Corners,
    /// Most frequent color over the entire cell. For sheets whose subjects
    /// crowd the border but cover less than half the frame.
    FullFrame,
}

fn default_edge_width() -> u32 {
    DEFAULT_EDGE_WIDTH
}

impl Default for SamplerStrategy {
    fn default() -> Self {
        Self::BorderFrequency {
            edge_width: DEFAULT_EDGE_WIDTH,
        }
    }
}

impl SamplerStrategy {
    /// Checks the strategy is usable: a zero-width border band would sample
    /// nothing from every cell.
    pub fn validate(&self) -> SpriteResult<()> {
        match self {
            Self::BorderFrequency { edge_width: 0 } => Err(SpriteError::policy(
                "border sampler edge_width must be at least 1",
            )),
            _ => Ok(()),
        }
    }
}

impl BackgroundSampler for SamplerStrategy {
    fn sample(&self, cell: &Cell) -> SpriteResult<Color> {
        self.validate()?;
        if cell.area() == 0 {
            return Err(SpriteError::EmptyCell {
                row: cell.row,
                col: cell.col,
            });
        }

        let colors = match self {
            Self::BorderFrequency { edge_width } => cell.border_colors(*edge_width),
            Self::Corners => cell
                .corner_colors()
                .map(|corners| corners.to_vec())
                .unwrap_or_default(),
            Self::FullFrame => cell.all_colors(),
        };

        // Area is non-zero, so every strategy produced at least one sample.
        most_frequent(&colors).ok_or(SpriteError::EmptyCell {
            row: cell.row,
            col: cell.col,
        })
    }
}

/// Picks the most frequent color; ties go to the color seen earliest.
fn most_frequent(colors: &[Color]) -> Option<Color> {
    let mut tally: HashMap<Color, (u32, usize)> = HashMap::new();
    for (index, color) in colors.iter().enumerate() {
        let entry = tally.entry(*color).or_insert((0, index));
        entry.0 += 1;
    }
    tally
        .into_iter()
        .max_by_key(|(_, (count, first_seen))| (*count, Reverse(*first_seen)))
        .map(|(color, _)| color)
}
