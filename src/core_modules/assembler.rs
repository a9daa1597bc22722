// THEORY:
// The `assembler` module is the grouping layer. Upstream stages work on one
// cell at a time; the assembler is the join point that turns a flat stream
// of per-cell verdicts into per-movement collections ready for export.
//
// Key architectural principles:
// 1.  **Order Preservation**: Groups appear in the order their label was
//     first seen in the scan, and members keep scan order within a group.
//     Frame order inside a strip IS the animation; shuffling it breaks the
//     output even when every frame is classified correctly.
// 2.  **No Empty Groups**: A group exists only because a cell landed in it.
//     Labels the policy defines but no cell matched simply never appear.
// 3.  **Two Ways In**: Cells arrive grouped either by classified color or by
//     an explicit `FramePlan` for sheets that key frames by position instead
//     of backdrop. Both paths produce the same `MovementGroup` shape, so
//     everything downstream (strip compositing, export) is shared.

use crate::core_modules::cell::Cell;
use crate::core_modules::classifier::{MovementLabel, UNKNOWN_LABEL};
use crate::core_modules::color::Color;
use crate::error::{SpriteError, SpriteResult};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// One cell's classification verdict: the label, the cell itself, and the
/// sampled color kept for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub cell: Cell,
    /// The background color estimate that drove the label.
    pub color: Color,
    pub label: MovementLabel,
}

/// All cells that share one movement label, in sheet scan order.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementGroup {
    pub label: MovementLabel,
    pub members: Vec<Cell>,
}

/// Folds per-cell results into groups, keyed by label.
///
/// Input order is preserved twice over: members keep their relative order,
/// and groups are emitted in first-seen order.
pub fn group_results(results: Vec<ClassificationResult>) -> Vec<MovementGroup> {
    let mut groups: Vec<MovementGroup> = Vec::new();
    let mut index_by_label: HashMap<MovementLabel, usize> = HashMap::new();

    for result in results {
        let ClassificationResult { cell, label, .. } = result;
        let index = match index_by_label.get(&label) {
            Some(&index) => index,
            None => {
                let index = groups.len();
                index_by_label.insert(label.clone(), index);
                groups.push(MovementGroup {
                    label,
                    members: Vec::new(),
                });
                index
            }
        };
        groups[index].members.push(cell);
    }
    groups
}

/// An explicit frame-index layout for sheets keyed by position. Spans are
/// half-open `[start, end)` over the row-major cell index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FramePlan {
    pub entries: Vec<PlanEntry>,
}

/// One labeled span of cell indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub label: String,
    pub start: u32,
    pub end: u32,
}

impl FramePlan {
    /// Checks spans are non-empty and no entry claims the reserved label.
    pub fn validate(&self) -> SpriteResult<()> {
        for entry in &self.entries {
            if entry.label.is_empty() {
                return Err(SpriteError::policy("plan entry with an empty label"));
            }
            if entry.label == UNKNOWN_LABEL {
                return Err(SpriteError::policy(format!(
                    "'{UNKNOWN_LABEL}' is reserved for unplanned cells and cannot be a plan label"
                )));
            }
            if entry.start >= entry.end {
                return Err(SpriteError::policy(format!(
                    "plan entry '{}' has an empty span [{}, {})",
                    entry.label, entry.start, entry.end
                )));
            }
        }
        Ok(())
    }

    /// The label of the first entry whose span contains `index`.
    pub fn label_for(&self, index: u32) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.start <= index && index < entry.end)
            .map(|entry| entry.label.as_str())
    }

    pub fn from_json_file(path: &Path) -> SpriteResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Groups cells by an explicit plan over their scan index. Cells no span
/// claims land in the `unknown` group, same as a classification miss.
pub fn group_by_plan(cells: Vec<Cell>, plan: &FramePlan) -> SpriteResult<Vec<MovementGroup>> {
    plan.validate()?;

    let mut groups: Vec<MovementGroup> = Vec::new();
    let mut index_by_label: HashMap<MovementLabel, usize> = HashMap::new();

    for (scan_index, cell) in cells.into_iter().enumerate() {
        let label = match plan.label_for(scan_index as u32) {
            Some(name) => MovementLabel::Category(name.to_string()),
            None => MovementLabel::Unknown,
        };
        let index = match index_by_label.get(&label) {
            Some(&index) => index,
            None => {
                let index = groups.len();
                index_by_label.insert(label.clone(), index);
                groups.push(MovementGroup {
                    label,
                    members: Vec::new(),
                });
                index
            }
        };
        groups[index].members.push(cell);
    }
    Ok(groups)
}

/// Concatenates cells left-to-right into one horizontal strip.
///
/// The strip is as wide as the members combined and as tall as the tallest
/// member. Shorter members are top-aligned; the rows beneath them keep the
/// fill color.
pub fn composite_strip(members: &[Cell], fill: Rgba<u8>) -> RgbaImage {
    let total_width: u32 = members.iter().map(Cell::width).sum();
    let max_height: u32 = members.iter().map(Cell::height).max().unwrap_or(0);

    let mut strip = RgbaImage::from_pixel(total_width, max_height, fill);
    let mut offset_x = 0;
    for cell in members {
        for y in 0..cell.height() {
            for x in 0..cell.width() {
                strip.put_pixel(offset_x + x, y, *cell.image.get_pixel(x, y));
            }
        }
        offset_x += cell.width();
    }
    strip
}
