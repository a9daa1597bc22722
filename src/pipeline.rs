// THEORY:
// The `pipeline` module is the top-level API for sheet separation. It wires
// the partitioner, sampler, classifier, and assembler into one call and
// returns a report that accounts for every cell. The stages are pure with
// respect to the sheet, so the pipeline itself owns no mutable state; it is
// a configuration holder plus an orchestration function.

use crate::core_modules::assembler;
use crate::core_modules::cell::Cell;
use crate::core_modules::grid;
use crate::error::SpriteResult;
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

// Re-export key data structures for the public API.
pub use crate::core_modules::assembler::{
    ClassificationResult, FramePlan, MovementGroup, PlanEntry,
};
pub use crate::core_modules::classifier::{
    ClassifierPolicy, MovementClassifier, MovementLabel, UNKNOWN_LABEL,
};
pub use crate::core_modules::color::Color;
pub use crate::core_modules::grid::GridSpec;
pub use crate::core_modules::sampler::{BackgroundSampler, SamplerStrategy};

/// Default fill under short members in a composite strip: transparent black.
pub const DEFAULT_COMPOSITE_FILL: [u8; 4] = [0, 0, 0, 0];

fn default_composite_fill() -> [u8; 4] {
    DEFAULT_COMPOSITE_FILL
}

/// Configuration for one separation run, loadable from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// How to partition the sheet.
    pub grid: GridSpec,
    /// How to estimate each cell's background color.
    #[serde(default)]
    pub sampler: SamplerStrategy,
    /// How to map background colors to movement labels.
    #[serde(default)]
    pub policy: ClassifierPolicy,
    /// RGBA fill under short members in composite strips.
    #[serde(default = "default_composite_fill")]
    pub composite_fill: [u8; 4],
}

impl PipelineConfig {
    /// A config with the given grid and defaults everywhere else.
    pub fn new(grid: GridSpec) -> Self {
        Self {
            grid,
            sampler: SamplerStrategy::default(),
            policy: ClassifierPolicy::default(),
            composite_fill: DEFAULT_COMPOSITE_FILL,
        }
    }
}

/// One cell's verdict, kept without pixel data for cheap diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct CellTrace {
    pub row: u32,
    pub col: u32,
    /// The sampled background color. `None` when the label came from an
    /// explicit frame plan rather than color sampling.
    pub background: Option<Color>,
    pub label: MovementLabel,
}

/// The primary output of a separation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetReport {
    /// Movement groups in label-discovery order, members in scan order.
    pub groups: Vec<MovementGroup>,
    /// One trace per cell, in scan order.
    pub traces: Vec<CellTrace>,
}

impl SheetReport {
    pub fn total_cells(&self) -> usize {
        self.traces.len()
    }

    /// Cell counts per label, in label-discovery order. Always includes
    /// `unknown` when any cell went unclassified.
    pub fn label_counts(&self) -> Vec<(MovementLabel, usize)> {
        let mut counts: Vec<(MovementLabel, usize)> = Vec::new();
        for trace in &self.traces {
            match counts.iter_mut().find(|(label, _)| *label == trace.label) {
                Some((_, count)) => *count += 1,
                None => counts.push((trace.label.clone(), 1)),
            }
        }
        counts
    }
}

/// The main, top-level struct for sheet separation.
pub struct SeparationPipeline {
    config: PipelineConfig,
    classifier: MovementClassifier,
}

impl SeparationPipeline {
    /// Validates the policy and sampler up front; a malformed configuration
    /// never reaches the per-cell loop.
    pub fn new(config: PipelineConfig) -> SpriteResult<Self> {
        config.sampler.validate()?;
        let classifier = MovementClassifier::new(config.policy.clone())?;
        Ok(Self { config, classifier })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the full separation: partition, sample, classify, group.
    pub fn run(&self, sheet: &RgbaImage) -> SpriteResult<SheetReport> {
        self.run_with_sampler(sheet, &self.config.sampler)
    }

    /// Runs the separation with a caller-supplied background estimator.
    pub fn run_with_sampler(
        &self,
        sheet: &RgbaImage,
        sampler: &dyn BackgroundSampler,
    ) -> SpriteResult<SheetReport> {
        // Stage 1: Partition
        let cells = grid::partition(sheet, &self.config.grid)?;

        // Stage 2 + 3: Sample and classify each cell
        let mut results = Vec::with_capacity(cells.len());
        let mut traces = Vec::with_capacity(cells.len());
        for cell in cells {
            let (result, trace) = self.classify_cell(cell, sampler)?;
            results.push(result);
            traces.push(trace);
        }

        // Stage 4: Group by label
        let groups = assembler::group_results(results);
        let report = SheetReport { groups, traces };
        log_summary(&report);
        Ok(report)
    }

    /// Partitions the sheet and groups cells by an explicit frame plan,
    /// skipping sampling and classification entirely.
    pub fn run_plan(&self, sheet: &RgbaImage, plan: &FramePlan) -> SpriteResult<SheetReport> {
        let cells = grid::partition(sheet, &self.config.grid)?;

        let mut traces = Vec::with_capacity(cells.len());
        for (scan_index, cell) in cells.iter().enumerate() {
            let label = match plan.label_for(scan_index as u32) {
                Some(name) => MovementLabel::Category(name.to_string()),
                None => MovementLabel::Unknown,
            };
            traces.push(CellTrace {
                row: cell.row,
                col: cell.col,
                background: None,
                label,
            });
        }

        let groups = assembler::group_by_plan(cells, plan)?;
        let report = SheetReport { groups, traces };
        log_summary(&report);
        Ok(report)
    }

    /// Builds one horizontal strip per group using the configured fill.
    pub fn build_composites(&self, report: &SheetReport) -> Vec<(MovementLabel, RgbaImage)> {
        let fill = Rgba(self.config.composite_fill);
        report
            .groups
            .iter()
            .map(|group| {
                (
                    group.label.clone(),
                    assembler::composite_strip(&group.members, fill),
                )
            })
            .collect()
    }

    /// Samples and classifies one cell. Shared with the parallel runner.
    pub(crate) fn classify_cell(
        &self,
        cell: Cell,
        sampler: &dyn BackgroundSampler,
    ) -> SpriteResult<(ClassificationResult, CellTrace)> {
        let color = sampler.sample(&cell)?;
        let label = self.classifier.classify(color);

        if label.is_unknown() {
            tracing::info!(
                row = cell.row,
                col = cell.col,
                background = %color,
                "cell matched no rule; grouped as unknown"
            );
        } else {
            tracing::debug!(
                row = cell.row,
                col = cell.col,
                background = %color,
                label = %label,
                "classified cell"
            );
        }

        let trace = CellTrace {
            row: cell.row,
            col: cell.col,
            background: Some(color),
            label: label.clone(),
        };
        Ok((ClassificationResult { cell, color, label }, trace))
    }
}

pub(crate) fn log_summary(report: &SheetReport) {
    for (label, count) in report.label_counts() {
        tracing::info!(label = %label, count, "label total");
    }
    tracing::info!(
        cells = report.total_cells(),
        groups = report.groups.len(),
        "sheet separation complete"
    );
}
