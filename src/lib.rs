// THEORY:
// This file is the main entry point for the `sprite_forge` library crate.
// It follows the standard Rust convention of using `lib.rs` to define the
// public API exposed to external consumers (like the bundled CLI).
//
// The primary goal is to export the `SeparationPipeline` and its associated
// data structures (`PipelineConfig`, `SheetReport`, etc.) as the clean,
// high-level interface for the whole asset-prep toolkit. The internal
// modules (`core_modules`) stay reachable for callers who want to drive a
// single stage, such as running the partitioner without classification.

pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;
