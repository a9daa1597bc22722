//! Error types shared across the sprite preparation pipeline.
//!
//! Structural problems (a grid that cannot partition the sheet, a cell with
//! no pixels) are fatal and abort the run. A sampled color that matches no
//! classification rule is NOT an error; it lands in the `unknown` group and
//! is reported through the normal result path.

use thiserror::Error;

/// Crate-wide result alias.
pub type SpriteResult<T> = Result<T, SpriteError>;

#[derive(Debug, Error)]
pub enum SpriteError {
    /// The requested grid cannot partition the sheet into non-empty cells.
    #[error(
        "invalid grid: {rows} rows x {cols} cols over a {width}x{height} sheet yields zero-sized cells"
    )]
    InvalidGrid {
        rows: u32,
        cols: u32,
        width: u32,
        height: u32,
    },

    /// The given frame size cannot cut the sheet into whole frames.
    #[error(
        "invalid frame size: {frame_width}x{frame_height} frames do not fit a {width}x{height} sheet"
    )]
    InvalidFrameSize {
        frame_width: u32,
        frame_height: u32,
        width: u32,
        height: u32,
    },

    /// A zero-pixel cell reached the background sampler. Grid validation
    /// makes this unreachable through the pipeline; hitting it means a cell
    /// was constructed by hand with no pixel data.
    #[error("cell ({row}, {col}) has no pixels to sample")]
    EmptyCell { row: u32, col: u32 },

    /// The classification policy, frame plan, or sampler configuration is
    /// structurally unusable.
    #[error("invalid configuration: {message}")]
    Policy { message: String },

    /// The parallel worker pool shut down before finishing a sheet.
    #[error("worker pool failure: {message}")]
    Pool { message: String },

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpriteError {
    /// Convenience constructor for policy validation failures.
    pub fn policy(message: impl Into<String>) -> Self {
        Self::Policy {
            message: message.into(),
        }
    }

    pub fn pool(message: impl Into<String>) -> Self {
        Self::Pool {
            message: message.into(),
        }
    }
}
