// THEORY:
// The `grid` module is the partitioning layer. It cuts a full sprite sheet
// into a uniform grid of `Cell`s, and it is the single place where sheet
// geometry is validated. Everything downstream may assume cells are
// non-empty and uniformly sized.
//
// Key architectural principles:
// 1.  **Integer Truncation**: Cell dimensions are `sheet / count` in integer
//     math. When the sheet does not divide evenly, the remainder pixels on
//     the right and bottom edges are dropped, never redistributed. Artists
//     export padded sheets often enough that this is routine, so it is
//     logged rather than treated as an error.
// 2.  **Fail Fast**: A grid that would produce zero-sized cells (more rows
//     than pixel rows, a zero count, an empty sheet) is rejected before any
//     pixel work happens.
// 3.  **Scan Order**: Cells are produced row-major, left-to-right then
//     top-to-bottom. Later stages rely on this order for deterministic
//     grouping, so it is part of the contract, not an implementation detail.

use crate::core_modules::cell::Cell;
use crate::error::{SpriteError, SpriteResult};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// The requested partitioning of a sheet into frame cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Number of frame rows in the sheet.
    pub rows: u32,
    /// Number of frame columns in the sheet.
    pub cols: u32,
}

impl GridSpec {
    pub const fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }

    /// Derives a grid from a known frame size, for sheets documented by
    /// frame dimensions rather than frame counts. Trailing pixels that do
    /// not fill a whole frame are excluded, matching the truncation rule.
    ///
    /// Fails with [`SpriteError::InvalidFrameSize`] when a frame dimension
    /// is zero or exceeds the sheet.
    pub fn from_frame_size(
        sheet_width: u32,
        sheet_height: u32,
        frame_width: u32,
        frame_height: u32,
    ) -> SpriteResult<Self> {
        if frame_width == 0 || frame_height == 0 {
            return Err(SpriteError::InvalidFrameSize {
                frame_width,
                frame_height,
                width: sheet_width,
                height: sheet_height,
            });
        }
        let rows = sheet_height / frame_height;
        let cols = sheet_width / frame_width;
        if rows == 0 || cols == 0 {
            return Err(SpriteError::InvalidFrameSize {
                frame_width,
                frame_height,
                width: sheet_width,
                height: sheet_height,
            });
        }
        Ok(Self { rows, cols })
    }

    pub fn cell_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }
}

/// Cuts the sheet into `rows x cols` cells in row-major scan order.
///
/// Fails with [`SpriteError::InvalidGrid`] when either count is zero or the
/// integer cell size comes out zero in either dimension.
pub fn partition(sheet: &RgbaImage, grid: &GridSpec) -> SpriteResult<Vec<Cell>> {
    let sheet_width = sheet.width();
    let sheet_height = sheet.height();

    if grid.rows == 0 || grid.cols == 0 {
        return Err(SpriteError::InvalidGrid {
            rows: grid.rows,
            cols: grid.cols,
            width: sheet_width,
            height: sheet_height,
        });
    }

    let cell_width = sheet_width / grid.cols;
    let cell_height = sheet_height / grid.rows;
    if cell_width == 0 || cell_height == 0 {
        return Err(SpriteError::InvalidGrid {
            rows: grid.rows,
            cols: grid.cols,
            width: sheet_width,
            height: sheet_height,
        });
    }

    let dropped_x = sheet_width - cell_width * grid.cols;
    let dropped_y = sheet_height - cell_height * grid.rows;
    if dropped_x > 0 || dropped_y > 0 {
        tracing::debug!(
            dropped_x,
            dropped_y,
            cell_width,
            cell_height,
            "sheet does not divide evenly; trailing pixels dropped"
        );
    }

    let mut cells = Vec::with_capacity(grid.cell_count());
    for row in 0..grid.rows {
        for col in 0..grid.cols {
            let start_x = col * cell_width;
            let start_y = row * cell_height;
            cells.push(Cell::new(
                row,
                col,
                extract_block(sheet, start_x, start_y, cell_width, cell_height),
            ));
        }
    }
    Ok(cells)
}

/// Copies one rectangular pixel block out of the sheet.
fn extract_block(
    sheet: &RgbaImage,
    start_x: u32,
    start_y: u32,
    width: u32,
    height: u32,
) -> RgbaImage {
    let mut block = RgbaImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            block.put_pixel(x, y, *sheet.get_pixel(start_x + x, start_y + y));
        }
    }
    block
}
