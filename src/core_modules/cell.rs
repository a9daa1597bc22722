// THEORY:
// The `Cell` module represents one frame-sized region cut out of a sprite
// sheet. It is the unit every later stage operates on: the sampler reads its
// border, the classifier labels it, the assembler concatenates it into a
// strip.
//
// Key architectural principles:
// 1.  **Data Container**: A `Cell` is a "dumb" container. It owns its pixel
//     buffer and knows its grid position, and it can enumerate its own border
//     pixels, but it holds no opinion on what its contents mean.
// 2.  **Deterministic Traversal**: Border enumeration follows one fixed
//     order (top band, bottom band, left band, right band) so that any
//     frequency tie downstream breaks the same way on every run.
// 3.  **Self-Contained**: Once extracted, a cell carries everything needed
//     to write it to disk as an individual frame. No stage ever reaches back
//     into the parent sheet.

use crate::core_modules::color::Color;
use image::RgbaImage;

/// One frame-sized region of a sprite sheet, addressed by grid position.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// The row index of this cell in the sheet grid.
    pub row: u32,
    /// The column index of this cell in the sheet grid.
    pub col: u32,
    /// The cell's own copy of its pixel block.
    pub image: RgbaImage,
}

impl Cell {
    pub fn new(row: u32, col: u32, image: RgbaImage) -> Self {
        Self { row, col, image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Total pixel count. Zero only for hand-built cells; the partitioner
    /// rejects grids that would produce empty cells.
    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Collects the colors of the outermost `edge_width` pixel bands, in the
    /// fixed traversal order: the top band row by row left-to-right, then the
    /// bottom band row by row left-to-right, then the left band column by
    /// column top-to-bottom, then the right band column by column
    /// top-to-bottom. Corner pixels appear in two bands and are counted
    /// twice.
    pub fn border_colors(&self, edge_width: u32) -> Vec<Color> {
        let width = self.width();
        let height = self.height();
        if width == 0 || height == 0 {
            return Vec::new();
        }

        // A band wider than the cell itself collapses to a full scan of that axis.
        let band_rows = edge_width.min(height);
        let band_cols = edge_width.min(width);

        let mut colors =
            Vec::with_capacity((2 * (band_rows * width + band_cols * height)) as usize);

        for y in 0..band_rows {
            for x in 0..width {
                colors.push(Color::from_rgba(self.image.get_pixel(x, y)));
            }
        }
        for y in (height - band_rows)..height {
            for x in 0..width {
                colors.push(Color::from_rgba(self.image.get_pixel(x, y)));
            }
        }
        for x in 0..band_cols {
            for y in 0..height {
                colors.push(Color::from_rgba(self.image.get_pixel(x, y)));
            }
        }
        for x in (width - band_cols)..width {
            for y in 0..height {
                colors.push(Color::from_rgba(self.image.get_pixel(x, y)));
            }
        }

        colors
    }

    /// The four corner colors in top-left, top-right, bottom-left,
    /// bottom-right order. Returns `None` for a zero-area cell.
    pub fn corner_colors(&self) -> Option<[Color; 4]> {
        let width = self.width();
        let height = self.height();
        if width == 0 || height == 0 {
            return None;
        }
        Some([
            Color::from_rgba(self.image.get_pixel(0, 0)),
            Color::from_rgba(self.image.get_pixel(width - 1, 0)),
            Color::from_rgba(self.image.get_pixel(0, height - 1)),
            Color::from_rgba(self.image.get_pixel(width - 1, height - 1)),
        ])
    }

    /// Every pixel color in row-major scan order.
    pub fn all_colors(&self) -> Vec<Color> {
        self.image.pixels().map(Color::from_rgba).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// Builds a 3x3 cell whose pixel at (x, y) has red = x and green = y.
    fn coordinate_cell() -> Cell {
        let image = RgbaImage::from_fn(3, 3, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        Cell::new(0, 0, image)
    }

    #[test]
    fn border_traversal_order_is_fixed() {
        let cell = coordinate_cell();
        let colors = cell.border_colors(1);

        let expect = |x: u8, y: u8| Color::new(x, y, 0);
        assert_eq!(
            colors,
            vec![
                // top row, left to right
                expect(0, 0),
                expect(1, 0),
                expect(2, 0),
                // bottom row, left to right
                expect(0, 2),
                expect(1, 2),
                expect(2, 2),
                // left column, top to bottom
                expect(0, 0),
                expect(0, 1),
                expect(0, 2),
                // right column, top to bottom
                expect(2, 0),
                expect(2, 1),
                expect(2, 2),
            ]
        );
    }

    #[test]
    fn oversized_edge_width_is_clamped() {
        let cell = coordinate_cell();
        // Band of 10 on a 3x3 cell degenerates to four full scans.
        assert_eq!(cell.border_colors(10).len(), 4 * 9);
    }

    #[test]
    fn corners_in_reading_order() {
        let cell = coordinate_cell();
        let corners = cell.corner_colors().unwrap();
        assert_eq!(
            corners,
            [
                Color::new(0, 0, 0),
                Color::new(2, 0, 0),
                Color::new(0, 2, 0),
                Color::new(2, 2, 0),
            ]
        );
    }

    #[test]
    fn empty_cell_has_no_border() {
        let cell = Cell::new(0, 0, RgbaImage::new(0, 0));
        assert!(cell.border_colors(1).is_empty());
        assert!(cell.corner_colors().is_none());
        assert_eq!(cell.area(), 0);
    }
}
