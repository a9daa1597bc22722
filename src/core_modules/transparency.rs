// THEORY:
// The `transparency` module knocks a solid backdrop out to alpha. It runs
// after separation: classification needs the key color present, export
// usually wants it gone. Matching is a per-channel tolerance test against a
// reference color, because export pipelines rarely leave a backdrop
// mathematically uniform.
//
// The pass zeroes alpha and leaves RGB untouched. Keeping the color under a
// transparent pixel costs nothing and preserves the option of re-keying the
// sheet later.

use crate::core_modules::color::Color;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

const DEFAULT_TOLERANCE: u8 = 30;

/// Where the backdrop color comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundReference {
    /// Probe the image's own top-left pixel.
    TopLeft,
    /// Use a caller-supplied color.
    Fixed(Color),
}

/// Tuning for the knockout pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransparencyConfig {
    pub reference: BackgroundReference,
    /// A pixel matches when every channel differs from the reference by
    /// strictly less than this.
    #[serde(default = "default_tolerance")]
    pub tolerance: u8,
}

fn default_tolerance() -> u8 {
    DEFAULT_TOLERANCE
}

impl Default for TransparencyConfig {
    fn default() -> Self {
        Self {
            reference: BackgroundReference::TopLeft,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// Zeroes the alpha of every backdrop-colored pixel in place and returns how
/// many pixels were cleared.
pub fn knock_out_background(image: &mut RgbaImage, config: &TransparencyConfig) -> u64 {
    if image.width() == 0 || image.height() == 0 {
        return 0;
    }

    let reference = match config.reference {
        BackgroundReference::TopLeft => Color::from_rgba(image.get_pixel(0, 0)),
        BackgroundReference::Fixed(color) => color,
    };

    let mut cleared = 0u64;
    for pixel in image.pixels_mut() {
        let color = Color::from_rgba(pixel);
        if matches_reference(color, reference, config.tolerance) {
            pixel[3] = 0;
            cleared += 1;
        }
    }

    tracing::debug!(%reference, cleared, "background knockout complete");
    cleared
}

fn matches_reference(color: Color, reference: Color, tolerance: u8) -> bool {
    color.red.abs_diff(reference.red) < tolerance
        && color.green.abs_diff(reference.green) < tolerance
        && color.blue.abs_diff(reference.blue) < tolerance
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn top_left_reference_clears_backdrop_only() {
        // Blue backdrop, red 2x2 subject in the middle.
        let mut image = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255]));
        image.put_pixel(1, 1, Rgba([255, 0, 0, 255]));
        image.put_pixel(2, 1, Rgba([255, 0, 0, 255]));
        image.put_pixel(1, 2, Rgba([255, 0, 0, 255]));
        image.put_pixel(2, 2, Rgba([255, 0, 0, 255]));

        let cleared = knock_out_background(&mut image, &TransparencyConfig::default());

        assert_eq!(cleared, 12);
        // Backdrop alpha went to zero but its color survived.
        assert_eq!(image.get_pixel(0, 0), &Rgba([0, 0, 255, 0]));
        assert_eq!(image.get_pixel(1, 1), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn fixed_reference_with_tight_tolerance() {
        // Near-black noise under 10 per channel counts as backdrop.
        let mut image = RgbaImage::from_pixel(2, 1, Rgba([4, 7, 2, 255]));
        image.put_pixel(1, 0, Rgba([200, 200, 200, 255]));

        let config = TransparencyConfig {
            reference: BackgroundReference::Fixed(Color::new(0, 0, 0)),
            tolerance: 10,
        };
        let cleared = knock_out_background(&mut image, &config);

        assert_eq!(cleared, 1);
        assert_eq!(image.get_pixel(0, 0)[3], 0);
        assert_eq!(image.get_pixel(1, 0)[3], 255);
    }

    #[test]
    fn tolerance_bound_is_strict() {
        let mut image = RgbaImage::from_pixel(1, 1, Rgba([30, 0, 0, 255]));
        let config = TransparencyConfig {
            reference: BackgroundReference::Fixed(Color::new(0, 0, 0)),
            tolerance: 30,
        };
        // A channel difference equal to the tolerance does not match.
        assert_eq!(knock_out_background(&mut image, &config), 0);
        assert_eq!(image.get_pixel(0, 0)[3], 255);
    }

    #[test]
    fn empty_image_clears_nothing() {
        let mut image = RgbaImage::new(0, 0);
        assert_eq!(
            knock_out_background(&mut image, &TransparencyConfig::default()),
            0
        );
    }
}
