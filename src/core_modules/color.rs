// THEORY:
// `Color` is the smallest unit of evidence in the classification pipeline.
// Every stage above it (sampling, classification, reporting) speaks in terms
// of this one type, so its channel order must be unambiguous: red, green,
// blue, always. Alpha never participates in classification; a frame's key
// color is a paint decision made in an opaque editor, and the transparency
// pass happens after classification, not before.

use image::Rgba;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single 8-bit color channel value.
pub type Channel = u8;

/// An opaque RGB color, used both as sampled evidence and as policy data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    /// The red channel intensity.
    pub red: Channel,
    /// The green channel intensity.
    pub green: Channel,
    /// The blue channel intensity.
    pub blue: Channel,
}

impl Color {
    pub const fn new(red: Channel, green: Channel, blue: Channel) -> Self {
        Self { red, green, blue }
    }

    /// Extracts the color of an RGBA pixel, discarding alpha.
    pub fn from_rgba(pixel: &Rgba<u8>) -> Self {
        Self {
            red: pixel[0],
            green: pixel[1],
            blue: pixel[2],
        }
    }

    /// The channels in fixed red, green, blue order.
    pub fn channels(&self) -> [Channel; 3] {
        [self.red, self.green, self.blue]
    }
}

impl From<[Channel; 3]> for Color {
    fn from(rgb: [Channel; 3]) -> Self {
        Self::new(rgb[0], rgb[1], rgb[2])
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.red, self.green, self.blue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rgba_keeps_channel_order() {
        let pixel = Rgba([10, 20, 30, 128]);
        let color = Color::from_rgba(&pixel);
        assert_eq!(color, Color::new(10, 20, 30));
        assert_eq!(color.channels(), [10, 20, 30]);
    }

    #[test]
    fn display_is_rgb_ordered() {
        assert_eq!(Color::new(1, 2, 3).to_string(), "(1, 2, 3)");
    }
}
