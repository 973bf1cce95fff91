// THEORY:
// The `color_range` module is the single piece of tuning the perception stack
// depends on. It defines the 8-bit hue/saturation/value representation used by
// the segmenter and the inclusive box in that space that counts as "fish".
//
// Key architectural principles:
// 1.  **8-bit HSV convention**: Hue is stored as degrees / 2 so that a full turn
//     fits in a byte (0..=179). Saturation and value span 0..=255. This matches
//     the convention every HSV threshold table in the field is written in, so
//     ranges can be copied over from tuning tools unchanged.
// 2.  **Validated at the edge**: A `ColorRange` can only be built through
//     `ColorRange::new`, which rejects an inverted or out-of-gamut box. The serde
//     path goes through the same constructor, so a malformed configuration file
//     fails at load time, before a single frame is processed.
// 3.  **Pure and cheap**: `Hsv::from_rgb` and `ColorRange::contains` are called
//     once per pixel per frame. Both are branch-light integer/float math with no
//     allocation.

use serde::{Deserialize, Serialize};

/// Largest hue value in the 8-bit convention (359 degrees / 2, rounded down).
pub const MAX_HUE: u8 = 179;

/// A single pixel in 8-bit hue/saturation/value space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hsv {
    /// Hue in half-degrees, 0..=179.
    pub hue: u8,
    /// Saturation, 0..=255.
    pub saturation: u8,
    /// Value (brightness), 0..=255.
    pub value: u8,
}

impl Hsv {
    pub const fn new(hue: u8, saturation: u8, value: u8) -> Self {
        Self { hue, saturation, value }
    }

    /// Converts an RGB pixel into the 8-bit HSV convention.
    ///
    /// Achromatic pixels (all channels equal) get a hue of 0. A hue that rounds
    /// up to a full turn wraps back to 0.
    pub fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        let max = red.max(green).max(blue);
        let min = red.min(green).min(blue);
        let chroma = f32::from(max - min);

        let saturation = if max == 0 {
            0
        } else {
            (chroma * 255.0 / f32::from(max)).round() as u8
        };

        let hue = if chroma == 0.0 {
            0
        } else {
            let (r, g, b) = (f32::from(red), f32::from(green), f32::from(blue));
            let mut degrees = if max == red {
                60.0 * (g - b) / chroma
            } else if max == green {
                120.0 + 60.0 * (b - r) / chroma
            } else {
                240.0 + 60.0 * (r - g) / chroma
            };
            if degrees < 0.0 {
                degrees += 360.0;
            }
            let half = (degrees / 2.0).round() as u16;
            if half > u16::from(MAX_HUE) { 0 } else { half as u8 }
        };

        Self { hue, saturation, value: max }
    }
}

/// Raised when a color range would never match anything sensible.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColorRangeError {
    #[error("{channel} lower bound {lower} exceeds upper bound {upper}")]
    Inverted {
        channel: &'static str,
        lower: u8,
        upper: u8,
    },
    #[error("hue bound {0} is outside 0..=179")]
    HueOutOfRange(u8),
}

/// An inclusive box in HSV space. A pixel belongs to the object iff every
/// channel lies between `lower` and `upper`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedColorRange", into = "UncheckedColorRange")]
pub struct ColorRange {
    lower: Hsv,
    upper: Hsv,
}

impl ColorRange {
    /// Tuned for a reddish-orange fish under indoor lighting.
    pub const REDDISH_ORANGE: ColorRange = ColorRange {
        lower: Hsv::new(0, 100, 100),
        upper: Hsv::new(20, 255, 255),
    };

    pub fn new(lower: Hsv, upper: Hsv) -> Result<Self, ColorRangeError> {
        for hue in [lower.hue, upper.hue] {
            if hue > MAX_HUE {
                return Err(ColorRangeError::HueOutOfRange(hue));
            }
        }
        let channels = [
            ("hue", lower.hue, upper.hue),
            ("saturation", lower.saturation, upper.saturation),
            ("value", lower.value, upper.value),
        ];
        for (channel, lower, upper) in channels {
            if lower > upper {
                return Err(ColorRangeError::Inverted { channel, lower, upper });
            }
        }
        Ok(Self { lower, upper })
    }

    pub fn lower(&self) -> Hsv {
        self.lower
    }

    pub fn upper(&self) -> Hsv {
        self.upper
    }

    #[inline]
    pub fn contains(&self, pixel: Hsv) -> bool {
        (self.lower.hue..=self.upper.hue).contains(&pixel.hue)
            && (self.lower.saturation..=self.upper.saturation).contains(&pixel.saturation)
            && (self.lower.value..=self.upper.value).contains(&pixel.value)
    }
}

impl Default for ColorRange {
    fn default() -> Self {
        Self::REDDISH_ORANGE
    }
}

/// Wire form of `ColorRange`, validated on the way in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct UncheckedColorRange {
    lower: Hsv,
    upper: Hsv,
}

impl TryFrom<UncheckedColorRange> for ColorRange {
    type Error = ColorRangeError;

    fn try_from(raw: UncheckedColorRange) -> Result<Self, Self::Error> {
        ColorRange::new(raw.lower, raw.upper)
    }
}

impl From<ColorRange> for UncheckedColorRange {
    fn from(range: ColorRange) -> Self {
        Self {
            lower: range.lower,
            upper: range.upper,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primaries_follow_half_degree_hue() {
        assert_eq!(Hsv::from_rgb(255, 0, 0), Hsv::new(0, 255, 255));
        assert_eq!(Hsv::from_rgb(0, 255, 0), Hsv::new(60, 255, 255));
        assert_eq!(Hsv::from_rgb(0, 0, 255), Hsv::new(120, 255, 255));
    }

    #[test]
    fn achromatic_pixels_have_no_hue_or_saturation() {
        assert_eq!(Hsv::from_rgb(0, 0, 0), Hsv::new(0, 0, 0));
        assert_eq!(Hsv::from_rgb(200, 200, 200), Hsv::new(0, 0, 200));
    }

    #[test]
    fn hue_just_below_a_full_turn_wraps_to_zero() {
        // 255,0,1 sits at ~359.8 degrees.
        assert_eq!(Hsv::from_rgb(255, 0, 1).hue, 0);
    }

    #[test]
    fn default_range_accepts_orange_and_rejects_blue() {
        let range = ColorRange::default();
        assert!(range.contains(Hsv::from_rgb(255, 100, 0)));
        assert!(range.contains(Hsv::from_rgb(230, 60, 20)));
        assert!(!range.contains(Hsv::from_rgb(20, 60, 230)));
        assert!(!range.contains(Hsv::from_rgb(0, 0, 0)));
    }

    #[test]
    fn bounds_are_inclusive() {
        let range = ColorRange::default();
        assert!(range.contains(Hsv::new(0, 100, 100)));
        assert!(range.contains(Hsv::new(20, 255, 255)));
        assert!(!range.contains(Hsv::new(21, 255, 255)));
        assert!(!range.contains(Hsv::new(10, 99, 255)));
    }

    #[test]
    fn inverted_channel_is_rejected() {
        let err = ColorRange::new(Hsv::new(0, 200, 100), Hsv::new(20, 100, 255)).unwrap_err();
        assert_eq!(
            err,
            ColorRangeError::Inverted {
                channel: "saturation",
                lower: 200,
                upper: 100
            }
        );
    }

    #[test]
    fn hue_past_the_gamut_is_rejected() {
        let err = ColorRange::new(Hsv::new(0, 0, 0), Hsv::new(180, 255, 255)).unwrap_err();
        assert_eq!(err, ColorRangeError::HueOutOfRange(180));
    }

    #[test]
    fn deserialization_validates() {
        let ok: ColorRange = serde_yaml::from_str(
            "lower: { hue: 0, saturation: 100, value: 100 }\nupper: { hue: 20, saturation: 255, value: 255 }\n",
        )
        .unwrap();
        assert_eq!(ok, ColorRange::REDDISH_ORANGE);

        let bad = serde_yaml::from_str::<ColorRange>(
            "lower: { hue: 30, saturation: 100, value: 100 }\nupper: { hue: 20, saturation: 255, value: 255 }\n",
        );
        assert!(bad.is_err());
    }
}
