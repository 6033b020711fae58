// THEORY (1D Pixel Color Model):
// The `Pixel` module is the most fundamental unit of the tracker. It holds a single
// 3-channel sample in the byte order video decoders hand us (blue, green, red) and
// the one heuristic the segmenter needs from it: the hue/saturation/value triple.
//
// HSV follows the 8-bit convention used by common capture stacks:
// - value:      max(R, G, B)                         in 0..=255
// - saturation: 255 * (max - min) / max, 0 when black in 0..=255
// - hue:        angle on the color wheel halved      in 0..=179
//   Achromatic samples (max == min) report hue 0.
//
// Key principles:
// 1) Single-pixel scope: nothing here reads neighbors or history.
// 2) Integer in, integer out: the HSV triple is rounded to bytes so that a color
//    range configured as byte bounds is compared exactly.

pub mod pixel {
    use serde::{Deserialize, Serialize};

    pub type Channel = u8;
    pub type Hue = u8;
    pub type Saturation = u8;
    pub type Value = u8;

    /// Largest hue on the halved 8-bit wheel.
    pub const HUE_MAX: Hue = 179;

    /// A "dumb" data container for one BGR sample.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Bgr {
        /// The blue channel value (0-255).
        pub blue: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The red channel value (0-255).
        pub red: Channel,
    }

    /// A pixel expressed on the hue/saturation/value axes.
    ///
    /// Serialized as a `[hue, saturation, value]` triple so color ranges read
    /// naturally in configuration files.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(from = "[u8; 3]", into = "[u8; 3]")]
    pub struct Hsv {
        pub hue: Hue,
        pub saturation: Saturation,
        pub value: Value,
    }

    impl Hsv {
        pub fn new(hue: Hue, saturation: Saturation, value: Value) -> Self {
            Self {
                hue,
                saturation,
                value,
            }
        }
    }

    impl From<[u8; 3]> for Hsv {
        fn from(triple: [u8; 3]) -> Self {
            Self::new(triple[0], triple[1], triple[2])
        }
    }

    impl From<Hsv> for [u8; 3] {
        fn from(hsv: Hsv) -> Self {
            [hsv.hue, hsv.saturation, hsv.value]
        }
    }

    impl Bgr {
        pub fn new(blue: Channel, green: Channel, red: Channel) -> Self {
            Self { blue, green, red }
        }

        /// Reads the first three bytes of an interleaved BGR buffer.
        #[inline]
        pub fn from_slice(bytes: &[u8]) -> Self {
            Self::new(bytes[0], bytes[1], bytes[2])
        }

        /// Builds a sample from RGB channel order (the `image` crate's order).
        pub fn from_rgb(rgb: [u8; 3]) -> Self {
            Self::new(rgb[2], rgb[1], rgb[0])
        }

        pub fn to_rgb(self) -> [u8; 3] {
            [self.red, self.green, self.blue]
        }

        /// =================================Heuristics==================================

        /// Converts the sample to 8-bit HSV.
        ///
        /// - Uses the raw 0..255 channels; no gamma linearization.
        /// - Hue is computed in degrees, halved, and rounded; 360 wraps to 0.
        pub fn to_hsv(self) -> Hsv {
            let red = self.red as f32;
            let green = self.green as f32;
            let blue = self.blue as f32;

            let maximum_channel = red.max(green.max(blue));
            let minimum_channel = red.min(green.min(blue));
            let chroma = maximum_channel - minimum_channel;

            let value = self.red.max(self.green.max(self.blue));
            let saturation = if maximum_channel > 0.0 {
                (255.0 * chroma / maximum_channel).round() as Saturation
            } else {
                0
            };

            if chroma <= 0.0 {
                return Hsv::new(0, saturation, value);
            }

            let degrees_per_chroma = 60.0 / chroma;
            let mut hue_degrees = if self.red == value {
                (green - blue) * degrees_per_chroma
            } else if self.green == value {
                120.0 + (blue - red) * degrees_per_chroma
            } else {
                240.0 + (red - green) * degrees_per_chroma
            };
            if hue_degrees < 0.0 {
                hue_degrees += 360.0;
            }

            let mut hue = (hue_degrees / 2.0).round();
            if hue > HUE_MAX as f32 {
                hue -= 180.0;
            }

            Hsv::new(hue as Hue, saturation, value)
        }
    }
}
