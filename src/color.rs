//! Color structures and transfer functions.
//!
//! All images in the pipeline carry a [`ColorSpace`] tag. Transfer between sRGB and linear
//! light uses the piecewise IEC 61966-2-1 definition, and grayscale conversion uses Rec.709
//! luminance computed in linear space.

use bytemuck::{Pod, Zeroable};

/// Interpretation of the color channels of an image or texture.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum ColorSpace {
    /// Channel values are linear light.
    #[default]
    Linear,
    /// Channel values are sRGB-encoded; alpha stays linear.
    Srgb,
}

/// A 4-channel single-precision color, the element type of the RGBAF working layout.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ColorRgbaF {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// A 4-channel double-precision color used for pixel interchange.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ColorRgbaD {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl ColorRgbaD {
    pub fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Channel by index: 0 = r, 1 = g, 2 = b, 3 = a.
    pub fn channel(&self, index: usize) -> f64 {
        match index {
            0 => self.r,
            1 => self.g,
            2 => self.b,
            _ => self.a,
        }
    }
}

/// Converts a linear value to its sRGB encoding.
pub fn linear_to_srgb(x: f64) -> f64 {
    if x <= 0.0031308 {
        x * 12.92
    } else {
        1.055 * x.powf(1.0 / 2.4) - 0.055
    }
}

/// Converts an sRGB-encoded value to linear.
pub fn srgb_to_linear(x: f64) -> f64 {
    if x <= 0.04045 {
        x / 12.92
    } else {
        ((x + 0.055) / 1.055).powf(2.4)
    }
}

/// Rec.709 luminance. The inputs must already be linear.
pub fn to_grayscale(r: f64, g: f64, b: f64) -> f64 {
    0.2126 * r + 0.7152 * g + 0.0722 * b
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn srgb_round_trip() {
        for i in 0..=1000 {
            let x = i as f64 / 1000.0;
            assert!((srgb_to_linear(linear_to_srgb(x)) - x).abs() <= 1e-12);
            assert!((linear_to_srgb(srgb_to_linear(x)) - x).abs() <= 1e-12);
        }
    }

    #[test]
    fn srgb_endpoints_exact() {
        assert_eq!(linear_to_srgb(0.0), 0.0);
        assert_eq!(srgb_to_linear(0.0), 0.0);
        assert!((linear_to_srgb(1.0) - 1.0).abs() < 1e-12);
        assert!((srgb_to_linear(1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn grayscale_weights() {
        assert!((to_grayscale(1.0, 1.0, 1.0) - 1.0).abs() < 1e-12);
        assert_eq!(to_grayscale(1.0, 0.0, 0.0), 0.2126);
        assert_eq!(to_grayscale(0.0, 1.0, 0.0), 0.7152);
        assert_eq!(to_grayscale(0.0, 0.0, 1.0), 0.0722);
    }
}
