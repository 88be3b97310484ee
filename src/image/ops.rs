//! Image manipulation: resizing, rotation, flips, color-space changes, swizzling and
//! normal-map synthesis.

use super::{get_pixel_impl, set_pixel_impl, Channel, Image, PixelFormat};
use crate::color::{linear_to_srgb, srgb_to_linear, to_grayscale, ColorRgbaD, ColorSpace};
use crate::error::Error;
use bitflags::bitflags;
use fast_image_resize as fr;
use strum_macros::{AsRefStr, EnumString, VariantNames};

/// Filter used when resizing images or generating mipmaps.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, AsRefStr, EnumString, VariantNames)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum ResizeFilter {
    /// Averages the pixels within the sample area.
    Box,
    /// Separable triangle filter.
    Linear,
    /// Bicubic filter.
    Cubic,
    /// Catmull-Rom spline. Good sharpness for downsampling.
    #[default]
    CatmullRom,
    /// Cubic B-spline. Smoothest result.
    BSpline,
}

/// Rotation angles supported by [`Image::rotate`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RotateAngle {
    CCW90,
    CCW180,
    CCW270,
    CW90,
    CW180,
    CW270,
}

bitflags! {
    /// Edge and sign handling for [`Image::create_normal_map`].
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
    pub struct NormalOptions: u32 {
        /// Wrap heights along the X axis for tiled textures.
        const WRAP_X = 0x1;
        /// Wrap heights along the Y axis for tiled textures.
        const WRAP_Y = 0x2;
        /// Keep components in [-1, 1] instead of remapping to [0, 1].
        const KEEP_SIGN = 0x4;
    }
}

fn fr_pixel_type(format: PixelFormat) -> Option<fr::PixelType> {
    match format {
        PixelFormat::Gray8 => Some(fr::PixelType::U8),
        PixelFormat::RGB8 => Some(fr::PixelType::U8x3),
        PixelFormat::RGBA8 => Some(fr::PixelType::U8x4),
        PixelFormat::Gray16 | PixelFormat::UInt16 => Some(fr::PixelType::U16),
        PixelFormat::RGB16 => Some(fr::PixelType::U16x3),
        PixelFormat::RGBA16 => Some(fr::PixelType::U16x4),
        PixelFormat::Float => Some(fr::PixelType::F32),
        PixelFormat::RGBF => Some(fr::PixelType::F32x3),
        PixelFormat::RGBAF => Some(fr::PixelType::F32x4),
        _ => None,
    }
}

fn fr_filter(filter: ResizeFilter) -> fr::FilterType {
    match filter {
        ResizeFilter::Box => fr::FilterType::Box,
        ResizeFilter::Linear => fr::FilterType::Bilinear,
        ResizeFilter::Cubic => fr::FilterType::Mitchell,
        ResizeFilter::CatmullRom => fr::FilterType::CatmullRom,
        ResizeFilter::BSpline => fr::FilterType::Gaussian,
    }
}

impl Image {
    /// Resizes to `width` × `height`, returning a new image. sRGB images are resized in
    /// linear light. Layouts without a native resize path fall back to a generic
    /// implementation that supports only Box and Linear.
    pub fn resize(&self, width: u32, height: u32, filter: ResizeFilter) -> Result<Self, Error> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidInput("resize dimensions must be non-zero".into()));
        }

        if width == self.width && height == self.height {
            return Ok(self.clone());
        }

        if self.color_space != ColorSpace::Linear {
            let mut linear = self.clone();
            linear.change_color_space(ColorSpace::Linear);
            let mut resized = linear.resize(width, height, filter)?;
            resized.change_color_space(self.color_space);
            return Ok(resized);
        }

        if let Some(pixel_type) = fr_pixel_type(self.format) {
            let src =
                fr::images::Image::from_vec_u8(self.width, self.height, self.data.clone(), pixel_type)
                    .map_err(|e| Error::Encoder(format!("resize setup failed: {e}")))?;
            let mut dst = fr::images::Image::new(width, height, pixel_type);
            let mut resizer = fr::Resizer::new();
            resizer
                .resize(
                    &src,
                    &mut dst,
                    Some(&fr::ResizeOptions {
                        algorithm: fr::ResizeAlg::Convolution(fr_filter(filter)),
                        cropping: Default::default(),
                        mul_div_alpha: false,
                    }),
                )
                .map_err(|e| Error::Encoder(format!("resize failed: {e}")))?;

            let stride = width as usize * self.format.bytes_per_pixel();
            return Ok(Self {
                format: self.format,
                color_space: self.color_space,
                width,
                height,
                stride,
                data: dst.buffer().to_vec(),
            });
        }

        self.resize_fallback(width, height, filter)
    }

    fn resize_fallback(&self, width: u32, height: u32, filter: ResizeFilter) -> Result<Self, Error> {
        let inv_scale_x = self.width as f64 / width as f64;
        let inv_scale_y = self.height as f64 / height as f64;
        let mut offset_x = inv_scale_x.max(1.0);
        let mut offset_y = inv_scale_y.max(1.0);
        let filter_scale_x = 1.0 / offset_x;
        let filter_scale_y = 1.0 / offset_y;

        let mut image = Image::new(self.format, width, height, self.color_space)?;
        match filter {
            ResizeFilter::Box => {
                offset_x *= 0.5;
                offset_y *= 0.5;
                for y in 0..height {
                    let center_y = (y as f64 + 0.5) * inv_scale_y;
                    let top = ((center_y - offset_y + 0.5) as i64).max(0) as u32;
                    let bottom = ((center_y + offset_y + 0.5) as u32).min(self.height);

                    for x in 0..width {
                        let center_x = (x as f64 + 0.5) * inv_scale_x;
                        let left = ((center_x - offset_x + 0.5) as i64).max(0) as u32;
                        let right = ((center_x + offset_x + 0.5) as u32).min(self.width);

                        let mut color = ColorRgbaD::default();
                        let mut total = 0u32;
                        for i in top..bottom {
                            if ((i as f64 + 0.5 - center_y) * filter_scale_y).abs() > 0.5 {
                                continue;
                            }
                            let src = self.scanline(i);
                            for j in left..right {
                                if ((j as f64 + 0.5 - center_x) * filter_scale_x).abs() > 0.5 {
                                    continue;
                                }
                                let cur = get_pixel_impl(self.format, src, j as usize);
                                color.r += cur.r;
                                color.g += cur.g;
                                color.b += cur.b;
                                color.a += cur.a;
                                total += 1;
                            }
                        }

                        color.r /= total as f64;
                        color.g /= total as f64;
                        color.b /= total as f64;
                        color.a /= total as f64;
                        let format = image.format;
                        set_pixel_impl(format, image.scanline_mut(y), x as usize, &color);
                    }
                }
            }
            ResizeFilter::Linear => {
                for y in 0..height {
                    let center_y = (y as f64 + 0.5) * inv_scale_y;
                    let top = ((center_y - offset_y + 0.5) as i64).max(0) as u32;
                    let bottom = ((center_y + offset_y + 0.5) as u32).min(self.height);

                    for x in 0..width {
                        let center_x = (x as f64 + 0.5) * inv_scale_x;
                        let left = ((center_x - offset_x + 0.5) as i64).max(0) as u32;
                        let right = ((center_x + offset_x + 0.5) as u32).min(self.width);

                        let mut color = ColorRgbaD::default();
                        let mut total = 0.0f64;
                        for i in top..bottom {
                            let scale_y =
                                (1.0 - ((i as f64 + 0.5 - center_y) * filter_scale_y).abs()).max(0.0);
                            if scale_y == 0.0 {
                                continue;
                            }
                            let src = self.scanline(i);
                            for j in left..right {
                                let scale_x = (1.0
                                    - ((j as f64 + 0.5 - center_x) * filter_scale_x).abs())
                                .max(0.0);
                                if scale_x == 0.0 {
                                    continue;
                                }
                                let cur = get_pixel_impl(self.format, src, j as usize);
                                let scale = scale_x * scale_y;
                                color.r += cur.r * scale;
                                color.g += cur.g * scale;
                                color.b += cur.b * scale;
                                color.a += cur.a * scale;
                                total += scale;
                            }
                        }

                        color.r /= total;
                        color.g /= total;
                        color.b /= total;
                        color.a /= total;
                        let format = image.format;
                        set_pixel_impl(format, image.scanline_mut(y), x as usize, &color);
                    }
                }
            }
            _ => return Err(Error::UnsupportedFormat),
        }
        Ok(image)
    }

    /// Rotates by a multiple of 90 degrees, returning a new image.
    pub fn rotate(&self, angle: RotateAngle) -> Result<Self, Error> {
        let (dst_width, dst_height) = match angle {
            RotateAngle::CCW180 | RotateAngle::CW180 => (self.width, self.height),
            _ => (self.height, self.width),
        };

        let mut image = Image::new(self.format, dst_width, dst_height, self.color_space)?;
        let format = self.format;
        for y in 0..self.height {
            let src = self.scanline(y);
            for x in 0..self.width {
                let color = get_pixel_impl(format, src, x as usize);
                let (dx, dy) = match angle {
                    RotateAngle::CCW90 | RotateAngle::CW270 => (y, self.width - x - 1),
                    RotateAngle::CCW180 | RotateAngle::CW180 => {
                        (self.width - x - 1, self.height - y - 1)
                    }
                    RotateAngle::CCW270 | RotateAngle::CW90 => (self.height - y - 1, x),
                };
                set_pixel_impl(format, image.scanline_mut(dy), dx as usize, &color);
            }
        }
        Ok(image)
    }

    /// Mirrors the image along the X axis in place.
    pub fn flip_horizontal(&mut self) {
        let bpp = self.format.bytes_per_pixel();
        let width = self.width as usize;
        for y in 0..self.height {
            let row = self.scanline_mut(y);
            for x in 0..width / 2 {
                let (a, b) = (x * bpp, (width - x - 1) * bpp);
                for c in 0..bpp {
                    row.swap(a + c, b + c);
                }
            }
        }
    }

    /// Mirrors the image along the Y axis in place.
    pub fn flip_vertical(&mut self) {
        let stride = self.stride;
        for y in 0..self.height as usize / 2 {
            let other = self.height as usize - y - 1;
            let (top, bottom) = self.data.split_at_mut(other * stride);
            bottom[..stride].swap_with_slice(&mut top[y * stride..y * stride + stride]);
        }
    }

    /// Multiplies color channels by alpha in linear space. Only RGBA8/RGBA16/RGBAF layouts
    /// carry alpha; anything else is left untouched.
    pub fn pre_multiply_alpha(&mut self) {
        if !matches!(
            self.format,
            PixelFormat::RGBA8 | PixelFormat::RGBA16 | PixelFormat::RGBAF
        ) {
            return;
        }

        let format = self.format;
        let srgb = self.color_space == ColorSpace::Srgb;
        for y in 0..self.height {
            let scanline = self.scanline_mut(y);
            for x in 0..self.width as usize {
                let mut color = get_pixel_impl(format, scanline, x);

                if srgb {
                    color.r = srgb_to_linear(color.r);
                    color.g = srgb_to_linear(color.g);
                    color.b = srgb_to_linear(color.b);
                }

                color.r *= color.a;
                color.g *= color.a;
                color.b *= color.a;

                if srgb {
                    color.r = linear_to_srgb(color.r);
                    color.g = linear_to_srgb(color.g);
                    color.b = linear_to_srgb(color.b);
                }

                set_pixel_impl(format, scanline, x, &color);
            }
        }
    }

    /// Applies the sRGB transfer curve (or its inverse) to the color channels and retags the
    /// image. No-op when already in the target space.
    pub fn change_color_space(&mut self, color_space: ColorSpace) {
        if color_space == self.color_space {
            return;
        }

        let format = self.format;
        let to_linear = color_space == ColorSpace::Linear;
        for y in 0..self.height {
            let scanline = self.scanline_mut(y);
            for x in 0..self.width as usize {
                let mut color = get_pixel_impl(format, scanline, x);
                if to_linear {
                    color.r = srgb_to_linear(color.r);
                    color.g = srgb_to_linear(color.g);
                    color.b = srgb_to_linear(color.b);
                } else {
                    color.r = linear_to_srgb(color.r);
                    color.g = linear_to_srgb(color.g);
                    color.b = linear_to_srgb(color.b);
                }
                set_pixel_impl(format, scanline, x, &color);
            }
        }
        self.color_space = color_space;
    }

    /// Replaces the color channels with their Rec.709 luminance, computed in linear space.
    pub fn grayscale(&mut self) {
        let format = self.format;
        let srgb = self.color_space == ColorSpace::Srgb;
        for y in 0..self.height {
            let scanline = self.scanline_mut(y);
            for x in 0..self.width as usize {
                let mut color = get_pixel_impl(format, scanline, x);

                if srgb {
                    color.r = srgb_to_linear(color.r);
                    color.g = srgb_to_linear(color.g);
                    color.b = srgb_to_linear(color.b);
                }

                let mut gray = to_grayscale(color.r, color.g, color.b);
                if srgb {
                    gray = linear_to_srgb(gray);
                }
                color.r = gray;
                color.g = gray;
                color.b = gray;

                set_pixel_impl(format, scanline, x, &color);
            }
        }
    }

    /// Reorders channels in place. `Channel::None` maps to 0 for colors and 1 for alpha.
    pub fn swizzle(&mut self, red: Channel, green: Channel, blue: Channel, alpha: Channel) {
        fn select(color: &ColorRgbaD, channel: Channel, alpha_slot: bool) -> f64 {
            match channel {
                Channel::Red => color.r,
                Channel::Green => color.g,
                Channel::Blue => color.b,
                Channel::Alpha => color.a,
                Channel::None => {
                    if alpha_slot {
                        1.0
                    } else {
                        0.0
                    }
                }
            }
        }

        let format = self.format;
        for y in 0..self.height {
            let scanline = self.scanline_mut(y);
            for x in 0..self.width as usize {
                let color = get_pixel_impl(format, scanline, x);
                let swizzled = ColorRgbaD::new(
                    select(&color, red, false),
                    select(&color, green, false),
                    select(&color, blue, false),
                    select(&color, alpha, true),
                );
                set_pixel_impl(format, scanline, x, &swizzled);
            }
        }
    }

    /// Builds a tangent-space normal map from this image's red channel by central
    /// differences, returning a new image in `dst_format`.
    pub fn create_normal_map(
        &self,
        options: NormalOptions,
        height: f64,
        dst_format: PixelFormat,
    ) -> Result<Self, Error> {
        let mut image = Image::new(dst_format, self.width, self.height, self.color_space)?;

        for y in 0..self.height {
            let mut dist_y = 2.0;
            let row_above = if y == 0 {
                if options.contains(NormalOptions::WRAP_Y) {
                    self.height - 1
                } else {
                    dist_y = 1.0;
                    y
                }
            } else {
                y - 1
            };
            let row_below = if y == self.height - 1 {
                if options.contains(NormalOptions::WRAP_Y) {
                    0
                } else {
                    dist_y = 1.0;
                    y
                }
            } else {
                y + 1
            };

            for x in 0..self.width {
                let above = get_pixel_impl(self.format, self.scanline(row_above), x as usize);
                let below = get_pixel_impl(self.format, self.scanline(row_below), x as usize);
                let dy = (above.r - below.r) * height / dist_y;

                let mut dist_x = 2.0;
                let col_left = if x == 0 {
                    if options.contains(NormalOptions::WRAP_X) {
                        self.width - 1
                    } else {
                        dist_x = 1.0;
                        x
                    }
                } else {
                    x - 1
                };
                let col_right = if x == self.width - 1 {
                    if options.contains(NormalOptions::WRAP_X) {
                        0
                    } else {
                        dist_x = 1.0;
                        x
                    }
                } else {
                    x + 1
                };

                let row = self.scanline(y);
                let left = get_pixel_impl(self.format, row, col_left as usize);
                let right = get_pixel_impl(self.format, row, col_right as usize);
                let dx = (left.r - right.r) * height / dist_x;

                let len = (dx * dx + dy * dy + 1.0).sqrt();
                let mut normal = ColorRgbaD::new(dx / len, dy / len, 1.0 / len, 1.0);
                if !options.contains(NormalOptions::KEEP_SIGN) {
                    normal.r = normal.r * 0.5 + 0.5;
                    normal.g = normal.g * 0.5 + 0.5;
                    normal.b = normal.b * 0.5 + 0.5;
                }
                set_pixel_impl(dst_format, image.scanline_mut(y), x as usize, &normal);
            }
        }

        Ok(image)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::color::ColorRgbaD;

    fn gradient_image() -> Image {
        let mut image = Image::new(PixelFormat::RGBA8, 8, 6, ColorSpace::Linear).unwrap();
        for y in 0..6 {
            for x in 0..8 {
                let color = ColorRgbaD::new(
                    x as f64 / 7.0,
                    y as f64 / 5.0,
                    (x + y) as f64 / 12.0,
                    1.0,
                );
                image.set_pixel(x, y, &color, false).unwrap();
            }
        }
        image
    }

    #[test]
    fn flip_involution() {
        let original = gradient_image();
        let mut flipped = original.clone();
        flipped.flip_horizontal();
        flipped.flip_horizontal();
        assert_eq!(flipped.data(), original.data());

        let mut flipped = original.clone();
        flipped.flip_vertical();
        flipped.flip_vertical();
        assert_eq!(flipped.data(), original.data());
    }

    #[test]
    fn rotation_composition() {
        let original = gradient_image();

        let twice = original
            .rotate(RotateAngle::CCW90)
            .unwrap()
            .rotate(RotateAngle::CCW90)
            .unwrap();
        let once = original.rotate(RotateAngle::CCW180).unwrap();
        assert_eq!(twice.data(), once.data());

        let mut four = original.clone();
        for _ in 0..4 {
            four = four.rotate(RotateAngle::CCW90).unwrap();
        }
        assert_eq!(four.data(), original.data());
    }

    #[test]
    fn rotation_swaps_dimensions() {
        let original = gradient_image();
        let rotated = original.rotate(RotateAngle::CW90).unwrap();
        assert_eq!(rotated.width(), original.height());
        assert_eq!(rotated.height(), original.width());
    }

    #[test]
    fn swizzle_composition() {
        let original = gradient_image();
        let mut image = original.clone();
        image.swizzle(Channel::Blue, Channel::Red, Channel::Green, Channel::Alpha);
        image.swizzle(Channel::Green, Channel::Blue, Channel::Red, Channel::Alpha);
        assert_eq!(image.data(), original.data());
    }

    #[test]
    fn swizzle_none_projects() {
        let mut image = gradient_image();
        image.swizzle(Channel::None, Channel::Green, Channel::Blue, Channel::None);
        let color = image.get_pixel(3, 2).unwrap();
        assert_eq!(color.r, 0.0);
        assert_eq!(color.a, 1.0);
    }

    #[test]
    fn resize_to_same_size_is_identity() {
        let original = gradient_image();
        let resized = original.resize(8, 6, ResizeFilter::CatmullRom).unwrap();
        assert_eq!(resized.data(), original.data());
    }

    #[test]
    fn resize_box_halves_solid_image() {
        let mut image = Image::new(PixelFormat::RGBAF, 4, 4, ColorSpace::Linear).unwrap();
        for y in 0..4 {
            for x in 0..4 {
                image
                    .set_pixel(x, y, &ColorRgbaD::new(0.5, 0.25, 0.125, 1.0), false)
                    .unwrap();
            }
        }
        let resized = image.resize(2, 2, ResizeFilter::Box).unwrap();
        assert_eq!(resized.width(), 2);
        let color = resized.get_pixel(0, 0).unwrap();
        assert!((color.r - 0.5).abs() < 1e-6);
        assert!((color.g - 0.25).abs() < 1e-6);
    }

    #[test]
    fn fallback_resize_rejects_cubic() {
        let image = Image::new(PixelFormat::Complex, 4, 4, ColorSpace::Linear).unwrap();
        assert!(image.resize(2, 2, ResizeFilter::Cubic).is_err());
        assert!(image.resize(2, 2, ResizeFilter::Box).is_ok());
    }

    #[test]
    fn flat_normal_map_points_up() {
        let mut image = Image::new(PixelFormat::Float, 4, 4, ColorSpace::Linear).unwrap();
        for y in 0..4 {
            for x in 0..4 {
                image
                    .set_pixel(x, y, &ColorRgbaD::new(0.5, 0.5, 0.5, 1.0), false)
                    .unwrap();
            }
        }
        let normals = image
            .create_normal_map(NormalOptions::default(), 1.0, PixelFormat::RGBF)
            .unwrap();
        let normal = normals.get_pixel(2, 2).unwrap();
        assert!((normal.r - 0.5).abs() < 1e-6);
        assert!((normal.g - 0.5).abs() < 1e-6);
        assert!((normal.b - 1.0).abs() < 1e-6);
    }

    #[test]
    fn premultiply_unsupported_layout_is_noop() {
        let mut image = Image::new(PixelFormat::RGB8, 2, 2, ColorSpace::Linear).unwrap();
        image
            .set_pixel(0, 0, &ColorRgbaD::new(1.0, 0.5, 0.25, 0.5), false)
            .unwrap();
        let before = image.data().to_vec();
        image.pre_multiply_alpha();
        assert_eq!(image.data(), &before[..]);
    }

    #[test]
    fn premultiply_scales_by_alpha() {
        let mut image = Image::new(PixelFormat::RGBAF, 1, 1, ColorSpace::Linear).unwrap();
        image
            .set_pixel(0, 0, &ColorRgbaD::new(1.0, 0.5, 0.25, 0.5), false)
            .unwrap();
        image.pre_multiply_alpha();
        let color = image.get_pixel(0, 0).unwrap();
        assert!((color.r - 0.5).abs() < 1e-6);
        assert!((color.g - 0.25).abs() < 1e-6);
        assert!((color.a - 0.5).abs() < 1e-6);
    }

    #[test]
    fn srgb_resize_round_trips_through_linear() {
        let mut srgb = gradient_image();
        srgb.set_color_space_tag(ColorSpace::Srgb);

        let direct = srgb.resize(4, 3, ResizeFilter::Linear).unwrap();

        let mut linear = srgb.clone();
        linear.change_color_space(ColorSpace::Linear);
        let mut manual = linear.resize(4, 3, ResizeFilter::Linear).unwrap();
        manual.change_color_space(ColorSpace::Srgb);

        for y in 0..3 {
            for x in 0..4 {
                let a = direct.get_pixel(x, y).unwrap();
                let b = manual.get_pixel(x, y).unwrap();
                assert!((a.r - b.r).abs() <= 1.0 / 255.0);
                assert!((a.g - b.g).abs() <= 1.0 / 255.0);
                assert!((a.b - b.b).abs() <= 1.0 / 255.0);
            }
        }
    }
}
