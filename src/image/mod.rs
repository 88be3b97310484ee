//! High-precision raster images.
//!
//! [`Image`] is the working representation every texture input goes through. It can hold any
//! of the layouts in [`PixelFormat`], but the conversion pipeline always normalizes to
//! [`PixelFormat::RGBAF`] (4×f32) before encoding. Decoding and PNG-style saving go through
//! the `image` crate; everything else operates on the raw scanlines directly.

use crate::color::{to_grayscale, ColorRgbaD, ColorRgbaF, ColorSpace};
use crate::error::Error;
use image::{DynamicImage, ExtendedColorType, ImageFormat};
use std::io::{Cursor, Read, Write};
use std::path::Path;
use strum_macros::{AsRefStr, EnumString, VariantNames};

mod ops;

pub use ops::{NormalOptions, ResizeFilter, RotateAngle};

/// Storage layout of an [`Image`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, AsRefStr, EnumString, VariantNames)]
pub enum PixelFormat {
    /// 8-bit luminance.
    Gray8,
    /// 16-bit luminance.
    Gray16,
    /// 5 bits per color channel, 1 bit unused.
    RGB5,
    /// 5/6/5 bits per color channel.
    RGB565,
    /// 8 bits per color channel.
    RGB8,
    /// 16 bits per color channel.
    RGB16,
    /// Single-precision float per color channel.
    RGBF,
    /// 8 bits per channel with alpha.
    RGBA8,
    /// 16 bits per channel with alpha.
    RGBA16,
    /// Single-precision float per channel with alpha. The canonical working layout.
    RGBAF,
    /// 16-bit signed scalar.
    Int16,
    /// 16-bit unsigned scalar.
    UInt16,
    /// 32-bit signed scalar.
    Int32,
    /// 32-bit unsigned scalar.
    UInt32,
    /// Single-precision scalar.
    Float,
    /// Double-precision scalar.
    Double,
    /// Pair of doubles holding a complex number.
    Complex,
}

impl PixelFormat {
    /// Bytes used by one pixel of this layout.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Gray16
            | PixelFormat::RGB5
            | PixelFormat::RGB565
            | PixelFormat::Int16
            | PixelFormat::UInt16 => 2,
            PixelFormat::RGB8 => 3,
            PixelFormat::RGBA8 | PixelFormat::Int32 | PixelFormat::UInt32 | PixelFormat::Float => 4,
            PixelFormat::RGB16 => 6,
            PixelFormat::RGBA16 | PixelFormat::Double => 8,
            PixelFormat::RGBF => 12,
            PixelFormat::RGBAF | PixelFormat::Complex => 16,
        }
    }

    /// Layouts that hold a single luminance-like value per pixel.
    pub fn is_grayscale(self) -> bool {
        matches!(
            self,
            PixelFormat::Gray8 | PixelFormat::Gray16 | PixelFormat::Float | PixelFormat::Double
        )
    }
}

/// Channel selector for [`Image::swizzle`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Channel {
    Red,
    Green,
    Blue,
    Alpha,
    /// Unused channel: swizzles to 0 for color and 1 for alpha.
    None,
}

/// A raster image with explicit layout and color space. Row 0 is the top row; copies are deep.
#[derive(Clone, Debug)]
pub struct Image {
    format: PixelFormat,
    color_space: ColorSpace,
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
}

const FI16_555_RED_SHIFT: u32 = 10;
const FI16_555_GREEN_SHIFT: u32 = 5;
const FI16_555_BLUE_SHIFT: u32 = 0;
const FI16_565_RED_SHIFT: u32 = 11;
const FI16_565_GREEN_SHIFT: u32 = 5;
const FI16_565_BLUE_SHIFT: u32 = 0;

fn to_double_norm8(value: u8) -> f64 {
    value as f64 / 255.0
}

fn to_double_norm16(value: u16) -> f64 {
    value as f64 / 65535.0
}

fn to_double_norm5(value: u16) -> f64 {
    value as f64 / 31.0
}

fn to_double_norm6(value: u16) -> f64 {
    value as f64 / 63.0
}

fn from_double_norm8(d: f64) -> u8 {
    (d.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn from_double_norm16(d: f64) -> u16 {
    (d.clamp(0.0, 1.0) * 65535.0).round() as u16
}

fn from_double_norm5(d: f64) -> u16 {
    (d.clamp(0.0, 1.0) * 31.0).round() as u16
}

fn from_double_norm6(d: f64) -> u16 {
    (d.clamp(0.0, 1.0) * 63.0).round() as u16
}

fn read_u16(scanline: &[u8], x: usize) -> u16 {
    u16::from_ne_bytes([scanline[x * 2], scanline[x * 2 + 1]])
}

fn write_u16(scanline: &mut [u8], x: usize, value: u16) {
    scanline[x * 2..x * 2 + 2].copy_from_slice(&value.to_ne_bytes());
}

fn read_f32(scanline: &[u8], index: usize) -> f32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&scanline[index * 4..index * 4 + 4]);
    f32::from_ne_bytes(bytes)
}

fn write_f32(scanline: &mut [u8], index: usize, value: f32) {
    scanline[index * 4..index * 4 + 4].copy_from_slice(&value.to_ne_bytes());
}

fn read_f64(scanline: &[u8], index: usize) -> f64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&scanline[index * 8..index * 8 + 8]);
    f64::from_ne_bytes(bytes)
}

fn write_f64(scanline: &mut [u8], index: usize, value: f64) {
    scanline[index * 8..index * 8 + 8].copy_from_slice(&value.to_ne_bytes());
}

pub(crate) fn get_pixel_impl(format: PixelFormat, scanline: &[u8], x: usize) -> ColorRgbaD {
    match format {
        PixelFormat::Gray8 => {
            let v = to_double_norm8(scanline[x]);
            ColorRgbaD::new(v, v, v, 1.0)
        }
        PixelFormat::Gray16 => {
            let v = to_double_norm16(read_u16(scanline, x));
            ColorRgbaD::new(v, v, v, 1.0)
        }
        PixelFormat::RGB5 => {
            let pixel = read_u16(scanline, x);
            ColorRgbaD::new(
                to_double_norm5((pixel >> FI16_555_RED_SHIFT) & 0x1F),
                to_double_norm5((pixel >> FI16_555_GREEN_SHIFT) & 0x1F),
                to_double_norm5((pixel >> FI16_555_BLUE_SHIFT) & 0x1F),
                1.0,
            )
        }
        PixelFormat::RGB565 => {
            let pixel = read_u16(scanline, x);
            ColorRgbaD::new(
                to_double_norm5((pixel >> FI16_565_RED_SHIFT) & 0x1F),
                to_double_norm6((pixel >> FI16_565_GREEN_SHIFT) & 0x3F),
                to_double_norm5((pixel >> FI16_565_BLUE_SHIFT) & 0x1F),
                1.0,
            )
        }
        PixelFormat::RGB8 => ColorRgbaD::new(
            to_double_norm8(scanline[x * 3]),
            to_double_norm8(scanline[x * 3 + 1]),
            to_double_norm8(scanline[x * 3 + 2]),
            1.0,
        ),
        PixelFormat::RGB16 => ColorRgbaD::new(
            to_double_norm16(read_u16(scanline, x * 3)),
            to_double_norm16(read_u16(scanline, x * 3 + 1)),
            to_double_norm16(read_u16(scanline, x * 3 + 2)),
            1.0,
        ),
        PixelFormat::RGBF => ColorRgbaD::new(
            read_f32(scanline, x * 3) as f64,
            read_f32(scanline, x * 3 + 1) as f64,
            read_f32(scanline, x * 3 + 2) as f64,
            1.0,
        ),
        PixelFormat::RGBA8 => ColorRgbaD::new(
            to_double_norm8(scanline[x * 4]),
            to_double_norm8(scanline[x * 4 + 1]),
            to_double_norm8(scanline[x * 4 + 2]),
            to_double_norm8(scanline[x * 4 + 3]),
        ),
        PixelFormat::RGBA16 => ColorRgbaD::new(
            to_double_norm16(read_u16(scanline, x * 4)),
            to_double_norm16(read_u16(scanline, x * 4 + 1)),
            to_double_norm16(read_u16(scanline, x * 4 + 2)),
            to_double_norm16(read_u16(scanline, x * 4 + 3)),
        ),
        PixelFormat::RGBAF => ColorRgbaD::new(
            read_f32(scanline, x * 4) as f64,
            read_f32(scanline, x * 4 + 1) as f64,
            read_f32(scanline, x * 4 + 2) as f64,
            read_f32(scanline, x * 4 + 3) as f64,
        ),
        PixelFormat::Int16 => {
            let v = read_u16(scanline, x) as i16 as f64;
            ColorRgbaD::new(v, v, v, 1.0)
        }
        PixelFormat::UInt16 => {
            let v = read_u16(scanline, x) as f64;
            ColorRgbaD::new(v, v, v, 1.0)
        }
        PixelFormat::Int32 => {
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(&scanline[x * 4..x * 4 + 4]);
            let v = i32::from_ne_bytes(bytes) as f64;
            ColorRgbaD::new(v, v, v, 1.0)
        }
        PixelFormat::UInt32 => {
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(&scanline[x * 4..x * 4 + 4]);
            let v = u32::from_ne_bytes(bytes) as f64;
            ColorRgbaD::new(v, v, v, 1.0)
        }
        PixelFormat::Float => {
            let v = read_f32(scanline, x) as f64;
            ColorRgbaD::new(v, v, v, 1.0)
        }
        PixelFormat::Double => {
            let v = read_f64(scanline, x);
            ColorRgbaD::new(v, v, v, 1.0)
        }
        PixelFormat::Complex => {
            ColorRgbaD::new(read_f64(scanline, x * 2), read_f64(scanline, x * 2 + 1), 0.0, 1.0)
        }
    }
}

pub(crate) fn set_pixel_impl(
    format: PixelFormat,
    scanline: &mut [u8],
    x: usize,
    color: &ColorRgbaD,
) {
    match format {
        PixelFormat::Gray8 => {
            scanline[x] = from_double_norm8(to_grayscale(color.r, color.g, color.b));
        }
        PixelFormat::Gray16 => {
            write_u16(scanline, x, from_double_norm16(to_grayscale(color.r, color.g, color.b)));
        }
        PixelFormat::Float => write_f32(scanline, x, to_grayscale(color.r, color.g, color.b) as f32),
        PixelFormat::Double => write_f64(scanline, x, to_grayscale(color.r, color.g, color.b)),
        // The remaining layouts have no grayscale interpretation on write.
        _ => set_pixel_no_grayscale_impl(format, scanline, x, color),
    }
}

pub(crate) fn set_pixel_no_grayscale_impl(
    format: PixelFormat,
    scanline: &mut [u8],
    x: usize,
    color: &ColorRgbaD,
) {
    match format {
        PixelFormat::Gray8 => scanline[x] = from_double_norm8(color.r),
        PixelFormat::Gray16 => write_u16(scanline, x, from_double_norm16(color.r)),
        PixelFormat::RGB5 => {
            let pixel = (from_double_norm5(color.r) << FI16_555_RED_SHIFT)
                | (from_double_norm5(color.g) << FI16_555_GREEN_SHIFT)
                | (from_double_norm5(color.b) << FI16_555_BLUE_SHIFT);
            write_u16(scanline, x, pixel);
        }
        PixelFormat::RGB565 => {
            let pixel = (from_double_norm5(color.r) << FI16_565_RED_SHIFT)
                | (from_double_norm6(color.g) << FI16_565_GREEN_SHIFT)
                | (from_double_norm5(color.b) << FI16_565_BLUE_SHIFT);
            write_u16(scanline, x, pixel);
        }
        PixelFormat::RGB8 => {
            scanline[x * 3] = from_double_norm8(color.r);
            scanline[x * 3 + 1] = from_double_norm8(color.g);
            scanline[x * 3 + 2] = from_double_norm8(color.b);
        }
        PixelFormat::RGB16 => {
            write_u16(scanline, x * 3, from_double_norm16(color.r));
            write_u16(scanline, x * 3 + 1, from_double_norm16(color.g));
            write_u16(scanline, x * 3 + 2, from_double_norm16(color.b));
        }
        PixelFormat::RGBF => {
            write_f32(scanline, x * 3, color.r as f32);
            write_f32(scanline, x * 3 + 1, color.g as f32);
            write_f32(scanline, x * 3 + 2, color.b as f32);
        }
        PixelFormat::RGBA8 => {
            scanline[x * 4] = from_double_norm8(color.r);
            scanline[x * 4 + 1] = from_double_norm8(color.g);
            scanline[x * 4 + 2] = from_double_norm8(color.b);
            scanline[x * 4 + 3] = from_double_norm8(color.a);
        }
        PixelFormat::RGBA16 => {
            write_u16(scanline, x * 4, from_double_norm16(color.r));
            write_u16(scanline, x * 4 + 1, from_double_norm16(color.g));
            write_u16(scanline, x * 4 + 2, from_double_norm16(color.b));
            write_u16(scanline, x * 4 + 3, from_double_norm16(color.a));
        }
        PixelFormat::RGBAF => {
            write_f32(scanline, x * 4, color.r as f32);
            write_f32(scanline, x * 4 + 1, color.g as f32);
            write_f32(scanline, x * 4 + 2, color.b as f32);
            write_f32(scanline, x * 4 + 3, color.a as f32);
        }
        PixelFormat::Int16 => write_u16(scanline, x, (color.r as i16) as u16),
        PixelFormat::UInt16 => write_u16(scanline, x, color.r as u16),
        PixelFormat::Int32 => {
            scanline[x * 4..x * 4 + 4].copy_from_slice(&(color.r as i32).to_ne_bytes())
        }
        PixelFormat::UInt32 => {
            scanline[x * 4..x * 4 + 4].copy_from_slice(&(color.r as u32).to_ne_bytes())
        }
        PixelFormat::Float => write_f32(scanline, x, color.r as f32),
        PixelFormat::Double => write_f64(scanline, x, color.r),
        PixelFormat::Complex => {
            write_f64(scanline, x * 2, color.r);
            write_f64(scanline, x * 2 + 1, color.g);
        }
    }
}

impl Image {
    /// Creates an image with zeroed pixels.
    pub fn new(
        format: PixelFormat,
        width: u32,
        height: u32,
        color_space: ColorSpace,
    ) -> Result<Self, Error> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidInput("image dimensions must be non-zero".into()));
        }

        let stride = width as usize * format.bytes_per_pixel();
        Ok(Self {
            format,
            color_space,
            width,
            height,
            stride,
            data: vec![0; stride * height as usize],
        })
    }

    /// Loads an image from a file, detecting its type from the content.
    pub fn load(path: impl AsRef<Path>, color_space: ColorSpace) -> Result<Self, Error> {
        let data = std::fs::read(path)?;
        Self::load_from_memory(&data, color_space)
    }

    /// Loads an image from encoded bytes.
    pub fn load_from_memory(data: &[u8], color_space: ColorSpace) -> Result<Self, Error> {
        // TGA has no identifying magic, so try it explicitly when detection fails.
        let decoded = image::load_from_memory(data)
            .or_else(|_| image::load_from_memory_with_format(data, ImageFormat::Tga))?;
        Ok(Self::from_dynamic(decoded, color_space))
    }

    /// Loads an image from a byte stream.
    pub fn load_from_reader(mut reader: impl Read, color_space: ColorSpace) -> Result<Self, Error> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::load_from_memory(&data, color_space)
    }

    fn from_dynamic(decoded: DynamicImage, color_space: ColorSpace) -> Self {
        let width = decoded.width();
        let height = decoded.height();
        let (format, data) = match decoded {
            DynamicImage::ImageLuma8(img) => (PixelFormat::Gray8, img.into_raw()),
            DynamicImage::ImageRgb8(img) => (PixelFormat::RGB8, img.into_raw()),
            DynamicImage::ImageRgba8(img) => (PixelFormat::RGBA8, img.into_raw()),
            DynamicImage::ImageLumaA8(img) => {
                (PixelFormat::RGBA8, DynamicImage::ImageLumaA8(img).to_rgba8().into_raw())
            }
            DynamicImage::ImageLuma16(img) => {
                (PixelFormat::Gray16, bytemuck::cast_slice(img.as_raw()).to_vec())
            }
            DynamicImage::ImageLumaA16(img) => (
                PixelFormat::RGBA16,
                bytemuck::cast_slice(DynamicImage::ImageLumaA16(img).to_rgba16().as_raw()).to_vec(),
            ),
            DynamicImage::ImageRgb16(img) => {
                (PixelFormat::RGB16, bytemuck::cast_slice(img.as_raw()).to_vec())
            }
            DynamicImage::ImageRgba16(img) => {
                (PixelFormat::RGBA16, bytemuck::cast_slice(img.as_raw()).to_vec())
            }
            DynamicImage::ImageRgb32F(img) => {
                (PixelFormat::RGBF, bytemuck::cast_slice(img.as_raw()).to_vec())
            }
            DynamicImage::ImageRgba32F(img) => {
                (PixelFormat::RGBAF, bytemuck::cast_slice(img.as_raw()).to_vec())
            }
            other => (PixelFormat::RGBA8, other.to_rgba8().into_raw()),
        };

        let stride = width as usize * format.bytes_per_pixel();
        Self { format, color_space, width, height, stride, data }
    }

    /// Saves the image to a file; the format is keyed off the path extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        let key = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or(Error::UnsupportedFormat)?;
        let format = ImageFormat::from_extension(key).ok_or(Error::UnsupportedFormat)?;
        let (data, color) = self.encodable()?;
        image::save_buffer_with_format(path, &data, self.width, self.height, color, format)?;
        Ok(())
    }

    /// Saves the image into a byte buffer with an explicit format key (`"png"`, ...).
    pub fn save_to_buffer(&self, out: &mut Vec<u8>, format_key: &str) -> Result<(), Error> {
        let mut cursor = Cursor::new(Vec::new());
        self.save_to_writer(&mut cursor, format_key)?;
        *out = cursor.into_inner();
        Ok(())
    }

    /// Saves the image to a seekable stream with an explicit format key.
    pub fn save_to_writer(
        &self,
        writer: &mut (impl Write + std::io::Seek),
        format_key: &str,
    ) -> Result<(), Error> {
        let format = ImageFormat::from_extension(format_key).ok_or(Error::UnsupportedFormat)?;
        let (data, color) = self.encodable()?;
        image::write_buffer_with_format(writer, &data, self.width, self.height, color, format)?;
        Ok(())
    }

    fn encodable(&self) -> Result<(std::borrow::Cow<[u8]>, ExtendedColorType), Error> {
        use std::borrow::Cow;
        let native = match self.format {
            PixelFormat::Gray8 => Some(ExtendedColorType::L8),
            PixelFormat::Gray16 => Some(ExtendedColorType::L16),
            PixelFormat::RGB8 => Some(ExtendedColorType::Rgb8),
            PixelFormat::RGBA8 => Some(ExtendedColorType::Rgba8),
            PixelFormat::RGB16 => Some(ExtendedColorType::Rgb16),
            PixelFormat::RGBA16 => Some(ExtendedColorType::Rgba16),
            PixelFormat::RGBF => Some(ExtendedColorType::Rgb32F),
            PixelFormat::RGBAF => Some(ExtendedColorType::Rgba32F),
            _ => None,
        };
        if let Some(color) = native {
            return Ok((Cow::Borrowed(&self.data), color));
        }

        match self.format {
            PixelFormat::RGB5 | PixelFormat::RGB565 => {
                let converted = self.convert(PixelFormat::RGB8, false)?;
                Ok((Cow::Owned(converted.data), ExtendedColorType::Rgb8))
            }
            _ => Err(Error::UnsupportedFormat),
        }
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    pub(crate) fn set_color_space_tag(&mut self, color_space: ColorSpace) {
        self.color_space = color_space;
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes in one row of pixels.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Raw packed pixels of row `y`. Row 0 is the top.
    pub fn scanline(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.stride]
    }

    pub fn scanline_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.stride;
        &mut self.data[start..start + self.stride]
    }

    /// Typed scanline access for the RGBAF working layout.
    ///
    /// Panics if the image is not RGBAF; encoders only ever see RGBAF images.
    pub(crate) fn rgbaf_scanline(&self, y: u32) -> &[ColorRgbaF] {
        debug_assert_eq!(self.format, PixelFormat::RGBAF);
        bytemuck::cast_slice(self.scanline(y))
    }

    pub(crate) fn rgbaf_scanline_mut(&mut self, y: u32) -> &mut [ColorRgbaF] {
        debug_assert_eq!(self.format, PixelFormat::RGBAF);
        bytemuck::cast_slice_mut(self.scanline_mut(y))
    }

    pub(crate) fn data(&self) -> &[u8] {
        &self.data
    }

    /// Normalized pixel read. Out-of-range coordinates fail.
    pub fn get_pixel(&self, x: u32, y: u32) -> Result<ColorRgbaD, Error> {
        if x >= self.width || y >= self.height {
            return Err(Error::InvalidInput(format!("pixel ({x}, {y}) out of range")));
        }
        Ok(get_pixel_impl(self.format, self.scanline(y), x as usize))
    }

    /// Normalized pixel write. `convert_grayscale` selects luminance conversion for
    /// grayscale-like layouts; otherwise the red channel is taken verbatim.
    pub fn set_pixel(
        &mut self,
        x: u32,
        y: u32,
        color: &ColorRgbaD,
        convert_grayscale: bool,
    ) -> Result<(), Error> {
        if x >= self.width || y >= self.height {
            return Err(Error::InvalidInput(format!("pixel ({x}, {y}) out of range")));
        }
        let format = self.format;
        let scanline = self.scanline_mut(y);
        if convert_grayscale {
            set_pixel_impl(format, scanline, x as usize, color);
        } else {
            set_pixel_no_grayscale_impl(format, scanline, x as usize, color);
        }
        Ok(())
    }

    /// Converts the image to another layout, returning a new image.
    ///
    /// Converting to a grayscale-like layout requires `convert_grayscale` unless the source
    /// already is one; complex sources never grayscale-convert. Float-to-float conversions
    /// preserve HDR values without clamping.
    pub fn convert(&self, dst_format: PixelFormat, convert_grayscale: bool) -> Result<Self, Error> {
        if dst_format == self.format {
            return Ok(self.clone());
        }

        if dst_format.is_grayscale()
            && !convert_grayscale
            && !self.format.is_grayscale()
            && self.format != PixelFormat::Complex
        {
            return Err(Error::GrayscaleRequired);
        }

        let mut out = Image::new(dst_format, self.width, self.height, self.color_space)?;

        // Fast paths for the conversions the pipeline performs constantly.
        if !convert_grayscale && self.fast_convert_to(&mut out) {
            return Ok(out);
        }

        let use_grayscale = convert_grayscale && self.format != PixelFormat::Complex;
        for y in 0..self.height {
            let src = self.scanline(y);
            let start = y as usize * out.stride;
            let dst = &mut out.data[start..start + out.stride];
            for x in 0..self.width as usize {
                let color = get_pixel_impl(self.format, src, x);
                if use_grayscale {
                    set_pixel_impl(dst_format, dst, x, &color);
                } else {
                    set_pixel_no_grayscale_impl(dst_format, dst, x, &color);
                }
            }
        }
        Ok(out)
    }

    /// Direct transcodes for the hot conversion pairs. UInt16 sources always take the
    /// generic path; it treats the values as raw numbers rather than normalized ones.
    fn fast_convert_to(&self, out: &mut Image) -> bool {
        match (self.format, out.format) {
            (PixelFormat::RGBA8, PixelFormat::RGBAF) => {
                for (src, dst) in self.data.chunks_exact(4).zip(out.data.chunks_exact_mut(16)) {
                    for c in 0..4 {
                        dst[c * 4..c * 4 + 4]
                            .copy_from_slice(&(src[c] as f32 / 255.0).to_ne_bytes());
                    }
                }
                true
            }
            (PixelFormat::RGB8, PixelFormat::RGBAF) => {
                for (src, dst) in self.data.chunks_exact(3).zip(out.data.chunks_exact_mut(16)) {
                    for c in 0..3 {
                        dst[c * 4..c * 4 + 4]
                            .copy_from_slice(&(src[c] as f32 / 255.0).to_ne_bytes());
                    }
                    dst[12..16].copy_from_slice(&1.0f32.to_ne_bytes());
                }
                true
            }
            (PixelFormat::RGBF, PixelFormat::RGBAF) => {
                for (src, dst) in self.data.chunks_exact(12).zip(out.data.chunks_exact_mut(16)) {
                    dst[..12].copy_from_slice(src);
                    dst[12..16].copy_from_slice(&1.0f32.to_ne_bytes());
                }
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn round_trip(format: PixelFormat, color: ColorRgbaD, epsilon: f64, grayscale: bool) {
        let mut image = Image::new(format, 4, 4, ColorSpace::Linear).unwrap();
        image.set_pixel(1, 2, &color, grayscale).unwrap();
        let read = image.get_pixel(1, 2).unwrap();
        assert!(
            (read.r - color.r).abs() <= epsilon
                && (read.g - color.g).abs() <= epsilon
                && (read.b - color.b).abs() <= epsilon,
            "{format:?}: wrote {color:?}, read {read:?}"
        );
    }

    #[test]
    fn pixel_round_trip_epsilons() {
        let c = ColorRgbaD::new(0.25, 0.5, 0.75, 1.0);
        round_trip(PixelFormat::RGBA8, c, 1.0 / 255.0, false);
        round_trip(PixelFormat::RGB8, c, 1.0 / 255.0, false);
        round_trip(PixelFormat::RGBA16, c, 1.0 / 65535.0, false);
        round_trip(PixelFormat::RGB16, c, 1.0 / 65535.0, false);
        round_trip(PixelFormat::RGB5, c, 1.0 / 31.0, false);
        round_trip(PixelFormat::RGB565, c, 1.0 / 31.0, false);
        round_trip(PixelFormat::RGBAF, c, 1e-6, false);
        round_trip(PixelFormat::RGBF, c, 1e-6, false);
    }

    #[test]
    fn scalar_layouts_take_red_verbatim() {
        let mut image = Image::new(PixelFormat::Float, 2, 2, ColorSpace::Linear).unwrap();
        image
            .set_pixel(0, 0, &ColorRgbaD::new(4.5, 0.0, 0.0, 1.0), false)
            .unwrap();
        assert_eq!(image.get_pixel(0, 0).unwrap().r, 4.5);

        let mut gray = Image::new(PixelFormat::Gray8, 2, 2, ColorSpace::Linear).unwrap();
        gray.set_pixel(0, 0, &ColorRgbaD::new(1.0, 0.0, 0.0, 1.0), true)
            .unwrap();
        // Luminance of pure red.
        assert_eq!(gray.scanline(0)[0], (0.2126f64 * 255.0).round() as u8);
    }

    #[test]
    fn out_of_range_pixel_fails() {
        let image = Image::new(PixelFormat::RGBA8, 2, 2, ColorSpace::Linear).unwrap();
        assert!(image.get_pixel(2, 0).is_err());
        assert!(image.get_pixel(0, 2).is_err());
    }

    #[test]
    fn grayscale_conversion_requires_flag() {
        let image = Image::new(PixelFormat::RGBA8, 2, 2, ColorSpace::Linear).unwrap();
        assert!(matches!(
            image.convert(PixelFormat::Gray8, false),
            Err(Error::GrayscaleRequired)
        ));
        assert!(image.convert(PixelFormat::Gray8, true).is_ok());

        // Already-grayscale sources convert without the flag.
        let gray = Image::new(PixelFormat::Float, 2, 2, ColorSpace::Linear).unwrap();
        assert!(gray.convert(PixelFormat::Gray8, false).is_ok());
    }

    #[test]
    fn float_conversion_preserves_hdr() {
        let mut image = Image::new(PixelFormat::RGBF, 2, 2, ColorSpace::Linear).unwrap();
        image
            .set_pixel(0, 0, &ColorRgbaD::new(12.5, 3.25, 0.5, 1.0), false)
            .unwrap();
        let converted = image.convert(PixelFormat::RGBAF, false).unwrap();
        let color = converted.get_pixel(0, 0).unwrap();
        assert_eq!(color.r, 12.5);
        assert_eq!(color.g, 3.25);
    }

    #[test]
    fn png_buffer_round_trip() {
        let mut image = Image::new(PixelFormat::RGBA8, 10, 15, ColorSpace::Linear).unwrap();
        image
            .set_pixel(0, 0, &ColorRgbaD::new(0.5, 0.25, 0.75, 1.0), false)
            .unwrap();
        let original = image.get_pixel(0, 0).unwrap();

        let mut buffer = Vec::new();
        image.save_to_buffer(&mut buffer, "png").unwrap();
        let reloaded = Image::load_from_memory(&buffer, ColorSpace::Linear).unwrap();

        assert_eq!(reloaded.format(), PixelFormat::RGBA8);
        assert_eq!(reloaded.width(), 10);
        assert_eq!(reloaded.height(), 15);
        assert_eq!(reloaded.get_pixel(0, 0).unwrap(), original);
    }

    #[test]
    fn unknown_save_key_fails() {
        let image = Image::new(PixelFormat::RGBA8, 2, 2, ColorSpace::Linear).unwrap();
        let mut buffer = Vec::new();
        assert!(image.save_to_buffer(&mut buffer, "not-a-format").is_err());
    }
}
