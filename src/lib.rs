//! Texture asset pipeline: loads conventional bitmaps, manipulates them in a
//! high-precision working space and converts them into GPU-ready texture containers.
//!
//! The pipeline has three stages:
//!
//! 1. [`Image`]: a raster in one of ~17 layouts with resize, rotation, flips, swizzling,
//!    color-space conversion, grayscale and normal-map generation. Bitmaps load through the
//!    `image` crate (png, jpeg, tga, tiff, bmp, gif).
//! 2. [`Texture`]: the 1D/2D/3D/Cube aggregate that owns the mip pyramid, generates
//!    mipmaps (with per-level custom overrides) and converts the images to a storage
//!    [`Format`], either uncompressed channel layouts, packed small formats,
//!    shared-exponent and packed floats, or block compression (BC1-BC7, ETC1/ETC2/EAC,
//!    ASTC, PVRTC).
//! 3. Container writers with bit-exact DDS, KTX1 and PVR3 emission.
//!
//! Conversion runs the per-block encoders on a pool of worker threads; see
//! [`Texture::convert`].
//!
//! ```no_run
//! use texc::{Alpha, ColorMask, ColorSpace, CubeFace, Dimension, FileType, Format, Image,
//!     Quality, Texture, Type};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let image = Image::load("albedo.png", ColorSpace::Srgb)?;
//! let mut texture = Texture::new(
//!     Dimension::Dim2D, image.width(), image.height(), 0, texc::ALL_MIP_LEVELS,
//!     ColorSpace::Srgb)?;
//! texture.set_image(image, CubeFace::PosX, 0, 0)?;
//! texture.generate_mipmaps(Default::default(), texc::ALL_MIP_LEVELS, &Default::default())?;
//! texture.convert(Format::BC1_RGB, Type::UNorm, Quality::Normal, Alpha::Standard,
//!     ColorMask::default(), texc::ALL_CORES)?;
//! texture.save("albedo.dds", FileType::Auto)?;
//! # Ok(())
//! # }
//! ```

pub mod color;
mod convert;
mod error;
pub mod image;
mod save;
pub mod texture;

pub use color::{linear_to_srgb, srgb_to_linear, to_grayscale, ColorRgbaD, ColorRgbaF, ColorSpace};
pub use error::{Error, SaveError};
pub use image::{Channel, Image, NormalOptions, PixelFormat, ResizeFilter, RotateAngle};
pub use texture::{
    adjust_image_value_range, block_height, block_size, block_width, has_alpha, has_native_srgb,
    is_format_valid, is_format_valid_for_file, max_mipmap_levels, min_height, min_width,
    Alpha, ColorMask, CubeFace,
    CustomMipImage, CustomMipImages, Dimension, FileType, Format, ImageIndex, MipReplacement,
    Quality, Texture, Type, ALL_CORES, ALL_MIP_LEVELS,
};
