//! Textures: the aggregate that owns the image pyramid, generates mipmaps, drives the
//! conversion engine and writes container files.
//!
//! A texture is created with its full geometry (dimension, size, array depth, mip count),
//! filled with [`Image`]s that are normalized to RGBAF in the texture's color space, then
//! converted to a storage format and saved as DDS, KTX or PVR.

use crate::color::{linear_to_srgb, srgb_to_linear, ColorSpace};
use crate::convert::{convert_images, EncodeSettings, MipTextureList};
use crate::error::{Error, SaveError};
use crate::image::{Image, PixelFormat, ResizeFilter};
use crate::save;
use fxhash::FxHashMap;
use std::fs::File;
use std::io::{BufWriter, Cursor, Write};

pub mod info;

pub use info::{
    block_height, block_size, block_width, has_alpha, has_native_srgb, is_format_valid,
    min_height, min_width, Alpha, ColorMask, CubeFace, Dimension, FileType, Format, Quality, Type,
};

/// Use every available hardware thread for conversion.
pub const ALL_CORES: u32 = u32::MAX;

/// Generate the complete mip chain.
pub const ALL_MIP_LEVELS: u32 = u32::MAX;

/// Identifies one image slot of the pyramid.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImageIndex {
    pub face: CubeFace,
    pub mip_level: u32,
    pub depth: u32,
}

impl ImageIndex {
    pub fn new(face: CubeFace, mip_level: u32, depth: u32) -> Self {
        Self { face, mip_level, depth }
    }

    /// Index for non-cube textures, which only have the nominal +X face.
    pub fn at(mip_level: u32, depth: u32) -> Self {
        Self { face: CubeFace::PosX, mip_level, depth }
    }
}

/// How a custom mip image affects the levels below it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MipReplacement {
    /// Inject the override into its slot only; the auto-generated chain resumes from the
    /// pre-override state at the next level.
    Once,
    /// Every following level downsamples from the override.
    Continue,
}

/// A user-provided replacement for a generated mip level.
pub struct CustomMipImage {
    pub image: Image,
    pub replacement: MipReplacement,
}

impl CustomMipImage {
    pub fn new(image: Image, replacement: MipReplacement) -> Self {
        Self { image, replacement }
    }
}

/// Custom mip overrides keyed by their pyramid slot.
pub type CustomMipImages = FxHashMap<ImageIndex, CustomMipImage>;

fn level_count(extent: u32) -> u32 {
    32 - extent.leading_zeros()
}

/// Largest possible mip chain for the given geometry:
/// `⌈log2(max(width, height, depth))⌉ + 1` counting the base level.
pub fn max_mipmap_levels(dimension: Dimension, width: u32, height: u32, depth: u32) -> u32 {
    let max_wh = level_count(width).max(level_count(height));
    if dimension == Dimension::Dim3D {
        max_wh.max(level_count(depth))
    } else {
        max_wh
    }
}

pub struct Texture {
    dimension: Dimension,
    color_space: ColorSpace,
    width: u32,
    height: u32,
    depth: u32,
    mip_levels: u32,
    faces: u32,
    images: Vec<Vec<Vec<Option<Image>>>>,
    format: Format,
    ty: Type,
    alpha: Alpha,
    color_mask: ColorMask,
    textures: MipTextureList,
}

impl Texture {
    /// Creates a texture with empty image slots. `depth` is the array length for 1D/2D/Cube
    /// textures (0 for non-arrays) and the slice count for 3D.
    pub fn new(
        dimension: Dimension,
        width: u32,
        height: u32,
        depth: u32,
        mip_levels: u32,
        color_space: ColorSpace,
    ) -> Result<Self, Error> {
        if width == 0 || height == 0 || (dimension == Dimension::Dim3D && depth == 0) {
            return Err(Error::InvalidInput("texture dimensions must be non-zero".into()));
        }

        let mip_levels =
            mip_levels.max(1).min(max_mipmap_levels(dimension, width, height, depth));
        let faces = if dimension == Dimension::Cube { 6 } else { 1 };

        let mut images = Vec::with_capacity(mip_levels as usize);
        for _ in 0..mip_levels {
            let mut depth_images = Vec::with_capacity(depth.max(1) as usize);
            for _ in 0..depth.max(1) {
                depth_images.push(vec![None; faces as usize]);
            }
            images.push(depth_images);
        }

        Ok(Self {
            dimension,
            color_space,
            width,
            height,
            depth,
            mip_levels,
            faces,
            images,
            format: Format::Unknown,
            ty: Type::UNorm,
            alpha: Alpha::Standard,
            color_mask: ColorMask::default(),
            textures: Vec::new(),
        })
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    /// Arrays are 1D/2D/Cube textures with at least one layer.
    pub fn is_array(&self) -> bool {
        self.dimension != Dimension::Dim3D && self.depth > 0
    }

    pub fn width(&self, mip_level: u32) -> u32 {
        if mip_level >= self.mip_levels {
            return 0;
        }
        (self.width >> mip_level).max(1)
    }

    pub fn height(&self, mip_level: u32) -> u32 {
        if mip_level >= self.mip_levels {
            return 0;
        }
        (self.height >> mip_level).max(1)
    }

    /// Depth at a mip level: halves per level for 3D, constant array length otherwise.
    pub fn depth(&self, mip_level: u32) -> u32 {
        if mip_level >= self.mip_levels {
            return 0;
        }
        if self.dimension == Dimension::Dim3D {
            (self.depth >> mip_level).max(1)
        } else {
            self.depth.max(1)
        }
    }

    pub fn mip_level_count(&self) -> u32 {
        self.mip_levels
    }

    pub fn face_count(&self) -> u32 {
        self.faces
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn texture_type(&self) -> Type {
        self.ty
    }

    pub fn alpha_type(&self) -> Alpha {
        self.alpha
    }

    pub fn color_mask(&self) -> ColorMask {
        self.color_mask
    }

    fn slot_ok(&self, face: CubeFace, mip_level: u32, depth: u32) -> bool {
        depth < self.depth(mip_level) && (self.faces == 6 || face == CubeFace::PosX)
    }

    pub fn get_image(&self, face: CubeFace, mip_level: u32, depth: u32) -> Option<&Image> {
        if !self.slot_ok(face, mip_level, depth) {
            return None;
        }
        self.images[mip_level as usize][depth as usize][face.index()].as_ref()
    }

    /// Stores an image in the pyramid, converting it to the RGBAF working layout and the
    /// texture's color space. Dimensions must match the slot exactly.
    pub fn set_image(
        &mut self,
        image: Image,
        face: CubeFace,
        mip_level: u32,
        depth: u32,
    ) -> Result<(), Error> {
        if !self.slot_ok(face, mip_level, depth) {
            return Err(Error::InvalidInput("image slot out of range".into()));
        }
        if image.width() != self.width(mip_level) || image.height() != self.height(mip_level) {
            return Err(Error::InvalidInput(format!(
                "image is {}x{}, expected {}x{}",
                image.width(),
                image.height(),
                self.width(mip_level),
                self.height(mip_level)
            )));
        }

        let mut image = if image.format() == PixelFormat::RGBAF {
            image
        } else {
            image.convert(PixelFormat::RGBAF, false)?
        };
        image.change_color_space(self.color_space);
        self.images[mip_level as usize][depth as usize][face.index()] = Some(image);
        Ok(())
    }

    fn images_complete(&self) -> bool {
        self.images
            .iter()
            .flatten()
            .flatten()
            .all(|slot| slot.is_some())
    }

    fn prepare_custom(&self, custom: &CustomMipImage) -> Result<Image, Error> {
        let mut image = custom.image.convert(PixelFormat::RGBAF, false)?;
        image.change_color_space(self.color_space);
        Ok(image)
    }

    /// Generates the mip chain from level 0, honoring custom overrides.
    pub fn generate_mipmaps(
        &mut self,
        filter: ResizeFilter,
        mip_levels: u32,
        custom_mips: &CustomMipImages,
    ) -> Result<(), Error> {
        for slot in self.images[0].iter().flatten() {
            if slot.is_none() {
                return Err(Error::InvalidInput("level 0 images are incomplete".into()));
            }
        }

        let mip_levels = mip_levels
            .max(1)
            .min(max_mipmap_levels(self.dimension, self.width, self.height, self.depth));
        self.mip_levels = mip_levels;
        self.images.truncate(mip_levels as usize);
        while self.images.len() < mip_levels as usize {
            self.images.push(Vec::new());
        }

        if self.dimension == Dimension::Dim3D {
            self.generate_mipmaps_3d(filter, custom_mips)
        } else {
            self.generate_mipmaps_2d(filter, custom_mips)
        }
    }

    fn generate_mipmaps_2d(
        &mut self,
        filter: ResizeFilter,
        custom_mips: &CustomMipImages,
    ) -> Result<(), Error> {
        let depth = self.depth.max(1);
        for mip in 1..self.mip_levels {
            let depth_images = &mut self.images[mip as usize];
            depth_images.resize_with(depth as usize, Vec::new);
            for face_images in depth_images.iter_mut() {
                face_images.resize_with(self.faces as usize, || None);
            }
        }

        for d in 0..depth {
            for f in 0..self.faces {
                let face = CubeFace::from_index(f as usize);
                let mut prev: Option<Image> = None;
                for mip in 1..self.mip_levels {
                    let mip_width = self.width(mip);
                    let mip_height = self.height(mip);
                    let custom = custom_mips.get(&ImageIndex::new(face, mip, d));
                    let restore =
                        matches!(custom, Some(c) if c.replacement == MipReplacement::Once);

                    let mut current: Option<Image> = None;
                    if custom.is_none() || restore {
                        let resized = match &prev {
                            Some(image) => image.resize(mip_width, mip_height, filter)?,
                            None => self.images[(mip - 1) as usize][d as usize][f as usize]
                                .as_ref()
                                .expect("previous level present")
                                .resize(mip_width, mip_height, filter)?,
                        };
                        current = Some(resized);
                    }

                    prev = if restore { current.take() } else { None };

                    let stored = match custom {
                        Some(c) => self.prepare_custom(c)?.resize(mip_width, mip_height, filter)?,
                        None => current.take().expect("generated mip"),
                    };
                    self.images[mip as usize][d as usize][f as usize] = Some(stored);
                }
            }
        }
        Ok(())
    }

    fn generate_mipmaps_3d(
        &mut self,
        filter: ResizeFilter,
        custom_mips: &CustomMipImages,
    ) -> Result<(), Error> {
        let mut input_images: Vec<Image> = Vec::new();
        for mip in 1..self.mip_levels {
            let mip_width = self.width(mip);
            let mip_height = self.height(mip);
            let mip_depth = self.depth(mip);

            // A custom level must cover all depths with one replacement policy.
            let mut is_custom = false;
            let mut replacement = MipReplacement::Once;
            for d in 0..mip_depth {
                match custom_mips.get(&ImageIndex::at(mip, d)) {
                    None => {
                        if is_custom {
                            return Err(Error::InvalidInput(format!(
                                "missing custom mip for depth {d} in level {mip}"
                            )));
                        }
                    }
                    Some(c) => {
                        if d == 0 {
                            is_custom = true;
                            replacement = c.replacement;
                        } else if !is_custom || replacement != c.replacement {
                            return Err(Error::InvalidInput(format!(
                                "inconsistent custom mip policy in level {mip}"
                            )));
                        }
                    }
                }
            }

            let restore = is_custom
                && replacement == MipReplacement::Once
                && mip < self.mip_levels - 1;

            let mut generated: Vec<Image> = Vec::new();
            if !is_custom || restore {
                if input_images.is_empty() {
                    let prev_depth = self.images[(mip - 1) as usize].len();
                    input_images.reserve(prev_depth);
                    for d in 0..prev_depth {
                        let image = self.images[(mip - 1) as usize][d][0]
                            .as_ref()
                            .ok_or_else(|| {
                                Error::InvalidInput("previous mip level incomplete".into())
                            })?;
                        input_images.push(image.resize(mip_width, mip_height, filter)?);
                    }
                } else {
                    for image in input_images.iter_mut() {
                        *image = image.resize(mip_width, mip_height, filter)?;
                    }
                }

                generated = generate_mips_3d(
                    &input_images,
                    mip_width,
                    mip_height,
                    mip_depth,
                    self.color_space,
                    filter,
                )?;
            }

            if restore {
                // Keep the non-overridden stack so the next level can resume from it.
                input_images = std::mem::take(&mut generated);
            } else {
                input_images.clear();
            }

            let result: Vec<Image> = if is_custom {
                let mut images = Vec::with_capacity(mip_depth as usize);
                for d in 0..mip_depth {
                    let custom = custom_mips.get(&ImageIndex::at(mip, d)).expect("validated");
                    images.push(
                        self.prepare_custom(custom)?.resize(mip_width, mip_height, filter)?,
                    );
                }
                images
            } else {
                generated
            };

            self.images[mip as usize] =
                result.into_iter().map(|image| vec![Some(image)]).collect();
        }
        Ok(())
    }

    /// Converts the image pyramid to `format`/`ty`. `threads` of 0 or 1 runs serially;
    /// [`ALL_CORES`] uses the hardware concurrency.
    pub fn convert(
        &mut self,
        format: Format,
        ty: Type,
        quality: Quality,
        alpha: Alpha,
        color_mask: ColorMask,
        threads: u32,
    ) -> Result<(), Error> {
        if !self.images_complete() {
            return Err(Error::InvalidInput("image pyramid is incomplete".into()));
        }
        if !is_format_valid(format, ty) {
            return Err(Error::UnsupportedFormat);
        }
        if self.color_space == ColorSpace::Srgb && !has_native_srgb(format, ty) {
            return Err(Error::UnsupportedFormat);
        }

        self.format = format;
        self.ty = ty;
        self.alpha = alpha;
        self.color_mask = color_mask;

        let threads = if threads == ALL_CORES {
            std::thread::available_parallelism().map(|n| n.get() as u32).unwrap_or(1)
        } else {
            threads
        };

        let settings = EncodeSettings {
            format,
            ty,
            quality,
            alpha,
            mask: color_mask,
            color_space: self.color_space,
        };
        match convert_images(&mut self.images, &settings, threads) {
            Ok(textures) => {
                self.textures = textures;
                Ok(())
            }
            Err(e) => {
                self.format = Format::Unknown;
                self.textures.clear();
                Err(e)
            }
        }
    }

    pub fn converted(&self) -> bool {
        !self.textures.is_empty()
    }

    pub fn data(&self, face: CubeFace, mip_level: u32, depth: u32) -> Option<&[u8]> {
        if !self.converted() || !self.slot_ok(face, mip_level, depth) {
            return None;
        }
        Some(&self.textures[mip_level as usize][depth as usize][face.index()])
    }

    pub fn data_size(&self, face: CubeFace, mip_level: u32, depth: u32) -> usize {
        self.data(face, mip_level, depth).map_or(0, |d| d.len())
    }

    /// Saves the converted texture, deducing the container from the path when `file_type`
    /// is [`FileType::Auto`]. The output file is only created once the texture is known to
    /// be representable.
    pub fn save(&self, file_name: &str, file_type: FileType) -> Result<(), SaveError> {
        if !self.converted() {
            return Err(SaveError::Invalid);
        }

        let file_type = if file_type == FileType::Auto {
            FileType::from_file_name(file_name)
        } else {
            file_type
        };

        let representable = match file_type {
            FileType::Dds => save::dds::is_valid_for_dds(self.format, self.ty),
            FileType::Ktx => save::ktx::is_valid_for_ktx(self.format, self.ty),
            FileType::Pvr => save::pvr::is_valid_for_pvr(self.format, self.ty),
            FileType::Auto => return Err(SaveError::UnknownFormat),
        };
        if !representable {
            return Err(SaveError::Unsupported);
        }

        let file = File::create(file_name)?;
        let mut writer = BufWriter::new(file);
        self.save_to_writer(&mut writer, file_type)?;
        writer.flush()?;
        Ok(())
    }

    /// Saves into a stream with an explicit container format.
    pub fn save_to_writer(
        &self,
        writer: &mut dyn Write,
        file_type: FileType,
    ) -> Result<(), SaveError> {
        if !self.converted() {
            return Err(SaveError::Invalid);
        }
        match file_type {
            FileType::Dds => save::dds::save_dds(self, writer),
            FileType::Ktx => save::ktx::save_ktx(self, writer),
            FileType::Pvr => save::pvr::save_pvr(self, writer),
            FileType::Auto => Err(SaveError::UnknownFormat),
        }
    }

    /// Saves into a byte buffer with an explicit container format.
    pub fn save_to_vec(&self, out: &mut Vec<u8>, file_type: FileType) -> Result<(), SaveError> {
        let mut cursor = Cursor::new(Vec::new());
        self.save_to_writer(&mut cursor, file_type)?;
        *out = cursor.into_inner();
        Ok(())
    }
}

/// Whether `(format, ty)` is encodable at all and representable in the given container.
pub fn is_format_valid_for_file(format: Format, ty: Type, file_type: FileType) -> bool {
    if !is_format_valid(format, ty) {
        return false;
    }
    match file_type {
        FileType::Dds => save::dds::is_valid_for_dds(format, ty),
        FileType::Ktx => save::ktx::is_valid_for_ktx(format, ty),
        FileType::Pvr => save::pvr::is_valid_for_pvr(format, ty),
        FileType::Auto => false,
    }
}

/// Remaps image values for integer storage types: normalized sources stretch to [-1, 1]
/// for SNorm, or scale to the integer range of the original layout for UInt/Int.
pub fn adjust_image_value_range(
    image: &mut Image,
    ty: Type,
    orig_format: PixelFormat,
) -> Result<(), Error> {
    if !matches!(ty, Type::SNorm | Type::UInt | Type::Int) {
        return Ok(());
    }

    let normalized_source = matches!(
        orig_format,
        PixelFormat::Gray8
            | PixelFormat::Gray16
            | PixelFormat::RGB5
            | PixelFormat::RGB565
            | PixelFormat::RGB8
            | PixelFormat::RGB16
            | PixelFormat::RGBA8
            | PixelFormat::RGBA16
    );
    if !normalized_source {
        return Ok(());
    }

    let channel_count;
    match image.format() {
        PixelFormat::Gray8 | PixelFormat::Gray16 | PixelFormat::Double => {
            channel_count = 1;
            *image = image.convert(PixelFormat::Float, false)?;
        }
        PixelFormat::RGB5
        | PixelFormat::RGB565
        | PixelFormat::RGB8
        | PixelFormat::RGB16
        | PixelFormat::Complex => {
            channel_count = 3;
            *image = image.convert(PixelFormat::RGBF, false)?;
        }
        PixelFormat::RGBF => channel_count = 3,
        PixelFormat::RGBA8 | PixelFormat::RGBA16 => {
            channel_count = 4;
            *image = image.convert(PixelFormat::RGBAF, false)?;
        }
        PixelFormat::RGBAF => channel_count = 4,
        PixelFormat::Float => channel_count = 1,
        _ => return Ok(()),
    }

    let mut multiply = [0.0f32; 4];
    let mut offset = [0.0f32; 4];
    if ty == Type::SNorm {
        // Remap [0, 1] to [-1, 1].
        for y in 0..image.height() {
            let row = image.scanline_mut(y);
            for v in row.chunks_exact_mut(4) {
                let mut bytes = [0u8; 4];
                bytes.copy_from_slice(v);
                let value = f32::from_ne_bytes(bytes) * 2.0 - 1.0;
                v.copy_from_slice(&value.to_ne_bytes());
            }
        }
        return Ok(());
    }

    match orig_format {
        PixelFormat::Gray8 | PixelFormat::RGB8 | PixelFormat::RGBA8 => {
            for c in 0..4 {
                multiply[c] = u8::MAX as f32;
                if ty == Type::Int {
                    offset[c] = i8::MIN as f32;
                }
            }
        }
        PixelFormat::Gray16 | PixelFormat::RGB16 | PixelFormat::RGBA16 => {
            for c in 0..4 {
                multiply[c] = u16::MAX as f32;
                if ty == Type::Int {
                    offset[c] = i16::MIN as f32;
                }
            }
        }
        PixelFormat::RGB5 => {
            multiply[0] = 31.0;
            multiply[1] = 31.0;
            multiply[2] = 31.0;
            if ty == Type::Int {
                offset[0] = -16.0;
                offset[1] = -16.0;
                offset[2] = -16.0;
            }
        }
        PixelFormat::RGB565 => {
            multiply[0] = 31.0;
            multiply[1] = 63.0;
            multiply[2] = 31.0;
            if ty == Type::Int {
                offset[0] = -16.0;
                offset[1] = -32.0;
                offset[2] = -16.0;
            }
        }
        _ => return Ok(()),
    }

    let width = image.width() as usize;
    for y in 0..image.height() {
        let row = image.scanline_mut(y);
        for x in 0..width {
            for c in 0..channel_count {
                let index = (x * channel_count + c) * 4;
                let mut bytes = [0u8; 4];
                bytes.copy_from_slice(&row[index..index + 4]);
                let value = (f32::from_ne_bytes(bytes) * multiply[c] + offset[c]).round();
                row[index..index + 4].copy_from_slice(&value.to_ne_bytes());
            }
        }
    }
    Ok(())
}

/// Reduces a stack of half-resolution slices along Z with a 1-D Box or Linear kernel in
/// linear light. Any filter other than Box takes the triangle path.
fn generate_mips_3d(
    prev_level: &[Image],
    width: u32,
    height: u32,
    depth: u32,
    color_space: ColorSpace,
    filter: ResizeFilter,
) -> Result<Vec<Image>, Error> {
    let mut out = Vec::with_capacity(depth as usize);
    let inv_scale = prev_level.len() as f64 / depth as f64;
    let offset = inv_scale.max(1.0);
    let filter_scale = 1.0 / offset;
    let srgb = color_space == ColorSpace::Srgb;

    for d in 0..depth {
        let mut image = Image::new(PixelFormat::RGBAF, width, height, color_space)?;
        let center = (d as f64 + 0.5) * inv_scale;
        let start = ((center - offset + 0.5) as i64).max(0) as usize;
        let end = ((center + offset + 0.5) as usize).min(prev_level.len());

        for y in 0..height {
            for x in 0..width as usize {
                let mut accum = [0.0f64; 4];
                let mut total = 0.0f64;
                for (i, slice) in prev_level.iter().enumerate().take(end).skip(start) {
                    let scale = if filter == ResizeFilter::Box {
                        if ((i as f64 + 0.5 - center) * filter_scale).abs() > 0.5 {
                            continue;
                        }
                        1.0
                    } else {
                        let scale =
                            (1.0 - ((i as f64 + 0.5 - center) * filter_scale).abs()).max(0.0);
                        if scale == 0.0 {
                            continue;
                        }
                        scale
                    };

                    let src = slice.rgbaf_scanline(y)[x];
                    let (r, g, b) = if srgb {
                        (
                            srgb_to_linear(src.r as f64),
                            srgb_to_linear(src.g as f64),
                            srgb_to_linear(src.b as f64),
                        )
                    } else {
                        (src.r as f64, src.g as f64, src.b as f64)
                    };
                    accum[0] += r * scale;
                    accum[1] += g * scale;
                    accum[2] += b * scale;
                    accum[3] += src.a as f64 * scale;
                    total += scale;
                }

                let mut r = accum[0] / total;
                let mut g = accum[1] / total;
                let mut b = accum[2] / total;
                let a = accum[3] / total;
                if srgb {
                    r = linear_to_srgb(r);
                    g = linear_to_srgb(g);
                    b = linear_to_srgb(b);
                }
                let dst = &mut image.rgbaf_scanline_mut(y)[x];
                dst.r = r as f32;
                dst.g = g as f32;
                dst.b = b as f32;
                dst.a = a as f32;
            }
        }
        out.push(image);
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::color::ColorRgbaD;

    fn solid_image(width: u32, height: u32, color: ColorRgbaD) -> Image {
        let mut image = Image::new(PixelFormat::RGBAF, width, height, ColorSpace::Linear).unwrap();
        for y in 0..height {
            for x in 0..width {
                image.set_pixel(x, y, &color, false).unwrap();
            }
        }
        image
    }

    const RED: ColorRgbaD = ColorRgbaD { r: 1.0, g: 0.0, b: 0.0, a: 1.0 };
    const GREEN: ColorRgbaD = ColorRgbaD { r: 0.0, g: 1.0, b: 0.0, a: 1.0 };
    const BLUE: ColorRgbaD = ColorRgbaD { r: 0.0, g: 0.0, b: 1.0, a: 1.0 };

    fn classify(color: ColorRgbaD) -> &'static str {
        if color.r > 0.5 {
            "red"
        } else if color.g > 0.5 {
            "green"
        } else {
            "blue"
        }
    }

    #[test]
    fn mip_chain_dimensions() {
        let mut texture = Texture::new(
            Dimension::Dim2D,
            15,
            10,
            0,
            ALL_MIP_LEVELS,
            ColorSpace::Linear,
        )
        .unwrap();
        texture
            .set_image(solid_image(15, 10, RED), CubeFace::PosX, 0, 0)
            .unwrap();
        texture
            .generate_mipmaps(ResizeFilter::default(), ALL_MIP_LEVELS, &CustomMipImages::default())
            .unwrap();

        assert_eq!(texture.mip_level_count(), 4);
        assert_eq!((texture.width(1), texture.height(1)), (7, 5));
        assert_eq!((texture.width(2), texture.height(2)), (3, 2));
        assert_eq!((texture.width(3), texture.height(3)), (1, 1));
    }

    #[test]
    fn custom_mips_once_and_continue() {
        let mut texture =
            Texture::new(Dimension::Dim2D, 32, 32, 0, ALL_MIP_LEVELS, ColorSpace::Linear).unwrap();
        texture
            .set_image(solid_image(32, 32, RED), CubeFace::PosX, 0, 0)
            .unwrap();

        let mut custom = CustomMipImages::default();
        custom.insert(
            ImageIndex::at(1, 0),
            CustomMipImage::new(solid_image(16, 16, GREEN), MipReplacement::Continue),
        );
        custom.insert(
            ImageIndex::at(2, 0),
            CustomMipImage::new(solid_image(8, 8, BLUE), MipReplacement::Once),
        );
        custom.insert(
            ImageIndex::at(3, 0),
            CustomMipImage::new(solid_image(4, 4, RED), MipReplacement::Once),
        );

        texture
            .generate_mipmaps(ResizeFilter::default(), ALL_MIP_LEVELS, &custom)
            .unwrap();

        assert_eq!(texture.mip_level_count(), 6);
        let expected = ["green", "blue", "red", "green", "green"];
        for (mip, &want) in (1..6).zip(expected.iter()) {
            let image = texture.get_image(CubeFace::PosX, mip, 0).unwrap();
            let color = image.get_pixel(0, 0).unwrap();
            assert_eq!(classify(color), want, "level {mip}");
        }
    }

    #[test]
    fn custom_mips_3d_match_2d_per_slice() {
        let mut texture =
            Texture::new(Dimension::Dim3D, 32, 32, 32, ALL_MIP_LEVELS, ColorSpace::Linear).unwrap();
        for d in 0..32 {
            texture
                .set_image(solid_image(32, 32, RED), CubeFace::PosX, 0, d)
                .unwrap();
        }

        let mut custom = CustomMipImages::default();
        for d in 0..16 {
            custom.insert(
                ImageIndex::at(1, d),
                CustomMipImage::new(solid_image(16, 16, GREEN), MipReplacement::Continue),
            );
        }
        for d in 0..8 {
            custom.insert(
                ImageIndex::at(2, d),
                CustomMipImage::new(solid_image(8, 8, BLUE), MipReplacement::Once),
            );
        }
        for d in 0..4 {
            custom.insert(
                ImageIndex::at(3, d),
                CustomMipImage::new(solid_image(4, 4, RED), MipReplacement::Once),
            );
        }

        texture
            .generate_mipmaps(ResizeFilter::default(), ALL_MIP_LEVELS, &custom)
            .unwrap();

        let expected = ["green", "blue", "red", "green", "green"];
        for (mip, &want) in (1..6).zip(expected.iter()) {
            for d in 0..texture.depth(mip) {
                let image = texture.get_image(CubeFace::PosX, mip, d).unwrap();
                let color = image.get_pixel(0, 0).unwrap();
                assert_eq!(classify(color), want, "level {mip} depth {d}");
            }
        }
    }

    #[test]
    fn inconsistent_3d_custom_mips_fail() {
        let mut texture =
            Texture::new(Dimension::Dim3D, 8, 8, 8, ALL_MIP_LEVELS, ColorSpace::Linear).unwrap();
        for d in 0..8 {
            texture
                .set_image(solid_image(8, 8, RED), CubeFace::PosX, 0, d)
                .unwrap();
        }

        // Only one of the four depths of level 1 is overridden.
        let mut custom = CustomMipImages::default();
        custom.insert(
            ImageIndex::at(1, 0),
            CustomMipImage::new(solid_image(4, 4, GREEN), MipReplacement::Continue),
        );
        assert!(texture
            .generate_mipmaps(ResizeFilter::default(), ALL_MIP_LEVELS, &custom)
            .is_err());
    }

    #[test]
    fn set_image_validates_dimensions() {
        let mut texture =
            Texture::new(Dimension::Dim2D, 8, 8, 0, 1, ColorSpace::Linear).unwrap();
        assert!(texture
            .set_image(solid_image(4, 4, RED), CubeFace::PosX, 0, 0)
            .is_err());
        assert!(texture
            .set_image(solid_image(8, 8, RED), CubeFace::NegY, 0, 0)
            .is_err());
        assert!(texture
            .set_image(solid_image(8, 8, RED), CubeFace::PosX, 0, 0)
            .is_ok());
    }

    #[test]
    fn bc1_payload_size() {
        let mut texture =
            Texture::new(Dimension::Dim2D, 16, 16, 0, 1, ColorSpace::Linear).unwrap();
        texture
            .set_image(solid_image(16, 16, RED), CubeFace::PosX, 0, 0)
            .unwrap();
        texture
            .convert(
                Format::BC1_RGB,
                Type::UNorm,
                Quality::Normal,
                Alpha::Standard,
                ColorMask::default(),
                1,
            )
            .unwrap();
        assert_eq!(texture.data_size(CubeFace::PosX, 0, 0), (16 / 4) * (16 / 4) * 8);
    }

    #[test]
    fn convert_rejects_srgb_without_native_support() {
        let mut texture =
            Texture::new(Dimension::Dim2D, 4, 4, 0, 1, ColorSpace::Srgb).unwrap();
        texture
            .set_image(solid_image(4, 4, RED), CubeFace::PosX, 0, 0)
            .unwrap();
        assert!(matches!(
            texture.convert(
                Format::R16,
                Type::UNorm,
                Quality::Normal,
                Alpha::Standard,
                ColorMask::default(),
                1,
            ),
            Err(Error::UnsupportedFormat)
        ));
        assert_eq!(texture.format(), Format::Unknown);
        assert!(!texture.converted());
    }

    #[test]
    fn convert_failure_rolls_back_format() {
        let mut texture =
            Texture::new(Dimension::Dim2D, 4, 4, 0, 1, ColorSpace::Linear).unwrap();
        // Missing image.
        assert!(texture
            .convert(
                Format::R8,
                Type::UNorm,
                Quality::Normal,
                Alpha::Standard,
                ColorMask::default(),
                1,
            )
            .is_err());
        assert_eq!(texture.format(), Format::Unknown);
    }

    #[test]
    fn container_support_matrix() {
        assert!(is_format_valid_for_file(Format::BC1_RGB, Type::UNorm, FileType::Dds));
        assert!(is_format_valid_for_file(Format::BC1_RGB, Type::UNorm, FileType::Ktx));
        assert!(is_format_valid_for_file(Format::BC1_RGB, Type::UNorm, FileType::Pvr));
        assert!(is_format_valid_for_file(Format::R4G4, Type::UNorm, FileType::Dds));
        assert!(!is_format_valid_for_file(Format::R4G4, Type::UNorm, FileType::Ktx));
        assert!(is_format_valid_for_file(Format::R4G4, Type::UNorm, FileType::Pvr));
        assert!(!is_format_valid_for_file(Format::ETC1, Type::UNorm, FileType::Dds));
        assert!(!is_format_valid_for_file(Format::BC1_RGB, Type::SNorm, FileType::Dds));
    }

    #[test]
    fn snorm_value_range_adjustment() {
        let mut image = solid_image(2, 2, ColorRgbaD::new(1.0, 0.5, 0.0, 1.0));
        adjust_image_value_range(&mut image, Type::SNorm, PixelFormat::RGBA8).unwrap();
        let color = image.get_pixel(0, 0).unwrap();
        assert!((color.r - 1.0).abs() < 1e-6);
        assert!(color.g.abs() < 1e-6);
        assert!((color.b + 1.0).abs() < 1e-6);
    }

    #[test]
    fn uint_value_range_adjustment() {
        let mut image = solid_image(2, 2, ColorRgbaD::new(1.0, 0.0, 0.5, 1.0));
        adjust_image_value_range(&mut image, Type::UInt, PixelFormat::RGBA8).unwrap();
        let color = image.get_pixel(0, 0).unwrap();
        assert_eq!(color.r, 255.0);
        assert_eq!(color.g, 0.0);
        assert_eq!(color.b, 128.0);
    }
}
