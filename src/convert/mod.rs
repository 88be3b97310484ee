//! Conversion dispatcher and the parallel block engine.
//!
//! A [`Converter`] encodes one (mip, depth, face) image into the storage format's byte
//! layout. [`create_converter`] is the dispatch table keyed by (format, type); the engine
//! below partitions each image into block jobs and drains them with a pool of worker
//! threads sharing an atomic job cursor.

use crate::color::ColorRgbaF;
use crate::error::Error;
use crate::image::Image;
use crate::texture::info::{Alpha, ColorMask, Format, Quality, Type};
use crate::ColorSpace;
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};

mod astc;
mod bptc;
mod etc;
mod pvrtc;
mod s3tc;
mod standard;

/// Per-thread encoder state. Codecs with expensive contexts allocate them once per worker.
pub(crate) trait ThreadData: Send {
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl ThreadData for () {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Destination payload of one (mip, depth, face) slot. Blocks land at disjoint offsets, so
/// workers write without synchronization.
pub(crate) struct OutputSlots {
    ptr: *mut u8,
    len: usize,
}

// SAFETY: concurrent access is sound because every block job writes a distinct byte range;
// the atomic cursor only decides who processes a job, not where its output lands.
unsafe impl Sync for OutputSlots {}
unsafe impl Send for OutputSlots {}

impl OutputSlots {
    fn new(payload: &mut [u8]) -> Self {
        Self { ptr: payload.as_mut_ptr(), len: payload.len() }
    }

    pub(crate) fn write(&self, offset: usize, bytes: &[u8]) {
        assert!(offset + bytes.len() <= self.len);
        // SAFETY: bounds checked above; ranges of distinct blocks never overlap.
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), self.ptr.add(offset), bytes.len());
        }
    }
}

/// One per-slot encoder. `process` reads the source image's RGBAF scanlines and writes the
/// encoded bytes of block (x, y); source pixels outside the image clamp to the edge.
pub(crate) trait Converter: Sync {
    fn jobs_x(&self) -> u32;
    fn jobs_y(&self) -> u32;
    fn data_size(&self) -> usize;
    fn create_thread_data(&self) -> Result<Box<dyn ThreadData>, Error> {
        Ok(Box::new(()))
    }
    fn process(&self, x: u32, y: u32, thread_data: &mut dyn ThreadData, out: &OutputSlots);
}

/// Everything an encoder needs to know about the conversion besides the image itself.
#[derive(Copy, Clone)]
pub(crate) struct EncodeSettings {
    pub format: Format,
    pub ty: Type,
    pub quality: Quality,
    pub alpha: Alpha,
    pub mask: ColorMask,
    pub color_space: ColorSpace,
}

/// Samples the 4×4 (or larger) pixel neighborhood of block (x, y) with edge clamping.
pub(crate) fn sample_block(
    image: &Image,
    x: u32,
    y: u32,
    block_width: u32,
    block_height: u32,
    out: &mut [ColorRgbaF],
) {
    let width = image.width();
    let height = image.height();
    for j in 0..block_height {
        let scanline = image.rgbaf_scanline((y * block_height + j).min(height - 1));
        for i in 0..block_width {
            out[(j * block_width + i) as usize] =
                scanline[(x * block_width + i).min(width - 1) as usize];
        }
    }
}

/// Builds the encoder for `(format, type)`, or `None` when the pair has no encoder.
fn create_converter<'a>(
    image: &'a Image,
    settings: &EncodeSettings,
) -> Option<Box<dyn Converter + 'a>> {
    use standard::*;
    use Format::*;
    use Type::*;

    match settings.format {
        R4G4 => match settings.ty {
            UNorm => Some(Box::new(R4G4Converter::new(image))),
            _ => None,
        },
        R4G4B4A4 => match settings.ty {
            UNorm => Some(Box::new(R4G4B4A4Converter::new(image))),
            _ => None,
        },
        B4G4R4A4 => match settings.ty {
            UNorm => Some(Box::new(B4G4R4A4Converter::new(image))),
            _ => None,
        },
        A4R4G4B4 => match settings.ty {
            UNorm => Some(Box::new(A4R4G4B4Converter::new(image))),
            _ => None,
        },
        R5G6B5 => match settings.ty {
            UNorm => Some(Box::new(R5G6B5Converter::new(image))),
            _ => None,
        },
        B5G6R5 => match settings.ty {
            UNorm => Some(Box::new(B5G6R5Converter::new(image))),
            _ => None,
        },
        R5G5B5A1 => match settings.ty {
            UNorm => Some(Box::new(R5G5B5A1Converter::new(image))),
            _ => None,
        },
        B5G5R5A1 => match settings.ty {
            UNorm => Some(Box::new(B5G5R5A1Converter::new(image))),
            _ => None,
        },
        A1R5G5B5 => match settings.ty {
            UNorm => Some(Box::new(A1R5G5B5Converter::new(image))),
            _ => None,
        },
        R8 => match settings.ty {
            UNorm => Some(Box::new(UNormConverter::<u8, 1>::new(image))),
            SNorm => Some(Box::new(SNormConverter::<i8, 1>::new(image))),
            UInt => Some(Box::new(IntConverter::<u8, 1>::new(image))),
            Int => Some(Box::new(IntConverter::<i8, 1>::new(image))),
            _ => None,
        },
        R8G8 => match settings.ty {
            UNorm => Some(Box::new(UNormConverter::<u8, 2>::new(image))),
            SNorm => Some(Box::new(SNormConverter::<i8, 2>::new(image))),
            UInt => Some(Box::new(IntConverter::<u8, 2>::new(image))),
            Int => Some(Box::new(IntConverter::<i8, 2>::new(image))),
            _ => None,
        },
        R8G8B8 => match settings.ty {
            UNorm => Some(Box::new(UNormConverter::<u8, 3>::new(image))),
            SNorm => Some(Box::new(SNormConverter::<i8, 3>::new(image))),
            UInt => Some(Box::new(IntConverter::<u8, 3>::new(image))),
            Int => Some(Box::new(IntConverter::<i8, 3>::new(image))),
            _ => None,
        },
        B8G8R8 => match settings.ty {
            UNorm => Some(Box::new(B8G8R8Converter::new(image))),
            _ => None,
        },
        R8G8B8A8 => match settings.ty {
            UNorm => Some(Box::new(UNormConverter::<u8, 4>::new(image))),
            SNorm => Some(Box::new(SNormConverter::<i8, 4>::new(image))),
            UInt => Some(Box::new(IntConverter::<u8, 4>::new(image))),
            Int => Some(Box::new(IntConverter::<i8, 4>::new(image))),
            _ => None,
        },
        B8G8R8A8 => match settings.ty {
            UNorm => Some(Box::new(B8G8R8A8Converter::new(image))),
            _ => None,
        },
        A8B8G8R8 => match settings.ty {
            UNorm => Some(Box::new(A8B8G8R8Converter::new(image))),
            _ => None,
        },
        A2R10G10B10 => match settings.ty {
            UNorm => Some(Box::new(A2R10G10B10UNormConverter::new(image))),
            UInt => Some(Box::new(A2R10G10B10UIntConverter::new(image))),
            _ => None,
        },
        A2B10G10R10 => match settings.ty {
            UNorm => Some(Box::new(A2B10G10R10UNormConverter::new(image))),
            UInt => Some(Box::new(A2B10G10R10UIntConverter::new(image))),
            _ => None,
        },
        R16 => match settings.ty {
            UNorm => Some(Box::new(UNormConverter::<u16, 1>::new(image))),
            SNorm => Some(Box::new(SNormConverter::<i16, 1>::new(image))),
            UInt => Some(Box::new(IntConverter::<u16, 1>::new(image))),
            Int => Some(Box::new(IntConverter::<i16, 1>::new(image))),
            Float => Some(Box::new(HalfFloatConverter::<1>::new(image))),
            _ => None,
        },
        R16G16 => match settings.ty {
            UNorm => Some(Box::new(UNormConverter::<u16, 2>::new(image))),
            SNorm => Some(Box::new(SNormConverter::<i16, 2>::new(image))),
            UInt => Some(Box::new(IntConverter::<u16, 2>::new(image))),
            Int => Some(Box::new(IntConverter::<i16, 2>::new(image))),
            Float => Some(Box::new(HalfFloatConverter::<2>::new(image))),
            _ => None,
        },
        R16G16B16 => match settings.ty {
            UNorm => Some(Box::new(UNormConverter::<u16, 3>::new(image))),
            SNorm => Some(Box::new(SNormConverter::<i16, 3>::new(image))),
            UInt => Some(Box::new(IntConverter::<u16, 3>::new(image))),
            Int => Some(Box::new(IntConverter::<i16, 3>::new(image))),
            Float => Some(Box::new(HalfFloatConverter::<3>::new(image))),
            _ => None,
        },
        R16G16B16A16 => match settings.ty {
            UNorm => Some(Box::new(UNormConverter::<u16, 4>::new(image))),
            SNorm => Some(Box::new(SNormConverter::<i16, 4>::new(image))),
            UInt => Some(Box::new(IntConverter::<u16, 4>::new(image))),
            Int => Some(Box::new(IntConverter::<i16, 4>::new(image))),
            Float => Some(Box::new(HalfFloatConverter::<4>::new(image))),
            _ => None,
        },
        R32 => match settings.ty {
            UInt => Some(Box::new(IntConverter::<u32, 1>::new(image))),
            Int => Some(Box::new(IntConverter::<i32, 1>::new(image))),
            Float => Some(Box::new(FloatConverter::<1>::new(image))),
            _ => None,
        },
        R32G32 => match settings.ty {
            UInt => Some(Box::new(IntConverter::<u32, 2>::new(image))),
            Int => Some(Box::new(IntConverter::<i32, 2>::new(image))),
            Float => Some(Box::new(FloatConverter::<2>::new(image))),
            _ => None,
        },
        R32G32B32 => match settings.ty {
            UInt => Some(Box::new(IntConverter::<u32, 3>::new(image))),
            Int => Some(Box::new(IntConverter::<i32, 3>::new(image))),
            Float => Some(Box::new(FloatConverter::<3>::new(image))),
            _ => None,
        },
        R32G32B32A32 => match settings.ty {
            UInt => Some(Box::new(IntConverter::<u32, 4>::new(image))),
            Int => Some(Box::new(IntConverter::<i32, 4>::new(image))),
            Float => Some(Box::new(FloatConverter::<4>::new(image))),
            _ => None,
        },
        B10G11R11_UFloat => match settings.ty {
            UFloat => Some(Box::new(B10G11R11UFloatConverter::new(image))),
            _ => None,
        },
        E5B9G9R9_UFloat => match settings.ty {
            UFloat => Some(Box::new(E5B9G9R9UFloatConverter::new(image))),
            _ => None,
        },
        BC1_RGB | BC1_RGBA | BC2 | BC3 | BC4 | BC5 => {
            s3tc::create_converter(image, settings)
        }
        BC6H | BC7 => bptc::create_converter(image, settings),
        ETC1 | ETC2_R8G8B8 | ETC2_R8G8B8A1 | ETC2_R8G8B8A8 | EAC_R11 | EAC_R11G11 => {
            etc::create_converter(image, settings)
        }
        ASTC_4x4 | ASTC_5x4 | ASTC_5x5 | ASTC_6x5 | ASTC_6x6 | ASTC_8x5 | ASTC_8x6 | ASTC_8x8
        | ASTC_10x5 | ASTC_10x6 | ASTC_10x8 | ASTC_10x10 | ASTC_12x10 | ASTC_12x12 => {
            astc::create_converter(image, settings)
        }
        PVRTC1_RGB_2BPP | PVRTC1_RGBA_2BPP | PVRTC1_RGB_4BPP | PVRTC1_RGBA_4BPP
        | PVRTC2_RGBA_2BPP | PVRTC2_RGBA_4BPP => pvrtc::create_converter(image, settings),
        Unknown => None,
    }
}

/// Encoded payloads indexed `[mip][depth][face]`.
pub(crate) type MipTextureList = Vec<Vec<Vec<Vec<u8>>>>;

/// Encodes every slot of the image pyramid. Fails only when the very first slot has no
/// encoder for the requested (format, type) or an encoder cannot set up its thread state;
/// the caller clears any partial output on failure.
pub(crate) fn convert_images(
    images: &mut [Vec<Vec<Option<Image>>>],
    settings: &EncodeSettings,
    thread_count: u32,
) -> Result<MipTextureList, Error> {
    let mut texture_data: MipTextureList = Vec::with_capacity(images.len());

    for mip in 0..images.len() {
        let mut depth_data = Vec::with_capacity(images[mip].len());
        for d in 0..images[mip].len() {
            let mut face_data = Vec::with_capacity(images[mip][d].len());
            for f in 0..images[mip][d].len() {
                let image = images[mip][d][f]
                    .take()
                    .ok_or_else(|| Error::InvalidInput("missing image in pyramid".into()))?;
                let payload = convert_one(&image, settings, thread_count).map_err(|e| {
                    debug_assert!(mip == 0 && d == 0 && f == 0);
                    e
                })?;
                // The source image drops here, freeing memory before the next slot runs.
                drop(image);
                face_data.push(payload);
            }
            depth_data.push(face_data);
        }
        texture_data.push(depth_data);
    }

    Ok(texture_data)
}

fn convert_one(
    image: &Image,
    settings: &EncodeSettings,
    thread_count: u32,
) -> Result<Vec<u8>, Error> {
    let converter = create_converter(image, settings).ok_or(Error::UnsupportedFormat)?;

    let jobs_x = converter.jobs_x();
    let jobs_y = converter.jobs_y();
    let mut jobs = Vec::with_capacity((jobs_x * jobs_y) as usize);
    for y in 0..jobs_y {
        for x in 0..jobs_x {
            jobs.push((x, y));
        }
    }

    let mut payload = vec![0u8; converter.data_size()];
    let cur_threads = (jobs.len() as u32).min(thread_count);

    if cur_threads <= 1 {
        let mut thread_data = converter.create_thread_data()?;
        let out = OutputSlots::new(&mut payload);
        for &(x, y) in &jobs {
            converter.process(x, y, thread_data.as_mut(), &out);
        }
    } else {
        // Create all thread states before spawning so any global codec initialization
        // happens serially.
        let mut thread_data = Vec::with_capacity(cur_threads as usize);
        for _ in 0..cur_threads {
            thread_data.push(converter.create_thread_data()?);
        }

        let cursor = AtomicUsize::new(0);
        let out = OutputSlots::new(&mut payload);
        let converter_ref: &dyn Converter = &*converter;
        let jobs_ref = &jobs;
        let cursor_ref = &cursor;
        let out_ref = &out;
        std::thread::scope(|scope| {
            for data in thread_data.iter_mut() {
                scope.spawn(move || loop {
                    let index = cursor_ref.fetch_add(1, Ordering::Relaxed);
                    if index >= jobs_ref.len() {
                        return;
                    }
                    let (x, y) = jobs_ref[index];
                    converter_ref.process(x, y, data.as_mut(), out_ref);
                });
            }
        });
    }

    Ok(payload)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::color::ColorRgbaD;
    use crate::image::PixelFormat;

    fn test_image(width: u32, height: u32) -> Image {
        let mut image = Image::new(PixelFormat::RGBAF, width, height, ColorSpace::Linear).unwrap();
        for y in 0..height {
            for x in 0..width {
                let color = ColorRgbaD::new(
                    (x % 7) as f64 / 6.0,
                    (y % 5) as f64 / 4.0,
                    ((x + y) % 11) as f64 / 10.0,
                    1.0,
                );
                image.set_pixel(x, y, &color, false).unwrap();
            }
        }
        image
    }

    fn settings(format: Format, ty: Type) -> EncodeSettings {
        EncodeSettings {
            format,
            ty,
            quality: Quality::Normal,
            alpha: Alpha::Standard,
            mask: ColorMask::default(),
            color_space: ColorSpace::Linear,
        }
    }

    #[test]
    fn block_partition_covers_image() {
        let image = test_image(18, 10);
        for format in [Format::BC1_RGB, Format::BC3, Format::ETC2_R8G8B8, Format::BC7] {
            let s = settings(format, Type::UNorm);
            let converter = create_converter(&image, &s).unwrap();
            let bw = crate::texture::info::block_width(format);
            let bh = crate::texture::info::block_height(format);
            assert!(converter.jobs_x() * bw >= 18);
            assert!(converter.jobs_y() * bh >= 10);
            assert_eq!(
                converter.data_size(),
                (converter.jobs_x() * converter.jobs_y()
                    * crate::texture::info::block_size(format)) as usize
            );
        }
    }

    #[test]
    fn invalid_pair_has_no_converter() {
        let image = test_image(4, 4);
        assert!(create_converter(&image, &settings(Format::BC1_RGB, Type::Float)).is_none());
        assert!(create_converter(&image, &settings(Format::R8, Type::UFloat)).is_none());
    }

    #[test]
    fn thread_count_does_not_change_output() {
        let image = test_image(32, 32);
        for format in [Format::R8G8B8A8, Format::BC1_RGB, Format::BC3, Format::ETC2_R8G8B8] {
            let s = settings(format, Type::UNorm);
            let serial = convert_one(&image, &s, 1).unwrap();
            let threaded = convert_one(&image, &s, 4).unwrap();
            assert_eq!(serial, threaded, "{format:?} diverged across thread counts");
        }
    }

    #[test]
    fn uncompressed_payload_is_exact() {
        let image = test_image(10, 3);
        let payload = convert_one(&image, &settings(Format::R8G8B8A8, Type::UNorm), 1).unwrap();
        assert_eq!(payload.len(), 10 * 3 * 4);
        // Pixel (0, 0) has r = 0, g = 0, b = 0, a = 1.
        assert_eq!(&payload[..4], &[0, 0, 0, 255]);
    }
}
