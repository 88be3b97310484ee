//! ASTC encoding through the `astcenc` bindings.
//!
//! Context allocation is expensive, so contexts are pooled in a process-wide cache keyed by
//! their configuration. Each worker thread checks a context out for the duration of a slot
//! and returns it on drop; the cache keeps at most `3 × hardware concurrency` entries and
//! evicts the oldest when full.

use super::{sample_block, Converter, EncodeSettings, OutputSlots, ThreadData};
use crate::color::ColorRgbaF;
use crate::error::Error;
use crate::image::Image;
use crate::texture::info::{Alpha, ColorMask, Format, Quality, Type};
use astcenc_rs::{ConfigBuilder, Context, Extents, Preset, Profile, Selector, Swizzle};
use lazy_static::lazy_static;
use std::any::Any;
use std::sync::Mutex;

const BLOCK_SIZE: usize = 16;

/// Cache key describing everything that goes into a context's configuration.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
struct ContextKey {
    block_x: u32,
    block_y: u32,
    profile: u8,
    quality: u8,
}

impl ContextKey {
    fn profile(&self) -> Profile {
        match self.profile {
            0 => Profile::LdrRgba,
            1 => Profile::HdrRgbLdrA,
            _ => Profile::HdrRgba,
        }
    }

    fn preset(&self) -> Preset {
        match self.quality {
            0 => astcenc_rs::PRESET_FASTEST,
            1 => astcenc_rs::PRESET_FAST,
            2 => astcenc_rs::PRESET_MEDIUM,
            3 => astcenc_rs::PRESET_THOROUGH,
            _ => astcenc_rs::PRESET_EXHAUSTIVE,
        }
    }
}

struct ContextCache {
    entries: Vec<(ContextKey, Context)>,
    capacity: usize,
}

impl ContextCache {
    fn checkout(&mut self, key: ContextKey) -> Result<Context, Error> {
        if let Some(position) = self.entries.iter().position(|(k, _)| *k == key) {
            return Ok(self.entries.remove(position).1);
        }

        let config = ConfigBuilder::new()
            .with_profile(key.profile())
            .with_preset(key.preset())
            .with_block_size(Extents::new(key.block_x, key.block_y))
            .build()
            .map_err(|e| Error::Encoder(format!("astc config failed: {e:?}")))?;
        Context::new(config).map_err(|e| Error::Encoder(format!("astc context failed: {e:?}")))
    }

    fn checkin(&mut self, key: ContextKey, context: Context) {
        while self.entries.len() >= self.capacity {
            self.entries.pop();
        }
        self.entries.insert(0, (key, context));
    }
}

lazy_static! {
    static ref CONTEXT_CACHE: Mutex<ContextCache> = Mutex::new(ContextCache {
        entries: Vec::new(),
        capacity: 3 * std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
    });
}

struct AstcThreadData {
    key: ContextKey,
    context: Option<Context>,
}

impl ThreadData for AstcThreadData {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Drop for AstcThreadData {
    fn drop(&mut self) {
        if let Some(context) = self.context.take() {
            if let Ok(mut cache) = CONTEXT_CACHE.lock() {
                cache.checkin(self.key, context);
            }
        }
    }
}

pub(crate) struct AstcConverter<'a> {
    image: &'a Image,
    block_x: u32,
    block_y: u32,
    jobs_x: u32,
    jobs_y: u32,
    key: ContextKey,
    swizzle: Swizzle,
}

pub(crate) fn create_converter<'a>(
    image: &'a Image,
    settings: &EncodeSettings,
) -> Option<Box<dyn Converter + 'a>> {
    if !matches!(settings.ty, Type::UNorm | Type::UFloat) {
        return None;
    }

    let (block_x, block_y) = match settings.format {
        Format::ASTC_4x4 => (4, 4),
        Format::ASTC_5x4 => (5, 4),
        Format::ASTC_5x5 => (5, 5),
        Format::ASTC_6x5 => (6, 5),
        Format::ASTC_6x6 => (6, 6),
        Format::ASTC_8x5 => (8, 5),
        Format::ASTC_8x6 => (8, 6),
        Format::ASTC_8x8 => (8, 8),
        Format::ASTC_10x5 => (10, 5),
        Format::ASTC_10x6 => (10, 6),
        Format::ASTC_10x8 => (10, 8),
        Format::ASTC_10x10 => (10, 10),
        Format::ASTC_12x10 => (12, 10),
        Format::ASTC_12x12 => (12, 12),
        _ => return None,
    };

    // HDR profiles for UFloat; alpha stays LDR unless it carries encoded data.
    let profile = if settings.ty == Type::UFloat {
        if matches!(settings.alpha, Alpha::None | Alpha::PreMultiplied) {
            1 // HdrRgbLdrA
        } else {
            2 // HdrRgba
        }
    } else {
        0 // LdrRgba
    };

    Some(Box::new(AstcConverter {
        image,
        block_x,
        block_y,
        jobs_x: image.width().div_ceil(block_x),
        jobs_y: image.height().div_ceil(block_y),
        key: ContextKey { block_x, block_y, profile, quality: quality_ordinal(settings.quality) },
        swizzle: swizzle_for(settings.mask, settings.alpha),
    }))
}

fn quality_ordinal(quality: Quality) -> u8 {
    quality.level() as u8
}

fn swizzle_for(mask: ColorMask, alpha: Alpha) -> Swizzle {
    Swizzle {
        r: if mask.r { Selector::Red } else { Selector::Zero },
        g: if mask.g { Selector::Green } else { Selector::Zero },
        b: if mask.b { Selector::Blue } else { Selector::Zero },
        a: if mask.a {
            if alpha == Alpha::None {
                Selector::One
            } else {
                Selector::Alpha
            }
        } else {
            Selector::Zero
        },
    }
}

impl Converter for AstcConverter<'_> {
    fn jobs_x(&self) -> u32 {
        self.jobs_x
    }

    fn jobs_y(&self) -> u32 {
        self.jobs_y
    }

    fn data_size(&self) -> usize {
        self.jobs_x as usize * self.jobs_y as usize * BLOCK_SIZE
    }

    fn create_thread_data(&self) -> Result<Box<dyn ThreadData>, Error> {
        let context = CONTEXT_CACHE
            .lock()
            .map_err(|_| Error::Encoder("astc context cache poisoned".into()))?
            .checkout(self.key)?;
        Ok(Box::new(AstcThreadData { key: self.key, context: Some(context) }))
    }

    fn process(&self, x: u32, y: u32, thread_data: &mut dyn ThreadData, out: &OutputSlots) {
        let pixel_count = (self.block_x * self.block_y) as usize;
        let mut pixels = vec![ColorRgbaF::default(); pixel_count];
        sample_block(self.image, x, y, self.block_x, self.block_y, &mut pixels);

        let mut data = Vec::with_capacity(pixel_count * 4);
        for px in &pixels {
            data.extend_from_slice(&[px.r, px.g, px.b, px.a]);
        }

        let image = astcenc_rs::Image::<Vec<f32>> {
            extents: Extents::new(self.block_x, self.block_y),
            data,
        };

        let thread_data = thread_data
            .as_any_mut()
            .downcast_mut::<AstcThreadData>()
            .expect("astc thread data");
        let context = thread_data.context.as_mut().expect("checked-out context");

        match context.compress(&image, self.swizzle) {
            Ok(block) => {
                debug_assert_eq!(block.len(), BLOCK_SIZE);
                out.write((y * self.jobs_x + x) as usize * BLOCK_SIZE, &block);
            }
            Err(e) => {
                // Leave the block zeroed rather than aborting the whole slot.
                log::error!("astc block ({x}, {y}) failed to encode: {e:?}");
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn swizzle_projects_masked_channels() {
        let mask = ColorMask { r: true, g: false, b: true, a: true };
        let swizzle = swizzle_for(mask, Alpha::Standard);
        assert_eq!(swizzle.r, Selector::Red);
        assert_eq!(swizzle.g, Selector::Zero);
        assert_eq!(swizzle.a, Selector::Alpha);

        let swizzle = swizzle_for(ColorMask::default(), Alpha::None);
        assert_eq!(swizzle.a, Selector::One);
    }

    #[test]
    fn context_cache_reuses_contexts() {
        let key = ContextKey { block_x: 4, block_y: 4, profile: 0, quality: 0 };
        let mut cache = ContextCache { entries: Vec::new(), capacity: 2 };
        let context = cache.checkout(key).unwrap();
        cache.checkin(key, context);
        assert_eq!(cache.entries.len(), 1);
        let _context = cache.checkout(key).unwrap();
        assert!(cache.entries.is_empty());
    }
}
