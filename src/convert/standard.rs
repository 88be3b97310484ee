//! Encoders for uncompressed storage formats: plain UNorm/SNorm/Int/Float channel packers,
//! the packed 4/5/6-bit family, BGR orderings, 2/10/10/10 and the packed/shared-exponent
//! float formats.
//!
//! All of these process batches of 32 pixels in a one-dimensional job grid, which keeps
//! write ranges aligned for the multithreaded driver.

use super::{Converter, OutputSlots, ThreadData};
use crate::color::ColorRgbaF;
use crate::image::Image;
use half::f16;
use std::marker::PhantomData;

pub(crate) const BATCH_SIZE: u32 = 32;

fn pixel_jobs(image: &Image) -> u32 {
    (image.width() * image.height()).div_ceil(BATCH_SIZE)
}

/// Iterates the pixels of batch `job`, calling `emit(pixel_index, color)`.
fn for_batch(image: &Image, job: u32, mut emit: impl FnMut(u32, &ColorRgbaF)) {
    let width = image.width();
    let height = image.height();
    let base = job * BATCH_SIZE;
    let mut row = base / width;
    let mut scanline = image.rgbaf_scanline(row);
    for i in 0..BATCH_SIZE {
        let index = base + i;
        let cur_row = index / width;
        if cur_row != row {
            if cur_row >= height {
                break;
            }
            row = cur_row;
            scanline = image.rgbaf_scanline(row);
        }
        emit(index, &scanline[(index % width) as usize]);
    }
}

fn unorm_scaled(v: f32, max: f32) -> u32 {
    (v.clamp(0.0, 1.0) * max).round() as u32
}

pub(crate) trait UnormScalar: bytemuck::Pod + Send + Sync {
    fn encode(v: f32) -> Self;
}

impl UnormScalar for u8 {
    fn encode(v: f32) -> u8 {
        (v.clamp(0.0, 1.0) * 255.0).round() as u8
    }
}

impl UnormScalar for u16 {
    fn encode(v: f32) -> u16 {
        (v.clamp(0.0, 1.0) * 65535.0).round() as u16
    }
}

pub(crate) trait SnormScalar: bytemuck::Pod + Send + Sync {
    fn encode(v: f32) -> Self;
}

impl SnormScalar for i8 {
    fn encode(v: f32) -> i8 {
        (v.clamp(-1.0, 1.0) * 127.0).round() as i8
    }
}

impl SnormScalar for i16 {
    fn encode(v: f32) -> i16 {
        (v.clamp(-1.0, 1.0) * 32767.0).round() as i16
    }
}

pub(crate) trait IntScalar: bytemuck::Pod + Send + Sync {
    const MIN_F: f32;
    const MAX_F: f32;
    fn cast(v: f32) -> Self;
}

macro_rules! int_scalar {
    ($t:ty) => {
        impl IntScalar for $t {
            const MIN_F: f32 = <$t>::MIN as f32;
            const MAX_F: f32 = <$t>::MAX as f32;
            fn cast(v: f32) -> $t {
                v as $t
            }
        }
    };
}

int_scalar!(u8);
int_scalar!(i8);
int_scalar!(u16);
int_scalar!(i16);
int_scalar!(u32);
int_scalar!(i32);

/// Plain unsigned-normalized packer for 8/16-bit channels.
pub(crate) struct UNormConverter<'a, T, const C: usize> {
    image: &'a Image,
    _marker: PhantomData<T>,
}

impl<'a, T, const C: usize> UNormConverter<'a, T, C> {
    pub(crate) fn new(image: &'a Image) -> Self {
        Self { image, _marker: PhantomData }
    }
}

impl<T: UnormScalar, const C: usize> Converter for UNormConverter<'_, T, C> {
    fn jobs_x(&self) -> u32 {
        pixel_jobs(self.image)
    }

    fn jobs_y(&self) -> u32 {
        1
    }

    fn data_size(&self) -> usize {
        self.image.width() as usize * self.image.height() as usize * std::mem::size_of::<T>() * C
    }

    fn process(&self, x: u32, _y: u32, _thread_data: &mut dyn ThreadData, out: &OutputSlots) {
        let size = std::mem::size_of::<T>();
        for_batch(self.image, x, |index, px| {
            let channels = [px.r, px.g, px.b, px.a];
            for (c, &v) in channels.iter().take(C).enumerate() {
                let value = T::encode(v);
                out.write((index as usize * C + c) * size, bytemuck::bytes_of(&value));
            }
        });
    }
}

/// Plain signed-normalized packer for 8/16-bit channels.
pub(crate) struct SNormConverter<'a, T, const C: usize> {
    image: &'a Image,
    _marker: PhantomData<T>,
}

impl<'a, T, const C: usize> SNormConverter<'a, T, C> {
    pub(crate) fn new(image: &'a Image) -> Self {
        Self { image, _marker: PhantomData }
    }
}

impl<T: SnormScalar, const C: usize> Converter for SNormConverter<'_, T, C> {
    fn jobs_x(&self) -> u32 {
        pixel_jobs(self.image)
    }

    fn jobs_y(&self) -> u32 {
        1
    }

    fn data_size(&self) -> usize {
        self.image.width() as usize * self.image.height() as usize * std::mem::size_of::<T>() * C
    }

    fn process(&self, x: u32, _y: u32, _thread_data: &mut dyn ThreadData, out: &OutputSlots) {
        let size = std::mem::size_of::<T>();
        for_batch(self.image, x, |index, px| {
            let channels = [px.r, px.g, px.b, px.a];
            for (c, &v) in channels.iter().take(C).enumerate() {
                let value = T::encode(v);
                out.write((index as usize * C + c) * size, bytemuck::bytes_of(&value));
            }
        });
    }
}

/// Raw integer packer; channel values are taken as numbers, not normalized.
pub(crate) struct IntConverter<'a, T, const C: usize> {
    image: &'a Image,
    _marker: PhantomData<T>,
}

impl<'a, T, const C: usize> IntConverter<'a, T, C> {
    pub(crate) fn new(image: &'a Image) -> Self {
        Self { image, _marker: PhantomData }
    }
}

impl<T: IntScalar, const C: usize> Converter for IntConverter<'_, T, C> {
    fn jobs_x(&self) -> u32 {
        pixel_jobs(self.image)
    }

    fn jobs_y(&self) -> u32 {
        1
    }

    fn data_size(&self) -> usize {
        self.image.width() as usize * self.image.height() as usize * std::mem::size_of::<T>() * C
    }

    fn process(&self, x: u32, _y: u32, _thread_data: &mut dyn ThreadData, out: &OutputSlots) {
        let size = std::mem::size_of::<T>();
        for_batch(self.image, x, |index, px| {
            let channels = [px.r, px.g, px.b, px.a];
            for (c, &v) in channels.iter().take(C).enumerate() {
                let value = T::cast(v.clamp(T::MIN_F, T::MAX_F).round());
                out.write((index as usize * C + c) * size, bytemuck::bytes_of(&value));
            }
        });
    }
}

/// Half-float channel packer (R16*, Float type).
pub(crate) struct HalfFloatConverter<'a, const C: usize> {
    image: &'a Image,
}

impl<'a, const C: usize> HalfFloatConverter<'a, C> {
    pub(crate) fn new(image: &'a Image) -> Self {
        Self { image }
    }
}

impl<const C: usize> Converter for HalfFloatConverter<'_, C> {
    fn jobs_x(&self) -> u32 {
        pixel_jobs(self.image)
    }

    fn jobs_y(&self) -> u32 {
        1
    }

    fn data_size(&self) -> usize {
        self.image.width() as usize * self.image.height() as usize * 2 * C
    }

    fn process(&self, x: u32, _y: u32, _thread_data: &mut dyn ThreadData, out: &OutputSlots) {
        for_batch(self.image, x, |index, px| {
            let channels = [px.r, px.g, px.b, px.a];
            for (c, &v) in channels.iter().take(C).enumerate() {
                let value = f16::from_f32(v).to_bits();
                out.write((index as usize * C + c) * 2, bytemuck::bytes_of(&value));
            }
        });
    }
}

/// Single-precision float channel packer (R32*, Float type).
pub(crate) struct FloatConverter<'a, const C: usize> {
    image: &'a Image,
}

impl<'a, const C: usize> FloatConverter<'a, C> {
    pub(crate) fn new(image: &'a Image) -> Self {
        Self { image }
    }
}

impl<const C: usize> Converter for FloatConverter<'_, C> {
    fn jobs_x(&self) -> u32 {
        pixel_jobs(self.image)
    }

    fn jobs_y(&self) -> u32 {
        1
    }

    fn data_size(&self) -> usize {
        self.image.width() as usize * self.image.height() as usize * 4 * C
    }

    fn process(&self, x: u32, _y: u32, _thread_data: &mut dyn ThreadData, out: &OutputSlots) {
        for_batch(self.image, x, |index, px| {
            let channels = [px.r, px.g, px.b, px.a];
            for (c, &v) in channels.iter().take(C).enumerate() {
                out.write((index as usize * C + c) * 4, bytemuck::bytes_of(&v));
            }
        });
    }
}

macro_rules! packed_converter {
    ($name:ident, $t:ty, $px:ident, $body:expr) => {
        pub(crate) struct $name<'a> {
            image: &'a Image,
        }

        impl<'a> $name<'a> {
            pub(crate) fn new(image: &'a Image) -> Self {
                Self { image }
            }
        }

        impl Converter for $name<'_> {
            fn jobs_x(&self) -> u32 {
                pixel_jobs(self.image)
            }

            fn jobs_y(&self) -> u32 {
                1
            }

            fn data_size(&self) -> usize {
                self.image.width() as usize
                    * self.image.height() as usize
                    * std::mem::size_of::<$t>()
            }

            fn process(
                &self,
                x: u32,
                _y: u32,
                _thread_data: &mut dyn ThreadData,
                out: &OutputSlots,
            ) {
                for_batch(self.image, x, |index, $px| {
                    let value: $t = $body;
                    out.write(
                        index as usize * std::mem::size_of::<$t>(),
                        bytemuck::bytes_of(&value),
                    );
                });
            }
        }
    };
}

packed_converter!(R4G4Converter, u8, px, {
    let r = unorm_scaled(px.r, 15.0) & 0xF;
    let g = unorm_scaled(px.g, 15.0) & 0xF;
    (g | (r << 4)) as u8
});

packed_converter!(R4G4B4A4Converter, u16, px, {
    let r = unorm_scaled(px.r, 15.0) & 0xF;
    let g = unorm_scaled(px.g, 15.0) & 0xF;
    let b = unorm_scaled(px.b, 15.0) & 0xF;
    let a = unorm_scaled(px.a, 15.0) & 0xF;
    (a | (b << 4) | (g << 8) | (r << 12)) as u16
});

packed_converter!(B4G4R4A4Converter, u16, px, {
    let r = unorm_scaled(px.r, 15.0) & 0xF;
    let g = unorm_scaled(px.g, 15.0) & 0xF;
    let b = unorm_scaled(px.b, 15.0) & 0xF;
    let a = unorm_scaled(px.a, 15.0) & 0xF;
    (a | (r << 4) | (g << 8) | (b << 12)) as u16
});

packed_converter!(A4R4G4B4Converter, u16, px, {
    let r = unorm_scaled(px.r, 15.0) & 0xF;
    let g = unorm_scaled(px.g, 15.0) & 0xF;
    let b = unorm_scaled(px.b, 15.0) & 0xF;
    let a = unorm_scaled(px.a, 15.0) & 0xF;
    (b | (g << 4) | (r << 8) | (a << 12)) as u16
});

// The 565/5551 packers read some channels from unexpected fields (notably blue from the
// alpha field). Downstream consumers have come to rely on the exact bit patterns, so the
// reads are kept as they are.
packed_converter!(R5G6B5Converter, u16, px, {
    let r = unorm_scaled(px.r, 31.0) & 0x1F;
    let g = unorm_scaled(px.g, 63.0) & 0x3F;
    let b = unorm_scaled(px.a, 31.0) & 0x1F;
    (g | (b << 5) | (r << 11)) as u16
});

packed_converter!(B5G6R5Converter, u16, px, {
    let r = unorm_scaled(px.r, 31.0) & 0x1F;
    let g = unorm_scaled(px.g, 63.0) & 0x3F;
    let b = unorm_scaled(px.a, 31.0) & 0x1F;
    (r | (g << 5) | (b << 11)) as u16
});

packed_converter!(R5G5B5A1Converter, u16, px, {
    let a = unorm_scaled(px.r, 31.0) & 0x1F;
    let r = unorm_scaled(px.g, 31.0) & 0x1F;
    let g = unorm_scaled(px.b, 31.0) & 0x1F;
    let b = unorm_scaled(px.a, 1.0);
    (a | (b << 1) | (g << 6) | (r << 11)) as u16
});

packed_converter!(B5G5R5A1Converter, u16, px, {
    let a = unorm_scaled(px.r, 31.0) & 0x1F;
    let r = unorm_scaled(px.g, 31.0) & 0x1F;
    let g = unorm_scaled(px.b, 31.0) & 0x1F;
    let b = unorm_scaled(px.a, 1.0);
    (a | (r << 1) | (g << 6) | (b << 11)) as u16
});

packed_converter!(A1R5G5B5Converter, u16, px, {
    let a = unorm_scaled(px.r, 31.0) & 0x1F;
    let r = unorm_scaled(px.g, 31.0) & 0x1F;
    let g = unorm_scaled(px.b, 31.0) & 0x1F;
    let b = unorm_scaled(px.a, 1.0);
    (b | (g << 5) | (r << 10) | (a << 15)) as u16
});

packed_converter!(B8G8R8Converter, [u8; 3], px, {
    [
        unorm_scaled(px.b, 255.0) as u8,
        unorm_scaled(px.g, 255.0) as u8,
        unorm_scaled(px.r, 255.0) as u8,
    ]
});

packed_converter!(B8G8R8A8Converter, [u8; 4], px, {
    [
        unorm_scaled(px.b, 255.0) as u8,
        unorm_scaled(px.g, 255.0) as u8,
        unorm_scaled(px.r, 255.0) as u8,
        unorm_scaled(px.a, 255.0) as u8,
    ]
});

packed_converter!(A8B8G8R8Converter, [u8; 4], px, {
    [
        unorm_scaled(px.a, 255.0) as u8,
        unorm_scaled(px.b, 255.0) as u8,
        unorm_scaled(px.g, 255.0) as u8,
        unorm_scaled(px.r, 255.0) as u8,
    ]
});

packed_converter!(A2R10G10B10UNormConverter, u32, px, {
    let r = unorm_scaled(px.r, 1023.0) & 0x3FF;
    let g = unorm_scaled(px.g, 1023.0) & 0x3FF;
    let b = unorm_scaled(px.b, 1023.0) & 0x3FF;
    let a = unorm_scaled(px.a, 3.0) & 0x3;
    b | (g << 10) | (r << 20) | (a << 30)
});

packed_converter!(A2R10G10B10UIntConverter, u32, px, {
    let r = px.r.clamp(0.0, 1023.0).round() as u32;
    let g = px.g.clamp(0.0, 1023.0).round() as u32;
    let b = px.b.clamp(0.0, 1023.0).round() as u32;
    let a = px.a.clamp(0.0, 3.0).round() as u32;
    b | (g << 10) | (r << 20) | (a << 30)
});

packed_converter!(A2B10G10R10UNormConverter, u32, px, {
    let r = unorm_scaled(px.r, 1023.0) & 0x3FF;
    let g = unorm_scaled(px.g, 1023.0) & 0x3FF;
    let b = unorm_scaled(px.b, 1023.0) & 0x3FF;
    let a = unorm_scaled(px.a, 3.0) & 0x3;
    r | (g << 10) | (b << 20) | (a << 30)
});

packed_converter!(A2B10G10R10UIntConverter, u32, px, {
    let r = px.r.clamp(0.0, 1023.0).round() as u32;
    let g = px.g.clamp(0.0, 1023.0).round() as u32;
    let b = px.b.clamp(0.0, 1023.0).round() as u32;
    let a = px.a.clamp(0.0, 3.0).round() as u32;
    r | (g << 10) | (b << 20) | (a << 30)
});

packed_converter!(B10G11R11UFloatConverter, u32, px, {
    pack_uf11(px.r) | (pack_uf11(px.g) << 11) | (pack_uf10(px.b) << 22)
});

packed_converter!(E5B9G9R9UFloatConverter, u32, px, { pack_rgb9e5(px.r, px.g, px.b) });

/// Packs a float into the 11-bit unsigned float layout (5-bit exponent, 6-bit mantissa).
pub(crate) fn pack_uf11(v: f32) -> u32 {
    let bits = f16::from_f32(v).to_bits();
    if bits & 0x8000 != 0 {
        // Negative values have no representation; NaN keeps its payload bit.
        return if bits & 0x7C00 == 0x7C00 && bits & 0x03FF != 0 { 0x7FF } else { 0 };
    }
    if bits & 0x7C00 == 0x7C00 {
        return if bits & 0x03FF != 0 { 0x7FF } else { 0x7C0 };
    }
    ((bits as u32 + 8) >> 4) & 0x7FF
}

/// Packs a float into the 10-bit unsigned float layout (5-bit exponent, 5-bit mantissa).
pub(crate) fn pack_uf10(v: f32) -> u32 {
    let bits = f16::from_f32(v).to_bits();
    if bits & 0x8000 != 0 {
        return if bits & 0x7C00 == 0x7C00 && bits & 0x03FF != 0 { 0x3FF } else { 0 };
    }
    if bits & 0x7C00 == 0x7C00 {
        return if bits & 0x03FF != 0 { 0x3FF } else { 0x3E0 };
    }
    ((bits as u32 + 16) >> 5) & 0x3FF
}

/// Packs three floats into the shared-exponent RGB9E5 layout.
pub(crate) fn pack_rgb9e5(r: f32, g: f32, b: f32) -> u32 {
    const MANTISSA_BITS: i32 = 9;
    const EXP_BIAS: i32 = 15;
    const MAX_VALID: f32 = 65408.0; // (2^9 - 1) / 2^9 * 2^(31 - 15)

    fn sanitize(v: f32) -> f32 {
        if v.is_nan() || v <= 0.0 {
            0.0
        } else {
            v.min(MAX_VALID)
        }
    }

    let rc = sanitize(r);
    let gc = sanitize(g);
    let bc = sanitize(b);
    let max_c = rc.max(gc).max(bc);
    if max_c == 0.0 {
        return 0;
    }

    let mut shared_exp = (max_c.log2().floor() as i32).max(-EXP_BIAS - 1) + 1 + EXP_BIAS;
    let mut denom = (2.0f32).powi(shared_exp - EXP_BIAS - MANTISSA_BITS);
    if ((max_c / denom + 0.5).floor() as i32) == (1 << MANTISSA_BITS) {
        shared_exp += 1;
        denom = (2.0f32).powi(shared_exp - EXP_BIAS - MANTISSA_BITS);
    }

    let rs = (rc / denom + 0.5).floor() as u32;
    let gs = (gc / denom + 0.5).floor() as u32;
    let bs = (bc / denom + 0.5).floor() as u32;
    rs | (gs << 9) | (bs << 18) | ((shared_exp as u32) << 27)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::color::ColorRgbaD;
    use crate::image::PixelFormat;
    use crate::ColorSpace;

    fn solid(color: ColorRgbaD) -> Image {
        let mut image = Image::new(PixelFormat::RGBAF, 2, 2, ColorSpace::Linear).unwrap();
        for y in 0..2 {
            for x in 0..2 {
                image.set_pixel(x, y, &color, false).unwrap();
            }
        }
        image
    }

    fn run(converter: &dyn Converter) -> Vec<u8> {
        let mut payload = vec![0u8; converter.data_size()];
        let out = OutputSlots::new(&mut payload);
        let mut data = converter.create_thread_data().unwrap();
        for y in 0..converter.jobs_y() {
            for x in 0..converter.jobs_x() {
                converter.process(x, y, data.as_mut(), &out);
            }
        }
        payload
    }

    #[test]
    fn r5g6b5_reads_blue_from_alpha() {
        // Blue comes from the alpha field; a pure-blue pixel with opaque alpha therefore
        // encodes blue as full.
        let image = solid(ColorRgbaD::new(0.0, 0.0, 1.0, 0.0));
        let payload = run(&R5G6B5Converter::new(&image));
        let value = u16::from_ne_bytes([payload[0], payload[1]]);
        assert_eq!(value, 0);

        let image = solid(ColorRgbaD::new(0.0, 0.0, 0.0, 1.0));
        let payload = run(&R5G6B5Converter::new(&image));
        let value = u16::from_ne_bytes([payload[0], payload[1]]);
        assert_eq!(value, 0x1F << 5);
    }

    #[test]
    fn a2b10g10r10_packs_channel_order() {
        let image = solid(ColorRgbaD::new(1.0, 0.0, 0.0, 1.0));
        let payload = run(&A2B10G10R10UNormConverter::new(&image));
        let value = u32::from_ne_bytes([payload[0], payload[1], payload[2], payload[3]]);
        assert_eq!(value, 0x3FF | (0x3 << 30));
    }

    #[test]
    fn uf11_of_one_is_exponent_15() {
        // 1.0 = exponent 15 (biased), zero mantissa.
        assert_eq!(pack_uf11(1.0), 15 << 6);
        assert_eq!(pack_uf10(1.0), 15 << 5);
        assert_eq!(pack_uf11(-2.0), 0);
    }

    #[test]
    fn rgb9e5_of_one() {
        // 1.0 → mantissa 256 with shared exponent 16 (9-bit mantissa scale).
        let packed = pack_rgb9e5(1.0, 1.0, 1.0);
        assert_eq!(packed & 0x1FF, 256);
        assert_eq!(packed >> 27, 16);
        assert_eq!(pack_rgb9e5(0.0, 0.0, 0.0), 0);
    }

    #[test]
    fn half_float_payload() {
        let image = solid(ColorRgbaD::new(1.0, 0.5, 2.0, 1.0));
        let payload = run(&HalfFloatConverter::<3>::new(&image));
        let h0 = u16::from_ne_bytes([payload[0], payload[1]]);
        let h1 = u16::from_ne_bytes([payload[2], payload[3]]);
        assert_eq!(h0, f16::from_f32(1.0).to_bits());
        assert_eq!(h1, f16::from_f32(0.5).to_bits());
    }

    #[test]
    fn int_payload_is_raw_valued() {
        let image = solid(ColorRgbaD::new(1000.0, -5.0, 0.0, 1.0));
        let payload = run(&IntConverter::<u16, 2>::new(&image));
        let v0 = u16::from_ne_bytes([payload[0], payload[1]]);
        let v1 = u16::from_ne_bytes([payload[2], payload[3]]);
        assert_eq!(v0, 1000);
        assert_eq!(v1, 0);
    }

    #[test]
    fn partial_batch_at_end() {
        // 3×3 = 9 pixels, one batch of 32 with an early break.
        let mut image = Image::new(PixelFormat::RGBAF, 3, 3, ColorSpace::Linear).unwrap();
        for y in 0..3 {
            for x in 0..3 {
                image
                    .set_pixel(x, y, &ColorRgbaD::new(1.0, 1.0, 1.0, 1.0), false)
                    .unwrap();
            }
        }
        let converter = UNormConverter::<u8, 4>::new(&image);
        assert_eq!(converter.jobs_x(), 1);
        let payload = run(&converter);
        assert_eq!(payload.len(), 9 * 4);
        assert!(payload.iter().all(|&b| b == 255));
    }
}
