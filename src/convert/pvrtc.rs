//! PVRTC1 and PVRTC2 encoders.
//!
//! PVRTC interpolates two low-resolution color images across the whole texture, so unlike
//! the other codecs it encodes per image rather than per block: the job grid is 1×1 and
//! `process` writes the entire payload. Each block stores an A (low) and B (high) color;
//! pixels modulate between the bilinearly upscaled A and B images. PVRTC1 stores blocks in
//! Morton order with wrap-around filtering; PVRTC2 uses linear order with clamping.

use super::{Converter, EncodeSettings, OutputSlots, ThreadData};
use crate::color::ColorRgbaF;
use crate::image::Image;
use crate::texture::info::{min_height, min_width, Format, Quality, Type};

pub(crate) fn create_converter<'a>(
    image: &'a Image,
    settings: &EncodeSettings,
) -> Option<Box<dyn Converter + 'a>> {
    if settings.ty != Type::UNorm {
        return None;
    }

    let (two_bpp, with_alpha, v2) = match settings.format {
        Format::PVRTC1_RGB_2BPP => (true, false, false),
        Format::PVRTC1_RGBA_2BPP => (true, true, false),
        Format::PVRTC1_RGB_4BPP => (false, false, false),
        Format::PVRTC1_RGBA_4BPP => (false, true, false),
        Format::PVRTC2_RGBA_2BPP => (true, true, true),
        Format::PVRTC2_RGBA_4BPP => (false, true, true),
        _ => return None,
    };

    let padded_width = image.width().max(min_width(settings.format));
    let padded_height = image.height().max(min_height(settings.format));
    Some(Box::new(PvrtcConverter {
        image,
        two_bpp,
        with_alpha,
        v2,
        padded_width,
        padded_height,
        refine_passes: match settings.quality {
            Quality::Lowest | Quality::Low => 0,
            Quality::Normal | Quality::High => 1,
            Quality::Highest => 2,
        },
    }))
}

struct PvrtcConverter<'a> {
    image: &'a Image,
    two_bpp: bool,
    with_alpha: bool,
    v2: bool,
    padded_width: u32,
    padded_height: u32,
    refine_passes: u32,
}

#[derive(Copy, Clone, Default)]
struct Rgba {
    r: f32,
    g: f32,
    b: f32,
    a: f32,
}

impl PvrtcConverter<'_> {
    fn block_width(&self) -> u32 {
        if self.two_bpp {
            8
        } else {
            4
        }
    }

    fn blocks_x(&self) -> u32 {
        self.padded_width.div_ceil(self.block_width())
    }

    fn blocks_y(&self) -> u32 {
        self.padded_height.div_ceil(4)
    }

    fn pixel(&self, x: u32, y: u32) -> Rgba {
        let sx = x.min(self.image.width() - 1);
        let sy = y.min(self.image.height() - 1);
        let px: &ColorRgbaF = &self.image.rgbaf_scanline(sy)[sx as usize];
        Rgba {
            r: px.r.clamp(0.0, 1.0),
            g: px.g.clamp(0.0, 1.0),
            b: px.b.clamp(0.0, 1.0),
            a: if self.with_alpha { px.a.clamp(0.0, 1.0) } else { 1.0 },
        }
    }
}

fn luma(c: &Rgba) -> f32 {
    0.2126 * c.r + 0.7152 * c.g + 0.0722 * c.b
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn lerp_color(a: &Rgba, b: &Rgba, t: f32) -> Rgba {
    Rgba {
        r: lerp(a.r, b.r, t),
        g: lerp(a.g, b.g, t),
        b: lerp(a.b, b.b, t),
        a: lerp(a.a, b.a, t),
    }
}

/// Block storage order: Morton for PVRTC1 (power-of-two grids), linear otherwise.
fn block_index(x: u32, y: u32, blocks_x: u32, blocks_y: u32, morton: bool) -> u32 {
    if !morton || !blocks_x.is_power_of_two() || !blocks_y.is_power_of_two() {
        return y * blocks_x + x;
    }

    let shared_bits = blocks_x.min(blocks_y).trailing_zeros();
    let mut index = 0u32;
    for i in 0..shared_bits {
        index |= ((x >> i) & 1) << (2 * i);
        index |= ((y >> i) & 1) << (2 * i + 1);
    }
    let rest = if blocks_x > blocks_y { x >> shared_bits } else { y >> shared_bits };
    index | (rest << (2 * shared_bits))
}

fn quant(v: f32, max: u32) -> u32 {
    (v * max as f32).round().clamp(0.0, max as f32) as u32
}

/// Color A: 15 bits with the opaque flag at bit 14 of the field (bit 15 of the word).
/// Opaque: R5 G5 B4; translucent: A3 R4 G4 B3.
fn encode_color_a(c: &Rgba) -> u32 {
    if c.a >= 0.875 {
        0x4000 | (quant(c.r, 31) << 9) | (quant(c.g, 31) << 4) | quant(c.b, 15)
    } else {
        (quant(c.a, 7) << 11) | (quant(c.r, 15) << 7) | (quant(c.g, 15) << 3) | quant(c.b, 7)
    }
}

/// Color B: 16 bits with the opaque flag at bit 15. Opaque: R5 G5 B5; translucent:
/// A3 R4 G4 B4.
fn encode_color_b(c: &Rgba) -> u32 {
    if c.a >= 0.875 {
        0x8000 | (quant(c.r, 31) << 10) | (quant(c.g, 31) << 5) | quant(c.b, 31)
    } else {
        (quant(c.a, 7) << 12) | (quant(c.r, 15) << 8) | (quant(c.g, 15) << 4) | quant(c.b, 15)
    }
}

impl Converter for PvrtcConverter<'_> {
    fn jobs_x(&self) -> u32 {
        1
    }

    fn jobs_y(&self) -> u32 {
        1
    }

    fn data_size(&self) -> usize {
        self.blocks_x() as usize * self.blocks_y() as usize * 8
    }

    fn process(&self, _x: u32, _y: u32, _thread_data: &mut dyn ThreadData, out: &OutputSlots) {
        let blocks_x = self.blocks_x();
        let blocks_y = self.blocks_y();
        let block_w = self.block_width();
        let block_h = 4u32;

        // Representative A (dark) and B (bright) colors per block, split along luminance.
        let mut color_a = vec![Rgba::default(); (blocks_x * blocks_y) as usize];
        let mut color_b = vec![Rgba::default(); (blocks_x * blocks_y) as usize];
        for by in 0..blocks_y {
            for bx in 0..blocks_x {
                let mut lo = Rgba { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };
                let mut hi = Rgba::default();
                let mut lo_l = f32::MAX;
                let mut hi_l = f32::MIN;
                let mut a_min = 1.0f32;
                let mut a_max = 0.0f32;
                for j in 0..block_h {
                    for i in 0..block_w {
                        let px = self.pixel(bx * block_w + i, by * block_h + j);
                        let l = luma(&px);
                        if l < lo_l {
                            lo_l = l;
                            lo = px;
                        }
                        if l > hi_l {
                            hi_l = l;
                            hi = px;
                        }
                        a_min = a_min.min(px.a);
                        a_max = a_max.max(px.a);
                    }
                }
                lo.a = a_min;
                hi.a = a_max;
                let index = (by * blocks_x + bx) as usize;
                color_a[index] = lo;
                color_b[index] = hi;
            }
        }

        // PVRTC1 filters with wrap-around; PVRTC2 clamps at the borders.
        let sample_block_color = |grid: &[Rgba], bx: i32, by: i32| -> Rgba {
            let (bx, by) = if self.v2 {
                (bx.clamp(0, blocks_x as i32 - 1), by.clamp(0, blocks_y as i32 - 1))
            } else {
                (bx.rem_euclid(blocks_x as i32), by.rem_euclid(blocks_y as i32))
            };
            grid[(by as u32 * blocks_x + bx as u32) as usize]
        };

        let upscale = |grid: &[Rgba], x: u32, y: u32| -> Rgba {
            let fx = (x as f32 + 0.5) / block_w as f32 - 0.5;
            let fy = (y as f32 + 0.5) / block_h as f32 - 0.5;
            let bx = fx.floor();
            let by = fy.floor();
            let tx = fx - bx;
            let ty = fy - by;
            let c00 = sample_block_color(grid, bx as i32, by as i32);
            let c10 = sample_block_color(grid, bx as i32 + 1, by as i32);
            let c01 = sample_block_color(grid, bx as i32, by as i32 + 1);
            let c11 = sample_block_color(grid, bx as i32 + 1, by as i32 + 1);
            lerp_color(&lerp_color(&c00, &c10, tx), &lerp_color(&c01, &c11, tx), ty)
        };

        // Modulation weights of mode 0: 2bpp has a single bit per pixel, 4bpp two bits.
        let weights: &[f32] = if self.two_bpp { &[0.0, 1.0] } else { &[0.0, 3.0 / 8.0, 5.0 / 8.0, 1.0] };

        let modulation = |color_a: &[Rgba], color_b: &[Rgba]| -> Vec<u8> {
            let mut out = vec![0u8; (self.padded_width * self.padded_height) as usize];
            for y in 0..self.padded_height {
                for x in 0..self.padded_width {
                    let a = upscale(color_a, x, y);
                    let b = upscale(color_b, x, y);
                    let px = self.pixel(x, y);
                    let delta = [b.r - a.r, b.g - a.g, b.b - a.b, b.a - a.a];
                    let len2: f32 = delta.iter().map(|d| d * d).sum();
                    let t = if len2 < 1e-8 {
                        0.0
                    } else {
                        ((px.r - a.r) * delta[0]
                            + (px.g - a.g) * delta[1]
                            + (px.b - a.b) * delta[2]
                            + (px.a - a.a) * delta[3])
                            / len2
                    };
                    let mut best = 0usize;
                    let mut best_dist = f32::MAX;
                    for (i, &w) in weights.iter().enumerate() {
                        let d = (t - w).abs();
                        if d < best_dist {
                            best_dist = d;
                            best = i;
                        }
                    }
                    out[(y * self.padded_width + x) as usize] = best as u8;
                }
            }
            out
        };

        let mut mods = modulation(&color_a, &color_b);

        // Refinement: re-fit each block's endpoints to its own pixels given the current
        // modulation, then redo the modulation pass.
        for _ in 0..self.refine_passes {
            for by in 0..blocks_y {
                for bx in 0..blocks_x {
                    let mut alpha = 0.0f32;
                    let mut beta = 0.0f32;
                    let mut gamma = 0.0f32;
                    let mut p = [0.0f32; 4];
                    let mut q = [0.0f32; 4];
                    for j in 0..block_h {
                        for i in 0..block_w {
                            let x = bx * block_w + i;
                            let y = by * block_h + j;
                            let t = weights[mods[(y * self.padded_width + x) as usize] as usize];
                            let s = 1.0 - t;
                            let px = self.pixel(x, y);
                            let channels = [px.r, px.g, px.b, px.a];
                            alpha += s * s;
                            beta += s * t;
                            gamma += t * t;
                            for c in 0..4 {
                                p[c] += channels[c] * s;
                                q[c] += channels[c] * t;
                            }
                        }
                    }
                    let det = alpha * gamma - beta * beta;
                    if det.abs() < 1e-6 {
                        continue;
                    }
                    let index = (by * blocks_x + bx) as usize;
                    let mut a = Rgba::default();
                    let mut b = Rgba::default();
                    let solve = |pc: f32, qc: f32| {
                        (
                            ((gamma * pc - beta * qc) / det).clamp(0.0, 1.0),
                            ((alpha * qc - beta * pc) / det).clamp(0.0, 1.0),
                        )
                    };
                    (a.r, b.r) = solve(p[0], q[0]);
                    (a.g, b.g) = solve(p[1], q[1]);
                    (a.b, b.b) = solve(p[2], q[2]);
                    (a.a, b.a) = solve(p[3], q[3]);
                    color_a[index] = a;
                    color_b[index] = b;
                }
            }
            mods = modulation(&color_a, &color_b);
        }

        // Emit blocks: 32 bits of modulation then the color word.
        for by in 0..blocks_y {
            for bx in 0..blocks_x {
                let grid_index = (by * blocks_x + bx) as usize;
                let mut mod_word = 0u32;
                if self.two_bpp {
                    for j in 0..4 {
                        for i in 0..8 {
                            let x = bx * 8 + i;
                            let y = by * 4 + j;
                            let bit = mods[(y * self.padded_width + x) as usize] as u32;
                            mod_word |= bit << (j * 8 + i);
                        }
                    }
                } else {
                    for j in 0..4 {
                        for i in 0..4 {
                            let x = bx * 4 + i;
                            let y = by * 4 + j;
                            let bits = mods[(y * self.padded_width + x) as usize] as u32;
                            mod_word |= bits << ((j * 4 + i) * 2);
                        }
                    }
                }

                let a_bits = encode_color_a(&color_a[grid_index]);
                let b_bits = encode_color_b(&color_b[grid_index]);
                // Word layout: B in the high half (opaque flag bit 31), A in bits 1..15
                // with its flag at bit 15, modulation mode in bit 0. PVRTC2 reuses bit 31
                // as the hard-transition flag, left clear.
                let color_word = if self.v2 {
                    ((b_bits & 0x7FFF) << 16) | (a_bits << 1)
                } else {
                    (b_bits << 16) | (a_bits << 1)
                };

                let store = block_index(bx, by, blocks_x, blocks_y, !self.v2);
                let mut block = [0u8; 8];
                block[..4].copy_from_slice(&mod_word.to_le_bytes());
                block[4..].copy_from_slice(&color_word.to_le_bytes());
                out.write(store as usize * 8, &block);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::color::ColorRgbaD;
    use crate::image::PixelFormat;
    use crate::texture::info::{ColorMask, Alpha};
    use crate::ColorSpace;

    fn settings(format: Format) -> EncodeSettings {
        EncodeSettings {
            format,
            ty: Type::UNorm,
            quality: Quality::Normal,
            alpha: Alpha::Standard,
            mask: ColorMask::default(),
            color_space: ColorSpace::Linear,
        }
    }

    fn image(width: u32, height: u32) -> Image {
        let mut image = Image::new(PixelFormat::RGBAF, width, height, ColorSpace::Linear).unwrap();
        for y in 0..height {
            for x in 0..width {
                image
                    .set_pixel(x, y, &ColorRgbaD::new(0.75, 0.5, 0.25, 1.0), false)
                    .unwrap();
            }
        }
        image
    }

    #[test]
    fn whole_image_job_grid() {
        let image = image(32, 32);
        let converter = create_converter(&image, &settings(Format::PVRTC1_RGB_4BPP)).unwrap();
        assert_eq!(converter.jobs_x(), 1);
        assert_eq!(converter.jobs_y(), 1);
        assert_eq!(converter.data_size(), (32 / 4) * (32 / 4) * 8);
    }

    #[test]
    fn small_images_pad_to_minimum() {
        let image = image(4, 4);
        let converter = create_converter(&image, &settings(Format::PVRTC1_RGB_4BPP)).unwrap();
        // 8×8 minimum → 2×2 blocks.
        assert_eq!(converter.data_size(), 2 * 2 * 8);

        let converter = create_converter(&image, &settings(Format::PVRTC1_RGB_2BPP)).unwrap();
        // 16×8 minimum → 2×2 blocks of 8×4.
        assert_eq!(converter.data_size(), 2 * 2 * 8);
    }

    #[test]
    fn morton_order_interleaves() {
        assert_eq!(block_index(0, 0, 4, 4, true), 0);
        assert_eq!(block_index(1, 0, 4, 4, true), 1);
        assert_eq!(block_index(0, 1, 4, 4, true), 2);
        assert_eq!(block_index(1, 1, 4, 4, true), 3);
        assert_eq!(block_index(2, 0, 4, 4, true), 4);
        // Linear order for PVRTC2.
        assert_eq!(block_index(2, 1, 4, 4, false), 6);
    }

    #[test]
    fn solid_opaque_block_sets_opaque_flags() {
        let image = image(8, 8);
        let converter = create_converter(&image, &settings(Format::PVRTC1_RGBA_4BPP)).unwrap();
        let mut payload = vec![0u8; converter.data_size()];
        let out = OutputSlots::new(&mut payload);
        let mut data = converter.create_thread_data().unwrap();
        converter.process(0, 0, data.as_mut(), &out);

        let color_word = u32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]);
        assert_ne!(color_word & 0x8000_0000, 0, "color B opaque flag");
        assert_ne!(color_word & 0x8000, 0, "color A opaque flag");
    }
}
