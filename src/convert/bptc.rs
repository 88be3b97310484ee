//! BPTC block encoders: BC7 (mode 6, single subset) and BC6H (mode 11, single subset) for
//! both signedness variants. Endpoints come from a range fit refined with least squares;
//! the quality preset scales the refinement depth.

use super::s3tc::{to_color_block, BlockConverter, BlockKernel, BLOCK_PIXELS};
use super::{Converter, EncodeSettings};
use crate::color::ColorRgbaF;
use crate::image::Image;
use crate::texture::info::{Format, Quality, Type};
use crate::ColorSpace;
use half::f16;

pub(crate) fn create_converter<'a>(
    image: &'a Image,
    settings: &EncodeSettings,
) -> Option<Box<dyn Converter + 'a>> {
    match (settings.format, settings.ty) {
        (Format::BC6H, Type::UFloat | Type::Float) => Some(Box::new(BlockConverter::new(
            image,
            16,
            Bc6HKernel {
                signed: settings.ty == Type::Float,
                rounds: refinement_rounds(settings.quality),
            },
        ))),
        (Format::BC7, Type::UNorm) => Some(Box::new(BlockConverter::new(
            image,
            16,
            Bc7Kernel { weights: bc7_weights(settings), rounds: refinement_rounds(settings.quality) },
        ))),
        _ => None,
    }
}

fn refinement_rounds(quality: Quality) -> u32 {
    match quality {
        Quality::Lowest => 0,
        Quality::Low => 1,
        Quality::Normal => 2,
        Quality::High => 3,
        Quality::Highest => 4,
    }
}

/// Channel error weights: perceptual for sRGB sources, linear otherwise, zeroed by the
/// color mask.
fn bc7_weights(settings: &EncodeSettings) -> [f32; 4] {
    let base = if settings.color_space == ColorSpace::Srgb {
        [0.2126, 0.7152, 0.0722, 1.0]
    } else {
        [1.0, 1.0, 1.0, 1.0]
    };
    [
        if settings.mask.r { base[0] } else { 0.0 },
        if settings.mask.g { base[1] } else { 0.0 },
        if settings.mask.b { base[2] } else { 0.0 },
        if settings.mask.a { base[3] } else { 0.0 },
    ]
}

/// Interpolation weights for 4-bit indices.
const WEIGHTS16: [u32; 16] = [0, 4, 9, 13, 17, 21, 26, 30, 34, 38, 43, 47, 51, 55, 60, 64];

struct BitWriter {
    data: [u8; 16],
    bit: usize,
}

impl BitWriter {
    fn new() -> Self {
        Self { data: [0; 16], bit: 0 }
    }

    fn push(&mut self, value: u64, bits: u32) {
        for i in 0..bits {
            if (value >> i) & 1 != 0 {
                self.data[self.bit / 8] |= 1 << (self.bit % 8);
            }
            self.bit += 1;
        }
    }
}

// ---------------------------------------------------------------------------------------
// BC7 mode 6: one subset, 7.7.7.7 endpoints with per-endpoint P bit, 4-bit indices.
// ---------------------------------------------------------------------------------------

struct Bc7Kernel {
    weights: [f32; 4],
    rounds: u32,
}

fn bc7_quant(value: u8, p: u32) -> u32 {
    // Endpoint decodes as (q << 1) | p; pick the nearest 7-bit q for this p bit.
    let t = value as i32 - p as i32;
    ((t + 1) >> 1).clamp(0, 127) as u32
}

fn bc7_decode(q: u32, p: u32) -> u32 {
    (q << 1) | p
}

fn bc7_palette(e0: [u32; 4], e1: [u32; 4]) -> [[f32; 4]; 16] {
    let mut palette = [[0.0f32; 4]; 16];
    for (k, w) in WEIGHTS16.iter().enumerate() {
        for c in 0..4 {
            palette[k][c] = ((e0[c] * (64 - w) + e1[c] * w + 32) >> 6) as f32;
        }
    }
    palette
}

fn bc7_assign(
    pixels: &[[f32; 4]; BLOCK_PIXELS],
    palette: &[[f32; 4]; 16],
    weights: [f32; 4],
) -> ([u8; BLOCK_PIXELS], f32) {
    let mut indices = [0u8; BLOCK_PIXELS];
    let mut error = 0.0f32;
    for (i, px) in pixels.iter().enumerate() {
        let mut best = f32::MAX;
        let mut best_index = 0u8;
        for (k, entry) in palette.iter().enumerate() {
            let mut dist = 0.0f32;
            for c in 0..4 {
                let d = px[c] - entry[c];
                dist += weights[c] * d * d;
            }
            if dist < best {
                best = dist;
                best_index = k as u8;
            }
        }
        indices[i] = best_index;
        error += best;
    }
    (indices, error)
}

struct Bc7Candidate {
    e0: [u32; 4],
    e1: [u32; 4],
    q0: [u32; 4],
    q1: [u32; 4],
    p0: u32,
    p1: u32,
    indices: [u8; BLOCK_PIXELS],
    error: f32,
}

fn bc7_candidate(
    lo: [f32; 4],
    hi: [f32; 4],
    p0: u32,
    p1: u32,
    pixels: &[[f32; 4]; BLOCK_PIXELS],
    weights: [f32; 4],
) -> Bc7Candidate {
    let mut q0 = [0u32; 4];
    let mut q1 = [0u32; 4];
    let mut e0 = [0u32; 4];
    let mut e1 = [0u32; 4];
    for c in 0..4 {
        q0[c] = bc7_quant(lo[c].clamp(0.0, 255.0).round() as u8, p0);
        q1[c] = bc7_quant(hi[c].clamp(0.0, 255.0).round() as u8, p1);
        e0[c] = bc7_decode(q0[c], p0);
        e1[c] = bc7_decode(q1[c], p1);
    }
    let palette = bc7_palette(e0, e1);
    let (indices, error) = bc7_assign(pixels, &palette, weights);
    Bc7Candidate { e0, e1, q0, q1, p0, p1, indices, error }
}

/// Least-squares endpoint solve for the current index assignment.
fn bc7_least_squares(
    pixels: &[[f32; 4]; BLOCK_PIXELS],
    indices: &[u8; BLOCK_PIXELS],
) -> Option<([f32; 4], [f32; 4])> {
    let mut alpha = 0.0f32;
    let mut beta = 0.0f32;
    let mut gamma = 0.0f32;
    let mut p = [0.0f32; 4];
    let mut q = [0.0f32; 4];
    for (px, &index) in pixels.iter().zip(indices.iter()) {
        let t = WEIGHTS16[index as usize] as f32 / 64.0;
        let s = 1.0 - t;
        alpha += s * s;
        beta += s * t;
        gamma += t * t;
        for c in 0..4 {
            p[c] += px[c] * s;
            q[c] += px[c] * t;
        }
    }
    let det = alpha * gamma - beta * beta;
    if det.abs() < 1e-6 {
        return None;
    }
    let mut e0 = [0.0f32; 4];
    let mut e1 = [0.0f32; 4];
    for c in 0..4 {
        e0[c] = (gamma * p[c] - beta * q[c]) / det;
        e1[c] = (alpha * q[c] - beta * p[c]) / det;
    }
    Some((e0, e1))
}

impl BlockKernel for Bc7Kernel {
    fn compress(&self, colors: &[ColorRgbaF; BLOCK_PIXELS], out: &mut [u8]) {
        let block = to_color_block(colors);
        let mut pixels = [[0.0f32; 4]; BLOCK_PIXELS];
        for (dst, src) in pixels.iter_mut().zip(block.iter()) {
            *dst = [src[0] as f32, src[1] as f32, src[2] as f32, src[3] as f32];
        }

        let mut lo = [255.0f32; 4];
        let mut hi = [0.0f32; 4];
        for px in &pixels {
            for c in 0..4 {
                lo[c] = lo[c].min(px[c]);
                hi[c] = hi[c].max(px[c]);
            }
        }

        // P-bit combinations to try: both-off and both-on always, mixed at higher effort.
        let p_candidates: &[(u32, u32)] =
            if self.rounds >= 3 { &[(0, 0), (1, 1), (0, 1), (1, 0)] } else { &[(0, 0), (1, 1)] };

        let mut best: Option<Bc7Candidate> = None;
        for &(p0, p1) in p_candidates {
            let mut candidate = bc7_candidate(lo, hi, p0, p1, &pixels, self.weights);
            for _ in 0..self.rounds {
                let Some((e0, e1)) = bc7_least_squares(&pixels, &candidate.indices) else {
                    break;
                };
                let refined = bc7_candidate(e0, e1, p0, p1, &pixels, self.weights);
                if refined.error < candidate.error {
                    candidate = refined;
                } else {
                    break;
                }
            }
            if best.as_ref().map_or(true, |b| candidate.error < b.error) {
                best = Some(candidate);
            }
        }
        let mut best = best.expect("at least one p-bit candidate");

        // Anchor constraint: index 0 stores only 3 bits, so its high bit must be clear.
        if best.indices[0] >= 8 {
            std::mem::swap(&mut best.q0, &mut best.q1);
            std::mem::swap(&mut best.e0, &mut best.e1);
            std::mem::swap(&mut best.p0, &mut best.p1);
            for index in best.indices.iter_mut() {
                *index = 15 - *index;
            }
        }

        let mut writer = BitWriter::new();
        writer.push(1 << 6, 7); // mode 6
        for c in 0..4 {
            writer.push(best.q0[c] as u64, 7);
            writer.push(best.q1[c] as u64, 7);
        }
        writer.push(best.p0 as u64, 1);
        writer.push(best.p1 as u64, 1);
        writer.push(best.indices[0] as u64, 3);
        for &index in &best.indices[1..] {
            writer.push(index as u64, 4);
        }
        out[..16].copy_from_slice(&writer.data);
    }
}

// ---------------------------------------------------------------------------------------
// BC6H mode 11: one subset, 10-bit absolute endpoints, 4-bit indices.
// ---------------------------------------------------------------------------------------

struct Bc6HKernel {
    signed: bool,
    rounds: u32,
}

/// Converts a float channel to the integer half domain the BC6H coder works in.
fn half_int(v: f32, signed: bool) -> i32 {
    let h = f16::from_f32(v);
    let bits = h.to_bits();
    if signed {
        let magnitude = (bits & 0x7FFF).min(0x7BFF) as i32;
        if bits & 0x8000 != 0 {
            -magnitude
        } else {
            magnitude
        }
    } else {
        if bits & 0x8000 != 0 || h.is_nan() {
            0
        } else {
            (bits & 0x7FFF).min(0x7BFF) as i32
        }
    }
}

fn unquantize(q: i32, signed: bool) -> i32 {
    if signed {
        let sign = q < 0;
        let mag = q.unsigned_abs() as i32;
        let unq = if mag == 0 {
            0
        } else if mag >= 511 {
            0x7FFF
        } else {
            ((mag << 15) + 0x4000) >> 9
        };
        if sign {
            -unq
        } else {
            unq
        }
    } else if q == 0 {
        0
    } else if q >= 1023 {
        0xFFFF
    } else {
        ((q << 16) + 0x8000) >> 10
    }
}

fn finish(unq: i32, signed: bool) -> i32 {
    if signed {
        let sign = unq < 0;
        let v = (unq.abs() * 31) >> 5;
        if sign {
            -v
        } else {
            v
        }
    } else {
        (unq * 31) >> 6
    }
}

/// Nearest 10-bit quantized endpoint for a target half-domain value.
fn quantize(target: i32, signed: bool) -> i32 {
    let (min_q, max_q) = if signed { (-511, 511) } else { (0, 1023) };
    let guess = if signed { target / 62 } else { target / 31 };
    let mut best = min_q;
    let mut best_dist = i64::MAX;
    for q in (guess - 2)..=(guess + 2) {
        let q = q.clamp(min_q, max_q);
        let d = (finish(unquantize(q, signed), signed) - target).abs() as i64;
        if d < best_dist {
            best_dist = d;
            best = q;
        }
    }
    best
}

fn bc6h_palette(q0: [i32; 3], q1: [i32; 3], signed: bool) -> [[i32; 3]; 16] {
    let mut palette = [[0i32; 3]; 16];
    let unq0 = [
        unquantize(q0[0], signed),
        unquantize(q0[1], signed),
        unquantize(q0[2], signed),
    ];
    let unq1 = [
        unquantize(q1[0], signed),
        unquantize(q1[1], signed),
        unquantize(q1[2], signed),
    ];
    for (k, w) in WEIGHTS16.iter().enumerate() {
        for c in 0..3 {
            let interp =
                (unq0[c] * (64 - *w as i32) + unq1[c] * *w as i32 + 32) >> 6;
            palette[k][c] = finish(interp, signed);
        }
    }
    palette
}

fn bc6h_assign(
    pixels: &[[i32; 3]; BLOCK_PIXELS],
    palette: &[[i32; 3]; 16],
) -> ([u8; BLOCK_PIXELS], u64) {
    let mut indices = [0u8; BLOCK_PIXELS];
    let mut error = 0u64;
    for (i, px) in pixels.iter().enumerate() {
        let mut best = u64::MAX;
        let mut best_index = 0u8;
        for (k, entry) in palette.iter().enumerate() {
            let mut dist = 0u64;
            for c in 0..3 {
                let d = (px[c] - entry[c]).unsigned_abs() as u64;
                dist += d * d;
            }
            if dist < best {
                best = dist;
                best_index = k as u8;
            }
        }
        indices[i] = best_index;
        error += best;
    }
    (indices, error)
}

impl BlockKernel for Bc6HKernel {
    fn compress(&self, colors: &[ColorRgbaF; BLOCK_PIXELS], out: &mut [u8]) {
        let mut pixels = [[0i32; 3]; BLOCK_PIXELS];
        for (dst, src) in pixels.iter_mut().zip(colors.iter()) {
            *dst = [
                half_int(src.r, self.signed),
                half_int(src.g, self.signed),
                half_int(src.b, self.signed),
            ];
        }

        let mut lo = [i32::MAX; 3];
        let mut hi = [i32::MIN; 3];
        for px in &pixels {
            for c in 0..3 {
                lo[c] = lo[c].min(px[c]);
                hi[c] = hi[c].max(px[c]);
            }
        }

        let mut q0 = [0i32; 3];
        let mut q1 = [0i32; 3];
        for c in 0..3 {
            q0[c] = quantize(lo[c], self.signed);
            q1[c] = quantize(hi[c], self.signed);
        }

        let palette = bc6h_palette(q0, q1, self.signed);
        let (mut indices, mut error) = bc6h_assign(&pixels, &palette);

        // Refinement: nudge both endpoints one quantization step in each direction.
        for _ in 0..self.rounds {
            let mut improved = false;
            for c in 0..3 {
                for (dq0, dq1) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
                    let mut t0 = q0;
                    let mut t1 = q1;
                    let (min_q, max_q) = if self.signed { (-511, 511) } else { (0, 1023) };
                    t0[c] = (t0[c] + dq0).clamp(min_q, max_q);
                    t1[c] = (t1[c] + dq1).clamp(min_q, max_q);
                    let palette = bc6h_palette(t0, t1, self.signed);
                    let (cand_indices, cand_error) = bc6h_assign(&pixels, &palette);
                    if cand_error < error {
                        q0 = t0;
                        q1 = t1;
                        indices = cand_indices;
                        error = cand_error;
                        improved = true;
                    }
                }
            }
            if !improved {
                break;
            }
        }

        // Anchor constraint: index 0 stores 3 bits.
        if indices[0] >= 8 {
            std::mem::swap(&mut q0, &mut q1);
            for index in indices.iter_mut() {
                *index = 15 - *index;
            }
        }

        let mut writer = BitWriter::new();
        writer.push(3, 5); // mode 11
        for &q in &q0 {
            writer.push((q as u32 & 0x3FF) as u64, 10);
        }
        for &q in &q1 {
            writer.push((q as u32 & 0x3FF) as u64, 10);
        }
        writer.push(indices[0] as u64, 3);
        for &index in &indices[1..] {
            writer.push(index as u64, 4);
        }
        out[..16].copy_from_slice(&writer.data);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn solid(r: f32, g: f32, b: f32, a: f32) -> [ColorRgbaF; BLOCK_PIXELS] {
        [ColorRgbaF { r, g, b, a }; BLOCK_PIXELS]
    }

    #[test]
    fn bc7_mode_bit_is_set() {
        let kernel = Bc7Kernel { weights: [1.0; 4], rounds: 2 };
        let mut out = [0u8; 16];
        kernel.compress(&solid(0.5, 0.25, 0.75, 1.0), &mut out);
        // Mode 6 = six zero bits then a one.
        assert_eq!(out[0] & 0x7F, 0x40);
    }

    #[test]
    fn bc7_solid_block_has_uniform_indices() {
        let kernel = Bc7Kernel { weights: [1.0; 4], rounds: 0 };
        let mut out = [0u8; 16];
        kernel.compress(&solid(1.0, 0.0, 0.0, 1.0), &mut out);
        assert_eq!(out[0] & 0x7F, 0x40);
    }

    #[test]
    fn bc6h_black_block_is_mode_11_zeros() {
        let kernel = Bc6HKernel { signed: false, rounds: 0 };
        let mut out = [0u8; 16];
        kernel.compress(&solid(0.0, 0.0, 0.0, 1.0), &mut out);
        // Mode field value 3 (0b00011) in the low bits, zero endpoints after it.
        assert_eq!(out[0], 0x03);
        assert!(out[1..16].iter().all(|&b| b == 0));
    }

    #[test]
    fn bc6h_signed_handles_negative_values() {
        let kernel = Bc6HKernel { signed: true, rounds: 1 };
        let mut out = [0u8; 16];
        kernel.compress(&solid(-1.0, 0.5, 0.0, 1.0), &mut out);
        assert_eq!(out[0] & 0x1F, 0x03);
    }

    #[test]
    fn half_domain_round_trip() {
        for target in [0, 100, 5000, 31000] {
            let q = quantize(target, false);
            let decoded = finish(unquantize(q, false), false);
            assert!((decoded - target).abs() <= 32, "{target} → {q} → {decoded}");
        }
        let q = quantize(-20000, true);
        assert!(q < 0);
    }
}
