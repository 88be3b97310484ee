//! Block encoders for the S3TC/RGTC family: BC1 (with and without 1-bit alpha), BC2, BC3,
//! BC4 and BC5, in unsigned and signed variants where the formats define them.
//!
//! Endpoints are found by principal-axis projection and tightened with least-squares
//! refinement; the quality preset controls the number of refinement rounds and, for the
//! alpha ramps, the endpoint search radius.

use super::{sample_block, Converter, EncodeSettings, OutputSlots, ThreadData};
use crate::color::ColorRgbaF;
use crate::image::Image;
use crate::texture::info::{Format, Quality, Type};
use crate::ColorSpace;

pub(crate) const BLOCK_DIM: u32 = 4;
pub(crate) const BLOCK_PIXELS: usize = 16;

/// Encodes a single 4×4 block of float RGBA into its compressed bit pattern.
pub(crate) trait BlockKernel: Sync {
    fn compress(&self, colors: &[ColorRgbaF; BLOCK_PIXELS], out: &mut [u8]);
}

/// Driver shared by every 4×4 block format: computes the job grid and samples edge-clamped
/// blocks for its kernel.
pub(crate) struct BlockConverter<'a, K> {
    image: &'a Image,
    block_size: usize,
    jobs_x: u32,
    jobs_y: u32,
    kernel: K,
}

impl<'a, K> BlockConverter<'a, K> {
    pub(crate) fn new(image: &'a Image, block_size: usize, kernel: K) -> Self {
        Self {
            image,
            block_size,
            jobs_x: image.width().div_ceil(BLOCK_DIM),
            jobs_y: image.height().div_ceil(BLOCK_DIM),
            kernel,
        }
    }
}

impl<K: BlockKernel> Converter for BlockConverter<'_, K> {
    fn jobs_x(&self) -> u32 {
        self.jobs_x
    }

    fn jobs_y(&self) -> u32 {
        self.jobs_y
    }

    fn data_size(&self) -> usize {
        self.jobs_x as usize * self.jobs_y as usize * self.block_size
    }

    fn process(&self, x: u32, y: u32, _thread_data: &mut dyn ThreadData, out: &OutputSlots) {
        let mut colors = [ColorRgbaF::default(); BLOCK_PIXELS];
        sample_block(self.image, x, y, BLOCK_DIM, BLOCK_DIM, &mut colors);

        let mut block = [0u8; 16];
        self.kernel.compress(&colors, &mut block[..self.block_size]);
        out.write((y * self.jobs_x + x) as usize * self.block_size, &block[..self.block_size]);
    }
}

pub(crate) fn create_converter<'a>(
    image: &'a Image,
    settings: &EncodeSettings,
) -> Option<Box<dyn Converter + 'a>> {
    let quality = settings.quality;
    match (settings.format, settings.ty) {
        (Format::BC1_RGB, Type::UNorm) => {
            Some(Box::new(BlockConverter::new(image, 8, Bc1Kernel { level: quality_level(quality) })))
        }
        (Format::BC1_RGBA, Type::UNorm) => Some(Box::new(BlockConverter::new(
            image,
            8,
            Bc1AKernel { level: quality_level(quality), weights: alpha_weights(settings) },
        ))),
        (Format::BC2, Type::UNorm) => {
            Some(Box::new(BlockConverter::new(image, 16, Bc2Kernel { level: quality_level(quality) })))
        }
        (Format::BC3, Type::UNorm) => Some(Box::new(BlockConverter::new(
            image,
            16,
            Bc3Kernel {
                level: quality_level(quality),
                hq: quality > Quality::Low,
                radius: search_radius(quality),
            },
        ))),
        (Format::BC4, Type::UNorm | Type::SNorm) => Some(Box::new(BlockConverter::new(
            image,
            8,
            Bc4Kernel {
                signed: settings.ty == Type::SNorm,
                hq: quality > Quality::Low,
                radius: search_radius(quality),
            },
        ))),
        (Format::BC5, Type::UNorm | Type::SNorm) => Some(Box::new(BlockConverter::new(
            image,
            16,
            Bc5Kernel {
                signed: settings.ty == Type::SNorm,
                hq: quality > Quality::Low,
                radius: search_radius(quality),
            },
        ))),
        _ => None,
    }
}

fn quality_level(quality: Quality) -> u32 {
    // Refinement level 0..18, matching the preset spread of the DXT-style encoders.
    18 * quality.level() / 4
}

fn search_radius(quality: Quality) -> i32 {
    match quality {
        Quality::Lowest | Quality::Low => 3,
        Quality::Normal => 5,
        Quality::High => 16,
        Quality::Highest => 32,
    }
}

/// Per-channel error weights for the alpha-preserving BC1 path: Rec.709 for sRGB sources,
/// uniform for linear, zero for masked-out channels.
fn alpha_weights(settings: &EncodeSettings) -> [f32; 3] {
    let srgb = settings.color_space == ColorSpace::Srgb;
    let base = if srgb { [0.2126, 0.7152, 0.0722] } else { [1.0, 1.0, 1.0] };
    [
        if settings.mask.r { base[0] } else { 0.0 },
        if settings.mask.g { base[1] } else { 0.0 },
        if settings.mask.b { base[2] } else { 0.0 },
    ]
}

pub(crate) fn to_color_block(colors: &[ColorRgbaF; BLOCK_PIXELS]) -> [[u8; 4]; BLOCK_PIXELS] {
    let mut out = [[0u8; 4]; BLOCK_PIXELS];
    for (dst, src) in out.iter_mut().zip(colors.iter()) {
        dst[0] = (src.r.clamp(0.0, 1.0) * 255.0).round() as u8;
        dst[1] = (src.g.clamp(0.0, 1.0) * 255.0).round() as u8;
        dst[2] = (src.b.clamp(0.0, 1.0) * 255.0).round() as u8;
        dst[3] = (src.a.clamp(0.0, 1.0) * 255.0).round() as u8;
    }
    out
}

fn quant565(c: [f32; 3]) -> u16 {
    let r = (c[0].clamp(0.0, 255.0) * 31.0 / 255.0).round() as u16;
    let g = (c[1].clamp(0.0, 255.0) * 63.0 / 255.0).round() as u16;
    let b = (c[2].clamp(0.0, 255.0) * 31.0 / 255.0).round() as u16;
    (r << 11) | (g << 5) | b
}

fn dequant565(c: u16) -> [f32; 3] {
    [
        ((c >> 11) & 0x1F) as f32 * (255.0 / 31.0),
        ((c >> 5) & 0x3F) as f32 * (255.0 / 63.0),
        (c & 0x1F) as f32 * (255.0 / 31.0),
    ]
}

fn weighted_dist(a: [f32; 3], b: [f32; 3], weights: [f32; 3]) -> f32 {
    let dr = a[0] - b[0];
    let dg = a[1] - b[1];
    let db = a[2] - b[2];
    weights[0] * dr * dr + weights[1] * dg * dg + weights[2] * db * db
}

/// Principal color axis by power iteration on the covariance matrix.
fn principal_axis(rgb: &[[f32; 3]], mean: [f32; 3]) -> [f32; 3] {
    let mut cov = [[0.0f32; 3]; 3];
    for c in rgb {
        let d = [c[0] - mean[0], c[1] - mean[1], c[2] - mean[2]];
        for i in 0..3 {
            for j in 0..3 {
                cov[i][j] += d[i] * d[j];
            }
        }
    }

    let mut axis = [1.0f32, 1.0, 1.0];
    for _ in 0..4 {
        let next = [
            cov[0][0] * axis[0] + cov[0][1] * axis[1] + cov[0][2] * axis[2],
            cov[1][0] * axis[0] + cov[1][1] * axis[1] + cov[1][2] * axis[2],
            cov[2][0] * axis[0] + cov[2][1] * axis[1] + cov[2][2] * axis[2],
        ];
        let len = (next[0] * next[0] + next[1] * next[1] + next[2] * next[2]).sqrt();
        if len < 1e-8 {
            return [1.0, 1.0, 1.0];
        }
        axis = [next[0] / len, next[1] / len, next[2] / len];
    }
    axis
}

#[derive(Copy, Clone, PartialEq)]
enum Bc1Mode {
    /// Decoder derives 3- vs 4-color mode from the endpoint ordering (BC1 proper).
    ThreeAllowed,
    /// Decoder always uses the 4-color palette (the color half of BC2/BC3).
    FourOnly,
}

struct Bc1Candidate {
    c0: u16,
    c1: u16,
    selectors: u32,
    error: f32,
}

/// Palette of a candidate and the interpolation fractions of each index (for the
/// least-squares solve). `None` marks the black index.
fn bc1_palette(c0: u16, c1: u16, mode: Bc1Mode) -> ([[f32; 3]; 4], [Option<f32>; 4]) {
    let a = dequant565(c0);
    let b = dequant565(c1);
    let four = mode == Bc1Mode::FourOnly || c0 > c1;
    if four {
        (
            [
                a,
                b,
                [
                    (2.0 * a[0] + b[0]) / 3.0,
                    (2.0 * a[1] + b[1]) / 3.0,
                    (2.0 * a[2] + b[2]) / 3.0,
                ],
                [
                    (a[0] + 2.0 * b[0]) / 3.0,
                    (a[1] + 2.0 * b[1]) / 3.0,
                    (a[2] + 2.0 * b[2]) / 3.0,
                ],
            ],
            [Some(0.0), Some(1.0), Some(1.0 / 3.0), Some(2.0 / 3.0)],
        )
    } else {
        (
            [
                a,
                b,
                [(a[0] + b[0]) * 0.5, (a[1] + b[1]) * 0.5, (a[2] + b[2]) * 0.5],
                [0.0, 0.0, 0.0],
            ],
            [Some(0.0), Some(1.0), Some(0.5), None],
        )
    }
}

fn evaluate_bc1(
    rgb: &[[f32; 3]; BLOCK_PIXELS],
    c0: u16,
    c1: u16,
    mode: Bc1Mode,
    use_black: bool,
    weights: [f32; 3],
) -> Bc1Candidate {
    let (palette, fractions) = bc1_palette(c0, c1, mode);
    let black_index = fractions.iter().position(|f| f.is_none());

    let mut selectors = 0u32;
    let mut error = 0.0f32;
    for (i, color) in rgb.iter().enumerate() {
        let mut best = f32::MAX;
        let mut best_index = 0;
        for (index, candidate) in palette.iter().enumerate() {
            if !use_black && Some(index) == black_index {
                continue;
            }
            let dist = weighted_dist(*color, *candidate, weights);
            if dist < best {
                best = dist;
                best_index = index;
            }
        }
        selectors |= (best_index as u32) << (i * 2);
        error += best;
    }

    Bc1Candidate { c0, c1, selectors, error }
}

/// Solves for the endpoints that minimize the squared error of the current selector
/// assignment. Pixels on the black index do not participate.
fn least_squares_endpoints(
    rgb: &[[f32; 3]; BLOCK_PIXELS],
    selectors: u32,
    fractions: &[Option<f32>; 4],
) -> Option<([f32; 3], [f32; 3])> {
    let mut alpha = 0.0f32;
    let mut beta = 0.0f32;
    let mut gamma = 0.0f32;
    let mut p = [0.0f32; 3];
    let mut q = [0.0f32; 3];

    for (i, color) in rgb.iter().enumerate() {
        let index = ((selectors >> (i * 2)) & 0x3) as usize;
        // Pixels on the black/transparent index carry no endpoint information.
        let Some(t) = fractions[index] else { continue };
        let s = 1.0 - t;
        alpha += s * s;
        beta += s * t;
        gamma += t * t;
        for c in 0..3 {
            p[c] += color[c] * s;
            q[c] += color[c] * t;
        }
    }

    let det = alpha * gamma - beta * beta;
    if det.abs() < 1e-6 {
        return None;
    }

    let mut e0 = [0.0f32; 3];
    let mut e1 = [0.0f32; 3];
    for c in 0..3 {
        e0[c] = (gamma * p[c] - beta * q[c]) / det;
        e1[c] = (alpha * q[c] - beta * p[c]) / det;
    }
    Some((e0, e1))
}

/// Least-squares refinement with mixed-index blocks; falls back gracefully when the solve
/// degenerates (all pixels on one index).
fn refine_bc1(
    rgb: &[[f32; 3]; BLOCK_PIXELS],
    best: &mut Bc1Candidate,
    mode: Bc1Mode,
    use_black: bool,
    weights: [f32; 3],
    rounds: u32,
) {
    for _ in 0..rounds {
        let (_, fractions) = bc1_palette(best.c0, best.c1, mode);
        let Some((e0, e1)) = least_squares_endpoints(rgb, best.selectors, &fractions) else {
            return;
        };
        let q0 = quant565(e0);
        let q1 = quant565(e1);

        let mut improved = false;
        for (c0, c1) in [(q0, q1), (q1, q0)] {
            let candidate = evaluate_bc1(rgb, c0, c1, mode, use_black, weights);
            if candidate.error < best.error {
                *best = candidate;
                improved = true;
            }
        }
        if !improved {
            return;
        }
    }
}

fn pack_bc1(candidate: &Bc1Candidate, out: &mut [u8]) {
    out[0..2].copy_from_slice(&candidate.c0.to_le_bytes());
    out[2..4].copy_from_slice(&candidate.c1.to_le_bytes());
    out[4..8].copy_from_slice(&candidate.selectors.to_le_bytes());
}

fn encode_bc1_color(
    colors: &[[u8; 4]; BLOCK_PIXELS],
    level: u32,
    mode: Bc1Mode,
    use_black: bool,
    weights: [f32; 3],
    out: &mut [u8],
) {
    let mut rgb = [[0.0f32; 3]; BLOCK_PIXELS];
    for (dst, src) in rgb.iter_mut().zip(colors.iter()) {
        *dst = [src[0] as f32, src[1] as f32, src[2] as f32];
    }

    // Solid blocks encode exactly: equal endpoints decode to palette entry 0 in every mode.
    if rgb.iter().all(|c| c == &rgb[0]) {
        let q = quant565(rgb[0]);
        pack_bc1(&Bc1Candidate { c0: q, c1: q, selectors: 0, error: 0.0 }, out);
        return;
    }

    let mut mean = [0.0f32; 3];
    for c in &rgb {
        for i in 0..3 {
            mean[i] += c[i];
        }
    }
    for m in &mut mean {
        *m /= BLOCK_PIXELS as f32;
    }

    let axis = principal_axis(&rgb, mean);
    let mut t_min = f32::MAX;
    let mut t_max = f32::MIN;
    for c in &rgb {
        let t = (c[0] - mean[0]) * axis[0] + (c[1] - mean[1]) * axis[1] + (c[2] - mean[2]) * axis[2];
        t_min = t_min.min(t);
        t_max = t_max.max(t);
    }
    let e0 = [
        mean[0] + axis[0] * t_max,
        mean[1] + axis[1] * t_max,
        mean[2] + axis[2] * t_max,
    ];
    let e1 = [
        mean[0] + axis[0] * t_min,
        mean[1] + axis[1] * t_min,
        mean[2] + axis[2] * t_min,
    ];
    let q0 = quant565(e0);
    let q1 = quant565(e1);

    let mut best = evaluate_bc1(&rgb, q0, q1, mode, use_black, weights);
    let swapped = evaluate_bc1(&rgb, q1, q0, mode, use_black, weights);
    if swapped.error < best.error {
        best = swapped;
    }

    let rounds = 1 + level / 4;
    refine_bc1(&rgb, &mut best, mode, use_black, weights, rounds);

    pack_bc1(&best, out);
}

/// The alpha-preserving BC1 path: 3-color mode with the transparent index reserved for
/// pixels below the alpha threshold.
fn encode_bc1_alpha(colors: &[ColorRgbaF; BLOCK_PIXELS], level: u32, weights: [f32; 3], out: &mut [u8]) {
    let block = to_color_block(colors);
    let mut rgb = [[0.0f32; 3]; BLOCK_PIXELS];
    let mut transparent = [false; BLOCK_PIXELS];
    let mut any_opaque = false;
    for i in 0..BLOCK_PIXELS {
        rgb[i] = [block[i][0] as f32, block[i][1] as f32, block[i][2] as f32];
        transparent[i] = colors[i].a < 0.5;
        any_opaque |= !transparent[i];
    }

    if !any_opaque {
        // Fully transparent: everything on the transparent index.
        let mut selectors = 0u32;
        for i in 0..BLOCK_PIXELS {
            selectors |= 3 << (i * 2);
        }
        pack_bc1(&Bc1Candidate { c0: 0, c1: 0, selectors, error: 0.0 }, out);
        return;
    }

    let opaque: Vec<[f32; 3]> =
        (0..BLOCK_PIXELS).filter(|&i| !transparent[i]).map(|i| rgb[i]).collect();
    let mut mean = [0.0f32; 3];
    for c in &opaque {
        for i in 0..3 {
            mean[i] += c[i];
        }
    }
    for m in &mut mean {
        *m /= opaque.len() as f32;
    }
    let axis = principal_axis(&opaque, mean);
    let mut t_min = f32::MAX;
    let mut t_max = f32::MIN;
    for c in &opaque {
        let t = (c[0] - mean[0]) * axis[0] + (c[1] - mean[1]) * axis[1] + (c[2] - mean[2]) * axis[2];
        t_min = t_min.min(t);
        t_max = t_max.max(t);
    }
    let lo = quant565([
        mean[0] + axis[0] * t_min,
        mean[1] + axis[1] * t_min,
        mean[2] + axis[2] * t_min,
    ]);
    let hi = quant565([
        mean[0] + axis[0] * t_max,
        mean[1] + axis[1] * t_max,
        mean[2] + axis[2] * t_max,
    ]);

    let evaluate = |c0: u16, c1: u16| -> Bc1Candidate {
        // The transparent mode requires c0 <= c1.
        let (c0, c1) = if c0 > c1 { (c1, c0) } else { (c0, c1) };
        let (palette, _) = bc1_palette(c0, c1, Bc1Mode::ThreeAllowed);
        let mut selectors = 0u32;
        let mut error = 0.0f32;
        for i in 0..BLOCK_PIXELS {
            if transparent[i] {
                selectors |= 3 << (i * 2);
                continue;
            }
            let mut best = f32::MAX;
            let mut best_index = 0;
            for (index, candidate) in palette.iter().take(3).enumerate() {
                let dist = weighted_dist(rgb[i], *candidate, weights);
                if dist < best {
                    best = dist;
                    best_index = index;
                }
            }
            selectors |= (best_index as u32) << (i * 2);
            error += best;
        }
        Bc1Candidate { c0, c1, selectors, error }
    };

    let mut best = evaluate(lo, hi);

    // A couple of least-squares rounds over the opaque pixels, scaled by quality.
    let fractions = [Some(0.0), Some(1.0), Some(0.5), None];
    for _ in 0..(1 + level / 4) {
        let Some((e0, e1)) = least_squares_endpoints(&rgb, best.selectors, &fractions) else {
            break;
        };
        let candidate = evaluate(quant565(e0), quant565(e1));
        if candidate.error < best.error {
            best = candidate;
        } else {
            break;
        }
    }

    pack_bc1(&best, out);
}

/// Quantizes alpha/channel values and packs a BC4-style 8-byte ramp block. Works in i32 so
/// the signed variant shares the search.
fn encode_alpha_block(values: &[i32; BLOCK_PIXELS], signed: bool, hq: bool, radius: i32, out: &mut [u8]) {
    let (min_v, max_v) = if signed { (-127, 127) } else { (0, 255) };
    let lo = *values.iter().min().unwrap();
    let hi = *values.iter().max().unwrap();

    let palette = |a0: i32, a1: i32| -> [i32; 8] {
        [
            a0,
            a1,
            (6 * a0 + a1) / 7,
            (5 * a0 + 2 * a1) / 7,
            (4 * a0 + 3 * a1) / 7,
            (3 * a0 + 4 * a1) / 7,
            (2 * a0 + 5 * a1) / 7,
            (a0 + 6 * a1) / 7,
        ]
    };

    let evaluate = |a0: i32, a1: i32| -> (u64, u64) {
        let pal = palette(a0, a1);
        let mut selectors = 0u64;
        let mut error = 0u64;
        for (i, &v) in values.iter().enumerate() {
            let mut best = u64::MAX;
            let mut best_index = 0u64;
            for (index, &p) in pal.iter().enumerate() {
                let d = (v - p).unsigned_abs() as u64;
                let d = d * d;
                if d < best {
                    best = d;
                    best_index = index as u64;
                }
            }
            selectors |= best_index << (i * 3);
            error += best;
        }
        (selectors, error)
    };

    let (mut best_a0, mut best_a1) = (hi, lo.max(min_v));
    if lo == hi {
        // Solid value: both endpoints carry it, every selector points at endpoint 0.
        let packed = pack_alpha_endpoint(lo, signed) as u64
            | ((pack_alpha_endpoint(lo, signed) as u64) << 8);
        out[..8].copy_from_slice(&packed.to_le_bytes());
        return;
    }

    let search = if hq { radius } else { 1 };
    let mut best_error = u64::MAX;
    let mut best_selectors = 0u64;
    for da in -search..=search {
        let a0 = (hi + da).clamp(min_v, max_v);
        for db in -search..=search {
            let a1 = (lo + db).clamp(min_v, max_v);
            if a0 <= a1 {
                continue;
            }
            let (selectors, error) = evaluate(a0, a1);
            if error < best_error {
                best_error = error;
                best_selectors = selectors;
                best_a0 = a0;
                best_a1 = a1;
            }
        }
    }

    let packed = pack_alpha_endpoint(best_a0, signed) as u64
        | ((pack_alpha_endpoint(best_a1, signed) as u64) << 8)
        | (best_selectors << 16);
    out[..8].copy_from_slice(&packed.to_le_bytes());
}

fn pack_alpha_endpoint(v: i32, signed: bool) -> u8 {
    if signed {
        (v as i8) as u8
    } else {
        v as u8
    }
}

fn unorm_ramp_values(colors: &[ColorRgbaF; BLOCK_PIXELS], channel: usize) -> [i32; BLOCK_PIXELS] {
    let mut values = [0i32; BLOCK_PIXELS];
    for (dst, src) in values.iter_mut().zip(colors.iter()) {
        let v = [src.r, src.g, src.b, src.a][channel];
        *dst = (v.clamp(0.0, 1.0) * 255.0).round() as i32;
    }
    values
}

fn snorm_ramp_values(colors: &[ColorRgbaF; BLOCK_PIXELS], channel: usize) -> [i32; BLOCK_PIXELS] {
    let mut values = [0i32; BLOCK_PIXELS];
    for (dst, src) in values.iter_mut().zip(colors.iter()) {
        let v = [src.r, src.g, src.b, src.a][channel];
        *dst = (v.clamp(-1.0, 1.0) * 127.0).round() as i32;
    }
    values
}

struct Bc1Kernel {
    level: u32,
}

impl BlockKernel for Bc1Kernel {
    fn compress(&self, colors: &[ColorRgbaF; BLOCK_PIXELS], out: &mut [u8]) {
        // Alpha is ignored, so the black entry of 3-color mode is freely usable.
        let block = to_color_block(colors);
        encode_bc1_color(&block, self.level, Bc1Mode::ThreeAllowed, true, [1.0, 1.0, 1.0], out);
    }
}

struct Bc1AKernel {
    level: u32,
    weights: [f32; 3],
}

impl BlockKernel for Bc1AKernel {
    fn compress(&self, colors: &[ColorRgbaF; BLOCK_PIXELS], out: &mut [u8]) {
        let has_alpha = colors.iter().any(|c| c.a < 0.5);
        if has_alpha {
            encode_bc1_alpha(colors, self.level, self.weights, out);
        } else {
            // 3-color mode stays available, but black would decode as transparent.
            let block = to_color_block(colors);
            encode_bc1_color(&block, self.level, Bc1Mode::ThreeAllowed, false, [1.0, 1.0, 1.0], out);
        }
    }
}

struct Bc2Kernel {
    level: u32,
}

impl BlockKernel for Bc2Kernel {
    fn compress(&self, colors: &[ColorRgbaF; BLOCK_PIXELS], out: &mut [u8]) {
        let block = to_color_block(colors);

        // 4-bit alpha prefix, two pixels per byte, low nibble first.
        let alpha_scale = 15.0 / 255.0;
        for i in 0..BLOCK_PIXELS / 2 {
            let a0 = (block[i * 2][3] as f32 * alpha_scale).round() as u8;
            let a1 = (block[i * 2 + 1][3] as f32 * alpha_scale).round() as u8;
            out[i] = a0 | (a1 << 4);
        }

        // BC2 decoders only have 4-color mode.
        encode_bc1_color(&block, self.level, Bc1Mode::FourOnly, false, [1.0, 1.0, 1.0], &mut out[8..16]);
    }
}

struct Bc3Kernel {
    level: u32,
    hq: bool,
    radius: i32,
}

impl BlockKernel for Bc3Kernel {
    fn compress(&self, colors: &[ColorRgbaF; BLOCK_PIXELS], out: &mut [u8]) {
        let alpha = unorm_ramp_values(colors, 3);
        encode_alpha_block(&alpha, false, self.hq, self.radius, &mut out[..8]);

        let block = to_color_block(colors);
        encode_bc1_color(&block, self.level, Bc1Mode::FourOnly, false, [1.0, 1.0, 1.0], &mut out[8..16]);
    }
}

struct Bc4Kernel {
    signed: bool,
    hq: bool,
    radius: i32,
}

impl BlockKernel for Bc4Kernel {
    fn compress(&self, colors: &[ColorRgbaF; BLOCK_PIXELS], out: &mut [u8]) {
        let values = if self.signed {
            snorm_ramp_values(colors, 0)
        } else {
            unorm_ramp_values(colors, 0)
        };
        encode_alpha_block(&values, self.signed, self.hq, self.radius, out);
    }
}

struct Bc5Kernel {
    signed: bool,
    hq: bool,
    radius: i32,
}

impl BlockKernel for Bc5Kernel {
    fn compress(&self, colors: &[ColorRgbaF; BLOCK_PIXELS], out: &mut [u8]) {
        for (channel, range) in [(0usize, 0..8), (1, 8..16)] {
            let values = if self.signed {
                snorm_ramp_values(colors, channel)
            } else {
                unorm_ramp_values(colors, channel)
            };
            encode_alpha_block(&values, self.signed, self.hq, self.radius, &mut out[range]);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn solid_block(r: f32, g: f32, b: f32, a: f32) -> [ColorRgbaF; BLOCK_PIXELS] {
        [ColorRgbaF { r, g, b, a }; BLOCK_PIXELS]
    }

    #[test]
    fn bc1_solid_block_is_exact() {
        let colors = solid_block(1.0, 0.0, 0.0, 1.0);
        let kernel = Bc1Kernel { level: 9 };
        let mut out = [0u8; 8];
        kernel.compress(&colors, &mut out);

        let c0 = u16::from_le_bytes([out[0], out[1]]);
        let c1 = u16::from_le_bytes([out[2], out[3]]);
        assert_eq!(c0, 0x1F << 11);
        assert_eq!(c0, c1);
        assert_eq!(&out[4..8], &[0, 0, 0, 0]);
    }

    #[test]
    fn bc1a_transparent_pixels_use_index_3() {
        let mut colors = solid_block(0.5, 0.5, 0.5, 1.0);
        colors[5].a = 0.0;
        let kernel = Bc1AKernel { level: 9, weights: [1.0, 1.0, 1.0] };
        let mut out = [0u8; 8];
        kernel.compress(&colors, &mut out);

        let c0 = u16::from_le_bytes([out[0], out[1]]);
        let c1 = u16::from_le_bytes([out[2], out[3]]);
        assert!(c0 <= c1, "alpha blocks must use 3-color ordering");
        let selectors = u32::from_le_bytes([out[4], out[5], out[6], out[7]]);
        assert_eq!((selectors >> (5 * 2)) & 0x3, 3);
        assert_ne!((selectors >> (4 * 2)) & 0x3, 3);
    }

    #[test]
    fn bc2_alpha_nibbles() {
        let mut colors = solid_block(0.0, 0.0, 0.0, 1.0);
        colors[0].a = 0.0;
        colors[1].a = 1.0;
        let kernel = Bc2Kernel { level: 0 };
        let mut out = [0u8; 16];
        kernel.compress(&colors, &mut out);
        assert_eq!(out[0], 0xF0);
        assert_eq!(out[1], 0xFF);
    }

    #[test]
    fn bc4_solid_value() {
        let colors = solid_block(0.5, 0.0, 0.0, 1.0);
        let kernel = Bc4Kernel { signed: false, hq: true, radius: 5 };
        let mut out = [0u8; 8];
        kernel.compress(&colors, &mut out);
        assert_eq!(out[0], 128);
        assert_eq!(out[1], 128);
        assert_eq!(&out[2..8], &[0u8; 6]);
    }

    #[test]
    fn bc4_signed_endpoints() {
        let mut colors = solid_block(-1.0, 0.0, 0.0, 1.0);
        colors[3].r = 1.0;
        let kernel = Bc4Kernel { signed: true, hq: false, radius: 3 };
        let mut out = [0u8; 8];
        kernel.compress(&colors, &mut out);
        let a0 = out[0] as i8;
        let a1 = out[1] as i8;
        assert!(a0 > a1);
        assert!(a0 >= 126);
        assert!(a1 <= -126);
    }

    #[test]
    fn bc5_packs_two_channels() {
        let colors = solid_block(0.25, 0.75, 0.0, 1.0);
        let kernel = Bc5Kernel { signed: false, hq: false, radius: 3 };
        let mut out = [0u8; 16];
        kernel.compress(&colors, &mut out);
        assert_eq!(out[0], 64);
        assert_eq!(out[8], 191);
    }

    #[test]
    fn bc1_two_color_block_recovers_endpoints() {
        let mut colors = solid_block(0.0, 0.0, 0.0, 1.0);
        for c in colors.iter_mut().take(8) {
            c.r = 1.0;
            c.g = 1.0;
            c.b = 1.0;
        }
        let kernel = Bc1Kernel { level: 18 };
        let mut out = [0u8; 8];
        kernel.compress(&colors, &mut out);
        let c0 = u16::from_le_bytes([out[0], out[1]]);
        let c1 = u16::from_le_bytes([out[2], out[3]]);
        let endpoints = [c0, c1];
        assert!(endpoints.contains(&0xFFFF));
        assert!(endpoints.contains(&0x0000));
    }
}
