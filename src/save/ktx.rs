//! KTX1 writer: identifier, endianness sentinel, the seven GL format fields, then per-mip
//! image sizes with depth → face payload ordering. Uncompressed rows pad to 4 bytes.

use super::write_u32;
use crate::error::SaveError;
use crate::texture::info::{block_size, block_width, Format, Type};
use crate::texture::{CubeFace, Dimension, Texture};
use crate::ColorSpace;
use std::io::Write;

const IDENTIFIER: [u8; 12] =
    [0xAB, b'K', b'T', b'X', b' ', b'1', b'1', 0xBB, b'\r', b'\n', 0x1A, b'\n'];
const ENDIANNESS: u32 = 0x04030201;

// GL enums used by the translation table.
const GL_BYTE: u32 = 0x1400;
const GL_UNSIGNED_BYTE: u32 = 0x1401;
const GL_SHORT: u32 = 0x1402;
const GL_UNSIGNED_SHORT: u32 = 0x1403;
const GL_INT: u32 = 0x1404;
const GL_UNSIGNED_INT: u32 = 0x1405;
const GL_FLOAT: u32 = 0x1406;
const GL_HALF_FLOAT: u32 = 0x140B;
const GL_RED: u32 = 0x1903;
const GL_RGB: u32 = 0x1907;
const GL_RGBA: u32 = 0x1908;
const GL_LUMINANCE: u32 = 0x1909;
const GL_LUMINANCE_ALPHA: u32 = 0x190A;
const GL_UNSIGNED_INT_8_8_8_8: u32 = 0x8035;
const GL_BGRA: u32 = 0x80E1;
const GL_UNSIGNED_SHORT_4_4_4_4: u32 = 0x8033;
const GL_UNSIGNED_SHORT_5_5_5_1: u32 = 0x8034;
const GL_RGBA4: u32 = 0x8056;
const GL_RGB5_A1: u32 = 0x8057;
const GL_RGB16: u32 = 0x8054;
const GL_RGBA16: u32 = 0x805B;
const GL_RGB8: u32 = 0x8051;
const GL_RGBA8: u32 = 0x8058;
const GL_RGB10_A2: u32 = 0x8059;
const GL_RG: u32 = 0x8227;
const GL_R8: u32 = 0x8229;
const GL_R16: u32 = 0x822A;
const GL_RG8: u32 = 0x822B;
const GL_RG16: u32 = 0x822C;
const GL_R16F: u32 = 0x822D;
const GL_R32F: u32 = 0x822E;
const GL_RG16F: u32 = 0x822F;
const GL_RG32F: u32 = 0x8230;
const GL_R8I: u32 = 0x8231;
const GL_R8UI: u32 = 0x8232;
const GL_R16I: u32 = 0x8233;
const GL_R16UI: u32 = 0x8234;
const GL_R32I: u32 = 0x8235;
const GL_R32UI: u32 = 0x8236;
const GL_RG8I: u32 = 0x8237;
const GL_RG8UI: u32 = 0x8238;
const GL_RG16I: u32 = 0x8239;
const GL_RG16UI: u32 = 0x823A;
const GL_RG32I: u32 = 0x823B;
const GL_RG32UI: u32 = 0x823C;
const GL_UNSIGNED_SHORT_5_6_5: u32 = 0x8363;
const GL_UNSIGNED_SHORT_5_6_5_REV: u32 = 0x8364;
const GL_UNSIGNED_SHORT_1_5_5_5_REV: u32 = 0x8366;
const GL_UNSIGNED_INT_8_8_8_8_REV: u32 = 0x8367;
const GL_UNSIGNED_INT_2_10_10_10_REV: u32 = 0x8368;
const GL_COMPRESSED_RGB_S3TC_DXT1_EXT: u32 = 0x83F0;
const GL_COMPRESSED_RGBA_S3TC_DXT1_EXT: u32 = 0x83F1;
const GL_COMPRESSED_RGBA_S3TC_DXT3_EXT: u32 = 0x83F2;
const GL_COMPRESSED_RGBA_S3TC_DXT5_EXT: u32 = 0x83F3;
const GL_RGBA32F: u32 = 0x8814;
const GL_RGB32F: u32 = 0x8815;
const GL_RGBA16F: u32 = 0x881A;
const GL_RGB16F: u32 = 0x881B;
const GL_COMPRESSED_SRGB_PVRTC_2BPPV1_EXT: u32 = 0x8A54;
const GL_COMPRESSED_SRGB_PVRTC_4BPPV1_EXT: u32 = 0x8A55;
const GL_COMPRESSED_SRGB_ALPHA_PVRTC_2BPPV1_EXT: u32 = 0x8A56;
const GL_COMPRESSED_SRGB_ALPHA_PVRTC_4BPPV1_EXT: u32 = 0x8A57;
const GL_COMPRESSED_RGB_PVRTC_4BPPV1_IMG: u32 = 0x8C00;
const GL_COMPRESSED_RGB_PVRTC_2BPPV1_IMG: u32 = 0x8C01;
const GL_COMPRESSED_RGBA_PVRTC_4BPPV1_IMG: u32 = 0x8C02;
const GL_COMPRESSED_RGBA_PVRTC_2BPPV1_IMG: u32 = 0x8C03;
const GL_R11F_G11F_B10F: u32 = 0x8C3A;
const GL_UNSIGNED_INT_10F_11F_11F_REV: u32 = 0x8C3B;
const GL_RGB9_E5: u32 = 0x8C3D;
const GL_UNSIGNED_INT_5_9_9_9_REV: u32 = 0x8C3E;
const GL_SRGB8: u32 = 0x8C41;
const GL_SRGB8_ALPHA8: u32 = 0x8C43;
const GL_COMPRESSED_SRGB_S3TC_DXT1_EXT: u32 = 0x8C4C;
const GL_COMPRESSED_SRGB_ALPHA_S3TC_DXT1_EXT: u32 = 0x8C4D;
const GL_COMPRESSED_SRGB_ALPHA_S3TC_DXT3_EXT: u32 = 0x8C4E;
const GL_COMPRESSED_SRGB_ALPHA_S3TC_DXT5_EXT: u32 = 0x8C4F;
const GL_RGB565: u32 = 0x8D62;
const GL_ETC1_RGB8_OES: u32 = 0x8D64;
const GL_RGBA32UI: u32 = 0x8D70;
const GL_RGB32UI: u32 = 0x8D71;
const GL_RGBA16UI: u32 = 0x8D76;
const GL_RGB16UI: u32 = 0x8D77;
const GL_RGBA8UI: u32 = 0x8D7C;
const GL_RGB8UI: u32 = 0x8D7D;
const GL_RGBA32I: u32 = 0x8D82;
const GL_RGB32I: u32 = 0x8D83;
const GL_RGBA16I: u32 = 0x8D88;
const GL_RGB16I: u32 = 0x8D89;
const GL_RGBA8I: u32 = 0x8D8E;
const GL_RGB8I: u32 = 0x8D8F;
const GL_RED_INTEGER: u32 = 0x8D94;
const GL_RGBA_INTEGER: u32 = 0x8D99;
const GL_BGRA_INTEGER: u32 = 0x8D9B;
const GL_COMPRESSED_RED_RGTC1: u32 = 0x8DBB;
const GL_COMPRESSED_SIGNED_RED_RGTC1: u32 = 0x8DBC;
const GL_COMPRESSED_RG_RGTC2: u32 = 0x8DBD;
const GL_COMPRESSED_SIGNED_RG_RGTC2: u32 = 0x8DBE;
const GL_COMPRESSED_RGBA_BPTC_UNORM: u32 = 0x8E8C;
const GL_COMPRESSED_SRGB_ALPHA_BPTC_UNORM: u32 = 0x8E8D;
const GL_COMPRESSED_RGB_BPTC_SIGNED_FLOAT: u32 = 0x8E8E;
const GL_COMPRESSED_RGB_BPTC_UNSIGNED_FLOAT: u32 = 0x8E8F;
const GL_R8_SNORM: u32 = 0x8F94;
const GL_RG8_SNORM: u32 = 0x8F95;
const GL_RGB8_SNORM: u32 = 0x8F96;
const GL_RGBA8_SNORM: u32 = 0x8F97;
const GL_R16_SNORM: u32 = 0x8F98;
const GL_RG16_SNORM: u32 = 0x8F99;
const GL_RGB16_SNORM: u32 = 0x8F9A;
const GL_RGBA16_SNORM: u32 = 0x8F9B;
const GL_RGB10_A2UI: u32 = 0x906F;
const GL_COMPRESSED_RGBA_PVRTC_2BPPV2_IMG: u32 = 0x9137;
const GL_COMPRESSED_RGBA_PVRTC_4BPPV2_IMG: u32 = 0x9138;
const GL_COMPRESSED_R11_EAC: u32 = 0x9270;
const GL_COMPRESSED_SIGNED_R11_EAC: u32 = 0x9271;
const GL_COMPRESSED_RG11_EAC: u32 = 0x9272;
const GL_COMPRESSED_SIGNED_RG11_EAC: u32 = 0x9273;
const GL_COMPRESSED_RGB8_ETC2: u32 = 0x9274;
const GL_COMPRESSED_SRGB8_ETC2: u32 = 0x9275;
const GL_COMPRESSED_RGB8_PUNCHTHROUGH_ALPHA1_ETC2: u32 = 0x9276;
const GL_COMPRESSED_SRGB8_PUNCHTHROUGH_ALPHA1_ETC2: u32 = 0x9277;
const GL_COMPRESSED_RGBA8_ETC2_EAC: u32 = 0x9278;
const GL_COMPRESSED_SRGB8_ALPHA8_ETC2_EAC: u32 = 0x9279;
const GL_COMPRESSED_RGBA_ASTC_4X4_KHR: u32 = 0x93B0;
const GL_COMPRESSED_SRGB8_ALPHA8_ASTC_4X4_KHR: u32 = 0x93D0;
const GL_COMPRESSED_SRGB_ALPHA_PVRTC_2BPPV2_IMG: u32 = 0x93F0;
const GL_COMPRESSED_SRGB_ALPHA_PVRTC_4BPPV2_IMG: u32 = 0x93F1;

struct FormatInfo {
    gl_type: u32,
    type_size: u32,
    format: u32,
    internal_format: u32,
    base_internal_format: u32,
}

fn compressed(internal_format: u32, base_internal_format: u32) -> FormatInfo {
    FormatInfo { gl_type: 0, type_size: 1, format: 0, internal_format, base_internal_format }
}

/// Offset of an ASTC footprint from its 4×4 enum; both the linear and sRGB ranges are laid
/// out in the same order.
fn astc_offset(format: Format) -> u32 {
    match format {
        Format::ASTC_4x4 => 0,
        Format::ASTC_5x4 => 1,
        Format::ASTC_5x5 => 2,
        Format::ASTC_6x5 => 3,
        Format::ASTC_6x6 => 4,
        Format::ASTC_8x5 => 5,
        Format::ASTC_8x6 => 6,
        Format::ASTC_8x8 => 7,
        Format::ASTC_10x5 => 8,
        Format::ASTC_10x6 => 9,
        Format::ASTC_10x8 => 10,
        Format::ASTC_10x10 => 11,
        Format::ASTC_12x10 => 12,
        _ => 13, // ASTC_12x12
    }
}

fn format_info(format: Format, ty: Type, color_space: ColorSpace) -> Option<FormatInfo> {
    use Format::*;
    use Type::*;
    let srgb = color_space == ColorSpace::Srgb;

    let info = match (format, ty) {
        (R4G4B4A4, UNorm) => FormatInfo {
            gl_type: GL_UNSIGNED_SHORT_4_4_4_4,
            type_size: 2,
            format: GL_RGBA,
            internal_format: GL_RGBA4,
            base_internal_format: GL_RGBA,
        },
        (B4G4R4A4, UNorm) => FormatInfo {
            gl_type: GL_UNSIGNED_SHORT_4_4_4_4,
            type_size: 2,
            format: GL_BGRA,
            internal_format: GL_RGBA4,
            base_internal_format: GL_BGRA,
        },
        (R5G6B5, UNorm) => FormatInfo {
            gl_type: GL_UNSIGNED_SHORT_5_6_5,
            type_size: 2,
            format: GL_RGB,
            internal_format: GL_RGB565,
            base_internal_format: GL_RGB,
        },
        (B5G6R5, UNorm) => FormatInfo {
            gl_type: GL_UNSIGNED_SHORT_5_6_5_REV,
            type_size: 2,
            format: GL_RGB,
            internal_format: GL_RGB565,
            base_internal_format: GL_RGB,
        },
        (R5G5B5A1, UNorm) => FormatInfo {
            gl_type: GL_UNSIGNED_SHORT_5_5_5_1,
            type_size: 2,
            format: GL_RGBA,
            internal_format: GL_RGB5_A1,
            base_internal_format: GL_RGBA,
        },
        (B5G5R5A1, UNorm) => FormatInfo {
            gl_type: GL_UNSIGNED_SHORT_5_5_5_1,
            type_size: 2,
            format: GL_BGRA,
            internal_format: GL_RGB5_A1,
            base_internal_format: GL_BGRA,
        },
        (A1R5G5B5, UNorm) => FormatInfo {
            gl_type: GL_UNSIGNED_SHORT_1_5_5_5_REV,
            type_size: 2,
            format: GL_BGRA,
            internal_format: GL_RGB5_A1,
            base_internal_format: GL_BGRA,
        },
        (R8, _) => FormatInfo {
            gl_type: match ty {
                UNorm | UInt => GL_UNSIGNED_BYTE,
                SNorm | Int => GL_BYTE,
                _ => return None,
            },
            type_size: 1,
            format: GL_RED,
            internal_format: match ty {
                UNorm => GL_R8,
                SNorm => GL_R8_SNORM,
                UInt => GL_R8UI,
                Int => GL_R8I,
                _ => return None,
            },
            base_internal_format: GL_LUMINANCE,
        },
        (R8G8, _) => FormatInfo {
            gl_type: GL_UNSIGNED_BYTE,
            type_size: 1,
            format: GL_RG,
            internal_format: match ty {
                UNorm => GL_RG8,
                SNorm => GL_RG8_SNORM,
                UInt => GL_RG8UI,
                Int => GL_RG8I,
                _ => return None,
            },
            base_internal_format: GL_LUMINANCE_ALPHA,
        },
        (R8G8B8, _) => FormatInfo {
            gl_type: match ty {
                UNorm | UInt => GL_UNSIGNED_BYTE,
                SNorm | Int => GL_BYTE,
                _ => return None,
            },
            type_size: 1,
            format: GL_RGB,
            internal_format: match ty {
                UNorm => {
                    if srgb {
                        GL_SRGB8
                    } else {
                        GL_RGB8
                    }
                }
                SNorm => GL_RGB8_SNORM,
                UInt => GL_RGB8UI,
                Int => GL_RGB8I,
                _ => return None,
            },
            base_internal_format: GL_RGB,
        },
        (R8G8B8A8, _) => FormatInfo {
            gl_type: match ty {
                UNorm | UInt => GL_UNSIGNED_BYTE,
                SNorm | Int => GL_BYTE,
                _ => return None,
            },
            type_size: 1,
            format: match ty {
                UNorm | SNorm => GL_RGBA,
                UInt | Int => GL_RGBA_INTEGER,
                _ => return None,
            },
            internal_format: match ty {
                UNorm => {
                    if srgb {
                        GL_SRGB8_ALPHA8
                    } else {
                        GL_RGBA8
                    }
                }
                SNorm => GL_RGBA8_SNORM,
                UInt => GL_RGBA8UI,
                Int => GL_RGBA8I,
                _ => return None,
            },
            base_internal_format: GL_RGBA,
        },
        (B8G8R8A8, _) => FormatInfo {
            gl_type: GL_UNSIGNED_INT_8_8_8_8,
            type_size: 4,
            format: match ty {
                UNorm | SNorm | Int => GL_BGRA,
                UInt => GL_BGRA_INTEGER,
                _ => return None,
            },
            internal_format: match ty {
                UNorm => {
                    if srgb {
                        GL_SRGB8_ALPHA8
                    } else {
                        GL_RGBA8
                    }
                }
                SNorm => GL_RGBA8_SNORM,
                UInt => GL_RGBA8UI,
                Int => GL_RGBA8I,
                _ => return None,
            },
            base_internal_format: GL_BGRA,
        },
        (A8B8G8R8, _) => FormatInfo {
            gl_type: GL_UNSIGNED_INT_8_8_8_8_REV,
            type_size: 4,
            format: match ty {
                UNorm | SNorm => GL_RGBA,
                UInt | Int => GL_RGBA_INTEGER,
                _ => return None,
            },
            internal_format: match ty {
                UNorm => {
                    if srgb {
                        GL_SRGB8_ALPHA8
                    } else {
                        GL_RGBA8
                    }
                }
                SNorm => GL_RGBA8_SNORM,
                UInt => GL_RGBA8UI,
                Int => GL_RGBA8I,
                _ => return None,
            },
            base_internal_format: GL_RGBA,
        },
        (A2R10G10B10, UNorm | UInt) => FormatInfo {
            gl_type: GL_UNSIGNED_INT_2_10_10_10_REV,
            type_size: 4,
            format: if ty == UNorm { GL_BGRA } else { GL_BGRA_INTEGER },
            internal_format: if ty == UNorm { GL_RGB10_A2 } else { GL_RGB10_A2UI },
            base_internal_format: GL_BGRA,
        },
        (A2B10G10R10, UNorm | UInt) => FormatInfo {
            gl_type: GL_UNSIGNED_INT_2_10_10_10_REV,
            type_size: 4,
            format: if ty == UNorm { GL_RGBA } else { GL_RGBA_INTEGER },
            internal_format: if ty == UNorm { GL_RGB10_A2 } else { GL_RGB10_A2UI },
            base_internal_format: GL_RGBA,
        },
        (R16, _) => FormatInfo {
            gl_type: match ty {
                UNorm | UInt => GL_UNSIGNED_SHORT,
                SNorm | Int => GL_SHORT,
                Float => GL_HALF_FLOAT,
                _ => return None,
            },
            type_size: 2,
            format: GL_RED,
            internal_format: match ty {
                UNorm => GL_R16,
                SNorm => GL_R16_SNORM,
                UInt => GL_R16UI,
                Int => GL_R16I,
                Float => GL_R16F,
                _ => return None,
            },
            base_internal_format: GL_LUMINANCE,
        },
        (R16G16, _) => FormatInfo {
            gl_type: match ty {
                UNorm | UInt => GL_UNSIGNED_SHORT,
                SNorm | Int => GL_SHORT,
                Float => GL_HALF_FLOAT,
                _ => return None,
            },
            type_size: 2,
            format: GL_RG,
            internal_format: match ty {
                UNorm => GL_RG16,
                SNorm => GL_RG16_SNORM,
                UInt => GL_RG16UI,
                Int => GL_RG16I,
                Float => GL_RG16F,
                _ => return None,
            },
            base_internal_format: GL_LUMINANCE_ALPHA,
        },
        (R16G16B16, _) => FormatInfo {
            gl_type: match ty {
                UNorm | UInt => GL_UNSIGNED_SHORT,
                SNorm | Int => GL_SHORT,
                Float => GL_HALF_FLOAT,
                _ => return None,
            },
            type_size: 2,
            format: GL_RGB,
            internal_format: match ty {
                UNorm => GL_RGB16,
                SNorm => GL_RGB16_SNORM,
                UInt => GL_RGB16UI,
                Int => GL_RGB16I,
                Float => GL_RGB16F,
                _ => return None,
            },
            base_internal_format: GL_RGB,
        },
        (R16G16B16A16, _) => FormatInfo {
            gl_type: match ty {
                UNorm | UInt => GL_UNSIGNED_SHORT,
                SNorm | Int => GL_SHORT,
                Float => GL_HALF_FLOAT,
                _ => return None,
            },
            type_size: 2,
            format: GL_RGBA,
            internal_format: match ty {
                UNorm => GL_RGBA16,
                SNorm => GL_RGBA16_SNORM,
                UInt => GL_RGBA16UI,
                Int => GL_RGBA16I,
                Float => GL_RGBA16F,
                _ => return None,
            },
            base_internal_format: GL_RGBA,
        },
        (R32, UInt | Int | Float) => FormatInfo {
            gl_type: match ty {
                UInt => GL_UNSIGNED_INT,
                Int => GL_INT,
                _ => GL_FLOAT,
            },
            type_size: 4,
            format: GL_RED,
            internal_format: match ty {
                UInt => GL_R32UI,
                Int => GL_R32I,
                _ => GL_R32F,
            },
            base_internal_format: GL_LUMINANCE,
        },
        (R32G32, UInt | Int | Float) => FormatInfo {
            gl_type: match ty {
                UInt => GL_UNSIGNED_INT,
                Int => GL_INT,
                _ => GL_FLOAT,
            },
            type_size: 4,
            format: GL_RG,
            internal_format: match ty {
                UInt => GL_RG32UI,
                Int => GL_RG32I,
                _ => GL_RG32F,
            },
            base_internal_format: GL_LUMINANCE_ALPHA,
        },
        (R32G32B32, UInt | Int | Float) => FormatInfo {
            gl_type: match ty {
                UInt => GL_UNSIGNED_INT,
                Int => GL_INT,
                _ => GL_FLOAT,
            },
            type_size: 4,
            format: GL_RGB,
            internal_format: match ty {
                UInt => GL_RGB32UI,
                Int => GL_RGB32I,
                _ => GL_RGB32F,
            },
            base_internal_format: GL_RGB,
        },
        (R32G32B32A32, UInt | Int | Float) => FormatInfo {
            gl_type: match ty {
                UInt => GL_UNSIGNED_INT,
                Int => GL_INT,
                _ => GL_FLOAT,
            },
            type_size: 4,
            format: GL_RGBA,
            internal_format: match ty {
                UInt => GL_RGBA32UI,
                Int => GL_RGBA32I,
                _ => GL_RGBA32F,
            },
            base_internal_format: GL_RGBA,
        },
        (B10G11R11_UFloat, UFloat) => FormatInfo {
            gl_type: GL_UNSIGNED_INT_10F_11F_11F_REV,
            type_size: 4,
            format: GL_RGB,
            internal_format: GL_R11F_G11F_B10F,
            base_internal_format: GL_RGB,
        },
        (E5B9G9R9_UFloat, UFloat) => FormatInfo {
            gl_type: GL_UNSIGNED_INT_5_9_9_9_REV,
            type_size: 4,
            format: GL_RGB,
            internal_format: GL_RGB9_E5,
            base_internal_format: GL_RGB,
        },
        (BC1_RGB, UNorm) => compressed(
            if srgb { GL_COMPRESSED_SRGB_S3TC_DXT1_EXT } else { GL_COMPRESSED_RGB_S3TC_DXT1_EXT },
            GL_RGB,
        ),
        (BC1_RGBA, UNorm) => compressed(
            if srgb {
                GL_COMPRESSED_SRGB_ALPHA_S3TC_DXT1_EXT
            } else {
                GL_COMPRESSED_RGBA_S3TC_DXT1_EXT
            },
            GL_RGBA,
        ),
        (BC2, UNorm) => compressed(
            if srgb {
                GL_COMPRESSED_SRGB_ALPHA_S3TC_DXT3_EXT
            } else {
                GL_COMPRESSED_RGBA_S3TC_DXT3_EXT
            },
            GL_RGBA,
        ),
        (BC3, UNorm) => compressed(
            if srgb {
                GL_COMPRESSED_SRGB_ALPHA_S3TC_DXT5_EXT
            } else {
                GL_COMPRESSED_RGBA_S3TC_DXT5_EXT
            },
            GL_RGBA,
        ),
        (BC4, UNorm) => compressed(GL_COMPRESSED_RED_RGTC1, GL_RED),
        (BC4, SNorm) => compressed(GL_COMPRESSED_SIGNED_RED_RGTC1, GL_RED),
        (BC5, UNorm) => compressed(GL_COMPRESSED_RG_RGTC2, GL_RG),
        (BC5, SNorm) => compressed(GL_COMPRESSED_SIGNED_RG_RGTC2, GL_RG),
        (BC6H, UFloat) => compressed(GL_COMPRESSED_RGB_BPTC_UNSIGNED_FLOAT, GL_RGB),
        (BC6H, Float) => compressed(GL_COMPRESSED_RGB_BPTC_SIGNED_FLOAT, GL_RGB),
        (BC7, UNorm) => compressed(
            if srgb { GL_COMPRESSED_SRGB_ALPHA_BPTC_UNORM } else { GL_COMPRESSED_RGBA_BPTC_UNORM },
            GL_RGBA,
        ),
        (ETC1, UNorm) => compressed(GL_ETC1_RGB8_OES, GL_RGB),
        (ETC2_R8G8B8, UNorm) => compressed(
            if srgb { GL_COMPRESSED_SRGB8_ETC2 } else { GL_COMPRESSED_RGB8_ETC2 },
            GL_RGB,
        ),
        (ETC2_R8G8B8A1, UNorm) => compressed(
            if srgb {
                GL_COMPRESSED_SRGB8_PUNCHTHROUGH_ALPHA1_ETC2
            } else {
                GL_COMPRESSED_RGB8_PUNCHTHROUGH_ALPHA1_ETC2
            },
            GL_RGBA,
        ),
        (ETC2_R8G8B8A8, UNorm) => compressed(
            if srgb { GL_COMPRESSED_SRGB8_ALPHA8_ETC2_EAC } else { GL_COMPRESSED_RGBA8_ETC2_EAC },
            GL_RGBA,
        ),
        (EAC_R11, UNorm) => compressed(GL_COMPRESSED_R11_EAC, GL_RED),
        (EAC_R11, SNorm) => compressed(GL_COMPRESSED_SIGNED_R11_EAC, GL_RED),
        (EAC_R11G11, UNorm) => compressed(GL_COMPRESSED_RG11_EAC, GL_RG),
        (EAC_R11G11, SNorm) => compressed(GL_COMPRESSED_SIGNED_RG11_EAC, GL_RG),
        (
            ASTC_4x4 | ASTC_5x4 | ASTC_5x5 | ASTC_6x5 | ASTC_6x6 | ASTC_8x5 | ASTC_8x6
            | ASTC_8x8 | ASTC_10x5 | ASTC_10x6 | ASTC_10x8 | ASTC_10x10 | ASTC_12x10
            | ASTC_12x12,
            UNorm | UFloat,
        ) => compressed(
            if srgb {
                GL_COMPRESSED_SRGB8_ALPHA8_ASTC_4X4_KHR + astc_offset(format)
            } else {
                GL_COMPRESSED_RGBA_ASTC_4X4_KHR + astc_offset(format)
            },
            GL_RGBA,
        ),
        (PVRTC1_RGB_2BPP, UNorm) => compressed(
            if srgb {
                GL_COMPRESSED_SRGB_PVRTC_2BPPV1_EXT
            } else {
                GL_COMPRESSED_RGB_PVRTC_2BPPV1_IMG
            },
            GL_RGB,
        ),
        (PVRTC1_RGBA_2BPP, UNorm) => compressed(
            if srgb {
                GL_COMPRESSED_SRGB_ALPHA_PVRTC_2BPPV1_EXT
            } else {
                GL_COMPRESSED_RGBA_PVRTC_2BPPV1_IMG
            },
            GL_RGBA,
        ),
        (PVRTC1_RGB_4BPP, UNorm) => compressed(
            if srgb {
                GL_COMPRESSED_SRGB_PVRTC_4BPPV1_EXT
            } else {
                GL_COMPRESSED_RGB_PVRTC_4BPPV1_IMG
            },
            GL_RGB,
        ),
        (PVRTC1_RGBA_4BPP, UNorm) => compressed(
            if srgb {
                GL_COMPRESSED_SRGB_ALPHA_PVRTC_4BPPV1_EXT
            } else {
                GL_COMPRESSED_RGBA_PVRTC_4BPPV1_IMG
            },
            GL_RGBA,
        ),
        (PVRTC2_RGBA_2BPP, UNorm) => compressed(
            if srgb {
                GL_COMPRESSED_SRGB_ALPHA_PVRTC_2BPPV2_IMG
            } else {
                GL_COMPRESSED_RGBA_PVRTC_2BPPV2_IMG
            },
            GL_RGBA,
        ),
        (PVRTC2_RGBA_4BPP, UNorm) => compressed(
            if srgb {
                GL_COMPRESSED_SRGB_ALPHA_PVRTC_4BPPV2_IMG
            } else {
                GL_COMPRESSED_RGBA_PVRTC_4BPPV2_IMG
            },
            GL_RGBA,
        ),
        _ => return None,
    };
    Some(info)
}

pub(crate) fn is_valid_for_ktx(format: Format, ty: Type) -> bool {
    format_info(format, ty, ColorSpace::Linear).is_some()
}

pub(crate) fn save_ktx(texture: &Texture, writer: &mut dyn Write) -> Result<(), SaveError> {
    let info = format_info(texture.format(), texture.texture_type(), texture.color_space())
        .ok_or(SaveError::Unsupported)?;

    writer.write_all(&IDENTIFIER)?;
    write_u32(writer, ENDIANNESS)?;
    write_u32(writer, info.gl_type)?;
    write_u32(writer, info.type_size)?;
    write_u32(writer, info.format)?;
    write_u32(writer, info.internal_format)?;
    write_u32(writer, info.base_internal_format)?;
    write_u32(writer, texture.width(0))?;
    write_u32(
        writer,
        if texture.dimension() == Dimension::Dim1D { 0 } else { texture.height(0) },
    )?;
    write_u32(
        writer,
        if texture.dimension() == Dimension::Dim3D { texture.depth(0) } else { 0 },
    )?;
    write_u32(writer, if texture.is_array() { texture.depth(0) } else { 0 })?;
    write_u32(writer, texture.face_count())?;
    write_u32(writer, texture.mip_level_count())?;
    write_u32(writer, 0)?; // bytes of key/value data

    let is_compressed = block_width(texture.format()) > 1;
    let format_size = block_size(texture.format());
    for level in 0..texture.mip_level_count() {
        // Uncompressed scanlines pad to 4 bytes; compressed payloads are already aligned.
        let mut image_size: u32 = 0;
        if is_compressed {
            for _ in 0..texture.depth(level) {
                image_size += texture.data_size(CubeFace::PosX, level, 0) as u32;
            }
        } else {
            for _ in 0..texture.depth(level) {
                image_size +=
                    (texture.width(level) * format_size).div_ceil(4) * 4 * texture.height(level);
            }
        }
        if texture.is_array() {
            image_size *= texture.face_count();
        }
        write_u32(writer, image_size)?;

        for depth in 0..texture.depth(level) {
            for face in 0..texture.face_count() {
                let face = CubeFace::from_index(face as usize);
                let data = texture.data(face, level, depth).ok_or(SaveError::Invalid)?;
                if is_compressed {
                    writer.write_all(data)?;
                } else {
                    let row_size = (texture.width(level) * format_size) as usize;
                    let padding = (4 - row_size % 4) % 4;
                    for row in data.chunks(row_size) {
                        writer.write_all(row)?;
                        writer.write_all(&[0, 0, 0][..padding])?;
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::color::ColorRgbaD;
    use crate::image::{Image, PixelFormat};
    use crate::texture::{Alpha, ColorMask, Quality};

    fn zero_texture(width: u32, height: u32, format: Format, ty: Type) -> Texture {
        let mut texture =
            Texture::new(Dimension::Dim2D, width, height, 0, 1, ColorSpace::Linear).unwrap();
        let mut image = Image::new(PixelFormat::RGBAF, width, height, ColorSpace::Linear).unwrap();
        for y in 0..height {
            for x in 0..width {
                image.set_pixel(x, y, &ColorRgbaD::default(), false).unwrap();
            }
        }
        texture.set_image(image, CubeFace::PosX, 0, 0).unwrap();
        texture
            .convert(format, ty, Quality::Normal, Alpha::Standard, ColorMask::default(), 1)
            .unwrap();
        texture
    }

    fn field(bytes: &[u8], index: usize) -> u32 {
        let offset = 12 + index * 4;
        u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn header_fields_for_rgba8() {
        let texture = zero_texture(16, 16, Format::R8G8B8A8, Type::UNorm);
        let mut out = Vec::new();
        save_ktx(&texture, &mut out).unwrap();

        assert_eq!(&out[..12], &IDENTIFIER);
        assert_eq!(field(&out, 0), ENDIANNESS);
        assert_eq!(field(&out, 1), GL_UNSIGNED_BYTE);
        assert_eq!(field(&out, 2), 1); // type size
        assert_eq!(field(&out, 3), GL_RGBA);
        assert_eq!(field(&out, 4), GL_RGBA8);
        assert_eq!(field(&out, 5), GL_RGBA);
        assert_eq!(field(&out, 6), 16); // width
        assert_eq!(field(&out, 7), 16); // height
        assert_eq!(field(&out, 8), 0); // depth
        assert_eq!(field(&out, 9), 0); // array elements
        assert_eq!(field(&out, 10), 1); // faces
        assert_eq!(field(&out, 11), 1); // mips
        assert_eq!(field(&out, 12), 0); // key/value bytes
        assert_eq!(field(&out, 13), 16 * 16 * 4); // image size
        assert_eq!(out.len(), 12 + 14 * 4 + 16 * 16 * 4);
    }

    #[test]
    fn odd_rows_pad_to_four_bytes() {
        let texture = zero_texture(3, 2, Format::R8G8B8, Type::UNorm);
        let mut out = Vec::new();
        save_ktx(&texture, &mut out).unwrap();
        // 3 pixels × 3 bytes = 9 → padded to 12 per row.
        assert_eq!(field(&out, 13), 12 * 2);
        assert_eq!(out.len(), 12 + 14 * 4 + 24);
    }

    #[test]
    fn compressed_image_size_is_payload_size() {
        let texture = zero_texture(16, 16, Format::BC1_RGB, Type::UNorm);
        let mut out = Vec::new();
        save_ktx(&texture, &mut out).unwrap();
        assert_eq!(field(&out, 4), GL_COMPRESSED_RGB_S3TC_DXT1_EXT);
        assert_eq!(field(&out, 13), 128);
    }

    #[test]
    fn r4g4_is_unsupported() {
        assert!(!is_valid_for_ktx(Format::R4G4, Type::UNorm));
        assert!(!is_valid_for_ktx(Format::A4R4G4B4, Type::UNorm));
        assert!(!is_valid_for_ktx(Format::B8G8R8, Type::UNorm));
        assert!(is_valid_for_ktx(Format::R4G4B4A4, Type::UNorm));
        assert!(is_valid_for_ktx(Format::ASTC_12x12, Type::UFloat));
    }
}
