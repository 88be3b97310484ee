//! DDS writer: 124-byte legacy header with a DX10 extension block, DXGI format selection
//! and element → face → mip → slice payload ordering.

use super::{fourcc, write_u32};
use crate::error::SaveError;
use crate::texture::info::{block_size, block_width, has_alpha, Alpha, Format, Type};
use crate::texture::{CubeFace, Dimension, Texture};
use crate::ColorSpace;
use bitflags::bitflags;
use std::io::Write;

const MAGIC: u32 = 0x20534444; // "DDS "

bitflags! {
    struct DdsFlags: u32 {
        const CAPS = 0x1;
        const HEIGHT = 0x2;
        const WIDTH = 0x4;
        const PITCH = 0x8;
        const PIXEL_FORMAT = 0x1000;
        const MIPMAP_COUNT = 0x20000;
        const DEPTH = 0x800000;
    }
}

bitflags! {
    struct DdsFormatFlags: u32 {
        const FOURCC = 0x4;
    }
}

bitflags! {
    struct DdsCaps: u32 {
        const COMPLEX = 0x8;
        const MIPMAP = 0x400000;
        const TEXTURE = 0x1000;
    }
}

bitflags! {
    struct DdsCaps2: u32 {
        const CUBE = 0x200;
        const POS_X = 0x400;
        const NEG_X = 0x800;
        const POS_Y = 0x1000;
        const NEG_Y = 0x2000;
        const POS_Z = 0x4000;
        const NEG_Z = 0x8000;
        const VOLUME = 0x200000;
    }
}

// Resource dimensions of the DX10 header.
const DDS_TEXTURE_1D: u32 = 2;
const DDS_TEXTURE_2D: u32 = 3;
const DDS_TEXTURE_3D: u32 = 4;

const DDS_MISC_CUBEMAP: u32 = 0x4;

const DDS_ALPHA_MODE_STRAIGHT: u32 = 1;
const DDS_ALPHA_MODE_PREMULTIPLIED: u32 = 2;
const DDS_ALPHA_MODE_OPAQUE: u32 = 3;
const DDS_ALPHA_MODE_CUSTOM: u32 = 4;

/// DXGI format indices, reproduced exactly as DirectX defines them.
#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(u32)]
#[allow(non_camel_case_types, dead_code, clippy::upper_case_acronyms)]
enum DxgiFormat {
    UNKNOWN = 0,
    R32G32B32A32_FLOAT = 2,
    R32G32B32A32_UINT = 3,
    R32G32B32A32_SINT = 4,
    R32G32B32_FLOAT = 6,
    R32G32B32_UINT = 7,
    R32G32B32_SINT = 8,
    R16G16B16A16_FLOAT = 10,
    R16G16B16A16_UNORM = 11,
    R16G16B16A16_UINT = 12,
    R16G16B16A16_SNORM = 13,
    R16G16B16A16_SINT = 14,
    R32G32_FLOAT = 16,
    R32G32_UINT = 17,
    R32G32_SINT = 18,
    R10G10B10A2_UNORM = 24,
    R10G10B10A2_UINT = 25,
    R11G11B10_FLOAT = 26,
    R8G8B8A8_UNORM = 28,
    R8G8B8A8_UNORM_SRGB = 29,
    R8G8B8A8_UINT = 30,
    R8G8B8A8_SNORM = 31,
    R8G8B8A8_SINT = 32,
    R16G16_FLOAT = 34,
    R16G16_UNORM = 35,
    R16G16_UINT = 36,
    R16G16_SNORM = 37,
    R16G16_SINT = 38,
    R32_FLOAT = 41,
    R32_UINT = 42,
    R32_SINT = 43,
    R8G8_UNORM = 49,
    R8G8_UINT = 50,
    R8G8_SNORM = 51,
    R8G8_SINT = 52,
    R16_FLOAT = 54,
    R16_UNORM = 56,
    R16_UINT = 57,
    R16_SNORM = 58,
    R16_SINT = 59,
    R8_UNORM = 61,
    R8_UINT = 62,
    R8_SNORM = 63,
    R8_SINT = 64,
    R9G9B9E5_SHAREDEXP = 67,
    BC1_UNORM = 71,
    BC1_UNORM_SRGB = 72,
    BC2_UNORM = 74,
    BC2_UNORM_SRGB = 75,
    BC3_UNORM = 77,
    BC3_UNORM_SRGB = 78,
    BC4_UNORM = 80,
    BC4_SNORM = 81,
    BC5_UNORM = 83,
    BC5_SNORM = 84,
    B5G6R5_UNORM = 85,
    B5G5R5A1_UNORM = 86,
    B8G8R8A8_UNORM = 87,
    B8G8R8A8_UNORM_SRGB = 91,
    BC6H_UF16 = 95,
    BC6H_SF16 = 96,
    BC7_UNORM = 98,
    BC7_UNORM_SRGB = 99,
    IA44 = 112,
    B4G4R4A4_UNORM = 115,
}

/// Translates (format, type, color space) to the DXGI format index; `UNKNOWN` for pairs
/// DirectX cannot express.
fn dds_format(format: Format, ty: Type, color_space: ColorSpace) -> DxgiFormat {
    use DxgiFormat::*;
    let srgb = color_space == ColorSpace::Srgb;
    match format {
        // DDS has no R4G4 format; the original tool files it under IA44.
        Format::R4G4 if ty == Type::UNorm => IA44,
        Format::A4R4G4B4 if ty == Type::UNorm => B4G4R4A4_UNORM,
        Format::R5G6B5 if ty == Type::UNorm => B5G6R5_UNORM,
        Format::A1R5G5B5 if ty == Type::UNorm => B5G5R5A1_UNORM,
        Format::R8 => match ty {
            Type::UNorm => R8_UNORM,
            Type::SNorm => R8_SNORM,
            Type::UInt => R8_UINT,
            Type::Int => R8_SINT,
            _ => UNKNOWN,
        },
        Format::R8G8 => match ty {
            Type::UNorm => R8G8_UNORM,
            Type::SNorm => R8G8_SNORM,
            Type::UInt => R8G8_UINT,
            Type::Int => R8G8_SINT,
            _ => UNKNOWN,
        },
        Format::R8G8B8A8 => match ty {
            Type::UNorm => {
                if srgb {
                    R8G8B8A8_UNORM_SRGB
                } else {
                    R8G8B8A8_UNORM
                }
            }
            Type::SNorm => R8G8B8A8_SNORM,
            Type::UInt => R8G8B8A8_UINT,
            Type::Int => R8G8B8A8_SINT,
            _ => UNKNOWN,
        },
        Format::B8G8R8A8 if ty == Type::UNorm => {
            if srgb {
                B8G8R8A8_UNORM_SRGB
            } else {
                B8G8R8A8_UNORM
            }
        }
        Format::A2B10G10R10 => match ty {
            Type::UNorm => R10G10B10A2_UNORM,
            Type::UInt => R10G10B10A2_UINT,
            _ => UNKNOWN,
        },
        Format::R16 => match ty {
            Type::UNorm => R16_UNORM,
            Type::SNorm => R16_SNORM,
            Type::UInt => R16_UINT,
            Type::Int => R16_SINT,
            Type::Float => R16_FLOAT,
            _ => UNKNOWN,
        },
        Format::R16G16 => match ty {
            Type::UNorm => R16G16_UNORM,
            Type::SNorm => R16G16_SNORM,
            Type::UInt => R16G16_UINT,
            Type::Int => R16G16_SINT,
            Type::Float => R16G16_FLOAT,
            _ => UNKNOWN,
        },
        Format::R16G16B16A16 => match ty {
            Type::UNorm => R16G16B16A16_UNORM,
            Type::SNorm => R16G16B16A16_SNORM,
            Type::UInt => R16G16B16A16_UINT,
            Type::Int => R16G16B16A16_SINT,
            Type::Float => R16G16B16A16_FLOAT,
            _ => UNKNOWN,
        },
        Format::R32 => match ty {
            Type::UInt => R32_UINT,
            Type::Int => R32_SINT,
            Type::Float => R32_FLOAT,
            _ => UNKNOWN,
        },
        Format::R32G32 => match ty {
            Type::UInt => R32G32_UINT,
            Type::Int => R32G32_SINT,
            Type::Float => R32G32_FLOAT,
            _ => UNKNOWN,
        },
        Format::R32G32B32 => match ty {
            Type::UInt => R32G32B32_UINT,
            Type::Int => R32G32B32_SINT,
            Type::Float => R32G32B32_FLOAT,
            _ => UNKNOWN,
        },
        Format::R32G32B32A32 => match ty {
            Type::UInt => R32G32B32A32_UINT,
            Type::Int => R32G32B32A32_SINT,
            Type::Float => R32G32B32A32_FLOAT,
            _ => UNKNOWN,
        },
        Format::B10G11R11_UFloat if ty == Type::UFloat => R11G11B10_FLOAT,
        Format::E5B9G9R9_UFloat if ty == Type::UFloat => R9G9B9E5_SHAREDEXP,
        Format::BC1_RGB | Format::BC1_RGBA if ty == Type::UNorm => {
            if srgb {
                BC1_UNORM_SRGB
            } else {
                BC1_UNORM
            }
        }
        Format::BC2 if ty == Type::UNorm => {
            if srgb {
                BC2_UNORM_SRGB
            } else {
                BC2_UNORM
            }
        }
        Format::BC3 if ty == Type::UNorm => {
            if srgb {
                BC3_UNORM_SRGB
            } else {
                BC3_UNORM
            }
        }
        Format::BC4 => match ty {
            Type::UNorm => BC4_UNORM,
            Type::SNorm => BC4_SNORM,
            _ => UNKNOWN,
        },
        Format::BC5 => match ty {
            Type::UNorm => BC5_UNORM,
            Type::SNorm => BC5_SNORM,
            _ => UNKNOWN,
        },
        Format::BC6H => match ty {
            Type::UFloat => BC6H_UF16,
            Type::Float => BC6H_SF16,
            _ => UNKNOWN,
        },
        Format::BC7 if ty == Type::UNorm => {
            if srgb {
                BC7_UNORM_SRGB
            } else {
                BC7_UNORM
            }
        }
        _ => UNKNOWN,
    }
}

pub(crate) fn is_valid_for_dds(format: Format, ty: Type) -> bool {
    dds_format(format, ty, ColorSpace::Linear) != DxgiFormat::UNKNOWN
}

fn compute_pitch(texture: &Texture) -> u32 {
    let bw = block_width(texture.format());
    (texture.width(0) + bw - 1) / bw * block_size(texture.format())
}

pub(crate) fn save_dds(texture: &Texture, writer: &mut dyn Write) -> Result<(), SaveError> {
    let dxgi = dds_format(texture.format(), texture.texture_type(), texture.color_space());
    if dxgi == DxgiFormat::UNKNOWN {
        return Err(SaveError::Unsupported);
    }

    write_u32(writer, MAGIC)?;

    let mut flags = DdsFlags::CAPS
        | DdsFlags::HEIGHT
        | DdsFlags::WIDTH
        | DdsFlags::PIXEL_FORMAT
        | DdsFlags::MIPMAP_COUNT
        | DdsFlags::PITCH;
    if texture.dimension() == Dimension::Dim3D {
        flags |= DdsFlags::DEPTH;
    }

    // 124-byte header.
    write_u32(writer, 124)?;
    write_u32(writer, flags.bits())?;
    write_u32(writer, texture.height(0))?;
    write_u32(writer, texture.width(0))?;
    write_u32(writer, compute_pitch(texture))?;
    write_u32(
        writer,
        if texture.dimension() == Dimension::Dim3D { texture.depth(0) } else { 0 },
    )?;
    write_u32(writer, texture.mip_level_count())?;
    for _ in 0..11 {
        write_u32(writer, 0)?; // reserved
    }

    // 32-byte pixel format referring to the DX10 extension.
    write_u32(writer, 32)?;
    write_u32(writer, DdsFormatFlags::FOURCC.bits())?;
    write_u32(writer, fourcc(b'D', b'X', b'1', b'0'))?;
    for _ in 0..5 {
        write_u32(writer, 0)?; // bit count and masks
    }

    let mut caps = DdsCaps::TEXTURE;
    if texture.mip_level_count() > 1 {
        caps |= DdsCaps::MIPMAP;
    }
    if texture.mip_level_count() > 1
        || texture.dimension() == Dimension::Dim3D
        || texture.is_array()
    {
        caps |= DdsCaps::COMPLEX;
    }
    write_u32(writer, caps.bits())?;

    let caps2 = if texture.dimension() == Dimension::Cube {
        DdsCaps2::CUBE
            | DdsCaps2::POS_X
            | DdsCaps2::NEG_X
            | DdsCaps2::POS_Y
            | DdsCaps2::NEG_Y
            | DdsCaps2::POS_Z
            | DdsCaps2::NEG_Z
    } else if texture.dimension() == Dimension::Dim3D {
        DdsCaps2::VOLUME
    } else {
        DdsCaps2::empty()
    };
    write_u32(writer, caps2.bits())?;
    write_u32(writer, 0)?; // caps3
    write_u32(writer, 0)?; // caps4
    write_u32(writer, 0)?; // reserved

    // 20-byte DX10 header.
    write_u32(writer, dxgi as u32)?;
    let (resource_dimension, misc_flag) = match texture.dimension() {
        Dimension::Dim1D => (DDS_TEXTURE_1D, 0),
        Dimension::Dim2D => (DDS_TEXTURE_2D, 0),
        Dimension::Dim3D => (DDS_TEXTURE_3D, 0),
        Dimension::Cube => (DDS_TEXTURE_2D, DDS_MISC_CUBEMAP),
    };
    write_u32(writer, resource_dimension)?;
    write_u32(writer, misc_flag)?;
    write_u32(
        writer,
        if texture.dimension() == Dimension::Dim3D { 1 } else { texture.depth(0) },
    )?;
    let alpha_mode = if has_alpha(texture.format()) {
        match texture.alpha_type() {
            Alpha::None => DDS_ALPHA_MODE_OPAQUE,
            Alpha::Standard => DDS_ALPHA_MODE_STRAIGHT,
            Alpha::PreMultiplied => DDS_ALPHA_MODE_PREMULTIPLIED,
            Alpha::Encoded => DDS_ALPHA_MODE_CUSTOM,
        }
    } else {
        DDS_ALPHA_MODE_OPAQUE
    };
    write_u32(writer, alpha_mode)?;

    // Payload: element → face → mip → slice.
    let elements = if texture.is_array() { texture.depth(0) } else { 1 };
    for element in 0..elements {
        for face in 0..texture.face_count() {
            let face = CubeFace::from_index(face as usize);
            for level in 0..texture.mip_level_count() {
                let volumes = if texture.dimension() == Dimension::Dim3D {
                    texture.depth(level)
                } else {
                    1
                };
                for volume in 0..volumes {
                    let index = volume + element;
                    let data = texture.data(face, level, index).ok_or(SaveError::Invalid)?;
                    writer.write_all(data)?;
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

    fn zero_texture(format: Format, ty: Type) -> Texture {
        let mut texture =
            Texture::new(Dimension::Dim2D, 16, 16, 0, 1, ColorSpace::Linear).unwrap();
        let mut image = Image::new(PixelFormat::RGBAF, 16, 16, ColorSpace::Linear).unwrap();
        for y in 0..16 {
            for x in 0..16 {
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
        u32::from_le_bytes(bytes[index * 4..index * 4 + 4].try_into().unwrap())
    }

    #[test]
    fn header_fields_for_bc1() {
        let texture = zero_texture(Format::BC1_RGB, Type::UNorm);
        let mut out = Vec::new();
        save_dds(&texture, &mut out).unwrap();

        assert_eq!(field(&out, 0), MAGIC);
        assert_eq!(field(&out, 1), 124); // header size
        assert_eq!(field(&out, 3), 16); // height
        assert_eq!(field(&out, 4), 16); // width
        assert_eq!(field(&out, 5), 4 * 8); // pitch: 4 blocks × 8 bytes
        assert_eq!(field(&out, 7), 1); // mip count
        assert_eq!(field(&out, 19), 32); // pixel format size
        assert_eq!(field(&out, 21), fourcc(b'D', b'X', b'1', b'0'));
        // DX10 header starts after magic + 124-byte header.
        assert_eq!(field(&out, 32), DxgiFormat::BC1_UNORM as u32);
        assert_eq!(field(&out, 33), DDS_TEXTURE_2D);
        assert_eq!(field(&out, 35), 1); // array size of a non-array is 1
        // Payload: 16 blocks of 8 bytes.
        assert_eq!(out.len(), 4 + 124 + 20 + 128);
    }

    #[test]
    fn r4g4_maps_and_unsupported_formats_fail() {
        assert!(is_valid_for_dds(Format::R4G4, Type::UNorm));
        assert!(!is_valid_for_dds(Format::R4G4B4A4, Type::UNorm));
        assert!(!is_valid_for_dds(Format::ETC1, Type::UNorm));
        assert!(!is_valid_for_dds(Format::ASTC_4x4, Type::UNorm));
        assert!(is_valid_for_dds(Format::BC6H, Type::Float));

        let texture = zero_texture(Format::ETC1, Type::UNorm);
        let mut out = Vec::new();
        assert!(matches!(save_dds(&texture, &mut out), Err(SaveError::Unsupported)));
    }
}
