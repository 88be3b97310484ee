//! PVR3 writer: version FourCC, flags, 64-bit pixel format (generic channel encoding or a
//! special format code), channel type, geometry, optional BC1 metadata and the
//! mip → slice → face payload.

use super::{fourcc, write_u32, write_u64};
use crate::error::SaveError;
use crate::texture::info::{Alpha, Format, Type};
use crate::texture::{CubeFace, Dimension, Texture};
use crate::ColorSpace;
use std::io::Write;

/// PVR channel type codes.
#[derive(Copy, Clone)]
#[repr(u32)]
enum ChannelType {
    UByteN = 0,
    SByteN = 1,
    UByte = 2,
    SByte = 3,
    UShortN = 4,
    SShortN = 5,
    UShort = 6,
    SShort = 7,
    UIntN = 8,
    SIntN = 9,
    UInt = 10,
    SInt = 11,
    Float = 12,
    UFloat = 13,
}

/// Special (non-generic) pixel format codes; the full table stops at 50.
mod special {
    pub const PVRTC_2BPP_RGB: u64 = 0;
    pub const PVRTC_2BPP_RGBA: u64 = 1;
    pub const PVRTC_4BPP_RGB: u64 = 2;
    pub const PVRTC_4BPP_RGBA: u64 = 3;
    pub const PVRTC2_2BPP: u64 = 4;
    pub const PVRTC2_4BPP: u64 = 5;
    pub const ETC1: u64 = 6;
    pub const DXT1: u64 = 7;
    pub const DXT2: u64 = 8;
    pub const DXT3: u64 = 9;
    pub const DXT4: u64 = 10;
    pub const DXT5: u64 = 11;
    pub const BC4: u64 = 12;
    pub const BC5: u64 = 13;
    pub const BC6: u64 = 14;
    pub const BC7: u64 = 15;
    pub const R9G9B9E5_UFLOAT: u64 = 19;
    pub const ETC2_RGB: u64 = 22;
    pub const ETC2_RGBA: u64 = 23;
    pub const ETC2_RGB_A1: u64 = 24;
    pub const EAC_R11: u64 = 25;
    pub const EAC_RG11: u64 = 26;
    pub const ASTC_4X4: u64 = 27;
    pub const ASTC_5X4: u64 = 28;
    pub const ASTC_5X5: u64 = 29;
    pub const ASTC_6X5: u64 = 30;
    pub const ASTC_6X6: u64 = 31;
    pub const ASTC_8X5: u64 = 32;
    pub const ASTC_8X6: u64 = 33;
    pub const ASTC_8X8: u64 = 34;
    pub const ASTC_10X5: u64 = 35;
    pub const ASTC_10X6: u64 = 36;
    pub const ASTC_10X8: u64 = 37;
    pub const ASTC_10X10: u64 = 38;
    pub const ASTC_12X10: u64 = 39;
    pub const ASTC_12X12: u64 = 40;
}

/// Builds the generic 64-bit pixel format: four (channel name, bit count) pairs.
const fn generic(c0: u8, b0: u8, c1: u8, b1: u8, c2: u8, b2: u8, c3: u8, b3: u8) -> u64 {
    c0 as u64
        | (c1 as u64) << 8
        | (c2 as u64) << 16
        | (c3 as u64) << 24
        | (b0 as u64) << 32
        | (b1 as u64) << 40
        | (b2 as u64) << 48
        | (b3 as u64) << 56
}

/// Storage width class of a format, which combines with the numeric type to select the
/// channel type code.
fn channel_type(format: Format, ty: Type) -> ChannelType {
    use Format::*;

    // 16-bit-per-channel (and packed 16-bit) formats.
    let short = matches!(
        format,
        R4G4B4A4
            | B4G4R4A4
            | A4R4G4B4
            | R5G6B5
            | B5G6R5
            | R5G5B5A1
            | B5G5R5A1
            | A1R5G5B5
            | R16
            | R16G16
            | R16G16B16
            | R16G16B16A16
            | EAC_R11
            | EAC_R11G11
    );
    // 32-bit-per-channel formats.
    let int = matches!(
        format,
        A2R10G10B10 | A2B10G10R10 | R32 | R32G32 | R32G32B32 | R32G32B32A32
    );

    match ty {
        Type::UNorm => {
            if short {
                ChannelType::UShortN
            } else if int {
                ChannelType::UIntN
            } else {
                ChannelType::UByteN
            }
        }
        Type::SNorm => {
            if short {
                ChannelType::SShortN
            } else if int {
                ChannelType::SIntN
            } else {
                ChannelType::SByteN
            }
        }
        Type::UInt => {
            if short {
                ChannelType::UShort
            } else if int {
                ChannelType::UInt
            } else {
                ChannelType::UByte
            }
        }
        Type::Int => {
            if short {
                ChannelType::SShort
            } else if int {
                ChannelType::SInt
            } else {
                ChannelType::SByte
            }
        }
        Type::UFloat => ChannelType::UFloat,
        Type::Float => ChannelType::Float,
    }
}

fn pixel_format(format: Format, alpha: Alpha) -> Option<u64> {
    use Format::*;
    let value = match format {
        Unknown => return None,
        R4G4 => generic(b'r', 4, b'g', 4, 0, 0, 0, 0),
        R4G4B4A4 => generic(b'r', 4, b'g', 4, b'b', 4, b'a', 4),
        B4G4R4A4 => generic(b'b', 4, b'g', 4, b'r', 4, b'a', 4),
        A4R4G4B4 => generic(b'a', 4, b'r', 4, b'g', 4, b'b', 4),
        R5G6B5 => generic(b'r', 5, b'g', 6, b'b', 5, 0, 0),
        B5G6R5 => generic(b'b', 5, b'g', 6, b'r', 5, 0, 0),
        R5G5B5A1 => generic(b'r', 5, b'g', 5, b'b', 5, b'a', 1),
        B5G5R5A1 => generic(b'b', 5, b'g', 5, b'r', 5, b'a', 1),
        A1R5G5B5 => generic(b'a', 1, b'r', 5, b'g', 5, b'b', 5),
        R8 => generic(b'r', 8, 0, 0, 0, 0, 0, 0),
        R8G8 => generic(b'r', 8, b'g', 8, 0, 0, 0, 0),
        R8G8B8 => generic(b'r', 8, b'g', 8, b'b', 8, 0, 0),
        B8G8R8 => generic(b'b', 8, b'g', 8, b'r', 8, 0, 0),
        R8G8B8A8 => generic(b'r', 8, b'g', 8, b'b', 8, b'a', 8),
        B8G8R8A8 => generic(b'b', 8, b'g', 8, b'r', 8, b'a', 8),
        A8B8G8R8 => generic(b'a', 8, b'b', 8, b'g', 8, b'r', 8),
        A2R10G10B10 => generic(b'a', 2, b'r', 10, b'g', 10, b'b', 10),
        A2B10G10R10 => generic(b'a', 2, b'b', 10, b'g', 10, b'r', 10),
        R16 => generic(b'r', 16, 0, 0, 0, 0, 0, 0),
        R16G16 => generic(b'r', 16, b'g', 16, 0, 0, 0, 0),
        R16G16B16 => generic(b'r', 16, b'g', 16, b'b', 16, 0, 0),
        R16G16B16A16 => generic(b'r', 16, b'g', 16, b'b', 16, b'a', 16),
        R32 => generic(b'r', 32, 0, 0, 0, 0, 0, 0),
        R32G32 => generic(b'r', 32, b'g', 32, 0, 0, 0, 0),
        R32G32B32 => generic(b'r', 32, b'g', 32, b'b', 32, 0, 0),
        R32G32B32A32 => generic(b'r', 32, b'g', 32, b'b', 32, b'a', 32),
        B10G11R11_UFloat => generic(b'b', 10, b'g', 11, b'r', 11, 0, 0),
        E5B9G9R9_UFloat => special::R9G9B9E5_UFLOAT,
        BC1_RGB | BC1_RGBA => special::DXT1,
        BC2 => {
            if alpha == Alpha::PreMultiplied {
                special::DXT2
            } else {
                special::DXT3
            }
        }
        BC3 => {
            if alpha == Alpha::PreMultiplied {
                special::DXT4
            } else {
                special::DXT5
            }
        }
        BC4 => special::BC4,
        BC5 => special::BC5,
        BC6H => special::BC6,
        BC7 => special::BC7,
        ETC1 => special::ETC1,
        ETC2_R8G8B8 => special::ETC2_RGB,
        ETC2_R8G8B8A1 => special::ETC2_RGB_A1,
        ETC2_R8G8B8A8 => special::ETC2_RGBA,
        EAC_R11 => special::EAC_R11,
        EAC_R11G11 => special::EAC_RG11,
        ASTC_4x4 => special::ASTC_4X4,
        ASTC_5x4 => special::ASTC_5X4,
        ASTC_5x5 => special::ASTC_5X5,
        ASTC_6x5 => special::ASTC_6X5,
        ASTC_6x6 => special::ASTC_6X6,
        ASTC_8x5 => special::ASTC_8X5,
        ASTC_8x6 => special::ASTC_8X6,
        ASTC_8x8 => special::ASTC_8X8,
        ASTC_10x5 => special::ASTC_10X5,
        ASTC_10x6 => special::ASTC_10X6,
        ASTC_10x8 => special::ASTC_10X8,
        ASTC_10x10 => special::ASTC_10X10,
        ASTC_12x10 => special::ASTC_12X10,
        ASTC_12x12 => special::ASTC_12X12,
        PVRTC1_RGB_2BPP => special::PVRTC_2BPP_RGB,
        PVRTC1_RGBA_2BPP => special::PVRTC_2BPP_RGBA,
        PVRTC1_RGB_4BPP => special::PVRTC_4BPP_RGB,
        PVRTC1_RGBA_4BPP => special::PVRTC_4BPP_RGBA,
        PVRTC2_RGBA_2BPP => special::PVRTC2_2BPP,
        PVRTC2_RGBA_4BPP => special::PVRTC2_4BPP,
    };
    Some(value)
}

pub(crate) fn is_valid_for_pvr(format: Format, _ty: Type) -> bool {
    pixel_format(format, Alpha::Standard).is_some()
}

pub(crate) fn save_pvr(texture: &Texture, writer: &mut dyn Write) -> Result<(), SaveError> {
    let pixel_format =
        pixel_format(texture.format(), texture.alpha_type()).ok_or(SaveError::Unsupported)?;

    write_u32(writer, fourcc(b'P', b'V', b'R', 3))?;
    let flags = if texture.alpha_type() == Alpha::PreMultiplied { 0x2 } else { 0 };
    write_u32(writer, flags)?;
    write_u64(writer, pixel_format)?;
    write_u32(writer, if texture.color_space() == ColorSpace::Srgb { 1 } else { 0 })?;
    write_u32(writer, channel_type(texture.format(), texture.texture_type()) as u32)?;
    write_u32(writer, texture.height(0))?;
    write_u32(writer, texture.width(0))?;
    write_u32(
        writer,
        if texture.dimension() == Dimension::Dim3D { texture.depth(0) } else { 1 },
    )?;
    write_u32(writer, if texture.is_array() { texture.depth(0) } else { 1 })?;
    write_u32(writer, texture.face_count())?;
    write_u32(writer, texture.mip_level_count())?;

    // Metadata distinguishes BC1 with and without alpha; everything else has none.
    if matches!(texture.format(), Format::BC1_RGB | Format::BC1_RGBA) {
        write_u32(writer, 12)?;
        write_u32(writer, fourcc(b'C', b'T', b'F', b'S'))?;
        let code = if texture.format() == Format::BC1_RGBA {
            fourcc(b'B', b'C', b'1', b'A')
        } else {
            fourcc(b'B', b'C', b'1', 0)
        };
        write_u32(writer, code)?;
        write_u32(writer, 0)?;
    } else {
        write_u32(writer, 0)?;
    }

    for level in 0..texture.mip_level_count() {
        for depth in 0..texture.depth(level) {
            for face in 0..texture.face_count() {
                let face = CubeFace::from_index(face as usize);
                let data = texture.data(face, level, depth).ok_or(SaveError::Invalid)?;
                writer.write_all(data)?;
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
    use crate::texture::{ColorMask, Quality};

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

    #[test]
    fn header_fields_for_rgba8() {
        let texture = zero_texture(Format::R8G8B8A8, Type::UNorm);
        let mut out = Vec::new();
        save_pvr(&texture, &mut out).unwrap();

        assert_eq!(u32::from_le_bytes(out[0..4].try_into().unwrap()), fourcc(b'P', b'V', b'R', 3));
        assert_eq!(u32::from_le_bytes(out[4..8].try_into().unwrap()), 0); // flags
        let pf = u64::from_le_bytes(out[8..16].try_into().unwrap());
        assert_eq!(pf, generic(b'r', 8, b'g', 8, b'b', 8, b'a', 8));
        assert_eq!(u32::from_le_bytes(out[16..20].try_into().unwrap()), 0); // linear
        assert_eq!(
            u32::from_le_bytes(out[20..24].try_into().unwrap()),
            ChannelType::UByteN as u32
        );
        assert_eq!(u32::from_le_bytes(out[24..28].try_into().unwrap()), 16); // height
        assert_eq!(u32::from_le_bytes(out[28..32].try_into().unwrap()), 16); // width
        assert_eq!(u32::from_le_bytes(out[32..36].try_into().unwrap()), 1); // depth
        assert_eq!(u32::from_le_bytes(out[36..40].try_into().unwrap()), 1); // array
        assert_eq!(u32::from_le_bytes(out[40..44].try_into().unwrap()), 1); // faces
        assert_eq!(u32::from_le_bytes(out[44..48].try_into().unwrap()), 1); // mips
        assert_eq!(u32::from_le_bytes(out[48..52].try_into().unwrap()), 0); // metadata
        assert_eq!(out.len(), 52 + 16 * 16 * 4);
    }

    #[test]
    fn bc1_carries_discriminator_metadata() {
        let texture = zero_texture(Format::BC1_RGB, Type::UNorm);
        let mut out = Vec::new();
        save_pvr(&texture, &mut out).unwrap();

        assert_eq!(u64::from_le_bytes(out[8..16].try_into().unwrap()), special::DXT1);
        assert_eq!(u32::from_le_bytes(out[48..52].try_into().unwrap()), 12);
        assert_eq!(
            u32::from_le_bytes(out[52..56].try_into().unwrap()),
            fourcc(b'C', b'T', b'F', b'S')
        );
        assert_eq!(
            u32::from_le_bytes(out[56..60].try_into().unwrap()),
            fourcc(b'B', b'C', b'1', 0)
        );
        assert_eq!(out.len(), 64 + 128);
    }

    #[test]
    fn channel_type_table() {
        assert_eq!(channel_type(Format::R16, Type::UNorm) as u32, ChannelType::UShortN as u32);
        assert_eq!(channel_type(Format::R32, Type::Int) as u32, ChannelType::SInt as u32);
        assert_eq!(channel_type(Format::R8, Type::SNorm) as u32, ChannelType::SByteN as u32);
        assert_eq!(
            channel_type(Format::EAC_R11, Type::UNorm) as u32,
            ChannelType::UShortN as u32
        );
        assert_eq!(channel_type(Format::BC6H, Type::UFloat) as u32, ChannelType::UFloat as u32);
        assert_eq!(
            channel_type(Format::A2B10G10R10, Type::UInt) as u32,
            ChannelType::UInt as u32
        );
    }

    #[test]
    fn every_format_is_representable() {
        assert!(is_valid_for_pvr(Format::R4G4, Type::UNorm));
        assert!(is_valid_for_pvr(Format::PVRTC2_RGBA_4BPP, Type::UNorm));
        assert!(!is_valid_for_pvr(Format::Unknown, Type::UNorm));
    }
}
