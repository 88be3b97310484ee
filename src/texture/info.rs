//! Storage format descriptions: the format/type matrix, block geometry and alpha/sRGB
//! capability tables.

use strum_macros::{AsRefStr, EnumString, VariantNames};

/// GPU storage format of a converted texture.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, AsRefStr, EnumString, VariantNames)]
#[strum(ascii_case_insensitive)]
#[allow(non_camel_case_types)]
pub enum Format {
    #[default]
    Unknown,

    // Standard formats.
    R4G4,
    R4G4B4A4,
    B4G4R4A4,
    A4R4G4B4,
    R5G6B5,
    B5G6R5,
    R5G5B5A1,
    B5G5R5A1,
    A1R5G5B5,
    R8,
    R8G8,
    R8G8B8,
    B8G8R8,
    R8G8B8A8,
    B8G8R8A8,
    A8B8G8R8,
    A2R10G10B10,
    A2B10G10R10,
    R16,
    R16G16,
    R16G16B16,
    R16G16B16A16,
    R32,
    R32G32,
    R32G32B32,
    R32G32B32A32,

    // Special formats.
    B10G11R11_UFloat,
    E5B9G9R9_UFloat,

    // Compressed formats.
    BC1_RGB,
    BC1_RGBA,
    BC2,
    BC3,
    BC4,
    BC5,
    BC6H,
    BC7,
    ETC1,
    ETC2_R8G8B8,
    ETC2_R8G8B8A1,
    ETC2_R8G8B8A8,
    EAC_R11,
    EAC_R11G11,
    ASTC_4x4,
    ASTC_5x4,
    ASTC_5x5,
    ASTC_6x5,
    ASTC_6x6,
    ASTC_8x5,
    ASTC_8x6,
    ASTC_8x8,
    ASTC_10x5,
    ASTC_10x6,
    ASTC_10x8,
    ASTC_10x10,
    ASTC_12x10,
    ASTC_12x12,
    PVRTC1_RGB_2BPP,
    PVRTC1_RGBA_2BPP,
    PVRTC1_RGB_4BPP,
    PVRTC1_RGBA_4BPP,
    PVRTC2_RGBA_2BPP,
    PVRTC2_RGBA_4BPP,
}

/// Numeric interpretation of the channels of a storage format.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, AsRefStr, EnumString, VariantNames)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Type {
    #[default]
    UNorm,
    SNorm,
    UInt,
    Int,
    UFloat,
    Float,
}

/// How the alpha channel relates to the color channels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, AsRefStr, EnumString, VariantNames)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum Alpha {
    /// Alpha should be ignored.
    None,
    /// Straight alpha.
    #[default]
    Standard,
    /// Color channels are pre-multiplied by alpha.
    PreMultiplied,
    /// Alpha holds an encoded value rather than opacity; disables alpha weighting.
    Encoded,
}

/// Compression effort preset, from fastest to best.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Default, AsRefStr, EnumString, VariantNames,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Quality {
    Lowest,
    Low,
    #[default]
    Normal,
    High,
    Highest,
}

impl Quality {
    pub(crate) fn level(self) -> u32 {
        self as u32
    }
}

/// Which channels participate in encoding. Disabled channels get zero weight where the
/// codec supports it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ColorMask {
    pub r: bool,
    pub g: bool,
    pub b: bool,
    pub a: bool,
}

impl Default for ColorMask {
    fn default() -> Self {
        Self { r: true, g: true, b: true, a: true }
    }
}

/// Texture dimensionality.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Dimension {
    Dim1D,
    #[default]
    Dim2D,
    Dim3D,
    Cube,
}

/// One side of a cube map. For non-cube textures `PosX` is the nominal face.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CubeFace {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PosX,
        CubeFace::NegX,
        CubeFace::PosY,
        CubeFace::NegY,
        CubeFace::PosZ,
        CubeFace::NegZ,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub(crate) fn from_index(index: usize) -> CubeFace {
        Self::ALL[index]
    }
}

/// Output container format.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, AsRefStr, EnumString, VariantNames)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FileType {
    /// Determined from the output path's extension.
    #[default]
    Auto,
    Dds,
    Ktx,
    Pvr,
}

impl FileType {
    /// Deduces the container from a file name's extension; `Auto` when unknown.
    pub fn from_file_name(file_name: &str) -> FileType {
        let lower = file_name.to_ascii_lowercase();
        if lower.ends_with(".dds") {
            FileType::Dds
        } else if lower.ends_with(".ktx") {
            FileType::Ktx
        } else if lower.ends_with(".pvr") {
            FileType::Pvr
        } else {
            FileType::Auto
        }
    }
}

/// Whether `format` may be stored with numeric type `ty`.
pub fn is_format_valid(format: Format, ty: Type) -> bool {
    use Format::*;
    use Type::*;
    match format {
        Unknown => false,

        R4G4 | R4G4B4A4 | B4G4R4A4 | A4R4G4B4 | R5G6B5 | B5G6R5 | R5G5B5A1 | B5G5R5A1
        | A1R5G5B5 | B8G8R8 | B8G8R8A8 | A8B8G8R8 => ty == UNorm,

        R8 | R8G8 | R8G8B8 | R8G8B8A8 => matches!(ty, UNorm | SNorm | UInt | Int),

        A2R10G10B10 | A2B10G10R10 => matches!(ty, UNorm | UInt),

        R16 | R16G16 | R16G16B16 | R16G16B16A16 => {
            matches!(ty, UNorm | SNorm | UInt | Int | Float)
        }

        R32 | R32G32 | R32G32B32 | R32G32B32A32 => matches!(ty, UInt | Int | Float),

        B10G11R11_UFloat | E5B9G9R9_UFloat => ty == UFloat,

        BC1_RGB | BC1_RGBA | BC2 | BC3 | BC7 => ty == UNorm,
        BC4 | BC5 => matches!(ty, UNorm | SNorm),
        BC6H => matches!(ty, UFloat | Float),

        ETC1 | ETC2_R8G8B8 | ETC2_R8G8B8A1 | ETC2_R8G8B8A8 => ty == UNorm,
        EAC_R11 | EAC_R11G11 => matches!(ty, UNorm | SNorm),

        ASTC_4x4 | ASTC_5x4 | ASTC_5x5 | ASTC_6x5 | ASTC_6x6 | ASTC_8x5 | ASTC_8x6 | ASTC_8x8
        | ASTC_10x5 | ASTC_10x6 | ASTC_10x8 | ASTC_10x10 | ASTC_12x10 | ASTC_12x12 => {
            matches!(ty, UNorm | UFloat)
        }

        PVRTC1_RGB_2BPP | PVRTC1_RGBA_2BPP | PVRTC1_RGB_4BPP | PVRTC1_RGBA_4BPP
        | PVRTC2_RGBA_2BPP | PVRTC2_RGBA_4BPP => ty == UNorm,
    }
}

/// Whether `(format, ty)` can carry sRGB-encoded data natively.
pub fn has_native_srgb(format: Format, ty: Type) -> bool {
    use Format::*;
    match format {
        R8G8B8 | B8G8R8 | R8G8B8A8 | B8G8R8A8 | A8B8G8R8 | BC1_RGB | BC1_RGBA | BC2 | BC3
        | BC7 | ETC2_R8G8B8 | ETC2_R8G8B8A1 | ETC2_R8G8B8A8 | PVRTC1_RGB_2BPP
        | PVRTC1_RGBA_2BPP | PVRTC1_RGB_4BPP | PVRTC1_RGBA_4BPP | PVRTC2_RGBA_2BPP
        | PVRTC2_RGBA_4BPP | ASTC_4x4 | ASTC_5x4 | ASTC_5x5 | ASTC_6x5 | ASTC_6x6 | ASTC_8x5
        | ASTC_8x6 | ASTC_8x8 | ASTC_10x5 | ASTC_10x6 | ASTC_10x8 | ASTC_10x10 | ASTC_12x10
        | ASTC_12x12 => ty == Type::UNorm,
        _ => false,
    }
}

/// Whether the format stores an alpha channel.
pub fn has_alpha(format: Format) -> bool {
    use Format::*;
    matches!(
        format,
        R4G4B4A4
            | B4G4R4A4
            | R5G5B5A1
            | B5G5R5A1
            | A1R5G5B5
            | R8G8B8A8
            | B8G8R8A8
            | A8B8G8R8
            | A2R10G10B10
            | A2B10G10R10
            | R16G16B16A16
            | R32G32B32A32
            | BC1_RGBA
            | BC2
            | BC3
            | BC7
            | ETC2_R8G8B8A1
            | ETC2_R8G8B8A8
            | ASTC_4x4
            | ASTC_5x4
            | ASTC_5x5
            | ASTC_6x5
            | ASTC_6x6
            | ASTC_8x5
            | ASTC_8x6
            | ASTC_8x8
            | ASTC_10x5
            | ASTC_10x6
            | ASTC_10x8
            | ASTC_10x10
            | ASTC_12x10
            | ASTC_12x12
            | PVRTC1_RGBA_2BPP
            | PVRTC1_RGBA_4BPP
            | PVRTC2_RGBA_2BPP
            | PVRTC2_RGBA_4BPP
    )
}

/// Width in pixels of one encoded block; 1 for uncompressed formats.
pub fn block_width(format: Format) -> u32 {
    use Format::*;
    match format {
        Unknown => 0,
        ASTC_5x4 | ASTC_5x5 => 5,
        ASTC_6x5 | ASTC_6x6 => 6,
        ASTC_8x5 | ASTC_8x6 | ASTC_8x8 => 8,
        ASTC_10x5 | ASTC_10x6 | ASTC_10x8 | ASTC_10x10 => 10,
        ASTC_12x10 | ASTC_12x12 => 12,
        PVRTC1_RGB_2BPP | PVRTC1_RGBA_2BPP | PVRTC2_RGBA_2BPP => 8,
        BC1_RGB | BC1_RGBA | BC2 | BC3 | BC4 | BC5 | BC6H | BC7 | ETC1 | ETC2_R8G8B8
        | ETC2_R8G8B8A1 | ETC2_R8G8B8A8 | EAC_R11 | EAC_R11G11 | ASTC_4x4 | PVRTC1_RGB_4BPP
        | PVRTC1_RGBA_4BPP | PVRTC2_RGBA_4BPP => 4,
        _ => 1,
    }
}

/// Height in pixels of one encoded block; 1 for uncompressed formats.
pub fn block_height(format: Format) -> u32 {
    use Format::*;
    match format {
        Unknown => 0,
        ASTC_5x5 | ASTC_6x5 | ASTC_8x5 | ASTC_10x5 => 5,
        ASTC_6x6 | ASTC_8x6 | ASTC_10x6 => 6,
        ASTC_8x8 | ASTC_10x8 => 8,
        ASTC_10x10 | ASTC_12x10 => 10,
        ASTC_12x12 => 12,
        BC1_RGB | BC1_RGBA | BC2 | BC3 | BC4 | BC5 | BC6H | BC7 | ETC1 | ETC2_R8G8B8
        | ETC2_R8G8B8A1 | ETC2_R8G8B8A8 | EAC_R11 | EAC_R11G11 | ASTC_4x4 | ASTC_5x4
        | PVRTC1_RGB_2BPP | PVRTC1_RGBA_2BPP | PVRTC1_RGB_4BPP | PVRTC1_RGBA_4BPP
        | PVRTC2_RGBA_2BPP | PVRTC2_RGBA_4BPP => 4,
        _ => 1,
    }
}

/// Bytes of one encoded block (or one pixel for uncompressed formats).
pub fn block_size(format: Format) -> u32 {
    use Format::*;
    match format {
        Unknown => 0,
        R4G4 | R8 => 1,
        R4G4B4A4 | B4G4R4A4 | A4R4G4B4 | R5G6B5 | B5G6R5 | R5G5B5A1 | B5G5R5A1 | A1R5G5B5
        | R8G8 | R16 => 2,
        R8G8B8 | B8G8R8 => 3,
        R8G8B8A8 | B8G8R8A8 | A8B8G8R8 | A2R10G10B10 | A2B10G10R10 | R16G16 | R32
        | B10G11R11_UFloat | E5B9G9R9_UFloat => 4,
        R16G16B16 => 6,
        R16G16B16A16 | R32G32 => 8,
        R32G32B32 => 12,
        R32G32B32A32 => 16,
        BC1_RGB | BC1_RGBA | BC4 | ETC1 | ETC2_R8G8B8 | ETC2_R8G8B8A1 | EAC_R11
        | PVRTC1_RGB_2BPP | PVRTC1_RGBA_2BPP | PVRTC1_RGB_4BPP | PVRTC1_RGBA_4BPP
        | PVRTC2_RGBA_2BPP | PVRTC2_RGBA_4BPP => 8,
        BC2 | BC3 | BC5 | BC6H | BC7 | ETC2_R8G8B8A8 | EAC_R11G11 | ASTC_4x4 | ASTC_5x4
        | ASTC_5x5 | ASTC_6x5 | ASTC_6x6 | ASTC_8x5 | ASTC_8x6 | ASTC_8x8 | ASTC_10x5
        | ASTC_10x6 | ASTC_10x8 | ASTC_10x10 | ASTC_12x10 | ASTC_12x12 => 16,
    }
}

/// Minimum width the format can encode.
pub fn min_width(format: Format) -> u32 {
    use Format::*;
    match format {
        Unknown => 0,
        PVRTC1_RGB_2BPP | PVRTC1_RGBA_2BPP | PVRTC2_RGBA_2BPP => 16,
        PVRTC1_RGB_4BPP | PVRTC1_RGBA_4BPP | PVRTC2_RGBA_4BPP => 8,
        _ => block_width(format).max(1),
    }
}

/// Minimum height the format can encode.
pub fn min_height(format: Format) -> u32 {
    use Format::*;
    match format {
        Unknown => 0,
        PVRTC1_RGB_2BPP | PVRTC1_RGBA_2BPP | PVRTC1_RGB_4BPP | PVRTC1_RGBA_4BPP
        | PVRTC2_RGBA_2BPP | PVRTC2_RGBA_4BPP => 8,
        _ => block_height(format).max(1),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use strum::VariantNames as _;

    #[test]
    fn format_matrix_golden_set() {
        assert!(is_format_valid(Format::R8G8B8A8, Type::UNorm));
        assert!(is_format_valid(Format::R8G8B8A8, Type::Int));
        assert!(!is_format_valid(Format::R8G8B8A8, Type::Float));
        assert!(!is_format_valid(Format::R8, Type::Float));
        assert!(is_format_valid(Format::R16, Type::Float));
        assert!(!is_format_valid(Format::R32, Type::UNorm));
        assert!(is_format_valid(Format::B10G11R11_UFloat, Type::UFloat));
        assert!(!is_format_valid(Format::B10G11R11_UFloat, Type::Float));
        assert!(is_format_valid(Format::BC1_RGB, Type::UNorm));
        assert!(!is_format_valid(Format::BC1_RGB, Type::SNorm));
        assert!(is_format_valid(Format::BC4, Type::SNorm));
        assert!(is_format_valid(Format::BC6H, Type::Float));
        assert!(!is_format_valid(Format::BC6H, Type::UNorm));
        assert!(is_format_valid(Format::EAC_R11, Type::SNorm));
        assert!(is_format_valid(Format::ASTC_4x4, Type::UFloat));
        assert!(!is_format_valid(Format::ASTC_4x4, Type::SNorm));
        assert!(is_format_valid(Format::PVRTC1_RGB_2BPP, Type::UNorm));
        assert!(!is_format_valid(Format::Unknown, Type::UNorm));
    }

    #[test]
    fn valid_combination_counts() {
        let mut count = 0;
        for name in Format::VARIANTS {
            let format: Format = name.parse().unwrap();
            for ty in [Type::UNorm, Type::SNorm, Type::UInt, Type::Int, Type::UFloat, Type::Float] {
                if is_format_valid(format, ty) {
                    count += 1;
                }
            }
        }
        // 12 unorm-only standard + 4×4 8-bit + 2×2 a2 + 4×5 16-bit + 4×3 32-bit + 2 ufloat
        // + 5 bc unorm-only + 2×2 bc45 + 2 bc6h + 4 etc + 2×2 eac + 14×2 astc + 6 pvrtc.
        assert_eq!(count, 12 + 16 + 4 + 20 + 12 + 2 + 5 + 4 + 2 + 4 + 4 + 28 + 6);
    }

    #[test]
    fn block_geometry_consistency() {
        for name in Format::VARIANTS {
            let format: Format = name.parse().unwrap();
            if format == Format::Unknown {
                continue;
            }
            assert!(block_width(format) >= 1);
            assert!(block_height(format) >= 1);
            assert!(block_size(format) >= 1);
            assert!(min_width(format) >= block_width(format));
        }
        assert_eq!(block_width(Format::ASTC_10x6), 10);
        assert_eq!(block_height(Format::ASTC_10x6), 6);
        assert_eq!(block_size(Format::BC1_RGB), 8);
        assert_eq!(block_size(Format::BC7), 16);
        assert_eq!(block_width(Format::PVRTC1_RGB_2BPP), 8);
    }

    #[test]
    fn format_names_parse_case_insensitively() {
        assert_eq!("bc1_rgb".parse::<Format>().unwrap(), Format::BC1_RGB);
        assert_eq!("ASTC_4x4".parse::<Format>().unwrap(), Format::ASTC_4x4);
        assert_eq!("unorm".parse::<Type>().unwrap(), Type::UNorm);
        assert_eq!("pre-multiplied".parse::<Alpha>().unwrap(), Alpha::PreMultiplied);
        assert_eq!("highest".parse::<Quality>().unwrap(), Quality::Highest);
        assert!("bogus".parse::<Format>().is_err());
    }
}
