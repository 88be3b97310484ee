//! Command-line argument grammar and validation.
//!
//! The input options come in mutually exclusive families (single image, array, cube, cube
//! array, list file); several options take a variable number of values (`-a [index] file`,
//! `-M level [depth] [face] [replace] file`), so the grammar is built with the clap builder
//! API and occurrence grouping rather than a derive.

use clap::{Arg, ArgAction, Command};
use std::collections::HashMap;
use std::fs;
use texc::{
    Alpha, Channel, ColorMask, ColorSpace, CubeFace, Dimension, FileType, Format, ImageIndex,
    MipReplacement, NormalOptions, Quality, ResizeFilter, RotateAngle, Type,
};

#[derive(Copy, Clone, PartialEq, Eq)]
pub enum ImageType {
    Image,
    Array,
    Cube,
    CubeArray,
}

#[derive(Copy, Clone, PartialEq, Eq)]
pub enum LogLevel {
    Quiet,
    Normal,
    Verbose,
}

/// A resize extent: a pixel count or a symbolic size derived from the input.
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum SizeArg {
    Original,
    Fixed(u32),
    NextPO2,
    NearestPO2,
    Width,
    WidthNextPO2,
    WidthNearestPO2,
    Height,
    HeightNextPO2,
    HeightNearestPO2,
    Min,
    MinNextPO2,
    MinNearestPO2,
    Max,
    MaxNextPO2,
    MaxNearestPO2,
}

pub struct Args {
    pub jobs: u32,
    pub log: LogLevel,
    pub image_type: ImageType,
    pub images: Vec<String>,
    pub width: SizeArg,
    pub height: SizeArg,
    pub resize_filter: ResizeFilter,
    pub mip_levels: u32,
    pub mip_filter: ResizeFilter,
    pub custom_mips: HashMap<ImageIndex, (String, MipReplacement)>,
    pub flip_x: bool,
    pub flip_y: bool,
    pub rotate: Option<RotateAngle>,
    pub normal_map: bool,
    pub normal_options: NormalOptions,
    pub normal_height: f64,
    pub grayscale: bool,
    pub swizzle: Option<[Channel; 4]>,
    pub color_mask: ColorMask,
    pub image_color_space: ColorSpace,
    pub texture_color_space: ColorSpace,
    pub pre_multiply: bool,
    pub dimension: Dimension,
    pub format: Format,
    pub ty: Type,
    pub alpha: Alpha,
    pub quality: Quality,
    pub output: String,
    pub file_type: FileType,
    pub create_dir: bool,
}

fn command() -> Command {
    Command::new("texc")
        .about("Converts images into GPU-ready DDS, KTX and PVR texture containers")
        .arg(
            Arg::new("jobs")
                .short('j')
                .long("jobs")
                .num_args(0..=1)
                .value_name("n")
                .help("number of conversion jobs; all available cores when n is omitted"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .help("suppress all non-error output"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("verbose output"),
        )
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("file")
                .help("the input image for a standard texture"),
        )
        .arg(
            Arg::new("array")
                .short('a')
                .long("array")
                .num_args(1..=2)
                .action(ArgAction::Append)
                .value_names(["index", "file"])
                .help("an input image for an array or 3D texture: [index] file"),
        )
        .arg(
            Arg::new("cube")
                .short('c')
                .long("cube")
                .num_args(2)
                .action(ArgAction::Append)
                .allow_hyphen_values(true)
                .value_names(["face", "file"])
                .help("an input image for a cube map face (+x, -x, +y, -y, +z, -z)"),
        )
        .arg(
            Arg::new("cube-array")
                .short('C')
                .long("cube-array")
                .num_args(3)
                .action(ArgAction::Append)
                .allow_hyphen_values(true)
                .value_names(["index", "face", "file"])
                .help("an input image for a cube map array: index face file"),
        )
        .arg(
            Arg::new("input-list")
                .short('I')
                .long("input-list")
                .num_args(2)
                .value_names(["type", "file"])
                .help("a file with one image path per line; type is image, array, cube or cube-array"),
        )
        .arg(
            Arg::new("resize")
                .short('r')
                .long("resize")
                .num_args(2..=3)
                .value_names(["w", "h", "filter"])
                .help("resize the image; sizes may be pixel counts or symbolic (nextpo2, width, min, ...)"),
        )
        .arg(
            Arg::new("mipmap")
                .short('m')
                .long("mipmap")
                .num_args(0..=2)
                .value_names(["levels", "filter"])
                .help("generate mipmaps"),
        )
        .arg(
            Arg::new("custom-mip")
                .short('M')
                .long("custom-mip")
                .num_args(2..=5)
                .action(ArgAction::Append)
                .allow_hyphen_values(true)
                .value_names(["level", "depth", "face", "replace", "file"])
                .help("override a mip image: level [depth] [face] [once|continue] file"),
        )
        .arg(
            Arg::new("custom-mip-list")
                .long("custom-mip-list")
                .value_name("file")
                .help("custom mip overrides from a file, one per line in --custom-mip layout"),
        )
        .arg(
            Arg::new("flipx")
                .long("flipx")
                .action(ArgAction::SetTrue)
                .help("flip the images in the X direction"),
        )
        .arg(
            Arg::new("flipy")
                .long("flipy")
                .action(ArgAction::SetTrue)
                .help("flip the images in the Y direction"),
        )
        .arg(
            Arg::new("rotate")
                .long("rotate")
                .value_name("degrees")
                .allow_hyphen_values(true)
                .help("rotate by an angle; must be a multiple of 90 degrees"),
        )
        .arg(
            Arg::new("normalmap")
                .short('n')
                .long("normalmap")
                .num_args(0..=2)
                .value_names(["wrap", "height"])
                .help("generate a normal map; wrap, wrapx or wrapy and a height scale"),
        )
        .arg(
            Arg::new("grayscale")
                .short('g')
                .long("grayscale")
                .action(ArgAction::SetTrue)
                .help("convert the image to grayscale"),
        )
        .arg(
            Arg::new("swizzle")
                .short('s')
                .long("swizzle")
                .value_name("rgba")
                .help("swizzle the channels; four of r, g, b, a or x (unused)"),
        )
        .arg(
            Arg::new("srgb")
                .long("srgb")
                .action(ArgAction::SetTrue)
                .help("treat the input as sRGB and keep sRGB storage where the format allows"),
        )
        .arg(
            Arg::new("pre-multiply")
                .long("pre-multiply")
                .action(ArgAction::SetTrue)
                .help("pre-multiply the alpha"),
        )
        .arg(
            Arg::new("dimension")
                .short('d')
                .long("dimension")
                .value_name("d")
                .help("texture dimension: 1, 2 (default) or 3"),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("f")
                .help("the storage format (R8G8B8A8, BC1_RGB, ASTC_4x4, ...)"),
        )
        .arg(
            Arg::new("type")
                .short('t')
                .long("type")
                .value_name("t")
                .help("the channel type: unorm (default), snorm, uint, int, ufloat, float"),
        )
        .arg(
            Arg::new("alpha")
                .long("alpha")
                .value_name("a")
                .help("alpha semantics: none, standard (default), pre-multiplied, encoded"),
        )
        .arg(
            Arg::new("quality")
                .short('Q')
                .long("quality")
                .value_name("q")
                .help("compression quality: lowest, low, normal (default), high, highest"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("file")
                .help("the output texture file"),
        )
        .arg(
            Arg::new("file-format")
                .long("file-format")
                .value_name("f")
                .help("output container: dds, ktx or pvr; defaults to the output extension"),
        )
        .arg(
            Arg::new("create-dir")
                .long("create-dir")
                .action(ArgAction::SetTrue)
                .help("create the parent directory of the output file if missing"),
        )
}

fn parse_cube_face(value: &str) -> Result<CubeFace, String> {
    match value.to_ascii_lowercase().as_str() {
        "+x" => Ok(CubeFace::PosX),
        "-x" => Ok(CubeFace::NegX),
        "+y" => Ok(CubeFace::PosY),
        "-y" => Ok(CubeFace::NegY),
        "+z" => Ok(CubeFace::PosZ),
        "-z" => Ok(CubeFace::NegZ),
        _ => Err(format!("unknown cube face {value}")),
    }
}

fn parse_replace(value: &str) -> Option<MipReplacement> {
    match value.to_ascii_lowercase().as_str() {
        "once" => Some(MipReplacement::Once),
        "continue" => Some(MipReplacement::Continue),
        _ => None,
    }
}

fn parse_size(value: &str) -> Result<SizeArg, String> {
    let size = match value.to_ascii_lowercase().as_str() {
        "nextpo2" => SizeArg::NextPO2,
        "nearestpo2" => SizeArg::NearestPO2,
        "width" => SizeArg::Width,
        "width-nextpo2" => SizeArg::WidthNextPO2,
        "width-nearestpo2" => SizeArg::WidthNearestPO2,
        "height" => SizeArg::Height,
        "height-nextpo2" => SizeArg::HeightNextPO2,
        "height-nearestpo2" => SizeArg::HeightNearestPO2,
        "min" => SizeArg::Min,
        "min-nextpo2" => SizeArg::MinNextPO2,
        "min-nearestpo2" => SizeArg::MinNearestPO2,
        "max" => SizeArg::Max,
        "max-nextpo2" => SizeArg::MaxNextPO2,
        "max-nearestpo2" => SizeArg::MaxNearestPO2,
        _ => {
            let pixels: u32 =
                value.parse().map_err(|_| format!("invalid size {value}"))?;
            SizeArg::Fixed(pixels)
        }
    };
    Ok(size)
}

fn parse_channel(value: char) -> Result<Channel, String> {
    match value.to_ascii_lowercase() {
        'r' => Ok(Channel::Red),
        'g' => Ok(Channel::Green),
        'b' => Ok(Channel::Blue),
        'a' => Ok(Channel::Alpha),
        'x' => Ok(Channel::None),
        _ => Err("swizzle must contain 4 elements of r, g, b, a, or x".into()),
    }
}

fn parse_filter(value: &str) -> Result<ResizeFilter, String> {
    value.parse().map_err(|_| format!("unknown filter {value}"))
}

/// Parses the tail of a custom-mip entry: `level [depth] [face] [once|continue] file`.
fn parse_custom_mip(
    values: &[String],
    custom_mips: &mut HashMap<ImageIndex, (String, MipReplacement)>,
) -> Result<(), String> {
    let mut iter = values.iter().peekable();
    let level: u32 = iter
        .next()
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| "invalid mip level".to_string())?;

    let mut depth = 0u32;
    if let Some(value) = iter.peek() {
        if let Ok(parsed) = value.parse() {
            depth = parsed;
            iter.next();
        }
    }

    let mut face = CubeFace::PosX;
    if let Some(value) = iter.peek() {
        if let Ok(parsed) = parse_cube_face(value.as_str()) {
            face = parsed;
            iter.next();
        }
    }

    let mut replace = MipReplacement::Continue;
    if let Some(value) = iter.peek() {
        if let Some(parsed) = parse_replace(value.as_str()) {
            replace = parsed;
            iter.next();
        }
    }

    let file = iter.next().ok_or_else(|| {
        format!("no file provided for custom mip level {level}, depth {depth}")
    })?;
    if iter.next().is_some() {
        return Err(format!("too many values for custom mip level {level}"));
    }

    if custom_mips
        .insert(ImageIndex::new(face, level, depth), (file.clone(), replace))
        .is_some()
    {
        return Err(format!(
            "custom mip for level {level}, depth {depth} already provided"
        ));
    }
    Ok(())
}

fn read_custom_mip_list(
    file_name: &str,
    custom_mips: &mut HashMap<ImageIndex, (String, MipReplacement)>,
) -> Result<(), String> {
    let content = fs::read_to_string(file_name)
        .map_err(|_| format!("couldn't open custom mip file '{file_name}'"))?;
    for line in content.lines() {
        let values: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        if values.is_empty() {
            continue;
        }
        parse_custom_mip(&values, custom_mips)?;
    }
    Ok(())
}

fn read_image_list(file_name: &str) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(file_name)
        .map_err(|_| format!("couldn't open image list file '{file_name}'"))?;
    Ok(content.lines().filter(|l| !l.is_empty()).map(str::to_string).collect())
}

impl Args {
    pub fn parse() -> Result<Args, String> {
        let matches = match command().try_get_matches() {
            Ok(matches) => matches,
            Err(e)
                if matches!(
                    e.kind(),
                    clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
                ) =>
            {
                let _ = e.print();
                std::process::exit(0);
            }
            Err(e) => {
                let _ = e.print();
                std::process::exit(1);
            }
        };

        let mut args = Args {
            jobs: 1,
            log: if matches.get_flag("quiet") {
                LogLevel::Quiet
            } else if matches.get_flag("verbose") {
                LogLevel::Verbose
            } else {
                LogLevel::Normal
            },
            image_type: ImageType::Image,
            images: Vec::new(),
            width: SizeArg::Original,
            height: SizeArg::Original,
            resize_filter: ResizeFilter::CatmullRom,
            mip_levels: 1,
            mip_filter: ResizeFilter::CatmullRom,
            custom_mips: HashMap::new(),
            flip_x: matches.get_flag("flipx"),
            flip_y: matches.get_flag("flipy"),
            rotate: None,
            normal_map: false,
            normal_options: NormalOptions::default(),
            normal_height: 1.0,
            grayscale: matches.get_flag("grayscale"),
            swizzle: None,
            color_mask: ColorMask::default(),
            image_color_space: ColorSpace::Linear,
            texture_color_space: ColorSpace::Linear,
            pre_multiply: matches.get_flag("pre-multiply"),
            dimension: Dimension::Dim2D,
            format: Format::Unknown,
            ty: Type::UNorm,
            alpha: Alpha::Standard,
            quality: Quality::Normal,
            output: String::new(),
            file_type: FileType::Auto,
            create_dir: matches.get_flag("create-dir"),
        };
        let mut type_set = false;
        let mut alpha_set = false;

        if matches.contains_id("jobs") {
            args.jobs = match matches.get_one::<String>("jobs") {
                Some(value) => value
                    .parse()
                    .map_err(|_| format!("invalid job count {value}"))?,
                None => texc::ALL_CORES,
            };
        }

        // Input families are mutually exclusive.
        let mut input_kinds = 0;
        if let Some(file) = matches.get_one::<String>("input") {
            input_kinds += 1;
            args.image_type = ImageType::Image;
            args.images.push(file.clone());
        }
        if let Some(occurrences) = matches.get_occurrences::<String>("array") {
            input_kinds += 1;
            args.image_type = ImageType::Array;
            for values in occurrences {
                let values: Vec<&String> = values.collect();
                let (index, file) = match values.as_slice() {
                    [file] => (args.images.len(), *file),
                    [index, file] => (
                        index
                            .parse()
                            .map_err(|_| format!("invalid index {index}"))?,
                        *file,
                    ),
                    _ => return Err("--array takes 1 or 2 arguments".into()),
                };
                if index >= args.images.len() {
                    args.images.resize(index + 1, String::new());
                }
                if !args.images[index].is_empty() {
                    return Err(format!("image for index {index} already provided"));
                }
                args.images[index] = file.clone();
            }
        }
        if let Some(occurrences) = matches.get_occurrences::<String>("cube") {
            input_kinds += 1;
            args.image_type = ImageType::Cube;
            args.images.resize(6, String::new());
            for values in occurrences {
                let values: Vec<&String> = values.collect();
                let [face, file] = values.as_slice() else {
                    return Err("--cube takes 2 arguments".into());
                };
                let face = parse_cube_face(face)?;
                if !args.images[face.index()].is_empty() {
                    return Err(format!("image for face {face:?} already provided"));
                }
                args.images[face.index()] = (*file).clone();
            }
        }
        if let Some(occurrences) = matches.get_occurrences::<String>("cube-array") {
            input_kinds += 1;
            args.image_type = ImageType::CubeArray;
            for values in occurrences {
                let values: Vec<&String> = values.collect();
                let [index, face, file] = values.as_slice() else {
                    return Err("--cube-array takes 3 arguments".into());
                };
                let index: usize = index
                    .parse()
                    .map_err(|_| format!("invalid index {index}"))?;
                let face = parse_cube_face(face)?;
                if (index + 1) * 6 > args.images.len() {
                    args.images.resize((index + 1) * 6, String::new());
                }
                let slot = index * 6 + face.index();
                if !args.images[slot].is_empty() {
                    return Err(format!(
                        "image for index {index} and face {face:?} already provided"
                    ));
                }
                args.images[slot] = (*file).clone();
            }
        }
        if let Some(mut values) = matches.get_many::<String>("input-list") {
            input_kinds += 1;
            let kind = values.next().expect("list type");
            let file = values.next().expect("list file");
            args.image_type = match kind.to_ascii_lowercase().as_str() {
                "image" => ImageType::Image,
                "array" => ImageType::Array,
                "cube" => ImageType::Cube,
                "cube-array" => ImageType::CubeArray,
                _ => return Err(format!("unknown image type {kind}")),
            };
            args.images = read_image_list(file)?;
        }
        if input_kinds > 1 {
            return Err("cannot mix different types of image inputs".into());
        }

        if let Some(values) = matches.get_many::<String>("resize") {
            let values: Vec<&String> = values.collect();
            args.width = parse_size(values[0])?;
            args.height = parse_size(values[1])?;
            if let Some(filter) = values.get(2) {
                args.resize_filter = parse_filter(filter)?;
            }
        }

        if matches.contains_id("mipmap") {
            args.mip_levels = texc::ALL_MIP_LEVELS;
            if let Some(values) = matches.get_many::<String>("mipmap") {
                for value in values {
                    if let Ok(levels) = value.parse::<u32>() {
                        args.mip_levels = levels;
                    } else {
                        args.mip_filter = parse_filter(value)?;
                    }
                }
            }
        }

        if let Some(occurrences) = matches.get_occurrences::<String>("custom-mip") {
            for values in occurrences {
                let values: Vec<String> = values.cloned().collect();
                parse_custom_mip(&values, &mut args.custom_mips)?;
            }
        }
        if let Some(file) = matches.get_one::<String>("custom-mip-list") {
            read_custom_mip_list(file, &mut args.custom_mips)?;
        }

        if let Some(value) = matches.get_one::<String>("rotate") {
            let angle: i64 = value
                .parse()
                .map_err(|_| "rotate angle must be a multiple of 90 degrees".to_string())?;
            if angle % 90 != 0 {
                return Err("rotate angle must be a multiple of 90 degrees".into());
            }
            args.rotate = match (angle / 90).rem_euclid(4) {
                1 => Some(RotateAngle::CW90),
                2 => Some(RotateAngle::CW180),
                3 => Some(RotateAngle::CW270),
                _ => None,
            };
        }

        if matches.contains_id("normalmap") {
            args.normal_map = true;
            if let Some(values) = matches.get_many::<String>("normalmap") {
                for value in values {
                    match value.to_ascii_lowercase().as_str() {
                        "wrap" => {
                            args.normal_options |= NormalOptions::WRAP_X | NormalOptions::WRAP_Y
                        }
                        "wrapx" => args.normal_options |= NormalOptions::WRAP_X,
                        "wrapy" => args.normal_options |= NormalOptions::WRAP_Y,
                        other => {
                            args.normal_height = other
                                .parse()
                                .map_err(|_| format!("invalid normal map height {other}"))?;
                        }
                    }
                }
            }
        }

        if let Some(value) = matches.get_one::<String>("alpha") {
            args.alpha = value
                .parse()
                .map_err(|_| format!("unknown alpha type {value}"))?;
            alpha_set = true;
        }

        if let Some(value) = matches.get_one::<String>("swizzle") {
            let chars: Vec<char> = value.chars().collect();
            if chars.len() != 4 {
                return Err("swizzle must contain 4 elements of r, g, b, a, or x".into());
            }
            let swizzle = [
                parse_channel(chars[0])?,
                parse_channel(chars[1])?,
                parse_channel(chars[2])?,
                parse_channel(chars[3])?,
            ];
            args.color_mask.r = swizzle[0] != Channel::None;
            args.color_mask.g = swizzle[1] != Channel::None;
            args.color_mask.b = swizzle[2] != Channel::None;
            args.color_mask.a = swizzle[3] != Channel::None;
            if !alpha_set && !args.color_mask.a {
                args.alpha = Alpha::None;
            }
            args.swizzle = Some(swizzle);
        }

        if matches.get_flag("srgb") {
            args.image_color_space = ColorSpace::Srgb;
            args.texture_color_space = ColorSpace::Srgb;
        }
        if args.pre_multiply && !alpha_set && args.color_mask.a {
            args.alpha = Alpha::PreMultiplied;
        }

        if let Some(value) = matches.get_one::<String>("dimension") {
            args.dimension = match value.as_str() {
                "1" => Dimension::Dim1D,
                "2" => Dimension::Dim2D,
                "3" => Dimension::Dim3D,
                _ => return Err(format!("unknown dimension {value}")),
            };
        }

        if let Some(value) = matches.get_one::<String>("format") {
            args.format = value
                .parse()
                .map_err(|_| format!("unknown format {value}"))?;
            if args.format == Format::Unknown {
                return Err(format!("unknown format {value}"));
            }
        }

        if let Some(value) = matches.get_one::<String>("type") {
            args.ty = value.parse().map_err(|_| format!("unknown type {value}"))?;
            type_set = true;
        }
        // UFloat-only formats default their type.
        if !type_set
            && matches!(
                args.format,
                Format::B10G11R11_UFloat | Format::E5B9G9R9_UFloat | Format::BC6H
            )
        {
            args.ty = Type::UFloat;
        }

        if let Some(value) = matches.get_one::<String>("quality") {
            args.quality = value
                .parse()
                .map_err(|_| format!("unknown quality {value}"))?;
        }

        if let Some(value) = matches.get_one::<String>("output") {
            args.output = value.clone();
        }

        if let Some(value) = matches.get_one::<String>("file-format") {
            args.file_type = value
                .parse()
                .map_err(|_| format!("unknown file format {value}"))?;
        }

        args.validate()?;
        Ok(args)
    }

    fn validate(&mut self) -> Result<(), String> {
        if self.images.is_empty() {
            return Err("an input image must be provided".into());
        }

        match self.image_type {
            ImageType::Image => {
                if self.images.len() != 1 {
                    return Err(
                        "only 1 input image may be provided for a standard texture".into()
                    );
                }
            }
            ImageType::Cube => {
                if self.images.len() != 6 {
                    return Err("6 images must be provided for a cubemap texture".into());
                }
                if self.dimension != Dimension::Dim2D {
                    return Err("cubemap texture must have a dimension of 2".into());
                }
                self.dimension = Dimension::Cube;
            }
            ImageType::CubeArray => {
                if self.images.len() % 6 != 0 {
                    return Err(
                        "a multiple of 6 images must be provided for a cubemap texture".into()
                    );
                }
                if self.dimension != Dimension::Dim2D {
                    return Err("cubemap texture must have a dimension of 2".into());
                }
                self.dimension = Dimension::Cube;
            }
            ImageType::Array => {}
        }

        if self.images.iter().any(String::is_empty) {
            return Err("not all images were provided".into());
        }

        if self.format == Format::Unknown {
            return Err("texture format cannot be determined".into());
        }

        if self.output.is_empty() {
            return Err("output file must be provided".into());
        }

        if self.file_type == FileType::Auto {
            self.file_type = FileType::from_file_name(&self.output);
            if self.file_type == FileType::Auto {
                return Err(format!("cannot deduce file type for '{}'", self.output));
            }
        }

        if !texc::is_format_valid_for_file(self.format, self.ty, self.file_type) {
            return Err(format!(
                "file format {} doesn't support format {} with type {}",
                self.file_type.as_ref(),
                self.format.as_ref(),
                self.ty.as_ref()
            ));
        }

        // sRGB storage silently falls back to linear when the format has no native sRGB
        // representation; low-precision targets get a quality warning.
        if self.texture_color_space == ColorSpace::Srgb
            && !texc::has_native_srgb(self.format, self.ty)
        {
            self.texture_color_space = ColorSpace::Linear;
        }
        if self.image_color_space == ColorSpace::Srgb
            && matches!(
                self.format,
                Format::R4G4
                    | Format::R4G4B4A4
                    | Format::B4G4R4A4
                    | Format::A4R4G4B4
                    | Format::R5G6B5
                    | Format::B5G6R5
                    | Format::R5G5B5A1
                    | Format::A1R5G5B5
                    | Format::R8
                    | Format::R8G8
                    | Format::ETC1
            )
        {
            log::warn!(
                "performing sRGB conversion for a low-precision texture format; \
                 this may result in a noticeable loss of quality"
            );
        }

        if self.mip_levels <= 1 && !self.custom_mips.is_empty() {
            return Err("cannot specify custom mip images without generating mipmaps".into());
        }

        let depth = self.images.len() as u32;
        let mut level_depth_counts: Vec<u32> = Vec::new();
        for index in self.custom_mips.keys() {
            if index.mip_level == 0 {
                return Err("cannot provide custom mip for level 0".into());
            }

            let mut level_depth = depth;
            if self.dimension == Dimension::Dim3D {
                level_depth = (depth >> index.mip_level).max(1);
                if level_depth_counts.len() <= index.mip_level as usize {
                    level_depth_counts.resize(index.mip_level as usize + 1, 0);
                }
                level_depth_counts[index.mip_level as usize] += 1;
            }

            if index.depth >= level_depth.max(1) {
                return Err(format!(
                    "custom mip depth {} out of range for level {}",
                    index.depth, index.mip_level
                ));
            }
        }

        // 3D textures must override either no depths or all depths of a level.
        for (level, &count) in level_depth_counts.iter().enumerate() {
            let level_depth = (depth >> level).max(1);
            if count > 0 && count != level_depth {
                return Err(format!(
                    "must provide custom mips for all depths in level {level}"
                ));
            }
        }

        Ok(())
    }
}
