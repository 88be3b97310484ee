//! Command-line texture converter: loads images, applies the requested manipulations,
//! builds the texture pyramid, converts it and writes the container file.
//!
//! Exit codes: 0 success, 1 argument error, 2 input load error, 3 conversion/save error.

use args::{Args, ImageType, LogLevel, SizeArg};
use std::path::Path;
use std::process::ExitCode;
use texc::{
    adjust_image_value_range, CubeFace, CustomMipImage, CustomMipImages, Image, NormalOptions,
    PixelFormat, SaveError, Texture, Type,
};

mod args;

fn next_po2(size: u32) -> u32 {
    size.max(1).next_power_of_two()
}

fn nearest_po2(size: u32) -> u32 {
    let next = next_po2(size);
    let prev = next >> 1;
    if prev == 0 {
        return next;
    }
    if next - size < size - prev {
        next
    } else {
        prev
    }
}

fn resolve_size(size: SizeArg, current: u32, width: u32, height: u32) -> u32 {
    match size {
        SizeArg::Original => current,
        SizeArg::Fixed(pixels) => pixels,
        SizeArg::NextPO2 => next_po2(current),
        SizeArg::NearestPO2 => nearest_po2(current),
        SizeArg::Width => width,
        SizeArg::WidthNextPO2 => next_po2(width),
        SizeArg::WidthNearestPO2 => nearest_po2(width),
        SizeArg::Height => height,
        SizeArg::HeightNextPO2 => next_po2(height),
        SizeArg::HeightNearestPO2 => nearest_po2(height),
        SizeArg::Min => width.min(height),
        SizeArg::MinNextPO2 => next_po2(width.min(height)),
        SizeArg::MinNearestPO2 => nearest_po2(width.min(height)),
        SizeArg::Max => width.max(height),
        SizeArg::MaxNextPO2 => next_po2(width.max(height)),
        SizeArg::MaxNearestPO2 => nearest_po2(width.max(height)),
    }
}

fn is_signed(ty: Type) -> bool {
    matches!(ty, Type::SNorm | Type::Int | Type::Float)
}

fn create_parent_dir(path: &str) -> std::io::Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Loads and manipulates one input image per the argument set.
fn load_image(file_name: &str, args: &Args, base: Option<(u32, u32)>) -> Result<Image, String> {
    log::debug!("loading image '{file_name}'");
    let mut image = Image::load(file_name, args.image_color_space)
        .map_err(|e| format!("couldn't load image '{file_name}': {e}"))?;

    let orig_format = image.format();
    if orig_format != PixelFormat::RGBAF {
        log::debug!("converting image '{file_name}' to RGBAF");
        image = image
            .convert(PixelFormat::RGBAF, false)
            .map_err(|e| format!("couldn't convert image '{file_name}': {e}"))?;
    }

    if args.texture_color_space != args.image_color_space {
        log::debug!("converting image '{file_name}' from sRGB to linear");
        image.change_color_space(args.texture_color_space);
    }

    // Sizes derive from the first image so all layers stay consistent.
    let (base_width, base_height) = base.unwrap_or((image.width(), image.height()));
    let width = resolve_size(args.width, base_width, base_width, base_height);
    let height = resolve_size(args.height, base_height, base_width, base_height);
    if width != image.width() || height != image.height() {
        log::debug!("resizing image '{file_name}' to {width} x {height}");
        image = image
            .resize(width, height, args.resize_filter)
            .map_err(|e| format!("couldn't resize image '{file_name}': {e}"))?;
    }

    if let Some(angle) = args.rotate {
        log::debug!("rotating image '{file_name}'");
        image = image
            .rotate(angle)
            .map_err(|e| format!("couldn't rotate image '{file_name}': {e}"))?;
    }

    let mut adjusted_format = orig_format;
    if args.grayscale {
        log::debug!("converting image '{file_name}' to grayscale");
        image.grayscale();
    }

    if args.normal_map {
        log::debug!("generating normalmap for image '{file_name}'");
        let mut options = args.normal_options;
        if is_signed(args.ty) {
            options |= NormalOptions::KEEP_SIGN;
        }
        image = image
            .create_normal_map(options, args.normal_height, PixelFormat::RGBAF)
            .map_err(|e| format!("couldn't create normalmap for '{file_name}': {e}"))?;
        // The image no longer matches the original input.
        adjusted_format = image.format();
    }

    if args.flip_x {
        log::debug!("flipping image '{file_name}' along the X axis");
        image.flip_horizontal();
    }
    if args.flip_y {
        log::debug!("flipping image '{file_name}' along the Y axis");
        image.flip_vertical();
    }

    if let Some([r, g, b, a]) = args.swizzle {
        log::debug!("swizzling image '{file_name}'");
        image.swizzle(r, g, b, a);
    }

    if args.pre_multiply {
        log::debug!("pre-multiplying alpha for image '{file_name}'");
        image.pre_multiply_alpha();
    }

    adjust_image_value_range(&mut image, args.ty, adjusted_format)
        .map_err(|e| format!("couldn't adjust value range for '{file_name}': {e}"))?;
    Ok(image)
}

fn load_images(args: &Args) -> Result<Vec<Image>, String> {
    let mut images = Vec::with_capacity(args.images.len());
    let mut base = None;
    for file_name in &args.images {
        let image = load_image(file_name, args, base)?;
        if base.is_none() {
            base = Some((image.width(), image.height()));
        }
        images.push(image);
    }
    Ok(images)
}

fn load_custom_mips(args: &Args) -> Result<CustomMipImages, String> {
    let mut custom = CustomMipImages::default();
    for (index, (file_name, replacement)) in &args.custom_mips {
        let image = Image::load(file_name, args.image_color_space)
            .map_err(|e| format!("couldn't load image '{file_name}': {e}"))?;
        custom.insert(*index, CustomMipImage::new(image, *replacement));
    }
    Ok(custom)
}

fn build_and_save(images: Vec<Image>, args: &Args) -> Result<(), String> {
    let depth = match args.image_type {
        ImageType::Array => images.len() as u32,
        ImageType::CubeArray => images.len() as u32 / 6,
        _ => 0,
    };

    let (width, height) = (images[0].width(), images[0].height());
    let mut texture = Texture::new(args.dimension, width, height, depth, 1, args.texture_color_space)
        .map_err(|e| format!("couldn't create texture: {e}"))?;

    for (i, image) in images.into_iter().enumerate() {
        let (face, slot_depth) = match args.image_type {
            ImageType::Cube => (CubeFace::ALL[i], 0),
            ImageType::CubeArray => (CubeFace::ALL[i % 6], i as u32 / 6),
            _ => (CubeFace::PosX, i as u32),
        };
        texture
            .set_image(image, face, 0, slot_depth)
            .map_err(|e| format!("couldn't assign image: {e}"))?;
    }

    if args.mip_levels > 1 {
        log::debug!("generating mipmaps");
        let custom = load_custom_mips(args)?;
        texture
            .generate_mipmaps(args.mip_filter, args.mip_levels, &custom)
            .map_err(|e| format!("couldn't generate mipmaps: {e}"))?;
    }

    log::debug!("converting texture");
    texture
        .convert(args.format, args.ty, args.quality, args.alpha, args.color_mask, args.jobs)
        .map_err(|e| format!("failed to convert texture: {e}"))?;

    if args.log != LogLevel::Quiet {
        println!("saving texture '{}'", args.output);
    }
    match texture.save(&args.output, args.file_type) {
        Ok(()) => Ok(()),
        Err(SaveError::Write(_)) if args.create_dir => {
            // Create the directory off the failed save so an invalid format never leaves
            // directories behind.
            create_parent_dir(&args.output).map_err(|_| {
                format!("couldn't create parent directory for '{}'", args.output)
            })?;
            texture
                .save(&args.output, args.file_type)
                .map_err(|e| format!("couldn't write file '{}': {e}", args.output))
        }
        Err(e) => Err(format!("couldn't save '{}': {e}", args.output)),
    }
}

fn main() -> ExitCode {
    let args = match Args::parse() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("error: {message}");
            eprintln!("Run texc -h for usage.");
            return ExitCode::from(1);
        }
    };

    env_logger::Builder::new()
        .filter_level(match args.log {
            LogLevel::Quiet => log::LevelFilter::Error,
            LogLevel::Normal => log::LevelFilter::Warn,
            LogLevel::Verbose => log::LevelFilter::Debug,
        })
        .format_timestamp(None)
        .init();

    let images = match load_images(&args) {
        Ok(images) => images,
        Err(message) => {
            eprintln!("error: {message}");
            return ExitCode::from(2);
        }
    };

    if let Err(message) = build_and_save(images, &args) {
        eprintln!("error: {message}");
        return ExitCode::from(3);
    }

    ExitCode::SUCCESS
}
