//! Error types shared by the whole pipeline.

use std::fmt::{Display, Formatter};

/// An error that may occur while loading, manipulating or converting textures.
#[derive(Debug)]
pub enum Error {
    /// The requested storage format, numeric type or layout combination is not supported.
    UnsupportedFormat,
    /// A grayscale (or scalar float) conversion was requested without enabling grayscale
    /// conversion for a source that is not already grayscale.
    GrayscaleRequired,
    /// Input data was invalid: missing images, mismatched dimensions or out-of-range indices.
    InvalidInput(String),
    /// The bitmap decoder could not recognize or decode the source data.
    Decode(image::ImageError),
    /// A block encoder could not be set up or failed while encoding.
    Encoder(String),
    /// An i/o error.
    Io(std::io::Error),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UnsupportedFormat => write!(f, "Unsupported format!"),
            Error::GrayscaleRequired => {
                write!(f, "Grayscale conversion required for this layout")
            }
            Error::InvalidInput(v) => write!(f, "Invalid input: {v}"),
            Error::Decode(v) => write!(f, "Image decoding error: {v}"),
            Error::Encoder(v) => write!(f, "Encoder error: {v}"),
            Error::Io(v) => write!(f, "An i/o error has occurred: {v}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<image::ImageError> for Error {
    fn from(v: image::ImageError) -> Self {
        Self::Decode(v)
    }
}

impl From<std::io::Error> for Error {
    fn from(v: std::io::Error) -> Self {
        Self::Io(v)
    }
}

/// The outcome of saving a texture container.
#[derive(Debug)]
pub enum SaveError {
    /// The texture has no converted payload to write.
    Invalid,
    /// The container format could not be determined.
    UnknownFormat,
    /// The container cannot express the texture's (format, type) pair.
    Unsupported,
    /// Writing to the output stream failed.
    Write(std::io::Error),
}

impl Display for SaveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveError::Invalid => write!(f, "texture parameters were invalid"),
            SaveError::UnknownFormat => write!(f, "unknown texture file format"),
            SaveError::Unsupported => {
                write!(f, "texture format unsupported by target file format")
            }
            SaveError::Write(v) => write!(f, "couldn't write texture: {v}"),
        }
    }
}

impl std::error::Error for SaveError {}

impl From<std::io::Error> for SaveError {
    fn from(v: std::io::Error) -> Self {
        Self::Write(v)
    }
}
