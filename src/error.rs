use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong while stripping GPS data from one photo.
///
/// Codec failures (`NotAJpeg` through `SegmentTooLarge`) describe a single
/// file and are reported per file by the batch layer. `PathNotFound` and `Io`
/// carry the offending path.
#[derive(Error, Debug)]
pub enum StripError {
    #[error("not a JPEG file (missing start-of-image marker)")]
    NotAJpeg,
    #[error("truncated file: segment at offset {offset} declares {declared} bytes, {available} available")]
    TruncatedFile {
        offset: usize,
        declared: usize,
        available: usize,
    },
    #[error("malformed IFD: {0}")]
    MalformedIfd(String),
    #[error("unsupported metadata variant: {0}")]
    UnsupportedVariant(String),
    #[error("encoded EXIF payload of {0} bytes does not fit in a JPEG segment")]
    SegmentTooLarge(usize),
    #[error("path not found: {0}")]
    PathNotFound(PathBuf),
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StripError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short stable name of the error kind, used in JSON reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotAJpeg => "not_a_jpeg",
            Self::TruncatedFile { .. } => "truncated_file",
            Self::MalformedIfd(_) => "malformed_ifd",
            Self::UnsupportedVariant(_) => "unsupported_variant",
            Self::SegmentTooLarge(_) => "segment_too_large",
            Self::PathNotFound(_) => "path_not_found",
            Self::Io { .. } => "io_failure",
        }
    }
}

pub type Result<T> = std::result::Result<T, StripError>;
