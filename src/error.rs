//! Error types for GIF decoding.

use thiserror::Error;

/// Errors produced while parsing or decoding a GIF stream.
#[derive(Error, Debug)]
pub enum GifError {
    /// An I/O error from the underlying source.
    #[error("I/O error reading GIF stream: {0}")]
    Io(#[from] std::io::Error),

    /// The stream does not follow the GIF grammar.
    #[error("invalid GIF data: {0}")]
    Format(String),

    /// A block carried an unknown type byte where an image descriptor,
    /// extension introducer, or trailer was expected.
    #[error("unexpected block type 0x{0:02x}")]
    UnexpectedBlock(u8),

    /// The LZW minimum code size was outside the valid 1..=8 range.
    #[error("invalid LZW minimum code size: {0}")]
    BadCodeSize(u8),

    /// A data sub-block declared more bytes than the stream contains.
    #[error("truncated image data sub-block: {0}")]
    TruncatedBlock(#[source] std::io::Error),

    /// The requested frame index is beyond the end of the image sequence.
    #[error("no frame at index {index}")]
    NoSuchFrame { index: usize },

    /// A frame below the forward-only floor was requested.
    #[error("cannot seek backward to frame {index} (minimum allowed {min_index})")]
    SeekBackward { index: usize, min_index: usize },

    /// Frame counting with search needs backward seeks, which forward-only
    /// mode forbids.
    #[error("frame search is unavailable on a forward-only stream")]
    ForwardOnlySearch,

    /// A caller-supplied pixel buffer cannot hold the requested extent.
    #[error("pixel buffer too small: need {needed} bytes at offset {offset}, have {available}")]
    BufferTooSmall {
        needed: usize,
        offset: usize,
        available: usize,
    },
}

impl GifError {
    /// True for errors that mean "the requested frame does not exist or is
    /// not reachable", as opposed to corrupt data or I/O failure.
    pub fn is_out_of_range(&self) -> bool {
        matches!(
            self,
            GifError::NoSuchFrame { .. } | GifError::SeekBackward { .. }
        )
    }

    /// True when the error wraps an underlying I/O failure.
    pub fn is_io(&self) -> bool {
        matches!(self, GifError::Io(_) | GifError::TruncatedBlock(_))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GifError>;
