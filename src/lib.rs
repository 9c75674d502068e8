//! Streaming GIF decoder with random frame access.
//!
//! Decodes GIF87a/89a streams from any `Read + Seek` source without loading
//! the file up front. Frames can be located by index (an offset table makes
//! repeat access cheap), their metadata inspected, and their pixels decoded
//! either into an owned indexed raster or, for animation playback, composited
//! directly into a caller-supplied RGBA buffer.
//!
//! # Features
//!
//! - Header and logical screen descriptor parsing, global/local color tables
//! - Frame location by index with cached offsets and an optional
//!   forward-only mode
//! - Full frame metadata: graphic control, comments, plain text, and
//!   application extensions
//! - Adaptive LZW decompression tolerant of out-of-sequence codes
//! - Four-pass interlacing and partial-region decodes
//! - A sequential direct-to-RGBA fast path for animation playback
//!
//! # Example
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! use gifstream::GifDecoder;
//!
//! let file = File::open("animation.gif").unwrap();
//! let mut decoder = GifDecoder::new(BufReader::new(file));
//!
//! let meta = decoder.stream_metadata().unwrap();
//! println!("logical screen: {}x{}", meta.width, meta.height);
//!
//! let frame = decoder.read_frame(0).unwrap();
//! println!(
//!     "frame 0: {}x{}, {}-bit palette",
//!     frame.width(),
//!     frame.height(),
//!     frame.palette().bits()
//! );
//! ```

mod blocks;
mod decoder;
mod error;
mod input;
mod interlace;
mod lzw;
mod palette;
mod raster;
mod types;

pub use decoder::{DirectParams, GifDecoder};
pub use error::{GifError, Result};
pub use palette::Palette;
pub use raster::IndexedImage;
pub use types::{
    ApplicationExtension, DisposalMethod, FrameMetadata, PlainText, Region, StreamMetadata,
};
