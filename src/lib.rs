//! # pnmio
//!
//! A streaming codec for the binary PNM image formats — P5 (PGM grayscale),
//! P6 (PPM RGB) and P7 (PAM, 1 to 4 channels) — over three interchangeable
//! I/O backends: files, in-memory slices, and caller-supplied callbacks.
//!
//! Decoding can relayout pixels to any channel count from 1 (gray) to 4
//! (rgb + alpha), synthesizing gray and alpha as needed. Only 8-bit samples
//! are supported; headers declaring any other maximum sample value are
//! rejected.
//!
//! ## Usage
//!
//! ```no_run
//! use pnmio::{PnmDecoder, PnmEncoder};
//!
//! // Probe a header without touching pixel data
//! let info = PnmDecoder::from_path("photo.ppm")?.info()?;
//! println!("{}x{}, {} channels", info.width, info.height, info.channels);
//!
//! // Decode to rgb+alpha regardless of the source layout
//! let image = PnmDecoder::from_path("photo.ppm")?.decode(4)?;
//!
//! // Write it back out; 4 channels always use the P7 header
//! PnmEncoder::to_path("copy.pam")?.encode(
//!     image.width,
//!     image.height,
//!     4,
//!     image.pixels(),
//! )?;
//! # Ok::<(), pnmio::PnmError>(())
//! ```
//!
//! Custom byte sources and sinks plug in through the [`PullSource`] and
//! [`PushSink`] traits; [`PnmDecoder::from_stream`] and
//! [`PnmEncoder::to_stream`] adapt plain closures.

#![forbid(unsafe_code)]

mod backend;
mod decode;
mod encode;
mod error;
mod info;

/// Size of the read-ahead and write-behind buffers.
pub(crate) const BUFFER_CAP: usize = 2048;

pub use backend::{FileSink, FileSource, MemorySource, PullSource, PushSink, StreamSink, StreamSource};
pub use decode::{DecodedImage, PnmDecoder};
pub use encode::PnmEncoder;
pub use error::PnmError;
pub use info::{ImageInfo, PnmFormat};
