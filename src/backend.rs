//! Byte source and sink backends.
//!
//! The decoder and encoder are generic over these two small capability
//! traits rather than dispatching on a backend tag, so every provider keeps
//! its state private and the buffered cursor behaves identically regardless
//! of where the bytes come from.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::PnmError;

/// A pull-based byte source.
pub trait PullSource {
    /// Read up to `buf.len()` bytes into `buf`, returning how many were
    /// written. `Ok(0)` means the stream has ended.
    fn pull(&mut self, buf: &mut [u8]) -> Result<usize, PnmError>;
}

/// A push-based byte sink.
pub trait PushSink {
    /// Accept every byte of `buf`, or report why that was not possible.
    fn push(&mut self, buf: &[u8]) -> Result<(), PnmError>;
}

/// Reads from a file, tracking the bytes left from the size at open time.
pub struct FileSource {
    file: File,
    remaining: u64,
}

impl FileSource {
    /// Open `path` for reading. The handle is held for the source's
    /// lifetime and closed when it is dropped.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PnmError> {
        let file = File::open(path)?;
        let remaining = file.metadata()?.len();
        Ok(Self { file, remaining })
    }
}

impl PullSource for FileSource {
    fn pull(&mut self, buf: &mut [u8]) -> Result<usize, PnmError> {
        if self.remaining == 0 {
            return Ok(0);
        }
        let want = usize::try_from(self.remaining)
            .unwrap_or(usize::MAX)
            .min(buf.len());
        let read = self.file.read(&mut buf[..want])?;
        self.remaining -= read as u64;
        Ok(read)
    }
}

/// Reads from a borrowed byte slice.
pub struct MemorySource<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> MemorySource<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }
}

impl PullSource for MemorySource<'_> {
    fn pull(&mut self, buf: &mut [u8]) -> Result<usize, PnmError> {
        let rest = &self.data[self.pos..];
        let n = rest.len().min(buf.len());
        buf[..n].copy_from_slice(&rest[..n]);
        self.pos += n;
        Ok(n)
    }
}

/// Reads by calling a caller-supplied closure.
///
/// The closure fills the buffer it is handed and returns how many bytes it
/// wrote. Returning `Ok(0)` means "no data yet" — a non-blocking source may
/// do this freely, and the pull loops until it sees data or an error.
/// A clean end of input is signalled by [`PnmError::UnexpectedEof`].
pub struct StreamSource<F> {
    read: F,
}

impl<F> StreamSource<F>
where
    F: FnMut(&mut [u8]) -> Result<usize, PnmError>,
{
    pub fn new(read: F) -> Self {
        Self { read }
    }
}

impl<F> PullSource for StreamSource<F>
where
    F: FnMut(&mut [u8]) -> Result<usize, PnmError>,
{
    fn pull(&mut self, buf: &mut [u8]) -> Result<usize, PnmError> {
        loop {
            match (self.read)(buf) {
                Ok(0) => continue,
                Ok(n) => return Ok(n.min(buf.len())),
                Err(PnmError::UnexpectedEof) => return Ok(0),
                Err(e) => return Err(e),
            }
        }
    }
}

/// Writes to a file created at construction time.
pub struct FileSink {
    file: File,
}

impl FileSink {
    /// Create (or truncate) `path` for writing.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, PnmError> {
        Ok(Self {
            file: File::create(path)?,
        })
    }
}

impl PushSink for FileSink {
    fn push(&mut self, buf: &[u8]) -> Result<(), PnmError> {
        self.file.write_all(buf)?;
        Ok(())
    }
}

/// Writes by calling a caller-supplied closure with each flushed chunk.
pub struct StreamSink<F> {
    write: F,
}

impl<F> StreamSink<F>
where
    F: FnMut(&[u8]) -> Result<(), PnmError>,
{
    pub fn new(write: F) -> Self {
        Self { write }
    }
}

impl<F> PushSink for StreamSink<F>
where
    F: FnMut(&[u8]) -> Result<(), PnmError>,
{
    fn push(&mut self, buf: &[u8]) -> Result<(), PnmError> {
        (self.write)(buf)
    }
}
