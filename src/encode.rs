//! PNM encoding: buffered writing and header emission.

use std::path::Path;

use log::debug;

use crate::backend::{FileSink, PushSink, StreamSink};
use crate::error::PnmError;
use crate::info::emitted_tuple_type;
use crate::BUFFER_CAP;

/// A PNM encoder over any [`PushSink`].
///
/// One encoder performs one `encode` operation and is consumed by it. Like
/// the decoder, the first error is sticky and checked once at the end.
///
/// Channel counts 1 and 3 are written as binary P5/P6 unless
/// [`force_extended_header`](Self::force_extended_header) is set; 2 and 4
/// always use the P7 header, which is the only dialect that can carry
/// alpha.
pub struct PnmEncoder<S> {
    sink: S,
    error: Option<PnmError>,
    buf: [u8; BUFFER_CAP],
    buf_len: usize,
    force_extended_header: bool,
}

impl PnmEncoder<FileSink> {
    /// Encode into a file created (or truncated) at `path`.
    pub fn to_path(path: impl AsRef<Path>) -> Result<Self, PnmError> {
        Ok(Self::new(FileSink::create(path)?))
    }
}

impl<F> PnmEncoder<StreamSink<F>>
where
    F: FnMut(&[u8]) -> Result<(), PnmError>,
{
    /// Encode by handing each flushed chunk to `write`.
    pub fn to_stream(write: F) -> Self {
        Self::new(StreamSink::new(write))
    }
}

impl<S: PushSink> PnmEncoder<S> {
    /// Encode into any byte sink.
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            error: None,
            buf: [0; BUFFER_CAP],
            buf_len: 0,
            force_extended_header: false,
        }
    }

    /// Emit the P7 header even for 1- and 3-channel images.
    pub fn force_extended_header(mut self, force: bool) -> Self {
        self.force_extended_header = force;
        self
    }

    /// Write `width * height * channels` interleaved samples from `pixels`
    /// behind the matching header. The pixel layout must already match
    /// `channels`; no relayout happens on write.
    pub fn encode(
        mut self,
        width: u32,
        height: u32,
        channels: u32,
        pixels: &[u8],
    ) -> Result<(), PnmError> {
        if !(1..=4).contains(&channels) {
            return Err(PnmError::InvalidInput(
                "channel count must be between 1 and 4",
            ));
        }
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|px| px.checked_mul(channels as usize))
            .ok_or(PnmError::InvalidInput("image dimensions overflow"))?;
        if pixels.len() < len {
            return Err(PnmError::InvalidInput(
                "pixel buffer shorter than width * height * channels",
            ));
        }
        debug!("encoding {width}x{height}, {channels} channels");

        self.write_header(width, height, channels);
        self.write_bytes(&pixels[..len]);
        self.flush();
        self.check()
    }

    fn set_error(&mut self, error: PnmError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn check(&mut self) -> Result<(), PnmError> {
        match self.error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Append bytes to the output buffer, flushing whenever it fills.
    fn write_bytes(&mut self, mut data: &[u8]) {
        while !data.is_empty() {
            if self.error.is_some() {
                return;
            }
            if self.buf_len == BUFFER_CAP {
                self.flush();
                continue;
            }
            let n = data.len().min(BUFFER_CAP - self.buf_len);
            self.buf[self.buf_len..self.buf_len + n].copy_from_slice(&data[..n]);
            self.buf_len += n;
            data = &data[n..];
        }
    }

    /// Format `n` in decimal ASCII, no leading zeros.
    fn write_u32(&mut self, mut n: u32) {
        if n == 0 {
            self.write_bytes(b"0");
            return;
        }
        let mut digits = [0u8; 10];
        let mut at = digits.len();
        while n > 0 {
            at -= 1;
            digits[at] = b'0' + (n % 10) as u8;
            n /= 10;
        }
        self.write_bytes(&digits[at..]);
    }

    /// Push any buffered bytes to the sink. No-op when empty.
    fn flush(&mut self) {
        if self.error.is_some() || self.buf_len == 0 {
            return;
        }
        match self.sink.push(&self.buf[..self.buf_len]) {
            Ok(()) => self.buf_len = 0,
            Err(error) => self.set_error(error),
        }
    }

    fn write_header(&mut self, width: u32, height: u32, channels: u32) {
        let binary = matches!(channels, 1 | 3) && !self.force_extended_header;
        if binary {
            self.write_bytes(if channels == 1 { b"P5\n" } else { b"P6\n" });
            self.write_u32(width);
            self.write_bytes(b" ");
            self.write_u32(height);
            self.write_bytes(b"\n255\n");
        } else {
            self.write_bytes(b"P7\nWIDTH ");
            self.write_u32(width);
            self.write_bytes(b"\nHEIGHT ");
            self.write_u32(height);
            self.write_bytes(b"\nDEPTH ");
            self.write_u32(channels);
            self.write_bytes(b"\nMAXVAL 255\nTUPLTYPE ");
            self.write_bytes(emitted_tuple_type(channels).name.as_bytes());
            self.write_bytes(b"\nENDHDR\n");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u32_formatting() {
        let mut out = Vec::new();
        let mut e = PnmEncoder::to_stream(|chunk: &[u8]| {
            out.extend_from_slice(chunk);
            Ok(())
        });
        e.write_u32(0);
        e.write_u32(7);
        e.write_u32(4096);
        e.write_u32(u32::MAX);
        e.flush();
        assert!(e.error.is_none());
        drop(e);
        assert_eq!(out, b"0740964294967295");
    }

    #[test]
    fn binary_headers() {
        let mut out = Vec::new();
        let mut e = PnmEncoder::to_stream(|chunk: &[u8]| {
            out.extend_from_slice(chunk);
            Ok(())
        });
        e.write_header(10, 20, 1);
        e.flush();
        drop(e);
        assert_eq!(out, b"P5\n10 20\n255\n");
    }

    #[test]
    fn extended_header_for_alpha() {
        let mut out = Vec::new();
        let mut e = PnmEncoder::to_stream(|chunk: &[u8]| {
            out.extend_from_slice(chunk);
            Ok(())
        });
        e.write_header(3, 4, 4);
        e.flush();
        drop(e);
        assert_eq!(
            out,
            b"P7\nWIDTH 3\nHEIGHT 4\nDEPTH 4\nMAXVAL 255\nTUPLTYPE RGB_ALPHA\nENDHDR\n".to_vec()
        );
    }

    #[test]
    fn forced_extended_header_for_gray() {
        let mut out = Vec::new();
        let mut e = PnmEncoder::to_stream(|chunk: &[u8]| {
            out.extend_from_slice(chunk);
            Ok(())
        })
        .force_extended_header(true);
        e.write_header(1, 1, 1);
        e.flush();
        drop(e);
        assert_eq!(
            out,
            b"P7\nWIDTH 1\nHEIGHT 1\nDEPTH 1\nMAXVAL 255\nTUPLTYPE GRAYSCALE\nENDHDR\n".to_vec()
        );
    }

    #[test]
    fn sink_failure_is_sticky() {
        let mut pushes = 0;
        let e = PnmEncoder::to_stream(|_chunk: &[u8]| {
            pushes += 1;
            Err(PnmError::InvalidInput("sink closed"))
        });
        let result = e.encode(2, 2, 1, &[0u8; 4]);
        assert!(matches!(result, Err(PnmError::InvalidInput(_))));
        assert_eq!(pushes, 1);
    }
}
