//! PNM decoding: buffered reading, header parsing, pixel relayout.

use std::path::Path;

use log::debug;

use crate::backend::{FileSource, MemorySource, PullSource, StreamSource};
use crate::error::PnmError;
use crate::info::{ImageInfo, PnmFormat, TupleType, TUPLE_TYPES};
use crate::BUFFER_CAP;

/// PNM header whitespace: space, tab, newline, vertical tab, form feed,
/// carriage return.
fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | 0x0b | 0x0c | b'\r')
}

/// A decoded image: owned interleaved 8-bit samples plus the source
/// geometry. `channels` is the channel count of the *stream*, not the
/// channel count the pixels were relaid out to.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub format: PnmFormat,
}

impl DecodedImage {
    /// Access the pixel data.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Take ownership of the pixel data.
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }
}

/// A PNM decoder over any [`PullSource`].
///
/// One decoder performs one `info` or `decode` operation and is consumed by
/// it, releasing the backend on every exit path. The first error a decoder
/// hits is sticky: every read after it is a no-op, so the parsing code runs
/// straight through and the error is inspected once at the end.
pub struct PnmDecoder<S> {
    source: S,
    error: Option<PnmError>,
    lookahead: Option<u8>,
    buf: [u8; BUFFER_CAP],
    buf_off: usize,
    buf_len: usize,
}

impl PnmDecoder<FileSource> {
    /// Decode from a file. The handle is closed when the operation ends.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PnmError> {
        Ok(Self::new(FileSource::open(path)?))
    }
}

impl<'a> PnmDecoder<MemorySource<'a>> {
    /// Decode from a borrowed byte slice.
    pub fn from_memory(data: &'a [u8]) -> Self {
        Self::new(MemorySource::new(data))
    }
}

impl<F> PnmDecoder<StreamSource<F>>
where
    F: FnMut(&mut [u8]) -> Result<usize, PnmError>,
{
    /// Decode by pulling bytes from `read`. See [`StreamSource`] for the
    /// callback contract.
    pub fn from_stream(read: F) -> Self {
        Self::new(StreamSource::new(read))
    }
}

impl<S: PullSource> PnmDecoder<S> {
    /// Decode from any byte source.
    pub fn new(source: S) -> Self {
        Self {
            source,
            error: None,
            lookahead: None,
            buf: [0; BUFFER_CAP],
            buf_off: 0,
            buf_len: 0,
        }
    }

    /// Parse the header and return the image geometry without touching the
    /// pixel data.
    pub fn info(mut self) -> Result<ImageInfo, PnmError> {
        let info = self.parse_header();
        self.check()?;
        debug!(
            "parsed {:?} header: {}x{}, {} channels",
            info.format, info.width, info.height, info.channels
        );
        Ok(info)
    }

    /// Decode the whole image, relaying the pixels out to
    /// `desired_channels` (1 gray, 2 gray+alpha, 3 or 4 color).
    ///
    /// The returned [`DecodedImage`] reports the *source* channel count;
    /// its pixel buffer holds `width * height * desired_channels` bytes.
    pub fn decode(mut self, desired_channels: u32) -> Result<DecodedImage, PnmError> {
        if !(1..=4).contains(&desired_channels) {
            return Err(PnmError::InvalidInput(
                "desired channel count must be between 1 and 4",
            ));
        }

        let info = self.parse_header();
        self.check()?;
        debug!(
            "decoding {:?} {}x{}, {} channels -> {} channels",
            info.format, info.width, info.height, info.channels, desired_channels
        );

        let len = (info.width as usize)
            .checked_mul(info.height as usize)
            .and_then(|px| px.checked_mul(desired_channels as usize))
            .ok_or(PnmError::NoMemory)?;
        let mut pixels = Vec::new();
        pixels.try_reserve_exact(len).map_err(|_| PnmError::NoMemory)?;
        pixels.resize(len, 0);

        self.relayout(&info, desired_channels, &mut pixels);
        self.check()?;

        Ok(DecodedImage {
            pixels,
            width: info.width,
            height: info.height,
            channels: info.channels,
            format: info.format,
        })
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

    /// Next byte of the stream, or 0 with the error slot filled. Refills
    /// the buffer from the source when it runs dry.
    fn next_byte(&mut self) -> u8 {
        if self.error.is_some() {
            return 0;
        }
        if let Some(b) = self.lookahead.take() {
            return b;
        }
        if self.buf_len == 0 {
            match self.source.pull(&mut self.buf) {
                Ok(0) => {
                    self.set_error(PnmError::UnexpectedEof);
                    return 0;
                }
                Ok(n) => {
                    self.buf_off = 0;
                    self.buf_len = n;
                }
                Err(error) => {
                    self.set_error(error);
                    return 0;
                }
            }
        }
        let b = self.buf[self.buf_off];
        self.buf_off += 1;
        self.buf_len -= 1;
        b
    }

    /// Look at the next byte without consuming it. The pushback slot is one
    /// byte deep; peeking again before the next consume returns the same
    /// byte.
    fn peek_byte(&mut self) -> u8 {
        if self.error.is_some() {
            return 0;
        }
        if let Some(b) = self.lookahead {
            return b;
        }
        let b = self.next_byte();
        if self.error.is_none() {
            self.lookahead = Some(b);
        }
        b
    }

    /// Advance past a maximal run of whitespace.
    fn skip_whitespace(&mut self) {
        loop {
            let b = self.peek_byte();
            if self.error.is_some() || !is_whitespace(b) {
                return;
            }
            self.next_byte();
        }
    }

    /// Consume a maximal run of decimal digits. Zero digits yield 0; the
    /// caller decides whether that is acceptable.
    fn parse_u32(&mut self) -> u32 {
        let mut n = 0u32;
        loop {
            let b = self.peek_byte();
            if self.error.is_some() || !b.is_ascii_digit() {
                return n;
            }
            // wrapping: absurd digit runs produce values the later
            // validation rejects anyway
            n = n.wrapping_mul(10).wrapping_add(u32::from(b - b'0'));
            self.next_byte();
        }
    }

    /// Consume exactly `literal.len()` bytes, recording `InvalidFormat` on
    /// the first mismatch.
    fn expect_literal(&mut self, literal: &[u8]) {
        for &want in literal {
            if self.next_byte() != want && self.error.is_none() {
                self.set_error(PnmError::InvalidFormat("unexpected bytes in header"));
            }
        }
    }

    /// The `<whitespace> KEYWORD <whitespace> <uint>` idiom used by every
    /// P7 header field.
    fn expect_keyword_u32(&mut self, keyword: &[u8]) -> u32 {
        self.skip_whitespace();
        self.expect_literal(keyword);
        self.skip_whitespace();
        self.parse_u32()
    }

    /// Match the tuple-type name at the cursor against all table entries at
    /// once: one match cursor per candidate, advanced a byte at a time,
    /// eliminated on first mismatch. Any whitespace byte counts as the
    /// name's terminating space, so `GRAYSCALE` and `GRAYSCALE_ALPHA` are
    /// told apart without backtracking. The first candidate to complete
    /// wins; its terminator is left unconsumed.
    fn match_tuple_type(&mut self) -> Option<&'static TupleType> {
        let mut cursors = [Some(0usize); TUPLE_TYPES.len()];
        loop {
            let mut b = self.peek_byte();
            if self.error.is_some() {
                return None;
            }
            if is_whitespace(b) {
                b = b' ';
            }

            let mut live = false;
            for (cursor, tuple) in cursors.iter_mut().zip(&TUPLE_TYPES) {
                let Some(pos) = *cursor else { continue };
                let want = tuple.name.as_bytes().get(pos).copied().unwrap_or(b' ');
                if want != b {
                    *cursor = None;
                    continue;
                }
                if pos == tuple.name.len() {
                    return Some(tuple);
                }
                *cursor = Some(pos + 1);
                live = true;
            }
            if !live {
                return None;
            }
            self.next_byte();
        }
    }

    /// Parse the two-byte magic and the dialect-specific header fields,
    /// leaving the cursor on the first raster byte. Errors are recorded in
    /// the sticky slot; the caller checks once afterwards.
    fn parse_header(&mut self) -> ImageInfo {
        let mut info = ImageInfo {
            width: 0,
            height: 0,
            channels: 0,
            format: PnmFormat::Pgm,
        };

        if self.next_byte() != b'P' && self.error.is_none() {
            self.set_error(PnmError::InvalidFormat("missing PNM magic"));
        }
        let version = self.next_byte();

        let mut max_value = 0;
        match version {
            b'5' | b'6' => {
                if version == b'5' {
                    info.format = PnmFormat::Pgm;
                    info.channels = 1;
                } else {
                    info.format = PnmFormat::Ppm;
                    info.channels = 3;
                }
                self.skip_whitespace();
                info.width = self.parse_u32();
                self.skip_whitespace();
                info.height = self.parse_u32();
                self.skip_whitespace();
                max_value = self.parse_u32();
            }
            b'7' => {
                info.format = PnmFormat::Pam;
                info.width = self.expect_keyword_u32(b"WIDTH");
                info.height = self.expect_keyword_u32(b"HEIGHT");
                info.channels = self.expect_keyword_u32(b"DEPTH");
                max_value = self.expect_keyword_u32(b"MAXVAL");

                self.skip_whitespace();
                self.expect_literal(b"TUPLTYPE");
                self.skip_whitespace();
                match self.match_tuple_type() {
                    Some(tuple) => {
                        if tuple.channels != info.channels {
                            self.set_error(PnmError::InvalidFormat(
                                "TUPLTYPE does not match DEPTH",
                            ));
                        }
                        if max_value < tuple.min_sample || max_value > tuple.max_sample {
                            self.set_error(PnmError::InvalidFormat(
                                "MAXVAL out of range for TUPLTYPE",
                            ));
                        }
                    }
                    None => self.set_error(PnmError::InvalidFormat("unknown TUPLTYPE")),
                }
                self.skip_whitespace();
                self.expect_literal(b"ENDHDR");
            }
            _ => {
                if self.error.is_none() {
                    self.set_error(PnmError::UnsupportedVersion(char::from(version)));
                }
            }
        }

        if max_value != 255 && self.error.is_none() {
            self.set_error(PnmError::UnsupportedMaxValue(max_value));
        }

        // Exactly one whitespace byte separates the header from the raster,
        // so rasters whose first sample is itself a whitespace value stay
        // intact.
        if !is_whitespace(self.next_byte()) && self.error.is_none() {
            self.set_error(PnmError::InvalidFormat("missing whitespace after header"));
        }

        info
    }

    /// Read `width * height` pixels of `info.channels` samples each and
    /// write them out with `desired_channels` samples each.
    fn relayout(&mut self, info: &ImageInfo, desired_channels: u32, target: &mut [u8]) {
        let channels = info.channels;
        let mut at = 0usize;
        for _ in 0..u64::from(info.width) * u64::from(info.height) {
            if self.error.is_some() {
                return;
            }

            // Samples two and three land in `blu` and `gre` in that order,
            // and three- and four-channel output is emitted the same way.
            // Existing consumers depend on this layout; keep it byte-exact.
            let red = self.next_byte();
            let mut blu = if channels > 1 { self.next_byte() } else { 0 };
            let mut gre = if channels > 2 { self.next_byte() } else { 0 };
            let alp = match channels {
                2 => blu,
                4 => self.next_byte(),
                _ => 0xff,
            };

            let grey = if channels < 3 {
                blu = red;
                gre = red;
                red
            } else {
                let g = (u32::from(red) * 77 + u32::from(gre) * 150 + u32::from(blu) * 29 + 128)
                    >> 8;
                g.min(255) as u8
            };

            match desired_channels {
                1 => {
                    target[at] = grey;
                    at += 1;
                }
                2 => {
                    target[at] = grey;
                    target[at + 1] = alp;
                    at += 2;
                }
                3 => {
                    target[at] = red;
                    target[at + 1] = blu;
                    target[at + 2] = gre;
                    at += 3;
                }
                _ => {
                    target[at] = red;
                    target[at + 1] = blu;
                    target[at + 2] = gre;
                    target[at + 3] = alp;
                    at += 4;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io;

    #[test]
    fn parse_u32_stops_at_first_non_digit() {
        let mut d = PnmDecoder::from_memory(b"1234x");
        assert_eq!(d.parse_u32(), 1234);
        assert_eq!(d.next_byte(), b'x');
        assert!(d.error.is_none());
    }

    #[test]
    fn parse_u32_without_digits_yields_zero() {
        let mut d = PnmDecoder::from_memory(b"abc");
        assert_eq!(d.parse_u32(), 0);
        assert!(d.error.is_none());
    }

    #[test]
    fn skip_whitespace_covers_all_six_separators() {
        let mut d = PnmDecoder::from_memory(b" \t\n\x0b\x0c\rZ");
        d.skip_whitespace();
        assert_eq!(d.next_byte(), b'Z');
    }

    #[test]
    fn peek_does_not_consume() {
        let mut d = PnmDecoder::from_memory(b"AB");
        assert_eq!(d.peek_byte(), b'A');
        assert_eq!(d.peek_byte(), b'A');
        assert_eq!(d.next_byte(), b'A');
        assert_eq!(d.next_byte(), b'B');
    }

    #[test]
    fn expect_literal_records_mismatch() {
        let mut d = PnmDecoder::from_memory(b"ENDHDX");
        d.expect_literal(b"ENDHDR");
        assert!(matches!(d.error, Some(PnmError::InvalidFormat(_))));
    }

    #[test]
    fn tuple_matcher_disambiguates_shared_prefixes() {
        let mut d = PnmDecoder::from_memory(b"GRAYSCALE_ALPHA\nENDHDR");
        let tuple = d.match_tuple_type().unwrap();
        assert_eq!(tuple.name, "GRAYSCALE_ALPHA");
        assert_eq!(tuple.channels, 2);

        let mut d = PnmDecoder::from_memory(b"GRAYSCALE\nENDHDR");
        let tuple = d.match_tuple_type().unwrap();
        assert_eq!(tuple.name, "GRAYSCALE");
        // terminator stays in the stream
        assert_eq!(d.next_byte(), b'\n');
    }

    #[test]
    fn tuple_matcher_rejects_unknown_names() {
        let mut d = PnmDecoder::from_memory(b"GRAYSCALES\n");
        assert!(d.match_tuple_type().is_none());
    }

    #[test]
    fn errors_are_sticky_and_stop_backend_traffic() {
        let calls = Cell::new(0u32);
        let mut d = PnmDecoder::from_stream(|_buf: &mut [u8]| {
            calls.set(calls.get() + 1);
            Err(PnmError::Io(io::Error::new(io::ErrorKind::Other, "boom")))
        });

        assert_eq!(d.next_byte(), 0);
        assert!(matches!(d.error, Some(PnmError::Io(_))));
        assert_eq!(calls.get(), 1);

        // further reads are no-ops returning the sentinel
        assert_eq!(d.next_byte(), 0);
        assert_eq!(d.peek_byte(), 0);
        assert_eq!(d.parse_u32(), 0);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn eof_is_sticky() {
        let mut d = PnmDecoder::from_memory(b"A");
        assert_eq!(d.next_byte(), b'A');
        assert_eq!(d.next_byte(), 0);
        assert!(matches!(d.error, Some(PnmError::UnexpectedEof)));
        assert_eq!(d.next_byte(), 0);
    }
}
