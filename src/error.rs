use std::io;

/// Errors from PNM decoding and encoding.
///
/// The taxonomy is flat: every failure a reader or writer can hit maps to
/// exactly one of these variants. Readers and writers record the first error
/// they see and go inert afterwards, so callers only need to inspect the
/// final result of an operation.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PnmError {
    /// The backing file or stream failed to read or write.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// The stream ended before the header or pixel data was complete.
    ///
    /// Stream callbacks also return this to signal a clean end of input.
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// A caller-supplied parameter was out of contract.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// The header bytes do not match any supported grammar.
    #[error("invalid header: {0}")]
    InvalidFormat(&'static str),

    /// The magic number names a PNM dialect other than P5, P6 or P7.
    #[error("unsupported PNM version 'P{0}'")]
    UnsupportedVersion(char),

    /// The header declared a maximum sample value other than 255.
    #[error("unsupported max sample value {0}, only 8-bit samples are supported")]
    UnsupportedMaxValue(u32),

    /// The output pixel buffer could not be allocated.
    #[error("pixel buffer allocation failed")]
    NoMemory,
}
