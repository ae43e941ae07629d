/// Which PNM dialect a stream uses.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PnmFormat {
    /// P5 — binary grayscale (PGM).
    Pgm,
    /// P6 — binary RGB (PPM).
    Ppm,
    /// P7 — PAM (1 to 4 channels, keyworded header with TUPLTYPE).
    Pam,
}

/// Image description parsed from a PNM header.
///
/// `channels` is the channel count of the stream itself: 1 gray, 2
/// gray+alpha, 3 rgb, 4 rgb+alpha.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub format: PnmFormat,
}

/// One entry of the PAM tuple-type table.
pub(crate) struct TupleType {
    pub name: &'static str,
    pub min_sample: u32,
    pub max_sample: u32,
    pub channels: u32,
}

/// The PAM tuple types, in the order candidates are tried when matching a
/// TUPLTYPE keyword. Also consulted on encode to pick the emitted name.
pub(crate) static TUPLE_TYPES: [TupleType; 6] = [
    TupleType {
        name: "BLACKANDWHITE",
        min_sample: 1,
        max_sample: 1,
        channels: 1,
    },
    TupleType {
        name: "GRAYSCALE",
        min_sample: 2,
        max_sample: 65535,
        channels: 1,
    },
    TupleType {
        name: "RGB",
        min_sample: 1,
        max_sample: 65535,
        channels: 3,
    },
    TupleType {
        name: "BLACKANDWHITE_ALPHA",
        min_sample: 1,
        max_sample: 1,
        channels: 2,
    },
    TupleType {
        name: "GRAYSCALE_ALPHA",
        min_sample: 2,
        max_sample: 65535,
        channels: 2,
    },
    TupleType {
        name: "RGB_ALPHA",
        min_sample: 1,
        max_sample: 65535,
        channels: 4,
    },
];

/// The tuple type emitted for a channel count, i.e. the first table entry
/// with that channel count whose sample range admits 255.
pub(crate) fn emitted_tuple_type(channels: u32) -> &'static TupleType {
    TUPLE_TYPES
        .iter()
        .find(|t| t.channels == channels && t.max_sample >= 255)
        .expect("every channel count in 1..=4 has an 8-bit tuple type")
}
