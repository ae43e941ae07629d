#![no_main]
use libfuzzer_sys::fuzz_target;
use pnmio::{PnmDecoder, PnmEncoder};

fuzz_target!(|data: &[u8]| {
    // Anything that decodes must re-encode at its own channel count and
    // decode again to identical pixels.
    let Ok(decoded) = PnmDecoder::from_memory(data).decode(4) else {
        return;
    };

    let mut reencoded = Vec::new();
    PnmEncoder::to_stream(|chunk: &[u8]| {
        reencoded.extend_from_slice(chunk);
        Ok(())
    })
    .encode(decoded.width, decoded.height, 4, decoded.pixels())
    .expect("re-encoding decoded pixels cannot fail");

    let again = PnmDecoder::from_memory(&reencoded)
        .decode(4)
        .expect("re-encoded stream must decode");
    assert_eq!(decoded.pixels(), again.pixels());
});
