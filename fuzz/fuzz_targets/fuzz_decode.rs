#![no_main]
use libfuzzer_sys::fuzz_target;
use pnmio::PnmDecoder;

fuzz_target!(|data: &[u8]| {
    // Probing and decoding arbitrary bytes must never panic, at any
    // requested channel count.
    let _ = PnmDecoder::from_memory(data).info();
    for desired in 1..=4 {
        let _ = PnmDecoder::from_memory(data).decode(desired);
    }
});
