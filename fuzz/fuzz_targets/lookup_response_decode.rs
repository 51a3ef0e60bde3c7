//! Fuzz target for lookup response decoding
//!
//! The GraphQL body comes from the network; decoding must classify any
//! bytes as found, not found or an error.
//!
//! The fuzzer should NEVER panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use latestcat_lookup::wire;

fuzz_target!(|data: &[u8]| {
    let _ = wire::decode_response(data);
});
