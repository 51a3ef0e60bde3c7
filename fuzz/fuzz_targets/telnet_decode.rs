//! Fuzz target for the telnet and key decoders
//!
//! Feeds arbitrary client bytes, split at arbitrary points, through
//! `TelnetDecoder` and `KeyDecoder` exactly as the session runtime does.
//!
//! # Invariants
//!
//! - NEVER panic on malformed negotiation or escape sequences
//! - Decoded characters are never control characters
//! - Chunking does not change the decoded window sizes

#![no_main]

use libfuzzer_sys::fuzz_target;
use latestcat_app::KeyInput;
use latestcat_server::{
    keys::{self, KeyDecoder},
    telnet::{TelnetDecoder, TelnetEvent},
};

fuzz_target!(|input: (Vec<u8>, Vec<u8>)| {
    let (data, splits) = input;

    let mut whole = TelnetDecoder::new();
    let expected: Vec<_> = whole
        .decode(&data)
        .into_iter()
        .filter(|e| matches!(e, TelnetEvent::WindowSize { .. }))
        .collect();

    let mut telnet = TelnetDecoder::new();
    let mut key_decoder = KeyDecoder::new();
    let mut sizes = Vec::new();
    let mut rest = data.as_slice();

    for split in splits {
        if rest.is_empty() {
            break;
        }
        let at = usize::from(split) % rest.len() + 1;
        let (chunk, tail) = rest.split_at(at);
        rest = tail;

        let mut bytes = Vec::new();
        for event in telnet.decode(chunk) {
            match event {
                TelnetEvent::Data(b) => bytes.push(b),
                size @ TelnetEvent::WindowSize { .. } => sizes.push(size),
                _ => {},
            }
        }
        for key in keys::decode(&mut key_decoder, &bytes) {
            if let KeyInput::Char(c) = key {
                assert!(!c.is_control());
            }
        }
    }
    for event in telnet.decode(rest) {
        if matches!(event, TelnetEvent::WindowSize { .. }) {
            sizes.push(event);
        }
    }

    assert_eq!(sizes, expected);
});
