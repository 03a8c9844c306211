//! Fuzz target for IRC line framing and message decoding
//!
//! Feeds arbitrary bytes through the line codec and decodes every framed
//! line, checking that neither step panics.

#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use slirc_events::{LineCodec, Message};
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    let mut codec = LineCodec::with_max_len(512);
    let mut buf = BytesMut::from(data);

    while let Ok(Some(line)) = codec.decode_eof(&mut buf) {
        // Should never panic
        let _ = line.parse::<Message>();
    }
});
