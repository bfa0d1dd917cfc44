#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use quiz_protocol::ServerCodec;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    // Fuzz stream framing - keep decoding until the codec stops or fails
    let mut codec = ServerCodec::with_max_packet_size(64 * 1024);
    let mut buf = BytesMut::from(data);
    while let Ok(Some(_)) = codec.decode(&mut buf) {}
});
