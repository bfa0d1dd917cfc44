#![no_main]

use libfuzzer_sys::fuzz_target;
use quiz_protocol::{quiz_schema, ClientPacket, Direction, PacketSet, ServerPacket};

fuzz_target!(|data: &[u8]| {
    // Typed and schema decoders in both directions: no panics, no huge allocations
    let _ = ClientPacket::decode(data);
    let _ = ServerPacket::decode(data);
    if let Ok(schema) = quiz_schema() {
        let _ = schema.decode(Direction::Client, data);
        let _ = schema.decode(Direction::Server, data);
    }
});
