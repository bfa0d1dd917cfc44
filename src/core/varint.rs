//! # VarInt
//!
//! Unsigned LEB128 variable-length integers, limited to the `u32` range.
//!
//! Each byte carries 7 value bits, least significant group first. The high bit
//! is set on every byte except the last. A `u32` never needs more than 5 bytes.

use bytes::BufMut;

use crate::error::{ProtocolError, Result};

/// Maximum encoded size of a `u32` VarInt
pub const MAX_VARINT_LEN: usize = 5;

const CONTINUE_BIT: u8 = 0x80;
const SEGMENT_BITS: u8 = 0x7F;

/// Number of bytes `value` occupies on the wire
#[inline]
pub fn encoded_len(value: u32) -> usize {
    match value {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        0x20_0000..=0x0FFF_FFFF => 4,
        _ => 5,
    }
}

/// Append `value` to `dst`
pub fn write_varint<B: BufMut>(dst: &mut B, mut value: u32) {
    loop {
        let byte = (value as u8) & SEGMENT_BITS;
        value >>= 7;
        if value == 0 {
            dst.put_u8(byte);
            return;
        }
        dst.put_u8(byte | CONTINUE_BIT);
    }
}

/// Read a VarInt from the front of `src`.
///
/// Returns the value and the number of bytes consumed.
pub fn read_varint(src: &[u8]) -> Result<(u32, usize)> {
    let mut value: u32 = 0;

    for (index, &byte) in src.iter().enumerate() {
        if index == MAX_VARINT_LEN {
            return Err(ProtocolError::InvalidVarInt);
        }

        let segment = (byte & SEGMENT_BITS) as u32;
        // The fifth byte may only contribute the top 4 bits of a u32
        if index == MAX_VARINT_LEN - 1 && segment > 0x0F {
            return Err(ProtocolError::InvalidVarInt);
        }
        value |= segment << (7 * index);

        if byte & CONTINUE_BIT == 0 {
            return Ok((value, index + 1));
        }
    }

    if src.len() >= MAX_VARINT_LEN {
        return Err(ProtocolError::InvalidVarInt);
    }
    Err(ProtocolError::Truncated {
        needed: src.len() + 1,
        remaining: src.len(),
    })
}
