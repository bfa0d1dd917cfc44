//! # Wire Primitives
//!
//! Field-level encoding shared by the schema-driven codec and the typed packets.
//!
//! ## Wire Format
//! ```text
//! u8        [1 byte]
//! u32       [4 bytes, big-endian]
//! VarInt    [1-5 bytes, LEB128]
//! bool      [1 byte, 0x00 | 0x01]
//! Str       [VarInt len] [UTF-8 bytes]
//! ByteArray [VarInt len] [bytes]
//! Vec(T)    [VarInt count] [T]*
//! Map(K,V)  [VarInt count] [K V]*
//! ```
//!
//! Length prefixes are checked against the remaining input before anything is
//! allocated, so a hostile length cannot force a large allocation.

use bytes::{BufMut, Bytes, BytesMut};
use std::collections::HashMap;
use std::hash::Hash;

use crate::core::varint::{read_varint, write_varint};
use crate::error::{constants, ProtocolError, Result};

/// VarInt-encoded unsigned integer field
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VarInt(pub u32);

impl From<u32> for VarInt {
    fn from(value: u32) -> Self {
        VarInt(value)
    }
}

impl From<VarInt> for u32 {
    fn from(value: VarInt) -> Self {
        value.0
    }
}

/// Cursor over a borrowed byte slice
#[derive(Debug)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Take the next `len` bytes
    pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(ProtocolError::Truncated {
                needed: len,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_varint(&mut self) -> Result<u32> {
        let (value, used) = read_varint(&self.buf[self.pos..])?;
        self.pos += used;
        Ok(value)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ProtocolError::DecodingError(format!(
                "{}: 0x{other:02X}",
                constants::ERR_INVALID_BOOL
            ))),
        }
    }

    /// Read a VarInt length and ensure at least `len * min_item_size` bytes follow
    pub fn read_len(&mut self, min_item_size: usize) -> Result<usize> {
        let len = self.read_varint()? as usize;
        let needed = len.saturating_mul(min_item_size);
        if needed > self.remaining() {
            return Err(ProtocolError::Truncated {
                needed,
                remaining: self.remaining(),
            });
        }
        Ok(len)
    }

    pub fn read_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.read_len(1)?;
        self.take(len)
    }

    pub fn read_str(&mut self) -> Result<&'a str> {
        let bytes = self.read_bytes()?;
        std::str::from_utf8(bytes).map_err(|e| {
            ProtocolError::DecodingError(format!("{}: {e}", constants::ERR_INVALID_UTF8))
        })
    }

    /// Fail if any input is left over
    pub fn finish(&self) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(ProtocolError::TrailingBytes(n)),
        }
    }
}

/// Write a length prefix, rejecting lengths that do not fit a VarInt
pub fn write_len(dst: &mut BytesMut, len: usize) -> Result<()> {
    let len = u32::try_from(len).map_err(|_| {
        ProtocolError::EncodingError(format!("{}: {len}", constants::ERR_LENGTH_OVERFLOW))
    })?;
    write_varint(dst, len);
    Ok(())
}

pub fn write_bytes(dst: &mut BytesMut, bytes: &[u8]) -> Result<()> {
    write_len(dst, bytes.len())?;
    dst.put_slice(bytes);
    Ok(())
}

/// A type with a fixed wire representation
pub trait Wire: Sized {
    /// Smallest number of bytes one value can occupy, used to bound length prefixes
    const MIN_SIZE: usize = 1;

    fn encode(&self, dst: &mut BytesMut) -> Result<()>;

    fn decode(src: &mut WireReader<'_>) -> Result<Self>;
}

impl Wire for u8 {
    fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        dst.put_u8(*self);
        Ok(())
    }

    fn decode(src: &mut WireReader<'_>) -> Result<Self> {
        src.read_u8()
    }
}

impl Wire for u32 {
    const MIN_SIZE: usize = 4;

    fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        dst.put_u32(*self);
        Ok(())
    }

    fn decode(src: &mut WireReader<'_>) -> Result<Self> {
        src.read_u32()
    }
}

impl Wire for VarInt {
    fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        write_varint(dst, self.0);
        Ok(())
    }

    fn decode(src: &mut WireReader<'_>) -> Result<Self> {
        src.read_varint().map(VarInt)
    }
}

impl Wire for bool {
    fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        dst.put_u8(u8::from(*self));
        Ok(())
    }

    fn decode(src: &mut WireReader<'_>) -> Result<Self> {
        src.read_bool()
    }
}

impl Wire for String {
    fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        write_bytes(dst, self.as_bytes())
    }

    fn decode(src: &mut WireReader<'_>) -> Result<Self> {
        src.read_str().map(str::to_owned)
    }
}

/// ByteArray fields
impl Wire for Bytes {
    fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        write_bytes(dst, self)
    }

    fn decode(src: &mut WireReader<'_>) -> Result<Self> {
        src.read_bytes().map(Bytes::copy_from_slice)
    }
}

impl<T: Wire> Wire for Vec<T> {
    fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        write_len(dst, self.len())?;
        for item in self {
            item.encode(dst)?;
        }
        Ok(())
    }

    fn decode(src: &mut WireReader<'_>) -> Result<Self> {
        let len = src.read_len(T::MIN_SIZE)?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(T::decode(src)?);
        }
        Ok(items)
    }
}

impl<K, V> Wire for HashMap<K, V>
where
    K: Wire + Eq + Hash + std::fmt::Debug,
    V: Wire,
{
    fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        write_len(dst, self.len())?;
        for (key, value) in self {
            key.encode(dst)?;
            value.encode(dst)?;
        }
        Ok(())
    }

    fn decode(src: &mut WireReader<'_>) -> Result<Self> {
        let len = src.read_len(K::MIN_SIZE + V::MIN_SIZE)?;
        let mut map = HashMap::with_capacity(len);
        for _ in 0..len {
            let key = K::decode(src)?;
            let value = V::decode(src)?;
            if map.contains_key(&key) {
                return Err(ProtocolError::DecodingError(format!(
                    "Duplicate map key: {key:?}"
                )));
            }
            map.insert(key, value);
        }
        Ok(map)
    }
}
