//! # Packet Codec
//!
//! Frames packets on a byte stream for use with `tokio_util::codec::Framed`.
//!
//! ## Frame Format
//! ```text
//! [Length(4, big-endian)] [Opcode(1)] [Fields(N)]
//! ```
//!
//! The opcode alone does not identify a packet: each endpoint decodes the
//! packet set of the opposite direction. A server reads [`ClientPacket`]s and
//! writes [`ServerPacket`]s ([`ServerCodec`]); a client does the reverse
//! ([`ClientCodec`]).

use bytes::{Buf, BufMut, BytesMut};
use std::marker::PhantomData;
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::config::{LimitsConfig, MAX_PACKET_SIZE};
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::packets::{ClientPacket, PacketSet, ServerPacket};
use crate::utils::metrics::global_metrics;

/// Size of the length prefix in front of every packet
pub const FRAME_HEADER_SIZE: usize = 4;

/// Codec used by the server: reads client packets, writes server packets
pub type ServerCodec = PacketCodec<ClientPacket, ServerPacket>;

/// Codec used by clients: reads server packets, writes client packets
pub type ClientCodec = PacketCodec<ServerPacket, ClientPacket>;

/// Length-prefixed packet framing; decodes `In`, encodes `Out`
#[derive(Debug)]
pub struct PacketCodec<In, Out> {
    max_packet_size: usize,
    _marker: PhantomData<fn() -> (In, Out)>,
}

impl<In, Out> PacketCodec<In, Out> {
    pub fn new() -> Self {
        Self::with_max_packet_size(MAX_PACKET_SIZE)
    }

    pub fn with_max_packet_size(max_packet_size: usize) -> Self {
        Self {
            max_packet_size,
            _marker: PhantomData,
        }
    }

    pub fn from_config(limits: &LimitsConfig) -> Self {
        Self::with_max_packet_size(limits.max_packet_size)
    }

    pub fn max_packet_size(&self) -> usize {
        self.max_packet_size
    }
}

impl<In, Out> Default for PacketCodec<In, Out> {
    fn default() -> Self {
        Self::new()
    }
}

impl<In, Out> Clone for PacketCodec<In, Out> {
    fn clone(&self) -> Self {
        Self::with_max_packet_size(self.max_packet_size)
    }
}

impl<In: PacketSet, Out> Decoder for PacketCodec<In, Out> {
    type Item = In;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<In>> {
        if src.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }

        let len = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;
        if len == 0 {
            global_metrics().decode_error();
            return Err(ProtocolError::DecodingError(
                constants::ERR_EMPTY_FRAME.to_string(),
            ));
        }
        if len > self.max_packet_size {
            global_metrics().decode_error();
            return Err(ProtocolError::OversizedPacket(len));
        }

        let frame_len = FRAME_HEADER_SIZE + len;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        src.advance(FRAME_HEADER_SIZE);
        let frame = src.split_to(len);

        match In::decode(&frame) {
            Ok(packet) => {
                global_metrics().packet_decoded(frame_len as u64);
                trace!(
                    packet = packet.name(),
                    direction = %In::DIRECTION,
                    len,
                    "Decoded packet"
                );
                Ok(Some(packet))
            }
            Err(e) => {
                global_metrics().decode_error();
                Err(e)
            }
        }
    }
}

impl<In, Out: PacketSet> Encoder<Out> for PacketCodec<In, Out> {
    type Error = ProtocolError;

    fn encode(&mut self, item: Out, dst: &mut BytesMut) -> Result<()> {
        let start = dst.len();
        dst.reserve(FRAME_HEADER_SIZE + 1);
        dst.put_u32(0);

        if let Err(e) = item.encode(dst) {
            dst.truncate(start);
            global_metrics().encode_error();
            return Err(e);
        }

        let len = dst.len() - start - FRAME_HEADER_SIZE;
        if len > self.max_packet_size {
            dst.truncate(start);
            global_metrics().encode_error();
            return Err(ProtocolError::OversizedPacket(len));
        }

        // Bounded by max_packet_size, which config validation keeps far below u32::MAX
        dst[start..start + FRAME_HEADER_SIZE].copy_from_slice(&(len as u32).to_be_bytes());
        global_metrics().packet_encoded((FRAME_HEADER_SIZE + len) as u64);
        trace!(packet = item.name(), direction = %Out::DIRECTION, len, "Encoded packet");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::protocol::packets::{AnswerPacket, AnswerResultPacket, KickPacket};

    #[test]
    fn test_server_codec_reads_client_packets() {
        let mut client = ClientCodec::new();
        let mut server = ServerCodec::new();
        let mut buf = BytesMut::new();

        client
            .encode(ClientPacket::from(AnswerPacket { id: 3 }), &mut buf)
            .unwrap();
        assert_eq!(&buf[..], &[0, 0, 0, 2, 0x05, 0x03]);

        let decoded = server.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, ClientPacket::Answer(AnswerPacket { id: 3 }));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_partial_frame_waits_for_more() {
        let mut codec = ClientCodec::new();
        let mut buf = BytesMut::from(&[0u8, 0, 0, 2, 0x08][..]);

        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 5);

        buf.put_u8(0x01);
        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, ServerPacket::AnswerResult(AnswerResultPacket { result: true }));
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let mut codec = ServerCodec::with_max_packet_size(16);
        let mut buf = BytesMut::new();
        buf.put_u32(17);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(ProtocolError::OversizedPacket(17))
        ));
    }

    #[test]
    fn test_oversized_packet_not_encoded() {
        let mut codec = ClientCodec::with_max_packet_size(8);
        let mut buf = BytesMut::from(&b"keep"[..]);
        let result = codec.encode(
            ClientPacket::from(KickPacket {
                id: "a much longer identifier".into(),
            }),
            &mut buf,
        );
        assert!(matches!(result, Err(ProtocolError::OversizedPacket(_))));
        assert_eq!(&buf[..], b"keep");
    }

    #[test]
    fn test_empty_frame_rejected() {
        let mut codec = ServerCodec::new();
        let mut buf = BytesMut::from(&[0u8, 0, 0, 0][..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(ProtocolError::DecodingError(_))
        ));
    }
}
