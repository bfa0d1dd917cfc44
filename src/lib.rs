//! # Quiz Protocol
//!
//! Binary packet protocol for a real-time multiplayer quiz game: hosts create
//! games, players join and answer questions, and the server keeps everyone's
//! scores and timers in sync.
//!
//! ## Layers
//! - [`core::schema`]: the packet table, keyed by [`Direction`] and opcode
//! - [`core::value`]: schema-driven `encode` / `decode` of dynamic records
//! - [`protocol::packets`]: typed [`ServerPacket`] and [`ClientPacket`] enums
//! - [`core::codec`]: length-prefixed framing for `tokio_util::codec::Framed`
//! - [`protocol::dispatcher`]: opcode routing to handlers
//! - [`transport::tcp`]: a TCP server loop and client connect
//!
//! ## Example
//! ```rust
//! use quiz_protocol::{ClientPacket, PacketSet};
//! use quiz_protocol::protocol::packets::RequestJoinPacket;
//!
//! # fn main() -> quiz_protocol::Result<()> {
//! let packet = ClientPacket::from(RequestJoinPacket {
//!     id: "A1B2C".into(),
//!     name: "Alice".into(),
//! });
//! let bytes = packet.to_bytes()?;
//! assert_eq!(bytes[0], 0x03);
//! assert_eq!(ClientPacket::decode(&bytes)?, packet);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod utils;

pub use crate::core::codec::{ClientCodec, PacketCodec, ServerCodec};
pub use crate::core::schema::{quiz_schema, Direction, PacketDefinition, SchemaTable};
pub use crate::core::value::{Record, Value};
pub use crate::error::{ProtocolError, Result};
pub use crate::protocol::packets::{ClientPacket, Packet, PacketSet, ServerPacket};
