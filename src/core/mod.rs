//! # Core Protocol Components
//!
//! Field encoding, the packet schema table, and stream framing.
//!
//! ## Components
//! - **VarInt / Wire**: Primitive and composite field encodings
//! - **Schema**: Packet layouts keyed by direction and opcode
//! - **Value**: Schema-driven encode/decode of dynamic records
//! - **Codec**: Tokio codec for framing packets over byte streams
//!
//! ## Wire Format
//! ```text
//! Packet: [Opcode(1)] [Fields(N)]
//! Frame:  [Length(4)] [Packet]
//! ```
//!
//! ## Safety
//! - Maximum frame size: 16MB by default (prevents memory exhaustion)
//! - Length prefixes validated against remaining input before allocation
//! - Opcodes resolved per direction; unknown opcodes are rejected

pub mod codec;
pub mod schema;
pub mod value;
pub mod varint;
pub mod wire;
