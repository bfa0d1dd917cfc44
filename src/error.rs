//! # Error Types
//!
//! Error handling for the quiz protocol.
//!
//! This module defines every error variant that can occur while building the
//! schema table, encoding or decoding packets, framing them on a stream and
//! serving connections.
//!
//! ## Error Categories
//! - **I/O Errors**: Network and file system failures
//! - **Encoding Errors**: Records or values that do not fit their schema
//! - **Decoding Errors**: Truncated input, malformed VarInts, unknown opcodes
//! - **Schema Errors**: Definitions whose field list and order list disagree
//! - **Configuration Errors**: Invalid or unreadable configuration
//!
//! All errors implement `std::error::Error` for interoperability.
//!
//! ## Example Usage
//! ```rust
//! use quiz_protocol::error::{ProtocolError, Result};
//! use quiz_protocol::protocol::packets::{ClientPacket, PacketSet};
//! use tracing::{error, info};
//!
//! fn read_packet(bytes: &[u8]) -> Result<ClientPacket> {
//!     ClientPacket::decode(bytes)
//! }
//!
//! match read_packet(&[0x05, 0x02]) {
//!     Ok(packet) => info!(name = packet.name(), "Decoded packet"),
//!     Err(e) => error!(error = %e, "Failed to decode packet"),
//! }
//! ```

use crate::core::schema::Direction;
use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Dispatcher-related error messages
    pub const ERR_DISPATCHER_WRITE_LOCK: &str = "Failed to acquire write lock on dispatcher";
    pub const ERR_DISPATCHER_READ_LOCK: &str = "Failed to acquire read lock on dispatcher";

    /// Wire validation errors
    pub const ERR_EMPTY_PACKET: &str = "Packet is empty (missing opcode)";
    pub const ERR_EMPTY_FRAME: &str = "Frame length is zero";
    pub const ERR_INVALID_BOOL: &str = "Invalid boolean byte";
    pub const ERR_INVALID_UTF8: &str = "String is not valid UTF-8";
    pub const ERR_LENGTH_OVERFLOW: &str = "Length does not fit in a VarInt";

    /// Connection errors
    pub const ERR_CONNECTION_CLOSED: &str = "Connection closed";
    pub const ERR_SHUTDOWN: &str = "Server is shutting down";
}

// ProtocolError is the primary error type for all protocol operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),

    #[error("Truncated input: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("Invalid VarInt encoding")]
    InvalidVarInt,

    #[error("Trailing bytes after packet: {0}")]
    TrailingBytes(usize),

    #[error("Unrecognized packet 0x{opcode:02X} ({direction})")]
    UnknownPacket { direction: Direction, opcode: u8 },

    #[error("Invalid {kind} value: {value}")]
    InvalidEnumValue { kind: &'static str, value: u8 },

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Packet too large: {0} bytes")]
    OversizedPacket(usize),

    #[error("Unexpected message type")]
    UnexpectedMessage,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Timeout occurred")]
    Timeout,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Custom error: {0}")]
    Custom(String),
}

impl ProtocolError {
    /// Whether this error was raised while reading bytes off the wire
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            ProtocolError::DecodingError(_)
                | ProtocolError::Truncated { .. }
                | ProtocolError::InvalidVarInt
                | ProtocolError::TrailingBytes(_)
                | ProtocolError::UnknownPacket { .. }
                | ProtocolError::OversizedPacket(_)
        )
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
