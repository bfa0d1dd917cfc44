//! # Quiz Protocol Layer
//!
//! Typed packets for both directions, the enums carried in their `u8`
//! fields, and a dispatcher that routes decoded packets to handlers.

pub mod dispatcher;
pub mod enums;
pub mod packets;
