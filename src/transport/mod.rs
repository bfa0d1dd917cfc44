//! # Transport Layer
//!
//! Network transports carrying framed quiz packets.

pub mod tcp;
