//! Enumerations carried inside `u8` packet fields.
//!
//! The wire does not validate these bytes; conversion into the enums is
//! range-checked here, at the application boundary.

use crate::error::{ProtocolError, Result};

/// How a `PlayerData` packet affects the receiving client's player list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PlayerDataMode {
    /// Another player joined
    Add = 0,
    /// A player left or was kicked
    Remove = 1,
    /// The receiving client's own player
    SelfPlayer = 2,
}

impl TryFrom<u8> for PlayerDataMode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(PlayerDataMode::Add),
            1 => Ok(PlayerDataMode::Remove),
            2 => Ok(PlayerDataMode::SelfPlayer),
            _ => Err(ProtocolError::InvalidEnumValue {
                kind: "PlayerDataMode",
                value,
            }),
        }
    }
}

impl From<PlayerDataMode> for u8 {
    fn from(mode: PlayerDataMode) -> Self {
        mode as u8
    }
}

/// Game state changes requested by the host and announced by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum States {
    Disconnect = 0,
    Start = 1,
    Skip = 2,
}

impl TryFrom<u8> for States {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(States::Disconnect),
            1 => Ok(States::Start),
            2 => Ok(States::Skip),
            _ => Err(ProtocolError::InvalidEnumValue {
                kind: "States",
                value,
            }),
        }
    }
}

impl From<States> for u8 {
    fn from(state: States) -> Self {
        state as u8
    }
}
