//! # Typed Packets
//!
//! One Rust struct per packet, grouped into [`ServerPacket`] (server to client)
//! and [`ClientPacket`] (client to server).
//!
//! Field declaration order is wire order. Each packet encodes to exactly the
//! bytes the schema-driven codec produces for the matching definition in
//! [`quiz_schema`].
//!
//! ## Example
//! ```rust
//! use quiz_protocol::protocol::enums::States;
//! use quiz_protocol::protocol::packets::{GameStatePacket, PacketSet, ServerPacket};
//!
//! # fn main() -> quiz_protocol::error::Result<()> {
//! let packet = ServerPacket::from(GameStatePacket::new(States::Start));
//! let bytes = packet.to_bytes()?;
//! assert_eq!(&bytes[..], &[0x04, 0x01]);
//! assert_eq!(ServerPacket::decode(&bytes)?, packet);
//! # Ok(())
//! # }
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use std::collections::HashMap;

use crate::core::schema::{quiz_schema, Direction, PacketDefinition};
use crate::core::wire::{VarInt, Wire, WireReader};
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::enums::{PlayerDataMode, States};

/// A single packet type with a fixed opcode
pub trait Packet: Wire {
    const OPCODE: u8;
    const DIRECTION: Direction;
    const NAME: &'static str;
}

/// All packets travelling in one direction
pub trait PacketSet: Sized + Send + 'static {
    const DIRECTION: Direction;

    fn opcode(&self) -> u8;

    fn name(&self) -> &'static str;

    /// Append opcode and fields to `dst`
    fn encode(&self, dst: &mut BytesMut) -> Result<()>;

    /// Decode one complete packet; the whole input must be consumed
    fn decode(bytes: &[u8]) -> Result<Self>;

    /// Opcodes defined for this direction
    fn opcodes() -> &'static [u8];

    fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// The schema definition describing this packet
    fn definition(&self) -> Result<&'static PacketDefinition> {
        quiz_schema()?.lookup(Self::DIRECTION, self.opcode())
    }
}

/// Declare a struct whose fields are encoded in declaration order
macro_rules! wire_struct {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $($(#[$fmeta:meta])* pub $field:ident : $ty:ty),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            $($(#[$fmeta])* pub $field: $ty,)*
        }

        impl Wire for $name {
            #[allow(unused_variables)]
            fn encode(&self, dst: &mut BytesMut) -> Result<()> {
                $(self.$field.encode(dst)?;)*
                Ok(())
            }

            #[allow(unused_variables)]
            fn decode(src: &mut WireReader<'_>) -> Result<Self> {
                Ok(Self {
                    $($field: <$ty as Wire>::decode(src)?,)*
                })
            }
        }
    };
}

/// Declare a direction's packet enum and bind each packet struct to its opcode
macro_rules! packet_set {
    (
        $(#[$meta:meta])*
        pub enum $set:ident ($dir:ident) {
            $($variant:ident($packet:ident) = $opcode:literal),* $(,)?
        }
    ) => {
        $(
            impl Packet for $packet {
                const OPCODE: u8 = $opcode;
                const DIRECTION: Direction = Direction::$dir;
                const NAME: &'static str = stringify!($variant);
            }

            impl From<$packet> for $set {
                fn from(packet: $packet) -> Self {
                    $set::$variant(packet)
                }
            }
        )*

        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum $set {
            $($variant($packet),)*
        }

        impl PacketSet for $set {
            const DIRECTION: Direction = Direction::$dir;

            fn opcode(&self) -> u8 {
                match self {
                    $($set::$variant(_) => $opcode,)*
                }
            }

            fn name(&self) -> &'static str {
                match self {
                    $($set::$variant(_) => stringify!($variant),)*
                }
            }

            fn encode(&self, dst: &mut BytesMut) -> Result<()> {
                dst.put_u8(self.opcode());
                match self {
                    $($set::$variant(packet) => packet.encode(dst),)*
                }
            }

            fn decode(bytes: &[u8]) -> Result<Self> {
                let mut reader = WireReader::new(bytes);
                if reader.is_empty() {
                    return Err(ProtocolError::DecodingError(
                        constants::ERR_EMPTY_PACKET.to_string(),
                    ));
                }
                let opcode = reader.read_u8()?;
                let packet = match opcode {
                    $($opcode => $set::$variant(<$packet as Wire>::decode(&mut reader)?),)*
                    _ => {
                        return Err(ProtocolError::UnknownPacket {
                            direction: Direction::$dir,
                            opcode,
                        })
                    }
                };
                reader.finish()?;
                Ok(packet)
            }

            fn opcodes() -> &'static [u8] {
                &[$($opcode),*]
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Server -> client
// ---------------------------------------------------------------------------

wire_struct! {
    /// Tells the client it is being disconnected
    pub struct DisconnectPacket {
        pub reason: String,
    }
}

wire_struct! {
    /// Reports a failed request to the client
    pub struct ErrorPacket {
        pub cause: String,
    }
}

wire_struct! {
    /// Confirms the client joined (or created) a game
    pub struct JoinGamePacket {
        pub id: String,
        /// Whether the client is the game's host
        pub owner: bool,
        pub title: String,
    }
}

wire_struct! {
    pub struct NameTakenResultPacket {
        pub result: bool,
    }
}

wire_struct! {
    /// Carries a [`States`] value as a raw byte
    pub struct GameStatePacket {
        pub state: u8,
    }
}

wire_struct! {
    /// Adds, removes or identifies a player; `mode` is a [`PlayerDataMode`]
    pub struct PlayerDataPacket {
        pub id: String,
        pub name: String,
        pub mode: u8,
    }
}

wire_struct! {
    pub struct TimeSyncPacket {
        pub total: VarInt,
        pub remaining: VarInt,
    }
}

wire_struct! {
    /// A question shown to players, without the answer values
    pub struct QuestionPacket {
        /// MIME type of `image`
        pub image_type: String,
        pub image: Bytes,
        pub question: String,
        pub answers: Vec<String>,
    }
}

wire_struct! {
    pub struct AnswerResultPacket {
        pub result: bool,
    }
}

wire_struct! {
    /// Player name to score
    pub struct ScoresPacket {
        pub scores: HashMap<String, u32>,
    }
}

packet_set! {
    /// Packets sent by the server
    pub enum ServerPacket (Server) {
        Disconnect(DisconnectPacket) = 0x00,
        Error(ErrorPacket) = 0x01,
        JoinGame(JoinGamePacket) = 0x02,
        NameTakenResult(NameTakenResultPacket) = 0x03,
        GameState(GameStatePacket) = 0x04,
        PlayerData(PlayerDataPacket) = 0x05,
        TimeSync(TimeSyncPacket) = 0x06,
        Question(QuestionPacket) = 0x07,
        AnswerResult(AnswerResultPacket) = 0x08,
        Scores(ScoresPacket) = 0x09,
    }
}

// ---------------------------------------------------------------------------
// Client -> server
// ---------------------------------------------------------------------------

wire_struct! {
    /// One question of a new game, with per-answer values
    pub struct QuestionData {
        pub image_type: String,
        pub image: Bytes,
        pub question: String,
        pub answers: Vec<String>,
        /// Non-zero marks a correct answer
        pub values: Vec<u8>,
    }
}

wire_struct! {
    pub struct CreateGamePacket {
        pub title: String,
        pub questions: Vec<QuestionData>,
    }
}

wire_struct! {
    pub struct CheckNameTakenPacket {
        pub id: String,
        pub name: String,
    }
}

wire_struct! {
    pub struct RequestGameStatePacket {
        pub id: String,
    }
}

wire_struct! {
    pub struct RequestJoinPacket {
        pub id: String,
        pub name: String,
    }
}

wire_struct! {
    /// Host request; `state` is a [`States`] value
    pub struct StateChangePacket {
        pub state: u8,
    }
}

wire_struct! {
    /// The index of the chosen answer
    pub struct AnswerPacket {
        pub id: u8,
    }
}

wire_struct! {
    /// Host request to remove the player with this id
    pub struct KickPacket {
        pub id: String,
    }
}

packet_set! {
    /// Packets sent by clients
    pub enum ClientPacket (Client) {
        CreateGame(CreateGamePacket) = 0x00,
        CheckNameTaken(CheckNameTakenPacket) = 0x01,
        RequestGameState(RequestGameStatePacket) = 0x02,
        RequestJoin(RequestJoinPacket) = 0x03,
        StateChange(StateChangePacket) = 0x04,
        Answer(AnswerPacket) = 0x05,
        Kick(KickPacket) = 0x06,
    }
}

impl DisconnectPacket {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl ErrorPacket {
    pub fn new(cause: impl Into<String>) -> Self {
        Self {
            cause: cause.into(),
        }
    }
}

impl From<&ProtocolError> for ErrorPacket {
    fn from(err: &ProtocolError) -> Self {
        Self::new(err.to_string())
    }
}

impl GameStatePacket {
    pub fn new(state: States) -> Self {
        Self { state: state.into() }
    }

    pub fn state(&self) -> Result<States> {
        States::try_from(self.state)
    }
}

impl PlayerDataPacket {
    pub fn new(id: impl Into<String>, name: impl Into<String>, mode: PlayerDataMode) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mode: mode.into(),
        }
    }

    pub fn mode(&self) -> Result<PlayerDataMode> {
        PlayerDataMode::try_from(self.mode)
    }
}

impl TimeSyncPacket {
    pub fn new(total: u32, remaining: u32) -> Self {
        Self {
            total: VarInt(total),
            remaining: VarInt(remaining),
        }
    }
}

impl ScoresPacket {
    pub fn new<I, S>(scores: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        Self {
            scores: scores.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl StateChangePacket {
    pub fn new(state: States) -> Self {
        Self { state: state.into() }
    }

    pub fn state(&self) -> Result<States> {
        States::try_from(self.state)
    }
}

impl QuestionData {
    /// Whether answer `index` carries a non-zero value
    pub fn is_correct(&self, index: usize) -> bool {
        self.values.get(index).is_some_and(|v| *v != 0)
    }

    /// The packet players receive for this question
    pub fn to_question(&self) -> QuestionPacket {
        QuestionPacket {
            image_type: self.image_type.clone(),
            image: self.image.clone(),
            question: self.question.clone(),
            answers: self.answers.clone(),
        }
    }
}
