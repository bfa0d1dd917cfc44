//! # Packet Schema Table
//!
//! Declarative packet layouts keyed by direction and opcode.
//!
//! Server and client opcodes live in separate namespaces: both directions use
//! `0x00..` independently, so every lookup takes a [`Direction`] alongside the
//! opcode. Definitions are validated when they are built and never change
//! afterwards.
//!
//! ## Example
//! ```rust
//! use quiz_protocol::core::schema::{quiz_schema, Direction};
//!
//! # fn main() -> quiz_protocol::error::Result<()> {
//! let schema = quiz_schema()?;
//! assert_eq!(schema.lookup(Direction::Server, 0x05)?.name(), "PlayerData");
//! assert_eq!(schema.lookup(Direction::Client, 0x05)?.name(), "Answer");
//! # Ok(())
//! # }
//! ```

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::debug;

use crate::error::{ProtocolError, Result};

/// Which side sends a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    /// Sent by the server, read by clients
    Server,
    /// Sent by clients, read by the server
    Client,
}

impl Direction {
    /// The direction of replies to packets travelling this way
    pub fn reverse(self) -> Self {
        match self {
            Direction::Server => Direction::Client,
            Direction::Client => Direction::Server,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Server => f.write_str("server->client"),
            Direction::Client => f.write_str("client->server"),
        }
    }
}

/// Type of a single field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    U8,
    U32,
    VarInt,
    Bool,
    Str,
    ByteArray,
    Vec(Box<FieldType>),
    StructVec(StructDef),
    Map(Box<FieldType>, Box<FieldType>),
}

impl FieldType {
    pub fn vec(item: FieldType) -> Self {
        FieldType::Vec(Box::new(item))
    }

    pub fn map(key: FieldType, value: FieldType) -> Self {
        FieldType::Map(Box::new(key), Box::new(value))
    }

    /// Fixed-size or string types usable as map keys
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            FieldType::U8 | FieldType::U32 | FieldType::VarInt | FieldType::Bool | FieldType::Str
        )
    }

    /// Smallest encoded size of one value of this type
    pub fn min_size(&self) -> usize {
        match self {
            FieldType::U32 => 4,
            _ => 1,
        }
    }

    /// Short name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::U8 => "u8",
            FieldType::U32 => "u32",
            FieldType::VarInt => "VarInt",
            FieldType::Bool => "bool",
            FieldType::Str => "Str",
            FieldType::ByteArray => "ByteArray",
            FieldType::Vec(_) => "Vec",
            FieldType::StructVec(_) => "StructVec",
            FieldType::Map(..) => "Map",
        }
    }

    fn validate(&self, path: &str) -> Result<()> {
        match self {
            FieldType::Vec(item) => item.validate(path),
            FieldType::Map(key, value) => {
                if !key.is_scalar() {
                    return Err(ProtocolError::SchemaMismatch(format!(
                        "{path}: map key must be a scalar type, got {}",
                        key.type_name()
                    )));
                }
                value.validate(path)
            }
            // Zero-sized elements would let a count claim any number of records
            FieldType::StructVec(layout) if layout.min_size() == 0 => {
                Err(ProtocolError::SchemaMismatch(format!(
                    "{path}: struct sequence elements need at least one field"
                )))
            }
            // StructDef validated on construction
            _ => Ok(()),
        }
    }
}

/// A named field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub ty: FieldType,
}

impl FieldDef {
    pub fn new(name: &'static str, ty: FieldType) -> Self {
        Self { name, ty }
    }
}

/// Ordered field layout shared by packets and struct sequences
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDef {
    fields: Vec<FieldDef>,
}

impl StructDef {
    /// Build a layout from declared fields and a wire order list.
    ///
    /// The order list must name every declared field exactly once.
    pub fn new(fields: Vec<FieldDef>, order: &[&'static str]) -> Result<Self> {
        let mut declared: HashMap<&'static str, FieldType> = HashMap::with_capacity(fields.len());
        for field in fields {
            field.ty.validate(field.name)?;
            if declared.insert(field.name, field.ty).is_some() {
                return Err(ProtocolError::SchemaMismatch(format!(
                    "field '{}' declared twice",
                    field.name
                )));
            }
        }

        let mut seen = HashSet::with_capacity(order.len());
        let mut ordered = Vec::with_capacity(order.len());
        for &name in order {
            if !seen.insert(name) {
                return Err(ProtocolError::SchemaMismatch(format!(
                    "field '{name}' listed twice in order"
                )));
            }
            let ty = declared.remove(name).ok_or_else(|| {
                ProtocolError::SchemaMismatch(format!("order names undeclared field '{name}'"))
            })?;
            ordered.push(FieldDef { name, ty });
        }

        if !declared.is_empty() {
            let mut missing: Vec<_> = declared.keys().copied().collect();
            missing.sort_unstable();
            return Err(ProtocolError::SchemaMismatch(format!(
                "fields missing from order: {}",
                missing.join(", ")
            )));
        }

        Ok(Self { fields: ordered })
    }

    /// Fields in wire order
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Smallest encoded size of one struct with this layout
    pub fn min_size(&self) -> usize {
        self.fields.iter().map(|f| f.ty.min_size()).sum()
    }
}

/// Layout of one packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketDefinition {
    name: &'static str,
    direction: Direction,
    opcode: u8,
    layout: StructDef,
}

impl PacketDefinition {
    pub fn new(
        name: &'static str,
        direction: Direction,
        opcode: u8,
        fields: Vec<FieldDef>,
        order: &[&'static str],
    ) -> Result<Self> {
        let layout = StructDef::new(fields, order).map_err(|e| match e {
            ProtocolError::SchemaMismatch(msg) => ProtocolError::SchemaMismatch(format!("{name}: {msg}")),
            other => other,
        })?;
        Ok(Self {
            name,
            direction,
            opcode,
            layout,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    pub fn layout(&self) -> &StructDef {
        &self.layout
    }

    /// Fields in wire order
    pub fn fields(&self) -> &[FieldDef] {
        self.layout.fields()
    }
}

/// Registry of packet definitions keyed by `(Direction, opcode)`
#[derive(Debug, Default)]
pub struct SchemaTable {
    packets: HashMap<(Direction, u8), PacketDefinition>,
}

impl SchemaTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition; an opcode may only be used once per direction
    pub fn register(&mut self, definition: PacketDefinition) -> Result<()> {
        let key = (definition.direction, definition.opcode);
        if let Some(existing) = self.packets.get(&key) {
            return Err(ProtocolError::SchemaMismatch(format!(
                "opcode 0x{:02X} ({}) already used by {}",
                definition.opcode,
                definition.direction,
                existing.name
            )));
        }
        debug!(
            name = definition.name,
            opcode = definition.opcode,
            direction = %definition.direction,
            "Registered packet definition"
        );
        self.packets.insert(key, definition);
        Ok(())
    }

    pub fn lookup(&self, direction: Direction, opcode: u8) -> Result<&PacketDefinition> {
        self.packets
            .get(&(direction, opcode))
            .ok_or(ProtocolError::UnknownPacket { direction, opcode })
    }

    pub fn by_name(&self, direction: Direction, name: &str) -> Option<&PacketDefinition> {
        self.packets
            .values()
            .find(|d| d.direction == direction && d.name == name)
    }

    /// Definitions for one direction, sorted by opcode
    pub fn definitions(&self, direction: Direction) -> Vec<&PacketDefinition> {
        let mut defs: Vec<_> = self
            .packets
            .values()
            .filter(|d| d.direction == direction)
            .collect();
        defs.sort_by_key(|d| d.opcode);
        defs
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }
}

static QUIZ_SCHEMA: Lazy<std::result::Result<SchemaTable, String>> =
    Lazy::new(|| build_quiz_schema().map_err(|e| e.to_string()));

/// The quiz game's packet table, built on first use
pub fn quiz_schema() -> Result<&'static SchemaTable> {
    QUIZ_SCHEMA
        .as_ref()
        .map_err(|e| ProtocolError::SchemaMismatch(e.clone()))
}

/// Layout of one question inside `CreateGame`
pub fn question_layout() -> Result<StructDef> {
    use FieldType::*;
    StructDef::new(
        vec![
            FieldDef::new("imageType", Str),
            FieldDef::new("image", ByteArray),
            FieldDef::new("question", Str),
            FieldDef::new("answers", FieldType::vec(Str)),
            FieldDef::new("values", FieldType::vec(U8)),
        ],
        &["imageType", "image", "question", "answers", "values"],
    )
}

/// Build the quiz packet table from scratch
pub fn build_quiz_schema() -> Result<SchemaTable> {
    use Direction::{Client, Server};
    use FieldType::*;

    let f = FieldDef::new;
    let mut table = SchemaTable::new();

    // Server -> client
    table.register(PacketDefinition::new("Disconnect", Server, 0x00, vec![f("reason", Str)], &["reason"])?)?;
    table.register(PacketDefinition::new("Error", Server, 0x01, vec![f("cause", Str)], &["cause"])?)?;
    table.register(PacketDefinition::new(
        "JoinGame",
        Server,
        0x02,
        vec![f("id", Str), f("owner", Bool), f("title", Str)],
        &["id", "owner", "title"],
    )?)?;
    table.register(PacketDefinition::new("NameTakenResult", Server, 0x03, vec![f("result", Bool)], &["result"])?)?;
    table.register(PacketDefinition::new("GameState", Server, 0x04, vec![f("state", U8)], &["state"])?)?;
    table.register(PacketDefinition::new(
        "PlayerData",
        Server,
        0x05,
        vec![f("id", Str), f("name", Str), f("mode", U8)],
        &["id", "name", "mode"],
    )?)?;
    table.register(PacketDefinition::new(
        "TimeSync",
        Server,
        0x06,
        vec![f("total", VarInt), f("remaining", VarInt)],
        &["total", "remaining"],
    )?)?;
    table.register(PacketDefinition::new(
        "Question",
        Server,
        0x07,
        vec![
            f("imageType", Str),
            f("image", ByteArray),
            f("question", Str),
            f("answers", FieldType::vec(Str)),
        ],
        &["imageType", "image", "question", "answers"],
    )?)?;
    table.register(PacketDefinition::new("AnswerResult", Server, 0x08, vec![f("result", Bool)], &["result"])?)?;
    table.register(PacketDefinition::new(
        "Scores",
        Server,
        0x09,
        vec![f("scores", FieldType::map(Str, U32))],
        &["scores"],
    )?)?;

    // Client -> server
    table.register(PacketDefinition::new(
        "CreateGame",
        Client,
        0x00,
        vec![f("title", Str), f("questions", StructVec(question_layout()?))],
        &["title", "questions"],
    )?)?;
    table.register(PacketDefinition::new(
        "CheckNameTaken",
        Client,
        0x01,
        vec![f("id", Str), f("name", Str)],
        &["id", "name"],
    )?)?;
    table.register(PacketDefinition::new("RequestGameState", Client, 0x02, vec![f("id", Str)], &["id"])?)?;
    table.register(PacketDefinition::new(
        "RequestJoin",
        Client,
        0x03,
        vec![f("id", Str), f("name", Str)],
        &["id", "name"],
    )?)?;
    table.register(PacketDefinition::new("StateChange", Client, 0x04, vec![f("state", U8)], &["state"])?)?;
    table.register(PacketDefinition::new("Answer", Client, 0x05, vec![f("id", U8)], &["id"])?)?;
    table.register(PacketDefinition::new("Kick", Client, 0x06, vec![f("id", Str)], &["id"])?)?;

    Ok(table)
}
