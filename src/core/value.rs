//! # Schema-Driven Codec
//!
//! Encodes and decodes dynamic [`Record`]s against a [`PacketDefinition`].
//!
//! This is the generic path: anything with a definition in a [`SchemaTable`]
//! can be read or written without a dedicated Rust type. The typed packets in
//! `protocol::packets` produce the same bytes for the same values.
//!
//! ## Wire Format
//! ```text
//! [Opcode(1)] [Field 1] [Field 2] ... [Field N]   (fields in declared order)
//! ```
//!
//! Decoding never returns a partially populated record: any truncation,
//! malformed VarInt, or leftover byte fails the whole packet.

use bytes::{BufMut, Bytes, BytesMut};
use std::collections::BTreeMap;
use tracing::trace;

use crate::core::schema::{Direction, FieldType, PacketDefinition, SchemaTable, StructDef};
use crate::core::varint::write_varint;
use crate::core::wire::{write_bytes, write_len, VarInt, WireReader};
use crate::error::{constants, ProtocolError, Result};

/// A dynamically typed field value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    U8(u8),
    U32(u32),
    VarInt(u32),
    Bool(bool),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Structs(Vec<Record>),
    Map(BTreeMap<Value, Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::U8(_) => "u8",
            Value::U32(_) => "u32",
            Value::VarInt(_) => "VarInt",
            Value::Bool(_) => "bool",
            Value::Str(_) => "Str",
            Value::Bytes(_) => "ByteArray",
            Value::List(_) => "Vec",
            Value::Structs(_) => "StructVec",
            Value::Map(_) => "Map",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> Option<u8> {
        match self {
            Value::U8(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Build a `Map` value from key/value pairs
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<Value>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a `List` value
    pub fn list<T: Into<Value>, I: IntoIterator<Item = T>>(items: I) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::U8(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::U32(v)
    }
}

impl From<VarInt> for Value {
    fn from(v: VarInt) -> Self {
        Value::VarInt(v.0)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Vec<Record>> for Value {
    fn from(v: Vec<Record>) -> Self {
        Value::Structs(v)
    }
}

/// Named field values of one packet or struct
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.to_owned(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Encode `record` as a complete packet (opcode + fields)
pub fn encode(definition: &PacketDefinition, record: &Record) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    encode_into(definition, record, &mut buf)?;
    Ok(buf.freeze())
}

/// Append the encoded packet to `dst`
///
/// On error `dst` may hold a partial packet and should be discarded.
pub fn encode_into(definition: &PacketDefinition, record: &Record, dst: &mut BytesMut) -> Result<()> {
    dst.put_u8(definition.opcode());
    encode_record(definition.layout(), record, definition.name(), dst)?;
    trace!(packet = definition.name(), len = dst.len(), "Encoded record");
    Ok(())
}

/// Decode a complete packet, checking that its opcode matches `definition`
pub fn decode(definition: &PacketDefinition, bytes: &[u8]) -> Result<Record> {
    let mut reader = WireReader::new(bytes);
    let opcode = read_opcode(&mut reader)?;
    if opcode != definition.opcode() {
        return Err(ProtocolError::DecodingError(format!(
            "opcode 0x{opcode:02X} does not match {} (0x{:02X})",
            definition.name(),
            definition.opcode()
        )));
    }
    let record = decode_record(definition.layout(), &mut reader)?;
    reader.finish()?;
    Ok(record)
}

impl SchemaTable {
    /// Resolve the opcode under `direction`, then decode
    pub fn decode(&self, direction: Direction, bytes: &[u8]) -> Result<(&PacketDefinition, Record)> {
        let opcode = read_opcode(&mut WireReader::new(bytes))?;
        let definition = self.lookup(direction, opcode)?;
        let record = decode(definition, bytes)?;
        Ok((definition, record))
    }

    /// Look up `name` under `direction` and encode
    pub fn encode(&self, direction: Direction, name: &str, record: &Record) -> Result<Bytes> {
        let definition = self.by_name(direction, name).ok_or_else(|| {
            ProtocolError::EncodingError(format!("no {direction} packet named '{name}'"))
        })?;
        encode(definition, record)
    }
}

fn read_opcode(reader: &mut WireReader<'_>) -> Result<u8> {
    if reader.is_empty() {
        return Err(ProtocolError::DecodingError(
            constants::ERR_EMPTY_PACKET.to_string(),
        ));
    }
    reader.read_u8()
}

fn encode_record(layout: &StructDef, record: &Record, path: &str, dst: &mut BytesMut) -> Result<()> {
    if let Some((name, _)) = record.iter().find(|(name, _)| layout.field(name).is_none()) {
        return Err(ProtocolError::EncodingError(format!(
            "{path}: unknown field '{name}'"
        )));
    }

    for field in layout.fields() {
        let value = record.get(field.name).ok_or_else(|| {
            ProtocolError::EncodingError(format!("{path}: missing field '{}'", field.name))
        })?;
        encode_value(&field.ty, value, &format!("{path}.{}", field.name), dst)?;
    }
    Ok(())
}

fn encode_value(ty: &FieldType, value: &Value, path: &str, dst: &mut BytesMut) -> Result<()> {
    match (ty, value) {
        (FieldType::U8, Value::U8(v)) => dst.put_u8(*v),
        (FieldType::U32, Value::U32(v)) => dst.put_u32(*v),
        (FieldType::VarInt, Value::VarInt(v)) => write_varint(dst, *v),
        (FieldType::Bool, Value::Bool(v)) => dst.put_u8(u8::from(*v)),
        (FieldType::Str, Value::Str(v)) => write_bytes(dst, v.as_bytes())?,
        (FieldType::ByteArray, Value::Bytes(v)) => write_bytes(dst, v)?,
        (FieldType::Vec(item), Value::List(items)) => {
            write_len(dst, items.len())?;
            for (index, item_value) in items.iter().enumerate() {
                encode_value(item, item_value, &format!("{path}[{index}]"), dst)?;
            }
        }
        (FieldType::StructVec(layout), Value::Structs(records)) => {
            write_len(dst, records.len())?;
            for (index, record) in records.iter().enumerate() {
                encode_record(layout, record, &format!("{path}[{index}]"), dst)?;
            }
        }
        (FieldType::Map(key_ty, value_ty), Value::Map(entries)) => {
            write_len(dst, entries.len())?;
            for (key, entry) in entries {
                encode_value(key_ty, key, &format!("{path}.<key>"), dst)?;
                encode_value(value_ty, entry, &format!("{path}[{key:?}]"), dst)?;
            }
        }
        (ty, value) => {
            return Err(ProtocolError::EncodingError(format!(
                "{path}: expected {}, got {}",
                ty.type_name(),
                value.type_name()
            )))
        }
    }
    Ok(())
}

fn decode_record(layout: &StructDef, reader: &mut WireReader<'_>) -> Result<Record> {
    let mut record = Record::new();
    for field in layout.fields() {
        let value = decode_value(&field.ty, reader)?;
        record.insert(field.name, value);
    }
    Ok(record)
}

fn decode_value(ty: &FieldType, reader: &mut WireReader<'_>) -> Result<Value> {
    let value = match ty {
        FieldType::U8 => Value::U8(reader.read_u8()?),
        FieldType::U32 => Value::U32(reader.read_u32()?),
        FieldType::VarInt => Value::VarInt(reader.read_varint()?),
        FieldType::Bool => Value::Bool(reader.read_bool()?),
        FieldType::Str => Value::Str(reader.read_str()?.to_owned()),
        FieldType::ByteArray => Value::Bytes(reader.read_bytes()?.to_vec()),
        FieldType::Vec(item) => {
            let len = reader.read_len(item.min_size())?;
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(decode_value(item, reader)?);
            }
            Value::List(items)
        }
        FieldType::StructVec(layout) => {
            let len = reader.read_len(layout.min_size())?;
            let mut records = Vec::with_capacity(len);
            for _ in 0..len {
                records.push(decode_record(layout, reader)?);
            }
            Value::Structs(records)
        }
        FieldType::Map(key_ty, value_ty) => {
            let len = reader.read_len(key_ty.min_size() + value_ty.min_size())?;
            let mut entries = BTreeMap::new();
            for _ in 0..len {
                let key = decode_value(key_ty, reader)?;
                let entry = decode_value(value_ty, reader)?;
                if entries.contains_key(&key) {
                    return Err(ProtocolError::DecodingError(format!(
                        "Duplicate map key: {key:?}"
                    )));
                }
                entries.insert(key, entry);
            }
            Value::Map(entries)
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::core::schema::{quiz_schema, FieldDef};

    fn def(direction: Direction, opcode: u8) -> &'static PacketDefinition {
        quiz_schema().unwrap().lookup(direction, opcode).unwrap()
    }

    #[test]
    fn test_game_state_roundtrip() {
        let definition = def(Direction::Server, 0x04);
        let record = Record::new().with("state", 1u8);

        let bytes = encode(definition, &record).unwrap();
        assert_eq!(&bytes[..], &[0x04, 0x01]);
        assert_eq!(decode(definition, &bytes).unwrap(), record);
    }

    #[test]
    fn test_fields_written_in_declared_order() {
        let definition = def(Direction::Server, 0x02);
        let record = Record::new()
            .with("title", "Quiz")
            .with("owner", true)
            .with("id", "AB12C");

        let bytes = encode(definition, &record).unwrap();
        let mut expected = vec![0x02, 0x05];
        expected.extend_from_slice(b"AB12C");
        expected.push(0x01);
        expected.push(0x04);
        expected.extend_from_slice(b"Quiz");
        assert_eq!(&bytes[..], &expected[..]);
    }

    #[test]
    fn test_scores_map_roundtrip() {
        let definition = def(Direction::Server, 0x09);
        let record = Record::new().with(
            "scores",
            Value::map([("alice", Value::U32(10)), ("bob", Value::U32(7))]),
        );

        let bytes = encode(definition, &record).unwrap();
        let decoded = decode(definition, &bytes).unwrap();
        let scores = match decoded.get("scores") {
            Some(Value::Map(scores)) => scores,
            other => panic!("expected map, got {other:?}"),
        };
        assert_eq!(scores.len(), 2);
        assert_eq!(scores.get(&Value::from("alice")), Some(&Value::U32(10)));
        assert_eq!(scores.get(&Value::from("bob")), Some(&Value::U32(7)));
    }

    #[test]
    fn test_create_game_struct_vec_roundtrip() {
        let definition = def(Direction::Client, 0x00);
        let question = Record::new()
            .with("imageType", "image/png")
            .with("image", vec![0x89u8, 0x50, 0x4E, 0x47])
            .with("question", "2 + 2?")
            .with("answers", Value::list(["3", "4"]))
            .with("values", Value::list([0u8, 1u8]));
        let record = Record::new()
            .with("title", "Maths")
            .with("questions", vec![question]);

        let bytes = encode(definition, &record).unwrap();
        assert_eq!(decode(definition, &bytes).unwrap(), record);
    }

    #[test]
    fn test_struct_vec_of_small_records_roundtrip() {
        let marks = StructDef::new(vec![FieldDef::new("mark", FieldType::U8)], &["mark"]).unwrap();
        let definition = PacketDefinition::new(
            "Marks",
            Direction::Server,
            0x20,
            vec![FieldDef::new("marks", FieldType::StructVec(marks))],
            &["marks"],
        )
        .unwrap();
        let record = Record::new().with(
            "marks",
            (1u8..=3)
                .map(|mark| Record::new().with("mark", mark))
                .collect::<Vec<_>>(),
        );

        let bytes = encode(&definition, &record).unwrap();
        assert_eq!(&bytes[..], &[0x20, 0x03, 0x01, 0x02, 0x03]);
        assert_eq!(decode(&definition, &bytes).unwrap(), record);
    }

    #[test]
    fn test_struct_vec_without_fields_cannot_be_defined() {
        let empty = StructDef::new(vec![], &[]).unwrap();
        let result = PacketDefinition::new(
            "Marks",
            Direction::Server,
            0x20,
            vec![FieldDef::new("marks", FieldType::StructVec(empty))],
            &["marks"],
        );
        assert!(matches!(result, Err(ProtocolError::SchemaMismatch(_))));
    }

    #[test]
    fn test_struct_vec_count_bounded_by_element_size() {
        // Two questions need at least ten bytes; only six follow
        let definition = def(Direction::Client, 0x00);
        let bytes = [0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        assert!(matches!(
            decode(definition, &bytes),
            Err(ProtocolError::Truncated {
                needed: 10,
                remaining: 6
            })
        ));
    }

    #[test]
    fn test_missing_field_is_encoding_error() {
        let definition = def(Direction::Client, 0x03);
        let record = Record::new().with("id", "AB12C");
        match encode(definition, &record) {
            Err(ProtocolError::EncodingError(msg)) => assert!(msg.contains("name")),
            other => panic!("expected encoding error, got {other:?}"),
        }
    }

    #[test]
    fn test_type_mismatch_is_encoding_error() {
        let definition = def(Direction::Client, 0x05);
        let record = Record::new().with("id", 3u32);
        assert!(matches!(
            encode(definition, &record),
            Err(ProtocolError::EncodingError(_))
        ));
    }

    #[test]
    fn test_unknown_field_is_encoding_error() {
        let definition = def(Direction::Client, 0x05);
        let record = Record::new().with("id", 3u8).with("extra", 1u8);
        assert!(matches!(
            encode(definition, &record),
            Err(ProtocolError::EncodingError(_))
        ));
    }

    #[test]
    fn test_truncated_input_fails() {
        let definition = def(Direction::Server, 0x05);
        let record = Record::new()
            .with("id", "p1")
            .with("name", "Alice")
            .with("mode", 0u8);
        let bytes = encode(definition, &record).unwrap();

        for cut in 0..bytes.len() {
            let err = decode(definition, &bytes[..cut]).unwrap_err();
            assert!(err.is_decode_error(), "cut at {cut}: {err:?}");
        }
    }

    #[test]
    fn test_invalid_varint_fails() {
        let definition = def(Direction::Server, 0x06);
        let bytes = [0x06, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x00];
        assert!(matches!(
            decode(definition, &bytes),
            Err(ProtocolError::InvalidVarInt)
        ));
    }

    #[test]
    fn test_wrong_opcode_rejected() {
        let definition = def(Direction::Server, 0x08);
        assert!(matches!(
            decode(definition, &[0x03, 0x01]),
            Err(ProtocolError::DecodingError(_))
        ));
    }

    #[test]
    fn test_table_decode_uses_direction() {
        let table = quiz_schema().unwrap();
        let bytes = [0x05, 0x02];

        let (client_def, record) = table.decode(Direction::Client, &bytes).unwrap();
        assert_eq!(client_def.name(), "Answer");
        assert_eq!(record.get("id"), Some(&Value::U8(2)));

        // Under the server direction 0x05 is PlayerData, which needs far more input
        assert!(table.decode(Direction::Server, &bytes).is_err());
    }

    #[test]
    fn test_table_encode_by_name() {
        let table = quiz_schema().unwrap();
        let bytes = table
            .encode(Direction::Server, "AnswerResult", &Record::new().with("result", true))
            .unwrap();
        assert_eq!(&bytes[..], &[0x08, 0x01]);
        assert!(table
            .encode(Direction::Client, "AnswerResult", &Record::new())
            .is_err());
    }
}
