//! Compact binary backend.
//!
//! Every token is one tag byte followed by its payload:
//!
//! ```text
//! property   0x05 varint(len) utf8
//! alias      0x06 u8                    (reserved names only)
//! int        0x13 varint(zigzag(i64))
//! uint       0x14 varint(u64)
//! float      0x15 f64 LE
//! string     0x16 varint(len) utf8
//! guid       0x17 16 bytes
//! type id    0x18 varint(len) utf8
//! ```
//!
//! Structure tokens, `null` and booleans are a bare tag.

use arbor_types::Guid;

use crate::error::{StreamError, StreamResult};
use crate::names;
use crate::nesting::Nesting;
use crate::reader::TokenReader;
use crate::token::Token;
use crate::varint::{decode_varint, encode_varint, zigzag_decode, zigzag_encode};
use crate::writer::TokenWriter;

mod tag {
    pub const START_OBJECT: u8 = 0x01;
    pub const END_OBJECT: u8 = 0x02;
    pub const START_ARRAY: u8 = 0x03;
    pub const END_ARRAY: u8 = 0x04;
    pub const PROPERTY: u8 = 0x05;
    pub const PROPERTY_ALIAS: u8 = 0x06;
    pub const NULL: u8 = 0x10;
    pub const FALSE: u8 = 0x11;
    pub const TRUE: u8 = 0x12;
    pub const INT: u8 = 0x13;
    pub const UINT: u8 = 0x14;
    pub const FLOAT: u8 = 0x15;
    pub const STRING: u8 = 0x16;
    pub const GUID: u8 = 0x17;
    pub const TYPE_ID: u8 = 0x18;
}

/// Writes tokens into an in-memory buffer.
#[derive(Debug)]
pub struct BinaryWriter {
    buf: Vec<u8>,
    nesting: Nesting,
    aliases: bool,
}

impl BinaryWriter {
    /// A writer that aliases reserved property names.
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            nesting: Nesting::new(),
            aliases: true,
        }
    }

    pub fn with_aliases(mut self, aliases: bool) -> Self {
        self.aliases = aliases;
        self
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Finish the stream. Fails unless exactly one root value was written.
    pub fn finish(self) -> StreamResult<Vec<u8>> {
        if !self.nesting.is_complete() {
            return Err(self.nesting.incomplete_error());
        }
        Ok(self.buf)
    }

    fn put_str(&mut self, s: &str) {
        encode_varint(&mut self.buf, s.len() as u64);
        self.buf.extend_from_slice(s.as_bytes());
    }
}

impl Default for BinaryWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenWriter for BinaryWriter {
    fn write_token(&mut self, token: Token) -> StreamResult<()> {
        self.nesting.apply(&token)?;
        match token {
            Token::StartObject => self.buf.push(tag::START_OBJECT),
            Token::EndObject => self.buf.push(tag::END_OBJECT),
            Token::StartArray => self.buf.push(tag::START_ARRAY),
            Token::EndArray => self.buf.push(tag::END_ARRAY),
            Token::PropertyName(name) => match names::alias_of(&name).filter(|_| self.aliases) {
                Some(alias) => {
                    self.buf.push(tag::PROPERTY_ALIAS);
                    self.buf.push(alias);
                }
                None => {
                    self.buf.push(tag::PROPERTY);
                    self.put_str(&name);
                }
            },
            Token::Null => self.buf.push(tag::NULL),
            Token::Bool(false) => self.buf.push(tag::FALSE),
            Token::Bool(true) => self.buf.push(tag::TRUE),
            Token::Int(v) => {
                self.buf.push(tag::INT);
                encode_varint(&mut self.buf, zigzag_encode(v));
            }
            Token::UInt(v) => {
                self.buf.push(tag::UINT);
                encode_varint(&mut self.buf, v);
            }
            Token::Float(v) => {
                self.buf.push(tag::FLOAT);
                self.buf.extend_from_slice(&v.to_le_bytes());
            }
            Token::String(s) => {
                self.buf.push(tag::STRING);
                self.put_str(&s);
            }
            Token::Guid(g) => {
                self.buf.push(tag::GUID);
                self.buf.extend_from_slice(g.as_bytes());
            }
            Token::TypeId(t) => {
                self.buf.push(tag::TYPE_ID);
                self.put_str(&t);
            }
        }
        Ok(())
    }

    fn path(&self) -> String {
        self.nesting.path()
    }
}

/// Reads tokens back from a buffer produced by [`BinaryWriter`].
#[derive(Debug)]
pub struct BinaryReader {
    data: Vec<u8>,
    pos: usize,
    peeked: Option<Token>,
    nesting: Nesting,
}

impl BinaryReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            pos: 0,
            peeked: None,
            nesting: Nesting::new(),
        }
    }

    /// Byte offset of the next undecoded token.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn corrupt(offset: usize, reason: impl Into<String>) -> StreamError {
        StreamError::Corrupt {
            offset: offset as u64,
            reason: reason.into(),
        }
    }

    fn take(&mut self, len: usize) -> StreamResult<&[u8]> {
        let start = self.pos;
        let end = start
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| Self::corrupt(start, format!("truncated: need {len} more bytes")))?;
        self.pos = end;
        Ok(&self.data[start..end])
    }

    fn take_varint(&mut self) -> StreamResult<u64> {
        let (value, consumed) = decode_varint(&self.data[self.pos..], self.pos)?;
        self.pos += consumed;
        Ok(value)
    }

    fn take_str(&mut self) -> StreamResult<String> {
        let len = self.take_varint()?;
        let start = self.pos;
        let len = usize::try_from(len).map_err(|_| Self::corrupt(start, "string length overflow"))?;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| Self::corrupt(start, format!("invalid utf-8: {e}")))
    }

    fn decode_token(&mut self) -> StreamResult<Option<Token>> {
        let offset = self.pos;
        let Some(&tag) = self.data.get(offset) else {
            return Ok(None);
        };
        self.pos += 1;
        let token = match tag {
            tag::START_OBJECT => Token::StartObject,
            tag::END_OBJECT => Token::EndObject,
            tag::START_ARRAY => Token::StartArray,
            tag::END_ARRAY => Token::EndArray,
            tag::PROPERTY => Token::PropertyName(self.take_str()?),
            tag::PROPERTY_ALIAS => {
                let alias = self.take(1)?[0];
                let name = names::name_of_alias(alias)
                    .ok_or_else(|| Self::corrupt(offset, format!("unknown name alias {alias}")))?;
                Token::PropertyName(name.to_string())
            }
            tag::NULL => Token::Null,
            tag::FALSE => Token::Bool(false),
            tag::TRUE => Token::Bool(true),
            tag::INT => Token::Int(zigzag_decode(self.take_varint()?)),
            tag::UINT => Token::UInt(self.take_varint()?),
            tag::FLOAT => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(self.take(8)?);
                Token::Float(f64::from_le_bytes(raw))
            }
            tag::STRING => Token::String(self.take_str()?),
            tag::GUID => {
                let mut raw = [0u8; 16];
                raw.copy_from_slice(self.take(16)?);
                Token::Guid(Guid::from_bytes(raw))
            }
            tag::TYPE_ID => Token::TypeId(self.take_str()?),
            other => return Err(Self::corrupt(offset, format!("unknown token tag 0x{other:02x}"))),
        };
        Ok(Some(token))
    }
}

impl TokenReader for BinaryReader {
    fn peek(&mut self) -> StreamResult<Option<&Token>> {
        if self.peeked.is_none() {
            self.peeked = self.decode_token()?;
        }
        Ok(self.peeked.as_ref())
    }

    fn next_token(&mut self) -> StreamResult<Option<Token>> {
        let token = match self.peeked.take() {
            Some(token) => Some(token),
            None => self.decode_token()?,
        };
        if let Some(token) = &token {
            self.nesting.apply(token)?;
        }
        Ok(token)
    }

    fn path(&self) -> String {
        self.nesting.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(tokens: &[Token], aliases: bool) -> Vec<u8> {
        let mut writer = BinaryWriter::new().with_aliases(aliases);
        for token in tokens {
            writer.write_token(token.clone()).unwrap();
        }
        writer.finish().unwrap()
    }

    fn decode(bytes: Vec<u8>) -> Vec<Token> {
        let mut reader = BinaryReader::new(bytes);
        let mut out = Vec::new();
        while let Some(token) = reader.next_token().unwrap() {
            out.push(token);
        }
        out
    }

    fn sample() -> Vec<Token> {
        vec![
            Token::StartObject,
            Token::PropertyName(names::NAME.into()),
            Token::String("Orc".into()),
            Token::PropertyName(names::ID.into()),
            Token::Guid(Guid::from_u128(7)),
            Token::PropertyName(names::TYPE.into()),
            Token::TypeId("Enemy".into()),
            Token::PropertyName("hp".into()),
            Token::Int(-12),
            Token::PropertyName("xp".into()),
            Token::UInt(u64::MAX),
            Token::PropertyName("speed".into()),
            Token::Float(1.25),
            Token::PropertyName("tags".into()),
            Token::StartArray,
            Token::Bool(true),
            Token::Bool(false),
            Token::Null,
            Token::EndArray,
            Token::EndObject,
        ]
    }

    #[test]
    fn tokens_roundtrip() {
        assert_eq!(decode(encode(&sample(), true)), sample());
        assert_eq!(decode(encode(&sample(), false)), sample());
    }

    #[test]
    fn aliases_shrink_output() {
        assert!(encode(&sample(), true).len() < encode(&sample(), false).len());
    }

    #[test]
    fn finish_requires_complete_root() {
        let mut writer = BinaryWriter::new();
        writer.write_start_object().unwrap();
        assert!(matches!(writer.finish(), Err(StreamError::Unbalanced { .. })));
        assert!(BinaryWriter::new().finish().is_err());
    }

    #[test]
    fn writer_rejects_bad_grammar() {
        let mut writer = BinaryWriter::new();
        writer.write_start_array().unwrap();
        assert!(writer.write_property_name("x").is_err());
    }

    #[test]
    fn unknown_tag_is_corrupt() {
        let mut reader = BinaryReader::new(vec![0xEE]);
        let err = reader.next_token().unwrap_err();
        assert!(matches!(err, StreamError::Corrupt { offset: 0, .. }));
    }

    #[test]
    fn truncated_payload_is_corrupt() {
        let mut bytes = encode(&[Token::Guid(Guid::from_u128(1))], true);
        bytes.truncate(9);
        let mut reader = BinaryReader::new(bytes);
        assert!(matches!(
            reader.next_token(),
            Err(StreamError::Corrupt { .. })
        ));
    }

    #[test]
    fn peek_does_not_consume() {
        let mut reader = BinaryReader::new(encode(&[Token::Int(3)], true));
        assert_eq!(reader.peek().unwrap(), Some(&Token::Int(3)));
        assert_eq!(reader.read_i64().unwrap(), 3);
        assert_eq!(reader.peek().unwrap(), None);
    }
}
