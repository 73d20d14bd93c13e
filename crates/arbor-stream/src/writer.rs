use arbor_types::Guid;

use crate::error::StreamResult;
use crate::token::Token;

/// Append-only token sink.
///
/// Implementations validate grammar as tokens arrive, so a writer can never
/// produce a stream its matching reader rejects. Only [`write_token`] and
/// [`path`] need implementing; the typed helpers forward to them.
///
/// [`write_token`]: TokenWriter::write_token
/// [`path`]: TokenWriter::path
pub trait TokenWriter {
    fn write_token(&mut self, token: Token) -> StreamResult<()>;

    /// Current stream path, for diagnostics.
    fn path(&self) -> String;

    fn write_start_object(&mut self) -> StreamResult<()> {
        self.write_token(Token::StartObject)
    }

    fn write_end_object(&mut self) -> StreamResult<()> {
        self.write_token(Token::EndObject)
    }

    fn write_start_array(&mut self) -> StreamResult<()> {
        self.write_token(Token::StartArray)
    }

    fn write_end_array(&mut self) -> StreamResult<()> {
        self.write_token(Token::EndArray)
    }

    fn write_property_name(&mut self, name: &str) -> StreamResult<()> {
        self.write_token(Token::PropertyName(name.to_string()))
    }

    fn write_null(&mut self) -> StreamResult<()> {
        self.write_token(Token::Null)
    }

    fn write_bool(&mut self, value: bool) -> StreamResult<()> {
        self.write_token(Token::Bool(value))
    }

    fn write_i64(&mut self, value: i64) -> StreamResult<()> {
        self.write_token(Token::Int(value))
    }

    fn write_u64(&mut self, value: u64) -> StreamResult<()> {
        self.write_token(Token::UInt(value))
    }

    fn write_f64(&mut self, value: f64) -> StreamResult<()> {
        self.write_token(Token::Float(value))
    }

    fn write_str(&mut self, value: &str) -> StreamResult<()> {
        self.write_token(Token::String(value.to_string()))
    }

    fn write_guid(&mut self, value: Guid) -> StreamResult<()> {
        self.write_token(Token::Guid(value))
    }

    fn write_type_id(&mut self, value: &str) -> StreamResult<()> {
        self.write_token(Token::TypeId(value.to_string()))
    }

    /// Write `name` followed by a single scalar or structural token.
    fn write_property(&mut self, name: &str, value: Token) -> StreamResult<()> {
        self.write_property_name(name)?;
        self.write_token(value)
    }
}
