use arbor_types::Guid;

use crate::error::{StreamError, StreamResult};
use crate::raw::RawValue;
use crate::token::{describe_found, Token};

/// Forward-only token source with one token of lookahead.
///
/// Implementors supply [`peek`], [`next_token`] and [`path`]. Everything
/// else (the `ensure_*` / `read_*` family, property seeking, skipping and
/// raw capture) is provided on top of those three.
///
/// Typed reads coerce between the numeric tokens when the conversion is
/// lossless and parse GUIDs from their string form, so text streams (which
/// carry no GUID token) read back like binary ones.
///
/// [`peek`]: TokenReader::peek
/// [`next_token`]: TokenReader::next_token
/// [`path`]: TokenReader::path
pub trait TokenReader {
    /// Look at the next token without consuming it. `None` at end of stream.
    fn peek(&mut self) -> StreamResult<Option<&Token>>;

    /// Consume the next token. `None` at end of stream.
    fn next_token(&mut self) -> StreamResult<Option<Token>>;

    /// Current stream path, for diagnostics.
    fn path(&self) -> String;

    /// Consume the next token, treating end of stream as an error.
    fn expect_token(&mut self, expected: &str) -> StreamResult<Token> {
        match self.next_token()? {
            Some(token) => Ok(token),
            None => Err(StreamError::UnexpectedEof {
                expected: expected.to_string(),
                path: self.path(),
            }),
        }
    }

    fn unexpected(&self, expected: &str, found: Option<&Token>) -> StreamError {
        StreamError::UnexpectedToken {
            expected: expected.to_string(),
            found: describe_found(found),
            path: self.path(),
        }
    }

    fn invalid(&self, reason: String) -> StreamError {
        StreamError::InvalidValue {
            reason,
            path: self.path(),
        }
    }

    fn ensure_start_object(&mut self) -> StreamResult<()> {
        match self.expect_token("start of object")? {
            Token::StartObject => Ok(()),
            other => Err(self.unexpected("start of object", Some(&other))),
        }
    }

    fn ensure_end_object(&mut self) -> StreamResult<()> {
        match self.expect_token("end of object")? {
            Token::EndObject => Ok(()),
            other => Err(self.unexpected("end of object", Some(&other))),
        }
    }

    fn ensure_start_array(&mut self) -> StreamResult<()> {
        match self.expect_token("start of array")? {
            Token::StartArray => Ok(()),
            other => Err(self.unexpected("start of array", Some(&other))),
        }
    }

    fn ensure_end_array(&mut self) -> StreamResult<()> {
        match self.expect_token("end of array")? {
            Token::EndArray => Ok(()),
            other => Err(self.unexpected("end of array", Some(&other))),
        }
    }

    /// Require that the stream has nothing left.
    fn ensure_end_of_stream(&mut self) -> StreamResult<()> {
        match self.next_token()? {
            None => Ok(()),
            Some(other) => Err(self.unexpected("end of stream", Some(&other))),
        }
    }

    fn read_property_name(&mut self) -> StreamResult<String> {
        match self.expect_token("property name")? {
            Token::PropertyName(name) => Ok(name),
            other => Err(self.unexpected("property name", Some(&other))),
        }
    }

    /// Consume a property name and require it to be `expected`.
    fn ensure_property_name(&mut self, expected: &str) -> StreamResult<()> {
        match self.peek()?.cloned() {
            Some(Token::PropertyName(name)) if name == expected => {
                self.next_token()?;
                Ok(())
            }
            Some(Token::PropertyName(_)) | Some(Token::EndObject) | None => {
                Err(StreamError::MissingProperty {
                    name: expected.to_string(),
                    path: self.path(),
                })
            }
            other => Err(self.unexpected(&format!("property `{expected}`"), other.as_ref())),
        }
    }

    /// Returns `true` if the next token is the property name `name`.
    fn next_property_is(&mut self, name: &str) -> StreamResult<bool> {
        Ok(matches!(self.peek()?, Some(Token::PropertyName(n)) if n == name))
    }

    /// Scan forward inside the current object for property `name`.
    ///
    /// Properties before it are skipped together with their values. On
    /// success the name is consumed and the reader sits on its value; when
    /// the object ends first, returns `false` with the reader on the end
    /// token. Seeking never moves backwards.
    fn seek_property_name(&mut self, name: &str) -> StreamResult<bool> {
        loop {
            let (is_property, matched) = match self.peek()? {
                Some(Token::PropertyName(n)) => (true, n == name),
                _ => (false, false),
            };
            if !is_property {
                return Ok(false);
            }
            self.next_token()?;
            if matched {
                return Ok(true);
            }
            self.skip_value()?;
        }
    }

    /// Consume a `null` if that is the next token.
    fn try_read_null(&mut self) -> StreamResult<bool> {
        if matches!(self.peek()?, Some(Token::Null)) {
            self.next_token()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn at_end_object(&mut self) -> StreamResult<bool> {
        Ok(matches!(self.peek()?, Some(Token::EndObject)))
    }

    fn at_end_array(&mut self) -> StreamResult<bool> {
        Ok(matches!(self.peek()?, Some(Token::EndArray)))
    }

    fn read_bool(&mut self) -> StreamResult<bool> {
        match self.expect_token("bool")? {
            Token::Bool(b) => Ok(b),
            other => Err(self.unexpected("bool", Some(&other))),
        }
    }

    fn read_i64(&mut self) -> StreamResult<i64> {
        match self.expect_token("integer")? {
            Token::Int(v) => Ok(v),
            Token::UInt(v) => {
                i64::try_from(v).map_err(|_| self.invalid(format!("{v} does not fit in i64")))
            }
            Token::Float(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                Ok(f as i64)
            }
            other => Err(self.unexpected("integer", Some(&other))),
        }
    }

    fn read_u64(&mut self) -> StreamResult<u64> {
        match self.expect_token("unsigned integer")? {
            Token::UInt(v) => Ok(v),
            Token::Int(v) => {
                u64::try_from(v).map_err(|_| self.invalid(format!("{v} is negative")))
            }
            Token::Float(f) if f.fract() == 0.0 && f >= 0.0 && f < u64::MAX as f64 => Ok(f as u64),
            other => Err(self.unexpected("unsigned integer", Some(&other))),
        }
    }

    fn read_f64(&mut self) -> StreamResult<f64> {
        match self.expect_token("number")? {
            Token::Float(f) => Ok(f),
            Token::Int(i) => Ok(i as f64),
            Token::UInt(u) => Ok(u as f64),
            other => Err(self.unexpected("number", Some(&other))),
        }
    }

    fn read_string(&mut self) -> StreamResult<String> {
        match self.expect_token("string")? {
            Token::String(s) => Ok(s),
            other => Err(self.unexpected("string", Some(&other))),
        }
    }

    fn read_guid(&mut self) -> StreamResult<Guid> {
        match self.expect_token("guid")? {
            Token::Guid(g) => Ok(g),
            Token::String(s) => Guid::parse(&s).map_err(|e| self.invalid(e.to_string())),
            other => Err(self.unexpected("guid", Some(&other))),
        }
    }

    /// Read a type identifier; text streams carry it as a plain string.
    fn read_type_id(&mut self) -> StreamResult<String> {
        match self.expect_token("type id")? {
            Token::TypeId(s) | Token::String(s) => Ok(s),
            other => Err(self.unexpected("type id", Some(&other))),
        }
    }

    /// Skip one complete value (scalar or container).
    fn skip_value(&mut self) -> StreamResult<()> {
        let mut depth = 0usize;
        loop {
            match self.expect_token("value")? {
                Token::StartObject | Token::StartArray => depth += 1,
                Token::EndObject | Token::EndArray if depth > 0 => depth -= 1,
                Token::PropertyName(_) if depth > 0 => continue,
                token @ (Token::EndObject | Token::EndArray | Token::PropertyName(_)) => {
                    return Err(self.unexpected("value", Some(&token)));
                }
                _ => {}
            }
            if depth == 0 {
                return Ok(());
            }
        }
    }

    /// Consume one complete value and return its tokens verbatim.
    fn capture_value(&mut self) -> StreamResult<RawValue> {
        let mut tokens = Vec::new();
        let mut depth = 0usize;
        loop {
            let token = self.expect_token("value")?;
            match &token {
                Token::StartObject | Token::StartArray => depth += 1,
                Token::EndObject | Token::EndArray if depth > 0 => depth -= 1,
                Token::PropertyName(_) if depth > 0 => {}
                Token::EndObject | Token::EndArray | Token::PropertyName(_) => {
                    return Err(self.unexpected("value", Some(&token)));
                }
                _ => {}
            }
            tokens.push(token);
            if depth == 0 {
                return Ok(RawValue::from_tokens_unchecked(tokens));
            }
        }
    }
}
