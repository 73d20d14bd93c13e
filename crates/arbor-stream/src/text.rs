//! JSON text backend.
//!
//! The writer builds a `serde_json::Value` tree as tokens arrive and
//! renders it on [`TextWriter::finish`]; the reader parses the whole
//! document and replays it as a flat token sequence. GUIDs and type ids
//! become plain strings; typed reads on the reader side turn them back.

use serde_json::{Map, Number, Value as JsonValue};

use crate::error::{StreamError, StreamResult};
use crate::nesting::Nesting;
use crate::raw::TokenCursor;
use crate::reader::TokenReader;
use crate::token::Token;
use crate::writer::TokenWriter;

#[derive(Debug)]
enum Building {
    Object {
        map: Map<String, JsonValue>,
        key: Option<String>,
    },
    Array(Vec<JsonValue>),
}

/// Writes tokens as a JSON document.
#[derive(Debug)]
pub struct TextWriter {
    stack: Vec<Building>,
    root: Option<JsonValue>,
    nesting: Nesting,
    pretty: bool,
}

impl TextWriter {
    /// A writer producing indented output.
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            root: None,
            nesting: Nesting::new(),
            pretty: true,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Render the document. Fails unless exactly one root value was written.
    pub fn finish(self) -> StreamResult<String> {
        let root = match self.root {
            Some(root) if self.nesting.is_complete() => root,
            _ => return Err(self.nesting.incomplete_error()),
        };
        let text = if self.pretty {
            serde_json::to_string_pretty(&root)?
        } else {
            serde_json::to_string(&root)?
        };
        Ok(text)
    }

    /// The finished document as a JSON value.
    pub fn into_json(self) -> StreamResult<JsonValue> {
        match self.root {
            Some(root) if self.nesting.is_complete() => Ok(root),
            _ => Err(self.nesting.incomplete_error()),
        }
    }

    fn push_value(&mut self, value: JsonValue) {
        match self.stack.last_mut() {
            None => self.root = Some(value),
            Some(Building::Array(items)) => items.push(value),
            Some(Building::Object { map, key }) => {
                if let Some(key) = key.take() {
                    map.insert(key, value);
                }
            }
        }
    }
}

impl Default for TextWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenWriter for TextWriter {
    fn write_token(&mut self, token: Token) -> StreamResult<()> {
        if let Token::Float(f) = token {
            if !f.is_finite() {
                return Err(StreamError::InvalidValue {
                    reason: format!("{f} cannot be written as text"),
                    path: self.nesting.path(),
                });
            }
        }
        self.nesting.apply(&token)?;
        match token {
            Token::StartObject => self.stack.push(Building::Object {
                map: Map::new(),
                key: None,
            }),
            Token::StartArray => self.stack.push(Building::Array(Vec::new())),
            Token::EndObject | Token::EndArray => {
                let value = match self.stack.pop() {
                    Some(Building::Object { map, .. }) => JsonValue::Object(map),
                    Some(Building::Array(items)) => JsonValue::Array(items),
                    None => JsonValue::Null,
                };
                self.push_value(value);
            }
            Token::PropertyName(name) => {
                if let Some(Building::Object { key, .. }) = self.stack.last_mut() {
                    *key = Some(name);
                }
            }
            Token::Null => self.push_value(JsonValue::Null),
            Token::Bool(b) => self.push_value(JsonValue::Bool(b)),
            Token::Int(i) => self.push_value(JsonValue::from(i)),
            Token::UInt(u) => self.push_value(JsonValue::from(u)),
            Token::Float(f) => {
                let number = Number::from_f64(f).map_or(JsonValue::Null, JsonValue::Number);
                self.push_value(number);
            }
            Token::String(s) | Token::TypeId(s) => self.push_value(JsonValue::String(s)),
            Token::Guid(g) => self.push_value(JsonValue::String(g.to_string())),
        }
        Ok(())
    }

    fn path(&self) -> String {
        self.nesting.path()
    }
}

/// Reads tokens from a JSON document.
#[derive(Debug)]
pub struct TextReader {
    cursor: TokenCursor,
}

impl TextReader {
    pub fn parse(text: &str) -> StreamResult<Self> {
        let json: JsonValue = serde_json::from_str(text)?;
        Ok(Self::from_json(json))
    }

    pub fn from_slice(bytes: &[u8]) -> StreamResult<Self> {
        let json: JsonValue = serde_json::from_slice(bytes)?;
        Ok(Self::from_json(json))
    }

    pub fn from_json(json: JsonValue) -> Self {
        let mut tokens = Vec::new();
        flatten(json, &mut tokens);
        Self {
            cursor: TokenCursor::new(tokens),
        }
    }
}

fn flatten(value: JsonValue, out: &mut Vec<Token>) {
    match value {
        JsonValue::Null => out.push(Token::Null),
        JsonValue::Bool(b) => out.push(Token::Bool(b)),
        JsonValue::Number(n) => out.push(number_token(&n)),
        JsonValue::String(s) => out.push(Token::String(s)),
        JsonValue::Array(items) => {
            out.push(Token::StartArray);
            for item in items {
                flatten(item, out);
            }
            out.push(Token::EndArray);
        }
        JsonValue::Object(map) => {
            out.push(Token::StartObject);
            for (key, item) in map {
                out.push(Token::PropertyName(key));
                flatten(item, out);
            }
            out.push(Token::EndObject);
        }
    }
}

fn number_token(n: &Number) -> Token {
    if let Some(i) = n.as_i64() {
        Token::Int(i)
    } else if let Some(u) = n.as_u64() {
        Token::UInt(u)
    } else {
        n.as_f64().map_or(Token::Null, Token::Float)
    }
}

impl TokenReader for TextReader {
    fn peek(&mut self) -> StreamResult<Option<&Token>> {
        self.cursor.peek()
    }

    fn next_token(&mut self) -> StreamResult<Option<Token>> {
        self.cursor.next_token()
    }

    fn path(&self) -> String {
        self.cursor.path()
    }
}
