use std::iter::Peekable;
use std::vec::IntoIter;

use crate::error::StreamResult;
use crate::names;
use crate::nesting::Nesting;
use crate::reader::TokenReader;
use crate::token::Token;
use crate::writer::TokenWriter;

/// A reader over an in-memory token sequence.
///
/// Backs the text backend (which parses a whole document up front) and
/// replays of captured [`RawValue`]s.
#[derive(Debug)]
pub struct TokenCursor {
    tokens: Peekable<IntoIter<Token>>,
    nesting: Nesting,
}

impl TokenCursor {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into_iter().peekable(),
            nesting: Nesting::new(),
        }
    }

    /// Tokens not yet consumed.
    pub fn remaining(&self) -> usize {
        self.tokens.len()
    }
}

impl TokenReader for TokenCursor {
    fn peek(&mut self) -> StreamResult<Option<&Token>> {
        Ok(self.tokens.peek())
    }

    fn next_token(&mut self) -> StreamResult<Option<Token>> {
        match self.tokens.next() {
            Some(token) => {
                self.nesting.apply(&token)?;
                Ok(Some(token))
            }
            None => Ok(None),
        }
    }

    fn path(&self) -> String {
        self.nesting.path()
    }
}

/// One complete value captured verbatim from a stream.
///
/// Used to carry data the reader does not understand (for example a
/// component whose type is not registered) so it can be written back out
/// unchanged on the next save.
#[derive(Clone, Debug, PartialEq)]
pub struct RawValue {
    tokens: Vec<Token>,
}

impl RawValue {
    /// Wrap a token sequence, checking that it forms exactly one value.
    pub fn new(tokens: Vec<Token>) -> StreamResult<Self> {
        let mut nesting = Nesting::new();
        for token in &tokens {
            nesting.apply(token)?;
        }
        if !nesting.is_complete() {
            return Err(nesting.incomplete_error());
        }
        Ok(Self { tokens })
    }

    pub(crate) fn from_tokens_unchecked(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// A fresh reader positioned at the start of the value.
    pub fn reader(&self) -> TokenCursor {
        TokenCursor::new(self.tokens.clone())
    }

    /// Write the captured tokens to `writer` unchanged.
    pub fn replay(&self, writer: &mut dyn TokenWriter) -> StreamResult<()> {
        for token in &self.tokens {
            writer.write_token(token.clone())?;
        }
        Ok(())
    }

    /// The `.type` tag, when the value is an object that opens with one.
    pub fn type_tag(&self) -> Option<&str> {
        match self.tokens.as_slice() {
            [Token::StartObject, Token::PropertyName(name), Token::String(tag) | Token::TypeId(tag), ..]
                if name == names::TYPE =>
            {
                Some(tag.as_str())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(tag: &str) -> Vec<Token> {
        vec![
            Token::StartObject,
            Token::PropertyName(names::TYPE.into()),
            Token::TypeId(tag.into()),
            Token::PropertyName("speed".into()),
            Token::Float(2.5),
            Token::EndObject,
        ]
    }

    #[test]
    fn new_rejects_partial_values() {
        assert!(RawValue::new(vec![Token::StartObject]).is_err());
        assert!(RawValue::new(vec![Token::Null, Token::Null]).is_err());
        assert!(RawValue::new(vec![]).is_err());
    }

    #[test]
    fn type_tag_detection() {
        let raw = RawValue::new(tagged("Mover")).unwrap();
        assert_eq!(raw.type_tag(), Some("Mover"));

        let untagged = RawValue::new(vec![Token::StartObject, Token::EndObject]).unwrap();
        assert_eq!(untagged.type_tag(), None);
    }

    #[test]
    fn reader_replays_tokens() {
        let raw = RawValue::new(tagged("Mover")).unwrap();
        let mut cursor = raw.reader();
        cursor.ensure_start_object().unwrap();
        assert!(cursor.seek_property_name("speed").unwrap());
        assert_eq!(cursor.read_f64().unwrap(), 2.5);
        cursor.ensure_end_object().unwrap();
        cursor.ensure_end_of_stream().unwrap();
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn cursor_validates_grammar() {
        let mut cursor = TokenCursor::new(vec![Token::StartObject, Token::Int(1)]);
        cursor.ensure_start_object().unwrap();
        assert!(cursor.next_token().is_err());
    }
}
