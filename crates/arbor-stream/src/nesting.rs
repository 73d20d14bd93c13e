//! Grammar and position tracking shared by every writer and reader.
//!
//! [`Nesting`] consumes tokens one at a time and rejects any sequence that
//! is not a single well-formed value: property names only directly inside
//! objects, exactly one value per property, balanced containers, nothing
//! after the root. It also renders the current position as a path such as
//! `$.folders[0].objs[2].health`.

use std::fmt::Write as _;

use crate::error::{StreamError, StreamResult};
use crate::token::Token;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FrameKind {
    Object,
    Array,
}

#[derive(Clone, Debug)]
struct Frame {
    kind: FrameKind,
    /// Most recent property name (objects only).
    key: Option<String>,
    /// A property name was read and its value has not started yet.
    awaiting_value: bool,
    /// Elements started so far (arrays only).
    len: usize,
}

#[derive(Clone, Debug, Default)]
pub struct Nesting {
    frames: Vec<Frame>,
    root_done: bool,
}

impl Nesting {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open containers.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Returns `true` once exactly one complete root value has been seen.
    pub fn is_complete(&self) -> bool {
        self.frames.is_empty() && self.root_done
    }

    /// Validate `token` against the current position and advance.
    pub fn apply(&mut self, token: &Token) -> StreamResult<()> {
        match token {
            Token::StartObject | Token::StartArray => {
                self.begin_value(token)?;
                let kind = if matches!(token, Token::StartObject) {
                    FrameKind::Object
                } else {
                    FrameKind::Array
                };
                self.frames.push(Frame {
                    kind,
                    key: None,
                    awaiting_value: false,
                    len: 0,
                });
            }
            Token::EndObject => self.end(FrameKind::Object, token)?,
            Token::EndArray => self.end(FrameKind::Array, token)?,
            Token::PropertyName(name) => {
                let accepts = matches!(
                    self.frames.last(),
                    Some(f) if f.kind == FrameKind::Object && !f.awaiting_value
                );
                if !accepts {
                    return Err(self.unexpected("a value", token));
                }
                if let Some(frame) = self.frames.last_mut() {
                    frame.key = Some(name.clone());
                    frame.awaiting_value = true;
                }
            }
            _ => {
                self.begin_value(token)?;
                if self.frames.is_empty() {
                    self.root_done = true;
                }
            }
        }
        Ok(())
    }

    /// Current position, e.g. `$.folders[0].objs[2]`.
    pub fn path(&self) -> String {
        let mut out = String::from("$");
        for frame in &self.frames {
            match frame.kind {
                FrameKind::Object => {
                    if let Some(key) = &frame.key {
                        if !key.starts_with('.') {
                            out.push('.');
                        }
                        out.push_str(key);
                    }
                }
                FrameKind::Array => {
                    if frame.len > 0 {
                        let _ = write!(out, "[{}]", frame.len - 1);
                    }
                }
            }
        }
        out
    }

    /// Error for a writer or reader that stopped before the root closed.
    pub fn incomplete_error(&self) -> StreamError {
        let reason = if self.frames.is_empty() {
            "stream has no root value".to_string()
        } else {
            format!("{} container(s) left open", self.frames.len())
        };
        StreamError::Unbalanced {
            reason,
            path: self.path(),
        }
    }

    fn begin_value(&mut self, token: &Token) -> StreamResult<()> {
        let Some(frame) = self.frames.last() else {
            if self.root_done {
                return Err(StreamError::Unbalanced {
                    reason: format!("{} after the root value", token.describe()),
                    path: self.path(),
                });
            }
            return Ok(());
        };
        if frame.kind == FrameKind::Object && !frame.awaiting_value {
            return Err(self.unexpected("a property name", token));
        }
        if let Some(frame) = self.frames.last_mut() {
            match frame.kind {
                FrameKind::Object => frame.awaiting_value = false,
                FrameKind::Array => frame.len += 1,
            }
        }
        Ok(())
    }

    fn end(&mut self, kind: FrameKind, token: &Token) -> StreamResult<()> {
        match self.frames.last() {
            Some(frame) if frame.kind == kind && !frame.awaiting_value => {
                self.frames.pop();
                if self.frames.is_empty() {
                    self.root_done = true;
                }
                Ok(())
            }
            Some(frame) if frame.kind == kind => Err(StreamError::Unbalanced {
                reason: format!(
                    "property `{}` has no value",
                    frame.key.as_deref().unwrap_or_default()
                ),
                path: self.path(),
            }),
            _ => Err(StreamError::Unbalanced {
                reason: format!("{} without a matching start", token.describe()),
                path: self.path(),
            }),
        }
    }

    fn unexpected(&self, expected: &str, token: &Token) -> StreamError {
        StreamError::UnexpectedToken {
            expected: expected.to_string(),
            found: token.describe(),
            path: self.path(),
        }
    }
}
