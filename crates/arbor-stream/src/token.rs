use arbor_types::Guid;

/// One element of the shared token vocabulary.
///
/// Both backends encode exactly this set. Structure tokens bracket objects
/// and arrays; a `PropertyName` must be followed by exactly one value.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    StartObject,
    EndObject,
    StartArray,
    EndArray,
    PropertyName(String),
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Guid(Guid),
    /// A type identifier (the persisted name of a host type).
    TypeId(String),
}

impl Token {
    /// Returns `true` for tokens that are a complete value on their own.
    pub fn is_scalar(&self) -> bool {
        !matches!(
            self,
            Self::StartObject
                | Self::EndObject
                | Self::StartArray
                | Self::EndArray
                | Self::PropertyName(_)
        )
    }

    /// Human-readable description for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Self::StartObject => "start of object".into(),
            Self::EndObject => "end of object".into(),
            Self::StartArray => "start of array".into(),
            Self::EndArray => "end of array".into(),
            Self::PropertyName(name) => format!("property `{name}`"),
            Self::Null => "null".into(),
            Self::Bool(b) => format!("bool {b}"),
            Self::Int(i) => format!("int {i}"),
            Self::UInt(u) => format!("uint {u}"),
            Self::Float(f) => format!("float {f}"),
            Self::String(s) => format!("string {s:?}"),
            Self::Guid(g) => format!("guid {g}"),
            Self::TypeId(t) => format!("type id `{t}`"),
        }
    }
}

/// Describe an optional token (`None` meaning end of stream).
pub fn describe_found(token: Option<&Token>) -> String {
    token.map_or_else(|| "end of stream".to_string(), Token::describe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_classification() {
        assert!(Token::Null.is_scalar());
        assert!(Token::Guid(Guid::nil()).is_scalar());
        assert!(!Token::StartObject.is_scalar());
        assert!(!Token::PropertyName("x".into()).is_scalar());
    }

    #[test]
    fn describe_tokens() {
        assert_eq!(Token::PropertyName(".id".into()).describe(), "property `.id`");
        assert_eq!(describe_found(None), "end of stream");
        assert_eq!(describe_found(Some(&Token::EndArray)), "end of array");
    }
}
