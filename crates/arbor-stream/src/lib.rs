//! Token stream for Arbor.
//!
//! A structure-only cursor over a small token vocabulary (objects, arrays,
//! property names and scalars) with two interchangeable backends:
//!
//! - **Binary**: tag-byte encoding with LEB128 varints and one-byte aliases
//!   for reserved property names
//! - **Text**: JSON via `serde_json`, preserving property order
//!
//! Higher layers only talk to [`TokenWriter`] and [`TokenReader`], so the
//! object graph and folder tree code never knows which backend is in use.
//! Both sides validate grammar as they go and report failures with the
//! stream path (`$.folders[0].objs[2].health`).

pub mod binary;
pub mod error;
pub mod names;
pub mod nesting;
pub mod raw;
pub mod reader;
pub mod text;
pub mod token;
mod varint;
pub mod writer;

pub use binary::{BinaryReader, BinaryWriter};
pub use error::{StreamError, StreamResult};
pub use nesting::Nesting;
pub use raw::{RawValue, TokenCursor};
pub use reader::TokenReader;
pub use text::{TextReader, TextWriter};
pub use token::Token;
pub use writer::TokenWriter;

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_types::Guid;
    use proptest::prelude::*;

    /// `{ ".name": "root", "a": 1, "nested": { "skip": [1, [2]], "b": true }, "c": "x" }`
    fn write_doc(w: &mut dyn TokenWriter) {
        w.write_start_object().unwrap();
        w.write_property(names::NAME, Token::String("root".into()))
            .unwrap();
        w.write_property("a", Token::Int(1)).unwrap();
        w.write_property_name("nested").unwrap();
        w.write_start_object().unwrap();
        w.write_property_name("skip").unwrap();
        w.write_start_array().unwrap();
        w.write_i64(1).unwrap();
        w.write_start_array().unwrap();
        w.write_i64(2).unwrap();
        w.write_end_array().unwrap();
        w.write_end_array().unwrap();
        w.write_property("b", Token::Bool(true)).unwrap();
        w.write_end_object().unwrap();
        w.write_property("c", Token::String("x".into())).unwrap();
        w.write_end_object().unwrap();
    }

    fn binary_doc() -> BinaryReader {
        let mut w = BinaryWriter::new();
        write_doc(&mut w);
        BinaryReader::new(w.finish().unwrap())
    }

    fn text_doc() -> TextReader {
        let mut w = TextWriter::new();
        write_doc(&mut w);
        TextReader::parse(&w.finish().unwrap()).unwrap()
    }

    fn check_seek(r: &mut dyn TokenReader) {
        r.ensure_start_object().unwrap();
        assert!(r.seek_property_name("nested").unwrap());
        r.ensure_start_object().unwrap();
        assert!(r.seek_property_name("b").unwrap());
        assert!(r.read_bool().unwrap());
        // Not present in the inner object: stops on the end token.
        assert!(!r.seek_property_name("zzz").unwrap());
        r.ensure_end_object().unwrap();
        assert!(r.next_property_is("c").unwrap());
        // Seeking never rewinds to properties already passed.
        assert!(!r.seek_property_name("a").unwrap());
        assert!(r.at_end_object().unwrap());
        r.ensure_end_object().unwrap();
        r.ensure_end_of_stream().unwrap();
    }

    #[test]
    fn seek_skips_nested_values_on_both_backends() {
        check_seek(&mut binary_doc());
        check_seek(&mut text_doc());
    }

    #[test]
    fn text_floats_parse_exactly() {
        let values = [-930978799.2994809, 0.1 + 0.2, f64::MIN_POSITIVE, 1e300];
        let mut w = TextWriter::new();
        w.write_start_array().unwrap();
        for value in values {
            w.write_f64(value).unwrap();
        }
        w.write_end_array().unwrap();
        let mut r = TextReader::parse(&w.finish().unwrap()).unwrap();
        r.ensure_start_array().unwrap();
        for value in values {
            assert_eq!(r.read_f64().unwrap().to_bits(), value.to_bits(), "{value}");
        }
        r.ensure_end_array().unwrap();
    }

    #[test]
    fn ensure_property_reports_missing() {
        let mut r = text_doc();
        r.ensure_start_object().unwrap();
        let err = r.ensure_property_name(".id").unwrap_err();
        assert!(matches!(err, StreamError::MissingProperty { .. }));
    }

    #[test]
    fn capture_and_replay_between_backends() {
        let mut r = binary_doc();
        let raw = r.capture_value().unwrap();
        r.ensure_end_of_stream().unwrap();

        let mut w = TextWriter::new().with_pretty(false);
        raw.replay(&mut w).unwrap();
        let text = w.finish().unwrap();
        assert!(text.starts_with(r#"{".name":"root","a":1"#));
    }

    #[test]
    fn skip_value_rejects_structural_tokens() {
        let mut r = text_doc();
        r.ensure_start_object().unwrap();
        // Sitting on a property name, not a value.
        assert!(r.skip_value().is_err());
    }

    #[test]
    fn typed_read_mismatch_carries_path() {
        let mut r = text_doc();
        r.ensure_start_object().unwrap();
        r.ensure_property_name(names::NAME).unwrap();
        let err = r.read_i64().unwrap_err();
        assert_eq!(err.path(), Some("$.name"));
    }

    #[derive(Clone, Debug)]
    enum Tree {
        Null,
        Bool(bool),
        Int(i64),
        Float(f64),
        Str(String),
        Guid(u128),
        List(Vec<Tree>),
        Map(Vec<(String, Tree)>),
    }

    fn tree() -> impl Strategy<Value = Tree> {
        let leaf = prop_oneof![
            Just(Tree::Null),
            any::<bool>().prop_map(Tree::Bool),
            any::<i64>().prop_map(Tree::Int),
            (-1.0e9f64..1.0e9).prop_map(Tree::Float),
            "[a-z]{0,8}".prop_map(Tree::Str),
            any::<u128>().prop_map(Tree::Guid),
        ];
        leaf.prop_recursive(4, 32, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Tree::List),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|m| Tree::Map(m.into_iter().collect())),
            ]
        })
    }

    fn emit(tree: &Tree, w: &mut dyn TokenWriter) {
        match tree {
            Tree::Null => w.write_null().unwrap(),
            Tree::Bool(b) => w.write_bool(*b).unwrap(),
            Tree::Int(i) => w.write_i64(*i).unwrap(),
            Tree::Float(f) => w.write_f64(*f).unwrap(),
            Tree::Str(s) => w.write_str(s).unwrap(),
            Tree::Guid(g) => w.write_guid(Guid::from_u128(*g)).unwrap(),
            Tree::List(items) => {
                w.write_start_array().unwrap();
                for item in items {
                    emit(item, w);
                }
                w.write_end_array().unwrap();
            }
            Tree::Map(entries) => {
                w.write_start_object().unwrap();
                for (k, v) in entries {
                    w.write_property_name(k).unwrap();
                    emit(v, w);
                }
                w.write_end_object().unwrap();
            }
        }
    }

    /// Read `tree` back with typed reads, checking every value.
    fn check(tree: &Tree, r: &mut dyn TokenReader) {
        match tree {
            Tree::Null => assert!(r.try_read_null().unwrap()),
            Tree::Bool(b) => assert_eq!(r.read_bool().unwrap(), *b),
            Tree::Int(i) => assert_eq!(r.read_i64().unwrap(), *i),
            Tree::Float(f) => assert_eq!(r.read_f64().unwrap(), *f),
            Tree::Str(s) => assert_eq!(&r.read_string().unwrap(), s),
            Tree::Guid(g) => assert_eq!(r.read_guid().unwrap(), Guid::from_u128(*g)),
            Tree::List(items) => {
                r.ensure_start_array().unwrap();
                for item in items {
                    check(item, r);
                }
                r.ensure_end_array().unwrap();
            }
            Tree::Map(entries) => {
                r.ensure_start_object().unwrap();
                for (k, v) in entries {
                    r.ensure_property_name(k).unwrap();
                    check(v, r);
                }
                r.ensure_end_object().unwrap();
            }
        }
    }

    proptest! {
        #[test]
        fn binary_roundtrip(t in tree()) {
            let mut w = BinaryWriter::new();
            emit(&t, &mut w);
            let mut r = BinaryReader::new(w.finish().unwrap());
            check(&t, &mut r);
            r.ensure_end_of_stream().unwrap();
        }

        #[test]
        fn text_roundtrip(t in tree()) {
            let mut w = TextWriter::new();
            emit(&t, &mut w);
            let mut r = TextReader::parse(&w.finish().unwrap()).unwrap();
            check(&t, &mut r);
            r.ensure_end_of_stream().unwrap();
        }
    }
}
