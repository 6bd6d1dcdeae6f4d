// Text node kinds: String and Regexp
//
// Both coerce the incoming value to text. A configured encoding turns the
// text into bytes of that encoding before it is stored.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use regex::Regex;

use crate::internal::error::{Error, Result};
use crate::schema::node::{Context, ConvertResult, NodeConfig, NodeKind};
use crate::value::{Slot, Value};

/// Text encodings a String node can store its value in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Ascii,
    Latin1,
}

impl TextEncoding {
    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Ascii => "ascii",
            TextEncoding::Latin1 => "latin-1",
        }
    }

    /// Encodes `text`, failing on characters the encoding cannot represent.
    pub fn encode(&self, text: &str) -> std::result::Result<Bytes, String> {
        match self {
            TextEncoding::Utf8 => Ok(Bytes::copy_from_slice(text.as_bytes())),
            TextEncoding::Ascii | TextEncoding::Latin1 => {
                let limit = if *self == TextEncoding::Ascii { 0x7f } else { 0xff };
                let mut out = Vec::with_capacity(text.len());
                for (position, c) in text.chars().enumerate() {
                    let code = u32::from(c);
                    if code > limit {
                        return Err(format!(
                            "'{}' codec can't encode character {:?} in position {}",
                            self.label(),
                            c,
                            position
                        ));
                    }
                    out.push(code as u8);
                }
                Ok(Bytes::from(out))
            }
        }
    }

    /// Decodes `raw`, failing on bytes that are not valid in the encoding.
    pub fn decode(&self, raw: &[u8]) -> std::result::Result<String, String> {
        match self {
            TextEncoding::Utf8 => std::str::from_utf8(raw)
                .map(str::to_string)
                .map_err(|err| format!("'utf-8' codec can't decode bytes: {}", err)),
            TextEncoding::Ascii => match raw.iter().position(|b| !b.is_ascii()) {
                Some(position) => Err(format!(
                    "'ascii' codec can't decode byte {:#04x} in position {}",
                    raw[position], position
                )),
                None => Ok(raw.iter().map(|&b| char::from(b)).collect()),
            },
            TextEncoding::Latin1 => Ok(raw.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TextEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "ascii" | "us-ascii" => Ok(TextEncoding::Ascii),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(TextEncoding::Latin1),
            _ => Err(Error::SchemaError(format!("Unknown text encoding: {}", s))),
        }
    }
}

/// String node: coerces scalars to text.
#[derive(Debug, Clone, Default)]
pub struct StringNode {
    encoding: Option<TextEncoding>,
    max_length: Option<usize>,
}

impl StringNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the text as bytes in `encoding`.
    pub fn encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Maximum length in characters.
    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Coerces a present value to text on behalf of `kind`.
    fn to_text(&self, node: &NodeConfig, kind: &str, value: Value) -> ConvertResult<String> {
        let text = match value {
            Value::String(s) => s,
            Value::Bytes(raw) => self
                .encoding
                .unwrap_or(TextEncoding::Utf8)
                .decode(&raw)
                .map_err(|reason| {
                    node.invalid(kind, format!("Value cannot be serialized: {}", reason))
                })?,
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format!("{:?}", f),
            Value::Bool(b) => b.to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            other => {
                return Err(node.invalid(
                    kind,
                    format!("Value of type {} cannot be serialized as text", other.type_name()),
                ))
            }
        };

        if let Some(max_length) = self.max_length {
            let length = text.chars().count();
            if length > max_length {
                return Err(node.invalid(
                    kind,
                    format!("string length {} is greater than maximum {}", length, max_length),
                ));
            }
        }
        Ok(text)
    }

    /// Turns checked text into its stored form.
    fn store(&self, node: &NodeConfig, kind: &str, text: String) -> ConvertResult<Value> {
        match self.encoding {
            None => Ok(Value::String(text)),
            Some(encoding) => encoding.encode(&text).map(Value::Bytes).map_err(|reason| {
                node.invalid(kind, format!("Value '{}' cannot be serialized: {}", text, reason))
            }),
        }
    }
}

impl NodeKind for StringNode {
    fn type_name(&self) -> &'static str {
        "String"
    }

    fn do_serialize(&self, node: &NodeConfig, value: Slot, _: &Slot, _: &Context) -> ConvertResult<Slot> {
        match value {
            Slot::Absent if node.is_required() => {
                Err(node.invalid(self.type_name(), "required data missing"))
            }
            Slot::Absent => Ok(Slot::Absent),
            Slot::Present(Value::Null) => Ok(Slot::Present(Value::Null)),
            Slot::Present(value) => {
                let text = self.to_text(node, self.type_name(), value)?;
                self.store(node, self.type_name(), text).map(Slot::Present)
            }
        }
    }
}

/// String node whose text must match a pattern.
///
/// The whole text has to match, starting at its first character.
#[derive(Debug, Clone)]
pub struct RegexpNode {
    text: StringNode,
    source: String,
    pattern: Regex,
}

impl RegexpNode {
    /// Compiles `pattern`; an invalid pattern is a schema error.
    pub fn new(pattern: &str) -> Result<Self> {
        let anchored = Regex::new(&format!("^(?:{})$", pattern)).map_err(|err| {
            Error::SchemaError(format!("Invalid pattern '{}': {}", pattern, err))
        })?;
        Ok(Self {
            text: StringNode::new(),
            source: pattern.to_string(),
            pattern: anchored,
        })
    }

    pub fn encoding(mut self, encoding: TextEncoding) -> Self {
        self.text = self.text.encoding(encoding);
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.text = self.text.max_length(max_length);
        self
    }

    /// The pattern as it was configured.
    pub fn pattern(&self) -> &str {
        &self.source
    }
}

impl NodeKind for RegexpNode {
    fn type_name(&self) -> &'static str {
        "Regexp"
    }

    fn do_serialize(&self, node: &NodeConfig, value: Slot, _: &Slot, _: &Context) -> ConvertResult<Slot> {
        match value {
            Slot::Absent if node.is_required() => {
                Err(node.invalid(self.type_name(), "required data missing"))
            }
            Slot::Absent => Ok(Slot::Absent),
            Slot::Present(Value::Null) => Ok(Slot::Present(Value::Null)),
            Slot::Present(value) => {
                let text = self.text.to_text(node, self.type_name(), value)?;
                if !self.pattern.is_match(&text) {
                    return Err(node.invalid(
                        self.type_name(),
                        format!("'{}' does not match pattern '{}'", text, self.source),
                    ));
                }
                self.text.store(node, self.type_name(), text).map(Slot::Present)
            }
        }
    }
}

impl_into_node!(StringNode, RegexpNode);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::node::{IntoNode, Node};
    use chrono::NaiveDate;
    use rstest::rstest;

    fn present(value: impl Into<Value>) -> Slot {
        Slot::Present(value.into())
    }

    #[test]
    fn test_basic_string_serialize_ok() {
        let node = Node::from(StringNode::new());
        assert_eq!(node.serialize(Value::from("foobar")).unwrap(), present("foobar"));
    }

    #[test]
    fn test_not_required_and_missing_stays_absent() {
        let node = Node::from(StringNode::new());
        assert_eq!(node.serialize(Slot::Absent).unwrap(), Slot::Absent);
    }

    #[test]
    fn test_required_and_missing() {
        let node = StringNode::new().required();
        let err = node.serialize(Slot::Absent).unwrap_err();
        assert_eq!(err.node(), "String");
    }

    #[test]
    fn test_default_and_missing() {
        let node = StringNode::new().required().default_value("foobar");
        assert_eq!(node.serialize(Slot::Absent).unwrap(), present("foobar"));
    }

    #[rstest]
    #[case(Value::Int(42), "42")]
    #[case(Value::Float(2.5), "2.5")]
    #[case(Value::Float(2.0), "2.0")]
    #[case(Value::Bool(true), "true")]
    #[case(Value::Date(NaiveDate::from_ymd_opt(2012, 3, 17).unwrap()), "2012-03-17")]
    #[case(Value::Bytes(Bytes::from_static(b"raw")), "raw")]
    fn test_scalars_coerce_to_text(#[case] input: Value, #[case] expected: &str) {
        let node = Node::from(StringNode::new());
        assert_eq!(node.serialize(input).unwrap(), present(expected));
    }

    #[test]
    fn test_containers_are_rejected() {
        let node = Node::from(StringNode::new());
        assert!(node.serialize(Value::List(vec![])).is_err());
    }

    #[test]
    fn test_max_length_counts_characters() {
        let node = Node::from(StringNode::new().max_length(3));
        assert!(node.serialize(Value::from("äöü")).is_ok());
        let err = node.serialize(Value::from("abcd")).unwrap_err();
        assert_eq!(err.message(), "string length 4 is greater than maximum 3");
    }

    #[test]
    fn test_encoding_produces_bytes() {
        let node = Node::from(StringNode::new().encoding(TextEncoding::Latin1));
        assert_eq!(
            node.serialize(Value::from("Düsseldorf")).unwrap(),
            present(Bytes::from(b"D\xfcsseldorf".to_vec()))
        );
    }

    #[test]
    fn test_encoding_rejects_unrepresentable_text() {
        let node = Node::from(StringNode::new().encoding(TextEncoding::Ascii));
        let err = node.serialize(Value::from("Düsseldorf")).unwrap_err();
        assert!(err.message().contains("can't encode"));
    }

    #[test]
    fn test_bytes_input_is_decoded_then_reencoded() {
        let node = Node::from(StringNode::new().encoding(TextEncoding::Latin1));
        let raw = Value::Bytes(Bytes::from(b"caf\xe9".to_vec()));
        assert_eq!(node.serialize(raw.clone()).unwrap(), Slot::Present(raw));

        let utf8 = Node::from(StringNode::new());
        assert!(utf8.serialize(Value::Bytes(Bytes::from(b"caf\xe9".to_vec()))).is_err());
    }

    #[test]
    fn test_deserialize_passes_through() {
        let node = Node::from(StringNode::new());
        assert_eq!(node.deserialize(Value::Int(3)).unwrap(), present(3));
    }

    #[test]
    fn test_encoding_from_str() {
        assert_eq!("UTF8".parse::<TextEncoding>().unwrap(), TextEncoding::Utf8);
        assert_eq!("iso-8859-1".parse::<TextEncoding>().unwrap(), TextEncoding::Latin1);
        assert!("ebcdic".parse::<TextEncoding>().is_err());
    }

    #[test]
    fn test_regexp_absent_stays_absent() {
        let node = Node::from(RegexpNode::new("[a-z]+").unwrap());
        assert_eq!(node.serialize(Slot::Absent).unwrap(), Slot::Absent);
    }

    #[test]
    fn test_datetime_text_keeps_fraction() {
        let at = NaiveDate::from_ymd_opt(2012, 3, 17)
            .unwrap()
            .and_hms_milli_opt(18, 2, 0, 250)
            .unwrap();
        let node = Node::from(StringNode::new());
        assert_eq!(
            node.serialize(Value::DateTime(at)).unwrap(),
            present("2012-03-17 18:02:00.250")
        );
    }

    #[test]
    fn test_regexp_match() {
        let node = Node::from(RegexpNode::new("^[a-z]+$").unwrap());
        assert_eq!(node.serialize(Value::from("abc")).unwrap(), present("abc"));

        let err = node.serialize(Value::from("ABC")).unwrap_err();
        assert_eq!(err.node(), "Regexp");
    }

    #[test]
    fn test_regexp_must_match_whole_text() {
        let node = Node::from(RegexpNode::new("[a-z]+").unwrap());
        assert!(node.serialize(Value::from("abc")).is_ok());
        assert!(node.serialize(Value::from("1abc")).is_err());
        assert!(node.serialize(Value::from("abc1")).is_err());
    }

    #[test]
    fn test_regexp_coerces_before_matching() {
        let node = Node::from(RegexpNode::new(r"\d{4}").unwrap());
        assert_eq!(node.serialize(Value::Int(2012)).unwrap(), present("2012"));
    }

    #[test]
    fn test_invalid_pattern_is_schema_error() {
        assert!(matches!(RegexpNode::new("(unclosed"), Err(Error::SchemaError(_))));
    }
}
