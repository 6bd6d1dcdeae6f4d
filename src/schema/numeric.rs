// Numeric node kinds: Integer and Float
//
// Both accept numbers, decimal text and booleans, then check the optional
// inclusive bounds. Float shares the bounds check with Integer.

use std::fmt::Display;

use crate::schema::node::{Context, ConvertResult, NodeConfig, NodeKind};
use crate::value::{Slot, Value};

/// Checks `n` against inclusive bounds.
fn check_bounds<T: PartialOrd + Display>(
    node: &NodeConfig,
    kind: &str,
    n: T,
    min: Option<T>,
    max: Option<T>,
) -> ConvertResult<T> {
    if let Some(min) = min {
        if n < min {
            return Err(node.invalid(kind, format!("value {} is less than minimum {}", n, min)));
        }
    }
    if let Some(max) = max {
        if n > max {
            return Err(node.invalid(kind, format!("value {} is greater than maximum {}", n, max)));
        }
    }
    Ok(n)
}

fn bytes_text(raw: &[u8]) -> Option<&str> {
    std::str::from_utf8(raw).ok()
}

/// Integer node: coerces to a 64-bit signed integer.
#[derive(Debug, Clone, Default)]
pub struct IntegerNode {
    min: Option<i64>,
    max: Option<i64>,
}

impl IntegerNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min(mut self, min: i64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: i64) -> Self {
        self.max = Some(max);
        self
    }

    fn coerce(&self, node: &NodeConfig, value: &Value) -> ConvertResult<i64> {
        let parse = |text: &str| {
            text.trim().parse::<i64>().map_err(|_| {
                node.invalid(self.type_name(), format!("invalid literal for integer: '{}'", text))
            })
        };
        match value {
            Value::Int(i) => Ok(*i),
            // floats keep their integral part
            Value::Float(f) if f.is_finite() && *f >= i64::MIN as f64 && *f < i64::MAX as f64 => {
                Ok(f.trunc() as i64)
            }
            Value::Float(f) => Err(node.invalid(
                self.type_name(),
                format!("float {} cannot be converted to integer", f),
            )),
            Value::Bool(b) => Ok(i64::from(*b)),
            Value::String(s) => parse(s),
            Value::Bytes(raw) => match bytes_text(raw) {
                Some(text) => parse(text),
                None => Err(node.invalid(self.type_name(), "bytes are not valid text")),
            },
            other => Err(node.invalid(
                self.type_name(),
                format!("cannot convert {} to integer", other.type_name()),
            )),
        }
    }
}

impl NodeKind for IntegerNode {
    fn type_name(&self) -> &'static str {
        "Integer"
    }

    fn do_serialize(&self, node: &NodeConfig, value: Slot, _: &Slot, _: &Context) -> ConvertResult<Slot> {
        match value {
            Slot::Present(Value::Null) | Slot::Absent => Ok(value),
            Slot::Present(ref v) => {
                let n = self.coerce(node, v)?;
                check_bounds(node, self.type_name(), n, self.min, self.max)
                    .map(|n| Slot::Present(Value::Int(n)))
            }
        }
    }
}

/// Float node: coerces to a finite 64-bit float.
#[derive(Debug, Clone, Default)]
pub struct FloatNode {
    min: Option<f64>,
    max: Option<f64>,
}

impl FloatNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    fn coerce(&self, node: &NodeConfig, value: &Value) -> ConvertResult<f64> {
        let parse = |text: &str| {
            text.trim().parse::<f64>().map_err(|_| {
                node.invalid(self.type_name(), format!("could not convert string to float: '{}'", text))
            })
        };
        let f = match value {
            Value::Float(f) => *f,
            Value::Int(i) => *i as f64,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::String(s) => parse(s)?,
            Value::Bytes(raw) => match bytes_text(raw) {
                Some(text) => parse(text)?,
                None => return Err(node.invalid(self.type_name(), "bytes are not valid text")),
            },
            other => {
                return Err(node.invalid(
                    self.type_name(),
                    format!("cannot convert {} to float", other.type_name()),
                ))
            }
        };
        if !f.is_finite() {
            return Err(node.invalid(self.type_name(), format!("{} is not a finite number", f)));
        }
        Ok(f)
    }
}

impl NodeKind for FloatNode {
    fn type_name(&self) -> &'static str {
        "Float"
    }

    fn do_serialize(&self, node: &NodeConfig, value: Slot, _: &Slot, _: &Context) -> ConvertResult<Slot> {
        match value {
            Slot::Present(Value::Null) | Slot::Absent => Ok(value),
            Slot::Present(ref v) => {
                let f = self.coerce(node, v)?;
                check_bounds(node, self.type_name(), f, self.min, self.max)
                    .map(|f| Slot::Present(Value::Float(f)))
            }
        }
    }
}

impl_into_node!(IntegerNode, FloatNode);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::node::Node;
    use rstest::rstest;

    fn int(node: IntegerNode, value: impl Into<Value>) -> ConvertResult<Slot> {
        Node::from(node).serialize(value.into())
    }

    fn float(node: FloatNode, value: impl Into<Value>) -> ConvertResult<Slot> {
        Node::from(node).serialize(value.into())
    }

    #[rstest]
    #[case(Value::Int(2), 2)]
    #[case(Value::from("2"), 2)]
    #[case(Value::from(" 17 "), 17)]
    #[case(Value::Float(2.9), 2)]
    #[case(Value::Float(-2.9), -2)]
    #[case(Value::Bool(true), 1)]
    fn test_integer_coercion(#[case] input: Value, #[case] expected: i64) {
        assert_eq!(int(IntegerNode::new(), input).unwrap(), Slot::Present(Value::Int(expected)));
    }

    #[rstest]
    #[case(Value::from("a"))]
    #[case(Value::from("2.5"))]
    #[case(Value::Float(f64::NAN))]
    #[case(Value::List(vec![]))]
    fn test_invalid_integer(#[case] input: Value) {
        let err = int(IntegerNode::new(), input).unwrap_err();
        assert_eq!(err.node(), "Integer");
    }

    #[test]
    fn test_integer_bounds() {
        assert!(int(IntegerNode::new().min(17), 17).is_ok());
        assert!(int(IntegerNode::new().min(17), 16).is_err());
        assert!(int(IntegerNode::new().max(17), 16).is_ok());

        let err = int(IntegerNode::new().max(17), 19).unwrap_err();
        assert_eq!(err.message(), "value 19 is greater than maximum 17");
    }

    #[test]
    fn test_integer_serialize_is_idempotent() {
        let node = Node::from(IntegerNode::new());
        let once = node.serialize(Value::from("42")).unwrap();
        let twice = node.serialize(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_integer_absent_and_null_pass() {
        assert_eq!(Node::from(IntegerNode::new()).serialize(Slot::Absent).unwrap(), Slot::Absent);
        assert_eq!(int(IntegerNode::new().min(1), Value::Null).unwrap(), Slot::Present(Value::Null));
    }

    #[rstest]
    #[case(Value::Float(2.3), 2.3)]
    #[case(Value::from("2.3"), 2.3)]
    #[case(Value::Int(2), 2.0)]
    fn test_float_coercion(#[case] input: Value, #[case] expected: f64) {
        assert_eq!(float(FloatNode::new(), input).unwrap(), Slot::Present(Value::Float(expected)));
    }

    #[rstest]
    #[case(Value::from("a"))]
    #[case(Value::from("inf"))]
    #[case(Value::from("NaN"))]
    fn test_invalid_float(#[case] input: Value) {
        assert!(float(FloatNode::new(), input).is_err());
    }

    #[test]
    fn test_float_absent_stays_absent() {
        let node = Node::from(FloatNode::new().min(1.0));
        assert_eq!(node.serialize(Slot::Absent).unwrap(), Slot::Absent);
    }

    #[test]
    fn test_float_bounds() {
        assert!(float(FloatNode::new().min(17.6), 17.61).is_ok());
        assert!(float(FloatNode::new().min(17.6), 17.59).is_err());
        assert!(float(FloatNode::new().max(17.6), 17.59).is_ok());
        assert!(float(FloatNode::new().max(17.6), 18.59).is_err());
    }
}
