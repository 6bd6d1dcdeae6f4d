// Boolean node kind

use crate::schema::node::{Context, ConvertResult, NodeConfig, NodeKind};
use crate::value::{Slot, Value};

/// Boolean node: coerces to true or false.
///
/// An absent, optional value serializes to `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanNode;

impl BooleanNode {
    pub fn new() -> Self {
        BooleanNode
    }

    fn parse_text(&self, node: &NodeConfig, text: &str) -> ConvertResult<bool> {
        match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" | "" => Ok(false),
            _ => Err(node.invalid(
                self.type_name(),
                format!("'{}' is not a boolean", text),
            )),
        }
    }
}

impl NodeKind for BooleanNode {
    fn type_name(&self) -> &'static str {
        "Boolean"
    }

    fn do_serialize(&self, node: &NodeConfig, value: Slot, _: &Slot, _: &Context) -> ConvertResult<Slot> {
        let flag = match value {
            Slot::Absent => false,
            Slot::Present(Value::Null) => return Ok(Slot::Present(Value::Null)),
            Slot::Present(Value::Bool(b)) => b,
            Slot::Present(Value::Int(i)) => i != 0,
            Slot::Present(Value::Float(f)) => f != 0.0,
            Slot::Present(Value::String(s)) => self.parse_text(node, &s)?,
            Slot::Present(other) => {
                return Err(node.invalid(
                    self.type_name(),
                    format!("cannot convert {} to boolean", other.type_name()),
                ))
            }
        };
        Ok(Slot::Present(Value::Bool(flag)))
    }
}

impl_into_node!(BooleanNode);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::node::{IntoNode, Node};
    use rstest::rstest;

    #[rstest]
    #[case(Value::Bool(true), true)]
    #[case(Value::Bool(false), false)]
    #[case(Value::Int(3), true)]
    #[case(Value::Int(0), false)]
    #[case(Value::Float(0.5), true)]
    #[case(Value::from("yes"), true)]
    #[case(Value::from(" TRUE "), true)]
    #[case(Value::from("off"), false)]
    #[case(Value::from(""), false)]
    fn test_boolean_coercion(#[case] input: Value, #[case] expected: bool) {
        let node = Node::from(BooleanNode::new());
        assert_eq!(node.serialize(input).unwrap(), Slot::Present(Value::Bool(expected)));
    }

    #[test]
    fn test_absent_boolean_is_false() {
        let node = Node::from(BooleanNode::new());
        assert_eq!(node.serialize(Slot::Absent).unwrap(), Slot::Present(Value::Bool(false)));
    }

    #[test]
    fn test_absent_required_boolean_fails() {
        let node = BooleanNode::new().required();
        assert!(node.serialize(Slot::Absent).is_err());
    }

    #[test]
    fn test_unknown_text_is_invalid() {
        let err = Node::from(BooleanNode::new()).serialize(Value::from("maybe")).unwrap_err();
        assert_eq!(err.node(), "Boolean");
        assert_eq!(err.message(), "'maybe' is not a boolean");
    }
}
