// Schema module for docschema
//
// This module provides the node tree that converts documents between their
// host form and their storage form. It includes:
//
// 1. The shared node pipeline and filters
// 2. Leaf kinds for text, numbers, booleans and dates
// 3. List and Dict containers
// 4. The Schema composite with its target shapes
// 5. A JSON schema definition parser

/// Implements `From<Kind> for Node` so kinds can be used wherever a node is
/// expected.
macro_rules! impl_into_node {
    ($($kind:ty),* $(,)?) => {
        $(
            impl From<$kind> for crate::schema::node::Node {
                fn from(kind: $kind) -> Self {
                    crate::schema::node::Node::new(kind)
                }
            }
        )*
    };
}

// Re-export public types and functions
pub use self::boolean::BooleanNode;
pub use self::composite::{Schema, SchemaBuilder, TargetShape, UnknownFields};
pub use self::containers::{DictNode, ListNode};
pub use self::filters::{DefaultTo, EqualTo, Filter};
pub use self::node::{
    Context, ConvertResult, DefaultValue, Direction, IntoNode, Node, NodeConfig, NodeKind,
};
pub use self::numeric::{FloatNode, IntegerNode};
pub use self::parser::{ParserConfig, SchemaParser};
pub use self::string::{RegexpNode, StringNode, TextEncoding};
pub use self::temporal::{DateNode, DateTimeNode};

// Sub-modules
pub mod node;
pub mod filters;
pub mod string;
pub mod numeric;
pub mod boolean;
pub mod temporal;
pub mod containers;
pub mod composite;
pub mod parser;
