// docschema library entry point
//
// Schemas built from nodes convert documents between the form application
// code works with and the form a document store persists.

pub mod internal;
pub mod schema;
pub mod value;

pub use internal::error::{Error, Invalid, Result};
pub use schema::{
    BooleanNode, Context, ConvertResult, DateNode, DateTimeNode, DefaultTo, DefaultValue,
    DictNode, Direction, EqualTo, Filter, FloatNode, IntegerNode, IntoNode, ListNode, Node,
    NodeConfig, NodeKind, ParserConfig, RegexpNode, Schema, SchemaBuilder, SchemaParser,
    StringNode, TargetShape, TextEncoding, UnknownFields,
};
pub use value::{AttrMap, Document, Record, Slot, Value};
