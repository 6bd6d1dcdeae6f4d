// Container node kinds: List and Dict
//
// Containers convert their elements through a child node and thread the
// whole document down unchanged. A failing element aborts the call; its
// error is prefixed with the element index or key.

use crate::schema::node::{Context, ConvertResult, Direction, Node, NodeConfig, NodeKind};
use crate::value::{AttrMap, Document, Slot, Value};

/// List node: every element converts through one child node.
#[derive(Debug, Clone)]
pub struct ListNode {
    item: Node,
}

impl ListNode {
    /// A list whose elements convert through `item`.
    pub fn of(item: impl Into<Node>) -> Self {
        Self { item: item.into() }
    }

    pub fn item(&self) -> &Node {
        &self.item
    }

    fn convert(
        &self,
        direction: Direction,
        node: &NodeConfig,
        value: Slot,
        data: &Slot,
        ctx: &Context,
    ) -> ConvertResult<Slot> {
        let items = match value {
            Slot::Absent => return Ok(Slot::Present(Value::List(Vec::new()))),
            Slot::Present(Value::Null) => return Ok(Slot::Present(Value::Null)),
            Slot::Present(Value::List(items)) => items,
            Slot::Present(other) => {
                return Err(node.invalid(
                    self.type_name(),
                    format!("expected a list, got {}", other.type_name()),
                ))
            }
        };

        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let converted = self
                .item
                .convert(direction, Slot::Present(item), data, ctx)
                .map_err(|err| err.within(index.to_string()))?;
            // a filter may drop an element; its position is kept
            out.push(converted.into_value().unwrap_or(Value::Null));
        }
        Ok(Slot::Present(Value::List(out)))
    }
}

impl NodeKind for ListNode {
    fn type_name(&self) -> &'static str {
        "List"
    }

    fn do_serialize(&self, node: &NodeConfig, value: Slot, data: &Slot, ctx: &Context) -> ConvertResult<Slot> {
        self.convert(Direction::Serialize, node, value, data, ctx)
    }

    fn do_deserialize(&self, node: &NodeConfig, value: Slot, data: &Slot, ctx: &Context) -> ConvertResult<Slot> {
        self.convert(Direction::Deserialize, node, value, data, ctx)
    }
}

/// Dict node: a mapping with arbitrary keys.
///
/// Values convert through the optional child node. With `dotted` set the
/// deserialized mapping allows attribute access.
#[derive(Debug, Clone, Default)]
pub struct DictNode {
    values: Option<Node>,
    dotted: bool,
}

impl DictNode {
    /// A mapping whose values pass through unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts every value through `node`.
    pub fn values(mut self, node: impl Into<Node>) -> Self {
        self.values = Some(node.into());
        self
    }

    /// Deserializes into an [`AttrMap`] instead of a plain map.
    pub fn dotted(mut self, dotted: bool) -> Self {
        self.dotted = dotted;
        self
    }

    pub fn is_dotted(&self) -> bool {
        self.dotted
    }

    fn convert(
        &self,
        direction: Direction,
        node: &NodeConfig,
        value: Slot,
        data: &Slot,
        ctx: &Context,
    ) -> ConvertResult<Document> {
        let doc = match value {
            Slot::Absent => return Ok(Document::new()),
            Slot::Present(value) => {
                let found = value.type_name();
                value.into_document().ok_or_else(|| {
                    node.invalid(self.type_name(), format!("expected a mapping, got {}", found))
                })?
            }
        };

        let Some(values) = &self.values else {
            return Ok(doc);
        };
        let mut out = Document::with_capacity(doc.len());
        for (key, item) in doc {
            let converted = values
                .convert(direction, Slot::Present(item), data, ctx)
                .map_err(|err| err.within(key.clone()))?;
            if let Some(item) = converted.into_value() {
                out.push(key, item);
            }
        }
        Ok(out)
    }
}

impl NodeKind for DictNode {
    fn type_name(&self) -> &'static str {
        "Dict"
    }

    fn do_serialize(&self, node: &NodeConfig, value: Slot, data: &Slot, ctx: &Context) -> ConvertResult<Slot> {
        if let Slot::Present(Value::Null) = value {
            return Ok(value);
        }
        let doc = self.convert(Direction::Serialize, node, value, data, ctx)?;
        Ok(Slot::Present(Value::Map(doc)))
    }

    fn do_deserialize(&self, node: &NodeConfig, value: Slot, data: &Slot, ctx: &Context) -> ConvertResult<Slot> {
        if let Slot::Present(Value::Null) = value {
            return Ok(value);
        }
        let doc = self.convert(Direction::Deserialize, node, value, data, ctx)?;
        Ok(Slot::Present(if self.dotted {
            Value::Attrs(AttrMap::from(doc))
        } else {
            Value::Map(doc)
        }))
    }
}

impl_into_node!(ListNode, DictNode);
