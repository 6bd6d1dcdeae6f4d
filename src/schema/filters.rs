// Filters for docschema
//
// A filter runs before default and required handling. It can replace the
// incoming value or reject it, and sees the whole source document and the
// call context while doing so.

use std::fmt;
use std::sync::Arc;

use crate::internal::error::Invalid;
use crate::schema::node::{Context, ConvertResult, DefaultValue};
use crate::value::{Slot, Value};

/// A transform or check applied to a raw value before coercion.
pub trait Filter: Send + Sync {
    /// Name reported in errors and debug output.
    fn name(&self) -> &str {
        "custom"
    }

    /// Processes `value`. `data` is the whole source document of the call.
    fn apply(&self, value: Slot, data: &Slot, ctx: &Context) -> ConvertResult<Slot>;
}

impl<F> Filter for F
where
    F: Fn(Slot, &Slot, &Context) -> ConvertResult<Slot> + Send + Sync,
{
    fn apply(&self, value: Slot, data: &Slot, ctx: &Context) -> ConvertResult<Slot> {
        self(value, data, ctx)
    }
}

/// Substitutes a value when the incoming one is absent.
///
/// Unlike a node default this only affects the chain it is added to, so a
/// node can default differently on the way in and on the way out.
#[derive(Clone)]
pub struct DefaultTo {
    default: DefaultValue,
}

impl DefaultTo {
    pub fn value(value: impl Into<Value>) -> Self {
        Self {
            default: DefaultValue::Literal(value.into()),
        }
    }

    /// Calls `produce` for every absent value.
    pub fn with(produce: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        Self {
            default: DefaultValue::Producer(Arc::new(produce)),
        }
    }
}

impl fmt::Debug for DefaultTo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DefaultTo").field(&self.default).finish()
    }
}

impl Filter for DefaultTo {
    fn name(&self) -> &str {
        "DefaultTo"
    }

    fn apply(&self, value: Slot, _data: &Slot, _ctx: &Context) -> ConvertResult<Slot> {
        match value {
            Slot::Absent => Ok(Slot::Present(self.default.resolve())),
            present => Ok(present),
        }
    }
}

/// Rejects a value that differs from a sibling field of the whole document.
///
/// Typical use is a password confirmation field.
#[derive(Debug, Clone)]
pub struct EqualTo {
    field: String,
}

impl EqualTo {
    pub fn field(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}

impl Filter for EqualTo {
    fn name(&self) -> &str {
        "EqualTo"
    }

    fn apply(&self, value: Slot, data: &Slot, _ctx: &Context) -> ConvertResult<Slot> {
        let Some(other) = data.lookup(&self.field) else {
            return Err(Invalid::new(
                self.name(),
                format!("field '{}' to compare against is missing", self.field),
            ));
        };
        if value.as_value() != Some(other) {
            return Err(Invalid::new(
                self.name(),
                format!("fields do not match: '{}'", self.field),
            ));
        }
        Ok(value)
    }
}
