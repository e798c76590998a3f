use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Capability for opaque host objects that expose named properties.
///
/// This is the seam the resolver uses instead of reflection: a host type
/// implements `PropertySource` once and its instances can then sit anywhere
/// in a model tree as [`Model::Object`].
pub trait PropertySource: fmt::Debug {
    /// Returns the named property, or `None` if the object has no such
    /// property or its value is null.
    fn property(&self, name: &str) -> Option<Model>;
}

/// A run-time model value.
///
/// Models are what callers hand to `render`/`evaluate`. The narrower numeric
/// kinds (`I32`, `F32`) exist so that canonicalization to the two evaluation
/// kinds (64-bit integer, double) is observable; `List` and `Map` only ever
/// appear as containers on a property path, never as expression operands.
#[derive(Debug, Clone)]
pub enum Model {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
    List(Vec<Model>),
    Map(BTreeMap<String, Model>),
    Object(Rc<dyn PropertySource>),
}

impl Model {
    /// Wraps a `PropertySource` implementation as a model value.
    pub fn object<S: PropertySource + 'static>(source: S) -> Self {
        Self::Object(Rc::new(source))
    }

    /// Human-readable name of this value's kind, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::I32(_) => "32-bit integer",
            Self::I64(_) => "integer",
            Self::F32(_) => "32-bit float",
            Self::F64(_) => "float",
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::I32(a), Self::I32(b)) => a == b,
            (Self::I64(a), Self::I64(b)) => a == b,
            (Self::F32(a), Self::F32(b)) => a == b,
            (Self::F64(a), Self::F64(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            // Opaque objects compare by identity.
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Model {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Model {
    fn from(value: i32) -> Self {
        Self::I32(value)
    }
}

impl From<i64> for Model {
    fn from(value: i64) -> Self {
        Self::I64(value)
    }
}

impl From<f32> for Model {
    fn from(value: f32) -> Self {
        Self::F32(value)
    }
}

impl From<f64> for Model {
    fn from(value: f64) -> Self {
        Self::F64(value)
    }
}

impl From<&str> for Model {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Model {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl<T: Into<Model>> From<Vec<T>> for Model {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Model>> FromIterator<(String, T)> for Model {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(entries: I) -> Self {
        Self::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key, value.into()))
                .collect(),
        )
    }
}
