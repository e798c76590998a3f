use std::fmt;

use crate::error::EvalError;
use crate::model::Model;

/// The kind of a canonical expression value, used in diagnostics.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Str,
    Null,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "boolean",
            Self::Int => "integer",
            Self::Float => "float",
            Self::Str => "string",
            Self::Null => "null",
        };
        write!(f, "{}", name)
    }
}

/// A canonical expression value: the only kinds evaluation can produce.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Null,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::Str(_) => ValueKind::Str,
            Self::Null => ValueKind::Null,
        }
    }

    /// Canonicalizes a model value for evaluation: narrower integers widen to
    /// 64-bit, single-precision floats widen to double, and the scalar kinds
    /// pass through unchanged. Containers and opaque objects cannot
    /// participate in expressions and are an invalid-value-type error naming
    /// `property`.
    pub(crate) fn canonicalize(model: &Model, property: &str) -> Result<Self, EvalError> {
        match model {
            Model::Null => Ok(Self::Null),
            Model::Bool(b) => Ok(Self::Bool(*b)),
            Model::I32(i) => Ok(Self::Int(i64::from(*i))),
            Model::I64(i) => Ok(Self::Int(*i)),
            Model::F32(x) => Ok(Self::Float(f64::from(*x))),
            Model::F64(x) => Ok(Self::Float(*x)),
            Model::Str(s) => Ok(Self::Str(s.clone())),
            Model::List(_) | Model::Map(_) | Model::Object(_) => Err(EvalError::InvalidValueType {
                property: property.to_string(),
                found: model.kind_name().to_string(),
            }),
        }
    }
}

/// The natural string form used by `${}` interpolation and `.toString`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Str(s) => write!(f, "{}", s),
            Self::Null => write!(f, "null"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ntest::timeout(100)]
    fn test_widening() {
        assert_eq!(
            Value::canonicalize(&Model::I32(7), "x").unwrap(),
            Value::Int(7)
        );
        assert_eq!(
            Value::canonicalize(&Model::F32(1.5), "x").unwrap(),
            Value::Float(1.5)
        );
        assert_eq!(
            Value::canonicalize(&Model::I64(i64::MAX), "x").unwrap(),
            Value::Int(i64::MAX)
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_containers_are_invalid() {
        let err = Value::canonicalize(&Model::List(vec![]), "items").unwrap_err();
        assert!(
            matches!(err, EvalError::InvalidValueType { ref property, ref found } if property == "items" && found == "list")
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_display() {
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Float(1.5).to_string(), "1.5");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Str("x".to_string()).to_string(), "x");
        assert_eq!(Value::Null.to_string(), "null");
    }
}
