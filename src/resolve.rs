use crate::error::EvalError;
use crate::model::Model;

/// Resolves one property name against one model value.
///
/// The interpreter core never introspects models itself; every property
/// lookup goes through this capability, so callers can substitute their own
/// resolution strategy wholesale.
pub trait PropertyResolver {
    /// Returns the property's value, or `None` when the model has no such
    /// property (or its value is null).
    fn property(&self, model: &Model, name: &str) -> Option<Model>;
}

/// Dictionary-only resolution: key lookup on `Map`, nothing else.
#[derive(Debug, Default)]
pub struct MapResolver;

impl PropertyResolver for MapResolver {
    fn property(&self, model: &Model, name: &str) -> Option<Model> {
        match model {
            Model::Map(entries) => entries.get(name).cloned(),
            _ => None,
        }
    }
}

/// The resolver templates use unless the caller supplies another: key lookup
/// on `Map`, [`crate::PropertySource`] dispatch on `Object`.
#[derive(Debug, Default)]
pub struct DefaultResolver;

impl PropertyResolver for DefaultResolver {
    fn property(&self, model: &Model, name: &str) -> Option<Model> {
        match model {
            Model::Map(entries) => entries.get(name).cloned(),
            Model::Object(source) => source.property(name),
            _ => None,
        }
    }
}

/// Walks a dotted path left to right.
///
/// A missing or null value at an intermediate segment is an error naming the
/// partial path consumed so far; only the final segment may resolve to null,
/// in which case `Ok(None)` is returned. Callers rely on this two-policy
/// split.
pub fn resolve_path(
    resolver: &dyn PropertyResolver,
    model: &Model,
    path: &str,
) -> Result<Option<Model>, EvalError> {
    if path.is_empty() {
        return Err(EvalError::InvalidPath {
            path: path.to_string(),
        });
    }

    let mut current = model.clone();
    let mut consumed = String::new();
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        if segment.is_empty() {
            return Err(EvalError::InvalidPath {
                path: path.to_string(),
            });
        }
        if !consumed.is_empty() {
            consumed.push('.');
        }
        consumed.push_str(segment);

        let next = resolver.property(&current, segment);
        match next {
            Some(value) if !value.is_null() => current = value,
            _ => {
                // Null is tolerated only at the tail of the path.
                if segments.peek().is_none() {
                    return Ok(None);
                }
                return Err(EvalError::NullPathSegment { partial: consumed });
            }
        }
    }
    Ok(Some(current))
}

/// As [`resolve_path`], but a null result at the tail is a missing-value
/// error naming the full path.
pub fn require_path(
    resolver: &dyn PropertyResolver,
    model: &Model,
    path: &str,
) -> Result<Model, EvalError> {
    resolve_path(resolver, model, path)?.ok_or_else(|| EvalError::MissingValue {
        path: path.to_string(),
    })
}
