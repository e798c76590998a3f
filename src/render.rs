use crate::error::{EvalError, TemplineResult};
use crate::eval::Evaluator;
use crate::model::Model;
use crate::resolve::{DefaultResolver, PropertyResolver, require_path, resolve_path};
use crate::template::{Action, Block, CompiledTemplate};
use crate::value::Value;

/// The terminator written after every emitted line. Chosen at the executor,
/// never per template.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

/// Replays a compiled template against a concrete model.
///
/// A renderer pairs a property resolver with a line ending; it holds no
/// per-render state, so one instance can serve any number of renders, each
/// with its own model and output.
///
/// # Examples
///
/// ```
/// use templine::{CompiledTemplate, Model, Renderer};
///
/// let template = CompiledTemplate::compile("<%if greet%>\nHello, ${name}!\n<%/if%>").unwrap();
/// let model = [
///     ("greet".to_string(), Model::from(true)),
///     ("name".to_string(), Model::from("World")),
/// ]
/// .into_iter()
/// .collect::<Model>();
///
/// let output = Renderer::new().render(&template, &model).unwrap();
/// assert_eq!(output, "Hello, World!\n");
/// ```
pub struct Renderer<'r> {
    resolver: &'r dyn PropertyResolver,
    line_ending: LineEnding,
}

impl Renderer<'static> {
    /// A renderer over the [`DefaultResolver`] with `\n` line endings.
    pub fn new() -> Self {
        Self {
            resolver: &DefaultResolver,
            line_ending: LineEnding::Lf,
        }
    }
}

impl Default for Renderer<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r> Renderer<'r> {
    pub fn with_resolver(resolver: &'r dyn PropertyResolver) -> Self {
        Self {
            resolver,
            line_ending: LineEnding::Lf,
        }
    }

    #[must_use]
    pub fn line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Renders a compiled template against a model.
    ///
    /// # Errors
    /// - If an interpolation resolves to null, a `for` path is missing or
    ///   not a list, an `if` condition is not boolean, or any expression
    ///   evaluation fails.
    pub fn render(&self, template: &CompiledTemplate, model: &Model) -> TemplineResult<String> {
        let mut output = String::new();
        self.render_actions(&template.actions, model, &mut output)?;
        Ok(output)
    }

    fn render_actions(
        &self,
        actions: &[Action],
        model: &Model,
        output: &mut String,
    ) -> TemplineResult<()> {
        for action in actions {
            match action {
                Action::Literal(text) => output.push_str(text),
                Action::EndLine => output.push_str(self.line_ending.as_str()),
                Action::Interpolate(path) => {
                    let resolved = resolve_path(self.resolver, model, path)?;
                    // A null interpolation is a hard error, never empty output.
                    let value = resolved.ok_or_else(|| EvalError::UnresolvedValue {
                        path: path.clone(),
                    })?;
                    let value = Value::canonicalize(&value, path)?;
                    output.push_str(&value.to_string());
                }
                Action::Block(block) => self.render_block(block, model, output)?,
            }
        }
        Ok(())
    }

    fn render_block(
        &self,
        block: &Block,
        model: &Model,
        output: &mut String,
    ) -> TemplineResult<()> {
        match block {
            Block::If {
                condition,
                then_actions,
                else_actions,
                has_else,
            } => {
                let value = Evaluator::new(self.resolver).evaluate(condition, model, &[])?;
                match value {
                    Value::Bool(true) => self.render_actions(then_actions, model, output),
                    Value::Bool(false) if *has_else => {
                        self.render_actions(else_actions, model, output)
                    }
                    Value::Bool(false) => Ok(()),
                    other => Err(EvalError::TypeMismatch {
                        operator: "if".to_string(),
                        expected: "boolean".to_string(),
                        found: other.kind(),
                    }
                    .into()),
                }
            }
            Block::For {
                variable,
                list_path,
                body,
            } => {
                let list = require_path(self.resolver, model, list_path)?;
                let items = match list {
                    Model::List(items) => items,
                    other => {
                        return Err(EvalError::NotIterable {
                            path: list_path.clone(),
                            found: other.kind_name().to_string(),
                        }
                        .into());
                    }
                };
                for item in items {
                    let shadow = bind_loop_variable(model, variable, item)?;
                    self.render_actions(body, &shadow, output)?;
                }
                // Siblings after the block see the caller's model untouched.
                Ok(())
            }
        }
    }
}

/// Builds the shadow model for one loop iteration: a copy of the model with
/// the loop variable bound.
fn bind_loop_variable(model: &Model, variable: &str, value: Model) -> Result<Model, EvalError> {
    match model {
        Model::Map(entries) => {
            let mut shadow = entries.clone();
            shadow.insert(variable.to_string(), value);
            Ok(Model::Map(shadow))
        }
        other => Err(EvalError::LoopBind {
            variable: variable.to_string(),
            found: other.kind_name().to_string(),
        }),
    }
}
