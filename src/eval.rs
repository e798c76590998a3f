use crate::ast::{
    AddExpr, AddOp, AndExpr, EqualityExpr, EqualityOp, Expression, MultiplyExpr, MultiplyOp,
    OrExpr, RelationalExpr, RelationalOp, UnaryExpr, UnaryOp, ValueExpr,
};
use crate::error::{EvalError, TemplineResult};
use crate::model::Model;
use crate::resolve::{PropertyResolver, resolve_path};
use crate::value::Value;

/// A tree-walking interpreter for parsed expressions.
///
/// The evaluator holds no state beyond the resolver it borrows; one instance
/// can serve any number of evaluations, each against its own model.
///
/// # Examples
///
/// ```
/// use templine::{DefaultResolver, Evaluator, Expression, Model, Value};
///
/// let expression = Expression::parse("2+3*4").unwrap();
/// let evaluator = Evaluator::new(&DefaultResolver);
/// let result = evaluator.evaluate(&expression, &Model::Null, &[]).unwrap();
/// assert_eq!(result, Value::Int(14));
/// ```
pub struct Evaluator<'r> {
    resolver: &'r dyn PropertyResolver,
}

impl<'r> Evaluator<'r> {
    pub fn new(resolver: &'r dyn PropertyResolver) -> Self {
        Self { resolver }
    }

    /// Evaluates an expression against a model, with positional parameters
    /// backing the `?N` syntax.
    ///
    /// # Errors
    /// - On operand kind mismatches, null operands, invalid value types,
    ///   out-of-range parameter indices, or resolution failures.
    pub fn evaluate(
        &self,
        expression: &Expression,
        model: &Model,
        params: &[Value],
    ) -> TemplineResult<Value> {
        self.eval_or(&expression.root, model, params)
            .map_err(Into::into)
    }

    fn eval_or(
        &self,
        node: &OrExpr,
        model: &Model,
        params: &[Value],
    ) -> Result<Value, EvalError> {
        // A lone operand passes through unchanged, whatever its kind.
        if let [only] = node.ands.as_slice() {
            return self.eval_and(only, model, params);
        }
        // Every operand evaluates before the combination is computed:
        // `true || f` still evaluates `f`. Observable, and kept that way.
        let mut result = false;
        for and in &node.ands {
            let value = self.eval_and(and, model, params)?;
            result |= boolean_operand(value, "||")?;
        }
        Ok(Value::Bool(result))
    }

    fn eval_and(
        &self,
        node: &AndExpr,
        model: &Model,
        params: &[Value],
    ) -> Result<Value, EvalError> {
        if let [only] = node.terms.as_slice() {
            return self.eval_equality(only, model, params);
        }
        let mut result = true;
        for term in &node.terms {
            let value = self.eval_equality(term, model, params)?;
            result &= boolean_operand(value, "&&")?;
        }
        Ok(Value::Bool(result))
    }

    fn eval_equality(
        &self,
        node: &EqualityExpr,
        model: &Model,
        params: &[Value],
    ) -> Result<Value, EvalError> {
        let left = self.eval_relational(&node.left, model, params)?;
        let Some((op, right_node)) = &node.op_right else {
            return Ok(left);
        };
        let right = self.eval_relational(right_node, model, params)?;
        // Values of different kinds are simply unequal; null equals null.
        let equal = left == right;
        Ok(Value::Bool(match op {
            EqualityOp::Eq => equal,
            EqualityOp::Ne => !equal,
        }))
    }

    fn eval_relational(
        &self,
        node: &RelationalExpr,
        model: &Model,
        params: &[Value],
    ) -> Result<Value, EvalError> {
        let left = self.eval_add(&node.left, model, params)?;
        let Some((op, right_node)) = &node.op_right else {
            return Ok(left);
        };
        let right = self.eval_add(right_node, model, params)?;
        let operator = match op {
            RelationalOp::Gt => ">",
            RelationalOp::Ge => ">=",
            RelationalOp::Lt => "<",
            RelationalOp::Le => "<=",
        };
        let result = match numeric_operands(operator, left, right)? {
            NumericPair::Ints(l, r) => match op {
                RelationalOp::Gt => l > r,
                RelationalOp::Ge => l >= r,
                RelationalOp::Lt => l < r,
                RelationalOp::Le => l <= r,
            },
            NumericPair::Floats(l, r) => match op {
                RelationalOp::Gt => l > r,
                RelationalOp::Ge => l >= r,
                RelationalOp::Lt => l < r,
                RelationalOp::Le => l <= r,
            },
        };
        Ok(Value::Bool(result))
    }

    fn eval_add(
        &self,
        node: &AddExpr,
        model: &Model,
        params: &[Value],
    ) -> Result<Value, EvalError> {
        let mut acc = self.eval_multiply(&node.first, model, params)?;
        for (op, term) in &node.rest {
            let rhs = self.eval_multiply(term, model, params)?;
            let operator = match op {
                AddOp::Plus => "+",
                AddOp::Minus => "-",
            };
            acc = match numeric_operands(operator, acc, rhs)? {
                NumericPair::Ints(l, r) => Value::Int(match op {
                    AddOp::Plus => l.wrapping_add(r),
                    AddOp::Minus => l.wrapping_sub(r),
                }),
                NumericPair::Floats(l, r) => Value::Float(match op {
                    AddOp::Plus => l + r,
                    AddOp::Minus => l - r,
                }),
            };
        }
        Ok(acc)
    }

    fn eval_multiply(
        &self,
        node: &MultiplyExpr,
        model: &Model,
        params: &[Value],
    ) -> Result<Value, EvalError> {
        let left = self.eval_unary(&node.left, model, params)?;
        let Some((op, right_node)) = &node.op_right else {
            return Ok(left);
        };
        let right = self.eval_unary(right_node, model, params)?;
        let operator = match op {
            MultiplyOp::Mul => "*",
            MultiplyOp::Div => "/",
            MultiplyOp::Mod => "%",
        };
        match numeric_operands(operator, left, right)? {
            NumericPair::Ints(l, r) => {
                if matches!(op, MultiplyOp::Div | MultiplyOp::Mod) && r == 0 {
                    return Err(EvalError::DivisionByZero);
                }
                Ok(Value::Int(match op {
                    MultiplyOp::Mul => l.wrapping_mul(r),
                    MultiplyOp::Div => l.wrapping_div(r),
                    MultiplyOp::Mod => l.wrapping_rem(r),
                }))
            }
            // Floats follow IEEE semantics, including division by zero.
            NumericPair::Floats(l, r) => Ok(Value::Float(match op {
                MultiplyOp::Mul => l * r,
                MultiplyOp::Div => l / r,
                MultiplyOp::Mod => l % r,
            })),
        }
    }

    fn eval_unary(
        &self,
        node: &UnaryExpr,
        model: &Model,
        params: &[Value],
    ) -> Result<Value, EvalError> {
        let value = self.eval_value(&node.value, model, params)?;
        match node.op {
            None => Ok(value),
            Some(UnaryOp::Not) => Ok(Value::Bool(!boolean_operand(value, "!")?)),
            Some(UnaryOp::Minus) => match value {
                Value::Int(i) => Ok(Value::Int(i.wrapping_neg())),
                Value::Float(x) => Ok(Value::Float(-x)),
                Value::Null => Err(EvalError::NullOperand {
                    operator: "-".to_string(),
                }),
                other => Err(EvalError::TypeMismatch {
                    operator: "-".to_string(),
                    expected: "a numeric operand".to_string(),
                    found: other.kind(),
                }),
            },
            Some(UnaryOp::Empty) => match value {
                Value::Str(s) => Ok(Value::Bool(s.is_empty())),
                Value::Null => Err(EvalError::NullOperand {
                    operator: "empty".to_string(),
                }),
                other => Err(EvalError::TypeMismatch {
                    operator: "empty".to_string(),
                    expected: "string".to_string(),
                    found: other.kind(),
                }),
            },
        }
    }

    fn eval_value(
        &self,
        node: &ValueExpr,
        model: &Model,
        params: &[Value],
    ) -> Result<Value, EvalError> {
        match node {
            ValueExpr::Bool(b) => Ok(Value::Bool(*b)),
            ValueExpr::Int(i) => Ok(Value::Int(*i)),
            ValueExpr::Float(x) => Ok(Value::Float(*x)),
            ValueExpr::Str(s) => Ok(Value::Str(s.clone())),
            ValueExpr::Null => Ok(Value::Null),
            ValueExpr::Param(index) => {
                params
                    .get(*index)
                    .cloned()
                    .ok_or(EvalError::ParamOutOfRange {
                        index: *index,
                        len: params.len(),
                    })
            }
            ValueExpr::Nested(inner) => self.eval_or(inner, model, params),
            ValueExpr::Variable(path) => self.eval_variable(path, model),
        }
    }

    fn eval_variable(&self, path: &str, model: &Model) -> Result<Value, EvalError> {
        if let Some(prefix) = path.strip_suffix(".toString") {
            let resolved = resolve_path(self.resolver, model, prefix)?;
            let text = match resolved {
                // Null stringifies to the literal text "null", never an error.
                None => "null".to_string(),
                Some(value) => Value::canonicalize(&value, prefix)?.to_string(),
            };
            return Ok(Value::Str(text));
        }
        if let Some(prefix) = path.strip_suffix(".toInt") {
            return self.convert(prefix, model, ConvertTarget::Int);
        }
        if let Some(prefix) = path.strip_suffix(".toFloat") {
            return self.convert(prefix, model, ConvertTarget::Float);
        }

        match resolve_path(self.resolver, model, path)? {
            None => Ok(Value::Null),
            Some(value) => Value::canonicalize(&value, path),
        }
    }

    fn convert(
        &self,
        property: &str,
        model: &Model,
        target: ConvertTarget,
    ) -> Result<Value, EvalError> {
        let resolved = resolve_path(self.resolver, model, property)?;
        let value = match resolved {
            None => {
                return Err(EvalError::CannotConvertNull {
                    property: property.to_string(),
                    target: target.name().to_string(),
                });
            }
            Some(value) => Value::canonicalize(&value, property)?,
        };
        match (target, value) {
            (ConvertTarget::Int, Value::Int(i)) => Ok(Value::Int(i)),
            (ConvertTarget::Float, Value::Int(i)) => Ok(Value::Float(i as f64)),
            (ConvertTarget::Float, Value::Float(x)) => Ok(Value::Float(x)),
            (ConvertTarget::Int, Value::Str(s)) => {
                s.parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| EvalError::CannotConvert {
                        property: property.to_string(),
                        target: target.name().to_string(),
                        found: format!("string '{}'", s),
                    })
            }
            (ConvertTarget::Float, Value::Str(s)) => {
                s.parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| EvalError::CannotConvert {
                        property: property.to_string(),
                        target: target.name().to_string(),
                        found: format!("string '{}'", s),
                    })
            }
            (_, Value::Null) => Err(EvalError::CannotConvertNull {
                property: property.to_string(),
                target: target.name().to_string(),
            }),
            (_, other) => Err(EvalError::CannotConvert {
                property: property.to_string(),
                target: target.name().to_string(),
                found: other.kind().to_string(),
            }),
        }
    }
}

#[derive(Copy, Clone)]
enum ConvertTarget {
    Int,
    Float,
}

impl ConvertTarget {
    fn name(self) -> &'static str {
        match self {
            Self::Int => "integer",
            Self::Float => "float",
        }
    }
}

fn boolean_operand(value: Value, operator: &str) -> Result<bool, EvalError> {
    match value {
        Value::Bool(b) => Ok(b),
        Value::Null => Err(EvalError::NullOperand {
            operator: operator.to_string(),
        }),
        other => Err(EvalError::TypeMismatch {
            operator: operator.to_string(),
            expected: "boolean".to_string(),
            found: other.kind(),
        }),
    }
}

enum NumericPair {
    Ints(i64, i64),
    Floats(f64, f64),
}

/// Strict-type numeric pairing: both operands must be the same numeric kind.
fn numeric_operands(operator: &str, left: Value, right: Value) -> Result<NumericPair, EvalError> {
    match (left, right) {
        (Value::Int(l), Value::Int(r)) => Ok(NumericPair::Ints(l, r)),
        (Value::Float(l), Value::Float(r)) => Ok(NumericPair::Floats(l, r)),
        (Value::Null, _) | (_, Value::Null) => Err(EvalError::NullOperand {
            operator: operator.to_string(),
        }),
        (left @ (Value::Int(_) | Value::Float(_)), right) => Err(EvalError::TypeMismatch {
            operator: operator.to_string(),
            expected: left.kind().to_string(),
            found: right.kind(),
        }),
        (left, _) => Err(EvalError::TypeMismatch {
            operator: operator.to_string(),
            expected: "a numeric operand".to_string(),
            found: left.kind(),
        }),
    }
}
