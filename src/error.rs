pub type TemplineResult<T> = std::result::Result<T, TemplineError>;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    UnexpectedEof {
        /// Describes what was expected, e.g., "(expected ')')"
        expected_what: String,
    },
    Expected {
        description: String,
    },
    InvalidNumber {
        literal: String,
    },
    InvalidParamIndex {
        found: String,
    },
    UnterminatedString,
    TrailingInput {
        remaining: String,
    },
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedEof { expected_what } => {
                write!(f, "Unexpected end of expression{}", expected_what)
            }
            Self::Expected { description } => {
                write!(f, "Expected {}", description)
            }
            Self::InvalidNumber { literal } => {
                write!(f, "Invalid number literal '{}'", literal)
            }
            Self::InvalidParamIndex { found } => {
                write!(f, "Invalid parameter index '?{}'", found)
            }
            Self::UnterminatedString => {
                write!(f, "Unterminated string literal")
            }
            Self::TrailingInput { remaining } => {
                write!(f, "Trailing input after expression: '{}'", remaining)
            }
        }
    }
}

impl std::error::Error for ParseErrorKind {}

impl ParseErrorKind {
    pub fn unexpected_eof(expected: Option<String>) -> Self {
        Self::UnexpectedEof {
            expected_what: expected.map_or_else(String::new, |e| format!(" (expected '{}')", e)),
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParseError {
    /// 1-indexed column within the expression text.
    pub column: usize,
    pub kind: ParseErrorKind,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error at column {}: {}", self.column, self.kind)
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CompileErrorKind {
    Expr(ParseError),
    UnknownDirective {
        keyword: String,
    },
    MismatchedCloser {
        found: String,
        expected: String,
    },
    StrayCloser {
        found: String,
    },
    ElseOutsideIf,
    DuplicateElse,
    UnterminatedBlock {
        /// "if" or "for"; the carried line is where the block was opened.
        kind: String,
    },
    ForSyntax {
        directive: String,
    },
    BadLoopVariable {
        variable: String,
    },
    UnterminatedInterpolation,
    NestedInterpolation,
    EmptyInterpolation,
}

impl std::fmt::Display for CompileErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Expr(parse_error) => {
                write!(f, "{}", parse_error)
            }
            Self::UnknownDirective { keyword } => {
                write!(f, "Unknown directive '{}'", keyword)
            }
            Self::MismatchedCloser { found, expected } => {
                write!(f, "Mismatched '{}': expected '{}'", found, expected)
            }
            Self::StrayCloser { found } => {
                write!(f, "'{}' without a matching open block", found)
            }
            Self::ElseOutsideIf => {
                write!(f, "'else' outside an if block")
            }
            Self::DuplicateElse => {
                write!(f, "Duplicate 'else' in the same if block")
            }
            Self::UnterminatedBlock { kind } => {
                write!(f, "Unterminated '{}' (missing '<%/{}%>')", kind, kind)
            }
            Self::ForSyntax { directive } => {
                write!(
                    f,
                    "Malformed directive '{}': expected 'for <variable> in <path>'",
                    directive
                )
            }
            Self::BadLoopVariable { variable } => {
                write!(f, "Loop variable '{}' must not contain '.'", variable)
            }
            Self::UnterminatedInterpolation => {
                write!(f, "Unterminated '${{' interpolation")
            }
            Self::NestedInterpolation => {
                write!(f, "Nested '${{' inside interpolation")
            }
            Self::EmptyInterpolation => {
                write!(f, "Empty '${{}}' interpolation")
            }
        }
    }
}

impl std::error::Error for CompileErrorKind {}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompileError {
    /// 1-indexed template line the error refers to. For unterminated blocks
    /// this is the line the block was opened on.
    pub line: usize,
    pub kind: CompileErrorKind,
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Template error at line {}: {}", self.line, self.kind)
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EvalError {
    TypeMismatch {
        operator: String,
        expected: String,
        found: crate::value::ValueKind,
    },
    NullOperand {
        operator: String,
    },
    InvalidValueType {
        property: String,
        found: String,
    },
    ParamOutOfRange {
        index: usize,
        len: usize,
    },
    CannotConvert {
        property: String,
        target: String,
        found: String,
    },
    CannotConvertNull {
        property: String,
        target: String,
    },
    DivisionByZero,
    NullPathSegment {
        partial: String,
    },
    MissingValue {
        path: String,
    },
    UnresolvedValue {
        path: String,
    },
    NotIterable {
        path: String,
        found: String,
    },
    LoopBind {
        variable: String,
        found: String,
    },
    InvalidPath {
        path: String,
    },
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TypeMismatch {
                operator,
                expected,
                found,
            } => {
                write!(
                    f,
                    "Type mismatch for '{}': expected {}, found {}",
                    operator, expected, found
                )
            }
            Self::NullOperand { operator } => {
                write!(f, "Null operand for '{}'", operator)
            }
            Self::InvalidValueType { property, found } => {
                write!(f, "Invalid value type for '{}': {}", property, found)
            }
            Self::ParamOutOfRange { index, len } => {
                write!(
                    f,
                    "Parameter index ?{} out of range ({} parameters supplied)",
                    index, len
                )
            }
            Self::CannotConvert {
                property,
                target,
                found,
            } => {
                write!(f, "Cannot convert '{}' to {}: {}", property, target, found)
            }
            Self::CannotConvertNull { property, target } => {
                write!(f, "Cannot convert null '{}' to {}", property, target)
            }
            Self::DivisionByZero => {
                write!(f, "Division by zero")
            }
            Self::NullPathSegment { partial } => {
                write!(f, "Null intermediate value at '{}'", partial)
            }
            Self::MissingValue { path } => {
                write!(f, "Missing value for '{}'", path)
            }
            Self::UnresolvedValue { path } => {
                write!(f, "Unresolved interpolation '${{{}}}'", path)
            }
            Self::NotIterable { path, found } => {
                write!(
                    f,
                    "Cannot iterate '{}': expected a list, found {}",
                    path, found
                )
            }
            Self::LoopBind { variable, found } => {
                write!(
                    f,
                    "Cannot bind loop variable '{}' on a {} model",
                    variable, found
                )
            }
            Self::InvalidPath { path } => {
                write!(f, "Invalid property path '{}'", path)
            }
        }
    }
}

impl std::error::Error for EvalError {}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TemplineError {
    Parse(ParseError),
    Compile(CompileError),
    Eval(EvalError),
}

impl std::fmt::Display for TemplineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(parse_error) => write!(f, "{}", parse_error),
            Self::Compile(compile_error) => write!(f, "{}", compile_error),
            Self::Eval(eval_error) => write!(f, "{}", eval_error),
        }
    }
}

impl std::error::Error for TemplineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(parse_error) => Some(parse_error),
            Self::Compile(compile_error) => Some(compile_error),
            Self::Eval(eval_error) => Some(eval_error),
        }
    }
}

impl From<ParseError> for TemplineError {
    fn from(error: ParseError) -> Self {
        Self::Parse(error)
    }
}

impl From<CompileError> for TemplineError {
    fn from(error: CompileError) -> Self {
        Self::Compile(error)
    }
}

impl From<EvalError> for TemplineError {
    fn from(error: EvalError) -> Self {
        Self::Eval(error)
    }
}
