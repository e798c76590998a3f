use crate::ast::Expression;
use crate::error::{CompileError, CompileErrorKind, TemplineResult};

/// One deferred output step of a compiled template.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Action {
    /// Emit literal text verbatim.
    Literal(String),
    /// Resolve a property path and emit its natural string form.
    Interpolate(String),
    /// Emit the executor's configured line terminator.
    EndLine,
    /// Replay a nested block.
    Block(Block),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Block {
    If {
        condition: Expression,
        then_actions: Vec<Action>,
        else_actions: Vec<Action>,
        has_else: bool,
    },
    For {
        variable: String,
        list_path: String,
        body: Vec<Action>,
    },
}

/// A compiled template: the outer block's ordered action list.
///
/// Compilation is a single pass over the source lines with a local stack of
/// open blocks; the result is immutable and can back any number of
/// concurrent renders.
///
/// # Examples
///
/// ```
/// use templine::{CompiledTemplate, Model, Renderer};
///
/// let template = CompiledTemplate::compile("Hello, ${name}!").unwrap();
/// let model = [("name".to_string(), Model::from("World"))]
///     .into_iter()
///     .collect::<Model>();
/// let output = Renderer::new().render(&template, &model).unwrap();
/// assert_eq!(output, "Hello, World!\n");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTemplate {
    pub(crate) actions: Vec<Action>,
}

/// An open `if` or `for` awaiting its closer. The outer block is not a
/// frame; it lives in a plain local of the compile call.
enum Frame {
    If {
        line: usize,
        condition: Expression,
        then_actions: Vec<Action>,
        else_actions: Vec<Action>,
        in_else: bool,
    },
    For {
        line: usize,
        variable: String,
        list_path: String,
        body: Vec<Action>,
    },
}

impl Frame {
    fn actions_mut(&mut self) -> &mut Vec<Action> {
        match self {
            Self::If {
                then_actions,
                else_actions,
                in_else,
                ..
            } => {
                if *in_else {
                    else_actions
                } else {
                    then_actions
                }
            }
            Self::For { body, .. } => body,
        }
    }
}

fn current_actions<'a>(
    outer: &'a mut Vec<Action>,
    stack: &'a mut Vec<Frame>,
) -> &'a mut Vec<Action> {
    match stack.last_mut() {
        Some(frame) => frame.actions_mut(),
        None => outer,
    }
}

fn error(line: usize, kind: CompileErrorKind) -> CompileError {
    CompileError { line, kind }
}

impl CompiledTemplate {
    /// Compiles template source, splitting it into lines on `'\n'` (a
    /// trailing `'\r'` per line is tolerated).
    ///
    /// # Errors
    /// - On any structural error; the error names the offending 1-indexed
    ///   line.
    pub fn compile(source: &str) -> TemplineResult<Self> {
        let mut lines: Vec<&str> = source.split('\n').collect();
        // A trailing newline terminates the last line rather than opening an
        // empty one.
        if source.ends_with('\n') {
            lines.pop();
        }
        Self::compile_lines(lines)
    }

    /// Compiles an already-split sequence of source lines.
    pub fn compile_lines<I, S>(lines: I) -> TemplineResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut outer: Vec<Action> = Vec::new();
        let mut stack: Vec<Frame> = Vec::new();
        let mut line_no = 0_usize;

        for line in lines {
            line_no += 1;
            let line = line.as_ref();
            let line = line.strip_suffix('\r').unwrap_or(line);
            match directive_text(line) {
                Some(directive) => {
                    compile_directive(directive, line_no, &mut outer, &mut stack)?;
                }
                None => {
                    compile_content_line(line, line_no, current_actions(&mut outer, &mut stack))?;
                }
            }
        }

        match stack.last() {
            Some(Frame::If { line, .. }) => Err(error(
                *line,
                CompileErrorKind::UnterminatedBlock {
                    kind: "if".to_string(),
                },
            )
            .into()),
            Some(Frame::For { line, .. }) => Err(error(
                *line,
                CompileErrorKind::UnterminatedBlock {
                    kind: "for".to_string(),
                },
            )
            .into()),
            None => Ok(Self { actions: outer }),
        }
    }
}

/// True when the directive starts with `keyword` followed by whitespace or
/// nothing (so `iffy` is not an `if`).
fn directive_keyword(directive: &str, keyword: &str) -> bool {
    match directive.strip_prefix(keyword) {
        Some(rest) => rest.is_empty() || rest.starts_with(char::is_whitespace),
        None => false,
    }
}

/// Returns the trimmed directive text when the `<%`/`%>` markers span the
/// whole line, `None` for content lines.
fn directive_text(line: &str) -> Option<&str> {
    if line.len() >= 4 && line.starts_with("<%") && line.ends_with("%>") {
        Some(line[2..line.len() - 2].trim())
    } else {
        None
    }
}

fn compile_directive(
    directive: &str,
    line: usize,
    outer: &mut Vec<Action>,
    stack: &mut Vec<Frame>,
) -> TemplineResult<()> {
    if directive_keyword(directive, "if") {
        let root = crate::parser::parse_expression(directive["if".len()..].trim())
            .map_err(|parse_error| error(line, CompileErrorKind::Expr(parse_error)))?;
        stack.push(Frame::If {
            line,
            condition: Expression { root },
            then_actions: Vec::new(),
            else_actions: Vec::new(),
            in_else: false,
        });
        return Ok(());
    }

    if directive == "else" {
        return match stack.last_mut() {
            Some(Frame::If { in_else, .. }) => {
                if *in_else {
                    Err(error(line, CompileErrorKind::DuplicateElse).into())
                } else {
                    *in_else = true;
                    Ok(())
                }
            }
            Some(Frame::For { .. }) | None => {
                Err(error(line, CompileErrorKind::ElseOutsideIf).into())
            }
        };
    }

    if directive == "/if" {
        return match stack.pop() {
            Some(Frame::If {
                condition,
                then_actions,
                else_actions,
                in_else,
                ..
            }) => {
                current_actions(outer, stack).push(Action::Block(Block::If {
                    condition,
                    then_actions,
                    else_actions,
                    has_else: in_else,
                }));
                Ok(())
            }
            Some(frame @ Frame::For { .. }) => {
                stack.push(frame);
                Err(error(
                    line,
                    CompileErrorKind::MismatchedCloser {
                        found: "/if".to_string(),
                        expected: "/for".to_string(),
                    },
                )
                .into())
            }
            None => Err(error(
                line,
                CompileErrorKind::StrayCloser {
                    found: "/if".to_string(),
                },
            )
            .into()),
        };
    }

    if directive_keyword(directive, "for") {
        let mut words = directive["for".len()..].split_whitespace();
        let (variable, list_path) = match (words.next(), words.next(), words.next(), words.next()) {
            (Some(variable), Some("in"), Some(list_path), None) => (variable, list_path),
            _ => {
                return Err(error(
                    line,
                    CompileErrorKind::ForSyntax {
                        directive: directive.to_string(),
                    },
                )
                .into());
            }
        };
        if variable.contains('.') {
            return Err(error(
                line,
                CompileErrorKind::BadLoopVariable {
                    variable: variable.to_string(),
                },
            )
            .into());
        }
        stack.push(Frame::For {
            line,
            variable: variable.to_string(),
            list_path: list_path.to_string(),
            body: Vec::new(),
        });
        return Ok(());
    }

    if directive == "/for" {
        return match stack.pop() {
            Some(Frame::For {
                variable,
                list_path,
                body,
                ..
            }) => {
                current_actions(outer, stack).push(Action::Block(Block::For {
                    variable,
                    list_path,
                    body,
                }));
                Ok(())
            }
            Some(frame @ Frame::If { .. }) => {
                stack.push(frame);
                Err(error(
                    line,
                    CompileErrorKind::MismatchedCloser {
                        found: "/for".to_string(),
                        expected: "/if".to_string(),
                    },
                )
                .into())
            }
            None => Err(error(
                line,
                CompileErrorKind::StrayCloser {
                    found: "/for".to_string(),
                },
            )
            .into()),
        };
    }

    let keyword = directive.split_whitespace().next().unwrap_or(directive);
    Err(error(
        line,
        CompileErrorKind::UnknownDirective {
            keyword: keyword.to_string(),
        },
    )
    .into())
}

/// Compiles one literal/interpolation line into actions, ending with the
/// end-of-line marker.
fn compile_content_line(
    line: &str,
    line_no: usize,
    actions: &mut Vec<Action>,
) -> TemplineResult<()> {
    let mut rest = line;
    loop {
        let Some(start) = rest.find("${") else {
            if !rest.is_empty() {
                actions.push(Action::Literal(rest.to_string()));
            }
            break;
        };
        if start > 0 {
            actions.push(Action::Literal(rest[..start].to_string()));
        }
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            return Err(error(line_no, CompileErrorKind::UnterminatedInterpolation).into());
        };
        let inner = &after[..end];
        if inner.contains("${") {
            return Err(error(line_no, CompileErrorKind::NestedInterpolation).into());
        }
        let path = inner.trim();
        if path.is_empty() {
            return Err(error(line_no, CompileErrorKind::EmptyInterpolation).into());
        }
        actions.push(Action::Interpolate(path.to_string()));
        rest = &after[end + 1..];
    }
    actions.push(Action::EndLine);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TemplineError;

    fn compile_err(source: &str) -> CompileError {
        match CompiledTemplate::compile(source) {
            Err(TemplineError::Compile(e)) => e,
            other => panic!("Expected a compile error, got {:?}", other),
        }
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_plain_line() {
        let template = CompiledTemplate::compile("Hello").unwrap();
        assert_eq!(
            template.actions,
            vec![Action::Literal("Hello".to_string()), Action::EndLine]
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_empty_line_is_just_a_terminator() {
        let template = CompiledTemplate::compile("").unwrap();
        assert_eq!(template.actions, vec![Action::EndLine]);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_trailing_newline_does_not_open_a_line() {
        let template = CompiledTemplate::compile("a\n").unwrap();
        assert_eq!(
            template.actions,
            vec![Action::Literal("a".to_string()), Action::EndLine]
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_crlf_lines() {
        let template = CompiledTemplate::compile("a\r\nb").unwrap();
        assert_eq!(
            template.actions,
            vec![
                Action::Literal("a".to_string()),
                Action::EndLine,
                Action::Literal("b".to_string()),
                Action::EndLine,
            ]
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_interpolation_split() {
        let template = CompiledTemplate::compile("Hello ${name}!").unwrap();
        assert_eq!(
            template.actions,
            vec![
                Action::Literal("Hello ".to_string()),
                Action::Interpolate("name".to_string()),
                Action::Literal("!".to_string()),
                Action::EndLine,
            ]
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_interpolation_path_is_trimmed() {
        let template = CompiledTemplate::compile("${ user.name }").unwrap();
        assert_eq!(
            template.actions,
            vec![
                Action::Interpolate("user.name".to_string()),
                Action::EndLine
            ]
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_directive_must_span_the_line() {
        // A directive marker inside a content line stays literal.
        let template = CompiledTemplate::compile("a <%if x%> b").unwrap();
        assert_eq!(
            template.actions,
            vec![Action::Literal("a <%if x%> b".to_string()), Action::EndLine]
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_if_block_shape() {
        let template = CompiledTemplate::compile("<%if x%>\nA\n<%else%>\nB\n<%/if%>").unwrap();
        assert_eq!(template.actions.len(), 1);
        match &template.actions[0] {
            Action::Block(Block::If {
                then_actions,
                else_actions,
                has_else,
                ..
            }) => {
                assert!(*has_else, "else branch should be recorded");
                assert_eq!(
                    *then_actions,
                    vec![Action::Literal("A".to_string()), Action::EndLine]
                );
                assert_eq!(
                    *else_actions,
                    vec![Action::Literal("B".to_string()), Action::EndLine]
                );
            }
            other => panic!("Expected an if block, got {:?}", other),
        }
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_for_block_shape() {
        let template = CompiledTemplate::compile("<%for item in items%>\n${item}\n<%/for%>").unwrap();
        assert_eq!(template.actions.len(), 1);
        match &template.actions[0] {
            Action::Block(Block::For {
                variable,
                list_path,
                body,
            }) => {
                assert_eq!(variable, "item");
                assert_eq!(list_path, "items");
                assert_eq!(
                    *body,
                    vec![Action::Interpolate("item".to_string()), Action::EndLine]
                );
            }
            other => panic!("Expected a for block, got {:?}", other),
        }
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_directive_whitespace_tolerance() {
        assert!(CompiledTemplate::compile("<%  if x  %>\n<% /if %>").is_ok());
        assert!(CompiledTemplate::compile("<% for x in items %>\n<% /for %>").is_ok());
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_stray_if_closer_names_the_line() {
        let err = compile_err("text\n<%/if%>");
        assert_eq!(err.line, 2);
        assert!(
            matches!(err.kind, CompileErrorKind::StrayCloser { ref found } if found == "/if")
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_mismatched_closers() {
        let err = compile_err("<%for x in items%>\n<%/if%>");
        assert_eq!(err.line, 2);
        assert!(
            matches!(err.kind, CompileErrorKind::MismatchedCloser { ref found, ref expected } if found == "/if" && expected == "/for")
        );

        let err = compile_err("<%if x%>\n<%/for%>");
        assert_eq!(err.line, 2);
        assert!(
            matches!(err.kind, CompileErrorKind::MismatchedCloser { ref found, ref expected } if found == "/for" && expected == "/if")
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_else_misuse() {
        let err = compile_err("<%else%>");
        assert_eq!(err.line, 1);
        assert!(matches!(err.kind, CompileErrorKind::ElseOutsideIf));

        let err = compile_err("<%for x in items%>\n<%else%>\n<%/for%>");
        assert_eq!(err.line, 2);
        assert!(matches!(err.kind, CompileErrorKind::ElseOutsideIf));

        let err = compile_err("<%if x%>\n<%else%>\n<%else%>\n<%/if%>");
        assert_eq!(err.line, 3);
        assert!(matches!(err.kind, CompileErrorKind::DuplicateElse));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_unterminated_block_names_opening_line() {
        let err = compile_err("line one\n<%if x%>\nbody");
        assert_eq!(err.line, 2);
        assert!(matches!(err.kind, CompileErrorKind::UnterminatedBlock { ref kind } if kind == "if"));

        let err = compile_err("<%for x in items%>");
        assert_eq!(err.line, 1);
        assert!(matches!(err.kind, CompileErrorKind::UnterminatedBlock { ref kind } if kind == "for"));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_innermost_unterminated_block_reported() {
        let err = compile_err("<%if x%>\n<%for y in items%>");
        assert_eq!(err.line, 2);
        assert!(matches!(err.kind, CompileErrorKind::UnterminatedBlock { ref kind } if kind == "for"));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_bad_if_expression_is_wrapped() {
        let err = compile_err("a\n<%if %>\n<%/if%>");
        assert_eq!(err.line, 2);
        assert!(matches!(err.kind, CompileErrorKind::Expr(_)));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_for_syntax_errors() {
        let err = compile_err("<%for item items%>\n<%/for%>");
        assert_eq!(err.line, 1);
        assert!(matches!(err.kind, CompileErrorKind::ForSyntax { .. }));

        let err = compile_err("<%for item in%>\n<%/for%>");
        assert!(matches!(err.kind, CompileErrorKind::ForSyntax { .. }));

        let err = compile_err("<%for a.b in items%>\n<%/for%>");
        assert!(
            matches!(err.kind, CompileErrorKind::BadLoopVariable { ref variable } if variable == "a.b")
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_unknown_directive() {
        let err = compile_err("<%while x%>");
        assert_eq!(err.line, 1);
        assert!(
            matches!(err.kind, CompileErrorKind::UnknownDirective { ref keyword } if keyword == "while")
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_interpolation_errors() {
        let err = compile_err("before\n${unterminated");
        assert_eq!(err.line, 2);
        assert!(matches!(err.kind, CompileErrorKind::UnterminatedInterpolation));

        let err = compile_err("${a${b}");
        assert_eq!(err.line, 1);
        assert!(matches!(err.kind, CompileErrorKind::NestedInterpolation));

        let err = compile_err("${}");
        assert!(matches!(err.kind, CompileErrorKind::EmptyInterpolation));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_nested_blocks_compile() {
        let source = "<%for user in users%>\n<%if user.active%>\n${user.name}\n<%/if%>\n<%/for%>";
        let template = CompiledTemplate::compile(source).unwrap();
        assert_eq!(template.actions.len(), 1);
        let Action::Block(Block::For { body, .. }) = &template.actions[0] else {
            panic!("Expected a for block");
        };
        assert!(matches!(body[0], Action::Block(Block::If { .. })));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_compile_lines_matches_compile() {
        let from_source = CompiledTemplate::compile("a\nb").unwrap();
        let from_lines = CompiledTemplate::compile_lines(["a", "b"]).unwrap();
        assert_eq!(from_source, from_lines);
    }
}
