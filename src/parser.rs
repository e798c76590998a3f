use crate::ast::{
    AddExpr, AddOp, AndExpr, EqualityExpr, EqualityOp, MultiplyExpr, MultiplyOp, OrExpr,
    RelationalExpr, RelationalOp, UnaryExpr, UnaryOp, ValueExpr,
};
use crate::error::{ParseError, ParseErrorKind};

type ParseResult<T> = Result<T, ParseError>;

/// Single-pass recursive-descent parser over one expression string.
///
/// Expressions are always a single line (they come from `<%if ...%>`
/// directives or standalone strings), so diagnostics carry a column only.
struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Parser { input, pos: 0 }
    }

    #[inline]
    fn current_column(&self) -> usize {
        self.pos + 1
    }

    #[inline]
    fn make_error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError {
            column: self.current_column(),
            kind,
        }
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Peek if the remaining input starts with `s`
    fn peek(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    /// Consume `s` if the remaining input starts with it.
    fn consume(&mut self, s: &str) -> bool {
        if self.peek(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn consume_whitespace(&mut self) {
        while !self.eof() {
            let current_char = match self.input[self.pos..].chars().next() {
                Some(c) if c.is_ascii_whitespace() => c,
                _ => break,
            };
            self.pos += current_char.len_utf8();
        }
    }

    /// Expect `s` to be the start of the remaining input, consume it or return Err.
    fn expect(&mut self, s: &str) -> ParseResult<()> {
        if self.consume(s) {
            Ok(())
        } else if self.eof() {
            Err(self.make_error(ParseErrorKind::unexpected_eof(Some(s.to_string()))))
        } else {
            Err(self.make_error(ParseErrorKind::Expected {
                description: format!(
                    "'{}', found '{}'",
                    s,
                    &self.input[self.pos..std::cmp::min(self.pos + s.len() + 10, self.input.len())]
                ),
            }))
        }
    }

    /// Peek for a keyword that must not run into a following identifier.
    fn peek_keyword(&self, keyword: &str) -> bool {
        if !self.peek(keyword) {
            return false;
        }
        match self.input[self.pos + keyword.len()..].chars().next() {
            Some(c) => !is_identifier_char(c),
            None => true,
        }
    }

    /// Consume and return an identifier path (alphanumeric + '_' + '.').
    fn consume_identifier(&mut self) -> ParseResult<&'a str> {
        let start = self.pos;
        while !self.eof() {
            let current_char = match self.input[self.pos..].chars().next() {
                Some(c) if is_identifier_char(c) => c,
                _ => break,
            };
            self.pos += current_char.len_utf8();
        }
        if start == self.pos {
            Err(self.make_error(ParseErrorKind::Expected {
                description: "identifier".to_string(),
            }))
        } else {
            Ok(&self.input[start..self.pos])
        }
    }

    // --- Precedence ladder, low to high ---

    fn parse_or(&mut self) -> ParseResult<OrExpr> {
        let mut ands = vec![self.parse_and()?];
        loop {
            self.consume_whitespace();
            if self.consume("||") {
                ands.push(self.parse_and()?);
            } else {
                break;
            }
        }
        Ok(OrExpr { ands })
    }

    fn parse_and(&mut self) -> ParseResult<AndExpr> {
        let mut terms = vec![self.parse_equality()?];
        loop {
            self.consume_whitespace();
            if self.consume("&&") {
                terms.push(self.parse_equality()?);
            } else {
                break;
            }
        }
        Ok(AndExpr { terms })
    }

    fn parse_equality(&mut self) -> ParseResult<EqualityExpr> {
        let left = self.parse_relational()?;
        self.consume_whitespace();
        let op = if self.consume("==") {
            Some(EqualityOp::Eq)
        } else if self.consume("!=") {
            Some(EqualityOp::Ne)
        } else {
            None
        };
        let op_right = match op {
            Some(op) => Some((op, self.parse_relational()?)),
            None => None,
        };
        Ok(EqualityExpr { left, op_right })
    }

    fn parse_relational(&mut self) -> ParseResult<RelationalExpr> {
        let left = self.parse_add()?;
        self.consume_whitespace();
        let op = if self.consume(">=") {
            Some(RelationalOp::Ge)
        } else if self.consume("<=") {
            Some(RelationalOp::Le)
        } else if self.consume(">") {
            Some(RelationalOp::Gt)
        } else if self.consume("<") {
            Some(RelationalOp::Lt)
        } else {
            None
        };
        let op_right = match op {
            Some(op) => Some((op, self.parse_add()?)),
            None => None,
        };
        Ok(RelationalExpr { left, op_right })
    }

    fn parse_add(&mut self) -> ParseResult<AddExpr> {
        let first = self.parse_multiply()?;
        let mut rest = Vec::new();
        loop {
            self.consume_whitespace();
            let op = if self.consume("+") {
                AddOp::Plus
            } else if self.consume("-") {
                AddOp::Minus
            } else {
                break;
            };
            rest.push((op, self.parse_multiply()?));
        }
        Ok(AddExpr { first, rest })
    }

    fn parse_multiply(&mut self) -> ParseResult<MultiplyExpr> {
        let left = self.parse_unary()?;
        self.consume_whitespace();
        let op = if self.consume("*") {
            Some(MultiplyOp::Mul)
        } else if self.consume("/") {
            Some(MultiplyOp::Div)
        } else if self.consume("%") {
            Some(MultiplyOp::Mod)
        } else {
            None
        };
        let op_right = match op {
            Some(op) => Some((op, self.parse_unary()?)),
            None => None,
        };
        Ok(MultiplyExpr { left, op_right })
    }

    fn parse_unary(&mut self) -> ParseResult<UnaryExpr> {
        self.consume_whitespace();
        let op = if self.consume("!") {
            Some(UnaryOp::Not)
        } else if self.consume("-") {
            Some(UnaryOp::Minus)
        } else if self.peek_keyword("empty") {
            self.pos += "empty".len();
            Some(UnaryOp::Empty)
        } else {
            None
        };
        let value = self.parse_value()?;
        Ok(UnaryExpr { op, value })
    }

    fn parse_value(&mut self) -> ParseResult<ValueExpr> {
        self.consume_whitespace();
        if self.eof() {
            return Err(self.make_error(ParseErrorKind::unexpected_eof(Some("value".to_string()))));
        }

        if self.consume("(") {
            let inner = self.parse_or()?;
            self.consume_whitespace();
            self.expect(")")?;
            return Ok(ValueExpr::Nested(Box::new(inner)));
        }
        if self.consume("'") {
            return self.parse_string_tail();
        }
        if self.consume("?") {
            return self.parse_param_index();
        }
        if self.peek_keyword("true") {
            self.pos += "true".len();
            return Ok(ValueExpr::Bool(true));
        }
        if self.peek_keyword("false") {
            self.pos += "false".len();
            return Ok(ValueExpr::Bool(false));
        }
        if self.peek_keyword("null") {
            self.pos += "null".len();
            return Ok(ValueExpr::Null);
        }

        let current_char = self.input[self.pos..]
            .chars()
            .next()
            .unwrap_or_default();
        if current_char.is_ascii_digit() {
            return self.parse_number();
        }
        if current_char.is_ascii_alphabetic() || current_char == '_' {
            let path = self.consume_identifier()?;
            return Ok(ValueExpr::Variable(path.to_string()));
        }

        Err(self.make_error(ParseErrorKind::Expected {
            description: format!("a value, found '{}'", current_char),
        }))
    }

    /// Called with the opening quote already consumed. A doubled quote
    /// escapes a literal quote.
    fn parse_string_tail(&mut self) -> ParseResult<ValueExpr> {
        let mut data = String::new();
        loop {
            if self.eof() {
                return Err(self.make_error(ParseErrorKind::UnterminatedString));
            }
            if self.consume("'") {
                if self.consume("'") {
                    data.push('\'');
                    continue;
                }
                return Ok(ValueExpr::Str(data));
            }
            let current_char = match self.input[self.pos..].chars().next() {
                Some(c) => c,
                None => return Err(self.make_error(ParseErrorKind::UnterminatedString)),
            };
            data.push(current_char);
            self.pos += current_char.len_utf8();
        }
    }

    /// Called with the '?' already consumed.
    fn parse_param_index(&mut self) -> ParseResult<ValueExpr> {
        let start = self.pos;
        while !self.eof() && self.input.as_bytes()[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        let digits = &self.input[start..self.pos];
        digits
            .parse::<usize>()
            .map(ValueExpr::Param)
            .map_err(|_| {
                self.make_error(ParseErrorKind::InvalidParamIndex {
                    found: digits.to_string(),
                })
            })
    }

    fn parse_number(&mut self) -> ParseResult<ValueExpr> {
        let start = self.pos;
        while !self.eof() && self.input.as_bytes()[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        // A '.' makes this a double, but only when digits follow; otherwise
        // the dot belongs to whatever comes next.
        let is_float = self.peek(".")
            && self.input[self.pos + 1..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_digit());
        if is_float {
            self.pos += 1;
            while !self.eof() && self.input.as_bytes()[self.pos].is_ascii_digit() {
                self.pos += 1;
            }
        }
        let literal = &self.input[start..self.pos];
        if is_float {
            literal
                .parse::<f64>()
                .map(ValueExpr::Float)
                .map_err(|_| {
                    self.make_error(ParseErrorKind::InvalidNumber {
                        literal: literal.to_string(),
                    })
                })
        } else {
            literal
                .parse::<i64>()
                .map(ValueExpr::Int)
                .map_err(|_| {
                    self.make_error(ParseErrorKind::InvalidNumber {
                        literal: literal.to_string(),
                    })
                })
        }
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

pub(crate) fn parse_expression(input: &str) -> Result<OrExpr, ParseError> {
    let mut parser = Parser::new(input);
    let root = parser.parse_or()?;
    parser.consume_whitespace();
    if !parser.eof() {
        return Err(parser.make_error(ParseErrorKind::TrailingInput {
            remaining: parser.input[parser.pos..].to_string(),
        }));
    }
    Ok(root)
}
