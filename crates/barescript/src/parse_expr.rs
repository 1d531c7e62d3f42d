//! Recursive-descent parser for the expression grammar.
//!
//! Expressions appear standalone (the spreadsheet-style evaluator API) and
//! embedded in script statements; both paths share this parser. Binary
//! precedence uses the reorder rule: operands chain left-leaning, and a
//! newly seen operator splices down the right spine of its left operand
//! while the spine operator is weaker.

use crate::{
    error::ParserError,
    expressions::{BinaryOperator, Expr, FunctionCall, UnaryOperator},
};

/// Binary operator tokens, longest first so that e.g. `<<` wins over `<`.
const BINARY_OPERATORS: [(&str, BinaryOperator); 19] = [
    ("**", BinaryOperator::Exponent),
    ("<<", BinaryOperator::ShiftLeft),
    (">>", BinaryOperator::ShiftRight),
    ("<=", BinaryOperator::LessEqual),
    (">=", BinaryOperator::GreaterEqual),
    ("==", BinaryOperator::Equal),
    ("!=", BinaryOperator::NotEqual),
    ("&&", BinaryOperator::And),
    ("||", BinaryOperator::Or),
    ("*", BinaryOperator::Multiply),
    ("/", BinaryOperator::Divide),
    ("%", BinaryOperator::Modulo),
    ("+", BinaryOperator::Add),
    ("-", BinaryOperator::Subtract),
    ("<", BinaryOperator::Less),
    (">", BinaryOperator::Greater),
    ("&", BinaryOperator::BitAnd),
    ("^", BinaryOperator::BitXor),
    ("|", BinaryOperator::BitOr),
];

/// Where the expression text came from, for error positions: the enclosing
/// source line, its 1-based number, and the character offset of the
/// expression within it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ExprContext<'a> {
    pub line: &'a str,
    pub line_number: usize,
    pub column_offset: usize,
    pub script_name: Option<&'a str>,
}

impl<'a> ExprContext<'a> {
    pub(crate) fn standalone(text: &'a str) -> Self {
        Self {
            line: text,
            line_number: 1,
            column_offset: 0,
            script_name: None,
        }
    }
}

/// Parses a standalone expression.
///
/// Array literals are only recognized when `allow_array_literal` is set;
/// statement contexts enable them, the pure expression surface defaults off.
/// A trailing `#` comment is swallowed.
pub fn parse_expression(text: &str, allow_array_literal: bool) -> Result<Expr, ParserError> {
    parse_expression_text(text, ExprContext::standalone(text), allow_array_literal)
}

/// Parses `text` to its end (ignoring a trailing comment) in the given
/// source context.
pub(crate) fn parse_expression_text(
    text: &str,
    context: ExprContext<'_>,
    allow_array_literal: bool,
) -> Result<Expr, ParserError> {
    let mut parser = Parser {
        chars: text.chars().collect(),
        pos: 0,
        context,
        allow_array_literal,
    };
    let expr = parser.parse_binary()?;
    parser.skip_whitespace();
    if parser.peek() == Some('#') {
        parser.pos = parser.chars.len();
    }
    if parser.pos < parser.chars.len() {
        return Err(parser.error("Syntax error", parser.pos));
    }
    Ok(expr)
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    context: ExprContext<'a>,
    allow_array_literal: bool,
}

impl Parser<'_> {
    fn error(&self, message: &str, pos: usize) -> ParserError {
        ParserError::new(
            message,
            self.context.line,
            self.context.column_offset + pos + 1,
            self.context.line_number,
            self.context.script_name,
        )
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, token: &str) -> bool {
        let chars: Vec<char> = token.chars().collect();
        if self.chars[self.pos..].starts_with(&chars) {
            self.pos += chars.len();
            true
        } else {
            false
        }
    }

    fn parse_binary(&mut self) -> Result<Expr, ParserError> {
        let mut left = self.parse_unary()?;
        loop {
            self.skip_whitespace();
            let Some(op) = self.match_binary_operator() else {
                return Ok(left);
            };
            let right = self.parse_unary()?;
            left = combine(op, left, right);
        }
    }

    fn match_binary_operator(&mut self) -> Option<BinaryOperator> {
        for (token, op) in BINARY_OPERATORS {
            if self.eat(token) {
                return Some(op);
            }
        }
        None
    }

    fn parse_unary(&mut self) -> Result<Expr, ParserError> {
        self.skip_whitespace();
        let start = self.pos;
        let Some(ch) = self.peek() else {
            return Err(self.error("Syntax error", start));
        };
        match ch {
            '!' | '~' => {
                self.pos += 1;
                let op = if ch == '!' { UnaryOperator::Not } else { UnaryOperator::BitNot };
                let expr = self.parse_unary()?;
                Ok(Expr::Unary { op, expr: Box::new(expr) })
            }
            '-' => {
                self.pos += 1;
                let expr = self.parse_unary()?;
                Ok(Expr::Unary {
                    op: UnaryOperator::Negate,
                    expr: Box::new(expr),
                })
            }
            '(' => {
                self.pos += 1;
                let expr = self.parse_binary()?;
                self.skip_whitespace();
                if !self.eat(")") {
                    return Err(self.error("Unmatched parenthesis", start));
                }
                Ok(Expr::Group(Box::new(expr)))
            }
            '{' => {
                self.pos += 1;
                let args = self.parse_pairs('}')?;
                Ok(Expr::Function(FunctionCall {
                    name: "objectNew".to_owned(),
                    args,
                }))
            }
            '[' if self.allow_array_literal => {
                self.pos += 1;
                let args = self.parse_list(']')?;
                Ok(Expr::Function(FunctionCall {
                    name: "arrayNew".to_owned(),
                    args,
                }))
            }
            '\'' | '"' => self.parse_string(ch),
            '0'..='9' => self.parse_number(),
            '.' if matches!(self.chars.get(self.pos + 1), Some('0'..='9')) => self.parse_number(),
            'A'..='Z' | 'a'..='z' | '_' => {
                let name = self.parse_identifier();
                self.skip_whitespace();
                if self.eat("(") {
                    let args = self.parse_list(')')?;
                    Ok(Expr::Function(FunctionCall { name, args }))
                } else {
                    Ok(Expr::Variable(name))
                }
            }
            _ => Err(self.error("Syntax error", start)),
        }
    }

    fn parse_identifier(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    /// Comma-separated expressions up to `close`, which may come immediately.
    fn parse_list(&mut self, close: char) -> Result<Vec<Expr>, ParserError> {
        let open = self.pos.saturating_sub(1);
        let mut args = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(args);
            }
            if self.peek().is_none() {
                return Err(self.error("Unmatched parenthesis", open));
            }
            args.push(self.parse_binary()?);
            self.skip_whitespace();
            if self.eat(",") {
                continue;
            }
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(args);
            }
            if self.peek().is_none() {
                return Err(self.error("Unmatched parenthesis", open));
            }
            return Err(self.error("Syntax error", self.pos));
        }
    }

    /// `key: value` pairs up to `close`, flattened into the alternating
    /// argument list of `objectNew`.
    fn parse_pairs(&mut self, close: char) -> Result<Vec<Expr>, ParserError> {
        let open = self.pos.saturating_sub(1);
        let mut args = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(args);
            }
            if self.peek().is_none() {
                return Err(self.error("Unmatched parenthesis", open));
            }
            args.push(self.parse_binary()?);
            self.skip_whitespace();
            if !self.eat(":") {
                return Err(self.error("Syntax error", self.pos));
            }
            args.push(self.parse_binary()?);
            self.skip_whitespace();
            if self.eat(",") {
                continue;
            }
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(args);
            }
            if self.peek().is_none() {
                return Err(self.error("Unmatched parenthesis", open));
            }
            return Err(self.error("Syntax error", self.pos));
        }
    }

    fn parse_number(&mut self) -> Result<Expr, ParserError> {
        let start = self.pos;
        if self.eat("0x") || self.eat("0X") {
            let digits_start = self.pos;
            while self.peek().is_some_and(|ch| ch.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            let digits: String = self.chars[digits_start..self.pos].iter().collect();
            return match i64::from_str_radix(&digits, 16) {
                Ok(value) => Ok(Expr::Number(value as f64)),
                Err(_) => Err(self.error("Syntax error", start)),
            };
        }
        while self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some('.') {
            self.pos += 1;
            while self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let mark = self.pos;
            self.pos += 1;
            if matches!(self.peek(), Some('+' | '-')) {
                self.pos += 1;
            }
            if self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
                while self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
                    self.pos += 1;
                }
            } else {
                // not an exponent, e.g. the identifier in "2e" - back out
                self.pos = mark;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        match text.parse() {
            Ok(value) => Ok(Expr::Number(value)),
            Err(_) => Err(self.error("Syntax error", start)),
        }
    }

    fn parse_string(&mut self, quote: char) -> Result<Expr, ParserError> {
        let start = self.pos;
        self.pos += 1;
        let mut value = String::new();
        loop {
            let Some(ch) = self.peek() else {
                return Err(self.error("Unterminated string", start));
            };
            self.pos += 1;
            if ch == quote {
                return Ok(Expr::String(value));
            }
            if ch != '\\' {
                value.push(ch);
                continue;
            }
            let Some(escape) = self.peek() else {
                return Err(self.error("Unterminated string", start));
            };
            self.pos += 1;
            match escape {
                'n' => value.push('\n'),
                'r' => value.push('\r'),
                't' => value.push('\t'),
                'b' => value.push('\u{0008}'),
                'f' => value.push('\u{000C}'),
                'u' => {
                    let digits_start = self.pos;
                    if self.chars.len() < digits_start + 4 {
                        return Err(self.error("Syntax error", digits_start));
                    }
                    let digits: String = self.chars[digits_start..digits_start + 4].iter().collect();
                    let code = u32::from_str_radix(&digits, 16)
                        .ok()
                        .and_then(char::from_u32)
                        .ok_or_else(|| self.error("Syntax error", digits_start))?;
                    value.push(code);
                    self.pos += 4;
                }
                // unknown escapes keep the escaped character
                other => value.push(other),
            }
        }
    }
}

/// Splices `right` under `op` into the left-leaning chain `left`,
/// descending the right spine while the spine operator is weaker.
fn combine(op: BinaryOperator, left: Expr, right: Expr) -> Expr {
    if let Expr::Binary {
        op: left_op,
        left: left_left,
        right: left_right,
    } = left
    {
        if left_op.is_weaker(op) {
            return Expr::Binary {
                op: left_op,
                left: left_left,
                right: Box::new(combine(op, *left_right, right)),
            };
        }
        return Expr::Binary {
            op,
            left: Box::new(Expr::Binary {
                op: left_op,
                left: left_left,
                right: left_right,
            }),
            right: Box::new(right),
        };
    }
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[test]
    fn literals() {
        assert_eq!(parse_expression("7", false).unwrap(), Expr::Number(7.0));
        assert_eq!(parse_expression("3.25e2", false).unwrap(), Expr::Number(325.0));
        assert_eq!(parse_expression("0xff", false).unwrap(), Expr::Number(255.0));
        assert_eq!(parse_expression("'it\\'s'", false).unwrap(), Expr::String("it's".to_owned()));
        assert_eq!(
            parse_expression("\"a\\u00e9b\"", false).unwrap(),
            Expr::String("a\u{e9}b".to_owned())
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            parse_expression(r"'a\n\t\\\'b'", false).unwrap(),
            Expr::String("a\n\t\\'b".to_owned())
        );
    }

    #[test]
    fn precedence_reorders_multiplication() {
        let expr = parse_expression("1 + 2 * 3", false).unwrap();
        assert_eq!(
            expr,
            binary(
                BinaryOperator::Add,
                Expr::Number(1.0),
                binary(BinaryOperator::Multiply, Expr::Number(2.0), Expr::Number(3.0)),
            )
        );
    }

    #[test]
    fn same_level_is_left_associative() {
        let expr = parse_expression("1 - 2 - 3", false).unwrap();
        assert_eq!(
            expr,
            binary(
                BinaryOperator::Subtract,
                binary(BinaryOperator::Subtract, Expr::Number(1.0), Expr::Number(2.0)),
                Expr::Number(3.0),
            )
        );
    }

    #[test]
    fn comparison_binds_looser_than_arithmetic() {
        let expr = parse_expression("a + 1 <= b * 2", false).unwrap();
        let Expr::Binary { op, .. } = &expr else {
            panic!("expected binary, got {expr:?}");
        };
        assert_eq!(*op, BinaryOperator::LessEqual);
    }

    #[test]
    fn group_resets_precedence() {
        let expr = parse_expression("(1 + 2) * 3", false).unwrap();
        let Expr::Binary { op, left, .. } = &expr else {
            panic!("expected binary, got {expr:?}");
        };
        assert_eq!(*op, BinaryOperator::Multiply);
        assert!(matches!(**left, Expr::Group(_)));
    }

    #[test]
    fn function_calls_and_variables() {
        let expr = parse_expression("max(a, b + 1)", false).unwrap();
        let Expr::Function(call) = expr else {
            panic!("expected call");
        };
        assert_eq!(call.name, "max");
        assert_eq!(call.args.len(), 2);
        assert_eq!(call.args[0], Expr::Variable("a".to_owned()));
    }

    #[test]
    fn object_literal_desugars_to_object_new() {
        let expr = parse_expression("{'a': 1, 'b': 2}", false).unwrap();
        let Expr::Function(call) = expr else {
            panic!("expected call");
        };
        assert_eq!(call.name, "objectNew");
        assert_eq!(
            call.args,
            vec![
                Expr::String("a".to_owned()),
                Expr::Number(1.0),
                Expr::String("b".to_owned()),
                Expr::Number(2.0),
            ]
        );
    }

    #[test]
    fn array_literal_requires_opt_in() {
        let expr = parse_expression("[1, 2]", true).unwrap();
        let Expr::Function(call) = expr else {
            panic!("expected call");
        };
        assert_eq!(call.name, "arrayNew");
        assert_eq!(call.args, vec![Expr::Number(1.0), Expr::Number(2.0)]);
        assert!(parse_expression("[1, 2]", false).is_err());
    }

    #[test]
    fn trailing_comment_is_swallowed() {
        assert_eq!(
            parse_expression("1 + 2  # sum", false).unwrap(),
            parse_expression("1 + 2", false).unwrap()
        );
    }

    #[test]
    fn error_positions() {
        let error = parse_expression("1 + $", false).unwrap_err();
        assert_eq!(error.column_number, 5);
        assert_eq!(error.error, "Syntax error");
        let error = parse_expression("(1 + 2", false).unwrap_err();
        assert_eq!(error.error, "Unmatched parenthesis");
        assert_eq!(error.column_number, 1);
        let error = parse_expression("'abc", false).unwrap_err();
        assert_eq!(error.error, "Unterminated string");
    }

    #[test]
    fn trailing_garbage_is_an_error() {
        let error = parse_expression("1 + 2 :", false).unwrap_err();
        assert_eq!(error.error, "Syntax error");
        assert_eq!(error.column_number, 7);
    }
}
