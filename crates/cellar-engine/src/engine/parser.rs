//! Formula tokenizer and recursive-descent parser.
//!
//! The input is the expression text after the leading `=`. Tokenizing is a
//! separate pass so that references inside string literals are never treated
//! as cell references.
//!
//! Precedence (lowest to highest):
//! 1. Concatenation: `&`
//! 2. Addition/Subtraction: `+`, `-`
//! 3. Multiplication/Division: `*`, `/`
//! 4. Unary: `-`, `+`
//! 5. Exponentiation: `^` (right associative)
//! 6. Primary: literals, references, ranges, function calls, parentheses

use super::ast::{BinaryOperator, Expr, UnaryOperator};
use super::cell_ref::{CellRef, is_address};
use crate::builtins::Function;
use crate::error::{EngineError, Result};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    Text(String),
    /// Function name (an identifier directly followed by `(`)
    Ident(String),
    CellRef(CellRef),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Ampersand,
    Colon,
    Comma,
    LeftParen,
    RightParen,
}

/// Split expression text into tokens.
pub(crate) fn tokenize(input: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '^' => Some(Token::Caret),
            '&' => Some(Token::Ampersand),
            ':' => Some(Token::Colon),
            ',' => Some(Token::Comma),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            _ => None,
        };
        if let Some(token) = single {
            tokens.push(token);
            i += 1;
            continue;
        }

        if c == '"' {
            let (text, next) = scan_string(&chars, i)?;
            tokens.push(Token::Text(text));
            i = next;
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(char::is_ascii_digit)) {
            let (number, next) = scan_number(&chars, i)?;
            tokens.push(Token::Number(number));
            i = next;
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();

            // A name followed by '(' is a function call, even if it looks like a reference.
            let next_non_space = chars[i..].iter().find(|c| !c.is_whitespace());
            if next_non_space == Some(&'(') {
                tokens.push(Token::Ident(word));
            } else if is_address(&word) {
                tokens.push(Token::CellRef(CellRef::parse(&word)?));
            } else {
                return Err(EngineError::Parse(format!("unexpected name '{}'", word)));
            }
            continue;
        }

        return Err(EngineError::Parse(format!("unexpected character '{}'", c)));
    }

    Ok(tokens)
}

/// Scan a `"..."` literal starting at `start`; `""` inside is an escaped quote.
fn scan_string(chars: &[char], start: usize) -> Result<(String, usize)> {
    let mut text = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        if chars[i] == '"' {
            if chars.get(i + 1) == Some(&'"') {
                text.push('"');
                i += 2;
                continue;
            }
            return Ok((text, i + 1));
        }
        text.push(chars[i]);
        i += 1;
    }
    Err(EngineError::Parse("unterminated string literal".into()))
}

fn scan_number(chars: &[char], start: usize) -> Result<(f64, usize)> {
    let mut i = start;
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    if chars.get(i) == Some(&'.') {
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
    }
    if matches!(chars.get(i), Some('e') | Some('E')) {
        i += 1;
        if matches!(chars.get(i), Some('+') | Some('-')) {
            i += 1;
        }
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
    }

    let text: String = chars[start..i].iter().collect();
    let number = text
        .parse::<f64>()
        .map_err(|_| EngineError::Parse(format!("malformed number '{}'", text)))?;
    Ok((number, i))
}

/// Deepest tree a formula may produce, and deepest nesting of parentheses,
/// calls and unary operators the parser will follow.
pub const MAX_DEPTH: usize = 256;

/// An expression and the height of its tree.
type Node = (Expr, usize);

fn too_deep() -> EngineError {
    EngineError::Parse("formula nested too deeply".into())
}

/// Parse expression text (without the leading `=`) into a syntax tree.
///
/// Trees deeper than [`MAX_DEPTH`] are rejected, so evaluating and walking a
/// parsed formula never recurses further than that.
pub fn parse_expression(input: &str) -> Result<Expr> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        nesting: 0,
    };
    let (expr, _) = parser.parse_concat()?;
    if let Some(token) = parser.peek() {
        return Err(EngineError::Parse(format!(
            "unexpected {:?} after expression",
            token
        )));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Current recursion depth through parentheses, calls and unary operators
    nesting: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(EngineError::Parse(format!(
                "expected {:?}, found {:?}",
                expected,
                self.peek()
            )))
        }
    }

    /// Run `parse` one nesting level deeper.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.nesting >= MAX_DEPTH {
            return Err(too_deep());
        }
        self.nesting += 1;
        let result = parse(self);
        self.nesting -= 1;
        result
    }

    fn parse_concat(&mut self) -> Result<Node> {
        let mut left = self.parse_additive()?;
        while self.eat(&Token::Ampersand) {
            let right = self.parse_additive()?;
            left = binary(BinaryOperator::Concat, left, right)?;
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Node> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOperator::Add,
                Some(Token::Minus) => BinaryOperator::Subtract,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right)?;
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Node> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOperator::Multiply,
                Some(Token::Slash) => BinaryOperator::Divide,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = binary(op, left, right)?;
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Node> {
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOperator::Negate,
            Some(Token::Plus) => UnaryOperator::Plus,
            _ => return self.parse_power(),
        };
        self.pos += 1;
        let (operand, height) = self.nested(Self::parse_unary)?;
        Ok((
            Expr::Unary {
                op,
                operand: Box::new(operand),
            },
            grow(height)?,
        ))
    }

    fn parse_power(&mut self) -> Result<Node> {
        let base = self.parse_primary()?;
        if self.eat(&Token::Caret) {
            // Right associative, and the exponent may carry its own sign.
            let exponent = self.nested(Self::parse_unary)?;
            return binary(BinaryOperator::Power, base, exponent);
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Node> {
        match self.next() {
            Some(Token::Number(n)) => Ok((Expr::Number(n), 1)),
            Some(Token::Text(s)) => Ok((Expr::Text(s), 1)),
            Some(Token::CellRef(start)) => {
                if self.eat(&Token::Colon) {
                    match self.next() {
                        Some(Token::CellRef(end)) => Ok((Expr::Range(start, end), 1)),
                        other => Err(EngineError::Parse(format!(
                            "expected a cell reference after ':', found {:?}",
                            other
                        ))),
                    }
                } else {
                    Ok((Expr::Ref(start), 1))
                }
            }
            Some(Token::Ident(name)) => {
                let function = Function::from_name(&name)
                    .ok_or_else(|| EngineError::UnknownFunction(name.clone()))?;
                self.expect(&Token::LeftParen)?;
                let args = self.nested(Self::parse_arguments)?;
                let height = args.iter().map(|(_, h)| *h).max().unwrap_or(0);
                let args = args.into_iter().map(|(arg, _)| arg).collect();
                Ok((Expr::Call { function, args }, grow(height)?))
            }
            Some(Token::LeftParen) => self.nested(|p| {
                let inner = p.parse_concat()?;
                p.expect(&Token::RightParen)?;
                Ok(inner)
            }),
            Some(token) => Err(EngineError::Parse(format!("unexpected {:?}", token))),
            None => Err(EngineError::Parse("unexpected end of formula".into())),
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Node>> {
        let mut args = Vec::new();
        if self.eat(&Token::RightParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_concat()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(&Token::RightParen)?;
            return Ok(args);
        }
    }
}

/// Height of a node whose tallest child is `height`.
fn grow(height: usize) -> Result<usize> {
    let height = height + 1;
    if height > MAX_DEPTH {
        return Err(too_deep());
    }
    Ok(height)
}

fn binary(op: BinaryOperator, (left, lh): Node, (right, rh): Node) -> Result<Node> {
    Ok((
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        grow(lh.max(rh))?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn op(op: BinaryOperator, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[test]
    fn test_tokenize_string_hides_references() {
        let tokens = tokenize(r#""A1 ""quoted""" & B2"#).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Text("A1 \"quoted\"".into()),
                Token::Ampersand,
                Token::CellRef(CellRef::new(1, 1)),
            ]
        );
    }

    #[test]
    fn test_function_name_that_looks_like_a_reference() {
        // LOG10 is shaped like a reference but is followed by '('.
        assert_eq!(
            parse_expression("LOG10(100)"),
            Err(EngineError::UnknownFunction("LOG10".into()))
        );
    }

    #[test]
    fn test_precedence() {
        let expr = parse_expression("1+2*3").unwrap();
        assert_eq!(
            expr,
            op(
                BinaryOperator::Add,
                Expr::Number(1.0),
                op(BinaryOperator::Multiply, Expr::Number(2.0), Expr::Number(3.0)),
            )
        );
    }

    #[test]
    fn test_power_binds_tighter_than_negation() {
        let expr = parse_expression("-2^2").unwrap();
        assert_eq!(
            expr,
            Expr::Unary {
                op: UnaryOperator::Negate,
                operand: Box::new(op(
                    BinaryOperator::Power,
                    Expr::Number(2.0),
                    Expr::Number(2.0)
                )),
            }
        );
    }

    #[test]
    fn test_range_argument() {
        let expr = parse_expression("SUM(A1:B2, C3)").unwrap();
        assert_eq!(
            expr,
            Expr::Call {
                function: Function::Sum,
                args: vec![
                    Expr::Range(CellRef::new(0, 0), CellRef::new(1, 1)),
                    Expr::Ref(CellRef::new(2, 2)),
                ],
            }
        );
    }

    #[test]
    fn test_syntax_errors() {
        assert!(parse_expression("A1+").is_err());
        assert!(parse_expression("(1+2").is_err());
        assert!(parse_expression("1 2").is_err());
        assert!(parse_expression("\"open").is_err());
        assert!(parse_expression("a1").is_err());
        assert!(parse_expression("A1:").is_err());
        assert!(parse_expression("SUM(A1,)").is_err());
        assert!(parse_expression("").is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let ok = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(parse_expression(&ok), Ok(Expr::Number(1.0)));

        let deep = format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000));
        assert_eq!(parse_expression(&deep), Err(too_deep()));

        let negations = format!("{}1", "-".repeat(100_000));
        assert_eq!(parse_expression(&negations), Err(too_deep()));

        let calls = format!("{}1{}", "UPPER(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(parse_expression(&calls), Err(too_deep()));
    }

    #[test]
    fn test_operator_chain_limit() {
        let short = vec!["1"; MAX_DEPTH].join("+");
        assert!(parse_expression(&short).is_ok());

        let long = vec!["1"; 100_000].join("+");
        assert_eq!(parse_expression(&long), Err(too_deep()));
    }
}
