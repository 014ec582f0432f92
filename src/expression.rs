//! Bounded integer expressions referencing other variables.
//!
//! Grammar: integer literals, identifiers, prefix `-`, infix
//! `+ - * / %`, `^` as integer exponentiation, the function calls
//! `min(a, b)` / `max(a, b)`, and parenthesization. Evaluation is over
//! `i64` with checked arithmetic — overflow and division/modulo by zero are
//! evaluation errors, never silent wraps, per the "no arbitrary precision"
//! non-goal: we stay exactly at 64-bit signed and surface failure instead of
//! inventing wider semantics.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Number(i64),
    Ident(String),
    Neg(Box<Node>),
    BinOp(Op, Box<Node>, Box<Node>),
    Call(Func, Box<Node>, Box<Node>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Func {
    Min,
    Max,
}

/// A parsed integer expression, ready to be evaluated against a
/// variable-name environment.
#[derive(Debug, Clone)]
pub struct Expression {
    text: String,
    root: Node,
}

impl Expression {
    /// Parses `text` into an `Expression`. Fails with
    /// `Error::InvalidArgument` on malformed input.
    pub fn parse(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        let mut parser = Parser::new(&text)?;
        let root = parser.parse_expr(0)?;
        parser.expect_end()?;
        Ok(Expression { text, root })
    }

    /// The exact text this expression was parsed from.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Evaluates the expression against `env`. Fails on overflow,
    /// division/modulo by zero, a negative or oversized exponent, or an
    /// identifier missing from `env`.
    pub fn evaluate(&self, env: &HashMap<String, i64>) -> Result<i64> {
        eval(&self.root, env)
    }

    /// The set of identifiers this expression references, without
    /// evaluating it.
    pub fn needed_variables(&self) -> HashSet<String> {
        let mut out = HashSet::new();
        collect_idents(&self.root, &mut out);
        out
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

fn collect_idents(node: &Node, out: &mut HashSet<String>) {
    match node {
        Node::Number(_) => {}
        Node::Ident(name) => {
            out.insert(name.clone());
        }
        Node::Neg(inner) => collect_idents(inner, out),
        Node::BinOp(_, lhs, rhs) => {
            collect_idents(lhs, out);
            collect_idents(rhs, out);
        }
        Node::Call(_, a, b) => {
            collect_idents(a, out);
            collect_idents(b, out);
        }
    }
}

fn eval(node: &Node, env: &HashMap<String, i64>) -> Result<i64> {
    match node {
        Node::Number(n) => Ok(*n),
        Node::Ident(name) => env.get(name).copied().ok_or_else(|| {
            Error::failed_precondition(format!("unknown identifier '{name}' in expression"))
        }),
        Node::Neg(inner) => eval(inner, env)?
            .checked_neg()
            .ok_or_else(|| Error::failed_precondition("overflow while negating expression")),
        Node::BinOp(op, lhs, rhs) => {
            let l = eval(lhs, env)?;
            let r = eval(rhs, env)?;
            apply_op(*op, l, r)
        }
        Node::Call(func, a, b) => {
            let a = eval(a, env)?;
            let b = eval(b, env)?;
            Ok(match func {
                Func::Min => a.min(b),
                Func::Max => a.max(b),
            })
        }
    }
}

fn apply_op(op: Op, l: i64, r: i64) -> Result<i64> {
    let overflow = || Error::failed_precondition("overflow while evaluating expression");
    match op {
        Op::Add => l.checked_add(r).ok_or_else(overflow),
        Op::Sub => l.checked_sub(r).ok_or_else(overflow),
        Op::Mul => l.checked_mul(r).ok_or_else(overflow),
        Op::Div => {
            if r == 0 {
                Err(Error::failed_precondition("division by zero in expression"))
            } else {
                l.checked_div(r).ok_or_else(overflow)
            }
        }
        Op::Mod => {
            if r == 0 {
                Err(Error::failed_precondition("modulo by zero in expression"))
            } else {
                l.checked_rem(r).ok_or_else(overflow)
            }
        }
        Op::Pow => {
            if r < 0 {
                return Err(Error::failed_precondition("negative exponent in expression"));
            }
            let exp = u32::try_from(r)
                .map_err(|_| Error::failed_precondition("exponent too large in expression"))?;
            l.checked_pow(exp).ok_or_else(overflow)
        }
    }
}

// ---------------------------------------------------------------------------
// Tokenizer + precedence-climbing parser

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(i64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    LParen,
    RParen,
    Comma,
    End,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(text: &str) -> Result<Self> {
        Ok(Parser { tokens: tokenize(text)?, pos: 0 })
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::End)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens.get(self.pos).cloned().unwrap_or(Token::End);
        self.pos += 1;
        tok
    }

    fn expect_end(&self) -> Result<()> {
        if self.pos < self.tokens.len() {
            Err(Error::invalid_argument("trailing characters in expression"))
        } else {
            Ok(())
        }
    }

    /// Precedence-climbing: `+ -` bind loosest (0), `* / %` next (1),
    /// `^` binds tightest and is right-associative (2).
    fn parse_expr(&mut self, min_bp: u8) -> Result<Node> {
        let mut lhs = self.parse_prefix()?;
        loop {
            let (op, bp, right_assoc) = match self.peek() {
                Token::Plus => (Op::Add, 0, false),
                Token::Minus => (Op::Sub, 0, false),
                Token::Star => (Op::Mul, 1, false),
                Token::Slash => (Op::Div, 1, false),
                Token::Percent => (Op::Mod, 1, false),
                Token::Caret => (Op::Pow, 2, true),
                _ => break,
            };
            if bp < min_bp {
                break;
            }
            self.advance();
            let next_min = if right_assoc { bp } else { bp + 1 };
            let rhs = self.parse_expr(next_min)?;
            lhs = Node::BinOp(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Node> {
        match self.peek().clone() {
            Token::Minus => {
                self.advance();
                let inner = self.parse_expr(2)?; // bind tighter than + -, same as unary in most grammars
                Ok(Node::Neg(Box::new(inner)))
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Node> {
        match self.advance() {
            Token::Number(n) => Ok(Node::Number(n)),
            Token::Ident(name) => {
                if *self.peek() == Token::LParen {
                    self.parse_call(name)
                } else {
                    Ok(Node::Ident(name))
                }
            }
            Token::LParen => {
                let inner = self.parse_expr(0)?;
                match self.advance() {
                    Token::RParen => Ok(inner),
                    _ => Err(Error::invalid_argument("expected ')' in expression")),
                }
            }
            other => Err(Error::invalid_argument(format!(
                "unexpected token in expression: {other:?}"
            ))),
        }
    }

    fn parse_call(&mut self, name: String) -> Result<Node> {
        let func = match name.as_str() {
            "min" => Func::Min,
            "max" => Func::Max,
            _ => {
                return Err(Error::invalid_argument(format!("unknown function '{name}'")));
            }
        };
        self.advance(); // consume '('
        let a = self.parse_expr(0)?;
        match self.advance() {
            Token::Comma => {}
            _ => return Err(Error::invalid_argument(format!("expected ',' in call to {name}"))),
        }
        let b = self.parse_expr(0)?;
        match self.advance() {
            Token::RParen => {}
            _ => return Err(Error::invalid_argument(format!("expected ')' in call to {name}"))),
        }
        Ok(Node::Call(func, Box::new(a), Box::new(b)))
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '^' => {
                tokens.push(Token::Caret);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '0'..='9' => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let digits: String = chars[start..i].iter().collect();
                let value = digits.parse::<i64>().map_err(|_| {
                    Error::invalid_argument(format!(
                        "integer literal '{digits}' does not fit in a 64-bit expression"
                    ))
                })?;
                tokens.push(Token::Number(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                tokens.push(Token::Ident(ident));
            }
            _ => {
                return Err(Error::invalid_argument(format!(
                    "unexpected character '{c}' in expression"
                )));
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, i64)]) -> HashMap<String, i64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn literal() {
        assert_eq!(Expression::parse("42").unwrap().evaluate(&env(&[])).unwrap(), 42);
    }

    #[test]
    fn arithmetic_precedence() {
        let e = Expression::parse("2 + 3 * 4").unwrap();
        assert_eq!(e.evaluate(&env(&[])).unwrap(), 14);
    }

    #[test]
    fn right_assoc_power() {
        // 2 ^ 3 ^ 2 == 2 ^ (3 ^ 2) == 2 ^ 9 == 512
        let e = Expression::parse("2 ^ 3 ^ 2").unwrap();
        assert_eq!(e.evaluate(&env(&[])).unwrap(), 512);
    }

    #[test]
    fn identifiers_and_needed_variables() {
        let e = Expression::parse("N + M * 2").unwrap();
        let needed = e.needed_variables();
        assert!(needed.contains("N"));
        assert!(needed.contains("M"));
        assert_eq!(e.evaluate(&env(&[("N", 3), ("M", 5)])).unwrap(), 13);
    }

    #[test]
    fn unary_minus_and_parens() {
        let e = Expression::parse("-(3 + 4)").unwrap();
        assert_eq!(e.evaluate(&env(&[])).unwrap(), -7);
    }

    #[test]
    fn min_max_calls() {
        let e = Expression::parse("min(3, max(1, 9)) + 1").unwrap();
        assert_eq!(e.evaluate(&env(&[])).unwrap(), 4);
    }

    #[test]
    fn division_by_zero_is_error() {
        let e = Expression::parse("5 / 0").unwrap();
        assert!(e.evaluate(&env(&[])).is_err());
    }

    #[test]
    fn unknown_identifier_is_error() {
        let e = Expression::parse("X + 1").unwrap();
        assert!(e.evaluate(&env(&[])).is_err());
    }

    #[test]
    fn malformed_expression_fails_to_parse() {
        assert!(Expression::parse("1 +").is_err());
        assert!(Expression::parse("(1 + 2").is_err());
        assert!(Expression::parse("1 2").is_err());
    }

    #[test]
    fn overflow_is_an_evaluation_error() {
        let e = Expression::parse("9223372036854775807 + 1").unwrap();
        assert!(e.evaluate(&env(&[])).is_err());
    }

    #[test]
    fn unrecognized_character_fails_to_parse() {
        assert!(Expression::parse("N @ M").is_err());
        assert!(Expression::parse("2#3").is_err());
    }

    #[test]
    fn oversized_literal_fails_to_parse() {
        assert!(Expression::parse("99999999999999999999").is_err());
    }
}
