//! Message selectors: boolean expressions over message properties.
//!
//! Evaluation uses three-valued logic. A comparison that touches a missing
//! property is unknown, and a message is selected only when the whole
//! expression is true.
mod error;

pub use error::Error;

use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::CharIndices;

use courier_messaging::{Message, PropertyValue};

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Double(f64),
    Bool(bool),
    And,
    Or,
    Not,
    Between,
    In,
    Like,
    Escape,
    Is,
    Null,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Self::Ident(name) => format!("identifier '{name}'"),
            Self::Str(s) => format!("string '{s}'"),
            Self::Int(i) => format!("number {i}"),
            Self::Double(d) => format!("number {d}"),
            other => format!("{other:?}").to_ascii_uppercase(),
        }
    }
}

fn keyword(word: &str) -> Option<Token> {
    match word.to_ascii_uppercase().as_str() {
        "AND" => Some(Token::And),
        "OR" => Some(Token::Or),
        "NOT" => Some(Token::Not),
        "BETWEEN" => Some(Token::Between),
        "IN" => Some(Token::In),
        "LIKE" => Some(Token::Like),
        "ESCAPE" => Some(Token::Escape),
        "IS" => Some(Token::Is),
        "NULL" => Some(Token::Null),
        "TRUE" => Some(Token::Bool(true)),
        "FALSE" => Some(Token::Bool(false)),
        _ => None,
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn tokenize(input: &str) -> Result<Vec<Token>, Error> {
    let mut tokens = Vec::new();
    let mut chars: Peekable<CharIndices<'_>> = input.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        if is_ident_start(c) {
            let mut word = String::new();
            while let Some(&(_, c)) = chars.peek() {
                if !is_ident_part(c) {
                    break;
                }
                word.push(c);
                chars.next();
            }
            tokens.push(keyword(&word).unwrap_or(Token::Ident(word)));
            continue;
        }

        let fraction_start = c == '.'
            && input[offset + 1..]
                .chars()
                .next()
                .is_some_and(|d| d.is_ascii_digit());
        if c.is_ascii_digit() || fraction_start {
            tokens.push(lex_number(&mut chars)?);
            continue;
        }

        chars.next();
        let token = match c {
            '\'' => {
                let mut literal = String::new();
                loop {
                    match chars.next() {
                        None => return Err(Error::UnterminatedString(offset)),
                        Some((_, '\'')) => {
                            if matches!(chars.peek(), Some((_, '\''))) {
                                chars.next();
                                literal.push('\'');
                            } else {
                                break;
                            }
                        }
                        Some((_, ch)) => literal.push(ch),
                    }
                }
                Token::Str(literal)
            }
            '=' => Token::Eq,
            '<' => match chars.peek() {
                Some((_, '>')) => {
                    chars.next();
                    Token::Ne
                }
                Some((_, '=')) => {
                    chars.next();
                    Token::Le
                }
                _ => Token::Lt,
            },
            '>' => {
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    Token::Ge
                } else {
                    Token::Gt
                }
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            other => return Err(Error::UnexpectedChar(other, offset)),
        };
        tokens.push(token);
    }

    Ok(tokens)
}

fn lex_number(chars: &mut Peekable<CharIndices<'_>>) -> Result<Token, Error> {
    let mut text = String::new();
    let mut is_double = false;

    while let Some(&(_, c)) = chars.peek() {
        match c {
            '0'..='9' => text.push(c),
            '.' if !is_double => {
                is_double = true;
                text.push(c);
            }
            'e' | 'E' => {
                is_double = true;
                text.push(c);
                chars.next();
                if let Some(&(_, sign @ ('+' | '-'))) = chars.peek() {
                    text.push(sign);
                    chars.next();
                }
                continue;
            }
            _ => break,
        }
        chars.next();
    }

    if is_double {
        text.parse::<f64>()
            .map(Token::Double)
            .map_err(|_| Error::InvalidNumber(text))
    } else {
        text.parse::<i64>()
            .map(Token::Int)
            .map_err(|_| Error::InvalidNumber(text))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Clone, Debug, PartialEq)]
enum Expr {
    Literal(Value),
    Property(String),
    Negate(Box<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    Arith(ArithOp, Box<Expr>, Box<Expr>),
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    In {
        expr: Box<Expr>,
        list: Vec<String>,
        negated: bool,
    },
    Like {
        expr: Box<Expr>,
        pattern: Vec<LikeToken>,
        negated: bool,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum LikeToken {
    Char(char),
    AnyOne,
    AnyMany,
}

fn compile_like(pattern: &str, escape: Option<char>) -> Vec<LikeToken> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if Some(c) == escape {
            if let Some(next) = chars.next() {
                tokens.push(LikeToken::Char(next));
            }
            continue;
        }
        tokens.push(match c {
            '%' => LikeToken::AnyMany,
            '_' => LikeToken::AnyOne,
            c => LikeToken::Char(c),
        });
    }
    tokens
}

fn like_matches(pattern: &[LikeToken], text: &[char]) -> bool {
    // matched[j] is whether the pattern prefix consumed so far matches text[..j].
    let mut matched = vec![false; text.len() + 1];
    matched[0] = true;

    for token in pattern {
        let mut next = vec![false; text.len() + 1];
        match token {
            LikeToken::AnyMany => {
                let mut seen = false;
                for j in 0..=text.len() {
                    seen |= matched[j];
                    next[j] = seen;
                }
            }
            LikeToken::AnyOne => {
                for j in 1..=text.len() {
                    next[j] = matched[j - 1];
                }
            }
            LikeToken::Char(c) => {
                for j in 1..=text.len() {
                    next[j] = matched[j - 1] && text[j - 1] == *c;
                }
            }
        }
        matched = next;
    }

    matched[text.len()]
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.position + offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        self.position += 1;
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn found(&self) -> String {
        self.peek()
            .map_or_else(|| "end of input".to_string(), Token::describe)
    }

    fn expect(&mut self, token: &Token, expected: &'static str) -> Result<(), Error> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(Error::Unexpected {
                expected,
                found: self.found(),
            })
        }
    }

    fn expect_string(&mut self, expected: &'static str) -> Result<String, Error> {
        match self.peek() {
            Some(Token::Str(s)) => {
                let s = s.clone();
                self.position += 1;
                Ok(s)
            }
            _ => Err(Error::Unexpected {
                expected,
                found: self.found(),
            }),
        }
    }

    fn parse_or(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::Or) {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_not()?;
        while self.eat(&Token::And) {
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, Error> {
        if self.eat(&Token::Not) {
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_predicate()
    }

    fn parse_predicate(&mut self) -> Result<Expr, Error> {
        let left = self.parse_additive()?;

        let compare = match self.peek() {
            Some(Token::Eq) => Some(CompareOp::Eq),
            Some(Token::Ne) => Some(CompareOp::Ne),
            Some(Token::Lt) => Some(CompareOp::Lt),
            Some(Token::Le) => Some(CompareOp::Le),
            Some(Token::Gt) => Some(CompareOp::Gt),
            Some(Token::Ge) => Some(CompareOp::Ge),
            _ => None,
        };
        if let Some(op) = compare {
            self.position += 1;
            let right = self.parse_additive()?;
            return Ok(Expr::Compare(op, Box::new(left), Box::new(right)));
        }

        if self.eat(&Token::Is) {
            let negated = self.eat(&Token::Not);
            self.expect(&Token::Null, "NULL")?;
            return Ok(Expr::IsNull {
                expr: Box::new(left),
                negated,
            });
        }

        let negated = self.peek() == Some(&Token::Not)
            && matches!(
                self.peek_at(1),
                Some(Token::Between | Token::In | Token::Like)
            );
        if negated {
            self.position += 1;
        }

        match self.peek() {
            Some(Token::Between) => {
                self.position += 1;
                let low = self.parse_additive()?;
                self.expect(&Token::And, "AND")?;
                let high = self.parse_additive()?;
                Ok(Expr::Between {
                    expr: Box::new(left),
                    low: Box::new(low),
                    high: Box::new(high),
                    negated,
                })
            }
            Some(Token::In) => {
                self.position += 1;
                self.expect(&Token::LParen, "'('")?;
                let mut list = vec![self.expect_string("string literal")?];
                while self.eat(&Token::Comma) {
                    list.push(self.expect_string("string literal")?);
                }
                self.expect(&Token::RParen, "')'")?;
                Ok(Expr::In {
                    expr: Box::new(left),
                    list,
                    negated,
                })
            }
            Some(Token::Like) => {
                self.position += 1;
                let pattern = self.expect_string("pattern string")?;
                let escape = if self.eat(&Token::Escape) {
                    let escape = self.expect_string("escape string")?;
                    let mut chars = escape.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => Some(c),
                        _ => return Err(Error::InvalidEscape(escape)),
                    }
                } else {
                    None
                };
                Ok(Expr::Like {
                    expr: Box::new(left),
                    pattern: compile_like(&pattern, escape),
                    negated,
                })
            }
            _ => Ok(left),
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => ArithOp::Add,
                Some(Token::Minus) => ArithOp::Sub,
                _ => return Ok(left),
            };
            self.position += 1;
            let right = self.parse_multiplicative()?;
            left = Expr::Arith(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => ArithOp::Mul,
                Some(Token::Slash) => ArithOp::Div,
                _ => return Ok(left),
            };
            self.position += 1;
            let right = self.parse_unary()?;
            left = Expr::Arith(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, Error> {
        if self.eat(&Token::Minus) {
            return Ok(Expr::Negate(Box::new(self.parse_unary()?)));
        }
        if self.eat(&Token::Plus) {
            return self.parse_unary();
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, Error> {
        match self.advance() {
            Some(Token::Ident(name)) => Ok(Expr::Property(name)),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::Str(s))),
            Some(Token::Int(i)) => Ok(Expr::Literal(Value::Int(i))),
            Some(Token::Double(d)) => Ok(Expr::Literal(Value::Double(d))),
            Some(Token::Bool(b)) => Ok(Expr::Literal(Value::Bool(b))),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            other => {
                self.position -= 1;
                Err(Error::Unexpected {
                    expected: "expression",
                    found: other.map_or_else(|| "end of input".to_string(), |t| t.describe()),
                })
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
}

impl Value {
    fn from_property(value: &PropertyValue) -> Self {
        match value {
            PropertyValue::Bool(b) => Self::Bool(*b),
            PropertyValue::Int(i) => Self::Int(*i),
            PropertyValue::Double(d) => Self::Double(*d),
            PropertyValue::String(s) => Self::Str(s.clone()),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Double(d) => Some(*d),
            _ => None,
        }
    }

    const fn truth(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

fn from_truth(truth: Option<bool>) -> Value {
    truth.map_or(Value::Null, Value::Bool)
}

fn lookup(message: &Message, name: &str) -> Value {
    match name {
        "JMSMessageID" => message
            .message_id
            .clone()
            .map_or(Value::Null, Value::Str),
        "JMSCorrelationID" => message
            .correlation_id
            .clone()
            .map_or(Value::Null, Value::Str),
        "JMSTimestamp" => message.timestamp.map_or(Value::Null, Value::Int),
        _ => message
            .properties
            .get(name)
            .map_or(Value::Null, Value::from_property),
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> Option<bool> {
    let ordering = match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => {
            return match op {
                CompareOp::Eq => Some(a == b),
                CompareOp::Ne => Some(a != b),
                _ => None,
            };
        }
        (Value::Bool(a), Value::Bool(b)) => {
            return match op {
                CompareOp::Eq => Some(a == b),
                CompareOp::Ne => Some(a != b),
                _ => None,
            };
        }
        (a, b) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    }?;

    Some(match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
    })
}

fn arith(op: ArithOp, left: &Value, right: &Value) -> Value {
    if let (Value::Int(a), Value::Int(b)) = (left, right) {
        let exact = match op {
            ArithOp::Add => a.checked_add(*b),
            ArithOp::Sub => a.checked_sub(*b),
            ArithOp::Mul => a.checked_mul(*b),
            ArithOp::Div => {
                if *b == 0 {
                    return Value::Null;
                }
                a.checked_div(*b)
            }
        };
        if let Some(exact) = exact {
            return Value::Int(exact);
        }
    }

    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => Value::Double(match op {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
            ArithOp::Div => a / b,
        }),
        _ => Value::Null,
    }
}

fn negate_if(truth: Option<bool>, negated: bool) -> Option<bool> {
    if negated { truth.map(|t| !t) } else { truth }
}

fn eval(expr: &Expr, message: &Message) -> Value {
    match expr {
        Expr::Literal(value) => value.clone(),
        Expr::Property(name) => lookup(message, name),
        Expr::Negate(inner) => match eval(inner, message) {
            Value::Int(i) => i.checked_neg().map_or(Value::Null, Value::Int),
            Value::Double(d) => Value::Double(-d),
            _ => Value::Null,
        },
        Expr::Not(inner) => from_truth(eval(inner, message).truth().map(|t| !t)),
        Expr::And(left, right) => {
            let left = eval(left, message).truth();
            if left == Some(false) {
                return Value::Bool(false);
            }
            match (left, eval(right, message).truth()) {
                (_, Some(false)) => Value::Bool(false),
                (Some(true), Some(true)) => Value::Bool(true),
                _ => Value::Null,
            }
        }
        Expr::Or(left, right) => {
            let left = eval(left, message).truth();
            if left == Some(true) {
                return Value::Bool(true);
            }
            match (left, eval(right, message).truth()) {
                (_, Some(true)) => Value::Bool(true),
                (Some(false), Some(false)) => Value::Bool(false),
                _ => Value::Null,
            }
        }
        Expr::Compare(op, left, right) => {
            from_truth(compare(*op, &eval(left, message), &eval(right, message)))
        }
        Expr::Arith(op, left, right) => arith(*op, &eval(left, message), &eval(right, message)),
        Expr::Between {
            expr,
            low,
            high,
            negated,
        } => {
            let value = eval(expr, message);
            let above = compare(CompareOp::Ge, &value, &eval(low, message));
            let below = compare(CompareOp::Le, &value, &eval(high, message));
            let within = match (above, below) {
                (Some(false), _) | (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            };
            from_truth(negate_if(within, *negated))
        }
        Expr::In {
            expr,
            list,
            negated,
        } => match eval(expr, message) {
            Value::Str(s) => Value::Bool(list.contains(&s) != *negated),
            _ => Value::Null,
        },
        Expr::Like {
            expr,
            pattern,
            negated,
        } => match eval(expr, message) {
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                Value::Bool(like_matches(pattern, &chars) != *negated)
            }
            _ => Value::Null,
        },
        Expr::IsNull { expr, negated } => {
            Value::Bool((eval(expr, message) == Value::Null) != *negated)
        }
    }
}

/// A compiled selector. The default selector matches everything.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selector {
    source: String,
    expr: Option<Expr>,
}

impl Selector {
    /// Compiles a selector. An empty or blank selector matches everything.
    ///
    /// # Errors
    ///
    /// Returns an error if the expression does not parse.
    pub fn parse(source: &str) -> Result<Self, Error> {
        if source.trim().is_empty() {
            return Ok(Self {
                source: String::new(),
                expr: None,
            });
        }

        let mut parser = Parser {
            tokens: tokenize(source)?,
            position: 0,
        };
        let expr = parser.parse_or()?;
        if parser.position < parser.tokens.len() {
            return Err(Error::Unexpected {
                expected: "end of input",
                found: parser.found(),
            });
        }

        Ok(Self {
            source: source.to_string(),
            expr: Some(expr),
        })
    }

    /// The selector text (empty for the match-all selector).
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether `message` is selected.
    #[must_use]
    pub fn matches(&self, message: &Message) -> bool {
        self.expr
            .as_ref()
            .is_none_or(|expr| eval(expr, message) == Value::Bool(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;

    fn message() -> Message {
        Message::text("body")
            .with_property("region", "eu-west")
            .with_property("priority", 7_i64)
            .with_property("weight", 2.5)
            .with_property("urgent", true)
    }

    fn selects(selector: &str) -> bool {
        Selector::parse(selector).unwrap().matches(&message())
    }

    #[test]
    fn test_empty_selector_matches_everything() {
        assert!(selects(""));
        assert!(selects("   "));
    }

    #[test]
    fn test_comparisons() {
        assert!(selects("region = 'eu-west'"));
        assert!(selects("region <> 'us-east'"));
        assert!(selects("priority > 5 AND priority <= 7"));
        assert!(selects("weight < 3"));
        assert!(selects("urgent = TRUE"));
        assert!(selects("urgent"));
        assert!(!selects("priority >= 8"));
    }

    #[test]
    fn test_missing_property_is_unknown() {
        assert!(!selects("missing = 1"));
        assert!(!selects("NOT (missing = 1)"));
        assert!(selects("missing = 1 OR priority = 7"));
        assert!(!selects("missing = 1 AND priority = 7"));
        assert!(selects("missing IS NULL"));
        assert!(selects("region IS NOT NULL"));
    }

    #[test]
    fn test_arithmetic() {
        assert!(selects("priority * 2 = 14"));
        assert!(selects("priority + weight = 9.5"));
        assert!(selects("-priority < 0"));
        assert!(!selects("priority / 0 = 0"));
    }

    #[test]
    fn test_between_in_like() {
        assert!(selects("priority BETWEEN 1 AND 10"));
        assert!(selects("priority NOT BETWEEN 8 AND 10"));
        assert!(selects("region IN ('eu-west', 'eu-north')"));
        assert!(selects("region NOT IN ('us-east')"));
        assert!(selects("region LIKE 'eu-%'"));
        assert!(selects("region LIKE 'eu_west'"));
        assert!(!selects("region LIKE 'eu'"));
        assert!(selects("region NOT LIKE 'us%'"));
    }

    #[test]
    fn test_like_escape() {
        let message = Message::text("").with_property("code", "100%");
        let selector = Selector::parse("code LIKE '100!%' ESCAPE '!'").unwrap();
        assert!(selector.matches(&message));

        let other = Message::text("").with_property("code", "1000");
        assert!(!selector.matches(&other));
    }

    #[test]
    fn test_quoted_string_literal() {
        let message = Message::text("").with_property("name", "o'brien");
        assert!(Selector::parse("name = 'o''brien'").unwrap().matches(&message));
    }

    #[test]
    fn test_header_fields() {
        let mut message = message();
        message.correlation_id = Some("abc".to_string());
        assert!(Selector::parse("JMSCorrelationID = 'abc'").unwrap().matches(&message));
    }

    #[test]
    fn test_parse_errors() {
        assert_matches!(
            Selector::parse("region = 'eu"),
            Err(Error::UnterminatedString(9))
        );
        assert_matches!(Selector::parse("region = "), Err(Error::Unexpected { .. }));
        assert_matches!(Selector::parse("a = 1 b"), Err(Error::Unexpected { .. }));
        assert_matches!(Selector::parse("a # 1"), Err(Error::UnexpectedChar('#', 2)));
        assert_matches!(
            Selector::parse("a LIKE 'x' ESCAPE 'ab'"),
            Err(Error::InvalidEscape(_))
        );
    }
}
