use super::ast::{Expression, PathRef};
use crate::error::ConditionError;
use crate::model::Value;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Reference(PathRef),
    Number(f64),
    Text(String),
    Bool(bool),
    Null,
    And,
    Or,
    Not,
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    LParen,
    RParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Reference(path) => path.to_string(),
            Token::Number(n) => n.to_string(),
            Token::Text(s) => format!("'{}'", s),
            Token::Bool(b) => b.to_string(),
            Token::Null => "null".into(),
            Token::And => "and".into(),
            Token::Or => "or".into(),
            Token::Not => "not".into(),
            Token::Eq => "=".into(),
            Token::NotEq => "<>".into(),
            Token::Gt => ">".into(),
            Token::Gte => ">=".into(),
            Token::Lt => "<".into(),
            Token::Lte => "<=".into(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),
        }
    }
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn tokenize(mut self) -> Result<Vec<(Token, usize)>, ConditionError> {
        let mut tokens = Vec::new();
        while let Some(c) = self.peek() {
            let start = self.pos;
            if c.is_whitespace() {
                self.pos += 1;
                continue;
            }
            let token = match c {
                '{' => self.reference()?,
                '\'' | '"' => self.text(c)?,
                '(' => {
                    self.pos += 1;
                    Token::LParen
                }
                ')' => {
                    self.pos += 1;
                    Token::RParen
                }
                '=' => {
                    self.pos += if self.peek_at(1) == Some('=') { 2 } else { 1 };
                    Token::Eq
                }
                '!' if self.peek_at(1) == Some('=') => {
                    self.pos += 2;
                    Token::NotEq
                }
                '!' => {
                    self.pos += 1;
                    Token::Not
                }
                '<' => match self.peek_at(1) {
                    Some('>') => {
                        self.pos += 2;
                        Token::NotEq
                    }
                    Some('=') => {
                        self.pos += 2;
                        Token::Lte
                    }
                    _ => {
                        self.pos += 1;
                        Token::Lt
                    }
                },
                '>' => {
                    if self.peek_at(1) == Some('=') {
                        self.pos += 2;
                        Token::Gte
                    } else {
                        self.pos += 1;
                        Token::Gt
                    }
                }
                '&' if self.peek_at(1) == Some('&') => {
                    self.pos += 2;
                    Token::And
                }
                '|' if self.peek_at(1) == Some('|') => {
                    self.pos += 2;
                    Token::Or
                }
                c if c.is_ascii_digit()
                    || (c == '-' && self.peek_at(1).is_some_and(|n| n.is_ascii_digit())) =>
                {
                    self.number()?
                }
                c if c.is_alphabetic() => self.keyword()?,
                other => {
                    return Err(ConditionError::UnexpectedCharacter {
                        found: other,
                        position: start,
                    });
                }
            };
            tokens.push((token, start));
        }
        Ok(tokens)
    }

    fn reference(&mut self) -> Result<Token, ConditionError> {
        let start = self.pos;
        self.pos += 1;
        let mut invocation = String::new();
        loop {
            match self.peek() {
                Some('}') => {
                    self.pos += 1;
                    break;
                }
                Some('{') | None => return Err(ConditionError::Unterminated("reference", start)),
                Some(c) => {
                    invocation.push(c);
                    self.pos += 1;
                }
            }
        }

        let mut segments = Vec::new();
        while self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_alphabetic() || c == '_') {
            self.pos += 1;
            let mut segment = String::new();
            while let Some(c) = self.peek().filter(|c| c.is_alphanumeric() || *c == '_') {
                segment.push(c);
                self.pos += 1;
            }
            segments.push(segment);
        }

        let raw: String = self.chars[start..self.pos].iter().collect();
        let invocation = invocation.trim().to_string();
        if invocation.is_empty() || segments.is_empty() {
            return Err(ConditionError::InvalidReference(raw));
        }
        let output = segments.remove(0);
        Ok(Token::Reference(PathRef {
            invocation,
            output,
            fields: segments,
        }))
    }

    fn text(&mut self, quote: char) -> Result<Token, ConditionError> {
        let start = self.pos;
        self.pos += 1;
        let mut text = String::new();
        loop {
            match self.peek() {
                // A doubled quote is an escaped quote.
                Some(c) if c == quote && self.peek_at(1) == Some(quote) => {
                    text.push(quote);
                    self.pos += 2;
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(Token::Text(text));
                }
                Some(c) => {
                    text.push(c);
                    self.pos += 1;
                }
                None => return Err(ConditionError::Unterminated("string", start)),
            }
        }
    }

    fn number(&mut self) -> Result<Token, ConditionError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
            self.pos += 1;
        }
        let raw: String = self.chars[start..self.pos].iter().collect();
        raw.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| ConditionError::UnexpectedToken {
                expected: "a number",
                found: raw,
                position: start,
            })
    }

    fn keyword(&mut self) -> Result<Token, ConditionError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.to_ascii_lowercase().as_str() {
            "and" => Ok(Token::And),
            "or" => Ok(Token::Or),
            "not" => Ok(Token::Not),
            "true" => Ok(Token::Bool(true)),
            "false" => Ok(Token::Bool(false)),
            "null" => Ok(Token::Null),
            _ => Err(ConditionError::UnexpectedToken {
                expected: "an operator, literal or reference",
                found: word,
                position: start,
            }),
        }
    }
}

/// Recursive-descent parser over the token stream.
///
/// Precedence from loosest to tightest: `or`, `and`, `not`, comparison.
struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn advance(&mut self) -> Option<(Token, usize)> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn parse_or(&mut self) -> Result<Expression, ConditionError> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let right = self.parse_and()?;
            left = Expression::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression, ConditionError> {
        let mut left = self.parse_not()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let right = self.parse_not()?;
            left = Expression::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expression, ConditionError> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            let inner = self.parse_not()?;
            return Ok(Expression::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expression, ConditionError> {
        let left = self.parse_primary()?;
        let constructor: fn(Box<Expression>, Box<Expression>) -> Expression = match self.peek() {
            Some(Token::Eq) => Expression::Equal,
            Some(Token::NotEq) => Expression::NotEqual,
            Some(Token::Gt) => Expression::GreaterThan,
            Some(Token::Gte) => Expression::GreaterThanOrEqual,
            Some(Token::Lt) => Expression::SmallerThan,
            Some(Token::Lte) => Expression::SmallerThanOrEqual,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.parse_primary()?;
        Ok(constructor(Box::new(left), Box::new(right)))
    }

    fn parse_primary(&mut self) -> Result<Expression, ConditionError> {
        let (token, position) = self
            .advance()
            .ok_or(ConditionError::UnexpectedEnd("a literal, reference or '('"))?;
        match token {
            Token::Reference(path) => Ok(Expression::Reference(path)),
            Token::Number(n) => Ok(Expression::Literal(Value::Number(n))),
            Token::Text(s) => Ok(Expression::Literal(Value::Text(s))),
            Token::Bool(b) => Ok(Expression::Literal(Value::Bool(b))),
            Token::Null => Ok(Expression::Literal(Value::Null)),
            Token::LParen => {
                let inner = self.parse_or()?;
                match self.advance() {
                    Some((Token::RParen, _)) => Ok(inner),
                    Some((other, position)) => Err(ConditionError::UnexpectedToken {
                        expected: "')'",
                        found: other.describe(),
                        position,
                    }),
                    None => Err(ConditionError::UnexpectedEnd("')'")),
                }
            }
            other => Err(ConditionError::UnexpectedToken {
                expected: "a literal, reference or '('",
                found: other.describe(),
                position,
            }),
        }
    }
}

/// Parses a condition into its expression tree.
pub fn parse(source: &str) -> Result<Expression, ConditionError> {
    let tokens = Lexer::new(source).tokenize()?;
    if tokens.is_empty() {
        return Err(ConditionError::UnexpectedEnd("a condition"));
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expression = parser.parse_or()?;
    if let Some((token, position)) = parser.advance() {
        return Err(ConditionError::UnexpectedToken {
            expected: "end of condition",
            found: token.describe(),
            position,
        });
    }
    Ok(expression)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(invocation: &str, output: &str, fields: &[&str]) -> Box<Expression> {
        Box::new(Expression::Reference(PathRef {
            invocation: invocation.into(),
            output: output.into(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }))
    }

    #[test]
    fn parses_simple_comparison() {
        let expr = parse("{Step1}.amount > 100").unwrap();
        assert_eq!(
            expr,
            Expression::GreaterThan(
                reference("Step1", "amount", &[]),
                Box::new(Expression::Literal(Value::Number(100.0)))
            )
        );
    }

    #[test]
    fn parses_invocation_names_with_spaces_and_field_paths() {
        let expr = parse("{Load Invoice}.record.customer.name = 'ACME'").unwrap();
        assert_eq!(
            expr,
            Expression::Equal(
                reference("Load Invoice", "record", &["customer", "name"]),
                Box::new(Expression::Literal(Value::Text("ACME".into())))
            )
        );
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let expr = parse("{A}.x = 1 or {A}.y = 2 and not {A}.z").unwrap();
        match expr {
            Expression::Or(_, right) => assert!(matches!(*right, Expression::And(_, _))),
            other => panic!("expected or at the root, got {:?}", other),
        }
    }

    #[test]
    fn accepts_alternative_operator_spellings() {
        assert!(matches!(parse("{A}.x != 1").unwrap(), Expression::NotEqual(_, _)));
        assert!(matches!(parse("{A}.x <> 1").unwrap(), Expression::NotEqual(_, _)));
        assert!(matches!(parse("{A}.x == 1").unwrap(), Expression::Equal(_, _)));
        assert!(matches!(
            parse("({A}.x >= 1) AND ({A}.y <= -2.5)").unwrap(),
            Expression::And(_, _)
        ));
    }

    #[test]
    fn doubled_quote_escapes_inside_strings() {
        let expr = parse("{A}.name = 'O''Brien'").unwrap();
        assert_eq!(
            expr,
            Expression::Equal(
                reference("A", "name", &[]),
                Box::new(Expression::Literal(Value::Text("O'Brien".into())))
            )
        );
    }

    #[test]
    fn rejects_reference_without_output() {
        assert!(matches!(
            parse("{Step1} > 1"),
            Err(ConditionError::InvalidReference(_))
        ));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(parse(""), Err(ConditionError::UnexpectedEnd(_))));
        assert!(matches!(
            parse("{A}.x > "),
            Err(ConditionError::UnexpectedEnd(_))
        ));
        assert!(matches!(
            parse("{A}.x = 'open"),
            Err(ConditionError::Unterminated("string", _))
        ));
        assert!(matches!(
            parse("{A}.x = 1 1"),
            Err(ConditionError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            parse("{A}.x # 1"),
            Err(ConditionError::UnexpectedCharacter { found: '#', .. })
        ));
    }
}
