// Query language parser
// Scanner plus a Pratt parser producing `Statement`s

use std::fmt;

use thiserror::Error;

use crate::ast::{BinaryOp, Expr, Field, Indexer, Literal, Statement};
use crate::utils::ensure_sufficient_stack;

/// Default bound on expression nesting.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Parser errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParserError {
    #[error("unexpected token: {0}")]
    UnexpectedToken(String),

    #[error("unexpected end of program")]
    UnexpectedEnd,

    #[error("unexpected character '{0}' at offset {1}")]
    UnexpectedCharacter(char, usize),

    #[error("invalid number: {0}")]
    InvalidNumber(String),

    #[error("unclosed string literal")]
    UnclosedString,

    #[error("invalid escape sequence: {0}")]
    InvalidEscape(String),

    #[error("expected {expected}, found {found}")]
    Expected { expected: String, found: String },

    #[error("unsupported syntax: {0}")]
    Unsupported(String),

    #[error("expression nesting exceeds the limit of {0}")]
    NestingTooDeep(usize),
}

/// Token types for the lexer
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    String(String),
    Number(f64),

    /// Bare word, including keywords other than `and`/`or`
    Identifier(String),
    /// `.name`
    Field(String),
    /// `$name`
    Variable(String),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    And,
    Or,
    Alternative,
    /// `=`, `|=`, `+=`, ... (recognised only to be rejected)
    Update(&'static str),
    Pipe,
    Dot,
    DotDot,
    Question,
    Colon,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Comma,
    Semicolon,

    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::String(s) => write!(f, "string {:?}", s),
            Token::Number(n) => write!(f, "number {}", n),
            Token::Identifier(name) => write!(f, "identifier '{}'", name),
            Token::Field(name) => write!(f, "'.{}'", name),
            Token::Variable(name) => write!(f, "'${}'", name),
            Token::Eof => f.write_str("end of program"),
            other => write!(f, "'{}'", other.symbol()),
        }
    }
}

impl Token {
    fn symbol(&self) -> &'static str {
        match self {
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Equal => "==",
            Token::NotEqual => "!=",
            Token::LessThan => "<",
            Token::LessThanOrEqual => "<=",
            Token::GreaterThan => ">",
            Token::GreaterThanOrEqual => ">=",
            Token::And => "and",
            Token::Or => "or",
            Token::Alternative => "//",
            Token::Update(op) => *op,
            Token::Pipe => "|",
            Token::Dot => ".",
            Token::DotDot => "..",
            Token::Question => "?",
            Token::Colon => ":",
            Token::LeftParen => "(",
            Token::RightParen => ")",
            Token::LeftBracket => "[",
            Token::RightBracket => "]",
            Token::LeftBrace => "{",
            Token::RightBrace => "}",
            Token::Comma => ",",
            Token::Semicolon => ";",
            _ => "",
        }
    }
}

/// Lexer for tokenizing query programs
pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        if self.position < self.input.len() {
            self.position += 1;
        }
    }

    fn skip_trivia(&mut self) {
        while let Some(ch) = self.current() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '#' {
                // Comment runs to end of line
                while let Some(c) = self.current() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn read_string(&mut self) -> Result<String, ParserError> {
        let mut result = String::new();
        self.advance(); // opening quote

        loop {
            match self.current() {
                None => return Err(ParserError::UnclosedString),
                Some('"') => {
                    self.advance();
                    return Ok(result);
                }
                Some('\\') => {
                    self.advance();
                    match self.current() {
                        None => return Err(ParserError::UnclosedString),
                        Some('"') => result.push('"'),
                        Some('\\') => result.push('\\'),
                        Some('/') => result.push('/'),
                        Some('b') => result.push('\u{0008}'),
                        Some('f') => result.push('\u{000C}'),
                        Some('n') => result.push('\n'),
                        Some('r') => result.push('\r'),
                        Some('t') => result.push('\t'),
                        Some('u') => {
                            self.advance();
                            result.push(self.read_unicode_escape()?);
                            continue;
                        }
                        Some('(') => {
                            return Err(ParserError::Unsupported(
                                "string interpolation".to_string(),
                            ))
                        }
                        Some(ch) => return Err(ParserError::InvalidEscape(format!("\\{}", ch))),
                    }
                    self.advance();
                }
                Some(ch) => {
                    result.push(ch);
                    self.advance();
                }
            }
        }
    }

    // After `\u`; consumes four hex digits, and a trailing low surrogate escape if needed.
    fn read_unicode_escape(&mut self) -> Result<char, ParserError> {
        let high = self.read_hex4()?;
        if (0xD800..0xDC00).contains(&high) {
            if self.current() == Some('\\') && self.peek(1) == Some('u') {
                self.advance();
                self.advance();
                let low = self.read_hex4()?;
                if (0xDC00..0xE000).contains(&low) {
                    let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                    return char::from_u32(code)
                        .ok_or_else(|| ParserError::InvalidEscape(format!("\\u{:04x}", code)));
                }
            }
            return Err(ParserError::InvalidEscape(format!("\\u{:04x}", high)));
        }
        char::from_u32(high).ok_or_else(|| ParserError::InvalidEscape(format!("\\u{:04x}", high)))
    }

    fn read_hex4(&mut self) -> Result<u32, ParserError> {
        let mut code = 0u32;
        for _ in 0..4 {
            match self.current().and_then(|c| c.to_digit(16)) {
                Some(digit) => {
                    code = code * 16 + digit;
                    self.advance();
                }
                None => {
                    let found: String = self.current().into_iter().collect();
                    return Err(ParserError::InvalidEscape(format!("\\u...{}", found)));
                }
            }
        }
        Ok(code)
    }

    fn read_number(&mut self) -> Result<f64, ParserError> {
        let start = self.position;
        let is_digit = |c: Option<char>| c.is_some_and(|c| c.is_ascii_digit());

        while is_digit(self.current()) {
            self.advance();
        }

        // Fractional part
        if self.current() == Some('.') && is_digit(self.peek(1)) {
            self.advance();
            while is_digit(self.current()) {
                self.advance();
            }
        }

        // Exponent part
        if matches!(self.current(), Some('e') | Some('E')) {
            self.advance();
            if matches!(self.current(), Some('+') | Some('-')) {
                self.advance();
            }
            if !is_digit(self.current()) {
                let text: String = self.input[start..self.position].iter().collect();
                return Err(ParserError::InvalidNumber(text));
            }
            while is_digit(self.current()) {
                self.advance();
            }
        }

        let text: String = self.input[start..self.position].iter().collect();
        text.parse().map_err(|_| ParserError::InvalidNumber(text))
    }

    fn read_word(&mut self) -> String {
        let start = self.position;
        while let Some(ch) = self.current() {
            if ch.is_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        self.input[start..self.position].iter().collect()
    }

    // Emit `token`, consuming `width` characters.
    fn emit(&mut self, width: usize, token: Token) -> Result<Token, ParserError> {
        for _ in 0..width {
            self.advance();
        }
        Ok(token)
    }

    pub fn next_token(&mut self) -> Result<Token, ParserError> {
        self.skip_trivia();

        let Some(ch) = self.current() else {
            return Ok(Token::Eof);
        };
        let next = self.peek(1);
        let is_word_start = |c: Option<char>| c.is_some_and(|c| c.is_alphabetic() || c == '_');

        match ch {
            '"' => Ok(Token::String(self.read_string()?)),
            c if c.is_ascii_digit() => Ok(Token::Number(self.read_number()?)),

            '.' if next == Some('.') => self.emit(2, Token::DotDot),
            '.' if is_word_start(next) => {
                self.advance();
                Ok(Token::Field(self.read_word()))
            }
            '.' => self.emit(1, Token::Dot),
            '$' => {
                self.advance();
                Ok(Token::Variable(self.read_word()))
            }

            '/' if next == Some('/') => {
                if self.peek(2) == Some('=') {
                    self.emit(3, Token::Update("//="))
                } else {
                    self.emit(2, Token::Alternative)
                }
            }
            '=' if next == Some('=') => self.emit(2, Token::Equal),
            '!' if next == Some('=') => self.emit(2, Token::NotEqual),
            '<' if next == Some('=') => self.emit(2, Token::LessThanOrEqual),
            '>' if next == Some('=') => self.emit(2, Token::GreaterThanOrEqual),
            '|' if next == Some('=') => self.emit(2, Token::Update("|=")),
            '+' if next == Some('=') => self.emit(2, Token::Update("+=")),
            '-' if next == Some('=') => self.emit(2, Token::Update("-=")),
            '*' if next == Some('=') => self.emit(2, Token::Update("*=")),
            '/' if next == Some('=') => self.emit(2, Token::Update("/=")),
            '%' if next == Some('=') => self.emit(2, Token::Update("%=")),
            '=' => self.emit(1, Token::Update("=")),

            '+' => self.emit(1, Token::Plus),
            '-' => self.emit(1, Token::Minus),
            '*' => self.emit(1, Token::Star),
            '/' => self.emit(1, Token::Slash),
            '%' => self.emit(1, Token::Percent),
            '<' => self.emit(1, Token::LessThan),
            '>' => self.emit(1, Token::GreaterThan),
            '|' => self.emit(1, Token::Pipe),
            '?' => self.emit(1, Token::Question),
            ':' => self.emit(1, Token::Colon),
            '(' => self.emit(1, Token::LeftParen),
            ')' => self.emit(1, Token::RightParen),
            '[' => self.emit(1, Token::LeftBracket),
            ']' => self.emit(1, Token::RightBracket),
            '{' => self.emit(1, Token::LeftBrace),
            '}' => self.emit(1, Token::RightBrace),
            ',' => self.emit(1, Token::Comma),
            ';' => self.emit(1, Token::Semicolon),

            c if c.is_alphabetic() || c == '_' => {
                let word = self.read_word();
                Ok(match word.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    _ => Token::Identifier(word),
                })
            }

            other => Err(ParserError::UnexpectedCharacter(other, self.position)),
        }
    }

    /// Scan the whole input, ending with `Token::Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>, ParserError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }
}

/// Keywords of the full language that this parser recognises only to reject.
const UNSUPPORTED_KEYWORDS: &[&str] = &[
    "reduce", "foreach", "if", "then", "elif", "else", "end", "as", "label", "import", "include",
    "catch",
];

/// Pratt parser over a scanned token list
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    depth: usize,
    max_depth: usize,
}

impl Parser {
    pub fn new(input: &str, max_depth: usize) -> Result<Self, ParserError> {
        Ok(Parser {
            tokens: Lexer::new(input).tokenize()?,
            position: 0,
            depth: 0,
            max_depth,
        })
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&Token::Eof)
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.position + 1).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.position < self.tokens.len() {
            self.position += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParserError> {
        if *self.current() == expected {
            self.advance();
            Ok(())
        } else if *self.current() == Token::Eof {
            Err(ParserError::UnexpectedEnd)
        } else {
            Err(ParserError::Expected {
                expected: expected.to_string(),
                found: self.current().to_string(),
            })
        }
    }

    fn unexpected(&self) -> ParserError {
        match self.current() {
            Token::Eof => ParserError::UnexpectedEnd,
            token => ParserError::UnexpectedToken(token.to_string()),
        }
    }

    /// Parse a whole program: leading definitions, then `;`-separated expressions.
    pub fn parse_program(&mut self) -> Result<Vec<Statement>, ParserError> {
        let mut statements = Vec::new();
        loop {
            match self.current() {
                Token::Eof => return Ok(statements),
                Token::Identifier(word) if word == "def" => {
                    statements.push(self.parse_definition()?);
                }
                _ => {
                    statements.push(Statement::Expr(self.parse_pipe()?));
                    match self.current() {
                        Token::Semicolon => {
                            self.advance();
                        }
                        Token::Eof => return Ok(statements),
                        other => {
                            return Err(ParserError::Expected {
                                expected: "';' or end of program".to_string(),
                                found: other.to_string(),
                            })
                        }
                    }
                }
            }
        }
    }

    fn parse_definition(&mut self) -> Result<Statement, ParserError> {
        self.advance(); // `def`
        let name = match self.advance() {
            Token::Identifier(name) => name,
            Token::Eof => return Err(ParserError::UnexpectedEnd),
            other => {
                return Err(ParserError::Expected {
                    expected: "function name".to_string(),
                    found: other.to_string(),
                })
            }
        };

        let mut params = Vec::new();
        if *self.current() == Token::LeftParen {
            self.advance();
            loop {
                match self.advance() {
                    Token::Identifier(param) => params.push(param),
                    Token::Variable(param) => params.push(format!("${}", param)),
                    Token::Eof => return Err(ParserError::UnexpectedEnd),
                    other => {
                        return Err(ParserError::Expected {
                            expected: "parameter name".to_string(),
                            found: other.to_string(),
                        })
                    }
                }
                match self.advance() {
                    Token::Semicolon => continue,
                    Token::RightParen => break,
                    Token::Eof => return Err(ParserError::UnexpectedEnd),
                    other => {
                        return Err(ParserError::Expected {
                            expected: "';' or ')'".to_string(),
                            found: other.to_string(),
                        })
                    }
                }
            }
        }

        self.expect(Token::Colon)?;
        let body = self.parse_pipe()?;
        self.expect(Token::Semicolon)?;
        Ok(Statement::FunctionDefinition { name, params, body })
    }

    /// `a | b | ...`
    fn parse_pipe(&mut self) -> Result<Expr, ParserError> {
        let first = self.parse_comma()?;
        if *self.current() != Token::Pipe {
            return Ok(first);
        }
        let mut stages = vec![first];
        while *self.current() == Token::Pipe {
            self.advance();
            stages.push(self.parse_comma()?);
        }
        Ok(Expr::Piped(stages))
    }

    /// `a, b, ...`
    fn parse_comma(&mut self) -> Result<Expr, ParserError> {
        let first = self.parse_expression(0)?;
        if *self.current() != Token::Comma {
            return Ok(first);
        }
        let mut branches = vec![first];
        while *self.current() == Token::Comma {
            self.advance();
            branches.push(self.parse_expression(0)?);
        }
        Ok(Expr::Parallel(branches))
    }

    /// Get the binding power (precedence) for an infix operator token
    fn binding_power(token: &Token) -> Option<(u8, u8, BinaryOp)> {
        // (left_bp, right_bp); right_bp < left_bp makes the operator right associative
        match token {
            Token::Alternative => Some((11, 10, BinaryOp::Alternative)),
            Token::Or => Some((20, 21, BinaryOp::Or)),
            Token::And => Some((30, 31, BinaryOp::And)),
            Token::Equal => Some((40, 41, BinaryOp::Equal)),
            Token::NotEqual => Some((40, 41, BinaryOp::NotEqual)),
            Token::LessThan => Some((40, 41, BinaryOp::LessThan)),
            Token::LessThanOrEqual => Some((40, 41, BinaryOp::LessThanOrEqual)),
            Token::GreaterThan => Some((40, 41, BinaryOp::GreaterThan)),
            Token::GreaterThanOrEqual => Some((40, 41, BinaryOp::GreaterThanOrEqual)),
            Token::Plus => Some((50, 51, BinaryOp::Add)),
            Token::Minus => Some((50, 51, BinaryOp::Subtract)),
            Token::Star => Some((60, 61, BinaryOp::Multiply)),
            Token::Slash => Some((60, 61, BinaryOp::Divide)),
            Token::Percent => Some((60, 61, BinaryOp::Modulo)),
            _ => None,
        }
    }

    /// Binary operators above comma precedence
    fn parse_expression(&mut self, min_bp: u8) -> Result<Expr, ParserError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ParserError::NestingTooDeep(self.max_depth));
        }
        let result = ensure_sufficient_stack(|| self.parse_binary(min_bp));
        self.depth -= 1;
        result
    }

    fn parse_binary(&mut self, min_bp: u8) -> Result<Expr, ParserError> {
        let mut lhs = self.parse_postfix()?;

        loop {
            if let Token::Update(op) = self.current() {
                return Err(ParserError::Unsupported(format!("update operator '{}'", op)));
            }
            let Some((left_bp, right_bp, op)) = Self::binding_power(self.current()) else {
                break;
            };
            if left_bp < min_bp {
                break;
            }
            self.advance();
            let rhs = self.parse_expression(right_bp)?;
            lhs = Expr::binary(op, lhs, rhs);
        }

        Ok(lhs)
    }

    /// A primary term followed by any number of suffixes
    fn parse_postfix(&mut self) -> Result<Expr, ParserError> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.current() {
                Token::Question => {
                    self.advance();
                    expr = Expr::Optional(Box::new(expr));
                }
                Token::Field(name) => {
                    let key = Expr::identifier(name.clone());
                    self.advance();
                    expr = indexed(expr, Indexer::Key(Box::new(key)));
                }
                Token::Dot if matches!(self.peek(), Token::String(_)) => {
                    self.advance();
                    if let Token::String(key) = self.advance() {
                        expr = indexed(expr, Indexer::Key(Box::new(Expr::string(key))));
                    }
                }
                Token::Dot if *self.peek() == Token::LeftBracket => {
                    self.advance();
                    self.advance();
                    let indexer = self.parse_indexer()?;
                    expr = indexed(expr, indexer);
                }
                Token::LeftBracket => {
                    self.advance();
                    let indexer = self.parse_indexer()?;
                    expr = indexed(expr, indexer);
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    /// Contents of `[...]` after the opening bracket, through the closing one
    fn parse_indexer(&mut self) -> Result<Indexer, ParserError> {
        if *self.current() == Token::RightBracket {
            self.advance();
            return Ok(Indexer::Spread);
        }

        let first = if *self.current() == Token::Colon {
            None
        } else {
            Some(Box::new(self.parse_pipe()?))
        };

        let indexer = if *self.current() == Token::Colon {
            self.advance();
            let last = if *self.current() == Token::RightBracket {
                None
            } else {
                Some(Box::new(self.parse_pipe()?))
            };
            Indexer::Slice { first, last }
        } else {
            match first {
                Some(key) => Indexer::Key(key),
                None => return Err(self.unexpected()),
            }
        };

        self.expect(Token::RightBracket)?;
        Ok(indexer)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParserError> {
        match self.current().clone() {
            Token::Number(n) => {
                self.advance();
                Ok(Expr::number(n))
            }
            Token::Minus if matches!(self.peek(), Token::Number(_)) => {
                self.advance();
                match self.advance() {
                    Token::Number(n) => Ok(Expr::number(-n)),
                    _ => Err(self.unexpected()),
                }
            }
            Token::String(s) => {
                self.advance();
                Ok(Expr::string(s))
            }
            Token::Dot => {
                self.advance();
                if let Token::String(key) = self.current().clone() {
                    self.advance();
                    return Ok(Expr::Indexed {
                        target: Box::new(Expr::Identity),
                        indexer: Indexer::Key(Box::new(Expr::string(key))),
                    });
                }
                Ok(Expr::Identity)
            }
            Token::Field(name) => {
                self.advance();
                Ok(Expr::field(name))
            }
            Token::DotDot => {
                self.advance();
                Ok(Expr::RecursiveDescent)
            }
            Token::LeftParen => {
                self.advance();
                let inner = self.nested(|p| p.parse_pipe())?;
                self.expect(Token::RightParen)?;
                Ok(inner)
            }
            Token::LeftBracket => {
                self.advance();
                if *self.current() == Token::RightBracket {
                    self.advance();
                    return Ok(Expr::Array(Vec::new()));
                }
                let inner = self.nested(|p| p.parse_pipe())?;
                self.expect(Token::RightBracket)?;
                Ok(match inner {
                    Expr::Parallel(elements) => Expr::Array(elements),
                    single => Expr::Array(vec![single]),
                })
            }
            Token::LeftBrace => {
                self.advance();
                self.nested(|p| p.parse_object())
            }
            Token::Variable(name) => Err(ParserError::Unsupported(format!("variable ${}", name))),
            Token::Identifier(word) => self.parse_word(word),
            _ => Err(self.unexpected()),
        }
    }

    // Run `f` one nesting level deeper.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, ParserError>) -> Result<T, ParserError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ParserError::NestingTooDeep(self.max_depth));
        }
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn parse_word(&mut self, word: String) -> Result<Expr, ParserError> {
        match word.as_str() {
            "null" => {
                self.advance();
                return Ok(Expr::Literal(Literal::Null));
            }
            "true" | "false" => {
                self.advance();
                return Ok(Expr::boolean(word == "true"));
            }
            "try" => {
                self.advance();
                let body = self.nested(|p| p.parse_postfix())?;
                return Ok(Expr::Optional(Box::new(body)));
            }
            "def" => {
                return Err(ParserError::Unsupported(
                    "function definition inside an expression".to_string(),
                ))
            }
            w if UNSUPPORTED_KEYWORDS.contains(&w) => {
                return Err(ParserError::Unsupported(format!("'{}'", w)))
            }
            _ => {}
        }

        self.advance();
        let mut args = Vec::new();
        if *self.current() == Token::LeftParen {
            self.advance();
            self.nested(|p| {
                loop {
                    args.push(p.parse_pipe()?);
                    match p.current() {
                        Token::Semicolon => {
                            p.advance();
                        }
                        Token::RightParen => {
                            p.advance();
                            return Ok(());
                        }
                        Token::Eof => return Err(ParserError::UnexpectedEnd),
                        other => {
                            return Err(ParserError::Expected {
                                expected: "';' or ')'".to_string(),
                                found: other.to_string(),
                            })
                        }
                    }
                }
            })?;
        }
        Ok(Expr::FunctionCall { name: word, args })
    }

    /// Object constructor body after `{`, through the closing `}`
    fn parse_object(&mut self) -> Result<Expr, ParserError> {
        let mut fields = Vec::new();
        if *self.current() == Token::RightBrace {
            self.advance();
            return Ok(Expr::Object(fields));
        }

        loop {
            let key = match self.advance() {
                Token::Identifier(name) => Expr::Identifier(name),
                Token::And => Expr::identifier("and"),
                Token::Or => Expr::identifier("or"),
                Token::String(s) => Expr::string(s),
                Token::LeftParen => {
                    let key = self.parse_pipe()?;
                    self.expect(Token::RightParen)?;
                    key
                }
                Token::Variable(name) => {
                    return Err(ParserError::Unsupported(format!("variable ${}", name)))
                }
                Token::Eof => return Err(ParserError::UnexpectedEnd),
                other => {
                    return Err(ParserError::Expected {
                        expected: "object key".to_string(),
                        found: other.to_string(),
                    })
                }
            };

            let value = if *self.current() == Token::Colon {
                self.advance();
                Some(self.parse_expression(0)?)
            } else {
                None
            };
            fields.push(Field { key, value });

            match self.advance() {
                Token::Comma => continue,
                Token::RightBrace => return Ok(Expr::Object(fields)),
                Token::Eof => return Err(ParserError::UnexpectedEnd),
                other => {
                    return Err(ParserError::Expected {
                        expected: "',' or '}'".to_string(),
                        found: other.to_string(),
                    })
                }
            }
        }
    }
}

fn indexed(target: Expr, indexer: Indexer) -> Expr {
    Expr::Indexed {
        target: Box::new(target),
        indexer,
    }
}

/// Parse source text into top-level statements.
pub fn parse(source: &str) -> Result<Vec<Statement>, ParserError> {
    parse_with_depth(source, DEFAULT_MAX_DEPTH)
}

/// Parse with an explicit nesting bound.
pub fn parse_with_depth(source: &str, max_depth: usize) -> Result<Vec<Statement>, ParserError> {
    Parser::new(source, max_depth)?.parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::dump_statements;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn parse_one(source: &str) -> Expr {
        let mut statements = parse(source).unwrap();
        assert_eq!(statements.len(), 1, "{}", source);
        match statements.remove(0) {
            Statement::Expr(expr) => expr,
            other => panic!("expected an expression, got {:?}", other),
        }
    }

    #[test]
    fn test_lexer_tokens() {
        let tokens = Lexer::new(".foo | .[1:] // \"x\"").tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Field("foo".to_string()),
                Token::Pipe,
                Token::Dot,
                Token::LeftBracket,
                Token::Number(1.0),
                Token::Colon,
                Token::RightBracket,
                Token::Alternative,
                Token::String("x".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_lexer_escapes_and_comments() {
        let tokens = Lexer::new("\"a\\n\\u00e9\\ud83d\\ude00\" # trailing").tokenize().unwrap();
        assert_eq!(tokens, vec![Token::String("a\né😀".to_string()), Token::Eof]);
        assert_eq!(
            Lexer::new("\"\\q\"").tokenize(),
            Err(ParserError::InvalidEscape("\\q".to_string()))
        );
        assert_eq!(Lexer::new("\"abc").tokenize(), Err(ParserError::UnclosedString));
        assert_eq!(
            Lexer::new("1e").tokenize(),
            Err(ParserError::InvalidNumber("1e".to_string()))
        );
        assert_eq!(Lexer::new("@").tokenize(), Err(ParserError::UnexpectedCharacter('@', 0)));
    }

    #[test]
    fn test_field_and_index() {
        assert_eq!(
            parse_one(".foo[0]").dump(),
            json!({
                "indexing": {"indexing": {"identity": 0}, "indexer": {"key": {"id": "foo"}}},
                "indexer": {"key": 0}
            })
        );
        assert_eq!(
            parse_one(".[\"a b\"]").dump(),
            json!({"indexing": {"identity": 0}, "indexer": {"key": "a b"}})
        );
        assert_eq!(parse_one("..").dump(), json!({"recursiveDescendant": 0}));
    }

    #[test]
    fn test_slices_and_spread() {
        assert_eq!(
            parse_one(".[2:4]").dump(),
            json!({"indexing": {"identity": 0}, "indexer": [2, 4]})
        );
        assert_eq!(
            parse_one(".[:-1]").dump(),
            json!({"indexing": {"identity": 0}, "indexer": ["start", -1]})
        );
        assert_eq!(
            parse_one(".[1:]").dump(),
            json!({"indexing": {"identity": 0}, "indexer": [1, "last"]})
        );
        assert_eq!(
            parse_one(".[]?").dump(),
            json!({"optional": {"indexing": {"identity": 0}, "indexer": {"spread": 0}}})
        );
    }

    #[test]
    fn test_precedence() {
        assert_eq!(parse_one("1 + 2 * 3").dump(), json!({"+": [1, {"*": [2, 3]}]}));
        assert_eq!(parse_one("1 - 2 - 3").dump(), json!({"-": [{"-": [1, 2]}, 3]}));
        assert_eq!(parse_one("1 // 2 // 3").dump(), json!({"//": [1, {"//": [2, 3]}]}));
        assert_eq!(
            parse_one("1 == 1 and 2 < 3 or false").dump(),
            json!({"or": [{"and": [{"==": [1, 1]}, {"<": [2, 3]}]}, false]})
        );
        assert_eq!(
            parse_one(".a, .b | length").dump(),
            json!({"piped": [
                {"parallel": [
                    {"indexing": {"identity": 0}, "indexer": {"key": {"id": "a"}}},
                    {"indexing": {"identity": 0}, "indexer": {"key": {"id": "b"}}}
                ]},
                {"call": {"length": []}}
            ]})
        );
    }

    #[test]
    fn test_negative_literals() {
        assert_eq!(parse_one(".[-2]").dump(), json!({"indexing": {"identity": 0}, "indexer": {"key": -2}}));
        assert_eq!(parse_one("3 -1").dump(), json!({"-": [3, 1]}));
    }

    #[test]
    fn test_array_and_object_construction() {
        assert_eq!(parse_one("[]").dump(), json!({"array": []}));
        assert_eq!(parse_one("[1, 2]").dump(), json!({"array": [1, 2]}));
        assert_eq!(
            parse_one("{user, title: .titles[], \"k\": 1, (.x): 2}").dump(),
            json!({"object": [
                {"key": {"id": "user"}, "value": null},
                {"key": {"id": "title"}, "value": {
                    "indexing": {"indexing": {"identity": 0}, "indexer": {"key": {"id": "titles"}}},
                    "indexer": {"spread": 0}
                }},
                {"key": "k", "value": 1},
                {"key": {"indexing": {"identity": 0}, "indexer": {"key": {"id": "x"}}}, "value": 2}
            ]})
        );
    }

    #[test]
    fn test_function_calls() {
        assert_eq!(
            parse_one("range(0; 10; 2)").dump(),
            json!({"call": {"range": [0, 10, 2]}})
        );
        assert_eq!(
            parse_one("map(. + 1)").dump(),
            json!({"call": {"map": [{"+": [{"identity": 0}, 1]}]}})
        );
        assert_eq!(
            parse_one("try error(\"x\")").dump(),
            json!({"optional": {"call": {"error": ["x"]}}})
        );
    }

    #[test]
    fn test_program_statements() {
        let statements = parse("def inc(f): f + 1; .a; .b").unwrap();
        assert_eq!(
            dump_statements(&statements),
            json!({"statements": [
                {"def": {"name": "inc", "params": ["f"], "body": {"+": [{"call": {"f": []}}, 1]}}},
                {"indexing": {"identity": 0}, "indexer": {"key": {"id": "a"}}},
                {"indexing": {"identity": 0}, "indexer": {"key": {"id": "b"}}}
            ]})
        );
        assert!(parse("").unwrap().is_empty());
        assert!(parse("   # only a comment").unwrap().is_empty());
    }

    #[test]
    fn test_unsupported_syntax() {
        assert!(matches!(parse(".a |= 1"), Err(ParserError::Unsupported(_))));
        assert!(matches!(parse(".a = 1"), Err(ParserError::Unsupported(_))));
        assert!(matches!(parse("$x"), Err(ParserError::Unsupported(_))));
        assert!(matches!(parse("reduce .[] as $x (0; . + $x)"), Err(ParserError::Unsupported(_))));
        assert!(matches!(parse("\"\\(1)\""), Err(ParserError::Unsupported(_))));
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(parse("(1"), Err(ParserError::UnexpectedEnd));
        assert_eq!(parse(".a +"), Err(ParserError::UnexpectedEnd));
        assert!(matches!(parse(")"), Err(ParserError::UnexpectedToken(_))));
        assert!(matches!(parse("{a: 1 2}"), Err(ParserError::Expected { .. })));
        assert!(matches!(parse(". 1"), Err(ParserError::Expected { .. })));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "[".repeat(40), "]".repeat(40));
        assert!(parse_with_depth(&deep, 256).is_ok());
        assert_eq!(parse_with_depth(&deep, 16), Err(ParserError::NestingTooDeep(16)));
    }
}
