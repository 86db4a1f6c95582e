//! 谓词表达式
//!
//! 规则条件中 `predicate` 操作符使用的封闭式小语言，只能对单个字符串值做判断，
//! 不具备执行任意代码的能力。
//!
//! ```text
//! expr    := or
//! or      := and ( "||" and )*
//! and     := unary ( "&&" unary )*
//! unary   := "!" unary | primary
//! primary := "(" expr ")" | call
//! call    := ident "(" [ arg ] ")"
//! arg     := 'string' | "string" | unsigned integer
//! ```

use crate::r#const::expr;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 谓词解析错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error("unexpected character {0:?} at offset {1}")]
    UnexpectedChar(char, usize),

    #[error("unterminated string literal starting at offset {0}")]
    UnterminatedString(usize),

    #[error("integer literal at offset {0} is out of range")]
    IntegerOverflow(usize),

    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: &'static str, found: String },

    #[error("unexpected end of input, expected {0}")]
    UnexpectedEnd(&'static str),

    #[error("unknown function {0:?}")]
    UnknownFunction(String),

    #[error("function {0:?} called with a wrong argument")]
    BadArgument(String),

    #[error("empty expression")]
    Empty,

    #[error("expression is {0} bytes long, limit is {1}")]
    TooLong(usize, usize),

    #[error("expression nests deeper than {0} levels")]
    TooDeep(usize),
}

// 词法单元
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    LParen,
    RParen,
    Not,
    And,
    Or,
    Ident(String),
    Str(String),
    Int(usize),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::Not => write!(f, "'!'"),
            Token::And => write!(f, "'&&'"),
            Token::Or => write!(f, "'||'"),
            Token::Ident(name) => write!(f, "identifier {:?}", name),
            Token::Str(s) => write!(f, "string {:?}", s),
            Token::Int(n) => write!(f, "integer {}", n),
        }
    }
}

// 将输入切分为词法单元
fn tokenize(input: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '!' => {
                chars.next();
                tokens.push(Token::Not);
            }
            '&' | '|' => {
                chars.next();
                match chars.next() {
                    Some((_, next)) if next == c => {
                        tokens.push(if c == '&' { Token::And } else { Token::Or });
                    }
                    _ => return Err(ExprError::UnexpectedChar(c, pos)),
                }
            }
            '\'' | '"' => {
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                while let Some((_, ch)) = chars.next() {
                    match ch {
                        '\\' => match chars.next() {
                            Some((_, escaped)) => value.push(escaped),
                            None => break,
                        },
                        ch if ch == c => {
                            closed = true;
                            break;
                        }
                        ch => value.push(ch),
                    }
                }
                if !closed {
                    return Err(ExprError::UnterminatedString(pos));
                }
                tokens.push(Token::Str(value));
            }
            c if c.is_ascii_digit() => {
                let mut digits = String::new();
                while let Some(&(_, d)) = chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    digits.push(d);
                    chars.next();
                }
                let value = digits
                    .parse::<usize>()
                    .map_err(|_| ExprError::IntegerOverflow(pos))?;
                tokens.push(Token::Int(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&(_, ch)) = chars.peek() {
                    if !(ch.is_ascii_alphanumeric() || ch == '_') {
                        break;
                    }
                    ident.push(ch);
                    chars.next();
                }
                tokens.push(Token::Ident(ident));
            }
            other => return Err(ExprError::UnexpectedChar(other, pos)),
        }
    }

    Ok(tokens)
}

/// 谓词支持的函数，作用于被检查的字段值
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Function {
    StartsWith(String),
    EndsWith(String),
    Contains(String),
    Equals(String),
    LenEq(usize),
    LenGt(usize),
    LenGte(usize),
    LenLt(usize),
    LenLte(usize),
    IsNumeric,
    IsEmpty,
}

// 函数参数
enum Arg {
    None,
    Str(String),
    Int(usize),
}

impl Function {
    // 根据函数名和参数构造函数调用
    fn build(name: &str, arg: Arg) -> Result<Self, ExprError> {
        let bad_arg = || ExprError::BadArgument(name.to_string());
        let function = match (name, arg) {
            ("starts_with", Arg::Str(s)) => Function::StartsWith(s),
            ("ends_with", Arg::Str(s)) => Function::EndsWith(s),
            ("contains", Arg::Str(s)) => Function::Contains(s),
            ("equals", Arg::Str(s)) => Function::Equals(s),
            ("len_eq", Arg::Int(n)) => Function::LenEq(n),
            ("len_gt", Arg::Int(n)) => Function::LenGt(n),
            ("len_gte", Arg::Int(n)) => Function::LenGte(n),
            ("len_lt", Arg::Int(n)) => Function::LenLt(n),
            ("len_lte", Arg::Int(n)) => Function::LenLte(n),
            ("is_numeric", Arg::None) => Function::IsNumeric,
            ("is_empty", Arg::None) => Function::IsEmpty,
            (
                "starts_with" | "ends_with" | "contains" | "equals" | "len_eq" | "len_gt"
                | "len_gte" | "len_lt" | "len_lte" | "is_numeric" | "is_empty",
                _,
            ) => return Err(bad_arg()),
            (other, _) => return Err(ExprError::UnknownFunction(other.to_string())),
        };
        Ok(function)
    }

    fn eval(&self, x: &str) -> bool {
        let len = || x.chars().count();
        match self {
            Function::StartsWith(s) => x.starts_with(s.as_str()),
            Function::EndsWith(s) => x.ends_with(s.as_str()),
            Function::Contains(s) => x.contains(s.as_str()),
            Function::Equals(s) => x == s,
            Function::LenEq(n) => len() == *n,
            Function::LenGt(n) => len() > *n,
            Function::LenGte(n) => len() >= *n,
            Function::LenLt(n) => len() < *n,
            Function::LenLte(n) => len() <= *n,
            Function::IsNumeric => super::parse_number(x).is_some(),
            Function::IsEmpty => x.is_empty(),
        }
    }
}

/// 已解析的谓词表达式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Call(Function),
    Not(Box<Predicate>),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    /// 解析谓词文本
    ///
    /// 文本长度和嵌套深度都有上限，超出时返回错误，解析与求值的递归深度因此有界。
    pub fn parse(input: &str) -> Result<Self, ExprError> {
        if input.len() > expr::PREDICATE_MAX_LEN {
            return Err(ExprError::TooLong(input.len(), expr::PREDICATE_MAX_LEN));
        }

        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(ExprError::Empty);
        }

        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let predicate = parser.parse_or()?;

        // 不允许多余的输入
        if let Some(token) = parser.peek() {
            return Err(ExprError::UnexpectedToken {
                expected: "end of input",
                found: token.to_string(),
            });
        }

        Ok(predicate)
    }

    /// 对字段值求值
    pub fn eval(&self, x: &str) -> bool {
        match self {
            Predicate::Call(function) => function.eval(x),
            Predicate::Not(inner) => !inner.eval(x),
            Predicate::And(lhs, rhs) => lhs.eval(x) && rhs.eval(x),
            Predicate::Or(lhs, rhs) => lhs.eval(x) || rhs.eval(x),
        }
    }
}

impl FromStr for Predicate {
    type Err = ExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Predicate::parse(s)
    }
}

// 递归下降解析器
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    // 当前 `!` 与括号的嵌套层数
    depth: usize,
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

    fn enter(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > expr::PREDICATE_MAX_DEPTH {
            return Err(ExprError::TooDeep(expr::PREDICATE_MAX_DEPTH));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn expect(&mut self, expected: Token, what: &'static str) -> Result<(), ExprError> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(ExprError::UnexpectedToken {
                expected: what,
                found: token.to_string(),
            }),
            None => Err(ExprError::UnexpectedEnd(what)),
        }
    }

    fn parse_or(&mut self) -> Result<Predicate, ExprError> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let rhs = self.parse_and()?;
            lhs = Predicate::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Predicate, ExprError> {
        let mut lhs = self.parse_unary()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Predicate::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Predicate, ExprError> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            self.enter()?;
            let inner = self.parse_unary()?;
            self.leave();
            return Ok(Predicate::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Predicate, ExprError> {
        match self.next() {
            Some(Token::LParen) => {
                self.enter()?;
                let inner = self.parse_or()?;
                self.expect(Token::RParen, "')'")?;
                self.leave();
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                self.expect(Token::LParen, "'('")?;
                let arg = match self.peek() {
                    Some(Token::Str(_)) | Some(Token::Int(_)) => match self.next() {
                        Some(Token::Str(s)) => Arg::Str(s),
                        Some(Token::Int(n)) => Arg::Int(n),
                        _ => Arg::None,
                    },
                    _ => Arg::None,
                };
                self.expect(Token::RParen, "')'")?;
                Ok(Predicate::Call(Function::build(&name, arg)?))
            }
            Some(token) => Err(ExprError::UnexpectedToken {
                expected: "function call or '('",
                found: token.to_string(),
            }),
            None => Err(ExprError::UnexpectedEnd("function call or '('")),
        }
    }
}
