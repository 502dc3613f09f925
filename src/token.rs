use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
  Illegal,
  Eof,

  Identifier,
  Int,
  String,

  Assign,
  Plus,
  Minus,
  Star,
  Slash,
  Percent,
  Bang,

  EqualEqual,
  BangEqual,
  Less,
  LessEqual,
  Greater,
  GreaterEqual,

  And,
  Or,

  Comma,
  Semicolon,
  Colon,

  LeftParen,
  RightParen,
  LeftBrace,
  RightBrace,
  LeftBracket,
  RightBracket,

  If,
  Else,
  True,
  False,
  Function,
  Return,
}

impl TokenKind {
  /// Whether a newline directly after this token terminates the statement.
  pub fn ends_statement(self) -> bool {
    matches!(
      self,
      TokenKind::Identifier
        | TokenKind::Int
        | TokenKind::String
        | TokenKind::True
        | TokenKind::False
        | TokenKind::RightParen
        | TokenKind::RightBrace
        | TokenKind::RightBracket
    )
  }

  pub fn as_str(self) -> &'static str {
    match self {
      TokenKind::Illegal => "ILLEGAL",
      TokenKind::Eof => "EOF",
      TokenKind::Identifier => "IDENT",
      TokenKind::Int => "INT",
      TokenKind::String => "STRING",
      TokenKind::Assign => "=",
      TokenKind::Plus => "+",
      TokenKind::Minus => "-",
      TokenKind::Star => "*",
      TokenKind::Slash => "/",
      TokenKind::Percent => "%",
      TokenKind::Bang => "!",
      TokenKind::EqualEqual => "==",
      TokenKind::BangEqual => "!=",
      TokenKind::Less => "<",
      TokenKind::LessEqual => "<=",
      TokenKind::Greater => ">",
      TokenKind::GreaterEqual => ">=",
      TokenKind::And => "&&",
      TokenKind::Or => "||",
      TokenKind::Comma => ",",
      TokenKind::Semicolon => ";",
      TokenKind::Colon => ":",
      TokenKind::LeftParen => "(",
      TokenKind::RightParen => ")",
      TokenKind::LeftBrace => "{",
      TokenKind::RightBrace => "}",
      TokenKind::LeftBracket => "[",
      TokenKind::RightBracket => "]",
      TokenKind::If => "IF",
      TokenKind::Else => "ELSE",
      TokenKind::True => "TRUE",
      TokenKind::False => "FALSE",
      TokenKind::Function => "FUNCTION",
      TokenKind::Return => "RETURN",
    }
  }
}

impl fmt::Display for TokenKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// 1-based line and byte column of the first character of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
  pub line: usize,
  pub column: usize,
}

impl Position {
  pub fn new(line: usize, column: usize) -> Position {
    Position { line, column }
  }
}

impl fmt::Display for Position {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.line, self.column)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
  pub kind: TokenKind,
  pub literal: String,
  pub position: Position,
}

impl Token {
  pub fn new(kind: TokenKind, literal: impl Into<String>, position: Position) -> Token {
    Token {
      kind,
      literal: literal.into(),
      position,
    }
  }

  pub fn is(&self, kind: TokenKind) -> bool {
    self.kind == kind
  }
}
