use logos::Logos;

use crate::token::{Position, Token, TokenKind};

/// Raw lexemes as recognised by the generated automaton. Newlines are kept so
/// the [`Lexer`] can decide whether they end a statement.
#[derive(Logos, Clone, Copy, Debug, PartialEq)]
#[logos(skip r"[ \t\r\f]+")]
enum Lexeme {
    #[token("\n")]
    Newline,

    #[token("(")]
    LeftParen,

    #[token(")")]
    RightParen,

    #[token("{")]
    LeftBrace,

    #[token("}")]
    RightBrace,

    #[token("[")]
    LeftBracket,

    #[token("]")]
    RightBracket,

    #[token(";")]
    Semicolon,

    #[token(":")]
    Colon,

    #[token(",")]
    Comma,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("%")]
    Percent,

    #[token("=")]
    Assign,

    #[token("!")]
    Bang,

    #[token("<")]
    Less,

    #[token(">")]
    Greater,

    #[token("<=")]
    LessEqual,

    #[token(">=")]
    GreaterEqual,

    #[token("==")]
    EqualEqual,

    #[token("!=")]
    BangEqual,

    #[token("&&")]
    And,

    #[token("||")]
    Or,

    #[token("fn")]
    Function,

    #[token("return")]
    Return,

    #[token("if")]
    If,

    #[token("else")]
    Else,

    #[token("true")]
    True,

    #[token("false")]
    False,

    #[regex(r"[0-9]+")]
    Int,

    // The closing quote is optional: an unterminated string runs to the end
    // of the input.
    #[regex(r#""[^"]*"?"#)]
    String,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Identifier,
}

impl Lexeme {
    fn kind(self) -> TokenKind {
        match self {
            // Newlines never reach the parser as themselves.
            Lexeme::Newline | Lexeme::Semicolon => TokenKind::Semicolon,
            Lexeme::LeftParen => TokenKind::LeftParen,
            Lexeme::RightParen => TokenKind::RightParen,
            Lexeme::LeftBrace => TokenKind::LeftBrace,
            Lexeme::RightBrace => TokenKind::RightBrace,
            Lexeme::LeftBracket => TokenKind::LeftBracket,
            Lexeme::RightBracket => TokenKind::RightBracket,
            Lexeme::Colon => TokenKind::Colon,
            Lexeme::Comma => TokenKind::Comma,
            Lexeme::Plus => TokenKind::Plus,
            Lexeme::Minus => TokenKind::Minus,
            Lexeme::Star => TokenKind::Star,
            Lexeme::Slash => TokenKind::Slash,
            Lexeme::Percent => TokenKind::Percent,
            Lexeme::Assign => TokenKind::Assign,
            Lexeme::Bang => TokenKind::Bang,
            Lexeme::Less => TokenKind::Less,
            Lexeme::Greater => TokenKind::Greater,
            Lexeme::LessEqual => TokenKind::LessEqual,
            Lexeme::GreaterEqual => TokenKind::GreaterEqual,
            Lexeme::EqualEqual => TokenKind::EqualEqual,
            Lexeme::BangEqual => TokenKind::BangEqual,
            Lexeme::And => TokenKind::And,
            Lexeme::Or => TokenKind::Or,
            Lexeme::Function => TokenKind::Function,
            Lexeme::Return => TokenKind::Return,
            Lexeme::If => TokenKind::If,
            Lexeme::Else => TokenKind::Else,
            Lexeme::True => TokenKind::True,
            Lexeme::False => TokenKind::False,
            Lexeme::Int => TokenKind::Int,
            Lexeme::String => TokenKind::String,
            Lexeme::Identifier => TokenKind::Identifier,
        }
    }
}

fn string_contents(slice: &str) -> &str {
    let inner = &slice[1..];
    inner.strip_suffix('"').unwrap_or(inner)
}

/// Token stream over a source string.
///
/// Newlines are insignificant whitespace except directly after a token that
/// can end a statement (see [`TokenKind::ends_statement`]), where they are
/// turned into a `;` token whose literal is `"\n"`.
#[derive(Clone)]
pub struct Lexer<'a> {
    lexemes: logos::Lexer<'a, Lexeme>,
    insert_semicolon: bool,
    line: usize,
    line_start: usize,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            lexemes: Lexeme::lexer(input),
            insert_semicolon: false,
            line: 1,
            line_start: 0,
            finished: false,
        }
    }

    /// Returns the next token. Once the input is exhausted every further call
    /// returns EOF.
    pub fn next_token(&mut self) -> Token {
        loop {
            let lexeme = match self.lexemes.next() {
                Some(lexeme) => lexeme,
                None => {
                    let position = self.position_of(self.lexemes.source().len());
                    self.insert_semicolon = false;
                    return Token::new(TokenKind::Eof, "", position);
                }
            };

            let span = self.lexemes.span();
            let position = self.position_of(span.start);

            match lexeme {
                Ok(Lexeme::Newline) => {
                    self.new_line(span.end);

                    if self.insert_semicolon {
                        self.insert_semicolon = false;
                        return Token::new(TokenKind::Semicolon, "\n", position);
                    }
                }
                Ok(lexeme) => {
                    let kind = lexeme.kind();
                    let source: &'a str = self.lexemes.source();
                    let slice = &source[span.clone()];

                    let literal = if kind == TokenKind::String {
                        for (offset, c) in slice.char_indices() {
                            if c == '\n' {
                                self.new_line(span.start + offset + 1);
                            }
                        }
                        string_contents(slice).to_owned()
                    } else {
                        slice.to_owned()
                    };

                    self.insert_semicolon = kind.ends_statement();
                    return Token::new(kind, literal, position);
                }
                Err(()) => {
                    let source = self.lexemes.source();
                    let literal = match source.get(span.clone()) {
                        Some(text) => text.to_owned(),
                        None => String::from_utf8_lossy(&source.as_bytes()[span]).into_owned(),
                    };

                    self.insert_semicolon = false;
                    return Token::new(TokenKind::Illegal, literal, position);
                }
            }
        }
    }

    fn position_of(&self, offset: usize) -> Position {
        Position::new(self.line, offset - self.line_start + 1)
    }

    fn new_line(&mut self, line_start: usize) {
        self.line += 1;
        self.line_start = line_start;
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    /// Yields every token up to and including the first EOF.
    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }

        let token = self.next_token();
        if token.is(TokenKind::Eof) {
            self.finished = true;
        }

        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind::*;

    fn kinds(input: &str) -> Vec<(TokenKind, std::string::String)> {
        Lexer::new(input)
            .map(|token| (token.kind, token.literal))
            .collect()
    }

    fn assert_tokens(input: &str, expected: &[(TokenKind, &str)]) {
        let tokens = kinds(input);
        let expected = expected
            .iter()
            .map(|(kind, literal)| (*kind, literal.to_string()))
            .collect::<Vec<_>>();

        assert_eq!(tokens, expected, "input: {:?}", input);
    }

    #[test]
    fn operators_and_delimiters() {
        assert_tokens(
            "= + - * / % ! == != <= >= < > && || , ; : ( ) { } [ ]",
            &[
                (Assign, "="),
                (Plus, "+"),
                (Minus, "-"),
                (Star, "*"),
                (Slash, "/"),
                (Percent, "%"),
                (Bang, "!"),
                (EqualEqual, "=="),
                (BangEqual, "!="),
                (LessEqual, "<="),
                (GreaterEqual, ">="),
                (Less, "<"),
                (Greater, ">"),
                (And, "&&"),
                (Or, "||"),
                (Comma, ","),
                (Semicolon, ";"),
                (Colon, ":"),
                (LeftParen, "("),
                (RightParen, ")"),
                (LeftBrace, "{"),
                (RightBrace, "}"),
                (LeftBracket, "["),
                (RightBracket, "]"),
                (Eof, ""),
            ],
        );
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_tokens(
            "if aelse else fn return true false _ _99 qwe123 iffy",
            &[
                (If, "if"),
                (Identifier, "aelse"),
                (Else, "else"),
                (Function, "fn"),
                (Return, "return"),
                (True, "true"),
                (False, "false"),
                (Identifier, "_"),
                (Identifier, "_99"),
                (Identifier, "qwe123"),
                (Identifier, "iffy"),
                (Eof, ""),
            ],
        );
    }

    #[test]
    fn newline_becomes_semicolon_after_statement_end() {
        assert_tokens(
            "x = 2 + 3 \n_ 3123 - 7\nq = fn(x,y){\n\tr = x+y\n\treturn r\n}\n",
            &[
                (Identifier, "x"),
                (Assign, "="),
                (Int, "2"),
                (Plus, "+"),
                (Int, "3"),
                (Semicolon, "\n"),
                (Identifier, "_"),
                (Int, "3123"),
                (Minus, "-"),
                (Int, "7"),
                (Semicolon, "\n"),
                (Identifier, "q"),
                (Assign, "="),
                (Function, "fn"),
                (LeftParen, "("),
                (Identifier, "x"),
                (Comma, ","),
                (Identifier, "y"),
                (RightParen, ")"),
                (LeftBrace, "{"),
                (Identifier, "r"),
                (Assign, "="),
                (Identifier, "x"),
                (Plus, "+"),
                (Identifier, "y"),
                (Semicolon, "\n"),
                (Return, "return"),
                (Identifier, "r"),
                (Semicolon, "\n"),
                (RightBrace, "}"),
                (Semicolon, "\n"),
                (Eof, ""),
            ],
        );
    }

    #[test]
    fn newline_is_whitespace_after_operators_and_openers() {
        assert_tokens(
            "1 +\n2\n[\n3,\n4]",
            &[
                (Int, "1"),
                (Plus, "+"),
                (Int, "2"),
                (Semicolon, "\n"),
                (LeftBracket, "["),
                (Int, "3"),
                (Comma, ","),
                (Int, "4"),
                (RightBracket, "]"),
                (Eof, ""),
            ],
        );
    }

    #[test]
    fn blank_lines_produce_one_semicolon() {
        assert_tokens(
            "a\n\n\nb",
            &[(Identifier, "a"), (Semicolon, "\n"), (Identifier, "b"), (Eof, "")],
        );
    }

    #[test]
    fn strings() {
        assert_tokens(
            "\"abc\" \"a 1 -2 yy\" \"\"",
            &[
                (String, "abc"),
                (String, "a 1 -2 yy"),
                (String, ""),
                (Eof, ""),
            ],
        );
    }

    #[test]
    fn unterminated_string_runs_to_end() {
        assert_tokens("x = \"abc", &[(Identifier, "x"), (Assign, "="), (String, "abc"), (Eof, "")]);
        assert_tokens("\"", &[(String, ""), (Eof, "")]);
    }

    #[test]
    fn illegal_characters() {
        assert_tokens(
            "a & b | c @",
            &[
                (Identifier, "a"),
                (Illegal, "&"),
                (Identifier, "b"),
                (Illegal, "|"),
                (Identifier, "c"),
                (Illegal, "@"),
                (Eof, ""),
            ],
        );
    }

    #[test]
    fn positions() {
        let tokens = Lexer::new("x = 1\n  y\n\"a\nb\" z").collect::<Vec<_>>();
        let positions = tokens
            .iter()
            .map(|token| (token.kind, token.position.line, token.position.column))
            .collect::<Vec<_>>();

        assert_eq!(
            positions,
            vec![
                (Identifier, 1, 1),
                (Assign, 1, 3),
                (Int, 1, 5),
                (Semicolon, 1, 6),
                (Identifier, 2, 3),
                (Semicolon, 2, 4),
                (String, 3, 1),
                (Identifier, 4, 4),
                (Eof, 4, 5),
            ]
        );
    }

    #[test]
    fn eof_repeats() {
        let mut lexer = Lexer::new("1");
        assert_eq!(lexer.next_token().kind, Int);
        assert_eq!(lexer.next_token().kind, Eof);
        assert_eq!(lexer.next_token().kind, Eof);
    }
}
