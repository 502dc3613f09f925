use std::rc::Rc;

use log::trace;

use crate::ast::{BlockStatement, Expression, InfixOperator, PrefixOperator, Program, Statement};
use crate::lexer::Lexer;
use crate::token::{Position, Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    LogicalOr,
    LogicalAnd,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
}

fn precedence_of(kind: TokenKind) -> Precedence {
    match kind {
        TokenKind::Or => Precedence::LogicalOr,
        TokenKind::And => Precedence::LogicalAnd,
        TokenKind::EqualEqual | TokenKind::BangEqual => Precedence::Equals,
        TokenKind::Less | TokenKind::LessEqual | TokenKind::Greater | TokenKind::GreaterEqual => {
            Precedence::LessGreater
        }
        TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Precedence::Product,
        TokenKind::LeftParen | TokenKind::LeftBracket => Precedence::Call,
        _ => Precedence::Lowest,
    }
}

fn infix_operator(kind: TokenKind) -> Option<InfixOperator> {
    let operator = match kind {
        TokenKind::Plus => InfixOperator::Add,
        TokenKind::Minus => InfixOperator::Subtract,
        TokenKind::Star => InfixOperator::Multiply,
        TokenKind::Slash => InfixOperator::Divide,
        TokenKind::Percent => InfixOperator::Modulo,
        TokenKind::EqualEqual => InfixOperator::Equal,
        TokenKind::BangEqual => InfixOperator::NotEqual,
        TokenKind::Less => InfixOperator::Less,
        TokenKind::LessEqual => InfixOperator::LessEqual,
        TokenKind::Greater => InfixOperator::Greater,
        TokenKind::GreaterEqual => InfixOperator::GreaterEqual,
        TokenKind::And => InfixOperator::And,
        TokenKind::Or => InfixOperator::Or,
        _ => return None,
    };
    Some(operator)
}

type PrefixParseFn<'a> = fn(&mut Parser<'a>) -> Option<Expression>;
type InfixParseFn<'a> = fn(&mut Parser<'a>, Expression) -> Option<Expression>;

fn prefix_rule<'a>(kind: TokenKind) -> Option<PrefixParseFn<'a>> {
    let rule: PrefixParseFn<'a> = match kind {
        TokenKind::Identifier => Parser::parse_identifier,
        TokenKind::Int => Parser::parse_integer,
        TokenKind::String => Parser::parse_string,
        TokenKind::True | TokenKind::False => Parser::parse_boolean,
        TokenKind::Bang | TokenKind::Minus => Parser::parse_prefix_expression,
        TokenKind::LeftParen => Parser::parse_grouped_expression,
        TokenKind::If => Parser::parse_if_expression,
        TokenKind::Function => Parser::parse_function_literal,
        TokenKind::LeftBracket => Parser::parse_array_literal,
        TokenKind::LeftBrace => Parser::parse_hash_literal,
        _ => return None,
    };
    Some(rule)
}

fn infix_rule<'a>(kind: TokenKind) -> Option<InfixParseFn<'a>> {
    let rule: InfixParseFn<'a> = match kind {
        TokenKind::LeftParen => Parser::parse_call_expression,
        TokenKind::LeftBracket => Parser::parse_index_expression,
        kind if infix_operator(kind).is_some() => Parser::parse_infix_expression,
        _ => return None,
    };
    Some(rule)
}

/// Pratt parser. Syntax errors are collected rather than returned early, so a
/// single pass reports every independent mistake it can find.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    peek: Token,
    errors: Vec<String>,
}

impl<'a> Parser<'a> {
    pub fn new(mut lexer: Lexer<'a>) -> Self {
        let current = lexer.next_token();
        let peek = lexer.next_token();

        Self {
            lexer,
            current,
            peek,
            errors: Vec::new(),
        }
    }

    /// Parses the whole input. Every error string is prefixed with the
    /// `line:column` of the offending token.
    pub fn parse_program(mut self) -> (Program, Vec<String>) {
        let statements = self.parse_statements(TokenKind::Eof);
        trace!("parsed {} statements, {} errors", statements.len(), self.errors.len());

        (Program { statements }, self.errors)
    }

    fn next_token(&mut self) {
        let next = self.lexer.next_token();
        self.current = std::mem::replace(&mut self.peek, next);
    }

    fn current_is(&self, kind: TokenKind) -> bool {
        self.current.is(kind)
    }

    fn peek_is(&self, kind: TokenKind) -> bool {
        self.peek.is(kind)
    }

    fn peek_precedence(&self) -> Precedence {
        precedence_of(self.peek.kind)
    }

    fn current_precedence(&self) -> Precedence {
        precedence_of(self.current.kind)
    }

    fn error(&mut self, position: Position, message: String) {
        self.errors.push(format!("{}: {}", position, message));
    }

    fn peek_error(&mut self, kind: TokenKind) {
        let message = format!("expected next token: {}, got {}", kind, self.peek.kind);
        self.error(self.peek.position, message);
    }

    fn expect_peek(&mut self, kind: TokenKind) -> Option<()> {
        if self.peek_is(kind) {
            self.next_token();
            Some(())
        } else {
            self.peek_error(kind);
            None
        }
    }

    /// Skips semicolons that were inferred from newlines, letting list
    /// literals and argument lists span several lines.
    fn skip_inferred_semicolons(&mut self) {
        while self.peek_is(TokenKind::Semicolon) && self.peek.literal == "\n" {
            self.next_token();
        }
    }

    /// Parses statements until `closing` (or EOF) is the current token.
    fn parse_statements(&mut self, closing: TokenKind) -> Vec<Statement> {
        let mut statements = Vec::new();

        while !self.current_is(closing) && !self.current_is(TokenKind::Eof) {
            if self.current_is(TokenKind::Semicolon) {
                self.next_token();
                continue;
            }

            match self.parse_statement() {
                Some(statement) => {
                    statements.push(statement);
                    self.expect_terminator(closing);
                }
                None => {
                    // the failing token already closes the enclosing block
                    if self.current_is(closing) {
                        break;
                    }
                    self.synchronize(closing);
                }
            }

            self.next_token();
        }

        statements
    }

    fn expect_terminator(&mut self, closing: TokenKind) {
        match self.peek.kind {
            TokenKind::Semicolon => self.next_token(),
            TokenKind::Eof => {}
            kind if kind == closing => {}
            kind => {
                let message = match kind {
                    TokenKind::Illegal => format!("illegal token {:?}", self.peek.literal),
                    kind => format!("expected ; or newline after statement, got {}", kind),
                };
                self.error(self.peek.position, message);
                self.synchronize(closing);
            }
        }
    }

    /// Skips ahead to the end of the broken statement.
    fn synchronize(&mut self, closing: TokenKind) {
        if self.current_is(TokenKind::Semicolon) || self.current_is(closing) {
            return;
        }

        while !self.peek_is(TokenKind::Semicolon)
            && !self.peek_is(closing)
            && !self.peek_is(TokenKind::Eof)
        {
            self.next_token();
        }

        if self.peek_is(TokenKind::Semicolon) {
            self.next_token();
        }
    }

    fn parse_statement(&mut self) -> Option<Statement> {
        match self.current.kind {
            TokenKind::Identifier if self.peek_is(TokenKind::Assign) => self.parse_assign_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::LeftBrace => self.parse_brace_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_assign_statement(&mut self) -> Option<Statement> {
        let name = self.current.literal.clone();

        // skip the name and `=`
        self.next_token();
        self.next_token();

        let value = self.parse_expression(Precedence::Lowest)?;

        Some(Statement::Assign { name, value })
    }

    fn parse_return_statement(&mut self) -> Option<Statement> {
        self.next_token();

        let value = self.parse_expression(Precedence::Lowest)?;

        Some(Statement::Return(value))
    }

    fn parse_expression_statement(&mut self) -> Option<Statement> {
        self.parse_expression(Precedence::Lowest)
            .map(Statement::Expression)
    }

    /// A statement starting with `{` is a hashmap literal when it is `{}` or
    /// its first entry is followed by `:`, and a block otherwise. The first
    /// entry is parsed once and kept by whichever form it turns out to be.
    fn parse_brace_statement(&mut self) -> Option<Statement> {
        if self.peek_is(TokenKind::RightBrace) {
            return self.parse_expression_statement();
        }

        self.next_token();

        let starts_statement = match self.current.kind {
            TokenKind::Return | TokenKind::LeftBrace | TokenKind::Semicolon => true,
            TokenKind::Identifier => self.peek_is(TokenKind::Assign),
            _ => false,
        };
        if starts_statement {
            return self.finish_block(Vec::new()).map(Statement::Block);
        }

        match self.parse_expression(Precedence::Lowest) {
            Some(key) if self.peek_is(TokenKind::Colon) => {
                let hash_map = self.parse_hash_entries(key)?;
                self.parse_infix_chain(hash_map, Precedence::Lowest)
                    .map(Statement::Expression)
            }
            Some(expression) => {
                self.expect_terminator(TokenKind::RightBrace);
                self.next_token();
                self.finish_block(vec![Statement::Expression(expression)])
                    .map(Statement::Block)
            }
            None => {
                if !self.current_is(TokenKind::RightBrace) {
                    self.synchronize(TokenKind::RightBrace);
                    self.next_token();
                }
                self.finish_block(Vec::new()).map(Statement::Block)
            }
        }
    }

    fn parse_block_statement(&mut self) -> Option<BlockStatement> {
        self.next_token();
        self.finish_block(Vec::new())
    }

    /// Parses the remaining statements of a block whose leading statements
    /// have already been parsed, up to and including the closing `}`.
    fn finish_block(&mut self, mut statements: Vec<Statement>) -> Option<BlockStatement> {
        statements.extend(self.parse_statements(TokenKind::RightBrace));

        if !self.current_is(TokenKind::RightBrace) {
            let message = format!("expected next token: }}, got {}", self.current.kind);
            self.error(self.current.position, message);
            return None;
        }

        Some(BlockStatement { statements })
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Option<Expression> {
        let prefix = match prefix_rule(self.current.kind) {
            Some(rule) => rule,
            None => {
                self.no_prefix_parse_error();
                return None;
            }
        };

        let left = prefix(self)?;
        self.parse_infix_chain(left, precedence)
    }

    fn parse_infix_chain(&mut self, mut left: Expression, precedence: Precedence) -> Option<Expression> {
        while !self.peek_is(TokenKind::Semicolon) && precedence < self.peek_precedence() {
            let infix = match infix_rule(self.peek.kind) {
                Some(rule) => rule,
                None => return Some(left),
            };

            self.next_token();
            left = infix(self, left)?;
        }

        Some(left)
    }

    fn no_prefix_parse_error(&mut self) {
        let message = match self.current.kind {
            TokenKind::Illegal => format!("illegal token {:?}", self.current.literal),
            kind => format!("no prefix parse function for {}", kind),
        };
        self.error(self.current.position, message);
    }

    fn parse_identifier(&mut self) -> Option<Expression> {
        Some(Expression::Identifier(self.current.literal.clone()))
    }

    fn parse_integer(&mut self) -> Option<Expression> {
        match self.current.literal.parse::<i64>() {
            Ok(value) => Some(Expression::Integer(value)),
            Err(_) => {
                let message = format!("could not parse {:?} as integer", self.current.literal);
                self.error(self.current.position, message);
                None
            }
        }
    }

    fn parse_string(&mut self) -> Option<Expression> {
        Some(Expression::String(self.current.literal.clone()))
    }

    fn parse_boolean(&mut self) -> Option<Expression> {
        Some(Expression::Boolean(self.current_is(TokenKind::True)))
    }

    fn parse_prefix_expression(&mut self) -> Option<Expression> {
        let operator = match self.current.kind {
            TokenKind::Bang => PrefixOperator::Not,
            _ => PrefixOperator::Negate,
        };

        self.next_token();

        let operand = self.parse_expression(Precedence::Prefix)?;

        Some(Expression::Prefix {
            operator,
            operand: Box::new(operand),
        })
    }

    fn parse_infix_expression(&mut self, left: Expression) -> Option<Expression> {
        let operator = infix_operator(self.current.kind)?;
        let precedence = self.current_precedence();

        self.next_token();

        let right = self.parse_expression(precedence)?;

        Some(Expression::Infix {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        })
    }

    fn parse_grouped_expression(&mut self) -> Option<Expression> {
        self.next_token();

        let expression = self.parse_expression(Precedence::Lowest)?;

        self.skip_inferred_semicolons();
        self.expect_peek(TokenKind::RightParen)?;

        Some(expression)
    }

    fn parse_if_expression(&mut self) -> Option<Expression> {
        self.expect_peek(TokenKind::LeftParen)?;
        self.next_token();

        let condition = self.parse_expression(Precedence::Lowest)?;

        self.expect_peek(TokenKind::RightParen)?;
        self.expect_peek(TokenKind::LeftBrace)?;

        let consequence = self.parse_block_statement()?;

        let alternative = if self.peek_is(TokenKind::Else) {
            self.next_token();
            self.expect_peek(TokenKind::LeftBrace)?;
            Some(self.parse_block_statement()?)
        } else {
            None
        };

        Some(Expression::If {
            condition: Box::new(condition),
            consequence,
            alternative,
        })
    }

    fn parse_function_literal(&mut self) -> Option<Expression> {
        self.expect_peek(TokenKind::LeftParen)?;

        let parameters = self.parse_list(TokenKind::RightParen, Parser::parse_parameter)?;

        self.expect_peek(TokenKind::LeftBrace)?;

        let body = self.parse_block_statement()?;

        Some(Expression::Function {
            parameters,
            body: Rc::new(body),
        })
    }

    fn parse_parameter(&mut self) -> Option<String> {
        if self.current_is(TokenKind::Identifier) {
            Some(self.current.literal.clone())
        } else {
            let message = format!("expected next token: IDENT, got {}", self.current.kind);
            self.error(self.current.position, message);
            None
        }
    }

    fn parse_call_expression(&mut self, callee: Expression) -> Option<Expression> {
        let arguments = self.parse_list(TokenKind::RightParen, Parser::parse_list_item)?;

        Some(Expression::Call {
            callee: Box::new(callee),
            arguments,
        })
    }

    fn parse_array_literal(&mut self) -> Option<Expression> {
        let elements = self.parse_list(TokenKind::RightBracket, Parser::parse_list_item)?;

        Some(Expression::Array(elements))
    }

    fn parse_list_item(&mut self) -> Option<Expression> {
        self.parse_expression(Precedence::Lowest)
    }

    /// Parses `item, item, ...` up to `end`. The current token is the opening
    /// delimiter; on success the current token is `end`.
    fn parse_list<T>(&mut self, end: TokenKind, parse_item: fn(&mut Self) -> Option<T>) -> Option<Vec<T>> {
        let mut items = Vec::new();

        self.skip_inferred_semicolons();
        if self.peek_is(end) {
            self.next_token();
            return Some(items);
        }

        self.next_token();
        items.push(parse_item(self)?);

        loop {
            self.skip_inferred_semicolons();
            if !self.peek_is(TokenKind::Comma) {
                break;
            }

            self.next_token();
            self.skip_inferred_semicolons();
            self.next_token();
            items.push(parse_item(self)?);
        }

        self.expect_peek(end)?;

        Some(items)
    }

    fn parse_index_expression(&mut self, collection: Expression) -> Option<Expression> {
        self.next_token();

        let index = self.parse_expression(Precedence::Lowest)?;

        self.skip_inferred_semicolons();
        self.expect_peek(TokenKind::RightBracket)?;

        Some(Expression::Index {
            collection: Box::new(collection),
            index: Box::new(index),
        })
    }

    fn parse_hash_literal(&mut self) -> Option<Expression> {
        self.skip_inferred_semicolons();
        if self.peek_is(TokenKind::RightBrace) {
            self.next_token();
            return Some(Expression::HashMap(Vec::new()));
        }

        self.next_token();
        let key = self.parse_expression(Precedence::Lowest)?;

        self.parse_hash_entries(key)
    }

    /// Parses the rest of a hashmap literal once its first key is known. The
    /// current token is the last token of that key.
    fn parse_hash_entries(&mut self, first_key: Expression) -> Option<Expression> {
        let mut pairs = Vec::new();
        let mut key = first_key;

        loop {
            self.expect_peek(TokenKind::Colon)?;
            self.next_token();
            let value = self.parse_expression(Precedence::Lowest)?;

            pairs.push((key, value));

            self.skip_inferred_semicolons();
            if self.peek_is(TokenKind::RightBrace) {
                break;
            }

            self.expect_peek(TokenKind::Comma)?;
            self.skip_inferred_semicolons();
            if self.peek_is(TokenKind::RightBrace) {
                break;
            }

            self.next_token();
            key = self.parse_expression(Precedence::Lowest)?;
        }

        self.expect_peek(TokenKind::RightBrace)?;

        Some(Expression::HashMap(pairs))
    }
}

/// Parses `input`, returning the program together with any syntax errors.
pub fn parse(input: &str) -> (Program, Vec<String>) {
    Parser::new(Lexer::new(input)).parse_program()
}
