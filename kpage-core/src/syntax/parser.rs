//! Page-script parser
//!
//! Recursive descent over the lexer's token vector. Errors are collected and
//! the parser resynchronizes at the next `;` or `}` so one unit reports every
//! problem it contains.

use super::ast::{ClassDecl, Item, QualifiedName, Stmt, StmtKind, SyntaxUnit, UseDecl};
use super::lexer::{Lexer, SyntaxError};
use super::token::{Coordinate, Token, TokenKind};
use crate::diagnostic::Diagnostic;
use tracing::trace;

type ParseResult<T> = Result<T, SyntaxError>;

/// Parse the generated source `source` tagged with `path`.
///
/// Diagnostics carry locations mapped through the unit's `#line` directives.
pub fn parse_unit(path: &str, source: &str) -> (SyntaxUnit, Vec<Diagnostic>) {
    let lexed = Lexer::new(source).tokenize();
    let mut parser = Parser::new(lexed.tokens);
    let items = parser.parse_items();

    let unit = SyntaxUnit {
        path: path.to_string(),
        items,
        line_map: lexed.line_map,
    };
    let diagnostics = lexed
        .errors
        .into_iter()
        .chain(parser.errors)
        .map(|e| Diagnostic::error(e.id, e.message).at(unit.line_map.locate(path, e.at)))
        .collect::<Vec<_>>();

    trace!(
        target: "kpage::compiler",
        path,
        items = unit.items.len(),
        errors = diagnostics.len(),
        "parsed unit"
    );
    (unit, diagnostics)
}

struct Parser {
    tokens: Vec<Token>,
    current: usize,
    errors: Vec<SyntaxError>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            errors: Vec::new(),
        }
    }

    fn peek(&self) -> &Token {
        // The lexer always terminates the stream with Eof.
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.current.min(last)]
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn at_end(&self) -> bool {
        self.check(&TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.at_end() {
            self.current += 1;
        }
        token
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Coordinate> {
        if self.check(&kind) {
            return Ok(self.advance().start);
        }
        let id = if kind == TokenKind::Semicolon { "KP1002" } else { "KP1003" };
        Err(SyntaxError::new(
            id,
            format!("{} expected", kind),
            self.peek().start,
        ))
    }

    fn identifier(&mut self) -> ParseResult<(String, Coordinate)> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok((name, token.start))
            }
            _ => Err(SyntaxError::new("KP1001", "Identifier expected", token.start)),
        }
    }

    fn string(&mut self) -> ParseResult<String> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Str(value) => {
                self.advance();
                Ok(value)
            }
            other => Err(SyntaxError::new(
                "KP1003",
                format!("string literal expected, found {}", other),
                token.start,
            )),
        }
    }

    fn qualified_name(&mut self) -> ParseResult<QualifiedName> {
        let (first, start) = self.identifier()?;
        let mut segments = vec![first];
        while self.match_token(&TokenKind::Dot) {
            segments.push(self.identifier()?.0);
        }
        Ok(QualifiedName { segments, start })
    }

    fn parse_items(&mut self) -> Vec<Item> {
        let mut items = Vec::new();
        while !self.at_end() {
            let result = match self.peek().kind {
                TokenKind::Use => self.use_decl().map(Item::Use),
                TokenKind::Class => self.class_decl().map(Item::Class),
                _ => Err(SyntaxError::new(
                    "KP1003",
                    format!("'use' or 'class' expected, found {}", self.peek().kind),
                    self.peek().start,
                )),
            };
            match result {
                Ok(item) => items.push(item),
                Err(error) => {
                    self.errors.push(error);
                    self.synchronize_item();
                }
            }
        }
        items
    }

    fn use_decl(&mut self) -> ParseResult<UseDecl> {
        self.advance(); // use
        let module = self.qualified_name()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(UseDecl { module })
    }

    fn class_decl(&mut self) -> ParseResult<ClassDecl> {
        let start = self.advance().start; // class
        let (name, _) = self.identifier()?;
        self.expect(TokenKind::Colon)?;
        let base = self.qualified_name()?;
        self.expect(TokenKind::LeftBrace)?;

        let mut body = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.at_end() {
            match self.statement() {
                Ok(stmt) => body.push(stmt),
                Err(error) => {
                    self.errors.push(error);
                    self.synchronize_statement();
                }
            }
        }
        self.expect(TokenKind::RightBrace)?;

        Ok(ClassDecl {
            name,
            base,
            body,
            start,
        })
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        let Token { kind: next, start } = self.peek().clone();
        let kind = match next {
            TokenKind::Write => {
                self.advance();
                StmtKind::Write(self.string()?)
            }
            TokenKind::Let => {
                self.advance();
                let (name, _) = self.identifier()?;
                self.expect(TokenKind::Equal)?;
                self.expect(TokenKind::New)?;
                let ty = self.qualified_name()?;
                StmtKind::Let { name, ty }
            }
            TokenKind::Set => {
                self.advance();
                let (target, _) = self.identifier()?;
                self.expect(TokenKind::Dot)?;
                let (property, _) = self.identifier()?;
                self.expect(TokenKind::Equal)?;
                let value = self.string()?;
                StmtKind::Set {
                    target,
                    property,
                    value,
                }
            }
            TokenKind::Render => {
                self.advance();
                StmtKind::Render(self.identifier()?.0)
            }
            TokenKind::Include => {
                self.advance();
                StmtKind::Include(self.identifier()?.0)
            }
            other => {
                return Err(SyntaxError::new(
                    "KP1003",
                    format!("statement expected, found {}", other),
                    start,
                ))
            }
        };
        self.expect(TokenKind::Semicolon)?;
        Ok(Stmt { kind, start })
    }

    /// Skip past the current statement.
    fn synchronize_statement(&mut self) {
        while !self.at_end() {
            if self.check(&TokenKind::RightBrace) {
                return;
            }
            if self.advance().kind == TokenKind::Semicolon {
                return;
            }
        }
    }

    /// Skip to the next top-level `use` or `class`.
    fn synchronize_item(&mut self) {
        let mut depth = 0usize;
        while !self.at_end() {
            match self.peek().kind {
                TokenKind::Use | TokenKind::Class if depth == 0 => return,
                TokenKind::LeftBrace => depth += 1,
                TokenKind::RightBrace => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.advance();
        }
    }
}
