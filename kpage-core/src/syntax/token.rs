//! Page-script tokens

use std::fmt;

/// Position inside a generated source file (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Coordinate {
    pub line: u32,
    pub column: u32,
}

impl Coordinate {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Identifier(String),
    Str(String),

    // Keywords
    Use,
    Class,
    Write,
    Let,
    New,
    Set,
    Render,
    Include,

    // Punctuation
    LeftBrace,
    RightBrace,
    Semicolon,
    Colon,
    Dot,
    Equal,

    Eof,
}

impl TokenKind {
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "use" => TokenKind::Use,
            "class" => TokenKind::Class,
            "write" => TokenKind::Write,
            "let" => TokenKind::Let,
            "new" => TokenKind::New,
            "set" => TokenKind::Set,
            "render" => TokenKind::Render,
            "include" => TokenKind::Include,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Identifier(name) => return write!(f, "identifier '{}'", name),
            TokenKind::Str(_) => "string literal",
            TokenKind::Use => "use",
            TokenKind::Class => "class",
            TokenKind::Write => "write",
            TokenKind::Let => "let",
            TokenKind::New => "new",
            TokenKind::Set => "set",
            TokenKind::Render => "render",
            TokenKind::Include => "include",
            TokenKind::LeftBrace => "{",
            TokenKind::RightBrace => "}",
            TokenKind::Semicolon => ";",
            TokenKind::Colon => ":",
            TokenKind::Dot => ".",
            TokenKind::Equal => "=",
            TokenKind::Eof => "end of file",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: Coordinate,
}
