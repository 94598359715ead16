//! Page-script lexer
//!
//! Produces the full token stream in one pass, collecting `#line`
//! directives into a [`LineMap`] and reporting malformed input as
//! [`SyntaxError`]s instead of stopping.

use super::line_map::LineMap;
use super::token::{Coordinate, Token, TokenKind};
use std::iter::Peekable;
use std::str::Chars;

/// A lexical or grammatical error at a generated-source position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub id: &'static str,
    pub message: String,
    pub at: Coordinate,
}

impl SyntaxError {
    pub fn new(id: &'static str, message: impl Into<String>, at: Coordinate) -> Self {
        Self {
            id,
            message: message.into(),
            at,
        }
    }
}

/// Everything the lexer learned about one source text
#[derive(Debug, Default)]
pub struct LexOutput {
    pub tokens: Vec<Token>,
    pub line_map: LineMap,
    pub errors: Vec<SyntaxError>,
}

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: u32,
    column: u32,
    /// Only whitespace seen since the last newline
    at_line_start: bool,
    output: LexOutput,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
            at_line_start: true,
            output: LexOutput::default(),
        }
    }

    /// Tokenize the whole input. The stream always ends with `Eof`.
    pub fn tokenize(mut self) -> LexOutput {
        while let Some(c) = self.chars.peek().copied() {
            let start = self.position();
            match c {
                '\n' => {
                    self.bump();
                }
                c if c.is_whitespace() => {
                    self.bump();
                }
                '/' => {
                    self.bump();
                    if self.chars.peek() == Some(&'/') {
                        self.skip_line();
                    } else {
                        self.error("KP1056", "Unexpected character '/'", start);
                    }
                }
                '#' if self.at_line_start => self.directive(start),
                '"' => self.string(start),
                c if is_identifier_start(c) => self.word(start),
                _ => {
                    self.bump();
                    match punctuation(c) {
                        Some(kind) => self.push(kind, start),
                        None => self.error("KP1056", format!("Unexpected character '{}'", c), start),
                    }
                }
            }
        }

        let end = self.position();
        self.push(TokenKind::Eof, end);
        self.output
    }

    fn position(&self) -> Coordinate {
        Coordinate::new(self.line, self.column)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
            self.at_line_start = true;
        } else {
            self.column += 1;
            if !c.is_whitespace() {
                self.at_line_start = false;
            }
        }
        Some(c)
    }

    fn push(&mut self, kind: TokenKind, start: Coordinate) {
        self.at_line_start = false;
        self.output.tokens.push(Token { kind, start });
    }

    fn error(&mut self, id: &'static str, message: impl Into<String>, at: Coordinate) {
        self.output.errors.push(SyntaxError::new(id, message, at));
    }

    /// Consume up to, not including, the next newline.
    fn skip_line(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn rest_of_line(&mut self) -> String {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if c == '\n' {
                break;
            }
            text.push(c);
            self.bump();
        }
        text
    }

    fn word(&mut self, start: Coordinate) {
        let mut word = String::new();
        while let Some(&c) = self.chars.peek() {
            if !is_identifier_part(c) {
                break;
            }
            word.push(c);
            self.bump();
        }
        let kind = TokenKind::keyword(&word).unwrap_or(TokenKind::Identifier(word));
        self.push(kind, start);
    }

    fn string(&mut self, start: Coordinate) {
        self.bump(); // opening quote
        let mut value = String::new();
        loop {
            match self.chars.peek().copied() {
                None | Some('\n') => {
                    self.error("KP1010", "Newline in constant", start);
                    break;
                }
                Some('"') => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    let escaped = match self.chars.peek().copied() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some(other) if other != '\n' => {
                            let at = self.position();
                            self.error("KP1009", format!("Unrecognized escape sequence '\\{}'", other), at);
                            other
                        }
                        _ => continue,
                    };
                    self.bump();
                    value.push(escaped);
                }
                Some(c) => {
                    value.push(c);
                    self.bump();
                }
            }
        }
        self.push(TokenKind::Str(value), start);
    }

    /// `#line N "path"` or `#line default`; the directive occupies its line.
    fn directive(&mut self, start: Coordinate) {
        self.bump(); // '#'
        let directive_line = start.line;
        let text = self.rest_of_line();
        let mut parts = text.trim().splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or_default();
        let argument = parts.next().unwrap_or_default().trim();

        if name != "line" {
            self.error("KP1024", "Preprocessor directive expected", start);
            return;
        }
        if argument == "default" {
            self.output.line_map.push_default(directive_line);
            return;
        }

        let (number, path) = match argument.split_once(char::is_whitespace) {
            Some((number, path)) => (number, Some(path.trim())),
            None => (argument, None),
        };
        let Ok(number) = number.parse::<u32>() else {
            self.error(
                "KP1576",
                "The line number specified for #line directive is missing or invalid",
                start,
            );
            return;
        };
        let path = match path {
            Some(quoted) if quoted.len() >= 2 && quoted.starts_with('"') && quoted.ends_with('"') => {
                quoted[1..quoted.len() - 1].to_string()
            }
            Some(_) => {
                self.error("KP1578", "Quoted file name expected", start);
                return;
            }
            // A bare `#line N` keeps the current target file.
            None => match self.output.line_map.map(directive_line) {
                Some((path, _)) => path.to_string(),
                None => String::new(),
            },
        };
        if path.is_empty() {
            self.error("KP1578", "Quoted file name expected", start);
            return;
        }
        self.output.line_map.push_remap(directive_line, path, number);
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn punctuation(c: char) -> Option<TokenKind> {
    let kind = match c {
        '{' => TokenKind::LeftBrace,
        '}' => TokenKind::RightBrace,
        ';' => TokenKind::Semicolon,
        ':' => TokenKind::Colon,
        '.' => TokenKind::Dot,
        '=' => TokenKind::Equal,
        _ => return None,
    };
    Some(kind)
}
