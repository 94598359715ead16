//! Page-script syntax: tokens, lexer, AST and parser

pub mod ast;
pub mod lexer;
pub mod line_map;
pub mod parser;
pub mod token;

pub use ast::{ClassDecl, Item, QualifiedName, Stmt, StmtKind, SyntaxUnit, UseDecl};
pub use line_map::LineMap;
pub use parser::parse_unit;
pub use token::{Coordinate, Token, TokenKind};
