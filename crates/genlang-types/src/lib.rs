//! Shared types for GenLang.
//!
//! This crate defines the AST node types, source spans and syntax error
//! types used by the lexer, parser and evaluator.

mod error;
mod span;
pub mod ast;

pub use error::{ErrorCode, SyntaxError, SyntaxErrors, MAX_ERRORS};
pub use span::{SourceFile, Span};
