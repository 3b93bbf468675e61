//! GenLang parser: ordered-choice recursive descent over the scannerless
//! lexical layer, building the AST through a single operand stack.
//!
//! ```
//! use genlang_parser::parse_source;
//!
//! let program = parse_source("demo.gen", "fun num twice(num x) = x * 2").unwrap();
//! assert_eq!(program.functions.len(), 1);
//! ```

mod parse_decl;
mod parse_expr;
mod parse_stmt;
mod parser;

pub use parser::{parse_source, ParseResult, Parser, ParserConfig};
