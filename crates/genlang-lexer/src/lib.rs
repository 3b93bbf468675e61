//! GenLang lexical layer: identifiers, keywords, numbers, terminals and the
//! gap rule, scanned directly from source text at an immutable cursor.

pub mod lexer;
pub mod token;

pub use lexer::{Cursor, Lexeme, NumberScan, Scanner};
pub use token::{Keyword, Punct, ALL_KEYWORDS};
