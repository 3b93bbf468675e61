//! Keywords and punctuation terminals recognised by the GenLang lexer.
//!
//! Each terminal carries the set of characters that must not follow it,
//! which is how `=` is kept apart from `==` and `..` from `...` without a
//! separate tokenisation pass.

use std::fmt;

/// All reserved words.
///
/// These cannot be used as identifiers. Some (`import`, `this`, `nor`,
/// `nand`) have no grammar yet and are reserved for later use.
pub const ALL_KEYWORDS: &[&str] = &[
    "import", "const", "fun", "new", "return", "this", "if", "then", "else", "for", "in", "do",
    "while", "step", "or", "and", "not", "xor", "nor", "nand", "true", "false",
];

/// A reserved word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Import,
    Const,
    Fun,
    New,
    Return,
    This,
    If,
    Then,
    Else,
    For,
    In,
    Do,
    While,
    Step,
    Or,
    And,
    Not,
    Xor,
    Nor,
    Nand,
    True,
    False,
}

impl Keyword {
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Import => "import",
            Keyword::Const => "const",
            Keyword::Fun => "fun",
            Keyword::New => "new",
            Keyword::Return => "return",
            Keyword::This => "this",
            Keyword::If => "if",
            Keyword::Then => "then",
            Keyword::Else => "else",
            Keyword::For => "for",
            Keyword::In => "in",
            Keyword::Do => "do",
            Keyword::While => "while",
            Keyword::Step => "step",
            Keyword::Or => "or",
            Keyword::And => "and",
            Keyword::Not => "not",
            Keyword::Xor => "xor",
            Keyword::Nor => "nor",
            Keyword::Nand => "nand",
            Keyword::True => "true",
            Keyword::False => "false",
        }
    }

    /// Returns `true` if `word` is exactly a reserved word.
    pub fn is_reserved(word: &str) -> bool {
        ALL_KEYWORDS.contains(&word)
    }

    /// Label used in expected-alternative sets.
    pub fn label(self) -> String {
        format!("'{}'", self.as_str())
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator and punctuation terminals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Punct {
    Comma,
    Colon,
    Semi,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Dot,
    DotDot,
    DotDotDot,
    Assign,
    EqEq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
}

impl Punct {
    /// The source text of the terminal.
    pub fn text(self) -> &'static str {
        match self {
            Punct::Comma => ",",
            Punct::Colon => ":",
            Punct::Semi => ";",
            Punct::LParen => "(",
            Punct::RParen => ")",
            Punct::LBrace => "{",
            Punct::RBrace => "}",
            Punct::LBracket => "[",
            Punct::RBracket => "]",
            Punct::Dot => ".",
            Punct::DotDot => "..",
            Punct::DotDotDot => "...",
            Punct::Assign => "=",
            Punct::EqEq => "==",
            Punct::NotEq => "!=",
            Punct::Less => "<",
            Punct::LessEq => "<=",
            Punct::Greater => ">",
            Punct::GreaterEq => ">=",
            Punct::Plus => "+",
            Punct::Minus => "-",
            Punct::Star => "*",
            Punct::Slash => "/",
            Punct::Percent => "%",
            Punct::Caret => "^",
        }
    }

    /// Characters that may not directly follow the terminal.
    pub fn must_not_follow(self) -> &'static str {
        match self {
            Punct::Dot | Punct::DotDot => ".",
            Punct::Assign | Punct::Less | Punct::Greater => "=",
            Punct::Plus | Punct::Minus | Punct::Star | Punct::Percent | Punct::Caret => "=",
            Punct::Slash => "=/*",
            _ => "",
        }
    }

    /// Label used in expected-alternative sets.
    pub fn label(self) -> String {
        format!("'{}'", self.text())
    }
}

impl fmt::Display for Punct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_table_matches_enum() {
        let all = [
            Keyword::Import,
            Keyword::Const,
            Keyword::Fun,
            Keyword::New,
            Keyword::Return,
            Keyword::This,
            Keyword::If,
            Keyword::Then,
            Keyword::Else,
            Keyword::For,
            Keyword::In,
            Keyword::Do,
            Keyword::While,
            Keyword::Step,
            Keyword::Or,
            Keyword::And,
            Keyword::Not,
            Keyword::Xor,
            Keyword::Nor,
            Keyword::Nand,
            Keyword::True,
            Keyword::False,
        ];
        assert_eq!(all.len(), ALL_KEYWORDS.len());
        for kw in all {
            assert!(Keyword::is_reserved(kw.as_str()), "{kw} missing");
        }
    }

    #[test]
    fn test_reserved_is_exact() {
        assert!(Keyword::is_reserved("fun"));
        assert!(!Keyword::is_reserved("funny"));
        assert!(!Keyword::is_reserved("Fun"));
    }

    #[test]
    fn test_labels() {
        assert_eq!(Punct::DotDotDot.label(), "'...'");
        assert_eq!(Keyword::Then.label(), "'then'");
    }
}
