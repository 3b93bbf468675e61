//! Scannerless lexical layer.
//!
//! The [`Scanner`] never owns a position. Every function takes a [`Cursor`]
//! and hands back a new one, so the parser can try an alternative, drop
//! the returned cursor on failure and retry from the old one with nothing
//! to undo.
//!
//! Features:
//! - Identifiers with keyword rejection (negative lookahead)
//! - Keywords that must not run into a following identifier character
//! - Punctuation terminals with must-not-follow sets
//! - Numeric literals with malformed-literal detection
//! - The gap rule (whitespace, `/* */` and `//` comments) applied after
//!   every lexeme

use genlang_types::Span;

use crate::token::{Keyword, Punct};

/// An immutable position in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cursor {
    /// Byte offset into the source.
    pub offset: usize,
    /// 1-based line.
    pub line: u32,
    /// 1-based column, counted in characters.
    pub col: u32,
}

impl Cursor {
    /// The position of the first character.
    pub fn start() -> Self {
        Self {
            offset: 0,
            line: 1,
            col: 1,
        }
    }

    /// Zero-width span at this position.
    pub fn point(self) -> Span {
        Span::point(self.line, self.col)
    }

    /// Span from `self` up to (but excluding) `end`.
    pub fn span_to(self, end: Cursor) -> Span {
        if end.offset <= self.offset {
            return self.point();
        }
        Span::new(self.line, self.col, end.line, end.col.saturating_sub(1).max(1))
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::start()
    }
}

/// One recognised lexeme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lexeme<'src> {
    pub text: &'src str,
    pub start: Cursor,
    /// Position just past the lexeme.
    pub end: Cursor,
    /// Position after the lexeme and the gap that follows it.
    pub next: Cursor,
}

impl Lexeme<'_> {
    pub fn span(&self) -> Span {
        self.start.span_to(self.end)
    }
}

/// Result of scanning for a numeric literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberScan<'src> {
    /// A well-formed literal.
    Ok { value: f64, lexeme: Lexeme<'src> },
    /// A literal was started but is not well formed. `at` points at the
    /// first offending character; `lexeme` covers the whole bad run so the
    /// parser can skip it.
    Malformed { at: Cursor, lexeme: Lexeme<'src> },
    /// No digits at this position.
    NoMatch,
}

/// Lexical scanner over one source text.
#[derive(Debug, Clone, Copy)]
pub struct Scanner<'src> {
    src: &'src str,
}

impl<'src> Scanner<'src> {
    pub fn new(src: &'src str) -> Self {
        Self { src }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    pub fn peek(&self, at: Cursor) -> Option<char> {
        self.src.get(at.offset..)?.chars().next()
    }

    fn peek_second(&self, at: Cursor) -> Option<char> {
        let mut chars = self.src.get(at.offset..)?.chars();
        chars.next();
        chars.next()
    }

    /// Consume one character.
    pub fn bump(&self, at: Cursor) -> Option<(char, Cursor)> {
        let ch = self.peek(at)?;
        let next = if ch == '\n' {
            Cursor {
                offset: at.offset + 1,
                line: at.line + 1,
                col: 1,
            }
        } else {
            Cursor {
                offset: at.offset + ch.len_utf8(),
                line: at.line,
                col: at.col + 1,
            }
        };
        Some((ch, next))
    }

    /// Consume characters while `pred` holds.
    fn bump_while(&self, mut at: Cursor, pred: impl Fn(char) -> bool) -> Cursor {
        while let Some(ch) = self.peek(at) {
            if !pred(ch) {
                break;
            }
            match self.bump(at) {
                Some((_, next)) => at = next,
                None => break,
            }
        }
        at
    }

    /// Consume `text` verbatim.
    fn literal(&self, at: Cursor, text: &str) -> Option<Cursor> {
        if !self.src.get(at.offset..)?.starts_with(text) {
            return None;
        }
        // Terminals never contain newlines, so the column advances by char count.
        Some(Cursor {
            offset: at.offset + text.len(),
            line: at.line,
            col: at.col + text.chars().count() as u32,
        })
    }

    pub fn at_end(&self, at: Cursor) -> bool {
        at.offset >= self.src.len()
    }

    pub fn slice(&self, from: Cursor, to: Cursor) -> &'src str {
        self.src.get(from.offset..to.offset).unwrap_or("")
    }

    fn lexeme(&self, start: Cursor, end: Cursor) -> Lexeme<'src> {
        Lexeme {
            text: self.slice(start, end),
            start,
            end,
            next: self.gap(end),
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Gap: whitespace & comments
    // ─────────────────────────────────────────────────────────────

    /// Skip any mix of whitespace, block comments and line comments.
    ///
    /// Block comments do not nest. An unterminated `/*` is left in place.
    pub fn gap(&self, mut at: Cursor) -> Cursor {
        loop {
            let before = at;
            at = self.bump_while(at, |c| matches!(c, ' ' | '\t' | '\r' | '\n' | '\u{c}'));
            if let Some(after) = self.block_comment(at) {
                at = after;
            } else if let Some(after) = self.literal(at, "//") {
                at = self.bump_while(after, |c| c != '\r' && c != '\n');
            }
            if at == before {
                return at;
            }
        }
    }

    fn block_comment(&self, at: Cursor) -> Option<Cursor> {
        let mut cur = self.literal(at, "/*")?;
        loop {
            if let Some(end) = self.literal(cur, "*/") {
                return Some(end);
            }
            let (_, next) = self.bump(cur)?;
            cur = next;
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Words
    // ─────────────────────────────────────────────────────────────

    /// Raw word: letter or `_`, then letters, digits or `_`.
    fn word(&self, at: Cursor) -> Option<(&'src str, Cursor)> {
        let first = self.peek(at)?;
        if !is_ident_start(first) {
            return None;
        }
        let end = self.bump_while(at, is_ident_continue);
        Some((self.slice(at, end), end))
    }

    /// An identifier that is not a reserved word.
    pub fn identifier(&self, at: Cursor) -> Option<Lexeme<'src>> {
        let (text, end) = self.word(at)?;
        if Keyword::is_reserved(text) {
            return None;
        }
        Some(self.lexeme(at, end))
    }

    /// A keyword not immediately followed by an identifier character.
    pub fn keyword(&self, at: Cursor, kw: Keyword) -> Option<Lexeme<'src>> {
        let (text, end) = self.word(at)?;
        (text == kw.as_str()).then(|| self.lexeme(at, end))
    }

    /// A punctuation terminal respecting its must-not-follow set.
    pub fn punct(&self, at: Cursor, punct: Punct) -> Option<Lexeme<'src>> {
        let end = self.literal(at, punct.text())?;
        if let Some(next) = self.peek(end) {
            if punct.must_not_follow().contains(next) {
                return None;
            }
        }
        Some(self.lexeme(at, end))
    }

    // ─────────────────────────────────────────────────────────────
    // Numbers
    // ─────────────────────────────────────────────────────────────

    /// `-? digit+ ('.' digit+)?`
    pub fn number(&self, at: Cursor) -> NumberScan<'src> {
        let mut cur = at;
        if self.peek(cur) == Some('-') {
            if let Some((_, next)) = self.bump(cur) {
                cur = next;
            }
        }
        if !self.peek(cur).is_some_and(|c| c.is_ascii_digit()) {
            return NumberScan::NoMatch;
        }
        cur = self.bump_while(cur, |c| c.is_ascii_digit());

        if self.peek(cur) == Some('.') {
            match self.peek_second(cur) {
                Some(c) if c.is_ascii_digit() => {
                    cur = self.bump_while(self.skip_one(cur), |c| c.is_ascii_digit());
                }
                // Range operator: leave both dots alone.
                Some('.') => {}
                _ => return self.malformed(at, cur),
            }
        }

        match self.peek(cur) {
            Some(c) if is_ident_continue(c) => return self.malformed(at, cur),
            Some('.') if self.peek_second(cur).is_some_and(|c| c.is_ascii_digit()) => {
                return self.malformed(at, cur)
            }
            _ => {}
        }

        let lexeme = self.lexeme(at, cur);
        match lexeme.text.parse::<f64>() {
            Ok(value) => NumberScan::Ok { value, lexeme },
            Err(_) => NumberScan::Malformed { at, lexeme },
        }
    }

    fn skip_one(&self, at: Cursor) -> Cursor {
        self.bump(at).map_or(at, |(_, next)| next)
    }

    /// Swallow the rest of a broken literal starting at `bad`.
    fn malformed(&self, start: Cursor, bad: Cursor) -> NumberScan<'src> {
        let mut end = bad;
        loop {
            match self.peek(end) {
                Some(c) if is_ident_continue(c) => end = self.skip_one(end),
                Some('.') if self.peek_second(end) != Some('.') => end = self.skip_one(end),
                _ => break,
            }
        }
        NumberScan::Malformed {
            at: bad,
            lexeme: self.lexeme(start, end),
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Recovery
    // ─────────────────────────────────────────────────────────────

    /// Skip forward to the next occurrence of one of `keywords` standing on
    /// its own as a word, or to the end of input. Always makes progress.
    pub fn skip_to_keyword(&self, at: Cursor, keywords: &[Keyword]) -> Cursor {
        let mut cur = match self.word(at) {
            Some((_, end)) => end,
            None => self.skip_one(at),
        };
        loop {
            cur = self.gap(cur);
            if self.at_end(cur) {
                return cur;
            }
            if let Some((text, end)) = self.word(cur) {
                if keywords.iter().any(|k| k.as_str() == text) {
                    return cur;
                }
                cur = end;
            } else {
                cur = self.skip_one(cur);
            }
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bump_tracks_lines_and_columns() {
        let sc = Scanner::new("ab\nc");
        let (_, c1) = sc.bump(Cursor::start()).unwrap();
        let (_, c2) = sc.bump(c1).unwrap();
        let (nl, c3) = sc.bump(c2).unwrap();
        assert_eq!(nl, '\n');
        assert_eq!((c3.line, c3.col, c3.offset), (2, 1, 3));
    }

    #[test]
    fn test_span_to_is_inclusive_of_last_char() {
        let sc = Scanner::new("hello world");
        let lex = sc.identifier(Cursor::start()).unwrap();
        assert_eq!(lex.span(), Span::new(1, 1, 1, 5));
        assert_eq!(lex.next.col, 7);
    }

    #[test]
    fn test_skip_to_keyword_progresses() {
        let sc = Scanner::new("fun broken ( fun ok");
        let next = sc.skip_to_keyword(Cursor::start(), &[Keyword::Fun]);
        assert_eq!(next.offset, 13);
    }
}
