//! Lexical layer tests.
//!
//! Covers: the gap rule (whitespace, block and line comments), identifiers
//! and keyword rejection, keyword boundaries, punctuation must-not-follow
//! sets, numeric literals (well formed and malformed), and recovery
//! skipping.

use genlang_lexer::{Cursor, Keyword, NumberScan, Punct, Scanner, ALL_KEYWORDS};

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

/// Offset reached by the gap rule from the start of `source`.
fn gap_end(source: &str) -> usize {
    Scanner::new(source).gap(Cursor::start()).offset
}

/// Scan a number at the start of `source`, returning its value.
fn number(source: &str) -> Option<f64> {
    match Scanner::new(source).number(Cursor::start()) {
        NumberScan::Ok { value, .. } => Some(value),
        _ => None,
    }
}

/// Scan a malformed number, returning (error column, skipped text).
fn malformed(source: &str) -> Option<(u32, String)> {
    match Scanner::new(source).number(Cursor::start()) {
        NumberScan::Malformed { at, lexeme } => Some((at.col, lexeme.text.to_string())),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────
// Gap rule
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_gap_whitespace() {
    assert_eq!(gap_end(" \t\r\n\u{c}x"), 5);
    assert_eq!(gap_end("x"), 0);
    assert_eq!(gap_end(""), 0);
}

#[test]
fn test_gap_block_comment() {
    assert_eq!(gap_end("/* a * b */x"), 11);
    assert_eq!(gap_end("/**/x"), 4);
}

#[test]
fn test_gap_block_comments_do_not_nest() {
    // The first `*/` closes the comment; the rest is left for the grammar.
    let src = "/* outer /* inner */ tail */";
    assert_eq!(gap_end(src), 21);
}

#[test]
fn test_gap_unterminated_block_comment_is_not_consumed() {
    assert_eq!(gap_end("  /* never closed"), 2);
}

#[test]
fn test_gap_line_comment_until_newline() {
    let src = "// note\nx";
    let at = Scanner::new(src).gap(Cursor::start());
    assert_eq!(at.offset, 8);
    assert_eq!((at.line, at.col), (2, 1));
}

#[test]
fn test_gap_line_comment_at_end_of_input() {
    assert_eq!(gap_end("// trailing"), 11);
}

#[test]
fn test_gap_mixed_sequence() {
    let src = " // a\n /* b */ \n\t// c\r\nvalue";
    assert_eq!(gap_end(src), src.len() - "value".len());
}

#[test]
fn test_lexemes_consume_following_gap() {
    let sc = Scanner::new("width /* px */ // note\n= 3");
    let ident = sc.identifier(Cursor::start()).unwrap();
    assert_eq!(ident.text, "width");
    let eq = sc.punct(ident.next, Punct::Assign).unwrap();
    assert_eq!(eq.start.line, 2);
}

// ─────────────────────────────────────────────────────────────────────
// Identifiers & keywords
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_identifier_shapes() {
    let sc = Scanner::new("_radius2 rest");
    let lex = sc.identifier(Cursor::start()).unwrap();
    assert_eq!(lex.text, "_radius2");
    assert!(Scanner::new("2abc").identifier(Cursor::start()).is_none());
}

#[test]
fn test_every_keyword_is_rejected_as_identifier() {
    for kw in ALL_KEYWORDS {
        assert!(
            Scanner::new(kw).identifier(Cursor::start()).is_none(),
            "'{kw}' must not scan as an identifier"
        );
    }
}

#[test]
fn test_keyword_prefix_is_still_an_identifier() {
    for word in ["funnel", "iffy", "format", "done", "stepper", "trueish", "in_count"] {
        let lex = Scanner::new(word).identifier(Cursor::start());
        assert_eq!(lex.map(|l| l.text), Some(word));
    }
}

#[test]
fn test_keyword_requires_word_boundary() {
    let sc = Scanner::new("funx");
    assert!(sc.keyword(Cursor::start(), Keyword::Fun).is_none());
    let sc = Scanner::new("fun(x)");
    assert!(sc.keyword(Cursor::start(), Keyword::Fun).is_some());
}

// ─────────────────────────────────────────────────────────────────────
// Punctuation
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_assign_is_not_equality() {
    let sc = Scanner::new("==");
    assert!(sc.punct(Cursor::start(), Punct::Assign).is_none());
    assert!(sc.punct(Cursor::start(), Punct::EqEq).is_some());
}

#[test]
fn test_range_dots() {
    let sc = Scanner::new("...");
    assert!(sc.punct(Cursor::start(), Punct::Dot).is_none());
    assert!(sc.punct(Cursor::start(), Punct::DotDot).is_none());
    assert!(sc.punct(Cursor::start(), Punct::DotDotDot).is_some());

    let sc = Scanner::new(".. 5");
    let dots = sc.punct(Cursor::start(), Punct::DotDot).unwrap();
    assert_eq!(dots.next.offset, 3);
}

#[test]
fn test_comparison_terminals() {
    let sc = Scanner::new("<=");
    assert!(sc.punct(Cursor::start(), Punct::Less).is_none());
    assert!(sc.punct(Cursor::start(), Punct::LessEq).is_some());
    let sc = Scanner::new(">3");
    assert!(sc.punct(Cursor::start(), Punct::Greater).is_some());
}

// ─────────────────────────────────────────────────────────────────────
// Numbers
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_number_forms() {
    assert_eq!(number("0"), Some(0.0));
    assert_eq!(number("42"), Some(42.0));
    assert_eq!(number("3.25"), Some(3.25));
    assert_eq!(number("-7"), Some(-7.0));
    assert_eq!(number("-0.5"), Some(-0.5));
}

#[test]
fn test_number_has_no_exponent_or_bare_fraction() {
    assert_eq!(number(".5"), None);
    assert_eq!(number("-x"), None);
    assert_eq!(number("- 3"), None);
    assert!(malformed("1e5").is_some());
}

#[test]
fn test_number_stops_before_range_operator() {
    let sc = Scanner::new("1..5");
    match sc.number(Cursor::start()) {
        NumberScan::Ok { value, lexeme } => {
            assert_eq!(value, 1.0);
            assert_eq!(lexeme.end.offset, 1);
        }
        other => panic!("expected number, got {other:?}"),
    }
    assert_eq!(number("1.5...2"), Some(1.5));
}

#[test]
fn test_malformed_trailing_dot() {
    assert_eq!(malformed("12."), Some((3, "12.".to_string())));
    assert_eq!(malformed("3.x + 1"), Some((2, "3.x".to_string())));
}

#[test]
fn test_malformed_letters_after_digits() {
    assert_eq!(malformed("12ab)"), Some((3, "12ab".to_string())));
}

#[test]
fn test_malformed_second_fraction() {
    assert_eq!(malformed("1.2.3 "), Some((4, "1.2.3".to_string())));
}

#[test]
fn test_malformed_lexeme_consumes_gap() {
    let sc = Scanner::new("4.  \nnext");
    match sc.number(Cursor::start()) {
        NumberScan::Malformed { lexeme, .. } => assert_eq!(lexeme.next.line, 2),
        other => panic!("expected malformed number, got {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────
// Recovery & determinism
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_skip_to_keyword_reaches_end() {
    let src = "garbage ( ) [";
    let sc = Scanner::new(src);
    let at = sc.skip_to_keyword(Cursor::start(), &[Keyword::Fun, Keyword::Const]);
    assert!(sc.at_end(at));
}

#[test]
fn test_skip_to_keyword_ignores_prefixed_words() {
    let src = "x funnel const y";
    let sc = Scanner::new(src);
    let at = sc.skip_to_keyword(Cursor::start(), &[Keyword::Fun, Keyword::Const]);
    assert_eq!(at.offset, 9);
}

#[test]
fn test_scanning_is_deterministic() {
    let src = "fun num f(num x = 1.5) = x * 2 // twice";
    let sc = Scanner::new(src);
    let first = sc.keyword(Cursor::start(), Keyword::Fun).unwrap();
    for i in 0..100 {
        let again = sc.keyword(Cursor::start(), Keyword::Fun).unwrap();
        assert_eq!(first, again, "determinism failure at iteration {i}");
    }
}
