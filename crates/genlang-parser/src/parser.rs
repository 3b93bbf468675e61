//! Core parser infrastructure: operand stack, ordered choice, terminals,
//! furthest-failure tracking and error reporting.
//!
//! Every grammar rule has the shape `fn(&mut Parser, Cursor) -> Option<Cursor>`.
//! On success it has pushed exactly the operand it introduces and returns
//! the cursor after its input. On failure it returns `None`; wrapping the
//! call in [`Parser::attempt`] restores the operand stack and the pending
//! diagnostics, so a failed alternative leaves nothing behind.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use genlang_lexer::{Cursor, Keyword, Lexeme, Punct, Scanner};
use genlang_types::ast::*;
use genlang_types::{ErrorCode, SourceFile, Span, SyntaxError, SyntaxErrors, MAX_ERRORS};
use serde::{Deserialize, Serialize};

/// A grammar rule.
pub(crate) type Rule<'src> = fn(&mut Parser<'src>, Cursor) -> Option<Cursor>;

/// Parser limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Syntax errors stored before parsing stops.
    pub max_errors: usize,
    /// Maximum nesting of expressions and statements.
    pub max_nesting: u32,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_errors: MAX_ERRORS,
            max_nesting: 64,
        }
    }
}

/// Rules whose failures are remembered per position, because several
/// alternatives reach them at the same place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Memo {
    Args,
    If,
    FunctionExpr,
}

/// A node on the operand stack.
#[derive(Debug)]
pub(crate) enum Operand {
    Expr(Expr),
    Stmt(Stmt),
    Block(Block),
    Param(Param),
    TypeRef(TypeRef),
    VarDef(VarDef),
    Function(Arc<Function>),
    Entry(MapEntry),
}

/// Result of parsing.
#[derive(Debug)]
pub struct ParseResult {
    /// The program, built even when recoverable errors were reported.
    /// `None` only when parsing stopped at the error limit.
    pub program: Option<Program>,
    pub errors: SyntaxErrors,
}

impl ParseResult {
    /// Turn the result into the program, or all collected errors.
    pub fn into_result(self) -> Result<Program, SyntaxErrors> {
        match self.program {
            Some(program) if !self.errors.has_errors() => Ok(program),
            _ => Err(self.errors),
        }
    }
}

/// The GenLang parser.
///
/// Holds transient parse state; consumed by [`Parser::parse`].
pub struct Parser<'src> {
    pub(crate) scanner: Scanner<'src>,
    source_file: &'src SourceFile,
    pub(crate) config: ParserConfig,
    /// The operand stack every rule pushes onto and pops from.
    stack: Vec<Operand>,
    /// Diagnostics of the definition currently being parsed. Rolled back
    /// together with the stack when an alternative fails.
    pending: Vec<SyntaxError>,
    /// Diagnostics dropped by failed alternatives of the current definition.
    /// Reported alongside the structural error if the definition fails.
    abandoned: Vec<SyntaxError>,
    errors: SyntaxErrors,
    /// End of the most recently matched lexeme (before its gap).
    pub(crate) last_end: Cursor,
    /// Furthest position any terminal was tried at, and what was tried.
    furthest: Cursor,
    expected: BTreeSet<String>,
    depth: u32,
    /// Positions where a [`Memo`] rule is known to fail.
    dead_ends: HashSet<(Memo, usize)>,
    /// Where the nesting limit was first hit during the current definition.
    pub(crate) too_deep: Option<Cursor>,
}

impl<'src> Parser<'src> {
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self::with_config(source_file, ParserConfig::default())
    }

    pub fn with_config(source_file: &'src SourceFile, config: ParserConfig) -> Self {
        Self {
            scanner: Scanner::new(&source_file.source),
            source_file,
            config,
            stack: Vec::new(),
            pending: Vec::new(),
            abandoned: Vec::new(),
            errors: SyntaxErrors::with_capacity_limit(config.max_errors),
            last_end: Cursor::start(),
            furthest: Cursor::start(),
            expected: BTreeSet::new(),
            depth: 0,
            dead_ends: HashSet::new(),
            too_deep: None,
        }
    }

    // ── Public API ────────────────────────────────────────────────────────────

    /// Parse the whole source into a [`Program`].
    pub fn parse(mut self) -> ParseResult {
        let program = self.parse_program();
        tracing::debug!(
            file = %self.source_file.name,
            errors = self.errors.total_errors,
            "parsed GenLang source"
        );
        ParseResult {
            program,
            errors: self.errors,
        }
    }

    // ── Ordered choice ────────────────────────────────────────────────────────

    /// Run `rule`; on failure restore the operand stack, pending
    /// diagnostics and last lexeme end to what they were before.
    pub(crate) fn attempt(
        &mut self,
        at: Cursor,
        rule: impl FnOnce(&mut Self, Cursor) -> Option<Cursor>,
    ) -> Option<Cursor> {
        let stack_mark = self.stack.len();
        let pending_mark = self.pending.len();
        let last_end = self.last_end;
        let result = rule(self, at);
        if result.is_none() {
            self.stack.truncate(stack_mark);
            self.abandoned.extend(self.pending.drain(pending_mark..));
            self.last_end = last_end;
        }
        result
    }

    /// Try each alternative in order; the first that succeeds wins.
    pub(crate) fn first_of(&mut self, at: Cursor, rules: &[Rule<'src>]) -> Option<Cursor> {
        rules.iter().find_map(|rule| self.attempt(at, *rule))
    }

    /// [`Parser::attempt`] that skips `rule` where it already failed.
    ///
    /// Failures caused by the nesting limit are not remembered, since the
    /// same rule may succeed from a shallower path.
    pub(crate) fn remembered(
        &mut self,
        memo: Memo,
        at: Cursor,
        rule: impl FnOnce(&mut Self, Cursor) -> Option<Cursor>,
    ) -> Option<Cursor> {
        if self.dead_ends.contains(&(memo, at.offset)) {
            return None;
        }
        let result = self.attempt(at, rule);
        if result.is_none() && self.too_deep.is_none() {
            self.dead_ends.insert((memo, at.offset));
        }
        result
    }

    /// Run `rule` one nesting level deeper, failing past the configured limit.
    pub(crate) fn nested(
        &mut self,
        at: Cursor,
        rule: impl FnOnce(&mut Self, Cursor) -> Option<Cursor>,
    ) -> Option<Cursor> {
        if self.depth >= self.config.max_nesting {
            self.too_deep.get_or_insert(at);
            return None;
        }
        self.depth += 1;
        let result = rule(self, at);
        self.depth -= 1;
        result
    }

    // ── Terminals ─────────────────────────────────────────────────────────────

    fn matched(
        &mut self,
        lexeme: Option<Lexeme<'src>>,
        at: Cursor,
        label: impl FnOnce() -> String,
    ) -> Option<Lexeme<'src>> {
        match lexeme {
            Some(lex) => {
                self.last_end = lex.end;
                Some(lex)
            }
            None => {
                self.expect_at(at, label());
                None
            }
        }
    }

    pub(crate) fn punct(&mut self, at: Cursor, punct: Punct) -> Option<Lexeme<'src>> {
        let lex = self.scanner.punct(at, punct);
        self.matched(lex, at, || punct.label())
    }

    pub(crate) fn keyword(&mut self, at: Cursor, kw: Keyword) -> Option<Lexeme<'src>> {
        let lex = self.scanner.keyword(at, kw);
        self.matched(lex, at, || kw.label())
    }

    pub(crate) fn identifier(&mut self, at: Cursor) -> Option<Lexeme<'src>> {
        let lex = self.scanner.identifier(at);
        self.matched(lex, at, || "identifier".to_string())
    }

    /// `[terminal]`: the cursor after the terminal, or `at` unchanged.
    pub(crate) fn optional_punct(&mut self, at: Cursor, punct: Punct) -> Cursor {
        self.punct(at, punct).map_or(at, |lex| lex.next)
    }

    /// Record that `label` was tried at `at`.
    pub(crate) fn expect_at(&mut self, at: Cursor, label: impl Into<String>) {
        if at > self.furthest {
            self.furthest = at;
            self.expected.clear();
        }
        if at == self.furthest {
            self.expected.insert(label.into());
        }
    }

    pub(crate) fn span_from(&self, start: Cursor) -> Span {
        start.span_to(self.last_end)
    }

    // ── Operand stack ─────────────────────────────────────────────────────────

    pub(crate) fn push(&mut self, operand: Operand) {
        self.stack.push(operand);
    }

    pub(crate) fn push_expr(&mut self, kind: ExprKind, span: Span) {
        self.stack.push(Operand::Expr(Expr::new(kind, span)));
    }

    pub(crate) fn mark(&self) -> usize {
        self.stack.len()
    }

    pub(crate) fn peek_expr(&self) -> Option<&Expr> {
        match self.stack.last() {
            Some(Operand::Expr(expr)) => Some(expr),
            _ => None,
        }
    }

    pub(crate) fn pop_expr(&mut self) -> Expr {
        match self.stack.pop() {
            Some(Operand::Expr(expr)) => expr,
            other => unreachable!("operand stack: expected expression, found {other:?}"),
        }
    }

    pub(crate) fn pop_block(&mut self) -> Block {
        match self.stack.pop() {
            Some(Operand::Block(block)) => block,
            other => unreachable!("operand stack: expected block, found {other:?}"),
        }
    }

    pub(crate) fn pop_type_ref(&mut self) -> TypeRef {
        match self.stack.pop() {
            Some(Operand::TypeRef(type_ref)) => type_ref,
            other => unreachable!("operand stack: expected type, found {other:?}"),
        }
    }

    pub(crate) fn pop_var_def(&mut self) -> VarDef {
        match self.stack.pop() {
            Some(Operand::VarDef(def)) => def,
            other => unreachable!("operand stack: expected definition, found {other:?}"),
        }
    }

    pub(crate) fn pop_function(&mut self) -> Arc<Function> {
        match self.stack.pop() {
            Some(Operand::Function(fun)) => fun,
            other => unreachable!("operand stack: expected function, found {other:?}"),
        }
    }

    pub(crate) fn pop_stmt(&mut self) -> Stmt {
        match self.stack.pop() {
            Some(Operand::Stmt(stmt)) => stmt,
            other => unreachable!("operand stack: expected statement, found {other:?}"),
        }
    }

    /// Remove every operand above `mark`, oldest first.
    fn drain_from(&mut self, mark: usize) -> std::vec::Drain<'_, Operand> {
        self.stack.drain(mark..)
    }

    pub(crate) fn drain_exprs(&mut self, mark: usize) -> Vec<Expr> {
        self.drain_from(mark)
            .map(|op| match op {
                Operand::Expr(expr) => expr,
                other => unreachable!("operand stack: expected expression, found {other:?}"),
            })
            .collect()
    }

    pub(crate) fn drain_stmts(&mut self, mark: usize) -> Vec<Stmt> {
        self.drain_from(mark)
            .map(|op| match op {
                Operand::Stmt(stmt) => stmt,
                other => unreachable!("operand stack: expected statement, found {other:?}"),
            })
            .collect()
    }

    pub(crate) fn drain_params(&mut self, mark: usize) -> Vec<Param> {
        self.drain_from(mark)
            .map(|op| match op {
                Operand::Param(param) => param,
                other => unreachable!("operand stack: expected parameter, found {other:?}"),
            })
            .collect()
    }

    pub(crate) fn drain_entries(&mut self, mark: usize) -> Vec<MapEntry> {
        self.drain_from(mark)
            .map(|op| match op {
                Operand::Entry(entry) => entry,
                other => unreachable!("operand stack: expected map entry, found {other:?}"),
            })
            .collect()
    }

    // ── Error Reporting ───────────────────────────────────────────────────────

    /// Queue a recoverable error for the definition being parsed.
    pub(crate) fn defer_error(&mut self, code: ErrorCode, message: impl Into<String>, at: Cursor) {
        let error = self.error(code, message, at.point());
        self.pending.push(error);
    }

    /// Move queued errors of a completed definition into the result.
    pub(crate) fn commit_pending(&mut self) {
        for error in std::mem::take(&mut self.pending) {
            self.errors.push(error);
        }
    }

    pub(crate) fn error(
        &self,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
    ) -> SyntaxError {
        let source_line = self.source_file.line(span.start_line).unwrap_or("");
        SyntaxError::new(&self.source_file.name, code, message, span, source_line)
    }

    /// Start a fresh definition: forget earlier failure positions.
    pub(crate) fn reset_failures(&mut self, at: Cursor) {
        self.furthest = at;
        self.expected.clear();
        self.too_deep = None;
        self.pending.clear();
        self.abandoned.clear();
        self.dead_ends.clear();
    }

    /// Report why the definition starting at `at` failed, returning the
    /// position parsing got furthest to.
    pub(crate) fn report_failure(&mut self, at: Cursor) -> Cursor {
        self.commit_abandoned();
        if let Some(deep) = self.too_deep.take() {
            let error = self.error(
                ErrorCode::NESTING_TOO_DEEP,
                format!("nesting exceeds the limit of {}", self.config.max_nesting),
                deep.point(),
            );
            self.errors.push(error);
            return deep;
        }
        let furthest = self.furthest;
        let code = if furthest == at {
            ErrorCode::TRAILING_INPUT
        } else {
            ErrorCode::UNEXPECTED_INPUT
        };
        let expected = std::mem::take(&mut self.expected);
        let error = self
            .error(code, format!("unexpected {}", self.describe(furthest)), furthest.point())
            .with_expected(expected);
        self.errors.push(error);
        furthest
    }

    /// Commit the distinct diagnostics that failed alternatives left behind,
    /// in source order.
    fn commit_abandoned(&mut self) {
        let mut abandoned = std::mem::take(&mut self.abandoned);
        abandoned.sort_by_key(|e| (e.span.start_line, e.span.start_col));
        abandoned.dedup_by(|a, b| a.span == b.span && a.code == b.code);
        for error in abandoned {
            self.errors.push(error);
        }
    }

    /// Short description of the input at `at` for messages.
    fn describe(&self, at: Cursor) -> String {
        if self.scanner.at_end(at) {
            return "end of input".to_string();
        }
        match self.scanner.identifier(at) {
            Some(lex) => format!("'{}'", lex.text),
            None => match self.scanner.peek(at) {
                Some(ch) => format!("'{ch}'"),
                None => "end of input".to_string(),
            },
        }
    }

    pub(crate) fn too_many_errors(&self) -> bool {
        self.errors.is_full()
    }
}

/// Parse a complete source text, failing on any syntax error.
pub fn parse_source(name: &str, source: &str) -> Result<Program, SyntaxErrors> {
    let file = SourceFile::new(name, source);
    Parser::new(&file).parse().into_result()
}
