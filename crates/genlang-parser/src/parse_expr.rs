//! Expression parsing with full operator precedence.
//!
//! Precedence (lowest → highest):
//! 7. `or`, `xor`
//! 6. `and`
//! 5. `not`
//! 4. `==`, `!=`, `<`, `>`, `<=`, `>=` (no chaining)
//! 3. `+`, `-`
//! 2. `*`, `/`, `%`
//! 1. `^` (left-associative)
//! 0. unary `-`, then postfix call, index and `.method(...)`
//!
//! Every binary level folds left, so `8 - 3 - 2` is `(8 - 3) - 2`.

use genlang_lexer::{Cursor, Keyword, NumberScan, Punct};
use genlang_types::ast::*;
use genlang_types::ErrorCode;

use crate::parser::{Memo, Operand, Parser, Rule};

/// An operator terminal: a reserved word or a symbol.
#[derive(Debug, Clone, Copy)]
enum OpToken {
    Word(Keyword),
    Symbol(Punct),
}

const BOOLEAN_OPS: &[(OpToken, BinOp)] = &[
    (OpToken::Word(Keyword::Or), BinOp::Or),
    (OpToken::Word(Keyword::Xor), BinOp::Xor),
];

const AND_OPS: &[(OpToken, BinOp)] = &[(OpToken::Word(Keyword::And), BinOp::And)];

const COMPARISON_OPS: &[(OpToken, BinOp)] = &[
    (OpToken::Symbol(Punct::EqEq), BinOp::Eq),
    (OpToken::Symbol(Punct::NotEq), BinOp::NotEq),
    (OpToken::Symbol(Punct::LessEq), BinOp::LessEq),
    (OpToken::Symbol(Punct::Less), BinOp::Less),
    (OpToken::Symbol(Punct::GreaterEq), BinOp::GreaterEq),
    (OpToken::Symbol(Punct::Greater), BinOp::Greater),
];

const MATH_OPS: &[(OpToken, BinOp)] = &[
    (OpToken::Symbol(Punct::Plus), BinOp::Add),
    (OpToken::Symbol(Punct::Minus), BinOp::Sub),
];

const TERM_OPS: &[(OpToken, BinOp)] = &[
    (OpToken::Symbol(Punct::Star), BinOp::Mul),
    (OpToken::Symbol(Punct::Slash), BinOp::Div),
    (OpToken::Symbol(Punct::Percent), BinOp::Mod),
];

const FACTOR_OPS: &[(OpToken, BinOp)] = &[(OpToken::Symbol(Punct::Caret), BinOp::Pow)];

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Entry Point
    // ══════════════════════════════════════════════════════════════════════════

    /// `expression := ifExpr | functionExpr | update | booleanExpr`
    pub(crate) fn parse_expression(&mut self, at: Cursor) -> Option<Cursor> {
        self.nested(at, |p, at| {
            p.first_of(
                at,
                &[Self::parse_if, Self::parse_function_expr, Self::parse_update],
            )
        })
    }

    /// `update := postfix "[" expression "]" "=" expression`, falling back
    /// to `booleanExpr`.
    ///
    /// Left-factored: the target is parsed once as a boolean expression and
    /// only turned into an update when it ended in an index.
    fn parse_update(&mut self, start: Cursor) -> Option<Cursor> {
        let at = self.parse_boolean(start)?;
        if !matches!(self.peek_expr().map(|e| &e.kind), Some(ExprKind::Index { .. })) {
            return Some(at);
        }
        let Some(next) = self.attempt(at, |p, at| {
            let at = p.punct(at, Punct::Assign)?.next;
            p.parse_expression(at)
        }) else {
            return Some(at);
        };

        let value = self.pop_expr();
        let ExprKind::Index { target, key } = self.pop_expr().kind else {
            unreachable!("update target checked to be an index")
        };
        let span = self.span_from(start);
        self.push_expr(
            ExprKind::Update {
                target,
                key,
                value: Box::new(value),
            },
            span,
        );
        Some(next)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Precedence Chain
    // ══════════════════════════════════════════════════════════════════════════

    /// `booleanExpr := andExpr (("or" | "xor") andExpr)*`
    pub(crate) fn parse_boolean(&mut self, at: Cursor) -> Option<Cursor> {
        self.fold_binary(at, Self::parse_and, BOOLEAN_OPS)
    }

    /// `andExpr := notExpr ("and" notExpr)*`
    fn parse_and(&mut self, at: Cursor) -> Option<Cursor> {
        self.fold_binary(at, Self::parse_not, AND_OPS)
    }

    /// `notExpr := "not" notExpr | comparison`
    fn parse_not(&mut self, start: Cursor) -> Option<Cursor> {
        let Some(kw) = self.keyword(start, Keyword::Not) else {
            return self.parse_comparison(start);
        };
        let next = self.nested(kw.next, Self::parse_not)?;
        let operand = self.pop_expr();
        let span = self.span_from(start);
        self.push_expr(
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            },
            span,
        );
        Some(next)
    }

    /// `comparison := mathExpr [compareOp mathExpr]`
    fn parse_comparison(&mut self, start: Cursor) -> Option<Cursor> {
        let at = self.parse_math(start)?;
        let mut matched = None;
        let Some(next) = self.attempt(at, |p, at| {
            let (op, after) = p.parse_operator(at, COMPARISON_OPS)?;
            matched = Some(op);
            p.parse_math(after)
        }) else {
            return Some(at);
        };
        if let Some(op) = matched {
            self.push_binary(op);
        }
        Some(next)
    }

    /// `mathExpr := term (("+" | "-") term)*`
    fn parse_math(&mut self, at: Cursor) -> Option<Cursor> {
        self.fold_binary(at, Self::parse_term, MATH_OPS)
    }

    /// `term := factor (("*" | "/" | "%") factor)*`
    fn parse_term(&mut self, at: Cursor) -> Option<Cursor> {
        self.fold_binary(at, Self::parse_factor, TERM_OPS)
    }

    /// `factor := unary ("^" unary)*`
    fn parse_factor(&mut self, at: Cursor) -> Option<Cursor> {
        self.fold_binary(at, Self::parse_unary, FACTOR_OPS)
    }

    /// `unary := postfix | "-" unary`
    ///
    /// `postfix` goes first so `-3` stays a negative literal.
    fn parse_unary(&mut self, start: Cursor) -> Option<Cursor> {
        if let Some(next) = self.attempt(start, Self::parse_postfix) {
            return Some(next);
        }
        let minus = self.punct(start, Punct::Minus)?;
        let next = self.nested(minus.next, Self::parse_unary)?;
        let operand = self.pop_expr();
        let span = self.span_from(start);
        self.push_expr(
            ExprKind::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            },
            span,
        );
        Some(next)
    }

    /// `operand (op operand)*`, folded to the left.
    ///
    /// An operator whose right operand fails to parse is not consumed.
    fn fold_binary(
        &mut self,
        start: Cursor,
        operand: Rule<'src>,
        ops: &[(OpToken, BinOp)],
    ) -> Option<Cursor> {
        let mut at = operand(self, start)?;
        loop {
            let mut matched = None;
            let next = self.attempt(at, |p, at| {
                let (op, after) = p.parse_operator(at, ops)?;
                matched = Some(op);
                operand(p, after)
            });
            match (next, matched) {
                (Some(next), Some(op)) => {
                    self.push_binary(op);
                    at = next;
                }
                _ => return Some(at),
            }
        }
    }

    fn parse_operator(&mut self, at: Cursor, ops: &[(OpToken, BinOp)]) -> Option<(BinOp, Cursor)> {
        for &(token, op) in ops {
            let lexeme = match token {
                OpToken::Word(kw) => self.keyword(at, kw),
                OpToken::Symbol(punct) => self.punct(at, punct),
            };
            if let Some(lex) = lexeme {
                return Some((op, lex.next));
            }
        }
        None
    }

    /// Pop right then left and push `left op right`.
    fn push_binary(&mut self, op: BinOp) {
        let right = self.pop_expr();
        let left = self.pop_expr();
        let span = left.span.merge(right.span);
        self.push_expr(
            ExprKind::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
            span,
        );
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Postfix
    // ══════════════════════════════════════════════════════════════════════════

    /// `postfix := atom ("(" args ")" | "[" expression "]" | "." identifier "(" args ")")*`
    fn parse_postfix(&mut self, start: Cursor) -> Option<Cursor> {
        let mut at = self.parse_atom(start)?;
        loop {
            let mark = self.mark();

            if let Some(next) = self.attempt(at, Self::parse_args) {
                let args = self.drain_exprs(mark);
                let callee = self.pop_expr();
                let span = self.span_from(start);
                self.push_expr(
                    ExprKind::Apply {
                        callee: Box::new(callee),
                        args,
                    },
                    span,
                );
                at = next;
                continue;
            }

            if let Some(next) = self.attempt(at, |p, at| {
                let at = p.punct(at, Punct::LBracket)?.next;
                let at = p.parse_expression(at)?;
                Some(p.punct(at, Punct::RBracket)?.next)
            }) {
                let key = self.pop_expr();
                let target = self.pop_expr();
                let span = self.span_from(start);
                self.push_expr(
                    ExprKind::Index {
                        target: Box::new(target),
                        key: Box::new(key),
                    },
                    span,
                );
                at = next;
                continue;
            }

            let mut method = None;
            let next = self.attempt(at, |p, at| {
                let at = p.punct(at, Punct::Dot)?.next;
                let name = p.identifier(at)?;
                method = Some(Ident::new(name.text, name.span()));
                p.parse_args(name.next)
            });
            match (next, method) {
                (Some(next), Some(method)) => {
                    let args = self.drain_exprs(mark);
                    let receiver = self.pop_expr();
                    let span = self.span_from(start);
                    self.push_expr(
                        ExprKind::MethodCall {
                            receiver: Box::new(receiver),
                            method,
                            args,
                        },
                        span,
                    );
                    at = next;
                }
                _ => return Some(at),
            }
        }
    }

    /// `"(" (expression ("," expression)*)? ")"`
    ///
    /// Pushes one operand per argument.
    fn parse_args(&mut self, start: Cursor) -> Option<Cursor> {
        self.remembered(Memo::Args, start, Self::parse_arg_list)
    }

    fn parse_arg_list(&mut self, start: Cursor) -> Option<Cursor> {
        let mut at = self.punct(start, Punct::LParen)?.next;
        if let Some(first) = self.attempt(at, Self::parse_expression) {
            at = first;
            while let Some(next) = self.attempt(at, |p, at| {
                let at = p.punct(at, Punct::Comma)?.next;
                p.parse_expression(at)
            }) {
                at = next;
            }
        }
        Some(self.punct(at, Punct::RParen)?.next)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Atoms
    // ══════════════════════════════════════════════════════════════════════════

    /// ```text
    /// atom := number | "true" | "false" | create | collection
    ///       | functionCall | identifier | "(" expression ")"
    ///       | ifExpr | functionExpr
    /// ```
    fn parse_atom(&mut self, at: Cursor) -> Option<Cursor> {
        self.first_of(
            at,
            &[
                Self::parse_number,
                Self::parse_bool,
                Self::parse_create,
                Self::parse_collection,
                Self::parse_name,
                Self::parse_parens,
                Self::parse_if,
                Self::parse_function_expr,
            ],
        )
    }

    /// A numeric literal. A malformed literal is reported, replaced by `0`
    /// and skipped so parsing can go on.
    fn parse_number(&mut self, start: Cursor) -> Option<Cursor> {
        match self.scanner.number(start) {
            NumberScan::Ok { value, lexeme } => {
                self.last_end = lexeme.end;
                self.push_expr(ExprKind::NumberLit(value), lexeme.span());
                Some(lexeme.next)
            }
            NumberScan::Malformed { at, lexeme } => {
                self.last_end = lexeme.end;
                self.defer_error(
                    ErrorCode::MALFORMED_NUMBER,
                    format!("malformed number '{}'", lexeme.text),
                    at,
                );
                self.push_expr(ExprKind::NumberLit(0.0), lexeme.span());
                Some(lexeme.next)
            }
            NumberScan::NoMatch => {
                self.expect_at(start, "number");
                None
            }
        }
    }

    fn parse_bool(&mut self, start: Cursor) -> Option<Cursor> {
        let (value, lex) = match self.keyword(start, Keyword::True) {
            Some(lex) => (true, lex),
            None => (false, self.keyword(start, Keyword::False)?),
        };
        self.push_expr(ExprKind::BoolLit(value), lex.span());
        Some(lex.next)
    }

    /// `create := "new" typeRef "(" args ")"`
    fn parse_create(&mut self, start: Cursor) -> Option<Cursor> {
        let at = self.keyword(start, Keyword::New)?.next;
        let at = self.parse_type_ref(at)?;
        let mark = self.mark();
        let next = self.parse_args(at)?;
        let args = self.drain_exprs(mark);
        let type_ref = self.pop_type_ref();
        let span = self.span_from(start);
        self.push_expr(ExprKind::Create { type_ref, args }, span);
        Some(next)
    }

    /// `functionCall := identifier "(" args ")"`, else a plain identifier.
    fn parse_name(&mut self, start: Cursor) -> Option<Cursor> {
        let name = self.identifier(start)?;
        let mark = self.mark();
        if let Some(next) = self.attempt(name.next, Self::parse_args) {
            let args = self.drain_exprs(mark);
            let span = self.span_from(start);
            self.push_expr(
                ExprKind::Call {
                    name: Ident::new(name.text, name.span()),
                    args,
                },
                span,
            );
            return Some(next);
        }
        self.push_expr(ExprKind::Identifier(name.text.to_string()), name.span());
        Some(name.next)
    }

    /// `"(" expression ")"`
    fn parse_parens(&mut self, start: Cursor) -> Option<Cursor> {
        let at = self.punct(start, Punct::LParen)?.next;
        let at = self.parse_expression(at)?;
        Some(self.punct(at, Punct::RParen)?.next)
    }

    /// `ifExpr := "if" booleanExpr "then" statements ["else" statements]`
    pub(crate) fn parse_if(&mut self, start: Cursor) -> Option<Cursor> {
        self.remembered(Memo::If, start, Self::parse_if_expr)
    }

    fn parse_if_expr(&mut self, start: Cursor) -> Option<Cursor> {
        let at = self.keyword(start, Keyword::If)?.next;
        let at = self.parse_boolean(at)?;
        let at = self.keyword(at, Keyword::Then)?.next;
        let mut next = self.parse_statements(at)?;

        let mut else_block = None;
        if let Some(after) = self.attempt(next, |p, at| {
            let at = p.keyword(at, Keyword::Else)?.next;
            p.parse_statements(at)
        }) {
            else_block = Some(self.pop_block());
            next = after;
        }

        let then_block = self.pop_block();
        let condition = self.pop_expr();
        let span = self.span_from(start);
        self.push_expr(
            ExprKind::If(Box::new(IfExpr {
                condition,
                then_block,
                else_block,
                span,
            })),
            span,
        );
        Some(next)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Collections
    // ══════════════════════════════════════════════════════════════════════════

    /// `collection := map | range | list`, left-factored on `[`.
    ///
    /// `[:]` and `[]` are recognised up front; otherwise the first element
    /// is parsed once and the token after it picks the form.
    fn parse_collection(&mut self, start: Cursor) -> Option<Cursor> {
        let open = self.punct(start, Punct::LBracket)?;

        if let Some(next) = self.attempt(open.next, |p, at| {
            let colon = p.punct(at, Punct::Colon)?;
            Some(p.punct(colon.next, Punct::RBracket)?.next)
        }) {
            let span = self.span_from(start);
            self.push_expr(ExprKind::Map(Vec::new()), span);
            return Some(next);
        }
        if let Some(close) = self.punct(open.next, Punct::RBracket) {
            let span = self.span_from(start);
            self.push_expr(ExprKind::List(Vec::new()), span);
            return Some(close.next);
        }

        let mark = self.mark();
        let at = self.parse_expression(open.next)?;
        if let Some(next) = self.attempt(at, |p, at| p.parse_range_tail(start, at)) {
            return Some(next);
        }
        if let Some(next) = self.attempt(at, |p, at| p.parse_map_tail(start, mark, at)) {
            return Some(next);
        }
        self.parse_list_tail(start, mark, at)
    }

    /// `(".." | "...") expression ["step" expression] "]"`
    fn parse_range_tail(&mut self, start: Cursor, at: Cursor) -> Option<Cursor> {
        let (inclusive, at) = match self.punct(at, Punct::DotDotDot) {
            Some(lex) => (true, lex.next),
            None => (false, self.punct(at, Punct::DotDot)?.next),
        };
        let mut at = self.parse_expression(at)?;
        let mut step = None;
        if let Some(next) = self.attempt(at, |p, at| {
            let at = p.keyword(at, Keyword::Step)?.next;
            p.parse_expression(at)
        }) {
            step = Some(Box::new(self.pop_expr()));
            at = next;
        }
        let close = self.punct(at, Punct::RBracket)?;

        let end = self.pop_expr();
        let first = self.pop_expr();
        let span = self.span_from(start);
        self.push_expr(
            ExprKind::Range(RangeExpr {
                start: Box::new(first),
                end: Box::new(end),
                inclusive,
                step,
            }),
            span,
        );
        Some(close.next)
    }

    /// `":" expression ("," entry)* "]"`, the first key already parsed.
    fn parse_map_tail(&mut self, start: Cursor, mark: usize, at: Cursor) -> Option<Cursor> {
        let at = self.punct(at, Punct::Colon)?.next;
        let mut at = self.parse_expression(at)?;
        self.push_entry();
        while let Some(next) = self.attempt(at, |p, at| {
            let at = p.punct(at, Punct::Comma)?.next;
            let at = p.parse_expression(at)?;
            let at = p.punct(at, Punct::Colon)?.next;
            let next = p.parse_expression(at)?;
            p.push_entry();
            Some(next)
        }) {
            at = next;
        }
        let close = self.punct(at, Punct::RBracket)?;
        let entries = self.drain_entries(mark);
        let span = self.span_from(start);
        self.push_expr(ExprKind::Map(entries), span);
        Some(close.next)
    }

    /// Pop value then key and push the entry.
    fn push_entry(&mut self) {
        let value = self.pop_expr();
        let key = self.pop_expr();
        self.push(Operand::Entry(MapEntry { key, value }));
    }

    /// `("," expression)* "]"`, the first element already parsed.
    fn parse_list_tail(&mut self, start: Cursor, mark: usize, mut at: Cursor) -> Option<Cursor> {
        while let Some(next) = self.attempt(at, |p, at| {
            let at = p.punct(at, Punct::Comma)?.next;
            p.parse_expression(at)
        }) {
            at = next;
        }
        let close = self.punct(at, Punct::RBracket)?;
        let items = self.drain_exprs(mark);
        let span = self.span_from(start);
        self.push_expr(ExprKind::List(items), span);
        Some(close.next)
    }
}

#[cfg(test)]
mod tests {
    use genlang_types::SourceFile;

    use super::*;

    fn expr(src: &str) -> Expr {
        let source = format!("num v = {src}");
        let file = SourceFile::new("test.gen", &source);
        let result = Parser::new(&file).parse();
        assert!(!result.errors.has_errors(), "{}", result.errors);
        result.program.unwrap().globals.remove(0).value
    }

    #[test]
    fn test_negative_literal_vs_subtraction() {
        assert!(matches!(expr("-3").kind, ExprKind::NumberLit(n) if n == -3.0));
        assert!(matches!(
            expr("8-3").kind,
            ExprKind::Binary { op: BinOp::Sub, .. }
        ));
        assert!(matches!(
            expr("-x").kind,
            ExprKind::Unary { op: UnaryOp::Neg, .. }
        ));
    }

    #[test]
    fn test_comparison_does_not_chain() {
        let file = SourceFile::new("test.gen", "num v = 1 < 2 < 3");
        let result = Parser::new(&file).parse();
        assert!(result.errors.has_errors());
    }

    #[test]
    fn test_update_needs_index_target() {
        assert!(matches!(expr("xs[0] = 4").kind, ExprKind::Update { .. }));
        assert!(matches!(expr("xs[0] == 4").kind, ExprKind::Binary { op: BinOp::Eq, .. }));
    }

    #[test]
    fn test_method_call_and_apply() {
        assert!(matches!(expr("xs.len()").kind, ExprKind::MethodCall { .. }));
        assert!(matches!(expr("make()(2)").kind, ExprKind::Apply { .. }));
    }
}
