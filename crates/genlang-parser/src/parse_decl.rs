//! Top-level structure: program, definitions, parameters, function bodies
//! and type annotations.

use std::sync::Arc;

use genlang_lexer::{Cursor, Keyword, Punct};
use genlang_types::ast::*;

use crate::parser::{Memo, Operand, Parser};

/// Keywords a failed top-level definition resynchronizes on.
const SYNC_KEYWORDS: &[Keyword] = &[Keyword::Fun, Keyword::Const];

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Program
    // ══════════════════════════════════════════════════════════════════════════

    /// `program := gap varDef* funDef* EOI`
    ///
    /// A definition that fails is reported and skipped up to the next
    /// `fun` or `const`, after which parsing carries on.
    pub(crate) fn parse_program(&mut self) -> Option<Program> {
        let start = self.scanner.gap(Cursor::start());
        let mut at = start;
        let mut globals = Vec::new();
        let mut functions = Vec::new();
        let mut in_functions = false;

        while !self.scanner.at_end(at) {
            if self.too_many_errors() {
                return None;
            }
            self.reset_failures(at);

            if !in_functions {
                if let Some(next) = self.attempt(at, Self::parse_var_def) {
                    globals.push(self.pop_var_def());
                    self.commit_pending();
                    at = next;
                    continue;
                }
            }
            if let Some(next) = self.attempt(at, Self::parse_fun_def) {
                functions.push(self.pop_function());
                self.commit_pending();
                in_functions = true;
                at = next;
                continue;
            }

            self.expect_at(at, "end of input");
            let furthest = self.report_failure(at);
            at = self.resync(at, furthest);
        }

        if self.too_many_errors() {
            return None;
        }
        Some(Program {
            globals,
            functions,
            span: start.span_to(at),
        })
    }

    /// Where to resume after a failed definition that started at `start`.
    fn resync(&self, start: Cursor, furthest: Cursor) -> Cursor {
        // A failure right at the start of the next definition resumes there.
        if furthest > start
            && SYNC_KEYWORDS
                .iter()
                .any(|kw| self.scanner.keyword(furthest, *kw).is_some())
        {
            return furthest;
        }
        self.scanner.skip_to_keyword(furthest.max(start), SYNC_KEYWORDS)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Definitions
    // ══════════════════════════════════════════════════════════════════════════

    /// `varDef := ["const"] typeRef identifier "=" expression`
    pub(crate) fn parse_var_def(&mut self, start: Cursor) -> Option<Cursor> {
        let (constant, at) = match self.keyword(start, Keyword::Const) {
            Some(lex) => (true, lex.next),
            None => (false, start),
        };
        let at = self.parse_type_ref(at)?;
        let name = self.identifier(at)?;
        let ident = Ident::new(name.text, name.span());
        let at = self.punct(name.next, Punct::Assign)?.next;
        let next = self.parse_expression(at)?;

        let value = self.pop_expr();
        let type_ref = self.pop_type_ref();
        let span = self.span_from(start);
        self.push(Operand::VarDef(VarDef {
            type_ref,
            name: ident,
            value,
            constant,
            span,
        }));
        Some(next)
    }

    /// `funDef := "fun" typeRef identifier paramList functionBody`
    pub(crate) fn parse_fun_def(&mut self, start: Cursor) -> Option<Cursor> {
        let at = self.keyword(start, Keyword::Fun)?.next;
        let at = self.parse_type_ref(at)?;
        let name = self.identifier(at)?;
        let ident = Ident::new(name.text, name.span());
        self.finish_function(start, name.next, Some(ident))
    }

    /// `functionExpr := "fun" typeRef paramList functionBody`
    pub(crate) fn parse_function_expr(&mut self, start: Cursor) -> Option<Cursor> {
        self.remembered(Memo::FunctionExpr, start, Self::parse_lambda)
    }

    fn parse_lambda(&mut self, start: Cursor) -> Option<Cursor> {
        let at = self.keyword(start, Keyword::Fun)?.next;
        let at = self.parse_type_ref(at)?;
        let next = self.finish_function(start, at, None)?;
        let function = self.pop_function();
        let span = function.span;
        self.push_expr(ExprKind::Function(function), span);
        Some(next)
    }

    /// Shared tail of named and anonymous functions: parameters and body.
    /// Expects the result type on the stack and pushes the function.
    fn finish_function(
        &mut self,
        start: Cursor,
        at: Cursor,
        name: Option<Ident>,
    ) -> Option<Cursor> {
        let mark = self.mark();
        let at = self.parse_param_list(at)?;
        let next = self.parse_function_body(at)?;

        let body = self.pop_block();
        let params = self.drain_params(mark);
        let result = self.pop_type_ref();
        let span = self.span_from(start);
        self.push(Operand::Function(Arc::new(Function {
            name,
            result,
            params,
            body,
            span,
        })));
        Some(next)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Parameters
    // ══════════════════════════════════════════════════════════════════════════

    /// `paramList := "(" (param ("," param)*)? ")"`
    ///
    /// Pushes one operand per parameter.
    pub(crate) fn parse_param_list(&mut self, start: Cursor) -> Option<Cursor> {
        let mut at = self.punct(start, Punct::LParen)?.next;
        if let Some(first) = self.attempt(at, Self::parse_param) {
            at = first;
            while let Some(next) = self.attempt(at, |p, at| {
                let at = p.punct(at, Punct::Comma)?.next;
                p.parse_param(at)
            }) {
                at = next;
            }
        }
        Some(self.punct(at, Punct::RParen)?.next)
    }

    /// `param := typeRef identifier ["=" expression]`
    fn parse_param(&mut self, start: Cursor) -> Option<Cursor> {
        let at = self.parse_type_ref(start)?;
        let name = self.identifier(at)?;
        let ident = Ident::new(name.text, name.span());

        let mut next = name.next;
        let mut default = None;
        if let Some(after) = self.attempt(next, |p, at| {
            let at = p.punct(at, Punct::Assign)?.next;
            p.parse_expression(at)
        }) {
            default = Some(self.pop_expr());
            next = after;
        }

        let type_ref = self.pop_type_ref();
        let span = self.span_from(start);
        self.push(Operand::Param(Param {
            type_ref,
            name: ident,
            default,
            span,
        }));
        Some(next)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Bodies & Types
    // ══════════════════════════════════════════════════════════════════════════

    /// `functionBody := "=" expression | "{" statement* "}"`
    ///
    /// The expression form becomes a block returning that expression.
    fn parse_function_body(&mut self, start: Cursor) -> Option<Cursor> {
        if let Some(eq) = self.punct(start, Punct::Assign) {
            let next = self.parse_expression(eq.next)?;
            let value = self.pop_expr();
            let span = value.span;
            self.push(Operand::Block(Block {
                stmts: vec![Stmt::Return(ReturnStmt { value, span })],
                span,
            }));
            return Some(next);
        }
        self.parse_block(start)
    }

    /// `typeRef := "fun" | identifier`
    pub(crate) fn parse_type_ref(&mut self, at: Cursor) -> Option<Cursor> {
        let lex = match self.keyword(at, Keyword::Fun) {
            Some(lex) => lex,
            None => self.identifier(at)?,
        };
        self.push(Operand::TypeRef(TypeRef::new(lex.text, lex.span())));
        Some(lex.next)
    }
}

#[cfg(test)]
mod tests {
    use genlang_types::SourceFile;

    use super::*;

    fn parse(src: &str) -> crate::ParseResult {
        let file = SourceFile::new("test.gen", src);
        Parser::new(&file).parse()
    }

    #[test]
    fn test_globals_before_functions() {
        let result = parse("num a = 1 const num b = 2 fun num f() = a");
        let program = result.program.unwrap();
        assert!(!result.errors.has_errors());
        assert_eq!(program.globals.len(), 2);
        assert!(program.globals[1].constant);
        assert_eq!(program.functions.len(), 1);
    }

    #[test]
    fn test_global_after_function_is_rejected() {
        let result = parse("fun num f() = 1 num a = 2");
        assert!(result.errors.has_errors());
        assert_eq!(result.program.unwrap().functions.len(), 1);
    }

    #[test]
    fn test_resync_keeps_following_definition() {
        let result = parse("fun num f( = 1\nfun num g() = 2");
        assert_eq!(result.errors.total_errors, 1);
        let program = result.program.unwrap();
        assert!(program.function("g").is_some());
    }

    #[test]
    fn test_fun_type_annotation() {
        let result = parse("fun fun make() = fun num (num x) = x");
        let program = result.program.unwrap();
        assert_eq!(program.functions[0].result.name, "fun");
    }
}
