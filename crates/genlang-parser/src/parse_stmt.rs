//! Statement parsing: blocks, definitions, assignments, loops and
//! returns.

use genlang_lexer::{Cursor, Keyword, Punct};
use genlang_types::ast::*;

use crate::parser::{Operand, Parser};

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Blocks
    // ══════════════════════════════════════════════════════════════════════════

    /// `"{" statement* "}"`
    pub(crate) fn parse_block(&mut self, start: Cursor) -> Option<Cursor> {
        let mut at = self.punct(start, Punct::LBrace)?.next;
        let mark = self.mark();
        while let Some(next) = self.attempt(at, Self::parse_statement) {
            at = next;
        }
        let close = self.punct(at, Punct::RBrace)?;
        let stmts = self.drain_stmts(mark);
        let span = self.span_from(start);
        self.push(Operand::Block(Block { stmts, span }));
        Some(close.next)
    }

    /// `statements := "{" statement* "}" | statement`
    ///
    /// A single statement is wrapped in a block of its own.
    pub(crate) fn parse_statements(&mut self, start: Cursor) -> Option<Cursor> {
        if let Some(next) = self.attempt(start, Self::parse_block) {
            return Some(next);
        }
        let next = self.parse_statement(start)?;
        let stmt = self.pop_stmt();
        let span = self.span_from(start);
        self.push(Operand::Block(Block {
            stmts: vec![stmt],
            span,
        }));
        Some(next)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════════

    /// `statement := (varDef | funDef | returnStmt | forStmt | whileStmt
    ///               | assignment | exprStatement) [";"]`
    pub(crate) fn parse_statement(&mut self, at: Cursor) -> Option<Cursor> {
        self.nested(at, |p, at| {
            let next = p.first_of(
                at,
                &[
                    Self::parse_var_def_stmt,
                    Self::parse_fun_def_stmt,
                    Self::parse_return,
                    Self::parse_for,
                    Self::parse_while,
                    Self::parse_assignment,
                    Self::parse_expr_stmt,
                ],
            )?;
            Some(p.optional_punct(next, Punct::Semi))
        })
    }

    fn parse_var_def_stmt(&mut self, at: Cursor) -> Option<Cursor> {
        let next = self.parse_var_def(at)?;
        let def = self.pop_var_def();
        self.push(Operand::Stmt(Stmt::VarDef(def)));
        Some(next)
    }

    fn parse_fun_def_stmt(&mut self, at: Cursor) -> Option<Cursor> {
        let next = self.parse_fun_def(at)?;
        let function = self.pop_function();
        self.push(Operand::Stmt(Stmt::FunDef(function)));
        Some(next)
    }

    /// `returnStmt := "return" expression`
    fn parse_return(&mut self, start: Cursor) -> Option<Cursor> {
        let at = self.keyword(start, Keyword::Return)?.next;
        let next = self.parse_expression(at)?;
        let value = self.pop_expr();
        let span = self.span_from(start);
        self.push(Operand::Stmt(Stmt::Return(ReturnStmt { value, span })));
        Some(next)
    }

    /// `forStmt := "for" typeRef identifier "in" expression "do" statements`
    fn parse_for(&mut self, start: Cursor) -> Option<Cursor> {
        let at = self.keyword(start, Keyword::For)?.next;
        let at = self.parse_type_ref(at)?;
        let item = self.identifier(at)?;
        let item_ident = Ident::new(item.text, item.span());
        let at = self.keyword(item.next, Keyword::In)?.next;
        let at = self.parse_expression(at)?;
        let at = self.keyword(at, Keyword::Do)?.next;
        let next = self.parse_statements(at)?;

        let body = self.pop_block();
        let iterable = self.pop_expr();
        let type_ref = self.pop_type_ref();
        let span = self.span_from(start);
        self.push(Operand::Stmt(Stmt::For(ForStmt {
            type_ref,
            item: item_ident,
            iterable,
            body,
            span,
        })));
        Some(next)
    }

    /// `whileStmt := "while" booleanExpr "do" statements`
    fn parse_while(&mut self, start: Cursor) -> Option<Cursor> {
        let at = self.keyword(start, Keyword::While)?.next;
        let at = self.parse_boolean(at)?;
        let at = self.keyword(at, Keyword::Do)?.next;
        let next = self.parse_statements(at)?;

        let body = self.pop_block();
        let condition = self.pop_expr();
        let span = self.span_from(start);
        self.push(Operand::Stmt(Stmt::While(WhileStmt {
            condition,
            body,
            span,
        })));
        Some(next)
    }

    /// `assignment := identifier "=" expression`
    fn parse_assignment(&mut self, start: Cursor) -> Option<Cursor> {
        let name = self.identifier(start)?;
        let ident = Ident::new(name.text, name.span());
        let at = self.punct(name.next, Punct::Assign)?.next;
        let next = self.parse_expression(at)?;
        let value = self.pop_expr();
        let span = self.span_from(start);
        self.push(Operand::Stmt(Stmt::Assign(AssignStmt {
            name: ident,
            value,
            span,
        })));
        Some(next)
    }

    fn parse_expr_stmt(&mut self, start: Cursor) -> Option<Cursor> {
        let next = self.parse_expression(start)?;
        let expr = self.pop_expr();
        let span = expr.span;
        self.push(Operand::Stmt(Stmt::Expr(ExprStmt { expr, span })));
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use genlang_types::SourceFile;

    use super::*;

    fn body(src: &str) -> Vec<Stmt> {
        let source = format!("fun num main() {{ {src} }}");
        let file = SourceFile::new("test.gen", &source);
        let result = Parser::new(&file).parse();
        assert!(!result.errors.has_errors(), "{}", result.errors);
        let program = result.program.unwrap();
        program.functions[0].body.stmts.clone()
    }

    #[test]
    fn test_statement_kinds() {
        let stmts = body("num x = 1; x = 2 fun num g() = x return g()");
        assert!(matches!(stmts[0], Stmt::VarDef(_)));
        assert!(matches!(stmts[1], Stmt::Assign(_)));
        assert!(matches!(stmts[2], Stmt::FunDef(_)));
        assert!(matches!(stmts[3], Stmt::Return(_)));
    }

    #[test]
    fn test_loop_bodies_accept_single_statement() {
        let stmts = body("for num i in [1..3] do print(i) while false do {}");
        match &stmts[0] {
            Stmt::For(f) => {
                assert_eq!(f.item.name, "i");
                assert_eq!(f.body.stmts.len(), 1);
            }
            other => panic!("expected for, got {other:?}"),
        }
        match &stmts[1] {
            Stmt::While(w) => assert!(w.body.stmts.is_empty()),
            other => panic!("expected while, got {other:?}"),
        }
    }

    #[test]
    fn test_expression_statement() {
        let stmts = body("print(1)");
        assert!(matches!(
            &stmts[0],
            Stmt::Expr(ExprStmt { expr: Expr { kind: ExprKind::Call { .. }, .. }, .. })
        ));
    }
}
