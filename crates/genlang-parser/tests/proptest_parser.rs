//! Property-based tests for the parser.
//!
//! Generated programs must come back with parameters and statements in
//! exactly the order they were written.

use genlang_lexer::Keyword;
use genlang_parser::parse_source;
use genlang_types::ast::*;
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

/// Identifiers that are not reserved words.
fn arb_ident() -> impl Strategy<Value = String> {
    "[a-z_][a-z0-9_]{0,6}".prop_filter("reserved word", |s| !Keyword::is_reserved(s))
}

/// One statement: (kind, name). 0 = definition, 1 = assignment, 2 = call.
fn arb_stmt() -> impl Strategy<Value = (u8, String)> {
    (0u8..3, arb_ident())
}

fn render_stmt((kind, name): &(u8, String)) -> String {
    match kind {
        0 => format!("num {name} = 1"),
        1 => format!("{name} = 2"),
        _ => format!("print({name})"),
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn parameter_order_matches_source(names in prop::collection::vec(arb_ident(), 0..8)) {
        let params: Vec<_> = names.iter().map(|n| format!("num {n}")).collect();
        let src = format!("fun num f({}) = 0", params.join(", "));
        let program = parse_source("prop.gen", &src).unwrap();
        let parsed: Vec<_> = program.functions[0]
            .params
            .iter()
            .map(|p| p.name.name.clone())
            .collect();
        prop_assert_eq!(parsed, names);
    }

    #[test]
    fn statement_order_matches_source(
        stmts in prop::collection::vec(arb_stmt(), 0..10),
        use_semicolons in any::<bool>(),
    ) {
        let sep = if use_semicolons { "; " } else { "\n" };
        let body: Vec<_> = stmts.iter().map(render_stmt).collect();
        let src = format!("fun num f() {{\n{}\n}}", body.join(sep));
        let program = parse_source("prop.gen", &src).unwrap();
        let parsed = &program.functions[0].body.stmts;
        prop_assert_eq!(parsed.len(), stmts.len());

        for (stmt, (kind, name)) in parsed.iter().zip(&stmts) {
            let matches = match (kind, stmt) {
                (0, Stmt::VarDef(def)) => &def.name.name == name,
                (1, Stmt::Assign(assign)) => &assign.name.name == name,
                (2, Stmt::Expr(ExprStmt { expr, .. })) => match &expr.kind {
                    ExprKind::Call { name: callee, args } => {
                        let printed = ExprKind::Identifier(name.clone());
                        callee.name == "print"
                            && matches!(&args[..], [arg] if arg.kind == printed)
                    }
                    _ => false,
                },
                _ => false,
            };
            prop_assert!(matches, "statement {:?} does not match ({}, {})", stmt, kind, name);
        }
    }
}
