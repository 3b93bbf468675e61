//! Core expression and statement evaluator.

use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use genlang_types::ast::*;

use crate::budget::{ExecutionBudget, Meter};
use crate::builtins::BuiltinRegistry;
use crate::env::{AssignError, ScopeId, Scopes};
use crate::error::{EvalError, EvalResult};
use crate::stack::ensure_sufficient_stack;
use crate::value::{Closure, MapValue, Value};

/// Outcome of running a statement or block.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Completed; carries the statement's value (`Unit` for most statements).
    Normal(Value),
    /// A `return` is unwinding towards the enclosing call.
    Return(Value),
}

impl Flow {
    pub fn into_value(self) -> Value {
        match self {
            Flow::Normal(value) | Flow::Return(value) => value,
        }
    }
}

/// The core evaluator. Walks AST nodes and produces values.
///
/// One instance serves one top-level call: it owns the meter and every
/// scope that call creates. Scopes are released together when the
/// evaluator is dropped.
pub struct Evaluator {
    builtins: Arc<BuiltinRegistry>,
    meter: Meter,
    scopes: Scopes,
    globals: ScopeId,
    /// Top-level functions resolvable by name from any scope.
    program: Option<Arc<Program>>,
}

impl Evaluator {
    /// A fresh evaluator. The budget clock starts now.
    pub fn new(builtins: Arc<BuiltinRegistry>, budget: ExecutionBudget) -> Self {
        let mut scopes = Scopes::new();
        let globals = scopes.root();
        Self {
            builtins,
            meter: Meter::new(budget),
            scopes,
            globals,
            program: None,
        }
    }

    /// Make `program`'s top-level functions callable by name.
    pub fn set_program(&mut self, program: Arc<Program>) {
        self.program = Some(program);
    }

    pub fn globals(&self) -> ScopeId {
        self.globals
    }

    pub fn meter(&self) -> &Meter {
        &self.meter
    }

    /// Evaluate the program's global definitions, in order, into the global
    /// scope.
    pub fn define_globals(&mut self) -> EvalResult<()> {
        let Some(program) = self.program.clone() else {
            return Ok(());
        };
        let globals = self.globals;
        for def in &program.globals {
            self.exec_var_def(def, globals)?;
        }
        tracing::debug!(count = program.globals.len(), "defined globals");
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expression evaluation
    // ══════════════════════════════════════════════════════════════════════

    /// Evaluate an expression to a value.
    pub fn eval_expr(&mut self, expr: &Expr, scope: ScopeId) -> EvalResult<Value> {
        ensure_sufficient_stack(|| self.eval_expr_inner(expr, scope))
    }

    fn eval_expr_inner(&mut self, expr: &Expr, scope: ScopeId) -> EvalResult<Value> {
        self.meter.tick()?;
        match &expr.kind {
            ExprKind::NumberLit(n) => Ok(Value::Number(*n)),
            ExprKind::BoolLit(b) => Ok(Value::Bool(*b)),
            ExprKind::List(elems) => Ok(Value::list(self.eval_args(elems, scope)?)),
            ExprKind::Map(entries) => self.eval_map_literal(entries, scope),
            ExprKind::Range(range) => self.eval_range_literal(range, scope),

            ExprKind::Identifier(name) => self.eval_identifier(name, scope),
            ExprKind::Call { name, args } => self.eval_call(name, args, scope),
            ExprKind::Apply { callee, args } => {
                let callee = self.eval_expr(callee, scope)?;
                let args = self.eval_args(args, scope)?;
                self.apply(callee, args)
            }
            ExprKind::MethodCall {
                receiver,
                method,
                args,
            } => self.eval_method_call(receiver, &method.name, args, scope),
            ExprKind::Create { type_ref, args } => self.eval_create(type_ref, args, scope),
            ExprKind::Index { target, key } => {
                let target = self.eval_expr(target, scope)?;
                let key = self.eval_expr(key, scope)?;
                index(&target, &key)
            }
            ExprKind::Update { target, key, value } => self.eval_update(target, key, value, scope),

            ExprKind::Binary { left, op, right } => self.eval_binary(left, *op, right, scope),
            ExprKind::Unary { op, operand } => self.eval_unary(*op, operand, scope),

            ExprKind::If(if_expr) => match self.exec_if(if_expr, scope)? {
                Flow::Normal(value) => Ok(value),
                Flow::Return(_) => Err(EvalError::UnsupportedOperation(
                    "return inside an if used as a value".into(),
                )),
            },
            ExprKind::Function(function) => Ok(closure(Arc::clone(function), scope)),
        }
    }

    fn eval_args(&mut self, args: &[Expr], scope: ScopeId) -> EvalResult<Vec<Value>> {
        args.iter().map(|arg| self.eval_expr(arg, scope)).collect()
    }

    fn eval_map_literal(&mut self, entries: &[MapEntry], scope: ScopeId) -> EvalResult<Value> {
        let mut map = MapValue::new();
        for entry in entries {
            let key = self.eval_expr(&entry.key, scope)?;
            let value = self.eval_expr(&entry.value, scope)?;
            map.insert(key, value);
        }
        Ok(Value::map(map))
    }

    fn eval_range_literal(&mut self, range: &RangeExpr, scope: ScopeId) -> EvalResult<Value> {
        let steps = self.eval_range(range, scope)?;
        let mut items = Vec::new();
        for item in steps {
            self.meter.tick()?;
            items.push(Value::Number(item));
        }
        Ok(Value::list(items))
    }

    fn eval_range(&mut self, range: &RangeExpr, scope: ScopeId) -> EvalResult<RangeSteps> {
        let start = self.eval_expr(&range.start, scope)?.as_number()?;
        let end = self.eval_expr(&range.end, scope)?.as_number()?;
        let step = match &range.step {
            Some(step) => self.eval_expr(step, scope)?.as_number()?,
            None if start <= end => 1.0,
            None => -1.0,
        };
        if step == 0.0 {
            return Err(EvalError::UnsupportedOperation("range step of zero".into()));
        }
        Ok(RangeSteps {
            start,
            end,
            step,
            inclusive: range.inclusive,
            next: 0,
        })
    }

    fn eval_identifier(&self, name: &str, scope: ScopeId) -> EvalResult<Value> {
        self.scopes
            .lookup(scope, name)
            .or_else(|| self.program_function(name))
            .ok_or_else(|| EvalError::NameNotFound(name.to_string()))
    }

    /// A top-level function as a closure over the global scope.
    fn program_function(&self, name: &str) -> Option<Value> {
        let function = self.program.as_ref()?.function(name)?;
        Some(closure(Arc::clone(function), self.globals))
    }

    fn eval_call(&mut self, name: &Ident, args: &[Expr], scope: ScopeId) -> EvalResult<Value> {
        if let Some(callee) = self
            .scopes
            .lookup(scope, &name.name)
            .or_else(|| self.program_function(&name.name))
        {
            let args = self.eval_args(args, scope)?;
            return self.apply(callee, args);
        }
        if let Some(builtin) = self.builtins.get(&name.name).cloned() {
            let args = self.eval_args(args, scope)?;
            return builtin(args);
        }
        Err(EvalError::NameNotFound(name.name.clone()))
    }

    fn eval_method_call(
        &mut self,
        receiver: &Expr,
        method: &str,
        args: &[Expr],
        scope: ScopeId,
    ) -> EvalResult<Value> {
        let receiver = self.eval_expr(receiver, scope)?;
        let mut all_args = vec![receiver];
        all_args.extend(self.eval_args(args, scope)?);
        match self.builtins.get(method).cloned() {
            Some(builtin) => builtin(all_args),
            None => Err(EvalError::UnsupportedOperation(format!(
                "unknown method '{method}'"
            ))),
        }
    }

    fn eval_create(
        &mut self,
        type_ref: &TypeRef,
        args: &[Expr],
        scope: ScopeId,
    ) -> EvalResult<Value> {
        let args = self.eval_args(args, scope)?;
        match self.builtins.get(&type_ref.name).cloned() {
            Some(builtin) => builtin(args),
            None => Err(EvalError::UnsupportedOperation(format!(
                "cannot create '{}'",
                type_ref.name
            ))),
        }
    }

    fn eval_update(
        &mut self,
        target: &Expr,
        key: &Expr,
        value: &Expr,
        scope: ScopeId,
    ) -> EvalResult<Value> {
        let target = self.eval_expr(target, scope)?;
        let key = self.eval_expr(key, scope)?;
        let value = self.eval_expr(value, scope)?;
        match &target {
            Value::List(items) => {
                let mut items = items.borrow_mut();
                let i = list_index(&key, items.len(), true)?;
                if i == items.len() {
                    items.push(value.clone());
                } else {
                    items[i] = value.clone();
                }
            }
            Value::Map(map) => map.borrow_mut().insert(key, value.clone()),
            other => {
                return Err(EvalError::TypeMismatch(format!(
                    "cannot update an element of {}",
                    other.type_name()
                )))
            }
        }
        Ok(value)
    }

    // ── Operators ────────────────────────────────────────────────────────

    fn eval_binary(
        &mut self,
        left: &Expr,
        op: BinOp,
        right: &Expr,
        scope: ScopeId,
    ) -> EvalResult<Value> {
        if op == BinOp::And || op == BinOp::Or {
            let lv = self.eval_expr(left, scope)?.as_bool()?;
            if lv == (op == BinOp::Or) {
                return Ok(Value::Bool(lv));
            }
            return Ok(Value::Bool(self.eval_expr(right, scope)?.as_bool()?));
        }

        let lv = self.eval_expr(left, scope)?;
        let rv = self.eval_expr(right, scope)?;

        match op {
            BinOp::Add => match (&lv, &rv) {
                (Value::List(a), Value::List(b)) => {
                    let mut items = a.borrow().clone();
                    items.extend(b.borrow().iter().cloned());
                    Ok(Value::list(items))
                }
                _ => arith(&lv, &rv, op, |a, b| a + b),
            },
            BinOp::Sub => arith(&lv, &rv, op, |a, b| a - b),
            BinOp::Mul => arith(&lv, &rv, op, |a, b| a * b),
            BinOp::Pow => arith(&lv, &rv, op, f64::powf),
            BinOp::Div | BinOp::Mod => {
                if let Value::Number(b) = rv {
                    if b == 0.0 && matches!(lv, Value::Number(_)) {
                        return Err(EvalError::DivisionByZero);
                    }
                }
                if op == BinOp::Div {
                    arith(&lv, &rv, op, |a, b| a / b)
                } else {
                    arith(&lv, &rv, op, |a, b| a % b)
                }
            }
            BinOp::Eq => Ok(Value::Bool(lv.structural_eq(&rv))),
            BinOp::NotEq => Ok(Value::Bool(!lv.structural_eq(&rv))),
            BinOp::Less => compare(&lv, &rv, op, |a, b| a < b),
            BinOp::LessEq => compare(&lv, &rv, op, |a, b| a <= b),
            BinOp::Greater => compare(&lv, &rv, op, |a, b| a > b),
            BinOp::GreaterEq => compare(&lv, &rv, op, |a, b| a >= b),
            BinOp::Xor => match (&lv, &rv) {
                (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a ^ b)),
                _ => Err(operand_mismatch(&lv, &rv, op)),
            },
            BinOp::And | BinOp::Or => unreachable!("handled above"),
        }
    }

    fn eval_unary(&mut self, op: UnaryOp, operand: &Expr, scope: ScopeId) -> EvalResult<Value> {
        let value = self.eval_expr(operand, scope)?;
        match (op, &value) {
            (UnaryOp::Neg, Value::Number(n)) => Ok(Value::Number(-n)),
            (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
            (UnaryOp::Neg, other) => Err(EvalError::TypeMismatch(format!(
                "cannot negate {}",
                other.type_name()
            ))),
            (UnaryOp::Not, other) => Err(EvalError::TypeMismatch(format!(
                "cannot apply 'not' to {}",
                other.type_name()
            ))),
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════

    /// Run a block's statements in `scope`. The caller owns scope creation.
    pub fn exec_block(&mut self, block: &Block, scope: ScopeId) -> EvalResult<Flow> {
        let mut last = Value::Unit;
        for stmt in &block.stmts {
            match self.exec_stmt(stmt, scope)? {
                Flow::Normal(value) => last = value,
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }
        Ok(Flow::Normal(last))
    }

    pub fn exec_stmt(&mut self, stmt: &Stmt, scope: ScopeId) -> EvalResult<Flow> {
        ensure_sufficient_stack(|| self.exec_stmt_inner(stmt, scope))
    }

    fn exec_stmt_inner(&mut self, stmt: &Stmt, scope: ScopeId) -> EvalResult<Flow> {
        self.meter.tick()?;
        match stmt {
            Stmt::VarDef(def) => {
                self.exec_var_def(def, scope)?;
                Ok(Flow::Normal(Value::Unit))
            }
            Stmt::FunDef(function) => {
                self.scopes.define_function(scope, Arc::clone(function));
                Ok(Flow::Normal(Value::Unit))
            }
            Stmt::Assign(assign) => {
                let value = self.eval_expr(&assign.value, scope)?;
                self.scopes
                    .assign(scope, &assign.name.name, value)
                    .map_err(|err| match err {
                        AssignError::Undefined => {
                            EvalError::NameNotFound(assign.name.name.clone())
                        }
                        AssignError::Constant => EvalError::UnsupportedOperation(format!(
                            "cannot assign to constant '{}'",
                            assign.name.name
                        )),
                    })?;
                Ok(Flow::Normal(Value::Unit))
            }
            // An `if` in statement position lets `return` through.
            Stmt::Expr(ExprStmt { expr, .. }) => match &expr.kind {
                ExprKind::If(if_expr) => {
                    self.meter.tick()?;
                    self.exec_if(if_expr, scope)
                }
                _ => Ok(Flow::Normal(self.eval_expr(expr, scope)?)),
            },
            Stmt::Return(ret) => Ok(Flow::Return(self.eval_expr(&ret.value, scope)?)),
            Stmt::For(for_stmt) => self.exec_for(for_stmt, scope),
            Stmt::While(while_stmt) => self.exec_while(while_stmt, scope),
        }
    }

    fn exec_var_def(&mut self, def: &VarDef, scope: ScopeId) -> EvalResult<()> {
        let value = self.eval_expr(&def.value, scope)?;
        self.scopes.define(scope, &def.name.name, value, def.constant);
        Ok(())
    }

    fn exec_if(&mut self, if_expr: &IfExpr, scope: ScopeId) -> EvalResult<Flow> {
        let condition = self.eval_expr(&if_expr.condition, scope)?.as_bool()?;
        if condition {
            let inner = self.scopes.child(scope);
            self.exec_block(&if_expr.then_block, inner)
        } else if let Some(else_block) = &if_expr.else_block {
            let inner = self.scopes.child(scope);
            self.exec_block(else_block, inner)
        } else {
            Ok(Flow::Normal(Value::Unit))
        }
    }

    fn exec_while(&mut self, while_stmt: &WhileStmt, scope: ScopeId) -> EvalResult<Flow> {
        loop {
            self.meter.tick()?;
            if !self.eval_expr(&while_stmt.condition, scope)?.as_bool()? {
                return Ok(Flow::Normal(Value::Unit));
            }
            let inner = self.scopes.child(scope);
            if let flow @ Flow::Return(_) = self.exec_block(&while_stmt.body, inner)? {
                return Ok(flow);
            }
        }
    }

    fn exec_for(&mut self, for_stmt: &ForStmt, scope: ScopeId) -> EvalResult<Flow> {
        // Range literals are walked without building the list.
        if let ExprKind::Range(range) = &for_stmt.iterable.kind {
            self.meter.tick()?;
            let steps = self.eval_range(range, scope)?;
            for item in steps {
                if let flow @ Flow::Return(_) =
                    self.exec_for_body(for_stmt, Value::Number(item), scope)?
                {
                    return Ok(flow);
                }
            }
            return Ok(Flow::Normal(Value::Unit));
        }

        let items = match self.eval_expr(&for_stmt.iterable, scope)? {
            Value::List(items) => items.borrow().clone(),
            Value::Map(map) => map.borrow().keys(),
            other => {
                return Err(EvalError::TypeMismatch(format!(
                    "cannot iterate over {}",
                    other.type_name()
                )))
            }
        };
        for item in items {
            if let flow @ Flow::Return(_) = self.exec_for_body(for_stmt, item, scope)? {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal(Value::Unit))
    }

    fn exec_for_body(
        &mut self,
        for_stmt: &ForStmt,
        item: Value,
        scope: ScopeId,
    ) -> EvalResult<Flow> {
        self.meter.tick()?;
        let inner = self.scopes.child(scope);
        self.scopes.define(inner, &for_stmt.item.name, item, false);
        self.exec_block(&for_stmt.body, inner)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Calls
    // ══════════════════════════════════════════════════════════════════════

    fn apply(&mut self, callee: Value, args: Vec<Value>) -> EvalResult<Value> {
        match callee {
            Value::Closure(closure) => self.call_closure(&closure, args),
            other => Err(EvalError::TypeMismatch(format!(
                "cannot call a {}",
                other.type_name()
            ))),
        }
    }

    /// Call a closure with positional arguments.
    pub fn call_closure(&mut self, closure: &Closure, args: Vec<Value>) -> EvalResult<Value> {
        self.call_function(&closure.function, closure.scope, args)
    }

    /// Call `function` with positional arguments. `captured` becomes the
    /// parent of the call scope.
    pub fn call_function(
        &mut self,
        function: &Arc<Function>,
        captured: ScopeId,
        args: Vec<Value>,
    ) -> EvalResult<Value> {
        if args.len() > function.params.len() {
            return Err(EvalError::TypeMismatch(format!(
                "{} takes {} argument(s), got {}",
                function.display_name(),
                function.params.len(),
                args.len()
            )));
        }
        let mut slots: Vec<Option<Value>> = args.into_iter().map(Some).collect();
        slots.resize(function.params.len(), None);
        self.invoke(function, captured, slots)
    }

    /// Call `function` binding parameters by name.
    pub fn call_with_bindings(
        &mut self,
        function: &Arc<Function>,
        captured: ScopeId,
        bindings: &BTreeMap<String, Value>,
    ) -> EvalResult<Value> {
        if let Some(unknown) = bindings
            .keys()
            .find(|name| !function.params.iter().any(|p| &p.name.name == *name))
        {
            return Err(EvalError::NameNotFound(unknown.clone()));
        }
        let slots = function
            .params
            .iter()
            .map(|p| bindings.get(&p.name.name).cloned())
            .collect();
        self.invoke(function, captured, slots)
    }

    fn invoke(
        &mut self,
        function: &Arc<Function>,
        captured: ScopeId,
        slots: Vec<Option<Value>>,
    ) -> EvalResult<Value> {
        self.meter.enter_call()?;
        let result = ensure_sufficient_stack(|| self.run_body(function, captured, slots));
        self.meter.exit_call();
        result
    }

    fn run_body(
        &mut self,
        function: &Function,
        captured: ScopeId,
        slots: Vec<Option<Value>>,
    ) -> EvalResult<Value> {
        let call_scope = self.scopes.child(captured);
        for (param, slot) in function.params.iter().zip(slots) {
            let value = match (slot, &param.default) {
                (Some(value), _) => value,
                (None, Some(default)) => self.eval_expr(default, captured)?,
                (None, None) => {
                    return Err(EvalError::TypeMismatch(format!(
                        "missing argument '{}' for {}",
                        param.name.name,
                        function.display_name()
                    )))
                }
            };
            self.scopes.define(call_scope, &param.name.name, value, false);
        }
        Ok(self.exec_block(&function.body, call_scope)?.into_value())
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn closure(function: Arc<Function>, scope: ScopeId) -> Value {
    Value::Closure(Rc::new(Closure { function, scope }))
}

/// Lazily computed `start + i * step` sequence.
struct RangeSteps {
    start: f64,
    end: f64,
    step: f64,
    inclusive: bool,
    next: u64,
}

impl Iterator for RangeSteps {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        let value = self.start + self.next as f64 * self.step;
        let in_range = match (self.step > 0.0, self.inclusive) {
            (true, true) => value <= self.end,
            (true, false) => value < self.end,
            (false, true) => value >= self.end,
            (false, false) => value > self.end,
        };
        if !in_range {
            return None;
        }
        self.next += 1;
        Some(value)
    }
}

fn index(target: &Value, key: &Value) -> EvalResult<Value> {
    match target {
        Value::List(items) => {
            let items = items.borrow();
            let i = list_index(key, items.len(), false)?;
            Ok(items[i].clone())
        }
        Value::Map(map) => map
            .borrow()
            .get(key)
            .cloned()
            .ok_or_else(|| EvalError::KeyNotFound(key.to_string())),
        other => Err(EvalError::TypeMismatch(format!(
            "cannot index into {}",
            other.type_name()
        ))),
    }
}

/// Check `key` is an integral index into a list of `len` elements. With
/// `append`, `len` itself is accepted too.
fn list_index(key: &Value, len: usize, append: bool) -> EvalResult<usize> {
    let index = key.as_number()?;
    let bound = if append { len + 1 } else { len };
    if index.fract() != 0.0 || index < 0.0 || index >= bound as f64 {
        return Err(EvalError::IndexOutOfBounds { index, len });
    }
    Ok(index as usize)
}

fn arith(lv: &Value, rv: &Value, op: BinOp, f: fn(f64, f64) -> f64) -> EvalResult<Value> {
    match (lv, rv) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(f(*a, *b))),
        _ => Err(operand_mismatch(lv, rv, op)),
    }
}

fn compare(lv: &Value, rv: &Value, op: BinOp, f: fn(f64, f64) -> bool) -> EvalResult<Value> {
    match (lv, rv) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(f(*a, *b))),
        _ => Err(operand_mismatch(lv, rv, op)),
    }
}

fn operand_mismatch(lv: &Value, rv: &Value, op: BinOp) -> EvalError {
    EvalError::TypeMismatch(format!(
        "cannot apply '{}' to {} and {}",
        op.as_str(),
        lv.type_name(),
        rv.type_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps(start: f64, end: f64, step: f64, inclusive: bool) -> Vec<f64> {
        RangeSteps {
            start,
            end,
            step,
            inclusive,
            next: 0,
        }
        .collect()
    }

    #[test]
    fn test_range_steps() {
        assert_eq!(steps(1.0, 5.0, 1.0, false), [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(steps(1.0, 5.0, 1.0, true), [1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(steps(0.0, 1.0, 0.25, true), [0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(steps(3.0, 0.0, -1.0, false), [3.0, 2.0, 1.0]);
        assert!(steps(5.0, 1.0, 1.0, true).is_empty());
        assert!(steps(0.0, f64::NAN, 1.0, true).is_empty());
    }

    #[test]
    fn test_list_index_bounds() {
        assert_eq!(list_index(&Value::Number(1.0), 2, false), Ok(1));
        assert_eq!(list_index(&Value::Number(2.0), 2, true), Ok(2));
        assert_eq!(
            list_index(&Value::Number(2.0), 2, false),
            Err(EvalError::IndexOutOfBounds { index: 2.0, len: 2 })
        );
        assert!(matches!(
            list_index(&Value::Number(0.5), 2, false),
            Err(EvalError::IndexOutOfBounds { .. })
        ));
        assert!(matches!(
            list_index(&Value::Bool(true), 2, false),
            Err(EvalError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_operator_type_errors() {
        let err = arith(&Value::Bool(true), &Value::Number(1.0), BinOp::Add, |a, b| a + b)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "type mismatch: cannot apply '+' to bool and number"
        );
    }
}
