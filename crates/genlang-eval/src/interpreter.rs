//! Entry point for running a parsed program.

use std::collections::BTreeMap;
use std::sync::Arc;

use genlang_types::ast::{Function, Program};

use crate::budget::ExecutionBudget;
use crate::builtins::BuiltinRegistry;
use crate::error::{EvalError, EvalResult};
use crate::evaluator::Evaluator;
use crate::value::Value;

/// Runs functions of one program against a builtin registry.
///
/// Every call gets a fresh [`Evaluator`]: new global scope, new budget. A
/// call that failed can simply be retried.
#[derive(Debug, Clone)]
pub struct Interpreter {
    program: Arc<Program>,
    builtins: Arc<BuiltinRegistry>,
    budget: ExecutionBudget,
}

impl Interpreter {
    pub fn new(
        program: Arc<Program>,
        builtins: Arc<BuiltinRegistry>,
        budget: ExecutionBudget,
    ) -> Self {
        Self {
            program,
            builtins,
            budget,
        }
    }

    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    pub fn budget(&self) -> &ExecutionBudget {
        &self.budget
    }

    /// Call the top-level function `function`, binding parameters by name.
    #[tracing::instrument(level = "debug", skip(self, bindings))]
    pub fn run(&self, function: &str, bindings: &BTreeMap<String, Value>) -> EvalResult<Value> {
        let target = self
            .program
            .function(function)
            .cloned()
            .ok_or_else(|| EvalError::NameNotFound(function.to_string()))?;
        tracing::debug!(
            max_instructions = self.budget.max_instructions,
            max_call_depth = self.budget.max_call_depth,
            "running"
        );
        self.call(&target, bindings)
    }

    /// Call any function node of the program, named or anonymous, after
    /// evaluating the global definitions.
    pub fn call(
        &self,
        function: &Arc<Function>,
        bindings: &BTreeMap<String, Value>,
    ) -> EvalResult<Value> {
        let mut evaluator = Evaluator::new(Arc::clone(&self.builtins), self.budget);
        evaluator.set_program(Arc::clone(&self.program));
        let result = evaluator.define_globals().and_then(|()| {
            let globals = evaluator.globals();
            evaluator.call_with_bindings(function, globals, bindings)
        });
        if let Err(err @ EvalError::ResourceExceeded { .. }) = &result {
            tracing::warn!(
                function = function.display_name(),
                used = evaluator.meter().used(),
                "{err}"
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use genlang_parser::parse_source;

    use super::*;

    #[test]
    fn test_unknown_function() {
        let program = parse_source("t.gen", "fun num f() = 1").unwrap();
        let interpreter = Interpreter::new(
            Arc::new(program),
            Arc::new(BuiltinRegistry::new()),
            ExecutionBudget::default(),
        );
        assert_eq!(
            interpreter.run("g", &BTreeMap::new()),
            Err(EvalError::NameNotFound("g".into()))
        );
        assert_eq!(interpreter.run("f", &BTreeMap::new()), Ok(Value::Number(1.0)));
    }
}
