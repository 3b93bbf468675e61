//! GenLang tree-walking evaluator.
//!
//! Executes parsed programs directly from the AST under an
//! [`ExecutionBudget`], calling out to host functions registered in a
//! [`BuiltinRegistry`].

pub mod budget;
pub mod builtins;
pub mod env;
pub mod error;
pub mod evaluator;
pub mod interpreter;
mod stack;
pub mod value;

pub use budget::{ExecutionBudget, Meter};
pub use builtins::{BuiltinFn, BuiltinRegistry};
pub use env::{AssignError, ScopeId, Scopes};
pub use error::{EvalError, EvalResult, Resource};
pub use evaluator::{Evaluator, Flow};
pub use interpreter::Interpreter;
pub use value::{Closure, MapValue, Value};
