//! GenLang: parse geometry-generation scripts and run them under an
//! execution budget.
//!
//! ```text
//! GenLang Source → Parser → Program → Interpreter (+ host builtins) → Value
//! ```
//!
//! ```
//! use std::collections::BTreeMap;
//! use genlang::{Engine, Value};
//!
//! let engine = Engine::default();
//! let script = engine.compile("area.gen", "fun num area(num w, num h = 2) = w * h").unwrap();
//! let bindings = BTreeMap::from([("w".to_string(), Value::Number(3.0))]);
//! assert_eq!(engine.run(&script, "area", &bindings), Ok(Value::Number(6.0)));
//! ```

mod config;
mod engine;

pub use config::{ConfigError, GenLangConfig};
pub use engine::{Engine, Script};

pub use genlang_eval::{
    BuiltinRegistry, EvalError, EvalResult, ExecutionBudget, Resource, Value,
};
pub use genlang_parser::ParserConfig;
pub use genlang_types::{SyntaxError, SyntaxErrors};
