//! Host-provided builtin functions.
//!
//! The registry is filled by the host before evaluation starts and is only
//! read afterwards, so one `Arc<BuiltinRegistry>` can serve any number of
//! evaluations.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{EvalError, EvalResult};
use crate::value::Value;

/// A builtin function. Receives evaluated arguments in call order.
pub type BuiltinFn = Arc<dyn Fn(Vec<Value>) -> EvalResult<Value> + Send + Sync>;

/// Name → builtin table.
#[derive(Clone, Default)]
pub struct BuiltinRegistry {
    functions: BTreeMap<String, BuiltinFn>,
}

impl BuiltinRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `function` under `name`, replacing any earlier entry.
    pub fn register<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(Vec<Value>) -> EvalResult<Value> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(function));
    }

    /// Builder form of [`BuiltinRegistry::register`].
    pub fn with<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(Vec<Value>) -> EvalResult<Value> + Send + Sync + 'static,
    {
        self.register(name, function);
        self
    }

    pub fn get(&self, name: &str) -> Option<&BuiltinFn> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    /// The standard library: math, collection helpers and `print`.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for (name, op) in [
            ("abs", f64::abs as fn(f64) -> f64),
            ("sin", f64::sin),
            ("cos", f64::cos),
            ("tan", f64::tan),
            ("floor", f64::floor),
            ("ceil", f64::ceil),
            ("round", f64::round),
        ] {
            registry.register(name, move |args| {
                let [x] = numbers::<1>(name, &args)?;
                Ok(Value::Number(op(x)))
            });
        }
        registry.register("sqrt", |args| {
            let [x] = numbers::<1>("sqrt", &args)?;
            if x < 0.0 {
                return Err(EvalError::builtin("sqrt", format!("negative input {x}")));
            }
            Ok(Value::Number(x.sqrt()))
        });
        registry.register("min", |args| fold_numbers("min", &args, f64::min));
        registry.register("max", |args| fold_numbers("max", &args, f64::max));
        registry.register("len", |args| {
            let [collection] = exactly::<1>("len", args)?;
            let len = match &collection {
                Value::List(items) => items.borrow().len(),
                Value::Map(map) => map.borrow().len(),
                other => {
                    return Err(EvalError::TypeMismatch(format!(
                        "len expects a list or map, got {}",
                        other.type_name()
                    )))
                }
            };
            Ok(Value::Number(len as f64))
        });
        registry.register("push", |args| {
            let [list, item] = exactly::<2>("push", args)?;
            match &list {
                Value::List(items) => items.borrow_mut().push(item),
                other => {
                    return Err(EvalError::TypeMismatch(format!(
                        "push expects a list, got {}",
                        other.type_name()
                    )))
                }
            }
            Ok(list)
        });
        registry.register("keys", |args| {
            let [map] = exactly::<1>("keys", args)?;
            match &map {
                Value::Map(map) => Ok(Value::list(map.borrow().keys())),
                other => Err(EvalError::TypeMismatch(format!(
                    "keys expects a map, got {}",
                    other.type_name()
                ))),
            }
        });
        registry.register("print", |args| {
            let text = args
                .iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            tracing::info!(target: "genlang::print", "{text}");
            Ok(Value::Unit)
        });
        registry
    }
}

impl fmt::Debug for BuiltinRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltinRegistry")
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ── Argument helpers ──────────────────────────────────────────────────────────

/// Take exactly `N` arguments.
pub fn exactly<const N: usize>(name: &str, args: Vec<Value>) -> EvalResult<[Value; N]> {
    let count = args.len();
    args.try_into().map_err(|_| {
        EvalError::TypeMismatch(format!("{name} expects {N} argument(s), got {count}"))
    })
}

/// Take exactly `N` numeric arguments.
pub fn numbers<const N: usize>(name: &str, args: &[Value]) -> EvalResult<[f64; N]> {
    if args.len() != N {
        return Err(EvalError::TypeMismatch(format!(
            "{name} expects {N} argument(s), got {}",
            args.len()
        )));
    }
    let mut out = [0.0; N];
    for (slot, arg) in out.iter_mut().zip(args) {
        *slot = arg.as_number()?;
    }
    Ok(out)
}

fn fold_numbers(name: &str, args: &[Value], op: fn(f64, f64) -> f64) -> EvalResult<Value> {
    let mut iter = args.iter();
    let first = iter
        .next()
        .ok_or_else(|| EvalError::TypeMismatch(format!("{name} expects at least one argument")))?
        .as_number()?;
    iter.try_fold(first, |acc, v| Ok(op(acc, v.as_number()?)))
        .map(Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: Vec<Value>) -> EvalResult<Value> {
        let registry = BuiltinRegistry::standard();
        let f = registry.get(name).expect("builtin registered");
        f(args)
    }

    #[test]
    fn test_standard_names() {
        let registry = BuiltinRegistry::standard();
        for name in [
            "abs", "sqrt", "sin", "cos", "tan", "floor", "ceil", "round", "min", "max", "len",
            "push", "keys", "print",
        ] {
            assert!(registry.contains(name), "{name} missing");
        }
    }

    #[test]
    fn test_math() {
        assert_eq!(call("abs", vec![Value::Number(-2.0)]), Ok(Value::Number(2.0)));
        assert_eq!(call("sqrt", vec![Value::Number(9.0)]), Ok(Value::Number(3.0)));
        assert_eq!(call("floor", vec![Value::Number(1.7)]), Ok(Value::Number(1.0)));
        assert_eq!(
            call("max", vec![Value::Number(1.0), Value::Number(4.0), Value::Number(2.0)]),
            Ok(Value::Number(4.0))
        );
        assert!(matches!(
            call("sqrt", vec![Value::Number(-1.0)]),
            Err(EvalError::Builtin { .. })
        ));
        assert!(matches!(call("abs", vec![]), Err(EvalError::TypeMismatch(_))));
        assert!(matches!(call("min", vec![]), Err(EvalError::TypeMismatch(_))));
    }

    #[test]
    fn test_push_mutates_in_place() {
        let list = Value::list(vec![]);
        let returned = call("push", vec![list.clone(), Value::Number(1.0)]).unwrap();
        assert_eq!(list.to_string(), "[1]");
        assert_eq!(returned, list);
    }

    #[test]
    fn test_builder_registration() {
        let registry = BuiltinRegistry::new().with("answer", |_| Ok(Value::Number(42.0)));
        assert_eq!(registry.names().collect::<Vec<_>>(), ["answer"]);
        let f = registry.get("answer").unwrap();
        assert_eq!(f(vec![]), Ok(Value::Number(42.0)));
    }
}
