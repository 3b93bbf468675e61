//! Lexical scopes.
//!
//! All scopes of one evaluation live in a [`Scopes`] arena and refer to
//! their parent by [`ScopeId`]. Closures hold a `ScopeId` as well, so a
//! closure stored in the scope it captured is not an ownership cycle: every
//! scope is released together when the arena is dropped at the end of the
//! evaluation.

use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use genlang_types::ast::Function;

use crate::value::{Closure, Value};

/// Index of a scope in its [`Scopes`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

/// What a name is bound to.
#[derive(Debug, Clone)]
enum Binding {
    Value { value: Value, constant: bool },
    /// A function defined in this scope. Turned into a closure over the
    /// scope on lookup.
    Function(Arc<Function>),
}

#[derive(Debug)]
struct Frame {
    bindings: BTreeMap<String, Binding>,
    parent: Option<ScopeId>,
}

/// Why an assignment was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignError {
    /// No scope in the chain binds the name.
    Undefined,
    /// The nearest binding is a constant.
    Constant,
}

/// Arena owning every scope of one evaluation.
#[derive(Debug, Default)]
pub struct Scopes {
    frames: Vec<Frame>,
}

impl Scopes {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new scope without parent.
    pub fn root(&mut self) -> ScopeId {
        self.alloc(None)
    }

    /// A new scope nested in `parent`.
    pub fn child(&mut self, parent: ScopeId) -> ScopeId {
        self.alloc(Some(parent))
    }

    fn alloc(&mut self, parent: Option<ScopeId>) -> ScopeId {
        self.frames.push(Frame {
            bindings: BTreeMap::new(),
            parent,
        });
        ScopeId(self.frames.len() - 1)
    }

    /// Bind `name` in `scope`, shadowing any outer binding.
    pub fn define(&mut self, scope: ScopeId, name: &str, value: Value, constant: bool) {
        if let Some(frame) = self.frames.get_mut(scope.0) {
            frame
                .bindings
                .insert(name.to_string(), Binding::Value { value, constant });
        }
    }

    /// Bind a named function in `scope`.
    pub fn define_function(&mut self, scope: ScopeId, function: Arc<Function>) {
        if let Some(frame) = self.frames.get_mut(scope.0) {
            let name = function.display_name().to_string();
            frame.bindings.insert(name, Binding::Function(function));
        }
    }

    /// Look `name` up, innermost scope first.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<Value> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let frame = self.frames.get(id.0)?;
            if let Some(binding) = frame.bindings.get(name) {
                return Some(match binding {
                    Binding::Value { value, .. } => value.clone(),
                    Binding::Function(function) => Value::Closure(Rc::new(Closure {
                        function: Arc::clone(function),
                        scope: id,
                    })),
                });
            }
            current = frame.parent;
        }
        None
    }

    /// Update the nearest binding of `name`.
    pub fn assign(&mut self, scope: ScopeId, name: &str, value: Value) -> Result<(), AssignError> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let Some(frame) = self.frames.get_mut(id.0) else {
                break;
            };
            if let Some(binding) = frame.bindings.get_mut(name) {
                if let Binding::Value { constant: true, .. } = binding {
                    return Err(AssignError::Constant);
                }
                *binding = Binding::Value {
                    value,
                    constant: false,
                };
                return Ok(());
            }
            current = frame.parent;
        }
        Err(AssignError::Undefined)
    }
}

#[cfg(test)]
mod tests {
    use genlang_types::ast::{Block, Ident, TypeRef};
    use genlang_types::Span;

    use super::*;

    fn function(name: &str) -> Arc<Function> {
        Arc::new(Function {
            name: Some(Ident::new(name, Span::point(1, 1))),
            result: TypeRef::new("num", Span::point(1, 1)),
            params: Vec::new(),
            body: Block {
                stmts: Vec::new(),
                span: Span::point(1, 1),
            },
            span: Span::point(1, 1),
        })
    }

    #[test]
    fn test_inner_scope_shadows_outer() {
        let mut scopes = Scopes::new();
        let root = scopes.root();
        scopes.define(root, "x", Value::Number(1.0), false);
        let inner = scopes.child(root);
        scopes.define(inner, "x", Value::Number(2.0), false);
        assert_eq!(scopes.lookup(inner, "x"), Some(Value::Number(2.0)));
        assert_eq!(scopes.lookup(root, "x"), Some(Value::Number(1.0)));
        assert_eq!(scopes.lookup(inner, "missing"), None);
    }

    #[test]
    fn test_assign_updates_nearest_binding() {
        let mut scopes = Scopes::new();
        let root = scopes.root();
        scopes.define(root, "x", Value::Number(1.0), false);
        let inner = scopes.child(root);
        scopes.assign(inner, "x", Value::Number(5.0)).unwrap();
        assert_eq!(scopes.lookup(root, "x"), Some(Value::Number(5.0)));
        // No binding was created in the inner scope.
        scopes.define(root, "x", Value::Number(6.0), false);
        assert_eq!(scopes.lookup(inner, "x"), Some(Value::Number(6.0)));
    }

    #[test]
    fn test_assign_errors() {
        let mut scopes = Scopes::new();
        let root = scopes.root();
        scopes.define(root, "k", Value::Number(1.0), true);
        assert_eq!(scopes.assign(root, "k", Value::Unit), Err(AssignError::Constant));
        assert_eq!(scopes.assign(root, "nope", Value::Unit), Err(AssignError::Undefined));
    }

    #[test]
    fn test_function_binding_becomes_closure_over_its_scope() {
        let mut scopes = Scopes::new();
        let root = scopes.root();
        let inner = scopes.child(root);
        scopes.define_function(inner, function("f"));
        let deeper = scopes.child(inner);
        match scopes.lookup(deeper, "f") {
            Some(Value::Closure(closure)) => {
                assert_eq!(closure.scope, inner);
                assert_eq!(closure.function.display_name(), "f");
            }
            other => panic!("expected closure, got {other:?}"),
        }
    }

    #[test]
    fn test_closure_stored_in_its_own_scope_is_released_with_the_arena() {
        let f = function("f");
        let mut scopes = Scopes::new();
        let root = scopes.root();
        let closure = Value::Closure(Rc::new(Closure {
            function: Arc::clone(&f),
            scope: root,
        }));
        scopes.define(root, "self_ref", closure, false);
        assert_eq!(Arc::strong_count(&f), 2);
        drop(scopes);
        assert_eq!(Arc::strong_count(&f), 1);
    }
}
