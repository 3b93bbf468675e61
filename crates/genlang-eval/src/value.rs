//! Runtime values.
//!
//! Lists and maps are mutable and shared by reference: copying a value
//! copies the handle, so an update through one name is visible through
//! every other name for the same collection.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use genlang_types::ast::Function;

use crate::env::ScopeId;
use crate::error::{EvalError, EvalResult};

/// A GenLang runtime value.
///
/// Lists and maps may contain themselves. Equality and formatting stop at
/// a collection already being visited.
#[derive(Clone)]
pub enum Value {
    Number(f64),
    Bool(bool),
    /// Result of statements and blocks that produce nothing.
    Unit,
    List(Rc<RefCell<Vec<Value>>>),
    Map(Rc<RefCell<MapValue>>),
    Closure(Rc<Closure>),
}

impl Value {
    /// A new list value.
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    /// A new map value.
    pub fn map(map: MapValue) -> Self {
        Value::Map(Rc::new(RefCell::new(map)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Bool(_) => "bool",
            Value::Unit => "unit",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Closure(_) => "function",
        }
    }

    pub fn as_number(&self) -> EvalResult<f64> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(EvalError::TypeMismatch(format!(
                "expected number, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn as_bool(&self) -> EvalResult<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(EvalError::TypeMismatch(format!(
                "expected bool, got {}",
                other.type_name()
            ))),
        }
    }

    /// Deep structural equality. NaN != NaN. Closures compare by identity.
    pub fn structural_eq(&self, other: &Value) -> bool {
        self.eq_visiting(other, &mut Vec::new())
    }

    /// `visiting` holds the collection pairs currently being compared. A
    /// pair met again is assumed equal; any real difference is found on the
    /// outer comparison.
    fn eq_visiting(&self, other: &Value, visiting: &mut Vec<(usize, usize)>) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Unit, Value::Unit) => true,
            (Value::List(a), Value::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let pair = (Rc::as_ptr(a) as usize, Rc::as_ptr(b) as usize);
                if visiting.contains(&pair) {
                    return true;
                }
                visiting.push(pair);
                let (a, b) = (a.borrow(), b.borrow());
                let equal = a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|(x, y)| x.eq_visiting(y, visiting));
                visiting.pop();
                equal
            }
            (Value::Map(a), Value::Map(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let pair = (Rc::as_ptr(a) as usize, Rc::as_ptr(b) as usize);
                if visiting.contains(&pair) {
                    return true;
                }
                visiting.push(pair);
                let (a, b) = (a.borrow(), b.borrow());
                let equal = a.len() == b.len()
                    && a.iter().all(|(k, v)| {
                        b.get(k).is_some_and(|other| v.eq_visiting(other, visiting))
                    });
                visiting.pop();
                equal
            }
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Address of the shared collection, if this is one.
    fn collection_ptr(&self) -> Option<usize> {
        match self {
            Value::List(items) => Some(Rc::as_ptr(items) as usize),
            Value::Map(map) => Some(Rc::as_ptr(map) as usize),
            _ => None,
        }
    }

    fn fmt_visiting(&self, f: &mut fmt::Formatter<'_>, visiting: &mut Vec<usize>) -> fmt::Result {
        if let Some(ptr) = self.collection_ptr() {
            if visiting.contains(&ptr) {
                return f.write_str("[...]");
            }
            visiting.push(ptr);
        }
        let result = match self {
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            Value::Bool(b) => write!(f, "{b}"),
            Value::Unit => f.write_str("unit"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt_visiting(f, visiting)?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                let map = map.borrow();
                if map.is_empty() {
                    f.write_str("[:]")
                } else {
                    f.write_str("[")?;
                    for (i, (k, v)) in map.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        k.fmt_visiting(f, visiting)?;
                        f.write_str(": ")?;
                        v.fmt_visiting(f, visiting)?;
                    }
                    f.write_str("]")
                }
            }
            Value::Closure(closure) => write!(f, "<fun {}>", closure.function.display_name()),
        };
        if self.collection_ptr().is_some() {
            visiting.pop();
        }
        result
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.structural_eq(other)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::list(items)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_visiting(f, &mut Vec::new())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "Number({n:?})"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Unit => f.write_str("Unit"),
            Value::List(_) => write!(f, "List({self})"),
            Value::Map(_) => write!(f, "Map({self})"),
            Value::Closure(closure) => write!(f, "Closure({closure:?})"),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Maps
// ══════════════════════════════════════════════════════════════════════════════

/// Insertion-ordered map with structural key equality.
///
/// Keys are compared with [`Value::structural_eq`]. Inserting an existing
/// key replaces its value and keeps its original position.
#[derive(Debug, Clone, Default)]
pub struct MapValue {
    entries: Vec<(Value, Value)>,
}

impl MapValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k.structural_eq(key))
            .map(|(_, v)| v)
    }

    pub fn insert(&mut self, key: Value, value: Value) {
        match self.entries.iter_mut().find(|(k, _)| k.structural_eq(&key)) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> Vec<Value> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

impl FromIterator<(Value, Value)> for MapValue {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        let mut map = MapValue::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Closures
// ══════════════════════════════════════════════════════════════════════════════

/// A function paired with the scope it was created in.
pub struct Closure {
    pub function: Arc<Function>,
    /// Scope the function was created in.
    pub scope: ScopeId,
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fun {}>", self.function.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(x: f64) -> Value {
        Value::Number(x)
    }

    #[test]
    fn test_display() {
        assert_eq!(n(3.0).to_string(), "3");
        assert_eq!(n(2.5).to_string(), "2.5");
        assert_eq!(n(-4.0).to_string(), "-4");
        assert_eq!(Value::list(vec![n(1.0), n(2.0)]).to_string(), "[1, 2]");
        assert_eq!(Value::map(MapValue::new()).to_string(), "[:]");
        let map: MapValue = [(n(1.0), Value::Bool(true))].into_iter().collect();
        assert_eq!(Value::map(map).to_string(), "[1: true]");
        assert_eq!(Value::Unit.to_string(), "unit");
    }

    #[test]
    fn test_nan_is_not_equal_to_itself() {
        assert_ne!(n(f64::NAN), n(f64::NAN));
        assert_eq!(n(1.0), n(1.0));
        assert_ne!(n(1.0), Value::Bool(true));
    }

    #[test]
    fn test_lists_compare_structurally() {
        let a = Value::list(vec![n(1.0), Value::list(vec![n(2.0)])]);
        let b = Value::list(vec![n(1.0), Value::list(vec![n(2.0)])]);
        assert_eq!(a, b);
        assert_ne!(a, Value::list(vec![n(1.0)]));
    }

    #[test]
    fn test_lists_are_shared_by_reference() {
        let a = Value::list(vec![]);
        let b = a.clone();
        if let Value::List(items) = &b {
            items.borrow_mut().push(n(7.0));
        }
        assert_eq!(a.to_string(), "[7]");
    }

    #[test]
    fn test_map_duplicate_key_keeps_first_position() {
        let mut map = MapValue::new();
        map.insert(n(1.0), n(10.0));
        map.insert(n(2.0), n(20.0));
        map.insert(n(1.0), n(11.0));
        assert_eq!(map.len(), 2);
        assert_eq!(map.keys(), vec![n(1.0), n(2.0)]);
        assert_eq!(map.get(&n(1.0)), Some(&n(11.0)));
    }

    #[test]
    fn test_map_keys_are_structural() {
        let mut map = MapValue::new();
        map.insert(Value::list(vec![n(1.0)]), n(5.0));
        assert_eq!(map.get(&Value::list(vec![n(1.0)])), Some(&n(5.0)));
        assert_eq!(map.get(&n(1.0)), None);
    }

    #[test]
    fn test_self_containing_list_displays_marker() {
        let a = Value::list(vec![n(1.0)]);
        if let Value::List(items) = &a {
            items.borrow_mut().push(a.clone());
        }
        assert_eq!(a.to_string(), "[1, [...]]");
        assert_eq!(format!("{a:?}"), "List([1, [...]])");
        if let Value::List(items) = &a {
            items.borrow_mut().clear();
        }
    }

    #[test]
    fn test_self_containing_map_displays_marker() {
        let m = Value::map(MapValue::new());
        if let Value::Map(map) = &m {
            map.borrow_mut().insert(n(1.0), m.clone());
        }
        assert_eq!(m.to_string(), "[1: [...]]");
        if let Value::Map(map) = &m {
            *map.borrow_mut() = MapValue::new();
        }
    }

    #[test]
    fn test_distinct_cyclic_lists_compare_equal() {
        let cyclic = || {
            let a = Value::list(vec![n(0.0)]);
            if let Value::List(items) = &a {
                items.borrow_mut()[0] = a.clone();
            }
            a
        };
        let (a, b) = (cyclic(), cyclic());
        assert_eq!(a, b);
        assert_ne!(a, Value::list(vec![n(0.0)]));
        for v in [a, b] {
            if let Value::List(items) = &v {
                items.borrow_mut().clear();
            }
        }
    }

    #[test]
    fn test_shared_sublist_is_not_a_cycle() {
        let inner = Value::list(vec![n(2.0)]);
        let outer = Value::list(vec![inner.clone(), inner]);
        assert_eq!(outer.to_string(), "[[2], [2]]");
    }

    #[test]
    fn test_conversions() {
        assert_eq!(Value::from(2.0).as_number(), Ok(2.0));
        assert!(Value::from(true).as_number().is_err());
        assert_eq!(Value::from(false).as_bool(), Ok(false));
        assert_eq!(Value::from(vec![n(1.0)]).type_name(), "list");
    }
}
