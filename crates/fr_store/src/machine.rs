//! Machine state: a single stack frame plus the store.

use std::collections::BTreeMap;

use fr_syntax::{Addr, FrError, LVal, PathElem, SemErrorKind, Span, Value};

use crate::store::Store;

/// Maps variable name to the address of its binding. The core language has
/// exactly one frame; it grows on `let` and shrinks when a block's bindings
/// are dropped.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    bindings: BTreeMap<String, Addr>,
}

impl Frame {
    pub fn new() -> Self {
        Frame::default()
    }

    /// `Bind(x, loc)`: extend the frame with `x ↦ loc`.
    pub fn bind(&mut self, name: impl Into<String>, addr: Addr) {
        self.bindings.insert(name.into(), addr);
    }

    pub fn lookup(&self, name: &str) -> Option<Addr> {
        self.bindings.get(name).copied()
    }

    pub fn unbind(&mut self, name: &str) {
        self.bindings.remove(name);
    }
}

/// The pair `(stack frame, store)` the reducer threads through every step.
#[derive(Debug, Clone, Default)]
pub struct MachineState {
    pub frame: Frame,
    pub store: Store,
}

impl MachineState {
    pub fn new() -> Self {
        MachineState {
            frame: Frame::new(),
            store: Store::new(),
        }
    }

    /// Resolve an l-value to the address of the storage location it denotes:
    /// look up the root variable's binding, then follow the path, reading a
    /// `Location` through each `Deref` and projecting through each `Field`
    /// (tuple fields live inline in their parent's cell, so projecting a
    /// field address requires the parent cell to itself be addressable,
    /// which in this store model means only whole-variable or
    /// whole-dereference paths name a cell directly; field projections are
    /// resolved by `resolve_value` instead when the target is read, and by
    /// `write_field` when it is a write).
    pub fn resolve_addr(&self, lv: &LVal, span: Span) -> Result<Addr, FrError> {
        let mut addr = self.frame.lookup(&lv.var).ok_or_else(|| {
            FrError::semantics(
                span,
                SemErrorKind::Stuck,
                format!("no binding for `{}`", lv.var),
            )
        })?;
        for elem in lv.path.elems() {
            match elem {
                PathElem::Deref => {
                    addr = self.store.read(addr, span)?.as_location().ok_or_else(|| {
                        FrError::semantics(span, SemErrorKind::Stuck, "dereferenced a non-location value")
                    })?;
                }
                PathElem::Field(_) => {
                    // Field projections do not change which cell is
                    // addressed (tuples are stored as a single value in one
                    // cell); they are resolved against the cell's value by
                    // the caller. Keep walking past them.
                }
            }
        }
        Ok(addr)
    }

    /// Read the value denoted by `lv`, projecting through any trailing field
    /// accesses against the cell reached by [`resolve_addr`].
    pub fn read_lval(&self, lv: &LVal, span: Span) -> Result<Value, FrError> {
        let addr = self.resolve_addr(lv, span)?;
        let mut value = self.store.read(addr, span)?.clone();
        for elem in trailing_fields(lv) {
            value = value
                .field(elem)
                .cloned()
                .ok_or_else(|| FrError::semantics(span, SemErrorKind::Stuck, "field projection on non-tuple"))?;
        }
        Ok(value)
    }

    /// Move the value denoted by `lv` out of the store: whole-variable (or
    /// pure-deref) paths empty the cell outright; a trailing field path
    /// leaves `Value::Unit` behind in the moved-from slot so the rest of the
    /// tuple stays addressable. The borrow checker guarantees the moved-from
    /// slot is never read again, so `Unit` is just a placeholder that keeps
    /// the store's shape intact for `finalize`/`drop_lifetime`.
    pub fn move_lval(&mut self, lv: &LVal, span: Span) -> Result<Value, FrError> {
        log::trace!("moving `{lv}`");
        let addr = self.resolve_addr(lv, span)?;
        let fields = trailing_fields(lv);
        if fields.is_empty() {
            return self.store.take(addr, span);
        }
        let whole = self.store.read(addr, span)?.clone();
        let (extracted, residual) = take_nested(whole, &fields).ok_or_else(|| {
            FrError::semantics(span, SemErrorKind::Stuck, "field projection on non-tuple")
        })?;
        self.store.write(addr, residual, span)?;
        Ok(extracted)
    }
}

/// Recursively extract the value at the path of field indices `fields` out
/// of `value`, returning `(extracted, value-with-that-slot-set-to-Unit)`.
fn take_nested(value: Value, fields: &[usize]) -> Option<(Value, Value)> {
    let (first, rest) = fields.split_first()?;
    match value {
        Value::Tuple(mut items) => {
            let slot = items.get(*first)?.clone();
            if rest.is_empty() {
                items[*first] = Value::Unit;
                Some((slot, Value::Tuple(items)))
            } else {
                let (extracted, residual) = take_nested(slot, rest)?;
                items[*first] = residual;
                Some((extracted, Value::Tuple(items)))
            }
        }
        _ => None,
    }
}

/// The suffix of trailing `Field` indices after the last `Deref` in `lv`'s
/// path (fields that apply to the value in the cell `resolve_addr` lands
/// on, rather than changing which cell is addressed).
fn trailing_fields(lv: &LVal) -> Vec<usize> {
    let elems = lv.path.elems();
    let last_deref = elems.iter().rposition(|e| matches!(e, PathElem::Deref));
    let start = last_deref.map(|i| i + 1).unwrap_or(0);
    elems[start..]
        .iter()
        .map(|e| match e {
            PathElem::Field(i) => *i,
            PathElem::Deref => unreachable!("filtered out by `start`"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fr_syntax::{LifetimeArena, Path, PathElem};

    #[test]
    fn resolve_addr_follows_deref() {
        let mut arena = LifetimeArena::new();
        let root = arena.root();
        let mut state = MachineState::new();
        let payload = state.store.allocate(root, Value::Int(7));
        let ptr = state.store.allocate(root, Value::borrow(payload));
        state.frame.bind("y", ptr);
        let lv = LVal::new("y", Path::from_elems([PathElem::Deref]));
        assert_eq!(state.resolve_addr(&lv, Span::DUMMY).unwrap(), payload);
    }

    #[test]
    fn move_lval_empties_whole_variable_cell() {
        let mut arena = LifetimeArena::new();
        let root = arena.root();
        let mut state = MachineState::new();
        let addr = state.store.allocate(root, Value::Int(9));
        state.frame.bind("x", addr);
        let moved = state.move_lval(&LVal::var("x"), Span::DUMMY).unwrap();
        assert_eq!(moved, Value::Int(9));
        assert!(state.store.is_empty_cell(addr));
    }

    #[test]
    fn move_lval_leaves_unit_in_moved_tuple_slot() {
        let mut arena = LifetimeArena::new();
        let root = arena.root();
        let mut state = MachineState::new();
        let addr = state
            .store
            .allocate(root, Value::Tuple(vec![Value::Int(1), Value::Int(2)]));
        state.frame.bind("p", addr);
        let lv = LVal::var("p").field(0);
        let moved = state.move_lval(&lv, Span::DUMMY).unwrap();
        assert_eq!(moved, Value::Int(1));
        assert_eq!(
            state.store.read(addr, Span::DUMMY).unwrap(),
            &Value::Tuple(vec![Value::Unit, Value::Int(2)])
        );
    }

    #[test]
    fn read_lval_projects_tuple_field() {
        let mut arena = LifetimeArena::new();
        let root = arena.root();
        let mut state = MachineState::new();
        let tup = state
            .store
            .allocate(root, Value::Tuple(vec![Value::Int(1), Value::Int(2)]));
        state.frame.bind("x", tup);
        let lv = LVal::var("x").field(1);
        assert_eq!(state.read_lval(&lv, Span::DUMMY).unwrap(), Value::Int(2));
    }
}
