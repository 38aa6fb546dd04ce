//! The store: an ordered sequence of lifetime-tagged cells, indexed by
//! address.

use fr_syntax::{Addr, FrError, Lifetime, SemErrorKind, Span, Value};

/// A single heap slot. `None` means the cell is empty (has been dropped, or
/// was never filled).
#[derive(Debug, Clone)]
struct Cell {
    lifetime: Lifetime,
    value: Value,
}

/// The store: `Store::allocate` always appends, so addresses are stable for
/// the lifetime of the store even as earlier cells are emptied by drops.
#[derive(Debug, Clone, Default)]
pub struct Store {
    cells: Vec<Option<Cell>>,
}

impl Store {
    pub fn new() -> Self {
        Store { cells: Vec::new() }
    }

    /// `Allocate(v, ℓ)`: append a new cell at the next free address.
    pub fn allocate(&mut self, lifetime: Lifetime, value: Value) -> Addr {
        let addr = Addr(self.cells.len());
        log::trace!("allocating {addr} @ {lifetime}: {value}");
        self.cells.push(Some(Cell { lifetime, value }));
        addr
    }

    fn cell(&self, addr: Addr) -> Option<&Cell> {
        self.cells.get(addr.0).and_then(|c| c.as_ref())
    }

    fn cell_mut(&mut self, addr: Addr) -> Option<&mut Cell> {
        self.cells.get_mut(addr.0).and_then(|c| c.as_mut())
    }

    pub fn is_empty_cell(&self, addr: Addr) -> bool {
        matches!(self.cells.get(addr.0), None | Some(None))
    }

    /// `Read(lv)`: read the value at `addr`. Fails with `read-of-empty-cell`
    /// if the cell is empty.
    pub fn read(&self, addr: Addr, span: Span) -> Result<&Value, FrError> {
        self.cell(addr).map(|c| &c.value).ok_or_else(|| {
            FrError::semantics(
                span,
                SemErrorKind::ReadOfEmptyCell,
                format!("read of empty cell at {addr}"),
            )
        })
    }

    pub fn lifetime_of(&self, addr: Addr) -> Option<Lifetime> {
        self.cell(addr).map(|c| c.lifetime)
    }

    /// `Write(lv, v)`: overwrite the value at `addr`, returning the value
    /// that was there before (the caller is responsible for recursively
    /// finalising it if it was owning). Fails with `write-to-empty-cell` if
    /// the cell is empty.
    pub fn write(&mut self, addr: Addr, value: Value, span: Span) -> Result<Value, FrError> {
        let cell = self.cell_mut(addr).ok_or_else(|| {
            FrError::semantics(
                span,
                SemErrorKind::WriteToEmptyCell,
                format!("write to empty cell at {addr}"),
            )
        })?;
        log::trace!("writing {value} to {addr}");
        Ok(std::mem::replace(&mut cell.value, value))
    }

    /// Move the value out of `addr`, leaving the cell empty. Unlike `write`
    /// followed by a manual clear, this does not finalise anything: the
    /// caller becomes responsible for the value (this is what a `Move`
    /// access does to its source cell, matching Rust's move semantics).
    pub fn take(&mut self, addr: Addr, span: Span) -> Result<Value, FrError> {
        let value = self.read(addr, span)?.clone();
        self.clear(addr);
        Ok(value)
    }

    /// Empty the cell at `addr` without finalising its contents. Used
    /// internally once an owning value has already been recursively dropped.
    fn clear(&mut self, addr: Addr) {
        if let Some(slot) = self.cells.get_mut(addr.0) {
            *slot = None;
        }
    }

    /// Recursively finalise (drop) `value`: if it is an owning `Location`
    /// (produced by `box`), empty its cell after first finalising whatever
    /// that cell held. Non-owning locations, scalars and unit are no-ops;
    /// tuples finalise each field.
    pub fn finalize(&mut self, value: &Value) {
        match value {
            Value::Location { addr, owning: true } => {
                if let Some(cell) = self.cell(*addr).cloned() {
                    self.finalize(&cell.value);
                    self.clear(*addr);
                }
            }
            Value::Tuple(fields) => {
                for field in fields {
                    self.finalize(field);
                }
            }
            _ => {}
        }
    }

    /// `Drop(ℓ)`: finalise (recursively) every value owned by a cell whose
    /// lifetime is `ℓ`, then empty all of those cells, then check the
    /// reference invariant.
    pub fn drop_lifetime(&mut self, lifetime: Lifetime, span: Span) -> Result<(), FrError> {
        log::debug!("dropping every cell @ {lifetime}");
        let addrs: Vec<Addr> = self
            .cells
            .iter()
            .enumerate()
            .filter_map(|(i, c)| match c {
                Some(cell) if cell.lifetime == lifetime => Some(Addr(i)),
                _ => None,
            })
            .collect();
        for addr in &addrs {
            if let Some(cell) = self.cell(*addr).cloned() {
                self.finalize(&cell.value);
            }
            self.clear(*addr);
        }
        self.check_reference_invariant(span)
    }

    /// For every live cell holding a `Location` to address `a`, `a` must be
    /// non-empty. A violation means some other live cell still points at a
    /// cell we just swept — a dangling reference, and a soundness bug if the
    /// program that produced it was accepted by the checker.
    pub fn check_reference_invariant(&self, span: Span) -> Result<(), FrError> {
        for slot in &self.cells {
            let Some(cell) = slot else { continue };
            if let Some(dangling) = self.first_dangling(&cell.value) {
                return Err(FrError::semantics(
                    span,
                    SemErrorKind::DanglingReference,
                    format!("dangling reference to empty cell at {dangling}"),
                ));
            }
        }
        Ok(())
    }

    fn first_dangling(&self, value: &Value) -> Option<Addr> {
        match value {
            Value::Location { addr, .. } if self.is_empty_cell(*addr) => Some(*addr),
            Value::Tuple(fields) => fields.iter().find_map(|v| self.first_dangling(v)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fr_syntax::LifetimeArena;

    #[test]
    fn allocate_read_write_roundtrip() {
        let mut arena = LifetimeArena::new();
        let root = arena.root();
        let mut store = Store::new();
        let addr = store.allocate(root, Value::Int(1));
        assert_eq!(store.read(addr, Span::DUMMY).unwrap(), &Value::Int(1));
        store.write(addr, Value::Int(2), Span::DUMMY).unwrap();
        assert_eq!(store.read(addr, Span::DUMMY).unwrap(), &Value::Int(2));
    }

    #[test]
    fn drop_finalizes_owned_boxes_recursively() {
        let mut arena = LifetimeArena::new();
        let root = arena.root();
        let inner = arena.fresh_within(root);
        let mut store = Store::new();
        let payload = store.allocate(root, Value::Int(42));
        let boxed = store.allocate(inner, Value::owned(payload));
        store.drop_lifetime(inner, Span::DUMMY).unwrap();
        assert!(store.is_empty_cell(boxed));
        assert!(store.is_empty_cell(payload));
    }

    #[test]
    fn drop_does_not_finalize_borrowed_locations() {
        let mut arena = LifetimeArena::new();
        let root = arena.root();
        let inner = arena.fresh_within(root);
        let mut store = Store::new();
        let payload = store.allocate(root, Value::Int(42));
        let borrow = store.allocate(inner, Value::borrow(payload));
        store.drop_lifetime(inner, Span::DUMMY).unwrap();
        assert!(store.is_empty_cell(borrow));
        assert!(!store.is_empty_cell(payload));
    }

    #[test]
    fn reference_invariant_catches_dangling_pointer() {
        let mut arena = LifetimeArena::new();
        let root = arena.root();
        let mut store = Store::new();
        let payload = store.allocate(root, Value::Int(1));
        store.allocate(root, Value::borrow(payload));
        store.clear(payload);
        assert!(store.check_reference_invariant(Span::DUMMY).is_err());
    }
}
