//! The typing environment: a persistent mapping from variable name to
//! `(Type, declaring lifetime)`.

use std::collections::BTreeMap;
use std::fmt;

use fr_syntax::Lifetime;

use crate::ty::Type;

/// Environments are immutable value objects: every mutating operation
/// returns a new `Environment` rather than mutating in place. Performance is
/// not a design goal: we simply clone the backing map on every update,
/// rather than reaching for a structurally-shared persistent map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    bindings: BTreeMap<String, (Type, Lifetime)>,
}

impl Environment {
    pub fn empty() -> Self {
        Environment {
            bindings: BTreeMap::new(),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&(Type, Lifetime)> {
        self.bindings.get(name)
    }

    /// True iff `name` is declared *at* lifetime `lt` specifically (used to
    /// detect redeclaration within the same block; shadowing across nested
    /// blocks is allowed).
    pub fn declared_at(&self, name: &str, lt: Lifetime) -> bool {
        matches!(self.bindings.get(name), Some((_, l)) if *l == lt)
    }

    /// `declare(x, T, ℓ)`: extend the environment, returning a new one.
    /// Overwrites any existing binding for `x` (the caller is responsible
    /// for rejecting redeclaration within the same block before calling
    /// this).
    pub fn declare(&self, name: impl Into<String>, ty: Type, lt: Lifetime) -> Environment {
        let name = name.into();
        log::trace!("declaring `{name}: {ty}` @ {lt}");
        let mut bindings = self.bindings.clone();
        bindings.insert(name, (ty, lt));
        Environment { bindings }
    }

    /// `update(x, T)`: replace `x`'s type, keeping its declaring lifetime.
    /// No-op (returns a clone) if `x` is not bound.
    pub fn update(&self, name: &str, ty: Type) -> Environment {
        let mut bindings = self.bindings.clone();
        if let Some(lt) = bindings.get(name).map(|(_, lt)| *lt) {
            log::trace!("updating `{name}` to `{ty}`");
            bindings.insert(name.to_string(), (ty, lt));
        }
        Environment { bindings }
    }

    /// `remove(x)`: drop `x`'s binding entirely.
    pub fn remove(&self, name: &str) -> Environment {
        let mut bindings = self.bindings.clone();
        bindings.remove(name);
        Environment { bindings }
    }

    /// `remove_all_in(ℓ)`: drop every binding declared at lifetime `ℓ`. Used
    /// when a block exits and its scope's bindings go out of scope.
    pub fn remove_all_in(&self, lt: Lifetime) -> Environment {
        log::debug!("dropping every binding declared at {lt}");
        let bindings = self
            .bindings
            .iter()
            .filter(|(_, (_, l))| *l != lt)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Environment { bindings }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Type, Lifetime)> {
        self.bindings.iter().map(|(k, (t, l))| (k.as_str(), t, *l))
    }

    /// Join of two environments over a control-flow merge: both branches
    /// must bind exactly the same names, and each name's type must have a
    /// defined join.
    pub fn join(&self, other: &Environment) -> Option<Environment> {
        if self.bindings.len() != other.bindings.len() {
            return None;
        }
        let mut bindings = BTreeMap::new();
        for (name, (ty_a, lt_a)) in &self.bindings {
            let (ty_b, lt_b) = other.bindings.get(name)?;
            if lt_a != lt_b {
                return None;
            }
            let joined = ty_a.join(ty_b)?;
            bindings.insert(name.clone(), (joined, *lt_a));
        }
        Some(Environment { bindings })
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, (ty, lt))) in self.bindings.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {ty} @ {lt}")?;
        }
        write!(f, "}}")
    }
}
