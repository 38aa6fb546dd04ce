//! L-values: a named root plus a path of dereferences and field projections.

use std::fmt;

/// One element of a [`Path`]: either a dereference marker or a field index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathElem {
    Deref,
    Field(usize),
}

impl fmt::Display for PathElem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathElem::Deref => write!(f, "*"),
            PathElem::Field(i) => write!(f, ".{i}"),
        }
    }
}

/// An ordered sequence of path elements, applied left-to-right starting from
/// the named root. The empty path denotes the variable itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path(Vec<PathElem>);

impl Path {
    pub fn empty() -> Self {
        Path(Vec::new())
    }

    pub fn from_elems(elems: impl IntoIterator<Item = PathElem>) -> Self {
        Path(elems.into_iter().collect())
    }

    pub fn elems(&self) -> &[PathElem] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `append(p, elem)` -> a new path with `elem` pushed onto the end.
    pub fn append(&self, elem: PathElem) -> Path {
        let mut elems = self.0.clone();
        elems.push(elem);
        Path(elems)
    }

    /// `prefix_of(self, other)` -> true iff `self`'s elements are a prefix of
    /// `other`'s.
    pub fn prefix_of(&self, other: &Path) -> bool {
        self.0.len() <= other.0.len() && self.0 == other.0[..self.0.len()]
    }

    /// `conflict(self, other)` -> true iff one path is a prefix of the other.
    /// Used to detect overlapping borrows/writes through projections.
    pub fn conflict(&self, other: &Path) -> bool {
        self.prefix_of(other) || other.prefix_of(self)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for elem in &self.0 {
            write!(f, "{elem}")?;
        }
        Ok(())
    }
}

/// A compile-time description of a storage location: a named root plus a
/// path of dereferences and field projections.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LVal {
    pub var: String,
    pub path: Path,
}

impl LVal {
    pub fn var(name: impl Into<String>) -> Self {
        LVal {
            var: name.into(),
            path: Path::empty(),
        }
    }

    pub fn new(name: impl Into<String>, path: Path) -> Self {
        LVal {
            var: name.into(),
            path,
        }
    }

    /// The l-value reached by dereferencing `self`.
    pub fn deref(&self) -> LVal {
        LVal {
            var: self.var.clone(),
            path: self.path.append(PathElem::Deref),
        }
    }

    /// The l-value reached by projecting field `i` out of `self`.
    pub fn field(&self, i: usize) -> LVal {
        LVal {
            var: self.var.clone(),
            path: self.path.append(PathElem::Field(i)),
        }
    }

    /// Two l-values conflict iff they share a root variable and their paths
    /// conflict.
    pub fn conflicts_with(&self, other: &LVal) -> bool {
        self.var == other.var && self.path.conflict(&other.path)
    }
}

impl fmt::Display for LVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Render in the "deref-prefix, field-suffix" surface form: run through
        // the elements outside-in, wrapping each `Deref` around what came
        // before and appending each `Field` after it.
        let mut rendered = self.var.clone();
        for elem in self.path.elems() {
            rendered = match elem {
                PathElem::Deref => format!("*{rendered}"),
                PathElem::Field(i) => format!("{rendered}.{i}"),
            };
        }
        write!(f, "{rendered}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_and_conflict() {
        let base = Path::empty();
        let deref = base.append(PathElem::Deref);
        let deref_field = deref.append(PathElem::Field(0));
        assert!(base.prefix_of(&deref));
        assert!(deref.prefix_of(&deref_field));
        assert!(base.conflict(&deref_field));
        assert!(!deref_field.conflict(&base.append(PathElem::Field(1))));
    }

    #[test]
    fn disjoint_tuple_fields_do_not_conflict() {
        let x0 = LVal::var("x").field(0);
        let x1 = LVal::var("x").field(1);
        assert!(!x0.conflicts_with(&x1));
        assert!(x0.conflicts_with(&x0));
    }

    #[test]
    fn display_matches_surface_syntax() {
        let lv = LVal::var("y").deref();
        assert_eq!(lv.to_string(), "*y");
        let lv = LVal::var("x").field(0);
        assert_eq!(lv.to_string(), "x.0");
    }
}
