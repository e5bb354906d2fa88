//! Relation tuples

use crate::basic::BasicType;
use std::fmt;
use std::ops::Range;

/// An ordered product of one or more basic types
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rel {
    columns: Vec<BasicType>,
}

impl Rel {
    pub fn new(columns: Vec<BasicType>) -> Self {
        assert!(!columns.is_empty(), "a relation tuple needs at least one column");
        Self { columns }
    }

    pub fn unary(column: BasicType) -> Self {
        Self { columns: vec![column] }
    }

    pub fn arity(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[BasicType] {
        &self.columns
    }

    pub fn first(&self) -> &BasicType {
        &self.columns[0]
    }

    pub fn last(&self) -> &BasicType {
        &self.columns[self.columns.len() - 1]
    }

    /// Statically empty: some column is `none`
    pub fn is_empty(&self) -> bool {
        self.columns.iter().any(BasicType::is_none)
    }

    /// Sub-tuple over a column range
    pub fn slice(&self, range: Range<usize>) -> Rel {
        Rel::new(self.columns[range].to_vec())
    }

    pub fn product(&self, other: &Rel) -> Rel {
        let mut columns = self.columns.clone();
        columns.extend_from_slice(&other.columns);
        Rel { columns }
    }

    /// Component-wise intersection, if the arities agree
    pub fn intersect(&self, other: &Rel) -> Option<Rel> {
        if self.arity() != other.arity() {
            return None;
        }
        let columns = self
            .columns
            .iter()
            .zip(&other.columns)
            .map(|(a, b)| a.intersect(b))
            .collect();
        Some(Rel { columns })
    }

    /// Relational join, dropping the shared boundary column.
    ///
    /// Defined only when the arities sum to at least 3 and the boundary
    /// columns intersect.
    pub fn join(&self, other: &Rel) -> Option<Rel> {
        if self.arity() + other.arity() < 3 || !self.last().intersects(other.first()) {
            return None;
        }
        let mut columns = self.columns[..self.arity() - 1].to_vec();
        columns.extend_from_slice(&other.columns[1..]);
        Some(Rel { columns })
    }

    pub fn transpose(&self) -> Option<Rel> {
        match self.columns.as_slice() {
            [a, b] => Some(Rel { columns: vec![b.clone(), a.clone()] }),
            _ => None,
        }
    }

    /// Replace column `index` with its intersection against `column`
    pub fn column_restrict(&self, column: &BasicType, index: usize) -> Rel {
        let mut columns = self.columns.clone();
        columns[index] = columns[index].intersect(column);
        Rel { columns }
    }

    /// Same arity and every column lies below the matching column of `other`
    pub fn is_subset_of(&self, other: &Rel) -> bool {
        self.arity() == other.arity()
            && self.columns.iter().zip(&other.columns).all(|(a, b)| a.is_subtype_of(b))
    }
}

impl fmt::Display for Rel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                f.write_str("->")?;
            }
            write!(f, "{}", column)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sigs() -> (BasicType, BasicType, BasicType) {
        let a = BasicType::new(10, "A", &BasicType::univ());
        let b = BasicType::new(11, "B", &BasicType::univ());
        let a1 = BasicType::new(12, "A1", &a);
        (a, b, a1)
    }

    #[test]
    fn test_join_drops_shared_column() {
        let (a, b, a1) = sigs();
        let left = Rel::new(vec![b.clone(), a1]);
        let right = Rel::new(vec![a, b.clone(), b.clone()]);
        let joined = left.join(&right).unwrap();
        assert_eq!(joined.arity(), 3);
        assert_eq!(joined.to_string(), "B->B->B");
    }

    #[test]
    fn test_join_needs_overlap_and_arity() {
        let (a, b, _) = sigs();
        assert!(Rel::unary(a.clone()).join(&Rel::unary(a.clone())).is_none());
        let ab = Rel::new(vec![a.clone(), b.clone()]);
        assert!(ab.join(&ab).is_none());
        let ba = Rel::new(vec![b, a]);
        assert!(ab.join(&ba).is_some());
    }

    #[test]
    fn test_emptiness_follows_columns() {
        let (a, b, _) = sigs();
        let r = Rel::new(vec![a.clone(), b.clone()]);
        assert!(!r.is_empty());
        let restricted = r.column_restrict(&a, 1);
        assert!(restricted.is_empty());
        assert!(Rel::unary(BasicType::none()).is_empty());
    }

    #[test]
    fn test_subset_is_columnwise() {
        let (a, b, a1) = sigs();
        let narrow = Rel::new(vec![a1, b.clone()]);
        let wide = Rel::new(vec![a.clone(), b.clone()]);
        assert!(narrow.is_subset_of(&wide));
        assert!(!wide.is_subset_of(&narrow));
        assert!(!Rel::unary(a).is_subset_of(&wide));
    }
}
