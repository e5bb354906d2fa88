//! Type representation for relational expressions

use crate::basic::BasicType;
use crate::rel::Rel;
use std::collections::BTreeSet;
use std::fmt;

/// The statically possible shapes of an expression.
///
/// A type is a set of tuple products plus two independent flags saying
/// whether the expression may also denote an integer or a formula. A
/// well-formed final type has exactly one of: some tuples, the int flag,
/// or the bool flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Type {
    rels: BTreeSet<Rel>,
    is_int: bool,
    is_bool: bool,
}

impl Type {
    /// No tuples and no flags
    pub const fn empty() -> Self {
        Self {
            rels: BTreeSet::new(),
            is_int: false,
            is_bool: false,
        }
    }

    /// The type of a formula
    pub const fn formula() -> Self {
        Self {
            rels: BTreeSet::new(),
            is_int: false,
            is_bool: true,
        }
    }

    /// The type of an integer expression
    pub const fn int() -> Self {
        Self {
            rels: BTreeSet::new(),
            is_int: true,
            is_bool: false,
        }
    }

    pub fn of(rel: Rel) -> Self {
        let mut rels = BTreeSet::new();
        rels.insert(rel);
        Self {
            rels,
            is_int: false,
            is_bool: false,
        }
    }

    pub fn unary(basic: BasicType) -> Self {
        Self::of(Rel::unary(basic))
    }

    pub fn from_rels(rels: impl IntoIterator<Item = Rel>) -> Self {
        Self {
            rels: rels.into_iter().collect(),
            is_int: false,
            is_bool: false,
        }
    }

    pub fn with_int(mut self) -> Self {
        self.is_int = true;
        self
    }

    pub fn with_bool(mut self) -> Self {
        self.is_bool = true;
        self
    }

    pub fn is_int(&self) -> bool {
        self.is_int
    }

    pub fn is_bool(&self) -> bool {
        self.is_bool
    }

    pub fn rels(&self) -> impl Iterator<Item = &Rel> {
        self.rels.iter()
    }

    /// Number of distinct tuple products
    pub fn size(&self) -> usize {
        self.rels.len()
    }

    /// The common arity of every tuple, or `None` if there are no tuples
    /// or their arities differ.
    pub fn arity(&self) -> Option<usize> {
        let mut rels = self.rels.iter();
        let first = rels.next()?.arity();
        rels.all(|r| r.arity() == first).then_some(first)
    }

    pub fn has_arity(&self, arity: usize) -> bool {
        self.rels.iter().any(|r| r.arity() == arity)
    }

    pub fn has_common_arity(&self, other: &Type) -> bool {
        self.rels.iter().any(|r| other.has_arity(r.arity()))
    }

    /// Some tuple may be nonempty
    pub fn has_tuple(&self) -> bool {
        self.rels.iter().any(|r| !r.is_empty())
    }

    /// Every tuple is statically empty (or there are none)
    pub fn has_no_tuple(&self) -> bool {
        !self.has_tuple()
    }

    /// Every nonempty tuple is covered by some tuple of `other`
    pub fn is_subset_of(&self, other: &Type) -> bool {
        self.rels
            .iter()
            .all(|r| r.is_empty() || other.rels.iter().any(|o| r.is_subset_of(o)))
    }

    /// Only the tuples of the given arity
    pub fn extract(&self, arity: usize) -> Type {
        Type::from_rels(self.rels.iter().filter(|r| r.arity() == arity).cloned())
    }

    /// Tuple union. The int and bool flags are not carried over.
    pub fn union(&self, other: &Type) -> Type {
        Type::from_rels(self.rels.iter().chain(&other.rels).cloned())
    }

    /// Tuple union that keeps both flags
    pub fn merge(&self, other: &Type) -> Type {
        let mut merged = self.union(other);
        merged.is_int = self.is_int || other.is_int;
        merged.is_bool = self.is_bool || other.is_bool;
        merged
    }

    /// Component-wise intersection of every equal-arity pair. Statically
    /// empty results are kept, so `size()` can be positive while
    /// `has_no_tuple()` holds.
    pub fn intersect(&self, other: &Type) -> Type {
        let mut rels = BTreeSet::new();
        for a in &self.rels {
            for b in &other.rels {
                if let Some(r) = a.intersect(b) {
                    rels.insert(r);
                }
            }
        }
        Type {
            rels,
            is_int: false,
            is_bool: false,
        }
    }

    /// Products of pairs whose sides are both empty or both nonempty
    pub fn product_same_emptiness(&self, other: &Type) -> Type {
        self.product_where(other, |a, b| a.is_empty() == b.is_empty())
    }

    /// Products of every pair
    pub fn product_any_emptiness(&self, other: &Type) -> Type {
        self.product_where(other, |_, _| true)
    }

    fn product_where(&self, other: &Type, keep: impl Fn(&Rel, &Rel) -> bool) -> Type {
        let mut rels = BTreeSet::new();
        for a in &self.rels {
            for b in &other.rels {
                if keep(a, b) {
                    rels.insert(a.product(b));
                }
            }
        }
        Type {
            rels,
            is_int: false,
            is_bool: false,
        }
    }

    /// Relational join of every compatible pair
    pub fn join(&self, other: &Type) -> Type {
        let mut rels = BTreeSet::new();
        for a in &self.rels {
            for b in &other.rels {
                if let Some(r) = a.join(b) {
                    rels.insert(r);
                }
            }
        }
        Type {
            rels,
            is_int: false,
            is_bool: false,
        }
    }

    /// Reverses the binary tuples, dropping all others
    pub fn transpose(&self) -> Type {
        Type::from_rels(self.rels.iter().filter_map(Rel::transpose))
    }

    /// Narrows the first column of each tuple by the unary tuples of `set`
    pub fn domain_restrict(&self, set: &Type) -> Type {
        let mut rels = BTreeSet::new();
        for r in &self.rels {
            for s in set.rels.iter().filter(|s| s.arity() == 1) {
                let restricted = r.column_restrict(s.first(), 0);
                if !restricted.is_empty() {
                    rels.insert(restricted);
                }
            }
        }
        Type {
            rels,
            is_int: false,
            is_bool: false,
        }
    }

    /// Narrows the last column of each tuple by the unary tuples of `set`
    pub fn range_restrict(&self, set: &Type) -> Type {
        let mut rels = BTreeSet::new();
        for r in &self.rels {
            for s in set.rels.iter().filter(|s| s.arity() == 1) {
                let restricted = r.column_restrict(s.first(), r.arity() - 1);
                if !restricted.is_empty() {
                    rels.insert(restricted);
                }
            }
        }
        Type {
            rels,
            is_int: false,
            is_bool: false,
        }
    }

    /// Transitive closure over the binary tuples
    pub fn closure(&self) -> Type {
        let base = self.extract(2);
        let mut ans = base.clone();
        loop {
            let next = ans.union(&ans.join(&base));
            if next == ans {
                return ans;
            }
            ans = next;
        }
    }

    /// Transitive closure plus the universal identity pair
    pub fn reflexive_closure(&self) -> Type {
        let iden = Rel::new(vec![BasicType::univ(), BasicType::univ()]);
        self.closure().union(&Type::of(iden))
    }

    /// True if `self`, used as the right side of an override, can replace
    /// some tuple of `left`: an equal-arity pair with intersecting domains.
    pub fn can_override(&self, left: &Type) -> bool {
        self.rels.iter().any(|b| {
            left.rels
                .iter()
                .any(|a| a.arity() == b.arity() && a.first().intersects(b.first()))
        })
    }
}

impl<'a> IntoIterator for &'a Type {
    type Item = &'a Rel;
    type IntoIter = std::collections::btree_set::Iter<'a, Rel>;

    fn into_iter(self) -> Self::IntoIter {
        self.rels.iter()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        let mut first = true;
        let flags = [(self.is_int, "int"), (self.is_bool, "bool")];
        let entries = self
            .rels
            .iter()
            .map(|r| r.to_string())
            .chain(flags.iter().filter(|(set, _)| *set).map(|(_, name)| name.to_string()));
        for entry in entries {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            f.write_str(&entry)?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    struct Sigs {
        a: BasicType,
        b: BasicType,
        a1: BasicType,
    }

    fn sigs() -> Sigs {
        let a = BasicType::new(10, "A", &BasicType::univ());
        let b = BasicType::new(11, "B", &BasicType::univ());
        let a1 = BasicType::new(12, "A1", &a);
        Sigs { a, b, a1 }
    }

    fn rel(cols: &[&BasicType]) -> Rel {
        Rel::new(cols.iter().map(|c| (*c).clone()).collect())
    }

    #[test]
    fn test_arity_of_mixed_and_empty() {
        let s = sigs();
        assert_eq!(Type::empty().arity(), None);
        assert_eq!(Type::unary(s.a.clone()).arity(), Some(1));
        let mixed = Type::unary(s.a.clone()).union(&Type::of(rel(&[&s.a, &s.b])));
        assert_eq!(mixed.arity(), None);
        assert!(mixed.has_arity(2));
        assert_eq!(mixed.size(), 2);
    }

    #[test]
    fn test_union_drops_flags_merge_keeps_them() {
        let s = sigs();
        let a = Type::unary(s.a.clone()).with_int();
        let b = Type::formula();
        let u = a.union(&b);
        assert!(!u.is_int() && !u.is_bool());
        let m = a.merge(&b);
        assert!(m.is_int() && m.is_bool());
        assert_eq!(m.size(), 1);
    }

    #[test]
    fn test_intersect_keeps_empty_tuples() {
        let s = sigs();
        let c = Type::unary(s.a.clone()).intersect(&Type::unary(s.b.clone()));
        assert_eq!(c.size(), 1);
        assert!(c.has_no_tuple());

        let d = Type::unary(s.a.clone()).intersect(&Type::of(rel(&[&s.a, &s.b])));
        assert_eq!(d.size(), 0);

        let e = Type::unary(s.a.clone()).intersect(&Type::unary(s.a1.clone()));
        assert_eq!(e, Type::unary(s.a1.clone()));
    }

    #[rstest]
    #[case(1, 2, Some(1))]
    #[case(2, 2, Some(2))]
    #[case(2, 3, Some(3))]
    #[case(1, 1, None)]
    fn test_join_arity_law(#[case] left: usize, #[case] right: usize, #[case] expected: Option<usize>) {
        let s = sigs();
        let left = Type::of(Rel::new(vec![s.a.clone(); left]));
        let right = Type::of(Rel::new(vec![s.a.clone(); right]));
        let joined = left.join(&right);
        assert_eq!(joined.arity(), expected);
        if let Some(arity) = expected {
            assert_eq!(arity, left.arity().unwrap() + right.arity().unwrap() - 2);
        }
    }

    #[test]
    fn test_join_requires_boundary_overlap() {
        let s = sigs();
        let ab = Type::of(rel(&[&s.a, &s.b]));
        assert_eq!(Type::unary(s.b.clone()).join(&ab).size(), 0);
        assert_eq!(Type::unary(s.a1.clone()).join(&ab), Type::unary(s.b.clone()));
    }

    #[test]
    fn test_products_filter_by_emptiness() {
        let s = sigs();
        let empty = Type::unary(BasicType::none());
        let full = Type::unary(s.a.clone());
        assert_eq!(full.product_same_emptiness(&empty).size(), 0);
        assert_eq!(full.product_any_emptiness(&empty).size(), 1);
        assert_eq!(full.product_same_emptiness(&full).arity(), Some(2));
    }

    #[test]
    fn test_restrictions() {
        let s = sigs();
        let ab = Type::of(rel(&[&s.a, &s.b]));
        let dom = ab.domain_restrict(&Type::unary(s.a1.clone()));
        assert_eq!(dom, Type::of(rel(&[&s.a1, &s.b])));
        assert_eq!(ab.domain_restrict(&Type::unary(s.b.clone())).size(), 0);
        let ran = ab.range_restrict(&Type::unary(s.b.clone()));
        assert_eq!(ran, ab);
    }

    #[test]
    fn test_transpose_only_binary() {
        let s = sigs();
        let t = Type::of(rel(&[&s.a, &s.b])).union(&Type::unary(s.a.clone()));
        assert_eq!(t.transpose(), Type::of(rel(&[&s.b, &s.a])));
    }

    #[test]
    fn test_closure_chains_binary_tuples() {
        let s = sigs();
        let t = Type::of(rel(&[&s.a, &s.b])).union(&Type::of(rel(&[&s.b, &s.a])));
        let closed = t.closure();
        assert!(closed.rels().any(|r| r == &rel(&[&s.a, &s.a])));
        assert!(closed.rels().any(|r| r == &rel(&[&s.b, &s.b])));
        assert_eq!(closed.size(), 4);

        let reflexive = t.reflexive_closure();
        assert_eq!(reflexive.size(), 5);
    }

    #[test]
    fn test_closure_of_disjoint_relation_does_not_join() {
        let s = sigs();
        let t = Type::of(rel(&[&s.a, &s.b]));
        let closed = t.closure();
        assert_eq!(closed, t);
        assert_eq!(closed.join(&closed).size(), 0);
    }

    #[test]
    fn test_can_override() {
        let s = sigs();
        let left = Type::of(rel(&[&s.a, &s.b]));
        assert!(Type::of(rel(&[&s.a1, &s.b])).can_override(&left));
        assert!(!Type::of(rel(&[&s.b, &s.b])).can_override(&left));
    }

    #[test]
    fn test_display() {
        let s = sigs();
        let t = Type::of(rel(&[&s.a, &s.b])).union(&Type::unary(s.a1.clone())).with_int();
        assert_eq!(t.to_string(), "{A->B, A1, int}");
        assert_eq!(Type::formula().to_string(), "{bool}");
        assert_eq!(Type::empty().to_string(), "{}");
    }
}
