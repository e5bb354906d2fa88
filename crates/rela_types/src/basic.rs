//! Basic types: the atomic columns of a relation type

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock};

/// Id of the universal basic type
pub const UNIV_ID: u32 = 0;
/// Id of the empty basic type
pub const NONE_ID: u32 = 1;
/// Id of the integer-atom basic type
pub const INT_ID: u32 = 2;

static UNIV: LazyLock<BasicType> = LazyLock::new(|| BasicType::root(UNIV_ID, "univ"));
static NONE: LazyLock<BasicType> = LazyLock::new(|| BasicType::root(NONE_ID, "none"));
static INT: LazyLock<BasicType> = LazyLock::new(|| BasicType::new(INT_ID, "Int", &UNIV));

/// An atomic signature-derived type used as one column of a tuple.
///
/// Identity is the numeric id. Each basic type also carries the ids of
/// all its ancestors (nearest first) so intersection does not need a
/// handle on the signature hierarchy.
#[derive(Clone)]
pub struct BasicType(Arc<BasicInner>);

struct BasicInner {
    id: u32,
    name: String,
    ancestors: Vec<u32>,
}

impl BasicType {
    fn root(id: u32, name: &str) -> Self {
        Self(Arc::new(BasicInner {
            id,
            name: name.to_string(),
            ancestors: Vec::new(),
        }))
    }

    /// Create a basic type directly below `parent`
    pub fn new(id: u32, name: impl Into<String>, parent: &BasicType) -> Self {
        let mut ancestors = Vec::with_capacity(parent.0.ancestors.len() + 1);
        ancestors.push(parent.id());
        ancestors.extend_from_slice(&parent.0.ancestors);
        Self(Arc::new(BasicInner {
            id,
            name: name.into(),
            ancestors,
        }))
    }

    /// The top of the hierarchy
    pub fn univ() -> Self {
        UNIV.clone()
    }

    /// The bottom of the hierarchy
    pub fn none() -> Self {
        NONE.clone()
    }

    /// Integer atoms, directly below `univ`
    pub fn int() -> Self {
        INT.clone()
    }

    pub fn id(&self) -> u32 {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn is_none(&self) -> bool {
        self.0.id == NONE_ID
    }

    /// True if `self` is `other` or lies below it. `none` lies below everything.
    pub fn is_subtype_of(&self, other: &BasicType) -> bool {
        self.is_none() || self.0.id == other.0.id || self.0.ancestors.contains(&other.0.id)
    }

    /// Hierarchy-aware intersection: the narrower of the two when one
    /// contains the other, otherwise `none`.
    pub fn intersect(&self, other: &BasicType) -> BasicType {
        if self.is_subtype_of(other) {
            self.clone()
        } else if other.is_subtype_of(self) {
            other.clone()
        } else {
            BasicType::none()
        }
    }

    pub fn intersects(&self, other: &BasicType) -> bool {
        !self.intersect(other).is_none()
    }
}

impl PartialEq for BasicType {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for BasicType {}

impl Hash for BasicType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl PartialOrd for BasicType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BasicType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.id.cmp(&other.0.id)
    }
}

impl fmt::Debug for BasicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.0.name, self.0.id)
    }
}

impl fmt::Display for BasicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}
