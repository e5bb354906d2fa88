//! Arena indices for signatures, functions and units

use std::fmt;

/// Index of a signature in a module set's signature arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SigId(pub u32);

impl SigId {
    /// The universal signature
    pub const UNIV: SigId = SigId(0);
    /// The empty signature
    pub const NONE: SigId = SigId(1);
    /// The signature of integer atoms
    pub const INT: SigId = SigId(2);

    pub fn new(index: usize) -> Self {
        Self(u32::try_from(index).expect("arena index fits in u32"))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_builtin(self) -> bool {
        self.0 <= Self::INT.0
    }
}

/// Index of a function or predicate in a module set's function arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunId(pub u32);

impl FunId {
    pub fn new(index: usize) -> Self {
        Self(u32::try_from(index).expect("arena index fits in u32"))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identity of a module instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trips() {
        assert_eq!(SigId::new(7).index(), 7);
        assert_eq!(FunId::new(3).index(), 3);
        assert!(SigId::new(2).is_builtin());
        assert!(!SigId::new(3).is_builtin());
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    #[should_panic(expected = "arena index fits in u32")]
    fn test_oversized_index_panics() {
        SigId::new(u32::MAX as usize + 1);
    }
}
