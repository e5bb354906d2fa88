//! Operator kinds and their concrete syntax

use std::fmt;

/// Unary operators, including the multiplicity markers used in declarations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    /// `some e` as a declaration bound
    SomeOf,
    /// `lone e` as a declaration bound
    LoneOf,
    /// `one e` as a declaration bound
    OneOf,
    /// `set e` as a declaration bound
    SetOf,
    Some,
    Lone,
    One,
    No,
    Transpose,
    Closure,
    ReflexiveClosure,
    Cardinality,
    IntToAtom,
    Sum,
}

impl UnaryOp {
    pub fn is_multiplicity(self) -> bool {
        matches!(
            self,
            UnaryOp::SomeOf | UnaryOp::LoneOf | UnaryOp::OneOf | UnaryOp::SetOf
        )
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnaryOp::Not => "!",
            UnaryOp::SomeOf => "some of",
            UnaryOp::LoneOf => "lone of",
            UnaryOp::OneOf => "one of",
            UnaryOp::SetOf => "set of",
            UnaryOp::Some => "some",
            UnaryOp::Lone => "lone",
            UnaryOp::One => "one",
            UnaryOp::No => "no",
            UnaryOp::Transpose => "~",
            UnaryOp::Closure => "^",
            UnaryOp::ReflexiveClosure => "*",
            UnaryOp::Cardinality => "#",
            UnaryOp::IntToAtom => "Int[]",
            UnaryOp::Sum => "int[]",
        };
        f.write_str(s)
    }
}

/// Multiplicity on either side of an arrow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrowMult {
    Set,
    Some,
    One,
    Lone,
}

impl fmt::Display for ArrowMult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrowMult::Set => Ok(()),
            ArrowMult::Some => f.write_str("some"),
            ArrowMult::One => f.write_str("one"),
            ArrowMult::Lone => f.write_str("lone"),
        }
    }
}

/// Binary operators. Relational join has its own node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    And,
    Or,
    Iff,
    Implies,
    Lt,
    Lte,
    Gt,
    Gte,
    Plus,
    Minus,
    PlusPlus,
    Intersect,
    Arrow(ArrowMult, ArrowMult),
    Domain,
    Range,
    In,
    Equals,
}

impl BinaryOp {
    /// Plain `->`
    pub const ARROW: BinaryOp = BinaryOp::Arrow(ArrowMult::Set, ArrowMult::Set);
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Iff => "<=>",
            BinaryOp::Implies => "=>",
            BinaryOp::Lt => "<",
            BinaryOp::Lte => "=<",
            BinaryOp::Gt => ">",
            BinaryOp::Gte => ">=",
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::PlusPlus => "++",
            BinaryOp::Intersect => "&",
            BinaryOp::Arrow(left, right) => return write!(f, "{}->{}", left, right),
            BinaryOp::Domain => "<:",
            BinaryOp::Range => ":>",
            BinaryOp::In => "in",
            BinaryOp::Equals => "=",
        };
        f.write_str(s)
    }
}

/// Quantifiers and the other binders over declaration lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuantOp {
    All,
    No,
    Lone,
    One,
    Some,
    Sum,
    Comprehension,
}

impl fmt::Display for QuantOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QuantOp::All => "all",
            QuantOp::No => "no",
            QuantOp::Lone => "lone",
            QuantOp::One => "one",
            QuantOp::Some => "some",
            QuantOp::Sum => "sum",
            QuantOp::Comprehension => "{...}",
        };
        f.write_str(s)
    }
}

/// Constant leaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Constant {
    Number(i64),
    Iden,
    True,
    False,
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Number(n) => write!(f, "{}", n),
            Constant::Iden => f.write_str("iden"),
            Constant::True => f.write_str("true"),
            Constant::False => f.write_str("false"),
        }
    }
}
