//! Expression tree and shared vocabulary for the relational checker
//!
//! Nodes carry their typing state inline: parsed input is `Untyped`, the
//! bottom-up pass produces `Bounding` or `Unresolved` nodes, and the
//! top-down pass replaces them with `Resolved` ones.

mod error;
mod expr;
mod ids;
mod ops;
mod pos;

pub use error::{Error, Result};
pub use expr::{Expr, ExprKind, NameTarget, Typing, VarDecl};
pub use ids::{FunId, SigId, UnitId};
pub use ops::{ArrowMult, BinaryOp, Constant, QuantOp, UnaryOp};
pub use pos::Pos;
