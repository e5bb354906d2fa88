//! Module-level records and the passes that run before typechecking
//!
//! A [`ModuleSet`] owns every unit of a run. The passes here bind open
//! parameters, merge duplicate instances, and resolve the signature
//! hierarchy into basic types.

mod hierarchy;
mod hir;
mod lookup;
mod merge;
mod options;
mod params;
mod trace;

pub use hierarchy::resolve_hierarchy;
pub use hir::{Fact, Field, Fun, FunDecl, ModuleSet, Open, Sig, SigDecl, SigMult, Unit};
pub use lookup::split_qualified;
pub use merge::{alias_order, merge_units};
pub use options::{MAX_ROUNDS_VAR, Options};
pub use params::bind_params;
pub use trace::{LogTrace, TraceSink};
