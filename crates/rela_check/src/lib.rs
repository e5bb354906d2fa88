//! Bidirectional typechecker for relational models
//!
//! [`check`] drives a whole [`ModuleSet`](rela_hir::ModuleSet) through
//! parameter binding, unit merging, hierarchy resolution and expression
//! typing. [`TypeChecker`] checks single expressions against an already
//! resolved set.

mod checker;
mod closure;
mod infer;
mod names;
mod narrow;
mod pipeline;
mod scope;
#[cfg(test)]
mod testing;

pub use checker::{TypeChecker, add_one};
pub use pipeline::check;
pub use rela_hir::{LogTrace, Options, TraceSink};
pub use scope::Scope;
