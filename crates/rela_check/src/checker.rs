//! The typechecker state and the helpers shared by both passes
//!
//! Checking an expression runs two passes. The bounding pass computes,
//! bottom-up, the widest type each node could have and collects every
//! interpretation of overloaded names. The relevant pass then walks
//! top-down with the type the parent can actually use, narrows each child
//! to it, and picks exactly one interpretation per overloaded name.

use crate::scope::Scope;
use rela_ast::{Error, Expr, ExprKind, Pos, Result, SigId, UnaryOp, UnitId};
use rela_hir::ModuleSet;
use rela_types::Type;

/// Which declaration is being checked. Restricts what names can see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Root {
    /// A field bound of `sig`; only its fields before `upto` are visible
    Field { sig: SigId, upto: usize },
    /// Parameter and return bounds of a function or predicate
    FunDecl,
    /// Appended facts of a signature
    SigFact(SigId),
    /// Function bodies, facts and assertions
    Body,
}

/// Typechecker for expressions inside one unit
pub struct TypeChecker<'a> {
    pub(crate) set: &'a ModuleSet,
    pub(crate) unit: UnitId,
    pub(crate) root: Root,
    pub(crate) scope: Scope,
}

impl<'a> TypeChecker<'a> {
    /// A checker for bodies, facts and assertions of `unit`
    pub fn new(set: &'a ModuleSet, unit: UnitId) -> Self {
        Self::for_root(set, unit, Root::Body)
    }

    pub(crate) fn for_root(set: &'a ModuleSet, unit: UnitId, root: Root) -> Self {
        Self {
            set,
            unit,
            root,
            scope: Scope::new(),
        }
    }

    /// Bind a local name in the outermost scope
    pub fn bind(&mut self, name: impl Into<String>, ty: Type) {
        self.scope.define(name, ty);
    }

    /// Fully typecheck an expression: bounding pass, relevant pass with
    /// the bounding type as demand, then a final ambiguity check.
    pub fn resolve(&mut self, expr: Expr) -> Result<Expr> {
        let bounded = self.infer(expr)?;
        let demand = bounded.ty().clone();
        let resolved = self.narrow(bounded, &demand)?;
        ensure_resolved(resolved.ty(), &resolved.pos)?;
        Ok(resolved)
    }

    /// Run `f` inside a fresh scope, popping it whether or not `f` succeeds
    pub(crate) fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.scope.push();
        let out = f(self);
        self.scope.pop();
        out
    }

    /// Type of the built-in `Int` signature
    pub(crate) fn int_type(&self) -> &Type {
        self.set.int_type()
    }
}

/// Fails unless `ty` is exactly one of: a relation of a single arity, an
/// integer, or a formula.
pub(crate) fn ensure_resolved(ty: &Type, pos: &Pos) -> Result<()> {
    if !ty.is_bool() && !ty.is_int() && ty.size() == 0 {
        return Err(Error::type_error(
            pos,
            "This expression failed to be typechecked, because it has no possible type!",
        ));
    }
    let ambiguous = (ty.is_bool() && ty.is_int())
        || ((ty.is_bool() || ty.is_int()) && ty.size() > 0)
        || (ty.size() > 0 && ty.arity().is_none());
    if ambiguous {
        return Err(Error::type_error(
            pos,
            format!("This expression is ambiguous! It has the following possible types: {}", ty),
        ));
    }
    Ok(())
}

/// No tuples and neither flag
pub(crate) fn is_bad(ty: &Type) -> bool {
    !ty.is_bool() && !ty.is_int() && ty.size() == 0
}

pub(crate) fn cint(expr: &Expr) -> Result<()> {
    if expr.ty().is_int() {
        return Ok(());
    }
    Err(Error::type_error(
        &expr.pos,
        format!(
            "This must be an integer expression! Instead, it has the following possible type(s): {}",
            expr.ty()
        ),
    ))
}

pub(crate) fn cset(expr: &Expr) -> Result<&Type> {
    cset_type(expr.ty(), &expr.pos)?;
    Ok(expr.ty())
}

pub(crate) fn cset_type(ty: &Type, pos: &Pos) -> Result<()> {
    if ty.size() > 0 {
        return Ok(());
    }
    Err(Error::type_error(
        pos,
        format!(
            "This must be a set or relation! Instead, it has the following possible type(s): {}",
            ty
        ),
    ))
}

pub(crate) fn cform(expr: &Expr) -> Result<()> {
    cform_type(expr.ty(), &expr.pos)
}

pub(crate) fn cform_type(ty: &Type, pos: &Pos) -> Result<()> {
    if ty.is_bool() {
        return Ok(());
    }
    Err(Error::type_error(
        pos,
        format!(
            "This must be a formula expression! Instead, it has the following possible type(s): {}",
            ty
        ),
    ))
}

/// Give a declaration bound an implicit `one` when it is a plain unary
/// set without a multiplicity of its own.
pub fn add_one(expr: Expr) -> Expr {
    if matches!(&expr.kind, ExprKind::Unary { op, .. } if op.is_multiplicity()) {
        return expr;
    }
    let ty = expr.ty();
    if ty.is_int() || ty.is_bool() || ty.arity() != Some(1) {
        return expr;
    }
    let ty = ty.clone();
    Expr::unary(expr.pos.clone(), UnaryOp::OneOf, expr).resolved(ty)
}
