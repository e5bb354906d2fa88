//! Signature hierarchy: parents, topological order and types

use crate::hir::ModuleSet;
use rela_ast::{Error, Result, SigId};
use rela_types::{BasicType, Type};
use std::collections::HashMap;

/// Resolve every signature's parents, sort the hierarchy so parents
/// precede children, record extension children and assign types.
pub fn resolve_hierarchy(set: &mut ModuleSet) -> Result<Vec<SigId>> {
    let sigs = set.live_sigs();
    for &sig in &sigs {
        resolve_parents(set, sig)?;
    }

    let mut state = HashMap::with_capacity(sigs.len());
    let mut order = Vec::with_capacity(sigs.len());
    for &sig in &sigs {
        if !state.contains_key(&sig) {
            visit(set, sig, &mut state, &mut order)?;
        }
    }

    for &sig in &order {
        if let Some(parent) = set.sig(sig).parent() {
            set.sig_mut(parent).subs.push(sig);
        }
    }

    for &sig in &order {
        assign_type(set, sig)?;
    }
    Ok(order)
}

fn resolve_parents(set: &mut ModuleSet, id: SigId) -> Result<()> {
    let sig = set.sig(id);
    let Some(unit) = sig.unit else {
        return Ok(());
    };
    if sig.extends.is_some() && sig.is_subset() {
        return Err(Error::syntax(
            &sig.pos,
            format!(
                "The signature \"{}\" cannot both extend a signature and be a subset of signatures",
                sig.full_name()
            ),
        ));
    }

    let mut parent = Some(SigId::UNIV);
    if let Some(name) = &sig.extends {
        let found = lookup_parent(set, id, unit, name)?;
        if set.sig(found).is_subset() {
            return Err(Error::syntax(
                &sig.pos,
                format!(
                    "The signature \"{}\" cannot extend the subset signature \"{}\"",
                    sig.full_name(),
                    set.sig_name(found)
                ),
            ));
        }
        parent = Some(found);
    }

    let mut sups = Vec::with_capacity(sig.subset_of.len());
    for name in &sig.subset_of {
        let found = lookup_parent(set, id, unit, name)?;
        if !sups.contains(&found) {
            sups.push(found);
        }
    }
    if sig.is_subset() {
        parent = None;
    }
    set.sig_mut(id).set_parents(parent, sups)
}

fn lookup_parent(set: &ModuleSet, id: SigId, unit: rela_ast::UnitId, name: &str) -> Result<SigId> {
    let sig = set.sig(id);
    let found = match set.lookup_sig_or_param(unit, name).as_slice() {
        [] => {
            return Err(Error::syntax(
                &sig.pos,
                format!(
                    "The parent signature \"{}\" of \"{}\" cannot be found",
                    name,
                    sig.full_name()
                ),
            ));
        }
        [single] => *single,
        _ => {
            return Err(Error::syntax(
                &sig.pos,
                format!(
                    "The parent signature \"{}\" of \"{}\" is ambiguous",
                    name,
                    sig.full_name()
                ),
            ));
        }
    };
    if found == SigId::NONE {
        return Err(Error::syntax(
            &sig.pos,
            format!("The signature \"{}\" cannot have \"none\" as a parent", sig.full_name()),
        ));
    }
    Ok(found)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Visiting,
    Visited,
}

fn visit(
    set: &ModuleSet,
    sig: SigId,
    state: &mut HashMap<SigId, VisitState>,
    order: &mut Vec<SigId>,
) -> Result<()> {
    state.insert(sig, VisitState::Visiting);
    let s = set.sig(sig);
    let deps = s.parent().into_iter().chain(s.sups().iter().copied());
    for dep in deps.filter(|d| !d.is_builtin()) {
        match state.get(&dep) {
            None => visit(set, dep, state, order)?,
            Some(VisitState::Visiting) => {
                let cyclic = set.sig(dep);
                return Err(Error::syntax(
                    &cyclic.pos,
                    format!(
                        "Circular extension detected, involving the signature named \"{}\"",
                        cyclic.full_name()
                    ),
                ));
            }
            Some(VisitState::Visited) => {}
        }
    }
    state.insert(sig, VisitState::Visited);
    order.push(sig);
    Ok(())
}

fn assign_type(set: &mut ModuleSet, id: SigId) -> Result<()> {
    let sig = set.sig(id);
    let (ty, basic) = if sig.is_subset() {
        let mut ty = Type::empty();
        for &sup in sig.sups() {
            if let Some(sup_ty) = set.sig(sup).ty() {
                ty = ty.union(sup_ty);
            }
        }
        (ty, None)
    } else {
        let parent = sig.parent().unwrap_or(SigId::UNIV);
        let Some(parent_basic) = set.sig(parent).basic() else {
            return Err(Error::internal(
                &sig.pos,
                format!("The parent of \"{}\" has no basic type", sig.full_name()),
            ));
        };
        let basic = BasicType::new(id.0, sig.full_name(), parent_basic);
        (Type::unary(basic.clone()), Some(basic))
    };
    set.sig_mut(id).set_type(ty, basic)
}
