//! The checking pipeline over a whole module set

use crate::checker::{Root, TypeChecker, add_one};
use rela_ast::{Error, FunId, Result, SigId, UnitId, VarDecl};
use rela_hir::{ModuleSet, Options, TraceSink, bind_params, merge_units, resolve_hierarchy};
use rela_types::Type;

/// Resolve and typecheck every declaration of `set` in place.
///
/// Runs parameter binding, unit merging and hierarchy resolution, then
/// types fields in topological order, function signatures, and finally
/// the bodies, appended facts, facts and assertions of each unit. Stops
/// at the first error. Returns the signatures in topological order.
pub fn check(set: &mut ModuleSet, options: &Options, trace: &mut dyn TraceSink) -> Result<Vec<SigId>> {
    bind_params(set, options, trace)?;
    merge_units(set, options, trace)?;
    let order = resolve_hierarchy(set)?;
    log::debug!("checking {} signatures across {} units", order.len(), set.unit_ids().len());

    for &sig in &order {
        check_fields(set, sig, trace)?;
    }
    for fun in set.live_funs() {
        check_fun_decl(set, fun, trace)?;
    }
    for unit in set.unit_ids() {
        check_unit(set, unit, trace)?;
    }
    Ok(order)
}

fn alias(set: &ModuleSet, unit: UnitId) -> String {
    set.unit(unit).map_or("this", |u| u.primary_alias()).to_string()
}

fn relation_or(ty: &Type, err: impl FnOnce() -> Error) -> Result<()> {
    match ty.arity() {
        Some(_) => Ok(()),
        None => Err(err()),
    }
}

fn check_fields(set: &mut ModuleSet, id: SigId, trace: &mut dyn TraceSink) -> Result<()> {
    let sig = set.sig(id);
    let Some(unit) = sig.unit else {
        return Ok(());
    };
    let Some(sig_ty) = sig.ty().cloned() else {
        return Err(Error::internal(&sig.pos, format!("The signature \"{}\" was never typed", sig.full_name())));
    };
    let (pos, name, decls) = (sig.pos.clone(), sig.name.clone(), sig.decls.clone());
    let unit_alias = alias(set, unit);

    let mut typed_decls = Vec::with_capacity(decls.len());
    let mut typed_fields = set.sig(id).fields.clone();
    let mut index = 0;
    for decl in decls {
        let mut tc = TypeChecker::for_root(set, unit, Root::Field { sig: id, upto: index });
        let value = add_one(tc.resolve(decl.value.clone())?);
        relation_or(value.ty(), || {
            Error::type_error(
                &pos,
                format!("Field declaration must be a set or relation, but its type is {}", value.ty()),
            )
        })?;
        let half = value.ty().clone();
        let full = sig_ty.product_any_emptiness(&half);
        for field_name in &decl.names {
            let Some(field) = typed_fields.get_mut(index) else {
                return Err(Error::internal(&decl.pos, format!("The field \"{}\" has no record", field_name)));
            };
            field.half_type = Some(half.clone());
            field.full_type = Some(full.clone());
            trace.trace(format!("Unit [{}], Sig {}, Field {}: {}", unit_alias, name, field_name, full));
            index += 1;
        }
        typed_decls.push(decl.with_value(value));
        // later fields see the ones just typed
        let sig = set.sig_mut(id);
        sig.fields.clone_from(&typed_fields);
    }
    set.sig_mut(id).decls = typed_decls;
    Ok(())
}

fn check_fun_decl(set: &mut ModuleSet, id: FunId, trace: &mut dyn TraceSink) -> Result<()> {
    let fun = set.fun(id);
    let (unit, name, params, returns) = (fun.unit, fun.name.clone(), fun.params.clone(), fun.returns.clone());
    let unit_alias = alias(set, unit);

    let mut tc = TypeChecker::for_root(set, unit, Root::FunDecl);
    let mut typed_params = Vec::with_capacity(params.len());
    for decl in params {
        let value = add_one(tc.resolve(decl.value.clone())?);
        relation_or(value.ty(), || {
            Error::type_error(
                &value.pos,
                format!("Function parameter must be a set or relation, but its type is {}", value.ty()),
            )
        })?;
        for param in &decl.names {
            tc.bind(param.clone(), value.ty().clone());
            trace.trace(format!("Unit [{}], Pred/Fun {}, Param {}: {}", unit_alias, name, param, value.ty()));
        }
        typed_params.push(decl.with_value(value));
    }
    let returns = match returns {
        Some(returns) => {
            let returns = add_one(tc.resolve(returns)?);
            relation_or(returns.ty(), || {
                Error::type_error(
                    &returns.pos,
                    format!("Function return type must be a set or relation, but its type is {}", returns.ty()),
                )
            })?;
            trace.trace(format!("Unit [{}], Pred/Fun {}, RETURN: {}", unit_alias, name, returns.ty()));
            Some(returns)
        }
        None => None,
    };
    drop(tc);

    let fun = set.fun_mut(id);
    fun.params = typed_params;
    fun.returns = returns;
    Ok(())
}

fn check_unit(set: &mut ModuleSet, unit: UnitId, trace: &mut dyn TraceSink) -> Result<()> {
    let Some(u) = set.unit(unit) else {
        return Ok(());
    };
    let unit_alias = u.primary_alias().to_string();
    let funs: Vec<FunId> = u.funs.values().flatten().copied().collect();
    let sigs: Vec<SigId> = u.sigs.values().copied().collect();

    for id in funs {
        check_body(set, unit, id, &unit_alias, trace)?;
    }
    for id in sigs {
        check_appended(set, unit, id, &unit_alias, trace)?;
    }
    check_facts(set, unit, &unit_alias, false, trace)?;
    check_facts(set, unit, &unit_alias, true, trace)
}

fn bind_all(tc: &mut TypeChecker<'_>, params: &[VarDecl]) {
    for decl in params {
        for name in &decl.names {
            tc.bind(name.clone(), decl.value.ty().clone());
        }
    }
}

fn check_body(set: &mut ModuleSet, unit: UnitId, id: FunId, unit_alias: &str, trace: &mut dyn TraceSink) -> Result<()> {
    let fun = set.fun(id);
    let mut tc = TypeChecker::new(set, unit);
    bind_all(&mut tc, &fun.params);
    let body = tc.resolve(fun.body.clone())?;
    drop(tc);
    let ty = body.ty();
    trace.trace(format!("Unit [{}], Pred/Fun {}, BODY: {}", unit_alias, fun.name, ty));

    match &fun.returns {
        None if !ty.is_bool() => {
            return Err(Error::type_error(
                &fun.pos,
                format!("Predicate body must be a formula, but it has type {}", ty),
            ));
        }
        None => {}
        Some(returns) => {
            let expected = returns.ty();
            relation_or(ty, || {
                Error::type_error(
                    &fun.pos,
                    format!("Function body must be a set or relation, but its type is {}", ty),
                )
            })?;
            if ty.arity() != expected.arity() {
                return Err(Error::type_error(
                    &fun.pos,
                    format!("Function body has type {} but the return type must be {}", ty, expected),
                ));
            }
            if ty.intersect(expected).has_no_tuple() {
                return Err(Error::type_error(
                    &fun.pos,
                    format!(
                        "Function return value is disjoint from its return type! Function body has type {} but the return type must be {}",
                        ty, expected
                    ),
                ));
            }
        }
    }
    set.fun_mut(id).body = body;
    Ok(())
}

fn check_appended(set: &mut ModuleSet, unit: UnitId, id: SigId, unit_alias: &str, trace: &mut dyn TraceSink) -> Result<()> {
    let sig = set.sig(id);
    let (Some(facts), Some(sig_ty)) = (sig.facts.clone(), sig.ty().cloned()) else {
        return Ok(());
    };
    let mut tc = TypeChecker::for_root(set, unit, Root::SigFact(id));
    tc.bind("this", sig_ty);
    let facts = tc.resolve(facts)?;
    drop(tc);

    let sig = set.sig(id);
    if !facts.ty().is_bool() {
        return Err(Error::type_error(
            &sig.pos,
            format!("Appended facts must be a formula, but it has type {}", facts.ty()),
        ));
    }
    trace.trace(format!("Unit [{}], Sig {}, Appended: {}", unit_alias, sig.name, facts.ty()));
    set.sig_mut(id).facts = Some(facts);
    Ok(())
}

fn check_facts(set: &mut ModuleSet, unit: UnitId, unit_alias: &str, asserts: bool, trace: &mut dyn TraceSink) -> Result<()> {
    let Some(u) = set.unit(unit) else {
        return Ok(());
    };
    let facts = if asserts { u.asserts.clone() } else { u.facts.clone() };
    let (label, kind) = if asserts { ("Assert", "Assertion") } else { ("Fact", "Fact") };

    let mut typed = Vec::with_capacity(facts.len());
    for mut fact in facts {
        let value = TypeChecker::new(set, unit).resolve(fact.value)?;
        trace.trace(format!("Unit [{}], {} [{}]: {}", unit_alias, label, fact.name, value.ty()));
        if !value.ty().is_bool() {
            return Err(Error::type_error(
                &fact.pos,
                format!("{} must be a formula, but it has type {}", kind, value.ty()),
            ));
        }
        fact.value = value;
        typed.push(fact);
    }
    if let Some(u) = set.unit_mut(unit) {
        if asserts {
            u.asserts = typed;
        } else {
            u.facts = typed;
        }
    }
    Ok(())
}
