//! Binding the formal parameters of opened modules

use crate::hir::ModuleSet;
use crate::options::Options;
use crate::trace::TraceSink;
use rela_ast::{Error, Pos, Result, SigId};

/// Bind every formal parameter to the signature named by the matching
/// `open` argument, repeating until a round makes no progress.
pub fn bind_params(set: &mut ModuleSet, options: &Options, trace: &mut dyn TraceSink) -> Result<()> {
    for round in 0..options.max_fixpoint_rounds {
        if !bind_round(set, trace)? {
            log::trace!("parameter binding settled after {} rounds", round + 1);
            return Ok(());
        }
    }
    Err(Error::internal(
        &Pos::unknown(),
        format!(
            "Parameter binding did not settle within {} rounds",
            options.max_fixpoint_rounds
        ),
    ))
}

/// One pass over every open directive. Returns whether anything was bound.
fn bind_round(set: &mut ModuleSet, trace: &mut dyn TraceSink) -> Result<bool> {
    let mut changed = false;
    let mut missing: Option<Pos> = None;

    for unit in set.unit_ids() {
        let opens: Vec<_> = match set.unit(unit) {
            Some(u) => u.opens.iter().map(|(alias, open)| (alias.clone(), open.clone())).collect(),
            None => continue,
        };
        let unit_pos = set.unit(unit).map(|u| u.pos.clone()).unwrap_or_else(Pos::unknown);

        for (alias, open) in opens {
            let Some(target) = set.unit(open.target) else {
                return Err(Error::internal(
                    &open.pos,
                    format!("The module opened as \"{}\" no longer exists", alias),
                ));
            };
            let path = target.path.clone();
            let formals: Vec<(String, Option<SigId>)> =
                target.params.iter().map(|(k, v)| (k.clone(), *v)).collect();

            if open.args.len() != formals.len() {
                return Err(Error::syntax(
                    &unit_pos,
                    format!(
                        "To import the \"{}\" module, you must provide exactly {} parameters!",
                        path,
                        formals.len()
                    ),
                ));
            }

            for ((formal, old), actual) in formals.into_iter().zip(&open.args) {
                let candidates = set.lookup_sig_or_param(unit, actual);
                let bound = match candidates.as_slice() {
                    [] => {
                        if old.is_none() {
                            missing = Some(open.pos.clone());
                        }
                        continue;
                    }
                    [single] => *single,
                    _ => {
                        return Err(Error::syntax(
                            &unit_pos,
                            format!(
                                "Failed to import the \"{}\" module, because the signature named \"{}\" is ambiguous",
                                path, actual
                            ),
                        ));
                    }
                };
                if old == Some(bound) {
                    continue;
                }
                if old.is_some() {
                    return Err(Error::syntax(
                        &unit_pos,
                        format!(
                            "Failed to import the \"{}\" module, because it is being imported more than once, with different arguments!",
                            path
                        ),
                    ));
                }
                if bound == SigId::NONE {
                    return Err(Error::syntax(
                        &unit_pos,
                        format!(
                            "Failed to import the \"{}\" module, because you cannot use \"none\" as an instantiating argument!",
                            path
                        ),
                    ));
                }
                if let Some(target) = set.unit_mut(open.target) {
                    target.params.insert(formal.clone(), Some(bound));
                }
                changed = true;
                trace.trace(format!("RESOLVE: {}/{} := {}", alias, formal, set.sig_name(bound)));
            }
        }
    }

    match missing {
        Some(pos) if !changed => Err(Error::syntax(
            &pos,
            "Failed to import the module, because one of the instantiating signature cannot be found",
        )),
        _ => Ok(changed),
    }
}
