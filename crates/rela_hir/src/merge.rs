//! Merging module instances that denote the same logical module

use crate::hir::ModuleSet;
use crate::options::Options;
use crate::trace::TraceSink;
use rela_ast::{Error, Pos, Result, SigId, UnitId};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Merge units with the same path and the same parameter bindings until
/// no two such units remain.
pub fn merge_units(set: &mut ModuleSet, options: &Options, trace: &mut dyn TraceSink) -> Result<()> {
    for round in 0..options.max_fixpoint_rounds {
        match find_duplicate(set) {
            Some((keep, drop)) => merge_pair(set, keep, drop, trace),
            None => {
                log::trace!("unit merging settled after {} rounds", round + 1);
                return Ok(());
            }
        }
    }
    Err(Error::internal(
        &Pos::unknown(),
        format!(
            "Unit merging did not settle within {} rounds",
            options.max_fixpoint_rounds
        ),
    ))
}

/// Shorter aliases first, then lexicographic
pub fn alias_order(a: &String, b: &String) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn find_duplicate(set: &ModuleSet) -> Option<(UnitId, UnitId)> {
    let units: Vec<_> = set.units().collect();
    for (i, a) in units.iter().enumerate() {
        for b in &units[i + 1..] {
            if a.path == b.path && a.params == b.params {
                return Some((a.id, b.id));
            }
        }
    }
    None
}

fn merge_pair(set: &mut ModuleSet, keep: UnitId, drop: UnitId, trace: &mut dyn TraceSink) {
    let Some(dropped) = set.remove_unit(drop) else {
        return;
    };
    trace.trace(format!("MATCH FOUND ON {}", dropped.path));

    let mut renamed: HashMap<SigId, SigId> = HashMap::new();
    if let Some(kept) = set.unit_mut(keep) {
        kept.aliases.extend(dropped.aliases.iter().cloned());
        kept.aliases.sort_by(alias_order);
        kept.aliases.dedup();
        for (name, &old) in &dropped.sigs {
            if let Some(&new) = kept.sigs.get(name) {
                renamed.insert(old, new);
            }
        }
    }
    refresh_full_names(set, keep);

    for unit in set.units_mut() {
        for bound in unit.params.values_mut() {
            if let Some(new) = bound.and_then(|sig| renamed.get(&sig).copied()) {
                *bound = Some(new);
            }
        }
        for open in unit.opens.values_mut() {
            if open.target == drop {
                open.target = keep;
            }
        }
    }
}

/// Recompute `alias/name` for a unit's signatures after its aliases changed
fn refresh_full_names(set: &mut ModuleSet, unit: UnitId) {
    let Some(u) = set.unit(unit) else {
        return;
    };
    let alias = u.primary_alias().to_string();
    let sigs: Vec<SigId> = u.sigs.values().copied().collect();
    for id in sigs {
        let sig = set.sig_mut(id);
        sig.set_full_name(format!("{}/{}", alias, sig.name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::SigDecl;
    use crate::params::bind_params;

    /// main opens util[S] twice, under two aliases
    fn double_import(first: &str, second: &str) -> (ModuleSet, UnitId) {
        let mut set = ModuleSet::new();
        let root = set.add_unit("main.als", "");
        let m1 = set.add_unit("util.als", first);
        let m2 = set.add_unit("util.als", second);
        for m in [m1, m2] {
            set.add_param(m, "T");
            set.add_sig(m, SigDecl::new(Pos::unknown(), "Node"));
        }
        set.add_sig(root, SigDecl::new(Pos::unknown(), "S"));
        set.add_open(root, Pos::unknown(), first, m1, &["S"]);
        set.add_open(root, Pos::unknown(), second, m2, &["S"]);
        (set, root)
    }

    fn run(set: &mut ModuleSet) -> Vec<String> {
        let mut lines = Vec::new();
        bind_params(set, &Options::default(), &mut lines).unwrap();
        merge_units(set, &Options::default(), &mut lines).unwrap();
        lines
    }

    #[test]
    fn test_identical_imports_collapse() {
        let (mut set, root) = double_import("m", "other");
        let lines = run(&mut set);
        assert!(lines.contains(&"MATCH FOUND ON util.als".to_string()));

        let utils: Vec<_> = set.units().filter(|u| u.path == "util.als").collect();
        assert_eq!(utils.len(), 1);
        assert_eq!(utils[0].aliases, vec!["m".to_string(), "other".to_string()]);

        let via_m = set.lookup_sig_or_param(root, "m/Node");
        let via_other = set.lookup_sig_or_param(root, "other/Node");
        assert_eq!(via_m, via_other);
        assert_eq!(set.sig_name(via_m[0]), "m/Node");
    }

    #[test]
    fn test_merge_is_order_independent() {
        let (mut forward, _) = double_import("a", "bb");
        let (mut backward, _) = double_import("bb", "a");
        run(&mut forward);
        run(&mut backward);
        let shape = |set: &ModuleSet| {
            let mut units: Vec<_> = set.units().map(|u| (u.path.clone(), u.aliases.clone())).collect();
            units.sort();
            units
        };
        assert_eq!(shape(&forward), shape(&backward));
    }

    #[test]
    fn test_different_arguments_stay_apart() {
        let mut set = ModuleSet::new();
        let root = set.add_unit("main.als", "");
        let m1 = set.add_unit("util.als", "x");
        let m2 = set.add_unit("util.als", "y");
        set.add_param(m1, "T");
        set.add_param(m2, "T");
        set.add_sig(root, SigDecl::new(Pos::unknown(), "S"));
        set.add_sig(root, SigDecl::new(Pos::unknown(), "R"));
        set.add_open(root, Pos::unknown(), "x", m1, &["S"]);
        set.add_open(root, Pos::unknown(), "y", m2, &["R"]);
        run(&mut set);
        assert_eq!(set.units().filter(|u| u.path == "util.als").count(), 2);
    }

    #[test]
    fn test_alias_order() {
        let mut aliases = vec!["bb".to_string(), "c".to_string(), "a".to_string()];
        aliases.sort_by(alias_order);
        assert_eq!(aliases, vec!["a", "c", "bb"]);
    }
}
