//! Name lookup across units

use crate::hir::ModuleSet;
use rela_ast::{SigId, UnitId};

/// Split `a/b/N` into its qualifier and base name
pub fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.rsplit_once('/') {
        Some((qualifier, base)) => (Some(qualifier), base),
        None => (None, name),
    }
}

fn builtin(name: &str) -> Option<SigId> {
    match name {
        "univ" => Some(SigId::UNIV),
        "none" => Some(SigId::NONE),
        "Int" => Some(SigId::INT),
        _ => None,
    }
}

impl ModuleSet {
    /// Follow a chain of open aliases from `unit`. `this` names the unit itself.
    pub fn resolve_qualifier(&self, unit: UnitId, qualifier: &str) -> Option<UnitId> {
        let mut current = unit;
        for segment in qualifier.split('/') {
            if segment == "this" && current == unit {
                continue;
            }
            current = self.unit(current)?.opens.get(segment)?.target;
        }
        Some(current)
    }

    /// The unit itself followed by every unit it opens directly
    pub fn visible_units(&self, unit: UnitId) -> Vec<UnitId> {
        let mut units = vec![unit];
        if let Some(u) = self.unit(unit) {
            for open in u.opens.values() {
                if !units.contains(&open.target) {
                    units.push(open.target);
                }
            }
        }
        units
    }

    /// Every signature a name can denote from inside `unit`: built-ins,
    /// the unit's own signatures and bound parameters, and the signatures
    /// of directly opened units. Qualified names look only inside the
    /// named unit.
    pub fn lookup_sig_or_param(&self, unit: UnitId, name: &str) -> Vec<SigId> {
        if let Some(id) = builtin(name) {
            return vec![id];
        }
        let mut found = Vec::new();
        let mut push = |id: SigId| {
            if !found.contains(&id) {
                found.push(id);
            }
        };
        match split_qualified(name) {
            (Some(qualifier), base) => {
                let Some(target) = self.resolve_qualifier(unit, qualifier).and_then(|t| self.unit(t))
                else {
                    return Vec::new();
                };
                if let Some(&id) = target.sigs.get(base) {
                    push(id);
                }
                if let Some(&Some(id)) = target.params.get(base) {
                    push(id);
                }
            }
            (None, base) => {
                let Some(own) = self.unit(unit) else {
                    return Vec::new();
                };
                if let Some(&id) = own.sigs.get(base) {
                    push(id);
                }
                if let Some(&Some(id)) = own.params.get(base) {
                    push(id);
                }
                for open in own.opens.values() {
                    if let Some(&id) = self.unit(open.target).and_then(|t| t.sigs.get(base)) {
                        push(id);
                    }
                }
            }
        }
        found
    }

    /// Ancestors through both `extends` and `in` edges, nearest first.
    /// Built-in signatures are not included.
    pub fn ancestors(&self, sig: SigId) -> Vec<SigId> {
        let mut out = Vec::new();
        let mut stack = vec![sig];
        while let Some(current) = stack.pop() {
            let s = self.sig(current);
            for &up in s.parent().iter().chain(s.sups()) {
                if !up.is_builtin() && !out.contains(&up) {
                    out.push(up);
                    stack.push(up);
                }
            }
        }
        out
    }

    /// True if `sig` lies strictly below `ancestor`
    pub fn is_descendant(&self, sig: SigId, ancestor: SigId) -> bool {
        sig != ancestor && self.ancestors(sig).contains(&ancestor)
    }

    /// Full name of a signature
    pub fn sig_name(&self, id: SigId) -> &str {
        self.sig(id).full_name()
    }
}
