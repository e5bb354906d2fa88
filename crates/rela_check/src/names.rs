//! Name lookup, overloaded calls and the built-in forms of join chains

use crate::checker::{Root, TypeChecker, cset, ensure_resolved, is_bad};
use crate::infer::constant_type;
use rela_ast::{
    BinaryOp, Constant, Error, Expr, ExprKind, FunId, NameTarget, Pos, Result, SigId, Typing,
    UnaryOp, UnitId,
};
use rela_hir::{Fun, split_qualified};
use rela_types::Type;

/// Something a name may denote
#[derive(Debug, Clone)]
pub(crate) enum Candidate {
    /// A fully typed interpretation: signature, field, local, nullary call
    Expr(Expr),
    /// A function or predicate that takes arguments
    Fun(FunId),
}

const LEGACY_KEYWORDS: [&str; 6] = ["disj", "disjoint", "exh", "exhaustive", "part", "partition"];

fn check_name(pos: &Pos, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::syntax(pos, "The name of a variable must not be empty!"));
    }
    if name == "@" {
        return Err(Error::syntax(pos, "The name of a variable must not be \"@\""));
    }
    if name.rfind('@').is_some_and(|i| i > 0) {
        return Err(Error::syntax(
            pos,
            "If a variable name contains @, it must be the first character!",
        ));
    }
    Ok(())
}

fn not_found(pos: &Pos, name: &str) -> Error {
    let mut message = format!("The name \"{}\" cannot be found.", name);
    if LEGACY_KEYWORDS.contains(&name) {
        message.push_str(&format!(
            " If you are migrating an older model, please see the documentation on how to translate models that use the \"{}\" keyword.",
            name
        ));
    }
    Error::syntax(pos, message)
}

/// Whether a candidate of type `candidate` can serve where `demand` is required
fn fits(demand: &Type, candidate: &Type) -> bool {
    demand == candidate
        || (!demand.is_int() && !demand.is_bool() && demand.has_no_tuple())
        || (demand.is_int() && candidate.is_int())
        || (demand.is_bool() && candidate.is_bool())
        || demand.intersect(candidate).has_tuple()
}

/// Whether every argument may flow into the matching parameter
fn applicable(fun: &Fun, args: &[Expr]) -> bool {
    fun.param_types().zip(args).all(|(param, arg)| {
        let arg = arg.ty();
        arg.size() == 0
            || param.size() == 0
            || ((arg.has_no_tuple() || param.has_no_tuple()) && arg.arity() == param.arity())
            || arg.intersect(param).has_tuple()
    })
}

impl TypeChecker<'_> {
    /// Bounding pass for a plain name
    pub(crate) fn infer_name(&mut self, pos: Pos, name: String) -> Result<Expr> {
        check_name(&pos, &name)?;
        let choices = match self.scope.lookup(&name) {
            Some(ty) => {
                let local = ExprKind::Name { name: name.clone(), target: Some(NameTarget::Local) };
                vec![Expr::new(pos.clone(), local).resolved(ty.clone())]
            }
            None => {
                let candidates = self.populate(&pos, &name)?;
                if candidates.is_empty() {
                    return Err(not_found(&pos, &name));
                }
                candidates
                    .into_iter()
                    .filter_map(|c| match c {
                        Candidate::Expr(e) => Some(e),
                        Candidate::Fun(_) => None,
                    })
                    .collect()
            }
        };
        let ty = choices.iter().map(Expr::ty).fold(None, |acc: Option<Type>, ty| {
            Some(acc.map_or_else(|| ty.clone(), |acc| acc.merge(ty)))
        });
        match ty {
            Some(ty) if !is_bad(&ty) => {
                Ok(Expr::name(pos, name).with_typing(Typing::Unresolved { ty, choices }))
            }
            _ => Err(Error::type_error(
                &pos,
                format!("The name \"{}\" failed to be typechecked here!", name),
            )),
        }
    }

    /// Relevant pass for an overloaded node: keep the one interpretation
    /// that fits the demand.
    pub(crate) fn narrow_name(&self, pos: &Pos, name: &str, choices: Vec<Expr>, demand: &Type) -> Result<Expr> {
        ensure_resolved(demand, pos)?;
        let mut found: Option<Expr> = None;
        for choice in choices {
            if !fits(demand, choice.ty()) {
                continue;
            }
            if let Some(previous) = &found {
                return Err(Error::type_error(
                    pos,
                    format!(
                        "The name \"{}\" is ambiguous here due to multiple match: {} and {}",
                        name,
                        self.describe(previous),
                        self.describe(&choice)
                    ),
                ));
            }
            found = Some(choice);
        }
        found.ok_or_else(|| {
            Error::type_error(
                pos,
                format!("The name \"{}\" failed to be typechecked here due to no match!", name),
            )
        })
    }

    /// Every interpretation of a name that is not bound locally
    pub(crate) fn populate(&self, pos: &Pos, name: &str) -> Result<Vec<Candidate>> {
        check_name(pos, name)?;
        let raw_field = name.starts_with('@');
        let lookup = name.trim_start_matches('@');
        let mut out = Vec::new();

        for sig in self.set.lookup_sig_or_param(self.unit, lookup) {
            if matches!(self.root, Root::Field { sig: owner, .. } if self.set.is_descendant(sig, owner)) {
                continue;
            }
            let Some(ty) = self.set.sig(sig).ty() else {
                return Err(Error::internal(
                    pos,
                    format!("The signature \"{}\" has no type yet", self.set.sig_name(sig)),
                ));
            };
            let kind = ExprKind::Name { name: name.to_string(), target: Some(NameTarget::Sig(sig)) };
            out.push(Candidate::Expr(Expr::new(pos.clone(), kind).resolved(ty.clone())));
        }

        let (qualifier, base) = split_qualified(lookup);
        let units: Vec<UnitId> = match qualifier {
            Some(q) => self.set.resolve_qualifier(self.unit, q).into_iter().collect(),
            None => self.set.visible_units(self.unit),
        };

        for &unit in &units {
            let Some(u) = self.set.unit(unit) else { continue };
            for &owner in u.sigs.values() {
                let sig = self.set.sig(owner);
                for (index, field) in sig.fields.iter().enumerate() {
                    if field.name != base || !self.field_visible(owner, index) {
                        continue;
                    }
                    let Some(full) = &field.full_type else { continue };
                    let target = NameTarget::Field { sig: owner, index };
                    let kind = ExprKind::Name { name: name.to_string(), target: Some(target) };
                    let field_expr = Expr::new(pos.clone(), kind).resolved(full.clone());
                    out.push(Candidate::Expr(self.through_this(pos, owner, field_expr, raw_field)));
                }
            }
        }

        if !matches!(self.root, Root::Field { .. } | Root::FunDecl) {
            for &unit in &units {
                let Some(ids) = self.set.unit(unit).and_then(|u| u.funs.get(base)) else {
                    continue;
                };
                for &id in ids {
                    let fun = self.set.fun(id);
                    if fun.arg_count() > 0 {
                        out.push(Candidate::Fun(id));
                        continue;
                    }
                    let call = ExprKind::Call { fun: id, args: Vec::new() };
                    out.push(Candidate::Expr(Expr::new(pos.clone(), call).resolved(fun.result_type())));
                }
            }
        }

        if name == "iden" {
            let iden = Expr::constant(pos.clone(), Constant::Iden);
            out.push(Candidate::Expr(iden.resolved(constant_type(Constant::Iden))));
        }
        Ok(out)
    }

    fn field_visible(&self, owner: SigId, index: usize) -> bool {
        match self.root {
            Root::Field { sig, upto } => {
                (owner == sig && index < upto) || self.set.is_descendant(sig, owner)
            }
            _ => true,
        }
    }

    /// Inside the appended facts of a signature, its own and inherited
    /// fields are implicitly joined with `this` unless written `@f`.
    fn through_this(&self, pos: &Pos, owner: SigId, field: Expr, raw: bool) -> Expr {
        let Root::SigFact(sig) = self.root else {
            return field;
        };
        if raw || !(owner == sig || self.set.is_descendant(sig, owner)) {
            return field;
        }
        let Some(this_ty) = self.scope.lookup("this") else {
            return field;
        };
        let this = ExprKind::Name { name: "this".to_string(), target: Some(NameTarget::Local) };
        let this = Expr::new(pos.clone(), this).resolved(this_ty.clone());
        let ty = this.ty().join(field.ty());
        Expr::join(this, field).resolved(ty)
    }

    /// Bounding pass for `left.right`, including the built-in `int[e]`,
    /// `Int[e]` and `disj[...]` forms and calls written as join chains
    pub(crate) fn infer_join(&mut self, pos: Pos, left: Expr, right: Expr) -> Result<Expr> {
        let mut arity = 1;
        let mut head = &right;
        while let ExprKind::Join { right, .. } = &head.kind {
            arity += 1;
            head = right;
        }
        let callee = match &head.kind {
            ExprKind::Name { name, .. } if !self.scope.contains(name) => {
                Some((name.clone(), head.pos.clone()))
            }
            _ => None,
        };

        if let Some((name, name_pos)) = callee {
            if arity == 1 && name == "int" {
                let args = self.resolve_args(&left, &right)?;
                return self.int_sum(name_pos, args);
            }
            if arity > 1 && name == "disj" {
                let args = self.resolve_args(&left, &right)?;
                return disjoint(&pos, args);
            }
            let candidates = self.populate(&name_pos, &name)?;
            let callable = candidates.iter().any(|c| {
                matches!(c, Candidate::Fun(id) if self.set.fun(*id).arg_count() == arity)
            });
            if callable {
                let args = self.resolve_args(&left, &right)?;
                if let Some(call) = self.overloaded_call(&pos, &name_pos, &name, candidates, &args) {
                    return Ok(call);
                }
            }
        }

        let int_cast = matches!(&right.kind, ExprKind::Name { name, .. } if name == "Int" && !self.scope.contains(name));
        let saved = int_cast.then(|| left.clone());
        let mut left = self.infer(left)?;
        let right = self.infer(right)?;
        if let Some(saved) = saved.filter(|_| left.ty().is_int()) {
            left = self.resolve(saved)?;
            if left.ty().is_int() {
                let ty = self.int_type().clone();
                return Ok(Expr::unary(right.pos.clone(), UnaryOp::IntToAtom, left).resolved(ty));
            }
        }
        cset(&left)?;
        cset(&right)?;
        let ty = left.ty().join(right.ty());
        if ty.has_no_tuple() {
            return Err(Error::type_error(
                &pos,
                format!(
                    "The join operation here always yields an empty set! LeftType={} RightType={}",
                    left.ty(),
                    right.ty()
                ),
            ));
        }
        let kind = ExprKind::Join { left: Box::new(left), right: Box::new(right) };
        Ok(Expr::new(pos, kind).with_typing(Typing::Bounding(ty)))
    }

    /// Fully resolve the arguments of a join chain `an. ... .a1.f`,
    /// innermost first
    fn resolve_args(&mut self, left: &Expr, right: &Expr) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        let first = self.resolve(left.clone())?;
        cset(&first)?;
        args.push(first);
        let mut head = right;
        while let ExprKind::Join { left, right } = &head.kind {
            let arg = self.resolve((**left).clone())?;
            cset(&arg)?;
            args.push(arg);
            head = right;
        }
        args.reverse();
        Ok(args)
    }

    fn int_sum(&self, pos: Pos, mut args: Vec<Expr>) -> Result<Expr> {
        let Some(arg) = args.pop() else {
            return Err(Error::internal(&pos, "int[] applied to no argument"));
        };
        if arg.ty().intersect(self.int_type()).has_no_tuple() {
            return Err(Error::type_error(
                &arg.pos,
                format!(
                    "This expression must contain integer atoms! Instead, its possible type(s) are: {}",
                    arg.ty()
                ),
            ));
        }
        Ok(Expr::unary(pos, UnaryOp::Sum, arg).resolved(Type::int()))
    }

    /// Every way of reading `args.name` as a call of a function or
    /// predicate, possibly followed by joins with the remaining
    /// arguments, or as a plain join with a field or signature.
    fn overloaded_call(
        &self,
        pos: &Pos,
        name_pos: &Pos,
        name: &str,
        candidates: Vec<Candidate>,
        args: &[Expr],
    ) -> Option<Expr> {
        let mut choices = Vec::new();
        let mut ty: Option<Type> = None;
        for candidate in candidates {
            let (mut result, consumed) = match candidate {
                Candidate::Expr(e) => (e, 0),
                Candidate::Fun(id) => {
                    let fun = self.set.fun(id);
                    let argc = fun.arg_count();
                    if argc > args.len() || (argc < args.len() && fun.is_pred()) || !applicable(fun, args) {
                        continue;
                    }
                    let call = ExprKind::Call { fun: id, args: args[..argc].to_vec() };
                    (Expr::new(name_pos.clone(), call).resolved(fun.result_type()), argc)
                }
            };
            for arg in &args[consumed..] {
                let joined = arg.ty().join(result.ty());
                result = Expr::join(arg.clone(), result).resolved(joined);
            }
            if !result.ty().is_bool() && result.ty().has_no_tuple() {
                continue;
            }
            ty = Some(match ty {
                None => result.ty().clone(),
                Some(acc) => acc.merge(result.ty()),
            });
            choices.push(result);
        }
        let ty = ty?;
        log::trace!("{} reads as {} interpretation(s) of {}", pos, choices.len(), name);
        Some(Expr::name(pos.clone(), name).with_typing(Typing::Unresolved { ty, choices }))
    }

    /// Short human-readable form of an interpretation, for diagnostics
    pub(crate) fn describe(&self, expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Name { target: Some(NameTarget::Sig(sig)), .. } => {
                format!("sig {}", self.set.sig_name(*sig))
            }
            ExprKind::Name { name, target: Some(NameTarget::Field { sig, .. }) } => {
                format!("field {} <: {}", self.set.sig_name(*sig), name.trim_start_matches('@'))
            }
            ExprKind::Name { name, .. } => name.clone(),
            ExprKind::Call { fun, .. } => {
                let fun = self.set.fun(*fun);
                let kind = if fun.is_pred() { "pred" } else { "fun" };
                format!("{} {}", kind, fun.name)
            }
            ExprKind::Join { left, right } => {
                format!("{}.{}", self.describe(left), self.describe(right))
            }
            ExprKind::Constant(c) => c.to_string(),
            _ => expr.ty().to_string(),
        }
    }
}

/// `disj[a, b, ...]`: the conjunction of `no (x & y)` over every pair
fn disjoint(pos: &Pos, args: Vec<Expr>) -> Result<Expr> {
    let arity = args.first().and_then(|a| a.ty().arity());
    if args.iter().any(|a| a.ty().arity() != arity) {
        return Err(Error::type_error(
            pos,
            "The builtin disj[] predicate can only accept arguments of the same arity!",
        ));
    }
    let mut answer = Expr::constant(pos.clone(), Constant::True).resolved(Type::formula());
    for (i, a) in args.iter().enumerate() {
        for b in &args[i + 1..] {
            let overlap_ty = a.ty().intersect(b.ty());
            let overlap = Expr::binary(BinaryOp::Intersect, a.clone(), b.clone()).resolved(overlap_ty);
            let none = Expr::unary(overlap.pos.clone(), UnaryOp::No, overlap).resolved(Type::formula());
            answer = Expr::binary(BinaryOp::And, none, answer).resolved(Type::formula());
        }
    }
    Ok(answer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{at, model};
    use rela_ast::VarDecl;
    use rela_hir::{ModuleSet, Options, SigDecl};

    #[test]
    fn test_name_validity() {
        assert!(check_name(&at(0), "").is_err());
        assert!(check_name(&at(0), "@").is_err());
        assert!(check_name(&at(0), "a@b").is_err());
        assert!(check_name(&at(0), "@f").is_ok());
        assert!(check_name(&at(0), "m/A").is_ok());
    }

    #[test]
    fn test_not_found_hints_legacy_keywords() {
        let plain = not_found(&at(0), "Nope");
        assert_eq!(plain.message(), "The name \"Nope\" cannot be found.");
        let legacy = not_found(&at(0), "partition");
        assert!(legacy.message().contains("\"partition\" keyword"));
        assert!(matches!(legacy, Error::Syntax { .. }));
    }

    #[test]
    fn test_unknown_name_is_syntax_error() {
        let (set, root) = model();
        let mut tc = TypeChecker::new(&set, root);
        let err = tc.resolve(Expr::name(at(0), "disj")).unwrap_err();
        assert!(matches!(err, Error::Syntax { .. }));
        assert!(err.message().contains("keyword"));
    }

    #[test]
    fn test_fits_rules() {
        let (set, root) = model();
        let a = set.sig(set.lookup_sig_or_param(root, "A")[0]).ty().unwrap().clone();
        let b = set.sig(set.lookup_sig_or_param(root, "B")[0]).ty().unwrap().clone();
        assert!(fits(&a, &a));
        assert!(!fits(&a, &b));
        assert!(fits(&Type::empty(), &b));
        assert!(fits(&Type::int(), &Type::int()));
        assert!(fits(&Type::formula(), &Type::formula()));
        assert!(!fits(&Type::int(), &a));
    }

    #[test]
    fn test_local_shadows_signature() {
        let (set, root) = model();
        let mut tc = TypeChecker::new(&set, root);
        let b_ty = tc.resolve(Expr::name(at(0), "B")).unwrap().ty().clone();
        tc.bind("A", b_ty.clone());
        let e = tc.resolve(Expr::name(at(1), "A")).unwrap();
        assert_eq!(e.ty(), &b_ty);
        assert!(matches!(e.kind, ExprKind::Name { target: Some(NameTarget::Local), .. }));
    }

    #[test]
    fn test_function_call_through_join() {
        let (set, root) = model();
        let mut tc = TypeChecker::new(&set, root);
        let call = Expr::apply(at(0), Expr::name(at(1), "g"), vec![Expr::name(at(2), "A")]);
        let e = tc.resolve(call).unwrap();
        assert!(matches!(e.kind, ExprKind::Call { ref args, .. } if args.len() == 1));
        assert_eq!(e.ty().to_string(), "{this/B}");
        assert!(e.is_fully_resolved());
    }

    #[test]
    fn test_predicate_call_is_formula() {
        let (set, root) = model();
        let mut tc = TypeChecker::new(&set, root);
        let call = Expr::apply(at(0), Expr::name(at(1), "p"), vec![Expr::name(at(2), "C")]);
        let e = tc.resolve(call).unwrap();
        assert_eq!(e.ty(), &Type::formula());
    }

    #[test]
    fn test_predicate_with_extra_argument_is_skipped() {
        let (set, root) = model();
        let mut tc = TypeChecker::new(&set, root);
        let call = Expr::apply(
            at(0),
            Expr::name(at(1), "p"),
            vec![Expr::name(at(2), "A"), Expr::name(at(3), "B")],
        );
        assert!(tc.resolve(call).is_err());
    }

    #[test]
    fn test_int_sum_and_int_cast() {
        let (set, root) = model();
        let mut tc = TypeChecker::new(&set, root);
        let sum = Expr::apply(at(0), Expr::name(at(1), "int"), vec![Expr::name(at(2), "Int")]);
        let e = tc.resolve(sum).unwrap();
        assert!(matches!(e.kind, ExprKind::Unary { op: UnaryOp::Sum, .. }));
        assert!(e.ty().is_int());

        let count = Expr::unary(at(3), UnaryOp::Cardinality, Expr::name(at(4), "A"));
        let cast = Expr::apply(at(5), Expr::name(at(6), "Int"), vec![count]);
        let e = tc.resolve(cast).unwrap();
        assert!(matches!(e.kind, ExprKind::Unary { op: UnaryOp::IntToAtom, .. }));
        assert_eq!(e.ty(), set.int_type());

        let bad = Expr::apply(at(0), Expr::name(at(1), "int"), vec![Expr::name(at(2), "A")]);
        assert!(tc.resolve(bad).unwrap_err().message().contains("integer atoms"));
    }

    #[test]
    fn test_disj_expands_pairwise() {
        let (set, root) = model();
        let mut tc = TypeChecker::new(&set, root);
        let e = Expr::apply(
            at(0),
            Expr::name(at(1), "disj"),
            vec![Expr::name(at(2), "A"), Expr::name(at(3), "C"), Expr::name(at(4), "B")],
        );
        let e = tc.resolve(e).unwrap();
        assert_eq!(e.ty(), &Type::formula());
        let mut nos = 0;
        e.any(&mut |n| {
            if matches!(n.kind, ExprKind::Unary { op: UnaryOp::No, .. }) {
                nos += 1;
            }
            false
        });
        assert_eq!(nos, 3);

        let mixed = Expr::apply(
            at(0),
            Expr::name(at(1), "disj"),
            vec![Expr::name(at(2), "A"), Expr::name(at(3), "f")],
        );
        assert!(tc.resolve(mixed).unwrap_err().message().contains("same arity"));
    }

    #[test]
    fn test_iden_is_a_candidate() {
        let (set, root) = model();
        let mut tc = TypeChecker::new(&set, root);
        let e = tc.resolve(Expr::name(at(0), "iden")).unwrap();
        assert!(matches!(e.kind, ExprKind::Constant(Constant::Iden)));
    }

    #[test]
    fn test_describe_candidates() {
        let (set, root) = model();
        let tc = TypeChecker::new(&set, root);
        let candidates = tc.populate(&at(0), "f").unwrap();
        let [Candidate::Expr(field)] = candidates.as_slice() else {
            panic!("expected exactly the field");
        };
        assert_eq!(tc.describe(field), "field this/A <: f");
    }

    /// ```text
    /// sig P {}
    /// sig X extends P { f: P }
    /// sig Y extends P { f: P }
    /// ```
    #[test]
    fn test_sibling_fields_sharing_a_name_are_ambiguous() {
        let mut set = ModuleSet::new();
        let root = set.add_unit("model.als", "");
        set.add_sig(root, SigDecl::new(at(0), "P"));
        for (offset, child) in [(1, "X"), (4, "Y")] {
            let f = VarDecl::new(at(offset + 1), &["f"], Expr::name(at(offset + 2), "P"));
            set.add_sig(root, SigDecl::new(at(offset), child).extends("P").field(f));
        }
        crate::check(&mut set, &Options::default(), &mut Vec::<String>::new()).unwrap();

        let mut tc = TypeChecker::new(&set, root);
        let p_f = Expr::join(Expr::name(at(7), "P"), Expr::name(at(8), "f"));
        let err = tc.resolve(p_f).unwrap_err();
        assert!(matches!(err, Error::Type { .. }));
        assert_eq!(
            err.message(),
            "The name \"f\" is ambiguous here due to multiple match: field this/X <: f and field this/Y <: f"
        );
    }
}
