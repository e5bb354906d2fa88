//! Relevant pass: narrow each node to what its parent can use

use crate::checker::{TypeChecker, cform_type, cset_type, ensure_resolved};
use crate::closure::narrow_closure;
use crate::infer::constant_type;
use rela_ast::{BinaryOp, Constant, Error, Expr, ExprKind, Pos, QuantOp, Result, Typing, UnaryOp, VarDecl};
use rela_types::{Rel, Type};

fn narrowed(pos: Pos, kind: ExprKind, ty: Type) -> Expr {
    Expr::new(pos, kind).with_typing(Typing::Resolved(ty))
}

impl TypeChecker<'_> {
    /// Narrow a node from the bounding pass to `demand`, the type its
    /// parent can use, choosing one interpretation for every overloaded
    /// name on the way down.
    pub fn narrow(&mut self, expr: Expr, demand: &Type) -> Result<Expr> {
        let Expr { pos, kind, typing } = expr;
        let own = match typing {
            Typing::Bounding(ty) => ty,
            Typing::Resolved(ty) => {
                log::trace!("relevant pass: {} already resolved", pos);
                return Ok(Expr::new(pos, kind).resolved(ty));
            }
            Typing::Unresolved { choices, .. } => {
                let name = match &kind {
                    ExprKind::Name { name, .. } => name.as_str(),
                    _ => "",
                };
                let chosen = self.narrow_name(&pos, name, choices, demand)?;
                return self.narrow(chosen, demand);
            }
            Typing::Untyped => {
                return Err(Error::internal(&pos, "This expression has not been through the bounding pass"));
            }
        };
        match kind {
            ExprKind::Constant(c) => narrow_constant(pos, c, demand),
            ExprKind::Binary { op, left, right } => self.narrow_binary(pos, op, *left, *right, demand),
            ExprKind::Join { left, right } => self.narrow_join(pos, *left, *right, demand),
            ExprKind::Unary { op, sub } => self.narrow_unary(pos, op, *sub, demand),
            ExprKind::Ite { cond, then, els } => self.narrow_ite(pos, *cond, *then, *els, demand),
            ExprKind::Let { name, value, body } => {
                ensure_resolved(demand, &pos)?;
                let body = self.scoped(|tc| {
                    tc.scope.define(name.clone(), value.ty().clone());
                    tc.narrow(*body, demand)
                })?;
                let kind = ExprKind::Let { name, value, body: Box::new(body) };
                Ok(narrowed(pos, kind, demand.clone()))
            }
            ExprKind::Quant { op, decls, body } => self.narrow_quant(pos, op, decls, *body, demand),
            ExprKind::Sequence(list) => {
                cform_type(demand, &pos)?;
                let mut items = Vec::with_capacity(list.len());
                for item in list {
                    let own = item.ty().clone();
                    items.push(self.narrow(item, &own)?);
                }
                Ok(narrowed(pos, ExprKind::Sequence(items), Type::formula()))
            }
            ExprKind::Name { name, .. } => Err(Error::internal(
                &pos,
                format!("The name \"{}\" reached the relevant pass without candidates (bound {})", name, own),
            )),
            ExprKind::Call { .. } => Err(Error::internal(
                &pos,
                "Call nodes must not be encountered during the relevant pass",
            )),
        }
    }

    fn narrow_binary(&mut self, pos: Pos, op: BinaryOp, left: Expr, right: Expr, p: &Type) -> Result<Expr> {
        let mut a = left.ty().clone();
        let mut b = right.ty().clone();
        match op {
            BinaryOp::In
            | BinaryOp::Equals
            | BinaryOp::And
            | BinaryOp::Or
            | BinaryOp::Iff
            | BinaryOp::Implies
            | BinaryOp::Lt
            | BinaryOp::Lte
            | BinaryOp::Gt
            | BinaryOp::Gte => {
                if op == BinaryOp::In {
                    b = a.intersect(&b);
                }
                if !p.is_bool() {
                    return Err(Error::type_error(&pos, "This must be a formula!"));
                }
            }
            BinaryOp::Intersect => {
                if p.size() == 0 {
                    return Err(Error::type_error(&pos, "This must be a set or relation!"));
                }
                a = p.intersect(&a);
                b = p.intersect(&b);
            }
            BinaryOp::Minus => match integer_operands(&pos, p)? {
                Some(int) => (a, b) = (int.clone(), int),
                None => {
                    a = p.clone();
                    b = p.intersect(&b);
                    if b.has_no_tuple() {
                        return Err(Error::relevant(
                            &pos,
                            "Inessential difference (right expression is redundant)",
                            &a,
                            &b,
                        ));
                    }
                }
            },
            BinaryOp::Plus | BinaryOp::PlusPlus => {
                let int = match op {
                    BinaryOp::Plus => integer_operands(&pos, p)?,
                    _ => None,
                };
                match int {
                    Some(int) => (a, b) = (int.clone(), int),
                    None => (a, b) = union_operands(&pos, op, p, &a, &b)?,
                }
            }
            BinaryOp::Arrow(..) => {
                set_demand(&pos, p)?;
                let (mut left_ty, mut right_ty) = (Type::empty(), Type::empty());
                for ar in &a {
                    for br in &b {
                        if ar.is_empty() != br.is_empty() || !p.has_arity(ar.arity() + br.arity()) {
                            continue;
                        }
                        for cr in p.intersect(&Type::of(ar.product(br))).rels().filter(|r| !r.is_empty()) {
                            left_ty = left_ty.union(&Type::of(cr.slice(0..ar.arity())));
                            right_ty = right_ty.union(&Type::of(cr.slice(ar.arity()..cr.arity())));
                        }
                    }
                }
                (a, b) = (left_ty, right_ty);
            }
            BinaryOp::Domain => {
                set_demand(&pos, p)?;
                let (mut left_ty, mut right_ty) = (Type::empty(), Type::empty());
                for ar in a.rels().filter(|r| r.arity() == 1) {
                    for br in b.rels().filter(|r| p.has_arity(r.arity())) {
                        let r = br.column_restrict(ar.first(), 0);
                        if r.is_empty() {
                            continue;
                        }
                        for cr in &p.intersect(&Type::of(r)) {
                            left_ty = left_ty.union(&Type::of(cr.slice(0..1)));
                            right_ty = right_ty.union(&Type::of(cr.clone()));
                        }
                    }
                }
                (a, b) = (left_ty, right_ty);
            }
            BinaryOp::Range => {
                set_demand(&pos, p)?;
                let (mut left_ty, mut right_ty) = (Type::empty(), Type::empty());
                for br in b.rels().filter(|r| r.arity() == 1) {
                    for ar in a.rels().filter(|r| p.has_arity(r.arity())) {
                        let r = ar.column_restrict(br.first(), ar.arity() - 1);
                        if r.is_empty() {
                            continue;
                        }
                        for cr in &p.intersect(&Type::of(r)) {
                            let n = cr.arity();
                            left_ty = left_ty.union(&Type::of(cr.clone()));
                            right_ty = right_ty.union(&Type::of(cr.slice(n - 1..n)));
                        }
                    }
                }
                (a, b) = (left_ty, right_ty);
            }
        }
        let left = self.narrow(left, &a)?;
        let right = self.narrow(right, &b)?;
        let kind = ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) };
        Ok(narrowed(pos, kind, p.clone()))
    }

    /// Each side keeps the tuples that take part in some joined tuple
    /// the parent can use, with the boundary column pinned to the overlap.
    fn narrow_join(&mut self, pos: Pos, left: Expr, right: Expr, p: &Type) -> Result<Expr> {
        let (mut left_ty, mut right_ty) = (Type::empty(), Type::empty());
        for a in left.ty() {
            for b in right.ty() {
                if !p.has_arity((a.arity() + b.arity()).saturating_sub(2)) {
                    continue;
                }
                let boundary = a.last().intersect(b.first());
                if boundary.is_none() {
                    continue;
                }
                let Some(joined) = a.join(b) else { continue };
                for cr in p.intersect(&Type::of(joined)).rels().filter(|r| !r.is_empty()) {
                    let mut columns = cr.columns().to_vec();
                    columns.insert(a.arity() - 1, boundary.clone());
                    let full = Rel::new(columns);
                    left_ty = left_ty.union(&Type::of(full.slice(0..a.arity())));
                    right_ty = right_ty.union(&Type::of(full.slice(a.arity() - 1..full.arity())));
                }
            }
        }
        let left = self.narrow(left, &left_ty)?;
        let right = self.narrow(right, &right_ty)?;
        let kind = ExprKind::Join { left: Box::new(left), right: Box::new(right) };
        Ok(narrowed(pos, kind, p.clone()))
    }

    fn narrow_unary(&mut self, pos: Pos, op: UnaryOp, sub: Expr, p: &Type) -> Result<Expr> {
        ensure_resolved(p, &pos)?;
        let subtype = match op {
            UnaryOp::SomeOf | UnaryOp::LoneOf | UnaryOp::OneOf | UnaryOp::SetOf => {
                cset_type(p, &pos)?;
                p.clone()
            }
            UnaryOp::Transpose | UnaryOp::Closure | UnaryOp::ReflexiveClosure => {
                cset_type(p, &pos)?;
                let subtype = match op {
                    UnaryOp::Transpose => sub.ty().transpose().intersect(p).transpose(),
                    _ => narrow_closure(p, sub.ty()),
                };
                if p.has_tuple() && subtype.has_no_tuple() {
                    return Err(Error::type_error(
                        &sub.pos,
                        "Subexpression does not contribute to relevant type of parent",
                    ));
                }
                subtype
            }
            UnaryOp::IntToAtom => {
                cset_type(p, &pos)?;
                if !p.is_subset_of(self.int_type()) {
                    return Err(Error::type_error(&pos, "This expression should have been a subset of Int!"));
                }
                sub.ty().clone()
            }
            _ => sub.ty().clone(),
        };
        let sub = self.narrow(sub, &subtype)?;
        Ok(narrowed(pos, ExprKind::Unary { op, sub: Box::new(sub) }, p.clone()))
    }

    fn narrow_ite(&mut self, pos: Pos, cond: Expr, then: Expr, els: Expr, p: &Type) -> Result<Expr> {
        ensure_resolved(p, &pos)?;
        let mut a = then.ty().clone();
        let mut b = els.ty().clone();
        if p.size() > 0 {
            if a.has_tuple() {
                a = a.intersect(p);
                if a.has_no_tuple() {
                    return Err(Error::type_error(&pos, "Inessential If-Then-Else: the left expression is redundant"));
                }
            }
            if b.has_tuple() {
                b = b.intersect(p);
                if b.has_no_tuple() {
                    return Err(Error::type_error(&pos, "Inessential If-Then-Else: the right expression is redundant"));
                }
            }
        }
        let cond_ty = cond.ty().clone();
        let cond = self.narrow(cond, &cond_ty)?;
        let then = self.narrow(then, &a)?;
        let els = self.narrow(els, &b)?;
        let kind = ExprKind::Ite { cond: Box::new(cond), then: Box::new(then), els: Box::new(els) };
        Ok(narrowed(pos, kind, p.clone()))
    }

    fn narrow_quant(&mut self, pos: Pos, op: QuantOp, decls: Vec<VarDecl>, body: Expr, p: &Type) -> Result<Expr> {
        ensure_resolved(p, &pos)?;
        let body = self.scoped(|tc| {
            for decl in &decls {
                for name in &decl.names {
                    tc.scope.define(name.clone(), decl.value.ty().clone());
                }
            }
            let own = body.ty().clone();
            tc.narrow(body, &own)
        })?;
        Ok(narrowed(pos, ExprKind::Quant { op, decls, body: Box::new(body) }, p.clone()))
    }
}

/// `Some(int)` when `+` or `-` must be integer arithmetic here
fn integer_operands(pos: &Pos, p: &Type) -> Result<Option<Type>> {
    if p.is_int() && p.size() > 0 {
        return Err(Error::type_error(
            pos,
            format!("This expression is ambiguous! Possible type(s) include: {}", p),
        ));
    }
    if p.is_int() {
        return Ok(Some(Type::int()));
    }
    if p.size() == 0 {
        return Err(Error::type_error(pos, "This must be an integer, a set or a relation!"));
    }
    Ok(None)
}

fn union_operands(pos: &Pos, op: BinaryOp, p: &Type, a: &Type, b: &Type) -> Result<(Type, Type)> {
    set_demand(pos, p)?;
    let a = p.intersect(a);
    if a.has_no_tuple() {
        return Err(Error::relevant(pos, "Inessential union: the left expression is redundant", &a, b));
    }
    let b = p.intersect(b);
    if b.has_no_tuple() {
        return Err(Error::relevant(pos, "Inessential union: the right expression is redundant", &a, &b));
    }
    if op == BinaryOp::PlusPlus && !b.can_override(&a) {
        return Err(Error::relevant(pos, "Relevant types incompatible for relational override", &a, &b));
    }
    Ok((a, b))
}

fn set_demand(pos: &Pos, p: &Type) -> Result<()> {
    if p.size() == 0 {
        return Err(Error::type_error(pos, "This must be a set or a relation!"));
    }
    Ok(())
}

fn narrow_constant(pos: Pos, c: Constant, p: &Type) -> Result<Expr> {
    let fits = match c {
        Constant::Number(_) => p.is_int(),
        Constant::Iden => p.arity() == Some(2),
        Constant::True | Constant::False => p.is_bool(),
    };
    if !fits {
        let message = match c {
            Constant::Number(_) => "This must be an integer expression",
            Constant::Iden => "This must be a binary relation.",
            Constant::True | Constant::False => "This must be a formula.",
        };
        return Err(Error::type_error(&pos, message));
    }
    Ok(narrowed(pos, ExprKind::Constant(c), constant_type(c)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{at, model};
    use rstest::rstest;

    #[test]
    fn test_resolved_nodes_are_returned_unchanged() {
        let (set, root) = model();
        let mut tc = TypeChecker::new(&set, root);
        let e = tc.resolve(Expr::name(at(0), "A")).unwrap();
        let again = tc.narrow(e.clone(), &Type::formula()).unwrap();
        assert_eq!(again, e);
    }

    #[test]
    fn test_join_keeps_bounding_type_when_demand_matches() {
        let (set, root) = model();
        let mut tc = TypeChecker::new(&set, root);
        let a = tc.resolve(Expr::name(at(0), "A")).unwrap().ty().clone();
        tc.bind("x", a);
        let join = Expr::join(Expr::name(at(1), "x"), Expr::name(at(2), "f"));
        let bounded = tc.infer(join).unwrap();
        let bound = bounded.ty().clone();
        let e = tc.narrow(bounded, &bound).unwrap();
        assert_eq!(e.ty().to_string(), "{this/B}");
        let ExprKind::Join { right, .. } = &e.kind else {
            panic!("expected a join");
        };
        assert_eq!(right.ty().to_string(), "{this/A->this/B}");
    }

    #[test]
    fn test_union_with_irrelevant_side_fails() {
        let (set, root) = model();
        let mut tc = TypeChecker::new(&set, root);
        let union = Expr::binary(BinaryOp::Plus, Expr::name(at(0), "A"), Expr::name(at(1), "B"));
        let bounded = tc.infer(union).unwrap();
        let a = tc.resolve(Expr::name(at(2), "A")).unwrap().ty().clone();
        let err = tc.narrow(bounded, &a).unwrap_err();
        assert!(err.message().starts_with("Inessential union: the right expression is redundant"));
        assert!(err.message().contains("Left relevant type"));
    }

    #[test]
    fn test_difference_narrows_left_to_demand() {
        let (set, root) = model();
        let mut tc = TypeChecker::new(&set, root);
        let diff = Expr::binary(BinaryOp::Minus, Expr::name(at(0), "A"), Expr::name(at(1), "C"));
        let e = tc.resolve(diff).unwrap();
        assert_eq!(e.ty().to_string(), "{this/A}");
    }

    #[rstest]
    #[case(Constant::Number(1), Type::formula(), "integer expression")]
    #[case(Constant::Iden, Type::int(), "binary relation")]
    #[case(Constant::True, Type::int(), "formula")]
    fn test_constant_demands(#[case] c: Constant, #[case] demand: Type, #[case] message: &str) {
        let err = narrow_constant(at(0), c, &demand).unwrap_err();
        assert!(err.message().contains(message));
    }

    #[test]
    fn test_transpose_with_unusable_demand_fails() {
        let (set, root) = model();
        let mut tc = TypeChecker::new(&set, root);
        let flip = Expr::unary(at(0), UnaryOp::Transpose, Expr::name(at(1), "f"));
        let bounded = tc.infer(flip).unwrap();
        let next = tc.resolve(Expr::name(at(2), "next")).unwrap().ty().clone();
        let err = tc.narrow(bounded, &next).unwrap_err();
        assert!(err.message().contains("does not contribute"));
    }

    #[test]
    fn test_overloaded_name_needs_a_match() {
        let (set, root) = model();
        let mut tc = TypeChecker::new(&set, root);
        let bounded = tc.infer(Expr::name(at(0), "f")).unwrap();
        let err = tc.narrow(bounded, &Type::formula()).unwrap_err();
        assert!(err.message().contains("due to no match"));
    }

    #[test]
    fn test_untyped_node_is_internal() {
        let (set, root) = model();
        let mut tc = TypeChecker::new(&set, root);
        let err = tc.narrow(Expr::name(at(0), "A"), &Type::formula()).unwrap_err();
        assert!(matches!(err, Error::Internal { .. }));
    }

    #[test]
    fn test_plus_under_mixed_demand_is_ambiguous() {
        let (set, root) = model();
        let mut tc = TypeChecker::new(&set, root);
        let union = Expr::binary(BinaryOp::Plus, Expr::name(at(0), "A"), Expr::name(at(1), "C"));
        let bounded = tc.infer(union).unwrap();
        let demand = Type::int().merge(bounded.ty());
        let err = tc.narrow(bounded, &demand).unwrap_err();
        assert!(matches!(err, Error::Type { .. }));
        assert!(err.message().starts_with("This expression is ambiguous! Possible type(s) include: "));
    }
}
