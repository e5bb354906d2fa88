//! Bounding pass: the widest type each node could have

use crate::checker::{TypeChecker, add_one, cform, cform_type, cint, cset, is_bad};
use rela_ast::{
    BinaryOp, Constant, Error, Expr, ExprKind, Pos, QuantOp, Result, Typing, UnaryOp, VarDecl,
};
use rela_types::{BasicType, Rel, Type};

/// Type of a constant leaf
pub(crate) fn constant_type(constant: Constant) -> Type {
    match constant {
        Constant::Number(_) => Type::int(),
        Constant::Iden => Type::of(Rel::new(vec![BasicType::univ(), BasicType::univ()])),
        Constant::True | Constant::False => Type::formula(),
    }
}

fn bounded(pos: Pos, kind: ExprKind, ty: Type) -> Expr {
    Expr::new(pos, kind).with_typing(Typing::Bounding(ty))
}

impl TypeChecker<'_> {
    /// Compute the bounding type of `expr` and of everything below it.
    /// Overloaded names come back as `Unresolved` nodes carrying every
    /// interpretation; resolved nodes come back unchanged.
    pub fn infer(&mut self, expr: Expr) -> Result<Expr> {
        if expr.is_resolved() {
            log::trace!("bounding pass: {} already resolved", expr.pos);
            return Ok(expr);
        }
        let Expr { pos, kind, .. } = expr;
        match kind {
            ExprKind::Constant(c) => Ok(bounded(pos, ExprKind::Constant(c), constant_type(c))),
            ExprKind::Name { name, .. } => self.infer_name(pos, name),
            ExprKind::Join { left, right } => self.infer_join(pos, *left, *right),
            ExprKind::Unary { op, sub } => self.infer_unary(pos, op, *sub),
            ExprKind::Binary { op, left, right } => self.infer_binary(pos, op, *left, *right),
            ExprKind::Ite { cond, then, els } => self.infer_ite(pos, *cond, *then, *els),
            ExprKind::Let { name, value, body } => {
                let value = self.resolve(*value)?;
                let body = self.scoped(|tc| {
                    tc.scope.define(name.clone(), value.ty().clone());
                    tc.infer(*body)
                })?;
                if is_bad(body.ty()) {
                    return Err(Error::type_error(
                        &body.pos,
                        "The body of a LET expression must be a set, an integer, or a formula!",
                    ));
                }
                let ty = body.ty().clone();
                let kind = ExprKind::Let { name, value: Box::new(value), body: Box::new(body) };
                Ok(bounded(pos, kind, ty))
            }
            ExprKind::Quant { op, decls, body } => self.infer_quant(pos, op, decls, *body),
            ExprKind::Sequence(list) => {
                let mut typed = Vec::with_capacity(list.len());
                for item in list {
                    let item = self.infer(item)?;
                    cform(&item)?;
                    typed.push(item);
                }
                Ok(bounded(pos, ExprKind::Sequence(typed), Type::formula()))
            }
            ExprKind::Call { .. } => Err(Error::internal(
                &pos,
                "Call nodes must not be encountered during the bounding pass",
            )),
        }
    }

    fn infer_unary(&mut self, pos: Pos, op: UnaryOp, sub: Expr) -> Result<Expr> {
        let sub = self.infer(sub)?;
        let ty = match op {
            UnaryOp::Not => {
                cform(&sub)?;
                Type::formula()
            }
            UnaryOp::SomeOf | UnaryOp::LoneOf | UnaryOp::OneOf | UnaryOp::SetOf => cset(&sub)?.clone(),
            UnaryOp::Some | UnaryOp::Lone | UnaryOp::One | UnaryOp::No => {
                cset(&sub)?;
                Type::formula()
            }
            UnaryOp::Transpose => cset(&sub)?.transpose(),
            UnaryOp::Closure | UnaryOp::ReflexiveClosure => {
                let sub_ty = cset(&sub)?;
                if !sub_ty.has_arity(2) {
                    return Err(Error::type_error(&sub.pos, "This expression's arity must be 2!"));
                }
                let closed = sub_ty.closure();
                if closed.join(&closed).size() == 0 {
                    return Err(Error::type_error(
                        &pos,
                        "redundant closure operation (domain and range are disjoint)",
                    ));
                }
                if op == UnaryOp::ReflexiveClosure {
                    sub_ty.reflexive_closure()
                } else {
                    closed
                }
            }
            UnaryOp::Cardinality => {
                cset(&sub)?;
                Type::int()
            }
            UnaryOp::IntToAtom => {
                cint(&sub)?;
                self.int_type().clone()
            }
            UnaryOp::Sum => {
                let sub_ty = cset(&sub)?;
                if sub_ty.intersect(self.int_type()).has_no_tuple() {
                    return Err(Error::type_error(
                        &sub.pos,
                        format!(
                            "This expression must contain integer atoms! Instead, its possible type(s) are: {}",
                            sub_ty
                        ),
                    ));
                }
                Type::int()
            }
        };
        Ok(bounded(pos, ExprKind::Unary { op, sub: Box::new(sub) }, ty))
    }

    fn infer_binary(&mut self, pos: Pos, op: BinaryOp, left: Expr, right: Expr) -> Result<Expr> {
        let left = self.infer(left)?;
        let right = self.infer(right)?;
        let ty = binary_bound(&pos, op, &left, &right)?;
        let kind = ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) };
        Ok(bounded(pos, kind, ty))
    }

    fn infer_ite(&mut self, pos: Pos, cond: Expr, then: Expr, els: Expr) -> Result<Expr> {
        let cond = self.infer(cond)?;
        cform(&cond)?;
        let then = self.infer(then)?;
        let els = self.infer(els)?;
        let (a, b) = (then.ty(), els.ty());

        let mut ty = None;
        if a.size() > 0 && b.size() > 0 && a.has_common_arity(b) {
            ty = Some(a.union(b));
        }
        if a.is_int() && b.is_int() {
            ty = Some(ty.map_or_else(Type::int, Type::with_int));
        }
        if a.is_bool() && b.is_bool() {
            ty = Some(ty.map_or_else(Type::formula, Type::with_bool));
        }
        let ty = match ty {
            Some(ty) if !is_bad(&ty) => ty,
            _ => {
                return Err(Error::type_error(
                    &pos,
                    format!(
                        "The THEN-clause and the ELSE-clause must match! Its THEN-clause has type {} and the ELSE clause has type {}",
                        a, b
                    ),
                ));
            }
        };
        let kind = ExprKind::Ite { cond: Box::new(cond), then: Box::new(then), els: Box::new(els) };
        Ok(bounded(pos, kind, ty))
    }

    fn infer_quant(&mut self, pos: Pos, op: QuantOp, decls: Vec<VarDecl>, body: Expr) -> Result<Expr> {
        let (decls, body, comprehension) = self.scoped(|tc| {
            let mut typed = Vec::with_capacity(decls.len());
            let mut comprehension: Option<Type> = None;
            for decl in &decls {
                let value = add_one(tc.resolve(decl.value.clone())?);
                cset(&value)?;
                if value.ty().has_no_tuple() {
                    return Err(Error::type_error(&value.pos, "This expression must not be an empty set!"));
                }
                if op == QuantOp::Comprehension {
                    if value.ty().arity() != Some(1) {
                        return Err(Error::type_error(&value.pos, "This expression must be a unary set!"));
                    }
                    for _ in &decl.names {
                        comprehension = Some(match comprehension {
                            None => value.ty().clone(),
                            Some(acc) => acc.product_same_emptiness(value.ty()),
                        });
                    }
                }
                for name in &decl.names {
                    tc.scope.define(name.clone(), value.ty().clone());
                }
                typed.push(decl.with_value(value));
            }
            let body = tc.infer(body)?;
            Ok((typed, body, comprehension))
        })?;

        let ty = match op {
            QuantOp::Comprehension => {
                let ty = match comprehension {
                    Some(ty) if ty.has_tuple() => ty,
                    _ => {
                        return Err(Error::type_error(
                            &pos,
                            "This set comprehension expression is always empty!",
                        ));
                    }
                };
                cform_type(body.ty(), &body.pos)?;
                ty
            }
            QuantOp::Sum => {
                cint(&body)?;
                Type::int()
            }
            _ => {
                cform_type(body.ty(), &body.pos)?;
                Type::formula()
            }
        };
        Ok(bounded(pos, ExprKind::Quant { op, decls, body: Box::new(body) }, ty))
    }
}

/// Bounding type of a binary operator applied to typed operands
pub(crate) fn binary_bound(pos: &Pos, op: BinaryOp, left: &Expr, right: &Expr) -> Result<Type> {
    match op {
        BinaryOp::Lt | BinaryOp::Lte | BinaryOp::Gt | BinaryOp::Gte => {
            cint(left)?;
            cint(right)?;
            Ok(Type::formula())
        }
        BinaryOp::And | BinaryOp::Or | BinaryOp::Iff | BinaryOp::Implies => {
            cform(left)?;
            cform(right)?;
            Ok(Type::formula())
        }
        BinaryOp::PlusPlus => {
            let a = cset(left)?;
            let b = cset(right)?;
            if b.can_override(a) {
                return Ok(a.union(b));
            }
            Err(Error::bounding(
                pos,
                "++ is irrelevant because its right hand side can never override the left hand side!",
                a,
                b,
            ))
        }
        BinaryOp::Plus => {
            let (a, b) = (left.ty(), right.ty());
            let both_int = a.is_int() && b.is_int();
            if a.has_common_arity(b) {
                let union = a.union(b);
                return Ok(if both_int { union.with_int() } else { union });
            }
            if both_int {
                return Ok(Type::int());
            }
            Err(Error::bounding(
                pos,
                "+ can be used only between 2 sets and relations of the same arity, or between 2 integer expressions!",
                a,
                b,
            ))
        }
        BinaryOp::Minus => {
            let (a, b) = (left.ty(), right.ty());
            let both_int = a.is_int() && b.is_int();
            if a.size() > 0 || b.size() > 0 {
                if a.intersect(b).has_tuple() {
                    return Ok(if both_int { a.clone().with_int() } else { a.clone() });
                }
                return Err(Error::bounding(
                    pos,
                    "- is irrelevant because the two expressions are disjoint!",
                    a,
                    b,
                ));
            }
            if both_int {
                return Ok(Type::int());
            }
            Err(Error::bounding(
                pos,
                "- can be used only between 2 sets and relations of the same arity, or between 2 integer expressions!",
                a,
                b,
            ))
        }
        BinaryOp::Intersect => {
            let a = cset(left)?;
            let b = cset(right)?;
            let c = a.intersect(b);
            if c.has_tuple() {
                return Ok(c);
            }
            Err(Error::bounding(
                pos,
                "& failed because there is an arity mismatch, or the 2 expressions are always disjoint!",
                a,
                b,
            ))
        }
        BinaryOp::Arrow(..) => {
            let a = cset(left)?;
            let b = cset(right)?;
            let c = a.product_same_emptiness(b);
            if c.size() > 0 {
                return Ok(c);
            }
            Err(Error::bounding(pos, "-> cannot be used to combine empty and non-empty types!", a, b))
        }
        BinaryOp::Domain => {
            let a = cset(left)?;
            let b = cset(right)?;
            let c = b.domain_restrict(a);
            if c.has_tuple() {
                return Ok(c);
            }
            Err(Error::bounding(pos, "<: failed because left and domain[right] are always disjoint!", a, b))
        }
        BinaryOp::Range => {
            let a = cset(left)?;
            let b = cset(right)?;
            let c = a.range_restrict(b);
            if c.has_tuple() {
                return Ok(c);
            }
            Err(Error::bounding(pos, ":> failed because range(left) and right are always disjoint!", a, b))
        }
        BinaryOp::In => {
            let a = cset(left)?;
            let b = cset(right)?;
            let c = a.intersect(b);
            if c.size() == 0 || (a.has_tuple() && b.has_tuple() && c.has_no_tuple()) {
                return Err(Error::bounding(
                    pos,
                    "Subset operator is redundant, because the types are always disjoint!",
                    a,
                    b,
                ));
            }
            if a.has_no_tuple() {
                return Err(Error::bounding(
                    pos,
                    "Subset operator is redundant, because the left-hand-side expression is always empty!",
                    a,
                    b,
                ));
            }
            Ok(Type::formula())
        }
        BinaryOp::Equals => {
            let (a, b) = (left.ty(), right.ty());
            let c = a.intersect(b);
            if c.size() != 0 && (a.has_no_tuple() || b.has_no_tuple() || c.has_tuple()) {
                return Ok(Type::formula());
            }
            if a.is_int() && b.is_int() {
                return Ok(Type::formula());
            }
            Err(Error::bounding(
                pos,
                "= can be used only between 2 nondisjoint sets and relations, or 2 integer expressions!",
                a,
                b,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{at, model};
    use rstest::rstest;

    #[rstest]
    #[case(Constant::Number(3), true, false)]
    #[case(Constant::True, false, true)]
    #[case(Constant::False, false, true)]
    fn test_constant_kinds(#[case] c: Constant, #[case] int: bool, #[case] bool_: bool) {
        let ty = constant_type(c);
        assert_eq!(ty.is_int(), int);
        assert_eq!(ty.is_bool(), bool_);
        assert_eq!(ty.size(), 0);
    }

    #[test]
    fn test_iden_is_binary() {
        assert_eq!(constant_type(Constant::Iden).arity(), Some(2));
    }

    #[rstest]
    #[case(BinaryOp::Plus, "{this/A, this/B}")]
    #[case(BinaryOp::ARROW, "{this/A->this/B}")]
    fn test_relational_bounds(#[case] op: BinaryOp, #[case] expected: &str) {
        let (set, root) = model();
        let mut tc = TypeChecker::new(&set, root);
        let e = Expr::binary(op, Expr::name(at(0), "A"), Expr::name(at(1), "B"));
        let e = tc.infer(e).unwrap();
        assert_eq!(e.ty().to_string(), expected);
        assert!(matches!(e.typing, Typing::Bounding(_)));
    }

    #[rstest]
    #[case(BinaryOp::Intersect, "& failed")]
    #[case(BinaryOp::Minus, "- is irrelevant")]
    #[case(BinaryOp::In, "Subset operator is redundant")]
    #[case(BinaryOp::Equals, "= can be used only")]
    fn test_disjoint_operands_fail(#[case] op: BinaryOp, #[case] message: &str) {
        let (set, root) = model();
        let mut tc = TypeChecker::new(&set, root);
        let e = Expr::binary(op, Expr::name(at(0), "A"), Expr::name(at(1), "B"));
        let err = tc.infer(e).unwrap_err();
        assert!(matches!(err, Error::Type { .. }));
        assert!(err.message().starts_with(message), "{}", err.message());
        assert!(err.message().contains("Left type = {this/A}"));
    }

    #[test]
    fn test_integer_plus_set_is_rejected() {
        let (set, root) = model();
        let mut tc = TypeChecker::new(&set, root);
        let e = Expr::binary(BinaryOp::Plus, Expr::number(at(0), 3), Expr::name(at(1), "A"));
        let err = tc.infer(e).unwrap_err();
        assert!(matches!(err, Error::Type { .. }));
        assert!(err.message().contains("2 integer expressions"));
    }

    #[test]
    fn test_integer_arithmetic_and_comparison() {
        let (set, root) = model();
        let mut tc = TypeChecker::new(&set, root);
        let card = Expr::unary(at(0), UnaryOp::Cardinality, Expr::name(at(1), "A"));
        let sum = Expr::binary(BinaryOp::Plus, card, Expr::number(at(2), 1));
        let cmp = Expr::binary(BinaryOp::Lt, sum, Expr::number(at(3), 4));
        let e = tc.infer(cmp).unwrap();
        assert_eq!(e.ty(), &Type::formula());
    }

    #[test]
    fn test_ite_branches_must_match() {
        let (set, root) = model();
        let mut tc = TypeChecker::new(&set, root);
        let cond = Expr::unary(at(0), UnaryOp::Some, Expr::name(at(1), "A"));
        let bad = Expr::ite(at(2), cond.clone(), Expr::number(at(3), 1), Expr::name(at(4), "A"));
        assert!(tc.infer(bad).unwrap_err().message().contains("THEN-clause"));
        let good = Expr::ite(at(2), cond, Expr::name(at(3), "B"), Expr::name(at(4), "A"));
        assert_eq!(tc.infer(good).unwrap().ty().to_string(), "{this/A, this/B}");
    }

    #[test]
    fn test_closure_needs_binary_operand() {
        let (set, root) = model();
        let mut tc = TypeChecker::new(&set, root);
        let e = Expr::unary(at(0), UnaryOp::Closure, Expr::name(at(1), "A"));
        assert!(tc.infer(e).unwrap_err().message().contains("arity must be 2"));
        let e = Expr::unary(at(0), UnaryOp::ReflexiveClosure, Expr::name(at(1), "next"));
        let ty = tc.infer(e).unwrap().ty().clone();
        assert!(ty.to_string().contains("univ->univ"));
    }

    #[test]
    fn test_let_binds_value_for_body() {
        let (set, root) = model();
        let mut tc = TypeChecker::new(&set, root);
        let body = Expr::join(Expr::name(at(2), "v"), Expr::name(at(3), "f"));
        let e = Expr::let_in(at(0), "v", Expr::name(at(1), "A"), body);
        let e = tc.infer(e).unwrap();
        assert_eq!(e.ty().to_string(), "{this/B}");
        assert!(!tc.scope.contains("v"));
    }

    #[test]
    fn test_comprehension_type_is_product_of_bounds() {
        let (set, root) = model();
        let mut tc = TypeChecker::new(&set, root);
        let decls = vec![
            VarDecl::new(at(1), &["a"], Expr::name(at(2), "A")),
            VarDecl::new(at(3), &["b"], Expr::name(at(4), "B")),
        ];
        let body = Expr::binary(BinaryOp::In, Expr::name(at(5), "b"), Expr::join(Expr::name(at(6), "a"), Expr::name(at(7), "f")));
        let e = tc.infer(Expr::quant(at(0), QuantOp::Comprehension, decls, body)).unwrap();
        assert_eq!(e.ty().to_string(), "{this/A->this/B}");
    }

    #[test]
    fn test_sum_quantifier_needs_integer_body() {
        let (set, root) = model();
        let mut tc = TypeChecker::new(&set, root);
        let decls = vec![VarDecl::new(at(1), &["a"], Expr::name(at(2), "A"))];
        let e = Expr::quant(at(0), QuantOp::Sum, decls.clone(), Expr::name(at(3), "a"));
        assert!(tc.infer(e).unwrap_err().message().contains("integer"));
        let card = Expr::unary(at(3), UnaryOp::Cardinality, Expr::name(at(4), "a"));
        let e = tc.infer(Expr::quant(at(0), QuantOp::Sum, decls, card)).unwrap();
        assert!(e.ty().is_int());
    }

    #[test]
    fn test_call_node_is_internal_error() {
        let (set, root) = model();
        let mut tc = TypeChecker::new(&set, root);
        let fun = set.live_funs()[0];
        let call = Expr::new(at(0), ExprKind::Call { fun, args: Vec::new() });
        assert!(matches!(tc.infer(call), Err(Error::Internal { .. })));
    }
}
