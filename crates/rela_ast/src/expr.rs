use crate::ids::{FunId, SigId};
use crate::ops::{BinaryOp, Constant, QuantOp, UnaryOp};
use crate::pos::Pos;
use rela_types::Type;

static UNTYPED: Type = Type::empty();

/// An expression node with its typing state
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub pos: Pos,
    pub kind: ExprKind,
    pub typing: Typing,
}

/// What the typechecker knows about a node so far
#[derive(Debug, Clone, PartialEq)]
pub enum Typing {
    /// Fresh from the parser
    Untyped,
    /// Widest possible type, computed bottom-up
    Bounding(Type),
    /// A name or call with several candidate interpretations. Each choice
    /// is already fully resolved; the top-down pass picks one.
    Unresolved { ty: Type, choices: Vec<Expr> },
    /// Final, unambiguous type
    Resolved(Type),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Constant(Constant),
    /// A name, with its target once resolved
    Name { name: String, target: Option<NameTarget> },
    Unary { op: UnaryOp, sub: Box<Expr> },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    /// `left.right`
    Join { left: Box<Expr>, right: Box<Expr> },
    Ite { cond: Box<Expr>, then: Box<Expr>, els: Box<Expr> },
    Let { name: String, value: Box<Expr>, body: Box<Expr> },
    Quant { op: QuantOp, decls: Vec<VarDecl>, body: Box<Expr> },
    /// Conjunction of formulas
    Sequence(Vec<Expr>),
    /// Call of a function or predicate; only produced by the typechecker
    Call { fun: FunId, args: Vec<Expr> },
}

/// What a resolved name refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameTarget {
    /// A parameter, let-binding or quantified variable
    Local,
    Sig(SigId),
    Field { sig: SigId, index: usize },
}

/// `a, b: bound` in a quantifier, parameter list or signature body
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub pos: Pos,
    pub names: Vec<String>,
    pub value: Expr,
}

impl VarDecl {
    pub fn new(pos: Pos, names: &[&str], value: Expr) -> Self {
        Self {
            pos,
            names: names.iter().map(|n| n.to_string()).collect(),
            value,
        }
    }

    /// Same names, new bound
    pub fn with_value(&self, value: Expr) -> Self {
        Self {
            pos: self.pos.clone(),
            names: self.names.clone(),
            value,
        }
    }
}

impl Typing {
    pub fn ty(&self) -> Option<&Type> {
        match self {
            Typing::Untyped => None,
            Typing::Bounding(ty) | Typing::Resolved(ty) => Some(ty),
            Typing::Unresolved { ty, .. } => Some(ty),
        }
    }
}

impl Expr {
    pub fn new(pos: Pos, kind: ExprKind) -> Self {
        Self {
            pos,
            kind,
            typing: Typing::Untyped,
        }
    }

    pub fn with_typing(mut self, typing: Typing) -> Self {
        self.typing = typing;
        self
    }

    /// Mark as fully typed
    pub fn resolved(self, ty: Type) -> Self {
        self.with_typing(Typing::Resolved(ty))
    }

    /// The current type, or the empty type for untyped nodes
    pub fn ty(&self) -> &Type {
        self.typing.ty().unwrap_or(&UNTYPED)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.typing, Typing::Resolved(_))
    }

    pub fn name(pos: Pos, name: impl Into<String>) -> Self {
        Self::new(pos, ExprKind::Name { name: name.into(), target: None })
    }

    pub fn number(pos: Pos, n: i64) -> Self {
        Self::new(pos, ExprKind::Constant(Constant::Number(n)))
    }

    pub fn constant(pos: Pos, c: Constant) -> Self {
        Self::new(pos, ExprKind::Constant(c))
    }

    pub fn unary(pos: Pos, op: UnaryOp, sub: Expr) -> Self {
        Self::new(pos, ExprKind::Unary { op, sub: Box::new(sub) })
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        let pos = left.pos.merge(&right.pos);
        Self::new(
            pos,
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        )
    }

    pub fn join(left: Expr, right: Expr) -> Self {
        let pos = left.pos.merge(&right.pos);
        Self::new(
            pos,
            ExprKind::Join {
                left: Box::new(left),
                right: Box::new(right),
            },
        )
    }

    /// `f[a, b, ...]`, which is sugar for `... b.(a.f)`
    pub fn apply(pos: Pos, fun: Expr, args: Vec<Expr>) -> Self {
        args.into_iter().fold(fun, |acc, arg| {
            let mut joined = Expr::join(arg, acc);
            joined.pos = pos.clone();
            joined
        })
    }

    pub fn ite(pos: Pos, cond: Expr, then: Expr, els: Expr) -> Self {
        Self::new(
            pos,
            ExprKind::Ite {
                cond: Box::new(cond),
                then: Box::new(then),
                els: Box::new(els),
            },
        )
    }

    pub fn let_in(pos: Pos, name: impl Into<String>, value: Expr, body: Expr) -> Self {
        Self::new(
            pos,
            ExprKind::Let {
                name: name.into(),
                value: Box::new(value),
                body: Box::new(body),
            },
        )
    }

    pub fn quant(pos: Pos, op: QuantOp, decls: Vec<VarDecl>, body: Expr) -> Self {
        Self::new(pos, ExprKind::Quant { op, decls, body: Box::new(body) })
    }

    pub fn sequence(pos: Pos, list: Vec<Expr>) -> Self {
        Self::new(pos, ExprKind::Sequence(list))
    }

    /// Direct subexpressions, in source order
    pub fn children(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::Constant(_) | ExprKind::Name { .. } => Vec::new(),
            ExprKind::Unary { sub, .. } => vec![&**sub],
            ExprKind::Binary { left, right, .. } | ExprKind::Join { left, right } => {
                vec![&**left, &**right]
            }
            ExprKind::Ite { cond, then, els } => vec![&**cond, &**then, &**els],
            ExprKind::Let { value, body, .. } => vec![&**value, &**body],
            ExprKind::Quant { decls, body, .. } => {
                decls.iter().map(|d| &d.value).chain(std::iter::once(&**body)).collect()
            }
            ExprKind::Sequence(list) => list.iter().collect(),
            ExprKind::Call { args, .. } => args.iter().collect(),
        }
    }

    /// True if this node or any node below it satisfies `pred`.
    /// Stops at the first match.
    pub fn any(&self, pred: &mut impl FnMut(&Expr) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        self.children().into_iter().any(|child| child.any(pred))
    }

    /// True once this node and every node below it carry a final type
    pub fn is_fully_resolved(&self) -> bool {
        !self.any(&mut |e| !e.is_resolved())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{ArrowMult, BinaryOp};

    fn at(start: usize, end: usize) -> Pos {
        Pos::new("m.als", start, end)
    }

    #[test]
    fn test_apply_builds_join_chain() {
        let call = Expr::apply(
            at(0, 7),
            Expr::name(at(0, 1), "f"),
            vec![Expr::name(at(2, 3), "a"), Expr::name(at(5, 6), "b")],
        );
        let ExprKind::Join { left, right } = &call.kind else {
            panic!("expected join");
        };
        assert!(matches!(&left.kind, ExprKind::Name { name, .. } if name == "b"));
        let ExprKind::Join { left, right } = &right.kind else {
            panic!("expected nested join");
        };
        assert!(matches!(&left.kind, ExprKind::Name { name, .. } if name == "a"));
        assert!(matches!(&right.kind, ExprKind::Name { name, .. } if name == "f"));
    }

    #[test]
    fn test_binary_spans_operands() {
        let e = Expr::binary(
            BinaryOp::Arrow(ArrowMult::One, ArrowMult::One),
            Expr::name(at(4, 5), "B"),
            Expr::name(at(13, 14), "B"),
        );
        assert_eq!(e.pos, at(4, 14));
    }

    #[test]
    fn test_any_short_circuits() {
        let e = Expr::binary(
            BinaryOp::And,
            Expr::name(at(0, 1), "p"),
            Expr::unary(at(2, 4), UnaryOp::Not, Expr::name(at(3, 4), "q")),
        );
        let mut seen = 0;
        let found = e.any(&mut |node| {
            seen += 1;
            matches!(&node.kind, ExprKind::Name { name, .. } if name == "p")
        });
        assert!(found);
        assert_eq!(seen, 2);
        assert!(!e.is_fully_resolved());
    }

    #[test]
    fn test_untyped_node_has_empty_type() {
        let e = Expr::name(at(0, 1), "x");
        assert_eq!(e.ty(), &Type::empty());
        let typed = e.resolved(Type::formula());
        assert!(typed.is_fully_resolved());
        assert!(typed.ty().is_bool());
    }
}
