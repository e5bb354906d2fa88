//! Shared fixtures for the unit tests

use crate::check;
use rela_ast::{Expr, Pos, UnitId, VarDecl};
use rela_hir::{FunDecl, ModuleSet, Options, SigDecl};

pub(crate) fn at(offset: usize) -> Pos {
    Pos::new("model.als", offset, offset + 1)
}

/// ```text
/// sig A { f: B, next: A }
/// sig B {}
/// sig C extends A {}
/// fun g[x: A]: B { x.f }
/// pred p[x: A] { some x.f }
/// ```
pub(crate) fn model() -> (ModuleSet, UnitId) {
    let mut set = ModuleSet::new();
    let root = set.add_unit("model.als", "");
    set.add_sig(
        root,
        SigDecl::new(at(0), "A")
            .field(VarDecl::new(at(1), &["f"], Expr::name(at(2), "B")))
            .field(VarDecl::new(at(3), &["next"], Expr::name(at(4), "A"))),
    );
    set.add_sig(root, SigDecl::new(at(5), "B"));
    set.add_sig(root, SigDecl::new(at(6), "C").extends("A"));

    let param = || vec![VarDecl::new(at(8), &["x"], Expr::name(at(9), "A"))];
    let x_f = || Expr::join(Expr::name(at(10), "x"), Expr::name(at(11), "f"));
    set.add_fun(root, FunDecl::fun(at(7), "g", param(), Expr::name(at(12), "B"), x_f()));
    let some = Expr::unary(at(13), rela_ast::UnaryOp::Some, x_f());
    set.add_fun(root, FunDecl::pred(at(14), "p", param(), some));

    check(&mut set, &Options::default(), &mut Vec::<String>::new()).expect("fixture model typechecks");
    (set, root)
}
