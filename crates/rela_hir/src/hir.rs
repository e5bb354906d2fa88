//! Module records: units, signatures, functions and the arena that owns them

use indexmap::IndexMap;
use rela_ast::{Error, Expr, FunId, Pos, Result, SigId, UnitId, VarDecl};
use rela_types::{BasicType, Type};

/// Declared multiplicity of a signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SigMult {
    #[default]
    Set,
    Lone,
    One,
    Some,
}

/// A relation declared inside a signature
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub pos: Pos,
    pub name: String,
    /// Type of the declared bound
    pub half_type: Option<Type>,
    /// Owning signature's type times the declared bound
    pub full_type: Option<Type>,
}

/// A signature as declared, before hierarchy resolution
#[derive(Debug, Clone)]
pub struct SigDecl {
    pub pos: Pos,
    pub name: String,
    pub is_abstract: bool,
    pub mult: SigMult,
    pub extends: Option<String>,
    pub subset_of: Vec<String>,
    pub fields: Vec<VarDecl>,
    pub facts: Option<Expr>,
}

impl SigDecl {
    pub fn new(pos: Pos, name: impl Into<String>) -> Self {
        Self {
            pos,
            name: name.into(),
            is_abstract: false,
            mult: SigMult::Set,
            extends: None,
            subset_of: Vec::new(),
            fields: Vec::new(),
            facts: None,
        }
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    pub fn subset_of(mut self, parent: impl Into<String>) -> Self {
        self.subset_of.push(parent.into());
        self
    }

    pub fn field(mut self, decl: VarDecl) -> Self {
        self.fields.push(decl);
        self
    }

    pub fn facts(mut self, facts: Expr) -> Self {
        self.facts = Some(facts);
        self
    }

    pub fn mult(mut self, mult: SigMult) -> Self {
        self.mult = mult;
        self
    }

    pub fn abstract_sig(mut self) -> Self {
        self.is_abstract = true;
        self
    }
}

/// Signature record
#[derive(Debug, Clone)]
pub struct Sig {
    pub id: SigId,
    pub pos: Pos,
    pub name: String,
    /// Owning unit; `None` for the built-in signatures
    pub unit: Option<UnitId>,
    pub is_abstract: bool,
    pub mult: SigMult,
    /// Raw parent name from `extends`
    pub extends: Option<String>,
    /// Raw parent names from `in`
    pub subset_of: Vec<String>,
    /// Field declarations; replaced by their typed form during checking
    pub decls: Vec<VarDecl>,
    pub fields: Vec<Field>,
    /// Appended facts; replaced by their typed form during checking
    pub facts: Option<Expr>,
    /// Extension children
    pub subs: Vec<SigId>,
    full_name: String,
    parent: Option<SigId>,
    sups: Vec<SigId>,
    resolved: bool,
    basic: Option<BasicType>,
    ty: Option<Type>,
}

impl Sig {
    fn builtin(id: SigId, name: &str, basic: BasicType) -> Self {
        Self {
            id,
            pos: Pos::unknown(),
            name: name.to_string(),
            unit: None,
            is_abstract: false,
            mult: SigMult::Set,
            extends: None,
            subset_of: Vec::new(),
            decls: Vec::new(),
            fields: Vec::new(),
            facts: None,
            subs: Vec::new(),
            full_name: name.to_string(),
            parent: None,
            sups: Vec::new(),
            resolved: true,
            ty: Some(Type::unary(basic.clone())),
            basic: Some(basic),
        }
    }

    /// `alias/name`, with `this` for the root unit
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub(crate) fn set_full_name(&mut self, full_name: String) {
        self.full_name = full_name;
    }

    /// True for `in` signatures
    pub fn is_subset(&self) -> bool {
        !self.subset_of.is_empty()
    }

    /// Resolved `extends` parent (`univ` for top-level signatures)
    pub fn parent(&self) -> Option<SigId> {
        self.parent
    }

    /// Resolved `in` parents
    pub fn sups(&self) -> &[SigId] {
        &self.sups
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub fn basic(&self) -> Option<&BasicType> {
        self.basic.as_ref()
    }

    pub fn ty(&self) -> Option<&Type> {
        self.ty.as_ref()
    }

    /// Record the resolved parents. Happens once per signature.
    pub fn set_parents(&mut self, parent: Option<SigId>, sups: Vec<SigId>) -> Result<()> {
        if self.resolved {
            return Err(Error::internal(
                &self.pos,
                format!("The signature \"{}\" was resolved twice", self.full_name),
            ));
        }
        self.parent = parent;
        self.sups = sups;
        self.resolved = true;
        Ok(())
    }

    /// Record the computed type. Happens once per signature.
    pub fn set_type(&mut self, ty: Type, basic: Option<BasicType>) -> Result<()> {
        if self.ty.is_some() {
            return Err(Error::internal(
                &self.pos,
                format!("The signature \"{}\" was assigned a type twice", self.full_name),
            ));
        }
        self.ty = Some(ty);
        self.basic = basic;
        Ok(())
    }
}

/// A function or predicate as declared
#[derive(Debug, Clone)]
pub struct FunDecl {
    pub pos: Pos,
    pub name: String,
    pub params: Vec<VarDecl>,
    /// Return bound; `None` for predicates
    pub returns: Option<Expr>,
    pub body: Expr,
}

impl FunDecl {
    pub fn pred(pos: Pos, name: impl Into<String>, params: Vec<VarDecl>, body: Expr) -> Self {
        Self {
            pos,
            name: name.into(),
            params,
            returns: None,
            body,
        }
    }

    pub fn fun(
        pos: Pos,
        name: impl Into<String>,
        params: Vec<VarDecl>,
        returns: Expr,
        body: Expr,
    ) -> Self {
        Self {
            pos,
            name: name.into(),
            params,
            returns: Some(returns),
            body,
        }
    }
}

/// Function or predicate record
#[derive(Debug, Clone)]
pub struct Fun {
    pub id: FunId,
    pub pos: Pos,
    pub name: String,
    pub unit: UnitId,
    pub params: Vec<VarDecl>,
    pub returns: Option<Expr>,
    pub body: Expr,
}

impl Fun {
    pub fn is_pred(&self) -> bool {
        self.returns.is_none()
    }

    /// Number of parameter names
    pub fn arg_count(&self) -> usize {
        self.params.iter().map(|d| d.names.len()).sum()
    }

    /// One bound type per parameter name
    pub fn param_types(&self) -> impl Iterator<Item = &Type> {
        self.params
            .iter()
            .flat_map(|d| std::iter::repeat_n(d.value.ty(), d.names.len()))
    }

    /// Type of a call: the return bound's type, or a formula
    pub fn result_type(&self) -> Type {
        match &self.returns {
            Some(returns) => returns.ty().clone(),
            None => Type::formula(),
        }
    }
}

/// A named fact or assertion
#[derive(Debug, Clone)]
pub struct Fact {
    pub pos: Pos,
    pub name: String,
    pub value: Expr,
}

/// An `open` directive
#[derive(Debug, Clone, PartialEq)]
pub struct Open {
    pub pos: Pos,
    pub target: UnitId,
    /// Raw actual-parameter names
    pub args: Vec<String>,
}

/// One instance of a module
#[derive(Debug, Clone)]
pub struct Unit {
    pub id: UnitId,
    pub pos: Pos,
    /// Source path
    pub path: String,
    /// Names this instance is known by; the root unit's alias is empty
    pub aliases: Vec<String>,
    /// Formal parameter to bound signature
    pub params: IndexMap<String, Option<SigId>>,
    /// Alias to open directive
    pub opens: IndexMap<String, Open>,
    pub sigs: IndexMap<String, SigId>,
    pub funs: IndexMap<String, Vec<FunId>>,
    pub facts: Vec<Fact>,
    pub asserts: Vec<Fact>,
}

impl Unit {
    /// Alias used in diagnostics
    pub fn primary_alias(&self) -> &str {
        match self.aliases.first().map(String::as_str) {
            Some("") | None => "this",
            Some(alias) => alias,
        }
    }
}

/// Every unit of a run together with the signature and function arenas
#[derive(Debug, Clone)]
pub struct ModuleSet {
    units: IndexMap<UnitId, Unit>,
    sigs: Vec<Sig>,
    funs: Vec<Fun>,
    next_unit: u32,
}

impl Default for ModuleSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleSet {
    /// An empty set holding only the built-in signatures
    pub fn new() -> Self {
        let mut univ = Sig::builtin(SigId::UNIV, "univ", BasicType::univ());
        let none = Sig::builtin(SigId::NONE, "none", BasicType::none());
        let mut int = Sig::builtin(SigId::INT, "Int", BasicType::int());
        int.parent = Some(SigId::UNIV);
        univ.subs.push(SigId::INT);
        Self {
            units: IndexMap::new(),
            sigs: vec![univ, none, int],
            funs: Vec::new(),
            next_unit: 0,
        }
    }

    /// Add a module instance. The first unit added is the root and
    /// conventionally has an empty alias.
    pub fn add_unit(&mut self, path: impl Into<String>, alias: impl Into<String>) -> UnitId {
        let id = UnitId(self.next_unit);
        self.next_unit += 1;
        let path = path.into();
        self.units.insert(
            id,
            Unit {
                id,
                pos: Pos::new(path.as_str(), 0, 0),
                path,
                aliases: vec![alias.into()],
                params: IndexMap::new(),
                opens: IndexMap::new(),
                sigs: IndexMap::new(),
                funs: IndexMap::new(),
                facts: Vec::new(),
                asserts: Vec::new(),
            },
        );
        id
    }

    pub fn add_param(&mut self, unit: UnitId, name: impl Into<String>) {
        if let Some(u) = self.units.get_mut(&unit) {
            u.params.insert(name.into(), None);
        }
    }

    pub fn add_open(
        &mut self,
        unit: UnitId,
        pos: Pos,
        alias: impl Into<String>,
        target: UnitId,
        args: &[&str],
    ) {
        if let Some(u) = self.units.get_mut(&unit) {
            let args = args.iter().map(|a| a.to_string()).collect();
            u.opens.insert(alias.into(), Open { pos, target, args });
        }
    }

    pub fn add_sig(&mut self, unit: UnitId, decl: SigDecl) -> SigId {
        let id = SigId::new(self.sigs.len());
        let alias = self.units.get(&unit).map_or("this", Unit::primary_alias);
        let full_name = format!("{}/{}", alias, decl.name);
        let fields = decl
            .fields
            .iter()
            .flat_map(|d| {
                d.names.iter().map(|name| Field {
                    pos: d.pos.clone(),
                    name: name.clone(),
                    half_type: None,
                    full_type: None,
                })
            })
            .collect();
        self.sigs.push(Sig {
            id,
            pos: decl.pos,
            name: decl.name.clone(),
            unit: Some(unit),
            is_abstract: decl.is_abstract,
            mult: decl.mult,
            extends: decl.extends,
            subset_of: decl.subset_of,
            decls: decl.fields,
            fields,
            facts: decl.facts,
            subs: Vec::new(),
            full_name,
            parent: None,
            sups: Vec::new(),
            resolved: false,
            basic: None,
            ty: None,
        });
        if let Some(u) = self.units.get_mut(&unit) {
            u.sigs.insert(decl.name, id);
        }
        id
    }

    pub fn add_fun(&mut self, unit: UnitId, decl: FunDecl) -> FunId {
        let id = FunId::new(self.funs.len());
        if let Some(u) = self.units.get_mut(&unit) {
            u.funs.entry(decl.name.clone()).or_default().push(id);
        }
        self.funs.push(Fun {
            id,
            pos: decl.pos,
            name: decl.name,
            unit,
            params: decl.params,
            returns: decl.returns,
            body: decl.body,
        });
        id
    }

    pub fn add_fact(&mut self, unit: UnitId, pos: Pos, name: impl Into<String>, value: Expr) {
        if let Some(u) = self.units.get_mut(&unit) {
            u.facts.push(Fact { pos, name: name.into(), value });
        }
    }

    pub fn add_assert(&mut self, unit: UnitId, pos: Pos, name: impl Into<String>, value: Expr) {
        if let Some(u) = self.units.get_mut(&unit) {
            u.asserts.push(Fact { pos, name: name.into(), value });
        }
    }

    /// A live unit; `None` once merged away
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// Live units in declaration order
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    pub fn unit_ids(&self) -> Vec<UnitId> {
        self.units.keys().copied().collect()
    }

    pub(crate) fn units_mut(&mut self) -> impl Iterator<Item = &mut Unit> {
        self.units.values_mut()
    }

    pub(crate) fn remove_unit(&mut self, id: UnitId) -> Option<Unit> {
        self.units.shift_remove(&id)
    }

    pub fn sig(&self, id: SigId) -> &Sig {
        &self.sigs[id.index()]
    }

    pub fn sig_mut(&mut self, id: SigId) -> &mut Sig {
        &mut self.sigs[id.index()]
    }

    pub fn fun(&self, id: FunId) -> &Fun {
        &self.funs[id.index()]
    }

    pub fn fun_mut(&mut self, id: FunId) -> &mut Fun {
        &mut self.funs[id.index()]
    }

    /// Signatures of every live unit, in declaration order
    pub fn live_sigs(&self) -> Vec<SigId> {
        self.units.values().flat_map(|u| u.sigs.values().copied()).collect()
    }

    /// Functions of every live unit, in declaration order
    pub fn live_funs(&self) -> Vec<FunId> {
        self.units
            .values()
            .flat_map(|u| u.funs.values().flatten().copied())
            .collect()
    }

    /// Type of the built-in `Int` signature
    pub fn int_type(&self) -> &Type {
        self.sig(SigId::INT).ty().unwrap_or(&BUILTIN_EMPTY)
    }
}

static BUILTIN_EMPTY: Type = Type::empty();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_pretyped() {
        let set = ModuleSet::new();
        assert_eq!(set.sig(SigId::UNIV).subs, vec![SigId::INT]);
        assert!(set.sig(SigId::NONE).ty().unwrap().has_no_tuple());
        assert_eq!(set.int_type(), &Type::unary(BasicType::int()));
    }

    #[test]
    fn test_add_sig_expands_field_names() {
        let mut set = ModuleSet::new();
        let root = set.add_unit("m.als", "");
        let decl = SigDecl::new(Pos::unknown(), "A").field(VarDecl::new(
            Pos::unknown(),
            &["f", "g"],
            Expr::name(Pos::unknown(), "A"),
        ));
        let a = set.add_sig(root, decl);
        let sig = set.sig(a);
        assert_eq!(sig.full_name(), "this/A");
        assert_eq!(sig.fields.len(), 2);
        assert_eq!(sig.decls.len(), 1);
        assert_eq!(set.unit(root).unwrap().sigs.get("A"), Some(&a));
    }

    #[test]
    fn test_set_type_is_write_once() {
        let mut set = ModuleSet::new();
        let root = set.add_unit("m.als", "");
        let a = set.add_sig(root, SigDecl::new(Pos::unknown(), "A"));
        let sig = set.sig_mut(a);
        sig.set_type(Type::empty(), None).unwrap();
        assert!(matches!(sig.set_type(Type::empty(), None), Err(Error::Internal { .. })));
    }

    #[test]
    fn test_overloaded_funs_share_a_name() {
        let mut set = ModuleSet::new();
        let root = set.add_unit("m.als", "");
        let body = Expr::constant(Pos::unknown(), rela_ast::Constant::True);
        set.add_fun(root, FunDecl::pred(Pos::unknown(), "p", Vec::new(), body.clone()));
        set.add_fun(root, FunDecl::pred(Pos::unknown(), "p", Vec::new(), body));
        assert_eq!(set.unit(root).unwrap().funs["p"].len(), 2);
        assert_eq!(set.live_funs().len(), 2);
    }
}
