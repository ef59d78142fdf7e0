#![forbid(unsafe_code)]

//! Instantiating templates with a [`Substitution`].
//!
//! Every rule rebuilds its node, so the result never shares structure with
//! the template or with the bound expressions: each substitution site gets
//! its own copy.

use std::collections::BTreeMap;

use propweave_ast::{Cmd, CmdKind, DeclId, Expr, ExprKind, FunctionSymbol, IdentRef, Lhs, Span};

use crate::error::InstantiateError;

/// Bindings produced by a successful match: wildcard declarations to the
/// expressions they captured, and pattern function names to the concrete
/// functions found in their place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Substitution {
    pub values: BTreeMap<DeclId, Expr>,
    pub functions: BTreeMap<String, FunctionSymbol>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value_only(values: BTreeMap<DeclId, Expr>) -> Self {
        Self {
            values,
            functions: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.functions.is_empty()
    }

    pub fn value(&self, decl: DeclId) -> Option<&Expr> {
        self.values.get(&decl)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionSymbol> {
        self.functions.get(name)
    }
}

/// Template fragments that can be instantiated.
pub trait Instantiate: Sized {
    fn instantiate(&self, subst: &Substitution) -> Result<Self, InstantiateError>;
}

impl Instantiate for Expr {
    fn instantiate(&self, subst: &Substitution) -> Result<Self, InstantiateError> {
        Ok(Substituter::new(subst).expr(self))
    }
}

impl Instantiate for Lhs {
    fn instantiate(&self, subst: &Substitution) -> Result<Self, InstantiateError> {
        Substituter::new(subst).lhs(self)
    }
}

impl Instantiate for Cmd {
    fn instantiate(&self, subst: &Substitution) -> Result<Self, InstantiateError> {
        Substituter::new(subst).cmd(self)
    }
}

impl Instantiate for Vec<Cmd> {
    fn instantiate(&self, subst: &Substitution) -> Result<Self, InstantiateError> {
        instantiate_cmds(self, subst)
    }
}

pub fn instantiate_cmds(cmds: &[Cmd], subst: &Substitution) -> Result<Vec<Cmd>, InstantiateError> {
    Substituter::new(subst).cmds(cmds)
}

pub struct Substituter<'s> {
    subst: &'s Substitution,
    /// Bound variables whose binding is hidden by an enclosing quantifier.
    shadowed: Vec<DeclId>,
}

impl<'s> Substituter<'s> {
    pub fn new(subst: &'s Substitution) -> Self {
        Self {
            subst,
            shadowed: Vec::new(),
        }
    }

    fn lookup(&self, id: &IdentRef) -> Option<&'s Expr> {
        let decl = id.decl?;
        if self.shadowed.contains(&decl) {
            return None;
        }
        self.subst.values.get(&decl)
    }

    pub fn expr(&mut self, expr: &Expr) -> Expr {
        match &expr.kind {
            ExprKind::Ident(id) => match self.lookup(id) {
                Some(bound) => bound.clone(),
                None => Expr::new(expr.span, ExprKind::Ident(id.clone())),
            },
            ExprKind::Literal(lit) => Expr::new(expr.span, ExprKind::Literal(lit.clone())),
            ExprKind::Apply { func, args } => {
                let new_args: Vec<Expr> = args.iter().map(|a| self.expr(a)).collect();
                let new_func = self
                    .subst
                    .functions
                    .get(func.function_name())
                    .unwrap_or(func)
                    .clone();
                Expr::new(
                    expr.span,
                    ExprKind::Apply {
                        func: new_func,
                        args: new_args,
                    },
                )
            }
            ExprKind::Quantified { kind, bound, body } => {
                let depth = self.shadowed.len();
                let mut new_bound = Vec::with_capacity(bound.len());
                for b in bound {
                    match self.lookup(b) {
                        Some(Expr {
                            kind: ExprKind::Ident(renamed),
                            ..
                        }) => new_bound.push(renamed.clone()),
                        Some(_) => {
                            if let Some(d) = b.decl {
                                self.shadowed.push(d);
                            }
                            new_bound.push(b.clone());
                        }
                        None => new_bound.push(b.clone()),
                    }
                }
                let new_body = self.expr(body);
                self.shadowed.truncate(depth);
                Expr::new(
                    expr.span,
                    ExprKind::Quantified {
                        kind: *kind,
                        bound: new_bound,
                        body: Box::new(new_body),
                    },
                )
            }
        }
    }

    /// Substitutes a variable in a position that must stay a variable.
    /// `Err` carries the offending replacement.
    fn target(&self, var: &IdentRef) -> Result<IdentRef, &'s Expr> {
        match self.lookup(var) {
            None => Ok(var.clone()),
            Some(Expr {
                kind: ExprKind::Ident(renamed),
                ..
            }) => Ok(renamed.clone()),
            Some(other) => {
                tracing::debug!(var = %var.name, found = %other, "substituted target is not an identifier");
                Err(other)
            }
        }
    }

    pub fn lhs(&mut self, lhs: &Lhs) -> Result<Lhs, InstantiateError> {
        match lhs {
            Lhs::Simple { span, var } => {
                let var = self.target(var).map_err(|found| InstantiateError::LhsNotIdentifier {
                    var: var.name.clone(),
                    found: found.to_string(),
                    span: *span,
                })?;
                Ok(Lhs::Simple { span: *span, var })
            }
            Lhs::Map {
                span,
                base,
                indices,
            } => {
                let indices = indices.iter().map(|i| self.expr(i)).collect();
                let base = self.lhs(base)?;
                Ok(Lhs::Map {
                    span: *span,
                    base: Box::new(base),
                    indices,
                })
            }
        }
    }

    fn outputs(
        &self,
        vars: &[IdentRef],
        span: Span,
        err: fn(String, String, Span) -> InstantiateError,
    ) -> Result<Vec<IdentRef>, InstantiateError> {
        vars.iter()
            .map(|v| {
                self.target(v)
                    .map_err(|found| err(v.name.clone(), found.to_string(), span))
            })
            .collect()
    }

    pub fn cmd(&mut self, cmd: &Cmd) -> Result<Cmd, InstantiateError> {
        let kind = match &cmd.kind {
            CmdKind::Assert(e) => CmdKind::Assert(self.expr(e)),
            CmdKind::Assume(e) => CmdKind::Assume(self.expr(e)),
            CmdKind::Assign(pairs) => {
                let mut out = Vec::with_capacity(pairs.len());
                for (lhs, rhs) in pairs {
                    out.push((self.lhs(lhs)?, self.expr(rhs)));
                }
                CmdKind::Assign(out)
            }
            CmdKind::Call {
                callee,
                decl,
                ins,
                outs,
            } => {
                let (callee, decl) = match self.subst.functions.get(callee.as_str()) {
                    Some(FunctionSymbol::Call { name, decl }) => (name.clone(), *decl),
                    _ => (callee.clone(), *decl),
                };
                let ins = ins.iter().map(|e| self.expr(e)).collect();
                let outs = self.outputs(outs, cmd.span, |var, found, span| {
                    InstantiateError::CallOutNotIdentifier { var, found, span }
                })?;
                CmdKind::Call {
                    callee,
                    decl,
                    ins,
                    outs,
                }
            }
            CmdKind::Havoc(vars) => CmdKind::Havoc(self.outputs(vars, cmd.span, |var, found, span| {
                InstantiateError::HavocNotIdentifier { var, found, span }
            })?),
        };
        Ok(Cmd::new(cmd.span, kind))
    }

    pub fn cmds(&mut self, cmds: &[Cmd]) -> Result<Vec<Cmd>, InstantiateError> {
        cmds.iter().map(|c| self.cmd(c)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propweave_ast::{BinOp, DeclArena, Type};

    struct Fixture {
        arena: DeclArena,
        x: DeclId,
        y: DeclId,
        m: DeclId,
    }

    fn fixture() -> Fixture {
        let mut arena = DeclArena::new();
        let x = arena.fresh_local("x", Type::Int);
        let y = arena.fresh_local("y", Type::Int);
        let m = arena.fresh_global("M", Type::map(Type::Int, Type::Int));
        Fixture { arena, x, y, m }
    }

    fn bind(pairs: Vec<(DeclId, Expr)>) -> Substitution {
        Substitution::value_only(pairs.into_iter().collect())
    }

    #[test]
    fn bound_identifier_is_replaced() {
        let f = fixture();
        let s = bind(vec![(f.x, Expr::int(7))]);
        let t = Expr::binary(BinOp::Add, Expr::var("x", f.x), Expr::var("y", f.y));
        let got = t.instantiate(&s).expect("expr");
        let want = Expr::binary(BinOp::Add, Expr::int(7), Expr::var("y", f.y));
        assert!(got.structurally_eq(&want), "{got}");
    }

    #[test]
    fn every_site_gets_its_own_copy() {
        let f = fixture();
        let s = bind(vec![(f.x, Expr::select(Expr::var("M", f.m), Expr::int(0)))]);
        let t = Expr::binary(BinOp::Eq, Expr::var("x", f.x), Expr::var("x", f.x));
        let mut got = t.instantiate(&s).expect("expr");
        if let ExprKind::Apply { args, .. } = &mut got.kind {
            args[0] = Expr::int(1);
            assert!(args[1].structurally_eq(s.value(f.x).expect("bound")));
        } else {
            panic!("expected application, got {got}");
        }
        assert!(s.value(f.x).expect("bound").structurally_eq(&Expr::select(Expr::var("M", f.m), Expr::int(0))));
    }

    #[test]
    fn function_symbols_are_renamed() {
        let mut f = fixture();
        let pat_fn = f.arena.fresh_function("Valid", Type::Bool);
        let real_fn = f.arena.fresh_function("IsAlloc", Type::Bool);
        let mut s = Substitution::new();
        s.functions
            .insert("Valid".to_string(), FunctionSymbol::call("IsAlloc", real_fn));
        let t = Expr::apply(FunctionSymbol::call("Valid", pat_fn), vec![Expr::var("x", f.x)]);
        let got = t.instantiate(&s).expect("expr");
        let want = Expr::apply(FunctionSymbol::call("IsAlloc", real_fn), vec![Expr::var("x", f.x)]);
        assert!(got.structurally_eq(&want), "{got}");
    }

    #[test]
    fn simple_lhs_renamed_to_identifier() {
        let f = fixture();
        let s = bind(vec![(f.x, Expr::var("y", f.y))]);
        let got = Lhs::simple(IdentRef::new("x", f.x)).instantiate(&s).expect("lhs");
        assert_eq!(got.root().decl, Some(f.y));
    }

    #[test]
    fn simple_lhs_bound_to_non_identifier_is_fatal() {
        let f = fixture();
        let s = bind(vec![(f.x, Expr::int(3))]);
        let err = Lhs::simple(IdentRef::new("x", f.x))
            .instantiate(&s)
            .expect_err("must fail");
        assert!(matches!(err, InstantiateError::LhsNotIdentifier { .. }), "{err}");
        assert!(err.to_string().contains("must remain an identifier"));
    }

    #[test]
    fn nested_map_lhs_substitutes_base_and_indices() {
        let f = fixture();
        let other = Expr::var("y", f.y);
        let s = bind(vec![(f.x, other.clone())]);
        let lhs = Lhs::map(
            Lhs::map(Lhs::simple(IdentRef::new("M", f.m)), vec![Expr::var("x", f.x)]),
            vec![Expr::int(1)],
        );
        let got = lhs.instantiate(&s).expect("lhs");
        let Lhs::Map { base, indices, .. } = &got else {
            panic!("expected map target");
        };
        assert!(indices[0].structurally_eq(&Expr::int(1)));
        let Lhs::Map { indices: inner, .. } = base.as_ref() else {
            panic!("expected nested map target");
        };
        assert!(inner[0].structurally_eq(&other));
        assert_eq!(got.root().decl, Some(f.m));
    }

    #[test]
    fn assign_pairs_substituted_in_order() {
        let f = fixture();
        let s = bind(vec![(f.x, Expr::var("y", f.y)), (f.y, Expr::int(2))]);
        let cmd = Cmd::assign(vec![
            (Lhs::simple(IdentRef::new("x", f.x)), Expr::var("y", f.y)),
            (Lhs::simple(IdentRef::new("M", f.m)), Expr::var("x", f.x)),
        ]);
        let got = cmd.instantiate(&s).expect("cmd");
        let CmdKind::Assign(pairs) = &got.kind else {
            panic!("expected assignment");
        };
        assert_eq!(pairs[0].0.root().decl, Some(f.y));
        assert!(pairs[0].1.structurally_eq(&Expr::int(2)));
        assert_eq!(pairs[1].0.root().decl, Some(f.m));
        assert!(pairs[1].1.structurally_eq(&Expr::var("y", f.y)));
    }

    #[test]
    fn command_sequences_keep_every_kind() {
        let f = fixture();
        let s = bind(vec![(f.x, Expr::var("y", f.y))]);
        let cmds = vec![
            Cmd::assert(Expr::var("x", f.x)),
            Cmd::assume(Expr::var("x", f.x)),
            Cmd::call("P", None, vec![Expr::var("x", f.x)], vec![IdentRef::new("x", f.x)]),
            Cmd::havoc(vec![IdentRef::new("x", f.x)]),
        ];
        let got = instantiate_cmds(&cmds, &s).expect("cmds");
        assert_eq!(got.len(), 4);
        match &got[2].kind {
            CmdKind::Call { ins, outs, .. } => {
                assert!(ins[0].structurally_eq(&Expr::var("y", f.y)));
                assert_eq!(outs[0].decl, Some(f.y));
            }
            other => panic!("expected call, got {other:?}"),
        }
        match &got[3].kind {
            CmdKind::Havoc(vars) => assert_eq!(vars[0].decl, Some(f.y)),
            other => panic!("expected havoc, got {other:?}"),
        }
    }

    #[test]
    fn call_outputs_must_stay_identifiers() {
        let f = fixture();
        let s = bind(vec![(f.x, Expr::int(0))]);
        let cmd = Cmd::call("P", None, vec![], vec![IdentRef::new("x", f.x)]);
        assert!(matches!(
            cmd.instantiate(&s),
            Err(InstantiateError::CallOutNotIdentifier { .. })
        ));
        let havoc = Cmd::havoc(vec![IdentRef::new("x", f.x)]);
        assert!(matches!(
            havoc.instantiate(&s),
            Err(InstantiateError::HavocNotIdentifier { .. })
        ));
    }

    #[test]
    fn quantifier_binders_are_renamed_or_shadowed() {
        let mut f = fixture();
        let i = f.arena.fresh_bound("i", Type::Int);
        let j = f.arena.fresh_bound("j", Type::Int);
        let body = Expr::select(Expr::var("M", f.m), Expr::var("i", i));
        let q = Expr::forall(vec![IdentRef::new("i", i)], body);

        let renamed = q.instantiate(&bind(vec![(i, Expr::var("j", j))])).expect("expr");
        let want = Expr::forall(
            vec![IdentRef::new("j", j)],
            Expr::select(Expr::var("M", f.m), Expr::var("j", j)),
        );
        assert!(renamed.structurally_eq(&want), "{renamed}");

        let shadowed = q.instantiate(&bind(vec![(i, Expr::int(5))])).expect("expr");
        assert!(shadowed.structurally_eq(&q), "{shadowed}");
    }

    #[test]
    fn empty_substitution_copies() {
        let f = fixture();
        let t = Expr::binary(BinOp::And, Expr::var("x", f.x), Expr::bool(true));
        let got = t.instantiate(&Substitution::new()).expect("expr");
        assert_eq!(got, t);
    }
}
