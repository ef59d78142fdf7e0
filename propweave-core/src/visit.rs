#![forbid(unsafe_code)]

//! Read-only traversal over expressions, assignment targets and commands.
//!
//! Implementors override the `visit_*` hooks they care about and call the
//! matching `walk_*` function to keep descending.

use std::collections::BTreeSet;

use propweave_ast::{
    Cmd, CmdKind, DeclId, Expr, ExprKind, FunctionSymbol, IdentRef, Lhs, Literal, QuantKind,
};

pub trait Visitor<'a> {
    fn visit_expr(&mut self, expr: &'a Expr) {
        walk_expr(self, expr);
    }

    fn visit_ident(&mut self, _id: &'a IdentRef) {}

    fn visit_literal(&mut self, _lit: &'a Literal) {}

    fn visit_apply(&mut self, func: &'a FunctionSymbol, args: &'a [Expr]) {
        walk_apply(self, func, args);
    }

    fn visit_quantified(&mut self, kind: QuantKind, bound: &'a [IdentRef], body: &'a Expr) {
        walk_quantified(self, kind, bound, body);
    }

    fn visit_lhs(&mut self, lhs: &'a Lhs) {
        walk_lhs(self, lhs);
    }

    fn visit_cmd(&mut self, cmd: &'a Cmd) {
        walk_cmd(self, cmd);
    }
}

pub fn walk_expr<'a, V: Visitor<'a> + ?Sized>(v: &mut V, expr: &'a Expr) {
    match &expr.kind {
        ExprKind::Ident(id) => v.visit_ident(id),
        ExprKind::Literal(lit) => v.visit_literal(lit),
        ExprKind::Apply { func, args } => v.visit_apply(func, args),
        ExprKind::Quantified { kind, bound, body } => v.visit_quantified(*kind, bound, body),
    }
}

pub fn walk_apply<'a, V: Visitor<'a> + ?Sized>(v: &mut V, _func: &'a FunctionSymbol, args: &'a [Expr]) {
    for arg in args {
        v.visit_expr(arg);
    }
}

/// Binders are declarations, not uses, so only the body is visited.
pub fn walk_quantified<'a, V: Visitor<'a> + ?Sized>(
    v: &mut V,
    _kind: QuantKind,
    _bound: &'a [IdentRef],
    body: &'a Expr,
) {
    v.visit_expr(body);
}

pub fn walk_lhs<'a, V: Visitor<'a> + ?Sized>(v: &mut V, lhs: &'a Lhs) {
    match lhs {
        Lhs::Simple { var, .. } => v.visit_ident(var),
        Lhs::Map { base, indices, .. } => {
            v.visit_lhs(base);
            for idx in indices {
                v.visit_expr(idx);
            }
        }
    }
}

pub fn walk_cmd<'a, V: Visitor<'a> + ?Sized>(v: &mut V, cmd: &'a Cmd) {
    match &cmd.kind {
        CmdKind::Assert(e) | CmdKind::Assume(e) => v.visit_expr(e),
        CmdKind::Assign(pairs) => {
            for (lhs, rhs) in pairs {
                v.visit_lhs(lhs);
                v.visit_expr(rhs);
            }
        }
        CmdKind::Call { ins, outs, .. } => {
            for e in ins {
                v.visit_expr(e);
            }
            for out in outs {
                v.visit_ident(out);
            }
        }
        CmdKind::Havoc(vars) => {
            for var in vars {
                v.visit_ident(var);
            }
        }
    }
}

#[derive(Default)]
struct IdentCollector<'a> {
    found: Vec<&'a IdentRef>,
}

impl<'a> Visitor<'a> for IdentCollector<'a> {
    fn visit_ident(&mut self, id: &'a IdentRef) {
        self.found.push(id);
    }
}

/// Every identifier occurrence in `expr`, in pre-order, including those
/// under quantifiers.
pub fn collect_identifiers(expr: &Expr) -> Vec<&IdentRef> {
    let mut c = IdentCollector::default();
    c.visit_expr(expr);
    c.found
}

pub fn collect_cmd_identifiers(cmd: &Cmd) -> Vec<&IdentRef> {
    let mut c = IdentCollector::default();
    c.visit_cmd(cmd);
    c.found
}

#[derive(Default)]
struct FreeDecls {
    bound: Vec<DeclId>,
    free: BTreeSet<DeclId>,
}

impl<'a> Visitor<'a> for FreeDecls {
    fn visit_ident(&mut self, id: &'a IdentRef) {
        if let Some(d) = id.decl {
            if !self.bound.contains(&d) {
                self.free.insert(d);
            }
        }
    }

    fn visit_quantified(&mut self, kind: QuantKind, bound: &'a [IdentRef], body: &'a Expr) {
        let depth = self.bound.len();
        self.bound.extend(bound.iter().filter_map(|b| b.decl));
        walk_quantified(self, kind, bound, body);
        self.bound.truncate(depth);
    }
}

/// Declarations referenced by `expr` that are not bound by an enclosing
/// quantifier inside it.
pub fn free_decls(expr: &Expr) -> BTreeSet<DeclId> {
    let mut v = FreeDecls::default();
    v.visit_expr(expr);
    v.free
}
