#![forbid(unsafe_code)]

use propweave_ast::{Cmd, DeclId, Expr, ExprKind, FunctionSymbol, IdentRef, QuantKind};

use crate::visit::{Visitor, walk_apply};

/// An indexed read `base[index]`.
#[derive(Clone, Debug, PartialEq)]
pub struct MemAccess {
    pub base: DeclId,
    pub index: Expr,
}

#[derive(Default)]
struct MemAccessCollector {
    accesses: Vec<MemAccess>,
}

impl<'a> Visitor<'a> for MemAccessCollector {
    fn visit_apply(&mut self, func: &'a FunctionSymbol, args: &'a [Expr]) {
        if let (FunctionSymbol::MapSelect, [map, index]) = (func, args) {
            if let ExprKind::Ident(IdentRef { decl: Some(base), .. }) = &map.kind {
                self.accesses.push(MemAccess {
                    base: *base,
                    index: index.clone(),
                });
            }
        }
        walk_apply(self, func, args);
    }

    // Quantified sub-expressions are opaque: reads under a binder are not
    // reported.
    fn visit_quantified(&mut self, _kind: QuantKind, _bound: &'a [IdentRef], _body: &'a Expr) {}
}

/// Collects every single-index map read whose map is a plain variable,
/// outermost first. Reads nested inside quantifiers are skipped.
pub fn collect_mem_accesses(expr: &Expr) -> Vec<MemAccess> {
    let mut c = MemAccessCollector::default();
    c.visit_expr(expr);
    c.accesses
}

/// Same as [`collect_mem_accesses`] over every expression `cmd` reads:
/// guards, right-hand sides, map-target indices and call arguments.
pub fn collect_cmd_mem_accesses(cmd: &Cmd) -> Vec<MemAccess> {
    let mut c = MemAccessCollector::default();
    c.visit_cmd(cmd);
    c.accesses
}
