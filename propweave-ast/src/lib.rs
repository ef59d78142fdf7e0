#![forbid(unsafe_code)]

use std::fmt;

use miette::SourceSpan;

mod decl;
mod program;

pub use decl::{DeclArena, DeclId, DeclInfo, DeclKind};
pub use program::{Block, Implementation, Param, Procedure, ProcedureSig, Program};

pub type Span = SourceSpan;

pub fn span(start: usize, len: usize) -> Span {
    SourceSpan::new(start.into(), len)
}

pub fn span_between(start: usize, end: usize) -> Span {
    debug_assert!(end >= start);
    span(start, end - start)
}

/// Span for nodes synthesized by tooling rather than parsed from text.
pub fn no_span() -> Span {
    span(0, 0)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Type {
    Bool,
    Int,
    Real,
    BitVector(u32),
    Map { domain: Vec<Type>, range: Box<Type> },
    Named(String),
}

/// Coarse category of a [`Type`]: widths and map domains are ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeShape {
    Bool,
    Int,
    Real,
    BitVector,
    Map,
    Named,
}

impl Type {
    pub fn map(domain: Type, range: Type) -> Self {
        Type::Map {
            domain: vec![domain],
            range: Box::new(range),
        }
    }

    pub fn shape(&self) -> TypeShape {
        match self {
            Type::Bool => TypeShape::Bool,
            Type::Int => TypeShape::Int,
            Type::Real => TypeShape::Real,
            Type::BitVector(_) => TypeShape::BitVector,
            Type::Map { .. } => TypeShape::Map,
            Type::Named(_) => TypeShape::Named,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => f.write_str("bool"),
            Type::Int => f.write_str("int"),
            Type::Real => f.write_str("real"),
            Type::BitVector(w) => write!(f, "bv{w}"),
            Type::Map { domain, range } => {
                f.write_str("[")?;
                for (i, d) in domain.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{d}")?;
                }
                write!(f, "]{range}")
            }
            Type::Named(n) => f.write_str(n),
        }
    }
}

/// `{:key p1, p2}`
#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    pub key: String,
    pub params: Vec<AttrParam>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AttrParam {
    Str(String),
    Expr(Expr),
}

impl Attribute {
    pub fn flag(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(key: impl Into<String>, params: Vec<AttrParam>) -> Self {
        Self {
            key: key.into(),
            params,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Attributes(pub Vec<Attribute>);

impl Attributes {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn flags<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        Self(keys.into_iter().map(Attribute::flag).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.0.iter()
    }

    pub fn find(&self, key: &str) -> Option<&Attribute> {
        self.0.iter().find(|a| a.key == key)
    }

    pub fn push(&mut self, attr: Attribute) {
        self.0.push(attr);
    }
}

/// A use of a declared name. `decl` is `None` while unresolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentRef {
    pub name: String,
    pub decl: Option<DeclId>,
}

impl IdentRef {
    pub fn new(name: impl Into<String>, decl: DeclId) -> Self {
        Self {
            name: name.into(),
            decl: Some(decl),
        }
    }

    pub fn unresolved(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            decl: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Literal {
    Bool(bool),
    Int(i128),
    BitVector { value: u128, width: u32 },
    /// Decimal text, kept verbatim so equality is exact.
    Real(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Int(n) => write!(f, "{n}"),
            Literal::BitVector { value, width } => write!(f, "{value}bv{width}"),
            Literal::Real(r) => f.write_str(r),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,

    And,
    Or,
    Implies,
    Iff,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "div",
            BinOp::Mod => "mod",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::Implies => "==>",
            BinOp::Iff => "<==>",
        }
    }
}

/// The operator or function an [`ExprKind::Apply`] node applies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FunctionSymbol {
    Unary(UnaryOp),
    Binary(BinOp),
    /// `m[i, ...]`
    MapSelect,
    /// `m[i, ... := v]`
    MapStore,
    IfThenElse,
    /// Call of a named function; `decl` is set once the name is resolved.
    Call { name: String, decl: Option<DeclId> },
}

impl FunctionSymbol {
    pub fn call(name: impl Into<String>, decl: DeclId) -> Self {
        FunctionSymbol::Call {
            name: name.into(),
            decl: Some(decl),
        }
    }

    pub fn function_name(&self) -> &str {
        match self {
            FunctionSymbol::Unary(op) => op.symbol(),
            FunctionSymbol::Binary(op) => op.symbol(),
            FunctionSymbol::MapSelect => "MapSelect",
            FunctionSymbol::MapStore => "MapStore",
            FunctionSymbol::IfThenElse => "if-then-else",
            FunctionSymbol::Call { name, .. } => name,
        }
    }

    /// True for calls that resolve to a declared function.
    pub fn is_user_function(&self) -> bool {
        matches!(self, FunctionSymbol::Call { decl: Some(_), .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuantKind {
    Forall,
    Exists,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Ident(IdentRef),
    Literal(Literal),
    Apply {
        func: FunctionSymbol,
        args: Vec<Expr>,
    },
    Quantified {
        kind: QuantKind,
        bound: Vec<IdentRef>,
        body: Box<Expr>,
    },
}

impl Expr {
    pub fn new(span: Span, kind: ExprKind) -> Self {
        Self { span, kind }
    }

    pub fn ident(id: IdentRef) -> Self {
        Self::new(no_span(), ExprKind::Ident(id))
    }

    pub fn var(name: impl Into<String>, decl: DeclId) -> Self {
        Self::ident(IdentRef::new(name, decl))
    }

    pub fn lit(lit: Literal) -> Self {
        Self::new(no_span(), ExprKind::Literal(lit))
    }

    pub fn int(n: i128) -> Self {
        Self::lit(Literal::Int(n))
    }

    pub fn bool(b: bool) -> Self {
        Self::lit(Literal::Bool(b))
    }

    pub fn apply(func: FunctionSymbol, args: Vec<Expr>) -> Self {
        Self::new(no_span(), ExprKind::Apply { func, args })
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Self::apply(FunctionSymbol::Unary(op), vec![operand])
    }

    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Self {
        Self::apply(FunctionSymbol::Binary(op), vec![left, right])
    }

    pub fn select(map: Expr, index: Expr) -> Self {
        Self::apply(FunctionSymbol::MapSelect, vec![map, index])
    }

    pub fn store(map: Expr, index: Expr, value: Expr) -> Self {
        Self::apply(FunctionSymbol::MapStore, vec![map, index, value])
    }

    pub fn quantified(kind: QuantKind, bound: Vec<IdentRef>, body: Expr) -> Self {
        Self::new(
            no_span(),
            ExprKind::Quantified {
                kind,
                bound,
                body: Box::new(body),
            },
        )
    }

    pub fn forall(bound: Vec<IdentRef>, body: Expr) -> Self {
        Self::quantified(QuantKind::Forall, bound, body)
    }

    pub fn exists(bound: Vec<IdentRef>, body: Expr) -> Self {
        Self::quantified(QuantKind::Exists, bound, body)
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn as_ident(&self) -> Option<&IdentRef> {
        match &self.kind {
            ExprKind::Ident(id) => Some(id),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ExprKind::Ident(_) => "identifier",
            ExprKind::Literal(_) => "literal",
            ExprKind::Apply { .. } => "application",
            ExprKind::Quantified { .. } => "quantifier",
        }
    }

    /// Tree equality that ignores spans. Identifiers compare by declaration
    /// handle (by name only when both are unresolved).
    pub fn structurally_eq(&self, other: &Expr) -> bool {
        match (&self.kind, &other.kind) {
            (ExprKind::Ident(a), ExprKind::Ident(b)) => match (a.decl, b.decl) {
                (Some(x), Some(y)) => x == y,
                (None, None) => a.name == b.name,
                _ => false,
            },
            (ExprKind::Literal(a), ExprKind::Literal(b)) => a == b,
            (
                ExprKind::Apply { func: fa, args: aa },
                ExprKind::Apply { func: fb, args: ab },
            ) => {
                fa == fb
                    && aa.len() == ab.len()
                    && aa.iter().zip(ab).all(|(x, y)| x.structurally_eq(y))
            }
            (
                ExprKind::Quantified {
                    kind: ka,
                    bound: ba,
                    body: xa,
                },
                ExprKind::Quantified {
                    kind: kb,
                    bound: bb,
                    body: xb,
                },
            ) => ka == kb && ba == bb && xa.structurally_eq(xb),
            _ => false,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Ident(id) => f.write_str(&id.name),
            ExprKind::Literal(lit) => write!(f, "{lit}"),
            ExprKind::Apply { func, args } => match (func, args.as_slice()) {
                (FunctionSymbol::Unary(op), [a]) => write!(f, "{}{a}", op.symbol()),
                (FunctionSymbol::Binary(op), [l, r]) => write!(f, "({l} {} {r})", op.symbol()),
                (FunctionSymbol::MapSelect, [m, rest @ ..]) => {
                    write!(f, "{m}[")?;
                    write_list(f, rest)?;
                    f.write_str("]")
                }
                (FunctionSymbol::MapStore, [m, rest @ .., v]) => {
                    write!(f, "{m}[")?;
                    write_list(f, rest)?;
                    write!(f, " := {v}]")
                }
                (FunctionSymbol::IfThenElse, [c, t, e]) => write!(f, "(if {c} then {t} else {e})"),
                _ => {
                    write!(f, "{}(", func.function_name())?;
                    write_list(f, args)?;
                    f.write_str(")")
                }
            },
            ExprKind::Quantified { kind, bound, body } => {
                let q = match kind {
                    QuantKind::Forall => "forall",
                    QuantKind::Exists => "exists",
                };
                let names = bound
                    .iter()
                    .map(|b| b.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "({q} {names} :: {body})")
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, e) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{e}")?;
    }
    Ok(())
}

/// Assignment target.
#[derive(Clone, Debug, PartialEq)]
pub enum Lhs {
    Simple {
        span: Span,
        var: IdentRef,
    },
    /// `base[indices] := ...`; `base` nests for multi-dimensional writes.
    Map {
        span: Span,
        base: Box<Lhs>,
        indices: Vec<Expr>,
    },
}

impl Lhs {
    pub fn simple(var: IdentRef) -> Self {
        Lhs::Simple {
            span: no_span(),
            var,
        }
    }

    pub fn map(base: Lhs, indices: Vec<Expr>) -> Self {
        Lhs::Map {
            span: no_span(),
            base: Box::new(base),
            indices,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Lhs::Simple { span, .. } | Lhs::Map { span, .. } => *span,
        }
    }

    /// The variable ultimately written.
    pub fn root(&self) -> &IdentRef {
        match self {
            Lhs::Simple { var, .. } => var,
            Lhs::Map { base, .. } => base.root(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Cmd {
    pub span: Span,
    pub kind: CmdKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CmdKind {
    Assert(Expr),
    Assume(Expr),
    Assign(Vec<(Lhs, Expr)>),
    Call {
        callee: String,
        decl: Option<DeclId>,
        ins: Vec<Expr>,
        outs: Vec<IdentRef>,
    },
    Havoc(Vec<IdentRef>),
}

impl Cmd {
    pub fn new(span: Span, kind: CmdKind) -> Self {
        Self { span, kind }
    }

    pub fn assert(expr: Expr) -> Self {
        Self::new(no_span(), CmdKind::Assert(expr))
    }

    pub fn assume(expr: Expr) -> Self {
        Self::new(no_span(), CmdKind::Assume(expr))
    }

    pub fn assign(pairs: Vec<(Lhs, Expr)>) -> Self {
        Self::new(no_span(), CmdKind::Assign(pairs))
    }

    pub fn call(
        callee: impl Into<String>,
        decl: Option<DeclId>,
        ins: Vec<Expr>,
        outs: Vec<IdentRef>,
    ) -> Self {
        Self::new(
            no_span(),
            CmdKind::Call {
                callee: callee.into(),
                decl,
                ins,
                outs,
            },
        )
    }

    pub fn havoc(vars: Vec<IdentRef>) -> Self {
        Self::new(no_span(), CmdKind::Havoc(vars))
    }
}
