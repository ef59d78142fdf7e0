#![forbid(unsafe_code)]

use crate::{Attributes, Cmd, DeclArena, DeclId, DeclKind, Expr, Span, Type, no_span};

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: String,
    pub decl: Option<DeclId>,
    pub kind: DeclKind,
    pub ty: Type,
    pub attributes: Attributes,
}

impl Param {
    pub fn new(name: impl Into<String>, kind: DeclKind, ty: Type) -> Self {
        Self {
            name: name.into(),
            decl: None,
            kind,
            ty,
            attributes: Attributes::new(),
        }
    }

    pub fn formal(name: impl Into<String>, ty: Type) -> Self {
        Self::new(name, DeclKind::Formal, ty)
    }

    /// Builds a parameter from a declaration already in `arena`.
    pub fn from_decl(arena: &DeclArena, id: DeclId) -> Option<Self> {
        let info = arena.get(id)?;
        Some(Self {
            name: info.name.clone(),
            decl: Some(id),
            kind: info.kind,
            ty: info.ty.clone(),
            attributes: info.attributes.clone(),
        })
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProcedureSig {
    pub span: Span,
    pub name: String,
    pub attributes: Attributes,
    pub ins: Vec<Param>,
    pub outs: Vec<Param>,
}

impl ProcedureSig {
    pub fn new(name: impl Into<String>, ins: Vec<Param>, outs: Vec<Param>) -> Self {
        Self {
            span: no_span(),
            name: name.into(),
            attributes: Attributes::new(),
            ins,
            outs,
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Procedure {
    pub sig: ProcedureSig,
    pub requires: Vec<Expr>,
    pub ensures: Vec<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub label: String,
    pub cmds: Vec<Cmd>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Implementation {
    pub sig: ProcedureSig,
    pub locals: Vec<DeclId>,
    pub blocks: Vec<Block>,
}

impl Implementation {
    pub fn cmds(&self) -> impl Iterator<Item = &Cmd> {
        self.blocks.iter().flat_map(|b| b.cmds.iter())
    }
}

#[derive(Clone, Debug, Default)]
pub struct Program {
    pub decls: DeclArena,
    pub procedures: Vec<Procedure>,
    pub implementations: Vec<Implementation>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn procedure(&self, name: &str) -> Option<&Procedure> {
        self.procedures.iter().find(|p| p.sig.name == name)
    }

    pub fn implementation(&self, name: &str) -> Option<&Implementation> {
        self.implementations.iter().find(|i| i.sig.name == name)
    }
}
