#![forbid(unsafe_code)]

use crate::{Attributes, Type};

/// Handle to a declared entity. Two handles denote the same entity iff they
/// are equal; declarations themselves live in a [`DeclArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeclId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeclKind {
    Local,
    Formal,
    Global,
    Constant,
    /// Variable bound by a quantifier.
    Bound,
    Function,
    Procedure,
}

impl DeclKind {
    pub fn display(&self) -> &'static str {
        match self {
            DeclKind::Local => "local",
            DeclKind::Formal => "formal",
            DeclKind::Global => "global",
            DeclKind::Constant => "constant",
            DeclKind::Bound => "bound",
            DeclKind::Function => "function",
            DeclKind::Procedure => "procedure",
        }
    }

    pub fn is_variable(&self) -> bool {
        !matches!(self, DeclKind::Function | DeclKind::Procedure)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeclInfo {
    pub name: String,
    pub kind: DeclKind,
    pub ty: Type,
    pub attributes: Attributes,
}

/// Owns every declaration of a program and hands out [`DeclId`]s.
#[derive(Clone, Debug, Default)]
pub struct DeclArena {
    decls: Vec<DeclInfo>,
}

impl DeclArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, info: DeclInfo) -> DeclId {
        let id = next_id(self.decls.len());
        self.decls.push(info);
        id
    }

    pub fn declare(&mut self, name: impl Into<String>, kind: DeclKind, ty: Type) -> DeclId {
        self.alloc(DeclInfo {
            name: name.into(),
            kind,
            ty,
            attributes: Attributes::new(),
        })
    }

    pub fn fresh_local(&mut self, name: impl Into<String>, ty: Type) -> DeclId {
        self.declare(name, DeclKind::Local, ty)
    }

    pub fn fresh_formal(&mut self, name: impl Into<String>, ty: Type) -> DeclId {
        self.declare(name, DeclKind::Formal, ty)
    }

    pub fn fresh_global(&mut self, name: impl Into<String>, ty: Type) -> DeclId {
        self.declare(name, DeclKind::Global, ty)
    }

    pub fn fresh_bound(&mut self, name: impl Into<String>, ty: Type) -> DeclId {
        self.declare(name, DeclKind::Bound, ty)
    }

    /// Declares a function; `ty` is its result type.
    pub fn fresh_function(&mut self, name: impl Into<String>, ty: Type) -> DeclId {
        self.declare(name, DeclKind::Function, ty)
    }

    pub fn get(&self, id: DeclId) -> Option<&DeclInfo> {
        self.decls.get(id.0 as usize)
    }

    pub fn name(&self, id: DeclId) -> Option<&str> {
        self.get(id).map(|d| d.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DeclId, &DeclInfo)> {
        self.decls
            .iter()
            .enumerate()
            .map(|(i, d)| (DeclId(i as u32), d))
    }
}

fn next_id(len: usize) -> DeclId {
    DeclId(u32::try_from(len).expect("declaration arena holds more than u32::MAX entries"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_follow_allocation_order() {
        let mut arena = DeclArena::new();
        let ids: Vec<DeclId> = (0..3).map(|i| arena.fresh_local(format!("v{i}"), Type::Int)).collect();
        assert_eq!(ids, vec![DeclId(0), DeclId(1), DeclId(2)]);
        assert_eq!(next_id(u32::MAX as usize), DeclId(u32::MAX));
    }

    #[test]
    #[should_panic(expected = "more than u32::MAX")]
    fn id_overflow_panics_instead_of_wrapping() {
        let _ = next_id(u32::MAX as usize + 1);
    }

    #[test]
    fn handles_are_distinct_even_for_equal_names() {
        let mut arena = DeclArena::new();
        let a = arena.fresh_local("x", Type::Int);
        let b = arena.fresh_local("x", Type::Int);
        assert_ne!(a, b);
        assert_eq!(arena.name(a), Some("x"));
        assert_eq!(arena.name(b), Some("x"));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn kinds_are_recorded() {
        let mut arena = DeclArena::new();
        let f = arena.fresh_function("f", Type::Bool);
        let g = arena.fresh_global("Mem", Type::map(Type::Int, Type::Int));
        assert_eq!(arena.get(f).map(|d| d.kind), Some(DeclKind::Function));
        assert_eq!(arena.get(g).map(|d| d.kind), Some(DeclKind::Global));
        assert!(!DeclKind::Function.is_variable());
        assert!(DeclKind::Bound.is_variable());
        assert!(arena.get(DeclId(42)).is_none());
    }
}
