use super::stmt::MethodBody;
use super::types::TypeRef;
use crate::parser::{HasSpan, Span};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub is_public: bool,
    pub is_protected: bool,
    pub is_private: bool,
    pub is_static: bool,
    pub is_final: bool,
    pub is_abstract: bool,
    pub is_native: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub type_ref: TypeRef,
    pub modifiers: Modifiers,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub type_ref: TypeRef,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Method {
    pub name: String,
    pub modifiers: Modifiers,
    pub annotations: Vec<Annotation>,
    pub is_ctor: bool,
    /// `void` for constructors
    pub ret: TypeRef,
    pub params: Vec<Param>,
    pub throws: Vec<TypeRef>,
    /// `None` for abstract, native and interface methods
    pub body: Option<MethodBody>,
    pub span: Span,
}

impl Method {
    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotations.iter().any(|a| a.name == name)
    }
}

/// Class or interface
#[derive(Debug, Clone)]
pub struct Unit {
    pub name: String,
    pub is_interface: bool,
    pub modifiers: Modifiers,
    pub annotations: Vec<Annotation>,
    pub superclass: Option<TypeRef>,
    pub interfaces: Vec<TypeRef>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
    pub span: Span,
}

impl Unit {
    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotations.iter().any(|a| a.name == name)
    }
}

impl HasSpan for Unit {
    fn span(&self) -> Span {
        self.span
    }
}

impl HasSpan for Method {
    fn span(&self) -> Span {
        self.span
    }
}

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub units: Vec<Unit>,
}

impl Program {
    pub fn unit(&self, name: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.name == name)
    }

    /// Merge the units of another parsed file
    pub fn extend(&mut self, other: Program) {
        self.units.extend(other.units);
    }
}
