use std::fmt;

use crate::parser::{HasSpan, Span};

/// Representation tag of a `null` literal once it has been matched
/// against a destination type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NullKind {
    /// Not yet specialized; only valid before resolution finishes
    Unspecialized,
    /// One-word null (class references, `String`, `Ptr`)
    Plain,
    /// Two-word null (interface references, `FarPtr`)
    Far,
}

/// Resolved type of a value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Unresolved,
    Void,
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Ptr,
    FarPtr,
    Null(NullKind),
    Class(String),
    Interface(String),
}

impl Type {
    /// Map a primitive or raw-address type name
    pub fn from_keyword(name: &str) -> Option<Type> {
        Some(match name {
            "void" => Type::Void,
            "boolean" => Type::Boolean,
            "byte" => Type::Byte,
            "short" => Type::Short,
            "char" => Type::Char,
            "int" => Type::Int,
            "long" => Type::Long,
            crate::common::consts::PTR => Type::Ptr,
            crate::common::consts::FAR_PTR => Type::FarPtr,
            _ => return None,
        })
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, Type::Byte | Type::Short | Type::Char | Type::Int | Type::Long)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, Type::Boolean)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Type::Null(_))
    }

    /// Types whose values are addresses
    pub fn is_pointer(&self) -> bool {
        matches!(
            self,
            Type::Ptr | Type::FarPtr | Type::Null(_) | Type::Class(_) | Type::Interface(_)
        )
    }

    /// Pointer types needing two words
    pub fn is_far(&self) -> bool {
        matches!(self, Type::FarPtr | Type::Interface(_) | Type::Null(NullKind::Far))
    }

    pub fn class_name(&self) -> Option<&str> {
        match self {
            Type::Class(n) | Type::Interface(n) => Some(n),
            _ => None,
        }
    }

    /// Storage size in bytes before word alignment
    pub fn size(&self, word_size: u32) -> u32 {
        match self {
            Type::Unresolved | Type::Void => 0,
            Type::Boolean | Type::Byte => 1,
            Type::Short | Type::Char => 2,
            Type::Int => 4,
            Type::Long => 8,
            Type::Ptr | Type::Class(_) | Type::Null(NullKind::Plain) => word_size,
            Type::Null(NullKind::Unspecialized) => word_size,
            Type::FarPtr | Type::Interface(_) | Type::Null(NullKind::Far) => 2 * word_size,
        }
    }

    /// Rank used for safe integral widening
    pub(crate) fn integral_rank(&self) -> Option<u8> {
        match self {
            Type::Byte => Some(1),
            Type::Short | Type::Char => Some(2),
            Type::Int => Some(3),
            Type::Long => Some(4),
            _ => None,
        }
    }

    /// Null tag matching a destination type, if it has a pointer representation
    pub fn null_kind_for(&self) -> Option<NullKind> {
        match self {
            Type::FarPtr | Type::Interface(_) => Some(NullKind::Far),
            Type::Ptr | Type::Class(_) => Some(NullKind::Plain),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Unresolved => write!(f, "<unresolved>"),
            Type::Void => write!(f, "void"),
            Type::Boolean => write!(f, "boolean"),
            Type::Byte => write!(f, "byte"),
            Type::Short => write!(f, "short"),
            Type::Char => write!(f, "char"),
            Type::Int => write!(f, "int"),
            Type::Long => write!(f, "long"),
            Type::Ptr => write!(f, "Ptr"),
            Type::FarPtr => write!(f, "FarPtr"),
            Type::Null(_) => write!(f, "null"),
            Type::Class(n) | Type::Interface(n) => write!(f, "{}", n),
        }
    }
}

/// A type as written in source, resolved later against the type table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    pub name: String,
    pub span: Span,
}

impl TypeRef {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self { name: name.into(), span }
    }
}

impl HasSpan for TypeRef {
    fn span(&self) -> Span {
        self.span
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
