//! Enter phase - type table construction
//!
//! Builds one `ClassInfo` per unit plus the built-in library, checks the
//! inheritance graph, lays out instance fields and computes method
//! signatures with parameter offsets.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;

use super::{WashError, WashErrorKind, WashResult};
use crate::ast::{Const, Program, Type, TypeRef, Unit};
use crate::common::consts::{
    ASSERTION_ERROR, CHECK_ASSERT_MARKER, ERROR, EXCEPTION, MAX_HIERARCHY_STEPS, OBJECT,
    PARAM_BASE_WORDS, RUNTIME_EXCEPTION, STRING, THROWABLE,
};
use crate::common::Config;

/// Built-in classes and their superclasses
static BUILTINS: Lazy<Vec<(&'static str, Option<&'static str>)>> = Lazy::new(|| {
    vec![
        (OBJECT, None),
        (STRING, Some(OBJECT)),
        (THROWABLE, Some(OBJECT)),
        (EXCEPTION, Some(THROWABLE)),
        (RUNTIME_EXCEPTION, Some(EXCEPTION)),
        (ERROR, Some(THROWABLE)),
        (ASSERTION_ERROR, Some(ERROR)),
    ]
});

/// Result of checking a value of one type against a declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compat {
    Equal,
    SafeWiden,
    ObjectToInterface,
    ConstNarrow,
    NotPossible,
}

#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub name: String,
    pub ty: Type,
    pub is_final: bool,
    /// Byte offset from the object start
    pub offset: u32,
    pub size: u32,
}

#[derive(Debug, Clone)]
pub struct MethodSig {
    pub name: String,
    pub symbol: String,
    pub params: Vec<(String, Type)>,
    /// Frame-pointer relative offsets, parallel to `params`
    pub param_offsets: Vec<i32>,
    pub ret: Type,
    pub is_static: bool,
    pub is_ctor: bool,
    pub throws: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub name: String,
    pub is_interface: bool,
    pub is_abstract: bool,
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodSig>,
    pub instance_size: u32,
    pub check_assert: bool,
    pub builtin: bool,
}

impl ClassInfo {
    fn builtin(name: &str, superclass: Option<&str>, word_size: u32) -> Self {
        Self {
            name: name.to_string(),
            is_interface: false,
            is_abstract: false,
            superclass: superclass.map(str::to_string),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            instance_size: word_size,
            check_assert: false,
            builtin: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TypeTable {
    classes: HashMap<String, ClassInfo>,
    word_size: u32,
}

impl TypeTable {
    /// Table holding only the built-in library
    pub fn builtin(config: &Config) -> Self {
        let classes = BUILTINS
            .iter()
            .map(|(name, sup)| (name.to_string(), ClassInfo::builtin(name, *sup, config.word_size)))
            .collect();
        Self { classes, word_size: config.word_size }
    }

    /// Build the table for all units of a program
    pub fn build(program: &Program, config: &Config) -> WashResult<Self> {
        let mut table = Self::builtin(config);

        for unit in &program.units {
            if table.classes.contains_key(&unit.name) {
                return Err(WashError::new(unit.span, WashErrorKind::DuplicateClass(unit.name.clone())));
            }
            let superclass = match (&unit.superclass, unit.is_interface) {
                (Some(s), _) => Some(s.name.clone()),
                (None, false) => Some(OBJECT.to_string()),
                (None, true) => None,
            };
            table.classes.insert(
                unit.name.clone(),
                ClassInfo {
                    name: unit.name.clone(),
                    is_interface: unit.is_interface,
                    is_abstract: unit.modifiers.is_abstract,
                    superclass,
                    interfaces: unit.interfaces.iter().map(|t| t.name.clone()).collect(),
                    fields: Vec::new(),
                    methods: Vec::new(),
                    instance_size: 0,
                    check_assert: unit.has_annotation(CHECK_ASSERT_MARKER),
                    builtin: false,
                },
            );
        }

        for unit in &program.units {
            table.check_hierarchy(unit)?;
        }

        // superclasses first, so inherited fields are laid out before own ones
        let mut order: Vec<&Unit> = program.units.iter().collect();
        order.sort_by_key(|u| table.depth(&u.name));
        for unit in order {
            table.layout_fields(unit)?;
        }

        for unit in &program.units {
            table.enter_methods(unit, config)?;
        }

        log::debug!("type table: {} classes", table.classes.len());
        Ok(table)
    }

    fn check_hierarchy(&self, unit: &Unit) -> WashResult<()> {
        if let Some(sup) = &unit.superclass {
            match self.classes.get(&sup.name) {
                None => return Err(WashError::new(sup.span, WashErrorKind::UnknownClass(sup.name.clone()))),
                Some(c) if c.is_interface => {
                    return Err(WashError::new(
                        sup.span,
                        WashErrorKind::ExtendsInterface { class: unit.name.clone(), interface: sup.name.clone() },
                    ))
                }
                Some(_) => {}
            }
        }
        for iface in &unit.interfaces {
            match self.classes.get(&iface.name) {
                None => return Err(WashError::new(iface.span, WashErrorKind::UnknownClass(iface.name.clone()))),
                Some(c) if !c.is_interface => {
                    return Err(WashError::new(iface.span, WashErrorKind::NotAnInterface(iface.name.clone())))
                }
                Some(_) => {}
            }
        }

        // superclass chain, then interface graph
        let mut seen = HashSet::new();
        let mut cur = Some(unit.name.as_str());
        while let Some(name) = cur {
            if !seen.insert(name) || seen.len() > MAX_HIERARCHY_STEPS {
                return Err(WashError::new(unit.span, WashErrorKind::CyclicInheritance(unit.name.clone())));
            }
            cur = self.classes.get(name).and_then(|c| c.superclass.as_deref());
        }
        if unit.is_interface && self.interface_reaches(&unit.name, &unit.name, &mut HashSet::new()) {
            return Err(WashError::new(unit.span, WashErrorKind::CyclicInheritance(unit.name.clone())));
        }
        Ok(())
    }

    fn interface_reaches<'a>(&'a self, from: &'a str, target: &str, seen: &mut HashSet<&'a str>) -> bool {
        let Some(info) = self.classes.get(from) else { return false };
        for next in &info.interfaces {
            if next == target {
                return true;
            }
            if seen.insert(next.as_str()) && self.interface_reaches(next, target, seen) {
                return true;
            }
        }
        false
    }

    /// Number of superclasses above `name`
    fn depth(&self, name: &str) -> usize {
        let mut depth = 0;
        let mut cur = self.classes.get(name).and_then(|c| c.superclass.as_deref());
        while let Some(n) = cur {
            depth += 1;
            if depth > MAX_HIERARCHY_STEPS {
                break;
            }
            cur = self.classes.get(n).and_then(|c| c.superclass.as_deref());
        }
        depth
    }

    fn layout_fields(&mut self, unit: &Unit) -> WashResult<()> {
        let base = match unit.superclass.as_ref().map(|s| s.name.as_str()).or(Some(OBJECT)) {
            Some(sup) if !unit.is_interface => self.classes.get(sup).map(|c| c.instance_size).unwrap_or(self.word_size),
            _ => 0,
        };
        let mut offset = base;
        let mut fields = Vec::new();
        for field in &unit.fields {
            if fields.iter().any(|f: &FieldInfo| f.name == field.name) {
                return Err(WashError::new(field.span, WashErrorKind::DuplicateField(field.name.clone())));
            }
            if field.modifiers.is_static {
                return Err(WashError::new(field.span, WashErrorKind::Unsupported("static fields")));
            }
            let ty = self.resolve_type(&field.type_ref)?;
            if ty == Type::Void {
                return Err(WashError::new(field.span, WashErrorKind::VoidVariable(field.name.clone())));
            }
            let size = ty.size(self.word_size);
            let align = size.min(self.word_size).max(1);
            offset = (offset + align - 1) / align * align;
            fields.push(FieldInfo { name: field.name.clone(), ty, is_final: field.modifiers.is_final, offset, size });
            offset += size;
        }
        let word = self.word_size;
        if let Some(info) = self.classes.get_mut(&unit.name) {
            info.fields = fields;
            info.instance_size = (offset + word - 1) / word * word;
        }
        Ok(())
    }

    fn enter_methods(&mut self, unit: &Unit, config: &Config) -> WashResult<()> {
        let mut sigs: Vec<MethodSig> = Vec::new();
        for method in &unit.methods {
            let arity = method.params.len();
            if sigs.iter().any(|s| s.name == method.name && s.params.len() == arity && s.is_ctor == method.is_ctor) {
                return Err(WashError::new(
                    method.span,
                    WashErrorKind::DuplicateMethod { name: method.name.clone(), arity },
                ));
            }

            let mut params = Vec::with_capacity(arity);
            for p in &method.params {
                if params.iter().any(|(n, _): &(String, Type)| *n == p.name) {
                    return Err(WashError::new(p.span, WashErrorKind::DuplicateParameter(p.name.clone())));
                }
                let ty = self.resolve_type(&p.type_ref)?;
                if ty == Type::Void {
                    return Err(WashError::new(p.span, WashErrorKind::VoidVariable(p.name.clone())));
                }
                params.push((p.name.clone(), ty));
            }

            // arguments are pushed left to right, so the last one sits closest
            let mut param_offsets = vec![0; arity];
            let mut offset = PARAM_BASE_WORDS * config.word_size;
            for (i, (_, ty)) in params.iter().enumerate().rev() {
                param_offsets[i] = offset as i32;
                offset += config.align(ty.size(config.word_size));
            }

            let mut throws = Vec::new();
            for t in &method.throws {
                if !self.classes.contains_key(&t.name) {
                    return Err(WashError::new(t.span, WashErrorKind::UnknownClass(t.name.clone())));
                }
                if !self.is_throwable(&t.name) {
                    return Err(WashError::new(t.span, WashErrorKind::NotThrowable(t.name.clone())));
                }
                throws.push(t.name.clone());
            }

            let ret = if method.is_ctor { Type::Void } else { self.resolve_type(&method.ret)? };
            let symbol = if method.is_ctor {
                format!("{}.<init>/{}", unit.name, arity)
            } else {
                format!("{}.{}/{}", unit.name, method.name, arity)
            };
            sigs.push(MethodSig {
                name: method.name.clone(),
                symbol,
                params,
                param_offsets,
                ret,
                is_static: method.modifiers.is_static,
                is_ctor: method.is_ctor,
                throws,
            });
        }
        if let Some(info) = self.classes.get_mut(&unit.name) {
            info.methods = sigs;
        }
        Ok(())
    }

    pub fn word_size(&self) -> u32 {
        self.word_size
    }

    pub fn class(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Map a written type to a resolved one
    pub fn resolve_type(&self, type_ref: &TypeRef) -> WashResult<Type> {
        if let Some(t) = Type::from_keyword(&type_ref.name) {
            return Ok(t);
        }
        match self.classes.get(&type_ref.name) {
            Some(c) if c.is_interface => Ok(Type::Interface(c.name.clone())),
            Some(c) => Ok(Type::Class(c.name.clone())),
            None => Err(WashError::new(type_ref.span, WashErrorKind::UnknownType(type_ref.name.clone()))),
        }
    }

    /// Superclass chain starting at `name` itself
    fn ancestors<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a ClassInfo> + 'a {
        let mut cur = self.classes.get(name);
        let mut steps = 0;
        std::iter::from_fn(move || {
            let info = cur?;
            steps += 1;
            cur = if steps > MAX_HIERARCHY_STEPS {
                None
            } else {
                info.superclass.as_deref().and_then(|s| self.classes.get(s))
            };
            Some(info)
        })
    }

    /// `sub` equals `sup` or inherits from it through superclasses
    pub fn is_subclass(&self, sub: &str, sup: &str) -> bool {
        self.ancestors(sub).any(|c| c.name == sup)
    }

    /// `class` (or one of its superclasses) implements `iface`, directly or
    /// through interface inheritance; an interface implements itself
    pub fn implements(&self, class: &str, iface: &str) -> bool {
        if class == iface {
            return true;
        }
        let mut seen = HashSet::new();
        self.ancestors(class).any(|c| {
            c.interfaces
                .iter()
                .any(|i| i == iface || self.interface_reaches(i, iface, &mut seen))
        })
    }

    pub fn is_throwable(&self, class: &str) -> bool {
        self.is_subclass(class, THROWABLE)
    }

    /// Throwables that must be caught or declared
    pub fn is_checked(&self, class: &str) -> bool {
        self.is_throwable(class)
            && !crate::common::consts::UNCHECKED_ROOTS
                .iter()
                .any(|root| self.is_subclass(class, root))
    }

    pub fn find_field(&self, class: &str, name: &str) -> Option<&FieldInfo> {
        self.ancestors(class).find_map(|c| c.fields.iter().find(|f| f.name == name))
    }

    pub fn find_method(&self, class: &str, name: &str, arity: usize) -> Option<&MethodSig> {
        self.ancestors(class)
            .find_map(|c| c.methods.iter().find(|m| !m.is_ctor && m.name == name && m.params.len() == arity))
    }

    /// Constructor used by `new C()`; `Ok(None)` when the class declares none
    pub fn find_default_ctor(&self, class: &str) -> Result<Option<&MethodSig>, ()> {
        let Some(info) = self.classes.get(class) else { return Err(()) };
        let mut ctors = info.methods.iter().filter(|m| m.is_ctor).peekable();
        if ctors.peek().is_none() {
            return Ok(None);
        }
        ctors.find(|m| m.params.is_empty()).map(Some).ok_or(())
    }

    /// Compare a value type against a declared type; `constant` is the
    /// value's compile-time constant, if any
    pub fn compare(&self, declared: &Type, actual: &Type, constant: Option<Const>) -> Compat {
        if declared == actual {
            return Compat::Equal;
        }
        match (declared, actual) {
            (d, Type::Null(_)) if d.is_pointer() => Compat::SafeWiden,
            (d, a) if d.is_integral() && a.is_integral() => {
                let (Some(dr), Some(ar)) = (d.integral_rank(), a.integral_rank()) else {
                    return Compat::NotPossible;
                };
                let char_mismatch = *d == Type::Char || (*a == Type::Char && *d == Type::Short);
                if dr > ar && !char_mismatch {
                    return Compat::SafeWiden;
                }
                match (a, constant.and_then(Const::as_int)) {
                    (Type::Int, Some(v)) if fits(d, v) => Compat::ConstNarrow,
                    _ => Compat::NotPossible,
                }
            }
            (Type::Class(d), Type::Class(a)) if self.is_subclass(a, d) => Compat::SafeWiden,
            (Type::Interface(d), Type::Class(a)) if self.implements(a, d) => Compat::ObjectToInterface,
            (Type::Interface(d), Type::Interface(a)) if self.implements(a, d) => Compat::SafeWiden,
            _ => Compat::NotPossible,
        }
    }
}

fn fits(ty: &Type, v: i64) -> bool {
    match ty {
        Type::Byte => i8::try_from(v).is_ok(),
        Type::Short => i16::try_from(v).is_ok(),
        Type::Char => u16::try_from(v).is_ok(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;

    fn table(src: &str) -> WashResult<TypeTable> {
        let program = parse_program(src).expect("Failed to parse");
        TypeTable::build(&program, &Config::default())
    }

    #[test]
    fn test_checked_and_unchecked_exceptions() {
        let t = table("class IoFailure extends Exception { } class Oops extends RuntimeException { }").unwrap();
        assert!(t.is_checked("IoFailure"));
        assert!(!t.is_checked("Oops"));
        assert!(!t.is_checked(ASSERTION_ERROR));
        assert!(t.is_throwable("Oops"));
        assert!(!t.is_throwable(STRING));
    }

    #[test]
    fn test_compare_widening_and_interfaces() {
        let t = table("interface Shape { } interface Solid extends Shape { } class Cube implements Solid { }").unwrap();
        assert_eq!(t.compare(&Type::Long, &Type::Int, None), Compat::SafeWiden);
        assert_eq!(t.compare(&Type::Char, &Type::Byte, None), Compat::NotPossible);
        assert_eq!(t.compare(&Type::Byte, &Type::Int, Some(Const::Int(100))), Compat::ConstNarrow);
        assert_eq!(t.compare(&Type::Byte, &Type::Int, Some(Const::Int(300))), Compat::NotPossible);
        assert_eq!(
            t.compare(&Type::Interface("Shape".into()), &Type::Class("Cube".into()), None),
            Compat::ObjectToInterface
        );
        assert_eq!(
            t.compare(&Type::Class(OBJECT.into()), &Type::Class("Cube".into()), None),
            Compat::SafeWiden
        );
        assert_eq!(
            t.compare(&Type::Class("Cube".into()), &Type::Class(OBJECT.into()), None),
            Compat::NotPossible
        );
    }

    #[test]
    fn test_inheritance_errors() {
        let e = table("class A extends B { } class B extends A { }").unwrap_err();
        assert!(matches!(e.kind, WashErrorKind::CyclicInheritance(_)));
        let e = table("interface I { } class A extends I { }").unwrap_err();
        assert!(matches!(e.kind, WashErrorKind::ExtendsInterface { .. }));
        let e = table("class A { } class A { }").unwrap_err();
        assert_eq!(e.kind, WashErrorKind::DuplicateClass("A".into()));
    }

    #[test]
    fn test_fields_follow_superclass_layout() {
        let t = table("class A { int x; } class B extends A { byte b; long l; }").unwrap();
        assert_eq!(t.find_field("B", "x").unwrap().offset, 4);
        assert_eq!(t.find_field("B", "b").unwrap().offset, 8);
        assert_eq!(t.find_field("B", "l").unwrap().offset, 12);
        assert_eq!(t.class("B").unwrap().instance_size, 20);
    }

    #[test]
    fn test_parameter_offsets_grow_from_the_last_argument() {
        let t = table("class A { static int f(int a, long b) { return a; } }").unwrap();
        let sig = t.find_method("A", "f", 2).unwrap();
        assert_eq!(sig.param_offsets, vec![16, 8]);
        assert_eq!(sig.symbol, "A.f/2");
    }

    #[test]
    fn test_lookups_outlive_the_queried_name() {
        let t = table("class A { int x; int get() { return x; } } class B extends A { }").unwrap();
        let (field, sig) = {
            let class = String::from("B");
            (t.find_field(&class, "x"), t.find_method(&class, "get", 0))
        };
        assert_eq!(field.map(|f| f.offset), Some(4));
        assert_eq!(sig.map(|m| m.symbol.as_str()), Some("A.get/0"));
    }
}
