//! Program symbol table: functions, globals and compound declarations

use super::{CxType, Node, Token};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A declared parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: CxType,
}

/// A declared struct or class field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub ty: CxType,
}

/// Identifies one constructor of a class
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstructorRef {
    pub class: String,
    pub index: usize,
}

/// Delegation to another constructor before a constructor's body runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorConstructor {
    pub target: ConstructorRef,
    #[serde(default)]
    pub args: Vec<Node>,
}

/// A function, method or constructor definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: Token,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub return_type: CxType,
    pub body: Node,
    /// Only meaningful on constructors
    #[serde(default)]
    pub prior: Option<PriorConstructor>,
}

impl FunctionDef {
    pub fn with_prior(mut self, prior: PriorConstructor) -> Self {
        self.prior = Some(prior);
        self
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompoundKind {
    Struct,
    Class,
}

/// A struct or class declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundDef {
    pub name: String,
    pub kind: CompoundKind,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
    #[serde(default)]
    pub methods: Vec<FunctionDef>,
    #[serde(default)]
    pub constructors: Vec<FunctionDef>,
}

impl CompoundDef {
    pub fn with_method(mut self, method: FunctionDef) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_constructor(mut self, constructor: FunctionDef) -> Self {
        self.constructors.push(constructor);
        self
    }

    pub fn ty(&self) -> CxType {
        match self.kind {
            CompoundKind::Struct => CxType::Struct(self.name.clone()),
            CompoundKind::Class => CxType::Class(self.name.clone()),
        }
    }
}

/// A global variable, materialized before the entry point runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalDef {
    pub name: Token,
    pub ty: CxType,
    #[serde(default)]
    pub init: Option<Node>,
}

/// Everything the engine needs to run a program
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    #[serde(default)]
    pub functions: FxHashMap<String, FunctionDef>,
    #[serde(default)]
    pub globals: Vec<GlobalDef>,
    #[serde(default)]
    pub compounds: FxHashMap<String, CompoundDef>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }

    pub fn with_function(mut self, function: FunctionDef) -> Self {
        self.functions.insert(function.name.image.clone(), function);
        self
    }

    pub fn with_global(mut self, global: GlobalDef) -> Self {
        self.globals.push(global);
        self
    }

    pub fn with_compound(mut self, compound: CompoundDef) -> Self {
        self.compounds.insert(compound.name.clone(), compound);
        self
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name)
    }

    pub fn compound(&self, name: &str) -> Option<&CompoundDef> {
        self.compounds.get(name)
    }

    pub fn constructor(&self, target: &ConstructorRef) -> Option<&FunctionDef> {
        self.compound(&target.class)
            .and_then(|class| class.constructors.get(target.index))
    }

    /// The named compound followed by its ancestors, nearest first.
    ///
    /// The walk is bounded by the number of declared compounds so that a
    /// malformed parent cycle terminates.
    pub fn lineage<'a>(&'a self, name: &str) -> Vec<&'a CompoundDef> {
        let mut chain = Vec::new();
        let mut current = self.compound(name);
        while let Some(def) = current {
            if chain.len() > self.compounds.len() {
                break;
            }
            chain.push(def);
            current = def.parent.as_deref().and_then(|parent| self.compound(parent));
        }
        chain
    }

    /// Fields of a compound including inherited ones, ancestors' fields first
    pub fn all_fields(&self, name: &str) -> Vec<&FieldDecl> {
        self.lineage(name)
            .into_iter()
            .rev()
            .flat_map(|def| def.fields.iter())
            .collect()
    }

    pub fn is_subclass(&self, derived: &str, base: &str) -> bool {
        self.lineage(derived).iter().any(|def| def.name == base)
    }

    /// Whether a value of type `actual` may be stored where `declared` is
    /// expected. Numeric kinds convert freely, pointers convert when their
    /// targets agree (or one is `void*`, or the target is a base class), and
    /// arrays decay to pointers. Integral values are accepted for pointers;
    /// only a zero survives the conversion at run time.
    pub fn accepts(&self, declared: &CxType, actual: &CxType) -> bool {
        match (declared.unqualified(), actual.unqualified()) {
            (CxType::Primitive { kind: to, .. }, CxType::Primitive { kind: from, .. }) => {
                !to.is_void() && !from.is_void()
            }
            (CxType::Pointer(to), CxType::Pointer(from))
            | (CxType::Pointer(to), CxType::Array { element: from, .. })
            | (CxType::Array { element: to, .. }, CxType::Array { element: from, .. })
            | (CxType::Array { element: to, .. }, CxType::Pointer(from)) => {
                self.accepts_target(to, from)
            }
            (CxType::Pointer(_), CxType::Primitive { kind, .. }) => kind.is_integral(),
            (CxType::Struct(to), CxType::Struct(from)) => to == from,
            (CxType::Class(to), CxType::Class(from)) => self.is_subclass(from, to),
            _ => false,
        }
    }

    fn accepts_target(&self, to: &CxType, from: &CxType) -> bool {
        let (to, from) = (to.unqualified(), from.unqualified());
        if to.is_void() || from.is_void() || to == from {
            return true;
        }
        match (to, from) {
            (CxType::Class(to), CxType::Class(from)) => self.is_subclass(from, to),
            (CxType::Pointer(to), CxType::Pointer(from)) => self.accepts_target(to, from),
            (CxType::Array { element: to, .. }, CxType::Array { element: from, .. }) => {
                self.accepts_target(to, from)
            }
            (
                CxType::Primitive { kind: to, .. },
                CxType::Primitive { kind: from, .. },
            ) => to == from,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::build;

    fn hierarchy() -> Program {
        Program::new()
            .with_compound(build::class("A", None, vec![build::member("a", CxType::int())]))
            .with_compound(build::class("B", Some("A"), vec![build::member("b", CxType::long())]))
            .with_compound(build::class("C", None, vec![]))
    }

    #[test]
    fn test_inherited_fields_come_first() {
        let program = hierarchy();
        let names: Vec<&str> = program
            .all_fields("B")
            .iter()
            .map(|field| field.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_class_pointer_upcast_is_accepted() {
        let program = hierarchy();
        let base = CxType::class("A").pointer_to();
        let derived = CxType::class("B").pointer_to();
        assert!(program.accepts(&base, &derived));
        assert!(!program.accepts(&derived, &base));
        assert!(!program.accepts(&base, &CxType::class("C").pointer_to()));
    }

    #[test]
    fn test_numeric_and_pointer_acceptance() {
        let program = Program::new();
        assert!(program.accepts(&CxType::double(), &CxType::char()));
        assert!(program.accepts(&CxType::int().pointer_to(), &CxType::int()));
        assert!(program.accepts(
            &CxType::char().pointer_to(),
            &CxType::char().array_of(Some(4))
        ));
        assert!(program.accepts(&CxType::void().pointer_to(), &CxType::long().pointer_to()));
        assert!(!program.accepts(&CxType::int().pointer_to(), &CxType::long().pointer_to()));
        assert!(!program.accepts(&CxType::int(), &CxType::int().pointer_to()));
    }
}
