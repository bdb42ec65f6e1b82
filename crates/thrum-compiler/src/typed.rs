//! Typed symbols.

use std::fmt;

use thrum_foundation::Symbol;

use crate::types::{FunctionType, Type};

/// The identity of a monomorphic function across the whole pipeline: its
/// source name plus its full function signature.
///
/// Two typed symbols are equal iff their names are equal and their types
/// are structurally equal. The `Display` form is the mangled bytecode
/// label, `name_<mangling>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypedSymbol {
    pub name: Symbol,
    pub ty: FunctionType,
}

impl TypedSymbol {
    pub fn new(name: Symbol, ty: FunctionType) -> Self {
        Self { name, ty }
    }

    /// Parse a mangled label back into a typed symbol.
    ///
    /// Manglings contain no underscore, so the split point is the last `_`
    /// in the label.
    pub fn parse_mangled(text: &str) -> Option<TypedSymbol> {
        let (name, mangling) = text.rsplit_once('_')?;
        if name.is_empty() {
            return None;
        }
        match Type::parse_mangled(mangling)? {
            Type::Function(ft) => Some(TypedSymbol::new(Symbol::from(name), *ft)),
            _ => None,
        }
    }
}

impl fmt::Display for TypedSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.name, self.ty)
    }
}
