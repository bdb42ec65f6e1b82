//! The type lattice.
//!
//! Types describe the concrete shapes the VM can hold: 32-bit scalars,
//! cache-aligned vectors of them, and functions over both. `Any` is the top
//! of the lattice; it appears only as a *requested* type during CFG
//! construction and is never assigned to a built value.
//!
//! Subtyping drives monomorphisation: a value may be used wherever its type
//! is a subtype of the type the use site requests. The non-trivial
//! relations are:
//!
//! - everything is a subtype of `Any`
//! - a nullary function is a subtype of its result type
//! - functions are covariant in the result, contravariant in parameters
//! - `Vector(a)` is a subtype of `Vector(b)` iff `a ⊑ b`, and also of `b`
//!   itself (a vector is usable where its scalar element is accepted; the
//!   bytecode pays for the broadcast)

use std::fmt;

use thrum_foundation::Symbol;

/// A concrete (or, for `Any`, deliberately unconstrained) value type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Top of the lattice. Used as a build-time placeholder constraint;
    /// never the type of a built value.
    Any,
    /// Nominal scalar type, identified by tag. The only shipped atomic is
    /// `F32`.
    Atomic(Symbol),
    /// Cache-aligned parallel form of a scalar type. Construction
    /// normalises nesting: `Vector(Vector(t))` is `Vector(t)`.
    Vector(Box<Type>),
    Function(Box<FunctionType>),
}

/// Arity, ordered parameter types, and result type of a function.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub result: Type,
    pub params: Vec<Type>,
}

impl Type {
    /// The `F32` scalar.
    pub fn f32() -> Type {
        Type::Atomic(Symbol::from("F32"))
    }

    /// The vector form of `inner`, normalising nested vectors.
    pub fn vector_of(inner: Type) -> Type {
        Type::Vector(Box::new(inner.scalar_version().clone()))
    }

    pub fn function(result: Type, params: Vec<Type>) -> Type {
        Type::Function(Box::new(FunctionType { result, params }))
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, Type::Vector(_))
    }

    /// The scalar form of a vector type; any other type is its own scalar
    /// form.
    pub fn scalar_version(&self) -> &Type {
        match self {
            Type::Vector(inner) => inner,
            other => other,
        }
    }

    /// The vector form of a scalar type; a vector is its own vector form.
    pub fn vector_version(&self) -> Type {
        match self {
            Type::Vector(_) => self.clone(),
            other => Type::vector_of(other.clone()),
        }
    }

    /// The function form of a type: for a non-function `t`, the nullary
    /// `[t]`; a function is its own function form.
    pub fn function_version(&self) -> FunctionType {
        match self {
            Type::Function(ft) => (**ft).clone(),
            other => FunctionType {
                result: other.clone(),
                params: Vec::new(),
            },
        }
    }

    /// True iff values of this type are usable where `supertype` is
    /// requested.
    pub fn subtype_of(&self, supertype: &Type) -> bool {
        if self == supertype || *supertype == Type::Any {
            return true;
        }
        match self {
            Type::Any => true,
            Type::Atomic(_) => false,
            Type::Vector(inner) => match supertype {
                Type::Vector(sup_inner) => inner.subtype_of(sup_inner),
                other => inner.subtype_of(other),
            },
            Type::Function(ft) => {
                if let Type::Function(sup) = supertype {
                    if ft.params.len() == sup.params.len()
                        && ft.result.subtype_of(&sup.result)
                        && ft
                            .params
                            .iter()
                            .zip(&sup.params)
                            .all(|(param, sup_param)| sup_param.subtype_of(param))
                    {
                        return true;
                    }
                }
                ft.params.is_empty() && ft.result.subtype_of(supertype)
            }
        }
    }

    /// Parse a mangled type name (the inverse of [`fmt::Display`]).
    pub fn parse_mangled(text: &str) -> Option<Type> {
        let bytes = text.as_bytes();
        let mut pos = 0;
        let ty = parse_at(bytes, &mut pos)?;
        (pos == bytes.len()).then_some(ty)
    }
}

impl FunctionType {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// The narrower of two types under the lattice, or `None` if neither
/// subtypes the other. Commutative.
pub fn intersection(lhs: &Type, rhs: &Type) -> Option<Type> {
    if lhs.subtype_of(rhs) {
        Some(lhs.clone())
    } else if rhs.subtype_of(lhs) {
        Some(rhs.clone())
    } else {
        None
    }
}

fn parse_at(bytes: &[u8], pos: &mut usize) -> Option<Type> {
    match bytes.get(*pos)? {
        b'v' => {
            *pos += 1;
            Some(Type::vector_of(parse_at(bytes, pos)?))
        }
        b'[' => {
            *pos += 1;
            let mut types = vec![parse_at(bytes, pos)?];
            while bytes.get(*pos) == Some(&b':') {
                *pos += 1;
                types.push(parse_at(bytes, pos)?);
            }
            if bytes.get(*pos) != Some(&b']') {
                return None;
            }
            *pos += 1;
            let result = types.pop()?;
            Some(Type::Function(Box::new(FunctionType {
                result,
                params: types,
            })))
        }
        _ if bytes[*pos..].starts_with(b"Any") => {
            *pos += 3;
            Some(Type::Any)
        }
        _ if bytes[*pos..].starts_with(b"F32") => {
            *pos += 3;
            Some(Type::f32())
        }
        _ => None,
    }
}

// Mangled name form: `Any`, atomic tags verbatim, `v` + inner for vectors,
// `[p0:…:pn:result]` for functions.
impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => f.write_str("Any"),
            Type::Atomic(tag) => write!(f, "{tag}"),
            Type::Vector(inner) => write!(f, "v{inner}"),
            Type::Function(ft) => write!(f, "{ft}"),
        }
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for param in &self.params {
            write!(f, "{param}:")?;
        }
        write!(f, "{}]", self.result)
    }
}
