#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifies a resource type within a runtime; opaque outside the
/// facade that allocated it. Distinct from [`crate::Handle`], which
/// identifies a specific *instance* of a resource.
pub type ResourceId = u32;

/// One field of a [`Type::Record`], in declaration order.
///
/// Declaration order is load-bearing: the canonical ABI lays records out
/// field-by-field in exactly this order (spec.md §4.1), so reordering a
/// `Vec<Field>` changes the wire layout.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Field {
    pub name: String,
    pub ty: Type,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Field {
            name: name.into(),
            ty,
        }
    }
}

/// One case of a [`Type::Variant`], in declaration order. A payload-free
/// case (e.g. a `result<_, E>`'s absent `ok` arm is not a case, but a
/// variant case like `none` in `variant { some(T), none }`) has
/// `payload: None`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Case {
    pub name: String,
    pub payload: Option<Type>,
}

impl Case {
    pub fn new(name: impl Into<String>, payload: Option<Type>) -> Self {
        Case {
            name: name.into(),
            payload,
        }
    }
}

/// A named wrapper around a [`Type`], used when a type needs an identity
/// beyond its structural shape (e.g. for diagnostics, or because the
/// source WIT gave it a `type` alias). Anonymous types (most tuples,
/// lists, options encountered inline) skip this wrapper.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NamedType {
    pub name: Option<String>,
    pub ty: Type,
}

/// A Component Model (Preview 2) type descriptor.
///
/// Every variant here is finite and acyclic by construction: recursive
/// structures are only possible through a [`Type::Own`]/[`Type::Borrow`]
/// indirection to a resource, never by a type containing itself inline
/// (spec.md §3's "every type is finite and acyclic at the type level").
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Type {
    Bool,
    S8,
    U8,
    S16,
    U16,
    S32,
    U32,
    S64,
    U64,
    F32,
    F64,
    Char,
    String,
    List(Box<Type>),
    Option(Box<Type>),
    /// `ok`/`err` are independently optional: `result<_, _>`'s payload
    /// types may each be absent (e.g. `result<string>` has `err: None`).
    Result {
        ok: Option<Box<Type>>,
        err: Option<Box<Type>>,
    },
    Tuple(Vec<Type>),
    Record(Vec<Field>),
    Variant(Vec<Case>),
    /// Payload-free variant: case names only.
    Enum(Vec<String>),
    /// Bit-packed named booleans, in declaration order.
    Flags(Vec<String>),
    Named(Box<NamedType>),
    Own(ResourceId),
    Borrow(ResourceId),
}

impl Type {
    pub fn list(elem: Type) -> Type {
        Type::List(Box::new(elem))
    }

    pub fn option(inner: Type) -> Type {
        Type::Option(Box::new(inner))
    }

    pub fn result(ok: Option<Type>, err: Option<Type>) -> Type {
        Type::Result {
            ok: ok.map(Box::new),
            err: err.map(Box::new),
        }
    }

    pub fn named(name: impl Into<String>, ty: Type) -> Type {
        Type::Named(Box::new(NamedType {
            name: Some(name.into()),
            ty,
        }))
    }

    /// Strips any [`Type::Named`] wrapper, returning the underlying
    /// structural type. The canonical ABI engine operates on structural
    /// shape; names are metadata for diagnostics and WIT-name matching.
    pub fn unwrap_named(&self) -> &Type {
        match self {
            Type::Named(named) => named.ty.unwrap_named(),
            other => other,
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self.unwrap_named(),
            Type::Bool
                | Type::S8
                | Type::U8
                | Type::S16
                | Type::U16
                | Type::S32
                | Type::U32
                | Type::S64
                | Type::U64
                | Type::F32
                | Type::F64
                | Type::Char
        )
    }
}
