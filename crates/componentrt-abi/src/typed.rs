//! The typed fast path (spec.md §4.1 "Typed fast path"): callers who
//! know a value's shape at compile time can skip building a [`Val`]
//! tree entirely. [`IntoVal`]/[`FromVal`] still bottom out in the same
//! [`Val`] domain so the two paths stay provably equivalent (spec.md
//! §8's fast-path equivalence property) — they're a convenience
//! conversion layer over the dynamic engine, not a second ABI.
//!
//! A derive macro would normally generate these impls for user
//! `struct`/`enum` types; this crate ships the hand-written impls for
//! the shapes the core engine itself needs and leaves user derives to
//! whatever sits above this crate.

use componentrt_types::{Type, Val};

/// A Rust type that knows the [`Type`] it corresponds to and can
/// convert itself into a [`Val`].
pub trait IntoVal {
    fn component_type() -> Type;
    fn into_val(self) -> Val;
}

/// The inverse of [`IntoVal`]: reconstructs `Self` from a [`Val`] that
/// is already known to match `Self::component_type()`.
///
/// Implementations may assume the shape matches (the dynamic engine's
/// `lift`/`lower` already enforce that against the static [`Type`]);
/// a mismatched `Val` is a caller bug, not a recoverable error, so
/// this returns `Option` rather than a full `Result` — `None` signals
/// "this Val's shape doesn't match what I expect" for defensive
/// callers that want to check rather than panic.
pub trait FromVal: Sized {
    fn from_val(val: &Val) -> Option<Self>;
}

macro_rules! impl_primitive {
    ($rust:ty, $ty_variant:expr, $val_variant:ident) => {
        impl IntoVal for $rust {
            fn component_type() -> Type {
                $ty_variant
            }
            fn into_val(self) -> Val {
                Val::$val_variant(self)
            }
        }
        impl FromVal for $rust {
            fn from_val(val: &Val) -> Option<Self> {
                match val {
                    Val::$val_variant(v) => Some(*v),
                    _ => None,
                }
            }
        }
    };
}

impl_primitive!(bool, Type::Bool, Bool);
impl_primitive!(i8, Type::S8, S8);
impl_primitive!(u8, Type::U8, U8);
impl_primitive!(i16, Type::S16, S16);
impl_primitive!(u16, Type::U16, U16);
impl_primitive!(i32, Type::S32, S32);
impl_primitive!(u32, Type::U32, U32);
impl_primitive!(i64, Type::S64, S64);
impl_primitive!(u64, Type::U64, U64);
impl_primitive!(f32, Type::F32, Float32);
impl_primitive!(f64, Type::F64, Float64);
impl_primitive!(char, Type::Char, Char);

impl IntoVal for String {
    fn component_type() -> Type {
        Type::String
    }
    fn into_val(self) -> Val {
        Val::String(self)
    }
}

impl FromVal for String {
    fn from_val(val: &Val) -> Option<Self> {
        match val {
            Val::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl<T: IntoVal> IntoVal for Vec<T> {
    fn component_type() -> Type {
        Type::list(T::component_type())
    }
    fn into_val(self) -> Val {
        Val::List(self.into_iter().map(IntoVal::into_val).collect())
    }
}

impl<T: FromVal> FromVal for Vec<T> {
    fn from_val(val: &Val) -> Option<Self> {
        match val {
            Val::List(items) => items.iter().map(T::from_val).collect(),
            _ => None,
        }
    }
}

impl<T: IntoVal> IntoVal for Option<T> {
    fn component_type() -> Type {
        Type::option(T::component_type())
    }
    fn into_val(self) -> Val {
        match self {
            Some(v) => Val::some(v.into_val()),
            None => Val::none(),
        }
    }
}

impl<T: FromVal> FromVal for Option<T> {
    fn from_val(val: &Val) -> Option<Self> {
        match val {
            Val::Option(None) => Some(None),
            Val::Option(Some(inner)) => T::from_val(inner).map(Some),
            _ => None,
        }
    }
}

impl<T: IntoVal, E: IntoVal> IntoVal for Result<T, E> {
    fn component_type() -> Type {
        Type::result(Some(T::component_type()), Some(E::component_type()))
    }
    fn into_val(self) -> Val {
        match self {
            Ok(v) => Val::ok(Some(v.into_val())),
            Err(e) => Val::err(Some(e.into_val())),
        }
    }
}

impl<T: FromVal, E: FromVal> FromVal for Result<T, E> {
    fn from_val(val: &Val) -> Option<Self> {
        match val {
            Val::Result(Ok(Some(v))) => T::from_val(v).map(Ok),
            Val::Result(Err(Some(e))) => E::from_val(e).map(Err),
            _ => None,
        }
    }
}

macro_rules! impl_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: IntoVal),+> IntoVal for ($($name,)+) {
            fn component_type() -> Type {
                Type::Tuple(vec![$($name::component_type()),+])
            }
            fn into_val(self) -> Val {
                Val::Tuple(vec![$(self.$idx.into_val()),+])
            }
        }

        impl<$($name: FromVal),+> FromVal for ($($name,)+) {
            fn from_val(val: &Val) -> Option<Self> {
                match val {
                    Val::Tuple(items) => {
                        let mut iter = items.iter();
                        Some(($($name::from_val(iter.next()?)?,)+))
                    }
                    _ => None,
                }
            }
        }
    };
}

impl_tuple!(A: 0);
impl_tuple!(A: 0, B: 1);
impl_tuple!(A: 0, B: 1, C: 2);
impl_tuple!(A: 0, B: 1, C: 2, D: 3);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_round_trip() {
        assert_eq!(u32::from_val(&42u32.into_val()), Some(42));
    }

    #[test]
    fn option_round_trip() {
        let v = Some(7i32).into_val();
        assert_eq!(Option::<i32>::from_val(&v), Some(Some(7)));
        let none_v = None::<i32>.into_val();
        assert_eq!(Option::<i32>::from_val(&none_v), Some(None));
    }

    #[test]
    fn result_round_trip() {
        let v: Val = Result::<u32, String>::Ok(3).into_val();
        assert_eq!(Result::<u32, String>::from_val(&v), Some(Ok(3)));
    }

    #[test]
    fn tuple_round_trip() {
        let v = (1i32, "hi".to_string()).into_val();
        assert_eq!(
            <(i32, String)>::from_val(&v),
            Some((1, "hi".to_string()))
        );
    }

    #[test]
    fn component_type_matches_shape() {
        assert_eq!(Vec::<u8>::component_type(), Type::list(Type::U8));
        assert_eq!(
            Result::<u32, String>::component_type(),
            Type::result(Some(Type::U32), Some(Type::String))
        );
    }
}
