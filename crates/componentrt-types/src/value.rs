use crate::Handle;

/// A boxed dynamic value matching one of the [`crate::Type`] shapes.
///
/// This is the "dynamic value tree" path described in spec.md §3/§9: a
/// single closed enumeration over the canonical types, as opposed to the
/// open-ended `any`-map trees the teacher's prior art reaches for.
/// Callers who know their shape at compile time can skip this and use
/// the typed fast path exposed by `componentrt-abi` instead; both paths
/// must agree (spec.md §8's typed fast-path equivalence property).
#[derive(Clone, Debug, PartialEq)]
pub enum Val {
    Bool(bool),
    S8(i8),
    U8(u8),
    S16(i16),
    U16(u16),
    S32(i32),
    U32(u32),
    S64(i64),
    U64(u64),
    Float32(f32),
    Float64(f64),
    Char(char),
    String(String),
    List(Vec<Val>),
    Option(Option<Box<Val>>),
    Result(Result<Option<Box<Val>>, Option<Box<Val>>>),
    Tuple(Vec<Val>),
    /// Field name, value pairs in declaration order (matching the
    /// record's [`crate::Field`] order they were lifted/lowered against).
    Record(Vec<(String, Val)>),
    /// Case name plus optional payload.
    Variant(String, Option<Box<Val>>),
    Enum(String),
    /// Names of the set flags, in no particular order.
    Flags(Vec<String>),
    Resource { handle: Handle, own: bool },
}

impl Val {
    pub fn variant(case: impl Into<String>, payload: Option<Val>) -> Val {
        Val::Variant(case.into(), payload.map(Box::new))
    }

    pub fn some(inner: Val) -> Val {
        Val::Option(Some(Box::new(inner)))
    }

    pub const fn none() -> Val {
        Val::Option(None)
    }

    pub fn ok(inner: Option<Val>) -> Val {
        Val::Result(Ok(inner.map(Box::new)))
    }

    pub fn err(inner: Option<Val>) -> Val {
        Val::Result(Err(inner.map(Box::new)))
    }
}

/// Compares two values for the round-trip equivalence spec.md §8
/// requires: byte-equal strings, field-wise records (by name, order
/// independent), element-wise ordered lists, and floats that may differ
/// in NaN bit pattern but must agree on every finite value (and on
/// NaN-ness itself).
pub fn semantically_eq(a: &Val, b: &Val) -> bool {
    match (a, b) {
        (Val::Float32(x), Val::Float32(y)) => x.is_nan() && y.is_nan() || x == y,
        (Val::Float64(x), Val::Float64(y)) => x.is_nan() && y.is_nan() || x == y,
        (Val::List(x), Val::List(y)) | (Val::Tuple(x), Val::Tuple(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| semantically_eq(a, b))
        }
        (Val::Record(x), Val::Record(y)) => {
            x.len() == y.len()
                && x.iter().all(|(name, v)| {
                    y.iter()
                        .find(|(n, _)| n == name)
                        .is_some_and(|(_, w)| semantically_eq(v, w))
                })
        }
        (Val::Option(x), Val::Option(y)) => match (x, y) {
            (Some(x), Some(y)) => semantically_eq(x, y),
            (None, None) => true,
            _ => false,
        },
        (Val::Result(x), Val::Result(y)) => match (x, y) {
            (Ok(x), Ok(y)) | (Err(x), Err(y)) => match (x, y) {
                (Some(x), Some(y)) => semantically_eq(x, y),
                (None, None) => true,
                _ => false,
            },
            _ => false,
        },
        (Val::Variant(cx, px), Val::Variant(cy, py)) => {
            cx == cy
                && match (px, py) {
                    (Some(x), Some(y)) => semantically_eq(x, y),
                    (None, None) => true,
                    _ => false,
                }
        }
        (Val::Flags(x), Val::Flags(y)) => {
            let mut x = x.clone();
            let mut y = y.clone();
            x.sort();
            y.sort();
            x == y
        }
        (x, y) => x == y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_equivalence() {
        assert!(semantically_eq(
            &Val::Float64(f64::NAN),
            &Val::Float64(-f64::NAN)
        ));
        assert!(!semantically_eq(&Val::Float64(f64::NAN), &Val::Float64(1.0)));
        assert!(semantically_eq(&Val::Float64(1.5), &Val::Float64(1.5)));
    }

    #[test]
    fn record_is_order_independent() {
        let a = Val::Record(vec![("x".into(), Val::S32(1)), ("y".into(), Val::S32(2))]);
        let b = Val::Record(vec![("y".into(), Val::S32(2)), ("x".into(), Val::S32(1))]);
        assert!(semantically_eq(&a, &b));
    }

    #[test]
    fn flags_is_order_independent() {
        let a = Val::Flags(vec!["read".into(), "write".into()]);
        let b = Val::Flags(vec!["write".into(), "read".into()]);
        assert!(semantically_eq(&a, &b));
    }

    #[test]
    fn option_none_vs_some_empty_string_distinguishable() {
        assert!(!semantically_eq(
            &Val::none(),
            &Val::some(Val::String(String::new()))
        ));
    }
}
