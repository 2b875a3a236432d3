//! The flat ("core value") half of the canonical ABI: how a [`Type`]'s
//! value is spread across core wasm arguments/results versus spilled to
//! a scratch region and passed by pointer (spec.md §4.1 "Argument
//! passing & return").

use crate::codec::{lift as lift_mem, lower as lower_mem};
use crate::layout::size_align;
use crate::memory::GuestMemory;
use componentrt_types::{Error, ErrorKind, Phase, Type, Val};

/// Preview 2's flat-argument ceiling (spec.md §4.1: "typically 16").
pub const MAX_FLAT: usize = 16;

/// One core wasm value. Component Model flattening only ever produces
/// `i32`/`i64`/`f32`/`f64` lanes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CoreValue {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl CoreValue {
    pub fn as_u32(self) -> Result<u32, Error> {
        match self {
            CoreValue::I32(v) => Ok(v as u32),
            other => Err(flat_err(format!("expected i32 core value, got {other:?}"))),
        }
    }
}

fn flat_err(detail: impl Into<String>) -> Error {
    Error::new(ErrorKind::AbiLift, Phase::Lift, detail)
}

/// The number of core values `ty`'s flat form occupies. Used to decide
/// whether a function's combined argument/result list fits in
/// registers or must be spilled via the retptr convention.
pub fn flat_count(ty: &Type) -> usize {
    match ty.unwrap_named() {
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
        | Type::Own(_)
        | Type::Borrow(_)
        | Type::Enum(_) => 1,
        Type::String | Type::List(_) => 2,
        Type::Option(inner) => 1 + flat_count(inner),
        Type::Result { ok, err } => {
            1 + ok
                .as_deref()
                .map(flat_count)
                .unwrap_or(0)
                .max(err.as_deref().map(flat_count).unwrap_or(0))
        }
        Type::Tuple(types) => types.iter().map(flat_count).sum(),
        Type::Record(fields) => fields.iter().map(|f| flat_count(&f.ty)).sum(),
        Type::Variant(cases) => {
            1 + cases
                .iter()
                .map(|c| c.payload.as_ref().map(flat_count).unwrap_or(0))
                .max()
                .unwrap_or(0)
        }
        Type::Flags(flags) => ((flags.len() + 31) / 32).max(1),
        Type::Named(_) => unreachable!("unwrap_named stripped this"),
    }
}

/// Whether a function's full argument (or result) list fits flat, or
/// must use the retptr convention.
pub fn fits_flat(types: &[Type]) -> bool {
    types.iter().map(flat_count).sum::<usize>() <= MAX_FLAT
}

/// Flattens `val` into `out`, allocating/writing any string or list
/// payload bytes into `mem` along the way. Call only when
/// [`fits_flat`] held for the containing argument/result list — the
/// caller is otherwise expected to use the retptr path
/// ([`crate::codec::lower`] into a scratch buffer instead).
pub fn lower_flat(
    mem: &mut dyn GuestMemory,
    ty: &Type,
    val: &Val,
    out: &mut Vec<CoreValue>,
) -> Result<(), Error> {
    match (ty.unwrap_named(), val) {
        (Type::Bool, Val::Bool(b)) => out.push(CoreValue::I32(*b as i32)),
        (Type::S8, Val::S8(v)) => out.push(CoreValue::I32(*v as i32)),
        (Type::U8, Val::U8(v)) => out.push(CoreValue::I32(*v as i32)),
        (Type::S16, Val::S16(v)) => out.push(CoreValue::I32(*v as i32)),
        (Type::U16, Val::U16(v)) => out.push(CoreValue::I32(*v as i32)),
        (Type::S32, Val::S32(v)) => out.push(CoreValue::I32(*v)),
        (Type::U32, Val::U32(v)) => out.push(CoreValue::I32(*v as i32)),
        (Type::S64, Val::S64(v)) => out.push(CoreValue::I64(*v)),
        (Type::U64, Val::U64(v)) => out.push(CoreValue::I64(*v as i64)),
        (Type::F32, Val::Float32(v)) => out.push(CoreValue::F32(*v)),
        (Type::F64, Val::Float64(v)) => out.push(CoreValue::F64(*v)),
        (Type::Char, Val::Char(c)) => out.push(CoreValue::I32(*c as i32)),
        (Type::Own(_), Val::Resource { handle, .. }) | (Type::Borrow(_), Val::Resource { handle, .. }) => {
            out.push(CoreValue::I32(handle.as_u32() as i32))
        }
        (Type::Enum(cases), Val::Enum(name)) => {
            let idx = cases
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| flat_err(format!("unknown enum case `{name}`")))?;
            out.push(CoreValue::I32(idx as i32));
        }
        (Type::String, Val::String(s)) => {
            let bytes = s.as_bytes();
            let ptr = if bytes.is_empty() {
                0
            } else {
                let p = mem.realloc(0, 0, 1, bytes.len() as u32)?;
                mem.write(p, bytes)?;
                p
            };
            out.push(CoreValue::I32(ptr as i32));
            out.push(CoreValue::I32(bytes.len() as i32));
        }
        (Type::List(elem), Val::List(items)) => {
            let stride = crate::layout::list_element_stride(elem);
            let (_, align) = size_align(elem);
            let ptr = if items.is_empty() {
                0
            } else {
                let total = stride * items.len() as u32;
                let p = mem.realloc(0, 0, align.max(1), total)?;
                for (i, item) in items.iter().enumerate() {
                    lower_mem(mem, elem, item, p + stride * i as u32)?;
                }
                p
            };
            out.push(CoreValue::I32(ptr as i32));
            out.push(CoreValue::I32(items.len() as i32));
        }
        (Type::Option(inner), Val::Option(opt)) => match opt {
            None => {
                out.push(CoreValue::I32(0));
                for _ in 0..flat_count(inner) {
                    out.push(CoreValue::I32(0));
                }
            }
            Some(v) => {
                out.push(CoreValue::I32(1));
                lower_flat(mem, inner, v, out)?;
            }
        },
        (Type::Result { ok, err }, Val::Result(res)) => {
            let width = ok
                .as_deref()
                .map(flat_count)
                .unwrap_or(0)
                .max(err.as_deref().map(flat_count).unwrap_or(0));
            match res {
                Ok(v) => {
                    out.push(CoreValue::I32(0));
                    let before = out.len();
                    if let (Some(ty), Some(v)) = (ok, v) {
                        lower_flat(mem, ty, v, out)?;
                    }
                    pad_flat(out, before, width);
                }
                Err(v) => {
                    out.push(CoreValue::I32(1));
                    let before = out.len();
                    if let (Some(ty), Some(v)) = (err, v) {
                        lower_flat(mem, ty, v, out)?;
                    }
                    pad_flat(out, before, width);
                }
            }
        }
        (Type::Tuple(types), Val::Tuple(items)) => {
            for (ty, v) in types.iter().zip(items) {
                lower_flat(mem, ty, v, out)?;
            }
        }
        (Type::Record(fields), Val::Record(entries)) => {
            for field in fields {
                let (_, v) = entries
                    .iter()
                    .find(|(n, _)| n == &field.name)
                    .ok_or_else(|| flat_err(format!("missing record field `{}`", field.name)))?;
                lower_flat(mem, &field.ty, v, out)?;
            }
        }
        (Type::Variant(cases), Val::Variant(name, payload)) => {
            let idx = cases
                .iter()
                .position(|c| c.name == *name)
                .ok_or_else(|| flat_err(format!("unknown variant case `{name}`")))?;
            out.push(CoreValue::I32(idx as i32));
            let width = cases
                .iter()
                .map(|c| c.payload.as_ref().map(flat_count).unwrap_or(0))
                .max()
                .unwrap_or(0);
            let before = out.len();
            if let (Some(ty), Some(v)) = (&cases[idx].payload, payload) {
                lower_flat(mem, ty, v, out)?;
            }
            pad_flat(out, before, width);
        }
        (Type::Flags(names), Val::Flags(set)) => {
            let words = ((names.len() + 31) / 32).max(1);
            let mut bits = vec![0u32; words];
            for flag in set {
                let idx = names
                    .iter()
                    .position(|n| n == flag)
                    .ok_or_else(|| flat_err(format!("unknown flag `{flag}`")))?;
                bits[idx / 32] |= 1 << (idx % 32);
            }
            for word in bits {
                out.push(CoreValue::I32(word as i32));
            }
        }
        (ty, val) => {
            return Err(flat_err(format!(
                "type/value mismatch in flat lowering: {ty:?} cannot hold {val:?}"
            )))
        }
    }
    Ok(())
}

fn pad_flat(out: &mut Vec<CoreValue>, before: usize, width: usize) {
    while out.len() - before < width {
        out.push(CoreValue::I32(0));
    }
}

/// Reconstructs a [`Val`] of shape `ty` by consuming core values from
/// `values`, reading any string/list payload bytes from `mem`.
pub fn lift_flat(
    mem: &dyn GuestMemory,
    ty: &Type,
    values: &mut impl Iterator<Item = CoreValue>,
) -> Result<Val, Error> {
    let mut next = || values.next().ok_or_else(|| flat_err("ran out of core values mid-lift"));
    match ty.unwrap_named() {
        Type::Bool => Ok(Val::Bool(next()?.as_u32()? != 0)),
        Type::S8 => Ok(Val::S8(next()?.as_u32()? as i8)),
        Type::U8 => Ok(Val::U8(next()?.as_u32()? as u8)),
        Type::S16 => Ok(Val::S16(next()?.as_u32()? as i16)),
        Type::U16 => Ok(Val::U16(next()?.as_u32()? as u16)),
        Type::S32 => Ok(Val::S32(next()?.as_u32()? as i32)),
        Type::U32 => Ok(Val::U32(next()?.as_u32()?)),
        Type::S64 => match next()? {
            CoreValue::I64(v) => Ok(Val::S64(v)),
            other => Err(flat_err(format!("expected i64, got {other:?}"))),
        },
        Type::U64 => match next()? {
            CoreValue::I64(v) => Ok(Val::U64(v as u64)),
            other => Err(flat_err(format!("expected i64, got {other:?}"))),
        },
        Type::F32 => match next()? {
            CoreValue::F32(v) => Ok(Val::Float32(v)),
            other => Err(flat_err(format!("expected f32, got {other:?}"))),
        },
        Type::F64 => match next()? {
            CoreValue::F64(v) => Ok(Val::Float64(v)),
            other => Err(flat_err(format!("expected f64, got {other:?}"))),
        },
        Type::Char => {
            let raw = next()?.as_u32()?;
            char::from_u32(raw).map(Val::Char).ok_or_else(|| {
                Error::new(ErrorKind::AbiLift, Phase::Lift, format!("{raw:#x} is not a valid char"))
            })
        }
        Type::Own(_) => Ok(Val::Resource {
            handle: componentrt_types::Handle::from_raw(next()?.as_u32()?)
                .ok_or_else(|| flat_err("resource handle is zero"))?,
            own: true,
        }),
        Type::Borrow(_) => Ok(Val::Resource {
            handle: componentrt_types::Handle::from_raw(next()?.as_u32()?)
                .ok_or_else(|| flat_err("resource handle is zero"))?,
            own: false,
        }),
        Type::Enum(cases) => {
            let idx = next()?.as_u32()? as usize;
            cases
                .get(idx)
                .cloned()
                .map(Val::Enum)
                .ok_or_else(|| flat_err(format!("enum discriminant {idx} out of range")))
        }
        Type::String => {
            let ptr = next()?.as_u32()?;
            let len = next()?.as_u32()?;
            if len == 0 {
                return Ok(Val::String(String::new()));
            }
            let bytes = mem.read(ptr, len)?;
            std::str::from_utf8(bytes)
                .map(|s| Val::String(s.to_owned()))
                .map_err(|e| Error::new(ErrorKind::InvalidInput, Phase::Lift, format!("invalid UTF-8: {e}")))
        }
        Type::List(elem) => {
            let ptr = next()?.as_u32()?;
            let len = next()?.as_u32()?;
            let stride = crate::layout::list_element_stride(elem);
            let mut items = Vec::with_capacity(len as usize);
            for i in 0..len {
                items.push(lift_mem(mem, elem, ptr + stride * i)?);
            }
            Ok(Val::List(items))
        }
        Type::Option(inner) => {
            let disc = next()?.as_u32()?;
            let width = flat_count(inner);
            match disc {
                0 => {
                    for _ in 0..width {
                        next()?;
                    }
                    Ok(Val::none())
                }
                1 => Ok(Val::some(lift_flat(mem, inner, values)?)),
                other => Err(flat_err(format!("invalid option discriminant {other}"))),
            }
        }
        Type::Result { ok, err } => {
            let disc = next()?.as_u32()?;
            let ow = ok.as_deref().map(flat_count).unwrap_or(0);
            let ew = err.as_deref().map(flat_count).unwrap_or(0);
            let width = ow.max(ew);
            match disc {
                0 => {
                    let payload = match ok.as_deref() {
                        Some(ty) => {
                            let v = lift_flat(mem, ty, values)?;
                            for _ in 0..width - ow {
                                next()?;
                            }
                            Some(Box::new(v))
                        }
                        None => {
                            for _ in 0..width {
                                next()?;
                            }
                            None
                        }
                    };
                    Ok(Val::Result(Ok(payload)))
                }
                1 => {
                    let payload = match err.as_deref() {
                        Some(ty) => {
                            let v = lift_flat(mem, ty, values)?;
                            for _ in 0..width - ew {
                                next()?;
                            }
                            Some(Box::new(v))
                        }
                        None => {
                            for _ in 0..width {
                                next()?;
                            }
                            None
                        }
                    };
                    Ok(Val::Result(Err(payload)))
                }
                other => Err(flat_err(format!("result discriminant {other} invalid"))),
            }
        }
        Type::Tuple(types) => {
            let mut items = Vec::with_capacity(types.len());
            for ty in types {
                items.push(lift_flat(mem, ty, values)?);
            }
            Ok(Val::Tuple(items))
        }
        Type::Record(fields) => {
            let mut entries = Vec::with_capacity(fields.len());
            for field in fields {
                entries.push((field.name.clone(), lift_flat(mem, &field.ty, values)?));
            }
            Ok(Val::Record(entries))
        }
        Type::Variant(cases) => {
            let idx = next()?.as_u32()? as usize;
            let width = cases
                .iter()
                .map(|c| c.payload.as_ref().map(flat_count).unwrap_or(0))
                .max()
                .unwrap_or(0);
            let case = cases
                .get(idx)
                .ok_or_else(|| flat_err(format!("variant discriminant {idx} out of range")))?;
            let payload = match &case.payload {
                Some(ty) => {
                    let this_width = flat_count(ty);
                    let v = lift_flat(mem, ty, values)?;
                    for _ in 0..width - this_width {
                        next()?;
                    }
                    Some(Box::new(v))
                }
                None => {
                    for _ in 0..width {
                        next()?;
                    }
                    None
                }
            };
            Ok(Val::Variant(case.name.clone(), payload))
        }
        Type::Flags(names) => {
            let words = ((names.len() + 31) / 32).max(1);
            let mut bits = Vec::with_capacity(words);
            for _ in 0..words {
                bits.push(next()?.as_u32()?);
            }
            let set = names
                .iter()
                .enumerate()
                .filter(|(i, _)| bits[i / 32] & (1 << (i % 32)) != 0)
                .map(|(_, n)| n.clone())
                .collect();
            Ok(Val::Flags(set))
        }
        Type::Named(_) => unreachable!("unwrap_named stripped this"),
    }
}
