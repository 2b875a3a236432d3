//! The memory-based half of the canonical ABI engine: `lower` encodes a
//! [`Val`] into guest linear memory at a chosen offset per [`Type`]'s
//! layout; `lift` is its inverse. This is the representation used for
//! list elements, record/variant/option/result payloads, and the
//! retptr spill path (spec.md §4.1).

use crate::layout::{align_up, discriminant_size, field_offsets, list_element_stride, size_align};
use crate::memory::GuestMemory;
use componentrt_types::{Error, ErrorKind, Phase, Type, Val};

fn lift_err(detail: impl Into<String>) -> Error {
    Error::new(ErrorKind::AbiLift, Phase::Lift, detail)
}

fn lower_err(detail: impl Into<String>) -> Error {
    Error::new(ErrorKind::AbiLower, Phase::Lower, detail)
}

/// Encodes `val` into `mem` at `offset`, per `ty`'s layout. `val` must
/// already match `ty`'s shape; use the host dispatch layer's typecheck
/// to guarantee that before calling this.
pub fn lower(mem: &mut dyn GuestMemory, ty: &Type, val: &Val, offset: u32) -> Result<(), Error> {
    match (ty.unwrap_named(), val) {
        (Type::Bool, Val::Bool(b)) => mem.write(offset, &[*b as u8]),
        (Type::S8, Val::S8(v)) => mem.write(offset, &v.to_le_bytes()),
        (Type::U8, Val::U8(v)) => mem.write(offset, &v.to_le_bytes()),
        (Type::S16, Val::S16(v)) => mem.write(offset, &v.to_le_bytes()),
        (Type::U16, Val::U16(v)) => mem.write(offset, &v.to_le_bytes()),
        (Type::S32, Val::S32(v)) => mem.write(offset, &v.to_le_bytes()),
        (Type::U32, Val::U32(v)) => mem.write(offset, &v.to_le_bytes()),
        (Type::S64, Val::S64(v)) => mem.write(offset, &v.to_le_bytes()),
        (Type::U64, Val::U64(v)) => mem.write(offset, &v.to_le_bytes()),
        (Type::F32, Val::Float32(v)) => mem.write(offset, &v.to_le_bytes()),
        (Type::F64, Val::Float64(v)) => mem.write(offset, &v.to_le_bytes()),
        (Type::Char, Val::Char(c)) => mem.write(offset, &(*c as u32).to_le_bytes()),
        (Type::String, Val::String(s)) => lower_string(mem, s, offset),
        (Type::List(elem), Val::List(items)) => lower_list(mem, elem, items, offset),
        (Type::Option(inner), Val::Option(opt)) => lower_option(mem, inner, opt.as_deref(), offset),
        (Type::Result { ok, err }, Val::Result(res)) => {
            lower_result(mem, ok.as_deref(), err.as_deref(), res, offset)
        }
        (Type::Tuple(types), Val::Tuple(items)) => {
            if types.len() != items.len() {
                return Err(lower_err(format!(
                    "tuple arity mismatch: type has {} elements, value has {}",
                    types.len(),
                    items.len()
                )));
            }
            let (offsets, ..) = field_offsets(types.iter());
            for (i, (ty, val)) in types.iter().zip(items).enumerate() {
                lower(mem, ty, val, offset + offsets[i])?;
            }
            Ok(())
        }
        (Type::Record(fields), Val::Record(entries)) => {
            let (offsets, ..) = field_offsets(fields.iter().map(|f| &f.ty));
            for (i, field) in fields.iter().enumerate() {
                let (_, v) = entries
                    .iter()
                    .find(|(name, _)| name == &field.name)
                    .ok_or_else(|| lower_err(format!("missing record field `{}`", field.name)))?;
                lower(mem, &field.ty, v, offset + offsets[i])?;
            }
            Ok(())
        }
        (Type::Variant(cases), Val::Variant(case_name, payload)) => {
            lower_variant(mem, cases, case_name, payload.as_deref(), offset)
        }
        (Type::Enum(cases), Val::Enum(name)) => {
            let idx = cases
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| lower_err(format!("unknown enum case `{name}`")))?;
            write_disc(mem, offset, discriminant_size(cases.len()), idx as u32)
        }
        (Type::Flags(names), Val::Flags(set)) => lower_flags(mem, names, set, offset),
        (Type::Own(_), Val::Resource { handle, .. }) | (Type::Borrow(_), Val::Resource { handle, .. }) => {
            mem.write(offset, &handle.as_u32().to_le_bytes())
        }
        (ty, val) => Err(lower_err(format!(
            "type/value mismatch: type {ty:?} cannot lower value {val:?}"
        ))),
    }
}

/// Decodes a [`Val`] matching `ty`'s shape out of `mem` at `offset`.
pub fn lift(mem: &dyn GuestMemory, ty: &Type, offset: u32) -> Result<Val, Error> {
    match ty.unwrap_named() {
        Type::Bool => {
            let b = mem.read(offset, 1)?[0];
            match b {
                0 => Ok(Val::Bool(false)),
                1 => Ok(Val::Bool(true)),
                other => Err(lift_err(format!("invalid bool discriminant {other}"))),
            }
        }
        Type::S8 => Ok(Val::S8(i8::from_le_bytes(mem.read(offset, 1)?.try_into().unwrap()))),
        Type::U8 => Ok(Val::U8(mem.read(offset, 1)?[0])),
        Type::S16 => Ok(Val::S16(i16::from_le_bytes(mem.read(offset, 2)?.try_into().unwrap()))),
        Type::U16 => Ok(Val::U16(u16::from_le_bytes(mem.read(offset, 2)?.try_into().unwrap()))),
        Type::S32 => Ok(Val::S32(i32::from_le_bytes(mem.read(offset, 4)?.try_into().unwrap()))),
        Type::U32 => Ok(Val::U32(u32::from_le_bytes(mem.read(offset, 4)?.try_into().unwrap()))),
        Type::S64 => Ok(Val::S64(i64::from_le_bytes(mem.read(offset, 8)?.try_into().unwrap()))),
        Type::U64 => Ok(Val::U64(u64::from_le_bytes(mem.read(offset, 8)?.try_into().unwrap()))),
        Type::F32 => Ok(Val::Float32(f32::from_le_bytes(mem.read(offset, 4)?.try_into().unwrap()))),
        Type::F64 => Ok(Val::Float64(f64::from_le_bytes(mem.read(offset, 8)?.try_into().unwrap()))),
        Type::Char => {
            let raw = u32::from_le_bytes(mem.read(offset, 4)?.try_into().unwrap());
            char::from_u32(raw)
                .map(Val::Char)
                .ok_or_else(|| lift_err(format!("{raw:#x} is not a valid unicode scalar value")))
        }
        Type::String => lift_string(mem, offset),
        Type::List(elem) => lift_list(mem, elem, offset),
        Type::Option(inner) => lift_option(mem, inner, offset),
        Type::Result { ok, err } => lift_result(mem, ok.as_deref(), err.as_deref(), offset),
        Type::Tuple(types) => {
            let (offsets, ..) = field_offsets(types.iter());
            let mut items = Vec::with_capacity(types.len());
            for (ty, off) in types.iter().zip(&offsets) {
                items.push(lift(mem, ty, offset + off)?);
            }
            Ok(Val::Tuple(items))
        }
        Type::Record(fields) => {
            let (offsets, ..) = field_offsets(fields.iter().map(|f| &f.ty));
            let mut entries = Vec::with_capacity(fields.len());
            for (field, off) in fields.iter().zip(&offsets) {
                entries.push((field.name.clone(), lift(mem, &field.ty, offset + off)?));
            }
            Ok(Val::Record(entries))
        }
        Type::Variant(cases) => lift_variant(mem, cases, offset),
        Type::Enum(cases) => {
            let idx = read_disc(mem, offset, discriminant_size(cases.len()))? as usize;
            cases
                .get(idx)
                .cloned()
                .map(Val::Enum)
                .ok_or_else(|| lift_err(format!("enum discriminant {idx} out of range (0..{})", cases.len())))
        }
        Type::Flags(names) => lift_flags(mem, names, offset),
        // The resource id is carried by the static `Type`, not by
        // `Val::Resource` itself; callers that need it to validate a
        // handle's dynamic tag already have `ty` in hand (spec.md
        // §4.2: "`get` callers check the tag before downcasting").
        Type::Own(_) => resource_val(mem, offset, true),
        Type::Borrow(_) => resource_val(mem, offset, false),
        Type::Named(_) => unreachable!("unwrap_named stripped this"),
    }
}

// -- helpers -----------------------------------------------------------

fn resource_val(mem: &dyn GuestMemory, offset: u32, own: bool) -> Result<Val, Error> {
    let raw = u32::from_le_bytes(mem.read(offset, 4)?.try_into().unwrap());
    let handle = componentrt_types::Handle::from_raw(raw)
        .ok_or_else(|| lift_err("resource handle is zero (absent)"))?;
    Ok(Val::Resource { handle, own })
}

fn lower_string(mem: &mut dyn GuestMemory, s: &str, offset: u32) -> Result<(), Error> {
    let bytes = s.as_bytes();
    let ptr = if bytes.is_empty() {
        0
    } else {
        let p = mem.realloc(0, 0, 1, bytes.len() as u32)?;
        mem.write(p, bytes)?;
        p
    };
    mem.write(offset, &ptr.to_le_bytes())?;
    mem.write(offset + 4, &(bytes.len() as u32).to_le_bytes())
}

fn lift_string(mem: &dyn GuestMemory, offset: u32) -> Result<Val, Error> {
    let ptr = u32::from_le_bytes(mem.read(offset, 4)?.try_into().unwrap());
    let len = u32::from_le_bytes(mem.read(offset + 4, 4)?.try_into().unwrap());
    if len == 0 {
        return Ok(Val::String(String::new()));
    }
    let bytes = mem.read(ptr, len)?;
    std::str::from_utf8(bytes)
        .map(|s| Val::String(s.to_owned()))
        .map_err(|e| Error::new(ErrorKind::InvalidInput, Phase::Lift, format!("invalid UTF-8: {e}")))
}

fn lower_list(mem: &mut dyn GuestMemory, elem: &Type, items: &[Val], offset: u32) -> Result<(), Error> {
    let stride = list_element_stride(elem);
    let (_, align) = size_align(elem);
    let ptr = if items.is_empty() {
        0
    } else {
        let total = stride
            .checked_mul(items.len() as u32)
            .ok_or_else(|| lower_err("list byte length overflow"))?;
        let p = mem.realloc(0, 0, align.max(1), total)?;
        for (i, item) in items.iter().enumerate() {
            lower(mem, elem, item, p + stride * i as u32)?;
        }
        p
    };
    mem.write(offset, &ptr.to_le_bytes())?;
    mem.write(offset + 4, &(items.len() as u32).to_le_bytes())
}

fn lift_list(mem: &dyn GuestMemory, elem: &Type, offset: u32) -> Result<Val, Error> {
    let ptr = u32::from_le_bytes(mem.read(offset, 4)?.try_into().unwrap());
    let len = u32::from_le_bytes(mem.read(offset + 4, 4)?.try_into().unwrap());
    let stride = list_element_stride(elem);
    let mut items = Vec::with_capacity(len as usize);
    for i in 0..len {
        items.push(lift(mem, elem, ptr + stride * i)?);
    }
    Ok(Val::List(items))
}

fn lower_option(mem: &mut dyn GuestMemory, inner: &Type, val: Option<&Val>, offset: u32) -> Result<(), Error> {
    let (_, align) = size_align(inner);
    let payload_off = align_up(1, align.max(1));
    match val {
        None => mem.write(offset, &[0]),
        Some(v) => {
            mem.write(offset, &[1])?;
            lower(mem, inner, v, offset + payload_off)
        }
    }
}

fn lift_option(mem: &dyn GuestMemory, inner: &Type, offset: u32) -> Result<Val, Error> {
    let (_, align) = size_align(inner);
    let payload_off = align_up(1, align.max(1));
    match mem.read(offset, 1)?[0] {
        0 => Ok(Val::none()),
        1 => Ok(Val::some(lift(mem, inner, offset + payload_off)?)),
        other => Err(lift_err(format!("invalid option discriminant {other}"))),
    }
}

fn lower_result(
    mem: &mut dyn GuestMemory,
    ok: Option<&Type>,
    err: Option<&Type>,
    val: &Result<Option<Box<Val>>, Option<Box<Val>>>,
    offset: u32,
) -> Result<(), Error> {
    let oalign = ok.map(size_align).map(|(_, a)| a).unwrap_or(1);
    let ealign = err.map(size_align).map(|(_, a)| a).unwrap_or(1);
    let payload_off = align_up(1, oalign.max(ealign).max(1));
    match val {
        Ok(v) => {
            mem.write(offset, &[0])?;
            match (ok, v) {
                (Some(ty), Some(v)) => lower(mem, ty, v, offset + payload_off),
                (None, None) => Ok(()),
                _ => Err(lower_err("result ok arm payload presence mismatch")),
            }
        }
        Err(v) => {
            mem.write(offset, &[1])?;
            match (err, v) {
                (Some(ty), Some(v)) => lower(mem, ty, v, offset + payload_off),
                (None, None) => Ok(()),
                _ => Err(lower_err("result err arm payload presence mismatch")),
            }
        }
    }
}

fn lift_result(mem: &dyn GuestMemory, ok: Option<&Type>, err: Option<&Type>, offset: u32) -> Result<Val, Error> {
    let oalign = ok.map(size_align).map(|(_, a)| a).unwrap_or(1);
    let ealign = err.map(size_align).map(|(_, a)| a).unwrap_or(1);
    let payload_off = align_up(1, oalign.max(ealign).max(1));
    match mem.read(offset, 1)?[0] {
        0 => {
            let payload = match ok {
                Some(ty) => Some(Box::new(lift(mem, ty, offset + payload_off)?)),
                None => None,
            };
            Ok(Val::Result(Ok(payload)))
        }
        1 => {
            let payload = match err {
                Some(ty) => Some(Box::new(lift(mem, ty, offset + payload_off)?)),
                None => None,
            };
            Ok(Val::Result(Err(payload)))
        }
        other => Err(lift_err(format!(
            "result discriminant {other} is neither ok(0) nor err(1)"
        ))),
    }
}

fn lower_variant(
    mem: &mut dyn GuestMemory,
    cases: &[componentrt_types::Case],
    case_name: &str,
    payload: Option<&Val>,
    offset: u32,
) -> Result<(), Error> {
    let idx = cases
        .iter()
        .position(|c| c.name == case_name)
        .ok_or_else(|| lower_err(format!("unknown variant case `{case_name}`")))?;
    let disc = discriminant_size(cases.len());
    write_disc(mem, offset, disc, idx as u32)?;
    let payload_align = cases
        .iter()
        .filter_map(|c| c.payload.as_ref())
        .map(|t| size_align(t).1)
        .fold(1, u32::max);
    let payload_off = align_up(disc, payload_align);
    match (&cases[idx].payload, payload) {
        (Some(ty), Some(v)) => lower(mem, ty, v, offset + payload_off),
        (None, None) => Ok(()),
        _ => Err(lower_err(format!(
            "variant case `{case_name}` payload presence mismatch"
        ))),
    }
}

fn lift_variant(mem: &dyn GuestMemory, cases: &[componentrt_types::Case], offset: u32) -> Result<Val, Error> {
    let disc = discriminant_size(cases.len());
    let idx = read_disc(mem, offset, disc)? as usize;
    let case = cases
        .get(idx)
        .ok_or_else(|| lift_err(format!("variant discriminant {idx} out of range (0..{})", cases.len())))?;
    let payload_align = cases
        .iter()
        .filter_map(|c| c.payload.as_ref())
        .map(|t| size_align(t).1)
        .fold(1, u32::max);
    let payload_off = align_up(disc, payload_align);
    let payload = match &case.payload {
        Some(ty) => Some(Box::new(lift(mem, ty, offset + payload_off)?)),
        None => None,
    };
    Ok(Val::Variant(case.name.clone(), payload))
}

fn lower_flags(mem: &mut dyn GuestMemory, names: &[String], set: &[String], offset: u32) -> Result<(), Error> {
    let width = crate::layout::flags_size(names.len());
    let mut bits: u64 = 0;
    for flag in set {
        let idx = names
            .iter()
            .position(|n| n == flag)
            .ok_or_else(|| lower_err(format!("unknown flag `{flag}`")))?;
        bits |= 1 << idx;
    }
    mem.write(offset, &bits.to_le_bytes()[..width as usize])
}

fn lift_flags(mem: &dyn GuestMemory, names: &[String], offset: u32) -> Result<Val, Error> {
    let width = crate::layout::flags_size(names.len());
    let mut buf = [0u8; 8];
    buf[..width as usize].copy_from_slice(mem.read(offset, width)?);
    let bits = u64::from_le_bytes(buf);
    let set = names
        .iter()
        .enumerate()
        .filter(|(i, _)| bits & (1 << i) != 0)
        .map(|(_, n)| n.clone())
        .collect();
    Ok(Val::Flags(set))
}

fn write_disc(mem: &mut dyn GuestMemory, offset: u32, width: u32, value: u32) -> Result<(), Error> {
    mem.write(offset, &value.to_le_bytes()[..width as usize])
}

fn read_disc(mem: &dyn GuestMemory, offset: u32, width: u32) -> Result<u32, Error> {
    if width == 0 {
        return Ok(0);
    }
    let mut buf = [0u8; 4];
    buf[..width as usize].copy_from_slice(mem.read(offset, width)?);
    Ok(u32::from_le_bytes(buf))
}
