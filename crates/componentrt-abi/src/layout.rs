//! Alignment and size computation for the canonical ABI (spec.md §4.1
//! "Layout rules"). Every function here is pure arithmetic over a
//! [`Type`]; no memory access happens until `lift`/`lower` run.

use componentrt_types::Type;

/// The size, in bytes, of a discriminant wide enough to distinguish
/// `n_cases` alternatives: `ceil(log2(max(1, n_cases)) / 8)`.
///
/// A variant/enum with zero or one case needs no discriminant bits at
/// all (there is only one possible value), which is why this can
/// legitimately return `0`.
pub fn discriminant_size(n_cases: usize) -> u32 {
    let n = n_cases.max(1);
    if n <= 1 {
        return 0;
    }
    let bits = usize::BITS - (n - 1).leading_zeros();
    (bits + 7) / 8
}

/// `align_of` for a discriminant of `n_cases` alternatives. A
/// discriminant is treated as an unsigned integer of its computed
/// width, so alignment equals size (both are 0 for a 1-case variant,
/// which then contributes nothing to layout beyond its payload).
pub fn discriminant_align(n_cases: usize) -> u32 {
    discriminant_size(n_cases).max(1)
}

/// Bit-packed flags width: the smallest of {1, 2, 4, 8} bytes that can
/// hold `n_flags` bits (spec.md §4.1).
pub fn flags_size(n_flags: usize) -> u32 {
    if n_flags == 0 {
        return 0;
    }
    let bytes_needed = (n_flags as u32 + 7) / 8;
    [1, 2, 4, 8]
        .into_iter()
        .find(|w| *w >= bytes_needed)
        .unwrap_or(8)
}

pub fn align_up(offset: u32, align: u32) -> u32 {
    debug_assert!(align.is_power_of_two() || align == 0);
    let align = align.max(1);
    (offset + align - 1) & !(align - 1)
}

/// Computes `(size, align)` for `ty` per spec.md §4.1's layout rules.
pub fn size_align(ty: &Type) -> (u32, u32) {
    match ty.unwrap_named() {
        Type::Bool | Type::S8 | Type::U8 => (1, 1),
        Type::S16 | Type::U16 => (2, 2),
        Type::S32 | Type::U32 | Type::F32 | Type::Char => (4, 4),
        Type::S64 | Type::U64 | Type::F64 => (8, 8),
        Type::String => (8, 4),
        Type::List(_) => (8, 4),
        Type::Option(inner) => {
            let (isize, ialign) = size_align(inner);
            let align = ialign.max(1);
            let payload_off = align_up(1, ialign.max(1));
            let size = align_up(payload_off + isize, align);
            (size, align)
        }
        Type::Result { ok, err } => {
            let (osize, oalign) = ok.as_deref().map(size_align).unwrap_or((0, 1));
            let (esize, ealign) = err.as_deref().map(size_align).unwrap_or((0, 1));
            let align = oalign.max(ealign).max(1);
            let payload_off = align_up(1, align);
            let size = align_up(payload_off + osize.max(esize), align);
            (size, align)
        }
        Type::Tuple(types) => record_layout(types.iter()),
        Type::Record(fields) => record_layout(fields.iter().map(|f| &f.ty)),
        Type::Variant(cases) => {
            let disc = discriminant_size(cases.len());
            let disc_align = disc.max(1);
            let (payload_align, payload_size) = cases
                .iter()
                .filter_map(|c| c.payload.as_ref())
                .map(size_align)
                .fold((1u32, 0u32), |(a, s), (cs, ca)| (a.max(ca), s.max(cs)));
            let align = disc_align.max(payload_align);
            let payload_off = align_up(disc, payload_align);
            let size = align_up(payload_off + payload_size, align);
            (size, align)
        }
        Type::Enum(cases) => {
            let disc = discriminant_size(cases.len());
            (disc, disc.max(1))
        }
        Type::Flags(flags) => {
            let size = flags_size(flags.len());
            (size, size.max(1))
        }
        Type::Own(_) | Type::Borrow(_) => (4, 4),
        Type::Named(_) => unreachable!("unwrap_named stripped this"),
    }
}

pub fn align_of(ty: &Type) -> u32 {
    size_align(ty).1
}

pub fn size_of(ty: &Type) -> u32 {
    size_align(ty).0
}

/// The stride of one element inside a `list<T>`'s backing buffer:
/// `align_up(size_of(T), align_of(T))` (spec.md §4.1).
pub fn list_element_stride(elem: &Type) -> u32 {
    let (size, align) = size_align(elem);
    align_up(size, align)
}

fn record_layout<'a>(fields: impl Iterator<Item = &'a Type>) -> (u32, u32) {
    let mut offset = 0u32;
    let mut align = 1u32;
    for ty in fields {
        let (fsize, falign) = size_align(ty);
        align = align.max(falign);
        offset = align_up(offset, falign) + fsize;
    }
    (align_up(offset, align), align)
}

/// Computes the byte offset of each field within a record/tuple, in
/// declaration order, alongside the record's overall `(size, align)`.
pub fn field_offsets<'a>(fields: impl Iterator<Item = &'a Type>) -> (Vec<u32>, u32, u32) {
    let mut offsets = Vec::new();
    let mut offset = 0u32;
    let mut align = 1u32;
    for ty in fields {
        let (fsize, falign) = size_align(ty);
        align = align.max(falign);
        offset = align_up(offset, falign);
        offsets.push(offset);
        offset += fsize;
    }
    (offsets, align_up(offset, align), align)
}

#[cfg(test)]
mod tests {
    use super::*;
    use componentrt_types::{Case, Field};

    #[test]
    fn primitives() {
        assert_eq!(size_align(&Type::Bool), (1, 1));
        assert_eq!(size_align(&Type::U64), (8, 8));
        assert_eq!(size_align(&Type::Char), (4, 4));
    }

    #[test]
    fn string_and_list_are_ptr_len_pairs() {
        assert_eq!(size_align(&Type::String), (8, 4));
        assert_eq!(size_align(&Type::list(Type::U8)), (8, 4));
    }

    #[test]
    fn record_concatenates_and_rounds_up() {
        // { a: u8, b: u32 } -> offset(a)=0, offset(b)=4, size=8, align=4
        let rec = Type::Record(vec![Field::new("a", Type::U8), Field::new("b", Type::U32)]);
        assert_eq!(size_align(&rec), (8, 4));
        let (offsets, size, align) =
            field_offsets([Type::U8, Type::U32].iter());
        assert_eq!(offsets, vec![0, 4]);
        assert_eq!((size, align), (8, 4));
    }

    #[test]
    fn option_discriminant_then_padding_then_payload() {
        // option<u32>: 1 byte disc, pad to 4, then 4 byte payload = 8
        assert_eq!(size_align(&Type::option(Type::U32)), (8, 4));
        // option<u8>: 1 byte disc, no pad needed, 1 byte payload = 2
        assert_eq!(size_align(&Type::option(Type::U8)), (2, 1));
    }

    #[test]
    fn result_uses_max_payload() {
        let ty = Type::result(Some(Type::U32), Some(Type::U8));
        // disc(1) padded to 4, then max(4,1)=4 -> size 8, align 4
        assert_eq!(size_align(&ty), (8, 4));
    }

    #[test]
    fn variant_discriminant_widths() {
        let two_cases = Type::Variant(vec![Case::new("a", None), Case::new("b", None)]);
        assert_eq!(discriminant_size(2), 1);
        assert_eq!(size_align(&two_cases), (1, 1));

        let many: Vec<_> = (0..300).map(|i| Case::new(format!("c{i}"), None)).collect();
        assert_eq!(discriminant_size(300), 2);
        assert_eq!(size_align(&Type::Variant(many)), (2, 2));
    }

    #[test]
    fn flags_width_steps() {
        assert_eq!(flags_size(3), 1);
        assert_eq!(flags_size(9), 2);
        assert_eq!(flags_size(17), 4);
        assert_eq!(flags_size(40), 8);
    }
}
