use componentrt_abi::testing::VecGuestMemory;
use componentrt_abi::{fits_flat, flat_count, lift, lift_flat, lower, lower_flat, CoreValue, GuestMemory};
use componentrt_types::{semantically_eq, Case, Field, Type, Val};
use proptest::prelude::*;

fn roundtrip_memory(ty: &Type, val: &Val) -> Val {
    let mut mem = VecGuestMemory::new(1024);
    let (size, align) = componentrt_abi::size_align(ty);
    let offset = mem.realloc(0, 0, align.max(1), size.max(1)).unwrap();
    lower(&mut mem, ty, val, offset).unwrap();
    lift(&mem, ty, offset).unwrap()
}

fn roundtrip_flat(ty: &Type, val: &Val) -> Val {
    let mut mem = VecGuestMemory::new(1024);
    let mut values = Vec::new();
    lower_flat(&mut mem, ty, val, &mut values).unwrap();
    let mut iter = values.into_iter();
    lift_flat(&mem, ty, &mut iter).unwrap()
}

#[test]
fn empty_list_round_trips() {
    let ty = Type::list(Type::U32);
    let val = Val::List(vec![]);
    assert!(semantically_eq(&val, &roundtrip_memory(&ty, &val)));
    assert!(semantically_eq(&val, &roundtrip_flat(&ty, &val)));
}

#[test]
fn option_none_and_some_empty_string_are_distinct_after_round_trip() {
    let ty = Type::option(Type::String);
    let none = Val::none();
    let some_empty = Val::some(Val::String(String::new()));
    assert!(!semantically_eq(
        &roundtrip_memory(&ty, &none),
        &roundtrip_memory(&ty, &some_empty)
    ));
    assert!(semantically_eq(&none, &roundtrip_memory(&ty, &none)));
    assert!(semantically_eq(&some_empty, &roundtrip_memory(&ty, &some_empty)));
}

#[test]
fn variant_discriminant_out_of_range_is_an_abi_lift_error() {
    let ty = Type::Variant(vec![Case::new("a", None), Case::new("b", None)]);
    let mut mem = VecGuestMemory::new(8);
    // write discriminant 5, which is out of range for a 2-case variant.
    mem.write(0, &[5u8]).unwrap();
    let err = lift(&mem, &ty, 0).unwrap_err();
    assert_eq!(err.kind, componentrt_types::ErrorKind::AbiLift);
}

#[test]
fn string_at_allocation_ceiling_succeeds_one_over_fails() {
    let ty = Type::String;
    let mut mem = VecGuestMemory::new(0).with_max_alloc(8);
    let at_ceiling = Val::String("01234567".to_string());
    let offset = mem.realloc(0, 0, 4, 8).unwrap();
    lower(&mut mem, &ty, &at_ceiling, offset).unwrap();
    assert!(semantically_eq(&at_ceiling, &lift(&mem, &ty, offset).unwrap()));

    let mut mem = VecGuestMemory::new(0).with_max_alloc(8);
    let one_over = Val::String("012345678".to_string());
    let offset = mem.realloc(0, 0, 4, 16).unwrap();
    assert!(lower(&mut mem, &ty, &one_over, offset).is_err());
}

#[test]
fn large_list_round_trips() {
    let ty = Type::list(Type::U32);
    let val = Val::List((0..10_000).map(Val::U32).collect());
    assert!(semantically_eq(&val, &roundtrip_memory(&ty, &val)));
}

#[test]
fn record_field_order_is_irrelevant_to_equivalence_but_fixed_on_the_wire() {
    let ty = Type::Record(vec![Field::new("x", Type::S32), Field::new("y", Type::S32)]);
    let val = Val::Record(vec![("y".into(), Val::S32(2)), ("x".into(), Val::S32(1))]);
    let out = roundtrip_memory(&ty, &val);
    assert!(semantically_eq(&val, &out));
}

#[test]
fn flat_count_matches_max_flat_boundary() {
    let sixteen_u32s: Vec<Type> = (0..16).map(|_| Type::U32).collect();
    assert!(fits_flat(&sixteen_u32s));
    let seventeen: Vec<Type> = (0..17).map(|_| Type::U32).collect();
    assert!(!fits_flat(&seventeen));
    assert_eq!(flat_count(&Type::String), 2);
}

#[test]
fn flat_and_memory_paths_agree_on_a_nested_shape() {
    let ty = Type::result(
        Some(Type::Record(vec![
            Field::new("id", Type::U64),
            Field::new("name", Type::String),
        ])),
        Some(Type::String),
    );
    let val = Val::ok(Some(Val::Record(vec![
        ("id".into(), Val::U64(7)),
        ("name".into(), Val::String("component".into())),
    ])));
    assert!(semantically_eq(&val, &roundtrip_memory(&ty, &val)));
    assert!(semantically_eq(&val, &roundtrip_flat(&ty, &val)));
}

proptest! {
    #[test]
    fn scalars_round_trip_through_memory(v in any::<i32>()) {
        let ty = Type::S32;
        let val = Val::S32(v);
        prop_assert!(semantically_eq(&val, &roundtrip_memory(&ty, &val)));
    }

    #[test]
    fn scalars_round_trip_through_flat(v in any::<u64>()) {
        let ty = Type::U64;
        let val = Val::U64(v);
        prop_assert!(semantically_eq(&val, &roundtrip_flat(&ty, &val)));
    }

    #[test]
    fn strings_round_trip(s in "\\PC*") {
        let ty = Type::String;
        let val = Val::String(s);
        prop_assert!(semantically_eq(&val, &roundtrip_memory(&ty, &val)));
    }
}

#[test]
fn core_value_as_u32_rejects_wrong_lane() {
    assert!(CoreValue::I64(1).as_u32().is_err());
}
