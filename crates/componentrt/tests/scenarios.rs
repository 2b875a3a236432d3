//! The end-to-end scenarios from spec.md §8, driven through the public
//! `Runtime`/`Module`/`Instance` facade against a hand-scripted
//! [`componentrt::testing::NativeExports`] guest.
//!
//! Scenario 6 (async `process-lines`) is exercised directly against
//! `componentrt_sched::CallSession` in that crate's own test suite —
//! `Instance::call` is synchronous-only (see DESIGN.md), so there is
//! no facade-level equivalent to drive it through here.

use componentrt::testing::{NativeExports, NativeFn};
use componentrt::{Config, ExportSignature, Runtime};
use componentrt_host::{HostFnEntry, Namespace};
use componentrt_sched::CallContext;
use componentrt_types::{Case, Field, Type, Val};
use std::collections::HashMap;

fn point_type() -> Type {
    Type::Record(vec![Field::new("x", Type::S32), Field::new("y", Type::S32)])
}

fn point(x: i32, y: i32) -> Val {
    Val::Record(vec![("x".to_string(), Val::S32(x)), ("y".to_string(), Val::S32(y))])
}

#[test]
fn echo_point_round_trips_a_record() {
    let runtime = Runtime::new(Config::new());
    let mut exports = HashMap::new();
    exports.insert(
        "echo-point".to_string(),
        ExportSignature {
            params: vec![point_type()],
            result: Some(point_type()),
        },
    );
    let module = runtime.load_component("shapes", exports, Vec::new()).unwrap();

    let mut guest = NativeExports::new();
    guest.define(
        "echo-point",
        NativeFn::new(vec![point_type()], Some(point_type()), |args, _imports| {
            Ok(args[0].clone())
        }),
    );

    let mut instance = componentrt::Instance::new(&module, Box::new(guest));
    let result = instance
        .call("echo-point", &[point(10, 20)], &CallContext::new())
        .unwrap();
    assert_eq!(result, Some(point(10, 20)));
}

fn divide_error_type() -> Type {
    Type::Record(vec![
        Field::new("code", Type::U32),
        Field::new("message", Type::String),
    ])
}

#[test]
fn try_divide_by_zero_returns_a_structured_error() {
    let runtime = Runtime::new(Config::new());
    let sig = ExportSignature {
        params: vec![Type::U32, Type::U32],
        result: Some(Type::result(Some(Type::U32), Some(divide_error_type()))),
    };
    let mut exports = HashMap::new();
    exports.insert("try-divide".to_string(), sig.clone());
    let module = runtime.load_component("math", exports, Vec::new()).unwrap();

    let mut guest = NativeExports::new();
    guest.define(
        "try-divide",
        NativeFn::new(sig.params.clone(), sig.result.clone(), |args, _imports| {
            let (Val::U32(a), Val::U32(b)) = (&args[0], &args[1]) else {
                panic!("unexpected shapes");
            };
            if *b == 0 {
                Ok(Val::err(Some(Val::Record(vec![
                    ("code".to_string(), Val::U32(1)),
                    ("message".to_string(), Val::String("division by zero".to_string())),
                ]))))
            } else {
                Ok(Val::ok(Some(Val::U32(a / b))))
            }
        }),
    );

    let mut instance = componentrt::Instance::new(&module, Box::new(guest));

    let err = instance
        .call("try-divide", &[Val::U32(10), Val::U32(0)], &CallContext::new())
        .unwrap()
        .unwrap();
    assert_eq!(
        err,
        Val::err(Some(Val::Record(vec![
            ("code".to_string(), Val::U32(1)),
            ("message".to_string(), Val::String("division by zero".to_string())),
        ])))
    );

    let ok = instance
        .call("try-divide", &[Val::U32(10), Val::U32(2)], &CallContext::new())
        .unwrap()
        .unwrap();
    assert_eq!(ok, Val::ok(Some(Val::U32(5))));
}

fn shape_type() -> Type {
    Type::Variant(vec![
        Case::new(
            "rect",
            Some(Type::Record(vec![
                Field::new("top-left", point_type()),
                Field::new("bottom-right", point_type()),
            ])),
        ),
        Case::new("none", None),
    ])
}

#[test]
fn echo_shape_round_trips_every_case() {
    let runtime = Runtime::new(Config::new());
    let sig = ExportSignature {
        params: vec![shape_type()],
        result: Some(shape_type()),
    };
    let mut exports = HashMap::new();
    exports.insert("echo-shape".to_string(), sig.clone());
    let module = runtime.load_component("shapes", exports, Vec::new()).unwrap();

    let mut guest = NativeExports::new();
    guest.define(
        "echo-shape",
        NativeFn::new(sig.params.clone(), sig.result.clone(), |args, _imports| Ok(args[0].clone())),
    );
    let mut instance = componentrt::Instance::new(&module, Box::new(guest));

    let rect = Val::variant(
        "rect",
        Some(Val::Record(vec![
            ("top-left".to_string(), point(0, 0)),
            ("bottom-right".to_string(), point(10, 20)),
        ])),
    );
    let result = instance.call("echo-shape", &[rect.clone()], &CallContext::new()).unwrap();
    assert_eq!(result, Some(rect));

    let none = Val::variant("none", None);
    let result = instance.call("echo-shape", &[none.clone()], &CallContext::new()).unwrap();
    assert_eq!(result, Some(none));
}

fn host_math_namespace() -> Namespace {
    Namespace::parse("test:host/math@1.0.0").unwrap()
}

#[test]
fn compute_uses_the_host_provided_add_and_compute_using_host_forwards_to_it() {
    let runtime = Runtime::new(Config::new());
    runtime.register_explicit(
        &host_math_namespace(),
        HashMap::from([(
            "add".to_string(),
            HostFnEntry::sync(vec![Type::U32, Type::U32], Some(Type::U32), |_ctx, args| {
                let (Val::U32(a), Val::U32(b)) = (&args[0], &args[1]) else {
                    panic!("unexpected shapes");
                };
                Ok(Val::U32(a + b))
            }),
        )]),
    );

    let imports = vec![componentrt::ImportRequirement {
        namespace: host_math_namespace(),
        name: "add".to_string(),
        params: vec![Type::U32, Type::U32],
        result: Some(Type::U32),
        is_async: false,
    }];
    let mut exports = HashMap::new();
    exports.insert(
        "compute".to_string(),
        ExportSignature {
            params: vec![Type::U32, Type::U32],
            result: Some(Type::U32),
        },
    );
    exports.insert(
        "compute-using-host".to_string(),
        ExportSignature {
            params: vec![Type::U32, Type::U32],
            result: Some(Type::U32),
        },
    );
    let module = runtime.load_component("compute", exports, imports).unwrap();

    let mut guest = NativeExports::new();
    guest.declare_import(
        "add",
        "test:host/math@1.0.0",
        "add",
        vec![Type::U32, Type::U32],
        Some(Type::U32),
    );
    // compute(a, b) accumulates `b` host-add calls of `a`, so
    // compute(5, 3) == add(add(add(0, 5), 5), 5) == 15 — a
    // multiplication synthesised purely from the host-provided `add`.
    guest.define(
        "compute",
        NativeFn::new(vec![Type::U32, Type::U32], Some(Type::U32), |args, imports| {
            let (Val::U32(a), Val::U32(b)) = (&args[0], &args[1]) else {
                panic!("unexpected shapes");
            };
            let mut acc = Val::U32(0);
            for _ in 0..*b {
                acc = imports("add", &[acc, Val::U32(*a)])?.expect("add returns a value");
            }
            Ok(acc)
        }),
    );
    guest.define(
        "compute-using-host",
        NativeFn::new(vec![Type::U32, Type::U32], Some(Type::U32), |args, imports| {
            Ok(imports("add", args)?.expect("add returns a value"))
        }),
    );

    let mut instance = componentrt::Instance::new(&module, Box::new(guest));
    let result = instance
        .call("compute", &[Val::U32(5), Val::U32(3)], &CallContext::new())
        .unwrap();
    assert_eq!(result, Some(Val::U32(15)));

    let result = instance
        .call("compute-using-host", &[Val::U32(7), Val::U32(8)], &CallContext::new())
        .unwrap();
    assert_eq!(result, Some(Val::U32(15)));
}

fn user_type() -> Type {
    Type::Record(vec![
        Field::new("id", Type::U32),
        Field::new("name", Type::String),
        Field::new("tags", Type::list(Type::String)),
        Field::new("active", Type::Bool),
    ])
}

fn transformed_user_type() -> Type {
    Type::Record(vec![
        Field::new("id", Type::U32),
        Field::new("display", Type::String),
        Field::new("tag-count", Type::U32),
    ])
}

#[test]
fn transform_users_derives_display_and_tag_count() {
    let runtime = Runtime::new(Config::new());
    let sig = ExportSignature {
        params: vec![Type::list(user_type())],
        result: Some(Type::list(transformed_user_type())),
    };
    let mut exports = HashMap::new();
    exports.insert("transform-users".to_string(), sig.clone());
    let module = runtime.load_component("users", exports, Vec::new()).unwrap();

    let mut guest = NativeExports::new();
    guest.define(
        "transform-users",
        NativeFn::new(sig.params.clone(), sig.result.clone(), |args, _imports| {
            let Val::List(users) = &args[0] else {
                panic!("unexpected shape");
            };
            let mut out = Vec::with_capacity(users.len());
            for user in users {
                let Val::Record(fields) = user else {
                    panic!("unexpected user shape");
                };
                let field = |name: &str| &fields.iter().find(|(n, _)| n == name).unwrap().1;
                let Val::U32(id) = field("id") else { panic!() };
                let Val::String(name) = field("name") else { panic!() };
                let Val::List(tags) = field("tags") else { panic!() };
                let tag_strs: Vec<&str> = tags
                    .iter()
                    .map(|t| match t {
                        Val::String(s) => s.as_str(),
                        _ => panic!("unexpected tag shape"),
                    })
                    .collect();
                let display = format!("{name} [{}]", tag_strs.join(", "));
                out.push(Val::Record(vec![
                    ("id".to_string(), Val::U32(*id)),
                    ("display".to_string(), Val::String(display)),
                    ("tag-count".to_string(), Val::U32(tags.len() as u32)),
                ]));
            }
            Ok(Val::List(out))
        }),
    );

    let mut instance = componentrt::Instance::new(&module, Box::new(guest));
    let input = Val::List(vec![Val::Record(vec![
        ("id".to_string(), Val::U32(42)),
        ("name".to_string(), Val::String("Test".to_string())),
        (
            "tags".to_string(),
            Val::List(vec![Val::String("a".to_string()), Val::String("b".to_string())]),
        ),
        ("active".to_string(), Val::Bool(true)),
    ])]);
    let result = instance.call("transform-users", &[input], &CallContext::new()).unwrap();
    assert_eq!(
        result,
        Some(Val::List(vec![Val::Record(vec![
            ("id".to_string(), Val::U32(42)),
            ("display".to_string(), Val::String("Test [a, b]".to_string())),
            ("tag-count".to_string(), Val::U32(2)),
        ])]))
    );
}

#[test]
fn core_module_load_parses_primitive_signatures_from_its_type_description() {
    let runtime = Runtime::new(Config::new());
    let module = runtime
        .load_core_module("arith", "add: func(a: u32, b: u32) -> u32;")
        .unwrap();

    let mut guest = NativeExports::new();
    guest.define(
        "add",
        NativeFn::new(vec![Type::U32, Type::U32], Some(Type::U32), |args, _imports| {
            let (Val::U32(a), Val::U32(b)) = (&args[0], &args[1]) else {
                panic!("unexpected shapes");
            };
            Ok(Val::U32(a + b))
        }),
    );
    let mut instance = componentrt::Instance::new(&module, Box::new(guest));
    let result = instance
        .call("add", &[Val::U32(7), Val::U32(8)], &CallContext::new())
        .unwrap();
    assert_eq!(result, Some(Val::U32(15)));
}
