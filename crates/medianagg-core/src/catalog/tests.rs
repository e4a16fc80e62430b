use crate::{
    catalog::{BuiltinType, OpId, OpSlot, TypeCatalog, TypeId, TypeLayout, TypeOps},
    error::ErrorClass,
    types::Decimal,
    value::{Value, ValueTag},
};
use std::{cmp::Ordering, sync::Arc};

// ---- helpers -----------------------------------------------------------

fn round_trip(ty: &dyn TypeOps, value: &Value) -> Value {
    let mut bytes = Vec::new();
    (ty.send().func)(value, &mut bytes).expect("send");
    (ty.recv().func)(&bytes).expect("recv")
}

fn mean(ty: &dyn TypeOps, a: Value, b: Value) -> Result<Value, crate::error::InternalError> {
    let plus = ty.plus().expect("plus");
    let divide = ty.divide().expect("divide");
    let two = ty.literal(2).expect("literal");
    let sum = (plus.func)(&a, &b)?;

    (divide.func)(&sum, &two)
}

#[test]
fn builtin_catalog_registers_every_variant() {
    let catalog = TypeCatalog::builtin();

    assert_eq!(catalog.len(), BuiltinType::ALL.len());
    for id in [
        TypeId::BLOB,
        TypeId::BOOL,
        TypeId::DECIMAL,
        TypeId::FLOAT64,
        TypeId::INT,
        TypeId::TEXT,
        TypeId::UINT,
    ] {
        let ty = catalog.resolve(id).expect("builtin type");
        assert_eq!(ty.type_id(), id);
        assert!(ty.compare().is_some(), "{} must be ordered", ty.name());
    }
}

#[test]
fn unknown_type_is_a_configuration_error() {
    let err = TypeCatalog::builtin()
        .resolve(TypeId(4242))
        .err()
        .expect("unknown type");

    assert_eq!(err.class, ErrorClass::Configuration);
    assert!(err.message.contains("type#4242"));
}

#[test]
fn duplicate_registration_is_rejected() {
    let mut catalog = TypeCatalog::builtin();
    let err = catalog
        .register(Arc::new(BuiltinType::new(ValueTag::Int)))
        .expect_err("duplicate id");

    assert!(err.is_configuration());
}

#[test]
fn operator_ids_are_distinct_per_type_and_slot() {
    let int = BuiltinType::new(ValueTag::Int);
    let text = BuiltinType::new(ValueTag::Text);

    assert_eq!(
        int.compare().map(|op| op.id),
        Some(OpId::builtin(TypeId::INT, OpSlot::Compare))
    );
    assert_ne!(int.send().id, int.recv().id);
    assert_ne!(int.send().id, text.send().id);
}

#[test]
fn layouts_describe_fixed_and_variable_types() {
    assert_eq!(
        BuiltinType::new(ValueTag::Int).layout(),
        TypeLayout::fixed(8, true)
    );
    assert!(BuiltinType::new(ValueTag::Text).layout().is_variable());
    assert!(!BuiltinType::new(ValueTag::Decimal).layout().by_value);
}

#[test]
fn send_recv_preserve_every_builtin_variant() {
    let samples = [
        Value::Blob(vec![0, 1, 255]),
        Value::Bool(true),
        Value::Decimal(Decimal::new(-12345, 3)),
        Value::float64(-2.75).expect("finite"),
        Value::Int(i64::MIN),
        Value::Text("médiane".to_string()),
        Value::Uint(u64::MAX),
    ];

    for value in samples {
        let ty = BuiltinType::new(value.tag());
        assert_eq!(round_trip(&ty, &value), value);
    }
}

#[test]
fn recv_rejects_malformed_payloads() {
    let int = BuiltinType::new(ValueTag::Int);
    let text = BuiltinType::new(ValueTag::Text);
    let boolean = BuiltinType::new(ValueTag::Bool);

    assert!((int.recv().func)(&[1, 2, 3]).expect_err("short").is_corruption());
    assert!((text.recv().func)(&[0xff, 0xfe]).expect_err("utf8").is_corruption());
    assert!((boolean.recv().func)(&[7]).expect_err("bool").is_corruption());
}

#[test]
fn decimal_recv_rejects_forged_flags() {
    let decimal = BuiltinType::new(ValueTag::Decimal);
    let recv = decimal.recv().func;
    let valid = Decimal::new(-7, 8).serialize();
    assert_eq!(recv(&valid).expect("valid"), Value::Decimal(Decimal::new(-7, 8)));

    let mut scale = valid;
    scale[2] = 200;
    assert!(recv(&scale).expect_err("scale").is_corruption());

    let mut low_bits = valid;
    low_bits[0] = 1;
    assert!(recv(&low_bits).expect_err("low bits").is_corruption());

    let mut sign_bits = valid;
    sign_bits[3] |= 0x01;
    assert!(recv(&sign_bits).expect_err("sign byte").is_corruption());
}

#[test]
fn send_rejects_foreign_values() {
    let int = BuiltinType::new(ValueTag::Int);
    let mut out = Vec::new();

    let err = (int.send().func)(&Value::Text("x".into()), &mut out).expect_err("mismatch");
    assert!(err.is_protocol_misuse());
}

#[test]
fn integer_mean_truncates_and_exact_types_halve() {
    let int = BuiltinType::new(ValueTag::Int);
    let float = BuiltinType::new(ValueTag::Float64);
    let decimal = BuiltinType::new(ValueTag::Decimal);

    assert_eq!(
        mean(&int, Value::Int(2), Value::Int(3)).expect("int mean"),
        Value::Int(2)
    );
    assert_eq!(
        mean(&float, Value::float64(2.0).expect("f"), Value::float64(3.0).expect("f"))
            .expect("float mean"),
        Value::float64(2.5).expect("f")
    );
    assert_eq!(
        mean(
            &decimal,
            Value::Decimal(Decimal::from(2)),
            Value::Decimal(Decimal::from(3))
        )
        .expect("decimal mean"),
        Value::Decimal(Decimal::new(25, 1))
    );
}

#[test]
fn integer_overflow_surfaces_as_arithmetic_error() {
    let int = BuiltinType::new(ValueTag::Int);
    let err = mean(&int, Value::Int(i64::MAX), Value::Int(1)).expect_err("overflow");

    assert_eq!(err.class, ErrorClass::Arithmetic);
}

#[test]
fn non_numeric_types_have_no_averaging_operators() {
    for tag in [ValueTag::Blob, ValueTag::Bool, ValueTag::Text] {
        let ty = BuiltinType::new(tag);
        assert!(ty.plus().is_none());
        assert!(ty.divide().is_none());
        assert!(ty.literal(2).is_none());
    }
}

#[test]
fn builtin_comparator_is_the_value_order() {
    let cmp = BuiltinType::new(ValueTag::Text)
        .compare()
        .expect("ordered")
        .func;

    assert_eq!(cmp(&"apple".into(), &"banana".into()), Ordering::Less);
}
