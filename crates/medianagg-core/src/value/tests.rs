use crate::{
    types::{Decimal, Float64},
    value::{Value, ValueTag, canonical_cmp},
};
use std::cmp::Ordering;

// ---- helpers -----------------------------------------------------------

fn v_f64(x: f64) -> Value {
    Value::float64(x).expect("finite f64")
}
fn v_txt(s: &str) -> Value {
    Value::Text(s.to_string())
}

#[test]
fn same_variant_orders_by_payload() {
    assert_eq!(canonical_cmp(&Value::Int(-3), &Value::Int(2)), Ordering::Less);
    assert_eq!(canonical_cmp(&v_f64(2.5), &v_f64(2.5)), Ordering::Equal);
    assert_eq!(canonical_cmp(&v_txt("b"), &v_txt("a")), Ordering::Greater);
    assert_eq!(
        canonical_cmp(&Value::Decimal(Decimal::new(15, 1)), &Value::Decimal(Decimal::new(2, 0))),
        Ordering::Less
    );
}

#[test]
fn mixed_variants_order_by_tag_only() {
    let blob = Value::Blob(vec![0xff]);
    let uint = Value::Uint(0);

    assert_eq!(canonical_cmp(&blob, &uint), Ordering::Less);
    assert_eq!(canonical_cmp(&uint, &blob), Ordering::Greater);
}

#[test]
fn tags_are_stable() {
    assert_eq!(Value::Blob(Vec::new()).tag(), ValueTag::Blob);
    assert_eq!(Value::Int(0).tag().to_u8(), 5);
    assert_eq!(Value::Uint(0).tag().to_u8(), 7);
    assert_eq!(v_txt("x").label(), "Text");
}

#[test]
fn estimated_bytes_counts_heap_payload() {
    let fixed = Value::Int(1).estimated_bytes();

    assert_eq!(v_txt("abcd").estimated_bytes(), fixed + 4);
    assert_eq!(Value::Blob(vec![0; 10]).estimated_bytes(), fixed + 10);
}

#[test]
fn float_constructor_rejects_non_finite() {
    assert!(Value::float64(f64::NAN).is_none());
    assert!(Value::float64(f64::INFINITY).is_none());
    assert_eq!(Value::float64(1.0), Some(Value::Float64(Float64::from(1))));
}
