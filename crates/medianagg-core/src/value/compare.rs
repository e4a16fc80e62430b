use crate::value::Value;
use std::cmp::Ordering;

/// Total canonical comparator over values.
///
/// Ordering rules:
/// 1. Canonical variant tag
/// 2. Variant-specific comparison for same-tagged values
///
/// Mixed-variant comparisons are tag-only and must remain deterministic.
#[must_use]
pub fn canonical_cmp(left: &Value, right: &Value) -> Ordering {
    let tag = left.tag().to_u8().cmp(&right.tag().to_u8());
    if tag != Ordering::Equal {
        return tag;
    }

    canonical_cmp_same_tag(left, right)
}

fn canonical_cmp_same_tag(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Blob(a), Value::Blob(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Decimal(a), Value::Decimal(b)) => a.cmp(b),
        (Value::Float64(a), Value::Float64(b)) => a.cmp(b),
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Text(a), Value::Text(b)) => a.cmp(b),
        (Value::Uint(a), Value::Uint(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}
