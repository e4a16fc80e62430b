mod property;

use crate::{
    aggregate::MedianAggregate,
    catalog::{TypeCatalog, TypeId},
    config::MedianConfig,
    error::ErrorClass,
    obs::{metrics_report, metrics_reset_all},
    state::MedianState,
    types::Decimal,
    value::Value,
};
use std::sync::Arc;

// ---- helpers -----------------------------------------------------------

fn aggregate(type_id: TypeId) -> MedianAggregate {
    MedianAggregate::builtin(type_id)
}

fn fold(agg: &MedianAggregate, rows: &[Option<Value>]) -> Option<MedianState> {
    rows.iter().fold(None, |state, row| {
        Some(agg.transition(state, row.as_ref()).expect("transition"))
    })
}

fn some_ints(values: &[i64]) -> Vec<Option<Value>> {
    values.iter().map(|v| Some(Value::Int(*v))).collect()
}

fn some_floats(values: &[f64]) -> Vec<Option<Value>> {
    values.iter().map(|v| Value::float64(*v)).collect()
}

fn float(v: f64) -> Value {
    Value::float64(v).expect("finite")
}

// ---- tests -------------------------------------------------------------

#[test]
fn odd_group_median() {
    let agg = aggregate(TypeId::INT);
    let state = fold(&agg, &some_ints(&[5, 1, 3]));

    assert_eq!(agg.finalize(state).expect("finalize"), Some(Value::Int(3)));
}

#[test]
fn even_group_median_is_mean_of_middle_values() {
    let agg = aggregate(TypeId::FLOAT64);
    let state = fold(&agg, &some_floats(&[1.0, 2.0, 3.0, 4.0]));

    assert_eq!(agg.finalize(state).expect("finalize"), Some(float(2.5)));
}

#[test]
fn decimal_group_median() {
    let agg = aggregate(TypeId::DECIMAL);
    let rows: Vec<_> = [4, 1, 3, 2]
        .into_iter()
        .map(|v| Some(Value::Decimal(Decimal::from(v))))
        .collect();
    let state = fold(&agg, &rows);

    assert_eq!(
        agg.finalize(state).expect("finalize"),
        Some(Value::Decimal(Decimal::new(25, 1)))
    );
}

#[test]
fn nulls_are_ignored() {
    let agg = aggregate(TypeId::INT);
    let state = fold(
        &agg,
        &[None, Some(Value::Int(9)), None, Some(Value::Int(1)), Some(Value::Int(5))],
    );

    let state = state.expect("state");
    assert_eq!(state.row_count(), 3);
    assert_eq!(agg.finalize(Some(state)).expect("finalize"), Some(Value::Int(5)));
}

#[test]
fn all_null_group_has_empty_state_and_no_median() {
    let agg = aggregate(TypeId::INT);
    let state = fold(&agg, &[None, None]).expect("created on first call");

    assert!(state.is_empty());
    assert_eq!(agg.finalize(Some(state)).expect("finalize"), None);
}

#[test]
fn group_without_state_has_no_median() {
    let agg = aggregate(TypeId::INT);

    assert_eq!(agg.finalize(None).expect("finalize"), None);
}

#[test]
fn partials_merge_into_group_median() {
    let agg = aggregate(TypeId::FLOAT64);
    let a = fold(&agg, &some_floats(&[1.0, 3.0]));
    let b = fold(&agg, &some_floats(&[2.0, 4.0]));

    let merged = agg.combine(a, b.as_ref()).expect("combine");

    assert_eq!(agg.finalize(merged).expect("finalize"), Some(float(2.5)));
}

#[test]
fn combine_with_absent_source_returns_destination() {
    let agg = aggregate(TypeId::INT);
    let dest = fold(&agg, &some_ints(&[1, 2]));

    let merged = agg.combine(dest, None).expect("combine").expect("dest kept");
    assert_eq!(merged.row_count(), 2);

    assert!(agg.combine(None, None).expect("combine").is_none());
}

#[test]
fn combine_into_absent_destination_copies_source() {
    let agg = aggregate(TypeId::INT);
    let src = fold(&agg, &some_ints(&[4, 6, 5])).expect("src");

    let merged = agg.combine(None, Some(&src)).expect("combine").expect("adopted");

    assert_eq!(merged.row_count(), 3);
    assert_eq!(src.row_count(), 3);
    assert_eq!(agg.finalize(Some(merged)).expect("finalize"), Some(Value::Int(5)));
    assert_eq!(agg.finalize(Some(src)).expect("finalize"), Some(Value::Int(5)));
}

#[test]
fn combine_rejects_states_of_different_types() {
    let ints = aggregate(TypeId::INT);
    let texts = aggregate(TypeId::TEXT);
    let dest = fold(&ints, &some_ints(&[1]));
    let src = fold(&texts, &[Some(Value::from("a"))]);

    let err = ints.combine(dest, src.as_ref()).expect_err("mismatch");
    assert_eq!(err.class, ErrorClass::ProtocolMisuse);
}

#[test]
fn serialized_partials_merge_like_local_ones() {
    let agg = aggregate(TypeId::INT);
    let a = fold(&agg, &some_ints(&[10, 30, 50])).expect("a");
    let b = fold(&agg, &some_ints(&[20, 40])).expect("b");

    let wire_a = agg.serialize(&a).expect("serialize a");
    let wire_b = agg.serialize(&b).expect("serialize b");
    let a = agg.deserialize(&wire_a).expect("deserialize a");
    let b = agg.deserialize(&wire_b).expect("deserialize b");

    let merged = agg.combine(Some(a), Some(&b)).expect("combine");
    assert_eq!(agg.finalize(merged).expect("finalize"), Some(Value::Int(30)));
}

#[test]
fn deserialize_rejects_state_of_another_input_type() {
    let texts = aggregate(TypeId::TEXT);
    let state = fold(&texts, &[Some(Value::from("a"))]).expect("state");
    let bytes = texts.serialize(&state).expect("serialize");

    let err = aggregate(TypeId::INT)
        .deserialize(&bytes)
        .expect_err("declared input is Int");
    assert!(err.is_protocol_misuse());
}

#[test]
fn missing_input_type_fails_on_first_row() {
    let agg = MedianAggregate::new(
        Arc::new(TypeCatalog::builtin()),
        None,
        MedianConfig::default(),
    )
    .expect("aggregate");

    let err = agg.transition(None, None).expect_err("no input type");
    assert!(err.is_configuration());
    assert_eq!(err.message, "could not determine input data type");
}

#[test]
fn unknown_input_type_fails_on_first_row() {
    let agg = aggregate(TypeId(777));

    let err = agg
        .transition(None, Some(&Value::Int(1)))
        .expect_err("unknown type");
    assert!(err.is_configuration());
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let err = MedianAggregate::new(
        Arc::new(TypeCatalog::builtin()),
        Some(TypeId::INT),
        MedianConfig::external_sort(1024).with_merge_fan_in(1),
    )
    .expect_err("fan-in below two");

    assert!(err.is_configuration());
}

#[test]
fn even_text_group_fails_only_at_finalize() {
    let agg = aggregate(TypeId::TEXT);
    let state = fold(&agg, &[Some("x".into()), Some("y".into())]);
    assert_eq!(state.as_ref().map(MedianState::row_count), Some(2));

    let err = agg.finalize(state).expect_err("no arithmetic for text");
    assert!(err.is_configuration());
}

#[test]
fn external_sort_aggregate_matches_in_memory() {
    let spill = tempfile::tempdir().expect("tempdir");
    let sorted = MedianAggregate::new(
        Arc::new(TypeCatalog::builtin()),
        Some(TypeId::INT),
        MedianConfig::external_sort(96)
            .with_merge_fan_in(4)
            .with_spill_dir(spill.path()),
    )
    .expect("aggregate");
    let memory = aggregate(TypeId::INT);
    let rows = some_ints(&(0..250).map(|i| (i * 89) % 251).collect::<Vec<_>>());

    let from_sort = sorted.finalize(fold(&sorted, &rows)).expect("sort finalize");
    let from_memory = memory.finalize(fold(&memory, &rows)).expect("memory finalize");

    assert_eq!(from_sort, from_memory);
    assert!(std::fs::read_dir(spill.path()).expect("dir").next().is_none());
}

#[test]
fn lifecycle_events_reach_metrics() {
    metrics_reset_all();
    let agg = aggregate(TypeId::INT);
    let a = fold(&agg, &[Some(Value::Int(1)), None, Some(Value::Int(2))]);
    let b = fold(&agg, &some_ints(&[3]));
    let bytes = agg.serialize(b.as_ref().expect("b")).expect("serialize");
    let b = agg.deserialize(&bytes).expect("deserialize");
    let merged = agg.combine(a, Some(&b)).expect("combine");
    agg.finalize(merged).expect("finalize");

    let report = metrics_report(None);
    let counters = report.counters.expect("counters");
    assert_eq!(counters.ops.states_created, 2);
    assert_eq!(counters.ops.rows_ingested, 3);
    assert_eq!(counters.ops.nulls_skipped, 1);
    assert_eq!(counters.ops.serialize_calls, 1);
    assert_eq!(counters.ops.deserialize_calls, 1);
    assert_eq!(counters.ops.merge_calls, 1);
    assert_eq!(counters.ops.rows_merged, 1);
    assert_eq!(counters.ops.finalize_calls, 1);
    assert_eq!(counters.ops.rows_finalized, 4);

    let int = &report.type_counters[0];
    assert_eq!(int.name, "Int");
    assert_eq!(int.finalize_calls, 1);
    assert_eq!(int.states_created, 2);
    assert_eq!(int.rows_ingested, 3);
}
