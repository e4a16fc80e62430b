use crate::{
    aggregate::MedianAggregate,
    catalog::{TypeCatalog, TypeId},
    config::MedianConfig,
    state::MedianState,
    value::Value,
};
use proptest::prelude::*;
use std::sync::Arc;

// Bounded so the sum of two middle values never overflows.
const BOUND: i64 = 1 << 40;

fn arb_ints(max_len: usize) -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(-BOUND..BOUND, 0..max_len)
}

fn arb_rows() -> impl Strategy<Value = Vec<Option<i64>>> {
    prop::collection::vec(prop::option::weighted(0.8, -BOUND..BOUND), 0..64)
}

fn int_median() -> MedianAggregate {
    MedianAggregate::builtin(TypeId::INT)
}

fn fold(agg: &MedianAggregate, values: &[i64]) -> Option<MedianState> {
    values.iter().fold(None, |state, v| {
        Some(
            agg.transition(state, Some(&Value::Int(*v)))
                .expect("transition"),
        )
    })
}

fn finalize(agg: &MedianAggregate, state: Option<MedianState>) -> Option<Value> {
    agg.finalize(state).expect("finalize")
}

// Independent reference: full sort, middle index, truncating mean.
fn reference_median(values: &[i64]) -> Option<Value> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;

    let median = if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2
    };

    Some(Value::Int(median))
}

proptest! {
    #[test]
    fn median_matches_reference(values in arb_ints(64)) {
        let agg = int_median();

        prop_assert_eq!(finalize(&agg, fold(&agg, &values)), reference_median(&values));
    }

    #[test]
    fn median_is_order_independent(
        (values, shuffled) in arb_ints(48).prop_flat_map(|values| {
            let shuffled = Just(values.clone()).prop_shuffle();
            (Just(values), shuffled)
        })
    ) {
        let agg = int_median();

        prop_assert_eq!(
            finalize(&agg, fold(&agg, &values)),
            finalize(&agg, fold(&agg, &shuffled))
        );
    }

    #[test]
    fn nulls_never_change_the_median(rows in arb_rows()) {
        let agg = int_median();
        let with_nulls = rows.iter().fold(None, |state, row| {
            let value = row.map(Value::Int);
            Some(agg.transition(state, value.as_ref()).expect("transition"))
        });
        let present: Vec<i64> = rows.iter().flatten().copied().collect();

        prop_assert_eq!(finalize(&agg, with_nulls), reference_median(&present));
    }

    #[test]
    fn split_and_merge_matches_single_state(values in arb_ints(64), split in any::<prop::sample::Index>()) {
        let agg = int_median();
        let cut = split.index(values.len() + 1);
        let (left, right) = values.split_at(cut);

        let merged = agg
            .combine(fold(&agg, left), fold(&agg, right).as_ref())
            .expect("combine");

        prop_assert_eq!(finalize(&agg, merged), reference_median(&values));
    }

    #[test]
    fn merge_is_commutative(a in arb_ints(32), b in arb_ints(32)) {
        let agg = int_median();

        let ab = agg.combine(fold(&agg, &a), fold(&agg, &b).as_ref()).expect("ab");
        let ba = agg.combine(fold(&agg, &b), fold(&agg, &a).as_ref()).expect("ba");

        prop_assert_eq!(finalize(&agg, ab), finalize(&agg, ba));
    }

    #[test]
    fn merge_is_associative(a in arb_ints(24), b in arb_ints(24), c in arb_ints(24)) {
        let agg = int_median();

        let ab = agg.combine(fold(&agg, &a), fold(&agg, &b).as_ref()).expect("ab");
        let ab_c = agg.combine(ab, fold(&agg, &c).as_ref()).expect("ab_c");

        let bc = agg.combine(fold(&agg, &b), fold(&agg, &c).as_ref()).expect("bc");
        let a_bc = agg.combine(fold(&agg, &a), bc.as_ref()).expect("a_bc");

        prop_assert_eq!(finalize(&agg, ab_c), finalize(&agg, a_bc));
    }

    #[test]
    fn serialization_round_trip_preserves_median(values in arb_ints(64)) {
        let agg = int_median();
        let Some(state) = fold(&agg, &values) else {
            return Ok(());
        };
        let expected = reference_median(&values);

        let bytes = agg.serialize(&state).expect("serialize");
        let decoded = agg.deserialize(&bytes).expect("deserialize");

        prop_assert_eq!(decoded.row_count(), state.row_count());
        prop_assert_eq!(agg.serialize(&decoded).expect("re-serialize"), bytes);
        prop_assert_eq!(finalize(&agg, Some(decoded)), expected);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn external_sort_matches_in_memory(values in arb_ints(400), fan_in in 2usize..6) {
        let spill = tempfile::tempdir().expect("tempdir");
        let sorted = MedianAggregate::new(
            Arc::new(TypeCatalog::builtin()),
            Some(TypeId::INT),
            MedianConfig::external_sort(160)
                .with_merge_fan_in(fan_in)
                .with_spill_dir(spill.path()),
        )
        .expect("aggregate");

        prop_assert_eq!(finalize(&sorted, fold(&sorted, &values)), reference_median(&values));
        prop_assert!(std::fs::read_dir(spill.path()).expect("dir").next().is_none());
    }
}
