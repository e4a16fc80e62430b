use serde::{Deserialize, Serialize};
use std::{
    cell::RefCell,
    collections::BTreeMap,
    time::{SystemTime, UNIX_EPOCH},
};

///
/// EventState
/// Ephemeral, in-memory counters and simple timing totals for aggregation calls.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub perf: EventPerf,
    pub types: BTreeMap<String, TypeCounters>,
    pub window_start_ms: u64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            perf: EventPerf::default(),
            types: BTreeMap::new(),
            window_start_ms: now_millis(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Lifecycle
    pub states_created: u64,
    pub rows_ingested: u64,
    pub nulls_skipped: u64,

    // Entrypoints
    pub merge_calls: u64,
    pub serialize_calls: u64,
    pub deserialize_calls: u64,
    pub finalize_calls: u64,

    // Rows touched
    pub rows_merged: u64,
    pub rows_serialized: u64,
    pub rows_deserialized: u64,
    pub rows_finalized: u64,

    // External sort
    pub runs_spilled: u64,
    pub rows_spilled: u64,
    pub bytes_spilled: u64,
    pub merge_passes: u64,
}

///
/// TypeCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct TypeCounters {
    pub states_created: u64,
    pub rows_ingested: u64,
    pub merge_calls: u64,
    pub finalize_calls: u64,
    pub rows_finalized: u64,
}

///
/// EventPerf
/// Wall-clock nanoseconds spent inside each entrypoint.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventPerf {
    pub merge_nanos_total: u128,
    pub serialize_nanos_total: u128,
    pub deserialize_nanos_total: u128,
    pub finalize_nanos_total: u128,

    pub merge_nanos_max: u64,
    pub serialize_nanos_max: u64,
    pub deserialize_nanos_max: u64,
    pub finalize_nanos_max: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
        })
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters and open a new window.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

/// Accumulate a duration and track a max.
pub(crate) fn add_nanos(total: &mut u128, max: &mut u64, delta: u64) {
    *total = total.saturating_add(u128::from(delta));
    if delta > *max {
        *max = delta;
    }
}

///
/// EventReport
/// Counter snapshot plus per-type summaries.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    /// Ephemeral runtime counters since `window_start_ms`.
    pub counters: Option<EventState>,
    /// Per-type counters and averages.
    pub type_counters: Vec<TypeSummary>,
}

///
/// TypeSummary
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct TypeSummary {
    pub name: String,
    pub states_created: u64,
    pub rows_ingested: u64,
    pub merge_calls: u64,
    pub finalize_calls: u64,
    pub avg_rows_per_state: f64,
}

/// Build a report, or an empty one when the current window opened after
/// `window_start_ms`.
pub(crate) fn report_window_start(window_start_ms: Option<u64>) -> EventReport {
    let current = with_state(|m| m.window_start_ms);
    if window_start_ms.is_some_and(|requested| requested > current) {
        return EventReport::default();
    }

    report()
}

/// Build a metrics report from in-memory counters.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub(crate) fn report() -> EventReport {
    let snap = with_state(Clone::clone);

    let mut type_counters: Vec<TypeSummary> = snap
        .types
        .iter()
        .map(|(name, counters)| {
            let avg_rows = if counters.states_created > 0 {
                counters.rows_ingested as f64 / counters.states_created as f64
            } else {
                0.0
            };

            TypeSummary {
                name: name.clone(),
                states_created: counters.states_created,
                rows_ingested: counters.rows_ingested,
                merge_calls: counters.merge_calls,
                finalize_calls: counters.finalize_calls,
                avg_rows_per_state: avg_rows,
            }
        })
        .collect();

    // Busiest types first, then by name.
    type_counters.sort_by(|a, b| {
        b.rows_ingested
            .cmp(&a.rows_ingested)
            .then_with(|| a.name.cmp(&b.name))
    });

    EventReport {
        counters: Some(snap),
        type_counters,
    }
}

///
/// TESTS
///

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn reset_all_clears_state() {
        with_state_mut(|m| {
            m.ops.rows_ingested = 3;
            m.ops.runs_spilled = 2;
            m.perf.finalize_nanos_max = 9;
            m.types.insert(
                "Int".to_string(),
                TypeCounters {
                    states_created: 1,
                    ..Default::default()
                },
            );
        });

        reset_all();

        with_state(|m| {
            assert_eq!(m.ops.rows_ingested, 0);
            assert_eq!(m.ops.runs_spilled, 0);
            assert_eq!(m.perf.finalize_nanos_max, 0);
            assert!(m.types.is_empty());
        });
    }

    #[test]
    fn report_orders_types_by_rows_then_name() {
        reset_all();
        with_state_mut(|m| {
            for (name, states, rows) in [("Text", 2, 6), ("Int", 1, 9), ("Blob", 3, 6)] {
                m.types.insert(
                    name.to_string(),
                    TypeCounters {
                        states_created: states,
                        rows_ingested: rows,
                        ..Default::default()
                    },
                );
            }
        });

        let report = report();
        let names: Vec<_> = report
            .type_counters
            .iter()
            .map(|t| t.name.as_str())
            .collect();

        assert_eq!(names, ["Int", "Blob", "Text"]);
        assert_eq!(report.type_counters[0].avg_rows_per_state, 9.0);
        assert_eq!(report.type_counters[1].avg_rows_per_state, 2.0);
        assert_eq!(report.type_counters[2].avg_rows_per_state, 3.0);
    }

    #[test]
    fn add_nanos_tracks_total_and_max() {
        let mut total = 0u128;
        let mut max = 0u64;
        add_nanos(&mut total, &mut max, 5);
        add_nanos(&mut total, &mut max, 3);

        assert_eq!(total, 8);
        assert_eq!(max, 5);
    }
}
