//! Metrics sink boundary.
//!
//! Aggregation logic MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
use crate::obs::metrics::{self, EventReport};
use std::{cell::RefCell, rc::Rc, time::Instant};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn MetricsSink>>> = RefCell::new(None);
}

///
/// ExecKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExecKind {
    Merge,
    Serialize,
    Deserialize,
    Finalize,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    StateCreated {
        type_name: &'static str,
    },
    RowIngested {
        type_name: &'static str,
    },
    NullSkipped,
    ExecStart {
        kind: ExecKind,
        type_name: &'static str,
    },
    ExecFinish {
        kind: ExecKind,
        type_name: &'static str,
        rows: u64,
        nanos: u64,
    },
    RunSpilled {
        rows: u64,
        bytes: u64,
    },
    MergePass {
        runs: u64,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default sink writing into the thread-local metrics state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::StateCreated { type_name } => {
                metrics::with_state_mut(|m| {
                    m.ops.states_created = m.ops.states_created.saturating_add(1);
                    let entry = m.types.entry(type_name.to_string()).or_default();
                    entry.states_created = entry.states_created.saturating_add(1);
                });
            }

            MetricsEvent::RowIngested { type_name } => {
                metrics::with_state_mut(|m| {
                    m.ops.rows_ingested = m.ops.rows_ingested.saturating_add(1);
                    let entry = m.types.entry(type_name.to_string()).or_default();
                    entry.rows_ingested = entry.rows_ingested.saturating_add(1);
                });
            }

            MetricsEvent::NullSkipped => {
                metrics::with_state_mut(|m| {
                    m.ops.nulls_skipped = m.ops.nulls_skipped.saturating_add(1);
                });
            }

            MetricsEvent::ExecStart { kind, type_name } => {
                metrics::with_state_mut(|m| {
                    match kind {
                        ExecKind::Merge => m.ops.merge_calls = m.ops.merge_calls.saturating_add(1),
                        ExecKind::Serialize => {
                            m.ops.serialize_calls = m.ops.serialize_calls.saturating_add(1);
                        }
                        ExecKind::Deserialize => {
                            m.ops.deserialize_calls = m.ops.deserialize_calls.saturating_add(1);
                        }
                        ExecKind::Finalize => {
                            m.ops.finalize_calls = m.ops.finalize_calls.saturating_add(1);
                        }
                    }

                    let entry = m.types.entry(type_name.to_string()).or_default();
                    match kind {
                        ExecKind::Merge => entry.merge_calls = entry.merge_calls.saturating_add(1),
                        ExecKind::Finalize => {
                            entry.finalize_calls = entry.finalize_calls.saturating_add(1);
                        }
                        ExecKind::Serialize | ExecKind::Deserialize => {}
                    }
                });
            }

            MetricsEvent::ExecFinish {
                kind,
                type_name,
                rows,
                nanos,
            } => {
                metrics::with_state_mut(|m| {
                    match kind {
                        ExecKind::Merge => {
                            m.ops.rows_merged = m.ops.rows_merged.saturating_add(rows);
                            metrics::add_nanos(
                                &mut m.perf.merge_nanos_total,
                                &mut m.perf.merge_nanos_max,
                                nanos,
                            );
                        }
                        ExecKind::Serialize => {
                            m.ops.rows_serialized = m.ops.rows_serialized.saturating_add(rows);
                            metrics::add_nanos(
                                &mut m.perf.serialize_nanos_total,
                                &mut m.perf.serialize_nanos_max,
                                nanos,
                            );
                        }
                        ExecKind::Deserialize => {
                            m.ops.rows_deserialized = m.ops.rows_deserialized.saturating_add(rows);
                            metrics::add_nanos(
                                &mut m.perf.deserialize_nanos_total,
                                &mut m.perf.deserialize_nanos_max,
                                nanos,
                            );
                        }
                        ExecKind::Finalize => {
                            m.ops.rows_finalized = m.ops.rows_finalized.saturating_add(rows);
                            metrics::add_nanos(
                                &mut m.perf.finalize_nanos_total,
                                &mut m.perf.finalize_nanos_max,
                                nanos,
                            );
                        }
                    }

                    if kind == ExecKind::Finalize {
                        let entry = m.types.entry(type_name.to_string()).or_default();
                        entry.rows_finalized = entry.rows_finalized.saturating_add(rows);
                    }
                });
            }

            MetricsEvent::RunSpilled { rows, bytes } => {
                metrics::with_state_mut(|m| {
                    m.ops.runs_spilled = m.ops.runs_spilled.saturating_add(1);
                    m.ops.rows_spilled = m.ops.rows_spilled.saturating_add(rows);
                    m.ops.bytes_spilled = m.ops.bytes_spilled.saturating_add(bytes);
                });
            }

            MetricsEvent::MergePass { .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.merge_passes = m.ops.merge_passes.saturating_add(1);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    // Clone out of the slot so a sink may itself record without a borrow conflict.
    let sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());
    match sink {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the current metrics state.
///
/// `window_start_ms` filters by window start (`EventState::window_start_ms`),
/// not by per-event timestamps.
#[must_use]
pub fn metrics_report(window_start_ms: Option<u64>) -> EventReport {
    metrics::report_window_start(window_start_ms)
}

/// Reset all metrics state (counters + perf).
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override on this thread.
pub fn with_metrics_sink<T>(sink: Rc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Rc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let prev = self.0.take();
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = prev;
            });
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(prev);

    f()
}

///
/// Span
/// RAII guard that emits start/finish events for one entrypoint call.
/// Finish is recorded on drop, so error returns and unwinds are counted.
///

pub(crate) struct Span {
    kind: ExecKind,
    type_name: &'static str,
    started: Instant,
    rows: u64,
}

impl Span {
    #[must_use]
    pub(crate) fn new(kind: ExecKind, type_name: &'static str) -> Self {
        record(MetricsEvent::ExecStart { kind, type_name });

        Self {
            kind,
            type_name,
            started: Instant::now(),
            rows: 0,
        }
    }

    pub(crate) const fn set_rows(&mut self, rows: u64) {
        self.rows = rows;
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        let nanos = u64::try_from(self.started.elapsed().as_nanos()).unwrap_or(u64::MAX);

        record(MetricsEvent::ExecFinish {
            kind: self.kind,
            type_name: self.type_name,
            rows: self.rows,
            nanos,
        });
    }
}

///
/// TESTS
///
