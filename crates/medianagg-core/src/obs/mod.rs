//! Observability: runtime telemetry (metrics) and sink abstractions.
//!
//! Aggregation code records through `sink::record` only; counters live in
//! thread-local state owned by `metrics`.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EventOps, EventPerf, EventReport, EventState, TypeCounters, TypeSummary};
pub use sink::{
    ExecKind, MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_metrics_sink,
};
