//! Module: sort
//! Responsibility: bounded-memory ordering of values with spill to temporary storage.
//! Does not own: median selection, state serialization, or type resolution.
//! Boundary: storage backend for the external-sort strategy.

mod merge;
mod run;


use crate::{
    catalog::{CompareFn, RecvFn, SendFn},
    config::{MIN_MERGE_FAN_IN, MedianConfig},
    error::{ErrorClass, ErrorOrigin, InternalError},
    obs::sink::{MetricsEvent, record},
    value::Value,
};
use merge::RunMerger;
use run::{RunCodec, ScratchDir, SpillRun};
use std::{collections::VecDeque, path::PathBuf};

///
/// SortStats
///
/// Spill activity of one engine.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SortStats {
    pub runs_spilled: u64,
    pub bytes_spilled: u64,
    pub merge_passes: u64,
}

///
/// ExternalSort
///
/// Two-phase sorter. Values are staged with `put` until `perform_sort`,
/// after which they are read back in ascending order with `skip` and
/// `next`. Staged values beyond `work_mem_bytes` are written to sorted
/// runs in a scratch directory that is removed when the engine drops.
///
/// Calling `put` after `perform_sort`, or reading before it, is a
/// protocol misuse. A failed spill or `perform_sort` leaves the engine unusable.
///

pub struct ExternalSort {
    ctx: SortContext,
    phase: SortPhase,
    staged: u64,
    stats: SortStats,
}

impl ExternalSort {
    #[must_use]
    pub fn new(compare: CompareFn, send: SendFn, recv: RecvFn, config: &MedianConfig) -> Self {
        Self {
            ctx: SortContext {
                compare,
                codec: RunCodec { send, recv },
                work_mem_bytes: config.work_mem_bytes.max(1),
                merge_fan_in: config.merge_fan_in.max(MIN_MERGE_FAN_IN),
                spill_root: config.spill_dir.clone(),
            },
            phase: SortPhase::Write(WriteState::default()),
            staged: 0,
            stats: SortStats::default(),
        }
    }

    /// Number of values staged so far.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.staged
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.staged == 0
    }

    #[must_use]
    pub const fn is_sorted(&self) -> bool {
        matches!(self.phase, SortPhase::Read(_))
    }

    #[must_use]
    pub const fn stats(&self) -> SortStats {
        self.stats
    }

    /// Stage one owned value.
    pub fn put(&mut self, value: Value) -> Result<(), InternalError> {
        let write = match &mut self.phase {
            SortPhase::Write(write) => write,
            SortPhase::Read(_) => {
                return Err(InternalError::sort_misuse("put after perform_sort"));
            }
            SortPhase::Failed => return Err(failed()),
        };

        write
            .memtable
            .try_reserve(1)
            .map_err(|err| InternalError::allocation(ErrorOrigin::Sort, err))?;
        write.memtable_bytes = write.memtable_bytes.saturating_add(value.estimated_bytes());
        write.memtable.push(value);
        self.staged += 1;

        if write.memtable_bytes > self.ctx.work_mem_bytes
            && let Err(err) = write.spill(&self.ctx, &mut self.stats)
        {
            // The memtable was taken by the failed spill.
            tracing::warn!(
                class = %err.class,
                origin = %err.origin,
                staged = self.staged,
                "spill failed, sort engine poisoned"
            );
            self.phase = SortPhase::Failed;
            return Err(err);
        }

        Ok(())
    }

    /// Visit every staged value in unspecified order without consuming it.
    pub fn for_each_staged(
        &self,
        mut f: impl FnMut(&Value) -> Result<(), InternalError>,
    ) -> Result<(), InternalError> {
        let SortPhase::Write(write) = &self.phase else {
            return Err(InternalError::sort_misuse(
                "staged values are no longer available after perform_sort",
            ));
        };

        for run in &write.runs {
            let mut reader = run.open(self.ctx.codec)?;
            while let Some(value) = reader.next_value()? {
                f(&value)?;
            }
        }
        write.memtable.iter().try_for_each(f)
    }

    /// Finish staging and prepare ordered reads.
    pub fn perform_sort(&mut self) -> Result<(), InternalError> {
        let write = match &mut self.phase {
            SortPhase::Write(write) => std::mem::take(write),
            SortPhase::Read(_) => {
                return Err(InternalError::sort_misuse("perform_sort called twice"));
            }
            SortPhase::Failed => return Err(failed()),
        };
        self.phase = SortPhase::Failed;

        let cursor = self.ctx.finish_write(write, &mut self.stats)?;
        self.phase = SortPhase::Read(cursor);

        Ok(())
    }

    /// Discard up to `n` values from the front of the sorted stream.
    /// Returns how many were discarded.
    pub fn skip(&mut self, n: u64) -> Result<u64, InternalError> {
        match &mut self.phase {
            SortPhase::Read(cursor) => cursor.skip(n),
            SortPhase::Write(_) => Err(InternalError::sort_misuse(
                "sorted values skipped before perform_sort",
            )),
            SortPhase::Failed => Err(failed()),
        }
    }

    /// Next value in ascending order, or `None` once exhausted.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Option<Value>, InternalError> {
        match &mut self.phase {
            SortPhase::Read(cursor) => cursor.next_value(),
            SortPhase::Write(_) => Err(InternalError::sort_misuse(
                "sorted values read before perform_sort",
            )),
            SortPhase::Failed => Err(failed()),
        }
    }
}

impl std::fmt::Debug for ExternalSort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalSort")
            .field("staged", &self.staged)
            .field("sorted", &self.is_sorted())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

fn failed() -> InternalError {
    InternalError::sort_misuse("sort engine is unusable after a failed spill or sort")
}

///
/// SortContext
///

struct SortContext {
    compare: CompareFn,
    codec: RunCodec,
    work_mem_bytes: usize,
    merge_fan_in: usize,
    spill_root: Option<PathBuf>,
}

impl SortContext {
    fn finish_write(
        &self,
        mut write: WriteState,
        stats: &mut SortStats,
    ) -> Result<SortCursor, InternalError> {
        if write.runs.is_empty() {
            let mut values = write.memtable;
            values.sort_unstable_by(self.compare);
            tracing::debug!(rows = values.len(), "sort completed in memory");

            return Ok(SortCursor::Memory(values.into_iter()));
        }

        write.spill(self, stats)?;
        let WriteState { runs, scratch, .. } = write;
        let scratch = scratch.ok_or_else(|| {
            InternalError::new(
                ErrorClass::Internal,
                ErrorOrigin::Sort,
                "spilled runs without a scratch directory",
            )
        })?;

        let runs = self.reduce_runs(runs, &scratch, stats)?;
        let merger = RunMerger::open(&runs, self.codec, self.compare)?;
        tracing::debug!(
            runs = runs.len(),
            merge_passes = stats.merge_passes,
            "sort completed with final merge pending"
        );

        Ok(SortCursor::Merge(MergeCursor {
            merger,
            _runs: runs,
            _scratch: scratch,
        }))
    }

    // Merge the oldest `merge_fan_in` runs into one until a single k-way
    // merge can cover every remaining run.
    fn reduce_runs(
        &self,
        runs: Vec<SpillRun>,
        scratch: &ScratchDir,
        stats: &mut SortStats,
    ) -> Result<Vec<SpillRun>, InternalError> {
        let mut runs: VecDeque<SpillRun> = runs.into();

        while runs.len() > self.merge_fan_in {
            let batch: Vec<SpillRun> = runs.drain(..self.merge_fan_in).collect();
            let mut merger = RunMerger::open(&batch, self.codec, self.compare)?;
            let merged = SpillRun::write_from(scratch, self.codec, || merger.next_value())?;
            drop(merger);
            drop(batch);

            stats.merge_passes += 1;
            let input_runs = self.merge_fan_in as u64;
            record(MetricsEvent::MergePass { runs: input_runs });
            tracing::debug!(
                input_runs,
                rows = merged.rows(),
                remaining = runs.len() + 1,
                "merge pass completed"
            );

            runs.push_back(merged);
        }

        Ok(runs.into())
    }
}

///
/// SortPhase
///

enum SortPhase {
    Write(WriteState),
    Read(SortCursor),
    Failed,
}

///
/// WriteState
///

#[derive(Default)]
struct WriteState {
    memtable: Vec<Value>,
    memtable_bytes: usize,
    runs: Vec<SpillRun>,
    scratch: Option<ScratchDir>,
}

impl WriteState {
    // Sort the memtable and write it out as one run.
    fn spill(&mut self, ctx: &SortContext, stats: &mut SortStats) -> Result<(), InternalError> {
        if self.memtable.is_empty() {
            return Ok(());
        }

        let mut values = std::mem::take(&mut self.memtable);
        self.memtable_bytes = 0;
        values.sort_unstable_by(ctx.compare);

        let scratch = match self.scratch.take() {
            Some(scratch) => scratch,
            None => {
                let scratch = ScratchDir::create(ctx.spill_root.as_deref())?;
                tracing::debug!(path = %scratch.path().display(), "created sort scratch directory");
                scratch
            }
        };
        let run = SpillRun::write(&scratch, ctx.codec, &values);
        self.scratch = Some(scratch);
        let run = run?;

        stats.runs_spilled += 1;
        stats.bytes_spilled += run.bytes();
        record(MetricsEvent::RunSpilled {
            rows: run.rows(),
            bytes: run.bytes(),
        });
        tracing::debug!(
            rows = run.rows(),
            bytes = run.bytes(),
            runs = self.runs.len() + 1,
            "spilled sorted run"
        );
        self.runs.push(run);

        Ok(())
    }
}

///
/// SortCursor
///

enum SortCursor {
    Memory(std::vec::IntoIter<Value>),
    Merge(MergeCursor),
}

impl SortCursor {
    fn next_value(&mut self) -> Result<Option<Value>, InternalError> {
        match self {
            Self::Memory(values) => Ok(values.next()),
            Self::Merge(cursor) => cursor.merger.next_value(),
        }
    }

    fn skip(&mut self, n: u64) -> Result<u64, InternalError> {
        match self {
            Self::Memory(values) => {
                let skipped = n.min(values.len() as u64);
                if let Some(last) = usize::try_from(skipped).ok().and_then(|k| k.checked_sub(1)) {
                    values.nth(last);
                }

                Ok(skipped)
            }
            // Merged frames must be decoded to order the heap.
            Self::Merge(cursor) => {
                let mut skipped = 0;
                while skipped < n && cursor.merger.next_value()?.is_some() {
                    skipped += 1;
                }

                Ok(skipped)
            }
        }
    }
}

// Keeps run files and their directory alive while the merger reads them.
struct MergeCursor {
    merger: RunMerger,
    _runs: Vec<SpillRun>,
    _scratch: ScratchDir,
}
