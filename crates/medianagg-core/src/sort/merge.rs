use crate::{
    catalog::CompareFn,
    error::InternalError,
    sort::run::{RunCodec, RunReader, SpillRun},
    value::Value,
};
use std::{cmp::Ordering, collections::BinaryHeap};

///
/// HeapEntry
///
/// Head value of one run. Ordered in reverse so `BinaryHeap` pops the
/// smallest value first; equal values pop in run order.
///

struct HeapEntry {
    value: Value,
    source: usize,
    compare: CompareFn,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.compare)(&other.value, &self.value).then_with(|| other.source.cmp(&self.source))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

///
/// RunMerger
///
/// K-way merge over sorted runs. Holds one reader and at most one
/// buffered value per run.
///

pub(crate) struct RunMerger {
    heap: BinaryHeap<HeapEntry>,
    readers: Vec<RunReader>,
    compare: CompareFn,
}

impl RunMerger {
    pub(crate) fn open(
        runs: &[SpillRun],
        codec: RunCodec,
        compare: CompareFn,
    ) -> Result<Self, InternalError> {
        let mut heap = BinaryHeap::with_capacity(runs.len());
        let mut readers = Vec::with_capacity(runs.len());

        for (source, run) in runs.iter().enumerate() {
            let mut reader = run.open(codec)?;
            if let Some(value) = reader.next_value()? {
                heap.push(HeapEntry {
                    value,
                    source,
                    compare,
                });
            }
            readers.push(reader);
        }

        Ok(Self {
            heap,
            readers,
            compare,
        })
    }

    /// Pop the next value in ascending order.
    pub(crate) fn next_value(&mut self) -> Result<Option<Value>, InternalError> {
        let Some(HeapEntry { value, source, .. }) = self.heap.pop() else {
            return Ok(None);
        };

        if let Some(next) = self.readers[source].next_value()? {
            self.heap.push(HeapEntry {
                value: next,
                source,
                compare: self.compare,
            });
        }

        Ok(Some(value))
    }
}
