use crate::{
    catalog::{RecvFn, SendFn},
    error::{ErrorOrigin, InternalError},
    value::Value,
};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};
use tempfile::{Builder, NamedTempFile, TempDir};

const SCRATCH_PREFIX: &str = "median-sort-";
const RUN_PREFIX: &str = "run-";
const FRAME_LEN_BYTES: usize = 4;

///
/// RunCodec
///
/// Frame payload codec for one element type: the type's own binary
/// send/recv operators.
///

#[derive(Clone, Copy)]
pub(crate) struct RunCodec {
    pub(crate) send: SendFn,
    pub(crate) recv: RecvFn,
}

///
/// ScratchDir
///
/// Per-engine temporary directory holding spilled runs.
/// Dropping it removes the directory and every run inside it.
///

#[derive(Debug)]
pub(crate) struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    pub(crate) fn create(root: Option<&Path>) -> Result<Self, InternalError> {
        let mut builder = Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let dir = match root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|err| InternalError::spill_io("creating scratch directory", &err))?;

        Ok(Self { dir })
    }

    pub(crate) fn path(&self) -> &Path {
        self.dir.path()
    }

    fn create_run_file(&self) -> Result<NamedTempFile, InternalError> {
        Builder::new()
            .prefix(RUN_PREFIX)
            .tempfile_in(self.path())
            .map_err(|err| InternalError::spill_io("creating run file", &err))
    }
}

///
/// SpillRun
///
/// One sorted run on temporary storage.
/// Frames are a big-endian u32 payload length followed by the payload.
///

#[derive(Debug)]
pub(crate) struct SpillRun {
    file: NamedTempFile,
    rows: u64,
    bytes: u64,
}

impl SpillRun {
    /// Write already-sorted values as one run.
    pub(crate) fn write<'a>(
        scratch: &ScratchDir,
        codec: RunCodec,
        values: impl IntoIterator<Item = &'a Value>,
    ) -> Result<Self, InternalError> {
        let mut file = scratch.create_run_file()?;
        let (rows, bytes) = {
            let mut writer = RunWriter::new(file.as_file_mut(), codec.send);
            for value in values {
                writer.push(value)?;
            }
            writer.finish()?
        };

        Ok(Self { file, rows, bytes })
    }

    /// Write the output of a fallible ordered source as one run.
    pub(crate) fn write_from(
        scratch: &ScratchDir,
        codec: RunCodec,
        mut next: impl FnMut() -> Result<Option<Value>, InternalError>,
    ) -> Result<Self, InternalError> {
        let mut file = scratch.create_run_file()?;
        let (rows, bytes) = {
            let mut writer = RunWriter::new(file.as_file_mut(), codec.send);
            while let Some(value) = next()? {
                writer.push(&value)?;
            }
            writer.finish()?
        };

        Ok(Self { file, rows, bytes })
    }

    /// Open an independent reader positioned at the first frame.
    pub(crate) fn open(&self, codec: RunCodec) -> Result<RunReader, InternalError> {
        let file = self
            .file
            .reopen()
            .map_err(|err| InternalError::spill_io("reopening run file", &err))?;

        Ok(RunReader {
            input: BufReader::new(file),
            remaining: self.rows,
            recv: codec.recv,
            frame: Vec::new(),
        })
    }

    pub(crate) const fn rows(&self) -> u64 {
        self.rows
    }

    pub(crate) const fn bytes(&self) -> u64 {
        self.bytes
    }
}

///
/// RunWriter
///

struct RunWriter<W: Write> {
    out: BufWriter<W>,
    send: SendFn,
    frame: Vec<u8>,
    rows: u64,
    bytes: u64,
}

impl<W: Write> RunWriter<W> {
    fn new(out: W, send: SendFn) -> Self {
        Self {
            out: BufWriter::new(out),
            send,
            frame: Vec::new(),
            rows: 0,
            bytes: 0,
        }
    }

    fn push(&mut self, value: &Value) -> Result<(), InternalError> {
        self.frame.clear();
        (self.send)(value, &mut self.frame)?;

        let len = u32::try_from(self.frame.len()).map_err(|_| {
            InternalError::resource_exhausted(
                ErrorOrigin::Spill,
                format!(
                    "value of {} bytes exceeds the spill frame limit",
                    self.frame.len()
                ),
            )
        })?;
        self.out
            .write_all(&len.to_be_bytes())
            .and_then(|()| self.out.write_all(&self.frame))
            .map_err(|err| InternalError::spill_io("writing run frame", &err))?;

        self.rows += 1;
        self.bytes += (FRAME_LEN_BYTES + self.frame.len()) as u64;

        Ok(())
    }

    fn finish(mut self) -> Result<(u64, u64), InternalError> {
        self.out
            .flush()
            .map_err(|err| InternalError::spill_io("flushing run file", &err))?;

        Ok((self.rows, self.bytes))
    }
}

///
/// RunReader
///
/// Forward-only frame reader over one run.
///

pub(crate) struct RunReader {
    input: BufReader<File>,
    remaining: u64,
    recv: RecvFn,
    frame: Vec<u8>,
}

impl RunReader {
    pub(crate) fn next_value(&mut self) -> Result<Option<Value>, InternalError> {
        if self.remaining == 0 {
            return Ok(None);
        }

        let mut len = [0u8; FRAME_LEN_BYTES];
        self.input
            .read_exact(&mut len)
            .map_err(|err| InternalError::spill_io("reading run frame length", &err))?;
        let len = u32::from_be_bytes(len) as usize;

        self.frame.resize(len, 0);
        self.input
            .read_exact(&mut self.frame)
            .map_err(|err| InternalError::spill_io("reading run frame", &err))?;
        let value = (self.recv)(&self.frame)?;
        self.remaining -= 1;

        Ok(Some(value))
    }
}
