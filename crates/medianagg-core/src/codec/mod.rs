//! Module: codec
//! Responsibility: byte encoding of median states for transport between contexts.
//! Does not own: per-type value encodings (catalog send/recv) or merge policy.
//! Boundary: every transported state passes through `serialize` / `deserialize`.
//!
//! Layout, all integers big-endian:
//!
//! ```text
//! type id      u32
//! by-value     u8   (0 or 1)
//! width        i16  (-1 = variable)
//! compare op   u32
//! send op      u32
//! recv op      u32
//! row count    u32
//! row count x { length u32, payload [u8; length] }
//! ```


use crate::{
    catalog::{OpId, TypeCatalog, TypeId, TypeLayout},
    config::MedianConfig,
    error::{ErrorOrigin, InternalError},
    state::{ElementType, MedianState},
};

///
/// CONSTANTS
///

/// Encoded header size in bytes.
pub const HEADER_LEN: usize = 4 + 1 + 2 + 4 + 4 + 4 + 4;

const VALUE_LEN_BYTES: usize = 4;

///
/// StateHeader
///
/// Fixed-size prefix describing the element type and row count.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StateHeader {
    pub type_id: TypeId,
    pub layout: TypeLayout,
    pub compare: OpId,
    pub send: OpId,
    pub recv: OpId,
    pub row_count: u32,
}

impl StateHeader {
    /// Describe one state.
    pub fn for_state(state: &MedianState) -> Result<Self, InternalError> {
        let element = state.element();
        let row_count = u32::try_from(state.row_count()).map_err(|_| {
            InternalError::resource_exhausted(
                ErrorOrigin::Codec,
                format!(
                    "median state with {} rows exceeds the serializable row limit of {}",
                    state.row_count(),
                    u32::MAX
                ),
            )
        })?;

        Ok(Self {
            type_id: element.type_id(),
            layout: element.layout(),
            compare: element.compare().id,
            send: element.send().id,
            recv: element.recv().id,
            row_count,
        })
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.type_id.get().to_be_bytes());
        out.push(u8::from(self.layout.by_value));
        out.extend_from_slice(&self.layout.width.to_be_bytes());
        out.extend_from_slice(&self.compare.get().to_be_bytes());
        out.extend_from_slice(&self.send.get().to_be_bytes());
        out.extend_from_slice(&self.recv.get().to_be_bytes());
        out.extend_from_slice(&self.row_count.to_be_bytes());
    }

    fn decode(reader: &mut WireReader<'_>) -> Result<Self, InternalError> {
        let type_id = TypeId(reader.u32("type id")?);
        let by_value = match reader.u8("by-value flag")? {
            0 => false,
            1 => true,
            other => {
                return Err(InternalError::codec_corruption(format!(
                    "invalid by-value flag {other:#04x}"
                )));
            }
        };
        let width = reader.i16("type width")?;

        Ok(Self {
            type_id,
            layout: TypeLayout { by_value, width },
            compare: OpId(reader.u32("compare operator")?),
            send: OpId(reader.u32("send operator")?),
            recv: OpId(reader.u32("recv operator")?),
            row_count: reader.u32("row count")?,
        })
    }

    /// Check the header against the local catalog and bind its element type.
    fn bind(&self, catalog: &TypeCatalog) -> Result<ElementType, InternalError> {
        let ops = catalog.lookup(self.type_id).ok_or_else(|| {
            InternalError::codec_corruption(format!(
                "serialized median state names unknown type {}",
                self.type_id
            ))
        })?;

        let layout = ops.layout();
        if layout != self.layout {
            return Err(mismatch(ops.name(), "layout", &self.layout, &layout));
        }
        let compare = ops.compare().map(|op| op.id);
        if compare != Some(self.compare) {
            return Err(mismatch(ops.name(), "compare operator", &self.compare, &compare));
        }
        let send = ops.send().id;
        if send != self.send {
            return Err(mismatch(ops.name(), "send operator", &self.send, &send));
        }
        let recv = ops.recv().id;
        if recv != self.recv {
            return Err(mismatch(ops.name(), "recv operator", &self.recv, &recv));
        }

        ElementType::from_ops(ops.clone())
    }
}

fn mismatch(
    type_name: &str,
    field: &str,
    found: &dyn std::fmt::Debug,
    expected: &dyn std::fmt::Debug,
) -> InternalError {
    InternalError::codec_corruption(format!(
        "serialized {type_name} state has {field} {found:?}, local catalog has {expected:?}"
    ))
}

/// Encode a state. Values are emitted in storage order.
pub fn serialize(state: &MedianState) -> Result<Vec<u8>, InternalError> {
    let header = StateHeader::for_state(state)?;
    let send = state.element().send().func;

    let mut out = Vec::new();
    out.try_reserve(HEADER_LEN)
        .map_err(|err| InternalError::allocation(ErrorOrigin::Codec, err))?;
    header.encode(&mut out);

    state.for_each_value(|value| {
        let start = out.len();
        out.extend_from_slice(&[0; VALUE_LEN_BYTES]);
        send(value, &mut out)?;

        let payload = out.len() - start - VALUE_LEN_BYTES;
        let len = u32::try_from(payload).map_err(|_| {
            InternalError::resource_exhausted(
                ErrorOrigin::Codec,
                format!("value of {payload} bytes exceeds the serializable value limit"),
            )
        })?;
        out[start..start + VALUE_LEN_BYTES].copy_from_slice(&len.to_be_bytes());

        Ok(())
    })?;

    Ok(out)
}

/// Decode a state produced by `serialize`.
///
/// The result is always buffer-backed, whatever strategy produced it.
pub fn deserialize(catalog: &TypeCatalog, bytes: &[u8]) -> Result<MedianState, InternalError> {
    let mut reader = WireReader::new(bytes);
    let header = StateHeader::decode(&mut reader)?;
    let element = header.bind(catalog)?;
    let recv = element.recv().func;

    // Every value costs at least its length prefix; never pre-size past that.
    let rows = header.row_count as usize;
    let capacity = rows.min(reader.remaining() / VALUE_LEN_BYTES);
    let mut state = MedianState::with_expected_rows(element, &MedianConfig::in_memory(), capacity)?;

    for index in 0..rows {
        let len = reader.u32("value length")? as usize;
        let payload = reader.take(len, "value payload")?;
        let value = recv(payload).map_err(|err| {
            InternalError::codec_corruption(format!("value {index}: {}", err.message))
        })?;
        state.ingest_owned(value).map_err(|err| {
            InternalError::codec_corruption(format!("value {index}: {}", err.message))
        })?;
    }
    reader.finish()?;

    Ok(state)
}

///
/// WireReader
///
/// Bounds-checked cursor over an encoded state.
///

struct WireReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    const fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8], InternalError> {
        if len > self.remaining() {
            return Err(InternalError::codec_corruption(format!(
                "truncated median state: {what} needs {len} bytes at offset {}, {} remain",
                self.pos,
                self.remaining()
            )));
        }
        let out = &self.bytes[self.pos..self.pos + len];
        self.pos += len;

        Ok(out)
    }

    fn array<const N: usize>(&mut self, what: &str) -> Result<[u8; N], InternalError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, what)?);

        Ok(out)
    }

    fn u8(&mut self, what: &str) -> Result<u8, InternalError> {
        Ok(self.array::<1>(what)?[0])
    }

    fn i16(&mut self, what: &str) -> Result<i16, InternalError> {
        self.array(what).map(i16::from_be_bytes)
    }

    fn u32(&mut self, what: &str) -> Result<u32, InternalError> {
        self.array(what).map(u32::from_be_bytes)
    }

    fn finish(&self) -> Result<(), InternalError> {
        match self.remaining() {
            0 => Ok(()),
            trailing => Err(InternalError::codec_corruption(format!(
                "{trailing} trailing bytes after median state"
            ))),
        }
    }
}
