//! # Record Codec
//!
//! Packs and unpacks the `SporeData` molecule table:
//!
//! ```text
//! table SporeData {
//!     content_type: Bytes,
//!     content:      Bytes,
//!     cluster_id:   BytesOpt,
//! }
//! ```
//!
//! A table is `total_size: u32` followed by one `u32` offset per field, all
//! little-endian. `Bytes` is a `u32` length followed by the bytes.
//! `BytesOpt` is empty for `None`.

use crate::domain::{CellRef, HexBytes, RecordError, Spore, SporeData};

const HEADER_UNIT: usize = 4;

/// Fields a table must carry to be read as `SporeData`.
const REQUIRED_FIELDS: usize = 2;

/// Fields written by [`encode`].
const ENCODED_FIELDS: usize = 3;

/// Decode a cell's raw data into a [`Spore`].
///
/// The record id is the type-script args of `cell`, never the payload.
/// Content bytes are kept only if `include_content` is set.
pub fn decode(raw: &[u8], cell: CellRef, include_content: bool) -> Result<Spore, RecordError> {
    let id = cell
        .output
        .type_
        .as_ref()
        .map(|script| script.args.clone())
        .ok_or_else(|| RecordError::malformed("cell has no type script"))?;

    let data = unpack(raw)?;

    Ok(Spore {
        id,
        cluster_id: data.cluster_id.map(HexBytes),
        content_type: data.content_type,
        content: include_content.then(|| HexBytes(data.content)),
        data_len: raw.len(),
        cell,
    })
}

/// Unpack a `SporeData` table.
pub fn unpack(raw: &[u8]) -> Result<SporeData, RecordError> {
    let fields = table_fields(raw)?;

    let content_type = read_bytes(fields[0])?;
    let content = read_bytes(fields[1])?;
    let cluster_id = match fields.get(2) {
        Some(field) if !field.is_empty() => Some(read_bytes(field)?.to_vec()),
        _ => None,
    };

    let content_type = String::from_utf8(content_type.to_vec())
        .map_err(|_| RecordError::malformed("content type is not UTF-8"))?;

    Ok(SporeData {
        content_type,
        content: content.to_vec(),
        cluster_id,
    })
}

/// Pack a `SporeData` table.
pub fn encode(data: &SporeData) -> Vec<u8> {
    let content_type = pack_bytes(data.content_type.as_bytes());
    let content = pack_bytes(&data.content);
    let cluster_id = data
        .cluster_id
        .as_deref()
        .map(pack_bytes)
        .unwrap_or_default();

    let header_size = HEADER_UNIT * (ENCODED_FIELDS + 1);
    let total = header_size + content_type.len() + content.len() + cluster_id.len();

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&(total as u32).to_le_bytes());

    let mut offset = header_size;
    for field in [&content_type, &content, &cluster_id] {
        out.extend_from_slice(&(offset as u32).to_le_bytes());
        offset += field.len();
    }

    out.extend_from_slice(&content_type);
    out.extend_from_slice(&content);
    out.extend_from_slice(&cluster_id);
    out
}

fn read_u32(raw: &[u8], at: usize) -> Result<usize, RecordError> {
    raw.get(at..at + HEADER_UNIT)
        .and_then(|slice| <[u8; 4]>::try_from(slice).ok())
        .map(|bytes| u32::from_le_bytes(bytes) as usize)
        .ok_or_else(|| RecordError::malformed(format!("truncated at byte {at}")))
}

/// Split a table into its field slices, validating the header.
fn table_fields(raw: &[u8]) -> Result<Vec<&[u8]>, RecordError> {
    let total = read_u32(raw, 0)?;
    if total != raw.len() {
        return Err(RecordError::malformed(format!(
            "total size {} does not match data length {}",
            total,
            raw.len()
        )));
    }

    let first_offset = read_u32(raw, HEADER_UNIT)?;
    if first_offset % HEADER_UNIT != 0 || first_offset < HEADER_UNIT * (REQUIRED_FIELDS + 1) {
        return Err(RecordError::malformed(format!(
            "invalid first offset {first_offset}"
        )));
    }
    if first_offset > total {
        return Err(RecordError::malformed("header exceeds data length"));
    }

    let field_count = first_offset / HEADER_UNIT - 1;
    let mut offsets = Vec::with_capacity(field_count + 1);
    for i in 0..field_count {
        offsets.push(read_u32(raw, HEADER_UNIT * (i + 1))?);
    }
    offsets.push(total);

    if offsets.windows(2).any(|pair| pair[0] > pair[1]) {
        return Err(RecordError::malformed("field offsets out of order"));
    }

    Ok(offsets
        .windows(2)
        .map(|pair| &raw[pair[0]..pair[1]])
        .collect())
}

/// Read a `Bytes` fixvec whose length header must match the field span.
fn read_bytes(field: &[u8]) -> Result<&[u8], RecordError> {
    let len = read_u32(field, 0)?;
    let body = &field[HEADER_UNIT..];
    if body.len() != len {
        return Err(RecordError::malformed(format!(
            "bytes field declares {} bytes, holds {}",
            len,
            body.len()
        )));
    }
    Ok(body)
}

fn pack_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_UNIT + bytes.len());
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(bytes);
    out
}
