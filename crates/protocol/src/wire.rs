//! Byte-exact little-endian codec for the scan exchange.
//!
//! The codec is a pure structural (de)serializer: it never interprets filter
//! semantics, and malformed or truncated input fails with
//! [`VarveError::Decode`] carrying the byte offset. Callers treat decode
//! failures like transport faults.
//!
//! Scan request record layout (all integers little-endian):
//! `min_ts:u64, max_ts:u64, projection_count:u64, ordinal:u32 x n,
//! filter_count:u64, {column:u32, op:u32, value:u64} x n`.
//! The outer envelope wraps the record as
//! `kind:u32, payload_len:u64, payload`.

use varve_common::{Result, VarveError};

use crate::block::{BlockType, ColumnSlice, ScanResultSlice};
use crate::filter::{ScanAndFilters, ScanComparison, ScanFilter, ScanOrFilters, ScanRequest};
use crate::u64val::U64;

/// Message-type tag of the request envelope.
///
/// `Insert` and `RefreshCatalog` are part of the engine's wire contract but
/// are never sent by this client; they are kept so the numbering stays
/// aligned with the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MessageKind {
    Insert = 0,
    Scan = 1,
    RefreshCatalog = 2,
}

const _: () = {
    assert!(MessageKind::Insert as u32 == 0);
    assert!(MessageKind::Scan as u32 == 1);
    assert!(MessageKind::RefreshCatalog as u32 == 2);
};

impl MessageKind {
    pub fn to_wire(self) -> u32 {
        self as u32
    }

    pub fn try_from_wire(raw: u32) -> Result<Self> {
        Ok(match raw {
            0 => MessageKind::Insert,
            1 => MessageKind::Scan,
            2 => MessageKind::RefreshCatalog,
            other => {
                return Err(VarveError::Decode(format!(
                    "unknown message kind tag {other}"
                )))
            }
        })
    }
}

/// Encodes one scan request record (without the envelope).
///
/// # Errors
/// [`VarveError::Unsupported`] for trees with more than one AND-group:
/// protocol v0 has no OR framing, and silently AND-ing the groups together
/// would change the predicate.
pub fn encode_scan_request(req: &ScanRequest) -> Result<Vec<u8>> {
    let group = match req.filters.0.as_slice() {
        [] => None,
        [group] => Some(group),
        groups => {
            return Err(VarveError::Unsupported(format!(
                "cannot encode an OR tree with {} AND-groups in protocol v0",
                groups.len()
            )))
        }
    };

    let filter_count = group.map_or(0, ScanAndFilters::len);
    let mut out =
        Vec::with_capacity(8 + 8 + 8 + req.projection.len() * 4 + 8 + filter_count * 16);
    out.extend_from_slice(&req.min_ts.to_le_bytes());
    out.extend_from_slice(&req.max_ts.to_le_bytes());

    out.extend_from_slice(&(req.projection.len() as u64).to_le_bytes());
    for ordinal in &req.projection {
        out.extend_from_slice(&ordinal.to_le_bytes());
    }

    out.extend_from_slice(&(filter_count as u64).to_le_bytes());
    if let Some(group) = group {
        for filter in group.iter() {
            out.extend_from_slice(&filter.column.to_le_bytes());
            out.extend_from_slice(&filter.op.to_wire().to_le_bytes());
            out.extend_from_slice(&filter.value.magnitude().to_le_bytes());
        }
    }

    Ok(out)
}

/// Encodes a full scan message: envelope kind plus the length-prefixed record.
pub fn encode_scan_message(req: &ScanRequest) -> Result<Vec<u8>> {
    let record = encode_scan_request(req)?;
    let mut out = Vec::with_capacity(4 + 8 + record.len());
    out.extend_from_slice(&MessageKind::Scan.to_wire().to_le_bytes());
    out.extend_from_slice(&(record.len() as u64).to_le_bytes());
    out.extend_from_slice(&record);
    Ok(out)
}

/// Splits an envelope into its kind and payload record.
pub fn decode_message(buf: &[u8]) -> Result<(MessageKind, &[u8])> {
    let mut reader = WireReader::new(buf);
    let kind = MessageKind::try_from_wire(reader.read_u32()?)?;
    let len = reader.read_len("envelope payload length")?;
    let payload = reader.take(len)?;
    reader.finish()?;
    Ok((kind, payload))
}

/// Decodes a scan request record.
///
/// Production traffic only ever decodes replies; the request decoder exists
/// so the wire contract can be verified end to end (encode-decode identity).
pub fn decode_scan_request(buf: &[u8]) -> Result<ScanRequest> {
    let mut reader = WireReader::new(buf);

    let min_ts = reader.read_u64()?;
    let max_ts = reader.read_u64()?;

    let projection_count = reader.read_len("projection count")?;
    reader.check_capacity(projection_count, 4, "projection ordinals")?;
    let mut projection = Vec::with_capacity(projection_count);
    for _ in 0..projection_count {
        projection.push(reader.read_u32()?);
    }

    let filter_count = reader.read_len("filter count")?;
    reader.check_capacity(filter_count, 16, "filters")?;
    let mut filters = Vec::with_capacity(filter_count);
    for _ in 0..filter_count {
        let column = reader.read_u32()?;
        let op = ScanComparison::try_from_wire(reader.read_u32()?)?;
        let value = U64::from(reader.read_u64()?);
        filters.push(ScanFilter {
            column,
            op,
            value,
            str_value: None,
        });
    }
    reader.finish()?;

    let filters = if filters.is_empty() {
        ScanOrFilters::default()
    } else {
        ScanOrFilters(vec![ScanAndFilters(filters)])
    };

    Ok(ScanRequest {
        min_ts,
        max_ts,
        projection,
        filters,
    })
}

/// Decodes one scan reply into per-column slices.
///
/// Reply layout: `column_count:u64`, then per column
/// `ordinal:u32, block_type:u32, entry_count:u64, payload`, where the payload
/// is width-sized values for dense blocks, `(row:u32, value)` pairs for
/// sparse blocks, and `(row:u32, byte_start:u64)` pairs plus a
/// length-prefixed byte arena for string blocks.
pub fn decode_scan_reply(buf: &[u8]) -> Result<ScanResultSlice> {
    let mut reader = WireReader::new(buf);
    let mut slice = ScanResultSlice::default();

    let column_count = reader.read_len("column count")?;
    for _ in 0..column_count {
        let ordinal = reader.read_u32()?;
        let ty = BlockType::try_from_wire(reader.read_u32()?)?;
        let column = decode_column_block(&mut reader, ty)?;
        if slice.columns.insert(ordinal, column).is_some() {
            return Err(VarveError::Decode(format!(
                "duplicate column ordinal {ordinal} in reply"
            )));
        }
    }
    reader.finish()?;

    Ok(slice)
}

fn decode_column_block(reader: &mut WireReader<'_>, ty: BlockType) -> Result<ColumnSlice> {
    let entry_count = reader.read_len("block entry count")?;

    if ty == BlockType::String {
        reader.check_capacity(entry_count, 12, "string block entries")?;
        let mut indexes = Vec::with_capacity(entry_count);
        let mut starts = Vec::with_capacity(entry_count);
        for _ in 0..entry_count {
            let row = reader.read_u32()?;
            if indexes.last().is_some_and(|last| *last >= row) {
                return Err(reader.error("string block row indexes are not ascending"));
            }
            indexes.push(row);
            starts.push(reader.read_u64()?);
        }
        let arena_len = reader.read_len("string arena length")?;
        let bytes = reader.take(arena_len)?.to_vec();
        if let Some(start) = starts.iter().find(|s| **s as usize > bytes.len()) {
            return Err(VarveError::Decode(format!(
                "string block start {start} exceeds arena of {} bytes",
                bytes.len()
            )));
        }
        return Ok(ColumnSlice::Text {
            indexes,
            starts,
            bytes,
        });
    }

    let width = ty
        .int_width()
        .ok_or_else(|| reader.error("block type carries no integer width"))?;

    if ty.is_sparse() {
        reader.check_capacity(entry_count, 4 + width, "sparse block entries")?;
        let mut entries: Vec<(u32, i64)> = Vec::with_capacity(entry_count);
        for _ in 0..entry_count {
            let row = reader.read_u32()?;
            if entries.last().is_some_and(|(last, _)| *last >= row) {
                return Err(reader.error("sparse block row indexes are not ascending"));
            }
            entries.push((row, read_slot_value(reader, ty)?));
        }
        Ok(ColumnSlice::Sparse { ty, entries })
    } else {
        reader.check_capacity(entry_count, width, "dense block values")?;
        let mut values = Vec::with_capacity(entry_count);
        for _ in 0..entry_count {
            values.push(read_slot_value(reader, ty)?);
        }
        Ok(ColumnSlice::Dense { ty, values })
    }
}

/// Reads one integer element and widens it into the 64-bit transport slot:
/// signed sources sign-extend, unsigned sources zero-extend.
fn read_slot_value(reader: &mut WireReader<'_>, ty: BlockType) -> Result<i64> {
    Ok(match ty {
        BlockType::I8Dense | BlockType::I8Sparse => i64::from(reader.read_i8()?),
        BlockType::I16Dense | BlockType::I16Sparse => i64::from(reader.read_i16()?),
        BlockType::I32Dense | BlockType::I32Sparse => i64::from(reader.read_i32()?),
        BlockType::I64Dense | BlockType::I64Sparse => reader.read_i64()?,
        BlockType::U8Dense | BlockType::U8Sparse => i64::from(reader.read_u8()?),
        BlockType::U16Dense | BlockType::U16Sparse => i64::from(reader.read_u16()?),
        BlockType::U32Dense | BlockType::U32Sparse => i64::from(reader.read_u32()?),
        BlockType::U64Dense | BlockType::U64Sparse => reader.read_u64()? as i64,
        BlockType::String => return Err(reader.error("string block read as integer")),
    })
}

/// Offset-tracking little-endian reader over a byte slice.
struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn error(&self, msg: &str) -> VarveError {
        VarveError::Decode(format!("{msg} at byte {}", self.pos))
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).filter(|end| *end <= self.buf.len());
        match end {
            Some(end) => {
                let out = &self.buf[self.pos..end];
                self.pos = end;
                Ok(out)
            }
            None => Err(VarveError::Decode(format!(
                "unexpected end of input at byte {}: need {len} more of {} total",
                self.pos,
                self.buf.len()
            ))),
        }
    }

    fn finish(&self) -> Result<()> {
        if self.pos != self.buf.len() {
            return Err(VarveError::Decode(format!(
                "{} trailing bytes after record at byte {}",
                self.buf.len() - self.pos,
                self.pos
            )));
        }
        Ok(())
    }

    /// Reads a u64 count and narrows it to usize.
    fn read_len(&mut self, what: &str) -> Result<usize> {
        let raw = self.read_u64()?;
        usize::try_from(raw).map_err(|_| self.error(&format!("{what} {raw} does not fit usize")))
    }

    /// Rejects counts whose minimal encoding cannot fit in the remaining
    /// buffer, so a corrupt count fails before allocation.
    fn check_capacity(&self, count: usize, elem_size: usize, what: &str) -> Result<()> {
        let remaining = self.buf.len() - self.pos;
        match count.checked_mul(elem_size) {
            Some(need) if need <= remaining => Ok(()),
            _ => Err(VarveError::Decode(format!(
                "{what} count {count} exceeds {remaining} remaining bytes at byte {}",
                self.pos
            ))),
        }
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_u16()? as i16)
    }

    fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    fn read_u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(u64::from_le_bytes(raw))
    }

    fn read_i64(&mut self) -> Result<i64> {
        Ok(self.read_u64()? as i64)
    }
}
