//! Decoded column data: dense, sparse, and string block slices.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use varve_common::{Result, VarveError};

/// Storage block-type tag as the engine serializes it.
///
/// Discriminants are the wire encoding; see the pinning assertions below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum BlockType {
    I8Dense = 0,
    I16Dense = 1,
    I32Dense = 2,
    I64Dense = 3,
    U8Dense = 4,
    U16Dense = 5,
    U32Dense = 6,
    U64Dense = 7,
    I8Sparse = 8,
    I16Sparse = 9,
    I32Sparse = 10,
    I64Sparse = 11,
    U8Sparse = 12,
    U16Sparse = 13,
    U32Sparse = 14,
    U64Sparse = 15,
    String = 16,
}

const _: () = {
    assert!(BlockType::I8Dense as u32 == 0);
    assert!(BlockType::I64Dense as u32 == 3);
    assert!(BlockType::U8Dense as u32 == 4);
    assert!(BlockType::U64Dense as u32 == 7);
    assert!(BlockType::I8Sparse as u32 == 8);
    assert!(BlockType::I64Sparse as u32 == 11);
    assert!(BlockType::U8Sparse as u32 == 12);
    assert!(BlockType::U64Sparse as u32 == 15);
    assert!(BlockType::String as u32 == 16);
};

impl BlockType {
    pub fn to_wire(self) -> u32 {
        self as u32
    }

    pub fn try_from_wire(raw: u32) -> Result<Self> {
        Ok(match raw {
            0 => BlockType::I8Dense,
            1 => BlockType::I16Dense,
            2 => BlockType::I32Dense,
            3 => BlockType::I64Dense,
            4 => BlockType::U8Dense,
            5 => BlockType::U16Dense,
            6 => BlockType::U32Dense,
            7 => BlockType::U64Dense,
            8 => BlockType::I8Sparse,
            9 => BlockType::I16Sparse,
            10 => BlockType::I32Sparse,
            11 => BlockType::I64Sparse,
            12 => BlockType::U8Sparse,
            13 => BlockType::U16Sparse,
            14 => BlockType::U32Sparse,
            15 => BlockType::U64Sparse,
            16 => BlockType::String,
            other => return Err(VarveError::Decode(format!("unknown block type tag {other}"))),
        })
    }

    pub fn is_sparse(self) -> bool {
        matches!(
            self,
            BlockType::I8Sparse
                | BlockType::I16Sparse
                | BlockType::I32Sparse
                | BlockType::I64Sparse
                | BlockType::U8Sparse
                | BlockType::U16Sparse
                | BlockType::U32Sparse
                | BlockType::U64Sparse
        )
    }

    pub fn is_dense_int(self) -> bool {
        matches!(
            self,
            BlockType::I8Dense
                | BlockType::I16Dense
                | BlockType::I32Dense
                | BlockType::I64Dense
                | BlockType::U8Dense
                | BlockType::U16Dense
                | BlockType::U32Dense
                | BlockType::U64Dense
        )
    }

    /// Byte width of one integer element; `None` for string blocks.
    pub fn int_width(self) -> Option<usize> {
        Some(match self {
            BlockType::I8Dense | BlockType::I8Sparse | BlockType::U8Dense | BlockType::U8Sparse => {
                1
            }
            BlockType::I16Dense
            | BlockType::I16Sparse
            | BlockType::U16Dense
            | BlockType::U16Sparse => 2,
            BlockType::I32Dense
            | BlockType::I32Sparse
            | BlockType::U32Dense
            | BlockType::U32Sparse => 4,
            BlockType::I64Dense
            | BlockType::I64Sparse
            | BlockType::U64Dense
            | BlockType::U64Sparse => 8,
            BlockType::String => return None,
        })
    }
}

/// One column's returned data.
///
/// Narrow integer values are widened into the 64-bit transport slot at decode
/// time: unsigned source types zero-extend, signed ones sign-extend.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnSlice {
    /// Contiguous per-row values with no gaps; never null by construction.
    Dense { ty: BlockType, values: Vec<i64> },
    /// Index-ascending `(row, value)` pairs; rows not listed are null.
    Sparse { ty: BlockType, entries: Vec<(u32, i64)> },
    /// Index-ascending offset table into a shared UTF-8 byte arena.
    Text {
        indexes: Vec<u32>,
        starts: Vec<u64>,
        bytes: Vec<u8>,
    },
}

impl ColumnSlice {
    pub fn block_type(&self) -> BlockType {
        match self {
            ColumnSlice::Dense { ty, .. } | ColumnSlice::Sparse { ty, .. } => *ty,
            ColumnSlice::Text { .. } => BlockType::String,
        }
    }

    pub fn is_dense(&self) -> bool {
        matches!(self, ColumnSlice::Dense { .. })
    }

    /// Logical element count: dense length, or highest sparse index + 1.
    pub fn element_count(&self) -> usize {
        match self {
            ColumnSlice::Dense { values, .. } => values.len(),
            ColumnSlice::Sparse { entries, .. } => {
                entries.last().map_or(0, |(idx, _)| *idx as usize + 1)
            }
            ColumnSlice::Text { indexes, .. } => indexes.last().map_or(0, |idx| *idx as usize + 1),
        }
    }

    /// Integer slot value at `row`; `None` for holes and for string slices.
    pub fn value_at(&self, row: usize) -> Option<i64> {
        match self {
            ColumnSlice::Dense { values, .. } => values.get(row).copied(),
            ColumnSlice::Sparse { entries, .. } => {
                let row = u32::try_from(row).ok()?;
                entries
                    .binary_search_by_key(&row, |(idx, _)| *idx)
                    .ok()
                    .map(|pos| entries[pos].1)
            }
            ColumnSlice::Text { .. } => None,
        }
    }

    /// String value at `row`; `None` for holes and non-string slices.
    ///
    /// # Errors
    /// [`VarveError::Decode`] when the arena slice is not valid UTF-8.
    pub fn text_at(&self, row: usize) -> Result<Option<&str>> {
        let ColumnSlice::Text {
            indexes,
            starts,
            bytes,
        } = self
        else {
            return Ok(None);
        };
        let Ok(row) = u32::try_from(row) else {
            return Ok(None);
        };
        let Ok(pos) = indexes.binary_search(&row) else {
            return Ok(None);
        };
        let start = starts[pos] as usize;
        let end = starts.get(pos + 1).map_or(bytes.len(), |s| *s as usize);
        let raw = bytes.get(start..end).ok_or_else(|| {
            VarveError::Decode(format!(
                "string block offsets {start}..{end} exceed arena of {} bytes",
                bytes.len()
            ))
        })?;
        std::str::from_utf8(raw)
            .map(Some)
            .map_err(|e| VarveError::Decode(format!("string block is not valid utf-8: {e}")))
    }

    /// Whether `row` holds no value. Dense slices have no holes.
    pub fn is_null(&self, row: usize) -> bool {
        match self {
            ColumnSlice::Dense { .. } => false,
            ColumnSlice::Sparse { .. } => self.value_at(row).is_none(),
            ColumnSlice::Text { indexes, .. } => u32::try_from(row)
                .map(|row| indexes.binary_search(&row).is_err())
                .unwrap_or(true),
        }
    }
}

/// One decoded reply: column ordinal to slice. Ordinals present are a subset
/// of the request's projection; empty/unknown ordinals are simply absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanResultSlice {
    pub columns: BTreeMap<u32, ColumnSlice>,
}

impl ScanResultSlice {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, ordinal: u32) -> Option<&ColumnSlice> {
        self.columns.get(&ordinal)
    }
}
