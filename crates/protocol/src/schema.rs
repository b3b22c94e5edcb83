//! Column descriptors supplied by the host engine's metadata layer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::block::BlockType;

/// Ordinal reserved for the timestamp column in every table.
pub const TIMESTAMP_ORDINAL: u32 = 0;

/// Column the scan engine does not back yet; filters on it are remapped
/// before sending and its value is synthesized on read.
pub const RESERVED_SOURCE_ID_COLUMN: &str = "source_id";

/// Logical type of a column as the host engine sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalType {
    Boolean,
    /// Signed 32-bit integer.
    Integer,
    /// Signed 64-bit integer.
    BigInt,
    /// Unsigned 64-bit integer transported in a signed slot.
    Unsigned64,
    Double,
    Varchar,
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogicalType::Boolean => "boolean",
            LogicalType::Integer => "integer",
            LogicalType::BigInt => "bigint",
            LogicalType::Unsigned64 => "unsigned_long",
            LogicalType::Double => "double",
            LogicalType::Varchar => "varchar",
        };
        f.write_str(name)
    }
}

/// One projected or filterable column.
///
/// Descriptors come from the (out-of-scope) metadata layer and are immutable
/// for a session; the ordinal is stable per table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// 0-based position, unique within a table; 0 is the timestamp column.
    pub ordinal: u32,
    pub logical_type: LogicalType,
    /// Storage block-type tag the engine uses for this column.
    pub block_type: BlockType,
}

impl ColumnDescriptor {
    pub fn new(
        name: impl Into<String>,
        ordinal: u32,
        logical_type: LogicalType,
        block_type: BlockType,
    ) -> Self {
        Self {
            name: name.into(),
            ordinal,
            logical_type,
            block_type,
        }
    }

    pub fn is_reserved_source_id(&self) -> bool {
        self.name == RESERVED_SOURCE_ID_COLUMN
    }
}

impl fmt::Display for ColumnDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} (#{})", self.name, self.logical_type, self.ordinal)
    }
}
