//! Value model, filter model, and wire codec for the varve scan-engine protocol.
//!
//! Architecture role:
//! - [`u64val`] gives unsigned semantics to 64-bit values transported in a
//!   signed 64-bit slot
//! - [`schema`] describes projected/filterable columns
//! - [`filter`] models the OR-of-AND scan filter tree
//! - [`block`] models decoded dense/sparse/string column slices
//! - [`wire`] is the little-endian, length-prefixed (de)serializer; it never
//!   interprets filter semantics
//!
//! Everything in this crate is pure and stateless; encode/decode may be
//! invoked concurrently without coordination.

pub mod block;
pub mod filter;
pub mod schema;
pub mod u64val;
pub mod wire;

pub use block::{BlockType, ColumnSlice, ScanResultSlice};
pub use filter::{ScanAndFilters, ScanComparison, ScanFilter, ScanFilterBuilder, ScanOrFilters, ScanRequest};
pub use schema::{ColumnDescriptor, LogicalType, RESERVED_SOURCE_ID_COLUMN, TIMESTAMP_ORDINAL};
pub use u64val::U64;
