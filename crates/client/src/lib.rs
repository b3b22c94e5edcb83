//! Client-side scan pushdown for the varve engine.
//!
//! Architecture role:
//! - `predicate` lowers host-engine column domains into scan filter trees;
//! - `split` partitions the global time interval across scan targets;
//! - `transport` carries one framed request/reply exchange per call;
//! - `session` runs a scan end to end and accounts for it;
//! - `cursor` iterates one decoded reply as rows.

pub mod cursor;
pub mod predicate;
pub mod session;
pub mod split;
pub mod transport;

pub use cursor::ScanCursor;
pub use predicate::{
    predicate_to_filters, remap_reserved_filters, timestamp_bounds, ColumnDomain, RangeBound,
    ScanValue, ValueRange, ValueSet,
};
pub use session::ScanSession;
pub use split::{ScanSplit, SplitPlanner, TimeBoundaries};
pub use transport::{EngineChannel, ReqChannel};
