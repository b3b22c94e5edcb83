//! Scan filter tree: an ordered disjunction (OR) of conjunctions (AND) of
//! single-column comparisons.

use std::fmt;

use serde::{Deserialize, Serialize};
use varve_common::{Result, VarveError};

use crate::u64val::U64;

/// Comparison operator of one scan filter.
///
/// Discriminants are the wire encoding and must not be renumbered without a
/// protocol version bump (none exists today).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum ScanComparison {
    Lt = 0,
    LtEq = 1,
    Eq = 2,
    GtEq = 3,
    Gt = 4,
    NotEq = 5,
}

// A renumbered variant is silent corruption on the engine side, so the
// wire contract is pinned at build time.
const _: () = {
    assert!(ScanComparison::Lt as u32 == 0);
    assert!(ScanComparison::LtEq as u32 == 1);
    assert!(ScanComparison::Eq as u32 == 2);
    assert!(ScanComparison::GtEq as u32 == 3);
    assert!(ScanComparison::Gt as u32 == 4);
    assert!(ScanComparison::NotEq as u32 == 5);
};

impl ScanComparison {
    pub fn to_wire(self) -> u32 {
        self as u32
    }

    pub fn try_from_wire(raw: u32) -> Result<Self> {
        Ok(match raw {
            0 => ScanComparison::Lt,
            1 => ScanComparison::LtEq,
            2 => ScanComparison::Eq,
            3 => ScanComparison::GtEq,
            4 => ScanComparison::Gt,
            5 => ScanComparison::NotEq,
            other => {
                return Err(VarveError::Decode(format!(
                    "unknown comparison operator tag {other}"
                )))
            }
        })
    }
}

impl fmt::Display for ScanComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanComparison::Lt => "Lt",
            ScanComparison::LtEq => "LtEq",
            ScanComparison::Eq => "Eq",
            ScanComparison::GtEq => "GtEq",
            ScanComparison::Gt => "Gt",
            ScanComparison::NotEq => "NotEq",
        };
        f.write_str(name)
    }
}

/// One single-column comparison.
///
/// Textual columns carry their operand as a UTF-8 string in addition to the
/// raw 8-byte slot; numeric columns carry only the raw slot. The string form
/// is diagnostic/in-memory only; the wire carries the numeric slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanFilter {
    /// Ordinal of the filtered column.
    pub column: u32,
    pub op: ScanComparison,
    pub value: U64,
    pub str_value: Option<String>,
}

impl fmt::Display for ScanFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}/{}",
            self.column,
            self.op,
            self.value,
            self.str_value.as_deref().unwrap_or("")
        )
    }
}

/// Builder that refuses to produce a partially specified filter.
#[derive(Debug, Default)]
pub struct ScanFilterBuilder {
    column: Option<u32>,
    op: Option<ScanComparison>,
    value: Option<U64>,
    str_value: Option<String>,
}

impl ScanFilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, column: u32) -> Self {
        self.column = Some(column);
        self
    }

    pub fn op(mut self, op: ScanComparison) -> Self {
        self.op = Some(op);
        self
    }

    pub fn value(mut self, value: U64) -> Self {
        self.value = Some(value);
        self
    }

    /// Sets the textual operand; counts as the filter value for columns whose
    /// storage is a string block.
    pub fn str_value(mut self, value: impl Into<String>) -> Self {
        self.str_value = Some(value.into());
        if self.value.is_none() {
            self.value = Some(U64::ZERO);
        }
        self
    }

    /// # Errors
    /// [`VarveError::Domain`] when column, operator, or value was never set.
    pub fn build(self) -> Result<ScanFilter> {
        let column = self
            .column
            .ok_or_else(|| VarveError::Domain("filter column not set".to_string()))?;
        let op = self
            .op
            .ok_or_else(|| VarveError::Domain("filter operation not set".to_string()))?;
        let value = self
            .value
            .ok_or_else(|| VarveError::Domain("filter value not set".to_string()))?;
        Ok(ScanFilter {
            column,
            op,
            value,
            str_value: self.str_value,
        })
    }
}

/// A conjunction of filters. An empty group is a tautology.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanAndFilters(pub Vec<ScanFilter>);

impl ScanAndFilters {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn push(&mut self, filter: ScanFilter) {
        self.0.push(filter);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScanFilter> {
        self.0.iter()
    }

    pub fn references_column(&self, ordinal: u32) -> bool {
        self.0.iter().any(|f| f.column == ordinal)
    }
}

impl From<Vec<ScanFilter>> for ScanAndFilters {
    fn from(filters: Vec<ScanFilter>) -> Self {
        ScanAndFilters(filters)
    }
}

/// The full predicate: an ordered disjunction of AND-groups. An empty tree
/// means "no predicate" (full scan).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanOrFilters(pub Vec<ScanAndFilters>);

impl ScanOrFilters {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn groups(&self) -> impl Iterator<Item = &ScanAndFilters> {
        self.0.iter()
    }

    pub fn references_column(&self, ordinal: u32) -> bool {
        self.0.iter().any(|g| g.references_column(ordinal))
    }
}

impl From<Vec<ScanAndFilters>> for ScanOrFilters {
    fn from(groups: Vec<ScanAndFilters>) -> Self {
        ScanOrFilters(groups)
    }
}

/// One scan invocation: inclusive unsigned time bounds, a projection, and a
/// filter tree. Created per split, consumed once by the codec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub min_ts: u64,
    pub max_ts: u64,
    /// Ordered list of distinct projected ordinals.
    pub projection: Vec<u32>,
    pub filters: ScanOrFilters,
}

#[cfg(test)]
mod tests {
    use super::{ScanComparison, ScanFilterBuilder};
    use crate::u64val::U64;

    #[test]
    fn builder_requires_column_op_and_value() {
        assert!(ScanFilterBuilder::new().build().is_err());
        assert!(ScanFilterBuilder::new()
            .column(1)
            .op(ScanComparison::Eq)
            .build()
            .is_err());
        assert!(ScanFilterBuilder::new()
            .op(ScanComparison::Eq)
            .value(U64::from(1u64))
            .build()
            .is_err());
        assert!(ScanFilterBuilder::new()
            .column(1)
            .value(U64::from(1u64))
            .build()
            .is_err());

        let filter = ScanFilterBuilder::new()
            .column(1)
            .op(ScanComparison::Eq)
            .value(U64::from(1u64))
            .build()
            .unwrap();
        assert_eq!(filter.column, 1);
        assert_eq!(filter.op, ScanComparison::Eq);
        assert_eq!(filter.value, U64::from(1u64));
        assert!(filter.str_value.is_none());
    }

    #[test]
    fn string_operand_counts_as_value() {
        let filter = ScanFilterBuilder::new()
            .column(2)
            .op(ScanComparison::Eq)
            .str_value("value")
            .build()
            .unwrap();
        assert_eq!(filter.str_value.as_deref(), Some("value"));
        assert_eq!(filter.value, U64::ZERO);
    }

    #[test]
    fn operator_wire_tags_are_pinned() {
        for (op, tag) in [
            (ScanComparison::Lt, 0),
            (ScanComparison::LtEq, 1),
            (ScanComparison::Eq, 2),
            (ScanComparison::GtEq, 3),
            (ScanComparison::Gt, 4),
            (ScanComparison::NotEq, 5),
        ] {
            assert_eq!(op.to_wire(), tag);
            assert_eq!(ScanComparison::try_from_wire(tag).unwrap(), op);
        }
        assert!(ScanComparison::try_from_wire(6).is_err());
    }
}
