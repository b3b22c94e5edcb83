//! Predicate pushdown: host-engine column domains to scan filter trees.
//!
//! The host engine's planner describes its predicate as a set of per-column
//! value domains (unions of ranges). The translator lowers that description
//! into the engine's flat comparison filters, then a separate remap step
//! rewrites filters on the reserved `source_id` column, which the engine does
//! not back yet.
//!
//! Architecture role:
//! - pure functions, no I/O and no shared state;
//! - `predicate_to_filters` emits at most one AND-group per call;
//! - `remap_reserved_filters` returns a new request and never mutates its
//!   input;
//! - `timestamp_bounds` extracts the global time interval the split planner
//!   divides.

use varve_common::{Result, VarveError};
use varve_protocol::{
    ColumnDescriptor, LogicalType, ScanAndFilters, ScanComparison, ScanFilter, ScanFilterBuilder,
    ScanOrFilters, ScanRequest, TIMESTAMP_ORDINAL, U64,
};

use crate::split::TimeBoundaries;

/// One predicate operand as the host engine supplies it.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanValue {
    /// Numeric literal in the signed transport slot.
    Int(i64),
    Text(String),
}

/// One endpoint of a value range.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeBound {
    pub value: ScanValue,
    pub inclusive: bool,
}

impl RangeBound {
    pub fn inclusive(value: ScanValue) -> Self {
        Self {
            value,
            inclusive: true,
        }
    }

    pub fn exclusive(value: ScanValue) -> Self {
        Self {
            value,
            inclusive: false,
        }
    }
}

/// A contiguous value range; an absent bound leaves that side open.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueRange {
    pub low: Option<RangeBound>,
    pub high: Option<RangeBound>,
}

impl ValueRange {
    pub fn point(value: ScanValue) -> Self {
        Self {
            low: Some(RangeBound::inclusive(value.clone())),
            high: Some(RangeBound::inclusive(value)),
        }
    }

    /// Both bounds present, inclusive, and equal.
    fn single_value(&self) -> Option<&ScanValue> {
        match (&self.low, &self.high) {
            (Some(low), Some(high))
                if low.inclusive && high.inclusive && low.value == high.value =>
            {
                Some(&low.value)
            }
            _ => None,
        }
    }
}

/// The set of values a column may take under the predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueSet {
    /// Unconstrained; contributes no filters.
    All,
    /// Provably empty; the caller short-circuits to zero rows before
    /// reaching the translator.
    None,
    Ranges(Vec<ValueRange>),
    /// Explicit value enumeration; not lowerable to range filters.
    Discrete(Vec<ScanValue>),
}

/// Predicate restriction of one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDomain {
    pub column: ColumnDescriptor,
    pub values: ValueSet,
}

/// Lowers per-column domains into one AND-group of comparison filters.
///
/// Each range contributes an `Eq` filter when it pins a single value, and
/// otherwise one filter per present bound. `All` and `None` domains
/// contribute nothing.
///
/// # Errors
/// [`VarveError::Domain`] for discrete-value domains and for operands whose
/// kind does not match the column's logical type.
pub fn predicate_to_filters(domains: &[ColumnDomain]) -> Result<ScanOrFilters> {
    let mut group = ScanAndFilters::default();
    for domain in domains {
        match &domain.values {
            ValueSet::All | ValueSet::None => {}
            ValueSet::Discrete(_) => {
                return Err(VarveError::Domain(format!(
                    "discrete-value domain on column {} cannot be pushed down",
                    domain.column
                )))
            }
            ValueSet::Ranges(ranges) => {
                for range in ranges {
                    push_range_filters(&mut group, &domain.column, range)?;
                }
            }
        }
    }
    if group.is_empty() {
        Ok(ScanOrFilters::default())
    } else {
        Ok(ScanOrFilters(vec![group]))
    }
}

fn push_range_filters(
    group: &mut ScanAndFilters,
    column: &ColumnDescriptor,
    range: &ValueRange,
) -> Result<()> {
    if let Some(value) = range.single_value() {
        group.push(make_filter(column, ScanComparison::Eq, value)?);
        return Ok(());
    }
    if let Some(low) = &range.low {
        let op = if low.inclusive {
            ScanComparison::GtEq
        } else {
            ScanComparison::Gt
        };
        group.push(make_bound_filter(column, op, &low.value, Bound::Lower)?);
    }
    if let Some(high) = &range.high {
        let op = if high.inclusive {
            ScanComparison::LtEq
        } else {
            ScanComparison::Lt
        };
        group.push(make_bound_filter(column, op, &high.value, Bound::Upper)?);
    }
    Ok(())
}

#[derive(Clone, Copy)]
enum Bound {
    Lower,
    Upper,
}

/// Builds one filter for a range bound, normalizing negative-looking
/// literals on unsigned columns.
///
/// The host engine narrows every unsigned literal into the signed slot, so a
/// value with the top bit set arrives looking negative. Such a literal can
/// never be a real unsigned bound: an upper bound is rewritten to
/// `Gt u64::MAX` and a lower bound to `GtEq 0`.
fn make_bound_filter(
    column: &ColumnDescriptor,
    op: ScanComparison,
    value: &ScanValue,
    bound: Bound,
) -> Result<ScanFilter> {
    if column.logical_type == LogicalType::Unsigned64 {
        if let ScanValue::Int(raw) = value {
            if *raw < 0 {
                return match bound {
                    Bound::Upper => make_filter(
                        column,
                        ScanComparison::Gt,
                        &ScanValue::Int(U64::MAX.to_bits()),
                    ),
                    Bound::Lower => {
                        make_filter(column, ScanComparison::GtEq, &ScanValue::Int(0))
                    }
                };
            }
        }
    }
    make_filter(column, op, value)
}

fn make_filter(
    column: &ColumnDescriptor,
    op: ScanComparison,
    value: &ScanValue,
) -> Result<ScanFilter> {
    let builder = ScanFilterBuilder::new().column(column.ordinal).op(op);
    let builder = match (value, column.logical_type) {
        (ScanValue::Text(text), LogicalType::Varchar) => builder.str_value(text.clone()),
        (ScanValue::Text(_), other) => {
            return Err(VarveError::Domain(format!(
                "text operand against {other} column {}",
                column.name
            )))
        }
        (ScanValue::Int(_), LogicalType::Varchar) => {
            return Err(VarveError::Domain(format!(
                "numeric operand against varchar column {}",
                column.name
            )))
        }
        (ScanValue::Int(raw), _) => builder.value(U64::from_bits(*raw)),
    };
    builder.build()
}

/// Rewrites filters on the reserved `source_id` column, which the scan
/// engine cannot evaluate yet.
///
/// Per AND-group: a group whose only filter targets `source_id` gets the
/// always-true timestamp filter `(0, Gt, 0)` instead, with the timestamp
/// ordinal appended to the projection when absent; in larger groups the
/// `source_id` filters are dropped and the remaining conjuncts keep
/// filtering. Requests that do not project or reference the column come back
/// unchanged.
pub fn remap_reserved_filters(
    request: &ScanRequest,
    columns: &[ColumnDescriptor],
) -> ScanRequest {
    let Some(reserved) = columns.iter().find(|c| c.is_reserved_source_id()) else {
        return request.clone();
    };
    if !request.projection.contains(&reserved.ordinal)
        || !request.filters.references_column(reserved.ordinal)
    {
        return request.clone();
    }

    let mut remapped = request.clone();
    let mut need_timestamp = false;
    for group in &mut remapped.filters.0 {
        let sole_reserved =
            group.len() == 1 && group.references_column(reserved.ordinal);
        if sole_reserved {
            group.0.clear();
            group.push(ScanFilter {
                column: TIMESTAMP_ORDINAL,
                op: ScanComparison::Gt,
                value: U64::ZERO,
                str_value: None,
            });
            need_timestamp = true;
        } else {
            group.0.retain(|f| f.column != reserved.ordinal);
        }
    }
    if need_timestamp && !remapped.projection.contains(&TIMESTAMP_ORDINAL) {
        remapped.projection.push(TIMESTAMP_ORDINAL);
    }
    remapped
}

/// Extracts the global time interval the predicate allows on the timestamp
/// column: the minimum of the lower bounds and the maximum of the upper
/// bounds across its ranges, with an open side pinned to the unsigned
/// extreme. `None` when the predicate does not constrain the column.
pub fn timestamp_bounds(domains: &[ColumnDomain]) -> Option<TimeBoundaries> {
    let domain = domains
        .iter()
        .find(|d| d.column.ordinal == TIMESTAMP_ORDINAL)?;
    let ValueSet::Ranges(ranges) = &domain.values else {
        return None;
    };
    if ranges.is_empty() {
        return None;
    }

    let mut start = u64::MAX;
    let mut end = 0u64;
    for range in ranges {
        start = start.min(bound_magnitude(range.low.as_ref(), 0));
        end = end.max(bound_magnitude(range.high.as_ref(), u64::MAX));
    }
    Some(TimeBoundaries::of(Some(start), Some(end)))
}

fn bound_magnitude(bound: Option<&RangeBound>, open: u64) -> u64 {
    match bound {
        Some(RangeBound {
            value: ScanValue::Int(raw),
            ..
        }) => U64::from_bits(*raw).magnitude(),
        _ => open,
    }
}
