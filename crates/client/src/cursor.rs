//! Row cursor over one decoded scan reply.
//!
//! The engine returns each column in whatever block shape it stores: dense
//! arrays, sparse index/value pairs, or string offset tables. The cursor
//! reconciles those shapes into one row count and exposes field accessors
//! keyed by position in the projected descriptor list.

use tracing::debug;
use varve_common::{Result, VarveError};
use varve_protocol::{ColumnDescriptor, ColumnSlice, LogicalType, ScanResultSlice};

/// Iterates one scan reply as rows; owned by a single execution thread.
pub struct ScanCursor {
    fields: Vec<ColumnDescriptor>,
    slice: ScanResultSlice,
    row_count: usize,
    /// `None` before the first `advance`.
    position: Option<usize>,
}

impl ScanCursor {
    /// Wraps a decoded slice. `fields` is the projection in order; field
    /// indexes passed to the accessors are positions in this list.
    pub fn new(fields: Vec<ColumnDescriptor>, slice: ScanResultSlice) -> Self {
        let row_count = resolve_row_count(&fields, &slice);
        Self {
            fields,
            slice,
            row_count,
            position: None,
        }
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Moves to the next row; `false` once past the end. Advancing past the
    /// end is terminal and stays `false`.
    pub fn advance(&mut self) -> bool {
        let next = self.position.map_or(0, |p| (p + 1).min(self.row_count));
        self.position = Some(next);
        next < self.row_count
    }

    /// Reads a boolean field. The engine ships no boolean blocks, so the
    /// value is always `false`.
    pub fn get_boolean(&self, field: usize) -> Result<bool> {
        self.check_field_type(field, &[LogicalType::Boolean])?;
        Ok(false)
    }

    /// Reads an integer-family field as the 64-bit slot value.
    ///
    /// The reserved `source_id` column has no backing block; its value is
    /// the synthesized constant 1.
    pub fn get_long(&self, field: usize) -> Result<i64> {
        let descriptor = self.check_field_type(
            field,
            &[
                LogicalType::Integer,
                LogicalType::BigInt,
                LogicalType::Unsigned64,
            ],
        )?;
        if descriptor.is_reserved_source_id() {
            return Ok(1);
        }
        let row = self.current_row()?;
        let column = self.column(descriptor)?;
        if let ColumnSlice::Text { .. } = column {
            return Err(VarveError::TypeMismatch(format!(
                "column {} is backed by a string block, not an integer block",
                descriptor.name
            )));
        }
        column.value_at(row).ok_or_else(|| {
            VarveError::Domain(format!(
                "no value at row {row} of column {}",
                descriptor.name
            ))
        })
    }

    /// Double-typed access. No floating-point block exists in the protocol
    /// yet, so any read fails.
    pub fn get_double(&self, field: usize) -> Result<f64> {
        let descriptor = self.check_field_type(field, &[LogicalType::Double])?;
        Err(VarveError::Unsupported(format!(
            "double column {} has no block representation",
            descriptor.name
        )))
    }

    /// Reads a varchar field from its string block.
    pub fn get_string(&self, field: usize) -> Result<String> {
        let descriptor = self.check_field_type(field, &[LogicalType::Varchar])?;
        let row = self.current_row()?;
        let column = self.column(descriptor)?;
        match column.text_at(row)? {
            Some(text) => Ok(text.to_string()),
            None => Err(VarveError::Domain(format!(
                "no value at row {row} of column {}",
                descriptor.name
            ))),
        }
    }

    /// Whether the current row holds no value for `field`. Dense columns
    /// and the synthesized `source_id` are never null; a column absent from
    /// the reply is null everywhere.
    pub fn is_null(&self, field: usize) -> Result<bool> {
        let descriptor = self.field(field)?;
        if descriptor.is_reserved_source_id() {
            return Ok(false);
        }
        let row = self.current_row()?;
        match self.slice.get(descriptor.ordinal) {
            Some(column) => Ok(column.is_null(row)),
            None => Ok(true),
        }
    }

    pub fn close(self) {
        debug!(
            rows = self.row_count,
            fields = self.fields.len(),
            operator = "ScanCursor",
            "cursor closed"
        );
    }

    fn field(&self, field: usize) -> Result<&ColumnDescriptor> {
        self.fields.get(field).ok_or_else(|| {
            VarveError::Domain(format!(
                "field index {field} out of bounds for {} projected columns",
                self.fields.len()
            ))
        })
    }

    fn check_field_type(
        &self,
        field: usize,
        expected: &[LogicalType],
    ) -> Result<&ColumnDescriptor> {
        let descriptor = self.field(field)?;
        if !expected.contains(&descriptor.logical_type) {
            let expected = expected
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" or ");
            return Err(VarveError::TypeMismatch(format!(
                "field {} is {}, expected {expected}",
                descriptor.name, descriptor.logical_type
            )));
        }
        Ok(descriptor)
    }

    fn current_row(&self) -> Result<usize> {
        match self.position {
            Some(row) if row < self.row_count => Ok(row),
            _ => Err(VarveError::Domain(
                "cursor is not positioned on a row".to_string(),
            )),
        }
    }

    fn column(&self, descriptor: &ColumnDescriptor) -> Result<&ColumnSlice> {
        self.slice.get(descriptor.ordinal).ok_or_else(|| {
            VarveError::Domain(format!(
                "reply carries no block for column {}",
                descriptor.name
            ))
        })
    }
}

/// The row count of a reply whose columns disagree on shape: the first
/// dense column in projection order is authoritative (`source_id` never is,
/// it has no backing block); with no dense column the largest sparse or
/// text extent wins.
fn resolve_row_count(fields: &[ColumnDescriptor], slice: &ScanResultSlice) -> usize {
    let reserved: Vec<u32> = fields
        .iter()
        .filter(|d| d.is_reserved_source_id())
        .map(|d| d.ordinal)
        .collect();
    for descriptor in fields {
        if descriptor.is_reserved_source_id() {
            continue;
        }
        if let Some(column) = slice.get(descriptor.ordinal) {
            if column.is_dense() {
                return column.element_count();
            }
        }
    }
    slice
        .columns
        .iter()
        .filter(|(ordinal, _)| !reserved.contains(ordinal))
        .map(|(_, column)| column.element_count())
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use varve_common::VarveError;
    use varve_protocol::{
        BlockType, ColumnDescriptor, ColumnSlice, LogicalType, ScanResultSlice,
    };

    use super::ScanCursor;

    fn descriptor(name: &str, ordinal: u32, ty: LogicalType, block: BlockType) -> ColumnDescriptor {
        ColumnDescriptor::new(name, ordinal, ty, block)
    }

    fn slice(columns: Vec<(u32, ColumnSlice)>) -> ScanResultSlice {
        ScanResultSlice {
            columns: BTreeMap::from_iter(columns),
        }
    }

    fn dense(values: Vec<i64>) -> ColumnSlice {
        ColumnSlice::Dense {
            ty: BlockType::U64Dense,
            values,
        }
    }

    fn sparse(entries: Vec<(u32, i64)>) -> ColumnSlice {
        ColumnSlice::Sparse {
            ty: BlockType::I64Sparse,
            entries,
        }
    }

    #[test]
    fn empty_slice_has_zero_rows() {
        let cursor = ScanCursor::new(Vec::new(), ScanResultSlice::default());
        assert_eq!(cursor.row_count(), 0);
    }

    #[test]
    fn dense_column_sets_the_row_count() {
        let fields = vec![descriptor(
            "ts",
            0,
            LogicalType::Unsigned64,
            BlockType::U64Dense,
        )];
        let cursor = ScanCursor::new(fields, slice(vec![(0, dense((0..10).collect()))]));
        assert_eq!(cursor.row_count(), 10);
    }

    #[test]
    fn sparse_only_slice_uses_the_largest_extent() {
        let fields = vec![
            descriptor("a", 1, LogicalType::BigInt, BlockType::I64Sparse),
            descriptor("b", 2, LogicalType::BigInt, BlockType::I64Sparse),
        ];
        let cursor = ScanCursor::new(
            fields,
            slice(vec![
                (1, sparse(vec![(4, 1)])),  // extent 5
                (2, sparse(vec![(9, 2)])),  // extent 10
            ]),
        );
        assert_eq!(cursor.row_count(), 10);
    }

    #[test]
    fn dense_wins_over_a_larger_sparse_extent() {
        let fields = vec![
            descriptor("a", 1, LogicalType::BigInt, BlockType::I64Sparse),
            descriptor("ts", 0, LogicalType::Unsigned64, BlockType::U64Dense),
        ];
        let cursor = ScanCursor::new(
            fields,
            slice(vec![
                (0, dense((0..10).collect())),
                (1, sparse(vec![(4, 1)])),
            ]),
        );
        assert_eq!(cursor.row_count(), 10);
    }

    #[test]
    fn source_id_never_drives_the_row_count() {
        let fields = vec![
            descriptor("source_id", 1, LogicalType::Integer, BlockType::I32Dense),
            descriptor("a", 2, LogicalType::BigInt, BlockType::I64Sparse),
        ];
        // Even a dense block under the reserved ordinal is ignored.
        let cursor = ScanCursor::new(
            fields,
            slice(vec![(1, dense(vec![0])), (2, sparse(vec![(2, 9)]))]),
        );
        assert_eq!(cursor.row_count(), 3);
    }

    #[test]
    fn reserved_only_slice_counts_zero_rows() {
        let fields = vec![
            descriptor("source_id", 1, LogicalType::Integer, BlockType::I32Dense),
            descriptor("a", 2, LogicalType::BigInt, BlockType::I64Sparse),
        ];
        let cursor = ScanCursor::new(fields, slice(vec![(1, dense(vec![0, 0, 0, 0]))]));
        assert_eq!(cursor.row_count(), 0);
    }

    #[test]
    fn advance_walks_rows_and_is_terminal_past_the_end() {
        let fields = vec![descriptor(
            "ts",
            0,
            LogicalType::Unsigned64,
            BlockType::U64Dense,
        )];
        let mut cursor = ScanCursor::new(fields, slice(vec![(0, dense(vec![7, 8]))]));
        assert!(cursor.advance());
        assert_eq!(cursor.get_long(0).unwrap(), 7);
        assert!(cursor.advance());
        assert_eq!(cursor.get_long(0).unwrap(), 8);
        assert!(!cursor.advance());
        assert!(!cursor.advance());
        assert!(matches!(
            cursor.get_long(0).unwrap_err(),
            VarveError::Domain(_)
        ));
    }

    #[test]
    fn access_before_first_advance_fails() {
        let fields = vec![descriptor(
            "ts",
            0,
            LogicalType::Unsigned64,
            BlockType::U64Dense,
        )];
        let cursor = ScanCursor::new(fields, slice(vec![(0, dense(vec![7]))]));
        assert!(matches!(
            cursor.get_long(0).unwrap_err(),
            VarveError::Domain(_)
        ));
    }

    #[test]
    fn source_id_value_is_synthesized() {
        let fields = vec![
            descriptor("ts", 0, LogicalType::Unsigned64, BlockType::U64Dense),
            descriptor("source_id", 1, LogicalType::Integer, BlockType::I32Dense),
        ];
        let mut cursor = ScanCursor::new(fields, slice(vec![(0, dense(vec![7]))]));
        assert!(cursor.advance());
        assert_eq!(cursor.get_long(1).unwrap(), 1);
        assert!(!cursor.is_null(1).unwrap());
    }

    #[test]
    fn sparse_holes_are_null_and_unreadable() {
        let fields = vec![descriptor("a", 1, LogicalType::BigInt, BlockType::I64Sparse)];
        let mut cursor = ScanCursor::new(fields, slice(vec![(1, sparse(vec![(1, 5)]))]));
        assert!(cursor.advance());
        assert!(cursor.is_null(0).unwrap());
        assert!(matches!(
            cursor.get_long(0).unwrap_err(),
            VarveError::Domain(_)
        ));
        assert!(cursor.advance());
        assert!(!cursor.is_null(0).unwrap());
        assert_eq!(cursor.get_long(0).unwrap(), 5);
    }

    #[test]
    fn absent_column_is_null_everywhere() {
        let fields = vec![
            descriptor("ts", 0, LogicalType::Unsigned64, BlockType::U64Dense),
            descriptor("a", 1, LogicalType::BigInt, BlockType::I64Sparse),
        ];
        let mut cursor = ScanCursor::new(fields, slice(vec![(0, dense(vec![7]))]));
        assert!(cursor.advance());
        assert!(cursor.is_null(1).unwrap());
    }

    #[test]
    fn type_mismatch_names_the_field_and_types() {
        let fields = vec![descriptor("name", 3, LogicalType::Varchar, BlockType::String)];
        let mut cursor = ScanCursor::new(
            fields,
            slice(vec![(
                3,
                ColumnSlice::Text {
                    indexes: vec![0],
                    starts: vec![0],
                    bytes: b"abc".to_vec(),
                },
            )]),
        );
        assert!(cursor.advance());
        let err = cursor.get_long(0).unwrap_err();
        match err {
            VarveError::TypeMismatch(msg) => {
                assert!(msg.contains("name"));
                assert!(msg.contains("varchar"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(cursor.get_string(0).unwrap(), "abc");
    }

    #[test]
    fn boolean_reads_are_always_false() {
        let fields = vec![descriptor(
            "flag",
            4,
            LogicalType::Boolean,
            BlockType::U8Dense,
        )];
        let mut cursor = ScanCursor::new(fields, slice(vec![(4, dense(vec![1]))]));
        assert!(cursor.advance());
        assert!(!cursor.get_boolean(0).unwrap());
    }

    #[test]
    fn double_reads_are_unsupported() {
        let fields = vec![descriptor(
            "score",
            5,
            LogicalType::Double,
            BlockType::U64Dense,
        )];
        let mut cursor = ScanCursor::new(fields, slice(vec![(5, dense(vec![1]))]));
        assert!(cursor.advance());
        assert!(matches!(
            cursor.get_double(0).unwrap_err(),
            VarveError::Unsupported(_)
        ));
        // Wrong-typed access still reports the mismatch first.
        assert!(matches!(
            cursor.get_long(0).unwrap_err(),
            VarveError::TypeMismatch(_)
        ));
    }
}
