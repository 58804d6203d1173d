use heptane_primitives::{FieldMap, Table};

/// One access to the underlying row store.
///
/// Value fields absent from a `Create` or `Update` row are not written,
/// which is distinct from fields explicitly set to null, which are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowAccess {
    /// Insert a row. `row` carries the full primary key and any values.
    Create { table: Table, row: FieldMap },
    /// Select all value fields of the rows matching every primary key field
    /// present in `key`. At least the partition key must be present.
    Retrieve { table: Table, key: FieldMap },
    /// Partial update of a row, symmetric to `Create`.
    Update { table: Table, row: FieldMap },
    /// Delete the row under the full primary key in `key`.
    Delete { table: Table, key: FieldMap },
}

/// Driver of a row-oriented store.
///
/// Implementations may block on network or disk, must not retain the
/// borrowed access past the call, and report failures as [`anyhow::Error`].
pub trait RowProvider: Send + Sync {
    /// Performs one access. A retrieve yields the matching rows, each
    /// carrying at least the selecting primary key fields plus the
    /// retrieved value fields; mutations yield an empty list.
    fn access(&self, access: &RowAccess) -> anyhow::Result<Vec<FieldMap>>;

    /// Performs several independent accesses, one result per access in
    /// input order.
    fn access_slice(&self, accesses: &[RowAccess]) -> Vec<anyhow::Result<Vec<FieldMap>>> {
        accesses.iter().map(|access| self.access(access)).collect()
    }
}
