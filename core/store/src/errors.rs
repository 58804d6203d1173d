use crate::cache::CacheAccess;
use crate::row::RowAccess;
use heptane_primitives::{
    FieldMap, FieldName, FieldType, TableName, TableValidationError, UnsupportedFieldTypeError,
};

/// Any failure produced by the facade.
///
/// Callers should match on the variant; the rendered text is informational
/// only. Nothing is retried or swallowed: provider failures are wrapped
/// verbatim, and partial progress (say, a row mutation whose cache refresh
/// failed) is not rolled back — the variant identifies the stage that
/// failed.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An access named a table that is not registered.
    #[error("unregistered table `{0}`")]
    UnregisteredTable(TableName),
    /// A table descriptor failed validation at registration time.
    #[error(transparent)]
    InvalidTable(#[from] TableValidationError),
    /// A declared field type name is outside the supported set.
    #[error(transparent)]
    UnsupportedFieldType(#[from] UnsupportedFieldTypeError),
    /// A primary or partition key field is absent from an input map.
    #[error("missing value for field `{table}.{field}` in {fields:?}")]
    MissingFieldValue { table: TableName, field: FieldName, fields: FieldMap },
    /// A value is incompatible with the declared field type, or cached
    /// bytes do not parse as the declared type.
    #[error("unsupported value for `{field_type}` field: {value}")]
    UnsupportedFieldValue { field_type: FieldType, value: String },
    /// The row provider failed an access.
    #[error("row provider failed on {access:?}: {source}")]
    RowProviderAccess { access: RowAccess, source: anyhow::Error },
    /// The cache provider failed an access.
    #[error("cache provider failed on {access:?}: {source}")]
    CacheProviderAccess { access: CacheAccess, source: anyhow::Error },
    /// Several independent failures surfaced together, typically from a
    /// concurrent cache fan-out.
    #[error("multiple errors: {0:?}")]
    MultipleErrors(Vec<Error>),
}
