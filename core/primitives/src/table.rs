use crate::fields::{FieldMap, FieldName, FieldType, TableName};
use itertools::Itertools;
use std::collections::BTreeMap;

/// Descriptor of a row-oriented table: its key structure, its value fields,
/// the declared type of every field and the optional primary key cache
/// configuration.
///
/// Descriptors are plain data and serialize as camelCase JSON, so a
/// registry can be driven from a config file. A descriptor is validated
/// once, at registration time, and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Table {
    pub name: TableName,
    /// Ordered field names determining data placement in a sharded row
    /// store. Must be an exact prefix of `primary_key`.
    pub partition_key: Vec<FieldName>,
    /// Ordered field names uniquely identifying a row.
    pub primary_key: Vec<FieldName>,
    /// Ordered non-key fields stored alongside the primary key.
    pub values: Vec<FieldName>,
    /// Declared type of every named field.
    pub types: BTreeMap<FieldName, FieldType>,
    /// Prefix parts of every cache key of the table, typically an
    /// identifier of the table and a version of the cached representation.
    /// The primary key cache is enabled iff this is present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_prefix: Option<Vec<String>>,
}

/// Reason a [`Table`] failed validation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TableValidationReason {
    #[error("empty table name")]
    EmptyName,
    #[error("empty partition key")]
    EmptyPartitionKey,
    #[error("empty primary key")]
    EmptyPrimaryKey,
    #[error("empty field name")]
    EmptyFieldName,
    #[error("repeated field `{0}`")]
    RepeatedField(FieldName),
    #[error("partition key is not a prefix of the primary key")]
    PartitionKeyNotPrefix,
    #[error("missing type for field `{0}`")]
    MissingFieldType(FieldName),
}

/// A table descriptor that cannot be registered, and why.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid table `{table}`: {reason}")]
pub struct TableValidationError {
    pub table: TableName,
    pub reason: TableValidationReason,
}

impl Table {
    /// Checks the descriptor invariants, failing with the first violation:
    /// non-empty name, non-empty and distinct partition key, non-empty and
    /// distinct primary key with the partition key as exact prefix, value
    /// fields distinct and disjoint from the primary key, and a declared
    /// type for every named field.
    pub fn validate(&self) -> Result<(), TableValidationError> {
        if self.name.is_empty() {
            return Err(self.invalid(TableValidationReason::EmptyName));
        }
        if self.partition_key.is_empty() {
            return Err(self.invalid(TableValidationReason::EmptyPartitionKey));
        }
        self.check_fields(&self.partition_key)?;
        if self.primary_key.is_empty() {
            return Err(self.invalid(TableValidationReason::EmptyPrimaryKey));
        }
        self.check_fields(&self.primary_key)?;
        if !self.primary_key.starts_with(&self.partition_key) {
            return Err(self.invalid(TableValidationReason::PartitionKeyNotPrefix));
        }
        self.check_fields(&self.values)?;
        if let Some(repeated) = self.values.iter().find(|f| self.primary_key.contains(f)) {
            return Err(self.invalid(TableValidationReason::RepeatedField(repeated.clone())));
        }
        for field in self.primary_key.iter().chain(&self.values) {
            if !self.types.contains_key(field) {
                return Err(
                    self.invalid(TableValidationReason::MissingFieldType(field.clone()))
                );
            }
        }
        Ok(())
    }

    /// The declared type of `field`.
    pub fn field_type(&self, field: &str) -> Result<FieldType, TableValidationError> {
        self.types.get(field).copied().ok_or_else(|| {
            self.invalid(TableValidationReason::MissingFieldType(field.to_string()))
        })
    }

    /// Whether the primary key cache is configured for this table.
    pub fn cache_enabled(&self) -> bool {
        self.cache_prefix.is_some()
    }

    /// Whether `row` carries every declared value field, present or null.
    pub fn contains_all_values(&self, row: &FieldMap) -> bool {
        self.values.iter().all(|field| row.contains_key(field))
    }

    fn check_fields(&self, names: &[FieldName]) -> Result<(), TableValidationError> {
        if names.iter().any(|name| name.is_empty()) {
            return Err(self.invalid(TableValidationReason::EmptyFieldName));
        }
        if let Some(repeated) = names.iter().duplicates().next() {
            return Err(self.invalid(TableValidationReason::RepeatedField(repeated.clone())));
        }
        Ok(())
    }

    fn invalid(&self, reason: TableValidationReason) -> TableValidationError {
        TableValidationError { table: self.name.clone(), reason }
    }
}
