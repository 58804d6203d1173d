//! Field and table vocabulary shared by the heptane facade and its
//! providers: field types and values, row maps, and the table descriptor
//! with its registration-time validation.

pub mod fields;
pub mod table;

pub use fields::{
    FieldMap, FieldName, FieldType, FieldValue, TableName, UnsupportedFieldTypeError,
};
pub use table::{Table, TableValidationError, TableValidationReason};
