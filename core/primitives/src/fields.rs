use std::collections::BTreeMap;

/// Name of a registered table.
pub type TableName = String;

/// Name of a field of a table.
pub type FieldName = String;

/// Type of the values a field can hold.
///
/// The set is closed. Adding a type means adding a variant here and
/// extending the codec match in `heptane-store`; nothing else dispatches on
/// it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FieldType {
    /// Text, serialized as raw UTF-8 bytes.
    String,
    /// Boolean, serialized as a single `t` or `f` byte.
    Bool,
}

/// Produced when a declared field type is outside the supported set.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported field type `{0}`")]
pub struct UnsupportedFieldTypeError(pub String);

impl FieldType {
    /// Parses a type name as it appears in table configs.
    pub fn parse(name: &str) -> Result<FieldType, UnsupportedFieldTypeError> {
        name.parse().map_err(|_| UnsupportedFieldTypeError(name.to_string()))
    }
}

/// A single field value flowing through an access. `Null` is permitted for
/// every field type.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    String(String),
    Bool(bool),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Static name of the variant, for error and log text.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::String(_) => "string",
            FieldValue::Bool(_) => "bool",
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> FieldValue {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> FieldValue {
        FieldValue::String(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> FieldValue {
        FieldValue::Bool(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> FieldValue {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// Unordered mapping from field name to value: a primary key, a partition
/// key or a full row, depending on the operation it flows through.
pub type FieldMap = BTreeMap<FieldName, FieldValue>;

/// Builds a [`FieldMap`] from `name => value` pairs.
///
/// ```
/// use heptane_primitives::{fields, FieldValue};
///
/// let row = fields! { "foo" => "1", "flag" => true, "gone" => FieldValue::Null };
/// assert_eq!(row.len(), 3);
/// ```
#[macro_export]
macro_rules! fields {
    () => { $crate::FieldMap::new() };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::FieldMap::new();
        $(map.insert($name.to_string(), $crate::FieldValue::from($value));)+
        map
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn field_type_names_round_trip() {
        assert_eq!(FieldType::String.to_string(), "string");
        assert_eq!(FieldType::Bool.to_string(), "bool");
        assert_eq!(FieldType::parse("string").unwrap(), FieldType::String);
        assert_eq!(FieldType::parse("bool").unwrap(), FieldType::Bool);
        assert_matches!(
            FieldType::parse("int"),
            Err(UnsupportedFieldTypeError(name)) if name == "int"
        );
    }

    #[test]
    fn field_value_json_is_untagged() {
        assert_eq!(serde_json::to_string(&FieldValue::from("a")).unwrap(), r#""a""#);
        assert_eq!(serde_json::to_string(&FieldValue::from(true)).unwrap(), "true");
        assert_eq!(serde_json::to_string(&FieldValue::Null).unwrap(), "null");

        assert_eq!(serde_json::from_str::<FieldValue>(r#""a""#).unwrap(), FieldValue::from("a"));
        assert_eq!(serde_json::from_str::<FieldValue>("false").unwrap(), FieldValue::from(false));
        assert_eq!(serde_json::from_str::<FieldValue>("null").unwrap(), FieldValue::Null);
    }

    #[test]
    fn field_map_macro() {
        let row = fields! { "foo" => "1", "flag" => false, "none" => Option::<bool>::None };
        assert_eq!(row["foo"], FieldValue::from("1"));
        assert_eq!(row["flag"], FieldValue::Bool(false));
        assert_eq!(row["none"], FieldValue::Null);
        assert!(fields! {}.is_empty());
    }
}
