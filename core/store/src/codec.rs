//! Byte-level grammar of cache keys and values.
//!
//! Parts are joined with `#` (0x23) between every two adjacent parts, with
//! no leading or trailing separator and no escaping: a field value that
//! contains `#` is a caller precondition violation and will parse
//! ambiguously. Null serializes as an empty part, so an empty string value
//! is read back as null.

use crate::cache::CacheKey;
use crate::errors::Error;
use heptane_primitives::{FieldMap, FieldType, FieldValue, Table};

const SEPARATOR: u8 = b'#';

/// Serializes one field value. `None` is the null marker.
pub fn marshal_field(
    field_type: FieldType,
    value: &FieldValue,
) -> Result<Option<Vec<u8>>, Error> {
    match (field_type, value) {
        (_, FieldValue::Null) => Ok(None),
        (FieldType::String, FieldValue::String(s)) => Ok(Some(s.clone().into_bytes())),
        (FieldType::Bool, FieldValue::Bool(true)) => Ok(Some(vec![b't'])),
        (FieldType::Bool, FieldValue::Bool(false)) => Ok(Some(vec![b'f'])),
        (field_type, value) => Err(Error::UnsupportedFieldValue {
            field_type,
            value: format!("{value:?}"),
        }),
    }
}

/// Parses one serialized field value back. `None` is the null marker.
/// String bytes are taken as their UTF-8 interpretation; a bool part must
/// be exactly `t` or `f`.
pub fn unmarshal_field(field_type: FieldType, bytes: Option<&[u8]>) -> Result<FieldValue, Error> {
    match (field_type, bytes) {
        (_, None) => Ok(FieldValue::Null),
        (FieldType::String, Some(bytes)) => {
            Ok(FieldValue::String(String::from_utf8_lossy(bytes).into_owned()))
        }
        (FieldType::Bool, Some([b't'])) => Ok(FieldValue::Bool(true)),
        (FieldType::Bool, Some([b'f'])) => Ok(FieldValue::Bool(false)),
        (field_type, Some(bytes)) => Err(Error::UnsupportedFieldValue {
            field_type,
            value: String::from_utf8_lossy(bytes).into_owned(),
        }),
    }
}

/// Assembles the cache key of the row in `fields`: the table's prefix parts
/// followed by each serialized primary key field, in declared order. Fails
/// if any primary key field is absent from `fields`; extra fields are
/// ignored.
pub fn cache_key(table: &Table, fields: &FieldMap) -> Result<CacheKey, Error> {
    let prefix = table.cache_prefix.as_deref().unwrap_or_default();
    let mut parts: Vec<Vec<u8>> = Vec::with_capacity(prefix.len() + table.primary_key.len());
    parts.extend(prefix.iter().map(|part| part.clone().into_bytes()));
    for field in &table.primary_key {
        let Some(value) = fields.get(field) else {
            return Err(Error::MissingFieldValue {
                table: table.name.clone(),
                field: field.clone(),
                fields: fields.clone(),
            });
        };
        let bytes = marshal_field(table.field_type(field)?, value)?;
        parts.push(bytes.unwrap_or_default());
    }
    Ok(CacheKey(parts.join(&[SEPARATOR][..])))
}

/// Serializes the value fields of `row` in declared order. Fields absent
/// from `row` serialize as null. The result is always a present cache
/// value, never the negative marker.
pub fn encode_row(table: &Table, row: &FieldMap) -> Result<Vec<u8>, Error> {
    let mut parts: Vec<Vec<u8>> = Vec::with_capacity(table.values.len());
    for field in &table.values {
        let bytes = match row.get(field) {
            None => None,
            Some(value) => marshal_field(table.field_type(field)?, value)?,
        };
        parts.push(bytes.unwrap_or_default());
    }
    Ok(parts.join(&[SEPARATOR][..]))
}

/// Parses an encoded row back into its value fields. Empty input carries no
/// fields at all; an empty part is null; parts beyond the declared value
/// fields are ignored, and declared fields beyond the last part get no
/// entry, not even a null one.
pub fn decode_row(table: &Table, bytes: &[u8]) -> Result<FieldMap, Error> {
    let mut row = FieldMap::new();
    if bytes.is_empty() {
        return Ok(row);
    }
    for (field, part) in table.values.iter().zip(bytes.split(|b| *b == SEPARATOR)) {
        let part = (!part.is_empty()).then_some(part);
        row.insert(field.clone(), unmarshal_field(table.field_type(field)?, part)?);
    }
    Ok(row)
}
