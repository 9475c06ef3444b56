//! Pluggable encoding of ordinary typed values.
//!
//! The default codec writes compact JSON objects of the form
//! `{"t": <short name>, "v": <value>}`. Matrices and small tables add their
//! dimensions as `"r"` (rows) and `"c"` (columns).

use serde_json::{Map, Value, json};

use crate::error::DatumError;
use crate::types::{
  DataType, DirectoryReference, FileReference, Matrix, NotAValue, NotAValueCause, SmallTable,
  TypedDatum,
};

const TYPE: &str = "t";
const VALUE: &str = "v";
const ROWS: &str = "r";
const COLUMNS: &str = "c";
const ID: &str = "id";
const FILE_REFERENCE: &str = "fileReference";
const FILE_NAME: &str = "fileName";
const FILE_SIZE: &str = "fileSize";
const LAST_MODIFIED: &str = "lastModified";
const DIRECTORY_REFERENCE: &str = "directoryReference";
const DIRECTORY_NAME: &str = "directoryName";
const DIRECTORY_SIZE: &str = "directorySize";
const LEGACY_FAILURE_SUFFIX: &str = "_flr";

/// Converts ordinary (non-internal) typed values to and from text.
pub trait TypedDatumSerializer: Send + Sync {
  fn serialize(&self, datum: &TypedDatum) -> Result<String, DatumError>;

  fn deserialize(&self, input: &str) -> Result<TypedDatum, DatumError>;
}

/// The default JSON value codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTypedDatumSerializer;

impl TypedDatumSerializer for JsonTypedDatumSerializer {
  fn serialize(&self, datum: &TypedDatum) -> Result<String, DatumError> {
    Ok(serde_json::to_string(&to_node(datum)?)?)
  }

  fn deserialize(&self, input: &str) -> Result<TypedDatum, DatumError> {
    if input.is_empty() {
      return Err(decode_error(input, "empty input"));
    }
    let root: Value = serde_json::from_str(input).map_err(|e| decode_error(input, e))?;
    from_node(&root).map_err(|e| match e {
      DatumError::Deserialization { message, .. } => decode_error(input, message),
      other => other,
    })
  }
}

fn to_node(datum: &TypedDatum) -> Result<Value, DatumError> {
  let data_type = datum.data_type();
  let mut root = Map::new();
  root.insert(TYPE.to_string(), json!(data_type.short_name()));

  let value = match datum {
    TypedDatum::Boolean(v) => json!(v),
    TypedDatum::ShortText(v) => json!(v),
    TypedDatum::Integer(v) => json!(v),
    TypedDatum::Float(v) => json!(v),
    TypedDatum::DateTime(v) => json!(v),
    TypedDatum::Vector(v) => json!(v),
    TypedDatum::Matrix(m) => {
      root.insert(ROWS.to_string(), json!(m.rows));
      root.insert(COLUMNS.to_string(), json!(m.columns));
      json!(m.values)
    }
    TypedDatum::SmallTable(t) => {
      root.insert(ROWS.to_string(), json!(t.rows));
      root.insert(COLUMNS.to_string(), json!(t.columns));
      let rows = t
        .cells
        .iter()
        .map(|row| row.iter().map(to_node).collect::<Result<Vec<_>, _>>())
        .collect::<Result<Vec<_>, _>>()?;
      json!(rows)
    }
    TypedDatum::FileReference(r) => {
      let mut node = Map::new();
      node.insert(FILE_REFERENCE.to_string(), json!(r.reference));
      node.insert(FILE_NAME.to_string(), json!(r.file_name));
      node.insert(FILE_SIZE.to_string(), json!(r.file_size));
      if let Some(last_modified) = r.last_modified {
        node.insert(LAST_MODIFIED.to_string(), json!(last_modified));
      }
      Value::Object(node)
    }
    TypedDatum::DirectoryReference(r) => {
      let mut node = Map::new();
      node.insert(DIRECTORY_REFERENCE.to_string(), json!(r.reference));
      node.insert(DIRECTORY_NAME.to_string(), json!(r.directory_name));
      node.insert(DIRECTORY_SIZE.to_string(), json!(r.directory_size));
      Value::Object(node)
    }
    TypedDatum::NotAValue(nav) => {
      let mut node = Map::new();
      node.insert(ID.to_string(), json!(nav.identifier));
      node.insert(TYPE.to_string(), json!(nav.cause.as_str()));
      Value::Object(node)
    }
    TypedDatum::Empty => return Ok(Value::Object(root)),
    TypedDatum::Internal(_) => {
      return Err(DatumError::UnsupportedSerialization {
        data_type: data_type.display_name().to_string(),
      });
    }
  };

  root.insert(VALUE.to_string(), value);
  Ok(Value::Object(root))
}

fn from_node(root: &Value) -> Result<TypedDatum, DatumError> {
  let short_name = root
    .get(TYPE)
    .and_then(Value::as_str)
    .ok_or_else(|| node_error("missing type field"))?;
  let data_type = DataType::from_short_name(short_name)?;
  let value = root.get(VALUE).unwrap_or(&Value::Null);

  let datum = match data_type {
    DataType::Boolean => TypedDatum::Boolean(
      value
        .as_bool()
        .ok_or_else(|| node_error("expected boolean value"))?,
    ),
    DataType::ShortText => TypedDatum::ShortText(
      value
        .as_str()
        .ok_or_else(|| node_error("expected text value"))?
        .to_string(),
    ),
    DataType::Integer => TypedDatum::Integer(as_i64(value)?),
    DataType::Float => TypedDatum::Float(as_f64(value)?),
    DataType::DateTime => TypedDatum::DateTime(as_i64(value)?),
    DataType::Vector => TypedDatum::Vector(as_array(value)?.iter().map(as_f64).collect::<Result<_, _>>()?),
    DataType::Matrix => {
      let rows = dimension(root, ROWS)?;
      let columns = dimension(root, COLUMNS)?;
      let values = as_array(value)?
        .iter()
        .map(|row| as_array(row)?.iter().map(as_f64).collect::<Result<Vec<_>, _>>())
        .collect::<Result<Vec<_>, _>>()?;
      check_dimensions(data_type, rows, columns, values.iter().map(Vec::len), values.len())?;
      TypedDatum::Matrix(Matrix {
        rows,
        columns,
        values,
      })
    }
    DataType::SmallTable => {
      let rows = dimension(root, ROWS)?;
      let columns = dimension(root, COLUMNS)?;
      let cells = as_array(value)?
        .iter()
        .map(|row| as_array(row)?.iter().map(table_cell).collect::<Result<Vec<_>, _>>())
        .collect::<Result<Vec<_>, _>>()?;
      check_dimensions(data_type, rows, columns, cells.iter().map(Vec::len), cells.len())?;
      TypedDatum::SmallTable(SmallTable {
        rows,
        columns,
        cells,
      })
    }
    DataType::FileReference => TypedDatum::FileReference(FileReference {
      reference: text_field(value, FILE_REFERENCE)?,
      file_name: text_field(value, FILE_NAME)?,
      file_size: value.get(FILE_SIZE).map(as_i64).transpose()?.unwrap_or(0),
      last_modified: value
        .get(LAST_MODIFIED)
        .filter(|v| !v.is_null())
        .map(as_i64)
        .transpose()?,
    }),
    DataType::DirectoryReference => TypedDatum::DirectoryReference(DirectoryReference {
      reference: text_field(value, DIRECTORY_REFERENCE)?,
      directory_name: text_field(value, DIRECTORY_NAME)?,
      directory_size: value.get(DIRECTORY_SIZE).map(as_i64).transpose()?.unwrap_or(0),
    }),
    DataType::NotAValue => TypedDatum::NotAValue(not_a_value(value)?),
    DataType::Empty => TypedDatum::Empty,
    DataType::Internal | DataType::StructuredData | DataType::BigTable => {
      return Err(node_error(format!(
        "values of type {} are not supported",
        data_type.display_name()
      )));
    }
  };
  Ok(datum)
}

/// Older producers wrote the identifier as a plain string and marked
/// failure-caused markers with a suffix.
fn not_a_value(value: &Value) -> Result<NotAValue, DatumError> {
  if let Some(id) = value.as_str() {
    let cause = if id.ends_with(LEGACY_FAILURE_SUFFIX) {
      NotAValueCause::Failure
    } else {
      NotAValueCause::InvalidInputs
    };
    return Ok(NotAValue::new(id, cause));
  }
  let identifier = text_field(value, ID)?;
  let cause_name = text_field(value, TYPE)?;
  let cause = NotAValueCause::parse(&cause_name)
    .ok_or_else(|| node_error(format!("unknown not-a-value cause: {}", cause_name)))?;
  Ok(NotAValue::new(identifier, cause))
}

/// Cells are nested typed objects; older producers nested them as encoded strings.
fn table_cell(cell: &Value) -> Result<TypedDatum, DatumError> {
  match cell {
    Value::String(encoded) => {
      let nested: Value = serde_json::from_str(encoded).map_err(|e| node_error(e.to_string()))?;
      from_node(&nested)
    }
    other => from_node(other),
  }
}

fn check_dimensions(
  data_type: DataType,
  rows: usize,
  columns: usize,
  mut row_lengths: impl Iterator<Item = usize>,
  row_count: usize,
) -> Result<(), DatumError> {
  if row_count != rows || !row_lengths.all(|len| len == columns) {
    return Err(DatumError::InvalidDimensions {
      data_type: data_type.display_name().to_string(),
      rows,
      columns,
    });
  }
  Ok(())
}

fn dimension(root: &Value, key: &str) -> Result<usize, DatumError> {
  root
    .get(key)
    .and_then(Value::as_u64)
    .map(|v| v as usize)
    .ok_or_else(|| node_error(format!("missing dimension '{}'", key)))
}

fn as_array(value: &Value) -> Result<&Vec<Value>, DatumError> {
  value
    .as_array()
    .ok_or_else(|| node_error("expected array value"))
}

fn as_i64(value: &Value) -> Result<i64, DatumError> {
  value
    .as_i64()
    .ok_or_else(|| node_error("expected integer value"))
}

fn as_f64(value: &Value) -> Result<f64, DatumError> {
  value
    .as_f64()
    .ok_or_else(|| node_error("expected numeric value"))
}

fn text_field(value: &Value, key: &str) -> Result<String, DatumError> {
  value
    .get(key)
    .and_then(Value::as_str)
    .map(str::to_string)
    .ok_or_else(|| node_error(format!("missing text field '{}'", key)))
}

fn node_error(message: impl ToString) -> DatumError {
  DatumError::Deserialization {
    input: String::new(),
    message: message.to_string(),
  }
}

fn decode_error(input: &str, message: impl ToString) -> DatumError {
  DatumError::Deserialization {
    input: input.to_string(),
    message: message.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::signal::InternalSignal;

  fn codec() -> JsonTypedDatumSerializer {
    JsonTypedDatumSerializer
  }

  #[test]
  fn test_serialize_float() {
    assert_eq!(
      codec().serialize(&TypedDatum::Float(2.5)).unwrap(),
      r#"{"t":"Flt","v":2.5}"#
    );
  }

  #[test]
  fn test_serialize_empty_has_no_value() {
    assert_eq!(
      codec().serialize(&TypedDatum::Empty).unwrap(),
      r#"{"t":"Empty"}"#
    );
  }

  #[test]
  fn test_serialize_matrix_writes_dimensions_first() {
    let matrix = TypedDatum::Matrix(Matrix::new(vec![vec![1.0, 2.0], vec![3.0, 4.0]]));
    assert_eq!(
      codec().serialize(&matrix).unwrap(),
      r#"{"t":"Mtrx","r":2,"c":2,"v":[[1.0,2.0],[3.0,4.0]]}"#
    );
  }

  #[test]
  fn test_not_a_value_round_trip() {
    let nav = TypedDatum::NotAValue(NotAValue::new("nav-1", NotAValueCause::Failure));
    let encoded = codec().serialize(&nav).unwrap();
    assert_eq!(encoded, r#"{"t":"NaV","v":{"id":"nav-1","t":"Failure"}}"#);
    assert_eq!(codec().deserialize(&encoded).unwrap(), nav);
  }

  #[test]
  fn test_legacy_not_a_value_identifier() {
    let decoded = codec().deserialize(r#"{"t":"NaV","v":"abc_flr"}"#).unwrap();
    assert_eq!(
      decoded,
      TypedDatum::NotAValue(NotAValue::new("abc_flr", NotAValueCause::Failure))
    );

    let decoded = codec().deserialize(r#"{"t":"NaV","v":"abc"}"#).unwrap();
    assert_eq!(
      decoded,
      TypedDatum::NotAValue(NotAValue::new("abc", NotAValueCause::InvalidInputs))
    );
  }

  #[test]
  fn test_small_table_nested_cells() {
    let table = TypedDatum::SmallTable(SmallTable::new(vec![
      vec![TypedDatum::Integer(1), TypedDatum::ShortText("a".to_string())],
      vec![TypedDatum::Empty, TypedDatum::Boolean(true)],
    ]));
    let encoded = codec().serialize(&table).unwrap();
    assert_eq!(codec().deserialize(&encoded).unwrap(), table);
  }

  #[test]
  fn test_small_table_accepts_string_encoded_cells() {
    let input = r#"{"t":"STbl","r":1,"c":1,"v":[["{\"t\":\"Int\",\"v\":4}"]]}"#;
    let decoded = codec().deserialize(input).unwrap();
    assert_eq!(
      decoded,
      TypedDatum::SmallTable(SmallTable::new(vec![vec![TypedDatum::Integer(4)]]))
    );
  }

  #[test]
  fn test_file_reference_optional_last_modified() {
    let input = r#"{"t":"FRef","v":{"fileReference":"ref-1","fileName":"a.txt","fileSize":12,"lastModified":null}}"#;
    let decoded = codec().deserialize(input).unwrap();
    assert_eq!(
      decoded,
      TypedDatum::FileReference(FileReference {
        reference: "ref-1".to_string(),
        file_name: "a.txt".to_string(),
        file_size: 12,
        last_modified: None,
      })
    );
  }

  #[test]
  fn test_internal_signal_is_not_a_typed_value() {
    let result = codec().serialize(&TypedDatum::Internal(InternalSignal::workflow_finish()));
    assert!(matches!(
      result,
      Err(DatumError::UnsupportedSerialization { .. })
    ));
  }

  #[test]
  fn test_deserialize_rejects_bad_dimensions() {
    let result = codec().deserialize(r#"{"t":"Mtrx","r":2,"c":1,"v":[[1.0]]}"#);
    assert!(matches!(result, Err(DatumError::InvalidDimensions { .. })));
  }

  #[test]
  fn test_deserialize_rejects_empty_and_garbage() {
    assert!(codec().deserialize("").is_err());
    assert!(codec().deserialize("not json").is_err());
    assert!(codec().deserialize(r#"{"t":"BTbl","v":[]}"#).is_err());
  }
}
