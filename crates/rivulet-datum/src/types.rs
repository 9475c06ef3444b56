use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DatumError;
use crate::signal::InternalSignal;

/// The fixed set of value kinds a [`TypedDatum`] can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
  Boolean,
  ShortText,
  Integer,
  Float,
  DateTime,
  Vector,
  Matrix,
  SmallTable,
  FileReference,
  DirectoryReference,
  Empty,
  NotAValue,
  /// Control signals multiplexed onto data edges. Never declared on an input.
  Internal,
  StructuredData,
  BigTable,
}

impl DataType {
  /// Short name used by the JSON value codec (`"t"` field).
  pub fn short_name(self) -> &'static str {
    match self {
      DataType::Boolean => "Bool",
      DataType::ShortText => "STxt",
      DataType::Integer => "Int",
      DataType::Float => "Flt",
      DataType::DateTime => "DTime",
      DataType::Vector => "Vctr",
      DataType::Matrix => "Mtrx",
      DataType::SmallTable => "STbl",
      DataType::FileReference => "FRef",
      DataType::DirectoryReference => "DRef",
      DataType::Empty => "Empty",
      DataType::NotAValue => "NaV",
      DataType::Internal => "Internal",
      DataType::StructuredData => "SData",
      DataType::BigTable => "BTbl",
    }
  }

  pub fn from_short_name(name: &str) -> Result<Self, DatumError> {
    let data_type = match name {
      "Bool" => DataType::Boolean,
      "STxt" => DataType::ShortText,
      "Int" => DataType::Integer,
      "Flt" => DataType::Float,
      "DTime" => DataType::DateTime,
      "Vctr" => DataType::Vector,
      "Mtrx" => DataType::Matrix,
      "STbl" => DataType::SmallTable,
      "FRef" => DataType::FileReference,
      "DRef" => DataType::DirectoryReference,
      "Empty" => DataType::Empty,
      "NaV" => DataType::NotAValue,
      "Internal" => DataType::Internal,
      "SData" => DataType::StructuredData,
      "BTbl" => DataType::BigTable,
      other => return Err(DatumError::UnknownDataType(other.to_string())),
    };
    Ok(data_type)
  }

  /// Human readable name used in scheduling failure messages.
  pub fn display_name(self) -> &'static str {
    match self {
      DataType::Boolean => "Boolean",
      DataType::ShortText => "Short Text",
      DataType::Integer => "Integer",
      DataType::Float => "Float",
      DataType::DateTime => "Date/Time",
      DataType::Vector => "Vector",
      DataType::Matrix => "Matrix",
      DataType::SmallTable => "Small Table",
      DataType::FileReference => "File",
      DataType::DirectoryReference => "Directory",
      DataType::Empty => "Empty",
      DataType::NotAValue => "Not a value",
      DataType::Internal => "Internal",
      DataType::StructuredData => "Structured Data",
      DataType::BigTable => "Big Table",
    }
  }
}

impl fmt::Display for DataType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.display_name())
  }
}

/// Why a "not a value" marker was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotAValueCause {
  InvalidInputs,
  Failure,
}

impl NotAValueCause {
  pub fn as_str(self) -> &'static str {
    match self {
      NotAValueCause::InvalidInputs => "InvalidInputs",
      NotAValueCause::Failure => "Failure",
    }
  }

  pub fn parse(value: &str) -> Option<Self> {
    match value {
      "InvalidInputs" => Some(NotAValueCause::InvalidInputs),
      "Failure" => Some(NotAValueCause::Failure),
      _ => None,
    }
  }
}

/// Marks the absence of a value for one loop iteration.
///
/// The identifier is unique per marker and is used by receivers to detect
/// markers that travelled around a loop back to their producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotAValue {
  pub identifier: String,
  pub cause: NotAValueCause,
}

impl NotAValue {
  pub fn new(identifier: impl Into<String>, cause: NotAValueCause) -> Self {
    Self {
      identifier: identifier.into(),
      cause,
    }
  }

  /// A marker with a freshly generated identifier.
  pub fn generate(cause: NotAValueCause) -> Self {
    Self::new(uuid::Uuid::new_v4().to_string(), cause)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
  pub rows: usize,
  pub columns: usize,
  /// Row-major cell values, `rows` entries of `columns` values each.
  pub values: Vec<Vec<f64>>,
}

impl Matrix {
  pub fn new(values: Vec<Vec<f64>>) -> Self {
    let rows = values.len();
    let columns = values.first().map_or(0, Vec::len);
    Self {
      rows,
      columns,
      values,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmallTable {
  pub rows: usize,
  pub columns: usize,
  pub cells: Vec<Vec<TypedDatum>>,
}

impl SmallTable {
  pub fn new(cells: Vec<Vec<TypedDatum>>) -> Self {
    let rows = cells.len();
    let columns = cells.first().map_or(0, Vec::len);
    Self {
      rows,
      columns,
      cells,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReference {
  pub reference: String,
  pub file_name: String,
  pub file_size: i64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub last_modified: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryReference {
  pub reference: String,
  pub directory_name: String,
  pub directory_size: i64,
}

/// The payload of a token. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TypedDatum {
  Boolean(bool),
  ShortText(String),
  Integer(i64),
  Float(f64),
  /// Milliseconds since the unix epoch.
  DateTime(i64),
  Vector(Vec<f64>),
  Matrix(Matrix),
  SmallTable(SmallTable),
  FileReference(FileReference),
  DirectoryReference(DirectoryReference),
  Empty,
  NotAValue(NotAValue),
  Internal(InternalSignal),
}

impl TypedDatum {
  pub fn data_type(&self) -> DataType {
    match self {
      TypedDatum::Boolean(_) => DataType::Boolean,
      TypedDatum::ShortText(_) => DataType::ShortText,
      TypedDatum::Integer(_) => DataType::Integer,
      TypedDatum::Float(_) => DataType::Float,
      TypedDatum::DateTime(_) => DataType::DateTime,
      TypedDatum::Vector(_) => DataType::Vector,
      TypedDatum::Matrix(_) => DataType::Matrix,
      TypedDatum::SmallTable(_) => DataType::SmallTable,
      TypedDatum::FileReference(_) => DataType::FileReference,
      TypedDatum::DirectoryReference(_) => DataType::DirectoryReference,
      TypedDatum::Empty => DataType::Empty,
      TypedDatum::NotAValue(_) => DataType::NotAValue,
      TypedDatum::Internal(_) => DataType::Internal,
    }
  }

  pub fn is_internal(&self) -> bool {
    matches!(self, TypedDatum::Internal(_))
  }

  pub fn as_internal(&self) -> Option<&InternalSignal> {
    match self {
      TypedDatum::Internal(signal) => Some(signal),
      _ => None,
    }
  }

  pub fn as_not_a_value(&self) -> Option<&NotAValue> {
    match self {
      TypedDatum::NotAValue(nav) => Some(nav),
      _ => None,
    }
  }
}

impl fmt::Display for TypedDatum {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TypedDatum::Boolean(v) => write!(f, "{}", v),
      TypedDatum::ShortText(v) => write!(f, "{}", v),
      TypedDatum::Integer(v) => write!(f, "{}", v),
      TypedDatum::Float(v) => write!(f, "{}", v),
      TypedDatum::DateTime(v) => write!(f, "{}ms", v),
      TypedDatum::Vector(v) => write!(f, "{:?}", v),
      TypedDatum::Matrix(m) => write!(f, "matrix {}x{}", m.rows, m.columns),
      TypedDatum::SmallTable(t) => write!(f, "table {}x{}", t.rows, t.columns),
      TypedDatum::FileReference(r) => write!(f, "file {}", r.file_name),
      TypedDatum::DirectoryReference(r) => write!(f, "directory {}", r.directory_name),
      TypedDatum::Empty => f.write_str("empty"),
      TypedDatum::NotAValue(nav) => write!(f, "not a value ({})", nav.identifier),
      TypedDatum::Internal(signal) => write!(f, "{}", signal),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_short_name_lookup_is_symmetric() {
    for data_type in [
      DataType::Boolean,
      DataType::ShortText,
      DataType::Integer,
      DataType::Float,
      DataType::DateTime,
      DataType::Vector,
      DataType::Matrix,
      DataType::SmallTable,
      DataType::FileReference,
      DataType::DirectoryReference,
      DataType::Empty,
      DataType::NotAValue,
    ] {
      assert_eq!(
        DataType::from_short_name(data_type.short_name()).unwrap(),
        data_type
      );
    }
  }

  #[test]
  fn test_unknown_short_name() {
    let result = DataType::from_short_name("Nope");
    assert!(matches!(result, Err(DatumError::UnknownDataType(name)) if name == "Nope"));
  }

  #[test]
  fn test_float_short_name() {
    assert_eq!(DataType::Float.short_name(), "Flt");
  }

  #[test]
  fn test_matrix_dimensions_from_values() {
    let matrix = Matrix::new(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
    assert_eq!(matrix.rows, 2);
    assert_eq!(matrix.columns, 3);
  }

  #[test]
  fn test_data_type_of_values() {
    assert_eq!(TypedDatum::Float(1.5).data_type(), DataType::Float);
    assert_eq!(TypedDatum::Empty.data_type(), DataType::Empty);
    assert_eq!(
      TypedDatum::NotAValue(NotAValue::generate(NotAValueCause::Failure)).data_type(),
      DataType::NotAValue
    );
    assert_eq!(
      TypedDatum::Internal(InternalSignal::workflow_finish()).data_type(),
      DataType::Internal
    );
  }

  #[test]
  fn test_generated_not_a_value_identifiers_differ() {
    let a = NotAValue::generate(NotAValueCause::InvalidInputs);
    let b = NotAValue::generate(NotAValueCause::InvalidInputs);
    assert_ne!(a.identifier, b.identifier);
  }
}
