use rivulet_datum::DatumError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
  #[error("malformed endpoint datum line: expected {expected} fields, found {found}")]
  FieldCount { expected: usize, found: usize },

  #[error("invalid data management id '{0}'")]
  InvalidDataManagementId(String),

  #[error("failed to encode or decode value: {0}")]
  Value(#[from] DatumError),
}
