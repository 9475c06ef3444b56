use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatumError {
  #[error("could not deserialize \"{input}\": {message}")]
  Deserialization { input: String, message: String },

  #[error("serialization of {data_type} is not supported")]
  UnsupportedSerialization { data_type: String },

  #[error("unknown data type short name: {0}")]
  UnknownDataType(String),

  #[error("unknown internal signal type: {0}")]
  UnknownSignalKind(String),

  #[error("invalid dimensions for {data_type}: expected {rows}x{columns}")]
  InvalidDimensions {
    data_type: String,
    rows: usize,
    columns: usize,
  },

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}
