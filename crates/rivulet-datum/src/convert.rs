//! Implicit conversions accepted at component inputs.
//!
//! Numeric kinds widen along Boolean -> Integer -> Float -> Vector -> Matrix
//! -> SmallTable. Every scalar kind fits into a SmallTable cell. Empty is
//! accepted by every input.

use crate::types::DataType;

fn numeric_rank(data_type: DataType) -> Option<u8> {
  match data_type {
    DataType::Boolean => Some(0),
    DataType::Integer => Some(1),
    DataType::Float => Some(2),
    DataType::Vector => Some(3),
    DataType::Matrix => Some(4),
    DataType::SmallTable => Some(5),
    _ => None,
  }
}

/// Whether a value of type `from` may be delivered to an input expecting `to`.
pub fn is_convertible(from: DataType, to: DataType) -> bool {
  if from == to || from == DataType::Empty {
    return true;
  }
  if let (Some(a), Some(b)) = (numeric_rank(from), numeric_rank(to)) {
    return a < b;
  }
  matches!(
    (from, to),
    (DataType::ShortText, DataType::SmallTable)
      | (DataType::DateTime, DataType::SmallTable)
      | (DataType::FileReference, DataType::SmallTable)
      | (DataType::DirectoryReference, DataType::SmallTable)
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_numeric_widening() {
    assert!(is_convertible(DataType::Integer, DataType::Float));
    assert!(is_convertible(DataType::Boolean, DataType::Matrix));
    assert!(is_convertible(DataType::Float, DataType::SmallTable));
  }

  #[test]
  fn test_no_narrowing() {
    assert!(!is_convertible(DataType::Float, DataType::Integer));
    assert!(!is_convertible(DataType::Matrix, DataType::Vector));
  }

  #[test]
  fn test_text_only_into_tables() {
    assert!(is_convertible(DataType::ShortText, DataType::SmallTable));
    assert!(!is_convertible(DataType::ShortText, DataType::Float));
    assert!(!is_convertible(DataType::Float, DataType::ShortText));
  }

  #[test]
  fn test_empty_fits_everywhere() {
    assert!(is_convertible(DataType::Empty, DataType::FileReference));
    assert!(!is_convertible(DataType::FileReference, DataType::Empty));
  }
}
