//! Separator escaping for the line format.
//!
//! Both the separator and the escape character itself are escaped, so every
//! field list survives `escape_and_join` followed by `split_and_unescape`.
//! A backslash before any other character is kept as is on decoding.

const SEPARATOR: char = ':';
const ESCAPE: char = '\\';

pub fn escape_separator(raw: &str) -> String {
  let mut escaped = String::with_capacity(raw.len());
  for c in raw.chars() {
    if c == SEPARATOR || c == ESCAPE {
      escaped.push(ESCAPE);
    }
    escaped.push(c);
  }
  escaped
}

pub fn unescape_separator(escaped: &str) -> String {
  let mut raw = String::with_capacity(escaped.len());
  let mut chars = escaped.chars();
  while let Some(c) = chars.next() {
    if c != ESCAPE {
      raw.push(c);
      continue;
    }
    match chars.next() {
      Some(next) if next == SEPARATOR || next == ESCAPE => raw.push(next),
      Some(next) => {
        raw.push(ESCAPE);
        raw.push(next);
      }
      None => raw.push(ESCAPE),
    }
  }
  raw
}

/// Escapes every part and joins them with the separator.
pub fn escape_and_join<S: AsRef<str>>(parts: &[S]) -> String {
  parts
    .iter()
    .map(|part| escape_separator(part.as_ref()))
    .collect::<Vec<_>>()
    .join(&SEPARATOR.to_string())
}

/// Splits at unescaped separators and unescapes every part.
pub fn split_and_unescape(line: &str) -> Vec<String> {
  let mut parts = Vec::new();
  let mut current = String::new();
  let mut chars = line.chars();
  while let Some(c) = chars.next() {
    match c {
      ESCAPE => {
        current.push(c);
        if let Some(next) = chars.next() {
          current.push(next);
        }
      }
      SEPARATOR => parts.push(unescape_separator(&std::mem::take(&mut current))),
      _ => current.push(c),
    }
  }
  parts.push(unescape_separator(&current));
  parts
}
