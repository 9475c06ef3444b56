use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::enums::RetryBackoff;

/// Bounded retry policy for remote delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
  /// Total attempts including the first one. Values below 1 act as 1.
  pub max_attempts: u32,
  pub backoff: RetryBackoff,
  pub initial_delay_ms: u64,
  pub max_delay_ms: u64,
}

impl Default for RetryConfig {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      backoff: RetryBackoff::Exponential,
      initial_delay_ms: 100,
      max_delay_ms: 2_000,
    }
  }
}

impl RetryConfig {
  /// One attempt, no retries.
  pub fn single_attempt() -> Self {
    Self {
      max_attempts: 1,
      ..Self::default()
    }
  }

  pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
    self.max_attempts = max_attempts;
    self
  }

  pub fn with_delays(mut self, initial_delay_ms: u64, max_delay_ms: u64) -> Self {
    self.initial_delay_ms = initial_delay_ms;
    self.max_delay_ms = max_delay_ms;
    self
  }

  pub fn attempts(&self) -> u32 {
    self.max_attempts.max(1)
  }

  /// Delay before retry number `retry` (the second attempt is retry 1).
  pub fn delay_before_retry(&self, retry: u32) -> Duration {
    let retry = retry.max(1);
    let millis = match self.backoff {
      RetryBackoff::Constant => self.initial_delay_ms,
      RetryBackoff::Linear => self.initial_delay_ms.saturating_mul(u64::from(retry)),
      RetryBackoff::Exponential => {
        let factor = 1u64.checked_shl(retry - 1).unwrap_or(u64::MAX);
        self.initial_delay_ms.saturating_mul(factor)
      }
    };
    Duration::from_millis(millis.min(self.max_delay_ms))
  }
}
