//! Bounded retry with backoff.

use std::fmt::Display;
use std::future::Future;

use rivulet_config::RetryConfig;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct RetryPolicy {
  config: RetryConfig,
}

impl RetryPolicy {
  pub fn new(config: RetryConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &RetryConfig {
    &self.config
  }

  /// Runs `operation` until it succeeds or the attempts are used up. The
  /// operation receives the 1-based attempt number.
  pub async fn execute<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
  where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
  {
    let attempts = self.config.attempts();
    let mut attempt = 1;

    loop {
      match operation(attempt).await {
        Ok(result) => return Ok(result),
        Err(error) if attempt >= attempts => return Err(error),
        Err(error) => {
          let delay = self.config.delay_before_retry(attempt);
          debug!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "retrying after failure"
          );
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicU32, Ordering};

  use super::*;

  fn fast(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(
      RetryConfig::default()
        .with_max_attempts(max_attempts)
        .with_delays(1, 1),
    )
  }

  #[tokio::test]
  async fn test_succeeds_after_failures() {
    let calls = AtomicU32::new(0);
    let result: Result<u32, String> = fast(3)
      .execute(|attempt| {
        calls.fetch_add(1, Ordering::SeqCst);
        async move {
          if attempt < 3 {
            Err(format!("attempt {attempt} failed"))
          } else {
            Ok(attempt)
          }
        }
      })
      .await;

    assert_eq!(result, Ok(3));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn test_gives_up_after_max_attempts() {
    let calls = AtomicU32::new(0);
    let result: Result<(), String> = fast(2)
      .execute(|_| {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err("down".to_string()) }
      })
      .await;

    assert_eq!(result, Err("down".to_string()));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_single_attempt_never_retries() {
    let calls = AtomicU32::new(0);
    let policy = RetryPolicy::new(RetryConfig::single_attempt());
    let _: Result<(), &str> = policy
      .execute(|_| {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err("down") }
      })
      .await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }
}
