//! Obtention d'une connexion avec retry

use std::time::Duration;

use tracing::{info, warn};

use crate::error::{IngestError, StoreError};
use crate::store::Connector;

/// Politique de retry : délai linéaire `base_delay × tentative`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Attente après l'échec de la tentative `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// Ouvre une connexion, en réessayant selon `policy`
///
/// Aucune attente après la dernière tentative.
///
/// # Errors
///
/// `IngestError::Connection` avec la dernière erreur une fois les tentatives
/// épuisées.
pub async fn acquire<C: Connector>(
    connector: &C,
    policy: &RetryPolicy,
) -> Result<C::Connection, IngestError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match connector.connect().await {
            Ok(connection) => {
                info!(target_db = %connector.describe(), attempt, "Connected to database");
                return Ok(connection);
            }
            Err(e) if attempt < max_attempts => {
                let delay = policy.delay_after(attempt);
                warn!(
                    attempt,
                    max_attempts,
                    retry_in_ms = delay.as_millis() as u64,
                    "Connection attempt failed: {e}"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(exhausted(attempt, e)),
        }
    }
}

fn exhausted(attempts: u32, source: StoreError) -> IngestError {
    IngestError::Connection { attempts, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Connection, NewRow};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    struct Idle;

    #[async_trait]
    impl Connection for Idle {
        async fn ensure_schema(&mut self) -> Result<(), StoreError> {
            Ok(())
        }
        async fn begin(&mut self) -> Result<(), StoreError> {
            Ok(())
        }
        async fn insert_row(&mut self, _row: &NewRow) -> Result<(), StoreError> {
            Ok(())
        }
        async fn commit(&mut self) -> Result<(), StoreError> {
            Ok(())
        }
        async fn ping(&mut self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    /// Échoue `failures` fois avant de réussir
    struct Flaky {
        failures: u32,
        attempts: AtomicU32,
    }

    impl Flaky {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                attempts: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl Connector for Flaky {
        type Connection = Idle;

        async fn connect(&self) -> Result<Idle, StoreError> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.failures {
                Err(StoreError::Backend(format!("refused #{n}")))
            } else {
                Ok(Idle)
            }
        }

        fn describe(&self) -> String {
            "flaky".to_string()
        }
    }

    #[test]
    fn test_linear_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_three_attempts() {
        let connector = Flaky::new(u32::MAX);
        let start = Instant::now();

        let err = acquire(&connector, &RetryPolicy::default()).await.err().unwrap();

        assert_eq!(connector.attempts.load(Ordering::SeqCst), 3);
        // 1s + 2s, pas d'attente après la dernière tentative
        assert_eq!(start.elapsed().as_secs(), 3);
        match err {
            IngestError::Connection { attempts, source } => {
                assert_eq!(attempts, 3);
                assert_eq!(source.to_string(), "refused #3");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_on_second_attempt() {
        let connector = Flaky::new(1);
        let start = Instant::now();

        assert!(acquire(&connector, &RetryPolicy::default()).await.is_ok());
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(start.elapsed().as_secs(), 1);
    }

    #[tokio::test]
    async fn test_first_attempt_success_does_not_wait() {
        let connector = Flaky::new(0);
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(60),
        };
        assert!(acquire(&connector, &policy).await.is_ok());
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
    }
}
