//! Cooperative cancellation for one run.
//!
//! A run is cancelled either explicitly through [`CancellationSource`] (for
//! example on SIGINT) or implicitly when its deadline elapses. Every remote
//! call and every sleep goes through [`CancellationToken::run`] so both
//! signals interrupt them immediately.

use std::future::Future;
use std::time::Duration;

use rolebind_core::{AppError, AppResult};
use tokio::sync::watch;
use tokio::time::Instant;

/// Handle that fires the cancellation signal.
#[derive(Debug)]
pub struct CancellationSource {
    sender: watch::Sender<bool>,
}

impl CancellationSource {
    /// Fires the signal. Idempotent.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

/// Observer of the run-level cancellation signal.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    receiver: watch::Receiver<bool>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    /// Creates a connected source/token pair with an optional deadline
    /// measured from now. A timeout past the clock's range means no deadline.
    #[must_use]
    pub fn new(timeout: Option<Duration>) -> (CancellationSource, Self) {
        let (sender, receiver) = watch::channel(false);
        let deadline = timeout.and_then(|timeout| Instant::now().checked_add(timeout));

        (CancellationSource { sender }, Self { receiver, deadline })
    }

    /// Creates a token that never fires.
    #[must_use]
    pub fn never() -> Self {
        let (_source, token) = Self::new(None);
        token
    }

    /// Returns whether the run was interrupted or its deadline elapsed.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_error().is_some()
    }

    /// Fails with `AppError::Cancelled` once the signal has fired.
    pub fn check(&self) -> AppResult<()> {
        match self.cancellation_error() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Drives `future` to completion unless the signal fires first.
    pub async fn run<T, F>(&self, future: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        self.check()?;

        tokio::select! {
            biased;
            error = self.cancelled() => Err(error),
            result = future => result,
        }
    }

    /// Sleeps for `duration`, returning early with `AppError::Cancelled`.
    pub async fn sleep(&self, duration: Duration) -> AppResult<()> {
        self.run(async {
            tokio::time::sleep(duration).await;
            Ok(())
        })
        .await
    }

    /// Resolves with the cancellation error once the signal fires.
    pub async fn cancelled(&self) -> AppError {
        let mut receiver = self.receiver.clone();
        let interrupted = async move {
            // A dropped source can no longer fire.
            if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
                std::future::pending::<()>().await;
            }
        };
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            () = interrupted => interrupted_error(),
            () = deadline => deadline_error(),
        }
    }

    fn cancellation_error(&self) -> Option<AppError> {
        if *self.receiver.borrow() {
            return Some(interrupted_error());
        }

        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(deadline_error()),
            _ => None,
        }
    }
}

fn interrupted_error() -> AppError {
    AppError::Cancelled("run interrupted".to_owned())
}

fn deadline_error() -> AppError {
    AppError::Cancelled("run deadline elapsed".to_owned())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rolebind_core::AppError;

    use super::CancellationToken;

    #[tokio::test(start_paused = true)]
    async fn never_token_lets_sleep_finish() {
        let token = CancellationToken::never();
        assert!(token.sleep(Duration::from_secs(60)).await.is_ok());
        assert!(!token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_interrupts_pending_sleep() {
        let (source, token) = CancellationToken::new(None);
        let sleeper = token.clone();
        let handle = tokio::spawn(async move { sleeper.sleep(Duration::from_secs(3600)).await });

        tokio::time::sleep(Duration::from_secs(1)).await;
        source.cancel();

        let result = handle.await.unwrap_or_else(|error| panic!("join: {error}"));
        assert!(matches!(result, Err(AppError::Cancelled(_))));
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_cancels_long_operations() {
        let (_source, token) = CancellationToken::new(Some(Duration::from_secs(5)));
        let started = tokio::time::Instant::now();

        let result = token.sleep(Duration::from_secs(60)).await;

        assert!(matches!(result, Err(AppError::Cancelled(message)) if message.contains("deadline")));
        assert!(started.elapsed() >= Duration::from_secs(5));
        assert!(started.elapsed() < Duration::from_secs(60));
        assert!(token.check().is_err());
    }

    #[tokio::test]
    async fn unrepresentable_timeout_has_no_deadline() {
        let (_source, token) = CancellationToken::new(Some(Duration::from_secs(u64::MAX)));

        assert!(!token.is_cancelled());
        assert!(token.check().is_ok());
    }

    #[tokio::test]
    async fn run_refuses_to_start_after_cancel() {
        let (source, token) = CancellationToken::new(None);
        source.cancel();

        let result = token.run(async { Ok(1) }).await;
        assert!(matches!(result, Err(AppError::Cancelled(_))));
    }
}
