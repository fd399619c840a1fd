//! Cancellation and deadline scope for network-bound calls
//!
//! Every operation that talks to a remote service takes a [`CallContext`].
//! Contexts combine monotonically: merging two contexts keeps the earlier
//! deadline and is cancelled when either side is cancelled.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a call was aborted before it completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Cancelled {
    /// The context's deadline passed
    #[error("deadline exceeded")]
    DeadlineExceeded,
    /// The context was cancelled by its owner
    #[error("operation cancelled")]
    Cancelled,
}

/// Deadline and cancellation scope for a single call
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    tokens: Vec<CancellationToken>,
}

impl CallContext {
    /// A context with no deadline that is never cancelled
    pub fn background() -> Self {
        Self::default()
    }

    /// A context whose deadline is `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().deadline(Instant::now() + timeout)
    }

    /// A context cancelled together with `token`
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self::background().cancellation(token)
    }

    /// Tighten the deadline; a later deadline than the current one is ignored
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    /// Add a cancellation source
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.tokens.push(token);
        self
    }

    /// Combine with another context
    pub fn merge(mut self, other: &CallContext) -> Self {
        if let Some(deadline) = other.deadline {
            self = self.deadline(deadline);
        }
        self.tokens.extend(other.tokens.iter().cloned());
        self
    }

    /// The effective deadline, if any
    pub fn current_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Check whether the context is already done without waiting
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.tokens.iter().any(|t| t.is_cancelled()) {
            return Err(Cancelled::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Cancelled::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Drive `fut` to completion unless the context ends first
    ///
    /// Cancellation takes priority over the deadline, which takes priority
    /// over a future that happens to be ready at the same poll.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, Cancelled>
    where
        F: Future,
    {
        self.check()?;

        let cancelled = async {
            if self.tokens.is_empty() {
                std::future::pending::<()>().await;
            } else {
                let waits = self.tokens.iter().map(|t| Box::pin(t.cancelled()));
                futures::future::select_all(waits).await;
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => Err(Cancelled::Cancelled),
            _ = expired => Err(Cancelled::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_background_runs_to_completion() {
        let ctx = CallContext::background();
        assert_eq!(ctx.run(async { 7 }).await, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_exceeded() {
        let ctx = CallContext::with_timeout(Duration::from_millis(50));
        let result = ctx
            .run(tokio::time::sleep(Duration::from_secs(10)))
            .await;
        assert_eq!(result, Err(Cancelled::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = CallContext::with_cancellation(token);
        assert_eq!(ctx.run(async { 1 }).await, Err(Cancelled::Cancelled));
    }

    #[tokio::test]
    async fn test_merge_keeps_earliest_deadline_and_all_tokens() {
        let now = Instant::now();
        let first = CallContext::background().deadline(now + Duration::from_secs(5));
        let token = CancellationToken::new();
        let second = CallContext::with_cancellation(token.clone())
            .deadline(now + Duration::from_secs(1));

        let merged = first.merge(&second);
        assert_eq!(merged.current_deadline(), Some(now + Duration::from_secs(1)));

        token.cancel();
        assert_eq!(merged.check(), Err(Cancelled::Cancelled));
    }

    #[test]
    fn test_later_deadline_ignored() {
        let now = Instant::now();
        let ctx = CallContext::background()
            .deadline(now + Duration::from_secs(1))
            .deadline(now + Duration::from_secs(60));
        assert_eq!(ctx.current_deadline(), Some(now + Duration::from_secs(1)));
    }
}
