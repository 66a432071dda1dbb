use crate::errors::{ErrorKind, KvDocError, KvDocResult};
use std::time::{Duration, Instant};

/// Time budget of one logical operation.
///
/// A deadline is created when an operation starts and checked before every store
/// primitive. Once it has passed, the next primitive fails with
/// `ErrorKind::StoreTimeout` instead of reaching the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deadline {
    expires_at: Option<Instant>,
}

impl Deadline {
    /// A deadline that never passes.
    pub fn none() -> Self {
        Deadline { expires_at: None }
    }

    /// A deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Deadline {
            expires_at: Instant::now().checked_add(timeout),
        }
    }

    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        match timeout {
            Some(timeout) => Deadline::after(timeout),
            None => Deadline::none(),
        }
    }

    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Instant::now() >= expires_at,
            None => false,
        }
    }

    /// Time left before the deadline passes, `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|expires_at| expires_at.saturating_duration_since(Instant::now()))
    }

    /// Fails with `StoreTimeout` if the deadline has passed.
    pub fn check(&self, operation: &str) -> KvDocResult<()> {
        if self.is_expired() {
            log::error!("Deadline exceeded before {}", operation);
            return Err(KvDocError::new(
                &format!("Deadline exceeded before {}", operation),
                ErrorKind::StoreTimeout,
            ));
        }
        Ok(())
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Deadline::none()
    }
}
