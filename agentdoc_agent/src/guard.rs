use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::AgentError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteState {
    Idle,
    WriteInProgress,
}

/// Single-writer flag for one entity.
///
/// A second write never queues: [`try_acquire`](Self::try_acquire) fails
/// immediately while a [`WriteToken`] is alive. The token clears the flag
/// when dropped, which covers early returns, errors, panics and futures
/// dropped mid-flight.
#[derive(Debug, Default)]
pub struct WriteGuard {
    in_progress: AtomicBool,
}

impl WriteGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Result<WriteToken<'_>, AgentError> {
        self.in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| WriteToken { guard: self })
            .map_err(|_| AgentError::WriteInProgress)
    }

    pub fn state(&self) -> WriteState {
        if self.in_progress.load(Ordering::Acquire) {
            WriteState::WriteInProgress
        } else {
            WriteState::Idle
        }
    }
}

#[must_use = "the write guard is released as soon as the token is dropped"]
#[derive(Debug)]
pub struct WriteToken<'a> {
    guard: &'a WriteGuard,
}

impl Drop for WriteToken<'_> {
    fn drop(&mut self) {
        self.guard.in_progress.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_release() {
        let guard = WriteGuard::new();
        let token = guard.try_acquire().unwrap();
        assert_eq!(guard.state(), WriteState::WriteInProgress);
        assert!(matches!(
            guard.try_acquire(),
            Err(AgentError::WriteInProgress)
        ));
        drop(token);
        assert_eq!(guard.state(), WriteState::Idle);
        assert!(guard.try_acquire().is_ok());
    }

    #[test]
    fn released_on_panic() {
        let guard = WriteGuard::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _token = guard.try_acquire().unwrap();
            panic!("boom");
        }));
        assert!(result.is_err());
        assert_eq!(guard.state(), WriteState::Idle);
    }
}
