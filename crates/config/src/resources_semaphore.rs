//! Semaphore utilities for resource management
//!
//! Bounded worker pools (parallel downloads) acquire permits through these
//! helpers so that a closed semaphore surfaces as a typed error.

use ifw_errors::Error;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Acquire a semaphore permit
///
/// # Errors
///
/// Returns an error if the semaphore is closed
pub async fn acquire_semaphore_permit(
    semaphore: Arc<Semaphore>,
    operation: &str,
) -> Result<OwnedSemaphorePermit, Error> {
    semaphore
        .acquire_owned()
        .await
        .map_err(|_| Error::internal(format!("failed to acquire semaphore for {operation}")))
}

/// Try to acquire a semaphore permit without waiting
///
/// Returns `Ok(None)` if no permit is free.
///
/// # Errors
///
/// Returns an error if the semaphore is closed.
pub fn try_acquire_semaphore_permit(
    semaphore: &Arc<Semaphore>,
) -> Result<Option<OwnedSemaphorePermit>, Error> {
    match semaphore.clone().try_acquire_owned() {
        Ok(permit) => Ok(Some(permit)),
        Err(tokio::sync::TryAcquireError::NoPermits) => Ok(None),
        Err(tokio::sync::TryAcquireError::Closed) => {
            Err(Error::internal("semaphore is closed"))
        }
    }
}

/// Create a semaphore with at least one permit
#[must_use]
pub fn create_semaphore(permits: usize) -> Arc<Semaphore> {
    Arc::new(Semaphore::new(permits.max(1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_permits_are_bounded() {
        let semaphore = create_semaphore(1);
        let first = acquire_semaphore_permit(semaphore.clone(), "test")
            .await
            .unwrap();
        assert!(try_acquire_semaphore_permit(&semaphore).unwrap().is_none());
        drop(first);
        assert!(try_acquire_semaphore_permit(&semaphore).unwrap().is_some());
    }

    #[test]
    fn test_zero_permits_rounds_up() {
        assert_eq!(create_semaphore(0).available_permits(), 1);
    }
}
