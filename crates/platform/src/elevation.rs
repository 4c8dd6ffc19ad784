//! Privilege elevation
//!
//! One token is acquired per run. Privileged operations call
//! [`ElevationToken::require`] right before they touch anything, so a token
//! revoked mid-run turns every remaining privileged step into an
//! authorization error instead of a half-applied change.

use async_trait::async_trait;
use ifw_errors::{AuthorizationError, Error};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Proof that elevated rights were granted for this run
#[derive(Debug, Clone)]
pub struct ElevationToken {
    granted: Arc<AtomicBool>,
}

impl ElevationToken {
    /// A token that was never granted
    #[must_use]
    pub fn none() -> Self {
        Self {
            granted: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn granted() -> Self {
        Self {
            granted: Arc::new(AtomicBool::new(true)),
        }
    }

    #[must_use]
    pub fn is_granted(&self) -> bool {
        self.granted.load(Ordering::Acquire)
    }

    /// Drop the rights for every clone of this token
    pub fn revoke(&self) {
        self.granted.store(false, Ordering::Release);
    }

    /// Fail unless the token is still valid
    ///
    /// # Errors
    ///
    /// `NotElevated` if rights were never granted.
    pub fn require(&self, operation: &str) -> Result<(), AuthorizationError> {
        if self.is_granted() {
            Ok(())
        } else {
            Err(AuthorizationError::NotElevated {
                operation: operation.to_string(),
            })
        }
    }
}

impl Default for ElevationToken {
    fn default() -> Self {
        Self::none()
    }
}

/// Source of elevated rights; the prompt itself lives outside the engine
#[async_trait]
pub trait ElevationProvider: Send + Sync {
    /// Acquire (or re-acquire) elevated rights
    async fn acquire(&self) -> Result<ElevationToken, Error>;
}

/// Grants or denies elevation from configuration, without prompting
#[derive(Debug, Clone, Copy)]
pub struct StaticElevation {
    allow: bool,
}

impl StaticElevation {
    #[must_use]
    pub fn new(allow: bool) -> Self {
        Self { allow }
    }
}

#[async_trait]
impl ElevationProvider for StaticElevation {
    async fn acquire(&self) -> Result<ElevationToken, Error> {
        if self.allow {
            tracing::debug!("elevation granted");
            Ok(ElevationToken::granted())
        } else {
            Err(AuthorizationError::ElevationDenied {
                reason: "elevation is disabled in the installer configuration".to_string(),
            }
            .into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_revoke_affects_clones() {
        let token = StaticElevation::new(true).acquire().await.unwrap();
        let clone = token.clone();
        assert!(clone.require("ElevatedExecute").is_ok());
        token.revoke();
        assert!(matches!(
            clone.require("ElevatedExecute"),
            Err(AuthorizationError::NotElevated { .. })
        ));
    }

    #[tokio::test]
    async fn test_denied() {
        let err = StaticElevation::new(false).acquire().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Authorization(AuthorizationError::ElevationDenied { .. })
        ));
        assert!(!ElevationToken::default().is_granted());
    }
}
