//! Compensating actions for partially completed post operations.
//!
//! | Step                        | Compensation            |
//! |-----------------------------|-------------------------|
//! | write transient file        | remove transient file   |
//! | upload to media store       | destroy uploaded media  |
//! | insert post record          | (last step, none)       |
//!
//! Every compensation is idempotent: removing a missing file or destroying a
//! missing resource succeeds. That makes retrying safe.

use std::path::PathBuf;
use std::time::Duration;

use picshare_shared::MediaConfig;
use tracing::{error, warn};

use crate::media::MediaStore;
use crate::upload::remove_if_exists;

/// An action that undoes one completed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    /// Remove a transient local file.
    RemoveTransientFile(PathBuf),
    /// Destroy an uploaded media resource.
    DestroyMedia(String),
}

/// How hard to try before giving up on a compensation.
#[derive(Debug, Clone, Copy)]
pub struct CompensationPolicy {
    /// Total attempts, at least one.
    pub attempts: u32,
    /// Pause between attempts.
    pub retry_delay: Duration,
}

impl CompensationPolicy {
    /// Build the policy from media configuration.
    #[must_use]
    pub fn from_config(config: &MediaConfig) -> Self {
        Self {
            attempts: config.compensation_attempts,
            retry_delay: Duration::from_millis(config.compensation_retry_delay_ms),
        }
    }
}

impl Default for CompensationPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            retry_delay: Duration::from_millis(200),
        }
    }
}

impl Compensation {
    async fn run_once(&self, media: &dyn MediaStore) -> Result<(), String> {
        match self {
            Self::RemoveTransientFile(path) => {
                remove_if_exists(path).await.map_err(|e| e.to_string())
            }
            Self::DestroyMedia(public_id) => {
                media.destroy(public_id).await.map_err(|e| e.to_string())
            }
        }
    }

    /// Run the compensation, retrying per `policy`.
    ///
    /// Failures are logged, never returned: a compensation only runs while
    /// the surrounding operation is already failing or finishing, and its
    /// outcome must not replace that result. Returns whether it succeeded.
    pub async fn run(&self, media: &dyn MediaStore, policy: CompensationPolicy) -> bool {
        let attempts = policy.attempts.max(1);

        for attempt in 1..=attempts {
            match self.run_once(media).await {
                Ok(()) => return true,
                Err(reason) if attempt < attempts => {
                    warn!(
                        compensation = ?self,
                        attempt,
                        error = %reason,
                        "Compensation failed, retrying"
                    );
                    tokio::time::sleep(policy.retry_delay).await;
                }
                Err(reason) => {
                    error!(
                        compensation = ?self,
                        attempts,
                        error = %reason,
                        "Compensation abandoned"
                    );
                }
            }
        }

        false
    }
}
