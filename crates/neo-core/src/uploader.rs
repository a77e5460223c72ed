use crate::error::{NeoError, UploadError};
use crate::retry::{RetryFailure, RetryPolicy, Sleep};
use crate::storage::BlobStore;
use tracing::error;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Writes blobs into one container, retrying transient backend errors.
pub struct Uploader<'a, S> {
    store: S,
    container: String,
    policy: RetryPolicy,
    sleeper: &'a dyn Sleep,
}

impl<'a, S: BlobStore> Uploader<'a, S> {
    pub fn new(store: S, container: &str, policy: RetryPolicy, sleeper: &'a dyn Sleep) -> Self {
        Self {
            store,
            container: container.to_string(),
            policy,
            sleeper,
        }
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// Only `Transient` errors are retried. Not-found and other rejections
    /// return after the first attempt.
    pub fn upload_with_retry(&self, blob: &str, content: &[u8]) -> Result<(), UploadError> {
        let result = self.policy.run(
            self.sleeper,
            |attempt| {
                let result =
                    self.store
                        .put_blob(&self.container, blob, content, JSON_CONTENT_TYPE);
                if let Err(err) = &result {
                    error!(blob, attempt, error = %err, "upload attempt failed");
                }
                result
            },
            NeoError::is_transient,
        );
        match result {
            Ok(()) => Ok(()),
            Err(RetryFailure::Exhausted { attempts, error }) => {
                error!(
                    critical = true,
                    blob,
                    attempts,
                    "max retries reached, failed to upload blob"
                );
                Err(UploadError::Exhausted {
                    blob: blob.to_string(),
                    attempts,
                    source: error,
                })
            }
            Err(RetryFailure::Rejected { error, .. }) if error.is_not_found() => {
                Err(UploadError::NotFound {
                    blob: blob.to_string(),
                    source: error,
                })
            }
            Err(RetryFailure::Rejected { error, .. }) => Err(UploadError::Rejected {
                blob: blob.to_string(),
                source: error,
            }),
        }
    }
}
