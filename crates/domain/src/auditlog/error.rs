use thiserror::Error;

/// Failure of the key-value storage collaborator.
///
/// Storage errors are transient from the receiver's point of view: the
/// ingest path surfaces them as a server error, the reprocessor logs and
/// retries on the next tick.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("storage codec error: {0}")]
    Codec(String),

    #[error("storage client closed")]
    Closed,
}

/// Failure of the downstream log consumer.
#[derive(Debug, Error)]
#[error("consumer rejected batch: {0}")]
pub struct ConsumerError(pub String);

/// Error taxonomy of the ingest path.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Malformed body, unknown content type, or a stored entry that no
    /// longer decodes. Permanent — retrying the same payload cannot help.
    #[error("bad payload: {0}")]
    BadPayload(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Consumer(#[from] ConsumerError),

    /// The circuit breaker refused the attempt. Not a delivery failure:
    /// the entry stays persisted and the reprocessor retries later.
    #[error("circuit breaker open, delivery deferred")]
    BreakerOpen,
}

impl IngestError {
    /// Permanent errors are not retried by the reprocessor.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::BadPayload(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_payload_is_permanent() {
        assert!(IngestError::BadPayload("garbage".to_string()).is_permanent());
        assert!(!IngestError::BreakerOpen.is_permanent());
        assert!(!IngestError::from(ConsumerError("down".to_string())).is_permanent());
        assert!(!IngestError::from(StorageError::Backend("io".to_string())).is_permanent());
    }

    #[test]
    fn storage_error_converts() {
        let err: IngestError = StorageError::Closed.into();
        assert!(matches!(err, IngestError::Storage(StorageError::Closed)));
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = IngestError::BadPayload("trailing bytes".to_string());
        assert_eq!(err.to_string(), "bad payload: trailing bytes");

        let err = IngestError::BreakerOpen;
        assert!(err.to_string().contains("circuit breaker"));
    }
}
