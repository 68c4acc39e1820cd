//! Backend error types.

/// Errors reported by a [`GpuBackend`](super::GpuBackend).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Failed to allocate a command-recording context.
    ContextCreationFailed(String),
    /// A context created by a different backend was handed back for submission.
    ForeignContext,
    /// Submission to the device queue failed.
    SubmissionFailed(String),
    /// The device was lost.
    DeviceLost,
    /// Internal backend error.
    Internal(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ContextCreationFailed(msg) => write!(f, "context creation failed: {msg}"),
            Self::ForeignContext => write!(f, "command context belongs to another backend"),
            Self::SubmissionFailed(msg) => write!(f, "queue submission failed: {msg}"),
            Self::DeviceLost => write!(f, "GPU device lost"),
            Self::Internal(msg) => write!(f, "internal backend error: {msg}"),
        }
    }
}

impl std::error::Error for BackendError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(BackendError::DeviceLost.to_string(), "GPU device lost");
        assert_eq!(
            BackendError::SubmissionFailed("queue full".to_string()).to_string(),
            "queue submission failed: queue full"
        );
    }
}
