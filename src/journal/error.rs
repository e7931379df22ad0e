//! Error taxonomy for journal operations.
//!
//! Not-found is a soft condition and never appears here; read and delete
//! paths return `Ok(None)` / `Ok(false)` instead. The variants below are the
//! hard conditions callers can match on with `Error::downcast_ref`.

use thiserror::Error;

/// A hard failure from a journal operation.
#[derive(Debug, Error)]
pub enum JournalError {
    /// Input rejected before any I/O (empty/oversized content, bad tag name,
    /// unknown grouping period).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A caller-side contract was broken: a relationship endpoint or merge
    /// source that does not exist. The message names the missing id.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Security-class rejection, distinct from ordinary validation: an
    /// injection-pattern match on a structured filter value, or a path
    /// traversal attempt on a backup filename.
    #[error("security violation: {0}")]
    Security(String),
}

impl JournalError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    pub fn security(msg: impl Into<String>) -> Self {
        Self::Security(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_are_distinguishable_through_anyhow() {
        let err: anyhow::Error = JournalError::security("nope").into();
        match err.downcast_ref::<JournalError>() {
            Some(JournalError::Security(_)) => {}
            other => panic!("expected Security, got {other:?}"),
        }
    }

    #[test]
    fn messages_carry_context() {
        let err = JournalError::precondition("entry 42 not found");
        assert!(err.to_string().contains("entry 42 not found"));
    }
}
