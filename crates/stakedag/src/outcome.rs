//! Process-boundary reporting.
//!
//! A command either produces a confirmation message or fails. Failures are
//! reported with the root cause of the error chain and a non-zero exit code;
//! intermediate context is dropped from the message.

use std::future::Future;

use crate::error::{ClientError, Result};

/// What a shell wrapper prints and exits with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub message: String,
    pub exit_code: i32,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Turn a command result into an [`Outcome`].
pub fn report(result: Result<String>) -> Outcome {
    match result {
        Ok(message) => Outcome {
            message,
            exit_code: 0,
        },
        Err(err) => {
            let err = anyhow::Error::new(err);
            Outcome {
                message: err.root_cause().to_string(),
                exit_code: 1,
            }
        }
    }
}

/// Run a command and report its result.
pub async fn guarded<F, Fut>(command: F) -> Outcome
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = std::result::Result<String, ClientError>>,
{
    report(command().await)
}
