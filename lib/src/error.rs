// Copyright (c) 2022-2023 The MobileCoin Foundation

use tokio::time::error::Elapsed;

/// Confirmation application error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Workflow error
    #[error(transparent)]
    Workflow(#[from] confirm_core::Error),

    /// Timeout waiting for the user to respond
    #[error("Timeout waiting for user interaction")]
    UserTimeout,

    /// Tokio executor requested outside of a runtime
    #[error("No tokio runtime available for callback executor")]
    NoRuntime,

    /// Confirmation has no data to alter
    #[error("Confirmed data is empty")]
    EmptyConfirmation,
}

impl From<Elapsed> for Error {
    fn from(_: Elapsed) -> Self {
        Error::UserTimeout
    }
}
