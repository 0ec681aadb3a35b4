// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Trusted confirmation UI collaborator interface
//!
//! A [ConfirmationUi] presents a [ConfirmationRequest] to the user and reports
//! exactly one [UiOutcome] through the [Delivery] it was handed, on the
//! [Executor] chosen by the integrator.

use std::sync::Arc;

use crate::Error;

/// Text and extra data to be shown to the user
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ConfirmationRequest {
    prompt_text: String,
    extra_data: Vec<u8>,
}

impl ConfirmationRequest {
    pub fn new(prompt_text: impl Into<String>, extra_data: impl Into<Vec<u8>>) -> Self {
        Self {
            prompt_text: prompt_text.into(),
            extra_data: extra_data.into(),
        }
    }

    pub fn prompt_text(&self) -> &str {
        &self.prompt_text
    }

    pub fn extra_data(&self) -> &[u8] {
        &self.extra_data
    }

    /// Check the request is acceptable to the trusted UI
    ///
    /// Prompt text must be non-empty and free of control characters
    /// (including newlines), extra data may be empty.
    pub fn validate(&self) -> Result<(), Error> {
        if self.prompt_text.is_empty() {
            return Err(Error::InvalidRequest("prompt text is empty".to_string()));
        }

        if let Some(c) = self.prompt_text.chars().find(|c| c.is_control()) {
            return Err(Error::InvalidRequest(format!(
                "prompt text contains control character {:?}",
                c
            )));
        }

        Ok(())
    }
}

/// Outcome reported by the trusted UI, exactly one per presented request
#[derive(Clone, PartialEq, Eq, Debug, strum::Display)]
pub enum UiOutcome {
    /// User approved, carries the integrity-protected record of what was shown
    Confirmed(Vec<u8>),
    /// User declined
    Dismissed,
    /// Prompt withdrawn by the system or application
    Canceled,
    /// Prompt failed
    Errored(String),
}

/// Synchronous rejections raised when presenting a prompt
#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
pub enum PresentError {
    /// Another prompt is currently visible
    #[error("another confirmation is already being presented")]
    AlreadyPresenting,

    /// Device does not support trusted confirmation
    #[error("trusted confirmation is not supported on this device")]
    NotAvailable,

    /// Request refused by the UI
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Executor for outcome callbacks
pub trait Executor: Send + Sync {
    fn execute(&self, task: Box<dyn FnOnce() + Send>);
}

/// Run callbacks directly on the thread delivering the outcome
#[derive(Copy, Clone, Debug, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, task: Box<dyn FnOnce() + Send>) {
        task()
    }
}

/// Run callbacks as blocking tasks on a tokio runtime
#[derive(Clone, Debug)]
pub struct TokioExecutor {
    handle: tokio::runtime::Handle,
}

impl TokioExecutor {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime of the current context, if any
    pub fn current() -> Option<Self> {
        tokio::runtime::Handle::try_current().ok().map(Self::new)
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, task: Box<dyn FnOnce() + Send>) {
        // Signing may block on the key store. The task is detached so a
        // panic is not observed here, session callbacks catch their own
        let _ = self.handle.spawn_blocking(task);
    }
}

/// Outcome callback registered when presenting a request
pub type OutcomeCallback = Box<dyn FnOnce(UiOutcome) + Send + 'static>;

/// Callback / executor pair through which a [ConfirmationUi] reports the
/// outcome of a presented request. Consumed on delivery.
pub struct Delivery {
    executor: Arc<dyn Executor>,
    callback: OutcomeCallback,
}

impl Delivery {
    pub fn new(executor: Arc<dyn Executor>, callback: OutcomeCallback) -> Self {
        Self { executor, callback }
    }

    /// Report the outcome, running the callback on the registered executor
    pub fn deliver(self, outcome: UiOutcome) {
        let Self { executor, callback } = self;
        executor.execute(Box::new(move || callback(outcome)));
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery").finish_non_exhaustive()
    }
}

/// [ConfirmationUi] trait provides access to a trusted confirmation UI
pub trait ConfirmationUi: Send + Sync {
    /// Check whether trusted confirmation is supported on this device
    fn is_supported(&self) -> bool;

    /// Present `request` to the user.
    ///
    /// On success the outcome is later reported exactly once via `delivery`,
    /// possibly before this call returns. On error `delivery` is dropped
    /// without being invoked.
    fn present(&self, request: &ConfirmationRequest, delivery: Delivery) -> Result<(), PresentError>;
}

impl<T: ConfirmationUi + ?Sized> ConfirmationUi for Arc<T> {
    fn is_supported(&self) -> bool {
        T::is_supported(self)
    }

    fn present(&self, request: &ConfirmationRequest, delivery: Delivery) -> Result<(), PresentError> {
        T::present(self, request, delivery)
    }
}
