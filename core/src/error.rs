// Copyright (c) 2022-2023 The MobileCoin Foundation

use crate::{
    keys::StoreError,
    record::DecodeError,
    session::{Event, SessionState},
};

/// Workflow errors
#[derive(Clone, PartialEq, Debug, thiserror::Error)]
pub enum Error {
    /// Request failed local validation, the UI was not contacted
    #[error("invalid confirmation request: {0}")]
    InvalidRequest(String),

    /// Trusted UI refused the request at submission time
    #[error("confirmation prompt unavailable: {0}")]
    PromptUnavailable(UnavailableKind),

    /// Confirmed payload could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Key store rejected key generation
    #[error("key generation failed for '{alias}': {reason}")]
    KeyGeneration { alias: String, reason: StoreError },

    /// Signing failed
    #[error(transparent)]
    Signing(#[from] SigningError),

    /// Alias absent from the key store
    #[error("key '{0}' not found")]
    NotFound(String),

    /// Key store failure outside of generation / signing
    #[error("key store error: {0}")]
    Store(#[from] StoreError),

    /// Event not valid in the current session state
    #[error("invalid session transition (state: {state}, event: {event})")]
    InvalidTransition { state: SessionState, event: Event },

    /// Outcome handling panicked
    #[error("outcome handling failed: {0}")]
    Callback(String),

    /// Outcome delivery released without an outcome
    #[error("confirmation dropped")]
    Dropped,
}

/// Reasons the trusted UI may refuse to present a prompt
#[derive(Copy, Clone, PartialEq, Eq, Debug, strum::Display)]
pub enum UnavailableKind {
    /// Another confirmation is currently being presented
    #[strum(serialize = "already presenting")]
    AlreadyPresenting,

    /// Trusted confirmation is not supported on this device
    #[strum(serialize = "not available")]
    NotAvailable,
}

/// Signing failure, see [SigningFailure] for causes
#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
#[error("signing failed: {reason}")]
pub struct SigningError {
    pub reason: SigningFailure,
}

impl From<SigningFailure> for SigningError {
    fn from(reason: SigningFailure) -> Self {
        Self { reason }
    }
}

/// Causes reported by the key store when refusing to sign
#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
pub enum SigningFailure {
    /// Data does not match the payload most recently approved by the user
    #[error("authorization mismatch")]
    AuthorizationMismatch,

    /// Key requires an unlocked device
    #[error("device locked")]
    DeviceLocked,

    /// Any other platform rejection
    #[error("store rejected: {0}")]
    StoreRejected(String),
}
