// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Trusted confirmation core
//!
//! This provides a [Workflow][session::Workflow] for asking a trusted,
//! tamper-evident UI to show a short text and an opaque extra-data blob to a
//! human, then signing the integrity-protected record of what was shown with
//! a confirmation-bound key held in a secure key store.
//!
//! The trusted UI and the key store are platform collaborators, provided via
//! the [ConfirmationUi][prompt::ConfirmationUi] and [KeyStore][keys::KeyStore]
//! traits. See `confirm-sim` for a software implementation of both.
//!
//! ## Operations
//!
//! ### Key setup
//!
//! [`KeyManager::ensure_key`][keys::KeyManager::ensure_key] generates an ECDSA
//! P-256 signing key under the provided alias if absent, requiring an unlocked
//! device and explicit user confirmation for every use. Existing keys are
//! returned unchanged.
//!
//! ### Confirmation
//!
//! 1. Build a session with [`Workflow::session`][session::Workflow::session],
//!    allocating the session correlation id
//! 2. [`submit`][session::ConfirmationSession::submit] the session, which
//!    validates the request and hands it to the trusted UI, failing
//!    synchronously where the UI is busy or unsupported
//! 3. The UI reports exactly one outcome; on confirmation the returned record
//!    is decoded for display and the _exact_ returned bytes are signed
//! 4. Await the [`SessionOutcome`][session::SessionOutcome] via the
//!    [`PendingSession`][session::PendingSession]
//!
//! Decoding and signing failures after confirmation are logged and reported
//! in the [`Confirmation`][session::Confirmation], never raised, as the
//! confirmation itself is the primary result.
//!

pub mod helpers;

pub mod keys;

pub mod prompt;

pub mod record;

pub mod session;

mod sink;
pub use sink::{LogCrateSink, LogSink};

mod error;
pub use error::{Error, SigningError, SigningFailure, UnavailableKind};
