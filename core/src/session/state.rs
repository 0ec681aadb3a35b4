// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, error};
use strum::{Display, EnumIter, EnumString, EnumVariantNames};

use crate::{prompt::UiOutcome, Error};

/// Correlation id tagging all output for a session
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct SessionId(u64);

impl SessionId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process-wide source of [SessionId]s, starting at 1
#[derive(Debug, Default)]
pub struct CorrelationCounter(AtomicU64);

impl CorrelationCounter {
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Allocate the next id
    pub fn next(&self) -> SessionId {
        SessionId(self.0.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Most recently allocated id, if any
    pub fn last(&self) -> Option<SessionId> {
        match self.0.load(Ordering::Relaxed) {
            0 => None,
            n => Some(SessionId(n)),
        }
    }
}

/// Confirmation session state
#[derive(Copy, Clone, PartialEq, Eq, Debug, EnumString, Display, EnumVariantNames, EnumIter)]
pub enum SessionState {
    /// Request being assembled
    Building,
    /// Request handed to the trusted UI, awaiting outcome
    Submitted,
    /// Request refused before presentation
    Rejected,
    /// User approved
    Confirmed,
    /// User declined
    Dismissed,
    /// Prompt withdrawn
    Canceled,
    /// Prompt failed
    Errored,
}

/// Session state machine inputs
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumIter)]
pub enum Event {
    Submit,
    Reject,
    Confirm,
    Dismiss,
    Cancel,
    Fail,
}

impl From<&UiOutcome> for Event {
    fn from(o: &UiOutcome) -> Self {
        match o {
            UiOutcome::Confirmed(_) => Event::Confirm,
            UiOutcome::Dismissed => Event::Dismiss,
            UiOutcome::Canceled => Event::Cancel,
            UiOutcome::Errored(_) => Event::Fail,
        }
    }
}

impl SessionState {
    /// Whether no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionState::Building | SessionState::Submitted)
    }

    /// Compute the state following `evt`
    pub fn next(self, evt: Event) -> Result<SessionState, Error> {
        use SessionState::*;

        let next = match (self, evt) {
            (Building, Event::Submit) => Submitted,

            // Local validation failure, or synchronous refusal by the UI
            (Building | Submitted, Event::Reject) => Rejected,

            (Submitted, Event::Confirm) => Confirmed,
            (Submitted, Event::Dismiss) => Dismissed,
            (Submitted, Event::Cancel) => Canceled,
            (Submitted, Event::Fail) => Errored,

            (state, event) => {
                error!("Unexpected event {} in state {}", event, state);
                return Err(Error::InvalidTransition { state, event });
            }
        };

        debug!("session {} -> {} ({})", self, next, evt);

        Ok(next)
    }
}
