// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use log::{debug, warn};
use serde_cbor::Value;
use strum::{Display, EnumString, EnumVariantNames};

use confirm_core::prompt::{ConfirmationRequest, ConfirmationUi, Delivery, PresentError, UiOutcome};

use crate::SimKeyStore;

/// Simulated user response to a prompt
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumString, EnumVariantNames)]
#[strum(serialize_all = "snake_case")]
pub enum UserAction {
    /// Approve the prompt
    Confirm,
    /// Decline the prompt
    Dismiss,
    /// Withdraw the prompt
    Cancel,
    /// Fail the prompt
    Fail,
}

/// How the simulated user responds to presented prompts
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Responder {
    /// Respond immediately, before `present` returns
    Auto(UserAction),
    /// Respond after a delay (requires a tokio runtime, otherwise manual)
    Delayed(UserAction, Duration),
    /// Respond only via [SimPrompt::respond]
    Manual,
}

/// Prompt awaiting a response
struct Pending {
    delivery: Delivery,
    payload: Vec<u8>,
}

/// Simulated trusted confirmation UI
///
/// Only one prompt may be presented at a time. Confirmed prompts return a
/// CBOR map of the `prompt` text and `extra` data, which is also recorded as
/// approved with the attached [SimKeyStore].
pub struct SimPrompt {
    supported: bool,
    responder: Responder,
    store: Option<Arc<SimKeyStore>>,
    pending: Arc<Mutex<Option<Pending>>>,
}

impl SimPrompt {
    pub fn new(responder: Responder) -> Self {
        Self {
            supported: true,
            responder,
            store: None,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    /// Simulate a device without trusted confirmation support
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new(Responder::Manual)
        }
    }

    /// Attach a key store to receive approvals
    pub fn with_store(mut self, store: Arc<SimKeyStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Check whether a prompt is currently presented
    pub fn is_presenting(&self) -> bool {
        lock(&self.pending).is_some()
    }

    /// Respond to the presented prompt, returning false if none is presented
    pub fn respond(&self, action: UserAction) -> bool {
        respond(&self.pending, self.store.as_deref(), action)
    }
}

fn lock(p: &Mutex<Option<Pending>>) -> MutexGuard<'_, Option<Pending>> {
    p.lock().unwrap_or_else(PoisonError::into_inner)
}

fn respond(pending: &Mutex<Option<Pending>>, store: Option<&SimKeyStore>, action: UserAction) -> bool {
    // Release the prompt before delivery so callbacks may present again
    let p = match lock(pending).take() {
        Some(p) => p,
        None => return false,
    };

    debug!("user action: {}", action);

    let outcome = match action {
        UserAction::Confirm => {
            if let Some(s) = store {
                s.approve(&p.payload);
            }
            UiOutcome::Confirmed(p.payload)
        }
        UserAction::Dismiss => UiOutcome::Dismissed,
        UserAction::Cancel => UiOutcome::Canceled,
        UserAction::Fail => UiOutcome::Errored("simulated prompt failure".to_string()),
    };

    p.delivery.deliver(outcome);

    true
}

/// Encode the record of what was shown
fn encode_payload(request: &ConfirmationRequest) -> Result<Vec<u8>, PresentError> {
    let mut m = BTreeMap::new();
    m.insert(
        Value::Text("prompt".to_string()),
        Value::Text(request.prompt_text().to_string()),
    );
    m.insert(
        Value::Text("extra".to_string()),
        Value::Bytes(request.extra_data().to_vec()),
    );

    serde_cbor::to_vec(&Value::Map(m)).map_err(|e| PresentError::InvalidArgument(e.to_string()))
}

impl ConfirmationUi for SimPrompt {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn present(&self, request: &ConfirmationRequest, delivery: Delivery) -> Result<(), PresentError> {
        if !self.supported {
            return Err(PresentError::NotAvailable);
        }

        request
            .validate()
            .map_err(|e| PresentError::InvalidArgument(e.to_string()))?;

        let payload = encode_payload(request)?;

        {
            let mut p = lock(&self.pending);
            if p.is_some() {
                return Err(PresentError::AlreadyPresenting);
            }
            *p = Some(Pending { delivery, payload });
        }

        debug!("presenting prompt: '{}'", request.prompt_text());

        match self.responder {
            Responder::Auto(action) => {
                respond(&self.pending, self.store.as_deref(), action);
            }
            Responder::Delayed(action, delay) => match tokio::runtime::Handle::try_current() {
                Ok(h) => {
                    let pending = self.pending.clone();
                    let store = self.store.clone();
                    h.spawn(async move {
                        tokio::time::sleep(delay).await;
                        respond(&pending, store.as_deref(), action);
                    });
                }
                Err(_) => warn!("no runtime for delayed response, awaiting manual response"),
            },
            Responder::Manual => (),
        }

        Ok(())
    }
}
