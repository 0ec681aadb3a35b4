// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Software platform binding for the confirmation workflow
//!
//! [SimPrompt] stands in for the trusted confirmation UI and [SimKeyStore]
//! for the hardware-backed key store. A shared store may be attached to the
//! prompt so confirmations authorise signing exactly as on a device: each
//! approval permits a single signature over exactly the confirmed bytes.

use std::sync::Arc;

mod prompt;
pub use prompt::{Responder, SimPrompt, UserAction};

mod store;
pub use store::SimKeyStore;

/// Create a prompt and key store linked for confirmation-bound signing
pub fn pair(responder: Responder) -> (SimPrompt, Arc<SimKeyStore>) {
    let store = Arc::new(SimKeyStore::new());
    let prompt = SimPrompt::new(responder).with_store(store.clone());

    (prompt, store)
}
