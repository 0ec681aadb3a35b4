// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Trusted confirmation demo application
//!
//! This wires a [Workflow] to a [LogView] and provides the demo operations:
//! welcome, key setup, showing a prompt once or twice back-to-back, and
//! deliberately re-signing or tampering with confirmed data to demonstrate
//! the single-use binding between an approval and a signature.

use std::{sync::Arc, time::Duration};

use log::debug;

use confirm_core::{
    helpers::to_hex,
    keys::{KeyHandle, KeyManager, KeyStore, Signature},
    prompt::ConfirmationUi,
    session::{Confirmation, PendingSession, SessionOutcome, Workflow},
    LogSink,
};
use confirm_sim::{Responder, SimKeyStore, SimPrompt};

use crate::{AppConfig, Error, LogView};

/// Demo application over a [ConfirmationUi] and [KeyStore]
pub struct App<U: ConfirmationUi, S: KeyStore> {
    workflow: Workflow<U, S>,
    view: Arc<LogView>,
    user_timeout: Duration,
}

/// Application over the simulated platform binding
pub type SimApp = App<SimPrompt, Arc<SimKeyStore>>;

impl SimApp {
    /// Create an application using the simulated UI and key store
    pub fn sim(config: &AppConfig, responder: Responder) -> Result<(Self, Arc<SimKeyStore>), Error> {
        let (ui, store) = match config.unsupported {
            true => (SimPrompt::unsupported(), Arc::new(SimKeyStore::new())),
            false => confirm_sim::pair(responder),
        };

        if config.locked {
            store.lock();
        }

        let app = App::new(ui, store.clone(), config)?;

        Ok((app, store))
    }

    /// Approve the confirmed data again before each of a tampered and an
    /// unaltered signing attempt, returning both results in that order
    ///
    /// With a live approval in place the tampered attempt is refused for
    /// its content alone, while the unaltered data still signs.
    pub fn tamper_reapproved(
        &self,
        c: &Confirmation,
    ) -> (Result<Signature, Error>, Result<Signature, Error>) {
        let store = self.workflow.keys().store();

        self.view
            .log(&format!("[{}] approving confirmed data again", c.id));
        store.approve(&c.data);
        let tampered = self.tamper(c);

        self.view
            .log(&format!("[{}] approving confirmed data again", c.id));
        store.approve(&c.data);
        let original = self.resign(c);

        (tampered, original)
    }
}

impl<U: ConfirmationUi, S: KeyStore + 'static> App<U, S> {
    /// Create a new application
    pub fn new(ui: U, store: S, config: &AppConfig) -> Result<Self, Error> {
        let view = Arc::new(LogView::new());

        let workflow = Workflow::new_with_sink(
            ui,
            KeyManager::new(store),
            config.workflow(),
            view.clone(),
        )
        .with_executor(config.executor()?);

        Ok(Self {
            workflow,
            view,
            user_timeout: config.user_timeout(),
        })
    }

    pub fn workflow(&self) -> &Workflow<U, S> {
        &self.workflow
    }

    pub fn view(&self) -> &LogView {
        &self.view
    }

    /// Log whether trusted confirmation is supported and how to use it
    pub fn welcome(&self) -> bool {
        let supported = self.workflow.ui().is_supported();

        if supported {
            self.view.log("Trusted confirmation is supported on this device.");
            self.view.log(
                "Enter a prompt and extra data, then show the confirmation. \
                Showing twice in a row demonstrates a refused second prompt.",
            );
        } else {
            self.view
                .log("Trusted confirmation is NOT supported on this device.");
        }

        supported
    }

    /// Ensure the signing key exists, listing the store's aliases
    pub fn setup_key(&self) -> Result<KeyHandle, Error> {
        let alias = self.workflow.key_alias();
        let keys = self.workflow.keys();

        let existed = keys.list_aliases()?.contains(alias);

        let h = match keys.ensure_key(alias) {
            Ok(h) => h,
            Err(e) => {
                self.view.error("Key setup failed", &e);
                return Err(e.into());
            }
        };

        match existed {
            true => self.view.log(&format!("Using existing key '{}'", alias)),
            false => self.view.log(&format!("New key '{}' generated", alias)),
        }
        self.view
            .log(&format!("Public key: {}", to_hex(&h.public_key_bytes())));

        let aliases = keys.list_aliases()?;
        self.view.log(&format!("Keys in store ({}):", aliases.len()));
        for a in &aliases {
            self.view.log(&format!("  {}", a));
        }

        Ok(h)
    }

    /// Welcome the user and setup the signing key
    pub fn start(&self) -> Result<KeyHandle, Error> {
        self.welcome();

        let h = self.setup_key()?;

        self.view.log("Now it's your turn ...");

        Ok(h)
    }

    /// Submit a prompt, failing synchronously where refused
    pub fn submit(&self, prompt: &str, extra: &[u8]) -> Result<PendingSession, Error> {
        let p = self.workflow.show(prompt, extra.to_vec())?;
        Ok(p)
    }

    /// Await the outcome of a submitted prompt
    pub async fn outcome(&self, pending: PendingSession) -> Result<SessionOutcome, Error> {
        let id = pending.id();

        debug!("[{}] awaiting outcome", id);

        let o = tokio::time::timeout(self.user_timeout, pending.outcome()).await?;

        debug!("[{}] outcome: {:?}", id, o.state());

        Ok(o)
    }

    /// Show a prompt and await its outcome
    pub async fn show(&self, prompt: &str, extra: &[u8]) -> Result<SessionOutcome, Error> {
        let p = self.submit(prompt, extra)?;
        self.outcome(p).await
    }

    /// Show the same prompt twice back-to-back
    ///
    /// The second request is refused while the first is presenting, each
    /// result is reported independently.
    pub async fn show_twice(
        &self,
        prompt: &str,
        extra: &[u8],
    ) -> (
        Result<SessionOutcome, Error>,
        Result<SessionOutcome, Error>,
    ) {
        let first = self.submit(prompt, extra);
        let second = self.submit(prompt, extra);

        let wait = |p: Result<PendingSession, Error>| async move {
            match p {
                Ok(p) => self.outcome(p).await,
                Err(e) => Err(e),
            }
        };

        futures::join!(wait(first), wait(second))
    }

    /// Attempt to sign previously confirmed data again
    pub fn resign(&self, c: &Confirmation) -> Result<Signature, Error> {
        self.view
            .log(&format!("[{}] signing confirmed data again", c.id));

        let s = self.workflow.resign(c)?;
        Ok(s)
    }

    /// Attempt to sign confirmed data with one byte altered
    ///
    /// Once the confirmation has been signed its approval is used up, so
    /// this fails the same way as [App::resign] whatever the data. See
    /// [SimApp::tamper_reapproved] for a refusal caused by the altered bytes.
    pub fn tamper(&self, c: &Confirmation) -> Result<Signature, Error> {
        let mut data = c.data.clone();
        match data.last_mut() {
            Some(b) => *b ^= 0x01,
            None => return Err(Error::EmptyConfirmation),
        }

        self.view
            .log(&format!("[{}] signing tampered data", c.id));

        let s = self.workflow.sign_for(c.id, &data)?;
        Ok(s)
    }
}
