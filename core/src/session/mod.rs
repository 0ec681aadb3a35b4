// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Confirmation sessions
//!
//! A [Workflow] is constructed once per process and issues
//! [ConfirmationSession]s, each tagged with the next [SessionId] from its
//! [CorrelationCounter]. Submitting a session hands the request to the
//! [ConfirmationUi] and returns a [PendingSession]; the UI's single outcome
//! callback drives the session to a terminal [SessionState], decoding and
//! signing confirmed data on the way.

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, PoisonError},
};

use log::debug;
use tokio::sync::oneshot::{self, error::TryRecvError};

use crate::{
    helpers::{escape_ascii, to_hex},
    keys::{KeyManager, KeyStore, Signature},
    prompt::{
        ConfirmationRequest, ConfirmationUi, Delivery, Executor, InlineExecutor, PresentError,
        UiOutcome,
    },
    record::{self, ConfirmedRecord, DecodeError},
    sink::{LogCrateSink, LogSink},
    Error, UnavailableKind,
};

mod state;
pub use state::{CorrelationCounter, Event, SessionId, SessionState};

/// Default alias for the confirmation signing key
pub const DEFAULT_KEY_ALIAS: &str = "TestKey";

/// [Workflow] configuration
#[derive(Clone, PartialEq, Debug)]
pub struct WorkflowConfig {
    /// Alias of the key used to sign confirmed data
    pub key_alias: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            key_alias: DEFAULT_KEY_ALIAS.to_string(),
        }
    }
}

/// Result of a confirmed session
#[derive(Clone, PartialEq, Debug)]
pub struct Confirmation {
    pub id: SessionId,
    /// Bytes returned by the trusted UI, exactly as received
    pub data: Vec<u8>,
    /// Decoded form of `data`, for display
    pub record: Result<ConfirmedRecord, DecodeError>,
    /// Signature over `data`
    pub signature: Result<Signature, Error>,
}

/// Terminal outcome of a submitted session
#[derive(Clone, PartialEq, Debug)]
pub enum SessionOutcome {
    Confirmed(Confirmation),
    Dismissed,
    Canceled,
    Errored(String),
}

impl SessionOutcome {
    /// Terminal [SessionState] for this outcome
    pub fn state(&self) -> SessionState {
        match self {
            SessionOutcome::Confirmed(_) => SessionState::Confirmed,
            SessionOutcome::Dismissed => SessionState::Dismissed,
            SessionOutcome::Canceled => SessionState::Canceled,
            SessionOutcome::Errored(_) => SessionState::Errored,
        }
    }

    pub fn confirmation(&self) -> Option<&Confirmation> {
        match self {
            SessionOutcome::Confirmed(c) => Some(c),
            _ => None,
        }
    }
}

/// State shared with outcome callbacks
struct Context<S: KeyStore> {
    keys: KeyManager<S>,
    alias: String,
    sink: Arc<dyn LogSink>,
}

/// [Workflow] issues confirmation sessions and signs confirmed data
pub struct Workflow<U: ConfirmationUi, S: KeyStore> {
    ui: U,
    ctx: Arc<Context<S>>,
    counter: CorrelationCounter,
    executor: Arc<dyn Executor>,
}

impl<U: ConfirmationUi, S: KeyStore + 'static> Workflow<U, S> {
    /// Create a new workflow logging via the [log] facade
    pub fn new(ui: U, keys: KeyManager<S>, config: WorkflowConfig) -> Self {
        Self::new_with_sink(ui, keys, config, Arc::new(LogCrateSink))
    }

    /// Create a new workflow with the provided [LogSink]
    ///
    /// Outcome callbacks run on an [InlineExecutor] unless replaced via
    /// [Workflow::with_executor].
    pub fn new_with_sink(
        ui: U,
        keys: KeyManager<S>,
        config: WorkflowConfig,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            ui,
            ctx: Arc::new(Context {
                keys,
                alias: config.key_alias,
                sink,
            }),
            counter: CorrelationCounter::new(),
            executor: Arc::new(InlineExecutor),
        }
    }

    /// Set the executor on which outcome callbacks run
    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn keys(&self) -> &KeyManager<S> {
        &self.ctx.keys
    }

    pub fn key_alias(&self) -> &str {
        &self.ctx.alias
    }

    pub fn sink(&self) -> &dyn LogSink {
        self.ctx.sink.as_ref()
    }

    /// Most recently issued session id
    pub fn last_id(&self) -> Option<SessionId> {
        self.counter.last()
    }

    /// Build a new session for `request`, allocating its correlation id
    pub fn session(&self, request: ConfirmationRequest) -> ConfirmationSession<'_, U, S> {
        let id = self.counter.next();

        debug!("[{}] new session", id);

        ConfirmationSession {
            id,
            request,
            state: SessionState::Building,
            workflow: self,
        }
    }

    /// Build and submit a session in one step
    pub fn show(
        &self,
        prompt_text: impl Into<String>,
        extra_data: impl Into<Vec<u8>>,
    ) -> Result<PendingSession, Error> {
        self.session(ConfirmationRequest::new(prompt_text, extra_data))
            .submit()
    }

    /// Attempt to sign `data` on behalf of session `id`
    ///
    /// Failures are logged against the session and returned, never raised.
    pub fn sign_for(&self, id: SessionId, data: &[u8]) -> Result<Signature, Error> {
        self.ctx.sign(id, data)
    }

    /// Attempt to sign previously confirmed data again
    pub fn resign(&self, confirmation: &Confirmation) -> Result<Signature, Error> {
        self.ctx.sign(confirmation.id, &confirmation.data)
    }
}

/// Single-use confirmation session, see [Workflow::session]
pub struct ConfirmationSession<'a, U: ConfirmationUi, S: KeyStore> {
    id: SessionId,
    request: ConfirmationRequest,
    state: SessionState,
    workflow: &'a Workflow<U, S>,
}

impl<'a, U: ConfirmationUi, S: KeyStore + 'static> ConfirmationSession<'a, U, S> {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn request(&self) -> &ConfirmationRequest {
        &self.request
    }

    /// Validate the request and hand it to the trusted UI
    ///
    /// Invalid requests fail with [Error::InvalidRequest] without contacting
    /// the UI, synchronous refusals by the UI fail with
    /// [Error::PromptUnavailable]. Otherwise the outcome may be awaited via
    /// the returned [PendingSession].
    pub fn submit(mut self) -> Result<PendingSession, Error> {
        let id = self.id;
        let sink = self.workflow.ctx.sink.clone();

        sink.log(&format!("[{}] start confirmation prompt", id));

        if let Err(e) = self.request.validate() {
            self.state = self.state.next(Event::Reject)?;
            sink.error(&format!("[{}] building confirmation prompt failed", id), &e);
            return Err(e);
        }

        // Enter Submitted before hand-off as the outcome may be delivered
        // before `present` returns
        let state = Arc::new(Mutex::new(self.state.next(Event::Submit)?));
        let (tx, rx) = oneshot::channel();

        let ctx = self.workflow.ctx.clone();
        let s = state.clone();
        let delivery = Delivery::new(
            self.workflow.executor.clone(),
            Box::new(move |outcome| {
                // Report panics via the sink, an unwinding callback would
                // otherwise be seen as a dropped delivery
                let r = panic::catch_unwind(AssertUnwindSafe(|| ctx.complete(id, &s, outcome)));
                let r = r.unwrap_or_else(|p| {
                    let e = Error::Callback(panic_message(p.as_ref()));
                    let _ = transition(&s, Event::Fail);
                    ctx.sink
                        .error(&format!("[{}] handling confirmation outcome failed", id), &e);
                    SessionOutcome::Errored(e.to_string())
                });
                // Caller may not be waiting
                let _ = tx.send(r);
            }),
        );

        if let Err(e) = self.workflow.ui.present(&self.request, delivery) {
            let err = match e {
                PresentError::AlreadyPresenting => {
                    Error::PromptUnavailable(UnavailableKind::AlreadyPresenting)
                }
                PresentError::NotAvailable => Error::PromptUnavailable(UnavailableKind::NotAvailable),
                PresentError::InvalidArgument(m) => Error::InvalidRequest(m),
            };

            transition(&state, Event::Reject)?;
            sink.error(&format!("[{}] presenting confirmation prompt failed", id), &err);

            return Err(err);
        }

        debug!("[{}] confirmation prompt submitted", id);

        Ok(PendingSession {
            id,
            state,
            rx,
            sink,
        })
    }
}

/// Handle to a submitted session awaiting its outcome
pub struct PendingSession {
    id: SessionId,
    state: Arc<Mutex<SessionState>>,
    rx: oneshot::Receiver<SessionOutcome>,
    sink: Arc<dyn LogSink>,
}

impl std::fmt::Debug for PendingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingSession")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl PendingSession {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Await the terminal outcome
    pub async fn outcome(mut self) -> SessionOutcome {
        match (&mut self.rx).await {
            Ok(o) => o,
            Err(_) => self.dropped(),
        }
    }

    /// Fetch the outcome if already delivered, returning the pending
    /// session otherwise
    pub fn try_outcome(mut self) -> Result<SessionOutcome, Self> {
        match self.rx.try_recv() {
            Ok(o) => Ok(o),
            Err(TryRecvError::Empty) => Err(self),
            Err(TryRecvError::Closed) => Ok(self.dropped()),
        }
    }

    /// The UI released the delivery without reporting an outcome
    fn dropped(&self) -> SessionOutcome {
        // Already terminal if the callback ran but the send raced a drop
        let r = transition(&self.state, Event::Fail);

        self.sink.error(
            &format!("[{}] confirmation dropped without outcome", self.id),
            &Error::Dropped,
        );
        if let Err(e) = r {
            debug!("[{}] {}", self.id, e);
        }

        SessionOutcome::Errored(Error::Dropped.to_string())
    }
}

/// Text form of a panic payload
fn panic_message(p: &(dyn Any + Send)) -> String {
    match (p.downcast_ref::<&str>(), p.downcast_ref::<String>()) {
        (Some(s), _) => format!("panicked: {}", s),
        (_, Some(s)) => format!("panicked: {}", s),
        _ => "panicked".to_string(),
    }
}

fn transition(state: &Mutex<SessionState>, evt: Event) -> Result<SessionState, Error> {
    let mut s = state.lock().unwrap_or_else(PoisonError::into_inner);
    *s = s.next(evt)?;
    Ok(*s)
}

impl<S: KeyStore> Context<S> {
    /// Reduce a UI outcome to the session's terminal state
    fn complete(
        &self,
        id: SessionId,
        state: &Mutex<SessionState>,
        outcome: UiOutcome,
    ) -> SessionOutcome {
        if let Err(e) = transition(state, Event::from(&outcome)) {
            self.sink
                .error(&format!("[{}] ignoring outcome {}", id, outcome), &e);
            return SessionOutcome::Errored(e.to_string());
        }

        match outcome {
            UiOutcome::Confirmed(data) => {
                self.sink.log(&format!(
                    "[{}] confirmed: data that was confirmed =\n      hex: {}\n      escaped ascii: {}",
                    id,
                    to_hex(&data),
                    escape_ascii(&data),
                ));

                // Diagnostics only, signing proceeds regardless
                let record = record::decode(&data);
                match &record {
                    Ok(r) => self
                        .sink
                        .log(&format!("[{}] confirmed: decoded record\n{}", id, r)),
                    Err(e) => self
                        .sink
                        .error(&format!("[{}] confirmed: decoding record failed", id), e),
                }

                let signature = self.sign(id, &data);

                SessionOutcome::Confirmed(Confirmation {
                    id,
                    data,
                    record,
                    signature,
                })
            }
            UiOutcome::Dismissed => {
                self.sink.log(&format!("[{}] dismissed", id));
                SessionOutcome::Dismissed
            }
            UiOutcome::Canceled => {
                self.sink.log(&format!("[{}] canceled", id));
                SessionOutcome::Canceled
            }
            UiOutcome::Errored(cause) => {
                self.sink
                    .log(&format!("[{}] confirmation prompt failed: {}", id, cause));
                SessionOutcome::Errored(cause)
            }
        }
    }

    /// Sign `data` with the configured key, logging the result
    fn sign(&self, id: SessionId, data: &[u8]) -> Result<Signature, Error> {
        self.sink.log(&format!(
            "[{}] signing with key '{}' ...\n      escaped ascii: {}",
            id,
            self.alias,
            escape_ascii(data)
        ));

        let r = self
            .keys
            .get_handle(&self.alias)
            .and_then(|h| self.keys.signer().sign(&h, data).map_err(Error::from));

        match &r {
            Ok(s) => self
                .sink
                .log(&format!("[{}] signing done, signature: {}", id, s.to_hex())),
            Err(e) => self.sink.error(
                &format!("[{}] signing with key '{}' failed", id, self.alias),
                e,
            ),
        }

        r
    }
}
