// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Tests for confirmation sessions
//!
//! Each routine builds a [Workflow] over a [ScriptedUi] and a
//! [RecordingStore] wrapping the provided key store. Routines that sign take
//! an `approve` hook, called with the confirmed bytes before the outcome is
//! delivered, so stores binding signatures to approvals can be exercised.

use std::sync::Arc;

use anyhow::{anyhow, ensure};
use log::debug;

use confirm_core::{
    keys::{self, KeyManager, KeyStore},
    prompt::{Executor, UiOutcome},
    record::Value,
    session::{Confirmation, SessionOutcome, SessionState, Workflow, WorkflowConfig},
    Error, SigningError, SigningFailure, UnavailableKind,
};

use crate::doubles::{PanickingStore, RecordingSink, RecordingStore, Script, ScriptedUi};

pub type TestWorkflow<S> = Workflow<ScriptedUi, RecordingStore<S>>;

/// Setup a workflow with a recording sink and an initialised key
pub fn setup<S: KeyStore + 'static>(
    ui: ScriptedUi,
    store: S,
) -> anyhow::Result<(TestWorkflow<S>, Arc<RecordingSink>)> {
    let sink = Arc::new(RecordingSink::default());

    let w = Workflow::new_with_sink(
        ui,
        KeyManager::new(RecordingStore::new(store)),
        WorkflowConfig::default(),
        sink.clone(),
    );

    w.keys().ensure_key(w.key_alias())?;

    Ok((w, sink))
}

/// Prompts failing local validation
pub const INVALID_PROMPTS: &[&str] = &["", "two\nlines", "\n", "trailing\r", "tab\tbed"];

/// Check invalid requests are rejected without contacting the UI
pub fn invalid_requests<S: KeyStore + 'static>(store: S) -> anyhow::Result<()> {
    let (w, sink) = setup(ScriptedUi::new(Script::Confirm), store)?;

    for (i, p) in INVALID_PROMPTS.iter().enumerate() {
        debug!("submit invalid prompt: {:?}", p);

        match w.show(*p, b"extra".to_vec()) {
            Err(Error::InvalidRequest(_)) => (),
            Err(e) => return Err(anyhow!("unexpected error for {:?}: {}", p, e)),
            Ok(_) => return Err(anyhow!("invalid prompt {:?} accepted", p)),
        }

        let id = w.last_id().ok_or_else(|| anyhow!("no session id issued"))?;
        ensure!(
            sink.count(&format!("[{}] building confirmation prompt failed", id)) == 1,
            "rejection not logged for session {}",
            id
        );
        ensure!(i + 1 == id.value() as usize, "unexpected session id {}", id);
    }

    ensure!(
        w.ui().submit_calls() == 0,
        "UI contacted {} times",
        w.ui().submit_calls()
    );
    ensure!(w.keys().store().sign_calls().is_empty(), "sign called");

    Ok(())
}

/// Check a confirmation of `hello` is decoded once then signed once over
/// exactly the confirmed bytes
pub async fn confirm_hello<S, A>(store: S, approve: A) -> anyhow::Result<()>
where
    S: KeyStore + 'static,
    A: Fn(&[u8]) + Send + Sync + 'static,
{
    let ui = ScriptedUi::new(Script::Respond(UiOutcome::Confirmed(b"hello".to_vec())))
        .with_approver(approve);
    let (w, sink) = setup(ui, store)?;

    let p = w.show("Sign hello?", vec![])?;
    let id = p.id();
    let o = p.outcome().await;

    let c = o
        .confirmation()
        .ok_or_else(|| anyhow!("unexpected outcome: {:?}", o))?;
    ensure!(c.id == id, "outcome for wrong session");
    ensure!(c.data == b"hello", "confirmed data altered");

    // `hello` is not a CBOR map, decoding fails and is logged once
    ensure!(c.record.is_err(), "decoded record from non-map payload");
    let diagnostics = sink.count(&format!("[{}] confirmed: decoded record", id))
        + sink.count(&format!("[{}] confirmed: decoding record failed", id));
    ensure!(diagnostics == 1, "{} decode diagnostics logged", diagnostics);

    ensure!(
        w.keys().store().sign_calls() == vec![b"hello".to_vec()],
        "unexpected sign calls: {:?}",
        w.keys().store().sign_calls()
    );

    let sig = c.signature.clone()?;
    let h = w.keys().get_handle(w.key_alias())?;
    keys::verify(&h, b"hello", &sig)?;

    ensure!(
        sink.count(&format!("[{}] signing done, signature: {}", id, sig.to_hex())) == 1,
        "signature not logged"
    );

    Ok(())
}

/// Map header declaring 2^64 - 1 entries with none present
pub const HOSTILE_RECORD: &[u8] = &[0xbb, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff];

/// Check a confirmation whose payload declares an oversized map fails to
/// decode but is still signed exactly once
pub async fn hostile_record<S, A>(store: S, approve: A) -> anyhow::Result<()>
where
    S: KeyStore + 'static,
    A: Fn(&[u8]) + Send + Sync + 'static,
{
    let ui = ScriptedUi::new(Script::Respond(UiOutcome::Confirmed(HOSTILE_RECORD.to_vec())))
        .with_approver(approve);
    let (w, sink) = setup(ui, store)?;

    let p = w.show("hello", vec![])?;
    let id = p.id();
    let o = p.outcome().await;

    let c = o
        .confirmation()
        .ok_or_else(|| anyhow!("unexpected outcome: {:?}", o))?;
    ensure!(c.record.is_err(), "decoded record from hostile payload");
    ensure!(
        sink.count(&format!("[{}] confirmed: decoding record failed", id)) == 1,
        "decode failure not logged"
    );

    ensure!(
        w.keys().store().sign_calls() == vec![HOSTILE_RECORD.to_vec()],
        "unexpected sign calls: {:?}",
        w.keys().store().sign_calls()
    );
    ensure!(c.signature.is_ok(), "signing failed: {:?}", c.signature);

    Ok(())
}

/// Check a confirmed record is decoded and signed
pub async fn confirm_record<S, A>(store: S, approve: A) -> anyhow::Result<()>
where
    S: KeyStore + 'static,
    A: Fn(&[u8]) + Send + Sync + 'static,
{
    let (w, sink) = setup(ScriptedUi::new(Script::Confirm).with_approver(approve), store)?;

    let c = confirm(&w, "Pay 10 EUR to Bob?", b"\x00order-7").await?;

    let r = c.record.clone()?;
    ensure!(
        r.get("prompt") == Some(&Value::Text("Pay 10 EUR to Bob?".to_string())),
        "prompt mismatch in record: {}",
        r
    );
    ensure!(
        r.get("extra") == Some(&Value::Bytes(b"\x00order-7".to_vec())),
        "extra mismatch in record: {}",
        r
    );

    ensure!(
        sink.count("- extra: \\x00order-7") == 1,
        "escaped extra data not logged"
    );
    ensure!(
        sink.count("- prompt: Pay 10 EUR to Bob?") == 1,
        "prompt not logged"
    );

    let sig = c.signature.clone()?;
    let h = w.keys().get_handle(w.key_alias())?;
    keys::verify(&h, &c.data, &sig)?;

    Ok(())
}

/// Check re-signing previously confirmed data after a second confirmation
/// fails with an authorization mismatch that is logged, not raised
pub async fn resign<S, A>(store: S, approve: A) -> anyhow::Result<()>
where
    S: KeyStore + 'static,
    A: Fn(&[u8]) + Send + Sync + 'static,
{
    let (w, sink) = setup(ScriptedUi::new(Script::Confirm).with_approver(approve), store)?;

    let first = confirm(&w, "First", b"1").await?;
    ensure!(first.signature.is_ok(), "first signing failed");

    let second = confirm(&w, "Second", b"2").await?;
    ensure!(second.signature.is_ok(), "second signing failed");

    let mismatch = Error::Signing(SigningError {
        reason: SigningFailure::AuthorizationMismatch,
    });

    match w.resign(&first) {
        Err(e) if e == mismatch => (),
        r => return Err(anyhow!("unexpected re-signing result: {:?}", r)),
    }

    // Tampering with confirmed data fails in the same way
    let mut tampered = second.data.clone();
    tampered[0] ^= 0x01;
    match w.sign_for(second.id, &tampered) {
        Err(e) if e == mismatch => (),
        r => return Err(anyhow!("unexpected tampered signing result: {:?}", r)),
    }

    for id in [first.id, second.id] {
        ensure!(
            sink.count(&format!("[{}] signing with key 'TestKey' failed", id)) == 1,
            "failure for session {} not logged",
            id
        );
    }
    ensure!(
        sink.count("authorization mismatch") == 2,
        "mismatch cause not logged"
    );

    let calls = w.keys().store().sign_calls();
    ensure!(
        calls == vec![first.data.clone(), second.data.clone(), first.data, tampered],
        "unexpected sign calls: {:?}",
        calls
    );

    Ok(())
}

/// Check a second submission is refused while a prompt is presenting
pub async fn already_presenting<S: KeyStore + 'static>(store: S) -> anyhow::Result<()> {
    let (w, sink) = setup(ScriptedUi::new(Script::Hold), store)?;

    let p1 = w.show("first", vec![])?;
    ensure!(w.ui().is_presenting(), "UI not presenting");
    ensure!(p1.state() == SessionState::Submitted, "first not submitted");

    match w.show("second", vec![]) {
        Err(Error::PromptUnavailable(UnavailableKind::AlreadyPresenting)) => (),
        r => return Err(anyhow!("unexpected second submission result: {:?}", r)),
    }
    ensure!(w.ui().submit_calls() == 2, "second submission not attempted");
    ensure!(
        sink.count("[2] presenting confirmation prompt failed") == 1,
        "refusal not logged"
    );

    // First session is unaffected
    ensure!(p1.state() == SessionState::Submitted, "first session changed");
    ensure!(w.ui().complete(UiOutcome::Canceled), "no prompt to complete");
    ensure!(p1.state() == SessionState::Canceled, "first not canceled");
    ensure!(p1.outcome().await == SessionOutcome::Canceled, "wrong outcome");

    // The UI is free once the first session completes
    let p3 = w.show("third", vec![])?;
    ensure!(p3.id().value() == 3, "unexpected id {}", p3.id());
    w.ui().complete(UiOutcome::Dismissed);
    ensure!(p3.outcome().await == SessionOutcome::Dismissed, "wrong outcome");

    ensure!(w.keys().store().sign_calls().is_empty(), "sign called");

    Ok(())
}

/// Check an unsupported UI is refused at submission
pub fn not_available<S: KeyStore + 'static>(store: S) -> anyhow::Result<()> {
    let (w, _sink) = setup(ScriptedUi::unsupported(), store)?;

    match w.show("hello", vec![]) {
        Err(Error::PromptUnavailable(UnavailableKind::NotAvailable)) => Ok(()),
        r => Err(anyhow!("unexpected submission result: {:?}", r)),
    }
}

/// Check non-confirmed outcomes neither decode nor sign
pub async fn not_confirmed<S: KeyStore + 'static>(store: S) -> anyhow::Result<()> {
    let (w, sink) = setup(ScriptedUi::new(Script::Hold), store)?;

    let cases = [
        (UiOutcome::Dismissed, SessionOutcome::Dismissed, "dismissed"),
        (UiOutcome::Canceled, SessionOutcome::Canceled, "canceled"),
        (
            UiOutcome::Errored("timeout".to_string()),
            SessionOutcome::Errored("timeout".to_string()),
            "confirmation prompt failed: timeout",
        ),
    ];

    for (ui_outcome, expected, line) in cases {
        let p = w.show("hello", vec![])?;
        let id = p.id();

        w.ui().complete(ui_outcome);

        let o = p.outcome().await;
        ensure!(o == expected, "unexpected outcome {:?}", o);
        ensure!(
            sink.count(&format!("[{}] {}", id, line)) == 1,
            "outcome not logged for {}",
            id
        );
    }

    ensure!(sink.count("decod") == 0, "decoding attempted");
    ensure!(w.keys().store().sign_calls().is_empty(), "sign called");

    Ok(())
}

/// Check a delivery released without an outcome is reported as an error
pub async fn dropped<S: KeyStore + 'static>(store: S) -> anyhow::Result<()> {
    let (w, sink) = setup(ScriptedUi::new(Script::Drop), store)?;

    let p = w.show("hello", vec![])?;
    let id = p.id();
    let o = p.outcome().await;

    ensure!(
        sink.count(&format!("[{}] confirmation dropped without outcome", id)) == 1,
        "dropped delivery not logged"
    );

    ensure!(
        o == SessionOutcome::Errored("confirmation dropped".to_string()),
        "unexpected outcome {:?}",
        o
    );
    ensure!(o.state() == SessionState::Errored, "unexpected state");

    Ok(())
}

/// Check a panic while handling a confirmed outcome is reported for the
/// session instead of surfacing as a dropped delivery
pub async fn callback_panic<S: KeyStore + 'static>(
    store: S,
    executor: Option<Arc<dyn Executor>>,
) -> anyhow::Result<()> {
    let ui = ScriptedUi::new(Script::Respond(UiOutcome::Confirmed(b"hello".to_vec())));
    let (w, sink) = setup(ui, PanickingStore::new(store))?;
    let w = match executor {
        Some(e) => w.with_executor(e),
        None => w,
    };

    let p = w.show("hello", vec![])?;
    let id = p.id();

    match p.outcome().await {
        SessionOutcome::Errored(m) if m.contains("sign exploded") => (),
        o => return Err(anyhow!("unexpected outcome {:?}", o)),
    }

    ensure!(
        sink.count(&format!("[{}] handling confirmation outcome failed", id)) == 1,
        "panic not logged for session {}",
        id
    );
    ensure!(sink.count("dropped") == 0, "panic reported as dropped");
    ensure!(
        w.keys().store().sign_calls() == vec![b"hello".to_vec()],
        "unexpected sign calls"
    );

    Ok(())
}

/// Check ids of `n` sequential sessions are strictly increasing and tag
/// every line logged for each session
pub fn correlation_ids<S: KeyStore + 'static>(store: S, n: usize) -> anyhow::Result<()> {
    let (w, sink) = setup(ScriptedUi::new(Script::Respond(UiOutcome::Dismissed)), store)?;

    let mut last = None;

    for _ in 0..n {
        let p = w.show("hello", vec![])?;
        let id = p.id();

        if let Some(l) = last {
            ensure!(id > l, "id {} not greater than {}", id, l);
        }
        last = Some(id);

        match p.try_outcome() {
            Ok(SessionOutcome::Dismissed) => (),
            Ok(o) => return Err(anyhow!("unexpected outcome {:?}", o)),
            Err(_) => return Err(anyhow!("outcome not delivered for {}", id)),
        }
    }

    ensure!(w.last_id() == last, "last id mismatch");

    let lines = sink.lines();
    ensure!(lines.len() == 2 * n, "unexpected line count {}", lines.len());
    for (i, l) in lines.iter().enumerate() {
        let prefix = format!("[{}] ", i / 2 + 1);
        ensure!(l.starts_with(&prefix), "line '{}' missing prefix", l);
    }

    Ok(())
}

/// Confirm a prompt via `w`, returning the confirmation
pub async fn confirm<S: KeyStore + 'static>(
    w: &TestWorkflow<S>,
    prompt: &str,
    extra: &[u8],
) -> anyhow::Result<Confirmation> {
    let o = w.show(prompt, extra.to_vec())?.outcome().await;

    match o {
        SessionOutcome::Confirmed(c) => Ok(c),
        o => Err(anyhow!("unexpected outcome {:?}", o)),
    }
}
