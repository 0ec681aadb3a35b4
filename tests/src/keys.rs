// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Tests for confirmation key setup

use anyhow::ensure;
use log::debug;

use confirm_core::{
    keys::{KeyManager, KeyStore},
    Error,
};

use crate::doubles::RecordingStore;

/// Aliases exercised by key setup tests
pub const ALIASES: &[&str] = &["TestKey", "payments", "key with spaces", "ключ"];

/// Check `ensure_key` generates once per alias and returns the same key
/// on every subsequent call
pub fn test<S: KeyStore>(store: S) -> anyhow::Result<()> {
    let keys = KeyManager::new(RecordingStore::new(store));

    for (i, alias) in ALIASES.iter().enumerate() {
        debug!("ensure key '{}'", alias);

        ensure!(
            matches!(keys.get_handle(alias), Err(Error::NotFound(_))),
            "alias '{}' present before setup",
            alias
        );

        let h1 = keys.ensure_key(alias)?;
        let h2 = keys.ensure_key(alias)?;

        ensure!(h1.alias == *alias, "handle alias mismatch");
        ensure!(
            h1.public_key_bytes() == h2.public_key_bytes(),
            "public key changed for '{}'",
            alias
        );
        ensure!(h1.key == h2.key, "key reference changed for '{}'", alias);
        ensure!(
            keys.store().generate_calls() == i + 1,
            "expected {} generate calls, observed {}",
            i + 1,
            keys.store().generate_calls()
        );

        let h3 = keys.get_handle(alias)?;
        ensure!(h3 == h1, "resolved handle mismatch for '{}'", alias);
    }

    // Every alias is listed, and listing is repeatable
    let a = keys.list_aliases()?;
    ensure!(a.len() == ALIASES.len(), "unexpected alias count {}", a.len());
    for alias in ALIASES {
        ensure!(a.contains(alias), "alias '{}' not listed", alias);
    }
    ensure!(keys.list_aliases()? == a, "alias listing changed");

    Ok(())
}
