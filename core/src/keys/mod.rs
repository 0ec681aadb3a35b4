// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Key management for confirmation-bound signing keys
//!
//! Private key material lives in a secure [KeyStore] and never leaves it,
//! callers interact with keys via [KeyHandle]s containing the public key and
//! an opaque [KeyRef] understood only by the store.

use log::debug;
use p256::ecdsa::VerifyingKey;

use crate::{Error, SigningFailure};

mod policy;
pub use policy::{Curve, Digest, Digests, KeyFlags, KeyPolicy};

mod signer;
pub use signer::{verify, Signature, Signer, SIGNATURE_DIGEST};

/// Key store failures (outside of signing)
#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
pub enum StoreError {
    /// No secure hardware / facility available
    #[error("secure key storage unsupported: {0}")]
    Unsupported(String),

    /// Parameter combination refused by the store
    #[error("invalid key parameters: {0}")]
    InvalidParameters(String),

    /// Any other platform failure
    #[error("{0}")]
    Platform(String),
}

/// Opaque reference to private key material held by a [KeyStore]
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct KeyRef(u64);

impl KeyRef {
    /// Create a reference, for use by [KeyStore] implementations
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Usable handle to a signing key
#[derive(Clone, PartialEq, Debug)]
pub struct KeyHandle {
    pub alias: String,
    pub public_key: VerifyingKey,
    pub key: KeyRef,
}

impl KeyHandle {
    /// SEC1 uncompressed public key bytes
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.public_key.to_encoded_point(false).as_bytes().to_vec()
    }
}

/// [KeyStore] trait provides access to a secure key storage facility
///
/// Implementations are the authority on key-level locking, calls for the
/// same alias must be serialised by the caller.
pub trait KeyStore: Send + Sync {
    /// Generate a key under `alias`, replacing any existing key
    fn generate_key(&self, alias: &str, policy: &KeyPolicy) -> Result<(), StoreError>;

    /// Check whether `alias` exists
    fn contains_alias(&self, alias: &str) -> Result<bool, StoreError>;

    /// Fetch all aliases in the store
    fn aliases(&self) -> Result<Vec<String>, StoreError>;

    /// Fetch the public key and private key reference for `alias`
    fn get_key(&self, alias: &str) -> Result<Option<(VerifyingKey, KeyRef)>, StoreError>;

    /// Digest and sign `data` with the referenced key, returning a
    /// DER-encoded ECDSA signature
    fn sign(&self, key: &KeyRef, digest: Digest, data: &[u8]) -> Result<Vec<u8>, SigningFailure>;
}

impl<T: KeyStore + ?Sized> KeyStore for std::sync::Arc<T> {
    fn generate_key(&self, alias: &str, policy: &KeyPolicy) -> Result<(), StoreError> {
        T::generate_key(self, alias, policy)
    }

    fn contains_alias(&self, alias: &str) -> Result<bool, StoreError> {
        T::contains_alias(self, alias)
    }

    fn aliases(&self) -> Result<Vec<String>, StoreError> {
        T::aliases(self)
    }

    fn get_key(&self, alias: &str) -> Result<Option<(VerifyingKey, KeyRef)>, StoreError> {
        T::get_key(self, alias)
    }

    fn sign(&self, key: &KeyRef, digest: Digest, data: &[u8]) -> Result<Vec<u8>, SigningFailure> {
        T::sign(self, key, digest, data)
    }
}

/// Snapshot of the aliases present in a [KeyStore]
///
/// Iterating borrows the snapshot so it may be walked any number of times.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Aliases(Vec<String>);

impl Aliases {
    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.0.iter().any(|a| a == alias)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Aliases {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// [KeyManager] owns the lifecycle of named signing keys in a [KeyStore]
pub struct KeyManager<S: KeyStore> {
    store: S,
}

impl<S: KeyStore> KeyManager<S> {
    /// Create a key manager over the provided store
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Access the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch the key for `alias`, generating it with
    /// [KeyPolicy::confirmation] if absent
    pub fn ensure_key(&self, alias: &str) -> Result<KeyHandle, Error> {
        self.ensure_key_with(alias, || KeyPolicy::confirmation(alias))
    }

    /// Fetch the key for `alias`, generating it with the provided policy if
    /// absent. Existing keys are never regenerated.
    pub fn ensure_key_with(
        &self,
        alias: &str,
        policy: impl FnOnce() -> KeyPolicy,
    ) -> Result<KeyHandle, Error> {
        // Generation replaces existing keys, so check first
        if self.store.contains_alias(alias)? {
            debug!("key '{}' present, skipping generation", alias);
            return self.get_handle(alias);
        }

        let policy = policy();

        debug!("generating key '{}' ({})", alias, policy.curve);

        self.store
            .generate_key(alias, &policy)
            .map_err(|reason| Error::KeyGeneration {
                alias: alias.to_string(),
                reason,
            })?;

        self.get_handle(alias)
    }

    /// List aliases currently present in the store
    pub fn list_aliases(&self) -> Result<Aliases, Error> {
        let a = self.store.aliases()?;
        Ok(Aliases(a))
    }

    /// Resolve `alias` to a usable [KeyHandle]
    pub fn get_handle(&self, alias: &str) -> Result<KeyHandle, Error> {
        match self.store.get_key(alias)? {
            Some((public_key, key)) => Ok(KeyHandle {
                alias: alias.to_string(),
                public_key,
                key,
            }),
            None => Err(Error::NotFound(alias.to_string())),
        }
    }

    /// Fetch a [Signer] using this manager's store
    pub fn signer(&self) -> Signer<'_, S> {
        Signer::new(&self.store)
    }
}
