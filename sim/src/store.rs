// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use log::debug;
use p256::ecdsa::{signature::hazmat::PrehashSigner, Signature, SigningKey, VerifyingKey};
use rand_core::OsRng;
use zeroize::Zeroizing;

use confirm_core::{
    keys::{Digest, KeyFlags, KeyPolicy, KeyRef, KeyStore, StoreError},
    SigningFailure,
};

/// Software key store enforcing confirmation-bound key policies
///
/// Like platform stores, generating a key under an existing alias replaces
/// the previous key.
pub struct SimKeyStore {
    inner: Mutex<Inner>,
}

struct Inner {
    keys: BTreeMap<String, Entry>,
    next_id: u64,
    secure_hardware: bool,
    locked: bool,
    /// Most recently approved payload, consumed by the next signing attempt
    approved: Option<Zeroizing<Vec<u8>>>,
}

struct Entry {
    key_ref: KeyRef,
    policy: KeyPolicy,
    signing_key: SigningKey,
}

impl Default for SimKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SimKeyStore {
    /// Create an empty, unlocked store
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                keys: BTreeMap::new(),
                next_id: 1,
                secure_hardware: true,
                locked: false,
                approved: None,
            }),
        }
    }

    /// Create a store refusing key generation, as on devices without
    /// secure hardware
    pub fn without_secure_hardware() -> Self {
        let s = Self::new();
        s.inner().secure_hardware = false;
        s
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the device, blocking keys requiring an unlocked device
    pub fn lock(&self) {
        self.inner().locked = true;
    }

    pub fn unlock(&self) {
        self.inner().locked = false;
    }

    pub fn is_locked(&self) -> bool {
        self.inner().locked
    }

    /// Record a payload approved via the trusted UI, replacing any previous
    /// approval
    pub fn approve(&self, data: &[u8]) {
        debug!("approval recorded ({} bytes)", data.len());
        self.inner().approved = Some(Zeroizing::new(data.to_vec()));
    }

    /// Delete a key, returning whether it existed
    pub fn delete(&self, alias: &str) -> bool {
        self.inner().keys.remove(alias).is_some()
    }
}

impl KeyStore for SimKeyStore {
    fn generate_key(&self, alias: &str, policy: &KeyPolicy) -> Result<(), StoreError> {
        let mut inner = self.inner();

        if !inner.secure_hardware {
            return Err(StoreError::Unsupported("no secure hardware".to_string()));
        }
        if !policy.flags.contains(KeyFlags::SIGN_ONLY) {
            return Err(StoreError::InvalidParameters(
                "only signing keys are supported".to_string(),
            ));
        }
        if policy.digests.is_empty() {
            return Err(StoreError::InvalidParameters(
                "no digests specified".to_string(),
            ));
        }

        let key_ref = KeyRef::new(inner.next_id);
        inner.next_id += 1;

        debug!(
            "generating {} key '{}' ({}, ref: {})",
            policy.curve,
            alias,
            policy.certificate_subject,
            key_ref.id()
        );

        inner.keys.insert(
            alias.to_string(),
            Entry {
                key_ref,
                policy: policy.clone(),
                signing_key: SigningKey::random(&mut OsRng),
            },
        );

        Ok(())
    }

    fn contains_alias(&self, alias: &str) -> Result<bool, StoreError> {
        Ok(self.inner().keys.contains_key(alias))
    }

    fn aliases(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.inner().keys.keys().cloned().collect())
    }

    fn get_key(&self, alias: &str) -> Result<Option<(VerifyingKey, KeyRef)>, StoreError> {
        let inner = self.inner();

        Ok(inner
            .keys
            .get(alias)
            .map(|e| (VerifyingKey::from(&e.signing_key), e.key_ref)))
    }

    fn sign(&self, key: &KeyRef, digest: Digest, data: &[u8]) -> Result<Vec<u8>, SigningFailure> {
        let mut guard = self.inner();
        let inner = &mut *guard;

        let entry = inner
            .keys
            .values()
            .find(|e| e.key_ref == *key)
            .ok_or_else(|| SigningFailure::StoreRejected("unknown key".to_string()))?;

        if !entry.policy.allows(digest) {
            return Err(SigningFailure::StoreRejected(format!(
                "digest {} not authorised for key",
                digest
            )));
        }

        if entry.policy.requires_unlocked() && inner.locked {
            return Err(SigningFailure::DeviceLocked);
        }

        if entry.policy.requires_confirmation() {
            // Each approval authorises a single attempt
            match inner.approved.take() {
                Some(a) if a.as_slice() == data => (),
                _ => return Err(SigningFailure::AuthorizationMismatch),
            }
        }

        let prehash = digest.compute(data);
        let signature: Signature = entry
            .signing_key
            .sign_prehash(&prehash)
            .map_err(|e| SigningFailure::StoreRejected(e.to_string()))?;

        Ok(signature.to_der().as_bytes().to_vec())
    }
}
