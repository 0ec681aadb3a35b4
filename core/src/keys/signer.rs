// Copyright (c) 2022-2023 The MobileCoin Foundation

use log::debug;
use p256::ecdsa::{signature::Verifier, Signature as EcdsaSignature};

use super::{Digest, KeyHandle, KeyStore};
use crate::{helpers::to_hex, SigningError, SigningFailure};

/// Digest used for all confirmation signatures (ECDSA P-256 with SHA-256)
pub const SIGNATURE_DIGEST: Digest = Digest::Sha256;

/// DER-encoded ECDSA signature
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Signature(Vec<u8>);

impl Signature {
    pub fn from_der(der: &[u8]) -> Self {
        Self(der.to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        to_hex(&self.0)
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// [Signer] signs data with store-held keys and checks the result
pub struct Signer<'a, S: KeyStore> {
    store: &'a S,
}

impl<'a, S: KeyStore> Signer<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Sign exactly `data` with the key referenced by `handle`
    ///
    /// Stores holding confirmation-bound keys refuse any `data` other than
    /// the payload most recently approved by the user, and each approval
    /// authorises a single signature.
    pub fn sign(&self, handle: &KeyHandle, data: &[u8]) -> Result<Signature, SigningError> {
        debug!(
            "signing {} bytes with key '{}' ({})",
            data.len(),
            handle.alias,
            SIGNATURE_DIGEST
        );

        let der = self.store.sign(&handle.key, SIGNATURE_DIGEST, data)?;
        let signature = Signature(der);

        // Check the store actually signed what we asked for
        verify(handle, data, &signature)?;

        Ok(signature)
    }
}

/// Verify a [Signature] over `data` against the handle's public key
pub fn verify(handle: &KeyHandle, data: &[u8], signature: &Signature) -> Result<(), SigningError> {
    let s = EcdsaSignature::from_der(signature.as_bytes()).map_err(|e| {
        SigningFailure::StoreRejected(format!("invalid signature encoding: {}", e))
    })?;

    handle
        .public_key
        .verify(data, &s)
        .map_err(|_| SigningFailure::StoreRejected("signature verification failed".to_string()))?;

    Ok(())
}
