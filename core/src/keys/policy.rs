// Copyright (c) 2022-2023 The MobileCoin Foundation

use chrono::{DateTime, Utc};
use sha2::{Digest as _, Sha256, Sha384, Sha512};
use strum::{Display, EnumIter, EnumString};

bitflags::bitflags! {
    /// Key usage and authorization flags
    pub struct KeyFlags: u16 {
        /// Key may only be used for signing
        const SIGN_ONLY = 1 << 0;
        /// Signing requires an unlocked device
        const UNLOCKED_DEVICE_REQUIRED = 1 << 1;
        /// Signing requires the data to have been approved via the trusted UI
        const USER_CONFIRMATION_REQUIRED = 1 << 2;
    }
}

bitflags::bitflags! {
    /// Digest algorithms a key may be used with
    pub struct Digests: u8 {
        const SHA256 = 1 << 0;
        const SHA384 = 1 << 1;
        const SHA512 = 1 << 2;
    }
}

/// Digest algorithm applied to data prior to signing
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumString, EnumIter)]
pub enum Digest {
    #[strum(serialize = "SHA-256")]
    Sha256,
    #[strum(serialize = "SHA-384")]
    Sha384,
    #[strum(serialize = "SHA-512")]
    Sha512,
}

impl Digest {
    /// Flag for this digest in a [Digests] set
    pub fn flag(&self) -> Digests {
        match self {
            Digest::Sha256 => Digests::SHA256,
            Digest::Sha384 => Digests::SHA384,
            Digest::Sha512 => Digests::SHA512,
        }
    }

    /// Compute the digest of `data`
    pub fn compute(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Digest::Sha256 => Sha256::digest(data).to_vec(),
            Digest::Sha384 => Sha384::digest(data).to_vec(),
            Digest::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

/// Elliptic curve for generated keys
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumString)]
pub enum Curve {
    /// NIST P-256
    #[strum(serialize = "secp256r1")]
    Secp256r1,
}

/// Generation parameters for a confirmation-bound signing key
#[derive(Clone, PartialEq, Debug)]
pub struct KeyPolicy {
    pub flags: KeyFlags,
    pub digests: Digests,
    pub curve: Curve,
    /// X.500 subject for the self-signed certificate
    pub certificate_subject: String,
    pub certificate_not_before: DateTime<Utc>,
    pub validity_start: DateTime<Utc>,
}

impl KeyPolicy {
    /// Policy for a signing key that may only sign data the user approved,
    /// on an unlocked device
    pub fn confirmation(alias: &str) -> Self {
        let now = Utc::now();

        Self {
            flags: KeyFlags::SIGN_ONLY
                | KeyFlags::UNLOCKED_DEVICE_REQUIRED
                | KeyFlags::USER_CONFIRMATION_REQUIRED,
            digests: Digests::all(),
            curve: Curve::Secp256r1,
            certificate_subject: format!("CN={}", alias),
            certificate_not_before: now,
            validity_start: now,
        }
    }

    pub fn requires_confirmation(&self) -> bool {
        self.flags.contains(KeyFlags::USER_CONFIRMATION_REQUIRED)
    }

    pub fn requires_unlocked(&self) -> bool {
        self.flags.contains(KeyFlags::UNLOCKED_DEVICE_REQUIRED)
    }

    pub fn allows(&self, digest: Digest) -> bool {
        self.digests.contains(digest.flag())
    }
}
