//! Certificates: the structured view of one signature packet.

use std::cmp::Ordering;
use std::time::SystemTime;

use crate::{CertificateType, KeyFlags, KeyId};

/// One certificate (signature packet), decoded by the parsing collaborator.
///
/// A certificate is immutable once constructed. Verification is a pure
/// function of the certificate, an alleged signer key, and the signed
/// data; it lives in the engine crate and never mutates the certificate.
///
/// The full encoded packet bytes are kept alongside the decoded fields:
/// the merge engine deduplicates certificates byte-for-byte, and equal
/// creation timestamps are tie-broken over the encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    typ: CertificateType,
    issuer: KeyId,
    creation_time: SystemTime,
    exportable: bool,
    revocable: bool,
    primary_user_id: bool,
    key_flags: Option<KeyFlags>,
    embedded: Vec<Certificate>,
    raw: Vec<u8>,
}

impl Certificate {
    /// Creates a certificate from decoded packet data.
    ///
    /// Certificates default to exportable and revocable; the hashed
    /// subpacket flags that deviate from the default are applied with the
    /// consuming configuration methods below.
    pub fn new(
        typ: CertificateType,
        issuer: KeyId,
        creation_time: SystemTime,
        raw: Vec<u8>,
    ) -> Certificate {
        Certificate {
            typ,
            issuer,
            creation_time,
            exportable: true,
            revocable: true,
            primary_user_id: false,
            key_flags: None,
            embedded: Vec::new(),
            raw,
        }
    }

    /// Marks the certificate non-exportable ("local certification").
    pub fn local_only(mut self) -> Certificate {
        self.exportable = false;
        self
    }

    /// Marks the certificate non-revocable.
    pub fn non_revocable(mut self) -> Certificate {
        self.revocable = false;
        self
    }

    /// Attaches the key-usage flags carried in the hashed subpackets.
    pub fn with_key_flags(mut self, flags: KeyFlags) -> Certificate {
        self.key_flags = Some(flags);
        self
    }

    /// Appends an embedded signature (hashed and unhashed subpackets are
    /// merged into one list, hashed first).
    pub fn with_embedded(mut self, cert: Certificate) -> Certificate {
        self.embedded.push(cert);
        self
    }

    /// Marks the certified user id as the primary one.
    pub fn mark_primary_user_id(mut self) -> Certificate {
        self.primary_user_id = true;
        self
    }

    pub fn typ(&self) -> CertificateType {
        self.typ
    }

    pub fn issuer(&self) -> KeyId {
        self.issuer
    }

    pub fn creation_time(&self) -> SystemTime {
        self.creation_time
    }

    /// Whether the certificate may leave the originating system.
    pub fn is_exportable(&self) -> bool {
        self.exportable
    }

    /// Local-only certificates must never have been received from an
    /// external source; canonicalization always rejects them.
    pub fn is_local(&self) -> bool {
        !self.exportable
    }

    pub fn is_revocable(&self) -> bool {
        self.revocable
    }

    pub fn is_primary_user_id(&self) -> bool {
        self.primary_user_id
    }

    pub fn key_flags(&self) -> Option<KeyFlags> {
        self.key_flags
    }

    /// Whether the certificate grants the signing capability.
    pub fn grants_signing(&self) -> bool {
        self.key_flags.is_some_and(|f| f.for_signing())
    }

    /// Embedded signatures, in subpacket order.
    pub fn embedded(&self) -> &[Certificate] {
        &self.embedded
    }

    /// The full encoded packet bytes.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Whether this certificate supersedes `other` among competing
    /// certificates of the same kind and target.
    ///
    /// A strictly newer creation time wins. Equal timestamps fall back to
    /// a lexicographic comparison of the encoded bytes, which gives a
    /// deterministic total order independent of encounter order.
    pub fn supersedes(&self, other: &Certificate) -> bool {
        match self.creation_time.cmp(&other.creation_time) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => self.raw > other.raw,
        }
    }
}
