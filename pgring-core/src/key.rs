//! Keys, user ids, and the raw keyring handed to the engine.

use std::time::{Duration, SystemTime};

use crate::{Certificate, Fingerprint, KeyId, ModelError, ProtectionMode, sanitize_for_display};

/// The secret-material container attached to a secret key packet.
///
/// The material itself stays with the packet parser; the engine only
/// needs to know that it exists and how it is protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretMaterial {
    protection: ProtectionMode,
}

impl SecretMaterial {
    pub fn new(protection: ProtectionMode) -> SecretMaterial {
        SecretMaterial { protection }
    }

    pub fn protection(&self) -> ProtectionMode {
        self.protection
    }
}

/// One public or secret key packet with its attached certificates.
#[derive(Debug, Clone, PartialEq)]
pub struct Key {
    key_id: KeyId,
    fingerprint: Fingerprint,
    creation_time: SystemTime,
    validity_period: Option<Duration>,
    primary: bool,
    secret: Option<SecretMaterial>,
    certs: Vec<Certificate>,
}

impl Key {
    /// Creates a public subkey with no certificates attached.
    pub fn new(key_id: KeyId, fingerprint: Fingerprint, creation_time: SystemTime) -> Key {
        Key {
            key_id,
            fingerprint,
            creation_time,
            validity_period: None,
            primary: false,
            secret: None,
            certs: Vec::new(),
        }
    }

    /// Flags this key as the primary (master) key of its ring.
    pub fn mark_primary(mut self) -> Key {
        self.primary = true;
        self
    }

    /// Sets the validity period counted from the creation time.
    pub fn with_validity_period(mut self, period: Duration) -> Key {
        self.validity_period = Some(period);
        self
    }

    /// Attaches secret material, turning this into a secret key.
    pub fn with_secret(mut self, secret: SecretMaterial) -> Key {
        self.secret = Some(secret);
        self
    }

    /// Replaces the attached certificate list.
    pub fn with_certs(mut self, certs: Vec<Certificate>) -> Key {
        self.certs = certs;
        self
    }

    /// Appends one certificate, preserving order.
    pub fn push_cert(&mut self, cert: Certificate) {
        self.certs.push(cert);
    }

    pub fn key_id(&self) -> KeyId {
        self.key_id
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn creation_time(&self) -> SystemTime {
        self.creation_time
    }

    pub fn validity_period(&self) -> Option<Duration> {
        self.validity_period
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn secret(&self) -> Option<&SecretMaterial> {
        self.secret.as_ref()
    }

    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    /// Certificates attached to this key, in packet order.
    pub fn certs(&self) -> &[Certificate] {
        &self.certs
    }

    /// Returns a copy of this key carrying `certs` instead of the current
    /// list. Certificate packets cannot be deleted in place, so removal
    /// always means rebuilding the key around the surviving set.
    pub fn replacing_certs(&self, certs: Vec<Certificate>) -> Key {
        let mut key = self.clone();
        key.certs = certs;
        key
    }
}

/// A raw user id: attacker-controlled bytes plus attached certificates.
///
/// The value is kept as bytes since user ids in the wild are not always
/// valid UTF-8.
#[derive(Debug, Clone, PartialEq)]
pub struct RawUserId {
    value: Vec<u8>,
    certs: Vec<Certificate>,
}

impl RawUserId {
    pub fn new(value: impl Into<Vec<u8>>) -> RawUserId {
        RawUserId {
            value: value.into(),
            certs: Vec::new(),
        }
    }

    /// Replaces the attached certificate list.
    pub fn with_certs(mut self, certs: Vec<Certificate>) -> RawUserId {
        self.certs = certs;
        self
    }

    pub fn push_cert(&mut self, cert: Certificate) {
        self.certs.push(cert);
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn certs(&self) -> &[Certificate] {
        &self.certs
    }

    /// Lossy, escape-sanitized rendering for diagnostics and logs.
    pub fn display(&self) -> String {
        sanitize_for_display(&String::from_utf8_lossy(&self.value))
    }

    /// Returns a copy carrying `certs` instead of the current list.
    pub fn replacing_certs(&self, certs: Vec<Certificate>) -> RawUserId {
        RawUserId {
            value: self.value.clone(),
            certs,
        }
    }
}

/// Whether a keyring carries secret material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Secrecy {
    PublicOnly,
    HasSecretMaterial,
}

/// An untrusted keyring as delivered by the packet parser: one primary
/// key, its subkeys, and its user ids, each with attached certificates.
///
/// Nothing about a `RawKey` has been verified. The only structural
/// guarantee is that exactly one member key is the primary key; its key
/// id is the ring's identity.
#[derive(Debug, Clone, PartialEq)]
pub struct RawKey {
    primary: Key,
    subkeys: Vec<Key>,
    user_ids: Vec<RawUserId>,
}

impl RawKey {
    /// Builds a ring from a decoded key list, preserving order.
    ///
    /// Exactly one key must carry the primary flag, or the packet stream
    /// was not a single keyring.
    pub fn from_keys(keys: Vec<Key>, user_ids: Vec<RawUserId>) -> Result<RawKey, ModelError> {
        let primaries = keys.iter().filter(|k| k.is_primary()).count();
        match primaries {
            0 => return Err(ModelError::NoPrimaryKey),
            1 => (),
            n => return Err(ModelError::MultiplePrimaryKeys(n)),
        }
        let mut primary = None;
        let mut subkeys = Vec::with_capacity(keys.len() - 1);
        for key in keys {
            if key.is_primary() {
                primary = Some(key);
            } else {
                subkeys.push(key);
            }
        }
        // The count above guarantees the primary exists.
        let Some(primary) = primary else {
            return Err(ModelError::NoPrimaryKey);
        };
        Ok(RawKey {
            primary,
            subkeys,
            user_ids,
        })
    }

    /// Assembles a ring from already-separated parts, normalizing the
    /// primary flags: `primary` is flagged primary, subkeys are not.
    pub fn from_parts(primary: Key, subkeys: Vec<Key>, user_ids: Vec<RawUserId>) -> RawKey {
        let primary = primary.mark_primary();
        let subkeys = subkeys
            .into_iter()
            .map(|mut k| {
                k.primary = false;
                k
            })
            .collect();
        RawKey {
            primary,
            subkeys,
            user_ids,
        }
    }

    /// The ring's identity: the primary key's id.
    pub fn key_id(&self) -> KeyId {
        self.primary.key_id()
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        self.primary.fingerprint()
    }

    pub fn primary(&self) -> &Key {
        &self.primary
    }

    pub fn subkeys(&self) -> &[Key] {
        &self.subkeys
    }

    pub fn user_ids(&self) -> &[RawUserId] {
        &self.user_ids
    }

    /// All member keys, primary first.
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        std::iter::once(&self.primary).chain(self.subkeys.iter())
    }

    /// Whether the ring carries secret material on any member key.
    pub fn secrecy(&self) -> Secrecy {
        if self.keys().any(Key::has_secret) {
            Secrecy::HasSecretMaterial
        } else {
            Secrecy::PublicOnly
        }
    }

    pub fn is_secret(&self) -> bool {
        self.secrecy() == Secrecy::HasSecretMaterial
    }

    /// Every certificate in the ring: the primary key's, then each
    /// subkey's, then each user id's.
    pub fn all_certs(&self) -> impl Iterator<Item = &Certificate> {
        self.keys()
            .flat_map(|k| k.certs().iter())
            .chain(self.user_ids.iter().flat_map(|u| u.certs().iter()))
    }

    pub fn cert_count(&self) -> usize {
        self.all_certs().count()
    }
}
