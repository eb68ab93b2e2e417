#![allow(dead_code)]

use std::collections::HashSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use pgring_canon::{SignatureVerifier, SignedData, VerifyError};
use pgring_core::{
    Certificate, CertificateType, Fingerprint, Key, KeyId, ProtectionMode, RawUserId,
    SecretMaterial,
};

/// Fixed reference time for all tests.
pub const NOW_SECS: u64 = 1_000_000;

pub const PRIMARY: u64 = 0xAAAA_0000_0000_0001;
pub const SUBKEY: u64 = 0xBBBB_0000_0000_0002;
pub const STRANGER: u64 = 0xCCCC_0000_0000_0003;

pub fn ts(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

pub fn now() -> SystemTime {
    ts(NOW_SECS)
}

pub fn fp(id: u64) -> Fingerprint {
    let mut bytes = [0x42u8; 20];
    bytes[12..].copy_from_slice(&id.to_be_bytes());
    Fingerprint::from_bytes(&bytes)
}

pub fn key(id: u64) -> Key {
    Key::new(KeyId::from(id), fp(id), ts(10))
}

pub fn primary_key(id: u64) -> Key {
    key(id).mark_primary()
}

pub fn secret(key: Key) -> Key {
    key.with_secret(SecretMaterial::new(ProtectionMode::Passphrase))
}

/// Builds a certificate whose raw bytes are unique per (tag, time).
pub fn cert(typ: CertificateType, issuer: u64, time: u64, tag: &str) -> Certificate {
    Certificate::new(
        typ,
        KeyId::from(issuer),
        ts(time),
        format!("{tag}@{time}").into_bytes(),
    )
}

pub fn uid(value: &str, certs: Vec<Certificate>) -> RawUserId {
    RawUserId::new(value.as_bytes().to_vec()).with_certs(certs)
}

/// A verifier driven by an explicit set of trusted certificates.
///
/// A certificate verifies iff it was registered with [`trust`] and its
/// issuer matches the alleged signer's key id. Certificates registered
/// with [`break_cert`] simulate a crypto backend failure.
///
/// [`trust`]: TestVerifier::trust
/// [`break_cert`]: TestVerifier::break_cert
#[derive(Default)]
pub struct TestVerifier {
    good: HashSet<Vec<u8>>,
    broken: HashSet<Vec<u8>>,
}

impl TestVerifier {
    pub fn new() -> TestVerifier {
        TestVerifier::default()
    }

    pub fn trust(&mut self, cert: &Certificate) {
        self.good.insert(cert.raw().to_vec());
    }

    pub fn trust_all<'a>(&mut self, certs: impl IntoIterator<Item = &'a Certificate>) {
        for cert in certs {
            self.trust(cert);
        }
    }

    pub fn break_cert(&mut self, cert: &Certificate) {
        self.broken.insert(cert.raw().to_vec());
    }
}

impl SignatureVerifier for TestVerifier {
    fn verify(
        &self,
        cert: &Certificate,
        signer: &Key,
        _data: SignedData<'_>,
    ) -> Result<bool, VerifyError> {
        if self.broken.contains(cert.raw()) {
            return Err(VerifyError::Backend("simulated backend failure".into()));
        }
        Ok(cert.issuer() == signer.key_id() && self.good.contains(cert.raw()))
    }
}
