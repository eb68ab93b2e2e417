#![no_main]

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use libfuzzer_sys::fuzz_target;
use pgring_canon::{SignatureVerifier, SignedData, VerifyError, canonicalize, merge};
use pgring_core::{
    Certificate, CertificateType, Fingerprint, Key, KeyId, OperationLog, RawKey, RawUserId,
};

const PRIMARY: u64 = 0xA000_0000_0000_0001;
const SUBKEY: u64 = 0xB000_0000_0000_0002;

fn ts(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

fn fp(id: u64) -> Fingerprint {
    let mut bytes = [0x11u8; 20];
    bytes[12..].copy_from_slice(&id.to_be_bytes());
    Fingerprint::from_bytes(&bytes)
}

/// Decodes one half of the input into a keyring over a fixed primary key,
/// so that two halves always merge instead of failing as heterogeneous.
fn ring_from_bytes(data: &[u8]) -> RawKey {
    let mut primary = Key::new(KeyId::from(PRIMARY), fp(PRIMARY), ts(1)).mark_primary();
    let mut subkey = Key::new(KeyId::from(SUBKEY), fp(SUBKEY), ts(1));
    let mut uid = RawUserId::new(b"A <a@example.org>".to_vec());

    for chunk in data.chunks_exact(4) {
        let cert = Certificate::new(
            CertificateType::from(chunk[1]),
            KeyId::from(PRIMARY),
            ts(u64::from(chunk[2]) * 1000),
            chunk.to_vec(),
        );
        match chunk[0] % 3 {
            0 => primary.push_cert(cert),
            1 => subkey.push_cert(cert),
            _ => uid.push_cert(cert),
        }
    }
    RawKey::from_parts(primary, vec![subkey], vec![uid])
}

/// Accepts every well-formed certificate, deterministically.
struct AcceptAll;

impl SignatureVerifier for AcceptAll {
    fn verify(
        &self,
        _cert: &Certificate,
        _signer: &Key,
        _data: SignedData<'_>,
    ) -> Result<bool, VerifyError> {
        Ok(true)
    }
}

fuzz_target!(|data: &[u8]| {
    let (left, right) = data.split_at(data.len() / 2);
    let a = ring_from_bytes(left);
    let b = ring_from_bytes(right);

    let mut log = OperationLog::new();

    // Merging a ring with itself is a no-op.
    let (same, added) = merge(&a, &a, &mut log, 0).unwrap();
    assert_eq!(added, 0);
    assert_eq!(same, a);

    // A merged union never loses certificates and stays canonicalizable.
    let (merged, added) = merge(&a, &b, &mut log, 0).unwrap();
    assert!(merged.cert_count() >= a.cert_count());
    assert_eq!(merged.cert_count(), a.cert_count() + added);

    let mut canon_log = OperationLog::new();
    match canonicalize(&merged, &AcceptAll, ts(200_000_000), &mut canon_log, 0) {
        Ok(_) => assert!(!canon_log.has_error()),
        Err(_) => assert!(canon_log.has_error()),
    }
});
