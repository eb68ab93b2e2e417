#![no_main]

use std::collections::HashSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use libfuzzer_sys::fuzz_target;
use pgring_canon::{SignatureVerifier, SignedData, VerifyError, canonicalize};
use pgring_core::{
    Certificate, CertificateType, Fingerprint, Key, KeyFlags, KeyId, OperationLog, RawKey,
    RawUserId,
};

const PRIMARY: u64 = 0xA000_0000_0000_0001;
const SUBKEY: u64 = 0xB000_0000_0000_0002;
const STRANGER: u64 = 0xC000_0000_0000_0003;

fn ts(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

fn fp(id: u64) -> Fingerprint {
    let mut bytes = [0x11u8; 20];
    bytes[12..].copy_from_slice(&id.to_be_bytes());
    Fingerprint::from_bytes(&bytes)
}

/// Decodes arbitrary bytes into a keyring: each 5-byte chunk becomes one
/// certificate attached to the component its first byte selects.
fn ring_from_bytes(data: &[u8]) -> RawKey {
    let mut primary = Key::new(KeyId::from(PRIMARY), fp(PRIMARY), ts(1)).mark_primary();
    let mut subkey = Key::new(KeyId::from(SUBKEY), fp(SUBKEY), ts(1));
    let mut uid_a = RawUserId::new(b"A <a@example.org>".to_vec());
    let mut uid_b = RawUserId::new(vec![0xFF, 0x00, 0x1b]);

    for chunk in data.chunks_exact(5) {
        let issuer = match chunk[2] % 3 {
            0 => PRIMARY,
            1 => SUBKEY,
            _ => STRANGER,
        };
        let mut cert = Certificate::new(
            CertificateType::from(chunk[1]),
            KeyId::from(issuer),
            ts(u64::from(chunk[3]) * 1000),
            chunk.to_vec(),
        );
        if chunk[4] & 0x01 != 0 {
            cert = cert.local_only();
        }
        if chunk[4] & 0x02 != 0 {
            cert = cert.with_key_flags(KeyFlags::from_bits(chunk[4] >> 2));
        }
        if chunk[4] & 0x04 != 0 {
            cert = cert.with_embedded(Certificate::new(
                CertificateType::PrimaryKeyBinding,
                KeyId::from(SUBKEY),
                ts(u64::from(chunk[3]) * 1000),
                vec![chunk[0], chunk[3]],
            ));
        }
        match chunk[0] % 4 {
            0 => primary.push_cert(cert),
            1 => subkey.push_cert(cert),
            2 => uid_a.push_cert(cert),
            _ => uid_b.push_cert(cert),
        }
    }
    RawKey::from_parts(primary, vec![subkey], vec![uid_a, uid_b])
}

/// Accepts or rejects deterministically off the certificate bytes.
struct ByteVerifier;

impl SignatureVerifier for ByteVerifier {
    fn verify(
        &self,
        cert: &Certificate,
        _signer: &Key,
        _data: SignedData<'_>,
    ) -> Result<bool, VerifyError> {
        match cert.raw().first() {
            Some(0xFF) => Err(VerifyError::Backend("fuzz".into())),
            Some(b) => Ok(b & 0x01 == 0),
            None => Ok(false),
        }
    }
}

fuzz_target!(|data: &[u8]| {
    // The engine must never panic, and on success must only ever keep
    // certificates that were present in the input.
    let ring = ring_from_bytes(data);
    let input: HashSet<Vec<u8>> = ring.all_certs().map(|c| c.raw().to_vec()).collect();
    let mut log = OperationLog::new();
    match canonicalize(&ring, &ByteVerifier, ts(200_000_000), &mut log, 0) {
        Ok(result) => {
            assert!(!log.has_error());
            for cert in result.key.as_raw().all_certs() {
                assert!(input.contains(cert.raw()));
            }
        }
        Err(_) => assert!(log.has_error()),
    }
});
