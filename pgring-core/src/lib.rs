//! Data model for OpenPGP keyring canonicalization.
//!
//! This crate defines the structured view of an OpenPGP keyring that the
//! canonicalization and merge engines (`pgring-canon`) operate on: key ids
//! and fingerprints, signature types and key-usage flags, certificates,
//! keys, raw keyrings, and the operation log that records every decision
//! the engines make.
//!
//! Nothing here parses packet bytes. A packet parser hands this crate
//! already-decoded material; the raw encoded bytes of each certificate are
//! retained only so that the merge engine can deduplicate byte-for-byte.
//! All inputs are treated as untrusted until the canonicalization engine
//! has verified them.

pub mod cert;
pub mod error;
pub mod fingerprint;
pub mod key;
pub mod keyid;
pub mod log;
pub mod types;

pub use cert::Certificate;
pub use error::ModelError;
pub use fingerprint::Fingerprint;
pub use key::{Key, RawKey, RawUserId, Secrecy, SecretMaterial};
pub use keyid::KeyId;
pub use log::{LogCode, LogEntry, LogLevel, OperationLog};
pub use types::{CertificateType, KeyFlags, ProtectionMode};

/// Sanitizes untrusted text for human-readable output.
///
/// User IDs are attacker-controlled and may contain control characters or
/// ANSI escape sequences. Anything that is not printable is replaced or
/// escaped so log output cannot be manipulated.
pub fn sanitize_for_display(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\n' | '\r' | '\t' => out.push(' '),
            c if c.is_control() => {
                let code = c as u32;
                if code <= 0xFF {
                    out.push_str(&format!("\\x{code:02X}"));
                } else {
                    out.push_str(&format!("\\u{{{code:X}}}"));
                }
            }
            c => out.push(c),
        }
    }
    out
}
