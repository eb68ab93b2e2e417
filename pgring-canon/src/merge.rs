//! Union of two versions of the same logical keyring.
//!
//! Merging combines a local copy of a keyring with another version of it
//! (e.g. one fetched from a keyserver) into a strict superset of both.
//! Certificates are deduplicated on their full encoded bytes; nothing is
//! verified or reduced here, so the result is raw material that must be
//! canonicalized before use.

use std::collections::HashSet;

use thiserror::Error;

use pgring_core::{Key, KeyId, LogCode, LogLevel, OperationLog, RawKey, RawUserId};

/// Fatal merge failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    /// The two inputs are not versions of the same keyring.
    #[error("cannot merge keyrings with different primary keys ({base} vs {incoming})")]
    HeterogeneousKeys { base: KeyId, incoming: KeyId },
}

/// Merges `incoming` into `base`, returning the union and the number of
/// newly adopted certificates.
///
/// Keys present only in `incoming` are appended whole; keys known to
/// `base` contribute only certificates whose encoded bytes `base` has not
/// seen anywhere. Base packets are never replaced, so secret material in
/// `base` is never displaced by a public copy of the same key. The result
/// is not canonical; callers re-canonicalize it.
pub fn merge(
    base: &RawKey,
    incoming: &RawKey,
    log: &mut OperationLog,
    indent: usize,
) -> Result<(RawKey, usize), MergeError> {
    log.add_with(
        LogLevel::Start,
        indent,
        LogCode::MergeStart,
        vec![base.key_id().to_string()],
    );
    let indent = indent + 1;

    if base.key_id() != incoming.key_id() {
        log.add_with(
            LogLevel::Error,
            indent,
            LogCode::MergeHeterogeneous,
            vec![base.key_id().to_string(), incoming.key_id().to_string()],
        );
        return Err(MergeError::HeterogeneousKeys {
            base: base.key_id(),
            incoming: incoming.key_id(),
        });
    }

    let mut seen: HashSet<Vec<u8>> = base.all_certs().map(|c| c.raw().to_vec()).collect();
    let mut new_certs = 0usize;

    let mut primary = base.primary().clone();
    for cert in incoming.primary().certs() {
        if seen.insert(cert.raw().to_vec()) {
            log.add_with(
                LogLevel::Debug,
                indent,
                LogCode::MergeNewCert,
                vec![primary.key_id().to_string()],
            );
            primary.push_cert(cert.clone());
            new_certs += 1;
        }
    }

    let mut subkeys: Vec<Key> = base.subkeys().to_vec();
    for in_sub in incoming.subkeys() {
        match subkeys.iter_mut().find(|k| k.key_id() == in_sub.key_id()) {
            Some(existing) => {
                for cert in in_sub.certs() {
                    if seen.insert(cert.raw().to_vec()) {
                        log.add_with(
                            LogLevel::Debug,
                            indent,
                            LogCode::MergeNewCert,
                            vec![in_sub.key_id().to_string()],
                        );
                        existing.push_cert(cert.clone());
                        new_certs += 1;
                    }
                }
            }
            None => {
                log.add_with(
                    LogLevel::Debug,
                    indent,
                    LogCode::MergeNewSubkey,
                    vec![in_sub.key_id().to_string()],
                );
                for cert in in_sub.certs() {
                    seen.insert(cert.raw().to_vec());
                }
                new_certs += in_sub.certs().len();
                subkeys.push(in_sub.clone());
            }
        }
    }

    let mut user_ids: Vec<RawUserId> = base.user_ids().to_vec();
    for in_uid in incoming.user_ids() {
        match user_ids.iter_mut().find(|u| u.value() == in_uid.value()) {
            Some(existing) => {
                for cert in in_uid.certs() {
                    if seen.insert(cert.raw().to_vec()) {
                        log.add_with(
                            LogLevel::Debug,
                            indent,
                            LogCode::MergeNewCert,
                            vec![in_uid.display()],
                        );
                        existing.push_cert(cert.clone());
                        new_certs += 1;
                    }
                }
            }
            None => {
                log.add_with(
                    LogLevel::Debug,
                    indent,
                    LogCode::MergeNewUserId,
                    vec![in_uid.display()],
                );
                for cert in in_uid.certs() {
                    seen.insert(cert.raw().to_vec());
                }
                new_certs += in_uid.certs().len();
                user_ids.push(in_uid.clone());
            }
        }
    }

    log.add_with(
        LogLevel::Info,
        indent,
        LogCode::MergeComplete,
        vec![new_certs.to_string()],
    );

    Ok((RawKey::from_parts(primary, subkeys, user_ids), new_certs))
}
