//! Reduction of an untrusted keyring to its canonical form.
//!
//! Canonicalization walks a [`RawKey`] certificate by certificate and
//! keeps only material that verifies against the primary key (or, for
//! back-signatures, against the subkey) and is not superseded by a newer
//! certificate of the same kind. It never mutates its input: every
//! surviving key and user id is rebuilt around its surviving certificate
//! set, because certificate packets do not support in-place deletion.
//!
//! Dropped certificates fall into two classes. *Bad* certificates are
//! rejected on their own demerits: wrong type for their context, a
//! creation time in the future, the local-only flag, a foreign issuer
//! where only the key holder may sign, or a failed verification. They are
//! logged at `Warn`. *Redundant* certificates were valid but lost to a
//! newer competitor; they are logged at `Debug`. Neither class aborts the
//! operation. The only fatal outcome is a keyring with no valid user id
//! left.

use std::time::SystemTime;

use thiserror::Error;

use pgring_core::types::unix_time;
use pgring_core::{
    Certificate, CertificateType, Fingerprint, Key, KeyId, LogCode, LogLevel, OperationLog, RawKey,
    RawUserId,
};

use crate::verify::{SignatureVerifier, SignedData};

/// The single structural failure of canonicalization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CanonicalizeError {
    /// No user id survived; a keyring without an identity must not be
    /// persisted.
    #[error("no valid user id remains")]
    NoValidUserId,
}

/// A keyring that passed canonicalization.
///
/// Shaped like a [`RawKey`], but every retained certificate has been
/// verified, each component carries at most one live certificate of each
/// kind, every subkey has a live binding, and at least one user id
/// survives. Only the engine constructs values of this type.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalKey {
    ring: RawKey,
}

impl CanonicalKey {
    pub fn key_id(&self) -> KeyId {
        self.ring.key_id()
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        self.ring.fingerprint()
    }

    pub fn primary(&self) -> &Key {
        self.ring.primary()
    }

    pub fn subkeys(&self) -> &[Key] {
        self.ring.subkeys()
    }

    pub fn user_ids(&self) -> &[RawUserId] {
        self.ring.user_ids()
    }

    pub fn is_secret(&self) -> bool {
        self.ring.is_secret()
    }

    /// Whether the primary key carries a live revocation.
    pub fn is_revoked(&self) -> bool {
        self.ring
            .primary()
            .certs()
            .iter()
            .any(|c| c.typ() == CertificateType::KeyRevocation)
    }

    /// Whether the given user id is retained and revoked. `None` if the
    /// user id did not survive canonicalization.
    pub fn user_id_revoked(&self, value: &[u8]) -> Option<bool> {
        self.ring.user_ids().iter().find(|u| u.value() == value).map(|u| {
            u.certs()
                .iter()
                .any(|c| c.typ() == CertificateType::CertificationRevocation)
        })
    }

    /// Whether the given subkey is retained and revoked. `None` if the
    /// subkey did not survive canonicalization.
    pub fn subkey_revoked(&self, id: KeyId) -> Option<bool> {
        self.ring.subkeys().iter().find(|k| k.key_id() == id).map(|k| {
            k.certs()
                .iter()
                .any(|c| c.typ() == CertificateType::SubkeyRevocation)
        })
    }

    pub fn cert_count(&self) -> usize {
        self.ring.cert_count()
    }

    pub fn as_raw(&self) -> &RawKey {
        &self.ring
    }

    /// Unwraps the underlying ring, e.g. to feed it back into a merge.
    pub fn into_raw(self) -> RawKey {
        self.ring
    }
}

/// Successful canonicalization: the reduced key plus drop counters.
#[derive(Debug, Clone, PartialEq)]
pub struct Canonicalized {
    pub key: CanonicalKey,
    /// Certificates rejected on their own demerits.
    pub bad_certs: usize,
    /// Valid certificates superseded by newer ones.
    pub redundant_certs: usize,
}

#[derive(Debug, Default)]
struct CertStats {
    bad: usize,
    redundant: usize,
}

/// Reduces `ring` to canonical form.
///
/// `now` is the reference time for rejecting future-dated certificates;
/// callers pass the current time, tests pass a fixed one. Every decision
/// is appended to `log` at `indent` and below. On the fatal outcome the
/// log ends with an `Error` entry and no key is produced.
pub fn canonicalize<V>(
    ring: &RawKey,
    verifier: &V,
    now: SystemTime,
    log: &mut OperationLog,
    indent: usize,
) -> Result<Canonicalized, CanonicalizeError>
where
    V: SignatureVerifier + ?Sized,
{
    log.add_with(
        LogLevel::Start,
        indent,
        LogCode::CanonicalizeStart,
        vec![ring.key_id().to_string()],
    );
    let indent = indent + 1;
    let secrecy_code = if ring.is_secret() {
        LogCode::CanonicalizeSecret
    } else {
        LogCode::CanonicalizePublic
    };
    log.add(LogLevel::Debug, indent, secrecy_code);

    let mut stats = CertStats::default();

    let primary = canonicalize_primary_certs(ring, verifier, now, log, indent, &mut stats);
    let user_ids = canonicalize_user_ids(ring, verifier, now, log, indent, &mut stats);

    if user_ids.is_empty() {
        log.add(LogLevel::Error, indent, LogCode::NoValidUserId);
        return Err(CanonicalizeError::NoValidUserId);
    }

    let subkeys = canonicalize_subkeys(ring, verifier, now, log, indent, &mut stats);

    match (stats.bad, stats.redundant) {
        (0, 0) => log.add(LogLevel::Ok, indent, LogCode::SuccessClean),
        (bad, 0) => log.add_with(
            LogLevel::Ok,
            indent,
            LogCode::SuccessBadDropped,
            vec![bad.to_string()],
        ),
        (0, redundant) => log.add_with(
            LogLevel::Ok,
            indent,
            LogCode::SuccessRedundantDropped,
            vec![redundant.to_string()],
        ),
        (bad, redundant) => log.add_with(
            LogLevel::Ok,
            indent,
            LogCode::SuccessBothDropped,
            vec![bad.to_string(), redundant.to_string()],
        ),
    }

    Ok(Canonicalized {
        key: CanonicalKey {
            ring: RawKey::from_parts(primary, subkeys, user_ids),
        },
        bad_certs: stats.bad,
        redundant_certs: stats.redundant,
    })
}

/// Keeps the newest of two competing certificates, counting and logging
/// the loser as redundant.
fn keep_newest(
    slot: &mut Option<Certificate>,
    cert: &Certificate,
    log: &mut OperationLog,
    indent: usize,
    code: LogCode,
    stats: &mut CertStats,
) {
    match slot {
        Some(kept) if kept.supersedes(cert) => {
            log.add(LogLevel::Debug, indent, code);
            stats.redundant += 1;
        }
        Some(_) => {
            log.add(LogLevel::Debug, indent, code);
            stats.redundant += 1;
            *slot = Some(cert.clone());
        }
        None => *slot = Some(cert.clone()),
    }
}

/// Phase A: certificates attached directly to the primary key.
///
/// Only key revocations are meaningful here; everything else attached to
/// the primary key is rejected. Of the surviving revocations only the
/// newest is kept.
fn canonicalize_primary_certs<V>(
    ring: &RawKey,
    verifier: &V,
    now: SystemTime,
    log: &mut OperationLog,
    indent: usize,
    stats: &mut CertStats,
) -> Key
where
    V: SignatureVerifier + ?Sized,
{
    let primary = ring.primary();
    let mut revocation: Option<Certificate> = None;

    for cert in primary.certs() {
        if cert.typ() != CertificateType::KeyRevocation {
            log.add_with(
                LogLevel::Warn,
                indent,
                LogCode::PrimaryCertBadType,
                vec![cert.typ().to_string()],
            );
            stats.bad += 1;
            continue;
        }
        if cert.creation_time() > now {
            log.add_with(
                LogLevel::Warn,
                indent,
                LogCode::PrimaryCertFuture,
                vec![unix_time(cert.creation_time()).to_string()],
            );
            stats.bad += 1;
            continue;
        }
        if cert.is_local() {
            log.add(LogLevel::Warn, indent, LogCode::PrimaryCertLocal);
            stats.bad += 1;
            continue;
        }
        match verifier.verify(cert, primary, SignedData::Primary(primary)) {
            Ok(true) => (),
            Ok(false) => {
                log.add(LogLevel::Warn, indent, LogCode::PrimaryCertBadSignature);
                stats.bad += 1;
                continue;
            }
            Err(e) => {
                log.add_with(
                    LogLevel::Warn,
                    indent,
                    LogCode::PrimaryCertError,
                    vec![e.to_string()],
                );
                stats.bad += 1;
                continue;
            }
        }
        keep_newest(
            &mut revocation,
            cert,
            log,
            indent,
            LogCode::RevocationRedundant,
            stats,
        );
    }

    if let Some(r) = &revocation {
        log.add_with(
            LogLevel::Debug,
            indent,
            LogCode::PrimaryRevoked,
            vec![unix_time(r.creation_time()).to_string()],
        );
    }

    primary.replacing_certs(revocation.into_iter().collect())
}

/// Phase B: user ids, each evaluated independently.
///
/// A user id survives only with a verified self-certification. If its
/// newest surviving event is a revocation it is retained as revoked;
/// foreign certifications are kept unverified on public keyrings and
/// rejected on secret ones.
fn canonicalize_user_ids<V>(
    ring: &RawKey,
    verifier: &V,
    now: SystemTime,
    log: &mut OperationLog,
    indent: usize,
    stats: &mut CertStats,
) -> Vec<RawUserId>
where
    V: SignatureVerifier + ?Sized,
{
    let primary = ring.primary();
    let primary_id = primary.key_id();
    let secret_ring = ring.is_secret();
    let mut out = Vec::new();

    for uid in ring.user_ids() {
        log.add_with(
            LogLevel::Debug,
            indent,
            LogCode::UserIdProcessing,
            vec![uid.display()],
        );
        let indent = indent + 1;

        let mut self_cert: Option<Certificate> = None;
        let mut revocation: Option<Certificate> = None;
        let mut foreign: Vec<Certificate> = Vec::new();

        for cert in uid.certs() {
            if !cert.typ().targets_user_id() {
                log.add_with(
                    LogLevel::Warn,
                    indent,
                    LogCode::UserIdBadType,
                    vec![cert.typ().to_string()],
                );
                stats.bad += 1;
                continue;
            }
            if cert.creation_time() > now {
                log.add_with(
                    LogLevel::Warn,
                    indent,
                    LogCode::UserIdFuture,
                    vec![unix_time(cert.creation_time()).to_string()],
                );
                stats.bad += 1;
                continue;
            }
            if cert.is_local() {
                log.add(LogLevel::Warn, indent, LogCode::UserIdLocal);
                stats.bad += 1;
                continue;
            }
            if cert.issuer() != primary_id {
                // Foreign certifications cannot be verified here (the
                // issuer key is not at hand). They are tolerated on
                // public keyrings for informational display, but must
                // never accumulate on a secret keyring's self structure.
                if secret_ring {
                    log.add_with(
                        LogLevel::Warn,
                        indent,
                        LogCode::UserIdForeignDropped,
                        vec![cert.issuer().to_string()],
                    );
                    stats.bad += 1;
                } else {
                    log.add_with(
                        LogLevel::Debug,
                        indent,
                        LogCode::UserIdForeignKept,
                        vec![cert.issuer().to_string()],
                    );
                    foreign.push(cert.clone());
                }
                continue;
            }
            let data = SignedData::UserId {
                primary,
                user_id: uid.value(),
            };
            match verifier.verify(cert, primary, data) {
                Ok(true) => (),
                Ok(false) => {
                    log.add_with(
                        LogLevel::Warn,
                        indent,
                        LogCode::UserIdBadSignature,
                        vec![uid.display()],
                    );
                    stats.bad += 1;
                    continue;
                }
                Err(e) => {
                    log.add_with(
                        LogLevel::Warn,
                        indent,
                        LogCode::UserIdCertError,
                        vec![e.to_string()],
                    );
                    stats.bad += 1;
                    continue;
                }
            }
            if cert.typ() == CertificateType::CertificationRevocation {
                keep_newest(
                    &mut revocation,
                    cert,
                    log,
                    indent,
                    LogCode::UserIdRevocationRedundant,
                    stats,
                );
            } else {
                keep_newest(
                    &mut self_cert,
                    cert,
                    log,
                    indent,
                    LogCode::UserIdCertRedundant,
                    stats,
                );
            }
        }

        // A revocation loses to a strictly newer self-certification; on a
        // tie the revocation stands.
        let superseded = matches!((&self_cert, &revocation),
            (Some(c), Some(r)) if c.supersedes(r));
        if superseded {
            log.add(LogLevel::Debug, indent, LogCode::UserIdRevocationSuperseded);
            stats.redundant += 1;
            revocation = None;
        }

        // Without a surviving self-certification the user id was never
        // validly bound to this key; a lone revocation revokes nothing.
        let Some(self_cert) = self_cert else {
            log.add_with(
                LogLevel::Warn,
                indent,
                LogCode::UserIdDropped,
                vec![uid.display()],
            );
            continue;
        };

        if revocation.is_some() {
            log.add_with(
                LogLevel::Debug,
                indent,
                LogCode::UserIdRevoked,
                vec![uid.display()],
            );
        }

        let mut certs = vec![self_cert];
        certs.extend(revocation);
        certs.extend(foreign);
        out.push(uid.replacing_certs(certs));
    }

    out
}

enum BackSig {
    Valid,
    Missing,
    Bad,
}

/// Looks for a verifying embedded primary-key-binding back-signature on a
/// signing-capable subkey binding. The back-signature is made *by the
/// subkey* over the same binding; it proves the subkey consents to
/// represent the primary key.
fn check_back_sig<V>(binding: &Certificate, verifier: &V, primary: &Key, subkey: &Key) -> BackSig
where
    V: SignatureVerifier + ?Sized,
{
    let mut seen = false;
    for embedded in binding.embedded() {
        if embedded.typ() != CertificateType::PrimaryKeyBinding {
            continue;
        }
        seen = true;
        let data = SignedData::SubkeyBinding { primary, subkey };
        if let Ok(true) = verifier.verify(embedded, subkey, data) {
            return BackSig::Valid;
        }
    }
    if seen { BackSig::Bad } else { BackSig::Missing }
}

/// Phase C: subkeys, each evaluated independently.
///
/// A subkey survives only with a verified binding by the primary key; a
/// signing-capable binding additionally needs a verifying back-signature.
/// A revocation is kept only if the surviving binding does not postdate
/// it.
fn canonicalize_subkeys<V>(
    ring: &RawKey,
    verifier: &V,
    now: SystemTime,
    log: &mut OperationLog,
    indent: usize,
    stats: &mut CertStats,
) -> Vec<Key>
where
    V: SignatureVerifier + ?Sized,
{
    let primary = ring.primary();
    let primary_id = primary.key_id();
    let mut out = Vec::new();

    for subkey in ring.subkeys() {
        log.add_with(
            LogLevel::Debug,
            indent,
            LogCode::SubkeyProcessing,
            vec![subkey.key_id().to_string()],
        );
        let indent = indent + 1;

        let mut binding: Option<Certificate> = None;
        let mut revocation: Option<Certificate> = None;

        for cert in subkey.certs() {
            let typ = cert.typ();
            if typ != CertificateType::SubkeyBinding && typ != CertificateType::SubkeyRevocation {
                log.add_with(
                    LogLevel::Warn,
                    indent,
                    LogCode::SubkeyBadType,
                    vec![typ.to_string()],
                );
                stats.bad += 1;
                continue;
            }
            if cert.issuer() != primary_id {
                log.add_with(
                    LogLevel::Warn,
                    indent,
                    LogCode::SubkeyForeignIssuer,
                    vec![cert.issuer().to_string()],
                );
                stats.bad += 1;
                continue;
            }
            if cert.creation_time() > now {
                log.add_with(
                    LogLevel::Warn,
                    indent,
                    LogCode::SubkeyFuture,
                    vec![unix_time(cert.creation_time()).to_string()],
                );
                stats.bad += 1;
                continue;
            }
            if cert.is_local() {
                log.add(LogLevel::Warn, indent, LogCode::SubkeyLocal);
                stats.bad += 1;
                continue;
            }
            let data = SignedData::SubkeyBinding { primary, subkey };
            match verifier.verify(cert, primary, data) {
                Ok(true) => (),
                Ok(false) => {
                    log.add(LogLevel::Warn, indent, LogCode::SubkeyBadSignature);
                    stats.bad += 1;
                    continue;
                }
                Err(e) => {
                    log.add_with(
                        LogLevel::Warn,
                        indent,
                        LogCode::SubkeyCertError,
                        vec![e.to_string()],
                    );
                    stats.bad += 1;
                    continue;
                }
            }
            if typ == CertificateType::SubkeyBinding {
                // A signing-capable subkey must prove, via an embedded
                // back-signature, that it consents to represent the
                // primary key; a verified outer binding alone is not
                // enough (subkey rebinding attacks).
                if cert.grants_signing() {
                    match check_back_sig(cert, verifier, primary, subkey) {
                        BackSig::Valid => (),
                        BackSig::Missing => {
                            log.add(LogLevel::Warn, indent, LogCode::SubkeyMissingBackSig);
                            stats.bad += 1;
                            continue;
                        }
                        BackSig::Bad => {
                            log.add(LogLevel::Warn, indent, LogCode::SubkeyBadBackSig);
                            stats.bad += 1;
                            continue;
                        }
                    }
                }
                keep_newest(
                    &mut binding,
                    cert,
                    log,
                    indent,
                    LogCode::SubkeyBindingRedundant,
                    stats,
                );
            } else {
                keep_newest(
                    &mut revocation,
                    cert,
                    log,
                    indent,
                    LogCode::SubkeyRevocationRedundant,
                    stats,
                );
            }
        }

        let Some(binding) = binding else {
            log.add_with(
                LogLevel::Warn,
                indent,
                LogCode::SubkeyDropped,
                vec![subkey.key_id().to_string()],
            );
            continue;
        };

        // A revocation that predates the kept binding revoked a binding
        // that no longer exists.
        if let Some(r) = revocation.take() {
            if binding.creation_time() > r.creation_time() {
                log.add(LogLevel::Debug, indent, LogCode::SubkeyRevocationRedundant);
                stats.redundant += 1;
            } else {
                log.add_with(
                    LogLevel::Debug,
                    indent,
                    LogCode::SubkeyRevoked,
                    vec![unix_time(r.creation_time()).to_string()],
                );
                revocation = Some(r);
            }
        }

        let mut certs = vec![binding];
        certs.extend(revocation);
        out.push(subkey.replacing_certs(certs));
    }

    out
}
