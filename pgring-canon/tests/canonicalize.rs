mod common;

use std::collections::HashSet;

use common::{
    NOW_SECS, PRIMARY, STRANGER, SUBKEY, TestVerifier, cert, key, now, primary_key, secret, uid,
};
use pgring_canon::{CanonicalizeError, canonicalize};
use pgring_core::CertificateType::*;
use pgring_core::{KeyFlags, KeyId, LogCode, OperationLog, RawKey};

#[test]
fn clean_key_is_unchanged_and_idempotent() {
    let sc = cert(PositiveCertification, PRIMARY, 100, "uid-alice");
    let ring = RawKey::from_parts(
        primary_key(PRIMARY),
        vec![],
        vec![uid("Alice <alice@example.org>", vec![sc.clone()])],
    );
    let mut verifier = TestVerifier::new();
    verifier.trust(&sc);

    let mut log = OperationLog::new();
    let first = canonicalize(&ring, &verifier, now(), &mut log, 0).expect("canonical");
    assert_eq!(first.bad_certs, 0);
    assert_eq!(first.redundant_certs, 0);
    assert!(log.contains(LogCode::SuccessClean));
    assert!(!log.has_error());

    let mut log = OperationLog::new();
    let second = canonicalize(first.key.as_raw(), &verifier, now(), &mut log, 0).expect("again");
    assert_eq!(second.key, first.key);
    assert_eq!(second.bad_certs, 0);
    assert_eq!(second.redundant_certs, 0);
    assert!(log.contains(LogCode::SuccessClean));
}

#[test]
fn output_certificates_are_a_subset_of_the_input() {
    let sc_old = cert(PositiveCertification, PRIMARY, 100, "uid-old");
    let sc_new = cert(PositiveCertification, PRIMARY, 200, "uid-new");
    let junk = cert(Unknown(0x1f), PRIMARY, 100, "direct-key");
    let binding = cert(SubkeyBinding, PRIMARY, 150, "bind");
    let foreign = cert(GenericCertification, STRANGER, 120, "stranger");

    let ring = RawKey::from_parts(
        primary_key(PRIMARY).with_certs(vec![junk]),
        vec![key(SUBKEY).with_certs(vec![binding.clone()])],
        vec![uid(
            "Alice <alice@example.org>",
            vec![sc_old.clone(), sc_new.clone(), foreign],
        )],
    );
    let mut verifier = TestVerifier::new();
    verifier.trust_all([&sc_old, &sc_new, &binding]);

    let input: HashSet<Vec<u8>> = ring.all_certs().map(|c| c.raw().to_vec()).collect();
    let mut log = OperationLog::new();
    let result = canonicalize(&ring, &verifier, now(), &mut log, 0).expect("canonical");

    assert!(result.key.cert_count() <= ring.cert_count());
    for cert in result.key.as_raw().all_certs() {
        assert!(input.contains(cert.raw()), "canonicalization invented a certificate");
    }
}

#[test]
fn newer_self_cert_supersedes_older_revocation() {
    // Self-cert at t=100, revocation at t=50: the user id stays live and
    // the revocation is dropped as redundant, not bad.
    let sc = cert(PositiveCertification, PRIMARY, 100, "uid-cert");
    let rev = cert(CertificationRevocation, PRIMARY, 50, "uid-rev");
    let ring = RawKey::from_parts(
        primary_key(PRIMARY),
        vec![],
        vec![uid("A", vec![sc.clone(), rev.clone()])],
    );
    let mut verifier = TestVerifier::new();
    verifier.trust_all([&sc, &rev]);

    let mut log = OperationLog::new();
    let result = canonicalize(&ring, &verifier, now(), &mut log, 0).expect("canonical");

    assert_eq!(result.key.user_id_revoked(b"A"), Some(false));
    assert_eq!(result.bad_certs, 0);
    assert_eq!(result.redundant_certs, 1);
    assert!(log.contains(LogCode::UserIdRevocationSuperseded));
    assert!(log.contains(LogCode::SuccessRedundantDropped));
}

#[test]
fn newest_revocation_flags_user_id_revoked() {
    let sc = cert(PositiveCertification, PRIMARY, 100, "uid-cert");
    let rev = cert(CertificationRevocation, PRIMARY, 200, "uid-rev");
    let ring = RawKey::from_parts(
        primary_key(PRIMARY),
        vec![],
        vec![uid("A", vec![sc.clone(), rev.clone()])],
    );
    let mut verifier = TestVerifier::new();
    verifier.trust_all([&sc, &rev]);

    let mut log = OperationLog::new();
    let result = canonicalize(&ring, &verifier, now(), &mut log, 0).expect("canonical");

    assert_eq!(result.key.user_id_revoked(b"A"), Some(true));
    // Both the certification and its revocation are retained.
    assert_eq!(result.key.user_ids()[0].certs().len(), 2);
    assert_eq!(result.redundant_certs, 0);
    assert!(log.contains(LogCode::UserIdRevoked));
}

#[test]
fn only_newest_primary_revocation_survives() {
    let sc = cert(PositiveCertification, PRIMARY, 100, "uid");
    let rev_old = cert(KeyRevocation, PRIMARY, 300, "rev-old");
    let rev_new = cert(KeyRevocation, PRIMARY, 400, "rev-new");
    let ring = RawKey::from_parts(
        primary_key(PRIMARY).with_certs(vec![rev_old.clone(), rev_new.clone()]),
        vec![],
        vec![uid("A", vec![sc.clone()])],
    );
    let mut verifier = TestVerifier::new();
    verifier.trust_all([&sc, &rev_old, &rev_new]);

    let mut log = OperationLog::new();
    let result = canonicalize(&ring, &verifier, now(), &mut log, 0).expect("canonical");

    assert!(result.key.is_revoked());
    let kept = result.key.primary().certs();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].raw(), rev_new.raw());
    assert_eq!(result.redundant_certs, 1);
    assert!(log.contains(LogCode::RevocationRedundant));
    assert!(log.contains(LogCode::PrimaryRevoked));
}

#[test]
fn future_dated_certificates_are_rejected() {
    let sc = cert(PositiveCertification, PRIMARY, 100, "uid");
    let rev = cert(KeyRevocation, PRIMARY, NOW_SECS + 500, "future-rev");
    let ring = RawKey::from_parts(
        primary_key(PRIMARY).with_certs(vec![rev.clone()]),
        vec![],
        vec![uid("A", vec![sc.clone()])],
    );
    let mut verifier = TestVerifier::new();
    verifier.trust_all([&sc, &rev]);

    let mut log = OperationLog::new();
    let result = canonicalize(&ring, &verifier, now(), &mut log, 0).expect("canonical");

    assert!(!result.key.is_revoked());
    assert_eq!(result.bad_certs, 1);
    assert!(log.contains(LogCode::PrimaryCertFuture));
    assert!(log.contains(LogCode::SuccessBadDropped));
    assert!(!log.has_error());
}

#[test]
fn local_only_certificates_are_rejected() {
    let sc = cert(PositiveCertification, PRIMARY, 100, "uid");
    let local = cert(PositiveCertification, PRIMARY, 200, "uid-local").local_only();
    let ring = RawKey::from_parts(
        primary_key(PRIMARY),
        vec![],
        vec![uid("A", vec![sc.clone(), local.clone()])],
    );
    let mut verifier = TestVerifier::new();
    verifier.trust_all([&sc, &local]);

    let mut log = OperationLog::new();
    let result = canonicalize(&ring, &verifier, now(), &mut log, 0).expect("canonical");

    // The newer but local-only certification is bad, not a competitor.
    let kept = &result.key.user_ids()[0];
    assert_eq!(kept.certs().len(), 1);
    assert_eq!(kept.certs()[0].raw(), sc.raw());
    assert_eq!(result.bad_certs, 1);
    assert!(log.contains(LogCode::UserIdLocal));
}

#[test]
fn unknown_type_on_primary_key_is_rejected() {
    let sc = cert(PositiveCertification, PRIMARY, 100, "uid");
    let direct = cert(Unknown(0x1f), PRIMARY, 100, "direct-key");
    let ring = RawKey::from_parts(
        primary_key(PRIMARY).with_certs(vec![direct]),
        vec![],
        vec![uid("A", vec![sc.clone()])],
    );
    let mut verifier = TestVerifier::new();
    verifier.trust(&sc);

    let mut log = OperationLog::new();
    let result = canonicalize(&ring, &verifier, now(), &mut log, 0).expect("canonical");

    assert_eq!(result.bad_certs, 1);
    assert!(result.key.primary().certs().is_empty());
    assert!(log.contains(LogCode::PrimaryCertBadType));
}

#[test]
fn wrong_context_type_on_user_id_is_rejected() {
    let sc = cert(PositiveCertification, PRIMARY, 100, "uid");
    let misplaced = cert(SubkeyBinding, PRIMARY, 100, "misplaced");
    let ring = RawKey::from_parts(
        primary_key(PRIMARY),
        vec![],
        vec![uid("A", vec![sc.clone(), misplaced])],
    );
    let mut verifier = TestVerifier::new();
    verifier.trust(&sc);

    let mut log = OperationLog::new();
    let result = canonicalize(&ring, &verifier, now(), &mut log, 0).expect("canonical");

    assert_eq!(result.bad_certs, 1);
    assert!(log.contains(LogCode::UserIdBadType));
}

#[test]
fn verifier_errors_fail_closed() {
    let sc_good = cert(PositiveCertification, PRIMARY, 100, "uid-good");
    let sc_broken = cert(PositiveCertification, PRIMARY, 100, "uid-broken");
    let ring = RawKey::from_parts(
        primary_key(PRIMARY),
        vec![],
        vec![
            uid("Good", vec![sc_good.clone()]),
            uid("Broken", vec![sc_broken.clone()]),
        ],
    );
    let mut verifier = TestVerifier::new();
    verifier.trust(&sc_good);
    verifier.trust(&sc_broken);
    verifier.break_cert(&sc_broken);

    let mut log = OperationLog::new();
    let result = canonicalize(&ring, &verifier, now(), &mut log, 0).expect("canonical");

    assert_eq!(result.key.user_ids().len(), 1);
    assert_eq!(result.key.user_ids()[0].value(), b"Good");
    assert_eq!(result.bad_certs, 1);
    assert!(log.contains(LogCode::UserIdCertError));
    assert!(log.contains(LogCode::UserIdDropped));
    assert!(!log.has_error());
}

#[test]
fn foreign_certification_kept_on_public_keyring() {
    let sc = cert(PositiveCertification, PRIMARY, 100, "uid");
    let foreign = cert(GenericCertification, STRANGER, 120, "stranger");
    let ring = RawKey::from_parts(
        primary_key(PRIMARY),
        vec![],
        vec![uid("A", vec![sc.clone(), foreign.clone()])],
    );
    let mut verifier = TestVerifier::new();
    verifier.trust(&sc);

    let mut log = OperationLog::new();
    let result = canonicalize(&ring, &verifier, now(), &mut log, 0).expect("canonical");

    let kept = &result.key.user_ids()[0];
    assert!(kept.certs().iter().any(|c| c.raw() == foreign.raw()));
    assert_eq!(result.bad_certs, 0);
    assert!(log.contains(LogCode::UserIdForeignKept));
}

#[test]
fn foreign_certification_dropped_on_secret_keyring() {
    let sc = cert(PositiveCertification, PRIMARY, 100, "uid");
    let foreign = cert(GenericCertification, STRANGER, 120, "stranger");
    let ring = RawKey::from_parts(
        secret(primary_key(PRIMARY)),
        vec![],
        vec![uid("A", vec![sc.clone(), foreign.clone()])],
    );
    let mut verifier = TestVerifier::new();
    verifier.trust(&sc);

    let mut log = OperationLog::new();
    let result = canonicalize(&ring, &verifier, now(), &mut log, 0).expect("canonical");

    let kept = &result.key.user_ids()[0];
    assert!(kept.certs().iter().all(|c| c.raw() != foreign.raw()));
    assert_eq!(result.bad_certs, 1);
    assert!(log.contains(LogCode::UserIdForeignDropped));
}

#[test]
fn user_id_with_only_a_revocation_is_fatal() {
    // A revocation without any self-certification revokes nothing; if it
    // was the only user id, the key has no identity left.
    let rev = cert(CertificationRevocation, PRIMARY, 100, "uid-rev");
    let ring = RawKey::from_parts(primary_key(PRIMARY), vec![], vec![uid("A", vec![rev.clone()])]);
    let mut verifier = TestVerifier::new();
    verifier.trust(&rev);

    let mut log = OperationLog::new();
    let err = canonicalize(&ring, &verifier, now(), &mut log, 0).unwrap_err();

    assert_eq!(err, CanonicalizeError::NoValidUserId);
    assert!(log.has_error());
    assert!(log.contains(LogCode::UserIdDropped));
    assert!(log.contains(LogCode::NoValidUserId));
}

fn signing_ring(
    binding: pgring_core::Certificate,
) -> (RawKey, pgring_core::Certificate) {
    let sc = cert(PositiveCertification, PRIMARY, 100, "uid");
    let ring = RawKey::from_parts(
        primary_key(PRIMARY),
        vec![key(SUBKEY).with_certs(vec![binding])],
        vec![uid("A", vec![sc.clone()])],
    );
    (ring, sc)
}

#[test]
fn signing_binding_without_back_signature_is_rejected() {
    let binding =
        cert(SubkeyBinding, PRIMARY, 150, "bind-sign").with_key_flags(KeyFlags::from_bits(0x02));
    let (ring, sc) = signing_ring(binding.clone());
    let mut verifier = TestVerifier::new();
    verifier.trust_all([&sc, &binding]);

    let mut log = OperationLog::new();
    let result = canonicalize(&ring, &verifier, now(), &mut log, 0).expect("canonical");

    assert!(result.key.subkeys().is_empty());
    assert!(log.contains(LogCode::SubkeyMissingBackSig));
    assert!(log.contains(LogCode::SubkeyDropped));
    assert!(!log.has_error());
}

#[test]
fn signing_binding_with_unverifiable_back_signature_is_rejected() {
    let back = cert(PrimaryKeyBinding, SUBKEY, 150, "backsig");
    let binding = cert(SubkeyBinding, PRIMARY, 150, "bind-sign")
        .with_key_flags(KeyFlags::from_bits(0x02))
        .with_embedded(back);
    let (ring, sc) = signing_ring(binding.clone());
    let mut verifier = TestVerifier::new();
    // The outer binding verifies; the embedded back-signature does not.
    verifier.trust_all([&sc, &binding]);

    let mut log = OperationLog::new();
    let result = canonicalize(&ring, &verifier, now(), &mut log, 0).expect("canonical");

    assert!(result.key.subkeys().is_empty());
    assert!(log.contains(LogCode::SubkeyBadBackSig));
}

#[test]
fn signing_binding_with_valid_back_signature_is_kept() {
    let back = cert(PrimaryKeyBinding, SUBKEY, 150, "backsig");
    let binding = cert(SubkeyBinding, PRIMARY, 150, "bind-sign")
        .with_key_flags(KeyFlags::from_bits(0x02))
        .with_embedded(back.clone());
    let (ring, sc) = signing_ring(binding.clone());
    let mut verifier = TestVerifier::new();
    verifier.trust_all([&sc, &binding, &back]);

    let mut log = OperationLog::new();
    let result = canonicalize(&ring, &verifier, now(), &mut log, 0).expect("canonical");

    assert_eq!(result.key.subkeys().len(), 1);
    assert_eq!(result.bad_certs, 0);
}

#[test]
fn encryption_binding_needs_no_back_signature() {
    let binding =
        cert(SubkeyBinding, PRIMARY, 150, "bind-enc").with_key_flags(KeyFlags::from_bits(0x0c));
    let (ring, sc) = signing_ring(binding.clone());
    let mut verifier = TestVerifier::new();
    verifier.trust_all([&sc, &binding]);

    let mut log = OperationLog::new();
    let result = canonicalize(&ring, &verifier, now(), &mut log, 0).expect("canonical");

    assert_eq!(result.key.subkeys().len(), 1);
    assert_eq!(result.key.subkey_revoked(KeyId::from(SUBKEY)), Some(false));
}

#[test]
fn only_newest_subkey_binding_survives() {
    let bind_old = cert(SubkeyBinding, PRIMARY, 100, "bind-old");
    let bind_new = cert(SubkeyBinding, PRIMARY, 200, "bind-new");
    let sc = cert(PositiveCertification, PRIMARY, 100, "uid");
    let ring = RawKey::from_parts(
        primary_key(PRIMARY),
        vec![key(SUBKEY).with_certs(vec![bind_old.clone(), bind_new.clone()])],
        vec![uid("A", vec![sc.clone()])],
    );
    let mut verifier = TestVerifier::new();
    verifier.trust_all([&sc, &bind_old, &bind_new]);

    let mut log = OperationLog::new();
    let result = canonicalize(&ring, &verifier, now(), &mut log, 0).expect("canonical");

    let kept = result.key.subkeys()[0].certs();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].raw(), bind_new.raw());
    assert_eq!(result.redundant_certs, 1);
    assert!(log.contains(LogCode::SubkeyBindingRedundant));
}

#[test]
fn subkey_revocation_older_than_binding_is_redundant() {
    let rev = cert(SubkeyRevocation, PRIMARY, 150, "sub-rev");
    let binding = cert(SubkeyBinding, PRIMARY, 200, "bind");
    let sc = cert(PositiveCertification, PRIMARY, 100, "uid");
    let ring = RawKey::from_parts(
        primary_key(PRIMARY),
        vec![key(SUBKEY).with_certs(vec![rev.clone(), binding.clone()])],
        vec![uid("A", vec![sc.clone()])],
    );
    let mut verifier = TestVerifier::new();
    verifier.trust_all([&sc, &rev, &binding]);

    let mut log = OperationLog::new();
    let result = canonicalize(&ring, &verifier, now(), &mut log, 0).expect("canonical");

    assert_eq!(result.key.subkey_revoked(KeyId::from(SUBKEY)), Some(false));
    assert_eq!(result.redundant_certs, 1);
    assert!(log.contains(LogCode::SubkeyRevocationRedundant));
}

#[test]
fn subkey_revocation_newer_than_binding_is_kept() {
    let binding = cert(SubkeyBinding, PRIMARY, 200, "bind");
    let rev = cert(SubkeyRevocation, PRIMARY, 250, "sub-rev");
    let sc = cert(PositiveCertification, PRIMARY, 100, "uid");
    let ring = RawKey::from_parts(
        primary_key(PRIMARY),
        vec![key(SUBKEY).with_certs(vec![binding.clone(), rev.clone()])],
        vec![uid("A", vec![sc.clone()])],
    );
    let mut verifier = TestVerifier::new();
    verifier.trust_all([&sc, &binding, &rev]);

    let mut log = OperationLog::new();
    let result = canonicalize(&ring, &verifier, now(), &mut log, 0).expect("canonical");

    assert_eq!(result.key.subkey_revoked(KeyId::from(SUBKEY)), Some(true));
    assert_eq!(result.key.subkeys()[0].certs().len(), 2);
    assert!(log.contains(LogCode::SubkeyRevoked));
}

#[test]
fn subkey_without_binding_is_dropped() {
    let rev = cert(SubkeyRevocation, PRIMARY, 250, "sub-rev");
    let sc = cert(PositiveCertification, PRIMARY, 100, "uid");
    let ring = RawKey::from_parts(
        primary_key(PRIMARY),
        vec![key(SUBKEY).with_certs(vec![rev.clone()])],
        vec![uid("A", vec![sc.clone()])],
    );
    let mut verifier = TestVerifier::new();
    verifier.trust_all([&sc, &rev]);

    let mut log = OperationLog::new();
    let result = canonicalize(&ring, &verifier, now(), &mut log, 0).expect("canonical");

    assert!(result.key.subkeys().is_empty());
    assert!(log.contains(LogCode::SubkeyDropped));
    assert!(!log.has_error());
}

#[test]
fn subkey_certificate_from_foreign_issuer_is_rejected() {
    let binding = cert(SubkeyBinding, STRANGER, 150, "foreign-bind");
    let sc = cert(PositiveCertification, PRIMARY, 100, "uid");
    let ring = RawKey::from_parts(
        primary_key(PRIMARY),
        vec![key(SUBKEY).with_certs(vec![binding.clone()])],
        vec![uid("A", vec![sc.clone()])],
    );
    let mut verifier = TestVerifier::new();
    verifier.trust_all([&sc, &binding]);

    let mut log = OperationLog::new();
    let result = canonicalize(&ring, &verifier, now(), &mut log, 0).expect("canonical");

    assert!(result.key.subkeys().is_empty());
    assert!(log.contains(LogCode::SubkeyForeignIssuer));
    assert_eq!(result.bad_certs, 1);
}

#[test]
fn equal_timestamps_tie_break_on_encoded_bytes() {
    // Two competing self-certifications with the same creation time: the
    // one with the lexicographically greater encoding wins, regardless of
    // the order they appear in.
    let a = cert(PositiveCertification, PRIMARY, 100, "tie-a");
    let b = cert(PositiveCertification, PRIMARY, 100, "tie-b");
    assert!(b.raw() > a.raw());

    for order in [vec![a.clone(), b.clone()], vec![b.clone(), a.clone()]] {
        let ring = RawKey::from_parts(primary_key(PRIMARY), vec![], vec![uid("A", order)]);
        let mut verifier = TestVerifier::new();
        verifier.trust_all([&a, &b]);

        let mut log = OperationLog::new();
        let result = canonicalize(&ring, &verifier, now(), &mut log, 0).expect("canonical");

        let kept = &result.key.user_ids()[0].certs()[0];
        assert_eq!(kept.raw(), b.raw());
        assert_eq!(result.redundant_certs, 1);
    }
}

#[test]
fn mixed_drops_report_both_counters() {
    let sc = cert(PositiveCertification, PRIMARY, 100, "uid");
    let sc_old = cert(PositiveCertification, PRIMARY, 50, "uid-old");
    let junk = cert(Unknown(0x40), PRIMARY, 100, "timestamp-sig");
    let ring = RawKey::from_parts(
        primary_key(PRIMARY).with_certs(vec![junk]),
        vec![],
        vec![uid("A", vec![sc.clone(), sc_old.clone()])],
    );
    let mut verifier = TestVerifier::new();
    verifier.trust_all([&sc, &sc_old]);

    let mut log = OperationLog::new();
    let result = canonicalize(&ring, &verifier, now(), &mut log, 0).expect("canonical");

    assert_eq!(result.bad_certs, 1);
    assert_eq!(result.redundant_certs, 1);
    assert!(log.contains(LogCode::SuccessBothDropped));
}
