//! Canonicalization and merge engines for untrusted OpenPGP keyrings.
//!
//! The input is a [`RawKey`](pgring_core::RawKey): an unverified, possibly
//! adversarial keyring as decoded by a packet parser. [`canonicalize`]
//! reduces it to a [`CanonicalKey`] in which every retained certificate
//! has been verified against its claimed issuer and all redundant or
//! invalid material has been dropped, recording each decision in an
//! [`OperationLog`](pgring_core::OperationLog). [`merge`] unions two
//! versions of the same logical keyring into a raw superset for
//! re-canonicalization.
//!
//! Both engines are pure, synchronous transformations over owned data.
//! The signature cryptography itself lives behind the
//! [`SignatureVerifier`] trait; the engines decide when to invoke it and
//! fail closed on any verifier error.

pub mod canonicalize;
pub mod merge;
pub mod verify;

pub use canonicalize::{CanonicalKey, CanonicalizeError, Canonicalized, canonicalize};
pub use merge::{MergeError, merge};
pub use verify::{SignatureVerifier, SignedData, VerifyError};
