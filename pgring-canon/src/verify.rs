//! The boundary to the cryptographic signature verifier.

use thiserror::Error;

use pgring_core::{Certificate, Key};

/// Errors surfaced by a [`SignatureVerifier`] implementation.
///
/// Verification failure is not an error: it is the `Ok(false)` outcome.
/// These variants cover the cases where the verifier could not even reach
/// a verdict; the engines treat every one of them as a failed
/// verification (fail closed).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// The signature data could not be interpreted.
    #[error("malformed signature data: {0}")]
    Malformed(String),

    /// The underlying cryptographic provider failed.
    #[error("crypto backend failure: {0}")]
    Backend(String),

    /// The signature uses an algorithm the backend does not support.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// What a certificate signs, as presented to the verifier.
#[derive(Debug, Clone, Copy)]
pub enum SignedData<'a> {
    /// A signature over the primary key itself (key revocation).
    Primary(&'a Key),

    /// A signature over the binding of `subkey` to `primary`. Used for
    /// subkey bindings and revocations (signer: the primary key) and for
    /// embedded back-signatures (signer: the subkey).
    SubkeyBinding { primary: &'a Key, subkey: &'a Key },

    /// A signature over a user id under `primary`.
    UserId { primary: &'a Key, user_id: &'a [u8] },
}

/// Verifies one certificate against an alleged signer key.
///
/// Implementations must be pure with respect to the certificate: a
/// verification never mutates anything, and calling it concurrently from
/// independent canonicalization runs must be safe.
pub trait SignatureVerifier {
    /// Checks whether `cert` is a valid signature by `signer` over
    /// `data`. Returns `Ok(false)` for a signature that does not verify;
    /// `Err` only when no verdict could be reached.
    fn verify(
        &self,
        cert: &Certificate,
        signer: &Key,
        data: SignedData<'_>,
    ) -> Result<bool, VerifyError>;
}
