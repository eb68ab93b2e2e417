use thiserror::Error;

/// Structural errors raised while assembling model values.
///
/// These indicate a packet stream that was not a single keyring; they are
/// distinct from the per-certificate problems the canonicalization engine
/// handles as ordinary data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("keyring contains no primary key")]
    NoPrimaryKey,

    #[error("keyring contains {0} primary keys")]
    MultiplePrimaryKeys(usize),
}
