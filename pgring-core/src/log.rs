//! The operation log: the externally observable record of every decision
//! the engines make.
//!
//! The log is an explicit value threaded through the engines, not an
//! ambient logger. Reasons are symbolic codes with string parameters so
//! that callers can aggregate or localize them; free text never appears
//! as a reason.

use std::fmt;

/// Severity of one log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    /// Beginning of a nested operation.
    Start,
    /// Successful end of an operation.
    Ok,
}

/// Symbolic reason codes.
///
/// `Warn` entries mean data was dropped but the operation succeeded;
/// `Error` entries mean the operation produced no usable result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LogCode {
    // Canonicalization lifecycle.
    CanonicalizeStart,
    CanonicalizePublic,
    CanonicalizeSecret,
    SuccessClean,
    SuccessBadDropped,
    SuccessRedundantDropped,
    SuccessBothDropped,
    NoValidUserId,

    // Certificates attached to the primary key.
    PrimaryCertBadType,
    PrimaryCertFuture,
    PrimaryCertLocal,
    PrimaryCertBadSignature,
    PrimaryCertError,
    RevocationRedundant,
    PrimaryRevoked,

    // User ids.
    UserIdProcessing,
    UserIdBadType,
    UserIdFuture,
    UserIdLocal,
    UserIdForeignDropped,
    UserIdForeignKept,
    UserIdBadSignature,
    UserIdCertError,
    UserIdCertRedundant,
    UserIdRevocationRedundant,
    UserIdRevocationSuperseded,
    UserIdRevoked,
    UserIdDropped,

    // Subkeys.
    SubkeyProcessing,
    SubkeyBadType,
    SubkeyFuture,
    SubkeyLocal,
    SubkeyForeignIssuer,
    SubkeyBadSignature,
    SubkeyCertError,
    SubkeyMissingBackSig,
    SubkeyBadBackSig,
    SubkeyBindingRedundant,
    SubkeyRevocationRedundant,
    SubkeyRevoked,
    SubkeyDropped,

    // Merge.
    MergeStart,
    MergeHeterogeneous,
    MergeNewSubkey,
    MergeNewUserId,
    MergeNewCert,
    MergeComplete,
}

impl LogCode {
    /// Stable symbolic name, for aggregation and persistence.
    pub fn as_str(&self) -> &'static str {
        use LogCode::*;
        match self {
            CanonicalizeStart => "canonicalize_start",
            CanonicalizePublic => "canonicalize_public",
            CanonicalizeSecret => "canonicalize_secret",
            SuccessClean => "success_clean",
            SuccessBadDropped => "success_bad_dropped",
            SuccessRedundantDropped => "success_redundant_dropped",
            SuccessBothDropped => "success_both_dropped",
            NoValidUserId => "no_valid_user_id",
            PrimaryCertBadType => "primary_cert_bad_type",
            PrimaryCertFuture => "primary_cert_future",
            PrimaryCertLocal => "primary_cert_local",
            PrimaryCertBadSignature => "primary_cert_bad_signature",
            PrimaryCertError => "primary_cert_error",
            RevocationRedundant => "revocation_redundant",
            PrimaryRevoked => "primary_revoked",
            UserIdProcessing => "user_id_processing",
            UserIdBadType => "user_id_bad_type",
            UserIdFuture => "user_id_future",
            UserIdLocal => "user_id_local",
            UserIdForeignDropped => "user_id_foreign_dropped",
            UserIdForeignKept => "user_id_foreign_kept",
            UserIdBadSignature => "user_id_bad_signature",
            UserIdCertError => "user_id_cert_error",
            UserIdCertRedundant => "user_id_cert_redundant",
            UserIdRevocationRedundant => "user_id_revocation_redundant",
            UserIdRevocationSuperseded => "user_id_revocation_superseded",
            UserIdRevoked => "user_id_revoked",
            UserIdDropped => "user_id_dropped",
            SubkeyProcessing => "subkey_processing",
            SubkeyBadType => "subkey_bad_type",
            SubkeyFuture => "subkey_future",
            SubkeyLocal => "subkey_local",
            SubkeyForeignIssuer => "subkey_foreign_issuer",
            SubkeyBadSignature => "subkey_bad_signature",
            SubkeyCertError => "subkey_cert_error",
            SubkeyMissingBackSig => "subkey_missing_back_sig",
            SubkeyBadBackSig => "subkey_bad_back_sig",
            SubkeyBindingRedundant => "subkey_binding_redundant",
            SubkeyRevocationRedundant => "subkey_revocation_redundant",
            SubkeyRevoked => "subkey_revoked",
            SubkeyDropped => "subkey_dropped",
            MergeStart => "merge_start",
            MergeHeterogeneous => "merge_heterogeneous",
            MergeNewSubkey => "merge_new_subkey",
            MergeNewUserId => "merge_new_user_id",
            MergeNewCert => "merge_new_cert",
            MergeComplete => "merge_complete",
        }
    }
}

impl fmt::Display for LogCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry: severity, reason, parameters, and nesting depth.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogEntry {
    pub level: LogLevel,
    pub code: LogCode,
    pub params: Vec<String>,
    pub depth: usize,
}

/// An ordered, append-only sequence of log entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OperationLog {
    entries: Vec<LogEntry>,
}

impl OperationLog {
    pub fn new() -> OperationLog {
        OperationLog::default()
    }

    /// Appends an entry without parameters.
    pub fn add(&mut self, level: LogLevel, depth: usize, code: LogCode) {
        self.add_with(level, depth, code, Vec::new());
    }

    /// Appends an entry with parameters.
    pub fn add_with(&mut self, level: LogLevel, depth: usize, code: LogCode, params: Vec<String>) {
        self.entries.push(LogEntry {
            level,
            code,
            params,
            depth,
        });
    }

    /// Whether any entry is `Error` severity. By contract this holds
    /// exactly when the producing operation returned no usable result.
    pub fn has_error(&self) -> bool {
        self.entries.iter().any(|e| e.level == LogLevel::Error)
    }

    /// Whether any entry carries the given code.
    pub fn contains(&self, code: LogCode) -> bool {
        self.entries.iter().any(|e| e.code == code)
    }

    /// Number of entries at the given severity.
    pub fn count_level(&self, level: LogLevel) -> usize {
        self.entries.iter().filter(|e| e.level == level).count()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }
}

impl fmt::Display for OperationLog {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for entry in &self.entries {
            for _ in 0..entry.depth {
                f.write_str("  ")?;
            }
            write!(f, "{:?}: {}", entry.level, entry.code)?;
            if !entry.params.is_empty() {
                write!(f, " [{}]", entry.params.join(", "))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
