//! Wire-level enumerations: signature types, key-usage flags, secret-key
//! protection modes.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// The type of a certificate (signature packet).
///
/// Only the types the canonicalization engine reasons about get their own
/// variant; everything else is carried as `Unknown` and rejected during
/// canonicalization. The wire values are those of RFC 4880, section 5.2.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CertificateType {
    /// Generic certification of a user id.
    GenericCertification,
    /// Persona certification: no assertion about the identity is made.
    PersonaCertification,
    /// Casual certification of a user id.
    CasualCertification,
    /// Positive certification of a user id.
    PositiveCertification,
    /// Revocation of a user id certification.
    CertificationRevocation,
    /// Binding of a subkey to the primary key.
    SubkeyBinding,
    /// Back-signature made by a subkey over its own binding.
    PrimaryKeyBinding,
    /// Revocation of a subkey binding.
    SubkeyRevocation,
    /// Revocation of the primary key.
    KeyRevocation,
    /// Any other signature type.
    Unknown(u8),
}

impl CertificateType {
    /// Returns whether this is a user id self-certification type.
    pub fn is_certification(&self) -> bool {
        use CertificateType::*;
        matches!(
            self,
            GenericCertification
                | PersonaCertification
                | CasualCertification
                | PositiveCertification
        )
    }

    /// Returns whether this type targets a user id, i.e. is a
    /// certification or a certification revocation.
    pub fn targets_user_id(&self) -> bool {
        self.is_certification() || *self == CertificateType::CertificationRevocation
    }
}

impl From<u8> for CertificateType {
    fn from(t: u8) -> CertificateType {
        match t {
            0x10 => CertificateType::GenericCertification,
            0x11 => CertificateType::PersonaCertification,
            0x12 => CertificateType::CasualCertification,
            0x13 => CertificateType::PositiveCertification,
            0x18 => CertificateType::SubkeyBinding,
            0x19 => CertificateType::PrimaryKeyBinding,
            0x20 => CertificateType::KeyRevocation,
            0x28 => CertificateType::SubkeyRevocation,
            0x30 => CertificateType::CertificationRevocation,
            _ => CertificateType::Unknown(t),
        }
    }
}

impl From<CertificateType> for u8 {
    fn from(t: CertificateType) -> u8 {
        match t {
            CertificateType::GenericCertification => 0x10,
            CertificateType::PersonaCertification => 0x11,
            CertificateType::CasualCertification => 0x12,
            CertificateType::PositiveCertification => 0x13,
            CertificateType::SubkeyBinding => 0x18,
            CertificateType::PrimaryKeyBinding => 0x19,
            CertificateType::KeyRevocation => 0x20,
            CertificateType::SubkeyRevocation => 0x28,
            CertificateType::CertificationRevocation => 0x30,
            CertificateType::Unknown(t) => t,
        }
    }
}

impl fmt::Display for CertificateType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CertificateType::GenericCertification => f.write_str("generic certification"),
            CertificateType::PersonaCertification => f.write_str("persona certification"),
            CertificateType::CasualCertification => f.write_str("casual certification"),
            CertificateType::PositiveCertification => f.write_str("positive certification"),
            CertificateType::CertificationRevocation => f.write_str("certification revocation"),
            CertificateType::SubkeyBinding => f.write_str("subkey binding"),
            CertificateType::PrimaryKeyBinding => f.write_str("primary key binding"),
            CertificateType::SubkeyRevocation => f.write_str("subkey revocation"),
            CertificateType::KeyRevocation => f.write_str("key revocation"),
            CertificateType::Unknown(t) => write!(f, "unknown type 0x{t:02x}"),
        }
    }
}

const KEY_FLAG_CERTIFY: u8 = 0x01;
const KEY_FLAG_SIGN: u8 = 0x02;
const KEY_FLAG_ENCRYPT_TRANSPORT: u8 = 0x04;
const KEY_FLAG_ENCRYPT_STORAGE: u8 = 0x08;
const KEY_FLAG_SPLIT: u8 = 0x10;
const KEY_FLAG_AUTHENTICATE: u8 = 0x20;
const KEY_FLAG_GROUP: u8 = 0x80;

/// Key-usage flags from a certificate's hashed subpackets.
///
/// Only the first flag octet is modeled (RFC 4880, section 5.2.3.21);
/// that octet carries every capability the engine cares about.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyFlags(u8);

impl KeyFlags {
    /// Creates a flag set from the raw first octet.
    pub fn from_bits(bits: u8) -> KeyFlags {
        KeyFlags(bits)
    }

    /// Returns the raw flag octet.
    pub fn bits(&self) -> u8 {
        self.0
    }

    /// No capability granted.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// May certify other keys.
    pub fn for_certification(&self) -> bool {
        self.0 & KEY_FLAG_CERTIFY != 0
    }

    /// May sign data.
    pub fn for_signing(&self) -> bool {
        self.0 & KEY_FLAG_SIGN != 0
    }

    /// May encrypt communications.
    pub fn for_transport_encryption(&self) -> bool {
        self.0 & KEY_FLAG_ENCRYPT_TRANSPORT != 0
    }

    /// May encrypt storage.
    pub fn for_storage_encryption(&self) -> bool {
        self.0 & KEY_FLAG_ENCRYPT_STORAGE != 0
    }

    /// May be used for authentication.
    pub fn for_authentication(&self) -> bool {
        self.0 & KEY_FLAG_AUTHENTICATE != 0
    }

    /// The private component may have been split.
    pub fn is_split_key(&self) -> bool {
        self.0 & KEY_FLAG_SPLIT != 0
    }

    /// The private component may be held by more than one person.
    pub fn is_group_key(&self) -> bool {
        self.0 & KEY_FLAG_GROUP != 0
    }
}

impl fmt::Debug for KeyFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.for_certification() {
            f.write_str("C")?;
        }
        if self.for_signing() {
            f.write_str("S")?;
        }
        if self.for_transport_encryption() {
            f.write_str("Et")?;
        }
        if self.for_storage_encryption() {
            f.write_str("Er")?;
        }
        if self.for_authentication() {
            f.write_str("A")?;
        }
        if self.is_split_key() {
            f.write_str("D")?;
        }
        if self.is_group_key() {
            f.write_str("G")?;
        }
        Ok(())
    }
}

/// How the secret material of a key is protected.
///
/// The canonicalization engine never touches secret material; the tag only
/// decides which keyring-level rules apply (a keyring carrying any secret
/// material is a secret keyring).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProtectionMode {
    /// Secret material stored in the clear.
    Unprotected,
    /// Secret material encrypted with a passphrase.
    Passphrase,
    /// Secret material lives on a smartcard; only a stub is stored.
    DivertToCard,
    /// GNU dummy: the secret material has been stripped.
    GnuDummy,
}

/// Renders a timestamp as seconds since the epoch, for log parameters.
///
/// Timestamps before the epoch render as 0; OpenPGP cannot express them.
pub fn unix_time(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
