use std::fmt;

use crate::KeyId;

/// A key fingerprint.
///
/// The fingerprint is a hash of the public key packet. Its length depends
/// on the key version, so the bytes are stored opaquely; this crate only
/// compares fingerprints and derives key ids from them.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fingerprint(Box<[u8]>);

impl Fingerprint {
    /// Creates a fingerprint from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Fingerprint {
        Fingerprint(bytes.into())
    }

    /// Returns the raw fingerprint bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Converts the fingerprint to its hexadecimal representation.
    pub fn to_hex(&self) -> String {
        format!("{self:X}")
    }

    /// Derives the long key id from the fingerprint.
    ///
    /// For v4 keys the key id is the rightmost 8 bytes of the
    /// fingerprint. Fingerprints shorter than 8 bytes (malformed input)
    /// are left-padded with zeros rather than rejected; the resulting id
    /// can never verify against anything.
    pub fn key_id(&self) -> KeyId {
        let mut id = [0u8; 8];
        let n = self.0.len().min(8);
        id[8 - n..].copy_from_slice(&self.0[self.0.len() - n..]);
        KeyId::from_bytes(id)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:X}")
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Fingerprint").field(&self.to_hex()).finish()
    }
}

impl fmt::UpperHex for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for b in self.0.iter() {
            write!(f, "{b:02X}")?;
        }
        Ok(())
    }
}

impl fmt::LowerHex for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for b in self.0.iter() {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}
