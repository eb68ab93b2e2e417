use std::fmt;

/// A long (8 byte) key id.
///
/// A key id names a key, typically as the issuer of a signature. It is a
/// truncation of the fingerprint, and key ids with a chosen value can be
/// minted offline; equality of key ids is therefore never taken as proof
/// of key equality without a signature that verifies against the named
/// key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyId([u8; 8]);

impl KeyId {
    /// Creates a key id from its big-endian byte representation.
    pub fn from_bytes(bytes: [u8; 8]) -> KeyId {
        KeyId(bytes)
    }

    /// Returns the big-endian bytes of the key id.
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Converts the key id to its canonical hexadecimal representation.
    pub fn to_hex(&self) -> String {
        format!("{self:X}")
    }
}

impl From<u64> for KeyId {
    fn from(id: u64) -> KeyId {
        KeyId(id.to_be_bytes())
    }
}

impl From<KeyId> for u64 {
    fn from(id: KeyId) -> u64 {
        u64::from_be_bytes(id.0)
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:X}")
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("KeyId").field(&self.to_hex()).finish()
    }
}

impl fmt::UpperHex for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02X}")?;
        }
        Ok(())
    }
}

impl fmt::LowerHex for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}
