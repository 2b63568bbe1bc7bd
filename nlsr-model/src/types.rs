//! Strong types for key material
//!
//! Fixed-size byte newtypes used by certificates and advertisements.

use std::fmt;

/// Defines a fixed-size byte array newtype with hex formatting and
/// slice / vector conversions.
macro_rules! define_bytes {
    ($name:ident, $len:expr, $doc:expr, [$($derives:ident),*]) => {
        #[doc = $doc]
        #[derive(Clone, Copy, $($derives),*)]
        #[repr(transparent)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Byte length of this type.
            pub const LEN: usize = $len;

            /// Returns the inner bytes.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Parse from a hex string.
            pub fn from_hex(hex_str: &str) -> Result<Self, String> {
                let bytes = hex::decode(hex_str)
                    .map_err(|e| format!("invalid hex: {}", e))?;
                Self::try_from(bytes).map_err(|b| {
                    format!("expected {} bytes, got {}", $len, b.len())
                })
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                for byte in &self.0 {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = std::array::TryFromSliceError;
            fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
                Ok(Self(<[u8; $len]>::try_from(slice)?))
            }
        }

        impl TryFrom<Vec<u8>> for $name {
            type Error = Vec<u8>;
            fn try_from(vec: Vec<u8>) -> Result<Self, Self::Error> {
                if vec.len() != $len {
                    return Err(vec);
                }
                let mut arr = [0u8; $len];
                arr.copy_from_slice(&vec);
                Ok(Self(arr))
            }
        }
    };
}

define_bytes!(
    Hash,
    32,
    "32-byte BLAKE3 digest",
    [PartialEq, Eq, Hash, Default, PartialOrd, Ord]
);

define_bytes!(
    PubKey,
    32,
    "32-byte Ed25519 public key",
    [PartialEq, Eq, Hash, Default, PartialOrd, Ord]
);

define_bytes!(
    Signature,
    64,
    "64-byte Ed25519 signature",
    [PartialEq, Eq]
);

impl Signature {
    /// All-zero placeholder used while building the signed portion.
    pub const EMPTY: Signature = Signature([0u8; 64]);
}
