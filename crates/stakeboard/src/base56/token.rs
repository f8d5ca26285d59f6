use super::{TOKEN_LEN, decode_base56, encode_base56};
use crate::{Base56Error, SessionKey};
use core::{fmt, str::FromStr};

/// An opaque session token: exactly [`TOKEN_LEN`] symbols from
/// [`ALPHABET`].
///
/// Tokens are `Copy` and hash by value, so they double as reverse-index keys
/// without allocating.
///
/// # Example
///
/// ```
/// use stakeboard::{SessionKey, Token};
///
/// let token = Token::from_session_key(SessionKey::from_components(0, 57));
/// assert_eq!(token.as_str(), "22222233");
///
/// let parsed: Token = "22222233".parse().unwrap();
/// assert_eq!(parsed, token);
/// assert!("2222223O".parse::<Token>().is_err());
/// ```
///
/// [`ALPHABET`]: crate::ALPHABET
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token {
    bytes: [u8; TOKEN_LEN],
}

impl Token {
    /// Encodes a packed session key. Only the low-order eight digits are
    /// kept.
    pub fn from_session_key(key: SessionKey) -> Self {
        let mut bytes = [0_u8; TOKEN_LEN];
        encode_base56(key.to_raw(), &mut bytes);
        Self { bytes }
    }

    /// Recovers the packed key this token was encoded from, modulo 56^8.
    pub fn to_session_key(&self) -> SessionKey {
        // Every constructor validates against the alphabet.
        SessionKey::from_raw(decode_base56(&self.bytes).unwrap_or_default())
    }

    /// Borrows the token as a string slice.
    pub fn as_str(&self) -> &str {
        // SAFETY: every byte comes from `ALPHABET`, which is ASCII.
        unsafe { core::str::from_utf8_unchecked(&self.bytes) }
    }

    pub const fn as_bytes(&self) -> &[u8; TOKEN_LEN] {
        &self.bytes
    }
}

impl FromStr for Token {
    type Err = Base56Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_base56(s.as_bytes())?;
        let mut bytes = [0_u8; TOKEN_LEN];
        bytes.copy_from_slice(s.as_bytes());
        Ok(Self { bytes })
    }
}

impl TryFrom<&str> for Token {
    type Error = Base56Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Token").field(&self.as_str()).finish()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Token {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Token {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = <String as serde::Deserialize>::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
