/// Numeric customer identifier.
pub type CustomerId = u32;

/// Numeric betting offer identifier.
pub type OfferId = u32;

/// Stake amount. Whole units only; the core accepts any integer.
pub type Stake = i64;

/// A packed session key: a millisecond timestamp and a sequence counter
/// sharing one `u64`.
///
/// - 44 bits timestamp (milliseconds since [`EPOCH`])
/// - 20 bits sequence
///
/// ```text
///  Bit Index:  63             20 19            0
///              +-----------------+--------------+
///  Field:      | timestamp (44)  | sequence (20)|
///              +-----------------+--------------+
///              |<-- MSB ---- 64 bits ---- LSB ->|
/// ```
///
/// Only the low-order 8 base56 digits of the packed value survive encoding
/// into a [`Token`], so a key decoded from a token is the original value
/// modulo 56^8.
///
/// [`EPOCH`]: crate::EPOCH
/// [`Token`]: crate::Token
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionKey {
    id: u64,
}

impl SessionKey {
    /// Bitmask for extracting the 44-bit timestamp field. Occupies bits 20
    /// through 63.
    pub const TIMESTAMP_MASK: u64 = (1 << 44) - 1;

    /// Bitmask for extracting the 20-bit sequence field. Occupies bits 0
    /// through 19.
    pub const SEQUENCE_MASK: u64 = (1 << 20) - 1;

    /// Number of bits to shift the timestamp to its correct position (bit 20).
    pub const TIMESTAMP_SHIFT: u64 = 20;

    /// Packs a timestamp and a sequence value. Out-of-range bits are masked
    /// off, which is how the sequence wraps.
    pub const fn from_components(timestamp: u64, sequence: u64) -> Self {
        let timestamp = (timestamp & Self::TIMESTAMP_MASK) << Self::TIMESTAMP_SHIFT;
        let sequence = sequence & Self::SEQUENCE_MASK;
        Self {
            id: timestamp | sequence,
        }
    }

    /// Extracts the timestamp from the packed key.
    pub const fn timestamp(&self) -> u64 {
        (self.id >> Self::TIMESTAMP_SHIFT) & Self::TIMESTAMP_MASK
    }

    /// Extracts the sequence number from the packed key.
    pub const fn sequence(&self) -> u64 {
        self.id & Self::SEQUENCE_MASK
    }

    /// Maximum number of distinct keys one millisecond can hold.
    pub const fn max_sequence() -> u64 {
        Self::SEQUENCE_MASK
    }

    pub const fn to_raw(&self) -> u64 {
        self.id
    }

    pub const fn from_raw(raw: u64) -> Self {
        Self { id: raw }
    }
}

impl core::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn components_survive_packing() {
        let key = SessionKey::from_components(123_456_789, 42);
        assert_eq!(key.timestamp(), 123_456_789);
        assert_eq!(key.sequence(), 42);
        assert_eq!(key.to_raw(), (123_456_789 << 20) | 42);
    }

    #[test]
    fn sequence_wraps_without_touching_timestamp() {
        let key = SessionKey::from_components(7, SessionKey::max_sequence() + 3);
        assert_eq!(key.timestamp(), 7);
        assert_eq!(key.sequence(), 2);
    }

    #[test]
    fn one_millisecond_holds_over_a_million_keys() {
        assert!(SessionKey::max_sequence() + 1 > 1_000_000);
    }

    #[test]
    fn ordering_follows_timestamp_first() {
        let earlier = SessionKey::from_components(1, SessionKey::max_sequence());
        let later = SessionKey::from_components(2, 0);
        assert!(earlier < later);
    }
}
