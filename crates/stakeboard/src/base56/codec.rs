use crate::Base56Error;

/// Token alphabet: the ASCII alphanumerics minus the glyphs that are easy to
/// confuse when read back by a human (`0`, `1`, `I`, `O`, `l`, `o`).
pub const ALPHABET: &[u8; 56] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnpqrstuvwxyz";

/// Number of symbols in every encoded token.
pub const TOKEN_LEN: usize = 8;

const BASE: u64 = ALPHABET.len() as u64;
const NO_VALUE: u8 = 255;

/// Lookup table for base56 decoding. Case-sensitive, no aliases.
const LOOKUP: [u8; 256] = {
    let mut lut = [NO_VALUE; 256];
    let mut i = 0;
    while i < ALPHABET.len() {
        lut[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    lut
};

/// Encodes `value` right-to-left into exactly [`TOKEN_LEN`] symbols.
///
/// Digits above the eighth are discarded, so the output represents `value`
/// modulo 56^8.
#[inline]
pub fn encode_base56(mut value: u64, buf: &mut [u8; TOKEN_LEN]) {
    for slot in buf.iter_mut().rev() {
        *slot = ALPHABET[(value % BASE) as usize];
        value /= BASE;
    }
}

/// Decodes a fixed-length base56 string.
///
/// Returns an error if the input has the wrong length or contains a byte
/// outside [`ALPHABET`].
#[inline]
pub fn decode_base56(encoded: &[u8]) -> Result<u64, Base56Error> {
    if encoded.len() != TOKEN_LEN {
        return Err(Base56Error::DecodeInvalidLen { len: encoded.len() });
    }
    let mut acc = 0_u64;
    for (index, &byte) in encoded.iter().enumerate() {
        let val = LOOKUP[byte as usize];
        if val == NO_VALUE {
            return Err(Base56Error::DecodeInvalidAscii { byte, index });
        }
        acc = acc * BASE + u64::from(val);
    }
    Ok(acc)
}
