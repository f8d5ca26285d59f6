/// Reasons a string cannot be decoded as a session token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Base56Error {
    #[error("invalid length: {len}")]
    DecodeInvalidLen { len: usize },

    #[error("invalid ascii byte {byte:#04x} at index {index}")]
    DecodeInvalidAscii { byte: u8, index: usize },
}
