use crate::Base56Error;

/// A result type defaulting to this crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `stakeboard` can emit.
///
/// The stores themselves never fail: absence, expiry and top-K trimming are
/// ordinary return values. Errors only surface when parsing a token supplied
/// from outside the process or when a configuration is unusable.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The supplied string is not a well-formed session token.
    #[error("invalid session token: {0}")]
    InvalidToken(#[from] Base56Error),

    /// A configuration value is out of range.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: &'static str },
}
