use std::{fmt, io, result};

/// Result is a specialized [`result::Result`] for this crate.
pub type Result<T> = result::Result<T, Error>;

/// Error is the error type returned by this crate.
///
/// No variant's `Display` output carries plaintext or key material.
#[derive(Debug)]
pub enum Error {
    /// A session was started with no key available, either by
    /// construction or by `start`.
    MissingKey,
    /// A decryption session was started without a nonce.
    MissingNonce,
    /// `encrypt`/`decrypt`/`finalize` was called on a session that
    /// is not `Open`.
    NotStarted,
    /// The tag did not match on decryption finalize.
    AuthenticationFailed,
    /// The flip protocol's caller-supplied marker does not match the
    /// one embedded in the session data.
    MarkerMismatch,
    /// A salt was not exactly 16 bytes after decoding.
    InvalidSalt,
    /// An argument was invalid: an empty passphrase, a zero-length
    /// file, or malformed hex.
    InvalidArgument(&'static str),
    /// A blob or session-data record could not be parsed: too short,
    /// an unknown version byte, or inconsistent length fields.
    Malformed(&'static str),
    /// The underlying file or random source failed.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MissingKey => write!(f, "no key available for session"),
            Error::MissingNonce => write!(f, "no nonce available for decryption session"),
            Error::NotStarted => write!(f, "session is not open"),
            Error::AuthenticationFailed => write!(f, "authentication failed"),
            Error::MarkerMismatch => write!(f, "marker does not match embedded marker"),
            Error::InvalidSalt => write!(f, "salt must be exactly 16 bytes"),
            Error::InvalidArgument(why) => write!(f, "invalid argument: {why}"),
            Error::Malformed(why) => write!(f, "malformed input: {why}"),
            Error::Io(err) => write!(f, "i/o error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Error::Io(value)
    }
}

impl From<hex::FromHexError> for Error {
    fn from(_value: hex::FromHexError) -> Self {
        Error::InvalidArgument("malformed hex")
    }
}
