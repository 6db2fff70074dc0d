//! Redis error conversion.

use fb_session::SessionError;

/// Converts a `fred` Redis error to a `SessionError`.
#[allow(clippy::needless_pass_by_value)]
pub fn from_redis_error(err: fred::error::Error) -> SessionError {
    match err.kind() {
        fred::error::ErrorKind::IO | fred::error::ErrorKind::Timeout => {
            SessionError::Unavailable(err.to_string())
        }
        _ => SessionError::Storage(err.to_string()),
    }
}
