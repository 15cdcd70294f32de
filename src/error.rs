use thiserror::Error;

/// Error taxonomy for the Linky portal client.
///
/// `Auth` is fatal and never retried. `Fetch` covers the transport and the
/// provider-signaled error status; the only retry is the single
/// retry-on-redirect inside the fetch path itself. `Parse` marks a payload
/// that violates the provider contract (e.g. a malformed start date) and is
/// propagated as-is.
#[derive(Debug, Error)]
pub enum LinkyError {
    /// Login rejected, session cookie absent, or no session opened yet.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Network failure, malformed envelope, or provider-signaled error.
    #[error("could not fetch data: {0}")]
    Fetch(String),

    /// The provider returned a payload the contract does not allow.
    #[error("malformed payload: {0}")]
    Parse(String),
}

impl LinkyError {
    pub(crate) fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    pub(crate) fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}
