use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A required configuration value was never supplied.
    ///
    /// This is a deployment error: the registry reports it verbatim on every
    /// `fetch_client` call and never retries initialization.
    #[error("configuration missing: {0}")]
    ConfigurationMissing(&'static str),

    /// A configuration value was supplied but could not be parsed.
    #[error("configuration invalid: {0}")]
    ConfigurationInvalid(String),

    /// The backend client could not be constructed.
    ///
    /// Fatal for this process instance; callers should surface it as a
    /// 5xx-class failure.
    #[error("client initialization failed: {0}")]
    ClientInit(String),

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Structured rejection from the backend (non-2xx with an error payload).
    #[error("backend error {status}: {message}")]
    Backend { status: u16, message: String },

    /// Logout could not reach the backend. Local credential state is left
    /// untouched so the caller can retry.
    #[error("logout failed: {0}")]
    LogoutFailed(String),

    /// Token store save/clear failure. Load failures degrade to an
    /// unauthenticated start instead and never surface here.
    #[error("token store error: {0}")]
    Store(#[source] StoreError),
}
