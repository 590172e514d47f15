use std::sync::Arc;

use tokio::sync::Mutex;

use crate::client::SessionClient;
use crate::config::SessionConfig;
use crate::error::Error;
use crate::store::TokenStore;

/// Registry lifecycle. `Ready` is terminal for the process lifetime; `Failed`
/// is terminal too, since the likely cause is static misconfiguration and
/// retrying would only repeat the same failure.
enum RegistryState<S: TokenStore> {
    Uninitialized,
    Ready(Arc<SessionClient<S>>),
    Failed(InitFailure),
}

/// Failure kind recorded at first initialization, replayed on every later
/// `fetch_client` call so a missing base URL keeps surfacing as
/// [`Error::ConfigurationMissing`] rather than a generic init error.
enum InitFailure {
    Config(&'static str),
    ConfigInvalid(String),
    Init(String),
}

impl InitFailure {
    fn of(error: &Error) -> Self {
        match error {
            Error::ConfigurationMissing(what) => Self::Config(what),
            Error::ConfigurationInvalid(what) => Self::ConfigInvalid(what.clone()),
            other => Self::Init(other.to_string()),
        }
    }

    fn to_error(&self) -> Error {
        match self {
            Self::Config(what) => Error::ConfigurationMissing(what),
            Self::ConfigInvalid(what) => Error::ConfigurationInvalid(what.clone()),
            Self::Init(msg) => Error::ClientInit(msg.clone()),
        }
    }
}

/// Owner of the process-wide [`SessionClient`].
///
/// Construct one at startup and hand it (by reference, or inside your
/// application state) to request handlers; do not stash it in a static.
///
/// ```rust,ignore
/// let registry = ClientRegistry::new(SessionConfig::from_env()?, MemoryTokenStore::new());
/// let client = registry.fetch_client().await?;
/// let profile = client.authenticated_get("users/me").await?;
/// ```
pub struct ClientRegistry<S: TokenStore> {
    config: SessionConfig,
    store: Arc<S>,
    state: Mutex<RegistryState<S>>,
}

impl<S: TokenStore> ClientRegistry<S> {
    #[must_use]
    pub fn new(config: SessionConfig, store: S) -> Self {
        Self {
            config,
            store: Arc::new(store),
            state: Mutex::new(RegistryState::Uninitialized),
        }
    }

    /// The token store shared with the client, for callers that read the
    /// persisted record directly (e.g. the logout path).
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Get the shared backend client, initializing it on first use.
    ///
    /// The state mutex is held across the whole `Uninitialized → Ready/Failed`
    /// transition: concurrent callers wait and then observe the winner's
    /// state, so at most one client is ever constructed and the losing
    /// callers perform no initialization work of their own.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationMissing`] or [`Error::ClientInit`] — on
    /// the first call that fails and on every call after it. The registry
    /// never retries; surface this as a 5xx-class failure and fix the
    /// deployment.
    pub async fn fetch_client(&self) -> Result<Arc<SessionClient<S>>, Error> {
        let mut state = self.state.lock().await;
        match &*state {
            RegistryState::Ready(client) => Ok(client.clone()),
            RegistryState::Failed(failure) => Err(failure.to_error()),
            RegistryState::Uninitialized => {
                match SessionClient::initialize(&self.config, self.store.clone()).await {
                    Ok(client) => {
                        let client = Arc::new(client);
                        *state = RegistryState::Ready(client.clone());
                        tracing::info!("backend session client initialized");
                        Ok(client)
                    }
                    Err(error) => {
                        tracing::error!(%error, "backend session client initialization failed");
                        *state = RegistryState::Failed(InitFailure::of(&error));
                        Err(error)
                    }
                }
            }
        }
    }
}
