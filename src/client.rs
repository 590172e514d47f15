use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::SessionConfig;
use crate::error::Error;
use crate::store::TokenStore;
use crate::token::{CredentialToken, TokenField};

/// The only identity provider this deployment supports.
pub(crate) const IDENTITY_PROVIDER: &str = "email";

/// Static application token header sent on every request.
const APP_TOKEN_HEADER: &str = "x-app-token";

/// Response headers carrying rotated credentials. The backend may rotate the
/// refresh token on any authenticated call; an access token may ride along.
const ROTATED_REFRESH_HEADER: &str = "x-rotated-refresh-token";
const ROTATED_ACCESS_HEADER: &str = "x-rotated-access-token";

/// In-memory credential pair, swapped as a unit so concurrent readers see
/// either the old pair or the new pair, never a mix.
#[derive(Debug, Default, Clone)]
struct TokenCell {
    access: Option<String>,
    refresh: Option<String>,
}

/// The long-lived, shared handle to the commerce backend.
///
/// Built once per process by the [`ClientRegistry`](crate::registry::ClientRegistry)
/// and borrowed by every request handler. Only the in-memory token pair
/// mutates after construction; the client's identity never changes.
pub struct SessionClient<S: TokenStore> {
    http: reqwest::Client,
    base_url: Url,
    app_token: String,
    lang_code: String,
    tokens: RwLock<TokenCell>,
    /// Authenticated calls hold the read half; login/logout hold the write
    /// half, so a logout cannot interleave with an in-flight rotation.
    session_gate: tokio::sync::RwLock<()>,
    store: Arc<S>,
}

// Manual Debug: `S` need not be Debug, and the application token and
// credential pair must not leak into logs.
impl<S: TokenStore> std::fmt::Debug for SessionClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient")
            .field("base_url", &self.base_url.as_str())
            .field("lang_code", &self.lang_code)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    login: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RevocationRequest<'a> {
    refresh_token: &'a str,
}

/// Structured error payload the backend returns in place of a result.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct BackendErrorPayload {
    pub status_code: u16,
    pub timestamp: String,
    pub message: String,
}

/// Session-invalidation reply: the literal `true` on success, or the
/// structured error payload when the server refuses the revocation.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RevocationReply {
    Done(bool),
    Refused(BackendErrorPayload),
}

impl<S: TokenStore> SessionClient<S> {
    /// Build the shared client from validated configuration.
    ///
    /// Reads the persisted refresh token best-effort: an absent token is the
    /// normal anonymous startup, and a failing store degrades to the same
    /// (logged, never fatal). No network traffic happens here.
    ///
    /// # Errors
    ///
    /// - [`Error::ConfigurationMissing`] if the base URL or application token
    ///   was never supplied. Deployment error; not recoverable at runtime.
    /// - [`Error::ClientInit`] if the HTTP client cannot be constructed.
    pub(crate) async fn initialize(config: &SessionConfig, store: Arc<S>) -> Result<Self, Error> {
        let base_url = config
            .base_url
            .clone()
            .ok_or(Error::ConfigurationMissing("backend base URL"))?;
        let app_token = config
            .app_token
            .clone()
            .ok_or(Error::ConfigurationMissing("application token"))?;

        // `endpoint` relies on a hierarchical URL; anything but http(s) is a
        // deployment mistake and must fail here, not on the first request.
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(Error::ConfigurationInvalid(format!(
                "backend base URL must be http or https, got `{}`",
                base_url.scheme()
            )));
        }

        let refresh = match store.load().await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "token store unavailable during startup; starting unauthenticated");
                None
            }
        };

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::ClientInit(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            app_token,
            lang_code: config.lang_code.clone(),
            tokens: RwLock::new(TokenCell {
                access: None,
                refresh,
            }),
            session_gate: tokio::sync::RwLock::new(()),
            store,
        })
    }

    /// The access token the next authenticated call would use, if any.
    #[must_use]
    pub fn current_access_token(&self) -> Option<String> {
        self.tokens
            .read()
            .expect("token cell lock poisoned")
            .access
            .clone()
    }

    /// Authenticate against the backend's email provider.
    ///
    /// On success the full credential record (access token, refresh token,
    /// user identifier) is persisted to the store before this returns, so the
    /// record is never observable half-written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backend`] for a structured rejection (bad password
    /// etc.), [`Error::Http`] on transport failure, and [`Error::Store`] if
    /// persisting the record fails.
    pub async fn login(&self, email: &str, password: &str) -> Result<CredentialToken, Error> {
        let _gate = self.session_gate.write().await;

        let url = self.endpoint(&format!("auth-provider/{IDENTITY_PROVIDER}/auth"));
        let response = self
            .http
            .post(url)
            .header(APP_TOKEN_HEADER, &self.app_token)
            .json(&LoginRequest {
                login: email,
                password,
            })
            .send()
            .await?;

        let response = Self::ensure_success(response, "login").await?;
        let token: CredentialToken = response.json().await?;

        self.persist_credentials(&token).await?;

        {
            let mut cell = self.tokens.write().expect("token cell lock poisoned");
            *cell = TokenCell {
                access: Some(token.access_token.clone()),
                refresh: Some(token.refresh_token.clone()),
            };
        }

        tracing::info!(user = %token.user_identifier, "backend login successful");
        Ok(token)
    }

    /// Perform an authenticated GET against the backend.
    ///
    /// Any rotated credentials the backend attaches to the response are
    /// persisted through the store's `save` path before the result is
    /// returned, so a crash after this call completes cannot lose a rotation
    /// the backend already committed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backend`] on a structured rejection, [`Error::Http`]
    /// on transport failure, and [`Error::Store`] if persisting a rotated
    /// token fails.
    pub async fn authenticated_get(&self, path: &str) -> Result<serde_json::Value, Error> {
        let _gate = self.session_gate.read().await;

        let mut request = self
            .http
            .get(self.endpoint(path))
            .header(APP_TOKEN_HEADER, &self.app_token);
        if let Some(access) = self.current_access_token() {
            request = request.bearer_auth(access);
        }

        let response = request.send().await?;
        self.persist_rotation(&response).await?;

        let response = Self::ensure_success(response, path).await?;
        response.json().await.map_err(Into::into)
    }

    /// Ask the backend to revoke the session tied to `refresh_token`.
    ///
    /// The access token authenticates the call; the refresh token is the
    /// revocation target. Interpretation of the reply (and any local cleanup)
    /// belongs to the logout coordinator.
    pub(crate) async fn revoke_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<RevocationReply, Error> {
        let url = self.endpoint(&format!("auth-provider/{IDENTITY_PROVIDER}/logout"));
        let response = self
            .http
            .post(url)
            .header(APP_TOKEN_HEADER, &self.app_token)
            .bearer_auth(access_token)
            .json(&RevocationRequest { refresh_token })
            .send()
            .await?;

        // The backend answers the revocation itself in the body (`true` or a
        // structured payload) regardless of status class, so the body shape
        // is authoritative here, not the status code.
        response.json::<RevocationReply>().await.map_err(Into::into)
    }

    pub(crate) fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Drop the in-memory credential pair. Store cleanup is the logout
    /// coordinator's responsibility.
    pub(crate) fn clear_local_tokens(&self) {
        let mut cell = self.tokens.write().expect("token cell lock poisoned");
        *cell = TokenCell::default();
    }

    /// Exclusive session gate for logout: blocks until in-flight
    /// authenticated calls (read holders) drain.
    pub(crate) async fn lock_session_exclusive(&self) -> tokio::sync::RwLockWriteGuard<'_, ()> {
        self.session_gate.write().await
    }

    /// Write the full credential record to the store.
    ///
    /// The record is all-or-nothing: if any field write fails, the fields
    /// already written are cleared again (best-effort) before the error
    /// propagates, so the store never durably holds a mixed old/new record.
    async fn persist_credentials(&self, token: &CredentialToken) -> Result<(), Error> {
        let writes: [(TokenField, &str); 3] = [
            (TokenField::Refresh, &token.refresh_token),
            (TokenField::Access, &token.access_token),
            (TokenField::Identifier, token.user_identifier.as_str()),
        ];

        for (i, (field, value)) in writes.iter().enumerate() {
            if let Err(error) = self.store.set(*field, value).await {
                let written: Vec<TokenField> = writes[..i].iter().map(|(f, _)| *f).collect();
                if !written.is_empty() {
                    if let Err(rollback) = self.store.clear(&written).await {
                        tracing::error!(error = %rollback, "rollback of partial credential record failed");
                    }
                }
                return Err(Error::Store(error));
            }
        }
        Ok(())
    }

    async fn persist_rotation(&self, response: &reqwest::Response) -> Result<(), Error> {
        let rotated_refresh = header_value(response, ROTATED_REFRESH_HEADER);
        let Some(refresh) = rotated_refresh else {
            return Ok(());
        };
        let rotated_access = header_value(response, ROTATED_ACCESS_HEADER);

        // Store first: if we crash between these writes the store holds the
        // new token while memory still has the old access token, which is the
        // recoverable side of that race.
        self.store.save(&refresh).await.map_err(Error::Store)?;

        let mut cell = self.tokens.write().expect("token cell lock poisoned");
        if let Some(access) = rotated_access {
            cell.access = Some(access);
        }
        cell.refresh = Some(refresh);
        tracing::debug!("persisted rotated refresh token");
        Ok(())
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .expect("http(s) base URL always has path segments");
            segments.pop_if_empty();
            segments.extend(path.split('/'));
        }
        url.query_pairs_mut().append_pair("langCode", &self.lang_code);
        url
    }

    /// Checks HTTP response status; returns the response on success or the
    /// backend's structured rejection as an error.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &str,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<BackendErrorPayload>(&body)
            .map(|payload| payload.message)
            .unwrap_or(body);
        tracing::warn!(operation, status, %message, "backend rejected request");
        Err(Error::Backend { status, message })
    }
}

fn header_value(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTokenStore;

    async fn test_client() -> SessionClient<MemoryTokenStore> {
        let config = SessionConfig::new(
            "https://backend.example.com/api".parse().unwrap(),
            "app-token",
        );
        SessionClient::initialize(&config, Arc::new(MemoryTokenStore::new()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_initialize_requires_base_url() {
        let mut config = SessionConfig::new(
            "https://backend.example.com".parse().unwrap(),
            "app-token",
        );
        config.base_url = None;

        let err = SessionClient::initialize(&config, Arc::new(MemoryTokenStore::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConfigurationMissing("backend base URL")));
    }

    #[tokio::test]
    async fn test_initialize_requires_app_token() {
        let mut config = SessionConfig::new(
            "https://backend.example.com".parse().unwrap(),
            "app-token",
        );
        config.app_token = None;

        let err = SessionClient::initialize(&config, Arc::new(MemoryTokenStore::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConfigurationMissing("application token")));
    }

    #[tokio::test]
    async fn test_initialize_reads_persisted_refresh_token_once() {
        let store = Arc::new(MemoryTokenStore::new());
        store.save("ref-persisted").await.unwrap();

        let config = SessionConfig::new(
            "https://backend.example.com".parse().unwrap(),
            "app-token",
        );
        let client = SessionClient::initialize(&config, store).await.unwrap();

        let cell = client.tokens.read().unwrap();
        assert_eq!(cell.refresh.as_deref(), Some("ref-persisted"));
        assert_eq!(cell.access, None);
    }

    #[tokio::test]
    async fn test_initialize_degrades_when_store_load_fails() {
        struct BrokenStore;
        impl TokenStore for BrokenStore {
            async fn load(&self) -> Result<Option<String>, crate::store::StoreError> {
                Err("store offline".into())
            }
            async fn set(
                &self,
                _field: TokenField,
                _value: &str,
            ) -> Result<(), crate::store::StoreError> {
                Err("store offline".into())
            }
            async fn clear(
                &self,
                _fields: &[TokenField],
            ) -> Result<(), crate::store::StoreError> {
                Err("store offline".into())
            }
        }

        let config = SessionConfig::new(
            "https://backend.example.com".parse().unwrap(),
            "app-token",
        );
        let client = SessionClient::initialize(&config, Arc::new(BrokenStore))
            .await
            .expect("store outage must not block startup");
        assert_eq!(client.current_access_token(), None);
    }

    #[tokio::test]
    async fn test_initialize_rejects_non_http_base_url() {
        let config = SessionConfig::new("mailto:ops@example.com".parse().unwrap(), "app-token");

        let err = SessionClient::initialize(&config, Arc::new(MemoryTokenStore::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConfigurationInvalid(_)));
    }

    #[tokio::test]
    async fn test_failed_field_write_rolls_back_partial_record() {
        /// Store that rejects writes to one field but accepts the rest.
        struct FailingFieldStore {
            inner: MemoryTokenStore,
            fail_on: TokenField,
        }

        impl TokenStore for FailingFieldStore {
            async fn load(&self) -> Result<Option<String>, crate::store::StoreError> {
                self.inner.load().await
            }
            async fn set(
                &self,
                field: TokenField,
                value: &str,
            ) -> Result<(), crate::store::StoreError> {
                if field == self.fail_on {
                    return Err("field rejected".into());
                }
                self.inner.set(field, value).await
            }
            async fn clear(
                &self,
                fields: &[TokenField],
            ) -> Result<(), crate::store::StoreError> {
                self.inner.clear(fields).await
            }
        }

        let store = Arc::new(FailingFieldStore {
            inner: MemoryTokenStore::new(),
            fail_on: TokenField::Access,
        });
        let config = SessionConfig::new(
            "https://backend.example.com".parse().unwrap(),
            "app-token",
        );
        let client = SessionClient::initialize(&config, store.clone()).await.unwrap();

        let token = CredentialToken {
            access_token: "acc-new".into(),
            refresh_token: "ref-new".into(),
            user_identifier: "usr_42".into(),
        };
        let err = client.persist_credentials(&token).await.unwrap_err();
        assert!(matches!(err, Error::Store(_)));

        // The refresh token written before the failure was rolled back: the
        // record is fully absent, never mixed.
        for field in TokenField::ALL {
            assert_eq!(store.inner.get(field), None);
        }
    }

    #[tokio::test]
    async fn test_debug_omits_credentials() {
        let client = test_client().await;
        let rendered = format!("{client:?}");
        assert!(rendered.contains("backend.example.com"));
        assert!(!rendered.contains("app-token"));
    }

    #[tokio::test]
    async fn test_endpoint_appends_lang_code() {
        let client = test_client().await;
        let url = client.endpoint("auth-provider/email/logout");
        assert_eq!(
            url.as_str(),
            "https://backend.example.com/api/auth-provider/email/logout?langCode=en_US"
        );
    }

    #[test]
    fn test_revocation_reply_shapes() {
        let done: RevocationReply = serde_json::from_str("true").unwrap();
        assert!(matches!(done, RevocationReply::Done(true)));

        let refused: RevocationReply = serde_json::from_str(
            r#"{"statusCode":401,"timestamp":"2026-01-01T00:00:00Z","message":"expired"}"#,
        )
        .unwrap();
        match refused {
            RevocationReply::Refused(payload) => {
                assert_eq!(payload.status_code, 401);
                assert_eq!(payload.message, "expired");
            }
            RevocationReply::Done(_) => panic!("expected structured payload"),
        }
    }
}
