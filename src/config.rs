use url::Url;

use crate::error::Error;

/// Backend connection configuration.
///
/// Constructed once at process startup and handed to
/// [`ClientRegistry::new`](crate::registry::ClientRegistry::new). Both the base
/// URL and the application token are required for initialization to succeed,
/// but they are carried as options so that a misconfigured deployment fails
/// deterministically inside the registry (as [`Error::ConfigurationMissing`])
/// rather than at whatever call site first reads the environment.
///
/// ```rust,ignore
/// use storefront_session::SessionConfig;
///
/// let config = SessionConfig::new("https://backend.example.com".parse()?, "app-token")
///     .with_lang_code("de_DE");
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct SessionConfig {
    pub(crate) base_url: Option<Url>,
    pub(crate) app_token: Option<String>,
    pub(crate) lang_code: String,
}

impl SessionConfig {
    /// Create a fully-specified configuration.
    #[must_use]
    pub fn new(base_url: Url, app_token: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url),
            app_token: Some(app_token.into()),
            lang_code: "en_US".into(),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Env vars
    /// - `STOREFRONT_API_URL`: backend base URL
    /// - `STOREFRONT_APP_TOKEN`: static application token
    /// - `STOREFRONT_LANG_CODE`: locale sent with every request (default `en_US`)
    ///
    /// Missing variables do **not** fail here — initialization reports them as
    /// [`Error::ConfigurationMissing`] so the failure mode is the same whether
    /// the value was dropped from the environment or from code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationInvalid`] if `STOREFRONT_API_URL` is set
    /// but not a valid URL.
    pub fn from_env() -> Result<Self, Error> {
        let base_url: Option<Url> = match std::env::var("STOREFRONT_API_URL") {
            Ok(raw) => Some(
                raw.parse()
                    .map_err(|e| Error::ConfigurationInvalid(format!("STOREFRONT_API_URL: {e}")))?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            base_url,
            app_token: std::env::var("STOREFRONT_APP_TOKEN").ok(),
            lang_code: std::env::var("STOREFRONT_LANG_CODE").unwrap_or_else(|_| "en_US".into()),
        })
    }

    /// Override the locale sent with every request (default `en_US`).
    #[must_use]
    pub fn with_lang_code(mut self, lang_code: impl Into<String>) -> Self {
        self.lang_code = lang_code.into();
        self
    }

    /// Backend base URL, if configured.
    #[must_use]
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Static application token, if configured.
    #[must_use]
    pub fn app_token(&self) -> Option<&str> {
        self.app_token.as_deref()
    }

    /// Locale sent with every request.
    #[must_use]
    pub fn lang_code(&self) -> &str {
        &self.lang_code
    }
}
