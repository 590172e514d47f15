//! Cookie-backed [`TokenStore`] for browser-session deployments.
//!
//! Browser cookie stores retain stale values if a cookie is only deleted and
//! the client re-requests before propagation completes, so `clear` both drops
//! the pending value and emits an empty cookie with `Max-Age=0` as an explicit
//! expire-now marker.

use std::sync::Mutex;

use cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use crate::store::{StoreError, TokenStore};
use crate::token::TokenField;

/// [`TokenStore`] backed by a [`cookie::CookieJar`].
///
/// The caller owns the HTTP plumbing: seed the jar from the request's `Cookie`
/// header (via [`with_cookie`](CookieTokenStore::with_cookie)) and emit
/// [`delta`](CookieTokenStore::delta) as `Set-Cookie` headers on the response.
pub struct CookieTokenStore {
    jar: Mutex<CookieJar>,
    secure: bool,
    ttl_days: i64,
}

impl CookieTokenStore {
    /// Create an empty store. `secure` controls the cookie `Secure` attribute;
    /// disable it only for plain-HTTP dev setups.
    #[must_use]
    pub fn new(secure: bool) -> Self {
        Self {
            jar: Mutex::new(CookieJar::new()),
            secure,
            ttl_days: 30,
        }
    }

    /// Override the credential cookie lifetime (default 30 days).
    #[must_use]
    pub fn with_ttl_days(mut self, days: i64) -> Self {
        self.ttl_days = days;
        self
    }

    /// Seed a field from an inbound request cookie.
    #[must_use]
    pub fn with_cookie(self, field: TokenField, value: impl Into<String>) -> Self {
        self.jar
            .lock()
            .expect("cookie jar lock poisoned")
            .add_original(Cookie::new(field.name(), value.into()));
        self
    }

    /// Cookies changed since the jar was seeded, for `Set-Cookie` emission.
    #[must_use]
    pub fn delta(&self) -> Vec<Cookie<'static>> {
        self.jar
            .lock()
            .expect("cookie jar lock poisoned")
            .delta()
            .map(|c| c.clone().into_owned())
            .collect()
    }

    fn credential_cookie(&self, name: &'static str, value: String) -> Cookie<'static> {
        Cookie::build((name, value))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(Duration::days(self.ttl_days))
            .build()
    }

    fn expired_cookie(name: &'static str) -> Cookie<'static> {
        Cookie::build((name, ""))
            .path("/")
            .max_age(Duration::ZERO)
            .build()
    }
}

impl TokenStore for CookieTokenStore {
    async fn load(&self) -> Result<Option<String>, StoreError> {
        let jar = self.jar.lock().expect("cookie jar lock poisoned");
        Ok(jar
            .get(TokenField::Refresh.name())
            .filter(|c| !c.value().is_empty())
            .map(|c| c.value().to_string()))
    }

    async fn set(&self, field: TokenField, value: &str) -> Result<(), StoreError> {
        let cookie = self.credential_cookie(field.name(), value.to_owned());
        self.jar
            .lock()
            .expect("cookie jar lock poisoned")
            .add(cookie);
        Ok(())
    }

    async fn clear(&self, fields: &[TokenField]) -> Result<(), StoreError> {
        let mut jar = self.jar.lock().expect("cookie jar lock poisoned");
        for field in fields {
            // Drop any pending value, then leave the expire-now marker so a
            // client holding the old cookie treats it as expired.
            jar.remove(Cookie::build((field.name(), "")).path("/").build());
            jar.add(Self::expired_cookie(field.name()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_then_load() {
        let store = CookieTokenStore::new(true);
        assert_eq!(store.load().await.unwrap(), None);

        store.save("ref-1").await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some("ref-1".into()));
    }

    #[tokio::test]
    async fn test_seeded_from_request_cookie() {
        let store = CookieTokenStore::new(true).with_cookie(TokenField::Refresh, "ref-seeded");
        assert_eq!(store.load().await.unwrap(), Some("ref-seeded".into()));
        // Seeding is not a mutation; nothing to emit yet.
        assert!(store.delta().is_empty());
    }

    #[tokio::test]
    async fn test_credential_cookie_attributes() {
        let store = CookieTokenStore::new(true);
        store.set(TokenField::Access, "acc-1").await.unwrap();

        let delta = store.delta();
        let cookie = delta
            .iter()
            .find(|c| c.name() == "access_token")
            .expect("access cookie emitted");
        assert_eq!(cookie.value(), "acc-1");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(Duration::days(30)));
    }

    #[tokio::test]
    async fn test_clear_expires_all_fields_immediately() {
        let store = CookieTokenStore::new(true)
            .with_cookie(TokenField::Access, "acc")
            .with_cookie(TokenField::Refresh, "ref")
            .with_cookie(TokenField::Identifier, "usr_42");

        store.clear(&TokenField::ALL).await.unwrap();

        assert_eq!(store.load().await.unwrap(), None);
        let delta = store.delta();
        for field in TokenField::ALL {
            let cookie = delta
                .iter()
                .find(|c| c.name() == field.name())
                .expect("expire-now marker emitted");
            assert_eq!(cookie.value(), "");
            assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        }
    }
}
