use std::collections::HashMap;
use std::future::Future;
use std::sync::RwLock;

use crate::token::TokenField;

/// Error type for consumer-provided store operations.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Consumer-provided persistence for the session's credential record.
///
/// The record holds three named fields (`access_token`, `refresh_token`,
/// `user_identifier`), each independently settable and clearable. The client
/// reads the refresh token once at construction via [`load`](TokenStore::load)
/// and writes rotated tokens through [`save`](TokenStore::save); everything
/// else is driven by login and logout.
///
/// `clear` must leave the named fields *expired*, not merely deleted: a caller
/// still holding a cached copy of the old value has to see it as no longer
/// valid. How many underlying writes that takes is the implementation's
/// business (a cookie store needs a removal plus an empty expire-now cookie,
/// an in-process map needs one delete).
///
/// # Example
///
/// ```rust,ignore
/// impl TokenStore for MyCookieBackedStore {
///     async fn load(&self) -> Result<Option<String>, StoreError> {
///         Ok(self.jar.get("refresh_token").map(|c| c.value().to_string()))
///     }
///
///     async fn set(&self, field: TokenField, value: &str) -> Result<(), StoreError> {
///         self.jar.add(session_cookie(field.name(), value));
///         Ok(())
///     }
///
///     async fn clear(&self, fields: &[TokenField]) -> Result<(), StoreError> {
///         for field in fields {
///             self.jar.remove(field.name());
///             self.jar.add(expired_cookie(field.name()));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait TokenStore: Send + Sync + 'static {
    /// Read the current refresh token.
    ///
    /// "Not stored" is `Ok(None)`, never an error. A failing store degrades
    /// the client to an unauthenticated start; it does not block startup.
    fn load(&self) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Persist one of the three record fields, overwriting any prior value.
    fn set(
        &self,
        field: TokenField,
        value: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Remove the named fields and mark them expired immediately.
    fn clear(&self, fields: &[TokenField]) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Persist a rotated refresh token. Last write wins.
    ///
    /// Must be effective for subsequent [`load`](TokenStore::load) calls in
    /// the same logical session.
    fn save(&self, refresh_token: &str) -> impl Future<Output = Result<(), StoreError>> + Send {
        self.set(TokenField::Refresh, refresh_token)
    }
}

/// In-process [`TokenStore`] for tests and single-process dev servers.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    fields: RwLock<HashMap<TokenField, String>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read any record field (test inspection; `load` covers the refresh token).
    #[must_use]
    pub fn get(&self, field: TokenField) -> Option<String> {
        self.fields
            .read()
            .expect("token store lock poisoned")
            .get(&field)
            .cloned()
    }
}

impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self.get(TokenField::Refresh))
    }

    async fn set(&self, field: TokenField, value: &str) -> Result<(), StoreError> {
        self.fields
            .write()
            .expect("token store lock poisoned")
            .insert(field, value.to_owned());
        Ok(())
    }

    async fn clear(&self, fields: &[TokenField]) -> Result<(), StoreError> {
        let mut map = self.fields.write().expect("token store lock poisoned");
        for field in fields {
            map.remove(field);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.load().await.unwrap(), None);

        store.save("ref-1").await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some("ref-1".into()));

        // Overwrite, last write wins.
        store.save("ref-2").await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some("ref-2".into()));
    }

    #[tokio::test]
    async fn test_clear_removes_all_named_fields() {
        let store = MemoryTokenStore::new();
        store.set(TokenField::Access, "acc").await.unwrap();
        store.set(TokenField::Refresh, "ref").await.unwrap();
        store.set(TokenField::Identifier, "usr_42").await.unwrap();

        store.clear(&TokenField::ALL).await.unwrap();

        assert_eq!(store.load().await.unwrap(), None);
        for field in TokenField::ALL {
            assert_eq!(store.get(field), None);
        }
    }

    #[tokio::test]
    async fn test_clear_is_selective() {
        let store = MemoryTokenStore::new();
        store.set(TokenField::Access, "acc").await.unwrap();
        store.set(TokenField::Refresh, "ref").await.unwrap();

        store.clear(&[TokenField::Access]).await.unwrap();

        assert_eq!(store.get(TokenField::Access), None);
        assert_eq!(store.load().await.unwrap(), Some("ref".into()));
    }
}
