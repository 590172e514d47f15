//! Logout coordination: backend-side session invalidation followed by local
//! credential teardown.
//!
//! The caller supplies the access and refresh tokens (read from its own
//! request context / persistence store); the coordinator never fetches them
//! itself. Local state is only cleared after the backend confirms the
//! revocation — a refused or failed revocation must not leave the client
//! believing it logged out while the token is still live.

use crate::client::{RevocationReply, SessionClient};
use crate::error::Error;
use crate::store::TokenStore;
use crate::token::TokenField;

/// Terminal outcome of a logout attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LogoutOutcome {
    /// No credentials were supplied; there was nothing to revoke. A valid
    /// outcome, not an error.
    NotLoggedIn,
    /// Backend confirmed the revocation and the persisted record was cleared.
    LoggedOut,
    /// Backend explicitly refused the revocation. Local state is untouched
    /// and `message` should be surfaced to the end user.
    Rejected { message: String },
}

impl<S: TokenStore> SessionClient<S> {
    /// Invalidate the session server-side, then clear the persisted record.
    ///
    /// Runs exclusively against this client's session gate: in-flight
    /// authenticated calls drain first, so logout cannot clear a token a
    /// concurrent rotation just wrote.
    ///
    /// # Errors
    ///
    /// - [`Error::LogoutFailed`] if the backend call itself failed (network,
    ///   timeout, undecodable reply). Local state is untouched; retry is safe.
    /// - [`Error::Store`] if the backend revoked the session but clearing the
    ///   persisted record failed — credentials are already dead server-side,
    ///   so this must not be swallowed.
    pub async fn logout(
        &self,
        access_token: Option<&str>,
        refresh_token: Option<&str>,
    ) -> Result<LogoutOutcome, Error> {
        let (Some(access), Some(refresh)) = (access_token, refresh_token) else {
            return Ok(LogoutOutcome::NotLoggedIn);
        };

        let _gate = self.lock_session_exclusive().await;

        let reply = match self.revoke_session(access, refresh).await {
            Ok(reply) => reply,
            Err(error) => {
                tracing::error!(%error, "session revocation call failed");
                return Err(Error::LogoutFailed(error.to_string()));
            }
        };

        match reply {
            RevocationReply::Done(true) => {
                self.store().clear(&TokenField::ALL).await.map_err(Error::Store)?;
                self.clear_local_tokens();
                tracing::info!("logout successful; credential record cleared");
                Ok(LogoutOutcome::LoggedOut)
            }
            RevocationReply::Done(false) => {
                tracing::warn!("backend declined session revocation");
                Ok(LogoutOutcome::Rejected {
                    message: "revocation refused by backend".into(),
                })
            }
            RevocationReply::Refused(payload) => {
                tracing::warn!(
                    status = payload.status_code,
                    message = %payload.message,
                    "backend rejected session revocation"
                );
                Ok(LogoutOutcome::Rejected {
                    message: payload.message,
                })
            }
        }
    }
}
