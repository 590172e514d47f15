use serde::{Deserialize, Serialize};

use crate::types::UserIdentifier;

/// The credential triple issued by the backend at login.
///
/// Either fully present (all three set) or fully absent: `login` persists all
/// three fields before returning and logout clears all three in one `clear`
/// call, so a partially-written record is never observable as "valid".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct CredentialToken {
    /// Bearer token sent on authenticated calls.
    pub access_token: String,
    /// Rotating token the backend may replace on any authenticated call.
    pub refresh_token: String,
    /// Backend-assigned subject id.
    pub user_identifier: UserIdentifier,
}

/// The three named fields of the Persistence Record.
///
/// `name()` values double as the store keys (and cookie names for the
/// cookie-backed store).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenField {
    Access,
    Refresh,
    Identifier,
}

impl TokenField {
    /// All three record fields, in persistence order.
    pub const ALL: [TokenField; 3] = [TokenField::Access, TokenField::Refresh, TokenField::Identifier];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            TokenField::Access => "access_token",
            TokenField::Refresh => "refresh_token",
            TokenField::Identifier => "user_identifier",
        }
    }
}
