use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Backend-assigned subject identifier for an authenticated user.
///
/// Opaque to this crate: the backend mints it at login and it is only ever
/// echoed back (persisted alongside the tokens, cleared on logout).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct UserIdentifier(pub String);

impl UserIdentifier {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserIdentifier {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_transparent() {
        let id: UserIdentifier = serde_json::from_str("\"usr_42\"").unwrap();
        assert_eq!(id.as_str(), "usr_42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"usr_42\"");
    }

    #[test]
    fn test_display_round_trip() {
        let id = UserIdentifier::from("usr_42");
        assert_eq!(id.to_string(), "usr_42");
        let s: String = id.into();
        assert_eq!(s, "usr_42");
    }
}
