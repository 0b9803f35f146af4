//! Server account model

use serde::{Deserialize, Serialize};

/// The account the sync server knows this installation by.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub is_connected: bool,
    pub email: String,
    pub name: String,
    pub provider: String,
    /// Messaging token sent with every request; identifies the user
    pub token: String,
}

impl User {
    /// True once the server has linked a social-login account.
    pub fn has_token(&self) -> bool {
        !self.token.trim().is_empty()
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("User")
            .field("is_connected", &self.is_connected)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("provider", &self.provider)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_debug_redacts_token() {
        let user = User {
            token: "secret".to_string(),
            ..User::default()
        };
        let debug = format!("{user:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn user_parses_partial_server_payload() {
        let user: User =
            serde_json::from_str(r#"{"isConnected": true, "email": "a@b.c", "token": "t"}"#)
                .unwrap();
        assert!(user.is_connected);
        assert!(user.has_token());
        assert_eq!(user.provider, "");
    }
}
