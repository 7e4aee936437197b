use serde::{Deserialize, Serialize};

/// User record as kept in the local cache. Never carries a password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedUser {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl CachedUser {
    /// Username exactly as stored, if present and non-empty
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref().filter(|name| !name.is_empty())
    }

    /// Cached email, or a placeholder address derived from the username.
    pub fn email_or_placeholder(&self, username: &str) -> String {
        self.email
            .clone()
            .filter(|email| !email.is_empty())
            .unwrap_or_else(|| format!("{}@example.com", username))
    }

    pub fn display_name(&self) -> String {
        self.username()
            .map(str::to_string)
            .unwrap_or_else(|| format!("user #{}", self.id))
    }
}

/// User as returned by the backend. Any password field in the payload
/// is ignored during deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteUser {
    pub id: i64,
    pub username: Option<String>,
    pub email: Option<String>,
}

impl RemoteUser {
    pub fn to_cached(&self) -> CachedUser {
        CachedUser {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

/// Registration payload
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Profile update payload; absent fields are left unchanged by the backend.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none() && self.password.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_user_drops_password() {
        let json = r#"{"id": 3, "username": "carol", "email": "carol@mail.test",
            "password": "hunter2"}"#;
        let remote: RemoteUser = serde_json::from_str(json).expect("valid user JSON");
        let cached = remote.to_cached();

        let stored = serde_json::to_string(&cached).expect("serializable user");
        assert!(!stored.contains("hunter2"));
        assert!(!stored.contains("password"));
        assert_eq!(cached.username.as_deref(), Some("carol"));
    }

    #[test]
    fn test_username_empty_is_none() {
        let user = CachedUser {
            id: 1,
            username: Some(String::new()),
            email: None,
        };
        assert_eq!(user.username(), None);
        assert_eq!(user.display_name(), "user #1");
    }

    #[test]
    fn test_username_keeps_surrounding_whitespace() {
        let user = CachedUser {
            id: 1,
            username: Some(" bob ".to_string()),
            email: None,
        };
        assert_eq!(user.username(), Some(" bob "));
    }

    #[test]
    fn test_email_or_placeholder() {
        let mut user = CachedUser {
            id: 2,
            username: Some("bob".to_string()),
            email: None,
        };
        assert_eq!(user.email_or_placeholder("bob"), "bob@example.com");

        user.email = Some("bob@home.test".to_string());
        assert_eq!(user.email_or_placeholder("bob"), "bob@home.test");
    }

    #[test]
    fn test_cached_user_tolerates_missing_fields() {
        let user: CachedUser = serde_json::from_str(r#"{"id": 9}"#).expect("partial user");
        assert_eq!(user.id, 9);
        assert!(user.username.is_none());
        assert!(user.email.is_none());
    }

    #[test]
    fn test_user_update_skips_absent_fields() {
        let update = UserUpdate {
            email: Some("new@mail.test".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&update).expect("serializable update");
        assert_eq!(json, r#"{"email":"new@mail.test"}"#);
        assert!(UserUpdate::default().is_empty());
    }
}
