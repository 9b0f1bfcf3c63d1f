//! Account domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user, safe to serialize: never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    pub user_name: String,
    /// Always stored trimmed and lowercased.
    pub email: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Account with password hash (for internal auth flows).
#[derive(Debug, Clone)]
pub struct AccountWithPassword {
    pub account: Account,
    /// `None` for accounts that cannot log in with a password.
    pub password_hash: Option<String>,
}

/// Fields required to create an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub user_name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub image: Option<String>,
}

/// Partial account update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub user_name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub image: Option<String>,
}

impl AccountUpdate {
    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.user_name.is_none()
            && self.email.is_none()
            && self.password_hash.is_none()
            && self.image.is_none()
    }
}

/// Normalize an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email("  A@B.Com "), "a@b.com");
    }

    #[test]
    fn serialized_account_uses_camel_case_and_has_no_password() {
        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            user_name: "alice".into(),
            email: "a@b.com".into(),
            image: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["userName"], "alice");
        assert!(json.get("password").is_none());
        assert!(json.get("passwordHash").is_none());
    }

    #[test]
    fn empty_update_is_detected() {
        assert!(AccountUpdate::default().is_empty());
        let update = AccountUpdate {
            image: Some("https://img.example/a.png".into()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
