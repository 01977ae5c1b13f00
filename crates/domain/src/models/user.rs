//! User account models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use shared::validation::validate_telegram_handle;

/// Account kind. Managers may create apartments, bills and invitations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Resident,
    Manager,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Resident => "resident",
            UserType::Manager => "manager",
        }
    }
}

impl FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "resident" => Ok(UserType::Resident),
            "manager" => Ok(UserType::Manager),
            _ => Err(format!("Invalid user type: {}", s)),
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub full_name: Option<String>,
    pub user_type: UserType,
    /// Telegram username, stored without the leading `@`.
    pub telegram_user: Option<String>,
    #[serde(skip_serializing)]
    pub telegram_chat_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Data needed to insert a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub full_name: Option<String>,
    pub user_type: UserType,
    pub telegram_user: Option<String>,
}

/// Request body for `POST /user/signup`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct SignUpRequest {
    #[validate(length(min = 3, max = 64, message = "username must be 3-64 characters"))]
    pub username: String,

    #[validate(length(min = 8, max = 128, message = "password must be 8-128 characters"))]
    pub password: String,

    #[validate(email(message = "email must be a valid address"))]
    pub email: Option<String>,

    #[validate(length(max = 32, message = "phone must be at most 32 characters"))]
    pub phone: Option<String>,

    #[validate(length(max = 128, message = "full_name must be at most 128 characters"))]
    pub full_name: Option<String>,

    pub user_type: UserType,

    #[validate(custom(function = "validate_telegram_handle"))]
    pub telegram_user: Option<String>,
}

/// Request body for `POST /user/login`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

/// Public view of a user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub full_name: Option<String>,
    pub user_type: UserType,
    pub telegram_user: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            phone: user.phone,
            full_name: user.full_name,
            user_type: user.user_type,
            telegram_user: user.telegram_user,
        }
    }
}

/// Request body for `PUT /resident/profile`. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 3, max = 64, message = "username must be 3-64 characters"))]
    pub username: Option<String>,

    #[validate(email(message = "email must be a valid address"))]
    pub email: Option<String>,

    #[validate(length(max = 32, message = "phone must be at most 32 characters"))]
    pub phone: Option<String>,

    #[validate(length(max = 128, message = "full_name must be at most 128 characters"))]
    pub full_name: Option<String>,

    /// An empty string unlinks the Telegram account.
    #[validate(custom(function = "validate_profile_handle"))]
    pub telegram_user: Option<String>,
}

fn validate_profile_handle(handle: &str) -> Result<(), validator::ValidationError> {
    if handle.is_empty() {
        return Ok(());
    }
    validate_telegram_handle(handle)
}

/// Resolved profile changes. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub full_name: Option<String>,
    /// `Some(None)` clears the handle. Any handle change also clears the chat id.
    pub telegram_user: Option<Option<String>>,
}

/// The caller's own account, including whether the bot can reach them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub telegram_connected: bool,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        let telegram_connected = user.telegram_chat_id.is_some();
        Self {
            user: UserResponse::from(user),
            telegram_connected,
        }
    }
}

/// What managers see of other accounts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PublicUserResponse {
    pub id: i64,
    pub username: String,
    pub full_name: Option<String>,
    pub user_type: UserType,
}

impl From<User> for PublicUserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            full_name: user.full_name,
            user_type: user.user_type,
        }
    }
}

/// Response body for a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: UserResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup() -> SignUpRequest {
        SignUpRequest {
            username: "alice".to_string(),
            password: "long-enough-password".to_string(),
            email: Some("alice@example.com".to_string()),
            phone: None,
            full_name: None,
            user_type: UserType::Resident,
            telegram_user: Some("@alice_tg".to_string()),
        }
    }

    #[test]
    fn test_user_type_parsing() {
        assert_eq!(UserType::from_str("Manager").unwrap(), UserType::Manager);
        assert_eq!(UserType::from_str("resident").unwrap(), UserType::Resident);
        assert!(UserType::from_str("admin").is_err());
        assert_eq!(UserType::Manager.to_string(), "manager");
    }

    #[test]
    fn test_signup_validation() {
        assert!(signup().validate().is_ok());

        let mut short = signup();
        short.password = "short".to_string();
        assert!(short.validate().is_err());

        let mut bad_handle = signup();
        bad_handle.telegram_user = Some("no spaces allowed".to_string());
        assert!(bad_handle.validate().is_err());
    }

    #[test]
    fn test_profile_update_validation() {
        assert!(UpdateProfileRequest::default().validate().is_ok());

        let unlink = UpdateProfileRequest {
            telegram_user: Some(String::new()),
            ..Default::default()
        };
        assert!(unlink.validate().is_ok());

        let bad_handle = UpdateProfileRequest {
            telegram_user: Some("has space".to_string()),
            ..Default::default()
        };
        assert!(bad_handle.validate().is_err());

        let short_name = UpdateProfileRequest {
            username: Some("ab".to_string()),
            ..Default::default()
        };
        assert!(short_name.validate().is_err());
    }

    #[test]
    fn test_profile_response_flattens_user() {
        let user = User {
            id: 4,
            username: "carol".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            email: None,
            phone: None,
            full_name: Some("Carol".to_string()),
            user_type: UserType::Manager,
            telegram_user: Some("carol_tg".to_string()),
            telegram_chat_id: Some(12),
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(ProfileResponse::from(user.clone())).unwrap();
        assert_eq!(json["username"], "carol");
        assert_eq!(json["telegram_connected"], true);
        assert!(json.get("password_hash").is_none());

        let public = serde_json::to_value(PublicUserResponse::from(user)).unwrap();
        assert_eq!(public["user_type"], "manager");
        assert!(public.get("telegram_user").is_none());
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let user = User {
            id: 1,
            username: "alice".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            email: None,
            phone: None,
            full_name: None,
            user_type: UserType::Resident,
            telegram_user: None,
            telegram_chat_id: Some(99),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("telegram_chat_id"));
    }
}
