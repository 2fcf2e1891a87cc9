use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{generate_id, Record};

/// A marketplace account. The password is stored only as an argon2 hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    #[serde(rename = "type")]
    pub user_type: String,
    #[serde(default)]
    pub otp: Option<String>,
    #[serde(default)]
    pub otp_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "type")]
    pub user_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "type")]
    pub user_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    pub new_password: String,
}

/// Public view of a user: no password hash, no OTP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(rename = "type")]
    pub user_type: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String, password_hash: String, user_type: String) -> Self {
        Self {
            id: generate_id('U'),
            name,
            email,
            password_hash,
            user_type,
            otp: None,
            otp_expires_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn otp_matches(&self, otp: &str, now: DateTime<Utc>) -> bool {
        match (&self.otp, self.otp_expires_at) {
            (Some(stored), Some(expires_at)) => stored == otp.trim() && now <= expires_at,
            _ => false,
        }
    }

    pub fn clear_otp(&mut self) {
        self.otp = None;
        self.otp_expires_at = None;
    }
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            user_type: user.user_type.clone(),
            created_at: user.created_at,
        }
    }
}

impl Record for User {
    const COLLECTION: &'static str = "users";
    const ENTITY: &'static str = "User";

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("email", self.email.clone())]
    }
}
