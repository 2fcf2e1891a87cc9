use argon2::{
    password_hash::{PasswordHasher, PasswordVerifier, SaltString},
    Argon2, PasswordHash,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::rngs::OsRng;
use rand::Rng;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::config::AuthConfig;
use crate::models::{
    validate_password, CreateUserRequest, ForgotPasswordRequest, LoginRequest, Record,
    RepositoryError, ResetPasswordRequest, ServiceError, ServiceResult, UpdateUserRequest, User,
    Validate,
};
use crate::observability::BusinessTracingMiddleware;
use crate::repositories::{RecordFilter, RecordStore};
use crate::services::non_blank;

/// Delivers password-reset codes to users
#[async_trait]
pub trait OtpNotifier: Send + Sync {
    async fn send_otp(&self, email: &str, otp: &str) -> Result<(), String>;
}

/// Notifier that only records the delivery in the log
pub struct LogOtpNotifier {
    sender: String,
}

impl LogOtpNotifier {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
        }
    }
}

#[async_trait]
impl OtpNotifier for LogOtpNotifier {
    async fn send_otp(&self, email: &str, _otp: &str) -> Result<(), String> {
        info!(from = %self.sender, to = %email, "Password reset OTP issued");
        Ok(())
    }
}

/// Accounts, login and OTP-based password reset
pub struct UserService {
    store: Arc<dyn RecordStore<User>>,
    notifier: Arc<dyn OtpNotifier>,
    auth: AuthConfig,
    tracing: BusinessTracingMiddleware,
}

impl UserService {
    pub fn new(
        store: Arc<dyn RecordStore<User>>,
        notifier: Arc<dyn OtpNotifier>,
        auth: AuthConfig,
        tracing: BusinessTracingMiddleware,
    ) -> Self {
        Self {
            store,
            notifier,
            auth,
            tracing,
        }
    }

    #[instrument(skip(self))]
    pub async fn list_users(&self) -> ServiceResult<Vec<User>> {
        Ok(self.store.find_all(RecordFilter::all()).await?)
    }

    #[instrument(skip(self), fields(id = %id))]
    pub async fn get_user(&self, id: &str) -> ServiceResult<User> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(User::ENTITY, id))
    }

    async fn find_by_email(&self, email: &str) -> ServiceResult<User> {
        let email = normalize_email(email);
        self.store
            .find_all(RecordFilter::field("email", email.clone()))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::not_found(User::ENTITY, email))
    }

    #[instrument(skip(self, request))]
    pub async fn create_user(&self, request: CreateUserRequest) -> ServiceResult<User> {
        self.tracing
            .trace_entity_operation(User::ENTITY, "create", async {
                request.validate()?;

                let user = User::new(
                    non_blank(request.name).unwrap_or_default(),
                    normalize_email(request.email.as_deref().unwrap_or_default()),
                    hash_password(request.password.as_deref().unwrap_or_default())?,
                    non_blank(request.user_type).unwrap_or_default(),
                );
                let user = self.store.create(user).await?;
                crate::info_with_trace!(user_id = %user.id, "User created");
                Ok(user)
            })
            .await
    }

    /// Merge supplied fields; a new password is hashed before it is stored
    #[instrument(skip(self, request), fields(id = %id))]
    pub async fn update_user(&self, id: &str, request: UpdateUserRequest) -> ServiceResult<User> {
        self.tracing
            .trace_entity_operation(User::ENTITY, "update", async {
                request.validate()?;
                let mut user = self.get_user(id).await?;

                if let Some(name) = non_blank(request.name) {
                    user.name = name;
                }
                if let Some(email) = non_blank(request.email) {
                    user.email = normalize_email(&email);
                }
                if let Some(user_type) = non_blank(request.user_type) {
                    user.user_type = user_type;
                }
                if let Some(password) = request.password.filter(|p| !p.is_empty()) {
                    user.password_hash = hash_password(&password)?;
                }

                self.store.update(user).await.map_err(|e| match e {
                    RepositoryError::NotFound => ServiceError::not_found(User::ENTITY, id),
                    other => other.into(),
                })
            })
            .await
    }

    #[instrument(skip(self), fields(id = %id))]
    pub async fn delete_user(&self, id: &str) -> ServiceResult<()> {
        self.tracing
            .trace_entity_operation(User::ENTITY, "delete", async {
                if !self.store.delete(id).await? {
                    return Err(ServiceError::not_found(User::ENTITY, id));
                }
                Ok(())
            })
            .await
    }

    #[instrument(skip(self, request))]
    pub async fn login(&self, request: LoginRequest) -> ServiceResult<User> {
        self.tracing
            .trace_entity_operation(User::ENTITY, "login", async {
                let user = self.find_by_email(&request.email).await?;
                if !verify_password(&request.password, &user.password_hash) {
                    return Err(ServiceError::InvalidCredentials);
                }
                crate::info_with_trace!(user_id = %user.id, "User logged in");
                Ok(user)
            })
            .await
    }

    /// Issue a numeric one-time code, store it with its expiry and hand it to the notifier
    #[instrument(skip(self, request))]
    pub async fn forgot_password(&self, request: ForgotPasswordRequest) -> ServiceResult<()> {
        self.tracing
            .trace_entity_operation(User::ENTITY, "forgot_password", async {
                let mut user = self.find_by_email(&request.email).await?;

                let otp = generate_otp(self.auth.otp_length);
                user.otp = Some(otp.clone());
                user.otp_expires_at =
                    Some(Utc::now() + Duration::seconds(self.auth.otp_ttl_seconds as i64));
                let user = self.store.update(user).await?;

                self.notifier
                    .send_otp(&user.email, &otp)
                    .await
                    .map_err(|e| {
                        crate::warn_with_trace!(error = %e, "OTP delivery failed");
                        ServiceError::ExternalService {
                            service: "otp-notifier".to_string(),
                            message: "Failed to send OTP".to_string(),
                        }
                    })
            })
            .await
    }

    #[instrument(skip(self, request))]
    pub async fn reset_password(&self, request: ResetPasswordRequest) -> ServiceResult<()> {
        self.tracing
            .trace_entity_operation(User::ENTITY, "reset_password", async {
                let mut user = self.find_by_email(&request.email).await?;
                if !user.otp_matches(&request.otp, Utc::now()) {
                    return Err(ServiceError::validation("Invalid OTP"));
                }
                validate_password(&request.new_password)?;

                user.password_hash = hash_password(&request.new_password)?;
                user.clear_otp();
                self.store.update(user).await?;
                Ok(())
            })
            .await
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash_password(password: &str) -> ServiceResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::PasswordHash {
            message: e.to_string(),
        })
}

fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Zero-padded numeric code of the given length
fn generate_otp(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length.max(1))
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}
