//! Sign-in, registration and admin-console gating.
//!
//! The backend issues the tokens; this module only validates forms before
//! sending them and keeps the resulting session in storage.

use parish_core::{Email, EmailError, ParishionerId, UserId, UserRole};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::api::ApiClient;
use crate::error::{ClientError, ErrorInfo};
use crate::storage::keys;

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Password must be at least {MIN_PASSWORD_LENGTH} characters")]
    PasswordTooShort,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Name is required")]
    MissingName,

    /// No session is stored; the caller should send the user to the login page.
    #[error("Please log in to continue")]
    LoginRequired,

    /// The signed-in role may not open the admin console.
    #[error("Your role ({0}) does not have access to the admin console")]
    Forbidden(UserRole),

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl AuthError {
    /// Normalise into the uniform error shape.
    #[must_use]
    pub fn info(&self) -> ErrorInfo {
        match self {
            Self::Client(e) => e.info(),
            other => ErrorInfo::local(other.to_string()),
        }
    }
}

/// The signed-in user as stored under the `user` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSession {
    #[serde(alias = "_id")]
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parishioner_id: Option<ParishionerId>,
}

/// Registration form as submitted.
#[derive(Debug, Clone)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: SecretString,
    pub confirm_password: SecretString,
    pub phone: Option<String>,
}

impl RegisterForm {
    /// Client-side checks run before the form is sent.
    ///
    /// # Errors
    ///
    /// Returns the first failing rule.
    pub fn validate(&self) -> Result<Email, AuthError> {
        if self.name.trim().is_empty() {
            return Err(AuthError::MissingName);
        }
        let email = Email::parse(&self.email)?;
        let password = self.password.expose_secret();
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::PasswordTooShort);
        }
        if password != self.confirm_password.expose_secret() {
            return Err(AuthError::PasswordMismatch);
        }
        Ok(email)
    }
}

/// What a successful registration produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Confirmation text from the backend.
    pub message: String,
    /// Set when the backend signed the new user in immediately.
    pub session: Option<UserSession>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    #[serde(default, alias = "token")]
    access_token: Option<String>,
    #[serde(default)]
    user: Option<UserSession>,
    #[serde(default)]
    message: Option<String>,
}

/// Authentication service over the REST client.
#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Sign in and persist the session.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEmail` before any request, or the backend's error.
    #[instrument(skip_all, fields(email = %email))]
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<UserSession, AuthError> {
        let email = Email::parse(email)?;
        let response: SessionResponse = self
            .api
            .post(
                "auth/login",
                &LoginRequest {
                    email: email.as_str(),
                    password: password.expose_secret(),
                },
            )
            .await?;

        let (Some(token), Some(user)) = (response.access_token, response.user) else {
            return Err(AuthError::Client(ClientError::Api {
                status: 200,
                status_text: "OK".to_string(),
                message: response
                    .message
                    .unwrap_or_else(|| "Login response did not include a session".to_string()),
            }));
        };

        self.persist_session(&token, &user)?;
        info!(user_id = %user.id, role = %user.role, "Signed in");
        Ok(user)
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any request, or the backend's error.
    #[instrument(skip_all, fields(email = %form.email))]
    pub async fn register(&self, form: &RegisterForm) -> Result<Registration, AuthError> {
        let email = form.validate()?;
        let response: SessionResponse = self
            .api
            .post(
                "auth/register",
                &RegisterRequest {
                    name: form.name.trim(),
                    email: email.as_str(),
                    password: form.password.expose_secret(),
                    phone: form.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()),
                },
            )
            .await?;

        let session = match (response.access_token, response.user) {
            (Some(token), Some(user)) => {
                self.persist_session(&token, &user)?;
                Some(user)
            }
            _ => None,
        };

        info!(signed_in = session.is_some(), "Registered");
        Ok(Registration {
            message: response
                .message
                .unwrap_or_else(|| "Registration successful".to_string()),
            session,
        })
    }

    /// Sign out. Local auth state is always cleared, even if the backend call
    /// fails.
    ///
    /// # Errors
    ///
    /// Returns an error only if local storage cannot be cleared.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), AuthError> {
        if let Err(e) = self
            .api
            .post::<_, serde_json::Value>("auth/logout", &serde_json::json!({}))
            .await
        {
            warn!(error = %e, "Backend logout failed");
        }
        self.api.clear_auth()?;
        info!("Signed out");
        Ok(())
    }

    /// The stored session, if any.
    #[must_use]
    pub fn current_session(&self) -> Option<UserSession> {
        self.api.access_token()?;
        let raw = self.api.storage().get(keys::USER)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "Stored user is unreadable");
                None
            }
        }
    }

    /// Gate for admin-console operations.
    ///
    /// # Errors
    ///
    /// `LoginRequired` without a session, `Forbidden` for roles without
    /// console access.
    pub fn require_admin(&self) -> Result<UserSession, AuthError> {
        let session = self.current_session().ok_or(AuthError::LoginRequired)?;
        if session.role.can_access_admin() {
            Ok(session)
        } else {
            Err(AuthError::Forbidden(session.role))
        }
    }

    fn persist_session(&self, token: &str, user: &UserSession) -> Result<(), ClientError> {
        let storage = self.api.storage();
        let user_json = serde_json::to_string(user).map_err(|source| ClientError::Decode {
            endpoint: "user".to_string(),
            source,
        })?;
        self.api.store_access_token(token)?;
        storage.set(keys::USER, &user_json)?;
        match &user.parishioner_id {
            Some(id) => storage.set(keys::PARISHIONER_ID, id.as_str())?,
            None => storage.remove(keys::PARISHIONER_ID)?,
        }
        Ok(())
    }
}
