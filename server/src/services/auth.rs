//! Authentication service
//!
//! Email/password accounts with opaque session tokens. A token is handed to
//! the client once; only its digest is stored.

use crate::config::MIN_PASSWORD_LENGTH;
use crate::crypto::{generate_session_token, hash_password, token_digest, verify_password};
use crate::database::{AuthResponse, Repository, SignInRequest, SignUpRequest, User};
use crate::error::{AppError, Result};
use chrono::{Duration, Utc};

#[derive(Clone)]
pub struct AuthService {
    repo: Repository,
    session_ttl: Duration,
}

impl AuthService {
    pub fn new(repo: Repository, session_ttl_hours: i64) -> Self {
        Self {
            repo,
            session_ttl: Duration::hours(session_ttl_hours),
        }
    }

    pub async fn sign_up(&self, req: SignUpRequest) -> Result<AuthResponse> {
        let email = req.email.trim().to_lowercase();
        let name = req.name.trim();

        if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(AppError::Validation("A valid email is required".to_string()));
        }
        if name.is_empty() {
            return Err(AppError::Validation("Name is required".to_string()));
        }
        if req.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        if self.repo.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "An account already exists for {}",
                email
            )));
        }

        let password_hash = hash_password(&req.password)?;
        let user = self.repo.create_user(&email, name, &password_hash).await?;
        tracing::info!("User signed up: {}", user.id);

        self.issue_session(user).await
    }

    pub async fn sign_in(&self, req: SignInRequest) -> Result<AuthResponse> {
        let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

        let user = self
            .repo
            .find_user_by_email(&req.email)
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(&req.password, &user.password_hash)? {
            tracing::warn!("Failed sign-in for user {}", user.id);
            return Err(invalid());
        }

        tracing::info!("User signed in: {}", user.id);
        self.issue_session(user).await
    }

    pub async fn sign_out(&self, token: &str) -> Result<()> {
        if self.repo.delete_session(&token_digest(token)).await? {
            tracing::debug!("Session closed");
        }
        Ok(())
    }

    /// Resolve a bearer token to its user
    pub async fn authenticate(&self, token: &str) -> Result<User> {
        let unauthorized = || AppError::Unauthorized("Sign-in required".to_string());
        let digest = token_digest(token);

        let session = self
            .repo
            .find_session(&digest)
            .await?
            .ok_or_else(unauthorized)?;

        if session.expires_at <= Utc::now() {
            self.repo.delete_session(&digest).await?;
            return Err(AppError::Unauthorized("Session expired".to_string()));
        }

        self.repo
            .find_user(&session.user_id)
            .await?
            .ok_or_else(unauthorized)
    }

    async fn issue_session(&self, user: User) -> Result<AuthResponse> {
        let token = generate_session_token();
        let expires_at = Utc::now() + self.session_ttl;

        self.repo
            .create_session(&token_digest(&token), &user.id, expires_at)
            .await?;

        Ok(AuthResponse { token, user })
    }
}
