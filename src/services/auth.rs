use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{hash_password, verify_password, Identity, TokenIssuer};
use crate::error::{AppError, AuthError};
use crate::models::{NewUser, User};
use crate::store::UserStore;

/// Result of a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub user: User,
    pub token: String,
}

/// Registration, login and token validation.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    tokens: Arc<TokenIssuer>,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, tokens: Arc<TokenIssuer>, bcrypt_cost: u32) -> Self {
        Self {
            users,
            tokens,
            bcrypt_cost,
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Creates an account. Does not log the user in.
    pub async fn register(&self, email: &str, name: &str, password: &str) -> Result<User, AppError> {
        if self.users.find_user_by_email(email).await?.is_some() {
            return Err(AuthError::DuplicateEmail.into());
        }

        let password_hash = hash_password(password, self.bcrypt_cost).await?;
        let record = self
            .users
            .insert_user(NewUser {
                email: email.to_string(),
                name: name.to_string(),
                password_hash,
            })
            // A concurrent registration with this email fails here as DuplicateEmail.
            .await?;

        log::info!("Registered user {}", record.id);
        Ok(record.into())
    }

    /// Verifies credentials and issues a session token. Unknown email and wrong
    /// password fail identically.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AppError> {
        let Some(record) = self.users.find_user_by_email(email).await? else {
            log::warn!("Login failed: unknown email");
            return Err(AuthError::InvalidCredential.into());
        };

        if !verify_password(password, &record.password_hash).await? {
            log::warn!("Login failed: wrong password for user {}", record.id);
            return Err(AuthError::InvalidCredential.into());
        }

        let token = self.tokens.issue(&Identity::from(&record))?;
        log::info!("User {} logged in", record.id);
        Ok(LoginOutcome {
            user: record.into(),
            token,
        })
    }

    /// Stateless check of a session token.
    pub fn validate_token(&self, token: &str) -> Result<Identity, AuthError> {
        self.tokens.verify(token)
    }

    pub async fn get_user_by_id(&self, id: Uuid) -> Result<User, AppError> {
        self.users
            .find_user_by_id(id)
            .await?
            .map(User::from)
            .ok_or_else(|| AuthError::UserNotFound.into())
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        Ok(self.users.list_users().await?)
    }
}
