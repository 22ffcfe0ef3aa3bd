//! Registration and login.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::sync::Arc;

use crate::auth::JwtManager;
use crate::store::{StoreError, UserStore};
use crate::validate::{validate_credentials, CredentialsError};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] CredentialsError),

    #[error("login already exists")]
    LoginAlreadyExists,

    #[error("invalid login or password")]
    InvalidCredentials,

    #[error("password hashing failed")]
    PasswordHash,

    #[error("token generation failed")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Store(StoreError),
}

pub struct AuthService {
    users: Arc<dyn UserStore>,
    jwt: JwtManager,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, jwt: JwtManager) -> Self {
        Self { users, jwt }
    }

    /// Register a new user and issue a token for the fresh identity.
    pub async fn register(&self, login: &str, password: &str) -> Result<String, AuthError> {
        validate_credentials(login, password)?;

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|_| AuthError::PasswordHash)?
            .to_string();

        let user_id = match self.users.create_user(login, &password_hash).await {
            Ok(id) => id,
            Err(StoreError::LoginAlreadyExists) => return Err(AuthError::LoginAlreadyExists),
            Err(e) => return Err(AuthError::Store(e)),
        };

        Ok(self.jwt.generate(user_id, login)?)
    }

    /// Authenticate an existing user and issue a token.
    ///
    /// Unknown login and wrong password collapse into one error so the
    /// response does not leak which logins exist.
    pub async fn login(&self, login: &str, password: &str) -> Result<String, AuthError> {
        let user = match self.users.get_by_login(login).await {
            Ok(user) => user,
            Err(StoreError::UserNotFound) => return Err(AuthError::InvalidCredentials),
            Err(e) => return Err(AuthError::Store(e)),
        };

        let parsed_hash =
            PasswordHash::new(&user.password_hash).map_err(|_| AuthError::PasswordHash)?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| AuthError::InvalidCredentials)?;

        Ok(self.jwt.generate(user.id, login)?)
    }
}
