//! Authentication module for EcoRide
//!
//! - Password registration and login (bcrypt)
//! - JWT access tokens, verified statelessly by the request extractors
//! - Refresh tokens, stored hashed and rotated on use

mod jwt;
mod password;
mod service;

use thiserror::Error;

use crate::error::ApiError;

pub use jwt::{generate_access_token, generate_refresh_token, verify_token, Claims, JwtError};
pub use password::{hash_password, verify_password};
pub use service::{AuthService, AuthTokensResponse, LoginRequest, RefreshTokenRequest, RegisterRequest};

/// Auth errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Refresh token not found, expired or revoked")]
    SessionNotFound,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        AuthError::TokenError(e.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials
            | AuthError::SessionNotFound
            | AuthError::InvalidRefreshToken
            | AuthError::TokenError(_) => ApiError::Unauthorized(e.to_string()),
            AuthError::PasswordHash(_) => ApiError::InternalError(e.to_string()),
        }
    }
}
