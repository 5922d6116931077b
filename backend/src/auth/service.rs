//! Authentication service
//!
//! Registration, login and refresh-token rotation.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use super::jwt::{generate_access_token, generate_refresh_token, verify_token, TokenType};
use super::password::{hash_password, verify_password};
use super::AuthError;
use crate::account::service::{credit_account, insert_account};
use crate::account::{Account, AccountResponse, CreditKind, LedgerReference, Role};
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 3, max = 50))]
    pub pseudo: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Auth tokens response
#[derive(Debug, Serialize)]
pub struct AuthTokensResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub account: AccountResponse,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db_pool: PgPool,
    jwt_secret: String,
    access_token_ttl_seconds: i64,
    refresh_token_ttl_days: i64,
    signup_credits: i64,
}

impl AuthService {
    pub fn new(
        db_pool: PgPool,
        jwt_secret: String,
        access_token_ttl_seconds: i64,
        refresh_token_ttl_days: i64,
        signup_credits: i64,
    ) -> Self {
        Self {
            db_pool,
            jwt_secret,
            access_token_ttl_seconds,
            refresh_token_ttl_days,
            signup_credits,
        }
    }

    /// Create a passenger account, grant the signup credits and log it in
    pub async fn register(&self, request: RegisterRequest) -> ApiResult<AuthTokensResponse> {
        let password_hash = hash_password(&request.password).await?;

        let mut tx = self.db_pool.begin().await?;

        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE email = $1 OR pseudo = $2)",
        )
        .bind(request.email.to_lowercase())
        .bind(&request.pseudo)
        .fetch_one(&mut *tx)
        .await?;

        if taken {
            return Err(ApiError::Conflict(
                "Email or pseudo already in use".to_string(),
            ));
        }

        let mut account = insert_account(
            &mut *tx,
            &request.email,
            &request.pseudo,
            &password_hash,
            Role::User,
            true,
        )
        .await?;

        if self.signup_credits > 0 {
            account = credit_account(
                &mut *tx,
                account.id,
                self.signup_credits,
                CreditKind::SignupBonus,
                LedgerReference::default(),
            )
            .await?;
        }

        let tokens = self.issue_tokens(&mut *tx, account).await?;
        tx.commit().await?;

        tracing::info!(account_id = %tokens.account.id, "Account registered");

        Ok(tokens)
    }

    pub async fn login(&self, request: LoginRequest) -> ApiResult<AuthTokensResponse> {
        let account: Account = sqlx::query_as("SELECT * FROM accounts WHERE email = $1")
            .bind(request.email.to_lowercase())
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(&request.password, &account.password_hash).await? {
            tracing::warn!(account_id = %account.id, "Failed login attempt");
            return Err(AuthError::InvalidCredentials.into());
        }

        let mut conn = self.db_pool.acquire().await?;
        self.issue_tokens(&mut *conn, account).await
    }

    /// Exchange a refresh token for a new token pair; the old one is revoked
    pub async fn refresh_tokens(&self, refresh_token: &str) -> ApiResult<AuthTokensResponse> {
        let claims = verify_token(refresh_token, &self.jwt_secret).map_err(AuthError::from)?;
        if claims.token_type != TokenType::Refresh.as_str() {
            return Err(AuthError::InvalidRefreshToken.into());
        }

        let mut tx = self.db_pool.begin().await?;

        let account_id: Uuid = sqlx::query_scalar(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = NOW()
            WHERE token_hash = $1 AND revoked_at IS NULL AND expires_at > NOW()
            RETURNING account_id
            "#,
        )
        .bind(hash_token(refresh_token))
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AuthError::SessionNotFound)?;

        let account: Account = sqlx::query_as("SELECT * FROM accounts WHERE id = $1")
            .bind(account_id)
            .fetch_one(&mut *tx)
            .await?;

        let tokens = self.issue_tokens(&mut *tx, account).await?;
        tx.commit().await?;

        Ok(tokens)
    }

    /// Revoke a refresh token (logout)
    pub async fn revoke_refresh_token(&self, refresh_token: &str) -> ApiResult<()> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = NOW()
            WHERE token_hash = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(hash_token(refresh_token))
        .execute(&self.db_pool)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AuthError::SessionNotFound.into());
        }

        Ok(())
    }

    /// Get JWT secret (for middleware access)
    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    async fn issue_tokens(
        &self,
        conn: &mut PgConnection,
        account: Account,
    ) -> ApiResult<AuthTokensResponse> {
        let access_token = generate_access_token(
            &account,
            &Uuid::new_v4().to_string(),
            &self.jwt_secret,
            self.access_token_ttl_seconds,
        )
        .map_err(AuthError::from)?;

        let refresh_token = generate_refresh_token(
            &account,
            &Uuid::new_v4().to_string(),
            &self.jwt_secret,
            self.refresh_token_ttl_days,
        )
        .map_err(AuthError::from)?;

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, account_id, token_hash, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(account.id)
        .bind(hash_token(&refresh_token))
        .bind(Utc::now() + Duration::days(self.refresh_token_ttl_days))
        .bind(Utc::now())
        .execute(conn)
        .await?;

        Ok(AuthTokensResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_ttl_seconds,
            account: account.into(),
        })
    }
}

/// Hash a token for storage
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_is_stable_hex() {
        let first = hash_token("some.refresh.token");
        assert_eq!(first, hash_token("some.refresh.token"));
        assert_ne!(first, hash_token("other.refresh.token"));
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn test_register_request_validation() {
        let request = RegisterRequest {
            email: "not-an-email".to_string(),
            pseudo: "ab".to_string(),
            password: "short".to_string(),
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("pseudo"));
        assert!(fields.contains_key("password"));
    }
}
