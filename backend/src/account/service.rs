//! Account service: profiles, capabilities, preferences and the credit ledger

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::account::model::{
    Account, AccountResponse, Actor, CreateEmployeeRequest, CreditKind, CreditTransaction,
    LedgerReference, Preferences, Role, UpdateCapabilitiesRequest, UpdatePreferencesRequest,
};
use crate::auth::hash_password;
use crate::error::{ApiError, ApiResult};
use crate::models::{PaginatedResponse, PaginationParams};

const ACCOUNT_COLUMNS: &str = "id, email, pseudo, password_hash, role, credits, is_driver, \
     is_passenger, rating, created_at, updated_at";

/// Fetch an account without locking it
pub(crate) async fn find_account(conn: &mut PgConnection, id: Uuid) -> ApiResult<Account> {
    sqlx::query_as::<_, Account>(&format!(
        "SELECT {} FROM accounts WHERE id = $1",
        ACCOUNT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Account {} not found", id)))
}

/// Fetch an account and hold its row lock until the transaction ends
pub(crate) async fn lock_account(conn: &mut PgConnection, id: Uuid) -> ApiResult<Account> {
    sqlx::query_as::<_, Account>(&format!(
        "SELECT {} FROM accounts WHERE id = $1 FOR UPDATE",
        ACCOUNT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Account {} not found", id)))
}

/// Insert a fresh account row
pub(crate) async fn insert_account(
    conn: &mut PgConnection,
    email: &str,
    pseudo: &str,
    password_hash: &str,
    role: Role,
    is_passenger: bool,
) -> ApiResult<Account> {
    let now = Utc::now();
    let account = sqlx::query_as::<_, Account>(&format!(
        r#"
        INSERT INTO accounts (id, email, pseudo, password_hash, role, credits,
                              is_driver, is_passenger, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, 0, FALSE, $6, $7, $7)
        RETURNING {}
        "#,
        ACCOUNT_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(email.to_lowercase())
    .bind(pseudo)
    .bind(password_hash)
    .bind(role)
    .bind(is_passenger)
    .bind(now)
    .fetch_one(conn)
    .await?;

    Ok(account)
}

/// Persist a balance already mutated through `add_credits` / `remove_credits`
/// and append the matching ledger row.
pub(crate) async fn record_credit_change(
    conn: &mut PgConnection,
    account: &Account,
    kind: CreditKind,
    signed_amount: i64,
    reference: LedgerReference,
) -> ApiResult<CreditTransaction> {
    sqlx::query("UPDATE accounts SET credits = $1, updated_at = $2 WHERE id = $3")
        .bind(account.credits)
        .bind(Utc::now())
        .bind(account.id)
        .execute(&mut *conn)
        .await?;

    let entry = sqlx::query_as::<_, CreditTransaction>(
        r#"
        INSERT INTO credit_transactions (id, account_id, kind, amount, balance_after,
                                         booking_id, incident_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(account.id)
    .bind(kind)
    .bind(signed_amount)
    .bind(account.credits)
    .bind(reference.booking_id)
    .bind(reference.incident_id)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;

    Ok(entry)
}

/// Lock, credit and record in one step
pub(crate) async fn credit_account(
    conn: &mut PgConnection,
    account_id: Uuid,
    amount: i64,
    kind: CreditKind,
    reference: LedgerReference,
) -> ApiResult<Account> {
    let mut account = lock_account(&mut *conn, account_id).await?;
    account.add_credits(amount)?;
    record_credit_change(conn, &account, kind, amount, reference).await?;
    Ok(account)
}

/// Lock, debit and record in one step
pub(crate) async fn debit_account(
    conn: &mut PgConnection,
    account_id: Uuid,
    amount: i64,
    kind: CreditKind,
    reference: LedgerReference,
) -> ApiResult<Account> {
    let mut account = lock_account(&mut *conn, account_id).await?;
    account.remove_credits(amount)?;
    record_credit_change(conn, &account, kind, -amount, reference).await?;
    Ok(account)
}

/// Account service
#[derive(Clone)]
pub struct AccountService {
    db_pool: PgPool,
}

impl AccountService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn get_account(&self, id: Uuid) -> ApiResult<Account> {
        let mut conn = self.db_pool.acquire().await?;
        find_account(&mut *conn, id).await
    }

    /// Toggle the driver / passenger capabilities of a user account
    pub async fn update_capabilities(
        &self,
        actor: Actor,
        request: UpdateCapabilitiesRequest,
    ) -> ApiResult<AccountResponse> {
        actor.require_role(Role::User)?;

        let account = sqlx::query_as::<_, Account>(&format!(
            r#"
            UPDATE accounts SET is_driver = $1, is_passenger = $2, updated_at = $3
            WHERE id = $4
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(request.is_driver)
        .bind(request.is_passenger)
        .bind(Utc::now())
        .bind(actor.account_id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))?;

        tracing::info!(
            account_id = %account.id,
            is_driver = account.is_driver,
            is_passenger = account.is_passenger,
            "Account capabilities updated"
        );

        Ok(account.into())
    }

    pub async fn get_preferences(&self, account_id: Uuid) -> ApiResult<Option<Preferences>> {
        let preferences =
            sqlx::query_as::<_, Preferences>("SELECT * FROM preferences WHERE account_id = $1")
                .bind(account_id)
                .fetch_optional(&self.db_pool)
                .await?;

        Ok(preferences)
    }

    /// Create or replace the caller's driver preferences
    pub async fn upsert_preferences(
        &self,
        actor: Actor,
        request: UpdatePreferencesRequest,
    ) -> ApiResult<Preferences> {
        let mut tx = self.db_pool.begin().await?;

        let account = find_account(&mut *tx, actor.account_id).await?;
        account.driver_profile()?;

        let preferences = sqlx::query_as::<_, Preferences>(
            r#"
            INSERT INTO preferences (account_id, smoking_allowed, animals_allowed, notes, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (account_id) DO UPDATE
            SET smoking_allowed = EXCLUDED.smoking_allowed,
                animals_allowed = EXCLUDED.animals_allowed,
                notes = EXCLUDED.notes,
                updated_at = EXCLUDED.updated_at
            RETURNING *
            "#,
        )
        .bind(account.id)
        .bind(request.smoking_allowed)
        .bind(request.animals_allowed)
        .bind(&request.notes)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(preferences)
    }

    /// Ledger entries for the caller, newest first
    pub async fn credit_history(
        &self,
        actor: Actor,
        pagination: PaginationParams,
    ) -> ApiResult<PaginatedResponse<CreditTransaction>> {
        let (page, limit, offset) = pagination.resolve();

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM credit_transactions WHERE account_id = $1")
                .bind(actor.account_id)
                .fetch_one(&self.db_pool)
                .await?;

        let entries = sqlx::query_as::<_, CreditTransaction>(
            r#"
            SELECT * FROM credit_transactions
            WHERE account_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(actor.account_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(PaginatedResponse {
            data: entries,
            total,
            page,
            limit,
        })
    }

    /// Admins create employee accounts; employees hold no ride capability
    pub async fn create_employee(
        &self,
        actor: Actor,
        request: CreateEmployeeRequest,
    ) -> ApiResult<AccountResponse> {
        actor.require_role(Role::Admin)?;

        let password_hash = hash_password(&request.password).await?;

        let mut conn = self.db_pool.acquire().await?;
        let account = insert_account(
            &mut *conn,
            &request.email,
            &request.pseudo,
            &password_hash,
            Role::Employee,
            false,
        )
        .await?;

        tracing::info!(
            employee_id = %account.id,
            admin_id = %actor.account_id,
            "Employee account created"
        );

        Ok(account.into())
    }
}
