//! Account-domain pending-verification store.
//!
//! `insert` is a single atomic statement: MySQL's native conflict
//! resolution replaces every mutable column on a duplicate key, so
//! concurrent writers for one number can only race over which record
//! wins, never over row count.

use async_trait::async_trait;
use sqlx::{mysql::MySqlRow, Row};
use tracing::debug;

use pv_core::domain::entities::StoredVerificationCode;
use pv_core::errors::{StoreError, StoreResult};
use pv_core::repositories::{validate_number, VerificationCodeStore};
use pv_shared::utils::phone::mask_phone_number;

use crate::database::fault_tolerant::FaultTolerantDatabase;

const DOMAIN: &str = "pending_accounts";

/// Verification-code store for the account numbering domain
#[derive(Clone)]
pub struct PendingAccounts {
    database: FaultTolerantDatabase,
}

impl PendingAccounts {
    pub fn new(database: FaultTolerantDatabase) -> Self {
        Self { database }
    }

    /// Reclaims space freed by prior deletes and updates.
    ///
    /// Advisory maintenance, safe to run concurrently with normal
    /// traffic; meant to be invoked periodically out-of-band.
    pub async fn vacuum(&self) -> StoreResult<()> {
        self.database
            .apply(DOMAIN, "vacuum", |pool| async move {
                sqlx::query("OPTIMIZE TABLE pending_accounts")
                    .execute(&pool)
                    .await
            })
            .await?;

        debug!("reclaimed space on pending_accounts");
        Ok(())
    }
}

/// Decode one `pending_accounts` row
fn row_to_code(row: &MySqlRow) -> StoreResult<StoredVerificationCode> {
    Ok(StoredVerificationCode {
        code: column(row, "verification_code")?,
        timestamp: column(row, "timestamp")?,
        push_code: column(row, "push_code")?,
        twilio_verification_sid: column(row, "twilio_verification_sid")?,
    })
}

fn column<'r, T: sqlx::Decode<'r, sqlx::MySql> + sqlx::Type<sqlx::MySql>>(
    row: &'r MySqlRow,
    name: &str,
) -> StoreResult<T> {
    row.try_get(name)
        .map_err(|e| StoreError::storage(format!("failed to decode {name}: {e}")))
}

#[async_trait]
impl VerificationCodeStore for PendingAccounts {
    async fn insert(&self, number: &str, code: &StoredVerificationCode) -> StoreResult<()> {
        validate_number(number)?;

        self.database
            .apply(DOMAIN, "insert", |pool| {
                let number = number.to_owned();
                let code = code.clone();
                async move {
                    sqlx::query(
                        r#"
                        INSERT INTO pending_accounts
                            (number, verification_code, timestamp, push_code, twilio_verification_sid)
                        VALUES (?, ?, ?, ?, ?)
                        ON DUPLICATE KEY UPDATE
                            verification_code = VALUES(verification_code),
                            timestamp = VALUES(timestamp),
                            push_code = VALUES(push_code),
                            twilio_verification_sid = VALUES(twilio_verification_sid)
                        "#,
                    )
                    .bind(&number)
                    .bind(&code.code)
                    .bind(code.timestamp)
                    .bind(&code.push_code)
                    .bind(&code.twilio_verification_sid)
                    .execute(&pool)
                    .await
                }
            })
            .await?;

        debug!(number = %mask_phone_number(number), "stored account verification code");
        Ok(())
    }

    async fn find_for_number(&self, number: &str) -> StoreResult<Option<StoredVerificationCode>> {
        validate_number(number)?;

        let row = self
            .database
            .query(DOMAIN, "find_for_number", |pool| {
                let number = number.to_owned();
                async move {
                    sqlx::query(
                        r#"
                        SELECT verification_code, timestamp, push_code, twilio_verification_sid
                        FROM pending_accounts
                        WHERE number = ?
                        "#,
                    )
                    .bind(&number)
                    .fetch_optional(&pool)
                    .await
                }
            })
            .await?;

        row.as_ref().map(row_to_code).transpose()
    }

    async fn remove(&self, number: &str) -> StoreResult<()> {
        validate_number(number)?;

        self.database
            .apply(DOMAIN, "remove", |pool| {
                let number = number.to_owned();
                async move {
                    sqlx::query("DELETE FROM pending_accounts WHERE number = ?")
                        .bind(&number)
                        .execute(&pool)
                        .await
                }
            })
            .await?;

        debug!(number = %mask_phone_number(number), "removed account verification code");
        Ok(())
    }
}
