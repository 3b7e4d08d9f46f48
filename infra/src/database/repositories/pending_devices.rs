//! Device-domain pending-verification store.
//!
//! MySQL offers no data-modifying CTE, so the upsert here is a
//! conditional update followed by a guarded insert inside a single
//! engine transaction. If the guarded insert loses a race to a
//! concurrent writer, the update is re-run against the now-present row,
//! so callers always converge on exactly one row and never see a
//! duplicate-key failure. Records in this domain carry no delivery
//! metadata; the optional fields decode as absent.

use async_trait::async_trait;
use sqlx::{mysql::MySqlRow, Row};
use tracing::debug;

use pv_core::domain::entities::StoredVerificationCode;
use pv_core::errors::{StoreError, StoreResult};
use pv_core::repositories::{validate_number, VerificationCodeStore};
use pv_shared::utils::phone::mask_phone_number;

use crate::database::fault_tolerant::FaultTolerantDatabase;

const DOMAIN: &str = "pending_devices";

const UPDATE_SQL: &str = r#"
    UPDATE pending_devices
    SET verification_code = ?, timestamp = ?
    WHERE number = ?
"#;

const GUARDED_INSERT_SQL: &str = r#"
    INSERT IGNORE INTO pending_devices (number, verification_code, timestamp)
    SELECT ?, ?, ? FROM DUAL
    WHERE NOT EXISTS (SELECT 1 FROM pending_devices WHERE number = ?)
"#;

/// Verification-code store for the device numbering domain
#[derive(Clone)]
pub struct PendingDevices {
    database: FaultTolerantDatabase,
}

impl PendingDevices {
    pub fn new(database: FaultTolerantDatabase) -> Self {
        Self { database }
    }
}

/// Decode one `pending_devices` row; this domain never stores delivery
/// metadata
fn row_to_code(row: &MySqlRow) -> StoreResult<StoredVerificationCode> {
    let code: String = column(row, "verification_code")?;
    let timestamp: i64 = column(row, "timestamp")?;
    Ok(StoredVerificationCode::new(code, timestamp))
}

fn column<'r, T: sqlx::Decode<'r, sqlx::MySql> + sqlx::Type<sqlx::MySql>>(
    row: &'r MySqlRow,
    name: &str,
) -> StoreResult<T> {
    row.try_get(name)
        .map_err(|e| StoreError::storage(format!("failed to decode {name}: {e}")))
}

#[async_trait]
impl VerificationCodeStore for PendingDevices {
    async fn insert(&self, number: &str, code: &StoredVerificationCode) -> StoreResult<()> {
        validate_number(number)?;

        self.database
            .apply(DOMAIN, "insert", |pool| {
                let number = number.to_owned();
                let verification_code = code.code.clone();
                let timestamp = code.timestamp;
                async move {
                    let mut tx = pool.begin().await?;

                    let updated = sqlx::query(UPDATE_SQL)
                        .bind(&verification_code)
                        .bind(timestamp)
                        .bind(&number)
                        .execute(&mut *tx)
                        .await?
                        .rows_affected();

                    if updated == 0 {
                        let inserted = sqlx::query(GUARDED_INSERT_SQL)
                            .bind(&number)
                            .bind(&verification_code)
                            .bind(timestamp)
                            .bind(&number)
                            .execute(&mut *tx)
                            .await?
                            .rows_affected();

                        if inserted == 0 {
                            // A concurrent writer owns the row now; replace its contents
                            sqlx::query(UPDATE_SQL)
                                .bind(&verification_code)
                                .bind(timestamp)
                                .bind(&number)
                                .execute(&mut *tx)
                                .await?;
                        }
                    }

                    tx.commit().await
                }
            })
            .await?;

        debug!(number = %mask_phone_number(number), "stored device verification code");
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
                        "SELECT verification_code, timestamp FROM pending_devices WHERE number = ?",
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
                    sqlx::query("DELETE FROM pending_devices WHERE number = ?")
                        .bind(&number)
                        .execute(&pool)
                        .await
                }
            })
            .await?;

        debug!(number = %mask_phone_number(number), "removed device verification code");
        Ok(())
    }
}
