//! Credit queries

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

/// Call the `deduct_credits` database function.
/// `false` means the balance was too low and nothing was taken.
pub async fn deduct_credits(pool: &PgPool, user_id: Uuid, amount: i64) -> Result<bool> {
    let deducted: bool = sqlx::query_scalar("SELECT deduct_credits($1, $2)")
        .bind(user_id)
        .bind(amount)
        .fetch_one(pool)
        .await?;

    Ok(deducted)
}
