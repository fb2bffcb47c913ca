use sqlx::PgPool;

use crate::models::WalletConfig;

const WALLETS_KEY: &str = "wallets";

/// The user's wallet configuration, stored as a JSON settings value.
/// `None` when unset or unparseable.
pub async fn get_wallets(pool: &PgPool, user_id: i64) -> anyhow::Result<Option<WalletConfig>> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT value FROM settings WHERE user_id = $1 AND key = $2")
            .bind(user_id)
            .bind(WALLETS_KEY)
            .fetch_optional(pool)
            .await?;

    let Some((raw,)) = row else {
        return Ok(None);
    };

    match serde_json::from_str::<WalletConfig>(&raw) {
        Ok(config) => Ok(Some(config)),
        Err(e) => {
            tracing::warn!(error = %e, user_id, "Stored wallet config is unparseable");
            Ok(None)
        }
    }
}

pub async fn set_wallets(
    pool: &PgPool,
    user_id: i64,
    config: &WalletConfig,
) -> anyhow::Result<()> {
    let raw = serde_json::to_string(config)?;
    sqlx::query(
        r#"
        INSERT INTO settings (user_id, key, value)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, key) DO UPDATE SET value = EXCLUDED.value
        "#,
    )
    .bind(user_id)
    .bind(WALLETS_KEY)
    .bind(raw)
    .execute(pool)
    .await?;
    Ok(())
}
