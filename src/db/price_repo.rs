use sqlx::PgPool;

use crate::models::PricePoint;
use crate::oracle::PriceData;

/// Append one price snapshot. Append-only; only the sweep writes here.
pub async fn append(pool: &PgPool, token_id: i64, data: &PriceData) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO price_history (token_id, price, mcap, price_change_24h, volume_24h)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(token_id)
    .bind(data.price_usd)
    .bind(data.mcap)
    .bind(data.price_change_24h)
    .bind(data.volume_24h)
    .execute(pool)
    .await?;
    Ok(())
}

/// Most recent snapshot for a token ("current" price).
pub async fn latest(pool: &PgPool, token_id: i64) -> anyhow::Result<Option<PricePoint>> {
    let point = sqlx::query_as::<_, PricePoint>(
        "SELECT * FROM price_history WHERE token_id = $1 ORDER BY checked_at DESC LIMIT 1",
    )
    .bind(token_id)
    .fetch_optional(pool)
    .await?;
    Ok(point)
}

pub async fn history(
    pool: &PgPool,
    token_id: i64,
    limit: i64,
) -> anyhow::Result<Vec<PricePoint>> {
    let points = sqlx::query_as::<_, PricePoint>(
        "SELECT * FROM price_history WHERE token_id = $1 ORDER BY checked_at DESC LIMIT $2",
    )
    .bind(token_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(points)
}
