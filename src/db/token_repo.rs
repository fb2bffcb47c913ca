use sqlx::PgPool;

use crate::models::{Chain, TrackedToken, ViewedTokenInput};
use crate::oracle::PriceData;

/// Result of recording a view: the row id plus whether it was created fresh
/// (as opposed to refreshed in place for a same-day re-view).
#[derive(Debug, Clone, Copy)]
pub struct ViewUpsert {
    pub token_id: i64,
    pub is_new: bool,
}

/// Record a token view. One row per user + token + view day: a re-view on
/// the same day refreshes the existing row (COALESCE keeps known fields),
/// any other day inserts a new one.
pub async fn upsert_viewed(
    pool: &PgPool,
    user_id: i64,
    input: &ViewedTokenInput,
    price: Option<&PriceData>,
) -> anyhow::Result<ViewUpsert> {
    let symbol = input
        .symbol
        .clone()
        .or_else(|| price.and_then(|p| p.symbol.clone()));
    let name = input
        .name
        .clone()
        .or_else(|| price.and_then(|p| p.name.clone()));
    let price_usd = input.price.or_else(|| price.and_then(|p| p.price_usd));
    let mcap = input.mcap.or_else(|| price.and_then(|p| p.mcap));

    let existing: Option<(i64,)> = sqlx::query_as(
        r#"
        SELECT id FROM viewed_tokens
        WHERE user_id = $1 AND contract_address = $2 AND chain = $3
          AND viewed_at::date = CURRENT_DATE
        "#,
    )
    .bind(user_id)
    .bind(&input.contract_address)
    .bind(&input.chain)
    .fetch_optional(pool)
    .await?;

    if let Some((id,)) = existing {
        sqlx::query(
            r#"
            UPDATE viewed_tokens SET
                viewed_at = NOW(),
                price_when_viewed = COALESCE($1, price_when_viewed),
                mcap_when_viewed = COALESCE($2, mcap_when_viewed),
                symbol = COALESCE($3, symbol),
                name = COALESCE($4, name)
            WHERE id = $5
            "#,
        )
        .bind(price_usd)
        .bind(mcap)
        .bind(&symbol)
        .bind(&name)
        .bind(id)
        .execute(pool)
        .await?;

        return Ok(ViewUpsert {
            token_id: id,
            is_new: false,
        });
    }

    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO viewed_tokens
            (user_id, contract_address, chain, symbol, name,
             price_when_viewed, mcap_when_viewed, source, url)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(&input.contract_address)
    .bind(&input.chain)
    .bind(&symbol)
    .bind(&name)
    .bind(price_usd)
    .bind(mcap)
    .bind(&input.source)
    .bind(&input.url)
    .fetch_one(pool)
    .await?;

    Ok(ViewUpsert {
        token_id: id,
        is_new: true,
    })
}

pub async fn get(pool: &PgPool, id: i64) -> anyhow::Result<Option<TrackedToken>> {
    let token = sqlx::query_as::<_, TrackedToken>("SELECT * FROM viewed_tokens WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(token)
}

/// All tokens (any user) viewed within the last `days` days — the price
/// sweep's working set.
pub async fn list_viewed_within_days(
    pool: &PgPool,
    days: i64,
) -> anyhow::Result<Vec<TrackedToken>> {
    let tokens = sqlx::query_as::<_, TrackedToken>(
        "SELECT * FROM viewed_tokens WHERE viewed_at > NOW() - ($1::bigint * INTERVAL '1 day')",
    )
    .bind(days)
    .fetch_all(pool)
    .await?;
    Ok(tokens)
}

pub async fn list_for_user(pool: &PgPool, user_id: i64) -> anyhow::Result<Vec<TrackedToken>> {
    let tokens = sqlx::query_as::<_, TrackedToken>(
        "SELECT * FROM viewed_tokens WHERE user_id = $1 ORDER BY viewed_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(tokens)
}

pub async fn list_unbought(pool: &PgPool, user_id: i64) -> anyhow::Result<Vec<TrackedToken>> {
    let tokens = sqlx::query_as::<_, TrackedToken>(
        "SELECT * FROM viewed_tokens WHERE user_id = $1 AND bought = FALSE",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(tokens)
}

pub async fn list_bought(pool: &PgPool, user_id: i64) -> anyhow::Result<Vec<TrackedToken>> {
    let tokens = sqlx::query_as::<_, TrackedToken>(
        "SELECT * FROM viewed_tokens WHERE user_id = $1 AND bought = TRUE",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(tokens)
}

/// Not-yet-bought rows matching a mint, across users — the purchase pipeline
/// marks every watcher of the mint.
pub async fn find_unbought_by_contract(
    pool: &PgPool,
    contract: &str,
    chain: Chain,
) -> anyhow::Result<Vec<TrackedToken>> {
    let tokens = sqlx::query_as::<_, TrackedToken>(
        "SELECT * FROM viewed_tokens WHERE contract_address = $1 AND chain = $2 AND bought = FALSE",
    )
    .bind(contract)
    .bind(chain.as_str())
    .fetch_all(pool)
    .await?;
    Ok(tokens)
}

pub async fn mark_bought(pool: &PgPool, id: i64) -> anyhow::Result<()> {
    sqlx::query("UPDATE viewed_tokens SET bought = TRUE WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn mark_bought_with_pnl(
    pool: &PgPool,
    id: i64,
    pnl: Option<f64>,
    currency: &str,
) -> anyhow::Result<()> {
    sqlx::query(
        "UPDATE viewed_tokens SET bought = TRUE, pnl_native = $1, pnl_currency = $2 WHERE id = $3",
    )
    .bind(pnl)
    .bind(currency)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn set_pnl(pool: &PgPool, id: i64, pnl: f64, currency: &str) -> anyhow::Result<()> {
    sqlx::query("UPDATE viewed_tokens SET pnl_native = $1, pnl_currency = $2 WHERE id = $3")
        .bind(pnl)
        .bind(currency)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_ath(
    pool: &PgPool,
    id: i64,
    price: f64,
    mcap: Option<f64>,
) -> anyhow::Result<()> {
    sqlx::query(
        "UPDATE viewed_tokens SET ath_price = $1, ath_mcap = $2, ath_date = NOW() WHERE id = $3",
    )
    .bind(price)
    .bind(mcap)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn flag_dev_dump(pool: &PgPool, id: i64, percent: f64) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE viewed_tokens
        SET dev_dump_detected = TRUE, dev_dump_percent = $1, dev_dump_date = NOW()
        WHERE id = $2
        "#,
    )
    .bind(percent)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Explicit reset is the only way the bought flag goes back to false; the
/// realized pnl is cleared with it.
pub async fn reset_bought(pool: &PgPool, id: i64, user_id: i64) -> anyhow::Result<()> {
    sqlx::query(
        "UPDATE viewed_tokens SET bought = FALSE, pnl_native = NULL WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete(pool: &PgPool, id: i64, user_id: i64) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM viewed_tokens WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
