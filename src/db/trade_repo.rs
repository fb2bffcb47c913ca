use sqlx::PgPool;

use crate::models::{Chain, MatchedTrade, TradeRow};

/// Insert a matched trade unless its tx hash is already recorded. Returns
/// whether a row was written.
pub async fn insert_if_new(
    pool: &PgPool,
    user_id: i64,
    contract: &str,
    chain: Chain,
    trade: &MatchedTrade,
    tx_hash: &str,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO my_trades
            (user_id, contract_address, chain, action, quantity, price_per_unit,
             value_usd, value_native, native_currency, dex, tx_hash, traded_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (tx_hash) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(contract)
    .bind(chain.as_str())
    .bind(trade.action.as_str())
    .bind(trade.quantity)
    .bind(trade.price_per_unit)
    .bind(trade.value_usd)
    .bind(trade.value_native)
    .bind(&trade.native_currency)
    .bind(&trade.dex)
    .bind(tx_hash)
    .bind(trade.traded_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn list_for_token(
    pool: &PgPool,
    user_id: i64,
    contract: &str,
    chain: Chain,
) -> anyhow::Result<Vec<TradeRow>> {
    let trades = sqlx::query_as::<_, TradeRow>(
        r#"
        SELECT * FROM my_trades
        WHERE user_id = $1 AND contract_address = $2 AND chain = $3
        ORDER BY traded_at DESC
        "#,
    )
    .bind(user_id)
    .bind(contract)
    .bind(chain.as_str())
    .fetch_all(pool)
    .await?;
    Ok(trades)
}
