use chrono::{DateTime, Utc};

use crate::models::{normalize_native_currency, MatchedTrade, TradeAction};
use crate::sources::SwapRecord;

/// Minimum symbol-hint length accepted for symbol matching. Shorter hints
/// collide with too many tickers to be safe.
pub const MIN_SYMBOL_HINT_LEN: usize = 3;

/// Which leg of a swap record the tracked token occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedLeg {
    Leg0,
    Leg1,
    Neither,
}

/// Locate the tracked token in a swap record. Address equality wins; the
/// symbol hint (exact, case-insensitive, length ≥ 3) is only a fallback, so
/// an address match on one leg is never overridden by a symbol collision on
/// the other.
pub fn find_tracked_leg(record: &SwapRecord, contract: &str, symbol_hint: Option<&str>) -> TrackedLeg {
    let target = contract.to_ascii_lowercase();
    let addr0 = record
        .token0_address
        .as_deref()
        .map(str::to_ascii_lowercase);
    let addr1 = record
        .token1_address
        .as_deref()
        .map(str::to_ascii_lowercase);

    if addr0.as_deref() == Some(target.as_str()) {
        return TrackedLeg::Leg0;
    }
    if addr1.as_deref() == Some(target.as_str()) {
        return TrackedLeg::Leg1;
    }

    if let Some(hint) = symbol_hint.filter(|h| h.len() >= MIN_SYMBOL_HINT_LEN) {
        let hint = hint.to_ascii_uppercase();
        let sym0 = record
            .token0_symbol
            .as_deref()
            .map(str::to_ascii_uppercase);
        let sym1 = record
            .token1_symbol
            .as_deref()
            .map(str::to_ascii_uppercase);

        if sym0.as_deref() == Some(hint.as_str()) {
            return TrackedLeg::Leg0;
        }
        if sym1.as_deref() == Some(hint.as_str()) {
            return TrackedLeg::Leg1;
        }
    }

    TrackedLeg::Neither
}

/// Classify one swap record relative to the tracked token.
///
/// The feed's `is_sell` flag means "the wallet sold token0 to receive
/// token1", which gives a four-way matrix:
/// - tracked on leg0, sell  → we sold the tracked token  (Sell)
/// - tracked on leg0, !sell → we bought the tracked token (Buy)
/// - tracked on leg1, sell  → we received the tracked token (Buy)
/// - tracked on leg1, !sell → we gave up the tracked token (Sell)
///
/// The counter-leg supplies the native value and currency.
pub fn classify_swap(
    record: &SwapRecord,
    contract: &str,
    symbol_hint: Option<&str>,
) -> MatchedTrade {
    let traded_at = record
        .timestamp
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now);

    let (action, quantity, price_per_unit, value_usd, value_native, native_currency) =
        match find_tracked_leg(record, contract, symbol_hint) {
            TrackedLeg::Leg0 => {
                let action = if record.is_sell {
                    TradeAction::Sell
                } else {
                    TradeAction::Buy
                };
                (
                    action,
                    record.token0_amount,
                    record.token0_price_usd,
                    record.token0_amount_usd,
                    record.token1_amount,
                    record.token1_symbol.clone(),
                )
            }
            TrackedLeg::Leg1 => {
                let action = if record.is_sell {
                    TradeAction::Buy
                } else {
                    TradeAction::Sell
                };
                (
                    action,
                    record.token1_amount,
                    record.token1_price_usd,
                    record.token1_amount_usd,
                    record.token0_amount,
                    record.token0_symbol.clone(),
                )
            }
            TrackedLeg::Neither => (TradeAction::Unknown, 0.0, 0.0, 0.0, 0.0, None),
        };

    MatchedTrade {
        action,
        quantity,
        price_per_unit,
        value_usd,
        value_native,
        native_currency: normalize_native_currency(native_currency.as_deref().unwrap_or("USD")),
        dex: record.dex.clone(),
        tx_hash: record.tx_hash.clone(),
        traded_at,
    }
}

/// Does this record involve the tracked token at all?
pub fn matches_token(record: &SwapRecord, contract: &str, symbol_hint: Option<&str>) -> bool {
    find_tracked_leg(record, contract, symbol_hint) != TrackedLeg::Neither
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTRACT_X: &str = "ContractXabc123";

    fn swap(
        token0: (&str, &str),
        token1: (&str, &str),
        is_sell: bool,
    ) -> SwapRecord {
        SwapRecord {
            tx_hash: Some("0xhash".into()),
            is_sell,
            token0_address: Some(token0.0.into()),
            token0_symbol: Some(token0.1.into()),
            token0_amount: 100.0,
            token0_price_usd: 1.0,
            token0_amount_usd: 100.0,
            token1_address: Some(token1.0.into()),
            token1_symbol: Some(token1.1.into()),
            token1_amount: 0.5,
            token1_price_usd: 200.0,
            token1_amount_usd: 100.0,
            dex: Some("raydium".into()),
            timestamp: Some(1_700_000_000),
        }
    }

    #[test]
    fn leg1_not_sell_is_sell_of_tracked() {
        // Wallet bought token0 with token1 (tracked) ⇒ we gave up the
        // tracked token.
        let record = swap(("usdc_addr", "USDC"), (CONTRACT_X, "XTOK"), false);
        let trade = classify_swap(&record, CONTRACT_X, None);
        assert_eq!(trade.action, TradeAction::Sell);
    }

    #[test]
    fn leg1_sell_is_buy_of_tracked() {
        // Wallet sold token0 (USDC) to receive token1 (tracked) ⇒ Buy.
        let record = swap(("usdc_addr", "USDC"), (CONTRACT_X, "XTOK"), true);
        let trade = classify_swap(&record, CONTRACT_X, None);
        assert_eq!(trade.action, TradeAction::Buy);
        assert_eq!(trade.quantity, 0.5);
        assert_eq!(trade.value_native, 100.0);
        assert_eq!(trade.native_currency, "USDC");
    }

    #[test]
    fn leg0_sell_is_sell_with_counter_leg_proceeds() {
        let record = swap((CONTRACT_X, "XTOK"), ("wsol_addr", "WSOL"), true);
        let trade = classify_swap(&record, CONTRACT_X, None);
        assert_eq!(trade.action, TradeAction::Sell);
        assert_eq!(trade.quantity, 100.0);
        assert_eq!(trade.value_native, 0.5);
        assert_eq!(trade.native_currency, "SOL");
    }

    #[test]
    fn leg0_not_sell_is_buy() {
        let record = swap((CONTRACT_X, "XTOK"), ("wsol_addr", "WSOL"), false);
        let trade = classify_swap(&record, CONTRACT_X, None);
        assert_eq!(trade.action, TradeAction::Buy);
    }

    #[test]
    fn no_match_is_unknown() {
        let record = swap(("a", "AAA"), ("b", "BBB"), false);
        let trade = classify_swap(&record, CONTRACT_X, None);
        assert_eq!(trade.action, TradeAction::Unknown);
    }

    #[test]
    fn address_match_beats_symbol_hint() {
        // Symbol hint would match leg0, but the address matches leg1; the
        // address wins so the classification uses leg1.
        let record = swap(("other_addr", "XTOK"), (CONTRACT_X, "RENAMED"), true);
        assert_eq!(
            find_tracked_leg(&record, CONTRACT_X, Some("XTOK")),
            TrackedLeg::Leg1
        );
    }

    #[test]
    fn symbol_hint_fallback_is_exact_and_case_insensitive() {
        let record = swap(("other_addr", "xTok"), ("b", "BBB"), false);
        assert_eq!(
            find_tracked_leg(&record, CONTRACT_X, Some("XTOK")),
            TrackedLeg::Leg0
        );
        // Prefix is not enough.
        assert_eq!(
            find_tracked_leg(&record, CONTRACT_X, Some("XTO")),
            TrackedLeg::Neither
        );
    }

    #[test]
    fn short_symbol_hints_are_ignored()  {
        let record = swap(("other_addr", "AB"), ("b", "BBB"), false);
        assert_eq!(
            find_tracked_leg(&record, CONTRACT_X, Some("AB")),
            TrackedLeg::Neither
        );
    }
}
