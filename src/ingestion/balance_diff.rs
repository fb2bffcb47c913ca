use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Balance deltas below this are dust from rounding, not trades.
pub const NEGLIGIBLE_AMOUNT: f64 = 0.000_001;

/// Per-owner token balance as carried in a transaction's pre/post lists.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    #[serde(default)]
    pub mint: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub ui_token_amount: Option<UiTokenAmount>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiTokenAmount {
    #[serde(default)]
    pub ui_amount: Option<f64>,
}

impl TokenBalance {
    fn ui_amount(&self) -> f64 {
        self.ui_token_amount
            .as_ref()
            .and_then(|a| a.ui_amount)
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
}

/// Normalized balance change for one mint held by the monitored wallet.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceChange {
    pub mint: String,
    pub direction: Direction,
    /// Absolute size of the change.
    pub ui_amount: f64,
    pub pre_amount: f64,
    pub post_amount: f64,
}

/// Diff pre/post per-owner token balances, restricted to the monitored
/// wallet. Positive delta is a BUY, negative a SELL; a mint present before
/// and absent after with a positive prior amount is a SELL of the full prior
/// balance. Dust deltas are dropped.
pub fn diff_token_balances(
    pre: &[TokenBalance],
    post: &[TokenBalance],
    wallet: &str,
) -> Vec<BalanceChange> {
    let mut changes = Vec::new();

    let pre_by_mint: HashMap<&str, &TokenBalance> = pre
        .iter()
        .filter(|b| b.owner.as_deref() == Some(wallet))
        .map(|b| (b.mint.as_str(), b))
        .collect();

    for post_bal in post {
        if post_bal.owner.as_deref() != Some(wallet) {
            continue;
        }

        let pre_amount = pre_by_mint
            .get(post_bal.mint.as_str())
            .map(|b| b.ui_amount())
            .unwrap_or(0.0);
        let post_amount = post_bal.ui_amount();
        let delta = post_amount - pre_amount;

        if delta.abs() <= NEGLIGIBLE_AMOUNT {
            continue;
        }

        changes.push(BalanceChange {
            mint: post_bal.mint.clone(),
            direction: if delta > 0.0 {
                Direction::Buy
            } else {
                Direction::Sell
            },
            ui_amount: delta.abs(),
            pre_amount,
            post_amount,
        });
    }

    // Full exits: held before, no post entry at all.
    for (mint, pre_bal) in &pre_by_mint {
        let has_post = post
            .iter()
            .any(|b| b.mint == *mint && b.owner.as_deref() == Some(wallet));
        let pre_amount = pre_bal.ui_amount();

        if !has_post && pre_amount > 0.0 {
            changes.push(BalanceChange {
                mint: (*mint).to_string(),
                direction: Direction::Sell,
                ui_amount: pre_amount,
                pre_amount,
                post_amount: 0.0,
            });
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALLET: &str = "MyWallet111";

    fn balance(mint: &str, owner: &str, amount: f64) -> TokenBalance {
        TokenBalance {
            mint: mint.into(),
            owner: Some(owner.into()),
            ui_token_amount: Some(UiTokenAmount {
                ui_amount: Some(amount),
            }),
        }
    }

    #[test]
    fn positive_delta_is_buy() {
        let pre = vec![balance("mintA", WALLET, 10.0)];
        let post = vec![balance("mintA", WALLET, 25.0)];
        let changes = diff_token_balances(&pre, &post, WALLET);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].direction, Direction::Buy);
        assert!((changes[0].ui_amount - 15.0).abs() < 1e-9);
    }

    #[test]
    fn negative_delta_is_sell() {
        let pre = vec![balance("mintA", WALLET, 25.0)];
        let post = vec![balance("mintA", WALLET, 10.0)];
        let changes = diff_token_balances(&pre, &post, WALLET);
        assert_eq!(changes[0].direction, Direction::Sell);
        assert!((changes[0].ui_amount - 15.0).abs() < 1e-9);
    }

    #[test]
    fn vanished_mint_is_full_exit_sell() {
        let pre = vec![balance("mintA", WALLET, 42.0)];
        let post = vec![];
        let changes = diff_token_balances(&pre, &post, WALLET);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].direction, Direction::Sell);
        assert!((changes[0].ui_amount - 42.0).abs() < 1e-9);
        assert_eq!(changes[0].post_amount, 0.0);
    }

    #[test]
    fn other_owners_are_ignored() {
        let pre = vec![balance("mintA", "SomeoneElse", 5.0)];
        let post = vec![balance("mintA", "SomeoneElse", 50.0)];
        assert!(diff_token_balances(&pre, &post, WALLET).is_empty());
    }

    #[test]
    fn dust_changes_are_dropped() {
        let pre = vec![balance("mintA", WALLET, 1.0)];
        let post = vec![balance("mintA", WALLET, 1.0000005)];
        assert!(diff_token_balances(&pre, &post, WALLET).is_empty());
    }

    #[test]
    fn new_mint_with_no_pre_entry_is_buy() {
        let pre = vec![];
        let post = vec![balance("mintB", WALLET, 7.0)];
        let changes = diff_token_balances(&pre, &post, WALLET);
        assert_eq!(changes[0].direction, Direction::Buy);
        assert!((changes[0].pre_amount - 0.0).abs() < 1e-9);
    }
}
