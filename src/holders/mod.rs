use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::TtlCache;
use crate::models::Chain;
use crate::sources::{HolderClient, TokenAccount};

pub const HOLDER_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Top holder's share must fall by at least this many points to count as a
/// dump (Rule A).
const TOP_HOLDER_DROP_PTS: f64 = 10.0;
/// A previous top-5 holder counts as "large" above this share (Rule B).
const LARGE_HOLDER_MIN_PCT: f64 = 15.0;
/// Below this share, a previously-large holder is considered exited (Rule B).
const EXIT_THRESHOLD_PCT: f64 = 1.0;

/// One holder's share of the summed observed balances (not true supply).
#[derive(Debug, Clone, Serialize)]
pub struct Holder {
    pub address: String,
    pub amount: f64,
    pub percentage: f64,
}

/// Ordered holder list for one mint at one point in time. Exactly one
/// generation is retained per mint; each poll's snapshot replaces the prior.
#[derive(Debug, Clone, Serialize)]
pub struct HolderSnapshot {
    pub holders: Vec<Holder>,
    pub taken_at: DateTime<Utc>,
}

/// Details of the holder movement that triggered a dump flag.
#[derive(Debug, Clone, Serialize)]
pub struct DumpDetails {
    pub address: String,
    pub previous_percentage: f64,
    pub current_percentage: f64,
    pub sold_percentage: f64,
}

/// Result of one dump check. `current` is always present when holders could
/// be fetched and replaces the caller's stored baseline.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DumpCheck {
    pub detected: bool,
    pub percent: f64,
    pub details: Option<DumpDetails>,
    pub current: Option<HolderSnapshot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
    Unknown,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
            RiskLevel::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Concentration-only risk classification; no prior state involved.
#[derive(Debug, Clone, Serialize)]
pub struct RiskAssessment {
    pub risk: RiskLevel,
    pub reason: String,
    pub top_holder_percent: f64,
    pub top_5_percent: f64,
    pub top_10_percent: f64,
    pub holders_count: usize,
}

/// Detects large-holder sell-offs by diffing holder snapshots, and classifies
/// current concentration risk.
pub struct HolderTracker {
    client: HolderClient,
    cache: TtlCache<String, HolderSnapshot>,
}

impl HolderTracker {
    pub fn new(client: HolderClient) -> Self {
        Self {
            client,
            cache: TtlCache::new(HOLDER_CACHE_TTL),
        }
    }

    /// Compare current holders against the previous snapshot. Unsupported
    /// chains and source failures return `detected: false` with no snapshot;
    /// a cold start (no previous snapshot) returns `detected: false` but
    /// still hands back the snapshot for the caller to persist as baseline.
    pub async fn detect_dump(
        &self,
        mint: &str,
        chain: Chain,
        previous: Option<&HolderSnapshot>,
    ) -> DumpCheck {
        if !chain.supports_holder_introspection() {
            return DumpCheck::default();
        }

        let Some(current) = self.fetch_holders(mint).await else {
            return DumpCheck::default();
        };

        let Some(previous) = previous else {
            return DumpCheck {
                current: Some(current),
                ..DumpCheck::default()
            };
        };

        let mut check = diff_snapshots(previous, &current);
        if check.detected {
            tracing::info!(
                mint,
                percent = check.percent,
                "Dev dump detected"
            );
        }
        check.current = Some(current);
        check
    }

    /// Stateless concentration classifier.
    pub async fn risk_level(&self, mint: &str, chain: Chain) -> RiskAssessment {
        if !chain.supports_holder_introspection() {
            return RiskAssessment {
                risk: RiskLevel::Unknown,
                reason: "chain does not support holder introspection".into(),
                top_holder_percent: 0.0,
                top_5_percent: 0.0,
                top_10_percent: 0.0,
                holders_count: 0,
            };
        }

        let Some(snapshot) = self.fetch_holders(mint).await else {
            return RiskAssessment {
                risk: RiskLevel::Unknown,
                reason: "holders unavailable".into(),
                top_holder_percent: 0.0,
                top_5_percent: 0.0,
                top_10_percent: 0.0,
                holders_count: 0,
            };
        };

        assess_risk(&snapshot)
    }

    pub async fn evict_stale(&self) {
        self.cache.evict_older_than(HOLDER_CACHE_TTL * 2).await;
    }

    async fn fetch_holders(&self, mint: &str) -> Option<HolderSnapshot> {
        let cache_key = mint.to_string();
        if let Some(cached) = self.cache.get(&cache_key).await {
            return Some(cached);
        }

        let accounts = match self.client.largest_accounts(mint).await {
            Ok(a) => a,
            Err(e) => {
                tracing::warn!(error = %e, mint, "Holder introspection failed");
                return None;
            }
        };
        if accounts.is_empty() {
            return None;
        }

        let snapshot = snapshot_from_accounts(&accounts);
        self.cache.insert(cache_key, snapshot.clone()).await;
        Some(snapshot)
    }
}

/// Convert raw account balances into an ordered percentage snapshot.
/// Percentages are of the summed observed balances, not true total supply.
pub fn snapshot_from_accounts(accounts: &[TokenAccount]) -> HolderSnapshot {
    let total: f64 = accounts.iter().map(|a| a.amount).sum();

    let mut holders: Vec<Holder> = accounts
        .iter()
        .map(|a| Holder {
            address: a.owner.clone().unwrap_or_default(),
            amount: a.amount,
            percentage: if total > 0.0 {
                a.amount / total * 100.0
            } else {
                0.0
            },
        })
        .collect();
    holders.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));

    HolderSnapshot {
        holders,
        taken_at: Utc::now(),
    }
}

/// Apply both dump rules to a pair of snapshots.
///
/// Rule A: the current #1 holder is the same address as before and its share
/// fell by ≥10 points — percent is the drop.
/// Rule B: any previous top-5 holder that held ≥15% is now absent or below
/// 1% — percent is that holder's prior share.
/// Both rules may fire; percent and details reflect the larger one.
pub fn diff_snapshots(previous: &HolderSnapshot, current: &HolderSnapshot) -> DumpCheck {
    let mut check = DumpCheck::default();

    if let Some(top) = current.holders.first() {
        let prev_top = previous
            .holders
            .iter()
            .find(|h| h.address == top.address);
        if let Some(prev) = prev_top {
            let drop = prev.percentage - top.percentage;
            if drop >= TOP_HOLDER_DROP_PTS {
                check.detected = true;
                check.percent = drop;
                check.details = Some(DumpDetails {
                    address: top.address.clone(),
                    previous_percentage: prev.percentage,
                    current_percentage: top.percentage,
                    sold_percentage: drop,
                });
            }
        }
    }

    for prev in previous.holders.iter().take(5) {
        if prev.percentage < LARGE_HOLDER_MIN_PCT {
            continue;
        }
        let now_pct = current
            .holders
            .iter()
            .find(|h| h.address == prev.address)
            .map(|h| h.percentage)
            .unwrap_or(0.0);

        if now_pct < EXIT_THRESHOLD_PCT && prev.percentage > check.percent {
            check.detected = true;
            check.percent = prev.percentage;
            check.details = Some(DumpDetails {
                address: prev.address.clone(),
                previous_percentage: prev.percentage,
                current_percentage: now_pct,
                sold_percentage: prev.percentage - now_pct,
            });
        }
    }

    check
}

/// Concentration thresholds: top1 ≥30 critical, top1 ≥20 high, top5 ≥50 high,
/// top10 ≥60 medium, else low.
pub fn assess_risk(snapshot: &HolderSnapshot) -> RiskAssessment {
    let top1 = snapshot
        .holders
        .first()
        .map(|h| h.percentage)
        .unwrap_or(0.0);
    let top5: f64 = snapshot.holders.iter().take(5).map(|h| h.percentage).sum();
    let top10: f64 = snapshot.holders.iter().take(10).map(|h| h.percentage).sum();

    let (risk, reason) = if top1 >= 30.0 {
        (
            RiskLevel::Critical,
            format!("top holder owns {top1:.1}% of observed supply"),
        )
    } else if top1 >= 20.0 {
        (
            RiskLevel::High,
            format!("top holder owns {top1:.1}% of observed supply"),
        )
    } else if top5 >= 50.0 {
        (
            RiskLevel::High,
            format!("top 5 holders own {top5:.1}% of observed supply"),
        )
    } else if top10 >= 60.0 {
        (
            RiskLevel::Medium,
            format!("top 10 holders own {top10:.1}% of observed supply"),
        )
    } else {
        (RiskLevel::Low, "healthy distribution".into())
    };

    RiskAssessment {
        risk,
        reason,
        top_holder_percent: top1,
        top_5_percent: top5,
        top_10_percent: top10,
        holders_count: snapshot.holders.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(holders: &[(&str, f64)]) -> HolderSnapshot {
        HolderSnapshot {
            holders: holders
                .iter()
                .map(|(addr, pct)| Holder {
                    address: (*addr).into(),
                    amount: 0.0,
                    percentage: *pct,
                })
                .collect(),
            taken_at: Utc::now(),
        }
    }

    #[test]
    fn rule_a_fires_on_large_drop() {
        let prev = snapshot(&[("dev", 40.0), ("b", 5.0)]);
        let cur = snapshot(&[("dev", 25.0), ("b", 5.0)]);
        let check = diff_snapshots(&prev, &cur);
        assert!(check.detected);
        assert!((check.percent - 15.0).abs() < 1e-9);
        assert_eq!(check.details.unwrap().address, "dev");
    }

    #[test]
    fn rule_a_ignores_small_drop() {
        let prev = snapshot(&[("dev", 40.0)]);
        let cur = snapshot(&[("dev", 32.0)]);
        let check = diff_snapshots(&prev, &cur);
        assert!(!check.detected);
    }

    #[test]
    fn rule_b_fires_when_large_holder_exits() {
        // The #1 holder is unchanged; a 20% holder vanished entirely.
        let prev = snapshot(&[("top", 35.0), ("whale", 20.0), ("c", 3.0)]);
        let cur = snapshot(&[("top", 35.0), ("c", 3.0)]);
        let check = diff_snapshots(&prev, &cur);
        assert!(check.detected);
        assert!(check.percent >= 20.0);
        assert_eq!(check.details.unwrap().address, "whale");
    }

    #[test]
    fn rule_b_fires_below_one_percent() {
        let prev = snapshot(&[("top", 35.0), ("whale", 18.0)]);
        let cur = snapshot(&[("top", 35.0), ("whale", 0.5)]);
        let check = diff_snapshots(&prev, &cur);
        assert!(check.detected);
        assert!((check.percent - 18.0).abs() < 1e-9);
    }

    #[test]
    fn rule_b_ignores_small_prior_holders() {
        let prev = snapshot(&[("top", 35.0), ("small", 10.0)]);
        let cur = snapshot(&[("top", 35.0)]);
        let check = diff_snapshots(&prev, &cur);
        assert!(!check.detected);
    }

    #[test]
    fn larger_rule_wins() {
        // Rule A drop of 12 points, Rule B exit of 25%: report the exit.
        let prev = snapshot(&[("dev", 30.0), ("whale", 25.0)]);
        let cur = snapshot(&[("dev", 18.0)]);
        let check = diff_snapshots(&prev, &cur);
        assert!(check.detected);
        assert!((check.percent - 25.0).abs() < 1e-9);
        assert_eq!(check.details.unwrap().address, "whale");
    }

    #[test]
    fn percentages_come_from_observed_total() {
        let accounts = vec![
            TokenAccount {
                owner: Some("a".into()),
                amount: 60.0,
            },
            TokenAccount {
                owner: Some("b".into()),
                amount: 40.0,
            },
        ];
        let snap = snapshot_from_accounts(&accounts);
        assert!((snap.holders[0].percentage - 60.0).abs() < 1e-9);
        assert_eq!(snap.holders[0].address, "a");
    }

    #[test]
    fn risk_thresholds() {
        let critical = assess_risk(&snapshot(&[("a", 30.0)]));
        assert_eq!(critical.risk, RiskLevel::Critical);

        let high = assess_risk(&snapshot(&[("a", 20.0)]));
        assert_eq!(high.risk, RiskLevel::High);

        let top5_high = assess_risk(&snapshot(&[
            ("a", 12.0),
            ("b", 11.0),
            ("c", 10.0),
            ("d", 9.0),
            ("e", 8.0),
        ]));
        assert_eq!(top5_high.risk, RiskLevel::High);

        let low = assess_risk(&snapshot(&[("a", 5.0), ("b", 4.0)]));
        assert_eq!(low.risk, RiskLevel::Low);
    }
}
