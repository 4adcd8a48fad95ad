//! Turns a fetched snapshot and limit config into the view both the status
//! line and the panel render, plus the request handed to the notification
//! gate.

use chrono::{DateTime, Local, Utc};

use crate::error::UsageResult;
use crate::format::{color_tier, cost_percentage, next_reset_date, percentage};
use crate::models::{DerivedView, PremiumStats, UsageBasedStats, UsageLimitConfig, UsageSnapshot};
use crate::notify::{NotificationRequest, UsageKind};

/// Invoice total and per-request math may differ by rounding; beyond this
/// the mismatch is worth a log line.
const COST_MISMATCH_TOLERANCE: f64 = 0.005;

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub view: DerivedView,
    pub notification: NotificationRequest,
}

/// Build the derived view. `limit_config` is `None` when its fetch failed;
/// the usage-based section is then omitted and premium usage drives color
/// and notifications.
pub fn aggregate(
    snapshot: &UsageSnapshot,
    limit_config: Option<&UsageLimitConfig>,
    now: DateTime<Utc>,
) -> UsageResult<Aggregate> {
    let premium_percent = percentage(snapshot.premium.current, snapshot.premium.limit)?;

    for item in &snapshot.billing_items {
        let computed = item.computed_cost();
        if (computed - item.total_cost).abs() > COST_MISMATCH_TOLERANCE {
            tracing::debug!(
                model = %item.model,
                invoiced = item.total_cost,
                computed,
                "billing item total disagrees with per-request cost"
            );
        }
    }
    let current_cost = snapshot.total_cost();

    let usage_based_enabled = limit_config.is_some_and(|c| c.enabled);
    let usage_based_percent = match limit_config.and_then(UsageLimitConfig::effective_limit) {
        Some(limit) if usage_based_enabled && !snapshot.billing_items.is_empty() => {
            cost_percentage(current_cost, limit)?
        }
        _ => 0,
    };

    let (active_kind, active_percent) = if usage_based_enabled {
        (UsageKind::UsageBased, usage_based_percent)
    } else {
        (UsageKind::Premium, premium_percent)
    };

    let period_start_local = snapshot
        .premium
        .period_start
        .with_timezone(&Local)
        .date_naive();

    let view = DerivedView {
        premium: PremiumStats {
            current: snapshot.premium.current,
            limit: snapshot.premium.limit,
            period_start: snapshot.premium.period_start,
            next_reset: next_reset_date(period_start_local),
            percentage: premium_percent,
        },
        usage_based: limit_config.map(|c| UsageBasedStats {
            is_enabled: c.enabled,
            limit: c.hard_limit_dollars,
            current_cost,
            percentage: usage_based_percent,
            items: snapshot.billing_items.clone(),
            mid_month_payment: snapshot.mid_month_payment,
            has_unpaid_mid_month_invoice: snapshot.has_unpaid_mid_month_invoice,
        }),
        usage_based_percent,
        current_cost,
        billing_item_count: snapshot.billing_items.len(),
        active_kind,
        active_percent,
        color_tier: color_tier(active_percent),
        total_requests: snapshot.premium.current + snapshot.usage_based_requests(),
        updated_at: now,
    };

    let notification = NotificationRequest {
        kind: active_kind,
        percent: active_percent,
        limit: if usage_based_enabled {
            limit_config.and_then(|c| c.hard_limit_dollars)
        } else {
            None
        },
        invoice_warning: usage_based_enabled && snapshot.has_unpaid_mid_month_invoice,
    };

    Ok(Aggregate { view, notification })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UsageError;
    use crate::format::ColorTier;
    use crate::models::{BillingItem, PremiumUsage};
    use chrono::TimeZone;

    fn snapshot(current: u64, limit: u64, items: Vec<BillingItem>) -> UsageSnapshot {
        UsageSnapshot {
            premium: PremiumUsage {
                current,
                limit,
                period_start: Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap(),
            },
            billing_items: items,
            has_unpaid_mid_month_invoice: false,
            mid_month_payment: 0.0,
        }
    }

    fn gpt_item() -> BillingItem {
        BillingItem {
            model: "gpt".to_string(),
            request_count: 10,
            cost_per_request: 0.02,
            total_cost: 0.20,
        }
    }

    fn enabled(limit: f64) -> UsageLimitConfig {
        UsageLimitConfig {
            enabled: true,
            hard_limit_dollars: Some(limit),
        }
    }

    #[test]
    fn usage_based_drives_active_percent_when_enabled() {
        let snap = snapshot(45, 50, vec![gpt_item()]);
        let agg = aggregate(&snap, Some(&enabled(1.0)), Utc::now()).unwrap();
        assert_eq!(agg.view.premium_percent(), 90);
        assert_eq!(agg.view.usage_based_percent, 20);
        assert_eq!(agg.view.active_percent, 20);
        assert_eq!(agg.view.active_kind, UsageKind::UsageBased);
        assert_eq!(agg.view.color_tier, ColorTier::Low);
        assert_eq!(agg.view.total_requests, 55);
        assert_eq!(agg.notification.kind, UsageKind::UsageBased);
        assert_eq!(agg.notification.percent, 20);
        assert_eq!(agg.notification.limit, Some(1.0));
    }

    #[test]
    fn premium_drives_when_usage_based_disabled() {
        let snap = snapshot(45, 50, vec![gpt_item()]);
        let config = UsageLimitConfig {
            enabled: false,
            hard_limit_dollars: Some(1.0),
        };
        let agg = aggregate(&snap, Some(&config), Utc::now()).unwrap();
        assert_eq!(agg.view.usage_based_percent, 0);
        assert_eq!(agg.view.active_percent, 90);
        assert_eq!(agg.view.color_tier, ColorTier::Severe);
        assert_eq!(agg.notification.kind, UsageKind::Premium);
        assert_eq!(agg.notification.limit, None);
    }

    #[test]
    fn zero_premium_limit_fails_the_cycle() {
        let snap = snapshot(45, 0, vec![gpt_item()]);
        let err = aggregate(&snap, Some(&enabled(1.0)), Utc::now()).unwrap_err();
        assert!(matches!(err, UsageError::ZeroLimit { .. }));
    }

    #[test]
    fn empty_items_mean_zero_cost_and_percent() {
        let snap = snapshot(10, 50, Vec::new());
        let agg = aggregate(&snap, Some(&enabled(1.0)), Utc::now()).unwrap();
        let ub = agg.view.usage_based.as_ref().unwrap();
        assert_eq!(ub.current_cost, 0.0);
        assert_eq!(agg.view.usage_based_percent, 0);
        assert_eq!(agg.view.active_percent, 0);
    }

    #[test]
    fn missing_or_zero_hard_limit_gives_zero_percent() {
        let snap = snapshot(10, 50, vec![gpt_item()]);
        for config in [
            UsageLimitConfig {
                enabled: true,
                hard_limit_dollars: None,
            },
            enabled(0.0),
        ] {
            let agg = aggregate(&snap, Some(&config), Utc::now()).unwrap();
            assert_eq!(agg.view.usage_based_percent, 0);
            assert_eq!(agg.view.active_kind, UsageKind::UsageBased);
        }
    }

    #[test]
    fn degraded_limit_fetch_omits_usage_section() {
        let snap = snapshot(30, 50, vec![gpt_item()]);
        let agg = aggregate(&snap, None, Utc::now()).unwrap();
        assert!(agg.view.usage_based.is_none());
        assert_eq!(agg.view.active_kind, UsageKind::Premium);
        assert_eq!(agg.view.active_percent, 60);
    }

    #[test]
    fn invoice_warning_only_when_usage_based_enabled() {
        let mut snap = snapshot(30, 50, vec![gpt_item()]);
        snap.has_unpaid_mid_month_invoice = true;
        let on = aggregate(&snap, Some(&enabled(5.0)), Utc::now()).unwrap();
        assert!(on.notification.invoice_warning);
        let off = aggregate(&snap, None, Utc::now()).unwrap();
        assert!(!off.notification.invoice_warning);
    }

    #[test]
    fn total_sums_invoice_totals_not_per_request_math() {
        let items = vec![
            gpt_item(),
            BillingItem {
                model: "claude".to_string(),
                request_count: 3,
                cost_per_request: 0.04,
                total_cost: 0.15,
            },
        ];
        let snap = snapshot(0, 50, items);
        let agg = aggregate(&snap, Some(&enabled(10.0)), Utc::now()).unwrap();
        let cost = agg.view.usage_based.unwrap().current_cost;
        assert!((cost - 0.35).abs() < 1e-9);
    }
}
