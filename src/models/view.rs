use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::usage::BillingItem;
use crate::format::ColorTier;
use crate::notify::UsageKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumStats {
    pub current: u64,
    pub limit: u64,
    pub period_start: DateTime<Utc>,
    pub next_reset: NaiveDate,
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageBasedStats {
    pub is_enabled: bool,
    pub limit: Option<f64>,
    pub current_cost: f64,
    pub percentage: u32,
    pub items: Vec<BillingItem>,
    pub mid_month_payment: f64,
    pub has_unpaid_mid_month_invoice: bool,
}

impl UsageBasedStats {
    /// Spend not yet covered by a mid-month payment
    pub fn unpaid_amount(&self) -> f64 {
        self.current_cost - self.mid_month_payment
    }
}

/// Everything the status line and the panel render for one cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedView {
    pub premium: PremiumStats,
    /// `None` when the limit-config fetch failed
    pub usage_based: Option<UsageBasedStats>,
    pub usage_based_percent: u32,
    /// Sum of billing item totals, known even when the limit fetch failed
    pub current_cost: f64,
    pub billing_item_count: usize,
    pub active_kind: UsageKind,
    pub active_percent: u32,
    pub color_tier: ColorTier,
    pub total_requests: u64,
    pub updated_at: DateTime<Utc>,
}

impl DerivedView {
    pub fn premium_percent(&self) -> u32 {
        self.premium.percentage
    }
}

/// Message and detail shown in place of stats when a cycle fails
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorView {
    pub message: String,
    pub details: String,
    pub updated_at: DateTime<Utc>,
}
