use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Count-based premium request quota for the current billing period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumUsage {
    pub current: u64,
    pub limit: u64,
    pub period_start: DateTime<Utc>,
}

/// One usage-based billing line attributed to a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingItem {
    pub model: String,
    pub request_count: u64,
    /// Dollars per request
    pub cost_per_request: f64,
    /// Dollars, as reported by the invoice
    pub total_cost: f64,
}

impl BillingItem {
    /// Cost implied by `request_count * cost_per_request`
    pub fn computed_cost(&self) -> f64 {
        self.request_count as f64 * self.cost_per_request
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    pub premium: PremiumUsage,
    /// Display order
    pub billing_items: Vec<BillingItem>,
    pub has_unpaid_mid_month_invoice: bool,
    pub mid_month_payment: f64,
}

impl UsageSnapshot {
    /// Sum of item totals. Never re-derived from per-request prices.
    pub fn total_cost(&self) -> f64 {
        self.billing_items.iter().map(|i| i.total_cost).sum()
    }

    pub fn usage_based_requests(&self) -> u64 {
        self.billing_items.iter().map(|i| i.request_count).sum()
    }
}

/// Spending cap settings for usage-based pricing
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageLimitConfig {
    pub enabled: bool,
    pub hard_limit_dollars: Option<f64>,
}

impl UsageLimitConfig {
    /// Hard limit usable as a percentage denominator
    pub fn effective_limit(&self) -> Option<f64> {
        self.hard_limit_dollars.filter(|l| *l > 0.0)
    }
}
