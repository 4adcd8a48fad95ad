use chrono::{DateTime, Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::credentials::Credentials;
use crate::error::{UsageError, UsageResult};
use crate::models::{BillingItem, PremiumUsage, UsageLimitConfig, UsageSnapshot};
use crate::utils::env_string;

const DEFAULT_BASE_URL: &str = "https://cursor.com";
const USAGE_ENDPOINT: &str = "/api/usage";
const INVOICE_ENDPOINT: &str = "/api/dashboard/get-monthly-invoice";
const GET_LIMIT_ENDPOINT: &str = "/api/dashboard/get-hard-limit";
const SET_LIMIT_ENDPOINT: &str = "/api/dashboard/set-hard-limit";
const BILLING_ENDPOINT: &str = "/api/stripeSession";
const REQUEST_TIMEOUT_SECONDS: u64 = 10;
const USER_AGENT: &str = concat!("cursor-usage/", env!("CARGO_PKG_VERSION"));

/// "143 extra fast premium requests (claude-3.5-sonnet) * 4 cents per such request"
static REQUEST_ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\s+(.*?)\s*\*\s*([\d.]+)\s*cents per").unwrap());
/// "12 token-based usage calls to gpt-4.1, totalling: $0.84"
static TOKEN_ITEM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)\s+token-based usage calls to\s+([^,]+),\s*totalling:\s*\$([\d.]+)").unwrap()
});
static MODEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(([^)]+)\)").unwrap());
static MID_MONTH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)mid-month usage paid").unwrap());

/// The vendor API, as the refresh loop sees it
pub trait UsageApi {
    fn fetch_usage_snapshot(&self, creds: &Credentials) -> UsageResult<UsageSnapshot>;
    fn fetch_usage_limit_config(&self, creds: &Credentials) -> UsageResult<UsageLimitConfig>;
    fn set_usage_limit(
        &self,
        creds: &Credentials,
        amount_dollars: f64,
        disable_usage_based: bool,
    ) -> UsageResult<()>;
    fn billing_portal_url(&self, creds: &Credentials) -> UsageResult<String>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelUsageDto {
    #[serde(default)]
    num_requests: u64,
    max_request_usage: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageResponseDto {
    #[serde(rename = "gpt-4")]
    premium: Option<ModelUsageDto>,
    #[serde(deserialize_with = "deserialize_datetime")]
    start_of_month: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct InvoiceItemDto {
    #[serde(default)]
    description: String,
    #[serde(default)]
    cents: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvoiceDto {
    #[serde(default)]
    items: Vec<InvoiceItemDto>,
    #[serde(default)]
    has_unpaid_mid_month_invoice: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InvoiceRequest {
    month: u32,
    year: i32,
    include_usage_events: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HardLimitDto {
    hard_limit: Option<f64>,
    #[serde(default)]
    no_usage_based_allowed: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SetHardLimitRequest {
    hard_limit: f64,
    no_usage_based_allowed: bool,
}

impl From<HardLimitDto> for UsageLimitConfig {
    fn from(value: HardLimitDto) -> Self {
        UsageLimitConfig {
            enabled: !value.no_usage_based_allowed,
            hard_limit_dollars: value.hard_limit,
        }
    }
}

impl From<UsageResponseDto> for PremiumUsage {
    fn from(value: UsageResponseDto) -> Self {
        let premium = value.premium.unwrap_or(ModelUsageDto {
            num_requests: 0,
            max_request_usage: None,
        });
        PremiumUsage {
            current: premium.num_requests,
            // zero is surfaced as an error by the aggregator
            limit: premium.max_request_usage.unwrap_or(0),
            period_start: value.start_of_month,
        }
    }
}

/// Split invoice lines into billing items and the mid-month payment total.
fn parse_invoice_items(items: &[InvoiceItemDto]) -> (Vec<BillingItem>, f64) {
    let mut billing = Vec::new();
    let mut mid_month_payment = 0.0;
    for item in items {
        let description = item.description.trim();
        let total_cost = item.cents / 100.0;
        if MID_MONTH_RE.is_match(description) {
            if total_cost < 0.0 {
                mid_month_payment += -total_cost;
            }
            continue;
        }
        if let Some(parsed) = parse_invoice_line(description, total_cost) {
            billing.push(parsed);
        } else if total_cost != 0.0 {
            tracing::debug!(description, "unrecognized invoice line");
            billing.push(BillingItem {
                model: description.to_string(),
                request_count: 0,
                cost_per_request: 0.0,
                total_cost,
            });
        }
    }
    (billing, mid_month_payment)
}

fn parse_invoice_line(description: &str, total_cost: f64) -> Option<BillingItem> {
    if let Some(caps) = REQUEST_ITEM_RE.captures(description) {
        let request_count = caps.get(1)?.as_str().parse().ok()?;
        let what = caps.get(2)?.as_str();
        let cents_per: f64 = caps.get(3)?.as_str().parse().ok()?;
        let model = MODEL_RE
            .captures(what)
            .and_then(|m| m.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| what.to_string());
        return Some(BillingItem {
            model,
            request_count,
            cost_per_request: cents_per / 100.0,
            total_cost,
        });
    }
    if let Some(caps) = TOKEN_ITEM_RE.captures(description) {
        let request_count: u64 = caps.get(1)?.as_str().parse().ok()?;
        let model = caps.get(2)?.as_str().trim().to_string();
        let cost_per_request = if request_count > 0 {
            total_cost / request_count as f64
        } else {
            0.0
        };
        return Some(BillingItem {
            model,
            request_count,
            cost_per_request,
            total_cost,
        });
    }
    None
}

/// Blocking client for the Cursor dashboard API
#[derive(Clone)]
pub struct CursorApi {
    agent: ureq::Agent,
    base_url: String,
}

impl CursorApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(REQUEST_TIMEOUT_SECONDS)))
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Base URL from `CURSOR_USAGE_API_BASE`, defaulting to cursor.com
    pub fn from_env() -> Self {
        Self::new(env_string("CURSOR_USAGE_API_BASE").unwrap_or_else(|| DEFAULT_BASE_URL.into()))
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        creds: &Credentials,
        query: &[(&str, &str)],
    ) -> UsageResult<T> {
        tracing::debug!(endpoint, "GET");
        let mut request = self
            .agent
            .get(self.url(endpoint))
            .header("Cookie", creds.session_cookie())
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json");
        for (k, v) in query {
            request = request.query(*k, *v);
        }
        let mut response = request.call()?;
        let status = response.status();
        if !status.is_success() {
            return Err(UsageError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }
        Ok(response.body_mut().read_json::<T>()?)
    }

    fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        creds: &Credentials,
        body: &B,
    ) -> UsageResult<T> {
        tracing::debug!(endpoint, "POST");
        let mut response = self
            .agent
            .post(self.url(endpoint))
            .header("Cookie", creds.session_cookie())
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json")
            .header("Origin", self.base_url.as_str())
            .send_json(body)?;
        let status = response.status();
        if !status.is_success() {
            return Err(UsageError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }
        Ok(response.body_mut().read_json::<T>()?)
    }
}

impl UsageApi for CursorApi {
    fn fetch_usage_snapshot(&self, creds: &Credentials) -> UsageResult<UsageSnapshot> {
        let usage: UsageResponseDto =
            self.get_json(USAGE_ENDPOINT, creds, &[("user", creds.user_id.as_str())])?;
        let premium = PremiumUsage::from(usage);

        let invoice: InvoiceDto = self.post_json(
            INVOICE_ENDPOINT,
            creds,
            &InvoiceRequest {
                month: premium.period_start.month(),
                year: premium.period_start.year(),
                include_usage_events: false,
            },
        )?;
        let (billing_items, mid_month_payment) = parse_invoice_items(&invoice.items);

        Ok(UsageSnapshot {
            premium,
            billing_items,
            has_unpaid_mid_month_invoice: invoice.has_unpaid_mid_month_invoice,
            mid_month_payment,
        })
    }

    fn fetch_usage_limit_config(&self, creds: &Credentials) -> UsageResult<UsageLimitConfig> {
        let dto: HardLimitDto =
            self.post_json(GET_LIMIT_ENDPOINT, creds, &serde_json::json!({}))?;
        Ok(dto.into())
    }

    fn set_usage_limit(
        &self,
        creds: &Credentials,
        amount_dollars: f64,
        disable_usage_based: bool,
    ) -> UsageResult<()> {
        let _: serde_json::Value = self.post_json(
            SET_LIMIT_ENDPOINT,
            creds,
            &SetHardLimitRequest {
                hard_limit: amount_dollars,
                no_usage_based_allowed: disable_usage_based,
            },
        )?;
        tracing::info!(amount_dollars, disable_usage_based, "usage limit updated");
        Ok(())
    }

    fn billing_portal_url(&self, creds: &Credentials) -> UsageResult<String> {
        let url: String = self.get_json(BILLING_ENDPOINT, creds, &[])?;
        if url.trim().is_empty() {
            return Err(UsageError::Decode("empty billing portal url".into()));
        }
        Ok(url)
    }
}

fn deserialize_datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(serde::de::Error::custom)
}
