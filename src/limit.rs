//! Set-limit and toggle flows for usage-based pricing.
//!
//! Both flows read the current limit config first, ask the host for whatever
//! is missing, and only call the API once the input is valid.

use crate::credentials::Credentials;
use crate::error::{UsageError, UsageResult};
use crate::host::HostSurface;
use crate::usage_api::UsageApi;

pub const INVALID_LIMIT_MESSAGE: &str = "Please enter a valid positive number";
const ENABLE_PROMPT: &str = "Usage-based pricing is disabled. Enable it to set a limit?";
const SET_LIMIT_TITLE: &str = "Set Monthly Usage Limit";
const ENABLE_TITLE: &str = "Enable Usage-Based Pricing";

/// What a flow ended up doing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LimitOutcome {
    LimitSet(f64),
    Disabled,
    /// Dismissed prompt or declined confirmation
    Cancelled,
}

impl LimitOutcome {
    pub fn changed(self) -> bool {
        !matches!(self, LimitOutcome::Cancelled)
    }
}

/// Parse a dollar amount typed by the user. Must be a finite number above zero.
pub fn parse_limit_input(input: &str) -> UsageResult<f64> {
    let trimmed = input.trim().trim_start_matches('$');
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(v),
        _ => Err(UsageError::InvalidLimit(INVALID_LIMIT_MESSAGE.to_string())),
    }
}

fn read_limit<H: HostSurface>(host: &mut H, input: Option<String>, title: &str) -> UsageResult<Option<f64>> {
    match input.or_else(|| host.prompt_limit(title)) {
        Some(raw) => parse_limit_input(&raw).map(Some),
        None => Ok(None),
    }
}

/// Update the monthly limit. Enables usage-based pricing if the user confirms;
/// `confirmed` answers that question in advance.
pub fn set_limit<A: UsageApi, H: HostSurface>(
    api: &A,
    creds: &Credentials,
    host: &mut H,
    input: Option<String>,
    confirmed: bool,
) -> UsageResult<LimitOutcome> {
    let config = api.fetch_usage_limit_config(creds)?;
    if !config.enabled && !confirmed && !host.confirm(ENABLE_PROMPT) {
        return Ok(LimitOutcome::Cancelled);
    }
    let Some(limit) = read_limit(host, input, SET_LIMIT_TITLE)? else {
        return Ok(LimitOutcome::Cancelled);
    };
    api.set_usage_limit(creds, limit, false)?;
    tracing::info!(limit, "usage limit updated");
    host.show_info(&format!("Usage limit set to ${limit}"));
    Ok(LimitOutcome::LimitSet(limit))
}

/// Flip usage-based pricing. Enabling needs a limit; disabling sends zero.
pub fn toggle_usage_based<A: UsageApi, H: HostSurface>(
    api: &A,
    creds: &Credentials,
    host: &mut H,
    input: Option<String>,
) -> UsageResult<LimitOutcome> {
    let config = api.fetch_usage_limit_config(creds)?;
    if config.enabled {
        api.set_usage_limit(creds, 0.0, true)?;
        tracing::info!("usage-based pricing disabled");
        host.show_info("Usage-based pricing disabled");
        return Ok(LimitOutcome::Disabled);
    }
    let Some(limit) = read_limit(host, input, ENABLE_TITLE)? else {
        return Ok(LimitOutcome::Cancelled);
    };
    api.set_usage_limit(creds, limit, false)?;
    tracing::info!(limit, "usage-based pricing enabled");
    host.show_info(&format!("Usage limit set to ${limit}"));
    Ok(LimitOutcome::LimitSet(limit))
}
