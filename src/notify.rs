//! Threshold-crossing notifications.
//!
//! Each usage kind remembers the highest threshold it has announced this
//! session. A notification fires only when usage reaches a threshold above
//! that mark, so a reading that dips and recovers stays quiet.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::format::currency_text;

pub const DEFAULT_THRESHOLDS: [u32; 4] = [50, 75, 90, 100];

/// Thresholds at or above this are surfaced as warnings
const WARNING_THRESHOLD: u32 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UsageKind {
    Premium,
    UsageBased,
}

impl fmt::Display for UsageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsageKind::Premium => f.write_str("premium"),
            UsageKind::UsageBased => f.write_str("usage-based"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationAction {
    OpenBillingPage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// `None` for the invoice warning
    pub kind: Option<UsageKind>,
    pub threshold: Option<u32>,
    pub severity: Severity,
    pub message: String,
    pub action: Option<NotificationAction>,
}

/// What one aggregation cycle asks the gate to consider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NotificationRequest {
    pub kind: UsageKind,
    pub percent: u32,
    /// Dollar cap, quoted in usage-based messages
    pub limit: Option<f64>,
    pub invoice_warning: bool,
}

#[derive(Debug, Clone)]
pub struct NotificationGate {
    thresholds: Vec<u32>,
    notified: HashMap<UsageKind, u32>,
}

impl Default for NotificationGate {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLDS.to_vec())
    }
}

impl NotificationGate {
    pub fn new(mut thresholds: Vec<u32>) -> Self {
        thresholds.sort_unstable();
        thresholds.dedup();
        Self {
            thresholds,
            notified: HashMap::new(),
        }
    }

    pub fn thresholds(&self) -> &[u32] {
        &self.thresholds
    }

    pub fn last_notified(&self, kind: UsageKind) -> Option<u32> {
        self.notified.get(&kind).copied()
    }

    pub fn reset_notifications(&mut self) {
        self.notified.clear();
    }

    /// Threshold notification for `percent`, if it crosses a new mark.
    pub fn check(&mut self, kind: UsageKind, percent: u32, limit: Option<f64>) -> Option<Notification> {
        let reached = self
            .thresholds
            .iter()
            .rev()
            .find(|t| **t <= percent)
            .copied()?;
        if self.last_notified(kind).is_some_and(|last| reached <= last) {
            return None;
        }
        self.notified.insert(kind, reached);
        tracing::debug!(%kind, percent, threshold = reached, "usage threshold crossed");
        Some(Notification {
            kind: Some(kind),
            threshold: Some(reached),
            severity: if reached >= WARNING_THRESHOLD {
                Severity::Warning
            } else {
                Severity::Info
            },
            message: threshold_message(kind, percent, limit),
            action: None,
        })
    }

    /// All notifications for one cycle. The invoice warning is not gated and
    /// repeats for as long as the request carries it.
    pub fn evaluate(&mut self, request: &NotificationRequest) -> Vec<Notification> {
        let mut out = Vec::new();
        if let Some(n) = self.check(request.kind, request.percent, request.limit) {
            out.push(n);
        }
        if request.invoice_warning {
            out.push(invoice_warning());
        }
        out
    }
}

fn threshold_message(kind: UsageKind, percent: u32, limit: Option<f64>) -> String {
    match (kind, limit) {
        (UsageKind::UsageBased, Some(limit)) => format!(
            "Usage-based spending has reached {percent}% of your {} monthly limit",
            currency_text(limit)
        ),
        (UsageKind::UsageBased, None) => {
            format!("Usage-based spending has reached {percent}% of your monthly limit")
        }
        (UsageKind::Premium, _) => {
            format!("Premium request usage has reached {percent}% of your monthly quota")
        }
    }
}

pub fn invoice_warning() -> Notification {
    Notification {
        kind: None,
        threshold: None,
        severity: Severity::Warning,
        message: "You have an unpaid mid-month invoice. Please pay it to continue using usage-based pricing.".to_string(),
        action: Some(NotificationAction::OpenBillingPage),
    }
}
