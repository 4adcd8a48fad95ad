use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{TimeZone, Utc};
use rusqlite::{params, Connection};
use serde_json::Value;
use serial_test::serial;
use std::path::PathBuf;
use tempfile::TempDir;

use cursor_usage::config::Settings;
use cursor_usage::credentials::{Credentials, StateDbCredentials};
use cursor_usage::error::{UsageError, UsageResult};
use cursor_usage::format::ColorTier;
use cursor_usage::host::TerminalHost;
use cursor_usage::models::{BillingItem, PremiumUsage, UsageLimitConfig, UsageSnapshot};
use cursor_usage::refresh::{CycleOutcome, RefreshLoop, SystemClock};
use cursor_usage::usage_api::UsageApi;

struct StaticApi {
    snapshot: UsageSnapshot,
    config: Option<UsageLimitConfig>,
}

impl UsageApi for StaticApi {
    fn fetch_usage_snapshot(&self, creds: &Credentials) -> UsageResult<UsageSnapshot> {
        assert_eq!(creds.user_id, "user_01TEST");
        Ok(self.snapshot.clone())
    }

    fn fetch_usage_limit_config(&self, _: &Credentials) -> UsageResult<UsageLimitConfig> {
        self.config.ok_or(UsageError::Status {
            endpoint: "/api/dashboard/get-hard-limit",
            status: 503,
        })
    }

    fn set_usage_limit(&self, _: &Credentials, _: f64, _: bool) -> UsageResult<()> {
        Ok(())
    }

    fn billing_portal_url(&self, _: &Credentials) -> UsageResult<String> {
        Ok("https://billing.stripe.com/session/test".to_string())
    }
}

fn state_db(dir: &TempDir) -> PathBuf {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256"}"#);
    let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"auth0|user_01TEST"}"#);
    let token = format!("{header}.{payload}.sig");

    let path = dir.path().join("state.vscdb");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("CREATE TABLE ItemTable (key TEXT UNIQUE ON CONFLICT REPLACE, value BLOB);")
        .unwrap();
    conn.execute(
        "INSERT INTO ItemTable (key, value) VALUES (?1, ?2)",
        params!["cursorAuth/accessToken", token],
    )
    .unwrap();
    path
}

fn snapshot(current: u64) -> UsageSnapshot {
    UsageSnapshot {
        premium: PremiumUsage {
            current,
            limit: 50,
            period_start: Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap(),
        },
        billing_items: vec![BillingItem {
            model: "gpt".to_string(),
            request_count: 10,
            cost_per_request: 0.02,
            total_cost: 0.20,
        }],
        has_unpaid_mid_month_invoice: false,
        mid_month_payment: 0.0,
    }
}

fn run_once(api: StaticApi) -> (CycleOutcome, Vec<Value>) {
    let dir = TempDir::new().unwrap();
    let credentials = StateDbCredentials::new(Some(state_db(&dir)));
    let host = TerminalHost::new(Vec::new(), true);
    let mut refresh = RefreshLoop::new(credentials, api, host, SystemClock, Settings::default());
    let outcome = refresh.activate();
    let out = String::from_utf8(refresh.into_host().into_inner()).unwrap();
    let lines = out
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    (outcome, lines)
}

#[test]
#[serial]
fn usage_based_cycle_json_shape() {
    let (outcome, lines) = run_once(StaticApi {
        snapshot: snapshot(45),
        config: Some(UsageLimitConfig {
            enabled: true,
            hard_limit_dollars: Some(1.0),
        }),
    });
    assert!(matches!(outcome, CycleOutcome::Rendered { notifications: 0, .. }));
    assert_eq!(lines.len(), 2);

    let status = &lines[0];
    assert_eq!(status["event"], "status");
    assert_eq!(status["data"]["text"], "$(graph) 45/50 $(credit-card) $0.20");
    assert_eq!(status["data"]["color"]["tier"], "low");
    assert_eq!(status["data"]["themeColor"], ColorTier::Low.theme_color());
    assert_eq!(status["data"]["command"], "cursor-usage.showStats");
    let tooltip = status["data"]["tooltip"].as_str().unwrap();
    assert!(tooltip.contains("**Progress:** 90% utilized"));
    assert!(tooltip.contains("**Monthly Limit:** $1.00 (20% used)"));

    let panel = &lines[1];
    assert_eq!(panel["event"], "panel");
    assert_eq!(panel["data"]["type"], "updateStats");
    assert_eq!(panel["data"]["premiumStats"]["current"], 45);
    assert_eq!(panel["data"]["usageBasedStats"]["limit"], 1.0);
    assert_eq!(panel["data"]["usageBasedStats"]["items"][0]["model"], "gpt");
}

#[test]
#[serial]
fn premium_only_cycle_notifies() {
    let (_, lines) = run_once(StaticApi {
        snapshot: snapshot(45),
        config: None,
    });
    let events: Vec<&str> = lines.iter().map(|l| l["event"].as_str().unwrap()).collect();
    assert_eq!(events, vec!["status", "panel", "notification"]);
    assert_eq!(lines[0]["data"]["color"]["tier"], "severe");
    assert!(lines[1]["data"].get("usageBasedStats").is_none());
    assert_eq!(lines[2]["data"]["kind"], "premium");
    assert_eq!(lines[2]["data"]["threshold"], 90);
    assert_eq!(lines[2]["data"]["severity"], "warning");
}

#[test]
#[serial]
fn zero_quota_renders_error() {
    let mut snap = snapshot(45);
    snap.premium.limit = 0;
    let (outcome, lines) = run_once(StaticApi {
        snapshot: snap,
        config: None,
    });
    assert!(matches!(outcome, CycleOutcome::Failed(_)));
    assert_eq!(lines[0]["data"]["color"], "error");
    assert_eq!(lines[0]["data"]["themeColor"], "statusBarItem.errorBackground");
    assert_eq!(lines[1]["data"]["type"], "error");
    assert_eq!(lines[1]["data"]["message"], "Error fetching Cursor stats");
}
