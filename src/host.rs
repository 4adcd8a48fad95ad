//! The editor-side surface the refresh loop renders into, and the events it
//! sends back.
//!
//! `TerminalHost` stands in for the editor: status, panel and notifications
//! become lines on a writer, and prompts are answered from values supplied
//! up front (CLI arguments or the event that triggered the flow).

use serde::Serialize;
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;

use crate::display::{render_dim, render_status_line, PanelMessage, StatusBarState};
use crate::notify::{Notification, NotificationAction, Severity};

pub trait HostSurface {
    fn set_status(&mut self, status: &StatusBarState);
    fn post_panel(&mut self, message: &PanelMessage);
    /// Show a notification; returns the action the user picked, if any.
    fn notify(&mut self, notification: &Notification) -> Option<NotificationAction>;
    fn show_info(&mut self, message: &str);
    fn show_error(&mut self, message: &str);
    /// Ask for a dollar amount; `None` when dismissed.
    fn prompt_limit(&mut self, title: &str) -> Option<String>;
    fn confirm(&mut self, prompt: &str) -> bool;
    fn open_external(&mut self, url: &str);
    fn open_settings(&mut self);
}

/// Trailing words on a `set-limit` line that confirm enabling usage-based pricing
const CONFIRM_WORDS: [&str; 3] = ["yes", "y", "--yes"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Refresh,
    /// Window focus gained (`true`) or lost
    Focus(bool),
    /// `confirmed` pre-answers the "enable usage-based pricing?" question
    SetLimit { input: Option<String>, confirmed: bool },
    ToggleUsageBased { input: Option<String> },
    OpenSettings,
    OpenBillingPage,
    Shutdown,
}

impl HostEvent {
    /// Parse one stdin line: a plain command or a panel JSON command.
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        if line.starts_with('{') {
            return Self::parse_panel_command(line);
        }
        let mut parts = line.split_whitespace();
        let command = parts.next()?.to_ascii_lowercase();
        let (confirms, args): (Vec<&str>, Vec<&str>) =
            parts.partition(|p| CONFIRM_WORDS.contains(&p.to_ascii_lowercase().as_str()));
        let arg = args.first().map(|a| a.to_string());
        let confirmed = !confirms.is_empty();
        match command.as_str() {
            "refresh" => Some(HostEvent::Refresh),
            "focus" => Some(HostEvent::Focus(true)),
            "blur" => Some(HostEvent::Focus(false)),
            "set-limit" | "setlimit" => Some(HostEvent::SetLimit {
                input: arg,
                confirmed,
            }),
            "toggle" => Some(HostEvent::ToggleUsageBased { input: arg }),
            "billing" => Some(HostEvent::OpenBillingPage),
            "settings" => Some(HostEvent::OpenSettings),
            "quit" | "exit" => Some(HostEvent::Shutdown),
            _ => None,
        }
    }

    fn parse_panel_command(line: &str) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_str(line).ok()?;
        let input = value.get("value").and_then(|v| match v {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
        let confirmed = value
            .get("confirm")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        match value.get("command")?.as_str()? {
            "refresh" => Some(HostEvent::Refresh),
            "setLimit" => Some(HostEvent::SetLimit { input, confirmed }),
            "toggleUsageBasedPricing" => Some(HostEvent::ToggleUsageBased { input }),
            "openSettings" => Some(HostEvent::OpenSettings),
            "openBillingPage" => Some(HostEvent::OpenBillingPage),
            _ => None,
        }
    }
}

/// Line-oriented host on any writer (stdout in the binary)
pub struct TerminalHost<W: Write> {
    out: W,
    json: bool,
    show_tooltip: bool,
    pending_limit: Option<String>,
    settings_path: Option<PathBuf>,
}

impl<W: Write> TerminalHost<W> {
    pub fn new(out: W, json: bool) -> Self {
        Self {
            out,
            json,
            show_tooltip: false,
            pending_limit: None,
            settings_path: None,
        }
    }

    pub fn with_tooltip(mut self, show: bool) -> Self {
        self.show_tooltip = show;
        self
    }

    /// Answer the next limit prompt with `input`
    pub fn with_limit_input(mut self, input: Option<String>) -> Self {
        self.pending_limit = input;
        self
    }

    pub fn with_settings_path(mut self, path: Option<PathBuf>) -> Self {
        self.settings_path = path;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}").and_then(|_| self.out.flush()) {
            tracing::warn!(error = %e, "failed to write host output");
        }
    }

    fn event<T: Serialize>(&mut self, event: &str, payload: &T) {
        let value = json!({ "event": event, "data": payload });
        self.line(&value.to_string());
    }
}

impl<W: Write> HostSurface for TerminalHost<W> {
    fn set_status(&mut self, status: &StatusBarState) {
        if self.json {
            self.event("status", status);
            return;
        }
        let line = render_status_line(status);
        self.line(&line);
        if self.show_tooltip {
            let tooltip = status.tooltip.clone();
            self.line(&tooltip);
        }
    }

    fn post_panel(&mut self, message: &PanelMessage) {
        // The panel only exists for JSON consumers
        if self.json {
            self.event("panel", message);
        }
    }

    fn notify(&mut self, notification: &Notification) -> Option<NotificationAction> {
        if self.json {
            self.event("notification", notification);
            return None;
        }
        let prefix = match notification.severity {
            Severity::Info => "info",
            Severity::Warning => "warning",
        };
        let hint = match notification.action {
            Some(NotificationAction::OpenBillingPage) => " (type `billing` to open the billing page)",
            None => "",
        };
        let text = format!("[{prefix}] {}{}", notification.message, render_dim(hint));
        self.line(&text);
        None
    }

    fn show_info(&mut self, message: &str) {
        if self.json {
            self.event("info", &message);
        } else {
            self.line(message);
        }
    }

    fn show_error(&mut self, message: &str) {
        if self.json {
            self.event("error", &message);
        } else {
            self.line(&format!("error: {message}"));
        }
    }

    fn prompt_limit(&mut self, title: &str) -> Option<String> {
        let answer = self.pending_limit.take();
        if answer.is_none() {
            tracing::debug!(title, "limit prompt dismissed, no input supplied");
        }
        answer
    }

    /// No interactive answer; confirmation travels with the request instead.
    fn confirm(&mut self, prompt: &str) -> bool {
        let text = format!("{prompt} (pass --yes, or send `set-limit <N> yes` while watching)");
        self.show_info(&text);
        false
    }

    fn open_external(&mut self, url: &str) {
        if self.json {
            self.event("openExternal", &url);
        } else {
            self.line(url);
        }
    }

    fn open_settings(&mut self) {
        let path = self
            .settings_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "no settings directory available".to_string());
        if self.json {
            self.event("openSettings", &path);
        } else {
            self.line(&format!("settings: {path}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::StatusColor;
    use crate::format::ColorTier;
    use crate::notify::invoice_warning;

    #[test]
    fn parses_plain_commands() {
        assert_eq!(HostEvent::parse_line("refresh"), Some(HostEvent::Refresh));
        assert_eq!(HostEvent::parse_line(" blur "), Some(HostEvent::Focus(false)));
        assert_eq!(HostEvent::parse_line("focus"), Some(HostEvent::Focus(true)));
        assert_eq!(
            HostEvent::parse_line("set-limit 25"),
            Some(HostEvent::SetLimit {
                input: Some("25".into()),
                confirmed: false,
            })
        );
        assert_eq!(
            HostEvent::parse_line("set-limit 25 yes"),
            Some(HostEvent::SetLimit {
                input: Some("25".into()),
                confirmed: true,
            })
        );
        assert_eq!(
            HostEvent::parse_line("set-limit --yes 30"),
            Some(HostEvent::SetLimit {
                input: Some("30".into()),
                confirmed: true,
            })
        );
        assert_eq!(
            HostEvent::parse_line("toggle"),
            Some(HostEvent::ToggleUsageBased { input: None })
        );
        assert_eq!(HostEvent::parse_line("quit"), Some(HostEvent::Shutdown));
        assert_eq!(HostEvent::parse_line("dance"), None);
        assert_eq!(HostEvent::parse_line(""), None);
    }

    #[test]
    fn parses_panel_commands() {
        assert_eq!(
            HostEvent::parse_line(r#"{"command":"refresh"}"#),
            Some(HostEvent::Refresh)
        );
        assert_eq!(
            HostEvent::parse_line(r#"{"command":"setLimit","value":40}"#),
            Some(HostEvent::SetLimit {
                input: Some("40".into()),
                confirmed: false,
            })
        );
        assert_eq!(
            HostEvent::parse_line(r#"{"command":"setLimit","value":"15","confirm":true}"#),
            Some(HostEvent::SetLimit {
                input: Some("15".into()),
                confirmed: true,
            })
        );
        assert_eq!(
            HostEvent::parse_line(r#"{"command":"toggleUsageBasedPricing"}"#),
            Some(HostEvent::ToggleUsageBased { input: None })
        );
        assert_eq!(
            HostEvent::parse_line(r#"{"command":"openSettings"}"#),
            Some(HostEvent::OpenSettings)
        );
        assert_eq!(HostEvent::parse_line(r#"{"command":"nope"}"#), None);
        assert_eq!(HostEvent::parse_line("{broken"), None);
    }

    fn status() -> StatusBarState {
        StatusBarState {
            text: "$(graph) 1/50".into(),
            color: StatusColor::Tier(ColorTier::Idle),
            theme_color: ColorTier::Idle.theme_color(),
            tooltip: "## tooltip".into(),
            command: crate::display::SHOW_STATS_COMMAND,
        }
    }

    #[test]
    fn json_host_emits_tagged_events() {
        let mut host = TerminalHost::new(Vec::new(), true);
        host.set_status(&status());
        host.notify(&invoice_warning());
        let out = String::from_utf8(host.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[0]["event"], "status");
        assert_eq!(lines[0]["data"]["text"], "$(graph) 1/50");
        assert_eq!(lines[1]["event"], "notification");
        assert_eq!(lines[1]["data"]["action"], "openBillingPage");
    }

    #[test]
    fn text_host_skips_panel() {
        let mut host = TerminalHost::new(Vec::new(), false);
        host.post_panel(&PanelMessage::Error {
            message: "m".into(),
            details: "d".into(),
        });
        assert!(host.into_inner().is_empty());
    }

    #[test]
    fn prompts_use_supplied_answers_once() {
        let mut host = TerminalHost::new(Vec::new(), false).with_limit_input(Some("12".into()));
        assert_eq!(host.prompt_limit("limit"), Some("12".into()));
        assert_eq!(host.prompt_limit("limit"), None);
        assert!(!host.confirm("Enable?"));
        let out = String::from_utf8(host.into_inner()).unwrap();
        assert!(out.contains("set-limit <N> yes"));
    }
}
