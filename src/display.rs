use serde::Serialize;
use std::env;

#[cfg(feature = "colors")]
use owo_colors::OwoColorize;

// Provide a no-op color shim when "colors" feature is disabled
#[cfg(not(feature = "colors"))]
pub mod color_shim {
    use std::fmt::{self, Display, Formatter};

    #[derive(Clone)]
    pub struct Plain(pub String);

    impl Display for Plain {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            f.write_str(&self.0)
        }
    }

    pub trait ColorizeShim {
        fn as_str(&self) -> &str;

        fn plain(&self) -> Plain {
            Plain(self.as_str().to_string())
        }
        fn red(&self) -> Plain {
            self.plain()
        }
        fn bright_red(&self) -> Plain {
            self.plain()
        }
        fn bright_magenta(&self) -> Plain {
            self.plain()
        }
        fn yellow(&self) -> Plain {
            self.plain()
        }
        fn bright_yellow(&self) -> Plain {
            self.plain()
        }
        fn bright_blue(&self) -> Plain {
            self.plain()
        }
        fn green(&self) -> Plain {
            self.plain()
        }
        fn bright_green(&self) -> Plain {
            self.plain()
        }
        fn cyan(&self) -> Plain {
            self.plain()
        }
        fn bright_cyan(&self) -> Plain {
            self.plain()
        }
        fn white(&self) -> Plain {
            self.plain()
        }
        fn bright_black(&self) -> Plain {
            self.plain()
        }
        fn bold(&self) -> Plain {
            self.plain()
        }
    }

    impl ColorizeShim for &str {
        fn as_str(&self) -> &str {
            self
        }
    }
    impl ColorizeShim for String {
        fn as_str(&self) -> &str {
            self.as_str()
        }
    }
    impl ColorizeShim for Plain {
        fn as_str(&self) -> &str {
            &self.0
        }
    }
}

#[cfg(not(feature = "colors"))]
use color_shim::ColorizeShim as OwoColorize;

use crate::config::Settings;
use crate::format::{
    currency_text, reset_label, time_of_day, wrap_tooltip_line, ColorTier,
};
use crate::models::{BillingItem, DerivedView, ErrorView, UsageBasedStats};

pub const SHOW_STATS_COMMAND: &str = "cursor-usage.showStats";
const TOOLTIP_TITLE: &str = "Cursor Usage Statistics";
const TOOLTIP_WIDTH: usize = 50;
const ACCOUNT_SETTINGS_URL: &str = "https://www.cursor.com/settings";

/// Editor codicons and the glyphs a terminal shows instead
const ICONS: [(&str, &str); 3] = [
    ("$(graph)", "📈"),
    ("$(credit-card)", "💳"),
    ("$(error)", "⚠"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusColor {
    Tier(ColorTier),
    /// Colors disabled in settings
    Neutral,
    Error,
}

impl StatusColor {
    pub fn theme_color(self) -> &'static str {
        match self {
            StatusColor::Tier(tier) => tier.theme_color(),
            StatusColor::Neutral => "statusBarItem.foreground",
            StatusColor::Error => "statusBarItem.errorBackground",
        }
    }
}

/// What the host's status element should show
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBarState {
    pub text: String,
    pub color: StatusColor,
    pub theme_color: &'static str,
    /// Markdown
    pub tooltip: String,
    pub command: &'static str,
}

pub fn status_text(view: &DerivedView, settings: &Settings) -> String {
    let premium = &view.premium;
    if settings.show_total_requests {
        return format!("$(graph) {}/{}", view.total_requests, premium.limit);
    }
    let mut text = format!("$(graph) {}/{}", premium.current, premium.limit);
    if view.billing_item_count > 0 {
        text.push_str(&format!(" $(credit-card) {}", currency_text(view.current_cost)));
    }
    text
}

pub fn status_bar(view: &DerivedView, settings: &Settings) -> StatusBarState {
    let color = if settings.enable_status_bar_colors {
        StatusColor::Tier(view.color_tier)
    } else {
        StatusColor::Neutral
    };
    StatusBarState {
        text: status_text(view, settings),
        color,
        theme_color: color.theme_color(),
        tooltip: tooltip_markdown(Tooltip::Stats(view)),
        command: SHOW_STATS_COMMAND,
    }
}

pub fn error_status_bar(error: &ErrorView) -> StatusBarState {
    StatusBarState {
        text: "$(error) Cursor Usage: Error".to_string(),
        color: StatusColor::Error,
        theme_color: StatusColor::Error.theme_color(),
        tooltip: tooltip_markdown(Tooltip::Error(error)),
        command: SHOW_STATS_COMMAND,
    }
}

pub enum Tooltip<'a> {
    Stats(&'a DerivedView),
    Error(&'a ErrorView),
}

/// Header, then error or stats, then footer with links and the update time.
pub fn tooltip_markdown(tooltip: Tooltip<'_>) -> String {
    let mut sections: Vec<String> = vec![format!("## {TOOLTIP_TITLE}\n")];
    let updated_at = match tooltip {
        Tooltip::Error(error) => {
            sections.push(format!(
                "### Error\n**Message:** {}\n**Details:** {}\n",
                error.message, error.details
            ));
            error.updated_at
        }
        Tooltip::Stats(view) => {
            sections.push(premium_section(view));
            if let Some(usage) = view.usage_based.as_ref() {
                sections.push(usage_section(usage));
            }
            view.updated_at
        }
    };
    sections.push(footer(&time_of_day(&updated_at.with_timezone(&chrono::Local))));
    sections.join("\n")
}

fn premium_section(view: &DerivedView) -> String {
    let p = &view.premium;
    let start = p.period_start.with_timezone(&chrono::Local).date_naive();
    format!(
        "### Fast Requests\n**Billing Period:** {} (resets {})  \n**Usage:** {} out of {}  \n**Progress:** {}% utilized\n",
        reset_label(start),
        reset_label(p.next_reset),
        p.current,
        p.limit,
        p.percentage
    )
}

fn usage_section(stats: &UsageBasedStats) -> String {
    let mut sections = vec!["### Usage-Based Stats".to_string()];
    if !stats.is_enabled {
        sections.push("**Status:** Currently disabled\n".to_string());
        return sections.join("\n");
    }
    if let Some(limit) = stats.limit.filter(|l| *l > 0.0) {
        sections.push(format!(
            "**Monthly Limit:** {} ({}% used)\n",
            currency_text(limit),
            stats.percentage
        ));
    }
    if stats.items.is_empty() {
        sections.push("**Status:** No usage recorded for this period\n".to_string());
        return sections.join("\n");
    }
    sections.push("#### Usage Breakdown".to_string());
    if stats.mid_month_payment > 0.0 {
        sections.push(format!(
            "**Total:** {}  \n**Unpaid:** {}\n",
            currency_text(stats.current_cost),
            currency_text(stats.unpaid_amount())
        ));
    } else {
        sections.push(format!(
            "**Total Cost:** {}\n",
            currency_text(stats.current_cost)
        ));
    }
    if stats.has_unpaid_mid_month_invoice {
        sections.push("**Invoice:** unpaid mid-month invoice\n".to_string());
    }
    let lines: Vec<String> = stats.items.iter().map(item_line).collect();
    sections.push(lines.join("\n") + "\n");
    sections.join("\n")
}

fn item_line(item: &BillingItem) -> String {
    let calculation = if item.request_count > 0 {
        format!(
            "{} requests × {} = {}",
            item.request_count,
            currency_text(item.cost_per_request),
            currency_text(item.total_cost)
        )
    } else {
        currency_text(item.total_cost)
    };
    format!(
        "- {}:  \n   {}",
        item.model,
        wrap_tooltip_line(&calculation, TOOLTIP_WIDTH)
    )
}

fn footer(last_updated: &str) -> String {
    format!(
        "---\n\n#### Account Management\n\
         - [Account Settings]({ACCOUNT_SETTINGS_URL})\n\
         - [Extension Settings](command:cursor-usage.openSettings)\n\
         - [Set Usage Limit](command:cursor-usage.setLimit)\n\
         - [Refresh Statistics](command:cursor-usage.refreshStats)\n\n\
         **Last Updated:** {last_updated}\n"
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelPremiumStats {
    pub current: u64,
    pub limit: u64,
    pub start_of_month: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelItem {
    pub model: String,
    pub total_dollars: String,
    pub request_count: u64,
    pub cost_per_request: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelUsageStats {
    pub is_enabled: bool,
    pub limit: f64,
    pub current_cost: f64,
    pub billing_period: String,
    pub items: Vec<PanelItem>,
}

/// Messages posted to the side panel
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PanelMessage {
    #[serde(rename_all = "camelCase")]
    UpdateStats {
        premium_stats: PanelPremiumStats,
        #[serde(skip_serializing_if = "Option::is_none")]
        usage_based_stats: Option<PanelUsageStats>,
    },
    Error { message: String, details: String },
}

pub fn panel_message(view: &DerivedView) -> PanelMessage {
    let start = view.premium.period_start.to_rfc3339();
    PanelMessage::UpdateStats {
        premium_stats: PanelPremiumStats {
            current: view.premium.current,
            limit: view.premium.limit,
            start_of_month: start.clone(),
        },
        usage_based_stats: view.usage_based.as_ref().map(|u| PanelUsageStats {
            is_enabled: u.is_enabled,
            limit: u.limit.unwrap_or(0.0),
            current_cost: u.current_cost,
            billing_period: start,
            items: u
                .items
                .iter()
                .map(|i| PanelItem {
                    model: i.model.clone(),
                    total_dollars: currency_text(i.total_cost),
                    request_count: i.request_count,
                    cost_per_request: i.cost_per_request,
                })
                .collect(),
        }),
    }
}

pub fn error_panel_message(error: &ErrorView) -> PanelMessage {
    PanelMessage::Error {
        message: error.message.clone(),
        details: error.details.clone(),
    }
}

/// Swap codicons for terminal glyphs
pub fn replace_icons(text: &str) -> String {
    ICONS
        .iter()
        .fold(text.to_string(), |acc, (icon, glyph)| acc.replace(icon, glyph))
}

fn colors_allowed() -> bool {
    env::var("NO_COLOR").is_err()
}

fn paint_tier(text: &str, tier: ColorTier) -> String {
    match tier {
        ColorTier::Critical => text.red().bold().to_string(),
        ColorTier::Severe => text.bright_red().to_string(),
        ColorTier::Failing => text.red().to_string(),
        ColorTier::Danger => text.bright_magenta().to_string(),
        ColorTier::Caution => text.yellow().bold().to_string(),
        ColorTier::Warning => text.bright_yellow().to_string(),
        ColorTier::Elevated => text.yellow().to_string(),
        ColorTier::Moderate => text.bright_blue().to_string(),
        ColorTier::Healthy => text.green().bold().to_string(),
        ColorTier::Good => text.bright_green().to_string(),
        ColorTier::Fine => text.green().to_string(),
        ColorTier::Low => text.cyan().to_string(),
        ColorTier::Minimal => text.bright_cyan().to_string(),
        ColorTier::Idle => text.white().to_string(),
    }
}

/// One status line for a terminal status bar
pub fn render_status_line(status: &StatusBarState) -> String {
    let text = replace_icons(&status.text);
    if !colors_allowed() {
        return text;
    }
    match status.color {
        StatusColor::Tier(tier) => paint_tier(&text, tier),
        StatusColor::Neutral => text,
        StatusColor::Error => text.red().bold().to_string(),
    }
}

pub fn render_dim(text: &str) -> String {
    if colors_allowed() {
        text.bright_black().to_string()
    } else {
        text.to_string()
    }
}
