use clap::builder::BoolishValueParser;
use std::path::PathBuf;

#[derive(clap::Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run one refresh cycle and print the status line (default)
    Status {
        /// Also print the markdown tooltip
        #[arg(long)]
        tooltip: bool,
    },
    /// Keep refreshing; reads host events (refresh, focus, blur, set-limit N [yes], ...) from stdin
    Watch,
    /// Set the monthly usage-based spending limit in dollars
    SetLimit {
        /// Limit in dollars, e.g. 50
        dollars: String,
        /// Enable usage-based pricing without asking when it is disabled
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Enable or disable usage-based pricing
    Toggle {
        /// Limit to set when enabling
        #[arg(long)]
        limit: Option<String>,
    },
    /// Print the billing portal URL
    BillingUrl,
}

#[derive(clap::Parser, Debug)]
#[command(name = "cursor-usage", version, about = "Cursor usage statistics for your status line")]
pub struct Args {
    /// Settings file (JSON). Defaults to <config dir>/cursor-usage/settings.json
    #[arg(long, env = "CURSOR_USAGE_SETTINGS_FILE")]
    pub settings: Option<PathBuf>,

    /// Emit JSON instead of colored text
    #[arg(long, global = true)]
    pub json: bool,

    /// Seconds between refreshes (minimum 5)
    #[arg(long, env = "CURSOR_USAGE_REFRESH_INTERVAL")]
    pub refresh_interval: Option<u64>,

    /// Show total request count instead of premium count and cost
    #[arg(long, env = "CURSOR_USAGE_SHOW_TOTAL_REQUESTS", value_parser = BoolishValueParser::new())]
    pub show_total_requests: Option<bool>,

    /// Color the status line by usage tier
    #[arg(long, env = "CURSOR_USAGE_COLORS", value_parser = BoolishValueParser::new())]
    pub colors: Option<bool>,

    /// Force the neutral color
    #[arg(long, global = true)]
    pub no_colors: bool,

    /// Debug logging on stderr
    #[arg(long, env = "CURSOR_USAGE_DEBUG", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Args {
    pub fn parse() -> Self {
        <Args as clap::Parser>::parse()
    }

    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Status { tooltip: false })
    }
}
