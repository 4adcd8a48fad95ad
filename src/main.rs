use anyhow::{Context, Result};
use std::io::{self, BufRead};
use std::sync::mpsc;
use std::thread;

use cursor_usage::cli::{Args, Command};
use cursor_usage::config::Settings;
use cursor_usage::credentials::{CredentialSource, Credentials, StateDbCredentials};
use cursor_usage::error::UsageError;
use cursor_usage::host::{HostEvent, HostSurface, TerminalHost};
use cursor_usage::limit;
use cursor_usage::refresh::{CycleOutcome, RefreshLoop, SystemClock};
use cursor_usage::usage_api::{CursorApi, UsageApi};
use cursor_usage::utils::settings_path;

fn main() -> Result<()> {
    let args = Args::parse();
    cursor_usage::logging::init(args.debug);

    let path = args.settings.clone().or_else(settings_path);
    let settings = Settings::load(path.as_deref())
        .with_context(|| format!("load settings from {:?}", path))?
        .apply_args(&args);
    tracing::debug!(?settings, "effective settings");

    let api = CursorApi::from_env();
    let credentials = StateDbCredentials::from_env();
    let host = TerminalHost::new(io::stdout(), args.json).with_settings_path(path);

    match args.command() {
        Command::Status { tooltip } => {
            let host = host.with_tooltip(tooltip);
            let mut refresh = RefreshLoop::new(credentials, api, host, SystemClock, settings);
            if refresh.activate() == CycleOutcome::Skipped {
                return Err(UsageError::NotLoggedIn.into());
            }
        }
        Command::Watch => {
            let (tx, rx) = mpsc::channel();
            thread::spawn(move || {
                for line in io::stdin().lock().lines() {
                    let Ok(line) = line else { break };
                    match HostEvent::parse_line(&line) {
                        Some(event) => {
                            if tx.send(event).is_err() {
                                break;
                            }
                        }
                        None if !line.trim().is_empty() => {
                            tracing::warn!(line = %line, "ignoring unknown event");
                        }
                        None => {}
                    }
                }
            });
            let mut refresh = RefreshLoop::new(credentials, api, host, SystemClock, settings);
            refresh.run(rx);
        }
        Command::SetLimit { dollars, yes } => {
            let creds = require_credentials(&credentials)?;
            let mut host = host;
            limit::set_limit(&api, &creds, &mut host, Some(dollars), yes)
                .context("Failed to set usage limit")?;
        }
        Command::Toggle { limit: input } => {
            let creds = require_credentials(&credentials)?;
            let mut host = host.with_limit_input(input);
            limit::toggle_usage_based(&api, &creds, &mut host, None)
                .context("Failed to toggle usage-based pricing")?;
        }
        Command::BillingUrl => {
            let creds = require_credentials(&credentials)?;
            let url = api
                .billing_portal_url(&creds)
                .context("fetch billing portal url")?;
            let mut host = host;
            host.open_external(&url);
        }
    }
    Ok(())
}

fn require_credentials(source: &impl CredentialSource) -> Result<Credentials> {
    source
        .token()
        .context("read Cursor credentials")?
        .ok_or_else(|| UsageError::NotLoggedIn.into())
}
