//! # Refresh Loop
//!
//! Owns the cache, the notification gate and the repeating timer, and wires
//! credentials, the usage API and the host surface together for each cycle.
//!
//! A cycle: read credentials (absent means skip silently), take the snapshot
//! from cache or fetch it, fetch the limit config (failure degrades to
//! premium-only), aggregate, render, then let the gate decide which
//! notifications to show. Any failure in fetch or aggregation replaces the
//! view with the error view; the loop keeps running.
//!
//! Every cycle runs to completion on the loop thread with `&mut self`, so two
//! cycles can never overlap.

use chrono::{DateTime, Utc};
use std::ops::ControlFlow;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use crate::aggregate::{aggregate, Aggregate};
use crate::cache::StatsCache;
use crate::config::{Settings, MAX_REFRESH_INTERVAL_SECS};
use crate::credentials::{CredentialSource, Credentials};
use crate::display::{error_panel_message, error_status_bar, panel_message, status_bar};
use crate::error::{UsageError, UsageResult};
use crate::host::{HostEvent, HostSurface};
use crate::limit;
use crate::models::ErrorView;
use crate::notify::{NotificationAction, NotificationGate};
use crate::usage_api::UsageApi;

pub const ERROR_MESSAGE: &str = "Error fetching Cursor stats";
pub const FALLBACK_BILLING_URL: &str = "https://www.cursor.com/settings";

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// How a single cycle ended
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// No credentials; nothing rendered
    Skipped,
    Rendered { from_cache: bool, notifications: usize },
    Failed(ErrorView),
}

pub struct RefreshLoop<C, A, H, K = SystemClock> {
    credentials: C,
    api: A,
    host: H,
    clock: K,
    settings: Settings,
    cache: StatsCache,
    gate: NotificationGate,
    focused: bool,
}

impl<C, A, H, K> RefreshLoop<C, A, H, K>
where
    C: CredentialSource,
    A: UsageApi,
    H: HostSurface,
    K: Clock,
{
    pub fn new(credentials: C, api: A, host: H, clock: K, settings: Settings) -> Self {
        let gate = NotificationGate::new(settings.notification_thresholds.clone());
        Self {
            credentials,
            api,
            host,
            clock,
            settings,
            cache: StatsCache::new(),
            gate,
            focused: true,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn clock(&self) -> &K {
        &self.clock
    }

    pub fn gate(&self) -> &NotificationGate {
        &self.gate
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn into_host(self) -> H {
        self.host
    }

    /// Fresh notification state, then the first cycle.
    pub fn activate(&mut self) -> CycleOutcome {
        tracing::debug!(
            interval_secs = self.settings.refresh_interval().as_secs(),
            thresholds = ?self.gate.thresholds(),
            "activating refresh loop"
        );
        self.gate.reset_notifications();
        self.focused = true;
        self.refresh()
    }

    pub fn deactivate(&mut self) {
        tracing::debug!("deactivating refresh loop");
        self.cache.clear();
        self.gate.reset_notifications();
    }

    fn credentials(&self) -> Option<Credentials> {
        match self.credentials.token() {
            Ok(creds) => creds,
            Err(e) => {
                tracing::warn!(error = %e, "could not read Cursor credentials");
                None
            }
        }
    }

    /// One full cycle.
    pub fn refresh(&mut self) -> CycleOutcome {
        let Some(creds) = self.credentials() else {
            tracing::debug!("not logged in, skipping refresh");
            return CycleOutcome::Skipped;
        };
        let now = self.clock.now();

        let (from_cache, result) = self.build(&creds, now);
        let agg = match result {
            Ok(agg) => agg,
            Err(e) => {
                tracing::error!(error = %e, "refresh failed");
                let error = ErrorView {
                    message: ERROR_MESSAGE.to_string(),
                    details: e.to_string(),
                    updated_at: now,
                };
                self.host.set_status(&error_status_bar(&error));
                self.host.post_panel(&error_panel_message(&error));
                return CycleOutcome::Failed(error);
            }
        };

        self.host.set_status(&status_bar(&agg.view, &self.settings));
        self.host.post_panel(&panel_message(&agg.view));

        let notifications = self.gate.evaluate(&agg.notification);
        for notification in &notifications {
            tracing::info!(message = %notification.message, "notification");
            if self.host.notify(notification) == Some(NotificationAction::OpenBillingPage) {
                self.open_billing_page(&creds);
            }
        }

        CycleOutcome::Rendered {
            from_cache,
            notifications: notifications.len(),
        }
    }

    fn build(&mut self, creds: &Credentials, now: DateTime<Utc>) -> (bool, UsageResult<Aggregate>) {
        let now_ms = now.timestamp_millis();
        let cached = self
            .cache
            .get(now_ms, self.settings.refresh_interval_ms())
            .cloned();
        let from_cache = cached.is_some();
        let snapshot = match cached {
            Some(snapshot) => {
                tracing::debug!(age_ms = ?self.cache.age_ms(now_ms), "using cached snapshot");
                snapshot
            }
            None => match self.api.fetch_usage_snapshot(creds) {
                Ok(snapshot) => {
                    self.cache.put(snapshot.clone(), now_ms);
                    snapshot
                }
                Err(e) => return (false, Err(e)),
            },
        };

        let limit_config = match self.api.fetch_usage_limit_config(creds) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(error = %e, "limit config unavailable, showing premium usage only");
                None
            }
        };

        (from_cache, aggregate(&snapshot, limit_config.as_ref(), now))
    }

    fn open_billing_page(&mut self, creds: &Credentials) {
        let url = self.api.billing_portal_url(creds).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "billing portal unavailable, opening settings page");
            FALLBACK_BILLING_URL.to_string()
        });
        self.host.open_external(&url);
    }

    fn limit_flow(&mut self, request: LimitRequest) {
        let Some(creds) = self.credentials() else {
            self.host.show_error(&UsageError::NotLoggedIn.to_string());
            return;
        };
        let result = match request {
            LimitRequest::Set { input, confirmed } => {
                limit::set_limit(&self.api, &creds, &mut self.host, input, confirmed)
            }
            LimitRequest::Toggle { input } => {
                limit::toggle_usage_based(&self.api, &creds, &mut self.host, input)
            }
        };
        match result {
            Ok(outcome) if outcome.changed() => {
                self.cache.clear();
                self.refresh();
            }
            Ok(_) => {}
            Err(UsageError::InvalidLimit(msg)) => self.host.show_error(&msg),
            Err(e) => {
                tracing::error!(error = %e, "limit update failed");
                self.host.show_error(&format!("Failed to set usage limit: {e}"));
            }
        }
    }

    /// Apply one host event. `Break` means shut down.
    pub fn handle(&mut self, event: HostEvent) -> ControlFlow<()> {
        tracing::debug!(?event, "host event");
        match event {
            HostEvent::Refresh => {
                self.refresh();
            }
            HostEvent::Focus(true) => {
                self.focused = true;
                self.refresh();
            }
            HostEvent::Focus(false) => self.focused = false,
            HostEvent::SetLimit { input, confirmed } => {
                self.limit_flow(LimitRequest::Set { input, confirmed })
            }
            HostEvent::ToggleUsageBased { input } => self.limit_flow(LimitRequest::Toggle { input }),
            HostEvent::OpenSettings => self.host.open_settings(),
            HostEvent::OpenBillingPage => match self.credentials() {
                Some(creds) => self.open_billing_page(&creds),
                None => self.host.show_error(&UsageError::NotLoggedIn.to_string()),
            },
            HostEvent::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Activate, then refresh on every tick and handle events until shutdown.
    /// The timer only runs while focused. Once the sender hangs up the timer
    /// keeps running on its own.
    pub fn run(&mut self, events: Receiver<HostEvent>) {
        let interval = self.settings.refresh_interval();
        self.run_with_interval(events, interval, None);
    }

    /// [`run`](Self::run) with an explicit tick interval, stopping after
    /// `max_ticks` timer refreshes when given. Returns the number of ticks.
    pub fn run_with_interval(
        &mut self,
        events: Receiver<HostEvent>,
        interval: Duration,
        max_ticks: Option<usize>,
    ) -> usize {
        let interval = interval.min(Duration::from_secs(MAX_REFRESH_INTERVAL_SECS));
        let mut events = Some(events);
        let mut ticks = 0;

        self.activate();
        let mut next_tick = deadline(interval);

        while max_ticks.is_none_or(|max| ticks < max) {
            let wait = next_tick.saturating_duration_since(Instant::now());
            let wake = match &events {
                Some(rx) if self.focused => match rx.recv_timeout(wait) {
                    Ok(event) => Wake::Event(event),
                    Err(RecvTimeoutError::Timeout) => Wake::Tick,
                    Err(RecvTimeoutError::Disconnected) => Wake::Closed,
                },
                Some(rx) => rx.recv().map_or(Wake::Closed, Wake::Event),
                None => {
                    thread::sleep(wait);
                    Wake::Tick
                }
            };

            match wake {
                Wake::Tick => {
                    self.refresh();
                    ticks += 1;
                    next_tick += interval;
                    if next_tick <= Instant::now() {
                        next_tick = deadline(interval);
                    }
                }
                Wake::Closed => {
                    tracing::debug!("event source closed, refreshing on the timer only");
                    events = None;
                    // Nothing can bring focus back now
                    if !self.focused {
                        self.focused = true;
                        next_tick = deadline(interval);
                    }
                }
                Wake::Event(event) => {
                    let regained_focus = event == HostEvent::Focus(true);
                    if self.handle(event).is_break() {
                        break;
                    }
                    if regained_focus {
                        next_tick = deadline(interval);
                    }
                }
            }
        }

        self.deactivate();
        ticks
    }
}

enum LimitRequest {
    Set { input: Option<String>, confirmed: bool },
    Toggle { input: Option<String> },
}

/// What woke the loop up
enum Wake {
    Event(HostEvent),
    Tick,
    Closed,
}

fn deadline(interval: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(interval).unwrap_or(now)
}
