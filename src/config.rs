//! Settings: defaults, then the JSON settings file, then CLI flags and their
//! environment fallbacks.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::cli::Args;
use crate::error::UsageResult;
use crate::notify::DEFAULT_THRESHOLDS;

pub const MIN_REFRESH_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 30;
/// One day
pub const MAX_REFRESH_INTERVAL_SECS: u64 = 86_400;

/// Settings files may nest ours under one of these keys
const SECTIONS: [&str; 3] = ["cursorUsage", "cursor_usage", "cursor-usage"];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Seconds between refreshes
    pub refresh_interval: u64,
    pub show_total_requests: bool,
    pub enable_status_bar_colors: bool,
    pub notification_thresholds: Vec<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL_SECS,
            show_total_requests: false,
            enable_status_bar_colors: true,
            notification_thresholds: DEFAULT_THRESHOLDS.to_vec(),
        }
    }
}

impl Settings {
    /// Refresh interval clamped to 5 seconds .. one day
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(
            self.refresh_interval
                .clamp(MIN_REFRESH_INTERVAL_SECS, MAX_REFRESH_INTERVAL_SECS),
        )
    }

    pub fn refresh_interval_ms(&self) -> i64 {
        i64::try_from(self.refresh_interval().as_millis()).unwrap_or(i64::MAX)
    }

    /// Parse a settings document; keys may sit at the root or in a section.
    pub fn from_json(content: &str) -> UsageResult<Self> {
        let v: serde_json::Value = serde_json::from_str(content)?;
        let section = SECTIONS
            .iter()
            .find_map(|key| v.get(*key).filter(|s| s.is_object()))
            .cloned()
            .unwrap_or(v);
        Ok(serde_json::from_value(section)?)
    }

    /// Read `path`; a missing file yields defaults.
    pub fn load(path: Option<&Path>) -> UsageResult<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&content)?;
        tracing::debug!(path = %path.display(), ?settings, "loaded settings");
        Ok(settings)
    }

    /// CLI flags (and their env fallbacks) win over the file
    pub fn apply_args(mut self, args: &Args) -> Self {
        if let Some(secs) = args.refresh_interval {
            self.refresh_interval = secs;
        }
        if let Some(show) = args.show_total_requests {
            self.show_total_requests = show;
        }
        if let Some(colors) = args.colors {
            self.enable_status_bar_colors = colors;
        }
        if args.no_colors {
            self.enable_status_bar_colors = false;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.refresh_interval(), Duration::from_secs(30));
        assert!(!s.show_total_requests);
        assert!(s.enable_status_bar_colors);
        assert_eq!(s.notification_thresholds, vec![50, 75, 90, 100]);
    }

    #[test]
    fn interval_has_a_floor() {
        let s = Settings {
            refresh_interval: 1,
            ..Settings::default()
        };
        assert_eq!(s.refresh_interval(), Duration::from_secs(5));
        assert_eq!(s.refresh_interval_ms(), 5_000);
    }

    #[test]
    fn root_and_section_keys() {
        let root = Settings::from_json(r#"{"refreshInterval": 60, "showTotalRequests": true}"#)
            .unwrap();
        assert_eq!(root.refresh_interval, 60);
        assert!(root.show_total_requests);
        assert!(root.enable_status_bar_colors);

        let nested = Settings::from_json(
            r#"{"editor": {}, "cursorUsage": {"enableStatusBarColors": false, "notificationThresholds": [80]}}"#,
        )
        .unwrap();
        assert!(!nested.enable_status_bar_colors);
        assert_eq!(nested.notification_thresholds, vec![80]);
        assert_eq!(nested.refresh_interval, 30);
    }

    #[test]
    fn load_from_file_and_missing_file() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, r#"{{"refreshInterval": 12}}"#).unwrap();
        let s = Settings::load(Some(f.path())).unwrap();
        assert_eq!(s.refresh_interval, 12);

        let missing = Settings::load(Some(Path::new("/nonexistent/settings.json"))).unwrap();
        assert_eq!(missing, Settings::default());
    }

    #[test]
    fn huge_interval_is_capped() {
        let s = Settings {
            refresh_interval: u64::MAX,
            ..Settings::default()
        };
        assert_eq!(s.refresh_interval(), Duration::from_secs(MAX_REFRESH_INTERVAL_SECS));
        assert_eq!(s.refresh_interval_ms(), 86_400_000);
    }

    #[test]
    fn unreadable_file_is_an_io_error() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(&[0xff, 0xfe, 0xfd]).unwrap();
        let err = Settings::load(Some(f.path())).unwrap_err();
        assert!(matches!(err, crate::error::UsageError::Io(_)), "got {err:?}");
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(Settings::from_json("{not json").is_err());
    }
}
