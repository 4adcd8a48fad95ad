use std::env;
use std::path::PathBuf;

/// Cursor keeps its global state here on every platform, relative to the
/// OS config dir (`~/.config`, `~/Library/Application Support`, `%APPDATA%`).
const CURSOR_STATE_DB: [&str; 4] = ["Cursor", "User", "globalStorage", "state.vscdb"];

pub const SETTINGS_DIR: &str = "cursor-usage";
pub const SETTINGS_FILE: &str = "settings.json";

/// Path to Cursor's `state.vscdb`, honoring `CURSOR_STATE_DB`
pub fn cursor_state_db_path() -> Option<PathBuf> {
    if let Some(p) = env_string("CURSOR_STATE_DB") {
        return Some(PathBuf::from(p));
    }
    let base = directories::BaseDirs::new()?;
    Some(
        CURSOR_STATE_DB
            .iter()
            .fold(base.config_dir().to_path_buf(), |acc, part| acc.join(part)),
    )
}

/// Path to our settings file, honoring `CURSOR_USAGE_SETTINGS_FILE`
pub fn settings_path() -> Option<PathBuf> {
    if let Some(p) = env_string("CURSOR_USAGE_SETTINGS_FILE") {
        return Some(PathBuf::from(p));
    }
    directories::BaseDirs::new().map(|b| b.config_dir().join(SETTINGS_DIR).join(SETTINGS_FILE))
}

/// Trimmed, non-empty environment value
pub fn env_string(var: &str) -> Option<String> {
    env::var(var).ok().and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn state_db_path_override() {
        // SAFETY: Test runs serially, no concurrent env access
        unsafe { env::set_var("CURSOR_STATE_DB", "/tmp/state.vscdb") };
        assert_eq!(
            cursor_state_db_path(),
            Some(PathBuf::from("/tmp/state.vscdb"))
        );
        unsafe { env::remove_var("CURSOR_STATE_DB") };

        if let Some(p) = cursor_state_db_path() {
            assert!(p.ends_with("Cursor/User/globalStorage/state.vscdb"));
        }
    }

    #[test]
    #[serial]
    fn blank_env_is_absent() {
        unsafe { env::set_var("CURSOR_USAGE_SETTINGS_FILE", "   ") };
        assert_eq!(env_string("CURSOR_USAGE_SETTINGS_FILE"), None);
        unsafe { env::remove_var("CURSOR_USAGE_SETTINGS_FILE") };
    }
}
