//! Master configuration, read once at startup from the environment per
//! `SPEC_FULL.md` §6.

use std::path::PathBuf;

use crate::prefix_list::PrefixList;

const DEFAULT_WORKER_TIMEOUT_MS: i64 = 10_000;
const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 1_000;
const DEFAULT_MAX_COLUMNS: u32 = 1024;

/// All tunables the master reads once at startup. Builder-style setters
/// mirror `oxcrypt-fuse/src/config.rs`'s `MountConfig`.
#[derive(Debug, Clone)]
pub struct MasterConfig {
    pub tachyon_home: PathBuf,
    pub whitelist: PrefixList,
    pub pinlist: PrefixList,
    pub log_file: PathBuf,
    pub checkpoint_file: PathBuf,
    pub worker_timeout_ms: i64,
    pub heartbeat_interval_ms: u64,
    pub max_columns: u32,
    pub proactive_recovery: bool,
}

impl Default for MasterConfig {
    fn default() -> Self {
        let tachyon_home = PathBuf::from("/tmp/tachyon");
        Self {
            log_file: tachyon_home.join("journal.log"),
            checkpoint_file: tachyon_home.join("journal.checkpoint"),
            tachyon_home,
            whitelist: PrefixList::default(),
            pinlist: PrefixList::default(),
            worker_timeout_ms: DEFAULT_WORKER_TIMEOUT_MS,
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            max_columns: DEFAULT_MAX_COLUMNS,
            proactive_recovery: false,
        }
    }
}

impl MasterConfig {
    /// Reads every `SPEC_FULL.md` §6 environment variable, falling back to
    /// [`MasterConfig::default`] for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(home) = std::env::var("TACHYON_HOME") {
            config.tachyon_home = PathBuf::from(home);
        }
        config.log_file = env_path("MASTER_LOG_FILE").unwrap_or_else(|| config.tachyon_home.join("journal.log"));
        config.checkpoint_file = env_path("MASTER_CHECKPOINT_FILE")
            .unwrap_or_else(|| config.tachyon_home.join("journal.checkpoint"));

        if let Ok(raw) = std::env::var("WHITELIST") {
            config.whitelist = PrefixList::parse(&raw);
        }
        if let Ok(raw) = std::env::var("PINLIST") {
            config.pinlist = PrefixList::parse(&raw);
        }
        if let Some(v) = env_parsed("WORKER_TIMEOUT_MS") {
            config.worker_timeout_ms = v;
        }
        if let Some(v) = env_parsed("MASTER_HEARTBEAT_INTERVAL_MS") {
            config.heartbeat_interval_ms = v;
        }
        if let Some(v) = env_parsed("MAX_COLUMNS") {
            config.max_columns = v;
        }
        if let Ok(raw) = std::env::var("MASTER_PROACTIVE_RECOVERY") {
            config.proactive_recovery = raw.eq_ignore_ascii_case("true") || raw == "1";
        }

        config
    }

    #[must_use]
    pub fn tachyon_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.tachyon_home = home.into();
        self
    }

    #[must_use]
    pub fn whitelist(mut self, list: PrefixList) -> Self {
        self.whitelist = list;
        self
    }

    #[must_use]
    pub fn pinlist(mut self, list: PrefixList) -> Self {
        self.pinlist = list;
        self
    }

    #[must_use]
    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = path.into();
        self
    }

    #[must_use]
    pub fn checkpoint_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint_file = path.into();
        self
    }

    #[must_use]
    pub fn worker_timeout_ms(mut self, ms: i64) -> Self {
        self.worker_timeout_ms = ms;
        self
    }

    #[must_use]
    pub fn heartbeat_interval_ms(mut self, ms: u64) -> Self {
        self.heartbeat_interval_ms = ms;
        self
    }

    #[must_use]
    pub fn max_columns(mut self, columns: u32) -> Self {
        self.max_columns = columns;
        self
    }

    #[must_use]
    pub fn proactive_recovery(mut self, enabled: bool) -> Self {
        self.proactive_recovery = enabled;
        self
    }

    pub fn restart_hook_path(&self) -> PathBuf {
        self.tachyon_home.join("bin").join("restart-failed-workers.sh")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.tachyon_home.join("logs")
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key).ok().map(PathBuf::from)
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_fallbacks() {
        let config = MasterConfig::default();
        assert!(config.worker_timeout_ms > 0);
        assert!(config.max_columns > 0);
        assert!(!config.proactive_recovery);
    }

    #[test]
    fn builder_methods_override_fields() {
        let config = MasterConfig::default().max_columns(16).proactive_recovery(true);
        assert_eq!(config.max_columns, 16);
        assert!(config.proactive_recovery);
    }

    #[test]
    fn restart_hook_path_is_under_tachyon_home() {
        let config = MasterConfig::default().tachyon_home("/srv/tachyon");
        assert_eq!(
            config.restart_hook_path(),
            PathBuf::from("/srv/tachyon/bin/restart-failed-workers.sh")
        );
    }
}
