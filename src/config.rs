use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::TimeDelta;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::duration::{deserialize_duration, serialize_duration};
use crate::models::{PmConfigEntry, TableName};

/// Default fallback lookback (2 hours).
fn default_fallback_lookback() -> TimeDelta {
    TimeDelta::hours(2)
}

/// NAV computation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    /// How far back the fallback resolver may look for a missing PM balance.
    #[serde(
        default = "default_fallback_lookback",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub fallback_lookback: TimeDelta,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            fallback_lookback: default_fallback_lookback(),
        }
    }
}

fn default_results_table() -> TableName {
    TableName::known("nav_table")
}

/// Where results are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Replaced in full on every run.
    #[serde(default = "default_results_table")]
    pub results_table: TableName,

    /// When set, each run's validation report is written here as well.
    pub audit_table: Option<TableName>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_table: default_results_table(),
            audit_table: None,
        }
    }
}

fn codes(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Static code lists that shape the published NAV rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Funds that are also published as `<fund>-gross`.
    pub gross_funds: Vec<String>,

    /// Placeholder or decommissioned codes, never published.
    pub suppressed: Vec<String>,

    /// Fund-of-funds and cash-sweep codes, published only on the hour.
    pub hourly_only: Vec<String>,

    /// Computation intermediates that are not reportable entities.
    pub intermediate: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            gross_funds: codes(&["sp1", "sp2", "sp2-classb", "sp3", "sp2-classa"]),
            suppressed: codes(&["sp1-sma-robinfunding"]),
            hourly_only: codes(&[
                "sp1-fof-tangoecho",
                "sp1-fof-hermeneutic",
                "sp1-fof",
                "sp1-cash-cash",
                "sp1-cash",
                "sp1-fof-northrock",
                "sp1-fof-defiance",
                "sp2-cash-cash",
                "sp2-cash",
                "sp3-cash-cash",
                "sp3-cash",
                "sp2-classb-cash-cash",
                "sp2-classb-cash",
            ]),
            intermediate: codes(&["sp2", "sp2-gross", "sp2-sma", "sp2-sma-romeo"]),
        }
    }
}

fn default_telegram_base_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_bot_token_env() -> String {
    "FUNDNAV_TELEGRAM_BOT_TOKEN".to_string()
}

/// Alert channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    #[serde(default = "default_telegram_base_url")]
    pub telegram_base_url: String,

    /// Environment variable holding the bot token. Alerts are only logged when
    /// it is unset.
    #[serde(default = "default_bot_token_env")]
    pub bot_token_env: String,

    /// Chat receiving data pipeline warnings (fallback use, missing PMs).
    pub pipeline_chat_id: Option<String>,

    /// Chat receiving routine notices.
    pub routine_chat_id: Option<String>,

    /// Post to the routine chat when a run fails.
    pub notify_run_failure: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            telegram_base_url: default_telegram_base_url(),
            bot_token_env: default_bot_token_env(),
            pipeline_chat_id: None,
            routine_chat_id: None,
            notify_run_failure: false,
        }
    }
}

impl AlertConfig {
    pub fn bot_token(&self) -> Option<SecretString> {
        std::env::var(&self.bot_token_env)
            .ok()
            .filter(|token| !token.trim().is_empty())
            .map(SecretString::from)
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to data directory. If relative, resolved from config file location.
    /// If not specified, defaults to the config file's directory.
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub nav: NavConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub filters: FilterConfig,

    #[serde(default)]
    pub alerts: AlertConfig,

    /// Static PM topology.
    #[serde(default)]
    pub pms: Vec<PmConfigEntry>,
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve the data directory path.
    ///
    /// If `data_dir` is set and relative, it's resolved relative to `config_dir`.
    /// If `data_dir` is not set, returns `config_dir`.
    pub fn resolve_data_dir(&self, config_dir: &Path) -> PathBuf {
        match &self.data_dir {
            Some(data_dir) if data_dir.is_absolute() => data_dir.clone(),
            Some(data_dir) => config_dir.join(data_dir),
            None => config_dir.to_path_buf(),
        }
    }

    fn into_resolved(self, config_dir: &Path) -> ResolvedConfig {
        ResolvedConfig {
            data_dir: self.resolve_data_dir(config_dir),
            nav: self.nav,
            output: self.output,
            filters: self.filters,
            alerts: self.alerts,
            pms: self.pms,
        }
    }
}

/// Loaded configuration with resolved paths.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub data_dir: PathBuf,
    pub nav: NavConfig,
    pub output: OutputConfig,
    pub filters: FilterConfig,
    pub alerts: AlertConfig,
    pub pms: Vec<PmConfigEntry>,
}

impl ResolvedConfig {
    /// Load and resolve config from a file path.
    ///
    /// The data directory is resolved relative to the config file's parent directory.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        Ok(Config::load(&config_path)?.into_resolved(config_dir))
    }

    /// Load config, falling back to defaults if the file doesn't exist.
    ///
    /// Without a file the data directory is the config file's intended parent.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::load(config_path);
        }

        let config_path = if config_path.is_relative() {
            std::env::current_dir()
                .context("Failed to get current directory")?
                .join(config_path)
        } else {
            config_path.to_path_buf()
        };
        let config_dir = config_path
            .parent()
            .context("Config path has no parent directory")?;

        Ok(Config::default().into_resolved(config_dir))
    }
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./fundnav.toml` if it exists in current directory
/// 2. `~/.local/share/fundnav/fundnav.toml` (XDG data directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("fundnav.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("fundnav").join("fundnav.toml");
    }

    local_config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_default_data_dir_is_config_dir() {
        let config = Config::default();
        let config_dir = Path::new("/srv/nav");
        assert_eq!(config.resolve_data_dir(config_dir), PathBuf::from("/srv/nav"));
    }

    #[test]
    fn test_relative_and_absolute_data_dir() {
        let relative = Config {
            data_dir: Some(PathBuf::from("data")),
            ..Default::default()
        };
        let absolute = Config {
            data_dir: Some(PathBuf::from("/var/fundnav")),
            ..Default::default()
        };
        let config_dir = Path::new("/srv/nav");
        assert_eq!(relative.resolve_data_dir(config_dir), PathBuf::from("/srv/nav/data"));
        assert_eq!(absolute.resolve_data_dir(config_dir), PathBuf::from("/var/fundnav"));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.nav.fallback_lookback, TimeDelta::hours(2));
        assert_eq!(config.output.results_table.as_str(), "nav_table");
        assert!(config.output.audit_table.is_none());
        assert_eq!(config.filters.gross_funds.len(), 5);
        assert_eq!(config.filters.suppressed, vec!["sp1-sma-robinfunding"]);
        assert_eq!(config.filters.hourly_only.len(), 13);
        assert!(!config.alerts.notify_run_failure);
        assert!(config.pms.is_empty());
    }

    #[test]
    fn test_load_empty_config() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("fundnav.toml");
        std::fs::File::create(&config_path)?;

        let config = Config::load(&config_path)?;
        assert_eq!(config.data_dir, None);
        assert_eq!(config.filters, FilterConfig::default());

        Ok(())
    }

    #[test]
    fn test_load_full_config() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("fundnav.toml");

        let mut file = std::fs::File::create(&config_path)?;
        writeln!(file, "data_dir = \"./data\"")?;
        writeln!(file, "[nav]")?;
        writeln!(file, "fallback_lookback = \"90m\"")?;
        writeln!(file, "[output]")?;
        writeln!(file, "results_table = \"nav_minutely\"")?;
        writeln!(file, "audit_table = \"nav_validation_log\"")?;
        writeln!(file, "[filters]")?;
        writeln!(file, "suppressed = [\"legacy\"]")?;
        writeln!(file, "[alerts]")?;
        writeln!(file, "pipeline_chat_id = \"-100\"")?;
        writeln!(file, "[[pms]]")?;
        writeln!(file, "pm = \"a\"")?;
        writeln!(file, "group = \"g1\"")?;
        writeln!(file, "fund = \"f1\"")?;
        writeln!(file, "[[pms]]")?;
        writeln!(file, "pm = \"b\"")?;
        writeln!(file, "group = \"g1\"")?;
        writeln!(file, "fund = \"f1\"")?;
        writeln!(file, "active = false")?;

        let resolved = ResolvedConfig::load(&config_path)?;
        assert_eq!(resolved.data_dir, dir.path().canonicalize()?.join("data"));
        assert_eq!(resolved.nav.fallback_lookback, TimeDelta::minutes(90));
        assert_eq!(resolved.output.results_table.as_str(), "nav_minutely");
        assert_eq!(
            resolved.output.audit_table.as_ref().map(|t| t.as_str()),
            Some("nav_validation_log")
        );
        assert_eq!(resolved.filters.suppressed, vec!["legacy"]);
        // Unspecified lists keep their defaults.
        assert_eq!(resolved.filters.gross_funds.len(), 5);
        assert_eq!(resolved.alerts.pipeline_chat_id.as_deref(), Some("-100"));
        assert_eq!(resolved.pms.len(), 2);
        assert!(resolved.pms[0].active);
        assert!(!resolved.pms[1].active);

        Ok(())
    }

    #[test]
    fn test_rejects_unsafe_table_name() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("fundnav.toml");

        let mut file = std::fs::File::create(&config_path)?;
        writeln!(file, "[output]")?;
        writeln!(file, "results_table = \"../nav\"")?;

        assert!(Config::load(&config_path).is_err());
        Ok(())
    }

    #[test]
    fn test_resolved_config_load_or_default_missing_file() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("fundnav.toml");

        let resolved = ResolvedConfig::load_or_default(&config_path)?;
        assert_eq!(resolved.data_dir, dir.path());
        assert_eq!(resolved.output.results_table.as_str(), "nav_table");

        Ok(())
    }

    #[test]
    fn test_bot_token_from_env() {
        let alerts = AlertConfig {
            bot_token_env: "FUNDNAV_TEST_TOKEN_UNSET_VAR".to_string(),
            ..Default::default()
        };
        assert!(alerts.bot_token().is_none());
    }
}
