//! Configuration types and loading for psbrowser.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 5222;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_AUTH_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_LOG_LEVEL: &str = "warn";
pub const DEFAULT_HISTORY_FILE: &str = "~/.psbrowserhistory";
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1_048_576;

/// Optional settings file. Every key falls back to a built-in default.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub port: Option<u16>,
    pub request_timeout_ms: Option<u64>,
    pub auth_timeout_ms: Option<u64>,
    pub log_level: Option<String>,
    pub history_file: Option<String>,
    pub max_frame_bytes: Option<usize>,
}

/// Resolved runtime parameters for one shell session.
#[derive(Clone, Debug)]
pub struct ResolvedParams {
    pub jid: String,
    pub password: String,
    pub service: String,
    pub address: String,
    pub port: u16,
    pub request_timeout: Duration,
    pub auth_timeout: Duration,
    pub log_level: String,
    pub history_file: PathBuf,
    pub max_frame_bytes: usize,
}

/// CLI options that can override config file settings.
///
/// Keeps the resolver independent of clap types.
pub trait CliOptions {
    fn jid(&self) -> String;
    fn password(&self) -> String;
    fn service(&self) -> String;
    fn address(&self) -> String;
    fn timeout_ms(&self) -> Option<u64>;
    fn log_level(&self) -> Option<String>;
}

pub fn expand_path(raw: impl AsRef<str>) -> PathBuf {
    let s = raw.as_ref();
    if let Some(stripped) = s.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(stripped);
    }
    PathBuf::from(s)
}

/// `~/.config/psbrowser/config.toml`, when a config dir can be found.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("psbrowser").join("config.toml"))
}

/// Load `path`, choosing the format by extension. A missing file is no config.
pub fn load_config(path: &Path) -> Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let cfg: Config = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&data)
            .with_context(|| format!("failed to parse yaml config {}", path.display()))?,
        "json" => serde_json::from_str(&data)
            .with_context(|| format!("failed to parse json config {}", path.display()))?,
        _ => toml::from_str(&data)
            .with_context(|| format!("failed to parse toml config {}", path.display()))?,
    };
    Ok(Some(cfg))
}

/// Resolve runtime parameters from CLI options and config file.
///
/// CLI options take precedence over config file settings.
pub fn resolve_params<C: CliOptions>(cli: &C, config: Option<&Config>) -> Result<ResolvedParams> {
    let cfg = config.cloned().unwrap_or_default();

    let jid = cli.jid();
    if jid.trim().is_empty() {
        return Err(anyhow!("jid must not be empty"));
    }
    let service = cli.service();
    if service.trim().is_empty() {
        return Err(anyhow!("service must not be empty"));
    }
    let address = cli.address();
    if address.trim().is_empty() {
        return Err(anyhow!("address must not be empty"));
    }

    let request_timeout_ms = cli
        .timeout_ms()
        .or(cfg.request_timeout_ms)
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);
    if request_timeout_ms == 0 {
        return Err(anyhow!("request timeout must be greater than zero"));
    }
    let auth_timeout_ms = cfg.auth_timeout_ms.unwrap_or(DEFAULT_AUTH_TIMEOUT_MS);

    let log_level = cli
        .log_level()
        .or(cfg.log_level)
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

    let history_file = expand_path(cfg.history_file.as_deref().unwrap_or(DEFAULT_HISTORY_FILE));

    Ok(ResolvedParams {
        jid,
        password: cli.password(),
        service,
        address,
        port: cfg.port.unwrap_or(DEFAULT_PORT),
        request_timeout: Duration::from_millis(request_timeout_ms),
        auth_timeout: Duration::from_millis(auth_timeout_ms),
        log_level,
        history_file,
        max_frame_bytes: cfg.max_frame_bytes.unwrap_or(DEFAULT_MAX_FRAME_BYTES),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[derive(Default)]
    struct Cli {
        timeout_ms: Option<u64>,
        log_level: Option<String>,
    }

    impl CliOptions for Cli {
        fn jid(&self) -> String {
            "alice@example.org".into()
        }
        fn password(&self) -> String {
            "secret".into()
        }
        fn service(&self) -> String {
            "pubsub.example.org".into()
        }
        fn address(&self) -> String {
            "127.0.0.1".into()
        }
        fn timeout_ms(&self) -> Option<u64> {
            self.timeout_ms
        }
        fn log_level(&self) -> Option<String> {
            self.log_level.clone()
        }
    }

    fn write_config(suffix: &str, body: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .expect("tempfile");
        file.write_all(body.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn defaults_without_config() {
        let params = resolve_params(&Cli::default(), None).expect("resolve");
        assert_eq!(params.port, 5222);
        assert_eq!(params.request_timeout, Duration::from_secs(30));
        assert_eq!(params.auth_timeout, Duration::from_secs(10));
        assert_eq!(params.log_level, "warn");
        assert_eq!(params.max_frame_bytes, 1_048_576);
        assert!(params.history_file.ends_with(".psbrowserhistory"));
    }

    #[test]
    fn cli_overrides_config_file() {
        let file = write_config(
            ".toml",
            "port = 6222\nrequest_timeout_ms = 5000\nlog_level = \"debug\"\n",
        );
        let cfg = load_config(file.path()).expect("load").expect("present");

        let cli = Cli {
            timeout_ms: Some(1500),
            log_level: None,
        };
        let params = resolve_params(&cli, Some(&cfg)).expect("resolve");
        assert_eq!(params.port, 6222);
        assert_eq!(params.request_timeout, Duration::from_millis(1500));
        assert_eq!(params.log_level, "debug");

        let cli = Cli {
            timeout_ms: None,
            log_level: Some("trace".into()),
        };
        let params = resolve_params(&cli, Some(&cfg)).expect("resolve");
        assert_eq!(params.request_timeout, Duration::from_millis(5000));
        assert_eq!(params.log_level, "trace");
    }

    #[test]
    fn loads_yaml_and_json_by_extension() {
        let yaml = write_config(".yaml", "auth_timeout_ms: 2500\nmax_frame_bytes: 4096\n");
        let cfg = load_config(yaml.path()).expect("load").expect("present");
        assert_eq!(cfg.auth_timeout_ms, Some(2500));
        assert_eq!(cfg.max_frame_bytes, Some(4096));

        let json = write_config(".json", r#"{"history_file": "/tmp/psb-history"}"#);
        let cfg = load_config(json.path()).expect("load").expect("present");
        let params = resolve_params(&Cli::default(), Some(&cfg)).expect("resolve");
        assert_eq!(params.history_file, PathBuf::from("/tmp/psb-history"));
    }

    #[test]
    fn missing_file_is_no_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&dir.path().join("absent.toml")).expect("load");
        assert!(cfg.is_none());
    }

    #[test]
    fn malformed_file_reports_path() {
        let file = write_config(".toml", "port = \"not a number\"\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("failed to parse toml config"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let cli = Cli {
            timeout_ms: Some(0),
            log_level: None,
        };
        assert!(resolve_params(&cli, None).is_err());
    }

    #[test]
    fn expand_path_handles_home_prefix() {
        let expanded = expand_path("~/notes/history");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expanded, home.join("notes/history"));
        }
        assert_eq!(expand_path("/abs/path"), PathBuf::from("/abs/path"));
    }
}
