use anyhow::Result;
use clap::Parser;
use lib_livehub::EventName;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[clap(about = "Streams live hub events to stdout as JSON lines", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "LIVE_TARGET", help = "Live session id to subscribe to.")]
    pub target: Option<String>,

    #[clap(long, env = "LIVE_TOKEN", help = "Hub access token.")]
    pub token: Option<String>,

    #[clap(long, env = "LIVE_PAGE_URL", help = "Page URL whose 'token' query parameter is used when no token is given.")]
    pub page_url: Option<String>,

    #[clap(long, env = "LIVE_HUB_URL", help = "Override the hub websocket URL.")]
    pub hub_url: Option<String>,

    #[clap(long, env = "LIVE_EVENTS", help = "Comma-separated event names to print, or 'all'.")]
    pub events: Option<String>,

    #[clap(long, env = "LIVE_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "LIVE_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "LIVE_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,
}

impl Config {
    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            target: other.target.or(self.target),
            token: other.token.or(self.token),
            page_url: other.page_url.or(self.page_url),
            hub_url: other.hub_url.or(self.hub_url),
            events: other.events.or(self.events),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            config_path: other.config_path.or(self.config_path),
        }
    }
}

fn defaults() -> Config {
    Config {
        events: Some("all".to_string()),
        log_dir: Some(PathBuf::from("./logs")),
        log_level: Some("info".to_string()),
        ..Default::default()
    }
}

/// A message produced while loading the config, logged once logging is up.
pub type Diagnostic = (log::Level, String);

pub fn load_config() -> (Config, Vec<Diagnostic>) {
    resolve_config(Config::parse())
}

/// Defaults, then the JSON config file, then env/CLI (already folded into `cli` by clap).
pub fn resolve_config(cli: Config) -> (Config, Vec<Diagnostic>) {
    let config_file_path = cli
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("live_tap.conf"));

    let mut diagnostics = Vec::new();
    let mut current_config = defaults();
    match read_config_file(&config_file_path) {
        Ok(file_config) => current_config = current_config.merge(file_config),
        Err(diagnostic) => diagnostics.push(diagnostic),
    }
    (current_config.merge(cli), diagnostics)
}

fn read_config_file(path: &Path) -> Result<Config, Diagnostic> {
    if !path.exists() {
        return Err((
            log::Level::Info,
            format!("Config file not found at {}. Using defaults and environment/CLI variables.", path.display()),
        ));
    }
    let config_str = fs::read_to_string(path).map_err(|e| {
        (
            log::Level::Warn,
            format!("Failed to read config file {}: {}. Falling back to other sources.", path.display(), e),
        )
    })?;
    serde_json::from_str::<Config>(&config_str).map_err(|e| {
        (
            log::Level::Warn,
            format!("Failed to parse config file {}: {}. Falling back to other sources.", path.display(), e),
        )
    })
}

/// Parses the `events` option. `None`, empty or `all` selects every event.
pub fn parse_events(list: Option<&str>) -> Result<Vec<EventName>> {
    let list = list.map(str::trim).unwrap_or("all");
    if list.is_empty() || list.eq_ignore_ascii_case("all") {
        return Ok(EventName::ALL.to_vec());
    }

    let mut events = Vec::new();
    for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let event: EventName = name.parse()?;
        if !events.contains(&event) {
            events.push(event);
        }
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_values_override_defaults_and_cli_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"target":"from_file","logLevel":"debug","hubUrl":"ws://file/hub"}}"#).unwrap();

        let cli = Config {
            target: Some("from_cli".to_string()),
            config_path: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let (config, diagnostics) = resolve_config(cli);

        assert!(diagnostics.is_empty());
        assert_eq!(config.target.as_deref(), Some("from_cli"));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.hub_url.as_deref(), Some("ws://file/hub"));
        assert_eq!(config.log_dir, Some(PathBuf::from("./logs")));
    }

    #[test]
    fn test_unparsable_file_is_ignored() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let cli = Config { config_path: Some(file.path().to_path_buf()), ..Default::default() };
        let (config, diagnostics) = resolve_config(cli);
        assert_eq!(config.log_level.as_deref(), Some("info"));
        assert_eq!(config.target, None);

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].0, log::Level::Warn);
        assert!(diagnostics[0].1.starts_with("Failed to parse config file"));
    }

    #[test]
    fn test_missing_file_is_reported_for_later_logging() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Config { config_path: Some(dir.path().join("absent.conf")), ..Default::default() };

        let (config, diagnostics) = resolve_config(cli);
        assert_eq!(config.log_dir, Some(PathBuf::from("./logs")));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].0, log::Level::Info);
        assert!(diagnostics[0].1.contains("absent.conf"));
    }

    #[test]
    fn test_parse_events() {
        assert_eq!(parse_events(None).unwrap(), EventName::ALL.to_vec());
        assert_eq!(parse_events(Some("all")).unwrap(), EventName::ALL.to_vec());
        assert_eq!(
            parse_events(Some("chat, gift,chat,roomUserSeq")).unwrap(),
            vec![EventName::Chat, EventName::Gift, EventName::RoomUserSeq]
        );
        assert!(parse_events(Some("chat,nonsense")).is_err());
    }
}
