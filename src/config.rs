//! Optional config file loading. Search order: ./rlcbz.toml, then
//! $XDG_CONFIG_HOME/rlcbz/config.toml (or ~/.config/rlcbz/config.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file contents. All fields optional; only present keys override defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// Archive root when --cbz is not set. Paths are relative to CWD.
    pub output_dir: Option<PathBuf>,
    /// Staging root for downloaded images (default ./download).
    pub download_dir: Option<PathBuf>,
    /// Directory holding `<list_id>.json` ledgers (default .).
    pub ledger_dir: Option<PathBuf>,
    /// HTTP User-Agent header.
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Lower bound of the pause after each image download, in milliseconds.
    pub delay_min_ms: Option<u64>,
    /// Upper bound of the pause after each image download, in milliseconds.
    pub delay_max_ms: Option<u64>,
    /// `LanguageISO` written to ComicInfo.xml.
    pub language: Option<String>,
}

/// Search order: (1) ./rlcbz.toml, (2) $XDG_CONFIG_HOME/rlcbz/config.toml.
/// Missing file returns Ok(None). Invalid TOML or I/O error reading a present file returns Err.
pub fn load_config() -> Result<Option<Config>, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Cannot determine current directory: {}", e))?;
    let mut paths = vec![cwd.join("rlcbz.toml")];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("rlcbz").join("config.toml"));
    }
    load_first(&paths)
}

fn load_first(paths: &[PathBuf]) -> Result<Option<Config>, String> {
    for path in paths {
        if path.exists() {
            return load_file(path).map(Some);
        }
    }
    Ok(None)
}

fn load_file(path: &Path) -> Result<Config, String> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
    toml::from_str(&s).map_err(|e| format!("Invalid config {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parse_empty_config() {
        let c: Config = toml::from_str("").unwrap();
        assert!(c.output_dir.is_none());
        assert!(c.download_dir.is_none());
        assert!(c.ledger_dir.is_none());
        assert!(c.user_agent.is_none());
        assert!(c.timeout_secs.is_none());
        assert!(c.delay_min_ms.is_none());
        assert!(c.delay_max_ms.is_none());
        assert!(c.language.is_none());
    }

    #[test]
    fn parse_full_config() {
        let s = r#"
            output_dir = "cbz"
            download_dir = "staging"
            ledger_dir = "state"
            user_agent = "Custom/1.0"
            timeout_secs = 60
            delay_min_ms = 500
            delay_max_ms = 900
            language = "ja"
        "#;
        let c: Config = toml::from_str(s).unwrap();
        assert_eq!(c.output_dir.as_deref(), Some(Path::new("cbz")));
        assert_eq!(c.download_dir.as_deref(), Some(Path::new("staging")));
        assert_eq!(c.ledger_dir.as_deref(), Some(Path::new("state")));
        assert_eq!(c.user_agent.as_deref(), Some("Custom/1.0"));
        assert_eq!(c.timeout_secs, Some(60));
        assert_eq!(c.delay_min_ms, Some(500));
        assert_eq!(c.delay_max_ms, Some(900));
        assert_eq!(c.language.as_deref(), Some("ja"));
    }

    #[test]
    fn parse_partial_config() {
        let c: Config = toml::from_str("delay_max_ms = 3000").unwrap();
        assert!(c.output_dir.is_none());
        assert!(c.delay_min_ms.is_none());
        assert_eq!(c.delay_max_ms, Some(3000));
    }

    #[test]
    fn invalid_toml_errors() {
        assert!(toml::from_str::<Config>("output_dir = [").is_err());
    }

    #[test]
    fn load_first_takes_earliest_existing_file() -> Result<(), String> {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("rlcbz.toml");
        let present = dir.path().join("config.toml");
        std::fs::write(&present, "timeout_secs = 5").unwrap();
        let c = load_first(&[missing, present])?;
        assert_eq!(c.and_then(|c| c.timeout_secs), Some(5));
        Ok(())
    }

    #[test]
    fn load_first_none_when_nothing_exists() -> Result<(), String> {
        let dir = TempDir::new().unwrap();
        assert!(load_first(&[dir.path().join("rlcbz.toml")])?.is_none());
        Ok(())
    }

    #[test]
    fn load_first_reports_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rlcbz.toml");
        std::fs::write(&path, "timeout_secs = \"soon\"").unwrap();
        let err = load_first(&[path]).unwrap_err();
        assert!(err.starts_with("Invalid config"));
    }
}
