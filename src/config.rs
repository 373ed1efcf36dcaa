use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";
pub const DEFAULT_CALLBACK_URL: &str = "http://127.0.0.1:8765/auth/callback";
pub const DEFAULT_SESSION_COOKIE: &str = "gmail_token";
pub const DEFAULT_ARCHIVE_NAME: &str = "facturas_descargadas.zip";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub backend_url: String,
    /// Loopback address the backend's REDIRECT_URI points at.
    pub callback_url: String,
    pub session_cookie: String,
    pub download_dir: Option<String>,
    pub archive_name: String,
    pub toast_secs: u64,
    pub request_timeout_secs: u64,
    pub login_timeout_secs: u64,
    pub desktop_notifications: bool,
    pub db_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            callback_url: DEFAULT_CALLBACK_URL.to_string(),
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
            download_dir: None,
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
            toast_secs: 3,
            request_timeout_secs: 60,
            login_timeout_secs: 120,
            desktop_notifications: false,
            db_path: None,
        }
    }
}

impl Config {
    pub fn toast_ttl(&self) -> Duration {
        Duration::from_secs(self.toast_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs.max(1))
    }
}

fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("no config dir available"))?
        .join("rs_invoice_client"))
}

pub fn config_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("config.toml");
    Ok(p)
}

pub fn default_db_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("history.db");
    Ok(p)
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

/// Reads the config, writing a template with the defaults first if the file
/// does not exist yet. Missing keys fall back to their defaults.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        let sample = Config::default();
        let tom = toml::to_string_pretty(&sample)?;
        fs::write(path, tom)
            .with_context(|| format!("writing config template {}", path.display()))?;
        log::info!("created config template at {}", path.display());
        return Ok(sample);
    }
    let s = fs::read_to_string(path)?;
    let cfg: Config =
        toml::from_str(&s).with_context(|| format!("parsing {}", path.display()))?;
    Ok(cfg)
}

pub fn resolve_db_path(cfg: &Config) -> Result<PathBuf> {
    if let Some(p) = &cfg.db_path {
        Ok(PathBuf::from(p))
    } else {
        default_db_path()
    }
}

/// Where archives are saved: configured dir, else the user's download dir,
/// else the working directory.
pub fn resolve_download_dir(cfg: &Config) -> PathBuf {
    if let Some(p) = &cfg.download_dir {
        return PathBuf::from(p);
    }
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_template_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
        // and it reads back
        assert_eq!(load_config_from(&path).unwrap(), cfg);
    }

    #[test]
    fn partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "backend_url = \"https://facturas.example.com\"\ntoast_secs = 5\n",
        )
        .unwrap();
        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.backend_url, "https://facturas.example.com");
        assert_eq!(cfg.toast_ttl(), Duration::from_secs(5));
        assert_eq!(cfg.session_cookie, DEFAULT_SESSION_COOKIE);
        assert_eq!(cfg.archive_name, DEFAULT_ARCHIVE_NAME);
    }

    #[test]
    fn configured_download_dir_wins() {
        let cfg = Config {
            download_dir: Some("/tmp/facturas".into()),
            ..Config::default()
        };
        assert_eq!(resolve_download_dir(&cfg), PathBuf::from("/tmp/facturas"));
    }
}
