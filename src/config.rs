//! Session configuration: `~/.gatorconfig.json` plus environment overrides.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = ".gatorconfig.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_user_name: Option<String>,
}

/// A [`SessionConfig`] bound to the file it was read from.
#[derive(Debug)]
pub struct ConfigFile {
    path: PathBuf,
    pub data: SessionConfig,
}

impl ConfigFile {
    /// `GATOR_CONFIG` if set, otherwise `~/.gatorconfig.json`.
    pub fn locate() -> Result<PathBuf> {
        if let Ok(p) = std::env::var("GATOR_CONFIG") {
            return Ok(PathBuf::from(p));
        }
        let home = dirs::home_dir().context("cannot determine home directory")?;
        Ok(home.join(CONFIG_FILE_NAME))
    }

    /// A missing file is an empty config.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("malformed config file {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => SessionConfig::default(),
            Err(e) => return Err(e).with_context(|| format!("reading config file {}", path.display())),
        };
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn set_current_user(&mut self, name: &str) -> Result<()> {
        self.data.current_user_name = Some(name.to_string());
        self.save()
    }

    fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.data)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("writing config file {}", self.path.display()))?;
        Ok(())
    }
}

/// `--dsn`, then `DATABASE_URL`, then the config file.
pub fn resolve_dsn(flag: Option<String>, env: Option<String>, cfg: &SessionConfig) -> Result<String> {
    match flag.or(env).or_else(|| cfg.db_url.clone()) {
        Some(dsn) if !dsn.trim().is_empty() => Ok(dsn),
        _ => bail!("no database configured: pass --dsn, set DATABASE_URL or add db_url to {}", CONFIG_FILE_NAME),
    }
}

/// `--user` wins over the persisted current user for a single invocation.
pub fn current_user_name<'a>(flag: Option<&'a str>, cfg: &'a SessionConfig) -> Option<&'a str> {
    flag.or(cfg.current_user_name.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty_config() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ConfigFile::load(dir.path().join("nope.json")).unwrap();
        assert_eq!(cfg.data, SessionConfig::default());
    }

    #[test]
    fn set_current_user_persists_and_keeps_db_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, r#"{"db_url":"postgres://localhost/gator"}"#).unwrap();

        let mut cfg = ConfigFile::load(&path).unwrap();
        cfg.set_current_user("lane").unwrap();

        let reread = ConfigFile::load(&path).unwrap();
        assert_eq!(reread.data.db_url.as_deref(), Some("postgres://localhost/gator"));
        assert_eq!(reread.data.current_user_name.as_deref(), Some("lane"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "{not json").unwrap();
        let err = ConfigFile::load(&path).unwrap_err();
        assert!(err.to_string().contains("malformed config file"));
    }

    #[test]
    fn dsn_precedence_is_flag_env_file() {
        let cfg = SessionConfig { db_url: Some("file".into()), current_user_name: None };
        assert_eq!(resolve_dsn(Some("flag".into()), Some("env".into()), &cfg).unwrap(), "flag");
        assert_eq!(resolve_dsn(None, Some("env".into()), &cfg).unwrap(), "env");
        assert_eq!(resolve_dsn(None, None, &cfg).unwrap(), "file");
        assert!(resolve_dsn(None, None, &SessionConfig::default()).is_err());
    }

    #[test]
    fn user_flag_overrides_config() {
        let cfg = SessionConfig { db_url: None, current_user_name: Some("kahya".into()) };
        assert_eq!(current_user_name(Some("holgith"), &cfg), Some("holgith"));
        assert_eq!(current_user_name(None, &cfg), Some("kahya"));
        assert_eq!(current_user_name(None, &SessionConfig::default()), None);
    }
}
