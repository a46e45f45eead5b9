use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "ATTENDANCE_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "config.properties";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config line {line}: expected key=value")]
    Malformed { line: usize },
    #[error("invalid config: {0}")]
    Invalid(#[from] serde_json::Error),
    #[error("db.url must not be empty")]
    EmptyUrl,
    #[error("unsupported db.url '{0}': expected a sqlite path")]
    UnsupportedUrl(String),
}

/// Connection parameters for the attendance store.
#[derive(Clone, Deserialize)]
pub struct DbConfig {
    #[serde(rename = "db.url")]
    pub url: String,
    #[serde(rename = "db.username", default)]
    pub username: Option<String>,
    #[serde(rename = "db.password", default)]
    pub password: Option<String>,
    #[serde(rename = "log.filter", default)]
    pub log_filter: Option<String>,
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("log_filter", &self.log_filter)
            .finish()
    }
}

impl DbConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let props = parse_properties(text)?;
        let cfg: DbConfig = serde_json::from_value(serde_json::Value::Object(props))?;
        if cfg.url.trim().is_empty() {
            return Err(ConfigError::EmptyUrl);
        }
        // Reject unsupported schemes up front so the failure surfaces at startup.
        cfg.sqlite_path()?;
        Ok(cfg)
    }

    /// Resolves `db.url` to the SQLite file it names.
    pub fn sqlite_path(&self) -> Result<PathBuf, ConfigError> {
        let url = self.url.trim();
        let rest = url
            .strip_prefix("jdbc:sqlite:")
            .or_else(|| url.strip_prefix("sqlite://"))
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);
        if rest.is_empty() || rest == ":memory:" || rest.contains("://") {
            return Err(ConfigError::UnsupportedUrl(url.to_string()));
        }
        if rest.starts_with("jdbc:") {
            return Err(ConfigError::UnsupportedUrl(url.to_string()));
        }
        Ok(PathBuf::from(rest))
    }
}

/// Config path from argv, then the environment, then the working directory.
pub fn resolve_config_path(arg: Option<String>) -> PathBuf {
    arg.or_else(|| std::env::var(CONFIG_ENV).ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

fn parse_properties(
    text: &str,
) -> Result<serde_json::Map<String, serde_json::Value>, ConfigError> {
    let mut out = serde_json::Map::new();
    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let Some(split) = line.find(['=', ':']) else {
            return Err(ConfigError::Malformed { line: i + 1 });
        };
        let key = line[..split].trim();
        if key.is_empty() {
            return Err(ConfigError::Malformed { line: i + 1 });
        }
        let value = line[split + 1..].trim();
        out.insert(
            key.to_string(),
            serde_json::Value::String(value.to_string()),
        );
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_properties_with_comments_and_both_separators() {
        let cfg = DbConfig::parse(
            "# attendance store\n\
             ! legacy comment\n\
             db.url = jdbc:sqlite:/var/lib/attendance/attendance.sqlite3\n\
             db.username: admin\n\
             db.password=secret\n",
        )
        .expect("parse config");
        assert_eq!(
            cfg.sqlite_path().expect("path"),
            PathBuf::from("/var/lib/attendance/attendance.sqlite3")
        );
        assert_eq!(cfg.username.as_deref(), Some("admin"));
        assert_eq!(cfg.password.as_deref(), Some("secret"));
        assert!(cfg.log_filter.is_none());
    }

    #[test]
    fn missing_url_is_rejected() {
        let e = DbConfig::parse("db.username=admin\n").unwrap_err();
        assert!(matches!(e, ConfigError::Invalid(_)), "{e}");
    }

    #[test]
    fn line_without_separator_is_malformed() {
        let e = DbConfig::parse("db.url=a.sqlite3\nnonsense\n").unwrap_err();
        assert!(matches!(e, ConfigError::Malformed { line: 2 }), "{e}");
    }

    #[test]
    fn non_sqlite_urls_are_rejected() {
        for url in [
            "jdbc:mysql://localhost:3306/attendance",
            "sqlite::memory:",
            ":memory:",
        ] {
            let e = DbConfig::parse(&format!("db.url={url}\n")).unwrap_err();
            assert!(matches!(e, ConfigError::UnsupportedUrl(_)), "{url}: {e}");
        }
    }

    #[test]
    fn bare_path_and_sqlite_scheme_resolve() {
        let a = DbConfig::parse("db.url=data/att.sqlite3").expect("bare");
        assert_eq!(a.sqlite_path().unwrap(), PathBuf::from("data/att.sqlite3"));
        let b = DbConfig::parse("db.url=sqlite://data/att.sqlite3").expect("scheme");
        assert_eq!(b.sqlite_path().unwrap(), PathBuf::from("data/att.sqlite3"));
    }

    #[test]
    fn debug_redacts_password() {
        let cfg = DbConfig::parse("db.url=a.sqlite3\ndb.password=hunter2\n").unwrap();
        let shown = format!("{cfg:?}");
        assert!(!shown.contains("hunter2"));
    }
}
