//! Service runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed to whatever needs it.
//! Nothing in the request path reads process environment variables.
//!
//! The parsing helpers take `Option<String>` (the result of `std::env::var(..).ok()`) so they
//! can be tested without mutating the process environment.

use crate::constants::{
    DATABASE_URL_SCHEME, DEFAULT_DATABASE_URL, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_STATIC_DIR,
};
use crate::{RecordError, RecordResult};
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};

/// Service configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    host: String,
    port: u16,
    database_path: PathBuf,
    static_dir: PathBuf,
}

impl ServiceConfig {
    /// Create a new `ServiceConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Validation`] if `host` is blank or if the store directory lies
    /// inside the static asset root, where its files would be downloadable.
    pub fn new(
        host: String,
        port: u16,
        database_path: PathBuf,
        static_dir: PathBuf,
    ) -> RecordResult<Self> {
        if host.trim().is_empty() {
            return Err(RecordError::Validation("host cannot be empty".into()));
        }
        if is_within(&database_path, &static_dir) {
            return Err(RecordError::Validation(format!(
                "DATABASE_URL path {} is inside STATIC_DIR {}",
                database_path.display(),
                static_dir.display()
            )));
        }

        Ok(Self {
            host,
            port,
            database_path,
            static_dir,
        })
    }

    /// Resolve configuration from raw environment values.
    ///
    /// # Arguments
    ///
    /// * `host` - Value of `HOST`, if set.
    /// * `port` - Value of `PORT`, if set.
    /// * `database_url` - Value of `DATABASE_URL`, if set.
    /// * `static_dir` - Value of `STATIC_DIR`, if set.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Validation`] if any value is present but malformed.
    pub fn from_env_values(
        host: Option<String>,
        port: Option<String>,
        database_url: Option<String>,
        static_dir: Option<String>,
    ) -> RecordResult<Self> {
        Self::new(
            host_from_env_value(host),
            port_from_env_value(port)?,
            database_path_from_env_value(database_url)?,
            static_dir_from_env_value(static_dir),
        )
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns `host:port`, suitable for binding a listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the bind address as a socket address when `host` is a literal IP.
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.bind_address().parse().ok()
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn static_dir(&self) -> &Path {
        &self.static_dir
    }
}

/// Lexical containment check after resolving relative paths against the working directory.
fn is_within(path: &Path, root: &Path) -> bool {
    normalize(path).starts_with(normalize(root))
}

fn normalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the bind host. Blank or missing values fall back to `0.0.0.0`.
pub fn host_from_env_value(value: Option<String>) -> String {
    non_blank(value).unwrap_or_else(|| DEFAULT_HOST.into())
}

/// Parse the HTTP port. Blank or missing values fall back to `3001`.
///
/// # Errors
///
/// Returns [`RecordError::Validation`] if the value is not an integer in `1..=65535`.
pub fn port_from_env_value(value: Option<String>) -> RecordResult<u16> {
    let Some(raw) = non_blank(value) else {
        return Ok(DEFAULT_PORT);
    };

    match raw.parse::<u16>() {
        Ok(0) | Err(_) => Err(RecordError::Validation(format!(
            "PORT must be an integer between 1 and 65535, got '{raw}'"
        ))),
        Ok(port) => Ok(port),
    }
}

/// Parse the store location from a `DATABASE_URL` value.
///
/// Accepts `sled://<path>` or a bare filesystem path. Blank or missing values fall back to
/// `sled://./dialysis_data`.
///
/// # Errors
///
/// Returns [`RecordError::Validation`] if the value names another URL scheme or an empty path.
pub fn database_path_from_env_value(value: Option<String>) -> RecordResult<PathBuf> {
    let raw = non_blank(value).unwrap_or_else(|| DEFAULT_DATABASE_URL.into());

    let path = match raw.strip_prefix(DATABASE_URL_SCHEME) {
        Some(rest) => rest,
        None if raw.contains("://") => {
            return Err(RecordError::Validation(format!(
                "DATABASE_URL must use the {DATABASE_URL_SCHEME} scheme or be a plain path, got '{raw}'"
            )));
        }
        None => raw.as_str(),
    };

    if path.is_empty() {
        return Err(RecordError::Validation(
            "DATABASE_URL does not name a path".into(),
        ));
    }

    Ok(PathBuf::from(path))
}

/// Parse the static asset root. Blank or missing values fall back to `./public`.
pub fn static_dir_from_env_value(value: Option<String>) -> PathBuf {
    PathBuf::from(non_blank(value).unwrap_or_else(|| DEFAULT_STATIC_DIR.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_defaults_when_missing_or_blank() {
        assert_eq!(port_from_env_value(None).unwrap(), 3001);
        assert_eq!(port_from_env_value(Some("  ".into())).unwrap(), 3001);
    }

    #[test]
    fn test_port_parses_value() {
        assert_eq!(port_from_env_value(Some("8080".into())).unwrap(), 8080);
    }

    #[test]
    fn test_port_rejects_garbage_and_zero() {
        assert!(matches!(
            port_from_env_value(Some("http".into())),
            Err(RecordError::Validation(_))
        ));
        assert!(port_from_env_value(Some("0".into())).is_err());
        assert!(port_from_env_value(Some("70000".into())).is_err());
    }

    #[test]
    fn test_database_path_default() {
        let path = database_path_from_env_value(None).unwrap();
        assert_eq!(path, PathBuf::from("./dialysis_data"));
    }

    #[test]
    fn test_database_path_strips_scheme() {
        let path = database_path_from_env_value(Some("sled:///var/lib/dialysis".into())).unwrap();
        assert_eq!(path, PathBuf::from("/var/lib/dialysis"));
    }

    #[test]
    fn test_database_path_accepts_bare_path() {
        let path = database_path_from_env_value(Some("data/store".into())).unwrap();
        assert_eq!(path, PathBuf::from("data/store"));
    }

    #[test]
    fn test_database_path_rejects_other_schemes() {
        let result = database_path_from_env_value(Some("mongodb://localhost:27017/x".into()));
        match result {
            Err(RecordError::Validation(msg)) => assert!(msg.contains("sled://")),
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_database_path_rejects_empty_path() {
        assert!(database_path_from_env_value(Some("sled://".into())).is_err());
    }

    #[test]
    fn test_from_env_values_defaults() {
        let cfg = ServiceConfig::from_env_values(None, None, None, None)
            .expect("default configuration should resolve");

        assert_eq!(cfg.host(), "0.0.0.0");
        assert_eq!(cfg.port(), 3001);
        assert_eq!(cfg.bind_address(), "0.0.0.0:3001");
        assert!(cfg.socket_addr().is_some());
        assert_eq!(cfg.database_path(), Path::new("./dialysis_data"));
        assert_eq!(cfg.static_dir(), Path::new("./public"));
    }

    #[test]
    fn test_from_env_values_overrides() {
        let cfg = ServiceConfig::from_env_values(
            Some("127.0.0.1".into()),
            Some("4000".into()),
            Some("sled://tmp/db".into()),
            Some("public".into()),
        )
        .expect("configuration should resolve");

        assert_eq!(cfg.bind_address(), "127.0.0.1:4000");
        assert_eq!(cfg.database_path(), Path::new("tmp/db"));
        assert_eq!(cfg.static_dir(), Path::new("public"));
    }

    #[test]
    fn test_new_rejects_blank_host() {
        let result =
            ServiceConfig::new(" ".into(), 3001, PathBuf::from("db"), PathBuf::from("public"));
        assert!(result.is_err());
    }

    #[test]
    fn test_new_rejects_store_inside_static_root() {
        let result = ServiceConfig::new(
            "0.0.0.0".into(),
            3001,
            PathBuf::from("./dialysis_data"),
            PathBuf::from("."),
        );
        match result {
            Err(RecordError::Validation(msg)) => assert!(msg.contains("STATIC_DIR")),
            other => panic!("Expected Validation error, got {other:?}"),
        }

        let nested = ServiceConfig::new(
            "0.0.0.0".into(),
            3001,
            PathBuf::from("/srv/site/../site/data"),
            PathBuf::from("/srv/site"),
        );
        assert!(nested.is_err());
    }

    #[test]
    fn test_new_accepts_sibling_store_and_static_root() {
        let cfg = ServiceConfig::new(
            "0.0.0.0".into(),
            3001,
            PathBuf::from("./public_data"),
            PathBuf::from("./public"),
        );
        assert!(cfg.is_ok());
    }
}
