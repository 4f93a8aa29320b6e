//! Directory settings and configuration file resolution.
//!
//! Settings are plain data loaded from a YAML file. Resolution is an explicit
//! function call — an explicit path wins, then the `EZDIR_CONFIG` environment
//! variable, then `~/.ezdir/config.yml`. Nothing here is process-global;
//! callers hold the resolved settings and pass them where needed.

use crate::{Error, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use validator::Validate;

/// Environment variable consulted when no explicit config path is given.
pub const CONFIG_ENV_VAR: &str = "EZDIR_CONFIG";

/// Per-user config file location, relative to the home directory.
pub const USER_CONFIG_PATH: &str = ".ezdir/config.yml";

/// Default connection timeout (seconds).
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 10;
/// Default operation timeout (seconds).
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 10;

/// Settings for connecting to and administering an LDAP directory.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DirectorySettings {
    /// Directory server URL (e.g. `ldaps://ldap.example.com`).
    #[validate(url)]
    pub url: String,

    /// Bind DN. Omitted for anonymous binds.
    #[serde(default)]
    pub bind_dn: Option<String>,

    /// Bind password. Omitted for anonymous binds; callers prompt when a
    /// bind DN is set but no password is configured.
    #[serde(default)]
    pub bind_password: Option<SecretString>,

    /// Directory base DN (e.g. `dc=example,dc=com`).
    pub base_dn: String,

    /// Search base for people entries. Defaults to the base DN.
    #[serde(default)]
    pub people_dn: Option<String>,

    /// Search base for group entries. Defaults to the base DN.
    #[serde(default)]
    pub group_dn: Option<String>,

    /// Search base for host entries. Defaults to the base DN.
    #[serde(default)]
    pub hosts_dn: Option<String>,

    /// Parent directory for new user home directories.
    #[serde(default = "default_home_dir")]
    pub home_dir: String,

    /// First uid number to allocate in an empty directory.
    #[serde(default = "default_id_start")]
    pub uid_start: u32,

    /// First gid number to allocate in an empty directory.
    #[serde(default = "default_id_start")]
    pub gid_start: u32,

    /// Whether to verify TLS certificates.
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,

    /// Optional path to a custom CA certificate.
    #[serde(default)]
    pub tls_ca_cert: Option<PathBuf>,

    /// Connection timeout in seconds.
    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,

    /// Per-operation timeout in seconds.
    #[serde(default = "default_operation_timeout_secs")]
    pub operation_timeout_secs: u64,

    /// Extra replacement values passed to every LDIF template.
    #[serde(default)]
    pub placeholders: BTreeMap<String, String>,
}

fn default_home_dir() -> String {
    "/home".to_string()
}

const fn default_id_start() -> u32 {
    10_000
}

const fn default_tls_verify() -> bool {
    true
}

const fn default_connection_timeout_secs() -> u64 {
    DEFAULT_CONNECTION_TIMEOUT_SECS
}

const fn default_operation_timeout_secs() -> u64 {
    DEFAULT_OPERATION_TIMEOUT_SECS
}

impl DirectorySettings {
    /// Creates settings with the required fields and defaults for the rest.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the URL fails validation.
    pub fn new(url: impl Into<String>, base_dn: impl Into<String>) -> Result<Self> {
        let settings = Self {
            url: url.into(),
            bind_dn: None,
            bind_password: None,
            base_dn: base_dn.into(),
            people_dn: None,
            group_dn: None,
            hosts_dn: None,
            home_dir: default_home_dir(),
            uid_start: default_id_start(),
            gid_start: default_id_start(),
            tls_verify: default_tls_verify(),
            tls_ca_cert: None,
            connection_timeout_secs: default_connection_timeout_secs(),
            operation_timeout_secs: default_operation_timeout_secs(),
            placeholders: BTreeMap::new(),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Loads settings from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the file does not exist,
    /// [`Error::ConfigError`] if it fails to parse or validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(format!("config file {} not found", path.display()))
            } else {
                Error::Io(format!("failed to read {}: {err}", path.display()))
            }
        })?;
        let settings: Self = serde_yaml::from_str(&contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Resolves and loads the first available config file.
    ///
    /// Resolution order: the explicit path argument, the [`CONFIG_ENV_VAR`]
    /// environment variable, then [`USER_CONFIG_PATH`] under `$HOME`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no candidate file exists, or the
    /// load error of the first candidate found.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match resolve_config_path(explicit) {
            Some(path) => Self::load(path),
            None => Err(Error::NotFound(
                "no config file found; create ~/.ezdir/config.yml or set EZDIR_CONFIG".to_string(),
            )),
        }
    }

    /// Sets the bind credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        bind_dn: impl Into<String>,
        bind_password: SecretString,
    ) -> Self {
        self.bind_dn = Some(bind_dn.into());
        self.bind_password = Some(bind_password);
        self
    }

    /// Overrides the people search base.
    #[must_use]
    pub fn with_people_dn(mut self, dn: impl Into<String>) -> Self {
        self.people_dn = Some(dn.into());
        self
    }

    /// Overrides the group search base.
    #[must_use]
    pub fn with_group_dn(mut self, dn: impl Into<String>) -> Self {
        self.group_dn = Some(dn.into());
        self
    }

    /// Overrides the hosts search base.
    #[must_use]
    pub fn with_hosts_dn(mut self, dn: impl Into<String>) -> Self {
        self.hosts_dn = Some(dn.into());
        self
    }

    /// Enables or disables TLS certificate verification.
    #[must_use]
    pub const fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Sets a custom CA certificate path.
    #[must_use]
    pub fn with_tls_ca_cert(mut self, path: PathBuf) -> Self {
        self.tls_ca_cert = Some(path);
        self
    }

    /// Adds a replacement value passed to every LDIF template.
    #[must_use]
    pub fn with_placeholder(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.placeholders.insert(name.into(), value.into());
        self
    }

    /// Returns the people search base, falling back to the base DN.
    #[must_use]
    pub fn people_dn(&self) -> &str {
        self.people_dn.as_deref().unwrap_or(&self.base_dn)
    }

    /// Returns the group search base, falling back to the base DN.
    #[must_use]
    pub fn group_dn(&self) -> &str {
        self.group_dn.as_deref().unwrap_or(&self.base_dn)
    }

    /// Returns the hosts search base, falling back to the base DN.
    #[must_use]
    pub fn hosts_dn(&self) -> &str {
        self.hosts_dn.as_deref().unwrap_or(&self.base_dn)
    }

    /// Returns the connection timeout duration.
    #[must_use]
    pub const fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// Returns the per-operation timeout duration.
    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

/// Returns the first existing config file path, or the explicit path verbatim.
///
/// An explicit path is returned even when missing so the caller reports a
/// useful not-found error for it. Env and home candidates are only returned
/// when they exist on disk.
#[must_use]
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    if let Some(home) = std::env::var_os("HOME") {
        let path = PathBuf::from(home).join(USER_CONFIG_PATH);
        if path.exists() {
            return Some(path);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
url: ldaps://ldap.example.com
bind_dn: cn=Manager,dc=example,dc=com
bind_password: secret
base_dn: dc=example,dc=com
people_dn: ou=People,dc=example,dc=com
group_dn: ou=Group,dc=example,dc=com
placeholders:
  mailhost: mail.example.com
";

    #[test]
    fn parse_sample_config() {
        let settings: DirectorySettings = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(settings.url, "ldaps://ldap.example.com");
        assert_eq!(
            settings.bind_dn.as_deref(),
            Some("cn=Manager,dc=example,dc=com")
        );
        assert!(settings.bind_password.is_some());
        assert_eq!(settings.people_dn(), "ou=People,dc=example,dc=com");
        assert_eq!(settings.hosts_dn(), "dc=example,dc=com");
        assert_eq!(settings.uid_start, 10_000);
        assert_eq!(settings.home_dir, "/home");
        assert_eq!(
            settings.placeholders.get("mailhost").map(String::as_str),
            Some("mail.example.com")
        );
    }

    #[test]
    fn defaults_and_overrides() {
        let settings = DirectorySettings::new("ldap://localhost", "dc=ezdir,dc=io")
            .unwrap()
            .with_people_dn("ou=People,dc=ezdir,dc=io")
            .with_tls_verify(false)
            .with_placeholder("mailhost", "smtp.ezdir.io");

        assert_eq!(settings.people_dn(), "ou=People,dc=ezdir,dc=io");
        assert_eq!(settings.group_dn(), "dc=ezdir,dc=io");
        assert!(!settings.tls_verify);
        assert_eq!(settings.connection_timeout(), Duration::from_secs(10));
        assert_eq!(
            settings.placeholders.get("mailhost").map(String::as_str),
            Some("smtp.ezdir.io")
        );
    }

    #[test]
    fn invalid_url_rejected() {
        let err = DirectorySettings::new("not a url", "dc=example,dc=com").unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let err = DirectorySettings::load("/nonexistent/config.yml").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let settings = DirectorySettings::load(file.path()).unwrap();
        assert_eq!(settings.base_dn, "dc=example,dc=com");
    }

    #[test]
    fn explicit_path_wins_resolution() {
        let path = Path::new("/some/explicit/config.yml");
        let resolved = resolve_config_path(Some(path)).unwrap();
        assert_eq!(resolved, path);
    }
}
