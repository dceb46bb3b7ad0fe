//! Auth token resolution.
//!
//! Sources are applied in a fixed order and each one that yields a token
//! overwrites the previous one, so the last source wins:
//!
//! 1. system config file (`/etc/signalfx.conf`)
//! 2. per-user config file (`~/.signalfx.conf`)
//! 3. netrc entry for `api.signalfx.com`
//! 4. the explicit token from the provider block (or `SFX_AUTH_TOKEN`)
//!
//! A config file that exists but cannot be read or parsed stops the chain.

use crate::error::ProviderError;
use netrc::Netrc;
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

/// System wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/signalfx.conf";

/// Per-user config file name, relative to the home directory.
pub const HOME_CONFIG_FILE: &str = ".signalfx.conf";

/// Host looked up in the netrc file.
pub const NETRC_MACHINE: &str = "api.signalfx.com";

/// Environment variable overriding the netrc location.
pub const NETRC_ENV: &str = "NETRC";

#[cfg(windows)]
const NETRC_FILE: &str = "_netrc";
#[cfg(not(windows))]
const NETRC_FILE: &str = ".netrc";

static HOME_DIR: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Home directory, looked up once per process.
fn home_dir() -> Option<&'static Path> {
    HOME_DIR.get_or_init(dirs::home_dir).as_deref()
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    auth_token: Option<String>,
}

/// Locations consulted while resolving the token.
///
/// `None` disables a source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialSources {
    /// JSON config with the lowest priority.
    pub system_config: Option<PathBuf>,
    /// Per-user JSON config.
    pub home_config: Option<PathBuf>,
    /// netrc file.
    pub netrc: Option<PathBuf>,
    /// Machine name matched in the netrc file.
    pub netrc_machine: String,
}

impl CredentialSources {
    /// Sources with every file disabled.
    pub fn none() -> Self {
        Self {
            netrc_machine: NETRC_MACHINE.to_string(),
            ..Default::default()
        }
    }

    /// The standard locations for this process.
    pub fn from_environment() -> Result<Self, ProviderError> {
        let home = home_dir().ok_or_else(|| {
            ProviderError::Configuration(
                "Failed to get user environment: home directory is unknown".to_string(),
            )
        })?;
        let netrc = match std::env::var_os(NETRC_ENV) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => home.join(NETRC_FILE),
        };
        Ok(Self {
            system_config: Some(PathBuf::from(SYSTEM_CONFIG_PATH)),
            home_config: Some(home.join(HOME_CONFIG_FILE)),
            netrc: Some(netrc),
            netrc_machine: NETRC_MACHINE.to_string(),
        })
    }

    /// Replace the system config path.
    pub fn with_system_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.system_config = Some(path.into());
        self
    }

    /// Replace the per-user config path.
    pub fn with_home_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.home_config = Some(path.into());
        self
    }

    /// Replace the netrc path.
    pub fn with_netrc(mut self, path: impl Into<PathBuf>) -> Self {
        self.netrc = Some(path.into());
        self
    }

    /// Walk the chain and return the winning token.
    ///
    /// `explicit` is the declared token; an empty string counts as unset.
    pub fn resolve(&self, explicit: Option<&str>) -> Result<String, ProviderError> {
        let mut token: Option<String> = None;

        if let Some(path) = &self.system_config {
            debug!(path = %path.display(), "looking for token in system config");
            if let Some(found) = read_config_file(path)? {
                token = Some(found);
            }
        }

        if let Some(path) = &self.home_config {
            debug!(path = %path.display(), "looking for token in home config");
            if let Some(found) = read_config_file(path)? {
                token = Some(found);
            }
        }

        if let Some(path) = &self.netrc {
            debug!(path = %path.display(), machine = %self.netrc_machine, "looking for token in netrc");
            if let Some(found) = read_netrc_password(path, &self.netrc_machine)? {
                token = Some(found);
            }
        }

        match explicit.filter(|t| !t.is_empty()) {
            Some(declared) => {
                debug!(
                    previous_len = token.as_ref().map_or(0, String::len),
                    declared_len = declared.len(),
                    "using token from provider config"
                );
                token = Some(declared.to_string());
            },
            None => debug!("no token in provider config"),
        }

        match token {
            Some(t) if !t.is_empty() => Ok(t),
            _ => Err(ProviderError::Configuration(
                "auth_token: required field is not set".to_string(),
            )),
        }
    }
}

/// Token from a JSON config file, `None` when the file is missing or has no token.
fn read_config_file(path: &Path) -> Result<Option<String>, ProviderError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found");
            return Ok(None);
        },
        Err(e) => {
            return Err(ProviderError::Configuration(format!(
                "Failed to open config file. {}",
                e
            )))
        },
    };
    let parsed: ConfigFile = serde_json::from_str(&text).map_err(|e| {
        ProviderError::Configuration(format!(
            "Failed to parse config file ({}): {}",
            path.display(),
            e
        ))
    })?;
    debug!(path = %path.display(), "parsed config file");
    Ok(parsed.auth_token)
}

fn read_netrc_password(path: &Path, machine: &str) -> Result<Option<String>, ProviderError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(_) if path.is_dir() => return Ok(None),
        Err(e) => {
            return Err(ProviderError::Configuration(format!(
                "Error reading netrc file at {:?}: {}",
                path, e
            )))
        },
    };
    let netrc = Netrc::parse(text.as_bytes()).map_err(|e| {
        ProviderError::Configuration(format!("Error parsing netrc file at {:?}: {:?}", path, e))
    })?;
    Ok(netrc_password(&netrc, machine))
}

/// Password of the `machine` record, falling back to the `default` record.
fn netrc_password(netrc: &Netrc, machine: &str) -> Option<String> {
    netrc
        .hosts
        .iter()
        .find(|(host, _)| host == machine)
        .map(|(_, record)| record)
        .or(netrc.default.as_ref())
        .and_then(|record| record.password.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn sources(dir: &TempDir) -> CredentialSources {
        CredentialSources::none()
            .with_system_config(dir.path().join("system.conf"))
            .with_home_config(dir.path().join("home.conf"))
            .with_netrc(dir.path().join("netrc"))
    }

    #[test]
    fn test_no_source_fails_with_required_field() {
        let dir = TempDir::new().unwrap();
        let err = sources(&dir).resolve(None).unwrap_err();
        assert_eq!(err.message(), "auth_token: required field is not set");

        let err = sources(&dir).resolve(Some("")).unwrap_err();
        assert_eq!(err.message(), "auth_token: required field is not set");
    }

    #[test]
    fn test_last_source_wins() {
        let dir = TempDir::new().unwrap();
        write(&dir, "system.conf", r#"{"auth_token": "system"}"#);
        assert_eq!(sources(&dir).resolve(None).unwrap(), "system");

        write(&dir, "home.conf", r#"{"auth_token": "home"}"#);
        assert_eq!(sources(&dir).resolve(None).unwrap(), "home");

        write(&dir, "netrc", "machine api.signalfx.com login me password netrc\n");
        assert_eq!(sources(&dir).resolve(None).unwrap(), "netrc");

        assert_eq!(sources(&dir).resolve(Some("explicit")).unwrap(), "explicit");
    }

    #[test]
    fn test_explicit_wins_over_any_file() {
        let dir = TempDir::new().unwrap();
        write(&dir, "system.conf", r#"{"auth_token": "a"}"#);
        write(&dir, "home.conf", r#"{"auth_token": "b"}"#);
        write(&dir, "netrc", "default login x password c");
        for token in ["t", "0123456789abcdef", "with space"] {
            assert_eq!(sources(&dir).resolve(Some(token)).unwrap(), token);
        }
    }

    #[test]
    fn test_file_without_token_keeps_previous() {
        let dir = TempDir::new().unwrap();
        write(&dir, "system.conf", r#"{"auth_token": "system"}"#);
        write(&dir, "home.conf", r#"{"realm": "us1"}"#);
        assert_eq!(sources(&dir).resolve(None).unwrap(), "system");
    }

    #[test]
    fn test_malformed_config_is_fatal() {
        let dir = TempDir::new().unwrap();
        write(&dir, "system.conf", "{not json");
        let err = sources(&dir).resolve(Some("explicit")).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
        assert!(err.message().starts_with("Failed to parse config file"));

        let dir = TempDir::new().unwrap();
        write(&dir, "home.conf", r#"{"auth_token": 12}"#);
        assert_err!(sources(&dir).resolve(Some("explicit")));
    }

    #[test]
    fn test_netrc_other_machine_ignored() {
        let dir = TempDir::new().unwrap();
        write(&dir, "home.conf", r#"{"auth_token": "home"}"#);
        write(&dir, "netrc", "machine example.com login me password nope\n");
        assert_eq!(assert_ok!(sources(&dir).resolve(None)), "home");
    }

    #[test]
    fn test_netrc_directory_is_skipped() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("netrc")).unwrap();
        assert_eq!(sources(&dir).resolve(Some("x")).unwrap(), "x");
    }

    #[test]
    fn test_malformed_netrc_is_fatal() {
        let dir = TempDir::new().unwrap();
        write(&dir, "netrc", "machine api.signalfx.com password");
        let err = sources(&dir).resolve(Some("x")).unwrap_err();
        assert!(err.message().starts_with("Error parsing netrc file"));
    }

    #[test]
    fn test_netrc_records_and_macros() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "netrc",
            "machine a.example login la password pa\n\
             macdef init\ncd /tmp\nput file\n\n\
             machine api.signalfx.com\n  login me\n  password secret\n  account acct\n\
             default login anon password guest\n",
        );
        assert_eq!(sources(&dir).resolve(None).unwrap(), "secret");
    }

    #[test]
    fn test_netrc_default_record() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "netrc",
            "machine other.example login me password nope\ndefault login anon password guest\n",
        );
        assert_eq!(sources(&dir).resolve(None).unwrap(), "guest");
    }

    #[test]
    fn test_netrc_password_lookup() {
        let netrc = Netrc::parse(
            "machine api.signalfx.com login me password secret\nmachine x login y\n".as_bytes(),
        )
        .unwrap();
        assert_eq!(netrc_password(&netrc, "api.signalfx.com").as_deref(), Some("secret"));
        assert_eq!(netrc_password(&netrc, "x"), None);
        assert_eq!(netrc_password(&netrc, "unknown"), None);
    }

    #[test]
    fn test_netrc_rejects_unknown_token() {
        let dir = TempDir::new().unwrap();
        write(&dir, "netrc", "machine a login b frobnicate c\n");
        let err = sources(&dir).resolve(Some("x")).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn test_from_environment_uses_home() {
        let sources = CredentialSources::from_environment();
        if let Ok(sources) = sources {
            assert_eq!(
                sources.system_config.as_deref(),
                Some(Path::new(SYSTEM_CONFIG_PATH))
            );
            let home_config = sources.home_config.unwrap();
            assert!(home_config.ends_with(HOME_CONFIG_FILE));
            assert_eq!(sources.netrc_machine, NETRC_MACHINE);
        }
    }
}
