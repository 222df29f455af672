//! Configuration management for nfsn-dns.
//!
//! Values come from an optional TOML file and are overridden by environment
//! variables. The result is an explicit [`Config`] value handed to the client and
//! engine constructors.

use crate::error::{NfsnError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.nearlyfreespeech.net";
pub const DEFAULT_IPV4_PROVIDER: &str = "http://ipinfo.io/ip";
pub const DEFAULT_IPV6_PROVIDER: &str = "http://v6.ipinfo.io/ip";
pub const DEFAULT_TTL: u32 = 3600;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Account identity used to sign API requests.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub api_key: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            api_key: api_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// On-disk configuration. Every field is optional so the environment can fill gaps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Account name (or environment variable name if prefixed with $).
    pub username: Option<String>,
    /// API key (or environment variable name if prefixed with $).
    pub api_key: Option<String>,
    pub domain: Option<String>,
    pub subdomain: Option<String>,
    pub ip_provider: Option<String>,
    pub ipv6_provider: Option<String>,
    pub enable_ipv6: Option<bool>,
    pub ip_use_dig: Option<bool>,
    pub ttl: Option<u32>,
    pub create_missing: Option<bool>,
    pub timeout_secs: Option<u64>,
    pub api_url: Option<String>,
    pub dig_nameserver_v4: Option<IpAddr>,
    pub dig_nameserver_v6: Option<IpAddr>,
}

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub domain: String,
    /// Record name to keep in sync; empty for the zone apex.
    pub subdomain: String,
    pub ip_provider: String,
    pub ipv6_provider: String,
    /// Also reconcile the AAAA record.
    pub enable_ipv6: bool,
    /// Resolve the public IP with a DNS TXT query instead of the HTTP echo service.
    pub ip_use_dig: bool,
    pub ttl: u32,
    /// Use `addRR` instead of `replaceRR` when no record exists yet.
    pub create_missing: bool,
    pub timeout: Duration,
    pub api_url: String,
    pub dig_nameserver_v4: IpAddr,
    pub dig_nameserver_v6: IpAddr,
}

/// ns1.google.com, which answers `o-o.myaddr.l.google.com` with the querying address.
pub fn default_dig_nameserver_v4() -> IpAddr {
    IpAddr::from([216, 239, 32, 10])
}

pub fn default_dig_nameserver_v6() -> IpAddr {
    IpAddr::from([0x2001, 0x4860, 0x4802, 0x32, 0, 0, 0, 0xa])
}

impl Config {
    /// Candidate config file locations, most specific first.
    pub fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("nfsn-dns").join("config.toml"));
        }
        paths.push(PathBuf::from("/etc/nfsn-dns/config.toml"));
        paths.push(PathBuf::from("config.toml"));
        paths
    }

    /// Load configuration from the given file (or the first existing default
    /// location) merged with the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => ConfigFile::load_from(path)?,
            None => match Self::candidate_paths().into_iter().find(|p| p.exists()) {
                Some(path) => ConfigFile::load_from(&path)?,
                None => ConfigFile::default(),
            },
        };

        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Merge a config file with an environment lookup. Environment values win.
    pub fn resolve<F>(file: ConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str, file_value: Option<String>| -> Option<String> {
            env(key)
                .or_else(|| file_value.map(|v| resolve_env(&v, &env)))
                .filter(|v| !v.is_empty())
        };
        let flag = |key: &str, file_value: Option<bool>| -> Result<bool> {
            match env(key) {
                Some(value) => parse_bool(key, &value),
                None => Ok(file_value.unwrap_or(false)),
            }
        };

        let username = required("USERNAME", string("USERNAME", file.username))?;
        let api_key = required("API_KEY", string("API_KEY", file.api_key))?;
        let domain = required("DOMAIN", string("DOMAIN", file.domain))?;

        let ttl = match env("TTL") {
            Some(value) => parse_number("TTL", &value)?,
            None => file.ttl.unwrap_or(DEFAULT_TTL),
        };
        let timeout_secs = match env("HTTP_TIMEOUT") {
            Some(value) => parse_number("HTTP_TIMEOUT", &value)?,
            None => file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };
        if timeout_secs == 0 {
            return Err(NfsnError::Config(
                "HTTP_TIMEOUT must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            credentials: Credentials::new(username, api_key),
            domain,
            subdomain: string("SUBDOMAIN", file.subdomain).unwrap_or_default(),
            ip_provider: string("IP_PROVIDER", file.ip_provider)
                .unwrap_or_else(|| DEFAULT_IPV4_PROVIDER.to_string()),
            ipv6_provider: string("IPV6_PROVIDER", file.ipv6_provider)
                .unwrap_or_else(|| DEFAULT_IPV6_PROVIDER.to_string()),
            enable_ipv6: flag("ENABLE_IPV6", file.enable_ipv6)?,
            ip_use_dig: flag("IP_USE_DIG", file.ip_use_dig)?,
            ttl,
            create_missing: flag("CREATE_MISSING", file.create_missing)?,
            timeout: Duration::from_secs(timeout_secs),
            api_url: string("NFSN_API_URL", file.api_url)
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            dig_nameserver_v4: file
                .dig_nameserver_v4
                .unwrap_or_else(default_dig_nameserver_v4),
            dig_nameserver_v6: file
                .dig_nameserver_v6
                .unwrap_or_else(default_dig_nameserver_v6),
        })
    }

    /// Fully qualified name of the managed record.
    pub fn display_name(&self) -> String {
        if self.subdomain.is_empty() {
            self.domain.clone()
        } else {
            format!("{}.{}", self.subdomain, self.domain)
        }
    }
}

impl ConfigFile {
    /// Load a config file from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let file: ConfigFile = toml::from_str(&content)?;
        Ok(file)
    }
}

fn required(key: &str, value: Option<String>) -> Result<String> {
    value.ok_or_else(|| {
        NfsnError::Config(format!(
            "Please ensure {} is set to a value before running",
            key
        ))
    })
}

/// Resolve environment variable references (values starting with $).
fn resolve_env<F>(value: &str, env: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(var_name) = value.strip_prefix('$') {
        env(var_name).unwrap_or_else(|| {
            tracing::warn!("Environment variable {} not set", var_name);
            String::new()
        })
    } else {
        value.to_string()
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(NfsnError::Config(format!(
            "{} must be a boolean, got {:?}",
            key, other
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| NfsnError::Config(format!("{} must be a number, got {:?}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn base_env() -> Vec<(&'static str, &'static str)> {
        vec![
            ("USERNAME", "alice"),
            ("API_KEY", "s3cret"),
            ("DOMAIN", "example.com"),
        ]
    }

    #[test]
    fn test_defaults_from_env_only() {
        let config = Config::resolve(ConfigFile::default(), env_from(&base_env())).unwrap();

        assert_eq!(config.credentials.username, "alice");
        assert_eq!(config.domain, "example.com");
        assert_eq!(config.subdomain, "");
        assert_eq!(config.ip_provider, DEFAULT_IPV4_PROVIDER);
        assert_eq!(config.ipv6_provider, DEFAULT_IPV6_PROVIDER);
        assert_eq!(config.ttl, 3600);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert!(!config.enable_ipv6);
        assert!(!config.ip_use_dig);
        assert!(!config.create_missing);
        assert_eq!(config.display_name(), "example.com");
    }

    #[test]
    fn test_missing_required_value() {
        let env = env_from(&[("USERNAME", "alice"), ("DOMAIN", "example.com")]);
        let err = Config::resolve(ConfigFile::default(), env).unwrap_err();

        assert!(matches!(err, NfsnError::Config(ref msg) if msg.contains("API_KEY")));
    }

    #[test]
    fn test_env_overrides_file() {
        let file: ConfigFile = toml::from_str(
            r#"
            username = "bob"
            api_key = "$NFSN_KEY"
            domain = "example.org"
            subdomain = "home"
            enable_ipv6 = true
            ttl = 600
            "#,
        )
        .unwrap();

        let mut pairs = base_env();
        pairs.retain(|(k, _)| *k != "API_KEY");
        pairs.push(("NFSN_KEY", "from-env"));
        pairs.push(("SUBDOMAIN", "www"));
        pairs.push(("IP_USE_DIG", "yes"));

        let config = Config::resolve(file, env_from(&pairs)).unwrap();

        assert_eq!(config.credentials.username, "alice");
        assert_eq!(config.credentials.api_key, "from-env");
        assert_eq!(config.domain, "example.com");
        assert_eq!(config.subdomain, "www");
        assert!(config.enable_ipv6);
        assert!(config.ip_use_dig);
        assert_eq!(config.ttl, 600);
        assert_eq!(config.display_name(), "www.example.com");
    }

    #[test]
    fn test_invalid_bool() {
        let mut pairs = base_env();
        pairs.push(("ENABLE_IPV6", "maybe"));
        let err = Config::resolve(ConfigFile::default(), env_from(&pairs)).unwrap_err();
        assert!(matches!(err, NfsnError::Config(_)));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut pairs = base_env();
        pairs.push(("HTTP_TIMEOUT", "0"));
        assert!(Config::resolve(ConfigFile::default(), env_from(&pairs)).is_err());
    }

    #[test]
    fn test_credentials_debug_redacts_key() {
        let creds = Credentials::new("alice", "s3cret");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("s3cret"));
    }

    #[test]
    fn test_default_nameservers() {
        assert_eq!(default_dig_nameserver_v4().to_string(), "216.239.32.10");
        assert_eq!(default_dig_nameserver_v6().to_string(), "2001:4860:4802:32::a");
    }
}
