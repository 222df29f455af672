//! Public IP detection.
//!
//! Two methods are available: an HTTP echo service that returns the caller's
//! address as plain text, and a TXT query for `o-o.myaddr.l.google.com` sent
//! straight to Google's authoritative nameserver. Both yield a parsed
//! [`IpAddr`], so comparisons downstream do not depend on the method.

use crate::config::{default_dig_nameserver_v4, default_dig_nameserver_v6, Config};
use crate::error::{NfsnError, Result};
use crate::record::RecordType;
use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::rr::rdata::TXT;
use hickory_resolver::TokioResolver;
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

/// Name whose TXT record echoes the address of the querying client.
pub const MYADDR_NAME: &str = "o-o.myaddr.l.google.com.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    /// Record type holding addresses of this family.
    pub fn record_type(self) -> RecordType {
        match self {
            IpVersion::V4 => RecordType::A,
            IpVersion::V6 => RecordType::Aaaa,
        }
    }

    pub fn matches(self, ip: &IpAddr) -> bool {
        match self {
            IpVersion::V4 => ip.is_ipv4(),
            IpVersion::V6 => ip.is_ipv6(),
        }
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpVersion::V4 => f.write_str("IPv4"),
            IpVersion::V6 => f.write_str("IPv6"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveMethod {
    #[default]
    HttpEcho,
    DnsQuery,
}

/// Source of the caller's current public address.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IpSource: Send + Sync {
    async fn current_ip(&self, version: IpVersion) -> Result<IpAddr>;
}

/// Resolves the public IP through an HTTP echo service or a DNS TXT query.
pub struct IpResolver {
    client: reqwest::Client,
    ipv4_url: String,
    ipv6_url: String,
    nameserver_v4: IpAddr,
    nameserver_v6: IpAddr,
    timeout: Duration,
    method: ResolveMethod,
}

impl IpResolver {
    /// Create a resolver with custom echo services.
    pub fn with_services(ipv4_url: String, ipv6_url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            ipv4_url,
            ipv6_url,
            nameserver_v4: default_dig_nameserver_v4(),
            nameserver_v6: default_dig_nameserver_v6(),
            timeout,
            method: ResolveMethod::HttpEcho,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let method = if config.ip_use_dig {
            ResolveMethod::DnsQuery
        } else {
            ResolveMethod::HttpEcho
        };

        Ok(Self::with_services(
            config.ip_provider.clone(),
            config.ipv6_provider.clone(),
            config.timeout,
        )?
        .with_nameservers(config.dig_nameserver_v4, config.dig_nameserver_v6)
        .with_method(method))
    }

    pub fn with_nameservers(mut self, v4: IpAddr, v6: IpAddr) -> Self {
        self.nameserver_v4 = v4;
        self.nameserver_v6 = v6;
        self
    }

    /// Method used by the [`IpSource`] implementation.
    pub fn with_method(mut self, method: ResolveMethod) -> Self {
        self.method = method;
        self
    }

    pub fn method(&self) -> ResolveMethod {
        self.method
    }

    /// Resolve the current public address of the given family.
    pub async fn resolve_current_ip(
        &self,
        version: IpVersion,
        method: ResolveMethod,
    ) -> Result<IpAddr> {
        let text = match method {
            ResolveMethod::HttpEcho => self.http_echo(version).await?,
            ResolveMethod::DnsQuery => self.dns_query(version).await?,
        };

        let ip = parse_ip(&text)?;
        if !version.matches(&ip) {
            return Err(NfsnError::Parse(format!(
                "expected an {} address, got {}",
                version, ip
            )));
        }

        tracing::debug!(%ip, %version, ?method, "Detected public IP");
        Ok(ip)
    }

    async fn http_echo(&self, version: IpVersion) -> Result<String> {
        let url = match version {
            IpVersion::V4 => &self.ipv4_url,
            IpVersion::V6 => &self.ipv6_url,
        };

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(NfsnError::Protocol {
                status: response.status().as_u16(),
                message: format!("IP echo service {} failed", url),
            });
        }

        Ok(response.text().await?.trim().to_string())
    }

    async fn dns_query(&self, version: IpVersion) -> Result<String> {
        let nameserver = match version {
            IpVersion::V4 => self.nameserver_v4,
            IpVersion::V6 => self.nameserver_v6,
        };

        let config = ResolverConfig::from_parts(
            None,
            vec![],
            NameServerConfigGroup::from_ips_clear(&[nameserver], 53, true),
        );
        let mut opts = ResolverOpts::default();
        opts.timeout = self.timeout;
        opts.attempts = 1;
        opts.cache_size = 0;

        let resolver = TokioResolver::builder_with_config(config, TokioConnectionProvider::default())
            .with_options(opts)
            .build();

        let lookup = resolver.txt_lookup(MYADDR_NAME).await?;
        address_from_txt(lookup.iter())
    }
}

#[async_trait]
impl IpSource for IpResolver {
    async fn current_ip(&self, version: IpVersion) -> Result<IpAddr> {
        self.resolve_current_ip(version, self.method).await
    }
}

/// Address text of the first TXT answer. Character strings of one record are
/// concatenated before the first token is taken.
fn address_from_txt<'a>(mut answers: impl Iterator<Item = &'a TXT>) -> Result<String> {
    let txt = answers
        .next()
        .map(|txt| {
            txt.iter()
                .map(|data| String::from_utf8_lossy(data).into_owned())
                .collect::<String>()
        })
        .ok_or_else(|| NfsnError::Parse(format!("no TXT data for {}", MYADDR_NAME)))?;

    Ok(first_token(&txt))
}

/// First whitespace-separated token with surrounding quotes removed.
fn first_token(txt: &str) -> String {
    txt.split_whitespace()
        .next()
        .unwrap_or_default()
        .trim_matches('"')
        .to_string()
}

/// Parse a trimmed IP literal.
pub fn parse_ip(text: &str) -> Result<IpAddr> {
    let text = text.trim();
    text.parse()
        .map_err(|_| NfsnError::Parse(format!("Invalid IP address: {:?}", text)))
}
