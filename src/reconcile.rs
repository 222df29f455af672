//! Compare-and-correct of a provider A/AAAA record against the live public IP.

use crate::config::{Config, DEFAULT_TTL};
use crate::detector::{parse_ip, IpResolver, IpSource, IpVersion};
use crate::error::Result;
use crate::nfsn::{DnsService, NfsnClient};
use std::net::IpAddr;

/// With no record for a name, `listRRs` may answer with the provider's own
/// nameserver domain as the data.
pub const UNSET_SENTINEL: &str = "nearlyfreespeech.net";

/// Mutation performed by a reconcile pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    Unchanged,
    Added,
    Replaced,
}

/// Outcome of [`ReconcileEngine::reconcile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileResult {
    /// Provider record already held the live IP; nothing was changed.
    pub matched: bool,
    /// Provider value before the pass, if set.
    pub before: Option<IpAddr>,
    /// Live public IP the record was reconciled to.
    pub after: IpAddr,
    pub action: ReconcileAction,
    /// Confirmation read shows the provider now holds `after`.
    pub converged: bool,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Aligns a provider record with the caller's current public IP.
///
/// One pass is fetch, resolve, compare, correct, confirm. A mismatch after the
/// correction is reported, never retried.
pub struct ReconcileEngine {
    records: DnsService,
    ip_source: Box<dyn IpSource>,
    ttl: u32,
    create_missing: bool,
}

impl ReconcileEngine {
    pub fn new(records: DnsService, ip_source: Box<dyn IpSource>) -> Self {
        Self {
            records,
            ip_source,
            ttl: DEFAULT_TTL,
            create_missing: false,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let records = DnsService::new(NfsnClient::from_config(config)?);
        let ip_source = Box::new(IpResolver::from_config(config)?);

        Ok(Self::new(records, ip_source)
            .with_ttl(config.ttl)
            .with_create_missing(config.create_missing))
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Use `addRR` instead of `replaceRR` when the provider has no record.
    pub fn with_create_missing(mut self, create_missing: bool) -> Self {
        self.create_missing = create_missing;
        self
    }

    pub async fn reconcile(
        &self,
        domain: &str,
        subdomain: &str,
        version: IpVersion,
    ) -> Result<ReconcileResult> {
        let record_type = version.record_type();
        let fqdn = fqdn(domain, subdomain);

        let existing = self
            .records
            .fetch_record_data(subdomain, domain, record_type.clone())
            .await?;
        let current = self.ip_source.current_ip(version).await?;

        let unset = existing.as_deref().map_or(true, is_unset_sentinel);
        let before = match existing.as_deref() {
            Some(data) if !unset => Some(parse_ip(data)?),
            _ => None,
        };

        if before == Some(current) {
            tracing::info!(%fqdn, %current, "IPs still match");
            return Ok(ReconcileResult {
                matched: true,
                before,
                after: current,
                action: ReconcileAction::Unchanged,
                converged: true,
                timestamp: chrono::Utc::now(),
            });
        }

        match (&existing, before) {
            (Some(data), None) => {
                tracing::info!(%fqdn, %data, "The domain IP doesn't appear to be set yet")
            }
            (None, _) => tracing::info!(%fqdn, "No IP address is currently set"),
            (Some(_), Some(before)) => {
                tracing::info!(%fqdn, %current, domain_ip = %before, "Current IP doesn't match domain IP")
            }
        }

        let data = current.to_string();
        tracing::info!("Setting {} to {}...", fqdn, data);
        let action = if existing.is_none() && self.create_missing {
            self.records
                .add_record(domain, subdomain, record_type.clone(), &data, self.ttl)
                .await?;
            ReconcileAction::Added
        } else {
            self.records
                .replace_record(domain, subdomain, record_type.clone(), &data, self.ttl)
                .await?;
            ReconcileAction::Replaced
        };

        let confirmed = match self
            .records
            .fetch_record_data(subdomain, domain, record_type)
            .await?
        {
            Some(data) if !is_unset_sentinel(&data) => Some(parse_ip(&data)?),
            _ => None,
        };
        let converged = confirmed == Some(current);

        if converged {
            tracing::info!(%fqdn, %current, "IPs match now");
        } else {
            tracing::warn!(
                %fqdn,
                %current,
                domain_ip = confirmed.map(|ip| ip.to_string()).unwrap_or_else(|| "UNSET".to_string()),
                "They still don't match"
            );
        }

        Ok(ReconcileResult {
            matched: false,
            before,
            after: current,
            action,
            converged,
            timestamp: chrono::Utc::now(),
        })
    }
}

fn is_unset_sentinel(data: &str) -> bool {
    data.starts_with(UNSET_SENTINEL)
}

fn fqdn(domain: &str, subdomain: &str) -> String {
    if subdomain.is_empty() {
        domain.to_string()
    } else {
        format!("{}.{}", subdomain, domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::detector::MockIpSource;
    use crate::error::NfsnError;
    use mockall::predicate::eq;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_string, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn records_for(server: &MockServer) -> DnsService {
        DnsService::new(
            NfsnClient::with_base_url(
                Credentials::new("alice", "s3cret"),
                server.uri(),
                Duration::from_secs(5),
            )
            .unwrap(),
        )
    }

    fn ip_source(version: IpVersion, ip: &'static str, times: usize) -> Box<MockIpSource> {
        let mut source = MockIpSource::new();
        source
            .expect_current_ip()
            .with(eq(version))
            .times(times)
            .returning(move |_| Ok(ip.parse().unwrap()));
        Box::new(source)
    }

    fn a_record(name: &str, data: &str) -> serde_json::Value {
        json!({"name": name, "type": "A", "data": data, "ttl": "3600", "scope": "member"})
    }

    async fn mount_list(server: &MockServer, body: serde_json::Value, times: Option<u64>) {
        let mock = Mock::given(method("POST"))
            .and(path("/dns/example.com/listRRs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body));
        match times {
            Some(n) => mock.up_to_n_times(n).mount(server).await,
            None => mock.mount(server).await,
        }
    }

    async fn mount_mutation(server: &MockServer, action: &str, times: u64) {
        Mock::given(method("POST"))
            .and(path(format!("/dns/example.com/{}", action)))
            .respond_with(ResponseTemplate::new(200))
            .expect(times)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_matched_short_circuits() {
        let mock_server = MockServer::start().await;
        mount_list(&mock_server, json!([a_record("www", "203.0.113.5")]), None).await;
        mount_mutation(&mock_server, "addRR", 0).await;
        mount_mutation(&mock_server, "replaceRR", 0).await;

        let engine = ReconcileEngine::new(
            records_for(&mock_server),
            ip_source(IpVersion::V4, "203.0.113.5", 1),
        );
        let result = engine
            .reconcile("example.com", "www", IpVersion::V4)
            .await
            .unwrap();

        assert!(result.matched);
        assert_eq!(result.action, ReconcileAction::Unchanged);
        assert_eq!(result.before, Some("203.0.113.5".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_creates_missing_record() {
        let mock_server = MockServer::start().await;
        mount_list(&mock_server, json!([]), Some(1)).await;
        mount_list(&mock_server, json!([a_record("www", "203.0.113.5")]), None).await;

        Mock::given(method("POST"))
            .and(path("/dns/example.com/addRR"))
            .and(body_string("name=www&type=A&data=203.0.113.5&ttl=3600"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;
        mount_mutation(&mock_server, "replaceRR", 0).await;

        let engine = ReconcileEngine::new(
            records_for(&mock_server),
            ip_source(IpVersion::V4, "203.0.113.5", 1),
        )
        .with_create_missing(true);

        let result = engine
            .reconcile("example.com", "www", IpVersion::V4)
            .await
            .unwrap();

        assert!(!result.matched);
        assert_eq!(result.before, None);
        assert_eq!(result.after, "203.0.113.5".parse::<IpAddr>().unwrap());
        assert_eq!(result.action, ReconcileAction::Added);
        assert!(result.converged);
    }

    #[tokio::test]
    async fn test_missing_record_replaced_by_default() {
        let mock_server = MockServer::start().await;
        mount_list(&mock_server, json!([]), Some(1)).await;
        mount_list(&mock_server, json!([a_record("", "198.51.100.7")]), None).await;
        mount_mutation(&mock_server, "addRR", 0).await;
        mount_mutation(&mock_server, "replaceRR", 1).await;

        let engine = ReconcileEngine::new(
            records_for(&mock_server),
            ip_source(IpVersion::V4, "198.51.100.7", 1),
        );
        let result = engine
            .reconcile("example.com", "", IpVersion::V4)
            .await
            .unwrap();

        assert_eq!(result.action, ReconcileAction::Replaced);
        assert!(result.converged);
    }

    #[tokio::test]
    async fn test_second_pass_is_idempotent() {
        let mock_server = MockServer::start().await;
        mount_list(&mock_server, json!([a_record("www", "192.0.2.1")]), Some(1)).await;
        mount_list(&mock_server, json!([a_record("www", "203.0.113.5")]), None).await;
        mount_mutation(&mock_server, "addRR", 0).await;
        mount_mutation(&mock_server, "replaceRR", 1).await;

        let engine = ReconcileEngine::new(
            records_for(&mock_server),
            ip_source(IpVersion::V4, "203.0.113.5", 2),
        );

        let first = engine
            .reconcile("example.com", "www", IpVersion::V4)
            .await
            .unwrap();
        assert!(!first.matched);
        assert_eq!(first.before, Some("192.0.2.1".parse().unwrap()));
        assert!(first.converged);

        let second = engine
            .reconcile("example.com", "www", IpVersion::V4)
            .await
            .unwrap();
        assert!(second.matched);
        assert_eq!(second.action, ReconcileAction::Unchanged);
    }

    #[tokio::test]
    async fn test_ipv6_structured_equality() {
        let mock_server = MockServer::start().await;
        mount_list(
            &mock_server,
            json!([{"name": "www", "type": "AAAA", "data": "2001:0db8:0000:0000:0000:0000:0000:0001", "ttl": "3600"}]),
            None,
        )
        .await;
        mount_mutation(&mock_server, "replaceRR", 0).await;

        let engine = ReconcileEngine::new(
            records_for(&mock_server),
            ip_source(IpVersion::V6, "2001:db8::1", 1),
        );
        let result = engine
            .reconcile("example.com", "www", IpVersion::V6)
            .await
            .unwrap();

        assert!(result.matched);
    }

    #[tokio::test]
    async fn test_nameserver_sentinel_treated_as_unset() {
        let mock_server = MockServer::start().await;
        mount_list(
            &mock_server,
            json!([a_record("www", "nearlyfreespeech.net.")]),
            Some(1),
        )
        .await;
        mount_list(&mock_server, json!([a_record("www", "203.0.113.5")]), None).await;
        mount_mutation(&mock_server, "addRR", 0).await;
        mount_mutation(&mock_server, "replaceRR", 1).await;

        let engine = ReconcileEngine::new(
            records_for(&mock_server),
            ip_source(IpVersion::V4, "203.0.113.5", 1),
        )
        .with_create_missing(true);

        let result = engine
            .reconcile("example.com", "www", IpVersion::V4)
            .await
            .unwrap();

        assert_eq!(result.before, None);
        assert_eq!(result.action, ReconcileAction::Replaced);
        assert!(result.converged);
    }

    #[tokio::test]
    async fn test_reports_non_convergence_without_retry() {
        let mock_server = MockServer::start().await;
        mount_list(&mock_server, json!([a_record("www", "192.0.2.1")]), None).await;
        mount_mutation(&mock_server, "replaceRR", 1).await;

        let engine = ReconcileEngine::new(
            records_for(&mock_server),
            ip_source(IpVersion::V4, "203.0.113.5", 1),
        )
        .with_ttl(600);

        let result = engine
            .reconcile("example.com", "www", IpVersion::V4)
            .await
            .unwrap();

        assert!(!result.matched);
        assert!(!result.converged);
        assert_eq!(result.action, ReconcileAction::Replaced);
    }

    #[tokio::test]
    async fn test_invalid_provider_data_is_parse_error() {
        let mock_server = MockServer::start().await;
        mount_list(&mock_server, json!([a_record("www", "not-an-ip")]), None).await;
        mount_mutation(&mock_server, "replaceRR", 0).await;

        let engine = ReconcileEngine::new(
            records_for(&mock_server),
            ip_source(IpVersion::V4, "203.0.113.5", 1),
        );
        let err = engine
            .reconcile("example.com", "www", IpVersion::V4)
            .await
            .unwrap_err();

        assert!(matches!(err, NfsnError::Parse(_)));
    }

    #[tokio::test]
    async fn test_ip_source_failure_aborts() {
        let mock_server = MockServer::start().await;
        mount_list(&mock_server, json!([a_record("www", "192.0.2.1")]), None).await;
        mount_mutation(&mock_server, "replaceRR", 0).await;

        let mut source = MockIpSource::new();
        source
            .expect_current_ip()
            .returning(|_| Err(NfsnError::Transport("connection refused".to_string())));

        let engine = ReconcileEngine::new(records_for(&mock_server), Box::new(source));
        let err = engine
            .reconcile("example.com", "www", IpVersion::V4)
            .await
            .unwrap_err();

        assert!(matches!(err, NfsnError::Transport(_)));
    }

    #[test]
    fn test_fqdn() {
        assert_eq!(fqdn("example.com", ""), "example.com");
        assert_eq!(fqdn("example.com", "www"), "www.example.com");
    }
}
