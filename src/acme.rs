//! ACME `dns-01` challenge records.
//!
//! Hook operations for an external ACME client: publish the validation token as
//! a TXT record and remove it again once the order is validated.

use crate::error::Result;
use crate::nfsn::DnsService;
use crate::record::RecordType;

/// TTL of challenge records.
pub const CHALLENGE_TTL: u32 = 300;

pub struct ChallengeManager {
    records: DnsService,
}

impl ChallengeManager {
    pub fn new(records: DnsService) -> Self {
        Self { records }
    }

    /// Publish `token` as a TXT record at `name`.
    pub async fn create_challenge(&self, name: &str, domain: &str, token: &str) -> Result<()> {
        self.records
            .add_record(domain, name, RecordType::Txt, token, CHALLENGE_TTL)
            .await?;
        tracing::info!(%domain, %name, value = %token, "Created TXT record");
        Ok(())
    }

    /// Remove the TXT record at `name`. Returns `false` when there was none.
    pub async fn delete_challenge(&self, name: &str, domain: &str) -> Result<bool> {
        let value = match self
            .records
            .fetch_record_data(name, domain, RecordType::Txt)
            .await?
        {
            Some(value) => value,
            None => {
                tracing::info!(%domain, %name, "No TXT record found, skipping deletion");
                return Ok(false);
            }
        };

        self.records
            .remove_record(domain, name, RecordType::Txt, &value)
            .await?;
        tracing::info!(%domain, %name, "Deleted TXT record");
        Ok(true)
    }
}
