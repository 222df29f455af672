//! Domain-level resource record operations.

use super::client::NfsnClient;
use super::response::ApiResponse;
use crate::error::Result;
use crate::record::{RecordFilter, RecordType, ResourceRecord};

/// Record operations on `/dns/{domain}/…`. Each method is a single API call.
#[derive(Debug, Clone)]
pub struct DnsService {
    client: NfsnClient,
}

impl DnsService {
    pub fn new(client: NfsnClient) -> Self {
        Self { client }
    }

    /// List the records of `domain`, narrowed by the provider-side filter.
    pub async fn list_records(
        &self,
        domain: &str,
        filter: &RecordFilter,
    ) -> Result<Vec<ResourceRecord>> {
        let mut form: Vec<(&str, &str)> = Vec::new();
        if let Some(name) = &filter.name {
            form.push(("name", name.as_str()));
        }
        if let Some(record_type) = &filter.record_type {
            form.push(("type", record_type.as_str()));
        }

        let response = self.client.call(&rr_path(domain, "listRRs"), &form).await?;
        response.records()
    }

    /// Data of the first record named `name` of the given type, if any.
    ///
    /// Meant for names that hold a single value; with several matches the
    /// provider's ordering decides which one is returned.
    pub async fn fetch_record_data(
        &self,
        name: &str,
        domain: &str,
        record_type: RecordType,
    ) -> Result<Option<String>> {
        let filter = RecordFilter::new().name(name).record_type(record_type.clone());
        let records = self.list_records(domain, &filter).await?;

        let data = records
            .into_iter()
            .find(|record| record.name == name)
            .map(|record| record.data);

        if data.is_none() {
            tracing::debug!(%domain, %name, %record_type, "No record found");
        }
        Ok(data)
    }

    /// Add a record. The provider rejects an exact duplicate with an embedded
    /// error, which is logged and returned rather than raised.
    pub async fn add_record(
        &self,
        domain: &str,
        name: &str,
        record_type: RecordType,
        data: &str,
        ttl: u32,
    ) -> Result<ApiResponse> {
        let ttl = ttl.to_string();
        let form = [
            ("name", name),
            ("type", record_type.as_str()),
            ("data", data),
            ("ttl", ttl.as_str()),
        ];
        tracing::info!(%domain, %name, %record_type, %data, "Adding record");
        self.client.call(&rr_path(domain, "addRR"), &form).await
    }

    /// Replace every record of `(name, type)` with a single record holding `data`.
    pub async fn replace_record(
        &self,
        domain: &str,
        name: &str,
        record_type: RecordType,
        data: &str,
        ttl: u32,
    ) -> Result<ApiResponse> {
        let ttl = ttl.to_string();
        let form = [
            ("name", name),
            ("type", record_type.as_str()),
            ("data", data),
            ("ttl", ttl.as_str()),
        ];
        tracing::info!(%domain, %name, %record_type, %data, "Replacing record");
        self.client.call(&rr_path(domain, "replaceRR"), &form).await
    }

    /// Remove the record matching `(name, type, data)` exactly. Removing a
    /// record that does not exist comes back as an empty response.
    pub async fn remove_record(
        &self,
        domain: &str,
        name: &str,
        record_type: RecordType,
        data: &str,
    ) -> Result<ApiResponse> {
        let form = [
            ("name", name),
            ("type", record_type.as_str()),
            ("data", data),
        ];
        tracing::info!(%domain, %name, %record_type, "Removing record");
        self.client.call(&rr_path(domain, "removeRR"), &form).await
    }
}

fn rr_path(domain: &str, action: &str) -> String {
    format!("/dns/{}/{}", domain, action)
}
