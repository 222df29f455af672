//! Signed HTTP transport for the NFSN API.

use super::response::ApiResponse;
use super::signer::{RequestSigner, AUTH_HEADER};
use crate::config::{Config, Credentials, DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS};
use crate::error::{NfsnError, Result};
use std::time::Duration;

/// API client. Every call is a single signed `POST` with a form-urlencoded body.
#[derive(Debug, Clone)]
pub struct NfsnClient {
    client: reqwest::Client,
    credentials: Credentials,
    signer: RequestSigner,
    base_url: String,
}

impl NfsnClient {
    /// Create a client against the production API.
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::with_base_url(
            credentials,
            DEFAULT_API_URL.to_string(),
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// Create with custom base URL (for testing).
    pub fn with_base_url(
        credentials: Credentials,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            credentials,
            signer: RequestSigner::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_base_url(
            config.credentials.clone(),
            config.api_url.clone(),
            config.timeout,
        )
    }

    /// Issue a signed call to `path` with the given form fields.
    ///
    /// Transport failures and non-2xx statuses are errors. An embedded
    /// `error` payload is logged and returned as [`ApiResponse::Error`].
    pub async fn call(&self, path: &str, form: &[(&str, &str)]) -> Result<ApiResponse> {
        let body = encode_form(form);
        let auth = self.signer.sign(&self.credentials, path, &body);
        let url = format!("{}{}", self.base_url, path);

        tracing::debug!(%path, "Calling provider API");

        let response = self
            .client
            .post(&url)
            .header(AUTH_HEADER, auth)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = match ApiResponse::from_body(&text) {
                Ok(ApiResponse::Error { code, debug }) => match debug {
                    Some(debug) => format!("{}: {}", code, debug),
                    None => code,
                },
                _ if text.trim().is_empty() => status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string(),
                _ => text.trim().to_string(),
            };
            tracing::error!(%path, status = status.as_u16(), %message, "Provider request failed");
            return Err(NfsnError::Protocol {
                status: status.as_u16(),
                message,
            });
        }

        let data = ApiResponse::from_body(&text)?;
        data.validate();
        Ok(data)
    }
}

/// Encode form fields as `application/x-www-form-urlencoded`. No fields yields
/// an empty body.
pub fn encode_form(form: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(form)
        .finish()
}
