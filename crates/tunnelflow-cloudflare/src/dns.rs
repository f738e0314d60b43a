//! Cloudflare DNS API client
//!
//! Direct Cloudflare API implementation for the tunnel CNAME records.
//! Uses Bearer token authentication from the API key file.

use crate::error::{CloudflareError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tunnelflow_core::{ApiKeyStore, ApiKeys, DnsProvider, DnsRecord};

pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Cloudflare DNS manager for a single zone
pub struct CloudflareDns {
    client: reqwest::Client,
    api_token: String,
    zone_id: String,
    base_url: String,
}

impl CloudflareDns {
    /// Create a new DNS manager
    pub fn new(keys: &ApiKeys) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_token: keys.api_token.clone(),
            zone_id: keys.zone_id.clone(),
            base_url: CLOUDFLARE_API_BASE.to_string(),
        }
    }

    /// Load the API key file and build a client from it
    ///
    /// Fails without touching the network when the file is incomplete.
    pub async fn from_keys_file(path: impl AsRef<Path>) -> tunnelflow_core::Result<Self> {
        let keys = ApiKeyStore::new(path).load().await?;
        Ok(Self::new(&keys))
    }

    /// Point the client at another API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    fn records_url(&self) -> String {
        format!("{}/zones/{}/dns_records", self.base_url, self.zone_id)
    }

    /// Find records whose name matches `hostname` exactly
    pub async fn find_records(&self, hostname: &str) -> Result<Vec<DnsRecord>> {
        let response = self
            .client
            .get(self.records_url())
            .query(&[("name", hostname)])
            .bearer_auth(&self.api_token)
            .send()
            .await?;

        let records: Vec<ApiDnsRecord> = parse_response(response).await?;
        Ok(records.into_iter().map(Into::into).collect())
    }

    /// Create a proxied CNAME record
    pub async fn create_record(&self, hostname: &str, target: &str) -> Result<DnsRecord> {
        let request_body = CreateDnsRecordRequest {
            r#type: "CNAME".to_string(),
            name: hostname.to_string(),
            content: target.to_string(),
            ttl: 1, // Auto
            proxied: true,
        };

        let response = self
            .client
            .post(self.records_url())
            .bearer_auth(&self.api_token)
            .json(&request_body)
            .send()
            .await?;

        let record: ApiDnsRecord = parse_response(response).await?;
        Ok(record.into())
    }
}

#[async_trait]
impl DnsProvider for CloudflareDns {
    async fn record_exists(&self, hostname: &str) -> tunnelflow_core::Result<bool> {
        let records = self.find_records(hostname).await?;
        tracing::debug!("{} record(s) found for {}", records.len(), hostname);
        Ok(!records.is_empty())
    }

    async fn create_cname(&self, hostname: &str, target: &str) -> tunnelflow_core::Result<DnsRecord> {
        Ok(self.create_record(hostname, target).await?)
    }
}

async fn parse_response<T>(response: reqwest::Response) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(CloudflareError::ApiError(format!("{}: {}", status, body.trim())));
    }

    let api_response: ApiResponse<T> = serde_json::from_str(&body)?;

    if !api_response.success {
        let error_msg = api_response
            .errors
            .first()
            .map(|e| format!("{} (code {})", e.message, e.code))
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(CloudflareError::ApiError(error_msg));
    }

    api_response
        .result
        .ok_or_else(|| CloudflareError::ApiError("response has no result".to_string()))
}

// ============ API Types ============

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(default = "Option::default")]
    result: Option<T>,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: i32,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiDnsRecord {
    id: String,
    name: String,
    #[serde(rename = "type")]
    r#type: String,
    content: String,
}

impl From<ApiDnsRecord> for DnsRecord {
    fn from(r: ApiDnsRecord) -> Self {
        DnsRecord {
            id: r.id,
            record_type: r.r#type,
            name: r.name,
            content: r.content,
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateDnsRecordRequest {
    #[serde(rename = "type")]
    r#type: String,
    name: String,
    content: String,
    ttl: u32,
    proxied: bool,
}
