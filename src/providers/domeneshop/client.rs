use log::debug;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, LOCATION};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::auth::credentials::Credentials;
use crate::dns::record::{DnsRecord, validate_record};
use crate::providers::domeneshop::error::DomeneshopProviderError;
use crate::providers::domeneshop::types::*;

pub const DOMENESHOP_API_BASE: &str = "https://api.domeneshop.no/v0";

pub struct DomeneshopConfig {
    pub api_url: String,
    pub timeout: Duration,
}

impl Default for DomeneshopConfig {
    fn default() -> Self {
        Self {
            api_url: DOMENESHOP_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Client for the Domeneshop `/domains` and `/domains/{id}/dns` endpoints.
pub struct DomeneshopProvider {
    config: DomeneshopConfig,
    client: Client,
    credentials: Credentials,
}

impl DomeneshopProvider {
    pub fn new(
        config: DomeneshopConfig,
        credentials: Credentials,
    ) -> Result<Self, DomeneshopProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            config,
            client,
            credentials,
        })
    }

    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&DnsRecord>,
    ) -> Result<Response, DomeneshopProviderError> {
        let url = format!("{}{}", self.config.api_url.trim_end_matches('/'), endpoint);
        debug!("{method} {url}");

        let mut request = self
            .client
            .request(method, url)
            .basic_auth(&self.credentials.token, Some(&self.credentials.secret));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!("Response status: {status}");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = DomeneshopErrorBody::parse(&body);
        Err(DomeneshopProviderError::api(status.as_u16(), &error))
    }

    async fn handle_request<T>(&self, endpoint: &str) -> Result<T, DomeneshopProviderError>
    where
        T: DeserializeOwned,
    {
        let response = self.send(Method::GET, endpoint, None).await?;
        Ok(response.json().await?)
    }

    pub async fn get_domains(&self) -> Result<Vec<DomeneshopDomain>, DomeneshopProviderError> {
        self.handle_request("/domains").await
    }

    pub async fn get_domain(
        &self,
        domain_id: u64,
    ) -> Result<DomeneshopDomain, DomeneshopProviderError> {
        self.handle_request(&format!("/domains/{domain_id}")).await
    }

    pub async fn get_records(
        &self,
        domain_id: u64,
    ) -> Result<Vec<DnsRecord>, DomeneshopProviderError> {
        self.handle_request(&format!("/domains/{domain_id}/dns")).await
    }

    pub async fn get_record(
        &self,
        domain_id: u64,
        record_id: u64,
    ) -> Result<DnsRecord, DomeneshopProviderError> {
        self.handle_request(&format!("/domains/{domain_id}/dns/{record_id}")).await
    }

    /// Creates a record and returns the id taken from the `Location` header.
    pub async fn create_record(
        &self,
        domain_id: u64,
        record: &DnsRecord,
    ) -> Result<u64, DomeneshopProviderError> {
        validate_record(record)?;
        let response = self
            .send(
                Method::POST,
                &format!("/domains/{domain_id}/dns"),
                Some(record),
            )
            .await?;

        let location = response
            .headers()
            .get(LOCATION)
            .ok_or(DomeneshopProviderError::MissingLocation)?;
        let location = location
            .to_str()
            .map_err(|_| DomeneshopProviderError::InvalidLocation(format!("{location:?}")))?;
        record_id_from_location(location)
    }

    pub async fn modify_record(
        &self,
        domain_id: u64,
        record_id: u64,
        record: &DnsRecord,
    ) -> Result<(), DomeneshopProviderError> {
        validate_record(record)?;
        self.send(
            Method::PUT,
            &format!("/domains/{domain_id}/dns/{record_id}"),
            Some(record),
        )
        .await?;
        Ok(())
    }

    pub async fn delete_record(
        &self,
        domain_id: u64,
        record_id: u64,
    ) -> Result<(), DomeneshopProviderError> {
        self.send(
            Method::DELETE,
            &format!("/domains/{domain_id}/dns/{record_id}"),
            None,
        )
        .await?;
        Ok(())
    }
}

/// `.../domains/1/dns/42` -> `42`
pub(crate) fn record_id_from_location(location: &str) -> Result<u64, DomeneshopProviderError> {
    location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse().ok())
        .ok_or_else(|| DomeneshopProviderError::InvalidLocation(location.to_string()))
}
