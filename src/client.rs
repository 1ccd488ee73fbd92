use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;
use serde_json::Value;

use crate::config::ResolvedConfig;
use crate::error::DexError;

pub const ENTITY_RESOURCE: &str = "pokemon";
pub const FORM_RESOURCE: &str = "pokemon-form";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub name: String,
    pub url: String,
}

pub trait CatalogClient: Send + Sync {
    fn list_resource(
        &self,
        resource: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<CatalogEntry>, DexError>;

    fn fetch_document(&self, url: &str) -> Result<Value, DexError>;

    fn fetch_binary(&self, url: &str) -> Result<Vec<u8>, DexError>;

    fn list_catalog(&self, limit: u32, offset: u32) -> Result<Vec<CatalogEntry>, DexError> {
        self.list_resource(ENTITY_RESOURCE, limit, offset)
    }
}

#[derive(Clone)]
pub struct CatalogHttpClient {
    client: Client,
    base_url: String,
    max_retries: usize,
}

impl CatalogHttpClient {
    pub fn new(config: &ResolvedConfig) -> Result<Self, DexError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("pokedex-ingest/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| DexError::Transport(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|err| DexError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            max_retries: config.max_retries,
        })
    }

    pub fn listing_url(&self, resource: &str, limit: u32, offset: u32) -> String {
        format!("{}{resource}?limit={limit}&offset={offset}", self.base_url)
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, DexError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < self.max_retries && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        tracing::debug!(status, attempt, "retrying request");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < self.max_retries && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        tracing::debug!(error = %err, attempt, "retrying request");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(DexError::Transport(err.to_string()));
                }
            }
        }
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, DexError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "catalog request failed".to_string());
        Err(DexError::Status { status, message })
    }
}

impl CatalogClient for CatalogHttpClient {
    fn list_resource(
        &self,
        resource: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<CatalogEntry>, DexError> {
        let url = self.listing_url(resource, limit, offset);
        let document = self.fetch_document(&url)?;
        parse_listing(&document)
    }

    fn fetch_document(&self, url: &str) -> Result<Value, DexError> {
        let response = self.send_with_retries(|| self.client.get(url))?;
        let response = Self::handle_status(response)?;
        response
            .json()
            .map_err(|err| DexError::MalformedPayload(format!("{url}: {err}")))
    }

    fn fetch_binary(&self, url: &str) -> Result<Vec<u8>, DexError> {
        let response = self.send_with_retries(|| self.client.get(url))?;
        let response = Self::handle_status(response)?;
        let bytes = response
            .bytes()
            .map_err(|err| DexError::Transport(err.to_string()))?;
        Ok(bytes.to_vec())
    }
}

pub fn parse_listing(document: &Value) -> Result<Vec<CatalogEntry>, DexError> {
    let results = document
        .get("results")
        .and_then(|v| v.as_array())
        .ok_or_else(|| DexError::MalformedPayload("listing has no results".to_string()))?;

    Ok(results
        .iter()
        .filter_map(|row| {
            let name = row.get("name").and_then(|v| v.as_str())?;
            let url = row.get("url").and_then(|v| v.as_str())?;
            Some(CatalogEntry {
                name: name.to_string(),
                url: url.to_string(),
            })
        })
        .collect())
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn listing_skips_incomplete_rows() {
        let document = json!({
            "count": 3,
            "results": [
                {"name": "bulbasaur", "url": "https://pokeapi.co/api/v2/pokemon/1/"},
                {"name": "ivysaur"},
                {"name": "venusaur", "url": "https://pokeapi.co/api/v2/pokemon/3/"}
            ]
        });

        let entries = parse_listing(&document).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["bulbasaur", "venusaur"]);
    }

    #[test]
    fn listing_without_results_is_malformed() {
        let err = parse_listing(&json!({"detail": "Not found."})).unwrap_err();
        assert_matches!(err, DexError::MalformedPayload(_));
    }
}
