//! Per-identifier lookup client.
//!
//! One lookup = one GET against the keyed-by-EIN endpoint, a cheap
//! substring pre-filter, then extraction of candidate URLs from the
//! configured file categories, keeping only entries the injected
//! [`RegionResolver`] maps to the target region.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument, warn};

use mrfscan_shared::{LookupDocument, MrfScanError, Result, ScanConfig};

use crate::region::RegionResolver;

/// User-Agent string for lookup requests.
const USER_AGENT: &str = concat!("mrfscan/", env!("CARGO_PKG_VERSION"));

/// Placeholder substituted with the identifier value in the URL template.
const EIN_PLACEHOLDER: &str = "{ein}";

// ---------------------------------------------------------------------------
// LookupConfig
// ---------------------------------------------------------------------------

/// Configuration for the lookup client, cut down from [`ScanConfig`].
#[derive(Debug, Clone)]
pub struct LookupConfig {
    /// Lookup URL template containing `{ein}`.
    pub url_template: String,
    /// Region code candidate URLs must resolve to.
    pub target_region: String,
    /// Response categories inspected for candidates.
    pub category_keys: Vec<String>,
    /// Raw-body substring pre-filter; `None` disables the short-circuit.
    ///
    /// A body without the marker short-circuits to an empty result with
    /// no parse. This must preserve identical output to full parsing
    /// followed by filtering: configure a marker only if every document
    /// containing target-region entries is guaranteed to contain it.
    pub prefilter_marker: Option<String>,
    /// Maximum attempts per identifier.
    pub retry_attempts: u32,
    /// Base backoff, doubled per retry.
    pub retry_backoff_ms: u64,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl From<&ScanConfig> for LookupConfig {
    fn from(config: &ScanConfig) -> Self {
        Self {
            url_template: config.lookup_url_template.clone(),
            target_region: config.target_region.clone(),
            category_keys: config.category_keys.clone(),
            prefilter_marker: config.prefilter_marker.clone(),
            retry_attempts: config.retry_attempts,
            retry_backoff_ms: config.retry_backoff_ms,
            timeout_secs: config.lookup_timeout_secs,
        }
    }
}

// ---------------------------------------------------------------------------
// EnrichmentClient
// ---------------------------------------------------------------------------

/// HTTP client performing per-EIN lookups with bounded retry.
pub struct EnrichmentClient {
    client: Client,
    config: LookupConfig,
    resolver: Arc<dyn RegionResolver>,
}

impl EnrichmentClient {
    /// Create a new client with the given configuration and resolver.
    pub fn new(config: LookupConfig, resolver: Arc<dyn RegionResolver>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MrfScanError::Lookup(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            resolver,
        })
    }

    /// One lookup attempt: the set of target-region URLs for this EIN.
    /// May legitimately be empty.
    pub async fn lookup(&self, ein: &str) -> Result<HashSet<String>> {
        let url = self.config.url_template.replace(EIN_PLACEHOLDER, ein);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| MrfScanError::Lookup(format!("{ein}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MrfScanError::Lookup(format!("{ein}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| MrfScanError::Lookup(format!("{ein}: failed to read body: {e}")))?;

        // Named pre-filter step: no marker, no matches, no parse.
        if let Some(marker) = &self.config.prefilter_marker {
            if !body.contains(marker.as_str()) {
                debug!(ein, "pre-filter marker absent, skipping parse");
                return Ok(HashSet::new());
            }
        }

        let doc: LookupDocument = serde_json::from_str(&body)
            .map_err(|e| MrfScanError::Lookup(format!("{ein}: invalid lookup document: {e}")))?;

        let mut urls = HashSet::new();
        for key in &self.config.category_keys {
            for file in doc.files_in(key) {
                let region = self.resolver.resolve(&file.displayname, &file.url);
                if region.as_deref() == Some(self.config.target_region.as_str()) {
                    urls.insert(file.url);
                }
            }
        }

        debug!(ein, matches = urls.len(), "lookup complete");
        Ok(urls)
    }

    /// Lookup with bounded retry and exponential backoff.
    ///
    /// At most `retry_attempts` attempts are made; the backoff doubles
    /// after each failure. Exhaustion returns the last error — the caller
    /// records it once. Never recursive, never unbounded.
    #[instrument(skip(self))]
    pub async fn lookup_with_retry(&self, ein: &str) -> Result<HashSet<String>> {
        let attempts = self.config.retry_attempts.max(1);
        let mut backoff = Duration::from_millis(self.config.retry_backoff_ms);

        let mut last_err = None;
        for attempt in 1..=attempts {
            match self.lookup(ein).await {
                Ok(urls) => return Ok(urls),
                Err(e) => {
                    warn!(ein, attempt, attempts, error = %e, "lookup attempt failed");
                    last_err = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(backoff).await;
                        backoff *= 2;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| MrfScanError::Lookup(format!("{ein}: no attempts made"))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::DisplayNameResolver;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LOOKUP_BODY: &str = r#"{
        "In-Network Negotiated Rates Files": [
            {"url": "https://example.com/ny.json.gz", "displayname": "NY_PPO_in-network"},
            {"url": "https://example.com/ct.json.gz", "displayname": "CT_PPO_in-network"}
        ],
        "Blue Cross Blue Shield Association Out-of-Area Rates Files": [
            {"url": "https://example.com/ooa.json.gz", "displayname": "2023-04_NY_out-of-area"}
        ],
        "Out-of-Network Allowed Amounts Files": [
            {"url": "https://example.com/oon.json.gz", "displayname": "NY_PPO_out-of-network"}
        ]
    }"#;

    fn config(server: &MockServer) -> LookupConfig {
        LookupConfig {
            url_template: format!("{}/{{ein}}.json", server.uri()),
            target_region: "NY".into(),
            category_keys: vec![
                "In-Network Negotiated Rates Files".into(),
                "Blue Cross Blue Shield Association Out-of-Area Rates Files".into(),
            ],
            prefilter_marker: Some("_PPO_".into()),
            retry_attempts: 3,
            retry_backoff_ms: 1,
            timeout_secs: 5,
        }
    }

    fn client(config: LookupConfig) -> EnrichmentClient {
        let resolver = Arc::new(DisplayNameResolver::new("2023-04_"));
        EnrichmentClient::new(config, resolver).unwrap()
    }

    #[tokio::test]
    async fn extracts_target_region_urls_from_configured_categories() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/112233445.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LOOKUP_BODY))
            .mount(&server)
            .await;

        let urls = client(config(&server)).lookup("112233445").await.unwrap();

        // NY entries from both configured categories; the CT entry and the
        // unconfigured out-of-network category are excluded.
        assert_eq!(
            urls,
            HashSet::from([
                "https://example.com/ny.json.gz".to_string(),
                "https://example.com/ooa.json.gz".to_string(),
            ])
        );
    }

    #[tokio::test]
    async fn prefilter_short_circuits_without_parse() {
        let server = MockServer::start().await;
        // Not even valid JSON: proves the body is never parsed.
        Mock::given(method("GET"))
            .and(path("/112233445.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("HMO only, nothing here"))
            .mount(&server)
            .await;

        let urls = client(config(&server)).lookup("112233445").await.unwrap();
        assert!(urls.is_empty());
    }

    #[tokio::test]
    async fn non_success_status_is_a_lookup_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/112233445.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut cfg = config(&server);
        cfg.retry_attempts = 1;
        let err = client(cfg).lookup_with_retry("112233445").await.unwrap_err();

        assert!(matches!(err, MrfScanError::Lookup(_)));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn retry_recovers_after_transient_failures() {
        let server = MockServer::start().await;
        // First two attempts fail, the third succeeds.
        Mock::given(method("GET"))
            .and(path("/112233445.json"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/112233445.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LOOKUP_BODY))
            .mount(&server)
            .await;

        let urls = client(config(&server))
            .lookup_with_retry("112233445")
            .await
            .unwrap();
        assert_eq!(urls.len(), 2);
    }

    #[tokio::test]
    async fn retry_is_bounded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/112233445.json"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let err = client(config(&server))
            .lookup_with_retry("112233445")
            .await
            .unwrap_err();

        assert!(matches!(err, MrfScanError::Lookup(_)));
        // Mock expectation verifies exactly 3 attempts on drop.
    }

    #[tokio::test]
    async fn disabled_prefilter_parses_everything() {
        let server = MockServer::start().await;
        // Body without the usual marker still gets fully parsed.
        let body = r#"{"Blue Cross Blue Shield Association Out-of-Area Rates Files":
            [{"url": "https://example.com/x.json.gz", "displayname": "2023-04_NY_x"}]}"#;
        Mock::given(method("GET"))
            .and(path("/112233445.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let mut cfg = config(&server);
        cfg.prefilter_marker = None;
        let urls = client(cfg).lookup("112233445").await.unwrap();
        assert_eq!(urls.len(), 1);
    }
}
