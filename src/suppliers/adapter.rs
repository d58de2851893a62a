use crate::httpclient::{ErrorKind, OutboundRequest, ResilientHttpClient};
use crate::models::{ComponentFields, SupplierApiResponse};
use crate::suppliers::SupplierAdapter;
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::debug;

/// HTTP-backed supplier adapter.
///
/// One instance per configured supplier backend. All calls go through
/// the shared [`ResilientHttpClient`], so retries, correlation IDs and
/// error classification come for free; this adapter only maps the
/// classified outcome onto the supplier response envelope.
pub struct HttpSupplierAdapter {
    name: String,
    base_url: String,
    priority: u32,
    timeout: Duration,
    client: ResilientHttpClient,
}

impl HttpSupplierAdapter {
    pub fn new(
        name: String,
        base_url: String,
        priority: u32,
        timeout_ms: u64,
        client: ResilientHttpClient,
    ) -> Self {
        Self {
            name,
            base_url: base_url.trim_end_matches('/').to_string(),
            priority,
            timeout: Duration::from_millis(timeout_ms),
            client,
        }
    }

    fn part_url(&self, mpn: &str, manufacturer: Option<&str>) -> String {
        let mut url = format!("{}/parts?mpn={}", self.base_url, urlencode(mpn));
        if let Some(manufacturer) = manufacturer {
            url.push_str("&manufacturer=");
            url.push_str(&urlencode(manufacturer));
        }
        url
    }
}

#[async_trait]
impl SupplierAdapter for HttpSupplierAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    async fn fetch(&self, mpn: &str, manufacturer: Option<&str>) -> SupplierApiResponse {
        let start = Instant::now();
        let request = OutboundRequest::get(self.part_url(mpn, manufacturer))
            .with_header("Accept", "application/json")
            .with_timeout(self.timeout);

        match self.client.execute(request).await {
            Ok(response) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                match response.json::<ComponentFields>() {
                    Ok(fields) => {
                        debug!(
                            supplier = %self.name,
                            mpn,
                            completeness = fields.completeness(),
                            duration_ms,
                            "Supplier returned part data"
                        );
                        SupplierApiResponse::success(self.name.clone(), fields, duration_ms)
                    }
                    Err(e) => SupplierApiResponse::error(
                        self.name.clone(),
                        format!("Malformed supplier payload: {}", e),
                        duration_ms,
                    ),
                }
            }
            Err(e) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                match e.kind {
                    ErrorKind::NotFound => {
                        SupplierApiResponse::not_found(self.name.clone(), duration_ms)
                    }
                    ErrorKind::RateLimited => SupplierApiResponse::rate_limited(
                        self.name.clone(),
                        e.to_string(),
                        duration_ms,
                    ),
                    _ => SupplierApiResponse::error(self.name.clone(), e.to_string(), duration_ms),
                }
            }
        }
    }
}

fn urlencode(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect()
}
