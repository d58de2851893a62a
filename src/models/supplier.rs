use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{Display, EnumString};

/// Outcome of one supplier call
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SupplierResponseStatus {
    Success,
    NotFound,
    RateLimited,
    Error,
}

/// Common envelope of component data returned by supplier adapters.
///
/// Every field except `parameters` is a known field counted towards data
/// completeness; `merge_from` only fills gaps, so merging is
/// first-writer-wins per field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub datasheet_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifecycle_status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_qty: Option<u64>,

    /// Free-form electrical parameters (e.g. "supply_voltage" -> "3-32V")
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

/// Number of known fields a supplier can populate
pub const KNOWN_FIELD_COUNT: usize = 7;

impl ComponentFields {
    /// Count of populated known fields (declared data completeness)
    pub fn completeness(&self) -> usize {
        [
            self.description.is_some(),
            self.category.is_some(),
            self.datasheet_url.is_some(),
            self.lifecycle_status.is_some(),
            self.package.is_some(),
            self.unit_price.is_some(),
            self.stock_qty.is_some(),
        ]
        .iter()
        .filter(|populated| **populated)
        .count()
    }

    /// Fraction of known fields populated, in [0.0, 1.0]
    pub fn completeness_ratio(&self) -> f64 {
        self.completeness() as f64 / KNOWN_FIELD_COUNT as f64
    }

    /// Fill any field not yet set from `other`. Fields already populated
    /// are left untouched; parameters merge key-wise with the same rule.
    pub fn merge_from(&mut self, other: &ComponentFields) {
        if self.description.is_none() {
            self.description = other.description.clone();
        }
        if self.category.is_none() {
            self.category = other.category.clone();
        }
        if self.datasheet_url.is_none() {
            self.datasheet_url = other.datasheet_url.clone();
        }
        if self.lifecycle_status.is_none() {
            self.lifecycle_status = other.lifecycle_status.clone();
        }
        if self.package.is_none() {
            self.package = other.package.clone();
        }
        if self.unit_price.is_none() {
            self.unit_price = other.unit_price;
        }
        if self.stock_qty.is_none() {
            self.stock_qty = other.stock_qty;
        }
        for (key, value) in &other.parameters {
            self.parameters
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }
}

/// Result of one supplier call for one job; immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierApiResponse {
    /// Supplier name as registered
    pub supplier: String,

    /// Call outcome
    pub status: SupplierResponseStatus,

    /// Component data, present on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ComponentFields>,

    /// Error message for rate_limited/error outcomes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Call duration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    /// True when served from the aggregator's response cache
    pub cached: bool,
}

impl SupplierApiResponse {
    pub fn success(supplier: String, data: ComponentFields, duration_ms: u64) -> Self {
        Self {
            supplier,
            status: SupplierResponseStatus::Success,
            data: Some(data),
            error: None,
            duration_ms: Some(duration_ms),
            cached: false,
        }
    }

    pub fn not_found(supplier: String, duration_ms: u64) -> Self {
        Self {
            supplier,
            status: SupplierResponseStatus::NotFound,
            data: None,
            error: None,
            duration_ms: Some(duration_ms),
            cached: false,
        }
    }

    pub fn rate_limited(supplier: String, error: String, duration_ms: u64) -> Self {
        Self {
            supplier,
            status: SupplierResponseStatus::RateLimited,
            data: None,
            error: Some(error),
            duration_ms: Some(duration_ms),
            cached: false,
        }
    }

    pub fn error(supplier: String, error: String, duration_ms: u64) -> Self {
        Self {
            supplier,
            status: SupplierResponseStatus::Error,
            data: None,
            error: Some(error),
            duration_ms: Some(duration_ms),
            cached: false,
        }
    }

    /// A usable response carries data (live or cached success)
    pub fn is_success(&self) -> bool {
        self.status == SupplierResponseStatus::Success
    }
}

/// Merged view over all supplier responses for one job.
///
/// Recomputed from the full response set; the merge depends only on the
/// registry priority order, never on arrival order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedSupplierData {
    pub mpn: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,

    /// Per-supplier outcomes, kept for observability
    pub responses: Vec<SupplierApiResponse>,

    /// Supplier with the highest data completeness among successes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_source: Option<String>,

    /// Priority-ordered first-writer-wins merge of success data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_data: Option<ComponentFields>,
}

/// Compact supplier outcome recorded in the step log.
///
/// This is what the quality scorer reads back; the full response set
/// stays out of the persisted log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierStepSummary {
    pub success_count: usize,
    pub live_success_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_source: Option<String>,
    pub completeness_ratio: f64,
    pub cache_only: bool,
}

impl From<&AggregatedSupplierData> for SupplierStepSummary {
    fn from(aggregated: &AggregatedSupplierData) -> Self {
        Self {
            success_count: aggregated.success_count(),
            live_success_count: aggregated.live_success_count(),
            best_source: aggregated.best_source.clone(),
            completeness_ratio: aggregated
                .merged_data
                .as_ref()
                .map(|d| d.completeness_ratio())
                .unwrap_or(0.0),
            cache_only: aggregated.cache_only(),
        }
    }
}

impl AggregatedSupplierData {
    /// Count of suppliers that returned usable data
    pub fn success_count(&self) -> usize {
        self.responses.iter().filter(|r| r.is_success()).count()
    }

    /// Count of live (non-cached) successes
    pub fn live_success_count(&self) -> usize {
        self.responses
            .iter()
            .filter(|r| r.is_success() && !r.cached)
            .count()
    }

    /// True when every usable response came from cache
    pub fn cache_only(&self) -> bool {
        self.success_count() > 0 && self.live_success_count() == 0
    }
}
