//! Normalization step: canonicalizes a raw part reference.

use crate::error::{AppError, Result};
use crate::models::{EnrichmentJob, NormalizedComponentData};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

/// Maps a raw user-entered part reference into a canonical
/// (manufacturer, MPN, category) triple with a confidence score.
#[async_trait]
pub trait Normalizer: Send + Sync + 'static {
    async fn normalize(&self, job: &EnrichmentJob) -> Result<NormalizedComponentData>;
}

/// Valid canonical MPN: alphanumeric start, then part-number punctuation
static MPN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9][A-Z0-9./#+-]{1,63}$").expect("valid MPN regex"));

/// Manufacturer aliases, keyed lowercase
static MANUFACTURER_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("ti", "TI"),
        ("texas instruments", "TI"),
        ("st", "STMicroelectronics"),
        ("stmicro", "STMicroelectronics"),
        ("stmicroelectronics", "STMicroelectronics"),
        ("on semi", "onsemi"),
        ("on semiconductor", "onsemi"),
        ("onsemi", "onsemi"),
        ("microchip", "Microchip"),
        ("atmel", "Microchip"),
        ("nxp", "NXP"),
        ("analog devices", "Analog Devices"),
        ("adi", "Analog Devices"),
        ("vishay", "Vishay"),
        ("murata", "Murata"),
        ("yageo", "Yageo"),
        ("infineon", "Infineon"),
    ])
});

/// Part-number prefix heuristics: (prefix, inferred manufacturer, category)
static PREFIX_TABLE: Lazy<Vec<(&'static str, Option<&'static str>, &'static str)>> =
    Lazy::new(|| {
        vec![
            ("STM32", Some("STMicroelectronics"), "microcontroller"),
            ("ATMEGA", Some("Microchip"), "microcontroller"),
            ("ATTINY", Some("Microchip"), "microcontroller"),
            ("PIC", Some("Microchip"), "microcontroller"),
            ("CRCW", Some("Vishay"), "resistor"),
            ("GRM", Some("Murata"), "capacitor"),
            ("TL0", None, "op-amp"),
            ("LM3", None, "op-amp"),
            ("LM7", None, "voltage-regulator"),
            ("NE55", None, "timer"),
            ("BAV", None, "diode"),
            ("BAT", None, "diode"),
            ("1N", None, "diode"),
            ("2N", None, "transistor"),
            ("BC", None, "transistor"),
            ("IRF", Some("Infineon"), "mosfet"),
            ("74", None, "logic"),
            ("CD4", None, "logic"),
        ]
    });

/// Table-driven normalizer.
///
/// Rewrites the MPN into canonical form, resolves manufacturer aliases,
/// and infers manufacturer/category from well-known part-number
/// prefixes. Confidence reflects how much of the triple was resolved.
pub struct RuleBasedNormalizer;

impl RuleBasedNormalizer {
    pub fn new() -> Self {
        Self
    }

    fn canonical_mpn(raw: &str) -> String {
        raw.trim()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase()
    }

    fn resolve_manufacturer(raw: Option<&str>) -> Option<String> {
        let raw = raw?.trim();
        if raw.is_empty() {
            return None;
        }
        match MANUFACTURER_ALIASES.get(raw.to_lowercase().as_str()) {
            Some(canonical) => Some((*canonical).to_string()),
            None => Some(raw.to_string()),
        }
    }

    fn prefix_match(mpn: &str) -> Option<(Option<&'static str>, &'static str)> {
        PREFIX_TABLE
            .iter()
            .find(|(prefix, _, _)| mpn.starts_with(prefix))
            .map(|(_, manufacturer, category)| (*manufacturer, *category))
    }
}

impl Default for RuleBasedNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Normalizer for RuleBasedNormalizer {
    async fn normalize(&self, job: &EnrichmentJob) -> Result<NormalizedComponentData> {
        let mpn = Self::canonical_mpn(&job.mpn);

        if mpn.is_empty() {
            return Err(AppError::Validation("Empty MPN".to_string()));
        }
        if !MPN_RE.is_match(&mpn) {
            return Err(AppError::Validation(format!(
                "Unparseable MPN: {:?}",
                job.mpn
            )));
        }

        let mut normalized_fields = Vec::new();
        if mpn != job.mpn {
            normalized_fields.push("mpn".to_string());
        }

        let supplied_manufacturer = Self::resolve_manufacturer(job.manufacturer.as_deref());
        if supplied_manufacturer.as_deref() != job.manufacturer.as_deref()
            && supplied_manufacturer.is_some()
        {
            normalized_fields.push("manufacturer".to_string());
        }

        let (inferred_manufacturer, category) = match Self::prefix_match(&mpn) {
            Some((manufacturer, category)) => (manufacturer, Some(category.to_string())),
            None => (None, None),
        };
        if category.is_some() {
            normalized_fields.push("category".to_string());
        }

        let manufacturer = supplied_manufacturer
            .or_else(|| inferred_manufacturer.map(String::from));

        // Confidence: base for a well-formed MPN, plus a share for each
        // resolved element of the canonical triple
        let mut confidence = 0.5;
        if manufacturer.is_some() {
            confidence += 0.2;
        }
        if category.is_some() {
            confidence += 0.25;
        }

        let manufacturer = match manufacturer {
            Some(manufacturer) => manufacturer,
            None => {
                return Err(AppError::Validation(format!(
                    "Cannot resolve manufacturer for MPN {:?}",
                    mpn
                )))
            }
        };

        debug!(
            raw = %job.mpn,
            mpn = %mpn,
            manufacturer = %manufacturer,
            category = category.as_deref().unwrap_or("unknown"),
            confidence,
            "Normalized part reference"
        );

        Ok(NormalizedComponentData {
            mpn,
            manufacturer,
            category,
            description: None,
            confidence_score: Some(confidence),
            normalized_fields,
        })
    }
}
