//! Collector boundary: raw candidate records (JSON Lines or CSV) →
//! [`ListingCandidate`].

use std::path::Path;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::DedupeError;
use crate::model::{ListingCandidate, Source, SourceBatch};

// ---------------------------------------------------------------------------
// Raw record
// ---------------------------------------------------------------------------

/// Candidate as written by a collector. Field names follow the external
/// interface (camelCase) and accept the snake_case spellings collectors use.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    pub source: Source,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, alias = "rent_per_month", alias = "rent_pcm", alias = "rent")]
    pub rent_per_month: Option<RentField>,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<u32>,
    #[serde(default)]
    pub url: String,
    #[serde(default, alias = "source_listing_id", alias = "id")]
    pub source_listing_id: Option<String>,
}

/// Rent as a monthly amount or as listing text ("£1,250 pcm", "£300 pw").
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RentField {
    Amount(u32),
    Text(String),
}

impl RentField {
    pub fn per_month(&self) -> Option<u32> {
        match self {
            Self::Amount(n) => Some(*n),
            Self::Text(text) => parse_rent_text(text).map(|(amount, period)| period.to_monthly(amount)),
        }
    }
}

impl CandidateRecord {
    /// Convert to the canonical candidate. `line` is used for error reporting.
    pub fn into_candidate(self, line: usize) -> Result<ListingCandidate, DedupeError> {
        let source_listing_id = match self.source_listing_id.filter(|id| !id.trim().is_empty()) {
            Some(id) => id,
            None if !self.url.trim().is_empty() => listing_id_from_url(self.source, &self.url),
            None => {
                return Err(DedupeError::InputParse {
                    line,
                    message: "record has neither sourceListingId nor url".into(),
                })
            }
        };

        Ok(ListingCandidate {
            source: self.source,
            area: self.area,
            address: self.address.unwrap_or_default(),
            rent_per_month: self.rent_per_month.as_ref().and_then(RentField::per_month),
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            url: self.url,
            source_listing_id,
        })
    }
}

/// Stable per-source id derived from the listing URL.
pub fn listing_id_from_url(source: Source, url: &str) -> String {
    format!("{source}:{:x}", Sha256::digest(url.trim().as_bytes()))
}

// ---------------------------------------------------------------------------
// Rent text
// ---------------------------------------------------------------------------

static RENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"£?\s*(\d{2,6})\s*(pcm|pw|per week|per month|weekly|monthly)?").expect("rent pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RentPeriod {
    Monthly,
    Weekly,
}

impl RentPeriod {
    pub fn to_monthly(self, amount: u32) -> u32 {
        match self {
            Self::Monthly => amount,
            // amount * 52 / 12, rounded
            Self::Weekly => ((u64::from(amount) * 52 + 6) / 12) as u32,
        }
    }
}

/// Parse listing rent text. Thousands separators are ignored; a missing period
/// means per calendar month.
pub fn parse_rent_text(text: &str) -> Option<(u32, RentPeriod)> {
    if text.is_empty() {
        return None;
    }
    let cleaned = text.to_lowercase().replace(',', "");
    let caps = RENT_RE.captures(&cleaned)?;
    let amount: u32 = caps[1].parse().ok()?;
    let period = match caps.get(2).map(|m| m.as_str()) {
        Some("pw" | "per week" | "weekly") => RentPeriod::Weekly,
        _ => RentPeriod::Monthly,
    };
    Some((amount, period))
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    JsonLines,
    Csv,
}

impl InputFormat {
    /// `.csv` files are CSV; everything else is read as JSON Lines.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::JsonLines,
        }
    }
}

pub fn load_candidates(data: &str, format: InputFormat) -> Result<Vec<ListingCandidate>, DedupeError> {
    match format {
        InputFormat::JsonLines => load_jsonl(data),
        InputFormat::Csv => load_csv(data),
    }
}

/// Read a candidate file, choosing the format from its extension.
pub fn load_path(path: &Path) -> Result<Vec<ListingCandidate>, DedupeError> {
    let data = std::fs::read_to_string(path)?;
    load_candidates(&data, InputFormat::from_path(path))
}

/// One JSON object per line; blank lines are skipped.
pub fn load_jsonl(data: &str) -> Result<Vec<ListingCandidate>, DedupeError> {
    let mut out = Vec::new();
    for (i, raw) in data.lines().enumerate() {
        let line = i + 1;
        if raw.trim().is_empty() {
            continue;
        }
        let record: CandidateRecord = serde_json::from_str(raw).map_err(|e| DedupeError::InputParse {
            line,
            message: e.to_string(),
        })?;
        out.push(record.into_candidate(line)?);
    }
    Ok(out)
}

/// CSV with a header row naming the candidate fields.
pub fn load_csv(data: &str) -> Result<Vec<ListingCandidate>, DedupeError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(data.as_bytes());

    let mut out = Vec::new();
    for (i, result) in reader.deserialize::<CandidateRecord>().enumerate() {
        // Header is line 1
        let line = i + 2;
        let record = result.map_err(|e| DedupeError::InputParse {
            line,
            message: e.to_string(),
        })?;
        out.push(record.into_candidate(line)?);
    }
    Ok(out)
}

/// Group candidates by source, keeping first-appearance order of sources and
/// collection order within each source.
pub fn into_batches(candidates: Vec<ListingCandidate>) -> Vec<SourceBatch> {
    let mut grouped: IndexMap<Source, Vec<ListingCandidate>> = IndexMap::new();
    for c in candidates {
        grouped.entry(c.source).or_default().push(c);
    }
    grouped
        .into_iter()
        .map(|(source, candidates)| SourceBatch::new(source, candidates))
        .collect()
}
