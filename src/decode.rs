use crate::error::{PipelineError, Result};
use crate::types::{IsoCountry, RawPercentageEntry};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

/// The percentage dataset either as an object keyed by 2-letter code or as
/// a list of `[code, value]` pairs.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PercentageDocument {
    Mapping(Map<String, Value>),
    Pairs(Vec<(String, Value)>),
}

/// Parses fetched text. Async only so it chains after a fetch like any other
/// stage; it does no I/O.
pub async fn decode<T: DeserializeOwned>(resource: &str, text: String) -> Result<T> {
    serde_json::from_str(&text).map_err(|e| PipelineError::parse(resource, e))
}

/// The percentage dataset, in document order.
pub fn percentage_entries(
    resource: &str,
    doc: PercentageDocument,
) -> Result<Vec<RawPercentageEntry>> {
    let pairs: Vec<(String, Value)> = match doc {
        PercentageDocument::Mapping(map) => map.into_iter().collect(),
        PercentageDocument::Pairs(pairs) => pairs,
    };
    pairs
        .into_iter()
        .map(|(code2, value)| match value.as_f64() {
            Some(value) => Ok(RawPercentageEntry { code2, value }),
            None => Err(PipelineError::parse(
                resource,
                format!("value for '{code2}' is not a number: {value}"),
            )),
        })
        .collect()
}

pub async fn decode_percentages(resource: &str, text: String) -> Result<Vec<RawPercentageEntry>> {
    let doc: PercentageDocument = decode(resource, text).await?;
    percentage_entries(resource, doc)
}

pub async fn decode_countries(resource: &str, text: String) -> Result<Vec<IsoCountry>> {
    decode(resource, text).await
}
