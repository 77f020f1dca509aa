use crate::error::{PipelineError, Result};
use crate::types::NormalizedCountry;
use serde::{Serialize, Serializer};
use std::fmt;

/// Worldwide summary shown whenever no single country is under the pointer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum AggregateStat {
    #[default]
    NoData,
    Mean(f64),
}

impl fmt::Display for AggregateStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoData => f.write_str("no data"),
            Self::Mean(value) => write!(f, "{value:.2}"),
        }
    }
}

/// Serialized as the two-decimal string, or `null` when there is no data.
impl Serialize for AggregateStat {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::NoData => serializer.serialize_none(),
            Self::Mean(_) => serializer.collect_str(self),
        }
    }
}

pub fn mean_percentage(countries: &[NormalizedCountry]) -> Result<f64> {
    if countries.is_empty() {
        return Err(PipelineError::EmptyDataset);
    }
    let sum: f64 = countries.iter().map(|c| c.percentage).sum();
    Ok(sum / countries.len() as f64)
}

pub fn aggregate(countries: &[NormalizedCountry]) -> AggregateStat {
    match mean_percentage(countries) {
        Ok(mean) => AggregateStat::Mean((mean * 100.0).round() / 100.0),
        Err(_) => AggregateStat::NoData,
    }
}
