//! Key joins between the three datasets.
//!
//! Records without a partner are dropped without error; only the counts are
//! reported back.

use crate::types::{
    EnrichedFeatureCollection, FeatureProperties, GeoFeature, IsoCountry, JoinCounts,
    NormalizedCountry, RawPercentageEntry,
};
use geojson::Feature;
use serde_json::Value;
use std::collections::HashMap;

/// Property names that may carry the ISO alpha-3 code, in lookup order.
const ALPHA3_PROPERTIES: [&str; 2] = ["iso_a3", "ISO_A3"];

/// Resolves every percentage entry against the country metadata by 2-letter
/// code. Output follows `entries` order; the first metadata record for a code
/// wins.
pub fn join_countries(
    entries: &[RawPercentageEntry],
    iso_countries: &[IsoCountry],
) -> (Vec<NormalizedCountry>, JoinCounts) {
    let mut by_code2: HashMap<&str, &IsoCountry> = HashMap::with_capacity(iso_countries.len());
    for iso in iso_countries {
        by_code2.entry(iso.code2.as_str()).or_insert(iso);
    }

    let countries: Vec<NormalizedCountry> = entries
        .iter()
        .filter_map(|entry| {
            let iso = by_code2.get(entry.code2.as_str())?;
            Some(NormalizedCountry {
                code3: iso.code3.clone(),
                name: iso.common_name().to_string(),
                percentage: entry.value,
            })
        })
        .collect();

    let counts = JoinCounts {
        matched: countries.len(),
        dropped: entries.len() - countries.len(),
    };
    (countries, counts)
}

/// Rewrites decoded features into enriched ones keyed by the country's name.
/// All original properties are discarded.
pub fn join_features(
    features: Vec<Feature>,
    countries: &[NormalizedCountry],
) -> (EnrichedFeatureCollection, JoinCounts) {
    let mut by_code3: HashMap<&str, &NormalizedCountry> = HashMap::with_capacity(countries.len());
    for country in countries {
        by_code3.entry(country.code3.as_str()).or_insert(country);
    }

    let total = features.len();
    let features: Vec<GeoFeature> = features
        .into_iter()
        .filter_map(|feature| {
            let code3 = alpha3(&feature)?;
            let country = by_code3.get(code3)?;
            Some(GeoFeature {
                id: country.name.clone(),
                bbox: feature.bbox,
                geometry: feature.geometry,
                properties: FeatureProperties {
                    percentage: country.percentage,
                    name: country.name.clone(),
                },
            })
        })
        .collect();

    let counts = JoinCounts {
        matched: features.len(),
        dropped: total - features.len(),
    };
    (EnrichedFeatureCollection { features }, counts)
}

/// The first non-empty alpha-3 code among the accepted property names.
fn alpha3(feature: &Feature) -> Option<&str> {
    let properties = feature.properties.as_ref()?;
    ALPHA3_PROPERTIES
        .iter()
        .filter_map(|key| properties.get(*key).and_then(Value::as_str))
        .find(|code| !code.is_empty())
}
