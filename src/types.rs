use geojson::{feature::Id, Bbox, Feature, FeatureCollection, Geometry, JsonObject};
use serde::{Deserialize, Serialize};

/// One value of the percentage dataset, keyed by 2-letter ISO code.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPercentageEntry {
    pub code2: String,
    pub value: f64,
}

/// A record of the country metadata dataset.
///
/// Accepts both `{code2, code3, name: "…"}` and the public
/// `{cca2, cca3, name: {common: "…"}}` layout.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IsoCountry {
    #[serde(alias = "cca2")]
    pub code2: String,
    #[serde(alias = "cca3")]
    pub code3: String,
    pub name: CountryName,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CountryName {
    Plain(String),
    Names { common: String },
}

impl IsoCountry {
    pub fn common_name(&self) -> &str {
        match &self.name {
            CountryName::Plain(name) => name,
            CountryName::Names { common } => common,
        }
    }
}

/// A percentage entry resolved against its country metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedCountry {
    pub code3: String,
    pub name: String,
    pub percentage: f64,
}

/// The only properties an enriched feature carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureProperties {
    pub percentage: f64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeoFeature {
    /// The matched country's display name.
    pub id: String,
    pub bbox: Option<Bbox>,
    pub geometry: Option<Geometry>,
    pub properties: FeatureProperties,
}

impl GeoFeature {
    pub fn to_geojson(&self) -> Feature {
        let mut properties = JsonObject::new();
        properties.insert("percentage".to_string(), self.properties.percentage.into());
        properties.insert("name".to_string(), self.properties.name.clone().into());

        Feature {
            bbox: self.bbox.clone(),
            geometry: self.geometry.clone(),
            id: Some(Id::String(self.id.clone())),
            properties: Some(properties),
            foreign_members: None,
        }
    }
}

/// Features in topology order, unmatched ones removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichedFeatureCollection {
    pub features: Vec<GeoFeature>,
}

impl EnrichedFeatureCollection {
    /// First feature with this id. Ids are country names and may repeat.
    pub fn get(&self, id: &str) -> Option<&GeoFeature> {
        self.features.iter().find(|f| f.id == id)
    }

    /// Position of the first feature with this id.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.features.iter().position(|f| f.id == id)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn to_geojson(&self) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: self.features.iter().map(GeoFeature::to_geojson).collect(),
            foreign_members: None,
        }
    }
}

/// How many records a join kept and how many it silently dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JoinCounts {
    pub matched: usize,
    pub dropped: usize,
}
