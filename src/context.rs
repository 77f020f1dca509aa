use crate::classify::{ColorBucket, LegendRow};
use crate::data::{JoinSummary, PipelineOutput};
use crate::stats::AggregateStat;
use crate::style::{FeatureStyle, StyleSheet};
use crate::types::{EnrichedFeatureCollection, GeoFeature, NormalizedCountry};

/// Everything the map needs after loading, built once and passed by
/// reference to the components that render or interact with it.
#[derive(Debug, Clone)]
pub struct MapContext {
    pub countries: Vec<NormalizedCountry>,
    pub features: EnrichedFeatureCollection,
    pub styles: StyleSheet,
    pub joins: JoinSummary,
    aggregate: AggregateStat,
}

impl MapContext {
    pub fn new(output: PipelineOutput, styles: StyleSheet) -> Self {
        Self {
            countries: output.countries,
            features: output.features,
            styles,
            joins: output.joins,
            aggregate: output.aggregate,
        }
    }

    pub fn current_aggregate(&self) -> AggregateStat {
        self.aggregate
    }

    pub fn classify(&self, percentage: f64) -> ColorBucket<'_> {
        self.styles.classifier.classify(percentage)
    }

    pub fn legend(&self) -> Vec<LegendRow> {
        self.styles.classifier.legend()
    }

    pub fn base_style(&self, feature: &GeoFeature) -> FeatureStyle {
        self.styles.base_style(&feature.properties)
    }
}
