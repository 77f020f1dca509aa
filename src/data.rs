//! Fetch, decode and join the three datasets.
//!
//! The join graph has two levels. The percentage and country fetches fan in
//! to the country join; that result and the world fetch fan in again to the
//! feature join. All three fetches are in flight at once.

use crate::config::{AppConfig, InputConfig};
use crate::context::MapContext;
use crate::decode::{decode, decode_countries, decode_percentages};
use crate::error::{PipelineError, Result};
use crate::fetch::ResourceFetcher;
use crate::join::{join_countries, join_features};
use crate::stats::{self, AggregateStat};
use crate::style::StyleSheet;
use crate::topology;
use crate::types::{EnrichedFeatureCollection, JoinCounts, NormalizedCountry};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub countries: Vec<NormalizedCountry>,
    pub features: EnrichedFeatureCollection,
    pub aggregate: AggregateStat,
    pub joins: JoinSummary,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JoinSummary {
    pub countries: JoinCounts,
    pub features: JoinCounts,
}

pub async fn load_data<F>(input: &InputConfig, fetcher: &F) -> Result<PipelineOutput>
where
    F: ResourceFetcher + ?Sized,
{
    info!("Loading data...");

    let percentages = async {
        let text = fetcher.fetch(&input.percentages).await?;
        decode_percentages(&input.percentages, text).await
    };
    let iso_countries = async {
        let text = fetcher.fetch(&input.countries).await?;
        decode_countries(&input.countries, text).await
    };
    let world = async {
        let text = fetcher.fetch(&input.world).await?;
        let doc: Value = decode(&input.world, text).await?;
        topology::features(&input.world, doc, &input.world_object)
    };

    let dataset = async {
        let (entries, iso_countries) = tokio::try_join!(percentages, iso_countries)?;
        let (countries, counts) = join_countries(&entries, &iso_countries);
        let aggregate = stats::aggregate(&countries);
        Ok::<_, PipelineError>((countries, counts, aggregate))
    };

    let (world, (countries, country_counts, aggregate)) = tokio::try_join!(world, dataset)?;
    let (features, feature_counts) = join_features(world, &countries);

    let joins = JoinSummary {
        countries: country_counts,
        features: feature_counts,
    };
    info!(
        "Joined {} countries ({} dropped) and {} features ({} dropped); worldwide average {}",
        joins.countries.matched,
        joins.countries.dropped,
        joins.features.matched,
        joins.features.dropped,
        aggregate
    );

    Ok(PipelineOutput {
        countries,
        features,
        aggregate,
        joins,
    })
}

/// Runs the pipeline and wraps the result with the configured styles.
pub async fn load_map<F>(config: &AppConfig, fetcher: &F) -> Result<MapContext>
where
    F: ResourceFetcher + ?Sized,
{
    let styles = StyleSheet::from_config(config)?;
    let output = load_data(&config.input, fetcher).await?;
    Ok(MapContext::new(output, styles))
}
