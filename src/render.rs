use crate::classify::LegendRow;
use crate::context::MapContext;
use crate::data::JoinSummary;
use crate::stats::AggregateStat;
use crate::style::FeatureStyle;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub const FEATURES_FILE: &str = "world.geojson";
pub const STYLES_FILE: &str = "styles.json";
pub const SUMMARY_FILE: &str = "summary.json";

#[derive(Debug, Serialize)]
pub struct Summary {
    pub worldwide_average: AggregateStat,
    pub legend: Vec<LegendRow>,
    pub joins: JoinSummary,
}

impl Summary {
    pub fn new(ctx: &MapContext) -> Self {
        Self {
            worldwide_average: ctx.current_aggregate(),
            legend: ctx.legend(),
            joins: ctx.joins,
        }
    }
}

/// Base style of every feature, aligned with the feature order of
/// `world.geojson`.
pub fn base_styles(ctx: &MapContext) -> Vec<FeatureStyle> {
    ctx.features
        .features
        .iter()
        .map(|f| ctx.base_style(f))
        .collect()
}

/// Writes the enriched features, their styles and the summary to `out_dir`.
/// Returns the paths written.
pub fn write_artifacts(ctx: &MapContext, out_dir: &Path) -> Result<Vec<PathBuf>> {
    info!("Writing {} features to {:?}", ctx.features.len(), out_dir);
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", out_dir))?;

    let paths = vec![
        write_json(&out_dir.join(FEATURES_FILE), &ctx.features.to_geojson())?,
        write_json(&out_dir.join(STYLES_FILE), &base_styles(ctx))?,
        write_json(&out_dir.join(SUMMARY_FILE), &Summary::new(ctx))?,
    ];
    Ok(paths)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<PathBuf> {
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("Failed to serialize {:?}", path))?;
    writer.flush()?;
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PipelineOutput;
    use crate::style::StyleSheet;
    use crate::types::{EnrichedFeatureCollection, FeatureProperties, GeoFeature, JoinCounts};
    use serde_json::Value;

    fn context() -> MapContext {
        MapContext::new(
            PipelineOutput {
                countries: Vec::new(),
                features: EnrichedFeatureCollection {
                    features: vec![GeoFeature {
                        id: "Kenya".to_string(),
                        bbox: None,
                        geometry: None,
                        properties: FeatureProperties {
                            percentage: 61.0,
                            name: "Kenya".to_string(),
                        },
                    }],
                },
                aggregate: AggregateStat::Mean(61.0),
                joins: JoinSummary {
                    countries: JoinCounts { matched: 1, dropped: 2 },
                    features: JoinCounts { matched: 1, dropped: 0 },
                },
            },
            StyleSheet::default(),
        )
    }

    #[test]
    fn writes_all_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/output");

        let paths = write_artifacts(&context(), &out).unwrap();
        assert_eq!(paths.len(), 3);

        let world: Value =
            serde_json::from_str(&fs::read_to_string(out.join(FEATURES_FILE)).unwrap()).unwrap();
        assert_eq!(world["type"], "FeatureCollection");
        assert_eq!(world["features"][0]["id"], "Kenya");
        assert_eq!(world["features"][0]["properties"]["percentage"], 61.0);

        let styles: Value =
            serde_json::from_str(&fs::read_to_string(out.join(STYLES_FILE)).unwrap()).unwrap();
        assert_eq!(styles[0]["fillColor"], "#f46d43");

        let summary: Value =
            serde_json::from_str(&fs::read_to_string(out.join(SUMMARY_FILE)).unwrap()).unwrap();
        assert_eq!(summary["worldwide_average"], "61.00");
        assert_eq!(summary["joins"]["countries"]["dropped"], 2);
        assert_eq!(summary["legend"].as_array().unwrap().len(), 10);
    }
}
