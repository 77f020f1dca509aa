use crate::classify::ColorClassifier;
use crate::config::{AppConfig, StrokeConfig};
use crate::error::ClassifierError;
use crate::types::FeatureProperties;
use serde::Serialize;

/// Visual style of one country polygon, in the property names map widgets
/// expect.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureStyle {
    pub fill_color: String,
    pub weight: f64,
    pub opacity: f64,
    pub color: String,
    pub fill_opacity: f64,
}

#[derive(Debug, Clone)]
pub struct StyleSheet {
    pub classifier: ColorClassifier,
    pub base: StrokeConfig,
    pub highlight: StrokeConfig,
    pub bring_to_front: bool,
}

impl StyleSheet {
    pub fn from_config(config: &AppConfig) -> Result<Self, ClassifierError> {
        Ok(Self {
            classifier: ColorClassifier::from_config(&config.classification)?,
            base: config.style.base.clone(),
            highlight: config.style.highlight.clone(),
            bring_to_front: config.style.bring_to_front,
        })
    }

    pub fn base_style(&self, properties: &FeatureProperties) -> FeatureStyle {
        self.stroked(properties, &self.base)
    }

    /// Same fill as the base style, heavier stroke.
    pub fn highlight_style(&self, properties: &FeatureProperties) -> FeatureStyle {
        self.stroked(properties, &self.highlight)
    }

    fn stroked(&self, properties: &FeatureProperties, stroke: &StrokeConfig) -> FeatureStyle {
        FeatureStyle {
            fill_color: self.classifier.classify(properties.percentage).color.to_string(),
            weight: stroke.weight,
            opacity: stroke.opacity,
            color: stroke.color.clone(),
            fill_opacity: stroke.fill_opacity,
        }
    }
}

impl Default for StyleSheet {
    fn default() -> Self {
        let style = crate::config::StyleConfig::default();
        Self {
            classifier: ColorClassifier::default(),
            base: style.base,
            highlight: style.highlight,
            bring_to_front: style.bring_to_front,
        }
    }
}
