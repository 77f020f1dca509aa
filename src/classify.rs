use crate::config::ClassificationConfig;
use crate::error::ClassifierError;
use serde::Serialize;

/// Maps percentages onto a fixed palette of equal-width buckets over
/// `[min, max]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorClassifier {
    palette: Vec<String>,
    min: f64,
    max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorBucket<'a> {
    pub index: usize,
    pub color: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendRow {
    pub color: String,
    pub start: f64,
    pub end: f64,
}

impl ColorClassifier {
    /// Fails on an empty palette, or unless `min < max` (NaN bounds
    /// included).
    pub fn new(palette: Vec<String>, min: f64, max: f64) -> Result<Self, ClassifierError> {
        if palette.is_empty() {
            return Err(ClassifierError::EmptyPalette);
        }
        if !(min < max) {
            return Err(ClassifierError::InvalidDomain { min, max });
        }
        Ok(Self { palette, min, max })
    }

    pub fn from_config(config: &ClassificationConfig) -> Result<Self, ClassifierError> {
        Self::new(config.palette.clone(), config.min, config.max)
    }

    pub fn palette(&self) -> &[String] {
        &self.palette
    }

    /// Bucket index, clamped to the palette. Values below `min` (and NaN)
    /// land in the first bucket, values at or above `max` in the last.
    pub fn bucket_index(&self, percentage: f64) -> usize {
        let n = self.palette.len();
        let raw = ((percentage - self.min) / (self.max - self.min) * n as f64).floor();
        if raw.is_nan() || raw < 0.0 {
            0
        } else {
            (raw as usize).min(n - 1)
        }
    }

    pub fn classify(&self, percentage: f64) -> ColorBucket<'_> {
        let index = self.bucket_index(percentage);
        ColorBucket {
            index,
            color: &self.palette[index],
        }
    }

    /// One row per bucket with its `[start, end)` bounds.
    pub fn legend(&self) -> Vec<LegendRow> {
        let width = (self.max - self.min) / self.palette.len() as f64;
        self.palette
            .iter()
            .enumerate()
            .map(|(i, color)| LegendRow {
                color: color.clone(),
                start: self.min + width * i as f64,
                end: self.min + width * (i + 1) as f64,
            })
            .collect()
    }
}

impl Default for ColorClassifier {
    fn default() -> Self {
        let ClassificationConfig { palette, min, max } = ClassificationConfig::default();
        Self { palette, min, max }
    }
}
