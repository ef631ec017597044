//! Run configuration for an area estimate: class labels, mapped pixel totals,
//! pixel size and the sample exclusion list.

use serde::{Deserialize, Serialize};

use crate::area::area_weights;
use crate::confusion::SampleFilter;
use crate::error::{EstimateError, Result};

/// 10 m pixels.
pub const DEFAULT_PIXEL_AREA_HA: f64 = 0.01;

fn default_pixel_area_ha() -> f64 {
    DEFAULT_PIXEL_AREA_HA
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateConfig {
    /// Display names in class-code order, e.g. `["Non-Crop", "Crop"]`.
    pub class_labels: Vec<String>,
    /// Mapped pixel total per class, `a_j`.
    pub pixel_counts: Vec<u64>,
    /// Area of one pixel in hectares.
    #[serde(default = "default_pixel_area_ha")]
    pub pixel_area_ha: f64,
    /// Sample ids to leave out of the confusion matrix.
    #[serde(default)]
    pub excluded_sample_ids: Vec<String>,
}

impl EstimateConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EstimateError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.class_labels.is_empty() {
            return Err(EstimateError::InvalidConfig("no class labels".to_string()));
        }
        if self.pixel_counts.len() != self.class_labels.len() {
            return Err(EstimateError::InvalidConfig(format!(
                "{} pixel counts for {} class labels",
                self.pixel_counts.len(),
                self.class_labels.len()
            )));
        }
        if self.pixel_counts.iter().all(|&a| a == 0) {
            return Err(EstimateError::InvalidConfig("pixel counts sum to zero".to_string()));
        }
        if !(self.pixel_area_ha.is_finite() && self.pixel_area_ha > 0.0) {
            return Err(EstimateError::InvalidConfig(format!(
                "pixel_area_ha must be positive, got {}",
                self.pixel_area_ha
            )));
        }
        Ok(())
    }

    pub fn n_classes(&self) -> usize {
        self.class_labels.len()
    }

    pub fn sample_filter(&self) -> SampleFilter {
        SampleFilter::new(self.excluded_sample_ids.iter().cloned())
    }

    /// `w_j = a_j / Σ a`.
    pub fn area_weights(&self) -> Result<Vec<f64>> {
        area_weights(&self.pixel_counts)
    }

    /// Total mapped area in hectares.
    pub fn total_area_ha(&self) -> f64 {
        let total_px: u128 = self.pixel_counts.iter().map(|&a| a as u128).sum();
        total_px as f64 * self.pixel_area_ha
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confusion::SampleRecord;

    const BINARY: &str = r#"{
        "class_labels": ["Non-Crop", "Crop"],
        "pixel_counts": [5200000, 4800000]
    }"#;

    #[test]
    fn defaults_fill_optional_fields() {
        let config = EstimateConfig::from_json_str(BINARY).unwrap();
        assert_eq!(config.n_classes(), 2);
        assert_eq!(config.pixel_area_ha, DEFAULT_PIXEL_AREA_HA);
        assert!(config.excluded_sample_ids.is_empty());
        assert!((config.total_area_ha() - 100_000.0).abs() < 1e-6);
        let w = config.area_weights().unwrap();
        assert!((w[0] - 0.52).abs() < 1e-12);
    }

    #[test]
    fn exclusion_list_becomes_filter() {
        let json = r#"{
            "class_labels": ["Non-Crop", "Crop"],
            "pixel_counts": [1, 1],
            "pixel_area_ha": 0.09,
            "excluded_sample_ids": ["s-17"]
        }"#;
        let config = EstimateConfig::from_json_str(json).unwrap();
        let filter = config.sample_filter();
        assert!(!filter.allows(&SampleRecord::new(0.0, 0.0).with_id("s-17")));
        assert!(filter.allows(&SampleRecord::new(0.0, 0.0).with_id("s-18")));
    }

    #[test]
    fn rejects_inconsistent_configs() {
        let cases = [
            r#"{"class_labels": [], "pixel_counts": []}"#,
            r#"{"class_labels": ["a", "b"], "pixel_counts": [1]}"#,
            r#"{"class_labels": ["a"], "pixel_counts": [0]}"#,
            r#"{"class_labels": ["a"], "pixel_counts": [1], "pixel_area_ha": 0.0}"#,
            r#"{"class_labels": ["a"], "pixel_counts": [-1]}"#,
            r#"not json"#,
        ];
        for json in cases {
            assert!(
                matches!(EstimateConfig::from_json_str(json), Err(EstimateError::InvalidConfig(_))),
                "accepted {json}"
            );
        }
    }
}
