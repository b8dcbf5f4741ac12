//! Search requests: option validation and probe payload selection.

use crate::error::ValidationError;
use crate::types::{ImageHandle, LocalImage, Probe};

pub const MIN_SIMILARITY_RANGE: std::ops::RangeInclusive<f32> = 0.0..=100.0;
pub const MAX_RESULTS_RANGE: std::ops::RangeInclusive<u32> = 1..=50;

/// Tunable search thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    /// Minimum similarity percentage a match must reach.
    pub min_similarity: f32,
    pub max_results: u32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            min_similarity: 0.0,
            max_results: 10,
        }
    }
}

impl SearchOptions {
    pub fn new(min_similarity: f32, max_results: u32) -> Self {
        Self {
            min_similarity,
            max_results,
        }
    }

    /// Reject out-of-range values. Nothing is clamped.
    pub fn validate(&self) -> Result<(), ValidationError> {
        // NaN fails `contains`, so it is rejected too
        if !MIN_SIMILARITY_RANGE.contains(&self.min_similarity) {
            return Err(ValidationError::MinSimilarityOutOfRange(self.min_similarity));
        }
        if !MAX_RESULTS_RANGE.contains(&self.max_results) {
            return Err(ValidationError::MaxResultsOutOfRange(self.max_results));
        }
        Ok(())
    }
}

/// What the service is asked to search with.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbePayload {
    /// Raw image bytes of a captured file.
    Image(LocalImage),
    /// Reference to a sketch the service synthesized earlier.
    AssetRef(String),
}

impl ProbePayload {
    pub fn for_probe(probe: &Probe) -> Self {
        match (probe.asset_ref(), probe.image()) {
            (Some(asset_ref), _) => ProbePayload::AssetRef(asset_ref.to_string()),
            (None, ImageHandle::Local(image)) => ProbePayload::Image(image.clone()),
            (None, ImageHandle::Remote { url }) => ProbePayload::AssetRef(url.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub probe: ProbePayload,
    pub options: SearchOptions,
}

impl SearchRequest {
    /// Validate options and build the request for `probe`.
    pub fn new(probe: &Probe, options: SearchOptions) -> Result<Self, ValidationError> {
        options.validate()?;
        Ok(Self {
            probe: ProbePayload::for_probe(probe),
            options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SketchMethod, SynthesizedAsset};
    use image::ImageFormat;

    fn raw_probe() -> Probe {
        Probe::raw(LocalImage::new("a.png", ImageFormat::Png, vec![1u8]))
    }

    #[test]
    fn test_bounds_are_inclusive() {
        assert!(SearchOptions::new(0.0, 1).validate().is_ok());
        assert!(SearchOptions::new(100.0, 50).validate().is_ok());
        assert!(SearchOptions::default().validate().is_ok());
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert_eq!(
            SearchOptions::new(-0.5, 10).validate(),
            Err(ValidationError::MinSimilarityOutOfRange(-0.5))
        );
        assert_eq!(
            SearchOptions::new(100.1, 10).validate(),
            Err(ValidationError::MinSimilarityOutOfRange(100.1))
        );
        assert_eq!(
            SearchOptions::new(50.0, 0).validate(),
            Err(ValidationError::MaxResultsOutOfRange(0))
        );
        assert_eq!(
            SearchOptions::new(50.0, 51).validate(),
            Err(ValidationError::MaxResultsOutOfRange(51))
        );
        assert!(SearchOptions::new(f32::NAN, 10).validate().is_err());
    }

    #[test]
    fn test_request_rejects_before_building() {
        assert!(SearchRequest::new(&raw_probe(), SearchOptions::new(0.0, 99)).is_err());
    }

    #[test]
    fn test_payload_for_raw_probe_is_image() {
        let probe = raw_probe();
        let request = SearchRequest::new(&probe, SearchOptions::default()).unwrap();
        assert!(matches!(request.probe, ProbePayload::Image(ref img) if img.file_name == "a.png"));
    }

    #[test]
    fn test_payload_for_sketch_is_asset_ref() {
        let probe = Probe::transformed(
            SynthesizedAsset { asset_ref: "/media/sketch.png".into(), embedding: None },
            SketchMethod::Adaptive,
        );
        assert_eq!(
            ProbePayload::for_probe(&probe),
            ProbePayload::AssetRef("/media/sketch.png".into())
        );
    }
}
