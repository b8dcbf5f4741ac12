//! Boundary to the remote face service.

use crate::composer::ComposeRequest;
use crate::error::ServiceError;
use crate::search::SearchRequest;
use crate::transform::TransformRequest;
use crate::types::{FaceRecord, FeatureCatalog, HealthStatus, LocalImage, SearchResponse, SynthesizedAsset};
use async_trait::async_trait;

/// Optional metadata stored with an uploaded face.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadMetadata {
    pub name: Option<String>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
}

impl UploadMetadata {
    /// Build metadata from free-form fields. Blank fields become `None`;
    /// tags are comma-separated, trimmed, with empty entries dropped.
    pub fn from_fields(name: &str, tags: &str, notes: &str) -> Self {
        Self {
            name: non_blank(name),
            tags: parse_tags(tags),
            notes: non_blank(notes),
        }
    }
}

pub fn parse_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

fn non_blank(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Remote operations the pipeline depends on.
///
/// Every call is a single request/response; implementations apply their
/// own transport timeout and never retry.
#[async_trait]
pub trait FaceService: Send + Sync {
    async fn upload_face(
        &self,
        image: &LocalImage,
        metadata: &UploadMetadata,
    ) -> Result<FaceRecord, ServiceError>;

    async fn search_faces(&self, request: &SearchRequest) -> Result<SearchResponse, ServiceError>;

    async fn list_faces(&self) -> Result<Vec<FaceRecord>, ServiceError>;

    async fn delete_face(&self, face_id: &str) -> Result<(), ServiceError>;

    async fn health(&self) -> Result<HealthStatus, ServiceError>;

    async fn feature_library(&self) -> Result<FeatureCatalog, ServiceError>;

    async fn compose_face(&self, request: &ComposeRequest) -> Result<SynthesizedAsset, ServiceError>;

    async fn image_to_sketch(
        &self,
        request: &TransformRequest,
    ) -> Result<SynthesizedAsset, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_tags("robbery, 2019 ,,  north district"), ["robbery", "2019", "north district"]);
        assert!(parse_tags("  ,  ").is_empty());
        assert!(parse_tags("").is_empty());
    }

    #[test]
    fn test_from_fields_drops_blanks() {
        let metadata = UploadMetadata::from_fields("  ", "a,b", "");
        assert_eq!(metadata.name, None);
        assert_eq!(metadata.notes, None);
        assert_eq!(metadata.tags, ["a", "b"]);

        let metadata = UploadMetadata::from_fields("John Doe", "", "seen at station");
        assert_eq!(metadata.name.as_deref(), Some("John Doe"));
        assert_eq!(metadata.notes.as_deref(), Some("seen at station"));
    }
}
