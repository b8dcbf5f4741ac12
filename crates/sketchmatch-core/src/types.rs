use crate::error::ConfigError;
use chrono::{DateTime, Utc};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// Face embedding vector returned alongside a synthesized sketch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn dimension(&self) -> usize {
        self.values.len()
    }
}

/// A user-provided image held in memory, previewable locally.
#[derive(Clone, PartialEq)]
pub struct LocalImage {
    pub id: Uuid,
    pub file_name: String,
    pub format: ImageFormat,
    pub bytes: Arc<[u8]>,
}

impl LocalImage {
    pub fn new(file_name: impl Into<String>, format: ImageFormat, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_name: file_name.into(),
            format,
            bytes: bytes.into(),
        }
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }
}

impl fmt::Debug for LocalImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalImage")
            .field("id", &self.id)
            .field("file_name", &self.file_name)
            .field("format", &self.format)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Preview reference for a probe image.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageHandle {
    /// A captured file, previewed from memory.
    Local(LocalImage),
    /// A synthesized asset, previewed from the service.
    Remote { url: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeSource {
    RawUpload,
    ComposedSketch,
    TransformedSketch,
}

/// Photo-to-sketch conversion method offered by the sketch service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SketchMethod {
    #[default]
    Adaptive,
    Pencil,
    Edge,
}

impl SketchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SketchMethod::Adaptive => "adaptive",
            SketchMethod::Pencil => "pencil",
            SketchMethod::Edge => "edge",
        }
    }
}

impl FromStr for SketchMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "adaptive" => Ok(SketchMethod::Adaptive),
            "pencil" => Ok(SketchMethod::Pencil),
            "edge" => Ok(SketchMethod::Edge),
            other => Err(ConfigError::UnknownSketchMethod(other.to_string())),
        }
    }
}

impl fmt::Display for SketchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Asset produced remotely by composition or photo-to-sketch conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedAsset {
    pub asset_ref: String,
    pub embedding: Option<Embedding>,
}

/// The image submitted for similarity search.
///
/// Immutable once built; a new capture or synthesis produces a new `Probe`.
#[derive(Debug, Clone, PartialEq)]
pub struct Probe {
    source: ProbeSource,
    image: ImageHandle,
    asset_ref: Option<String>,
    method: Option<SketchMethod>,
    embedding: Option<Embedding>,
}

impl Probe {
    pub fn raw(image: LocalImage) -> Self {
        Self {
            source: ProbeSource::RawUpload,
            image: ImageHandle::Local(image),
            asset_ref: None,
            method: None,
            embedding: None,
        }
    }

    pub fn composed(asset: SynthesizedAsset) -> Self {
        Self::synthesized(ProbeSource::ComposedSketch, asset, None)
    }

    pub fn transformed(asset: SynthesizedAsset, method: SketchMethod) -> Self {
        Self::synthesized(ProbeSource::TransformedSketch, asset, Some(method))
    }

    fn synthesized(source: ProbeSource, asset: SynthesizedAsset, method: Option<SketchMethod>) -> Self {
        Self {
            source,
            image: ImageHandle::Remote {
                url: asset.asset_ref.clone(),
            },
            asset_ref: Some(asset.asset_ref),
            method,
            embedding: asset.embedding,
        }
    }

    pub fn source(&self) -> ProbeSource {
        self.source
    }

    pub fn image(&self) -> &ImageHandle {
        &self.image
    }

    pub fn asset_ref(&self) -> Option<&str> {
        self.asset_ref.as_deref()
    }

    pub fn method(&self) -> Option<SketchMethod> {
        self.method
    }

    pub fn embedding(&self) -> Option<&Embedding> {
        self.embedding.as_ref()
    }
}

/// Facial feature category in the composer catalog.
///
/// The well-known categories get their own variants; anything else the
/// feature library serves is carried as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FeatureCategory {
    FaceShape,
    Eyes,
    Nose,
    Mouth,
    Eyebrows,
    Other(String),
}

impl FeatureCategory {
    pub const STANDARD: [FeatureCategory; 5] = [
        FeatureCategory::FaceShape,
        FeatureCategory::Eyes,
        FeatureCategory::Nose,
        FeatureCategory::Mouth,
        FeatureCategory::Eyebrows,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            FeatureCategory::FaceShape => "face_shape",
            FeatureCategory::Eyes => "eyes",
            FeatureCategory::Nose => "nose",
            FeatureCategory::Mouth => "mouth",
            FeatureCategory::Eyebrows => "eyebrows",
            FeatureCategory::Other(name) => name,
        }
    }
}

impl From<&str> for FeatureCategory {
    fn from(s: &str) -> Self {
        match s {
            "face_shape" => FeatureCategory::FaceShape,
            "eyes" => FeatureCategory::Eyes,
            "nose" => FeatureCategory::Nose,
            "mouth" => FeatureCategory::Mouth,
            "eyebrows" => FeatureCategory::Eyebrows,
            other => FeatureCategory::Other(other.to_string()),
        }
    }
}

impl From<String> for FeatureCategory {
    fn from(s: String) -> Self {
        FeatureCategory::from(s.as_str())
    }
}

impl From<FeatureCategory> for String {
    fn from(category: FeatureCategory) -> Self {
        category.as_str().to_string()
    }
}

impl fmt::Display for FeatureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVariant {
    pub id: String,
    pub name: String,
}

/// Feature library: every category with its ordered variants.
/// Loaded once, read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureCatalog {
    categories: BTreeMap<FeatureCategory, Vec<FeatureVariant>>,
}

impl FeatureCatalog {
    pub fn new(categories: BTreeMap<FeatureCategory, Vec<FeatureVariant>>) -> Self {
        Self { categories }
    }

    pub fn categories(&self) -> impl Iterator<Item = (&FeatureCategory, &[FeatureVariant])> {
        self.categories.iter().map(|(c, v)| (c, v.as_slice()))
    }

    pub fn variants(&self, category: &FeatureCategory) -> Option<&[FeatureVariant]> {
        self.categories.get(category).map(Vec::as_slice)
    }

    pub fn contains(&self, category: &FeatureCategory, variant_id: &str) -> bool {
        self.variants(category)
            .is_some_and(|variants| variants.iter().any(|v| v.id == variant_id))
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Display metadata attached to a stored face.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaceMetadata {
    pub name: Option<String>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub uploaded_at: Option<DateTime<Utc>>,
    pub original_filename: Option<String>,
}

/// One ranked match from the search service.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub id: String,
    /// Similarity percentage in [0, 100].
    pub similarity: f32,
    pub metadata: FaceMetadata,
    pub asset_ref: String,
}

/// Ranked matches for one search, in service order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    pub match_count: u32,
    pub results: Vec<MatchResult>,
}

impl SearchResponse {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// A face stored in the service gallery.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceRecord {
    pub id: String,
    pub metadata: FaceMetadata,
    pub asset_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}
