//! sketchmatch-core: probe construction and face search pipeline.
//!
//! Builds a search probe from a captured photo, a composed feature sketch or
//! a photo-to-sketch transform, submits it to a remote face service, and
//! ranks the matches into confidence tiers. Remote work goes through the
//! [`FaceService`] trait.

pub mod capture;
pub mod composer;
pub mod error;
pub mod pipeline;
pub mod results;
pub mod search;
pub mod service;
pub mod session;
pub mod transform;
pub mod types;

pub use capture::{CandidateFile, CaptureSurface};
pub use composer::{CatalogStatus, ComposeRequest, FeatureComposer, FeatureSelection};
pub use error::{ConfigError, ServiceError, SessionError, ValidationError};
pub use pipeline::{spawn_pipeline, PipelineHandle};
pub use results::{ConfidenceTier, DisplayMode, ResultsView};
pub use search::{ProbePayload, SearchOptions, SearchRequest};
pub use service::{FaceService, UploadMetadata};
pub use session::{ProbeSession, SearchMode, SessionSnapshot, SessionState, Stage, Ticket};
pub use transform::{TransformOptions, TransformRequest};
pub use types::{
    Embedding, FaceMetadata, FaceRecord, FeatureCatalog, FeatureCategory, FeatureVariant,
    HealthStatus, ImageHandle, LocalImage, MatchResult, Probe, ProbeSource, SearchResponse,
    SketchMethod, SynthesizedAsset,
};
