//! HTTP implementation of [`FaceService`].

use crate::wire::{
    self, WireComposeBody, WireListReply, WireRecordReply, WireSearchResponse, WireSketch,
};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use sketchmatch_core::{
    ComposeRequest, FaceRecord, FaceService, FeatureCatalog, HealthStatus, LocalImage,
    ProbePayload, SearchRequest, SearchResponse, ServiceError, SynthesizedAsset,
    TransformRequest, UploadMetadata,
};
use std::time::Duration;

const USER_AGENT: &str = concat!("sketchmatch/", env!("CARGO_PKG_VERSION"));

/// Talks to the face service REST API rooted at `base_url`.
pub struct HttpFaceService {
    http: reqwest::Client,
    base_url: String,
}

impl HttpFaceService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        tracing::debug!(%base_url, ?timeout, "face service client ready");
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn execute(&self, op: &'static str, request: RequestBuilder) -> Result<Response, ServiceError> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!(op, error = %e, "face service unreachable");
            ServiceError::Network(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(op, status = status.as_u16(), "face service ok");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = wire::error_message(&body);
        tracing::warn!(op, status = status.as_u16(), %message, "face service error");
        Err(ServiceError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        op: &'static str,
        request: RequestBuilder,
    ) -> Result<T, ServiceError> {
        self.execute(op, request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| ServiceError::Decode(format!("{op}: {e}")))
    }
}

fn image_part(image: &LocalImage) -> Result<Part, ServiceError> {
    file_part(image.bytes.to_vec(), &image.file_name, image.mime_type())
}

fn file_part(bytes: Vec<u8>, file_name: &str, mime: &str) -> Result<Part, ServiceError> {
    Part::bytes(bytes)
        .file_name(file_name.to_string())
        .mime_str(mime)
        .map_err(|e| ServiceError::Encode(format!("{file_name}: {e}")))
}

fn flag(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

#[async_trait]
impl FaceService for HttpFaceService {
    async fn upload_face(
        &self,
        image: &LocalImage,
        metadata: &UploadMetadata,
    ) -> Result<FaceRecord, ServiceError> {
        let mut form = Form::new().part("image", image_part(image)?);
        if let Some(name) = &metadata.name {
            form = form.text("name", name.clone());
        }
        if let Some(notes) = &metadata.notes {
            form = form.text("notes", notes.clone());
        }
        for tag in &metadata.tags {
            form = form.text("tags", tag.clone());
        }

        let request = self.http.post(self.endpoint("faces/upload/")).multipart(form);
        let reply: WireRecordReply = self.fetch("upload", request).await?;
        Ok(reply.into())
    }

    async fn search_faces(&self, request: &SearchRequest) -> Result<SearchResponse, ServiceError> {
        let form = match &request.probe {
            ProbePayload::Image(image) => Form::new().part("image", image_part(image)?),
            ProbePayload::AssetRef(url) => Form::new().text("sketch_url", url.clone()),
        }
        .text("min_similarity", request.options.min_similarity.to_string())
        .text("max_results", request.options.max_results.to_string());

        let http = self.http.post(self.endpoint("faces/search/")).multipart(form);
        let reply: WireSearchResponse = self.fetch("search", http).await?;
        Ok(reply.into())
    }

    async fn list_faces(&self) -> Result<Vec<FaceRecord>, ServiceError> {
        let request = self.http.get(self.endpoint("faces/list/"));
        let reply: WireListReply = self.fetch("list", request).await?;
        Ok(reply.into())
    }

    async fn delete_face(&self, id: &str) -> Result<(), ServiceError> {
        let request = self.http.delete(self.endpoint(&format!("faces/delete/{id}/")));
        self.execute("delete", request).await?;
        Ok(())
    }

    async fn health(&self) -> Result<HealthStatus, ServiceError> {
        let request = self.http.get(self.endpoint("faces/health/"));
        self.fetch("health", request).await
    }

    async fn feature_library(&self) -> Result<FeatureCatalog, ServiceError> {
        let request = self.http.get(self.endpoint("faces/sketch/feature-library/"));
        self.fetch("feature_library", request).await
    }

    async fn compose_face(&self, request: &ComposeRequest) -> Result<SynthesizedAsset, ServiceError> {
        let body = WireComposeBody {
            features: &request.features,
            enhance_gan: request.enhance_gan,
            get_encoding: request.request_embedding,
        };
        let http = self
            .http
            .post(self.endpoint("faces/sketch/compose-face/"))
            .json(&body);
        let reply: WireSketch = self.fetch("compose", http).await?;
        Ok(reply.into())
    }

    async fn image_to_sketch(
        &self,
        request: &TransformRequest,
    ) -> Result<SynthesizedAsset, ServiceError> {
        let form = Form::new()
            .part("image", image_part(&request.image)?)
            .text("method", request.method.as_str())
            .text("is_blurry", flag(request.deblur))
            .text("enhance_gan", flag(request.enhance_gan))
            .text("get_encoding", flag(request.request_embedding));

        let http = self
            .http
            .post(self.endpoint("faces/sketch/image-to-sketch/"))
            .multipart(form);
        let reply: WireSketch = self.fetch("image_to_sketch", http).await?;
        Ok(reply.into())
    }
}
