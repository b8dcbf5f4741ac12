//! JSON shapes exchanged with the face service, and their conversion into
//! core types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sketchmatch_core::{
    Embedding, FaceMetadata, FaceRecord, FeatureSelection, MatchResult, SearchResponse,
    SynthesizedAsset,
};

/// Stored face as serialized by the service.
#[derive(Debug, Deserialize)]
pub(crate) struct WireFace {
    #[serde(deserialize_with = "id_string")]
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    uploaded_at: Option<String>,
    #[serde(default)]
    original_filename: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
}

impl WireFace {
    fn metadata(&mut self) -> FaceMetadata {
        FaceMetadata {
            name: non_blank(self.name.take()),
            tags: self.tags.take().unwrap_or_default(),
            notes: non_blank(self.notes.take()),
            uploaded_at: self.uploaded_at.as_deref().and_then(parse_timestamp),
            original_filename: non_blank(self.original_filename.take()),
        }
    }
}

impl From<WireFace> for FaceRecord {
    fn from(mut face: WireFace) -> Self {
        let metadata = face.metadata();
        FaceRecord {
            id: face.id,
            metadata,
            asset_ref: face.image_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireMatch {
    #[serde(flatten)]
    face: WireFace,
    similarity: f32,
}

impl From<WireMatch> for MatchResult {
    fn from(entry: WireMatch) -> Self {
        let mut face = entry.face;
        let metadata = face.metadata();
        MatchResult {
            id: face.id,
            similarity: entry.similarity,
            metadata,
            asset_ref: face.image_url.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireSearchResponse {
    #[serde(default)]
    matches_found: Option<u32>,
    #[serde(default)]
    results: Vec<WireMatch>,
}

impl From<WireSearchResponse> for SearchResponse {
    fn from(wire: WireSearchResponse) -> Self {
        let results: Vec<MatchResult> = wire.results.into_iter().map(MatchResult::from).collect();
        SearchResponse {
            match_count: wire.matches_found.unwrap_or(results.len() as u32),
            results,
        }
    }
}

/// Upload replies either with the record itself or wrapped under `data`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum WireRecordReply {
    Wrapped { data: WireFace },
    Bare(WireFace),
}

impl From<WireRecordReply> for FaceRecord {
    fn from(reply: WireRecordReply) -> Self {
        match reply {
            WireRecordReply::Wrapped { data } | WireRecordReply::Bare(data) => data.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum WireListReply {
    Bare(Vec<WireFace>),
    Wrapped {
        #[serde(alias = "data", alias = "results")]
        faces: Vec<WireFace>,
    },
}

impl From<WireListReply> for Vec<FaceRecord> {
    fn from(reply: WireListReply) -> Self {
        let (WireListReply::Bare(faces) | WireListReply::Wrapped { faces }) = reply;
        faces.into_iter().map(FaceRecord::from).collect()
    }
}

/// Reply of both compose-face and image-to-sketch.
#[derive(Debug, Deserialize)]
pub(crate) struct WireSketch {
    sketch_url: String,
    #[serde(default)]
    encoding: Option<Vec<f32>>,
}

impl From<WireSketch> for SynthesizedAsset {
    fn from(wire: WireSketch) -> Self {
        SynthesizedAsset {
            asset_ref: wire.sketch_url,
            embedding: wire.encoding.map(|values| Embedding { values }),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct WireComposeBody<'a> {
    pub features: &'a FeatureSelection,
    pub enhance_gan: bool,
    pub get_encoding: bool,
}

#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

/// Pull a human-readable message out of an error body. Empty when the body
/// carries none.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<WireError>(body)
        .ok()
        .and_then(|e| e.error.or(e.detail))
        .unwrap_or_default()
}

fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }
    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            tracing::debug!(raw, error = %e, "unparseable uploaded_at");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchmatch_core::FeatureCategory;

    #[test]
    fn test_search_response_keeps_server_order() {
        let body = r#"{
            "matches_found": 2,
            "results": [
                {"id": 7, "similarity": 61.2, "name": "A", "tags": ["robbery"],
                 "notes": "", "uploaded_at": "2024-03-01T10:15:00Z",
                 "original_filename": "a.jpg", "image_url": "/media/faces/a.jpg"},
                {"id": "b-uuid", "similarity": 92.0, "name": null,
                 "image_url": "/media/faces/b.jpg"}
            ]
        }"#;
        let wire: WireSearchResponse = serde_json::from_str(body).unwrap();
        let response = SearchResponse::from(wire);

        assert_eq!(response.match_count, 2);
        assert_eq!(response.results[0].id, "7");
        assert_eq!(response.results[1].id, "b-uuid");
        assert_eq!(response.results[1].similarity, 92.0);

        let first = &response.results[0].metadata;
        assert_eq!(first.name.as_deref(), Some("A"));
        assert_eq!(first.tags, ["robbery"]);
        assert_eq!(first.notes, None, "blank notes are dropped");
        assert_eq!(
            first.uploaded_at.map(|t| t.to_rfc3339()),
            Some("2024-03-01T10:15:00+00:00".to_string())
        );
        assert!(response.results[1].metadata.tags.is_empty());
    }

    #[test]
    fn test_empty_search_response() {
        let wire: WireSearchResponse =
            serde_json::from_str(r#"{"matches_found": 0, "results": []}"#).unwrap();
        let response = SearchResponse::from(wire);
        assert_eq!(response.match_count, 0);
        assert!(response.is_empty());
    }

    #[test]
    fn test_match_count_defaults_to_result_len() {
        let wire: WireSearchResponse =
            serde_json::from_str(r#"{"results": [{"id": 1, "similarity": 50}]}"#).unwrap();
        assert_eq!(SearchResponse::from(wire).match_count, 1);
    }

    #[test]
    fn test_bad_timestamp_is_dropped() {
        let wire: WireFace =
            serde_json::from_str(r#"{"id": 1, "uploaded_at": "last tuesday"}"#).unwrap();
        let record = FaceRecord::from(wire);
        assert!(record.metadata.uploaded_at.is_none());
    }

    #[test]
    fn test_record_reply_shapes() {
        let wrapped: WireRecordReply =
            serde_json::from_str(r#"{"message": "ok", "data": {"id": 3, "name": "X"}}"#).unwrap();
        assert_eq!(FaceRecord::from(wrapped).id, "3");

        let bare: WireRecordReply = serde_json::from_str(r#"{"id": 4}"#).unwrap();
        assert_eq!(FaceRecord::from(bare).id, "4");
    }

    #[test]
    fn test_list_reply_shapes() {
        let bare: WireListReply = serde_json::from_str(r#"[{"id": 1}, {"id": 2}]"#).unwrap();
        assert_eq!(Vec::<FaceRecord>::from(bare).len(), 2);

        let wrapped: WireListReply =
            serde_json::from_str(r#"{"count": 1, "faces": [{"id": 1}]}"#).unwrap();
        assert_eq!(Vec::<FaceRecord>::from(wrapped).len(), 1);
    }

    #[test]
    fn test_sketch_reply_with_encoding() {
        let wire: WireSketch = serde_json::from_str(
            r#"{"sketch_url": "/media/sketches/1.png", "encoding": [0.1, 0.2, 0.3]}"#,
        )
        .unwrap();
        let asset = SynthesizedAsset::from(wire);
        assert_eq!(asset.asset_ref, "/media/sketches/1.png");
        assert_eq!(asset.embedding.map(|e| e.dimension()), Some(3));
    }

    #[test]
    fn test_compose_body() {
        let mut features = FeatureSelection::new();
        features.set(FeatureCategory::Mouth, "wide_2");
        let body = WireComposeBody {
            features: &features,
            enhance_gan: false,
            get_encoding: true,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["features"]["mouth"], "wide_2");
        assert!(json["features"]["face_shape"].is_null());
        assert_eq!(json["enhance_gan"], false);
        assert_eq!(json["get_encoding"], true);
    }

    #[test]
    fn test_error_message() {
        assert_eq!(error_message(r#"{"error": "No face detected"}"#), "No face detected");
        assert_eq!(error_message(r#"{"detail": "Not found."}"#), "Not found.");
        assert_eq!(error_message("<html>502</html>"), "");
        assert_eq!(error_message(""), "");
    }
}
