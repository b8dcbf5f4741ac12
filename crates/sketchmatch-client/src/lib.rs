//! sketchmatch-client: reqwest-backed [`FaceService`](sketchmatch_core::FaceService).
//!
//! All endpoints live under one base URL, e.g. `http://localhost:8000/api`.
//! Non-2xx replies become [`ServiceError::Status`](sketchmatch_core::ServiceError::Status)
//! carrying the server's `error` message when it sends one.

pub mod api;
mod wire;

pub use api::HttpFaceService;
