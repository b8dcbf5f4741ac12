//! Async driver for a [`ProbeSession`].
//!
//! One tokio task owns the session. Callers talk to it through a clone-safe
//! [`PipelineHandle`]; remote calls run as spawned tasks and post their
//! results back to the owner tagged with the ticket they were issued under.
//! Every state change is published on a `watch` channel.

use crate::capture::CandidateFile;
use crate::composer::CatalogStatus;
use crate::error::{ServiceError, SessionError};
use crate::search::SearchOptions;
use crate::service::FaceService;
use crate::session::{
    Outcome, PendingCompose, PendingSearch, PendingTransform, ProbeSession, SearchMode,
    SessionSnapshot, Ticket,
};
use crate::transform::TransformOptions;
use crate::types::{FeatureCatalog, FeatureCategory, SearchResponse, SynthesizedAsset};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

/// Messages sent from handles to the pipeline task.
enum PipelineRequest {
    Capture {
        files: Vec<CandidateFile>,
        reply: oneshot::Sender<bool>,
    },
    LoadCatalog {
        reply: oneshot::Sender<bool>,
    },
    SelectFeature {
        category: FeatureCategory,
        variant_id: String,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    ResetComposer {
        reply: oneshot::Sender<()>,
    },
    Compose {
        enhance_gan: bool,
        reply: oneshot::Sender<Result<Ticket, SessionError>>,
    },
    Transform {
        options: TransformOptions,
        reply: oneshot::Sender<Result<Ticket, SessionError>>,
    },
    Search {
        reply: oneshot::Sender<Result<Ticket, SessionError>>,
    },
    Configure {
        mode: Option<SearchMode>,
        options: Option<SearchOptions>,
        reply: oneshot::Sender<()>,
    },
    Abandon {
        reply: oneshot::Sender<()>,
    },
}

/// Remote results posted back by spawned request tasks.
enum Completed {
    Catalog(Result<FeatureCatalog, ServiceError>),
    Compose {
        ticket: Ticket,
        result: Result<SynthesizedAsset, ServiceError>,
    },
    Transform {
        ticket: Ticket,
        result: Result<SynthesizedAsset, ServiceError>,
    },
    Search {
        ticket: Ticket,
        result: Result<SearchResponse, ServiceError>,
    },
}

/// Clone-safe handle to the pipeline task.
#[derive(Clone)]
pub struct PipelineHandle {
    tx: mpsc::Sender<PipelineRequest>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl PipelineHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> PipelineRequest,
    ) -> Result<T, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| SessionError::ChannelClosed)?;
        reply_rx.await.map_err(|_| SessionError::ChannelClosed)
    }

    /// Offer files to the capture surface. Returns whether an image was accepted.
    pub async fn capture(&self, files: Vec<CandidateFile>) -> Result<bool, SessionError> {
        self.request(|reply| PipelineRequest::Capture { files, reply }).await
    }

    /// Fetch the feature library unless it is loaded or loading.
    /// Returns whether a fetch was issued.
    pub async fn load_catalog(&self) -> Result<bool, SessionError> {
        self.request(|reply| PipelineRequest::LoadCatalog { reply }).await
    }

    pub async fn select_feature(
        &self,
        category: FeatureCategory,
        variant_id: impl Into<String>,
    ) -> Result<(), SessionError> {
        let variant_id = variant_id.into();
        self.request(|reply| PipelineRequest::SelectFeature {
            category,
            variant_id,
            reply,
        })
        .await?
    }

    pub async fn reset_composer(&self) -> Result<(), SessionError> {
        self.request(|reply| PipelineRequest::ResetComposer { reply }).await
    }

    pub async fn compose(&self, enhance_gan: bool) -> Result<Ticket, SessionError> {
        self.request(|reply| PipelineRequest::Compose { enhance_gan, reply })
            .await?
    }

    /// Convert the captured photo into a sketch. An unrecognized `method`
    /// fails the call before anything is sent to the pipeline.
    pub async fn transform(
        &self,
        method: &str,
        deblur: bool,
        enhance_gan: bool,
    ) -> Result<Ticket, SessionError> {
        let options = TransformOptions::parse(method, deblur, enhance_gan)?;
        self.request(|reply| PipelineRequest::Transform { options, reply })
            .await?
    }

    pub async fn search(&self) -> Result<Ticket, SessionError> {
        self.request(|reply| PipelineRequest::Search { reply }).await?
    }

    pub async fn set_search_options(&self, options: SearchOptions) -> Result<(), SessionError> {
        self.request(|reply| PipelineRequest::Configure {
            mode: None,
            options: Some(options),
            reply,
        })
        .await
    }

    pub async fn set_mode(&self, mode: SearchMode) -> Result<(), SessionError> {
        self.request(|reply| PipelineRequest::Configure {
            mode: Some(mode),
            options: None,
            reply,
        })
        .await
    }

    pub async fn abandon(&self) -> Result<(), SessionError> {
        self.request(|reply| PipelineRequest::Abandon { reply }).await
    }

    /// Latest published state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until no construction, search or catalog load is outstanding.
    pub async fn settled(&self) -> Result<SessionSnapshot, SessionError> {
        self.wait_for(|s| !s.state.is_busy() && !matches!(s.catalog, CatalogStatus::Loading))
            .await
    }

    pub async fn wait_for(
        &self,
        condition: impl FnMut(&SessionSnapshot) -> bool,
    ) -> Result<SessionSnapshot, SessionError> {
        let mut rx = self.snapshots.clone();
        let snapshot = rx
            .wait_for(condition)
            .await
            .map_err(|_| SessionError::ChannelClosed)?;
        Ok(snapshot.clone())
    }
}

struct Pipeline {
    session: ProbeSession,
    service: Arc<dyn FaceService>,
    snapshots: watch::Sender<SessionSnapshot>,
    completions: mpsc::UnboundedSender<Completed>,
}

/// Spawn the pipeline task on the current tokio runtime.
pub fn spawn_pipeline(
    service: Arc<dyn FaceService>,
    mode: SearchMode,
    options: SearchOptions,
) -> PipelineHandle {
    let session = ProbeSession::new(mode, options);
    let (tx, rx) = mpsc::channel::<PipelineRequest>(16);
    let (snapshots, snapshot_rx) = watch::channel(session.snapshot());
    let (completions, completion_rx) = mpsc::unbounded_channel();

    let pipeline = Pipeline {
        session,
        service,
        snapshots,
        completions,
    };
    tokio::spawn(pipeline.run(rx, completion_rx));

    PipelineHandle {
        tx,
        snapshots: snapshot_rx,
    }
}

impl Pipeline {
    async fn run(
        mut self,
        mut requests: mpsc::Receiver<PipelineRequest>,
        mut completions: mpsc::UnboundedReceiver<Completed>,
    ) {
        tracing::info!("pipeline started");
        loop {
            tokio::select! {
                req = requests.recv() => match req {
                    Some(req) => self.handle_request(req),
                    None => break,
                },
                Some(done) = completions.recv() => self.handle_completion(done),
            }
        }
        tracing::info!("pipeline exiting");
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.session.snapshot());
    }

    fn apply(&mut self, outcome: Outcome) -> bool {
        match outcome {
            Outcome::Discarded => false,
            Outcome::Settled => true,
            Outcome::SearchQueued(pending) => {
                self.dispatch_search(pending);
                true
            }
        }
    }

    fn handle_request(&mut self, req: PipelineRequest) {
        // Each arm publishes before replying so a caller that awaits the
        // reply always observes its own transition.
        match req {
            PipelineRequest::Capture { files, reply } => {
                let outcome = self.session.capture(files);
                let accepted = self.apply(outcome);
                self.publish();
                let _ = reply.send(accepted);
            }
            PipelineRequest::LoadCatalog { reply } => {
                let issued = self.session.begin_catalog_load();
                if issued {
                    self.dispatch_catalog();
                }
                self.publish();
                let _ = reply.send(issued);
            }
            PipelineRequest::SelectFeature {
                category,
                variant_id,
                reply,
            } => {
                let result = self
                    .session
                    .select_feature(category, &variant_id)
                    .map_err(SessionError::from);
                self.publish();
                let _ = reply.send(result);
            }
            PipelineRequest::ResetComposer { reply } => {
                self.session.reset_composer();
                self.publish();
                let _ = reply.send(());
            }
            PipelineRequest::Compose { enhance_gan, reply } => {
                let result = self.session.begin_compose(enhance_gan).map(|pending| {
                    let ticket = pending.ticket;
                    self.dispatch_compose(pending);
                    ticket
                });
                self.publish();
                let _ = reply.send(result.map_err(SessionError::from));
            }
            PipelineRequest::Transform { options, reply } => {
                let result = self.session.begin_transform(options).map(|pending| {
                    let ticket = pending.ticket;
                    self.dispatch_transform(pending);
                    ticket
                });
                self.publish();
                let _ = reply.send(result.map_err(SessionError::from));
            }
            PipelineRequest::Search { reply } => {
                let result = self.session.begin_search().map(|pending| {
                    let ticket = pending.ticket;
                    self.dispatch_search(pending);
                    ticket
                });
                self.publish();
                let _ = reply.send(result.map_err(SessionError::from));
            }
            PipelineRequest::Configure {
                mode,
                options,
                reply,
            } => {
                if let Some(mode) = mode {
                    self.session.set_mode(mode);
                }
                if let Some(options) = options {
                    self.session.set_search_options(options);
                }
                self.publish();
                let _ = reply.send(());
            }
            PipelineRequest::Abandon { reply } => {
                self.session.abandon();
                self.publish();
                let _ = reply.send(());
            }
        }
    }

    fn handle_completion(&mut self, done: Completed) {
        match done {
            Completed::Catalog(result) => self.session.complete_catalog_load(result),
            Completed::Compose { ticket, result } => {
                let outcome = self.session.complete_compose(ticket, result);
                self.apply(outcome);
            }
            Completed::Transform { ticket, result } => {
                let outcome = self.session.complete_transform(ticket, result);
                self.apply(outcome);
            }
            Completed::Search { ticket, result } => {
                let outcome = self.session.complete_search(ticket, result);
                self.apply(outcome);
            }
        }
        // published even for stale completions so the drop counter is visible
        self.publish();
    }

    fn dispatch_catalog(&self) {
        let service = Arc::clone(&self.service);
        let done = self.completions.clone();
        tokio::spawn(async move {
            let result = service.feature_library().await;
            let _ = done.send(Completed::Catalog(result));
        });
    }

    fn dispatch_compose(&self, pending: PendingCompose) {
        tracing::debug!(
            ticket = pending.ticket.value(),
            enhance_gan = pending.request.enhance_gan,
            "compose dispatched"
        );
        let service = Arc::clone(&self.service);
        let done = self.completions.clone();
        tokio::spawn(async move {
            let result = service.compose_face(&pending.request).await;
            let _ = done.send(Completed::Compose {
                ticket: pending.ticket,
                result,
            });
        });
    }

    fn dispatch_transform(&self, pending: PendingTransform) {
        tracing::debug!(
            ticket = pending.ticket.value(),
            method = %pending.request.method,
            deblur = pending.request.deblur,
            enhance_gan = pending.request.enhance_gan,
            "transform dispatched"
        );
        let service = Arc::clone(&self.service);
        let done = self.completions.clone();
        tokio::spawn(async move {
            let result = service.image_to_sketch(&pending.request).await;
            let _ = done.send(Completed::Transform {
                ticket: pending.ticket,
                result,
            });
        });
    }

    fn dispatch_search(&self, pending: PendingSearch) {
        tracing::debug!(ticket = pending.ticket.value(), "search dispatched");
        let service = Arc::clone(&self.service);
        let done = self.completions.clone();
        tokio::spawn(async move {
            let result = service.search_faces(&pending.request).await;
            let _ = done.send(Completed::Search {
                ticket: pending.ticket,
                result,
            });
        });
    }
}
