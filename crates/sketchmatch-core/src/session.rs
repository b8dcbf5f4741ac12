//! Probe session: the state machine that owns the active probe.
//!
//! Every construction or search begins by issuing a fresh [`Ticket`]. The
//! matching completion hands the ticket back, and it is applied only if the
//! session is still waiting on that exact ticket. Anything else is a stale
//! completion for a superseded probe or search, and is dropped.

use crate::capture::{CandidateFile, CaptureSurface};
use crate::composer::{CatalogStatus, ComposeRequest, FeatureComposer, FeatureSelection};
use crate::error::{ServiceError, ValidationError};
use crate::search::{SearchOptions, SearchRequest};
use crate::transform::{TransformOptions, TransformRequest};
use crate::types::{
    FeatureCatalog, FeatureCategory, LocalImage, Probe, SearchResponse, SketchMethod,
    SynthesizedAsset,
};

const COMPOSE_FAILED: &str = "Failed to compose face";
const TRANSFORM_FAILED: &str = "Failed to generate sketch";
const SEARCH_FAILED: &str = "Failed to search faces";
const CATALOG_FAILED: &str = "Failed to load facial features";

/// Generation tag for one construction or search request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructionKind {
    Capture,
    Composition,
    Transform(SketchMethod),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Construction,
    Search,
}

/// Whether a freshly built probe is searched immediately or on request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    Auto,
    #[default]
    Manual,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Empty,
    Constructing {
        ticket: Ticket,
        kind: ConstructionKind,
    },
    Ready {
        probe: Probe,
    },
    Searching {
        probe: Probe,
        ticket: Ticket,
    },
    Displayed {
        probe: Probe,
        response: SearchResponse,
    },
    Error {
        stage: Stage,
        /// Kept after a failed search so it can be retried.
        probe: Option<Probe>,
        message: String,
    },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Empty => "empty",
            SessionState::Constructing { .. } => "constructing",
            SessionState::Ready { .. } => "ready",
            SessionState::Searching { .. } => "searching",
            SessionState::Displayed { .. } => "displayed",
            SessionState::Error { .. } => "error",
        }
    }

    /// The active probe, if the session has one.
    pub fn probe(&self) -> Option<&Probe> {
        match self {
            SessionState::Empty | SessionState::Constructing { .. } => None,
            SessionState::Ready { probe }
            | SessionState::Searching { probe, .. }
            | SessionState::Displayed { probe, .. } => Some(probe),
            SessionState::Error { probe, .. } => probe.as_ref(),
        }
    }

    /// True while a remote construction or search is outstanding.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            SessionState::Constructing { .. } | SessionState::Searching { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingCompose {
    pub ticket: Ticket,
    pub request: ComposeRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingTransform {
    pub ticket: Ticket,
    pub request: TransformRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingSearch {
    pub ticket: Ticket,
    pub request: SearchRequest,
}

/// What a capture or completion did to the session.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum Outcome {
    /// Nothing changed: an ignored capture or a stale completion.
    Discarded,
    /// State updated; no further remote work needed.
    Settled,
    /// State updated and, in auto mode, a search must now be sent.
    SearchQueued(PendingSearch),
}

/// Read-only copy of everything a front end renders.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub catalog: CatalogStatus,
    pub selection: FeatureSelection,
    pub preview: Option<SynthesizedAsset>,
    pub options: SearchOptions,
    pub mode: SearchMode,
    /// Completions dropped because a newer request superseded them.
    pub stale_dropped: u64,
}

pub struct ProbeSession {
    state: SessionState,
    mode: SearchMode,
    options: SearchOptions,
    last_ticket: u64,
    stale_dropped: u64,
    captured: Option<LocalImage>,
    composer: FeatureComposer,
}

impl ProbeSession {
    pub fn new(mode: SearchMode, options: SearchOptions) -> Self {
        Self {
            state: SessionState::Empty,
            mode,
            options,
            last_ticket: 0,
            stale_dropped: 0,
            captured: None,
            composer: FeatureComposer::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn probe(&self) -> Option<&Probe> {
        self.state.probe()
    }

    /// Results on display, if the last search completed.
    pub fn response(&self) -> Option<&SearchResponse> {
        match &self.state {
            SessionState::Displayed { response, .. } => Some(response),
            _ => None,
        }
    }

    pub fn captured(&self) -> Option<&LocalImage> {
        self.captured.as_ref()
    }

    pub fn composer(&self) -> &FeatureComposer {
        &self.composer
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SearchMode) {
        self.mode = mode;
    }

    pub fn options(&self) -> SearchOptions {
        self.options
    }

    /// Options are stored as given and validated when a search is sent.
    pub fn set_search_options(&mut self, options: SearchOptions) {
        self.options = options;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state.clone(),
            catalog: self.composer.catalog_status().clone(),
            selection: self.composer.selection().clone(),
            preview: self.composer.preview().cloned(),
            options: self.options,
            mode: self.mode,
            stale_dropped: self.stale_dropped,
        }
    }

    fn issue_ticket(&mut self) -> Ticket {
        self.last_ticket += 1;
        Ticket(self.last_ticket)
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!(from = self.state.name(), to = next.name(), "session transition");
        self.state = next;
    }

    fn fail(&mut self, stage: Stage, probe: Option<Probe>, message: String) {
        self.transition(SessionState::Error {
            stage,
            probe,
            message,
        });
    }

    // --- construction ---

    /// Offer files from a drop or picker. An accepted image immediately
    /// becomes the active raw probe and clears any displayed results.
    pub fn capture(&mut self, files: Vec<CandidateFile>) -> Outcome {
        let Some(image) = CaptureSurface::accept(files) else {
            return Outcome::Discarded;
        };
        let ticket = self.issue_ticket();
        self.transition(SessionState::Constructing {
            ticket,
            kind: ConstructionKind::Capture,
        });
        self.captured = Some(image.clone());
        self.finish_construction(Probe::raw(image))
    }

    pub fn begin_compose(&mut self, enhance_gan: bool) -> Result<PendingCompose, ValidationError> {
        let request = self.composer.compose_request(enhance_gan)?;
        let ticket = self.issue_ticket();
        self.transition(SessionState::Constructing {
            ticket,
            kind: ConstructionKind::Composition,
        });
        Ok(PendingCompose { ticket, request })
    }

    pub fn complete_compose(
        &mut self,
        ticket: Ticket,
        result: Result<SynthesizedAsset, ServiceError>,
    ) -> Outcome {
        if self.construction_kind(ticket) != Some(ConstructionKind::Composition) {
            tracing::debug!(ticket = ticket.value(), "dropping stale composition");
            self.stale_dropped += 1;
            return Outcome::Discarded;
        }
        match result {
            Ok(asset) => {
                tracing::info!(ticket = ticket.value(), asset = %asset.asset_ref, "face composed");
                self.composer.set_preview(asset.clone());
                self.finish_construction(Probe::composed(asset))
            }
            Err(err) => {
                tracing::warn!(ticket = ticket.value(), error = %err, "composition failed");
                self.fail(Stage::Construction, None, err.user_message(COMPOSE_FAILED));
                Outcome::Settled
            }
        }
    }

    /// Start converting the most recently captured photo into a sketch.
    pub fn begin_transform(
        &mut self,
        options: TransformOptions,
    ) -> Result<PendingTransform, ValidationError> {
        let image = self.captured.clone().ok_or(ValidationError::NoImageCaptured)?;
        let ticket = self.issue_ticket();
        self.transition(SessionState::Constructing {
            ticket,
            kind: ConstructionKind::Transform(options.method),
        });
        Ok(PendingTransform {
            ticket,
            request: TransformRequest::new(image, options),
        })
    }

    pub fn complete_transform(
        &mut self,
        ticket: Ticket,
        result: Result<SynthesizedAsset, ServiceError>,
    ) -> Outcome {
        let Some(ConstructionKind::Transform(method)) = self.construction_kind(ticket) else {
            tracing::debug!(ticket = ticket.value(), "dropping stale transform");
            self.stale_dropped += 1;
            return Outcome::Discarded;
        };
        match result {
            Ok(asset) => {
                tracing::info!(ticket = ticket.value(), %method, asset = %asset.asset_ref, "sketch generated");
                self.finish_construction(Probe::transformed(asset, method))
            }
            Err(err) => {
                tracing::warn!(ticket = ticket.value(), error = %err, "transform failed");
                self.fail(Stage::Construction, None, err.user_message(TRANSFORM_FAILED));
                Outcome::Settled
            }
        }
    }

    fn construction_kind(&self, ticket: Ticket) -> Option<ConstructionKind> {
        match self.state {
            SessionState::Constructing { ticket: current, kind } if current == ticket => Some(kind),
            _ => None,
        }
    }

    fn finish_construction(&mut self, probe: Probe) -> Outcome {
        self.transition(SessionState::Ready { probe });
        if self.mode == SearchMode::Manual {
            return Outcome::Settled;
        }
        match self.begin_search() {
            Ok(pending) => Outcome::SearchQueued(pending),
            Err(err) => {
                let probe = self.state.probe().cloned();
                self.fail(Stage::Search, probe, err.to_string());
                Outcome::Settled
            }
        }
    }

    // --- search ---

    /// Submit the active probe with the current options, superseding any
    /// search already in flight.
    pub fn begin_search(&mut self) -> Result<PendingSearch, ValidationError> {
        let probe = self.state.probe().cloned().ok_or(ValidationError::NoProbe)?;
        let request = SearchRequest::new(&probe, self.options)?;
        let ticket = self.issue_ticket();
        tracing::debug!(
            ticket = ticket.value(),
            min_similarity = self.options.min_similarity,
            max_results = self.options.max_results,
            "search started"
        );
        self.transition(SessionState::Searching { probe, ticket });
        Ok(PendingSearch { ticket, request })
    }

    pub fn complete_search(
        &mut self,
        ticket: Ticket,
        result: Result<SearchResponse, ServiceError>,
    ) -> Outcome {
        let probe = match &self.state {
            SessionState::Searching { probe, ticket: current } if *current == ticket => probe.clone(),
            _ => {
                tracing::debug!(ticket = ticket.value(), "dropping stale search response");
                self.stale_dropped += 1;
                return Outcome::Discarded;
            }
        };
        match result {
            Ok(response) => {
                tracing::info!(
                    ticket = ticket.value(),
                    matches = response.match_count,
                    top_similarity = response.results.first().map(|r| r.similarity),
                    "search completed"
                );
                self.transition(SessionState::Displayed { probe, response });
            }
            Err(err) => {
                tracing::warn!(ticket = ticket.value(), error = %err, "search failed");
                self.fail(Stage::Search, Some(probe), err.user_message(SEARCH_FAILED));
            }
        }
        Outcome::Settled
    }

    /// Drop the current probe and any outstanding work, back to `Empty`.
    pub fn abandon(&mut self) {
        self.captured = None;
        self.transition(SessionState::Empty);
    }

    // --- composer ---

    /// Returns true when the caller should fetch the feature library.
    pub fn begin_catalog_load(&mut self) -> bool {
        if !self.composer.needs_catalog() {
            return false;
        }
        self.composer.catalog_loading();
        true
    }

    pub fn complete_catalog_load(&mut self, result: Result<FeatureCatalog, ServiceError>) {
        match result {
            Ok(catalog) => self.composer.catalog_loaded(catalog),
            Err(err) => self.composer.catalog_failed(err.user_message(CATALOG_FAILED)),
        }
    }

    pub fn select_feature(
        &mut self,
        category: FeatureCategory,
        variant_id: &str,
    ) -> Result<(), ValidationError> {
        self.composer.select(category, variant_id)
    }

    /// Clear the composer. The active probe is left alone.
    pub fn reset_composer(&mut self) {
        self.composer.reset();
    }
}

impl Default for ProbeSession {
    fn default() -> Self {
        Self::new(SearchMode::default(), SearchOptions::default())
    }
}
