//! The request lifecycle for one user session.
//!
//! A [`Session`] owns the current [`Document`], the active [`AnalysisMode`] and the
//! single [`RequestState`] the UI renders. Every dispatch is tagged with a
//! [`Ticket`]; only the most recent ticket may move the state out of `Loading`, so a
//! slow response to a superseded request can never overwrite a newer one.

use crate::extract::{self, Document, ExtractError, SourceFile};
use crate::service::{self, AnalysisMode, AnalysisResult, AnalysisService, ServiceError};

const LOG_TARGET: &str = "session";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum RequestState {
    #[default]
    Idle,
    Loading,
    Success(AnalysisResult),
    Error(String),
}

impl RequestState {
    pub fn is_loading(&self) -> bool {
        matches!(self, RequestState::Loading)
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            RequestState::Success(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            RequestState::Error(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum AnalyzeError {
    #[error("Please enter some text to analyze.")]
    EmptyInput,

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("analysis superseded by a newer request")]
    Superseded,
}

/// Handle for one dispatched request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    mode: AnalysisMode,
    text: Document,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn mode(&self) -> AnalysisMode {
        self.mode
    }

    pub fn text(&self) -> &str {
        self.text.as_str()
    }
}

#[derive(Debug, Default)]
pub struct Session {
    document: Document,
    mode: AnalysisMode,
    state: RequestState,
    generation: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: AnalysisMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn mode(&self) -> AnalysisMode {
        self.mode
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    /// Replaces the document with typed text.
    pub fn set_text<D: Into<Document>>(&mut self, text: D) {
        self.document = text.into();
    }

    /// Switches the active view. Never re-runs analysis.
    pub fn set_mode(&mut self, mode: AnalysisMode) {
        if self.mode != mode {
            tracing::debug!(target: LOG_TARGET, from = %self.mode, to = %mode, "mode switched");
            self.mode = mode;
        }
    }

    /// The cached result, if it belongs to the active mode.
    pub fn visible_result(&self) -> Option<&AnalysisResult> {
        self.state.result().filter(|r| r.mode() == self.mode)
    }

    /// Extracts `file` and makes it the current document.
    ///
    /// On failure the previous document stays and the error becomes the visible
    /// message. On success a visible error is cleared; a shown result is kept.
    pub async fn load_file(&mut self, file: &SourceFile) -> Result<(), ExtractError> {
        match extract::extract(file).await {
            Ok(document) => {
                tracing::info!(
                    target: LOG_TARGET,
                    name = file.name.as_deref().unwrap_or("<unnamed>"),
                    chars = document.len(),
                    "document loaded"
                );
                self.document = document;
                if matches!(self.state, RequestState::Error(_)) {
                    self.state = RequestState::Idle;
                }
                Ok(())
            }
            Err(e) => {
                tracing::warn!(target: LOG_TARGET, error = %e, detail = e.detail(), "document load failed");
                self.state = RequestState::Error(e.to_string());
                Err(e)
            }
        }
    }

    /// Validates the document and moves to `Loading`, clearing any shown result or error.
    pub fn begin(&mut self) -> Result<Ticket, AnalyzeError> {
        if self.document.is_blank() {
            self.state = RequestState::Error(AnalyzeError::EmptyInput.to_string());
            return Err(AnalyzeError::EmptyInput);
        }

        self.generation += 1;
        self.state = RequestState::Loading;
        tracing::debug!(
            target: LOG_TARGET,
            generation = self.generation,
            mode = %self.mode,
            "analysis started"
        );

        Ok(Ticket {
            generation: self.generation,
            mode: self.mode,
            text: self.document.clone(),
        })
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.generation == self.generation && self.state.is_loading()
    }

    /// Applies the outcome of `ticket`'s request.
    ///
    /// A superseded ticket leaves the state untouched and yields
    /// [`AnalyzeError::Superseded`]; a service failure becomes the visible error.
    pub fn finish(
        &mut self,
        ticket: &Ticket,
        outcome: Result<AnalysisResult, ServiceError>,
    ) -> Result<(), AnalyzeError> {
        if !self.is_current(ticket) {
            tracing::info!(
                target: LOG_TARGET,
                generation = ticket.generation,
                current = self.generation,
                "discarding stale analysis response"
            );
            return Err(AnalyzeError::Superseded);
        }

        match outcome {
            Ok(result) => {
                tracing::debug!(target: LOG_TARGET, generation = ticket.generation, "analysis finished");
                self.state = RequestState::Success(result);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(target: LOG_TARGET, generation = ticket.generation, error = %e, "analysis failed");
                self.state = RequestState::Error(e.to_string());
                Err(AnalyzeError::Service(e))
            }
        }
    }

    /// Runs one full cycle against `service` for the active mode.
    pub async fn analyze<S>(&mut self, service: &S) -> Result<&AnalysisResult, AnalyzeError>
    where
        S: AnalysisService + ?Sized,
    {
        let ticket = self.begin()?;
        let outcome = service::dispatch(service, ticket.mode(), ticket.text().to_owned()).await;
        self.finish(&ticket, outcome)?;
        self.state.result().ok_or(AnalyzeError::Superseded)
    }
}
