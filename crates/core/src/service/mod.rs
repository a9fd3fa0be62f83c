mod http;

use crate::config::ConfigError;
use crate::emotion::{CharacterTimeline, SentenceAnnotation};
use futures::future::BoxFuture;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub use http::HttpAnalysisService;

pub const FALLBACK_ERROR_MESSAGE: &str = "Failed to get a response from the server.";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AnalysisMode {
    #[default]
    Sentence,
    Character,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Sentence => "sentence",
            AnalysisMode::Character => "character",
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sentence" | "sentences" => Ok(AnalysisMode::Sentence),
            "character" | "characters" => Ok(AnalysisMode::Character),
            other => Err(format!("unknown analysis mode: {other}")),
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "mode", content = "result")]
pub enum AnalysisResult {
    #[serde(rename = "sentence")]
    Sentences(Vec<SentenceAnnotation>),
    #[serde(rename = "character")]
    Characters(CharacterTimeline),
}

impl AnalysisResult {
    pub fn mode(&self) -> AnalysisMode {
        match self {
            AnalysisResult::Sentences(_) => AnalysisMode::Sentence,
            AnalysisResult::Characters(_) => AnalysisMode::Character,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    /// Non-2xx answer. `message` is the service's `error` field, or the generic fallback.
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Failed to get a response from the server. ({0})")]
    Transport(#[from] reqwest::Error),

    #[error("invalid response from analysis service: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// The external emotion-analysis boundary. One operation per [`AnalysisMode`].
pub trait AnalysisService: Send + Sync {
    fn analyze_sentences(
        &self,
        text: String,
    ) -> BoxFuture<'_, Result<Vec<SentenceAnnotation>, ServiceError>>;

    fn analyze_characters(
        &self,
        text: String,
    ) -> BoxFuture<'_, Result<CharacterTimeline, ServiceError>>;
}

/// Calls the service operation that belongs to `mode`.
pub async fn dispatch<S>(
    service: &S,
    mode: AnalysisMode,
    text: String,
) -> Result<AnalysisResult, ServiceError>
where
    S: AnalysisService + ?Sized,
{
    match mode {
        AnalysisMode::Sentence => service
            .analyze_sentences(text)
            .await
            .map(AnalysisResult::Sentences),
        AnalysisMode::Character => service
            .analyze_characters(text)
            .await
            .map(AnalysisResult::Characters),
    }
}
