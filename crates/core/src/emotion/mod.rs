mod timeline;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use timeline::CharacterTimeline;

/// One label reported by the analysis service.
///
/// The eight basic emotions form a closed set; anything else the service sends
/// is kept verbatim in `Unrecognized` and renders with the neutral category.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EmotionLabel {
    Joy,
    Trust,
    Fear,
    Surprise,
    Sadness,
    Disgust,
    Anger,
    Anticipation,
    Unrecognized(String),
}

impl EmotionLabel {
    pub const KNOWN: [EmotionLabel; 8] = [
        EmotionLabel::Joy,
        EmotionLabel::Trust,
        EmotionLabel::Fear,
        EmotionLabel::Surprise,
        EmotionLabel::Sadness,
        EmotionLabel::Disgust,
        EmotionLabel::Anger,
        EmotionLabel::Anticipation,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            EmotionLabel::Joy => "joy",
            EmotionLabel::Trust => "trust",
            EmotionLabel::Fear => "fear",
            EmotionLabel::Surprise => "surprise",
            EmotionLabel::Sadness => "sadness",
            EmotionLabel::Disgust => "disgust",
            EmotionLabel::Anger => "anger",
            EmotionLabel::Anticipation => "anticipation",
            EmotionLabel::Unrecognized(raw) => raw,
        }
    }
}

impl From<String> for EmotionLabel {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "joy" => EmotionLabel::Joy,
            "trust" => EmotionLabel::Trust,
            "fear" => EmotionLabel::Fear,
            "surprise" => EmotionLabel::Surprise,
            "sadness" => EmotionLabel::Sadness,
            "disgust" => EmotionLabel::Disgust,
            "anger" => EmotionLabel::Anger,
            "anticipation" => EmotionLabel::Anticipation,
            _ => EmotionLabel::Unrecognized(raw),
        }
    }
}

impl From<&str> for EmotionLabel {
    fn from(raw: &str) -> Self {
        EmotionLabel::from(raw.to_owned())
    }
}

impl From<EmotionLabel> for String {
    fn from(label: EmotionLabel) -> Self {
        match label {
            EmotionLabel::Unrecognized(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sentence with the emotions detected in it, highest priority first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceAnnotation {
    pub sentence: String,
    #[serde(default)]
    pub emotions: Vec<EmotionLabel>,
}

impl SentenceAnnotation {
    pub fn new<S: Into<String>>(sentence: S, emotions: Vec<EmotionLabel>) -> Self {
        Self {
            sentence: sentence.into(),
            emotions,
        }
    }

    pub fn primary_emotion(&self) -> Option<&EmotionLabel> {
        self.emotions.first()
    }
}
