//! Pure mapping from analysis results to what gets shown.

use crate::emotion::{CharacterTimeline, EmotionLabel, SentenceAnnotation};
use crate::service::{AnalysisMode, AnalysisResult};
use serde::Serialize;

pub const LABEL_SEPARATOR: &str = ", ";
pub const SENTENCE_PLACEHOLDER: &str = "No Strong Emotion";
pub const CHARACTER_PLACEHOLDER: &str = "Neutral";
pub const NO_CHARACTERS_MESSAGE: &str =
    "No characters were identified in the text, or they were not associated with any emotional sentences.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualCategory {
    Yellow,
    Green,
    Orange,
    Purple,
    Blue,
    Lime,
    Red,
    Amber,
    Neutral,
}

impl VisualCategory {
    pub fn css_class(&self) -> &'static str {
        match self {
            VisualCategory::Yellow => "bg-yellow-200",
            VisualCategory::Green => "bg-green-200",
            VisualCategory::Orange => "bg-orange-300",
            VisualCategory::Purple => "bg-purple-300",
            VisualCategory::Blue => "bg-blue-300",
            VisualCategory::Lime => "bg-lime-300",
            VisualCategory::Red => "bg-red-300",
            VisualCategory::Amber => "bg-amber-200",
            VisualCategory::Neutral => "bg-gray-200",
        }
    }
}

pub fn category_for_label(label: &EmotionLabel) -> VisualCategory {
    match label {
        EmotionLabel::Joy => VisualCategory::Yellow,
        EmotionLabel::Trust => VisualCategory::Green,
        EmotionLabel::Fear => VisualCategory::Orange,
        EmotionLabel::Surprise => VisualCategory::Purple,
        EmotionLabel::Sadness => VisualCategory::Blue,
        EmotionLabel::Disgust => VisualCategory::Lime,
        EmotionLabel::Anger => VisualCategory::Red,
        EmotionLabel::Anticipation => VisualCategory::Amber,
        EmotionLabel::Unrecognized(_) => VisualCategory::Neutral,
    }
}

pub fn color_for(annotation: &SentenceAnnotation) -> VisualCategory {
    annotation
        .primary_emotion()
        .map(category_for_label)
        .unwrap_or(VisualCategory::Neutral)
}

pub fn label_for(annotation: &SentenceAnnotation, mode: AnalysisMode) -> String {
    if annotation.emotions.is_empty() {
        return match mode {
            AnalysisMode::Sentence => SENTENCE_PLACEHOLDER,
            AnalysisMode::Character => CHARACTER_PLACEHOLDER,
        }
        .to_owned();
    }
    annotation
        .emotions
        .iter()
        .map(EmotionLabel::as_str)
        .collect::<Vec<_>>()
        .join(LABEL_SEPARATOR)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RenderedSentence {
    pub text: String,
    pub category: VisualCategory,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CharacterArc {
    pub name: String,
    pub sentences: Vec<RenderedSentence>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "characters", rename_all = "snake_case")]
pub enum CharacterView {
    /// The analysis ran and found nobody.
    NoCharacters,
    Characters(Vec<CharacterArc>),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "view", rename_all = "lowercase")]
pub enum DisplayModel {
    Sentence(Vec<RenderedSentence>),
    Character(CharacterView),
}

fn render_one(annotation: &SentenceAnnotation, mode: AnalysisMode) -> RenderedSentence {
    RenderedSentence {
        text: annotation.sentence.clone(),
        category: color_for(annotation),
        label: label_for(annotation, mode),
    }
}

pub fn render_sentence_view(annotations: &[SentenceAnnotation]) -> Vec<RenderedSentence> {
    annotations
        .iter()
        .map(|a| render_one(a, AnalysisMode::Sentence))
        .collect()
}

pub fn render_character_view(timeline: &CharacterTimeline) -> CharacterView {
    if timeline.is_empty() {
        return CharacterView::NoCharacters;
    }
    CharacterView::Characters(
        timeline
            .iter()
            .map(|(name, arc)| CharacterArc {
                name: name.to_owned(),
                sentences: arc
                    .iter()
                    .map(|a| render_one(a, AnalysisMode::Character))
                    .collect(),
            })
            .collect(),
    )
}

pub fn render(result: &AnalysisResult) -> DisplayModel {
    match result {
        AnalysisResult::Sentences(annotations) => {
            DisplayModel::Sentence(render_sentence_view(annotations))
        }
        AnalysisResult::Characters(timeline) => {
            DisplayModel::Character(render_character_view(timeline))
        }
    }
}
