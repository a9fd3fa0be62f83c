use crate::emotion::SentenceAnnotation;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Per-character sentence annotations, in the order the service listed the
/// characters. Within a character, annotations are in order of appearance.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CharacterTimeline {
    entries: Vec<(String, Vec<SentenceAnnotation>)>,
}

impl CharacterTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a character at the end, or replaces the arc of an existing one in place.
    pub fn insert<S: Into<String>>(&mut self, name: S, arc: Vec<SentenceAnnotation>) {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = arc,
            None => self.entries.push((name, arc)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[SentenceAnnotation])> {
        self.entries
            .iter()
            .map(|(name, arc)| (name.as_str(), arc.as_slice()))
    }
}

impl<S: Into<String>> FromIterator<(S, Vec<SentenceAnnotation>)> for CharacterTimeline {
    fn from_iter<I: IntoIterator<Item = (S, Vec<SentenceAnnotation>)>>(iter: I) -> Self {
        let mut timeline = CharacterTimeline::new();
        for (name, arc) in iter {
            timeline.insert(name, arc);
        }
        timeline
    }
}

impl Serialize for CharacterTimeline {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, arc) in &self.entries {
            map.serialize_entry(name, arc)?;
        }
        map.end()
    }
}

struct TimelineVisitor;

impl<'de> Visitor<'de> for TimelineVisitor {
    type Value = CharacterTimeline;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object mapping character names to sentence annotations")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut timeline = CharacterTimeline::new();
        while let Some((name, arc)) = access.next_entry::<String, Vec<SentenceAnnotation>>()? {
            timeline.insert(name, arc);
        }
        Ok(timeline)
    }
}

impl<'de> Deserialize<'de> for CharacterTimeline {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(TimelineVisitor)
    }
}
