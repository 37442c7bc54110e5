//! Domain types shared by the segmentation and ranking crates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

pub type DocId = String;
pub type ChunkId = String;
pub type Tags = BTreeMap<String, serde_json::Value>;

/// Well-known tag keys.
pub mod tags {
    pub const SAMPLE_RATE: &str = "sample_rate";
    pub const TIMESTAMP: &str = "timestamp";
    pub const PARENT_ID: &str = "parent_id";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Audio,
    Image,
    Video,
    Text,
}

impl Modality {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Image => "image",
            Self::Video => "video",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Modality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "audio" => Ok(Self::Audio),
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "text" => Ok(Self::Text),
            other => Err(Error::InvalidConfiguration(format!("unknown modality '{other}'"))),
        }
    }
}

/// A raw media document as delivered by the host, before segmentation.
///
/// - `uri`: local path, `file://` uri or embedded `data:` uri
/// - `samples`: decoded mono audio, when the document is an audio track
/// - `bytes`: raw container bytes, used instead of `uri` when present
/// - `chunks`: owned output of segmentation, in produced order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaDocument {
    pub id: DocId,
    #[serde(default)]
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modality: Option<Modality>,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chunks: Vec<Chunk>,
}

impl MediaDocument {
    pub fn new(id: impl Into<String>, uri: impl Into<String>) -> Self {
        Self { id: id.into(), uri: uri.into(), ..Self::default() }
    }

    /// Reads a numeric tag; `None` when absent or not a number.
    pub fn tag_f64(&self, key: &str) -> Option<f64> {
        self.tags.get(key).and_then(serde_json::Value::as_f64)
    }
}

/// Position of a chunk inside its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Half-open sample range `[start, end)`.
    Span { start: usize, end: usize },
    /// Frame index in produced order.
    Frame(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChunkPayload {
    Samples { data: Vec<f32> },
    /// Interleaved RGB8 pixels, row-major.
    Pixels { width: u32, height: u32, data: Vec<u8> },
}

impl ChunkPayload {
    pub fn len(&self) -> usize {
        match self {
            Self::Samples { data } => data.len(),
            Self::Pixels { data, .. } => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A derived unit of a media document, independently embedded and indexed.
///
/// `parent_id` is a plain id; the parent is looked up externally and is
/// never owned by the chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub parent_id: DocId,
    pub payload: ChunkPayload,
    pub offset: usize,
    pub location: Location,
    pub modality: Modality,
    pub tags: Tags,
}

impl Chunk {
    pub fn timestamp(&self) -> Option<f64> {
        self.tags.get(tags::TIMESTAMP).and_then(serde_json::Value::as_f64)
    }
}

/// A chunk-level nearest-neighbour result produced by the external index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: ChunkId,
    pub parent_id: DocId,
    pub modality: Modality,
    #[serde(default)]
    pub scores: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Match {
    pub fn score(&self, metric: &str) -> Option<f64> {
        self.scores.get(metric).copied()
    }
}

/// A query as it arrives at the ranking stage: its own embedding plus the
/// flat list of chunk-level matches returned by the index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryDocument {
    pub id: DocId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub matches: Vec<Match>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultTags {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

/// One parent-level result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedMatch {
    pub id: DocId,
    pub scores: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default)]
    pub tags: ResultTags,
}

/// The response shape for one query. Carries no embedding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedDocument {
    pub id: DocId,
    pub matches: Vec<AggregatedMatch>,
}
