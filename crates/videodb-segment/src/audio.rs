//! Sliding-window segmentation of decoded audio tracks.

use videodb_core::config::AudioSettings;
use videodb_core::traits::{SegmentParams, Segmenter};
use videodb_core::types::{tags, Chunk, ChunkPayload, Location, MediaDocument, Modality};
use videodb_core::{Error, Result};

/// A half-open sample window `[start, end)` with its start time in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub start: usize,
    pub end: usize,
    pub timestamp: f64,
}

pub struct AudioSegmenter {
    chunk_duration: f64,
    chunk_stride: f64,
}

impl AudioSegmenter {
    pub fn new(settings: AudioSettings) -> Result<Self> {
        if !(settings.chunk_duration > 0.0) || !(settings.chunk_stride > 0.0) {
            return Err(Error::InvalidConfiguration(format!(
                "audio window needs positive duration and stride, got {}s/{}s",
                settings.chunk_duration, settings.chunk_stride
            )));
        }
        Ok(Self { chunk_duration: settings.chunk_duration, chunk_stride: settings.chunk_stride })
    }

    /// Window layout for `len` samples at `sample_rate`.
    ///
    /// `num_chunks = max(1, (len - chunk_size) / stride_size)`; windows are
    /// clipped to `len` and empty windows are never produced. A stride that
    /// rounds to zero samples yields only the first window.
    pub fn windows(&self, len: usize, sample_rate: f64, stride: f64) -> Vec<Window> {
        let chunk_size = (self.chunk_duration * sample_rate).floor() as usize;
        let stride_size = (stride * sample_rate).floor() as usize;
        let num_chunks = if stride_size == 0 {
            1
        } else {
            (len.saturating_sub(chunk_size) / stride_size).max(1)
        };

        let mut out = Vec::with_capacity(num_chunks);
        for chunk_id in 0..num_chunks {
            let start = chunk_id * stride_size;
            if start >= len {
                break;
            }
            let end = (start + chunk_size).min(len);
            if end <= start {
                break;
            }
            let timestamp = if sample_rate != 0.0 { start as f64 / sample_rate } else { 0.0 };
            out.push(Window { start, end, timestamp });
        }
        out
    }

    fn sample_rate(doc: &MediaDocument) -> Result<f64> {
        let rate = doc
            .tag_f64(tags::SAMPLE_RATE)
            .ok_or_else(|| Error::missing_metadata(&doc.id, tags::SAMPLE_RATE))?;
        if !rate.is_finite() || rate < 0.0 {
            return Err(Error::InvalidInput(format!("document '{}' has invalid sample_rate {rate}", doc.id)));
        }
        Ok(rate)
    }
}

impl Segmenter for AudioSegmenter {
    fn modality(&self) -> Modality {
        Modality::Audio
    }

    fn segment(&self, doc: &MediaDocument, params: &SegmentParams) -> Result<Vec<Chunk>> {
        let sample_rate = Self::sample_rate(doc)?;
        let samples = doc
            .samples
            .as_deref()
            .ok_or_else(|| Error::InvalidInput(format!("document '{}' carries no audio samples", doc.id)))?;
        let stride = params.chunk_stride.unwrap_or(self.chunk_stride);
        if !(stride > 0.0) {
            return Err(Error::InvalidInput(format!("chunk_stride override must be positive, got {stride}")));
        }

        let chunks: Vec<Chunk> = self
            .windows(samples.len(), sample_rate, stride)
            .into_iter()
            .enumerate()
            .map(|(offset, w)| {
                let mut chunk_tags = doc.tags.clone();
                chunk_tags.insert(tags::TIMESTAMP.to_string(), w.timestamp.into());
                chunk_tags.insert(tags::PARENT_ID.to_string(), doc.id.clone().into());
                Chunk {
                    id: format!("{}:audio:{}", doc.id, offset),
                    parent_id: doc.id.clone(),
                    payload: ChunkPayload::Samples { data: samples[w.start..w.end].to_vec() },
                    offset,
                    location: Location::Span { start: w.start, end: w.end },
                    modality: Modality::Audio,
                    tags: chunk_tags,
                }
            })
            .collect();
        tracing::debug!(doc_id = %doc.id, samples = samples.len(), sample_rate, chunks = chunks.len(), "segmented audio");
        Ok(chunks)
    }
}
