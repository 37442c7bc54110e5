//! Frame sampling path: decode a video into timestamped image chunks.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use videodb_core::config::{FrameSampling, FrameSettings, Resolution};
use videodb_core::traits::{SegmentParams, Segmenter, Transcoder};
use videodb_core::types::{tags, Chunk, ChunkPayload, Location, MediaDocument, Modality};
use videodb_core::{Error, Result};

use crate::source;

pub struct FrameSegmenter<T: Transcoder> {
    transcoder: T,
    sampling: FrameSampling,
    resolution: Resolution,
    max_num_frames: usize,
    retain_temp: bool,
}

impl<T: Transcoder> FrameSegmenter<T> {
    pub fn new(transcoder: T, settings: &FrameSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            transcoder,
            sampling: settings.sampling(),
            resolution: settings.resolution(),
            max_num_frames: settings.max_num_frames,
            retain_temp: settings.retain_temp,
        })
    }

    /// Seconds into the video of the `index`-th produced frame.
    ///
    /// Times reported by the transcoder win; otherwise a fixed rate gives
    /// `index / fps`. Keyframes without reported times have no timestamp.
    fn frame_time(&self, index: usize, reported: &[f64]) -> Option<f64> {
        if let Some(t) = reported.get(index) {
            return Some(*t);
        }
        match self.sampling {
            FrameSampling::Fps(fps) => Some(index as f64 / fps),
            FrameSampling::KeyframesOnly => None,
        }
    }

    /// Decodes produced frame files in name order, at most `max_num_frames`.
    ///
    /// `location` is the frame's position in the produced sequence;
    /// undecodable files are skipped.
    fn harvest(&self, doc: &MediaDocument, dir: &Path, reported: &[f64]) -> Vec<Chunk> {
        let files = match list_frames(dir) {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(doc_id = %doc.id, error = %e, "failed to list frames");
                return Vec::new();
            }
        };
        let mut chunks = Vec::with_capacity(files.len().min(self.max_num_frames));
        for (index, path) in files.iter().enumerate() {
            if chunks.len() >= self.max_num_frames {
                break;
            }
            let payload = match decode_frame(path) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!(doc_id = %doc.id, frame = %path.display(), error = %e, "skipping frame");
                    continue;
                }
            };
            let offset = chunks.len();
            let mut chunk_tags = doc.tags.clone();
            match self.frame_time(index, reported) {
                Some(t) => {
                    chunk_tags.insert(tags::TIMESTAMP.to_string(), t.into());
                }
                None => tracing::debug!(doc_id = %doc.id, frame = index, "no timestamp for keyframe"),
            }
            chunk_tags.insert(tags::PARENT_ID.to_string(), doc.id.clone().into());
            chunks.push(Chunk {
                id: format!("{}:image:{}", doc.id, offset),
                parent_id: doc.id.clone(),
                payload,
                offset,
                location: Location::Frame(index),
                modality: Modality::Image,
                tags: chunk_tags,
            });
        }
        chunks
    }
}

impl<T: Transcoder> Segmenter for FrameSegmenter<T> {
    fn modality(&self) -> Modality {
        Modality::Image
    }

    fn segment(&self, doc: &MediaDocument, _params: &SegmentParams) -> Result<Vec<Chunk>> {
        let source = source::materialize(doc)?;
        let scratch = match tempfile::Builder::new().prefix("videodb-frames-").tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                source.release(self.retain_temp);
                return Err(Error::filesystem(std::env::temp_dir(), e));
            }
        };

        let chunks = match self.transcoder.extract_frames(source.path(), self.sampling, self.resolution, scratch.path()) {
            Ok(times) => self.harvest(doc, scratch.path(), &times),
            Err(e) => {
                tracing::warn!(doc_id = %doc.id, error = %e, "transcoding failed, document yields no frames");
                Vec::new()
            }
        };

        release_dir(scratch, self.retain_temp);
        source.release(self.retain_temp);
        tracing::debug!(doc_id = %doc.id, frames = chunks.len(), "segmented frames");
        Ok(chunks)
    }
}

fn list_frames(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| Error::filesystem(dir, e))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().and_then(|s| s.to_str()).is_some_and(|s| s.eq_ignore_ascii_case("png")))
        .collect();
    // Zero-padded names sort in produced order.
    files.sort();
    Ok(files)
}

fn decode_frame(path: &Path) -> Result<ChunkPayload> {
    let img = image::open(path).map_err(|e| Error::Decode(format!("{}: {e}", path.display())))?;
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(ChunkPayload::Pixels { width, height, data: rgb.into_raw() })
}

fn release_dir(dir: TempDir, retain: bool) {
    if retain {
        let path = dir.keep();
        tracing::debug!(path = %path.display(), "retained frame directory");
    } else {
        let path = dir.path().to_path_buf();
        if let Err(e) = dir.close() {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove frame directory");
        }
    }
}
