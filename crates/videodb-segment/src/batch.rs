//! Per-batch driver that isolates document failures.

use videodb_core::traits::{SegmentParams, Segmenter, Transcoder};
use videodb_core::types::{Chunk, DocId, MediaDocument};
use videodb_core::{Error, Result};

use crate::audio::AudioSegmenter;
use crate::extract::AudioExtractor;

#[derive(Debug, Default)]
pub struct BatchReport {
    pub processed: usize,
    pub chunks: usize,
    pub failed: Vec<(DocId, Error)>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Segments every document, replacing its chunks.
///
/// A failing document ends up with no chunks and is listed in the report;
/// its siblings are unaffected.
pub fn segment_batch(segmenter: &dyn Segmenter, docs: &mut [MediaDocument], params: &SegmentParams) -> BatchReport {
    let mut report = BatchReport::default();
    for doc in docs.iter_mut() {
        match segmenter.segment(doc, params) {
            Ok(chunks) => {
                report.chunks += chunks.len();
                doc.chunks = chunks;
            }
            Err(e) => {
                tracing::warn!(doc_id = %doc.id, modality = %segmenter.modality(), error = %e, "segmentation failed");
                doc.chunks.clear();
                report.failed.push((doc.id.clone(), e));
            }
        }
        report.processed += 1;
    }
    tracing::info!(
        modality = %segmenter.modality(),
        documents = report.processed,
        chunks = report.chunks,
        failed = report.failed.len(),
        "segmented batch"
    );
    report
}

/// Frame chunks followed by audio windows.
///
/// Only a frame failure fails the video. A missing audio track or a
/// windowing error is logged and the frames are kept.
pub fn segment_video<T: Transcoder>(
    doc: &MediaDocument,
    frames: &dyn Segmenter,
    extractor: &AudioExtractor<T>,
    audio: &AudioSegmenter,
    params: &SegmentParams,
) -> Result<Vec<Chunk>> {
    let mut chunks = frames.segment(doc, params)?;
    let track = match extractor.extract(doc) {
        Ok(track) => track,
        Err(e) => {
            tracing::warn!(doc_id = %doc.id, error = %e, "no audio track, keeping frames only");
            return Ok(chunks);
        }
    };
    match audio.segment(&track, params) {
        Ok(windows) => chunks.extend(windows),
        Err(e) => tracing::warn!(doc_id = %doc.id, error = %e, "audio windowing failed, keeping frames only"),
    }
    Ok(chunks)
}
